//! Error types for protoc-gen-mcp.
//!
//! One error hierarchy is shared across all crates in the workspace. The
//! variants mirror the failure scopes of a plugin run: configuration errors
//! abort the whole invocation before any file is generated, type resolution
//! errors abort a single file, and the remaining variants cover plugin
//! plumbing.
//!
//! # Examples
//!
//! ```
//! use protomcp_core::{Error, Result};
//!
//! fn check_case(value: &str) -> Result<()> {
//!     if value != "snake" {
//!         return Err(Error::InvalidParameter {
//!             parameter: "tool_name_case".to_string(),
//!             value: value.to_string(),
//!             message: "must be one of: snake, camel, pascal, kebab".to_string(),
//!             suggestions: vec!["tool_name_case=snake".to_string()],
//!         });
//!     }
//!     Ok(())
//! }
//!
//! let err = check_case("upper").unwrap_err();
//! assert!(err.is_configuration_error());
//! ```

use thiserror::Error;

/// Main error type for the plugin.
#[derive(Error, Debug)]
pub enum Error {
    /// A plugin parameter failed validation.
    ///
    /// Fatal for the entire run, since every file shares one configuration.
    /// The message carries the parameter name, the offending value, and
    /// example valid values so the user can correct the invocation.
    #[error("invalid parameter '{parameter}' = '{value}': {message}{}", format_suggestions(suggestions))]
    InvalidParameter {
        /// Name of the rejected parameter
        parameter: String,
        /// The offending value as supplied
        value: String,
        /// Why the value was rejected
        message: String,
        /// Example valid assignments, e.g. `timeout=30`
        suggestions: Vec<String>,
    },

    /// A field references a type that is absent from the descriptor index.
    ///
    /// Scoped to the file being generated. Sibling files in the same batch
    /// are unaffected and still produce output.
    #[error(
        "cannot resolve type '{missing_type}' referenced by field '{field}' of message '{message}' while generating {file}"
    )]
    TypeResolution {
        /// Proto file whose generation failed
        file: String,
        /// Fully qualified name of the referencing message
        message: String,
        /// Name of the referencing field
        field: String,
        /// The fully qualified type name that could not be resolved
        missing_type: String,
    },

    /// Rendering a code template failed.
    ///
    /// Indicates a bug in a built-in template or a context mismatch rather
    /// than bad user input.
    #[error("template rendering failed: {message}")]
    Template {
        /// Description of the rendering failure
        message: String,
        /// Underlying template engine error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The code generator request could not be decoded.
    #[error("malformed code generator request: {0}")]
    MalformedRequest(String),
}

impl Error {
    /// Returns `true` if this is a configuration (parameter) error.
    ///
    /// # Examples
    ///
    /// ```
    /// use protomcp_core::Error;
    ///
    /// let err = Error::InvalidParameter {
    ///     parameter: "timeout".to_string(),
    ///     value: "abc".to_string(),
    ///     message: "must be a positive integer".to_string(),
    ///     suggestions: vec![],
    /// };
    /// assert!(err.is_configuration_error());
    /// ```
    #[must_use]
    pub const fn is_configuration_error(&self) -> bool {
        matches!(self, Self::InvalidParameter { .. })
    }

    /// Returns `true` if this is a type resolution error.
    #[must_use]
    pub const fn is_type_resolution_error(&self) -> bool {
        matches!(self, Self::TypeResolution { .. })
    }

    /// Returns `true` if this is a template rendering error.
    #[must_use]
    pub const fn is_template_error(&self) -> bool {
        matches!(self, Self::Template { .. })
    }
}

fn format_suggestions(suggestions: &[String]) -> String {
    if suggestions.is_empty() {
        String::new()
    } else {
        format!(" (examples: {})", suggestions.join(", "))
    }
}

/// Result type alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, Error>;
