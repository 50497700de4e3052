//! Diagnostics channel for non-fatal findings.
//!
//! Warnings and file-scoped errors accumulate here during a run instead of
//! aborting it. Everything pushed is also logged through `tracing`, so
//! findings surface on stderr and never leak into generated file content.

use std::fmt;

/// Severity of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Non-fatal finding, e.g. a skipped streaming method.
    Warning,
    /// A failure that aborted part of the run, e.g. one file.
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Warning => f.write_str("warning"),
            Self::Error => f.write_str("error"),
        }
    }
}

/// A single recorded finding.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    /// Severity of the finding
    pub severity: Severity,
    /// Proto file the finding applies to, when file-scoped
    pub file: Option<String>,
    /// Method the finding applies to, when method-scoped
    pub method: Option<String>,
    /// Human-readable description
    pub message: String,
}

impl Diagnostic {
    /// Creates a warning diagnostic.
    #[must_use]
    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            file: None,
            method: None,
            message: message.into(),
        }
    }

    /// Creates an error diagnostic.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            file: None,
            method: None,
            message: message.into(),
        }
    }

    /// Attaches the proto file this finding is scoped to.
    #[must_use]
    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }

    /// Attaches the method this finding is scoped to.
    #[must_use]
    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: ", self.severity)?;
        if let Some(file) = &self.file {
            write!(f, "{file}: ")?;
        }
        if let Some(method) = &self.method {
            write!(f, "{method}: ")?;
        }
        f.write_str(&self.message)
    }
}

/// Accumulator for diagnostics produced during one run.
///
/// # Examples
///
/// ```
/// use protomcp_core::{Diagnostic, Diagnostics};
///
/// let mut diagnostics = Diagnostics::new();
/// diagnostics.push(Diagnostic::warning("streaming method skipped").with_file("chat.proto"));
///
/// assert_eq!(diagnostics.len(), 1);
/// assert_eq!(diagnostics.warnings().count(), 1);
/// ```
#[derive(Debug, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    /// Creates an empty accumulator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a diagnostic and logs it to the side channel.
    pub fn push(&mut self, diagnostic: Diagnostic) {
        match diagnostic.severity {
            Severity::Warning => tracing::warn!("{diagnostic}"),
            Severity::Error => tracing::error!("{diagnostic}"),
        }
        self.entries.push(diagnostic);
    }

    /// Number of recorded diagnostics.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over all recorded diagnostics.
    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    /// Iterates over warnings only.
    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries
            .iter()
            .filter(|d| d.severity == Severity::Warning)
    }

    /// Iterates over errors only.
    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries
            .iter()
            .filter(|d| d.severity == Severity::Error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_and_filter_by_severity() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.push(Diagnostic::warning("first"));
        diagnostics.push(Diagnostic::error("second").with_file("a.proto"));
        diagnostics.push(Diagnostic::warning("third").with_method("StreamLogs"));

        assert_eq!(diagnostics.len(), 3);
        assert_eq!(diagnostics.warnings().count(), 2);
        assert_eq!(diagnostics.errors().count(), 1);
    }

    #[test]
    fn display_includes_scopes() {
        let d = Diagnostic::warning("partial streaming support")
            .with_file("chat.proto")
            .with_method("StreamChat");
        let text = d.to_string();
        assert!(text.starts_with("warning: "));
        assert!(text.contains("chat.proto"));
        assert!(text.contains("StreamChat"));
        assert!(text.contains("partial streaming support"));
    }

    #[test]
    fn empty_by_default() {
        let diagnostics = Diagnostics::new();
        assert!(diagnostics.is_empty());
        assert_eq!(diagnostics.len(), 0);
    }
}
