//! Generation options parsed from the plugin parameter string.
//!
//! Parameters arrive as an opaque `key=value,key=value` string from the host
//! compiler. Parsing produces one immutable [`GenerationOptions`] per
//! invocation; every generated file shares it, so any validation failure is
//! fatal for the whole run.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::validation;
use crate::{Error, Result};

/// Case convention applied to generated tool names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NameCase {
    /// `do_something`
    #[default]
    Snake,
    /// `doSomething`
    Camel,
    /// `DoSomething`
    Pascal,
    /// `do-something`
    Kebab,
}

impl NameCase {
    /// String form as accepted by the `tool_name_case` parameter.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Snake => "snake",
            Self::Camel => "camel",
            Self::Pascal => "pascal",
            Self::Kebab => "kebab",
        }
    }
}

impl fmt::Display for NameCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NameCase {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "snake" => Ok(Self::Snake),
            "camel" => Ok(Self::Camel),
            "pascal" => Ok(Self::Pascal),
            "kebab" => Ok(Self::Kebab),
            other => Err(invalid("tool_name_case", other, "must be one of: snake, camel, pascal, kebab")),
        }
    }
}

/// Policy for RPC methods with streaming inputs or outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StreamMode {
    /// Buffer every streamed value and return the whole sequence.
    #[default]
    Collect,
    /// Emit no tool for the method and record a diagnostic.
    Skip,
    /// Emit the tool with a prominent partial-support comment.
    Warn,
}

impl StreamMode {
    /// String form as accepted by the `stream_mode` parameter.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Collect => "collect",
            Self::Skip => "skip",
            Self::Warn => "warn",
        }
    }
}

impl FromStr for StreamMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "collect" => Ok(Self::Collect),
            "skip" => Ok(Self::Skip),
            "warn" => Ok(Self::Warn),
            other => Err(invalid("stream_mode", other, "must be one of: collect, skip, warn")),
        }
    }
}

/// Shape of the error dict returned by generated tools on call failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorFormat {
    /// Error message plus exception type.
    #[default]
    Standard,
    /// Error message only.
    Simple,
    /// Standard plus gRPC status code and debug detail.
    Detailed,
}

impl FromStr for ErrorFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "standard" => Ok(Self::Standard),
            "simple" => Ok(Self::Simple),
            "detailed" => Ok(Self::Detailed),
            other => Err(invalid("error_format", other, "must be one of: standard, simple, detailed")),
        }
    }
}

/// Verbosity of the stderr side channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum DebugLevel {
    /// Warnings only.
    #[default]
    None,
    /// High-level progress.
    Basic,
    /// Per-file and per-method detail.
    Verbose,
    /// Everything, including classification detail.
    Trace,
}

impl DebugLevel {
    /// The `tracing` filter directive this level maps to.
    #[must_use]
    pub const fn filter_directive(&self) -> &'static str {
        match self {
            Self::None => "warn",
            Self::Basic => "info",
            Self::Verbose => "debug",
            Self::Trace => "trace",
        }
    }
}

/// Validated, immutable configuration for one plugin invocation.
///
/// Defaults match an unparameterized invocation; see
/// [`GenerationOptions::from_parameter`] for the accepted parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationOptions {
    /// gRPC endpoint generated tools connect to, `host:port`.
    pub grpc_target: String,
    /// Use a plaintext channel instead of TLS.
    pub insecure_channel: bool,
    /// Per-call timeout in seconds.
    pub grpc_timeout_secs: u32,
    /// Generate `async def` tools calling through `grpc.aio`.
    pub async_mode: bool,
    /// Suffix replacing `.proto` in output file names.
    pub output_suffix: String,
    /// Display-name pattern for generated servers, `{service}` placeholder.
    pub server_name_pattern: String,
    /// Factory function name pattern, `{service}` placeholder.
    pub function_name_pattern: String,
    /// Case convention for tool names.
    pub tool_name_case: NameCase,
    /// Copy proto comments into generated docstrings.
    pub include_comments: bool,
    /// Error dict shape for failed calls.
    pub error_format: ErrorFormat,
    /// Streaming method policy.
    pub stream_mode: StreamMode,
    /// Thread every outgoing request through an overridable interceptor hook.
    pub use_request_interceptor: bool,
    /// Let enum parameters accept symbolic names in addition to ordinals.
    pub accept_enum_names: bool,
    /// Side-channel verbosity.
    pub debug_level: DebugLevel,
    /// Echo generated content to the trace log.
    pub show_generated_code: bool,
    /// Log per-field classification detail.
    pub show_type_details: bool,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            grpc_target: "localhost:50051".to_string(),
            insecure_channel: false,
            grpc_timeout_secs: 30,
            async_mode: false,
            output_suffix: "_pb2_mcp.py".to_string(),
            server_name_pattern: "{service}".to_string(),
            function_name_pattern: "create_{service}_server".to_string(),
            tool_name_case: NameCase::Snake,
            include_comments: true,
            error_format: ErrorFormat::Standard,
            stream_mode: StreamMode::Collect,
            use_request_interceptor: false,
            accept_enum_names: false,
            debug_level: DebugLevel::None,
            show_generated_code: false,
            show_type_details: false,
        }
    }
}

/// Result of parsing the parameter string.
#[derive(Debug)]
pub struct ParameterParse {
    /// The validated options.
    pub options: GenerationOptions,
    /// Non-fatal findings: validation warnings and unknown parameters.
    pub warnings: Vec<String>,
}

/// Every parameter name the plugin recognizes.
const KNOWN_PARAMETERS: &[&str] = &[
    "grpc_target",
    "insecure",
    "timeout",
    "async",
    "output_suffix",
    "server_name_pattern",
    "function_name_pattern",
    "tool_name_case",
    "include_comments",
    "error_format",
    "stream_mode",
    "request_interceptor",
    "enum_names",
    "debug",
    "show_generated",
    "show_types",
];

impl GenerationOptions {
    /// Parses and validates the plugin parameter string.
    ///
    /// The string is a comma-separated `key=value` list; a bare key counts as
    /// a boolean `true`. Unknown parameters are reported as warnings and
    /// otherwise ignored. Any rule violation is fatal.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] for the first rule violation.
    ///
    /// # Examples
    ///
    /// ```
    /// use protomcp_core::GenerationOptions;
    ///
    /// let parse = GenerationOptions::from_parameter("async,timeout=60").unwrap();
    /// assert!(parse.options.async_mode);
    /// assert_eq!(parse.options.grpc_timeout_secs, 60);
    ///
    /// assert!(GenerationOptions::from_parameter("stream_mode=buffer").is_err());
    /// ```
    pub fn from_parameter(parameter: &str) -> Result<ParameterParse> {
        let pairs = parse_pairs(parameter);

        let report = validation::validate(pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        if let Some(first) = report.errors.into_iter().next() {
            return Err(first.into());
        }

        let mut warnings = report.warnings;
        for (key, _) in &pairs {
            if !KNOWN_PARAMETERS.contains(&key.as_str()) {
                warnings.push(format!("unknown parameter '{key}' ignored"));
            }
        }

        // Later duplicates win, matching the host compiler's behavior for
        // repeated options.
        let map: BTreeMap<&str, &str> = pairs
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();

        let mut options = Self::default();
        if let Some(target) = map.get("grpc_target") {
            options.grpc_target = (*target).to_string();
        }
        options.insecure_channel = bool_param(&map, "insecure", options.insecure_channel);
        if let Some(timeout) = map.get("timeout") {
            // Already validated as a positive integer.
            options.grpc_timeout_secs = timeout.parse().unwrap_or(options.grpc_timeout_secs);
        }
        options.async_mode = bool_param(&map, "async", options.async_mode);
        if let Some(suffix) = map.get("output_suffix") {
            options.output_suffix = (*suffix).to_string();
        }
        if let Some(pattern) = map.get("server_name_pattern") {
            options.server_name_pattern = (*pattern).to_string();
        }
        if let Some(pattern) = map.get("function_name_pattern") {
            options.function_name_pattern = (*pattern).to_string();
        }
        if let Some(case) = map.get("tool_name_case") {
            options.tool_name_case = case.parse()?;
        }
        options.include_comments = bool_param(&map, "include_comments", options.include_comments);
        if let Some(format) = map.get("error_format") {
            options.error_format = format.parse()?;
        }
        if let Some(mode) = map.get("stream_mode") {
            options.stream_mode = mode.parse()?;
        }
        options.use_request_interceptor =
            bool_param(&map, "request_interceptor", options.use_request_interceptor);
        options.accept_enum_names = bool_param(&map, "enum_names", options.accept_enum_names);
        if let Some(debug) = map.get("debug") {
            options.debug_level = parse_debug_level(debug);
        }
        options.show_generated_code =
            bool_param(&map, "show_generated", options.show_generated_code);
        options.show_type_details = bool_param(&map, "show_types", options.show_type_details);

        Ok(ParameterParse { options, warnings })
    }
}

fn parse_pairs(parameter: &str) -> Vec<(String, String)> {
    parameter
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| match part.split_once('=') {
            Some((key, value)) => (key.trim().to_string(), value.trim().to_string()),
            // A bare key is a boolean flag.
            None => (part.to_string(), "true".to_string()),
        })
        .collect()
}

fn bool_param(map: &BTreeMap<&str, &str>, key: &str, default: bool) -> bool {
    map.get(key).map_or(default, |value| {
        matches!(value.to_lowercase().as_str(), "true" | "1" | "yes")
    })
}

fn parse_debug_level(value: &str) -> DebugLevel {
    match value.to_lowercase().as_str() {
        "basic" | "true" | "1" | "yes" => DebugLevel::Basic,
        "verbose" => DebugLevel::Verbose,
        "trace" => DebugLevel::Trace,
        _ => DebugLevel::None,
    }
}

fn invalid(parameter: &str, value: &str, message: &str) -> Error {
    Error::InvalidParameter {
        parameter: parameter.to_string(),
        value: value.to_string(),
        message: message.to_string(),
        suggestions: vec![],
    }
}
