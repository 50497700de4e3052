//! Parameter validation using declarative rules.
//!
//! Every recognized plugin parameter with a constrained value space has one
//! [`ValidationRule`] entry: a predicate, an error message, and example valid
//! assignments. The whole table is evaluated uniformly over the supplied
//! parameters, so adding a parameter means adding a row, not control flow.

use crate::Error;

/// A single validation rule for one parameter.
#[derive(Debug, Clone, Copy)]
pub struct ValidationRule {
    /// Parameter name this rule applies to
    pub parameter: &'static str,
    /// Accepts the raw value; `false` rejects it
    pub predicate: fn(&str) -> bool,
    /// Error message shown when the predicate rejects
    pub message: &'static str,
    /// Example valid assignments, e.g. `timeout=30`
    pub suggestions: &'static [&'static str],
    /// Optional extra check that produces a warning on otherwise valid values
    pub warning: Option<WarningRule>,
}

/// A warning threshold attached to a rule.
#[derive(Debug, Clone, Copy)]
pub struct WarningRule {
    /// Fires the warning when `true` for a valid value
    pub predicate: fn(&str) -> bool,
    /// Warning text
    pub message: &'static str,
}

/// A validation failure for one parameter.
#[derive(Debug, Clone)]
pub struct ParameterError {
    /// Name of the rejected parameter
    pub parameter: String,
    /// The offending value
    pub value: String,
    /// Why it was rejected
    pub message: String,
    /// Example valid assignments
    pub suggestions: Vec<String>,
}

impl From<ParameterError> for Error {
    fn from(err: ParameterError) -> Self {
        Self::InvalidParameter {
            parameter: err.parameter,
            value: err.value,
            message: err.message,
            suggestions: err.suggestions,
        }
    }
}

/// Outcome of validating one parameter set.
#[derive(Debug, Default)]
pub struct ValidationReport {
    /// Fatal failures; any entry aborts the run
    pub errors: Vec<ParameterError>,
    /// Non-fatal findings
    pub warnings: Vec<String>,
}

impl ValidationReport {
    /// Returns `true` when no rule rejected its value.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

fn is_name_case(value: &str) -> bool {
    matches!(
        value.to_lowercase().as_str(),
        "snake" | "camel" | "pascal" | "kebab"
    )
}

fn is_error_format(value: &str) -> bool {
    matches!(
        value.to_lowercase().as_str(),
        "standard" | "simple" | "detailed"
    )
}

fn is_stream_mode(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "collect" | "skip" | "warn")
}

fn is_debug_value(value: &str) -> bool {
    matches!(
        value.to_lowercase().as_str(),
        "" | "true" | "1" | "yes" | "false" | "0" | "no" | "none" | "basic" | "verbose" | "trace"
    )
}

fn is_positive_seconds(value: &str) -> bool {
    value.parse::<u32>().is_ok_and(|v| v > 0)
}

fn is_high_timeout(value: &str) -> bool {
    value.parse::<u32>().is_ok_and(|v| v > 300)
}

fn is_host_port(value: &str) -> bool {
    let mut parts = value.splitn(2, ':');
    let host = parts.next().unwrap_or("");
    let Some(port) = parts.next() else {
        return false;
    };
    !host.trim().is_empty() && !port.trim().is_empty()
}

fn ends_with_py(value: &str) -> bool {
    value.ends_with(".py")
}

fn has_service_placeholder(value: &str) -> bool {
    value.contains("{service}")
}

static RULES: &[ValidationRule] = &[
    ValidationRule {
        parameter: "tool_name_case",
        predicate: is_name_case,
        message: "must be one of: snake, camel, pascal, kebab",
        suggestions: &["tool_name_case=snake"],
        warning: None,
    },
    ValidationRule {
        parameter: "error_format",
        predicate: is_error_format,
        message: "must be one of: standard, simple, detailed",
        suggestions: &["error_format=standard"],
        warning: None,
    },
    ValidationRule {
        parameter: "stream_mode",
        predicate: is_stream_mode,
        message: "must be one of: collect, skip, warn",
        suggestions: &["stream_mode=collect"],
        warning: None,
    },
    ValidationRule {
        parameter: "debug",
        predicate: is_debug_value,
        message: "must be one of: true, false, basic, verbose, trace",
        suggestions: &["debug=basic", "debug=verbose"],
        warning: None,
    },
    ValidationRule {
        parameter: "timeout",
        predicate: is_positive_seconds,
        message: "must be a positive integer number of seconds",
        suggestions: &["timeout=30", "timeout=60"],
        warning: Some(WarningRule {
            predicate: is_high_timeout,
            message: "timeout is very high (over 5 minutes); consider a lower value",
        }),
    },
    ValidationRule {
        parameter: "grpc_target",
        predicate: is_host_port,
        message: "must be in 'host:port' form",
        suggestions: &["grpc_target=localhost:50051", "grpc_target=api.example.com:443"],
        warning: None,
    },
    ValidationRule {
        parameter: "output_suffix",
        predicate: ends_with_py,
        message: "must end with '.py'",
        suggestions: &["output_suffix=_mcp_server.py"],
        warning: None,
    },
    ValidationRule {
        parameter: "server_name_pattern",
        predicate: has_service_placeholder,
        message: "must contain the '{service}' placeholder",
        suggestions: &["server_name_pattern=My{service}Server"],
        warning: None,
    },
    ValidationRule {
        parameter: "function_name_pattern",
        predicate: has_service_placeholder,
        message: "must contain the '{service}' placeholder",
        suggestions: &["function_name_pattern=create_{service}_server"],
        warning: None,
    },
];

/// The built-in rule table.
#[must_use]
pub fn rules() -> &'static [ValidationRule] {
    RULES
}

/// Validates supplied parameters against the rule table.
///
/// Parameters without a matching rule are not this module's concern and pass
/// through untouched.
///
/// # Examples
///
/// ```
/// use protomcp_core::validation;
///
/// let report = validation::validate([("stream_mode", "collect"), ("timeout", "45")]);
/// assert!(report.is_valid());
///
/// let report = validation::validate([("stream_mode", "buffer")]);
/// assert!(!report.is_valid());
/// assert_eq!(report.errors[0].parameter, "stream_mode");
/// ```
pub fn validate<'a>(parameters: impl IntoIterator<Item = (&'a str, &'a str)>) -> ValidationReport {
    let mut report = ValidationReport::default();

    for (name, value) in parameters {
        let Some(rule) = RULES.iter().find(|r| r.parameter == name) else {
            continue;
        };

        if !(rule.predicate)(value) {
            report.errors.push(ParameterError {
                parameter: name.to_string(),
                value: value.to_string(),
                message: rule.message.to_string(),
                suggestions: rule.suggestions.iter().map(ToString::to_string).collect(),
            });
        } else if let Some(warning) = rule.warning {
            if (warning.predicate)(value) {
                report
                    .warnings
                    .push(format!("{name}={value}: {}", warning.message));
            }
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_defaults_for_every_rule() {
        let report = validate([
            ("tool_name_case", "snake"),
            ("error_format", "standard"),
            ("stream_mode", "collect"),
            ("debug", "verbose"),
            ("timeout", "30"),
            ("grpc_target", "localhost:50051"),
            ("output_suffix", "_pb2_mcp.py"),
            ("server_name_pattern", "{service}"),
            ("function_name_pattern", "create_{service}_server"),
        ]);
        assert!(report.is_valid(), "errors: {:?}", report.errors);
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn rejects_bad_enumerated_values() {
        for (name, value) in [
            ("tool_name_case", "upper"),
            ("error_format", "fancy"),
            ("stream_mode", "buffer"),
            ("debug", "loud"),
        ] {
            let report = validate([(name, value)]);
            assert_eq!(report.errors.len(), 1, "{name} should reject {value}");
            let err = &report.errors[0];
            assert_eq!(err.parameter, name);
            assert_eq!(err.value, value);
            assert!(!err.suggestions.is_empty());
        }
    }

    #[test]
    fn enumerated_values_are_case_insensitive() {
        assert!(validate([("tool_name_case", "Snake")]).is_valid());
        assert!(validate([("stream_mode", "COLLECT")]).is_valid());
    }

    #[test]
    fn timeout_rules() {
        assert!(validate([("timeout", "1")]).is_valid());
        assert!(!validate([("timeout", "0")]).is_valid());
        assert!(!validate([("timeout", "-5")]).is_valid());
        assert!(!validate([("timeout", "soon")]).is_valid());

        let report = validate([("timeout", "600")]);
        assert!(report.is_valid());
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].contains("timeout=600"));
    }

    #[test]
    fn grpc_target_requires_host_and_port() {
        assert!(validate([("grpc_target", "localhost:50051")]).is_valid());
        assert!(!validate([("grpc_target", "localhost")]).is_valid());
        assert!(!validate([("grpc_target", ":50051")]).is_valid());
        assert!(!validate([("grpc_target", "localhost:")]).is_valid());
    }

    #[test]
    fn patterns_require_placeholder() {
        assert!(validate([("server_name_pattern", "My{service}Server")]).is_valid());
        assert!(!validate([("server_name_pattern", "MyServer")]).is_valid());
        assert!(!validate([("function_name_pattern", "create_server")]).is_valid());
    }

    #[test]
    fn output_suffix_must_be_python() {
        assert!(validate([("output_suffix", "_tools.py")]).is_valid());
        assert!(!validate([("output_suffix", "_tools.ts")]).is_valid());
    }

    #[test]
    fn unknown_parameters_pass_through() {
        let report = validate([("totally_unknown", "whatever")]);
        assert!(report.is_valid());
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn parameter_error_converts_to_configuration_error() {
        let report = validate([("stream_mode", "buffer")]);
        let err: crate::Error = report.errors[0].clone().into();
        assert!(err.is_configuration_error());
    }
}
