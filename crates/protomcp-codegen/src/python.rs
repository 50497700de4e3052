//! Python naming and typing utilities.
//!
//! Pure functions over canonical name strings and field models, fully
//! decoupled from descriptor traversal so they stay independently testable.
//!
//! # Examples
//!
//! ```
//! use protomcp_codegen::python;
//! use protomcp_core::NameCase;
//!
//! assert_eq!(python::camel_to_snake("GetUserData"), "get_user_data");
//! assert_eq!(python::convert_tool_name("GetUser", NameCase::Kebab), "get-user");
//! ```

use protomcp_core::NameCase;

use crate::model::{Cardinality, ElementType, FieldModel, ScalarKind, WellKnownKind};

/// Python keywords that cannot be used as identifiers.
const PYTHON_KEYWORDS: &[&str] = &[
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class", "continue",
    "def", "del", "elif", "else", "except", "finally", "for", "from", "global", "if", "import",
    "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return", "try", "while",
    "with", "yield",
];

/// Converts CamelCase to snake_case.
///
/// # Examples
///
/// ```
/// use protomcp_codegen::python::camel_to_snake;
///
/// assert_eq!(camel_to_snake("DoSomething"), "do_something");
/// assert_eq!(camel_to_snake("getHTTP"), "get_h_t_t_p");
/// assert_eq!(camel_to_snake("simple"), "simple");
/// ```
#[must_use]
pub fn camel_to_snake(name: &str) -> String {
    let mut result = String::with_capacity(name.len() + 4);
    for (i, ch) in name.chars().enumerate() {
        if ch.is_uppercase() && i > 0 {
            result.push('_');
        }
        result.extend(ch.to_lowercase());
    }
    result
}

/// Converts a method name to the configured tool name case.
///
/// # Examples
///
/// ```
/// use protomcp_codegen::python::convert_tool_name;
/// use protomcp_core::NameCase;
///
/// assert_eq!(convert_tool_name("DoSomething", NameCase::Snake), "do_something");
/// assert_eq!(convert_tool_name("DoSomething", NameCase::Camel), "doSomething");
/// assert_eq!(convert_tool_name("DoSomething", NameCase::Pascal), "DoSomething");
/// assert_eq!(convert_tool_name("DoSomething", NameCase::Kebab), "do-something");
/// ```
#[must_use]
pub fn convert_tool_name(method_name: &str, case: NameCase) -> String {
    match case {
        NameCase::Snake => camel_to_snake(method_name),
        NameCase::Camel => {
            let mut chars = method_name.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_lowercase().chain(chars).collect()
            })
        }
        NameCase::Pascal => method_name.to_string(),
        NameCase::Kebab => camel_to_snake(method_name).replace('_', "-"),
    }
}

/// Substitutes the `{service}` placeholder in a naming pattern.
///
/// # Examples
///
/// ```
/// use protomcp_codegen::python::apply_service_pattern;
///
/// assert_eq!(
///     apply_service_pattern("create_{service}_server", "orderservice"),
///     "create_orderservice_server"
/// );
/// ```
#[must_use]
pub fn apply_service_pattern(pattern: &str, service: &str) -> String {
    pattern.replace("{service}", service)
}

/// Returns `true` when a name collides with a Python keyword.
#[must_use]
pub fn is_keyword(name: &str) -> bool {
    PYTHON_KEYWORDS.contains(&name)
}

/// Makes a name safe to use as a Python identifier.
///
/// Keywords get a trailing underscore; other names pass through.
///
/// # Examples
///
/// ```
/// use protomcp_codegen::python::sanitize_identifier;
///
/// assert_eq!(sanitize_identifier("import"), "import_");
/// assert_eq!(sanitize_identifier("name"), "name");
/// ```
#[must_use]
pub fn sanitize_identifier(name: &str) -> String {
    if PYTHON_KEYWORDS.contains(&name) {
        format!("{name}_")
    } else {
        name.to_string()
    }
}

/// Python type for a scalar kind. Width and signedness collapse onto the
/// host integer and float types.
#[must_use]
pub const fn scalar_annotation(kind: ScalarKind) -> &'static str {
    match kind {
        ScalarKind::Double | ScalarKind::Float => "float",
        ScalarKind::Int32
        | ScalarKind::Int64
        | ScalarKind::UInt32
        | ScalarKind::UInt64
        | ScalarKind::SInt32
        | ScalarKind::SInt64
        | ScalarKind::Fixed32
        | ScalarKind::Fixed64
        | ScalarKind::SFixed32
        | ScalarKind::SFixed64 => "int",
        ScalarKind::Bool => "bool",
        ScalarKind::String => "str",
        ScalarKind::Bytes => "bytes",
    }
}

/// Python type for a well-known kind.
#[must_use]
pub const fn well_known_annotation(kind: WellKnownKind) -> &'static str {
    match kind {
        WellKnownKind::Timestamp | WellKnownKind::Duration => "str",
        WellKnownKind::Empty => "None",
        WellKnownKind::Any | WellKnownKind::Struct => "dict",
        WellKnownKind::Value => "Any",
        WellKnownKind::ListValue => "List[Any]",
        WellKnownKind::BoolValue => "bool",
        WellKnownKind::BytesValue => "bytes",
        WellKnownKind::DoubleValue | WellKnownKind::FloatValue => "float",
        WellKnownKind::Int32Value
        | WellKnownKind::Int64Value
        | WellKnownKind::UInt32Value
        | WellKnownKind::UInt64Value => "int",
        WellKnownKind::StringValue => "str",
    }
}

/// Python type for a resolved element.
#[must_use]
pub fn element_annotation(element: &ElementType, accept_enum_names: bool) -> String {
    match element {
        ElementType::Scalar(kind) => scalar_annotation(*kind).to_string(),
        ElementType::Enum(_) => {
            if accept_enum_names {
                "Union[int, str]".to_string()
            } else {
                "int".to_string()
            }
        }
        ElementType::Message(_) => "dict".to_string(),
        ElementType::WellKnown(kind) => well_known_annotation(*kind).to_string(),
        ElementType::Map { key, value } => format!(
            "Dict[{}, {}]",
            scalar_annotation(*key),
            element_annotation(value, accept_enum_names)
        ),
    }
}

/// Full Python annotation for a field parameter, cardinality included.
///
/// Optional and oneof-member parameters wrap in `Optional[...]` so they can
/// default to absent.
#[must_use]
pub fn parameter_annotation(field: &FieldModel, accept_enum_names: bool) -> String {
    let base = match field.cardinality {
        Cardinality::Repeated => format!(
            "List[{}]",
            element_annotation(&field.element, accept_enum_names)
        ),
        _ => element_annotation(&field.element, accept_enum_names),
    };

    if field.is_conditional() {
        format!("Optional[{base}]")
    } else {
        base
    }
}

/// Names from `typing` referenced by an annotation string.
#[must_use]
pub fn typing_names(annotation: &str) -> Vec<&'static str> {
    let mut names = Vec::new();
    for name in ["Any", "Dict", "List", "Optional", "Union"] {
        if annotation.contains(name) {
            names.push(name);
        }
    }
    names
}

/// Quotes a string as a Python literal.
///
/// # Examples
///
/// ```
/// use protomcp_codegen::python::str_literal;
///
/// assert_eq!(str_literal("plain"), "\"plain\"");
/// assert_eq!(str_literal("say \"hi\""), "\"say \\\"hi\\\"\"");
/// ```
#[must_use]
pub fn str_literal(value: &str) -> String {
    let mut result = String::with_capacity(value.len() + 2);
    result.push('"');
    for ch in value.chars() {
        match ch {
            '\\' => result.push_str("\\\\"),
            '"' => result.push_str("\\\""),
            '\n' => result.push_str("\\n"),
            '\t' => result.push_str("\\t"),
            '\r' => result.push_str("\\r"),
            other => result.push(other),
        }
    }
    result.push('"');
    result
}

/// Python module import path for a proto file.
///
/// `shop/orders.proto` with suffix `_pb2` becomes
/// `("shop", "orders_pb2")`; a file without directories has no package part.
#[must_use]
pub fn module_for_proto(proto_path: &str, suffix: &str) -> (Option<String>, String) {
    let stem = proto_path.strip_suffix(".proto").unwrap_or(proto_path);
    match stem.rsplit_once('/') {
        Some((dir, base)) => (Some(dir.replace('/', ".")), format!("{base}{suffix}")),
        None => (None, format!("{stem}{suffix}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Presence, ProtoTypeRef, TypeKind};

    fn scalar_field(cardinality: Cardinality, presence: Presence, kind: ScalarKind) -> FieldModel {
        FieldModel {
            name: "f".to_string(),
            number: 1,
            cardinality,
            element: ElementType::Scalar(kind),
            presence,
            oneof: None,
            comment: None,
        }
    }

    #[test]
    fn camel_to_snake_cases() {
        for (input, expected) in [
            ("DoSomething", "do_something"),
            ("GetUserData", "get_user_data"),
            ("simple", "simple"),
            ("A", "a"),
            ("", ""),
        ] {
            assert_eq!(camel_to_snake(input), expected);
        }
    }

    #[test]
    fn tool_name_cases() {
        assert_eq!(convert_tool_name("GetUser", NameCase::Snake), "get_user");
        assert_eq!(convert_tool_name("GetUser", NameCase::Camel), "getUser");
        assert_eq!(convert_tool_name("GetUser", NameCase::Pascal), "GetUser");
        assert_eq!(convert_tool_name("GetUser", NameCase::Kebab), "get-user");
        assert_eq!(convert_tool_name("", NameCase::Camel), "");
    }

    #[test]
    fn service_pattern_substitution() {
        assert_eq!(apply_service_pattern("{service}", "Vibe"), "Vibe");
        assert_eq!(
            apply_service_pattern("My{service}Server", "Vibe"),
            "MyVibeServer"
        );
        assert_eq!(apply_service_pattern("fixed", "Vibe"), "fixed");
    }

    #[test]
    fn keyword_parameters_get_suffixed() {
        assert_eq!(sanitize_identifier("class"), "class_");
        assert_eq!(sanitize_identifier("lambda"), "lambda_");
        assert_eq!(sanitize_identifier("order_id"), "order_id");
    }

    #[test]
    fn scalar_annotations_collapse_widths() {
        assert_eq!(scalar_annotation(ScalarKind::Int32), "int");
        assert_eq!(scalar_annotation(ScalarKind::UInt64), "int");
        assert_eq!(scalar_annotation(ScalarKind::SFixed32), "int");
        assert_eq!(scalar_annotation(ScalarKind::Double), "float");
        assert_eq!(scalar_annotation(ScalarKind::String), "str");
        assert_eq!(scalar_annotation(ScalarKind::Bytes), "bytes");
        assert_eq!(scalar_annotation(ScalarKind::Bool), "bool");
    }

    #[test]
    fn parameter_annotations() {
        let field = scalar_field(Cardinality::Singular, Presence::Required, ScalarKind::String);
        assert_eq!(parameter_annotation(&field, false), "str");

        let field = scalar_field(
            Cardinality::Optional,
            Presence::ExplicitOptional,
            ScalarKind::String,
        );
        assert_eq!(parameter_annotation(&field, false), "Optional[str]");

        let field = scalar_field(
            Cardinality::Repeated,
            Presence::CollectionDefault,
            ScalarKind::Int32,
        );
        assert_eq!(parameter_annotation(&field, false), "List[int]");
    }

    #[test]
    fn map_annotation() {
        let field = FieldModel {
            name: "attrs".to_string(),
            number: 1,
            cardinality: Cardinality::Map,
            element: ElementType::Map {
                key: ScalarKind::String,
                value: Box::new(ElementType::Scalar(ScalarKind::Int64)),
            },
            presence: Presence::CollectionDefault,
            oneof: None,
            comment: None,
        };
        assert_eq!(parameter_annotation(&field, false), "Dict[str, int]");
    }

    #[test]
    fn enum_annotation_widens_with_names() {
        let enum_ref = ProtoTypeRef {
            full_name: ".shop.Status".to_string(),
            kind: TypeKind::Enum,
            file: "shop.proto".to_string(),
            package: "shop".to_string(),
        };
        let field = FieldModel {
            name: "status".to_string(),
            number: 1,
            cardinality: Cardinality::Singular,
            element: ElementType::Enum(enum_ref),
            presence: Presence::Required,
            oneof: None,
            comment: None,
        };
        assert_eq!(parameter_annotation(&field, false), "int");
        assert_eq!(parameter_annotation(&field, true), "Union[int, str]");
    }

    #[test]
    fn typing_name_scan() {
        assert_eq!(typing_names("str"), Vec::<&str>::new());
        assert_eq!(typing_names("Optional[str]"), vec!["Optional"]);
        assert_eq!(typing_names("Dict[str, List[Any]]"), vec!["Any", "Dict", "List"]);
    }

    #[test]
    fn module_paths() {
        assert_eq!(
            module_for_proto("shop/orders.proto", "_pb2"),
            (Some("shop".to_string()), "orders_pb2".to_string())
        );
        assert_eq!(
            module_for_proto("a/b/c.proto", "_pb2_grpc"),
            (Some("a.b".to_string()), "c_pb2_grpc".to_string())
        );
        assert_eq!(
            module_for_proto("orders.proto", "_pb2"),
            (None, "orders_pb2".to_string())
        );
    }

    #[test]
    fn str_literal_escapes() {
        assert_eq!(str_literal("a\nb"), "\"a\\nb\"");
        assert_eq!(str_literal("back\\slash"), "\"back\\\\slash\"");
    }
}
