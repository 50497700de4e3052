//! Canonical type models derived from raw descriptors.
//!
//! Everything in this module is immutable once built: the analyzer derives
//! models fresh per invocation and the generator only reads them.

use serde::Serialize;

/// Whether a type reference names a message or an enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    /// A message type.
    Message,
    /// An enum type.
    Enum,
}

/// A resolved reference to a named proto type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtoTypeRef {
    /// Dot-prefixed fully qualified name, e.g. `.shop.OrderRequest`.
    pub full_name: String,
    /// Message or enum.
    pub kind: TypeKind,
    /// Proto file the type is declared in.
    pub file: String,
    /// Package of the declaring file, possibly empty.
    pub package: String,
}

impl ProtoTypeRef {
    /// The name relative to its package, dots preserved for nesting,
    /// e.g. `Outer.Inner` for `.shop.Outer.Inner` in package `shop`.
    #[must_use]
    pub fn relative_name(&self) -> &str {
        let stripped = self.full_name.trim_start_matches('.');
        if self.package.is_empty() {
            return stripped;
        }
        // Only strip the package at a dot boundary.
        stripped
            .strip_prefix(self.package.as_str())
            .and_then(|rest| rest.strip_prefix('.'))
            .unwrap_or(stripped)
    }

    /// Last path segment of the fully qualified name.
    #[must_use]
    pub fn simple_name(&self) -> &str {
        self.full_name.rsplit('.').next().unwrap_or(&self.full_name)
    }
}

/// Protobuf scalar kinds, width and signedness preserved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    /// 64-bit float
    Double,
    /// 32-bit float
    Float,
    /// varint signed 32-bit
    Int32,
    /// varint signed 64-bit
    Int64,
    /// varint unsigned 32-bit
    UInt32,
    /// varint unsigned 64-bit
    UInt64,
    /// zigzag signed 32-bit
    SInt32,
    /// zigzag signed 64-bit
    SInt64,
    /// fixed unsigned 32-bit
    Fixed32,
    /// fixed unsigned 64-bit
    Fixed64,
    /// fixed signed 32-bit
    SFixed32,
    /// fixed signed 64-bit
    SFixed64,
    /// boolean
    Bool,
    /// UTF-8 string
    String,
    /// byte string
    Bytes,
}

/// The curated set of well-known types with distinguished representations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WellKnownKind {
    /// `google.protobuf.Timestamp`, surfaced as an ISO 8601 string.
    Timestamp,
    /// `google.protobuf.Duration`, surfaced as a duration string.
    Duration,
    /// `google.protobuf.Empty`, no payload at all.
    Empty,
    /// `google.protobuf.Any`, surfaced as a dict.
    Any,
    /// `google.protobuf.Struct`, surfaced as a dict.
    Struct,
    /// `google.protobuf.Value`, an arbitrary JSON value.
    Value,
    /// `google.protobuf.ListValue`, a JSON array.
    ListValue,
    /// `google.protobuf.BoolValue` wrapper.
    BoolValue,
    /// `google.protobuf.BytesValue` wrapper.
    BytesValue,
    /// `google.protobuf.DoubleValue` wrapper.
    DoubleValue,
    /// `google.protobuf.FloatValue` wrapper.
    FloatValue,
    /// `google.protobuf.Int32Value` wrapper.
    Int32Value,
    /// `google.protobuf.Int64Value` wrapper.
    Int64Value,
    /// `google.protobuf.StringValue` wrapper.
    StringValue,
    /// `google.protobuf.UInt32Value` wrapper.
    UInt32Value,
    /// `google.protobuf.UInt64Value` wrapper.
    UInt64Value,
}

impl WellKnownKind {
    /// Maps a fully qualified type name onto a well-known kind.
    #[must_use]
    pub fn from_type_name(name: &str) -> Option<Self> {
        Some(match name {
            ".google.protobuf.Timestamp" => Self::Timestamp,
            ".google.protobuf.Duration" => Self::Duration,
            ".google.protobuf.Empty" => Self::Empty,
            ".google.protobuf.Any" => Self::Any,
            ".google.protobuf.Struct" => Self::Struct,
            ".google.protobuf.Value" => Self::Value,
            ".google.protobuf.ListValue" => Self::ListValue,
            ".google.protobuf.BoolValue" => Self::BoolValue,
            ".google.protobuf.BytesValue" => Self::BytesValue,
            ".google.protobuf.DoubleValue" => Self::DoubleValue,
            ".google.protobuf.FloatValue" => Self::FloatValue,
            ".google.protobuf.Int32Value" => Self::Int32Value,
            ".google.protobuf.Int64Value" => Self::Int64Value,
            ".google.protobuf.StringValue" => Self::StringValue,
            ".google.protobuf.UInt32Value" => Self::UInt32Value,
            ".google.protobuf.UInt64Value" => Self::UInt64Value,
            _ => return None,
        })
    }

    /// Returns `true` for the scalar wrapper types.
    #[must_use]
    pub const fn is_wrapper(&self) -> bool {
        matches!(
            self,
            Self::BoolValue
                | Self::BytesValue
                | Self::DoubleValue
                | Self::FloatValue
                | Self::Int32Value
                | Self::Int64Value
                | Self::StringValue
                | Self::UInt32Value
                | Self::UInt64Value
        )
    }
}

/// Resolved element type of a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementType {
    /// A protobuf scalar.
    Scalar(ScalarKind),
    /// An enum, integer-backed in generated code.
    Enum(ProtoTypeRef),
    /// A message, dict-shaped in generated code.
    Message(ProtoTypeRef),
    /// One of the curated well-known types.
    WellKnown(WellKnownKind),
    /// A map entry, key scalar plus recursively resolved value.
    ///
    /// The value may be a message or an enum but never another map.
    Map {
        /// Key scalar kind.
        key: ScalarKind,
        /// Resolved value type.
        value: Box<ElementType>,
    },
}

/// How many values a field carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    /// Exactly one value.
    Singular,
    /// Zero or one value with explicit presence tracking.
    Optional,
    /// A sequence of values.
    Repeated,
    /// A keyed collection, structurally detected.
    Map,
}

/// Presence policy of a parameter in the generated signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    /// Must be supplied by the caller.
    Required,
    /// Defaults to absent and is only written to the wire when provided.
    ExplicitOptional,
    /// Collections default to empty.
    CollectionDefault,
}

/// Membership of a field in a real (non-synthetic) oneof group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OneofGroup {
    /// Declared group name.
    pub name: String,
    /// Declaration index of the group within its message.
    pub index: i32,
    /// Names of the other members of the group, descriptor order.
    pub siblings: Vec<String>,
}

/// Canonical classification of one input field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldModel {
    /// Field name as declared.
    pub name: String,
    /// Field number on the wire.
    pub number: i32,
    /// Value count shape.
    pub cardinality: Cardinality,
    /// Resolved element type.
    pub element: ElementType,
    /// Presence policy of the generated parameter.
    pub presence: Presence,
    /// Real oneof membership; a synthetic presence wrapper is never recorded.
    pub oneof: Option<OneofGroup>,
    /// Leading comment attached to the field declaration.
    pub comment: Option<String>,
}

impl FieldModel {
    /// Returns `true` when the generated parameter has no default.
    #[must_use]
    pub fn is_required(&self) -> bool {
        self.presence == Presence::Required
    }

    /// Returns `true` when the parameter defaults to `None` and its value is
    /// only assigned into the request when provided.
    #[must_use]
    pub fn is_conditional(&self) -> bool {
        self.presence == Presence::ExplicitOptional
    }
}

/// Streaming shape of an RPC method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Streaming {
    /// Single request, single response.
    Unary,
    /// Single request, streamed responses.
    ServerStreaming,
    /// Streamed requests, single response.
    ClientStreaming,
    /// Streamed both ways.
    Bidi,
}

impl Streaming {
    /// Returns `true` unless the method is unary.
    #[must_use]
    pub const fn is_streaming(&self) -> bool {
        !matches!(self, Self::Unary)
    }

    /// Returns `true` when responses arrive as a stream.
    #[must_use]
    pub const fn server_streams(&self) -> bool {
        matches!(self, Self::ServerStreaming | Self::Bidi)
    }

    /// Returns `true` when requests are sent as a stream.
    #[must_use]
    pub const fn client_streams(&self) -> bool {
        matches!(self, Self::ClientStreaming | Self::Bidi)
    }
}

/// One RPC method, fields ordered required-first.
#[derive(Debug, Clone)]
pub struct MethodModel {
    /// Method name as declared.
    pub name: String,
    /// Request message type.
    pub input_type: ProtoTypeRef,
    /// Response message type.
    pub output_type: ProtoTypeRef,
    /// Classified input fields in generated-parameter order.
    pub fields: Vec<FieldModel>,
    /// Streaming shape.
    pub streaming: Streaming,
    /// Leading comment attached to the method declaration.
    pub comment: Option<String>,
}

/// One service with its methods in declaration order.
#[derive(Debug, Clone)]
pub struct ServiceModel {
    /// Service name as declared.
    pub name: String,
    /// Methods in declaration order.
    pub methods: Vec<MethodModel>,
    /// Leading comment attached to the service declaration.
    pub comment: Option<String>,
}

/// A single generated file with its virtual path and full content.
#[derive(Debug, Clone, Serialize)]
pub struct GeneratedFile {
    /// Virtual path reported to the host compiler.
    pub path: String,
    /// Full file content.
    pub content: String,
}

/// All files produced by one invocation.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GeneratedCode {
    /// Generated files in input order.
    pub files: Vec<GeneratedFile>,
}

impl GeneratedCode {
    /// Creates an empty container.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a generated file.
    pub fn add_file(&mut self, file: GeneratedFile) {
        self.files.push(file);
    }

    /// Number of generated files.
    #[must_use]
    pub fn file_count(&self) -> usize {
        self.files.len()
    }
}
