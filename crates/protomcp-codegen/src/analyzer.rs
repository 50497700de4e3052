//! Field classification against the descriptor index.
//!
//! The analyzer turns raw field descriptors into canonical [`FieldModel`]s:
//! cardinality, resolved element type, presence policy, and real oneof
//! membership. Classification is pure and deterministic; the same descriptor
//! always yields the same model.
//!
//! Two failure scopes exist. A type reference that the index cannot resolve
//! is fatal for the file being generated ([`protomcp_core::Error::TypeResolution`]).
//! A construct the model cannot express, such as a proto2 group field, only
//! skips the enclosing method and surfaces as [`MethodOutcome::Unsupported`].

use prost_types::field_descriptor_proto::{Label, Type};
use prost_types::{DescriptorProto, FieldDescriptorProto, MethodDescriptorProto, ServiceDescriptorProto};
use protomcp_core::{Error, Result};

use crate::index::{DescriptorIndex, IndexedMessage};
use crate::model::{
    Cardinality, ElementType, FieldModel, MethodModel, OneofGroup, Presence, ProtoTypeRef,
    ScalarKind, ServiceModel, Streaming, TypeKind, WellKnownKind,
};

// Source location path components for services and methods.
const FILE_SERVICE: i32 = 6;
const SERVICE_METHOD: i32 = 2;
const MESSAGE_FIELD: i32 = 2;

/// Classifies fields and methods against a read-only [`DescriptorIndex`].
#[derive(Debug)]
pub struct TypeAnalyzer<'a> {
    index: &'a DescriptorIndex,
    show_type_details: bool,
}

/// A method that could not be modeled, with the reason recorded.
#[derive(Debug, Clone)]
pub struct SkippedMethod {
    /// Method name as declared.
    pub method: String,
    /// Why the method was skipped.
    pub reason: String,
}

/// Result of analyzing one service.
#[derive(Debug)]
pub struct ServiceAnalysis {
    /// The service model with every classifiable method.
    pub model: ServiceModel,
    /// Methods dropped because a field was unclassifiable.
    pub skipped: Vec<SkippedMethod>,
}

/// Result of analyzing one method.
#[derive(Debug)]
pub enum MethodOutcome {
    /// The method was fully classified.
    Tool(MethodModel),
    /// The method cannot be expressed and must be skipped.
    Unsupported {
        /// Why the method cannot be generated.
        reason: String,
    },
}

/// Field-level failure, split by scope.
enum FieldFailure {
    /// Unresolvable type reference; fatal for the whole file.
    Resolution(Box<Error>),
    /// Inexpressible construct; skips the enclosing method.
    Unsupported(String),
}

type FieldResult<T> = std::result::Result<T, FieldFailure>;

impl<'a> TypeAnalyzer<'a> {
    /// Creates an analyzer over a built index.
    #[must_use]
    pub fn new(index: &'a DescriptorIndex) -> Self {
        Self {
            index,
            show_type_details: false,
        }
    }

    /// Enables per-field classification logging.
    #[must_use]
    pub fn with_type_details(mut self, enabled: bool) -> Self {
        self.show_type_details = enabled;
        self
    }

    /// Analyzes one service declaration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TypeResolution`] when any referenced type is absent
    /// from the index; the caller aborts the enclosing file.
    pub fn analyze_service(
        &self,
        service: &ServiceDescriptorProto,
        generated_file: &str,
        service_index: usize,
    ) -> Result<ServiceAnalysis> {
        let service_path = [FILE_SERVICE, index_component(service_index)];
        let comment = self
            .index
            .comment(generated_file, &service_path)
            .map(ToString::to_string);

        let mut methods = Vec::new();
        let mut skipped = Vec::new();

        for (method_index, method) in service.method.iter().enumerate() {
            let outcome = self.analyze_method(
                method,
                service.name(),
                generated_file,
                service_index,
                method_index,
            )?;
            match outcome {
                MethodOutcome::Tool(model) => methods.push(model),
                MethodOutcome::Unsupported { reason } => {
                    skipped.push(SkippedMethod {
                        method: method.name().to_string(),
                        reason,
                    });
                }
            }
        }

        Ok(ServiceAnalysis {
            model: ServiceModel {
                name: service.name().to_string(),
                methods,
                comment,
            },
            skipped,
        })
    }

    /// Analyzes one method declaration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TypeResolution`] when the input type, the output
    /// type, or any input field type cannot be resolved.
    pub fn analyze_method(
        &self,
        method: &MethodDescriptorProto,
        service_name: &str,
        generated_file: &str,
        service_index: usize,
        method_index: usize,
    ) -> Result<MethodOutcome> {
        let input = self.index.resolve_message(method.input_type()).ok_or_else(|| {
            method_resolution_error(method.input_type(), service_name, method.name(), generated_file)
        })?;
        let input_ref = message_type_ref(method.input_type(), input);

        let output = self.index.resolve_message(method.output_type()).ok_or_else(|| {
            method_resolution_error(method.output_type(), service_name, method.name(), generated_file)
        })?;
        let output_ref = message_type_ref(method.output_type(), output);

        let fields = match self.input_fields(input, method.input_type(), generated_file) {
            Ok(fields) => fields,
            Err(FieldFailure::Resolution(error)) => return Err(*error),
            Err(FieldFailure::Unsupported(reason)) => {
                return Ok(MethodOutcome::Unsupported { reason });
            }
        };

        let method_path = [
            FILE_SERVICE,
            index_component(service_index),
            SERVICE_METHOD,
            index_component(method_index),
        ];
        let comment = self
            .index
            .comment(generated_file, &method_path)
            .map(ToString::to_string);

        let streaming = match (method.client_streaming(), method.server_streaming()) {
            (false, false) => Streaming::Unary,
            (false, true) => Streaming::ServerStreaming,
            (true, false) => Streaming::ClientStreaming,
            (true, true) => Streaming::Bidi,
        };

        if self.show_type_details {
            tracing::trace!(
                method = method.name(),
                fields = fields.len(),
                ?streaming,
                "analyzed method"
            );
        }

        Ok(MethodOutcome::Tool(MethodModel {
            name: method.name().to_string(),
            input_type: input_ref,
            output_type: output_ref,
            fields,
            streaming,
            comment,
        }))
    }

    /// Classifies every field of an input message, required parameters first.
    fn input_fields(
        &self,
        message: &IndexedMessage,
        message_name: &str,
        generated_file: &str,
    ) -> FieldResult<Vec<FieldModel>> {
        let real_oneofs = real_oneof_indices(&message.descriptor);

        let mut models = Vec::with_capacity(message.descriptor.field.len());
        for (field_index, field) in message.descriptor.field.iter().enumerate() {
            let model = self.classify_field(
                field,
                message,
                message_name,
                generated_file,
                &real_oneofs,
                field_index,
            )?;
            if self.show_type_details {
                tracing::trace!(
                    field = %model.name,
                    cardinality = ?model.cardinality,
                    presence = ?model.presence,
                    "classified field"
                );
            }
            models.push(model);
        }

        // Required parameters keep descriptor order and precede everything
        // that takes a default, so generated signatures stay valid.
        let (required, defaulted): (Vec<_>, Vec<_>) =
            models.into_iter().partition(FieldModel::is_required);
        let mut ordered = required;
        ordered.extend(defaulted);
        Ok(ordered)
    }

    fn classify_field(
        &self,
        field: &FieldDescriptorProto,
        message: &IndexedMessage,
        message_name: &str,
        generated_file: &str,
        real_oneofs: &[i32],
        field_index: usize,
    ) -> FieldResult<FieldModel> {
        if field.r#type() == Type::Group {
            return Err(FieldFailure::Unsupported(format!(
                "field '{}' of message '{message_name}' uses the proto2 group encoding",
                field.name()
            )));
        }

        let repeated = field.label() == Label::Repeated;

        // Maps are detected structurally through their auto-generated entry
        // type, never by name.
        if repeated && field.r#type() == Type::Message {
            let entry = self
                .index
                .resolve_message(field.type_name())
                .filter(|entry| {
                    entry
                        .descriptor
                        .options
                        .as_ref()
                        .is_some_and(|options| options.map_entry())
                })
                .map(|entry| entry.descriptor.clone());
            if let Some(entry) = entry {
                return self.classify_map(field, &entry, message, message_name, generated_file, field_index);
            }
        }

        let element = self.resolve_element(field, message_name, generated_file)?;

        let (cardinality, presence, oneof) = if repeated {
            (Cardinality::Repeated, Presence::CollectionDefault, None)
        } else if field.proto3_optional() {
            // Explicit presence marker; the synthetic wrapper oneof it sits
            // in is never surfaced.
            (Cardinality::Optional, Presence::ExplicitOptional, None)
        } else if let Some(group) =
            real_oneof_membership(field, &message.descriptor, real_oneofs)
        {
            (Cardinality::Singular, Presence::ExplicitOptional, Some(group))
        } else {
            (Cardinality::Singular, Presence::Required, None)
        };

        let mut comment_path = message.path.clone();
        comment_path.push(MESSAGE_FIELD);
        comment_path.push(index_component(field_index));
        let comment = self
            .index
            .comment(&message.file, &comment_path)
            .map(ToString::to_string);

        Ok(FieldModel {
            name: field.name().to_string(),
            number: field.number(),
            cardinality,
            element,
            presence,
            oneof,
            comment,
        })
    }

    fn classify_map(
        &self,
        field: &FieldDescriptorProto,
        entry: &DescriptorProto,
        message: &IndexedMessage,
        message_name: &str,
        generated_file: &str,
        field_index: usize,
    ) -> FieldResult<FieldModel> {
        // Entry layout is fixed: field number 1 is the key, 2 the value.
        let key_field = entry.field.iter().find(|f| f.number() == 1);
        let value_field = entry.field.iter().find(|f| f.number() == 2);
        let (Some(key_field), Some(value_field)) = (key_field, value_field) else {
            return Err(FieldFailure::Unsupported(format!(
                "map field '{}' of message '{message_name}' has a malformed entry type",
                field.name()
            )));
        };

        let Some(key) = scalar_kind(key_field.r#type()) else {
            return Err(FieldFailure::Unsupported(format!(
                "map field '{}' of message '{message_name}' has a non-scalar key",
                field.name()
            )));
        };

        if value_field.r#type() == Type::Message {
            if let Some(value_entry) = self.index.resolve_message(value_field.type_name()) {
                if value_entry
                    .descriptor
                    .options
                    .as_ref()
                    .is_some_and(|options| options.map_entry())
                {
                    return Err(FieldFailure::Unsupported(format!(
                        "map field '{}' of message '{message_name}' nests another map",
                        field.name()
                    )));
                }
            }
        }

        let value = self.resolve_element(value_field, message_name, generated_file)?;

        let mut comment_path = message.path.clone();
        comment_path.push(MESSAGE_FIELD);
        comment_path.push(index_component(field_index));
        let comment = self
            .index
            .comment(&message.file, &comment_path)
            .map(ToString::to_string);

        Ok(FieldModel {
            name: field.name().to_string(),
            number: field.number(),
            cardinality: Cardinality::Map,
            element: ElementType::Map {
                key,
                value: Box::new(value),
            },
            presence: Presence::CollectionDefault,
            oneof: None,
            comment,
        })
    }

    /// Resolves the element type of one field against the index.
    fn resolve_element(
        &self,
        field: &FieldDescriptorProto,
        message_name: &str,
        generated_file: &str,
    ) -> FieldResult<ElementType> {
        match field.r#type() {
            Type::Message => {
                let type_name = field.type_name();
                // Well-known types get distinguished representations instead
                // of generic message handling.
                if let Some(kind) = WellKnownKind::from_type_name(type_name) {
                    return Ok(ElementType::WellKnown(kind));
                }
                let indexed = self.index.resolve_message(type_name).ok_or_else(|| {
                    field_resolution_error(field, message_name, generated_file)
                })?;
                Ok(ElementType::Message(ProtoTypeRef {
                    full_name: type_name.to_string(),
                    kind: TypeKind::Message,
                    file: indexed.file.clone(),
                    package: indexed.package.clone(),
                }))
            }
            Type::Enum => {
                let type_name = field.type_name();
                let indexed = self.index.resolve_enum(type_name).ok_or_else(|| {
                    field_resolution_error(field, message_name, generated_file)
                })?;
                Ok(ElementType::Enum(ProtoTypeRef {
                    full_name: type_name.to_string(),
                    kind: TypeKind::Enum,
                    file: indexed.file.clone(),
                    package: indexed.package.clone(),
                }))
            }
            Type::Group => Err(FieldFailure::Unsupported(format!(
                "field '{}' of message '{message_name}' uses the proto2 group encoding",
                field.name()
            ))),
            other => match scalar_kind(other) {
                Some(kind) => Ok(ElementType::Scalar(kind)),
                None => Err(FieldFailure::Unsupported(format!(
                    "field '{}' of message '{message_name}' has an unsupported type",
                    field.name()
                ))),
            },
        }
    }

}

fn field_resolution_error(
    field: &FieldDescriptorProto,
    message_name: &str,
    generated_file: &str,
) -> FieldFailure {
    FieldFailure::Resolution(Box::new(Error::TypeResolution {
        file: generated_file.to_string(),
        message: message_name.to_string(),
        field: field.name().to_string(),
        missing_type: field.type_name().to_string(),
    }))
}

fn method_resolution_error(
    type_name: &str,
    service_name: &str,
    method_name: &str,
    generated_file: &str,
) -> Error {
    Error::TypeResolution {
        file: generated_file.to_string(),
        message: service_name.to_string(),
        field: method_name.to_string(),
        missing_type: type_name.to_string(),
    }
}

fn message_type_ref(type_name: &str, indexed: &IndexedMessage) -> ProtoTypeRef {
    ProtoTypeRef {
        full_name: type_name.to_string(),
        kind: TypeKind::Message,
        file: indexed.file.clone(),
        package: indexed.package.clone(),
    }
}

/// Indices of oneof declarations that are not synthetic presence wrappers.
///
/// A oneof is synthetic when any member carries the explicit presence
/// marker; the wrapper exists only to track that presence.
fn real_oneof_indices(message: &DescriptorProto) -> Vec<i32> {
    (0..message.oneof_decl.len())
        .map(index_component)
        .filter(|&oneof_index| {
            !message.field.iter().any(|field| {
                field.oneof_index == Some(oneof_index) && field.proto3_optional()
            })
        })
        .collect()
}

fn real_oneof_membership(
    field: &FieldDescriptorProto,
    message: &DescriptorProto,
    real_oneofs: &[i32],
) -> Option<OneofGroup> {
    let oneof_index = field.oneof_index?;
    if !real_oneofs.contains(&oneof_index) {
        return None;
    }

    let name = message
        .oneof_decl
        .get(usize::try_from(oneof_index).ok()?)
        .map(|decl| decl.name().to_string())?;

    let siblings = message
        .field
        .iter()
        .filter(|f| f.oneof_index == Some(oneof_index) && f.name() != field.name())
        .map(|f| f.name().to_string())
        .collect();

    Some(OneofGroup {
        name,
        index: oneof_index,
        siblings,
    })
}

fn scalar_kind(ty: Type) -> Option<ScalarKind> {
    Some(match ty {
        Type::Double => ScalarKind::Double,
        Type::Float => ScalarKind::Float,
        Type::Int64 => ScalarKind::Int64,
        Type::Uint64 => ScalarKind::UInt64,
        Type::Int32 => ScalarKind::Int32,
        Type::Fixed64 => ScalarKind::Fixed64,
        Type::Fixed32 => ScalarKind::Fixed32,
        Type::Bool => ScalarKind::Bool,
        Type::String => ScalarKind::String,
        Type::Bytes => ScalarKind::Bytes,
        Type::Uint32 => ScalarKind::UInt32,
        Type::Sfixed32 => ScalarKind::SFixed32,
        Type::Sfixed64 => ScalarKind::SFixed64,
        Type::Sint32 => ScalarKind::SInt32,
        Type::Sint64 => ScalarKind::SInt64,
        Type::Group | Type::Message | Type::Enum => return None,
    })
}

fn index_component(index: usize) -> i32 {
    i32::try_from(index).unwrap_or(i32::MAX)
}
