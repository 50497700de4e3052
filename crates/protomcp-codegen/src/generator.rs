//! Emission of Python tool modules from service models.
//!
//! One generated file per proto file with services: module scaffolding, a
//! response serialization helper, one factory per service, and one FastMCP
//! tool per RPC method. Field handling follows the canonical models only;
//! async mode changes declarations and call suspension, never the field
//! rules.

use std::collections::BTreeSet;

use prost_types::FileDescriptorProto;
use protomcp_core::{
    Diagnostic, Diagnostics, ErrorFormat, GenerationOptions, Result, StreamMode,
};
use serde::Serialize;

use crate::analyzer::TypeAnalyzer;
use crate::index::DescriptorIndex;
use crate::model::{
    Cardinality, ElementType, FieldModel, GeneratedFile, MethodModel, ProtoTypeRef, ServiceModel,
    WellKnownKind,
};
use crate::python;
use crate::template_engine::TemplateEngine;

const RESPONSE_HELPER: &str = r#"def _response_to_dict(message) -> Dict[str, Any]:
    """Serialize a response message into a plain dict, enums as integers."""
    return MessageToDict(
        message,
        preserving_proto_field_name=True,
        use_integers_for_enums=True,
    )"#;

const INTERCEPTOR_HELPER: &str = r#"def _request_interceptor(request, metadata):
    """Called once per outgoing RPC. Override to adjust the request or metadata."""
    return request, metadata"#;

/// Imports and helpers a file turned out to need, collected while emitting.
#[derive(Debug, Default)]
struct Needs {
    parse_dict: bool,
    typing: BTreeSet<&'static str>,
    modules: BTreeSet<(Option<String>, String)>,
}

impl Needs {
    fn module_of(&mut self, proto_file: &str, suffix: &str) -> String {
        let (package, module) = python::module_for_proto(proto_file, suffix);
        self.modules.insert((package, module.clone()));
        module
    }

    fn annotation(&mut self, annotation: String) -> String {
        self.typing.extend(python::typing_names(&annotation));
        annotation
    }
}

#[derive(Debug, Serialize)]
struct FileContext {
    source_file: String,
    import_lines: Vec<String>,
    server_display: String,
    blocks: Vec<String>,
    main_lines: Vec<String>,
}

#[derive(Debug, Serialize)]
struct FactoryContext {
    function_name: String,
    docstring: String,
    server_name: String,
    tool_blocks: Vec<String>,
}

#[derive(Debug, Serialize)]
struct ToolContext {
    banner_lines: Vec<String>,
    tool_name: String,
    description: String,
    def_keyword: &'static str,
    function_name: String,
    signature: String,
    return_annotation: String,
    docstring_lines: Vec<String>,
    body_lines: Vec<String>,
}

/// Renders Python tool modules from analyzed services.
#[derive(Debug)]
pub struct CodeGenerator<'a> {
    options: &'a GenerationOptions,
    engine: TemplateEngine<'static>,
}

impl<'a> CodeGenerator<'a> {
    /// Creates a generator over validated options.
    ///
    /// # Errors
    ///
    /// Returns an error when the built-in templates fail to register.
    pub fn new(options: &'a GenerationOptions) -> Result<Self> {
        Ok(Self {
            options,
            engine: TemplateEngine::new()?,
        })
    }

    /// Generates the Python module for one proto file.
    ///
    /// Returns `Ok(None)` for files without services. Methods skipped by
    /// policy or classification are recorded on `diagnostics`.
    ///
    /// # Errors
    ///
    /// Returns [`protomcp_core::Error::TypeResolution`] when a referenced
    /// type is missing from the index; the caller drops this file and
    /// continues with its siblings.
    pub fn generate_file(
        &self,
        file: &FileDescriptorProto,
        index: &DescriptorIndex,
        diagnostics: &mut Diagnostics,
    ) -> Result<Option<GeneratedFile>> {
        if file.service.is_empty() {
            tracing::debug!(file = file.name(), "no services found, skipping");
            return Ok(None);
        }
        tracing::info!(
            file = file.name(),
            services = file.service.len(),
            "generating MCP tools"
        );

        let analyzer =
            TypeAnalyzer::new(index).with_type_details(self.options.show_type_details);

        let mut services = Vec::with_capacity(file.service.len());
        for (service_index, service) in file.service.iter().enumerate() {
            let analysis = analyzer.analyze_service(service, file.name(), service_index)?;
            for skipped in analysis.skipped {
                diagnostics.push(
                    Diagnostic::warning(format!("method skipped: {}", skipped.reason))
                        .with_file(file.name())
                        .with_method(skipped.method),
                );
            }
            services.push(analysis.model);
        }

        if self.options.stream_mode == StreamMode::Skip {
            for service in &mut services {
                let methods = std::mem::take(&mut service.methods);
                for method in methods {
                    if method.streaming.is_streaming() {
                        diagnostics.push(
                            Diagnostic::warning(
                                "streaming method omitted under the skip streaming policy",
                            )
                            .with_file(file.name())
                            .with_method(method.name.clone()),
                        );
                    } else {
                        service.methods.push(method);
                    }
                }
            }
        }

        let content = self.render_file(file, &services)?;

        if self.options.show_generated_code {
            for (number, line) in content.lines().enumerate() {
                tracing::trace!("{:>4}: {line}", number + 1);
            }
        }

        let path = output_path(file.name(), &self.options.output_suffix);
        tracing::debug!(%path, bytes = content.len(), "file generated");
        Ok(Some(GeneratedFile { path, content }))
    }

    fn render_file(
        &self,
        file: &FileDescriptorProto,
        services: &[ServiceModel],
    ) -> Result<String> {
        let mut needs = Needs::default();
        needs.typing.insert("Any");
        needs.typing.insert("Dict");

        let grpc_module = needs.module_of(file.name(), "_pb2_grpc");

        let mut factory_names = Vec::with_capacity(services.len());
        let mut factory_blocks = Vec::with_capacity(services.len());
        for service in services {
            let (block, function_name) =
                self.render_factory(service, &grpc_module, &mut needs)?;
            factory_blocks.push(block);
            factory_names.push(function_name);
        }

        let mut blocks = vec![RESPONSE_HELPER.to_string()];
        if self.options.use_request_interceptor {
            blocks.push(INTERCEPTOR_HELPER.to_string());
        }
        blocks.extend(factory_blocks);

        let main_lines = main_lines(&factory_names);
        let context = FileContext {
            source_file: file.name().to_string(),
            import_lines: self.import_lines(&needs),
            server_display: python::str_literal("MCP Server from Proto"),
            blocks,
            main_lines,
        };
        self.engine.render("file", &context)
    }

    fn import_lines(&self, needs: &Needs) -> Vec<String> {
        let mut lines = Vec::new();

        if !needs.typing.is_empty() {
            let names: Vec<&str> = needs.typing.iter().copied().collect();
            lines.push(format!("from typing import {}", names.join(", ")));
            lines.push(String::new());
        }

        lines.push("from fastmcp import FastMCP".to_string());
        lines.push("import grpc".to_string());
        if needs.parse_dict {
            lines.push("from google.protobuf.json_format import MessageToDict, ParseDict".to_string());
        } else {
            lines.push("from google.protobuf.json_format import MessageToDict".to_string());
        }

        for (package, module) in &needs.modules {
            match package {
                Some(package) => lines.push(format!("from {package} import {module}")),
                None => lines.push(format!("import {module}")),
            }
        }

        lines
    }

    fn render_factory(
        &self,
        service: &ServiceModel,
        grpc_module: &str,
        needs: &mut Needs,
    ) -> Result<(String, String)> {
        let function_name = python::apply_service_pattern(
            &self.options.function_name_pattern,
            &service.name.to_lowercase(),
        );
        let server_name =
            python::apply_service_pattern(&self.options.server_name_pattern, &service.name);

        let docstring = if self.options.include_comments {
            service.comment.as_deref().map_or_else(
                || default_factory_doc(&service.name),
                |comment| docstring_text(first_line(comment)),
            )
        } else {
            default_factory_doc(&service.name)
        };

        let mut tool_blocks = Vec::with_capacity(service.methods.len());
        for method in &service.methods {
            let tool = self.render_tool(service, method, grpc_module, needs)?;
            tool_blocks.push(indent_block(&tool, 4));
        }

        let context = FactoryContext {
            function_name: function_name.clone(),
            docstring,
            server_name: python::str_literal(&server_name),
            tool_blocks,
        };
        let block = self.engine.render("factory", &context)?;
        Ok((block.trim_end().to_string(), function_name))
    }

    fn render_tool(
        &self,
        service: &ServiceModel,
        method: &MethodModel,
        grpc_module: &str,
        needs: &mut Needs,
    ) -> Result<String> {
        let function_name = python::sanitize_identifier(&python::camel_to_snake(&method.name));
        let tool_name = python::convert_tool_name(&method.name, self.options.tool_name_case);

        let params: Vec<&FieldModel> = method
            .fields
            .iter()
            .filter(|field| field.element != ElementType::WellKnown(WellKnownKind::Empty))
            .collect();

        let mut signature_parts = Vec::with_capacity(params.len());
        for field in &params {
            let annotation = needs.annotation(python::parameter_annotation(
                field,
                self.options.accept_enum_names,
            ));
            let parameter = python::sanitize_identifier(&field.name);
            if field.is_required() {
                signature_parts.push(format!("{parameter}: {annotation}"));
            } else {
                signature_parts.push(format!("{parameter}: {annotation} = None"));
            }
        }

        let collects_stream =
            method.streaming.server_streams() && self.options.stream_mode != StreamMode::Skip;
        let return_annotation = if collects_stream {
            needs.typing.insert("List");
            " -> List[Dict[str, Any]]".to_string()
        } else {
            " -> Dict[str, Any]".to_string()
        };

        let summary = if self.options.include_comments {
            method.comment.as_deref().map_or_else(
                || default_method_doc(&service.name, &method.name),
                |comment| first_line(comment).to_string(),
            )
        } else {
            default_method_doc(&service.name, &method.name)
        };

        let banner_lines = if method.streaming.is_streaming()
            && self.options.stream_mode == StreamMode::Warn
        {
            vec![
                format!(
                    "# WARNING: {} uses gRPC streaming. Streamed values are buffered",
                    method.name
                ),
                "# into a single response; support is partial.".to_string(),
            ]
        } else {
            Vec::new()
        };

        let docstring_lines = self.docstring_lines(&summary, &params);
        let body_lines = self.body_lines(service, method, grpc_module, &params, needs);

        let context = ToolContext {
            banner_lines,
            tool_name: python::str_literal(&tool_name),
            description: python::str_literal(&summary),
            def_keyword: if self.options.async_mode { "async def" } else { "def" },
            function_name,
            signature: signature_parts.join(", "),
            return_annotation,
            docstring_lines: indent_lines(&docstring_lines, 4),
            body_lines: indent_lines(&body_lines, 4),
        };
        let block = self.engine.render("tool", &context)?;
        Ok(block.trim_end().to_string())
    }

    fn docstring_lines(&self, summary: &str, params: &[&FieldModel]) -> Vec<String> {
        let mut lines = Vec::new();
        if params.is_empty() {
            lines.push(format!("\"\"\"{}\"\"\"", docstring_text(summary)));
            return lines;
        }

        lines.push(format!("\"\"\"{}", docstring_text(summary)));
        lines.push(String::new());
        lines.push("Args:".to_string());
        for field in params {
            let parameter = python::sanitize_identifier(&field.name);
            let described = match (&field.comment, self.options.include_comments) {
                (Some(comment), true) => docstring_text(first_line(comment)),
                _ => python::parameter_annotation(field, self.options.accept_enum_names),
            };
            if field.is_conditional() {
                lines.push(format!("    {parameter}: {described} (only sent when provided)"));
            } else {
                lines.push(format!("    {parameter}: {described}"));
            }
        }

        let notes: Vec<String> = params
            .iter()
            .filter_map(|field| {
                field.oneof.as_ref().map(|group| {
                    if group.siblings.is_empty() {
                        format!(
                            "'{}' is the only member of oneof group '{}'.",
                            field.name, group.name
                        )
                    } else {
                        format!(
                            "'{}' is mutually exclusive with: {} (oneof group '{}').",
                            field.name,
                            group.siblings.join(", "),
                            group.name
                        )
                    }
                })
            })
            .collect();
        if !notes.is_empty() {
            lines.push(String::new());
            lines.push("Note:".to_string());
            for note in notes {
                lines.push(format!("    {note}"));
            }
        }

        lines.push("\"\"\"".to_string());
        lines
    }

    fn body_lines(
        &self,
        service: &ServiceModel,
        method: &MethodModel,
        grpc_module: &str,
        params: &[&FieldModel],
        needs: &mut Needs,
    ) -> Vec<String> {
        let mut lines = Vec::new();

        let input_module = needs.module_of(&method.input_type.file, "_pb2");
        lines.push(format!(
            "request = {input_module}.{}()",
            method.input_type.relative_name()
        ));
        for field in params {
            lines.extend(self.field_statements(field, needs));
        }

        if self.options.use_request_interceptor {
            lines.push("metadata = ()".to_string());
            lines.push("request, metadata = _request_interceptor(request, metadata)".to_string());
        }

        let target = &self.options.grpc_target;
        let channel_factory = match (self.options.async_mode, self.options.insecure_channel) {
            (false, true) => format!("grpc.insecure_channel(\"{target}\")"),
            (false, false) => format!("grpc.secure_channel(\"{target}\", credentials)"),
            (true, true) => format!("grpc.aio.insecure_channel(\"{target}\")"),
            (true, false) => format!("grpc.aio.secure_channel(\"{target}\", credentials)"),
        };
        if !self.options.insecure_channel {
            lines.push("credentials = grpc.ssl_channel_credentials()".to_string());
        }
        lines.push(format!("channel = {channel_factory}"));

        lines.push("try:".to_string());
        lines.push(format!("    stub = {grpc_module}.{}Stub(channel)", service.name));
        lines.extend(self.call_lines(method));
        lines.push("except grpc.RpcError as exc:".to_string());
        lines.push(format!("    return {}", self.error_dict()));
        lines.push("finally:".to_string());
        if self.options.async_mode {
            lines.push("    await channel.close()".to_string());
        } else {
            lines.push("    channel.close()".to_string());
        }

        lines
    }

    fn call_lines(&self, method: &MethodModel) -> Vec<String> {
        let request_argument = if method.streaming.client_streams() {
            "iter([request])"
        } else {
            "request"
        };
        let mut arguments = format!(
            "{request_argument}, timeout={}",
            self.options.grpc_timeout_secs
        );
        if self.options.use_request_interceptor {
            arguments.push_str(", metadata=metadata");
        }
        let call = format!("stub.{}({arguments})", method.name);

        let mut lines = Vec::new();
        if method.streaming.server_streams() {
            if self.options.async_mode {
                lines.push(format!("    stream = {call}"));
                lines.push(
                    "    return [_response_to_dict(response) async for response in stream]"
                        .to_string(),
                );
            } else {
                lines.push(format!("    responses = {call}"));
                lines.push(
                    "    return [_response_to_dict(response) for response in responses]"
                        .to_string(),
                );
            }
        } else {
            if self.options.async_mode {
                lines.push(format!("    response = await {call}"));
            } else {
                lines.push(format!("    response = {call}"));
            }
            lines.push("    return _response_to_dict(response)".to_string());
        }
        lines
    }

    fn error_dict(&self) -> &'static str {
        match self.options.error_format {
            ErrorFormat::Simple => "{\"error\": str(exc)}",
            ErrorFormat::Standard => "{\"error\": str(exc), \"type\": type(exc).__name__}",
            ErrorFormat::Detailed => {
                "{\"error\": str(exc), \"type\": type(exc).__name__, \
                 \"code\": str(exc.code()), \"details\": exc.details()}"
            }
        }
    }

    /// Statements assigning one parameter into the outgoing request.
    fn field_statements(&self, field: &FieldModel, needs: &mut Needs) -> Vec<String> {
        let parameter = python::sanitize_identifier(&field.name);
        match field.cardinality {
            Cardinality::Singular | Cardinality::Optional => {
                let mut inner = Vec::new();
                if let ElementType::Enum(reference) = &field.element {
                    if self.options.accept_enum_names {
                        let path = self.enum_path(reference, needs);
                        inner.push(format!("if isinstance({parameter}, str):"));
                        inner.push(format!("    {parameter} = {path}.Value({parameter})"));
                    }
                }
                inner.extend(singular_assignment(&field.name, &parameter, &field.element, needs));

                if field.is_conditional() {
                    // Preserve the unset-vs-default distinction on the wire.
                    let mut lines = vec![format!("if {parameter} is not None:")];
                    lines.extend(indent_lines(&inner, 4));
                    lines
                } else {
                    inner
                }
            }
            Cardinality::Repeated => {
                let mut lines = vec![format!("if {parameter}:")];
                lines.extend(indent_lines(
                    &self.repeated_assignment(field, &parameter, needs),
                    4,
                ));
                lines
            }
            Cardinality::Map => {
                let mut lines = vec![format!("if {parameter}:")];
                let mut inner = vec![format!("for key, value in {parameter}.items():")];
                inner.extend(indent_lines(&self.map_assignment(field, needs), 4));
                lines.extend(indent_lines(&inner, 4));
                lines
            }
        }
    }

    fn repeated_assignment(
        &self,
        field: &FieldModel,
        parameter: &str,
        needs: &mut Needs,
    ) -> Vec<String> {
        let read = read_expr(&field.name);
        match &field.element {
            ElementType::Scalar(_) => vec![format!("{read}.extend({parameter})")],
            ElementType::Enum(reference) => {
                if self.options.accept_enum_names {
                    let path = self.enum_path(reference, needs);
                    vec![
                        format!("{read}.extend("),
                        format!(
                            "    {path}.Value(item) if isinstance(item, str) else item for item in {parameter}"
                        ),
                        ")".to_string(),
                    ]
                } else {
                    vec![format!("{read}.extend({parameter})")]
                }
            }
            ElementType::Message(_)
            | ElementType::WellKnown(
                WellKnownKind::Struct | WellKnownKind::Value | WellKnownKind::ListValue | WellKnownKind::Any,
            ) => {
                needs.parse_dict = true;
                vec![
                    format!("for item in {parameter}:"),
                    format!("    ParseDict(item, {read}.add())"),
                ]
            }
            ElementType::WellKnown(WellKnownKind::Timestamp | WellKnownKind::Duration) => vec![
                format!("for item in {parameter}:"),
                format!("    {read}.add().FromJsonString(item)"),
            ],
            ElementType::WellKnown(kind) if kind.is_wrapper() => vec![
                format!("for item in {parameter}:"),
                format!("    {read}.add().value = item"),
            ],
            // Empty carries no payload; nothing to assign.
            ElementType::WellKnown(_) => Vec::new(),
            ElementType::Map { .. } => Vec::new(),
        }
    }

    fn map_assignment(&self, field: &FieldModel, needs: &mut Needs) -> Vec<String> {
        let read = read_expr(&field.name);
        let ElementType::Map { value, .. } = &field.element else {
            return Vec::new();
        };
        match value.as_ref() {
            ElementType::Scalar(_) => vec![format!("{read}[key] = value")],
            ElementType::Enum(reference) => {
                if self.options.accept_enum_names {
                    let path = self.enum_path(reference, needs);
                    vec![format!(
                        "{read}[key] = {path}.Value(value) if isinstance(value, str) else value"
                    )]
                } else {
                    vec![format!("{read}[key] = value")]
                }
            }
            ElementType::Message(_)
            | ElementType::WellKnown(
                WellKnownKind::Struct | WellKnownKind::Value | WellKnownKind::ListValue | WellKnownKind::Any,
            ) => {
                needs.parse_dict = true;
                vec![format!("ParseDict(value, {read}[key])")]
            }
            ElementType::WellKnown(WellKnownKind::Timestamp | WellKnownKind::Duration) => {
                vec![format!("{read}[key].FromJsonString(value)")]
            }
            ElementType::WellKnown(kind) if kind.is_wrapper() => {
                vec![format!("{read}[key].value = value")]
            }
            ElementType::WellKnown(_) | ElementType::Map { .. } => Vec::new(),
        }
    }

    fn enum_path(&self, reference: &ProtoTypeRef, needs: &mut Needs) -> String {
        let module = needs.module_of(&reference.file, "_pb2");
        format!("{module}.{}", reference.relative_name())
    }
}

/// Statements assigning a singular value into the request.
fn singular_assignment(
    field_name: &str,
    parameter: &str,
    element: &ElementType,
    needs: &mut Needs,
) -> Vec<String> {
    let read = read_expr(field_name);
    match element {
        ElementType::Scalar(_) | ElementType::Enum(_) => {
            vec![write_stmt(field_name, parameter)]
        }
        ElementType::Message(_)
        | ElementType::WellKnown(
            WellKnownKind::Struct | WellKnownKind::Value | WellKnownKind::ListValue | WellKnownKind::Any,
        ) => {
            needs.parse_dict = true;
            vec![format!("ParseDict({parameter}, {read})")]
        }
        ElementType::WellKnown(WellKnownKind::Timestamp | WellKnownKind::Duration) => {
            vec![format!("{read}.FromJsonString({parameter})")]
        }
        ElementType::WellKnown(kind) if kind.is_wrapper() => {
            vec![format!("{read}.value = {parameter}")]
        }
        // Empty carries no payload.
        ElementType::WellKnown(_) => Vec::new(),
        ElementType::Map { .. } => Vec::new(),
    }
}

fn read_expr(field_name: &str) -> String {
    if python::is_keyword(field_name) {
        format!("getattr(request, \"{field_name}\")")
    } else {
        format!("request.{field_name}")
    }
}

fn write_stmt(field_name: &str, value: &str) -> String {
    if python::is_keyword(field_name) {
        format!("setattr(request, \"{field_name}\", {value})")
    } else {
        format!("request.{field_name} = {value}")
    }
}

fn main_lines(factory_names: &[String]) -> Vec<String> {
    let mut lines = Vec::new();
    match factory_names {
        [] => lines.push("    pass".to_string()),
        [first] => lines.push(format!("    {first}().run()")),
        [first, rest @ ..] => {
            lines.push("    # One server owns the process; swap in another factory as needed:".to_string());
            for name in rest {
                lines.push(format!("    #   {name}().run()"));
            }
            lines.push(format!("    {first}().run()"));
        }
    }
    lines
}

fn output_path(proto_name: &str, suffix: &str) -> String {
    proto_name.strip_suffix(".proto").map_or_else(
        || format!("{proto_name}{suffix}"),
        |stem| format!("{stem}{suffix}"),
    )
}

fn default_factory_doc(service: &str) -> String {
    format!("Create a FastMCP server exposing {service} tools.")
}

fn default_method_doc(service: &str, method: &str) -> String {
    format!("Call the {service}.{method} RPC method.")
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or(text)
}

/// Keeps docstring content from terminating the literal early.
fn docstring_text(text: &str) -> String {
    text.replace('\\', "\\\\").replace("\"\"\"", "'''")
}

fn indent_lines(lines: &[String], spaces: usize) -> Vec<String> {
    let prefix = " ".repeat(spaces);
    lines
        .iter()
        .map(|line| {
            if line.is_empty() {
                String::new()
            } else {
                format!("{prefix}{line}")
            }
        })
        .collect()
}

fn indent_block(block: &str, spaces: usize) -> String {
    let prefix = " ".repeat(spaces);
    block
        .lines()
        .map(|line| {
            if line.is_empty() {
                String::new()
            } else {
                format!("{prefix}{line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}
