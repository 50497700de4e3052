//! End-to-end generation tests against the full pipeline.

use prost_types::compiler::CodeGeneratorRequest;
use prost_types::field_descriptor_proto::{Label, Type};
use prost_types::{
    DescriptorProto, EnumDescriptorProto, EnumValueDescriptorProto, FieldDescriptorProto,
    FileDescriptorProto, MessageOptions, MethodDescriptorProto, OneofDescriptorProto,
    ServiceDescriptorProto,
};
use protomcp_codegen::pipeline::{self, GenerationOutcome};

fn scalar_field(name: &str, number: i32, ty: Type) -> FieldDescriptorProto {
    FieldDescriptorProto {
        name: Some(name.to_string()),
        number: Some(number),
        label: Some(Label::Optional as i32),
        r#type: Some(ty as i32),
        ..Default::default()
    }
}

fn message_field(name: &str, number: i32, type_name: &str) -> FieldDescriptorProto {
    FieldDescriptorProto {
        r#type: Some(Type::Message as i32),
        type_name: Some(type_name.to_string()),
        ..scalar_field(name, number, Type::Message)
    }
}

fn message(name: &str, fields: Vec<FieldDescriptorProto>) -> DescriptorProto {
    DescriptorProto {
        name: Some(name.to_string()),
        field: fields,
        ..Default::default()
    }
}

fn method(name: &str, input: &str, output: &str) -> MethodDescriptorProto {
    MethodDescriptorProto {
        name: Some(name.to_string()),
        input_type: Some(input.to_string()),
        output_type: Some(output.to_string()),
        ..Default::default()
    }
}

fn service(name: &str, methods: Vec<MethodDescriptorProto>) -> ServiceDescriptorProto {
    ServiceDescriptorProto {
        name: Some(name.to_string()),
        method: methods,
        ..Default::default()
    }
}

fn simple_file() -> FileDescriptorProto {
    FileDescriptorProto {
        name: Some("simple.proto".to_string()),
        package: Some("test.simple".to_string()),
        syntax: Some("proto3".to_string()),
        message_type: vec![
            message(
                "SimpleRequest",
                vec![
                    scalar_field("name", 1, Type::String),
                    scalar_field("value", 2, Type::Int32),
                ],
            ),
            message(
                "SimpleResponse",
                vec![
                    scalar_field("result", 1, Type::String),
                    scalar_field("success", 2, Type::Bool),
                ],
            ),
        ],
        service: vec![service(
            "SimpleService",
            vec![method(
                "DoSomething",
                ".test.simple.SimpleRequest",
                ".test.simple.SimpleResponse",
            )],
        )],
        ..Default::default()
    }
}

fn request_for(files: Vec<FileDescriptorProto>, generate: &[&str], parameter: &str) -> CodeGeneratorRequest {
    CodeGeneratorRequest {
        file_to_generate: generate.iter().map(ToString::to_string).collect(),
        parameter: Some(parameter.to_string()),
        proto_file: files,
        ..Default::default()
    }
}

fn generate(files: Vec<FileDescriptorProto>, generate: &[&str], parameter: &str) -> GenerationOutcome {
    pipeline::generate(&request_for(files, generate, parameter))
}

fn single_content(outcome: &GenerationOutcome) -> &str {
    assert_eq!(outcome.response.error, None, "unexpected fatal error");
    assert_eq!(outcome.response.file.len(), 1, "expected exactly one file");
    outcome.response.file[0].content()
}

#[test]
fn simple_service_generation() {
    let outcome = generate(vec![simple_file()], &["simple.proto"], "");

    assert_eq!(outcome.response.file[0].name(), "simple_pb2_mcp.py");
    let content = single_content(&outcome);

    assert!(content.contains("def create_simpleservice_server() -> FastMCP:"));
    assert!(content.contains("from fastmcp import FastMCP"));
    assert!(content.contains("def do_something(name: str, value: int) -> Dict[str, Any]:"));
    assert!(content.contains("request = simple_pb2.SimpleRequest()"));
    assert!(content.contains("request.name = name"));
    assert!(content.contains("request.value = value"));
    assert!(content.contains("stub = simple_pb2_grpc.SimpleServiceStub(channel)"));
    assert!(content.contains("response = stub.DoSomething(request, timeout=30)"));
    assert!(content.contains("return _response_to_dict(response)"));
    assert!(content.contains("mcp = FastMCP(\"MCP Server from Proto\")"));
    assert!(content.contains("create_simpleservice_server().run()"));
}

#[test]
fn supported_features_announce_explicit_presence() {
    let outcome = generate(vec![simple_file()], &["simple.proto"], "");
    assert_eq!(outcome.response.supported_features, Some(1));
}

#[test]
fn enums_serialize_as_integers() {
    let outcome = generate(vec![simple_file()], &["simple.proto"], "");
    let content = single_content(&outcome);
    assert!(content.contains("use_integers_for_enums=True"));
    assert!(content.contains("preserving_proto_field_name=True"));
}

fn complex_file() -> FileDescriptorProto {
    let mut nickname = scalar_field("nickname", 2, Type::String);
    nickname.proto3_optional = Some(true);
    nickname.oneof_index = Some(0);

    let mut create = scalar_field("create", 7, Type::String);
    create.oneof_index = Some(1);
    let mut update = scalar_field("update", 8, Type::String);
    update.oneof_index = Some(1);
    let mut delete = scalar_field("delete", 9, Type::Bool);
    delete.oneof_index = Some(1);

    let mut tags = scalar_field("tags", 3, Type::String);
    tags.label = Some(Label::Repeated as i32);

    let mut attributes = message_field("attributes", 6, ".test.complex.ComplexRequest.AttributesEntry");
    attributes.label = Some(Label::Repeated as i32);

    let entry = DescriptorProto {
        options: Some(MessageOptions {
            map_entry: Some(true),
            ..Default::default()
        }),
        ..message(
            "AttributesEntry",
            vec![
                scalar_field("key", 1, Type::String),
                scalar_field("value", 2, Type::String),
            ],
        )
    };

    let mut priority = scalar_field("priority", 4, Type::Enum);
    priority.type_name = Some(".test.complex.Priority".to_string());

    let mut request = message(
        "ComplexRequest",
        vec![
            scalar_field("name", 1, Type::String),
            nickname,
            tags,
            priority,
            message_field("metadata", 5, ".test.complex.NestedMessage"),
            attributes,
            create,
            update,
            delete,
        ],
    );
    request.nested_type.push(entry);
    request.oneof_decl = vec![
        OneofDescriptorProto {
            name: Some("_nickname".to_string()),
            ..Default::default()
        },
        OneofDescriptorProto {
            name: Some("action".to_string()),
            ..Default::default()
        },
    ];

    FileDescriptorProto {
        name: Some("complex.proto".to_string()),
        package: Some("test.complex".to_string()),
        syntax: Some("proto3".to_string()),
        enum_type: vec![EnumDescriptorProto {
            name: Some("Priority".to_string()),
            value: vec![
                EnumValueDescriptorProto {
                    name: Some("PRIORITY_UNSPECIFIED".to_string()),
                    number: Some(0),
                    ..Default::default()
                },
                EnumValueDescriptorProto {
                    name: Some("PRIORITY_HIGH".to_string()),
                    number: Some(2),
                    ..Default::default()
                },
            ],
            ..Default::default()
        }],
        message_type: vec![
            request,
            message(
                "NestedMessage",
                vec![
                    scalar_field("text", 1, Type::String),
                    scalar_field("timestamp", 2, Type::Int64),
                ],
            ),
            message(
                "ComplexResponse",
                vec![scalar_field("success", 1, Type::Bool)],
            ),
        ],
        service: vec![service(
            "ComplexService",
            vec![method(
                "ProcessComplex",
                ".test.complex.ComplexRequest",
                ".test.complex.ComplexResponse",
            )],
        )],
        ..Default::default()
    }
}

#[test]
fn complex_features_generation() {
    let outcome = generate(vec![complex_file()], &["complex.proto"], "");
    let content = single_content(&outcome);

    // Required parameters first, everything defaulted after.
    let signature_start = content
        .find("def process_complex(")
        .expect("tool function present");
    let signature_end = content[signature_start..]
        .find('\n')
        .expect("def line ends")
        + signature_start;
    let signature = &content[signature_start..signature_end];
    let name_pos = signature.find("name: str").unwrap();
    let metadata_pos = signature.find("metadata: dict").unwrap();
    let nickname_pos = signature.find("nickname: Optional[str] = None").unwrap();
    let tags_pos = signature.find("tags: List[str] = None").unwrap();
    let attrs_pos = signature.find("attributes: Dict[str, str] = None").unwrap();
    assert!(name_pos < metadata_pos, "required keep descriptor order");
    assert!(metadata_pos < nickname_pos, "optional follows required");
    assert!(nickname_pos < tags_pos);
    assert!(tags_pos < attrs_pos);

    // Enum parameters take the integer ordinal.
    assert!(signature.contains("priority: int"));

    // Conditional assignment preserves unset-vs-default.
    assert!(content.contains("if nickname is not None:"));
    assert!(content.contains("    request.nickname = nickname"));

    // Collections assign in bulk.
    assert!(content.contains("request.tags.extend(tags)"));
    assert!(content.contains("for key, value in attributes.items():"));
    assert!(content.contains("request.attributes[key] = value"));

    // Messages parse from dicts.
    assert!(content.contains("ParseDict(metadata, request.metadata)"));
    assert!(content.contains("from google.protobuf.json_format import MessageToDict, ParseDict"));

    // Real oneof members carry the mutual exclusion note; the synthetic
    // presence wrapper does not.
    assert!(content.contains("'create' is mutually exclusive with: update, delete (oneof group 'action')."));
    assert!(!content.contains("_nickname"));
}

#[test]
fn explicit_optional_scenario() {
    let mut nickname = scalar_field("nickname", 2, Type::String);
    nickname.proto3_optional = Some(true);
    nickname.oneof_index = Some(0);
    let request = DescriptorProto {
        oneof_decl: vec![OneofDescriptorProto {
            name: Some("_nickname".to_string()),
            ..Default::default()
        }],
        ..message(
            "GreetRequest",
            vec![nickname, scalar_field("name", 1, Type::String)],
        )
    };
    let file = FileDescriptorProto {
        name: Some("greet.proto".to_string()),
        package: Some("greet".to_string()),
        message_type: vec![request, message("GreetResponse", vec![])],
        service: vec![service(
            "Greeter",
            vec![method("Greet", ".greet.GreetRequest", ".greet.GreetResponse")],
        )],
        ..Default::default()
    };

    let outcome = generate(vec![file], &["greet.proto"], "");
    let content = single_content(&outcome);

    assert!(content.contains("def greet(name: str, nickname: Optional[str] = None)"));
    assert!(content.contains("if nickname is not None:"));
    // The required parameter assigns unconditionally.
    assert!(content.contains("\n        request.name = name"));
}

fn streaming_file() -> FileDescriptorProto {
    let mut stream_method = method("StreamLogs", ".logs.LogRequest", ".logs.LogLine");
    stream_method.server_streaming = Some(true);
    FileDescriptorProto {
        name: Some("logs.proto".to_string()),
        package: Some("logs".to_string()),
        message_type: vec![
            message("LogRequest", vec![scalar_field("filter", 1, Type::String)]),
            message("LogLine", vec![scalar_field("line", 1, Type::String)]),
        ],
        service: vec![service(
            "LogService",
            vec![
                method("Ping", ".logs.LogRequest", ".logs.LogLine"),
                stream_method,
            ],
        )],
        ..Default::default()
    }
}

#[test]
fn streaming_collect_buffers_into_a_list() {
    let outcome = generate(vec![streaming_file()], &["logs.proto"], "stream_mode=collect");
    let content = single_content(&outcome);
    assert!(content.contains("def stream_logs(filter: str) -> List[Dict[str, Any]]:"));
    assert!(content.contains("responses = stub.StreamLogs(request, timeout=30)"));
    assert!(content.contains("return [_response_to_dict(response) for response in responses]"));
}

#[test]
fn streaming_skip_drops_the_tool_with_a_diagnostic() {
    let outcome = generate(vec![streaming_file()], &["logs.proto"], "stream_mode=skip");
    let content = single_content(&outcome);
    assert!(!content.contains("def stream_logs("));
    assert!(content.contains("def ping("), "unary sibling still generates");
    let warnings: Vec<_> = outcome.diagnostics.warnings().collect();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].method.as_deref(), Some("StreamLogs"));
}

#[test]
fn streaming_warn_keeps_the_tool_behind_a_banner() {
    let outcome = generate(vec![streaming_file()], &["logs.proto"], "stream_mode=warn");
    let content = single_content(&outcome);
    let banner = content
        .find("# WARNING: StreamLogs uses gRPC streaming")
        .expect("banner present");
    let tool = content.find("def stream_logs(").expect("tool present");
    assert!(banner < tool, "banner prefixes the tool");
}

#[test]
fn multiple_services_each_get_a_factory() {
    let file = FileDescriptorProto {
        name: Some("multi.proto".to_string()),
        package: Some("multi".to_string()),
        message_type: vec![
            message("Req", vec![scalar_field("q", 1, Type::String)]),
            message("Res", vec![]),
        ],
        service: vec![
            service("Service1", vec![method("Method1", ".multi.Req", ".multi.Res")]),
            service("Service2", vec![method("Method2", ".multi.Req", ".multi.Res")]),
        ],
        ..Default::default()
    };
    let outcome = generate(vec![file], &["multi.proto"], "");
    let content = single_content(&outcome);
    assert!(content.contains("def create_service1_server() -> FastMCP:"));
    assert!(content.contains("def create_service2_server() -> FastMCP:"));
    assert!(content.contains("def method1("));
    assert!(content.contains("def method2("));
    assert!(content.contains("    create_service1_server().run()"));
    assert!(content.contains("#   create_service2_server().run()"));
}

#[test]
fn missing_type_fails_only_its_file() {
    let broken = FileDescriptorProto {
        name: Some("broken.proto".to_string()),
        package: Some("broken".to_string()),
        message_type: vec![
            message(
                "BrokenRequest",
                vec![message_field("customer", 1, ".broken.Customer")],
            ),
            message("BrokenResponse", vec![]),
        ],
        service: vec![service(
            "BrokenService",
            vec![method("Call", ".broken.BrokenRequest", ".broken.BrokenResponse")],
        )],
        ..Default::default()
    };

    let outcome = generate(
        vec![broken, simple_file()],
        &["broken.proto", "simple.proto"],
        "",
    );

    assert_eq!(outcome.response.error, None, "file errors are not fatal");
    assert_eq!(outcome.response.file.len(), 1, "the healthy sibling generates");
    assert_eq!(outcome.response.file[0].name(), "simple_pb2_mcp.py");

    let errors: Vec<_> = outcome.diagnostics.errors().collect();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].message.contains(".broken.Customer"));
    assert!(errors[0].message.contains("customer"));
    assert_eq!(errors[0].file.as_deref(), Some("broken.proto"));
}

#[test]
fn configuration_error_is_fatal_before_any_generation() {
    let outcome = generate(vec![simple_file()], &["simple.proto"], "stream_mode=buffer");
    let error = outcome.response.error.expect("fatal configuration error");
    assert!(error.contains("stream_mode"));
    assert!(error.contains("buffer"));
    assert!(error.contains("collect"));
    assert!(outcome.response.file.is_empty());
}

#[test]
fn unknown_parameter_warns_and_proceeds() {
    let outcome = generate(vec![simple_file()], &["simple.proto"], "frobnicate=1");
    assert_eq!(outcome.response.error, None);
    assert_eq!(outcome.response.file.len(), 1);
    assert!(outcome
        .diagnostics
        .warnings()
        .any(|w| w.message.contains("frobnicate")));
}

#[test]
fn regeneration_is_byte_identical() {
    let first = generate(vec![complex_file()], &["complex.proto"], "async,insecure");
    let second = generate(vec![complex_file()], &["complex.proto"], "async,insecure");
    assert_eq!(
        first.response.file[0].content(),
        second.response.file[0].content()
    );
}

#[test]
fn request_interceptor_threads_every_call() {
    let outcome = generate(
        vec![simple_file()],
        &["simple.proto"],
        "request_interceptor",
    );
    let content = single_content(&outcome);
    assert_eq!(content.matches("def _request_interceptor(").count(), 1);
    assert!(content.contains("request, metadata = _request_interceptor(request, metadata)"));
    assert!(content.contains("stub.DoSomething(request, timeout=30, metadata=metadata)"));
}

#[test]
fn interceptor_absent_when_disabled() {
    let outcome = generate(vec![simple_file()], &["simple.proto"], "");
    let content = single_content(&outcome);
    assert!(!content.contains("_request_interceptor"));
    assert!(content.contains("stub.DoSomething(request, timeout=30)"));
}

#[test]
fn async_mode_changes_declarations_not_field_rules() {
    let sync_outcome = generate(vec![simple_file()], &["simple.proto"], "insecure");
    let async_outcome = generate(vec![simple_file()], &["simple.proto"], "insecure,async");
    let sync_content = single_content(&sync_outcome);
    let async_content = single_content(&async_outcome);

    assert!(async_content.contains("async def do_something("));
    assert!(async_content.contains("response = await stub.DoSomething(request, timeout=30)"));
    assert!(async_content.contains("grpc.aio.insecure_channel(\"localhost:50051\")"));
    assert!(async_content.contains("await channel.close()"));

    // Field handling is identical in both modes.
    for line in ["request.name = name", "request.value = value"] {
        assert!(sync_content.contains(line));
        assert!(async_content.contains(line));
    }
}

#[test]
fn secure_channel_is_the_default() {
    let outcome = generate(vec![simple_file()], &["simple.proto"], "");
    let content = single_content(&outcome);
    assert!(content.contains("credentials = grpc.ssl_channel_credentials()"));
    assert!(content.contains("grpc.secure_channel(\"localhost:50051\", credentials)"));
}

#[test]
fn target_and_timeout_are_configurable() {
    let outcome = generate(
        vec![simple_file()],
        &["simple.proto"],
        "grpc_target=api.example.com:443,timeout=60,insecure",
    );
    let content = single_content(&outcome);
    assert!(content.contains("grpc.insecure_channel(\"api.example.com:443\")"));
    assert!(content.contains("timeout=60"));
}

#[test]
fn naming_options_apply() {
    let outcome = generate(
        vec![simple_file()],
        &["simple.proto"],
        "tool_name_case=kebab,function_name_pattern=build_{service},server_name_pattern=My{service},output_suffix=_tools.py",
    );
    assert_eq!(outcome.response.file[0].name(), "simple_tools.py");
    let content = outcome.response.file[0].content();
    assert!(content.contains("def build_simpleservice() -> FastMCP:"));
    assert!(content.contains("server = FastMCP(\"MySimpleService\")"));
    assert!(content.contains("name=\"do-something\""));
    // The Python identifier stays valid regardless of the tool name case.
    assert!(content.contains("def do_something("));
}

#[test]
fn enum_names_widen_the_parameter() {
    let mut priority = scalar_field("priority", 1, Type::Enum);
    priority.type_name = Some(".test.complex.Priority".to_string());
    let mut file = complex_file();
    file.message_type[0].field = vec![priority];

    let outcome = generate(vec![file], &["complex.proto"], "enum_names");
    let content = single_content(&outcome);
    assert!(content.contains("priority: Union[int, str]"));
    assert!(content.contains("complex_pb2.Priority.Value(priority)"));
}

#[test]
fn dependency_types_import_their_own_module() {
    let dep = FileDescriptorProto {
        name: Some("common/shared.proto".to_string()),
        package: Some("common".to_string()),
        message_type: vec![
            message("SharedRequest", vec![scalar_field("id", 1, Type::String)]),
            message("SharedResponse", vec![]),
        ],
        ..Default::default()
    };
    let main = FileDescriptorProto {
        name: Some("app.proto".to_string()),
        package: Some("app".to_string()),
        service: vec![service(
            "AppService",
            vec![method("Fetch", ".common.SharedRequest", ".common.SharedResponse")],
        )],
        ..Default::default()
    };

    let outcome = generate(vec![dep, main], &["app.proto"], "");
    assert_eq!(outcome.response.file.len(), 1, "dependency emits no file");
    let content = outcome.response.file[0].content();
    assert!(content.contains("from common import shared_pb2"));
    assert!(content.contains("request = shared_pb2.SharedRequest()"));
    assert!(content.contains("stub = app_pb2_grpc.AppServiceStub(channel)"));
}

#[test]
fn files_without_services_emit_nothing() {
    let file = FileDescriptorProto {
        name: Some("types.proto".to_string()),
        package: Some("types".to_string()),
        message_type: vec![message("JustData", vec![])],
        ..Default::default()
    };
    let outcome = generate(vec![file], &["types.proto"], "");
    assert_eq!(outcome.response.error, None);
    assert!(outcome.response.file.is_empty());
}

#[test]
fn error_format_shapes_the_failure_dict() {
    let simple = generate(vec![simple_file()], &["simple.proto"], "error_format=simple");
    assert!(single_content(&simple).contains("return {\"error\": str(exc)}"));

    let detailed = generate(vec![simple_file()], &["simple.proto"], "error_format=detailed");
    let content = single_content(&detailed);
    assert!(content.contains("\"code\": str(exc.code())"));
    assert!(content.contains("\"details\": exc.details()"));
}

#[test]
fn comments_flow_into_docstrings() {
    use prost_types::source_code_info::Location;
    use prost_types::SourceCodeInfo;

    let mut file = simple_file();
    file.source_code_info = Some(SourceCodeInfo {
        location: vec![
            Location {
                path: vec![6, 0],
                leading_comments: Some(" Keeps things simple.\n".to_string()),
                ..Default::default()
            },
            Location {
                path: vec![6, 0, 2, 0],
                leading_comments: Some(" Does something simple.\n".to_string()),
                ..Default::default()
            },
        ],
    });

    let outcome = generate(vec![file.clone()], &["simple.proto"], "");
    let content = single_content(&outcome);
    assert!(content.contains("\"\"\"Keeps things simple.\"\"\""));
    assert!(content.contains("Does something simple."));
    assert!(content.contains("description=\"Does something simple.\""));

    let without = generate(vec![file], &["simple.proto"], "include_comments=false");
    let content = single_content(&without);
    assert!(!content.contains("Does something simple."));
    assert!(content.contains("Call the SimpleService.DoSomething RPC method."));
}
