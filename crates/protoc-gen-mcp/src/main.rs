//! protoc plugin entry point.
//!
//! Speaks the standard protoc plugin contract: one serialized
//! `CodeGeneratorRequest` on stdin, one serialized `CodeGeneratorResponse`
//! on stdout. Everything diagnostic goes to stderr through `tracing`, never
//! into the response.
//!
//! ```bash
//! protoc --plugin=protoc-gen-mcp --mcp_out=gen --mcp_opt="async,timeout=60" shop/orders.proto
//! ```

use std::io::{Read, Write};

use anyhow::Context;
use prost::Message;
use prost_types::compiler::CodeGeneratorRequest;
use protomcp_codegen::pipeline;
use protomcp_core::{Error, GenerationOptions};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() -> anyhow::Result<()> {
    let mut input = Vec::new();
    std::io::stdin()
        .read_to_end(&mut input)
        .context("failed to read the code generator request from stdin")?;

    let request = CodeGeneratorRequest::decode(input.as_slice())
        .map_err(|e| Error::MalformedRequest(e.to_string()))?;

    init_tracing(request.parameter());

    let outcome = pipeline::generate(&request);

    let mut output = Vec::with_capacity(outcome.response.encoded_len());
    outcome
        .response
        .encode(&mut output)
        .context("failed to encode the code generator response")?;
    std::io::stdout()
        .write_all(&output)
        .context("failed to write the code generator response to stdout")?;
    Ok(())
}

/// Maps the `debug` plugin parameter onto a `tracing` filter, keeping
/// `RUST_LOG` as an override. Output goes to stderr; stdout belongs to the
/// plugin wire protocol.
fn init_tracing(parameter: &str) {
    let directive = GenerationOptions::from_parameter(parameter)
        .map(|parse| parse.options.debug_level.filter_directive())
        .unwrap_or("warn");

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
