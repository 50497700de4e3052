//! Per-invocation orchestration.
//!
//! Drives one code generator request end to end: parse and validate options,
//! build the descriptor index, generate each requested file, and assemble
//! the response. Configuration errors abort before any generation begins;
//! a failed file only drops that file and its siblings still generate.

use std::collections::HashSet;

use prost_types::compiler::{code_generator_response, CodeGeneratorRequest, CodeGeneratorResponse};
use protomcp_core::{Diagnostic, Diagnostics, GenerationOptions};

use crate::generator::CodeGenerator;
use crate::index::DescriptorIndex;

/// Everything one invocation produced.
#[derive(Debug)]
pub struct GenerationOutcome {
    /// The response to hand back to the host compiler.
    pub response: CodeGeneratorResponse,
    /// Warnings and file-scoped errors accumulated along the way.
    pub diagnostics: Diagnostics,
}

/// Runs one full generation pass over a decoded request.
///
/// Never panics and never returns an error; failures are reported through
/// the response error field or the diagnostics channel, matching the host
/// compiler contract.
#[must_use]
pub fn generate(request: &CodeGeneratorRequest) -> GenerationOutcome {
    let mut diagnostics = Diagnostics::new();
    let mut response = CodeGeneratorResponse {
        supported_features: Some(u64::from(
            code_generator_response::Feature::Proto3Optional as u32,
        )),
        ..Default::default()
    };

    // All files share one configuration, so a bad parameter is fatal for
    // the whole run.
    let parse = match GenerationOptions::from_parameter(request.parameter()) {
        Ok(parse) => parse,
        Err(error) => {
            tracing::error!("{error}");
            response.error = Some(error.to_string());
            return GenerationOutcome {
                response,
                diagnostics,
            };
        }
    };
    for warning in parse.warnings {
        diagnostics.push(Diagnostic::warning(warning));
    }
    let options = parse.options;

    let generator = match CodeGenerator::new(&options) {
        Ok(generator) => generator,
        Err(error) => {
            tracing::error!("{error}");
            response.error = Some(error.to_string());
            return GenerationOutcome {
                response,
                diagnostics,
            };
        }
    };

    // Index every file, dependencies included; only requested files emit.
    let index = DescriptorIndex::from_files(&request.proto_file);
    let requested: HashSet<&str> = request
        .file_to_generate
        .iter()
        .map(String::as_str)
        .collect();

    for file in &request.proto_file {
        if !requested.contains(file.name()) {
            tracing::debug!(file = file.name(), "dependency only, not generating");
            continue;
        }
        match generator.generate_file(file, &index, &mut diagnostics) {
            Ok(Some(generated)) => {
                response.file.push(code_generator_response::File {
                    name: Some(generated.path),
                    content: Some(generated.content),
                    ..Default::default()
                });
            }
            Ok(None) => {}
            Err(error) => {
                // File-scoped failure; siblings still generate.
                diagnostics.push(Diagnostic::error(error.to_string()).with_file(file.name()));
            }
        }
    }

    tracing::info!(
        generated = response.file.len(),
        warnings = diagnostics.warnings().count(),
        errors = diagnostics.errors().count(),
        "generation finished"
    );

    GenerationOutcome {
        response,
        diagnostics,
    }
}
