//! Descriptor analysis and code generation for protoc-gen-mcp.
//!
//! Transforms protobuf service descriptors into Python source files that
//! expose every RPC method as a FastMCP tool. The crate is a synchronous,
//! in-memory batch transformer:
//!
//! 1. [`DescriptorIndex`] registers every message and enum type in the
//!    compilation unit, dependencies included.
//! 2. [`analyzer::TypeAnalyzer`] classifies each field into a canonical
//!    [`model::FieldModel`] against that index.
//! 3. [`CodeGenerator`] renders tool functions and service factories from
//!    the models and the validated options.
//! 4. [`pipeline::generate`] drives the above per invocation and assembles
//!    the response for the host compiler.

#![deny(unsafe_code)]
#![warn(missing_docs, missing_debug_implementations)]

pub mod analyzer;
pub mod generator;
pub mod index;
pub mod model;
pub mod pipeline;
pub mod python;
pub mod template_engine;

pub use generator::CodeGenerator;
pub use index::DescriptorIndex;
pub use model::{GeneratedCode, GeneratedFile};
