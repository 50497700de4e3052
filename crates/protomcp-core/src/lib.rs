//! Core types for the protoc-gen-mcp plugin.
//!
//! This crate provides the foundational types shared by the code generation
//! crates:
//! - Error hierarchy with contextual information
//! - Validated, immutable generation options
//! - Declarative parameter validation rules
//! - A diagnostics channel for non-fatal findings

#![deny(unsafe_code)]
#![warn(missing_docs, missing_debug_implementations)]

mod config;
mod diagnostics;
mod error;

pub mod validation;

pub use config::{DebugLevel, ErrorFormat, GenerationOptions, NameCase, StreamMode};
pub use diagnostics::{Diagnostic, Diagnostics, Severity};
pub use error::{Error, Result};
