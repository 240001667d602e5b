//! Fallback-path failures (`CompileError`): the external host compiler
//! rejected the pretty-printed source. Carries both the generated source
//! and the compiler's diagnostics so the caller sees exactly what was
//! sent and why it bounced — the adapter never retries into the direct
//! emitter.

use crate::host_compiler::Diagnostic;
use thiserror::Error;

/// The fallback compiler adapter rejected (or failed to invoke) the host
/// compiler.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("host compiler rejected generated source for `{class_name}`: {diagnostics:?}")]
pub struct CompileError {
    /// Fully qualified name of the class that failed to compile.
    pub class_name: String,
    /// Pretty-printed source text handed to the host compiler.
    pub generated_source: String,
    /// Diagnostics the host compiler reported.
    pub diagnostics: Vec<Diagnostic>,
}
