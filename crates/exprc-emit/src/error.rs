//! Emitter-side failures: `MethodResolutionError` surfaces
//! before any bytes are produced, and a verifier-shaped structural defect
//! is a bug in the emitter, not a recoverable condition — it surfaces as
//! `VerifierRejection` rather than being caught and silently falled back.

use exprc_classfile::VerifyError;
use thiserror::Error;

/// A failure raised by the direct emitter once `can_emit` has already
/// accepted the EIR but the emission walk discovers a reflective lookup
/// that does not resolve (a bug in `can_emit`'s gate, or a reflection
/// provider that changed shape between `can_emit` and `emit`).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EmitError {
    /// No method of the given name/arity resolves on the owner class.
    #[error("no method `{name}` with {arity} argument(s) on `{owner}`")]
    MethodResolution {
        /// Receiver class fully qualified name.
        owner: String,
        /// Method simple name.
        name: String,
        /// Argument count the call site supplied.
        arity: usize,
    },
    /// No constructor of the given arity resolves on the owner class.
    #[error("no constructor with {arity} argument(s) on `{owner}`")]
    ConstructorResolution {
        /// Class fully qualified name.
        owner: String,
        /// Argument count the `new` expression supplied.
        arity: usize,
    },
    /// An unbound `NameRef` reached emission — `can_emit`/lowering should
    /// have rejected this before bytes were attempted.
    #[error("unresolved name `{0}` reached the emitter")]
    UnresolvedName(String),
    /// A binary/unary operator was asked to emit against a primitive type
    /// combination the arithmetic table doesn't cover (e.g. a bitwise
    /// operator on a float) — a `can_emit`/lowering gap, since this
    /// combination should have been rejected before emission started.
    #[error("operator `{op}` has no instruction for type `{ty}`")]
    UnsupportedOperator {
        /// Operator's debug name.
        op: String,
        /// Operand type's display name.
        ty: String,
    },
    /// A node shape reached the emission walk that `can_emit` should have
    /// already excluded.
    #[error("unsupported node reached the emitter: {0}")]
    Unsupported(String),
    /// A class-file-shaped structural defect the emitter itself produced.
    #[error(transparent)]
    Verify(#[from] VerifyError),
}
