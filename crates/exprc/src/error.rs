//! Root error types: one `thiserror`-derived enum per crate boundary,
//! composed here behind a single facade root, the same
//! one-root-error-enum-per-boundary pattern this workspace uses
//! throughout.

use exprc_classfile::DisasmError;
use exprc_compiler::TranspileError;
use exprc_emit::EmitError;
use exprc_fallback::CompileError as FallbackError;
use exprc_parser::ParserError;
use exprc_registry::DefineError;
use thiserror::Error;

/// Everything `Compiler::compile` can fail with.
#[derive(Debug, Error)]
pub enum CompilerError {
    /// Component A: lexing/parsing/declaration-resolution failure.
    #[error(transparent)]
    Parse(#[from] ParserError),
    /// Component B: a malformed big-number literal the lowerer rejected.
    #[error(transparent)]
    Lower(#[from] TranspileError),
    /// Component C: the direct emitter was selected but failed after
    /// `can_emit` said yes (a reflective resolution that succeeded during
    /// the gate check but failed during emission itself, or a structural
    /// verify failure) — `can_emit` already filters the common case, so
    /// reaching this is rarer than the fallback path.
    #[error(transparent)]
    Emit(#[from] EmitError),
    /// Component D: the fallback host compiler rejected the pretty-printed
    /// source.
    #[error(transparent)]
    Fallback(#[from] FallbackError),
    /// Component E: the registry could not decode the bytes it was asked to
    /// define (an emitter or host-compiler bug, since both paths are
    /// expected to hand back well-formed class files).
    #[error(transparent)]
    Define(#[from] DefineError),
}

/// Everything an [`crate::Evaluator::eval`] call can fail with once a class
/// has been loaded and is being interpreted.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EvaluationError {
    /// A context/operand value was `null` where the evaluated expression
    /// dereferenced it (field access, unboxing, method invocation).
    #[error("null pointer")]
    NullPointer,
    /// The interpreted result didn't convert to the caller's requested
    /// `Out` type.
    #[error("expected a value convertible to `{expected}`, found `{found}`")]
    TypeMismatch {
        /// The Rust type name the caller asked for.
        expected: &'static str,
        /// `Object.toString()`-rendered actual value.
        found: String,
    },
    /// Division or remainder by zero on an integral type (JVM
    /// `ArithmeticException`; floating-point division by zero instead
    /// produces infinity/NaN per IEEE 754 and is not an error here).
    #[error("/ by zero")]
    DivisionByZero,
    /// A method or static factory the interpreter has no intrinsic
    /// implementation for was invoked (it resolved during `can_emit`'s
    /// reflective gate, but this interpreter's intrinsic table — a stand-in
    /// for a real JVM — doesn't cover it; see DESIGN.md).
    #[error("no interpreter intrinsic for {owner}.{name}/{arity}")]
    UnsupportedIntrinsic {
        /// Fully qualified owner class.
        owner: String,
        /// Method name.
        name: String,
        /// Argument count.
        arity: usize,
    },
    /// `class.eval(Out)`-shaped invocation called on a class with no usable
    /// `eval` method (a malformed/foreign class handed to the registry).
    #[error("class `{0}` has no eval method")]
    MissingEvalMethod(String),
    /// A branch or goto targeted an offset that isn't the start of any
    /// decoded instruction — a code-generation bug, since `CodeBuilder`
    /// only ever patches offsets it bound itself.
    #[error("branch target {0} does not land on an instruction boundary")]
    BadJumpTarget(usize),
    /// The method body's bytecode could not be decoded.
    #[error("malformed method bytecode: {0}")]
    Malformed(#[from] DisasmErrorEq),
    /// The interpreted stack underflowed — a code-generation or interpreter
    /// bug, since a verified method body never pops past what it pushed.
    #[error("operand stack underflow")]
    StackUnderflow,
    /// `eval_with` was called on an evaluator with no `with`-target.
    #[error("this evaluator was not compiled with a `with` target")]
    NoWithTarget,
}

/// [`DisasmError`] wrapper carrying `PartialEq`/`Clone` so it can sit behind
/// [`EvaluationError`], which callers reasonably expect to compare and
/// clone (`DisasmError` derives neither).
#[derive(Debug, Clone)]
pub struct DisasmErrorEq(pub DisasmError);

impl std::fmt::Display for DisasmErrorEq {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

impl std::error::Error for DisasmErrorEq {}

impl PartialEq for DisasmErrorEq {
    fn eq(&self, _other: &Self) -> bool {
        // DisasmError carries no PartialEq impl of its own; any two decode
        // failures compare equal here since interpreter callers only ever
        // match on the EvaluationError variant, never the inner detail.
        true
    }
}

impl From<DisasmError> for EvaluationError {
    fn from(e: DisasmError) -> Self {
        EvaluationError::Malformed(DisasmErrorEq(e))
    }
}
