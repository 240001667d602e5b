//! The caller-facing `Evaluator<Out>` trait and the concrete
//! type `Compiler::compile` hands back: a loaded class plus an interpreter
//! that actually runs its `eval` method, since this workspace has no real
//! JVM to load the generated bytes into (see DESIGN.md's "host language
//! boundary" decision).

use std::marker::PhantomData;
use std::sync::Arc;

use exprc_registry::LoadedClass;

use crate::context::{EvalContext, FromRtValue};
use crate::error::EvaluationError;
use crate::interp::Interpreter;

/// A loadable, reusable compiled expression (the `Evaluator` object).
/// Object-safe per type parameter: a caller picks the concrete
/// `Out` it wants back and gets a `dyn Evaluator<Out>`.
pub trait Evaluator<Out>: Send + Sync {
    /// Evaluate against `ctx`.
    fn eval(&self, ctx: &EvalContext) -> Result<Out, EvaluationError>;

    /// Evaluate a `with(target){ ... }`-compiled body against `with` (the
    /// implicit receiver a `modify`/`with` block closes over). Bodies that
    /// were never compiled from a `with` block — the overwhelming majority
    /// — have nothing to run here; the default refuses rather than silently
    /// re-running `eval`.
    fn eval_with(&self, with: &EvalContext) -> Result<Out, EvaluationError> {
        let _ = with;
        Err(EvaluationError::NoWithTarget)
    }
}

/// Wraps a [`LoadedClass`] (component E's dedup-aware registry entry) with
/// the bytecode interpreter (this crate's stand-in for a real classloader)
/// to make it directly callable.
pub struct GeneratedEvaluator<Out> {
    class: Arc<LoadedClass>,
    _out: PhantomData<fn() -> Out>,
}

impl<Out> GeneratedEvaluator<Out> {
    /// Wrap an already-defined class.
    pub fn new(class: Arc<LoadedClass>) -> Self {
        Self { class, _out: PhantomData }
    }

    /// The fully qualified name of the wrapped class, as it was registered.
    pub fn class_name(&self) -> &str {
        &self.class.name
    }
}

impl<Out: FromRtValue + Send + Sync> Evaluator<Out> for GeneratedEvaluator<Out> {
    fn eval(&self, ctx: &EvalContext) -> Result<Out, EvaluationError> {
        let interpreter = Interpreter::new(&self.class.decoded);
        let result = interpreter.run_eval(ctx.clone())?;
        Out::from_rt_value(result)
    }
}
