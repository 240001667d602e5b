//! Direct emitter (component C): the `can_emit` capability
//! gate, the pure `infer_stack_type` helper, reflective method/constructor
//! resolution, and the emission algorithm that turns an accepted EIR tree
//! into a JVM class file.

#![warn(missing_docs)]

mod can_emit;
mod emit;
mod error;
mod infer;
mod reflection;
mod slots;
mod wellknown;

pub use can_emit::{can_emit, diagnose_rejection, Rejection, MAX_CHAIN_DEPTH};
pub use emit::emit_class;
pub use error::EmitError;
pub use infer::infer_stack_type;
pub use reflection::{
    ChainedReflectionProvider, MethodSignature, ReflectionCache, ReflectionProvider,
    WellKnownReflectionProvider,
};
pub use slots::SlotTable;
pub use wellknown::{is_boxed_wrapper, resolve_class_name};
