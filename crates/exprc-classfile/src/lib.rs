//! JVM class-file byte layout (component C infrastructure): constant pool,
//! opcode table, `CodeBuilder`, descriptor-string construction, and the
//! class-file writer. This crate knows nothing about the EIR — it is a
//! pure byte-layout library exercised directly by its own unit tests,
//! analogous to a bytecode-emission crate sitting underneath a compiler
//! crate in a typical workspace layout.

#![warn(missing_docs)]

mod class_writer;
mod code_builder;
mod constant_pool;
mod descriptor;
mod disasm;
mod opcode;
mod verify;

pub use class_writer::{
    ClassFile, FieldDef, MethodDef, ACC_FINAL, ACC_PUBLIC, ACC_PUBLIC_MEMBER, ACC_SUPER,
};
pub use code_builder::{CodeBuilder, Label};
pub use constant_pool::ConstantPool;
pub use descriptor::{descriptor_for, internal_name, method_descriptor};
pub use disasm::{instructions, parse_class, DecodedClass, DecodedMethod, DisasmError, Instruction, Operand, ResolvedConstant};
pub use opcode::Opcode;
pub use verify::{verify_code, VerifyError};

/// Class-file-shaped errors: anything that would make a class definition
/// fail at load time, distinct from emitter-level `can_emit` rejections.
#[derive(Debug, thiserror::Error)]
pub enum ClassFileError {
    /// A verifier-shaped structural check failed before bytes were handed
    /// to the registry ("the emitter never emits a
    /// half-written class").
    #[error(transparent)]
    Verify(#[from] VerifyError),
}
