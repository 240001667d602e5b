//! Registry-side failures (`CompileError`): the runtime refused a class
//! definition. Never cached — a failed `define` leaves no trace for a
//! retry to trip over.

use thiserror::Error;

/// A class definition was refused, or the bytes handed to the registry
/// could not be read back by its own digest computation (a defect in
/// whichever crate produced them, not a registry-level policy decision).
#[derive(Debug, Error)]
pub enum DefineError {
    /// The defining loader rejected the class (analogous to the JVM's
    /// `LinkageError`/`SecurityException` at class-definition time).
    #[error("class `{class_name}` was refused by the defining loader: {cause}")]
    Refused {
        /// Fully qualified class name that was refused.
        class_name: String,
        /// Underlying cause, as reported by the defining loader.
        cause: String,
    },
    /// The bytes for `class_name` could not be parsed back by the
    /// registry's own disassembler while computing the normalized digest.
    #[error("class `{class_name}` is not a well-formed class file: {source}")]
    Malformed {
        /// Fully qualified class name whose bytes failed to parse.
        class_name: String,
        /// The underlying disassembly error.
        #[source]
        source: exprc_classfile::DisasmError,
    },
}
