//! Evaluator class registry (component E): defines
//! generated classes at runtime and deduplicates them by a content hash
//! over their normalized `eval` method bytecode, so a fleet of nearly
//! identical compiled rules shares one loaded code unit.

#![warn(missing_docs)]

mod digest;
mod error;
mod registry;

pub use digest::{digest_bytes, digest_method, MethodDigest};
pub use error::DefineError;
pub use registry::{LoadedClass, Registry};
