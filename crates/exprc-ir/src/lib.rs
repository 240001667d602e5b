//! Expression IR (EIR) — the typed, desugared tree shared by the parser,
//! lowerer, direct emitter and fallback adapter.

#![warn(missing_docs)]

mod eir;
mod span;
mod symbol;

pub use eir::{AssignOp, BinOp, Eir, EirKind, TemporalUnit, UnOp};
pub use span::{LineIndex, Span};
pub use symbol::{Interner, Symbol};
