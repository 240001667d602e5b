//! Lowering-time failures (`TranspileError` and its subkinds).

use thiserror::Error;

/// A semantic failure during lowering. Unlike the parser's
/// `TypeResolutionError` (an unresolvable type name), this fires when a
/// desugaring rule cannot be applied to the shape it was handed — the only
/// case in this lowerer's rule set is a big-number literal whose decimal
/// text does not parse.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TranspileError {
    /// A `0B`/`0I`-suffixed literal's decimal text failed to parse.
    #[error("malformed big-number literal `{text}`: {reason}")]
    MalformedBigNumberLiteral {
        /// The literal's text, suffix stripped.
        text: String,
        /// Parse failure detail.
        reason: String,
    },
}
