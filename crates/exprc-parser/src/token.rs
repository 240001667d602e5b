//! Processed token stream emitted by the lexer.

use exprc_ir::{Span, TemporalUnit};

/// A lexed token paired with its source span.
#[derive(Debug, Clone, PartialEq)]
pub struct SpannedToken {
    /// The token itself.
    pub token: Token,
    /// Its source span.
    pub span: Span,
}

/// The DSL's token set. Digit-suffix literal forms (`1L`, `0B`, `0I`,
/// temporal durations) are recognized here, not reconstructed later from
/// raw text, per the "preserve literal forms" parser contract.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Integer literal with no suffix, e.g. `42`.
    IntLit(i32),
    /// Integer literal with `L` suffix, e.g. `42L`.
    LongLit(i64),
    /// Float literal with `f`/`F` suffix, e.g. `3.14f`.
    FloatLit(f32),
    /// Float literal with no suffix (double precision), e.g. `3.14`.
    DoubleLit(f64),
    /// String literal, already unescaped.
    StringLit(String),
    /// Char literal.
    CharLit(char),
    /// `0B`-suffixed big-decimal literal; payload is the decimal text
    /// before the suffix.
    BigDecimalLit(String),
    /// `0I`-suffixed big-integer literal; payload is the decimal text
    /// before the suffix.
    BigIntegerLit(String),
    /// A temporal duration literal such as `12h30m`, pre-parsed into
    /// `(unit, amount)` components in source order.
    TemporalLit(Vec<(TemporalUnit, i64)>),
    /// `true` / `false`.
    BoolLit(bool),
    /// `null`.
    Null,
    /// An identifier.
    Identifier(String),

    /// `var`
    Var,
    /// `if`
    If,
    /// `else`
    Else,
    /// `return`
    Return,
    /// `new`
    New,
    /// `modify`
    Modify,
    /// `with`
    With,

    /// `+`
    Plus,
    /// `-`
    Minus,
    /// `*`
    Star,
    /// `/`
    Slash,
    /// `%`
    Percent,
    /// `!`
    Bang,
    /// `~`
    Tilde,
    /// `&&`
    AmpAmp,
    /// `||`
    PipePipe,
    /// `&`
    Amp,
    /// `|`
    Pipe,
    /// `^`
    Caret,
    /// `<<`
    Shl,
    /// `>>`
    Shr,
    /// `>>>`
    UShr,
    /// `==`
    EqEq,
    /// `!=`
    BangEq,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `=`
    Eq,
    /// `+=`
    PlusEq,
    /// `-=`
    MinusEq,
    /// `*=`
    StarEq,
    /// `/=`
    SlashEq,
    /// `%=`
    PercentEq,
    /// `&=`
    AmpEq,
    /// `|=`
    PipeEq,
    /// `^=`
    CaretEq,
    /// `<<=`
    ShlEq,
    /// `>>=`
    ShrEq,
    /// `>>>=`
    UShrEq,

    /// `,`
    Comma,
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `{`
    LBrace,
    /// `}`
    RBrace,
    /// `[`
    LBracket,
    /// `]`
    RBracket,
    /// `;`
    Semi,
    /// `:`
    Colon,
    /// `.`
    Dot,
    /// `?`
    Question,
    /// `!.` — null-safe access.
    BangDot,
    /// `#` — inline cast operator.
    Hash,

    /// End of input.
    Eof,
}

impl Token {
    /// A short, human-readable label used in "expected X, found Y"
    /// diagnostics.
    pub fn describe(&self) -> String {
        match self {
            Token::Identifier(name) => format!("identifier `{name}`"),
            Token::Eof => "end of input".to_string(),
            other => format!("{other:?}"),
        }
    }
}
