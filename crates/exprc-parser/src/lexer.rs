//! Lexer for the expression DSL.
//!
//! Built on `logos` for fast table-driven tokenization, matching this
//! workspace's lexer-generator of choice. Digit-suffix literal forms
//! (`1L`, `0B`, `0I`, `12h30m`) are recognized as distinct token kinds here
//! so the parser never needs to re-inspect raw literal text.

use crate::token::{SpannedToken, Token};
use exprc_ir::{Span, TemporalUnit};
use logos::Logos;

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n]+")]
#[logos(skip r"//[^\n]*")]
enum LogosToken {
    #[token("var")]
    Var,
    #[token("if")]
    If,
    #[token("else")]
    Else,
    #[token("return")]
    Return,
    #[token("new")]
    New,
    #[token("modify")]
    Modify,
    #[token("with")]
    With,
    #[token("true")]
    True,
    #[token("false")]
    False,
    #[token("null")]
    Null,

    #[regex(r"[a-zA-Z_$][a-zA-Z0-9_$]*", |lex| lex.slice().to_string())]
    Identifier(String),

    #[regex(r"[0-9]+(d|ms|h|m|s)([0-9]+(d|ms|h|m|s))*", lex_temporal)]
    TemporalLit(Vec<(TemporalUnit, i64)>),

    #[regex(r"[0-9]+L", |lex| lex.slice().trim_end_matches('L').parse::<i64>().ok())]
    LongLit(i64),

    #[regex(r"[0-9]+(\.[0-9]+)?B", |lex| lex.slice().trim_end_matches('B').to_string())]
    BigDecimalLit(String),

    #[regex(r"[0-9]+I", |lex| lex.slice().trim_end_matches('I').to_string())]
    BigIntegerLit(String),

    #[regex(r"[0-9]+(\.[0-9]+)?[fF]", lex_float)]
    FloatLit(f32),

    #[regex(r"[0-9]+\.[0-9]+([eE][+-]?[0-9]+)?", |lex| lex.slice().parse::<f64>().ok())]
    #[regex(r"[0-9]+[eE][+-]?[0-9]+", |lex| lex.slice().parse::<f64>().ok())]
    DoubleLit(f64),

    #[regex(r"[0-9]+", |lex| lex.slice().parse::<i32>().ok())]
    IntLit(i32),

    #[regex(r#""([^"\\]|\\.)*""#, lex_string)]
    StringLit(String),

    #[regex(r"'([^'\\]|\\.)'", lex_char)]
    CharLit(char),

    #[token("&&")]
    AmpAmp,
    #[token("||")]
    PipePipe,
    #[token(">>>=")]
    UShrEq,
    #[token(">>>")]
    UShr,
    #[token("<<=")]
    ShlEq,
    #[token(">>=")]
    ShrEq,
    #[token("<<")]
    Shl,
    #[token(">>")]
    Shr,
    #[token("==")]
    EqEq,
    #[token("!=")]
    BangEq,
    #[token("<=")]
    Le,
    #[token(">=")]
    Ge,
    #[token("+=")]
    PlusEq,
    #[token("-=")]
    MinusEq,
    #[token("*=")]
    StarEq,
    #[token("/=")]
    SlashEq,
    #[token("%=")]
    PercentEq,
    #[token("&=")]
    AmpEq,
    #[token("|=")]
    PipeEq,
    #[token("^=")]
    CaretEq,
    #[token("!.")]
    BangDot,

    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("!")]
    Bang,
    #[token("~")]
    Tilde,
    #[token("&")]
    Amp,
    #[token("|")]
    Pipe,
    #[token("^")]
    Caret,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token("=")]
    Eq,
    #[token(",")]
    Comma,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token(";")]
    Semi,
    #[token(":")]
    Colon,
    #[token(".")]
    Dot,
    #[token("?")]
    Question,
    #[token("#")]
    Hash,
}

fn lex_temporal(lex: &mut logos::Lexer<LogosToken>) -> Option<Vec<(TemporalUnit, i64)>> {
    let s = lex.slice();
    let bytes = s.as_bytes();
    let mut i = 0usize;
    let mut parts = Vec::new();
    while i < bytes.len() {
        let start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        if i == start {
            return None;
        }
        let amount: i64 = s[start..i].parse().ok()?;
        let rest = &s[i..];
        let unit = if rest.starts_with("ms") {
            i += 2;
            TemporalUnit::Millis
        } else if let Some(c) = rest.chars().next() {
            i += c.len_utf8();
            match c {
                'd' => TemporalUnit::Days,
                'h' => TemporalUnit::Hours,
                'm' => TemporalUnit::Minutes,
                's' => TemporalUnit::Seconds,
                _ => return None,
            }
        } else {
            return None;
        };
        parts.push((unit, amount));
    }
    Some(parts)
}

fn lex_float(lex: &mut logos::Lexer<LogosToken>) -> Option<f32> {
    lex.slice().trim_end_matches(['f', 'F']).parse::<f32>().ok()
}

fn lex_string(lex: &mut logos::Lexer<LogosToken>) -> Option<String> {
    let raw = lex.slice();
    let inner = &raw[1..raw.len() - 1];
    unescape(inner)
}

fn lex_char(lex: &mut logos::Lexer<LogosToken>) -> Option<char> {
    let raw = lex.slice();
    let inner = &raw[1..raw.len() - 1];
    unescape(inner)?.chars().next()
}

fn unescape(s: &str) -> Option<String> {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next()? {
                'n' => out.push('\n'),
                't' => out.push('\t'),
                'r' => out.push('\r'),
                '"' => out.push('"'),
                '\'' => out.push('\''),
                '\\' => out.push('\\'),
                other => out.push(other),
            }
        } else {
            out.push(c);
        }
    }
    Some(out)
}

/// Tokenize `source` into a span-tagged token stream, appending a trailing
/// [`Token::Eof`].
pub fn tokenize(source: &str) -> Result<Vec<SpannedToken>, (String, Span)> {
    let mut out = Vec::new();
    let mut logos_lexer = LogosToken::lexer(source);
    while let Some(result) = logos_lexer.next() {
        let span = logos_lexer.span();
        let span = Span::new(span.start as u32, span.end as u32);
        let token = match result {
            Ok(tok) => convert(tok),
            Err(()) => {
                return Err((
                    format!("unrecognized token `{}`", &source[span.start as usize..span.end as usize]),
                    span,
                ))
            }
        };
        out.push(SpannedToken { token, span });
    }
    let end = source.len() as u32;
    out.push(SpannedToken {
        token: Token::Eof,
        span: Span::new(end, end),
    });
    Ok(out)
}

fn convert(tok: LogosToken) -> Token {
    match tok {
        LogosToken::Var => Token::Var,
        LogosToken::If => Token::If,
        LogosToken::Else => Token::Else,
        LogosToken::Return => Token::Return,
        LogosToken::New => Token::New,
        LogosToken::Modify => Token::Modify,
        LogosToken::With => Token::With,
        LogosToken::True => Token::BoolLit(true),
        LogosToken::False => Token::BoolLit(false),
        LogosToken::Null => Token::Null,
        LogosToken::Identifier(s) => Token::Identifier(s),
        LogosToken::TemporalLit(parts) => Token::TemporalLit(parts),
        LogosToken::LongLit(v) => Token::LongLit(v),
        LogosToken::BigDecimalLit(s) => Token::BigDecimalLit(s),
        LogosToken::BigIntegerLit(s) => Token::BigIntegerLit(s),
        LogosToken::FloatLit(v) => Token::FloatLit(v),
        LogosToken::DoubleLit(v) => Token::DoubleLit(v),
        LogosToken::IntLit(v) => Token::IntLit(v),
        LogosToken::StringLit(s) => Token::StringLit(s),
        LogosToken::CharLit(c) => Token::CharLit(c),
        LogosToken::AmpAmp => Token::AmpAmp,
        LogosToken::PipePipe => Token::PipePipe,
        LogosToken::UShrEq => Token::UShrEq,
        LogosToken::UShr => Token::UShr,
        LogosToken::ShlEq => Token::ShlEq,
        LogosToken::ShrEq => Token::ShrEq,
        LogosToken::Shl => Token::Shl,
        LogosToken::Shr => Token::Shr,
        LogosToken::EqEq => Token::EqEq,
        LogosToken::BangEq => Token::BangEq,
        LogosToken::Le => Token::Le,
        LogosToken::Ge => Token::Ge,
        LogosToken::PlusEq => Token::PlusEq,
        LogosToken::MinusEq => Token::MinusEq,
        LogosToken::StarEq => Token::StarEq,
        LogosToken::SlashEq => Token::SlashEq,
        LogosToken::PercentEq => Token::PercentEq,
        LogosToken::AmpEq => Token::AmpEq,
        LogosToken::PipeEq => Token::PipeEq,
        LogosToken::CaretEq => Token::CaretEq,
        LogosToken::BangDot => Token::BangDot,
        LogosToken::Plus => Token::Plus,
        LogosToken::Minus => Token::Minus,
        LogosToken::Star => Token::Star,
        LogosToken::Slash => Token::Slash,
        LogosToken::Percent => Token::Percent,
        LogosToken::Bang => Token::Bang,
        LogosToken::Tilde => Token::Tilde,
        LogosToken::Amp => Token::Amp,
        LogosToken::Pipe => Token::Pipe,
        LogosToken::Caret => Token::Caret,
        LogosToken::Lt => Token::Lt,
        LogosToken::Gt => Token::Gt,
        LogosToken::Eq => Token::Eq,
        LogosToken::Comma => Token::Comma,
        LogosToken::LParen => Token::LParen,
        LogosToken::RParen => Token::RParen,
        LogosToken::LBrace => Token::LBrace,
        LogosToken::RBrace => Token::RBrace,
        LogosToken::LBracket => Token::LBracket,
        LogosToken::RBracket => Token::RBracket,
        LogosToken::Semi => Token::Semi,
        LogosToken::Colon => Token::Colon,
        LogosToken::Dot => Token::Dot,
        LogosToken::Question => Token::Question,
        LogosToken::Hash => Token::Hash,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenizes_long_and_bigdecimal_suffixes() {
        let toks = tokenize("1L 0B 0I").unwrap();
        assert_eq!(toks[0].token, Token::LongLit(1));
        assert_eq!(toks[1].token, Token::BigDecimalLit("0".to_string()));
        assert_eq!(toks[2].token, Token::BigIntegerLit("0".to_string()));
    }

    #[test]
    fn tokenizes_temporal_literal_as_one_token() {
        let toks = tokenize("12h30m").unwrap();
        assert_eq!(
            toks[0].token,
            Token::TemporalLit(vec![(TemporalUnit::Hours, 12), (TemporalUnit::Minutes, 30)])
        );
    }

    #[test]
    fn tokenizes_null_safe_and_inline_cast_operators() {
        let toks = tokenize("a!.b x#T").unwrap();
        assert!(toks.iter().any(|t| t.token == Token::BangDot));
        assert!(toks.iter().any(|t| t.token == Token::Hash));
    }

    #[test]
    fn rejects_unknown_characters() {
        assert!(tokenize("@@@").is_err());
    }
}
