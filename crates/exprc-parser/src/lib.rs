//! Parser front-end (component A): source text -> typed, desugar-target
//! EIR, with bare names resolved against a caller-supplied declaration
//! table.

#![warn(missing_docs)]

mod error;
mod lexer;
mod parser;
mod token;
mod types;

pub use error::{ParseError, TypeResolutionError};
pub use lexer::tokenize;
pub use parser::Parser;
pub use token::{SpannedToken, Token};
pub use types::TypeResolver;

use exprc_ir::{Eir, Interner};
use exprc_types::{ContentKind, ContextKind, DeclarationTable};
use thiserror::Error;

/// The parser front-end's two failure modes: a lexical or
/// syntactic failure, or a cast/`new`/declaration type name that cannot be
/// resolved against the import set plus well-known prefixes.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParserError {
    /// Lexical or syntactic failure.
    #[error(transparent)]
    Parse(#[from] ParseError),
    /// An unresolvable type name in a cast, `new`, or declaration.
    #[error(transparent)]
    TypeResolution(#[from] TypeResolutionError),
}

/// The parser's output: the EIR root, the interner backing its `Symbol`
/// handles, and any non-fatal diagnostics collected while parsing.
#[derive(Debug)]
pub struct ParseOutput {
    /// Root EIR node.
    pub root: Eir,
    /// Symbol table backing the tree's interned names.
    pub interner: Interner,
    /// Non-fatal diagnostics (e.g. unreachable code after `return`).
    pub warnings: Vec<String>,
}

/// Parse `source` under `content_kind`, resolving bare names against
/// `declarations` and cast/`new`/declaration type names against
/// `import_set` plus the well-known `java.lang`/`java.math`/`java.util`
/// prefixes.
pub fn parse(
    source: &str,
    content_kind: ContentKind,
    context_kind: ContextKind,
    declarations: &DeclarationTable,
    import_set: &[String],
) -> Result<ParseOutput, ParserError> {
    let tokens = lexer::tokenize(source).map_err(|(message, span)| {
        let line_index = exprc_ir::LineIndex::new(source);
        ParserError::Parse(ParseError::at(source, &line_index, span, message))
    })?;
    let resolver = TypeResolver::new(import_set);
    let mut parser = Parser::new(source, tokens, context_kind, declarations, &resolver);
    let root = match content_kind {
        ContentKind::Expression => parser.parse_expression_program()?,
        ContentKind::Block => parser.parse_block_program()?,
    };
    let (interner, warnings) = parser.finish();
    Ok(ParseOutput {
        root,
        interner,
        warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use exprc_ir::EirKind;
    use exprc_types::{Declaration, PrimitiveTag, TypeDescriptor};

    fn scenario_table() -> DeclarationTable {
        DeclarationTable::new(
            Declaration::new("ctx", TypeDescriptor::reference("java.util.Map")),
            vec![
                Declaration::new("a", TypeDescriptor::Primitive(PrimitiveTag::Int)),
                Declaration::new("b", TypeDescriptor::Primitive(PrimitiveTag::Int)),
            ],
        )
    }

    #[test]
    fn parses_expression_content_kind() {
        let decls = scenario_table();
        let out = parse("a + b", ContentKind::Expression, ContextKind::Map, &decls, &[]).unwrap();
        assert!(matches!(out.root.kind, EirKind::Binary { .. }));
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn parses_block_content_kind() {
        let decls = scenario_table();
        let out = parse(
            "a = a + 1; b = b * 2; return a + b;",
            ContentKind::Block,
            ContextKind::Map,
            &decls,
            &[],
        )
        .unwrap();
        match out.root.kind {
            EirKind::Block(stmts) => assert_eq!(stmts.len(), 3),
            other => panic!("expected block, got {other:?}"),
        }
    }

    #[test]
    fn reports_parse_error_with_location() {
        let decls = scenario_table();
        let err = parse("a +", ContentKind::Expression, ContextKind::Map, &decls, &[]).unwrap_err();
        assert!(matches!(err, ParserError::Parse(_)));
    }

    #[test]
    fn reports_type_resolution_error_in_cast() {
        let decls = scenario_table();
        let err = parse(
            "(Frobnicator) a",
            ContentKind::Expression,
            ContextKind::Map,
            &decls,
            &[],
        )
        .unwrap_err();
        assert!(matches!(err, ParserError::TypeResolution(_)));
    }
}
