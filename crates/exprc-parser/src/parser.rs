//! Recursive-descent / precedence-climbing parser: token stream -> [`Eir`].
//!
//! Two ambiguities need a checkpoint/restore backtrack rather than a single
//! token of lookahead: `(Type) expr` vs `(expr)`, and a leading-type
//! declaration (`Foo x = ...;`) vs an expression statement that happens to
//! start with an identifier. Both are handled by saving the token cursor,
//! attempting the longer match, and rewinding on failure.

use crate::error::ParseError;
use crate::token::{SpannedToken, Token};
use crate::types::TypeResolver;
use crate::ParserError;
use exprc_ir::{AssignOp, BinOp, Eir, EirKind, Interner, LineIndex, Span, Symbol, UnOp};
use exprc_types::{ContextKind, DeclarationTable, TypeDescriptor};
use rustc_hash::FxHashMap;

/// Parser state: the token cursor plus the declaration-resolution context
/// carried through from the [`crate::parse`] entry point.
pub struct Parser<'a> {
    source: &'a str,
    line_index: LineIndex,
    tokens: Vec<SpannedToken>,
    pos: usize,
    #[allow(dead_code)]
    context_kind: ContextKind,
    declarations: &'a DeclarationTable,
    resolver: &'a TypeResolver,
    interner: Interner,
    scopes: Vec<FxHashMap<String, (Symbol, Option<TypeDescriptor>)>>,
    warnings: Vec<String>,
}

impl<'a> Parser<'a> {
    /// Build a parser over an already-tokenized source string.
    pub fn new(
        source: &'a str,
        tokens: Vec<SpannedToken>,
        context_kind: ContextKind,
        declarations: &'a DeclarationTable,
        resolver: &'a TypeResolver,
    ) -> Self {
        Self {
            line_index: LineIndex::new(source),
            source,
            tokens,
            pos: 0,
            context_kind,
            declarations,
            resolver,
            interner: Interner::new(),
            scopes: vec![FxHashMap::default()],
            warnings: Vec::new(),
        }
    }

    /// Consume `self`, returning the interner that owns the tree's symbols
    /// and the diagnostics collected while parsing.
    pub fn finish(self) -> (Interner, Vec<String>) {
        (self.interner, self.warnings)
    }

    // ---- entry points ----

    /// Parse a single expression followed by end of input (the
    /// `ContentKind::Expression` start rule).
    pub fn parse_expression_program(&mut self) -> Result<Eir, ParserError> {
        let expr = self.parse_expr()?;
        self.expect(Token::Eof, "end of input")?;
        Ok(expr)
    }

    /// Parse a `;`-separated statement sequence followed by end of input
    /// (the `ContentKind::Block` start rule). Unlike a brace-delimited
    /// block, there is no enclosing `{`/`}` pair here.
    pub fn parse_block_program(&mut self) -> Result<Eir, ParserError> {
        let start = self.current_span();
        let mut stmts = Vec::new();
        while !self.at(Token::Eof) {
            stmts.push(self.parse_statement()?);
        }
        self.warn_unreachable(&stmts);
        let end = self.current_span();
        Ok(Eir::new(start.to(end), EirKind::Block(stmts)))
    }

    // ---- statements ----

    fn parse_statement(&mut self) -> Result<Eir, ParserError> {
        match &self.peek().token {
            Token::Semi => {
                let span = self.current_span();
                self.advance();
                Ok(Eir::new(span, EirKind::Empty))
            }
            Token::LBrace => self.parse_brace_block(),
            Token::If => self.parse_if(),
            Token::Return => self.parse_return(),
            Token::Var => self.parse_var_decl_inferred(),
            Token::Modify => self.parse_modify_or_with(true),
            Token::With => self.parse_modify_or_with(false),
            Token::Identifier(_) => self.parse_identifier_led_statement(),
            _ => self.parse_expr_statement(),
        }
    }

    fn parse_brace_block(&mut self) -> Result<Eir, ParserError> {
        let start = self.current_span();
        self.expect(Token::LBrace, "`{`")?;
        self.scopes.push(FxHashMap::default());
        let mut stmts = Vec::new();
        while !self.at(Token::RBrace) && !self.at(Token::Eof) {
            stmts.push(self.parse_statement()?);
        }
        self.warn_unreachable(&stmts);
        self.scopes.pop();
        let end = self.current_span();
        self.expect(Token::RBrace, "`}`")?;
        Ok(Eir::new(start.to(end), EirKind::Block(stmts)))
    }

    fn warn_unreachable(&mut self, stmts: &[Eir]) {
        if let Some(idx) = stmts.iter().position(|s| s.always_returns()) {
            if idx + 1 < stmts.len() {
                self.warnings
                    .push("unreachable code after a statement that always returns".to_string());
            }
        }
    }

    fn parse_if(&mut self) -> Result<Eir, ParserError> {
        let start = self.current_span();
        self.advance(); // if
        self.expect(Token::LParen, "`(`")?;
        let cond = self.parse_expr()?;
        self.expect(Token::RParen, "`)`")?;
        let then_branch = self.parse_statement()?;
        let else_branch = if self.at(Token::Else) {
            self.advance();
            Some(Box::new(self.parse_statement()?))
        } else {
            None
        };
        let end = else_branch
            .as_ref()
            .map(|e| e.span)
            .unwrap_or(then_branch.span);
        Ok(Eir::new(
            start.to(end),
            EirKind::If {
                cond: Box::new(cond),
                then_branch: Box::new(then_branch),
                else_branch,
            },
        ))
    }

    fn parse_return(&mut self) -> Result<Eir, ParserError> {
        let start = self.current_span();
        self.advance(); // return
        let expr = if self.at(Token::Semi) {
            None
        } else {
            Some(Box::new(self.parse_expr()?))
        };
        let end = self.current_span();
        self.expect(Token::Semi, "`;`")?;
        Ok(Eir::new(start.to(end), EirKind::Return(expr)))
    }

    fn parse_var_decl_inferred(&mut self) -> Result<Eir, ParserError> {
        let start = self.current_span();
        self.advance(); // var
        let name_sym = self.expect_identifier_declared(None)?;
        let init = if self.at(Token::Eq) {
            self.advance();
            Some(Box::new(self.parse_expr()?))
        } else {
            None
        };
        let end = self.current_span();
        self.expect(Token::Semi, "`;`")?;
        Ok(Eir::new(
            start.to(end),
            EirKind::VarDecl {
                declared_type: None,
                name: name_sym,
                init,
            },
        ))
    }

    /// A statement beginning with an identifier is either a typed
    /// declaration (`Foo x = ...;`) or an expression statement (`foo();`,
    /// `x = 1;`). Disambiguated by attempting to parse a type path and
    /// checking whether a second identifier follows it.
    fn parse_identifier_led_statement(&mut self) -> Result<Eir, ParserError> {
        let checkpoint = self.pos;
        if let Some(type_text) = self.try_parse_type_path() {
            if let Token::Identifier(_) = &self.peek().token {
                if matches!(self.peek_at(1).token, Token::Eq | Token::Semi) {
                    return self.finish_typed_var_decl(type_text);
                }
            }
        }
        self.pos = checkpoint;
        self.parse_expr_statement()
    }

    fn finish_typed_var_decl(&mut self, type_text: String) -> Result<Eir, ParserError> {
        let start = self.current_span();
        let declared_type = self.resolve_type_text(&type_text)?;
        let name_sym = self.expect_identifier_declared(Some(declared_type.clone()))?;
        let init = if self.at(Token::Eq) {
            self.advance();
            Some(Box::new(self.parse_expr()?))
        } else {
            None
        };
        let end = self.current_span();
        self.expect(Token::Semi, "`;`")?;
        Ok(Eir::new(
            start.to(end),
            EirKind::VarDecl {
                declared_type: Some(declared_type),
                name: name_sym,
                init,
            },
        ))
    }

    fn parse_modify_or_with(&mut self, is_modify: bool) -> Result<Eir, ParserError> {
        let start = self.current_span();
        self.advance(); // modify | with
        self.expect(Token::LParen, "`(`")?;
        let target = self.parse_expr()?;
        self.expect(Token::RParen, "`)`")?;
        self.expect(Token::LBrace, "`{`")?;
        self.scopes.push(FxHashMap::default());
        let mut stmts = Vec::new();
        while !self.at(Token::RBrace) && !self.at(Token::Eof) {
            stmts.push(self.parse_statement()?);
        }
        self.scopes.pop();
        let end = self.current_span();
        self.expect(Token::RBrace, "`}`")?;
        let kind = if is_modify {
            EirKind::Modify {
                target: Box::new(target),
                stmts,
            }
        } else {
            EirKind::With {
                target: Box::new(target),
                stmts,
            }
        };
        Ok(Eir::new(start.to(end), kind))
    }

    fn parse_expr_statement(&mut self) -> Result<Eir, ParserError> {
        let start = self.current_span();
        let expr = self.parse_expr()?;
        let end = self.current_span();
        self.expect(Token::Semi, "`;`")?;
        Ok(Eir::new(start.to(end), EirKind::ExprStmt(Box::new(expr))))
    }

    // ---- expressions (precedence climbing) ----

    fn parse_expr(&mut self) -> Result<Eir, ParserError> {
        self.parse_assignment()
    }

    fn parse_assignment(&mut self) -> Result<Eir, ParserError> {
        let target = self.parse_logical_or()?;
        let op = match &self.peek().token {
            Token::Eq => AssignOp::Assign,
            Token::PlusEq => AssignOp::AddAssign,
            Token::MinusEq => AssignOp::SubAssign,
            Token::StarEq => AssignOp::MulAssign,
            Token::SlashEq => AssignOp::DivAssign,
            Token::PercentEq => AssignOp::RemAssign,
            Token::AmpEq => AssignOp::AndAssign,
            Token::PipeEq => AssignOp::OrAssign,
            Token::CaretEq => AssignOp::XorAssign,
            Token::ShlEq => AssignOp::ShlAssign,
            Token::ShrEq => AssignOp::ShrAssign,
            Token::UShrEq => AssignOp::UShrAssign,
            _ => return Ok(target),
        };
        self.advance();
        let value = self.parse_assignment()?;
        let span = target.span.to(value.span);
        Ok(Eir::new(
            span,
            EirKind::Assign {
                target: Box::new(target),
                op,
                value: Box::new(value),
            },
        ))
    }

    fn parse_logical_or(&mut self) -> Result<Eir, ParserError> {
        let mut left = self.parse_logical_and()?;
        while self.at(Token::PipePipe) {
            self.advance();
            let right = self.parse_logical_and()?;
            left = self.binary(BinOp::Or, left, right);
        }
        Ok(left)
    }

    fn parse_logical_and(&mut self) -> Result<Eir, ParserError> {
        let mut left = self.parse_bit_or()?;
        while self.at(Token::AmpAmp) {
            self.advance();
            let right = self.parse_bit_or()?;
            left = self.binary(BinOp::And, left, right);
        }
        Ok(left)
    }

    fn parse_bit_or(&mut self) -> Result<Eir, ParserError> {
        let mut left = self.parse_bit_xor()?;
        while self.at(Token::Pipe) {
            self.advance();
            let right = self.parse_bit_xor()?;
            left = self.binary(BinOp::BitOr, left, right);
        }
        Ok(left)
    }

    fn parse_bit_xor(&mut self) -> Result<Eir, ParserError> {
        let mut left = self.parse_bit_and()?;
        while self.at(Token::Caret) {
            self.advance();
            let right = self.parse_bit_and()?;
            left = self.binary(BinOp::BitXor, left, right);
        }
        Ok(left)
    }

    fn parse_bit_and(&mut self) -> Result<Eir, ParserError> {
        let mut left = self.parse_equality()?;
        while self.at(Token::Amp) {
            self.advance();
            let right = self.parse_equality()?;
            left = self.binary(BinOp::BitAnd, left, right);
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> Result<Eir, ParserError> {
        let mut left = self.parse_relational()?;
        loop {
            let op = match &self.peek().token {
                Token::EqEq => BinOp::Eq,
                Token::BangEq => BinOp::Ne,
                _ => break,
            };
            self.advance();
            let right = self.parse_relational()?;
            left = self.binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_relational(&mut self) -> Result<Eir, ParserError> {
        let mut left = self.parse_shift()?;
        loop {
            let op = match &self.peek().token {
                Token::Lt => BinOp::Lt,
                Token::Le => BinOp::Le,
                Token::Gt => BinOp::Gt,
                Token::Ge => BinOp::Ge,
                _ => break,
            };
            self.advance();
            let right = self.parse_shift()?;
            left = self.binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_shift(&mut self) -> Result<Eir, ParserError> {
        let mut left = self.parse_additive()?;
        loop {
            let op = match &self.peek().token {
                Token::Shl => BinOp::Shl,
                Token::Shr => BinOp::Shr,
                Token::UShr => BinOp::UShr,
                _ => break,
            };
            self.advance();
            let right = self.parse_additive()?;
            left = self.binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_additive(&mut self) -> Result<Eir, ParserError> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match &self.peek().token {
                Token::Plus => BinOp::Add,
                Token::Minus => BinOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_multiplicative()?;
            left = self.binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Eir, ParserError> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match &self.peek().token {
                Token::Star => BinOp::Mul,
                Token::Slash => BinOp::Div,
                Token::Percent => BinOp::Rem,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary()?;
            left = self.binary(op, left, right);
        }
        Ok(left)
    }

    fn binary(&self, op: BinOp, left: Eir, right: Eir) -> Eir {
        let span = left.span.to(right.span);
        Eir::new(
            span,
            EirKind::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
        )
    }

    fn parse_unary(&mut self) -> Result<Eir, ParserError> {
        let start = self.current_span();
        let op = match &self.peek().token {
            Token::Bang => UnOp::Not,
            Token::Minus => UnOp::Neg,
            Token::Tilde => UnOp::BitNot,
            _ => return self.parse_postfix(),
        };
        self.advance();
        let inner = self.parse_unary()?;
        let span = start.to(inner.span);
        Ok(Eir::new(
            span,
            EirKind::Unary {
                op,
                inner: Box::new(inner),
            },
        ))
    }

    fn parse_postfix(&mut self) -> Result<Eir, ParserError> {
        let mut expr = self.parse_primary()?;
        loop {
            match &self.peek().token {
                Token::Dot => {
                    self.advance();
                    let (name, name_span) = self.expect_identifier_name()?;
                    let sym = self.interner.intern(&name);
                    if self.at(Token::LParen) {
                        self.advance();
                        let args = self.parse_arg_list()?;
                        let end = self.current_span();
                        self.expect(Token::RParen, "`)`")?;
                        let span = expr.span.to(end);
                        expr = Eir::new(
                            span,
                            EirKind::MethodCall {
                                scope: Some(Box::new(expr)),
                                name: sym,
                                args,
                            },
                        );
                    } else {
                        let span = expr.span.to(name_span);
                        expr = Eir::new(
                            span,
                            EirKind::FieldGet {
                                scope: Box::new(expr),
                                field: sym,
                            },
                        );
                    }
                }
                Token::BangDot => {
                    self.advance();
                    let (name, name_span) = self.expect_identifier_name()?;
                    let sym = self.interner.intern(&name);
                    if self.at(Token::LParen) {
                        self.advance();
                        let args = self.parse_arg_list()?;
                        let end = self.current_span();
                        self.expect(Token::RParen, "`)`")?;
                        let span = expr.span.to(end);
                        expr = Eir::new(
                            span,
                            EirKind::NullSafeMethodCall {
                                scope: Box::new(expr),
                                name: sym,
                                args,
                            },
                        );
                    } else {
                        let span = expr.span.to(name_span);
                        expr = Eir::new(
                            span,
                            EirKind::NullSafeFieldGet {
                                scope: Box::new(expr),
                                field: sym,
                            },
                        );
                    }
                }
                Token::LBracket => {
                    self.advance();
                    let index = self.parse_expr()?;
                    let end = self.current_span();
                    self.expect(Token::RBracket, "`]`")?;
                    let span = expr.span.to(end);
                    expr = Eir::new(
                        span,
                        EirKind::ArrayAccess {
                            scope: Box::new(expr),
                            index: Box::new(index),
                        },
                    );
                }
                Token::Hash => {
                    self.advance();
                    let type_text = self.try_parse_type_path().ok_or_else(|| {
                        self.error("expected a type name after `#`")
                    })?;
                    let target_type = self.resolve_type_text(&type_text)?;
                    let end = self.current_span();
                    expr = Eir::new(
                        expr.span.to(end),
                        EirKind::InlineCast {
                            target_type,
                            inner: Box::new(expr),
                        },
                    );
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_arg_list(&mut self) -> Result<Vec<Eir>, ParserError> {
        let mut args = Vec::new();
        if self.at(Token::RParen) {
            return Ok(args);
        }
        args.push(self.parse_expr()?);
        while self.at(Token::Comma) {
            self.advance();
            args.push(self.parse_expr()?);
        }
        Ok(args)
    }

    fn parse_primary(&mut self) -> Result<Eir, ParserError> {
        let span = self.current_span();
        match self.peek().token.clone() {
            Token::IntLit(v) => {
                self.advance();
                Ok(Eir::typed(span, TypeDescriptor::Primitive(exprc_types::PrimitiveTag::Int), EirKind::IntLit(v)))
            }
            Token::LongLit(v) => {
                self.advance();
                Ok(Eir::typed(span, TypeDescriptor::Primitive(exprc_types::PrimitiveTag::Long), EirKind::LongLit(v)))
            }
            Token::FloatLit(v) => {
                self.advance();
                Ok(Eir::typed(span, TypeDescriptor::Primitive(exprc_types::PrimitiveTag::Float), EirKind::FloatLit(v)))
            }
            Token::DoubleLit(v) => {
                self.advance();
                Ok(Eir::typed(span, TypeDescriptor::Primitive(exprc_types::PrimitiveTag::Double), EirKind::DoubleLit(v)))
            }
            Token::BoolLit(v) => {
                self.advance();
                Ok(Eir::typed(span, TypeDescriptor::Primitive(exprc_types::PrimitiveTag::Boolean), EirKind::BoolLit(v)))
            }
            Token::Null => {
                self.advance();
                Ok(Eir::new(span, EirKind::NullLit))
            }
            Token::StringLit(s) => {
                self.advance();
                Ok(Eir::typed(span, TypeDescriptor::reference("java.lang.String"), EirKind::StringLit(s)))
            }
            Token::CharLit(c) => {
                self.advance();
                Ok(Eir::typed(span, TypeDescriptor::Primitive(exprc_types::PrimitiveTag::Char), EirKind::CharLit(c)))
            }
            Token::BigDecimalLit(s) => {
                self.advance();
                Ok(Eir::new(span, EirKind::BigDecimalLit(s)))
            }
            Token::BigIntegerLit(s) => {
                self.advance();
                Ok(Eir::new(span, EirKind::BigIntegerLit(s)))
            }
            Token::TemporalLit(parts) => {
                self.advance();
                Ok(Eir::new(span, EirKind::TemporalDurationLit(parts)))
            }
            Token::New => self.parse_object_new(),
            Token::LParen => self.parse_paren_or_cast(),
            Token::LBracket => self.parse_bracket_literal(),
            Token::Identifier(name) => {
                self.advance();
                if self.at(Token::LParen) {
                    self.advance();
                    let sym = self.interner.intern(&name);
                    let args = self.parse_arg_list()?;
                    let end = self.current_span();
                    self.expect(Token::RParen, "`)`")?;
                    Ok(Eir::new(
                        span.to(end),
                        EirKind::MethodCall {
                            scope: None,
                            name: sym,
                            args,
                        },
                    ))
                } else {
                    let (sym, ty) = self.resolve_name(&name);
                    Ok(match ty {
                        Some(ty) => Eir::typed(span, ty, EirKind::NameRef(sym)),
                        None => Eir::new(span, EirKind::NameRef(sym)),
                    })
                }
            }
            other => Err(self.error(format!("expected an expression, found {}", other.describe()))),
        }
    }

    fn parse_object_new(&mut self) -> Result<Eir, ParserError> {
        let start = self.current_span();
        self.advance(); // new
        let type_text = self
            .try_parse_type_path()
            .ok_or_else(|| self.error("expected a type name after `new`"))?;
        self.expect(Token::LParen, "`(`")?;
        let args = self.parse_arg_list()?;
        let end = self.current_span();
        self.expect(Token::RParen, "`)`")?;
        Ok(Eir::new(
            start.to(end),
            EirKind::ObjectNew {
                ty: type_text,
                args,
            },
        ))
    }

    /// `(` has just been peeked (not yet consumed). Attempts the cast
    /// reading first via checkpoint/restore, falling back to a plain
    /// parenthesized expression.
    fn parse_paren_or_cast(&mut self) -> Result<Eir, ParserError> {
        let start = self.current_span();
        let checkpoint = self.pos;
        self.advance(); // (
        if let Some(type_text) = self.try_parse_type_path() {
            if self.at(Token::RParen) {
                let after_paren = self.pos + 1;
                if after_paren < self.tokens.len() && token_starts_unary(&self.tokens[after_paren].token) {
                    self.advance(); // )
                    let target_type = self.resolve_type_text(&type_text)?;
                    let inner = self.parse_unary()?;
                    let span = start.to(inner.span);
                    return Ok(Eir::new(
                        span,
                        EirKind::Cast {
                            target_type,
                            inner: Box::new(inner),
                        },
                    ));
                }
            }
        }
        self.pos = checkpoint;
        self.advance(); // (
        let inner = self.parse_expr()?;
        let end = self.current_span();
        self.expect(Token::RParen, "`)`")?;
        Ok(Eir::new(start.to(end), EirKind::Enclosed(Box::new(inner))))
    }

    fn parse_bracket_literal(&mut self) -> Result<Eir, ParserError> {
        let start = self.current_span();
        self.advance(); // [
        if self.at(Token::Colon) {
            self.advance();
            let end = self.current_span();
            self.expect(Token::RBracket, "`]`")?;
            return Ok(Eir::new(start.to(end), EirKind::MapLiteral(Vec::new())));
        }
        if self.at(Token::RBracket) {
            let end = self.current_span();
            self.advance();
            return Ok(Eir::new(start.to(end), EirKind::ListLiteral(Vec::new())));
        }
        let first = self.parse_expr()?;
        if self.at(Token::Colon) {
            self.advance();
            let first_value = self.parse_expr()?;
            let mut pairs = vec![(first, first_value)];
            while self.at(Token::Comma) {
                self.advance();
                let k = self.parse_expr()?;
                self.expect(Token::Colon, "`:`")?;
                let v = self.parse_expr()?;
                pairs.push((k, v));
            }
            let end = self.current_span();
            self.expect(Token::RBracket, "`]`")?;
            Ok(Eir::new(start.to(end), EirKind::MapLiteral(pairs)))
        } else {
            let mut items = vec![first];
            while self.at(Token::Comma) {
                self.advance();
                items.push(self.parse_expr()?);
            }
            let end = self.current_span();
            self.expect(Token::RBracket, "`]`")?;
            Ok(Eir::new(start.to(end), EirKind::ListLiteral(items)))
        }
    }

    // ---- type-name parsing ----

    /// Attempts to parse a dotted identifier chain, optionally followed by
    /// a `<...>` generic suffix, returning its source text. Leaves the
    /// cursor past the match on success; on failure the cursor position is
    /// unspecified and the caller must restore it from a checkpoint.
    fn try_parse_type_path(&mut self) -> Option<String> {
        let Token::Identifier(first) = &self.peek().token else {
            return None;
        };
        let mut text = first.clone();
        self.advance();
        while matches!(self.peek().token, Token::Dot)
            && matches!(self.peek_at(1).token, Token::Identifier(_))
        {
            self.advance(); // .
            if let Token::Identifier(name) = &self.peek().token {
                text.push('.');
                text.push_str(name);
            }
            self.advance();
        }
        if matches!(self.peek().token, Token::Lt) {
            text.push('<');
            self.advance();
            let mut depth = 1i32;
            loop {
                match &self.peek().token {
                    Token::Lt => {
                        depth += 1;
                        text.push('<');
                        self.advance();
                    }
                    Token::Gt => {
                        depth -= 1;
                        text.push('>');
                        self.advance();
                        if depth == 0 {
                            break;
                        }
                    }
                    Token::Identifier(name) => {
                        text.push_str(name);
                        self.advance();
                    }
                    Token::Comma => {
                        text.push(',');
                        self.advance();
                    }
                    Token::Dot => {
                        text.push('.');
                        self.advance();
                    }
                    _ => return None,
                }
            }
        }
        Some(text)
    }

    fn resolve_type_text(&self, text: &str) -> Result<TypeDescriptor, ParserError> {
        if text.contains('<') {
            Ok(self.resolver.resolve_permissive(text))
        } else {
            Ok(self.resolver.resolve(text)?)
        }
    }

    // ---- name resolution ----

    fn resolve_name(&mut self, name: &str) -> (Symbol, Option<TypeDescriptor>) {
        for scope in self.scopes.iter().rev() {
            if let Some((sym, ty)) = scope.get(name) {
                return (*sym, ty.clone());
            }
        }
        let ty = self
            .declarations
            .find(name)
            .map(|d| d.ty.clone())
            .or_else(|| {
                if self.declarations.context.name == name {
                    Some(self.declarations.context.ty.clone())
                } else {
                    None
                }
            });
        let sym = self.interner.intern(name);
        (sym, ty)
    }

    fn expect_identifier_declared(
        &mut self,
        declared_type: Option<TypeDescriptor>,
    ) -> Result<Symbol, ParserError> {
        let (name, _) = self.expect_identifier_name()?;
        let sym = self.interner.intern(&name);
        self.scopes
            .last_mut()
            .expect("at least one scope")
            .insert(name, (sym, declared_type));
        Ok(sym)
    }

    fn expect_identifier_name(&mut self) -> Result<(String, Span), ParserError> {
        let span = self.current_span();
        match self.peek().token.clone() {
            Token::Identifier(name) => {
                self.advance();
                Ok((name, span))
            }
            other => Err(self.error(format!("expected an identifier, found {}", other.describe()))),
        }
    }

    // ---- token cursor ----

    fn peek(&self) -> &SpannedToken {
        &self.tokens[self.pos]
    }

    fn peek_at(&self, offset: usize) -> &SpannedToken {
        self.tokens
            .get(self.pos + offset)
            .unwrap_or_else(|| self.tokens.last().unwrap())
    }

    fn advance(&mut self) -> SpannedToken {
        let tok = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn at(&self, token: Token) -> bool {
        self.peek().token == token
    }

    fn current_span(&self) -> Span {
        self.peek().span
    }

    fn expect(&mut self, token: Token, what: &str) -> Result<SpannedToken, ParserError> {
        if self.peek().token == token {
            Ok(self.advance())
        } else {
            let found = self.peek().token.describe();
            Err(self.error(format!("expected {what}, found {found}")))
        }
    }

    fn error(&self, message: impl Into<String>) -> ParserError {
        ParserError::Parse(ParseError::at(
            self.source,
            &self.line_index,
            self.current_span(),
            message,
        ))
    }
}

/// Whether `token` can begin a unary expression, used as the lookahead
/// check that disambiguates `(Type) expr` from `(expr)`: after a
/// successfully parsed type path and closing `)`, a cast is only plausible
/// if what follows could itself start an operand.
fn token_starts_unary(token: &Token) -> bool {
    matches!(
        token,
        Token::Identifier(_)
            | Token::IntLit(_)
            | Token::LongLit(_)
            | Token::FloatLit(_)
            | Token::DoubleLit(_)
            | Token::BoolLit(_)
            | Token::StringLit(_)
            | Token::CharLit(_)
            | Token::BigDecimalLit(_)
            | Token::BigIntegerLit(_)
            | Token::TemporalLit(_)
            | Token::Null
            | Token::New
            | Token::LParen
            | Token::LBracket
            | Token::Bang
            | Token::Minus
            | Token::Tilde
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;
    use crate::types::TypeResolver;
    use exprc_types::{ContextKind, Declaration, DeclarationTable, PrimitiveTag};

    fn table() -> DeclarationTable {
        DeclarationTable::new(
            Declaration::new("ctx", TypeDescriptor::reference("java.util.Map")),
            vec![
                Declaration::new("influence", TypeDescriptor::Primitive(PrimitiveTag::Int)),
                Declaration::new("atWar", TypeDescriptor::Primitive(PrimitiveTag::Boolean)),
                Declaration::new("stability", TypeDescriptor::Primitive(PrimitiveTag::Int)),
            ],
        )
    }

    fn parse_expr(source: &str) -> Eir {
        let decls = table();
        let resolver = TypeResolver::new(&[]);
        let tokens = tokenize(source).unwrap();
        let mut parser = Parser::new(source, tokens, ContextKind::Map, &decls, &resolver);
        parser.parse_expression_program().unwrap()
    }

    #[test]
    fn parses_scenario_one_boolean_expression() {
        let eir = parse_expr("influence > 50 && !atWar && stability > 30");
        match eir.kind {
            EirKind::Binary { op: BinOp::And, .. } => {}
            other => panic!("expected top-level &&, got {other:?}"),
        }
    }

    #[test]
    fn disambiguates_parenthesized_grouping_from_cast() {
        let eir = parse_expr("(influence + 1)");
        assert!(matches!(eir.kind, EirKind::Enclosed(_)));
    }

    #[test]
    fn disambiguates_cast_from_grouping() {
        let eir = parse_expr("(String) influence");
        match eir.kind {
            EirKind::Cast { .. } => {}
            other => panic!("expected cast, got {other:?}"),
        }
    }

    #[test]
    fn parses_empty_and_nonempty_map_and_list_literals() {
        assert!(matches!(parse_expr("[:]").kind, EirKind::MapLiteral(v) if v.is_empty()));
        assert!(matches!(parse_expr("[]").kind, EirKind::ListLiteral(v) if v.is_empty()));
        assert!(matches!(parse_expr("[1, 2]").kind, EirKind::ListLiteral(v) if v.len() == 2));
        assert!(matches!(parse_expr("[1: 2]").kind, EirKind::MapLiteral(v) if v.len() == 1));
    }

    #[test]
    fn parses_null_safe_field_and_call() {
        assert!(matches!(parse_expr("influence!.toString()").kind, EirKind::NullSafeMethodCall { .. }));
    }

    #[test]
    fn parses_block_program_with_assignment_and_return() {
        let decls = table();
        let resolver = TypeResolver::new(&[]);
        let source = "influence = influence + 1; return influence;";
        let tokens = tokenize(source).unwrap();
        let mut parser = Parser::new(source, tokens, ContextKind::Map, &decls, &resolver);
        let eir = parser.parse_block_program().unwrap();
        match eir.kind {
            EirKind::Block(stmts) => assert_eq!(stmts.len(), 2),
            other => panic!("expected block, got {other:?}"),
        }
    }
}
