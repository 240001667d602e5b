//! The `Lowerer`: a single struct that walks the EIR by value, consuming
//! the parser's output and returning a new, fully desugared tree.
//! Ownership-by-value (rather than an in-place mutating visitor)
//! keeps idempotence trivial: a node with no matching desugaring target
//! left just passes its (already-lowered) children through unchanged.

use crate::error::TranspileError;
use exprc_ir::{BinOp, Eir, EirKind, Interner, Span, Symbol};
use exprc_types::TypeDescriptor;

/// Desugars DSL-only EIR constructs into host-primitive equivalents.
/// Holds a mutable reference to the tree's [`Interner`] because lowering
/// synthesizes new names (`Map`, `of`, `valueOf`, `update`, ...) that may
/// not already be interned.
pub struct Lowerer<'a> {
    interner: &'a mut Interner,
}

impl<'a> Lowerer<'a> {
    /// Build a lowerer over the tree's interner.
    pub fn new(interner: &'a mut Interner) -> Self {
        Self { interner }
    }

    /// Lower `eir` to its fully desugared form.
    pub fn lower(&mut self, eir: Eir) -> Result<Eir, TranspileError> {
        let span = eir.span;
        let ty = eir.ty.clone();
        let kind = match eir.kind {
            // ---- already host-primitive: recurse into children only ----
            EirKind::IntLit(_)
            | EirKind::LongLit(_)
            | EirKind::DoubleLit(_)
            | EirKind::FloatLit(_)
            | EirKind::BoolLit(_)
            | EirKind::StringLit(_)
            | EirKind::NullLit
            | EirKind::CharLit(_)
            | EirKind::NameRef(_)
            | EirKind::Empty => eir.kind,

            EirKind::MapLiteral(entries) => {
                let lowered: Result<Vec<(Eir, Eir)>, TranspileError> = entries
                    .into_iter()
                    .map(|(k, v)| Ok((self.lower(k)?, self.lower(v)?)))
                    .collect();
                self.lower_map_literal(span, lowered?)?
            }
            EirKind::ListLiteral(items) => {
                let lowered: Result<Vec<Eir>, TranspileError> =
                    items.into_iter().map(|i| self.lower(i)).collect();
                self.lower_list_literal(span, lowered?)?
            }
            EirKind::BigDecimalLit(text) => self.lower_big_decimal(span, &text)?,
            EirKind::BigIntegerLit(text) => self.lower_big_integer(span, &text)?,
            EirKind::TemporalDurationLit(parts) => self.lower_temporal(span, &parts),

            EirKind::FieldGet { scope, field } => EirKind::FieldGet {
                scope: Box::new(self.lower(*scope)?),
                field,
            },
            EirKind::MethodCall { scope, name, args } => EirKind::MethodCall {
                scope: match scope {
                    Some(s) => Some(Box::new(self.lower(*s)?)),
                    None => None,
                },
                name,
                args: args
                    .into_iter()
                    .map(|a| self.lower(a))
                    .collect::<Result<_, _>>()?,
            },
            EirKind::ObjectNew { ty: obj_ty, args } => EirKind::ObjectNew {
                ty: obj_ty,
                args: args
                    .into_iter()
                    .map(|a| self.lower(a))
                    .collect::<Result<_, _>>()?,
            },
            EirKind::ArrayAccess { scope, index } => EirKind::ArrayAccess {
                scope: Box::new(self.lower(*scope)?),
                index: Box::new(self.lower(*index)?),
            },
            EirKind::Unary { op, inner } => EirKind::Unary {
                op,
                inner: Box::new(self.lower(*inner)?),
            },
            EirKind::Binary { op, left, right } => EirKind::Binary {
                op,
                left: Box::new(self.lower(*left)?),
                right: Box::new(self.lower(*right)?),
            },
            EirKind::Assign { target, op, value } => EirKind::Assign {
                target: Box::new(self.lower(*target)?),
                op,
                value: Box::new(self.lower(*value)?),
            },
            EirKind::Cast { target_type, inner } => EirKind::Cast {
                target_type,
                inner: Box::new(self.lower(*inner)?),
            },
            EirKind::Enclosed(inner) => EirKind::Enclosed(Box::new(self.lower(*inner)?)),
            EirKind::ExprStmt(inner) => EirKind::ExprStmt(Box::new(self.lower(*inner)?)),
            EirKind::VarDecl {
                declared_type,
                name,
                init,
            } => EirKind::VarDecl {
                declared_type,
                name,
                init: match init {
                    Some(i) => Some(Box::new(self.lower(*i)?)),
                    None => None,
                },
            },
            EirKind::If {
                cond,
                then_branch,
                else_branch,
            } => EirKind::If {
                cond: Box::new(self.lower(*cond)?),
                then_branch: Box::new(self.lower(*then_branch)?),
                else_branch: match else_branch {
                    Some(e) => Some(Box::new(self.lower(*e)?)),
                    None => None,
                },
            },
            EirKind::Block(stmts) => EirKind::Block(
                stmts
                    .into_iter()
                    .map(|s| self.lower(s))
                    .collect::<Result<_, _>>()?,
            ),
            EirKind::Return(expr) => EirKind::Return(match expr {
                Some(e) => Some(Box::new(self.lower(*e)?)),
                None => None,
            }),
            EirKind::Conditional {
                cond,
                then_expr,
                else_expr,
            } => EirKind::Conditional {
                cond: Box::new(self.lower(*cond)?),
                then_expr: Box::new(self.lower(*then_expr)?),
                else_expr: Box::new(self.lower(*else_expr)?),
            },

            // ---- desugaring targets ----
            EirKind::NullSafeFieldGet { scope, field } => {
                let scope = self.lower(*scope)?;
                self.lower_null_safe(span, scope, |s| EirKind::FieldGet {
                    scope: Box::new(s),
                    field,
                })
            }
            EirKind::NullSafeMethodCall { scope, name, args } => {
                let scope = self.lower(*scope)?;
                let args: Vec<Eir> = args
                    .into_iter()
                    .map(|a| self.lower(a))
                    .collect::<Result<_, _>>()?;
                self.lower_null_safe(span, scope, move |s| EirKind::MethodCall {
                    scope: Some(Box::new(s)),
                    name,
                    args,
                })
            }
            EirKind::Modify { target, stmts } => {
                let target = self.lower(*target)?;
                self.lower_modify_or_with(span, target, stmts, true)?
            }
            EirKind::With { target, stmts } => {
                let target = self.lower(*target)?;
                self.lower_modify_or_with(span, target, stmts, false)?
            }
            EirKind::InlineCast { target_type, inner } => EirKind::Cast {
                target_type,
                inner: Box::new(self.lower(*inner)?),
            },
        };
        Ok(Eir { span, ty, kind })
    }

    /// `a!.b` / `a!.m(args)` -> `a == null ? null : a.b`.
    /// `scope` is referenced twice (once in the null check, once in the
    /// rewritten access) rather than hoisted into a synthetic temporary —
    /// acceptable for the common case of a bare `NameRef` scope (no
    /// re-evaluation cost or side effect duplication), and documented as a
    /// known simplification for compound scopes in `DESIGN.md`.
    fn lower_null_safe(&mut self, span: Span, scope: Eir, build_access: impl FnOnce(Eir) -> EirKind) -> EirKind {
        let null_check = Eir::new(
            span,
            EirKind::Binary {
                op: BinOp::Eq,
                left: Box::new(scope.clone()),
                right: Box::new(Eir::new(span, EirKind::NullLit)),
            },
        );
        let then_expr = Eir::new(span, EirKind::NullLit);
        let else_expr = Eir::new(span, build_access(scope));
        EirKind::Conditional {
            cond: Box::new(null_check),
            then_expr: Box::new(then_expr),
            else_expr: Box::new(else_expr),
        }
    }

    /// `[k1: v1, k2: v2]` -> `Map.of(k1, v1, k2, v2)`; `[:]` -> `Map.of()`.
    /// `Map.of` has overloads only up to 10 pairs — beyond that, lower to
    /// `Map.ofEntries(Map.entry(k1,v1), ...)`, which has no arity limit.
    fn lower_map_literal(&mut self, span: Span, entries: Vec<(Eir, Eir)>) -> Result<EirKind, TranspileError> {
        const MAP_OF_MAX_PAIRS: usize = 10;
        let map_class = self.class_ref(span, "Map");
        if entries.len() <= MAP_OF_MAX_PAIRS {
            let mut args = Vec::with_capacity(entries.len() * 2);
            for (k, v) in entries {
                args.push(k);
                args.push(v);
            }
            let of = self.intern("of");
            Ok(EirKind::MethodCall {
                scope: Some(Box::new(map_class)),
                name: of,
                args,
            })
        } else {
            let entry = self.intern("entry");
            let args = entries
                .into_iter()
                .map(|(k, v)| {
                    Eir::new(
                        span,
                        EirKind::MethodCall {
                            scope: Some(Box::new(self.class_ref(span, "Map"))),
                            name: entry,
                            args: vec![k, v],
                        },
                    )
                })
                .collect();
            let of_entries = self.intern("ofEntries");
            Ok(EirKind::MethodCall {
                scope: Some(Box::new(map_class)),
                name: of_entries,
                args,
            })
        }
    }

    /// `[v1, v2]` -> `List.of(v1, v2)`; `[]` -> `List.of()`. `List.of` has
    /// an unbounded varargs overload, so no arity split is needed.
    fn lower_list_literal(&mut self, span: Span, items: Vec<Eir>) -> Result<EirKind, TranspileError> {
        let list_class = self.class_ref(span, "List");
        let of = self.intern("of");
        Ok(EirKind::MethodCall {
            scope: Some(Box::new(list_class)),
            name: of,
            args: items,
        })
    }

    /// `0B` -> `BigDecimal.valueOf(0)`. Integral text lowers to the
    /// `long` overload, text with a `.` lowers to the `double` overload.
    fn lower_big_decimal(&mut self, span: Span, text: &str) -> Result<EirKind, TranspileError> {
        let scope = self.class_ref(span, "BigDecimal");
        let value_of = self.intern("valueOf");
        let arg = if text.contains('.') {
            let v: f64 = text.parse().map_err(|e: std::num::ParseFloatError| {
                TranspileError::MalformedBigNumberLiteral {
                    text: text.to_string(),
                    reason: e.to_string(),
                }
            })?;
            Eir::typed(span, TypeDescriptor::Primitive(exprc_types::PrimitiveTag::Double), EirKind::DoubleLit(v))
        } else {
            let v: i64 = text.parse().map_err(|e: std::num::ParseIntError| {
                TranspileError::MalformedBigNumberLiteral {
                    text: text.to_string(),
                    reason: e.to_string(),
                }
            })?;
            Eir::typed(span, TypeDescriptor::Primitive(exprc_types::PrimitiveTag::Long), EirKind::LongLit(v))
        };
        Ok(EirKind::MethodCall {
            scope: Some(Box::new(scope)),
            name: value_of,
            args: vec![arg],
        })
    }

    /// `0I` -> `BigInteger.valueOf(0)`.
    fn lower_big_integer(&mut self, span: Span, text: &str) -> Result<EirKind, TranspileError> {
        let scope = self.class_ref(span, "BigInteger");
        let value_of = self.intern("valueOf");
        let v: i64 = text.parse().map_err(|e: std::num::ParseIntError| {
            TranspileError::MalformedBigNumberLiteral {
                text: text.to_string(),
                reason: e.to_string(),
            }
        })?;
        let arg = Eir::typed(span, TypeDescriptor::Primitive(exprc_types::PrimitiveTag::Long), EirKind::LongLit(v));
        Ok(EirKind::MethodCall {
            scope: Some(Box::new(scope)),
            name: value_of,
            args: vec![arg],
        })
    }

    /// `12h30m` -> `Duration.ofHours(12).plusMinutes(30)`.
    fn lower_temporal(&mut self, span: Span, parts: &[(exprc_ir::TemporalUnit, i64)]) -> EirKind {
        let mut iter = parts.iter();
        let (first_unit, first_amount) = iter
            .next()
            .expect("parser never produces an empty temporal literal");
        let first_method = self.intern(first_unit.duration_method(true));
        let mut expr = EirKind::MethodCall {
            scope: Some(Box::new(self.class_ref(span, "Duration"))),
            name: first_method,
            args: vec![Eir::typed(
                span,
                TypeDescriptor::Primitive(exprc_types::PrimitiveTag::Long),
                EirKind::LongLit(*first_amount),
            )],
        };
        for (unit, amount) in iter {
            let method = self.intern(unit.duration_method(false));
            expr = EirKind::MethodCall {
                scope: Some(Box::new(Eir::new(span, expr))),
                name: method,
                args: vec![Eir::typed(
                    span,
                    TypeDescriptor::Primitive(exprc_types::PrimitiveTag::Long),
                    EirKind::LongLit(*amount),
                )],
            };
        }
        expr
    }

    /// `modify(t){ stmts }` / `with(t){ stmts }`: statements referencing a
    /// bare name as an assignment target are rewritten to write through
    /// `t`'s field (the DSL's implicit-receiver convention); every other
    /// statement passes through unchanged (it already names `t` or another
    /// local explicitly). `modify` additionally appends a synthesized
    /// `update(t)` call; `with` does not.
    fn lower_modify_or_with(
        &mut self,
        span: Span,
        target: Eir,
        stmts: Vec<Eir>,
        is_modify: bool,
    ) -> Result<EirKind, TranspileError> {
        let mut lowered = Vec::with_capacity(stmts.len() + 1);
        for stmt in stmts {
            let stmt = self.lower(stmt)?;
            lowered.push(self.rewrite_implicit_receiver(target.clone(), stmt));
        }
        if is_modify {
            let update = self.intern("update");
            lowered.push(Eir::new(
                span,
                EirKind::ExprStmt(Box::new(Eir::new(
                    span,
                    EirKind::MethodCall {
                        scope: None,
                        name: update,
                        args: vec![target],
                    },
                ))),
            ));
        }
        Ok(EirKind::Block(lowered))
    }

    /// Rewrite a bare-name assignment target inside a `modify`/`with` block
    /// into a field write on the implicit receiver `target`, e.g.
    /// `influence = influence + 1;` becomes `t.influence = t.influence + 1;`
    /// conceptually — implemented here as rewriting only the assignment
    /// *target* name to a `FieldGet`; the right-hand side already resolved
    /// any bare names through the declaration table at parse time and is
    /// left untouched.
    fn rewrite_implicit_receiver(&mut self, target: Eir, stmt: Eir) -> Eir {
        match stmt.kind {
            EirKind::ExprStmt(inner) => {
                let rewritten = self.rewrite_implicit_receiver_expr(target, *inner);
                Eir {
                    span: stmt.span,
                    ty: stmt.ty,
                    kind: EirKind::ExprStmt(Box::new(rewritten)),
                }
            }
            other => Eir {
                span: stmt.span,
                ty: stmt.ty,
                kind: other,
            },
        }
    }

    fn rewrite_implicit_receiver_expr(&mut self, target: Eir, expr: Eir) -> Eir {
        match expr.kind {
            EirKind::Assign {
                target: assign_target,
                op,
                value,
            } => {
                if let EirKind::NameRef(field) = assign_target.kind {
                    let field_get = Eir::new(
                        assign_target.span,
                        EirKind::FieldGet {
                            scope: Box::new(target),
                            field,
                        },
                    );
                    Eir {
                        span: expr.span,
                        ty: expr.ty,
                        kind: EirKind::Assign {
                            target: Box::new(field_get),
                            op,
                            value,
                        },
                    }
                } else {
                    Eir {
                        span: expr.span,
                        ty: expr.ty,
                        kind: EirKind::Assign {
                            target: assign_target,
                            op,
                            value,
                        },
                    }
                }
            }
            other => Eir {
                span: expr.span,
                ty: expr.ty,
                kind: other,
            },
        }
    }

    fn class_ref(&mut self, span: Span, simple_name: &str) -> Eir {
        let sym = self.intern(simple_name);
        Eir::new(span, EirKind::NameRef(sym))
    }

    fn intern(&mut self, s: &str) -> Symbol {
        self.interner.intern(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use exprc_ir::Span;

    fn lower_one(kind: EirKind) -> (Eir, Interner) {
        let mut interner = Interner::new();
        let eir = Eir::new(Span::synthetic(), kind);
        let lowered = {
            let mut lowerer = Lowerer::new(&mut interner);
            lowerer.lower(eir).unwrap()
        };
        (lowered, interner)
    }

    #[test]
    fn lowers_empty_map_literal_to_zero_arg_factory() {
        let (lowered, interner) = lower_one(EirKind::MapLiteral(vec![]));
        match lowered.kind {
            EirKind::MethodCall { scope, name, args } => {
                assert!(args.is_empty());
                assert_eq!(interner.resolve(name), "of");
                match scope.unwrap().kind {
                    EirKind::NameRef(sym) => assert_eq!(interner.resolve(sym), "Map"),
                    other => panic!("expected Map class ref, got {other:?}"),
                }
            }
            other => panic!("expected MethodCall, got {other:?}"),
        }
    }

    #[test]
    fn lowers_map_literal_beyond_ten_pairs_to_of_entries() {
        let entries: Vec<(Eir, Eir)> = (0..11)
            .map(|i| {
                (
                    Eir::new(Span::synthetic(), EirKind::IntLit(i)),
                    Eir::new(Span::synthetic(), EirKind::IntLit(i * 2)),
                )
            })
            .collect();
        let (lowered, interner) = lower_one(EirKind::MapLiteral(entries));
        match lowered.kind {
            EirKind::MethodCall { name, args, .. } => {
                assert_eq!(interner.resolve(name), "ofEntries");
                assert_eq!(args.len(), 11);
            }
            other => panic!("expected MethodCall, got {other:?}"),
        }
    }

    #[test]
    fn lowers_big_decimal_literal_with_decimal_point_to_double_overload() {
        let (lowered, _interner) = lower_one(EirKind::BigDecimalLit("1.5".to_string()));
        match lowered.kind {
            EirKind::MethodCall { args, .. } => {
                assert!(matches!(args[0].kind, EirKind::DoubleLit(v) if v == 1.5));
            }
            other => panic!("expected MethodCall, got {other:?}"),
        }
    }

    #[test]
    fn lowers_big_integer_literal_to_long_overload() {
        let (lowered, _interner) = lower_one(EirKind::BigIntegerLit("42".to_string()));
        match lowered.kind {
            EirKind::MethodCall { args, .. } => {
                assert!(matches!(args[0].kind, EirKind::LongLit(42)));
            }
            other => panic!("expected MethodCall, got {other:?}"),
        }
    }

    #[test]
    fn lowers_temporal_literal_to_duration_chain() {
        let (lowered, interner) = lower_one(EirKind::TemporalDurationLit(vec![
            (exprc_ir::TemporalUnit::Hours, 12),
            (exprc_ir::TemporalUnit::Minutes, 30),
        ]));
        match lowered.kind {
            EirKind::MethodCall { name, scope, .. } => {
                assert_eq!(interner.resolve(name), "plusMinutes");
                match scope.unwrap().kind {
                    EirKind::MethodCall { name: inner_name, .. } => {
                        assert_eq!(interner.resolve(inner_name), "ofHours");
                    }
                    other => panic!("expected nested ofHours call, got {other:?}"),
                }
            }
            other => panic!("expected MethodCall, got {other:?}"),
        }
    }

    #[test]
    fn lowers_null_safe_field_get_to_conditional() {
        let mut interner = Interner::new();
        let a = interner.intern("a");
        let b = interner.intern("b");
        let eir = Eir::new(
            Span::synthetic(),
            EirKind::NullSafeFieldGet {
                scope: Box::new(Eir::new(Span::synthetic(), EirKind::NameRef(a))),
                field: b,
            },
        );
        let lowered = Lowerer::new(&mut interner).lower(eir).unwrap();
        match lowered.kind {
            EirKind::Conditional { then_expr, else_expr, .. } => {
                assert!(matches!(then_expr.kind, EirKind::NullLit));
                assert!(matches!(else_expr.kind, EirKind::FieldGet { .. }));
            }
            other => panic!("expected Conditional, got {other:?}"),
        }
    }

    #[test]
    fn lowering_is_idempotent_on_already_lowered_tree() {
        let mut interner = Interner::new();
        let eir = Eir::new(Span::synthetic(), EirKind::IntLit(42));
        let once = Lowerer::new(&mut interner).lower(eir).unwrap();
        let twice = Lowerer::new(&mut interner).lower(once.clone()).unwrap();
        assert!(matches!((once.kind, twice.kind), (EirKind::IntLit(a), EirKind::IntLit(b)) if a == b));
    }

    #[test]
    fn modify_block_rewrites_bare_assignment_and_appends_update_call() {
        let mut interner = Interner::new();
        let t = interner.intern("t");
        let influence = interner.intern("influence");
        let target = Eir::new(Span::synthetic(), EirKind::NameRef(t));
        let stmt = Eir::new(
            Span::synthetic(),
            EirKind::ExprStmt(Box::new(Eir::new(
                Span::synthetic(),
                EirKind::Assign {
                    target: Box::new(Eir::new(Span::synthetic(), EirKind::NameRef(influence))),
                    op: exprc_ir::AssignOp::Assign,
                    value: Box::new(Eir::new(Span::synthetic(), EirKind::IntLit(1))),
                },
            ))),
        );
        let modify = Eir::new(
            Span::synthetic(),
            EirKind::Modify {
                target: Box::new(target),
                stmts: vec![stmt],
            },
        );
        let lowered = Lowerer::new(&mut interner).lower(modify).unwrap();
        match lowered.kind {
            EirKind::Block(stmts) => {
                assert_eq!(stmts.len(), 2);
                match &stmts[0].kind {
                    EirKind::ExprStmt(inner) => match &inner.kind {
                        EirKind::Assign { target, .. } => {
                            assert!(matches!(target.kind, EirKind::FieldGet { .. }));
                        }
                        other => panic!("expected Assign, got {other:?}"),
                    },
                    other => panic!("expected ExprStmt, got {other:?}"),
                }
                match &stmts[1].kind {
                    EirKind::ExprStmt(inner) => match &inner.kind {
                        EirKind::MethodCall { name, .. } => {
                            assert_eq!(interner.resolve(*name), "update");
                        }
                        other => panic!("expected update() call, got {other:?}"),
                    },
                    other => panic!("expected ExprStmt, got {other:?}"),
                }
            }
            other => panic!("expected Block, got {other:?}"),
        }
    }
}
