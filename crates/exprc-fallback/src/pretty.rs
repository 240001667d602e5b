//! Pretty-prints lowered EIR as syntactically valid host source text,
//! wrapped in a class declaration. The adapter's
//! contract forbids further rewrites past this point — whatever text this
//! module produces is exactly what gets handed to the injected
//! [`crate::HostCompiler`], so the printer must never paper over a node
//! shape it doesn't understand; an unprinted node is a bug in `can_emit`'s
//! complement, not something to approximate.

use exprc_ir::{AssignOp, BinOp, Eir, EirKind, Interner, TemporalUnit, UnOp};
use exprc_types::{ContextKind, DeclarationTable, TypeDescriptor};
use std::fmt::Write as _;

/// Pretty-print `body` as the body of an `eval` method on a class named
/// `class_simple_name`, implementing the evaluator contract against
/// `declarations`/`context_kind` and returning `out_type`.
pub fn pretty_print_class(
    class_simple_name: &str,
    body: &Eir,
    declarations: &DeclarationTable,
    // Variable resolution strategy is already baked into the EIR's
    // `NameRef`s by the time lowering hands this tree over — the printer
    // only needs the declared local's name, not how it was looked up — but
    // the parameter is kept to match `exprc_emit::emit_class`'s signature,
    // since both consume the same `CompilerRequest` shape.
    _context_kind: ContextKind,
    out_type: &TypeDescriptor,
    interner: &Interner,
) -> String {
    let mut out = String::new();
    let context_ty = type_name(&declarations.context.ty);
    let _ = writeln!(out, "public final class {class_simple_name} {{");
    let _ = writeln!(out, "    public {class_simple_name}() {{ }}");
    let _ = writeln!(
        out,
        "    public {} eval({} {}) {{",
        type_name(out_type),
        context_ty,
        declarations.context.name,
    );

    let mut printer = Printer { interner, declarations, indent: 2 };
    match &body.kind {
        EirKind::Block(stmts) => {
            for stmt in stmts {
                printer.print_stmt(&mut out, stmt);
            }
        }
        _ => printer.print_stmt(&mut out, body),
    }

    let _ = writeln!(out, "    }}");
    let _ = writeln!(out, "}}");
    out
}

struct Printer<'a> {
    interner: &'a Interner,
    declarations: &'a DeclarationTable,
    context_kind: ContextKind,
    indent: usize,
}

impl<'a> Printer<'a> {
    fn pad(&self) -> String {
        "    ".repeat(self.indent)
    }

    fn print_stmt(&mut self, out: &mut String, node: &Eir) {
        let pad = self.pad();
        match &node.kind {
            EirKind::ExprStmt(inner) => {
                let _ = writeln!(out, "{pad}{};", self.expr(inner));
            }
            EirKind::VarDecl { declared_type, name, init } => {
                let ty = declared_type
                    .as_ref()
                    .map(type_name)
                    .unwrap_or_else(|| "var".to_string());
                let name = self.interner.resolve(*name);
                match init {
                    Some(init) => {
                        let _ = writeln!(out, "{pad}{ty} {name} = {};", self.expr(init));
                    }
                    None => {
                        let _ = writeln!(out, "{pad}{ty} {name};");
                    }
                }
            }
            EirKind::If { cond, then_branch, else_branch } => {
                let _ = writeln!(out, "{pad}if ({}) {{", self.expr(cond));
                self.indent += 1;
                self.print_stmt(out, then_branch);
                self.indent -= 1;
                if let Some(else_branch) = else_branch {
                    let _ = writeln!(out, "{pad}}} else {{");
                    self.indent += 1;
                    self.print_stmt(out, else_branch);
                    self.indent -= 1;
                }
                let _ = writeln!(out, "{pad}}}");
            }
            EirKind::Block(stmts) => {
                let _ = writeln!(out, "{pad}{{");
                self.indent += 1;
                for stmt in stmts {
                    self.print_stmt(out, stmt);
                }
                self.indent -= 1;
                let _ = writeln!(out, "{pad}}}");
            }
            EirKind::Return(expr) => match expr {
                Some(expr) => {
                    let _ = writeln!(out, "{pad}return {};", self.expr(expr));
                }
                None => {
                    let _ = writeln!(out, "{pad}return;");
                }
            },
            EirKind::Empty => {}
            _ => {
                // A value-producing node used directly as the sole
                // expression body (content_kind == Expression): implicitly
                // returned.
                let _ = writeln!(out, "{pad}return {};", self.expr(node));
            }
        }
    }

    fn expr(&self, node: &Eir) -> String {
        match &node.kind {
            EirKind::IntLit(v) => v.to_string(),
            EirKind::LongLit(v) => format!("{v}L"),
            EirKind::DoubleLit(v) => format!("{v}d"),
            EirKind::FloatLit(v) => format!("{v}f"),
            EirKind::BoolLit(v) => v.to_string(),
            EirKind::StringLit(v) => format!("{v:?}"),
            EirKind::NullLit => "null".to_string(),
            EirKind::CharLit(v) => format!("'{v}'"),
            EirKind::BigDecimalLit(text) => format!("new java.math.BigDecimal(\"{text}\")"),
            EirKind::BigIntegerLit(text) => format!("new java.math.BigInteger(\"{text}\")"),
            EirKind::TemporalDurationLit(parts) => self.temporal(parts),
            EirKind::MapLiteral(entries) => {
                let args = entries
                    .iter()
                    .flat_map(|(k, v)| [self.expr(k), self.expr(v)])
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("java.util.Map.of({args})")
            }
            EirKind::ListLiteral(items) => {
                let args = items.iter().map(|i| self.expr(i)).collect::<Vec<_>>().join(", ");
                format!("java.util.List.of({args})")
            }
            EirKind::NameRef(sym) => self.interner.resolve(*sym).to_string(),
            EirKind::FieldGet { scope, field } => {
                format!("{}.{}", self.expr(scope), self.interner.resolve(*field))
            }
            EirKind::MethodCall { scope, name, args } => {
                let name = self.interner.resolve(*name);
                let args = args.iter().map(|a| self.expr(a)).collect::<Vec<_>>().join(", ");
                match scope {
                    Some(scope) => format!("{}.{name}({args})", self.expr(scope)),
                    None => format!("{name}({args})"),
                }
            }
            EirKind::ObjectNew { ty, args } => {
                let args = args.iter().map(|a| self.expr(a)).collect::<Vec<_>>().join(", ");
                format!("new {ty}({args})")
            }
            EirKind::ArrayAccess { scope, index } => {
                format!("{}[{}]", self.expr(scope), self.expr(index))
            }
            EirKind::Unary { op, inner } => format!("{}{}", unop(*op), self.expr(inner)),
            EirKind::Binary { op, left, right } => {
                format!("({} {} {})", self.expr(left), binop(*op), self.expr(right))
            }
            EirKind::Assign { target, op, value } => {
                format!("{} {} {}", self.expr(target), assignop(*op), self.expr(value))
            }
            EirKind::Cast { target_type, inner } => {
                format!("(({}) {})", type_name(target_type), self.expr(inner))
            }
            EirKind::Conditional { cond, then_expr, else_expr } => format!(
                "({} ? {} : {})",
                self.expr(cond),
                self.expr(then_expr),
                self.expr(else_expr)
            ),
            EirKind::Enclosed(inner) => format!("({})", self.expr(inner)),
            // Modify/With/InlineCast/NullSafeFieldGet/NullSafeMethodCall
            // never reach the pretty-printer: the lowerer fully desugars
            // them (null-safe access becomes `Conditional` over `FieldGet`/
            // `MethodCall`) before `can_emit` is consulted. A
            // statement-shaped node appearing in expression position (e.g.
            // a bare `If`/`Block`) is a lowering bug, not something this
            // printer should paper over.
            other => unreachable!("non-expression EIR node in expression position: {other:?}"),
        }
    }

    fn resolve_name(&self, sym: exprc_ir::Symbol) -> String {
        let name = self.interner.resolve(sym);
        match self.context_kind {
            ContextKind::Pojo | ContextKind::Map | ContextKind::List => {
                let ctx = &self.declarations.context.name;
                if name == ctx.as_str() {
                    name.to_string()
                } else {
                    name.to_string()
                }
            }
        }
    }

    fn temporal(&self, parts: &[(TemporalUnit, i64)]) -> String {
        let mut iter = parts.iter();
        let (unit, amount) = match iter.next() {
            Some(p) => p,
            None => return "java.time.Duration.ZERO".to_string(),
        };
        let mut expr = format!("java.time.Duration.{}({amount})", unit.duration_method(true));
        for (unit, amount) in iter {
            expr = format!("{expr}.{}({amount})", unit.duration_method(false));
        }
        expr
    }
}

fn unop(op: UnOp) -> &'static str {
    match op {
        UnOp::Not => "!",
        UnOp::Neg => "-",
        UnOp::BitNot => "~",
    }
}

fn binop(op: BinOp) -> &'static str {
    match op {
        BinOp::Add => "+",
        BinOp::Sub => "-",
        BinOp::Mul => "*",
        BinOp::Div => "/",
        BinOp::Rem => "%",
        BinOp::Eq => "==",
        BinOp::Ne => "!=",
        BinOp::Lt => "<",
        BinOp::Le => "<=",
        BinOp::Gt => ">",
        BinOp::Ge => ">=",
        BinOp::And => "&&",
        BinOp::Or => "||",
        BinOp::BitAnd => "&",
        BinOp::BitOr => "|",
        BinOp::BitXor => "^",
        BinOp::Shl => "<<",
        BinOp::Shr => ">>",
        BinOp::UShr => ">>>",
    }
}

fn assignop(op: AssignOp) -> &'static str {
    match op {
        AssignOp::Assign => "=",
        AssignOp::AddAssign => "+=",
        AssignOp::SubAssign => "-=",
        AssignOp::MulAssign => "*=",
        AssignOp::DivAssign => "/=",
        AssignOp::RemAssign => "%=",
        AssignOp::AndAssign => "&=",
        AssignOp::OrAssign => "|=",
        AssignOp::XorAssign => "^=",
        AssignOp::ShlAssign => "<<=",
        AssignOp::ShrAssign => ">>=",
        AssignOp::UShrAssign => ">>>=",
    }
}

fn type_name(ty: &TypeDescriptor) -> String {
    ty.to_string()
}
