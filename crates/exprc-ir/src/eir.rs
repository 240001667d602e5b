//! The Expression IR (EIR): the typed, desugared tree the parser produces,
//! the lowerer rewrites in place, and the emitter/fallback adapter consume.

use crate::span::Span;
use crate::symbol::Symbol;
use exprc_types::TypeDescriptor;

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `%`
    Rem,
    /// `==`
    Eq,
    /// `!=`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `&&` (short-circuit)
    And,
    /// `||` (short-circuit)
    Or,
    /// `&`
    BitAnd,
    /// `|`
    BitOr,
    /// `^`
    BitXor,
    /// `<<`
    Shl,
    /// `>>` (arithmetic)
    Shr,
    /// `>>>` (logical / unsigned)
    UShr,
}

impl BinOp {
    /// Whether this is one of the short-circuit logical operators.
    pub fn is_short_circuit(self) -> bool {
        matches!(self, BinOp::And | BinOp::Or)
    }

    /// Whether this is an ordered or equality comparison (boolean-valued).
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinOp::Eq
                | BinOp::Ne
                | BinOp::Lt
                | BinOp::Le
                | BinOp::Gt
                | BinOp::Ge
        )
    }

    /// Whether this is an arithmetic operator subject to numeric widening.
    pub fn is_arithmetic(self) -> bool {
        matches!(self, BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div | BinOp::Rem)
    }

    /// Whether this is a bitwise/shift operator (int/long only, no
    /// floating-point form).
    pub fn is_bitwise(self) -> bool {
        matches!(
            self,
            BinOp::BitAnd | BinOp::BitOr | BinOp::BitXor | BinOp::Shl | BinOp::Shr | BinOp::UShr
        )
    }
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    /// `!`
    Not,
    /// Unary `-`
    Neg,
    /// `~`
    BitNot,
}

/// Compound-assignment operators, including plain `=`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    /// `=`
    Assign,
    /// `+=`
    AddAssign,
    /// `-=`
    SubAssign,
    /// `*=`
    MulAssign,
    /// `/=`
    DivAssign,
    /// `%=`
    RemAssign,
    /// `&=`
    AndAssign,
    /// `|=`
    OrAssign,
    /// `^=`
    XorAssign,
    /// `<<=`
    ShlAssign,
    /// `>>=`
    ShrAssign,
    /// `>>>=`
    UShrAssign,
}

impl AssignOp {
    /// The binary operator a compound assignment desugars to, or `None`
    /// for plain `=`.
    pub fn as_binop(self) -> Option<BinOp> {
        match self {
            AssignOp::Assign => None,
            AssignOp::AddAssign => Some(BinOp::Add),
            AssignOp::SubAssign => Some(BinOp::Sub),
            AssignOp::MulAssign => Some(BinOp::Mul),
            AssignOp::DivAssign => Some(BinOp::Div),
            AssignOp::RemAssign => Some(BinOp::Rem),
            AssignOp::AndAssign => Some(BinOp::BitAnd),
            AssignOp::OrAssign => Some(BinOp::BitOr),
            AssignOp::XorAssign => Some(BinOp::BitXor),
            AssignOp::ShlAssign => Some(BinOp::Shl),
            AssignOp::ShrAssign => Some(BinOp::Shr),
            AssignOp::UShrAssign => Some(BinOp::UShr),
        }
    }
}

/// A duration literal component, e.g. the `12h` in `12h30m`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemporalUnit {
    /// `d` — days
    Days,
    /// `h` — hours
    Hours,
    /// `m` — minutes
    Minutes,
    /// `s` — seconds
    Seconds,
    /// `ms` — milliseconds
    Millis,
}

impl TemporalUnit {
    /// The `Duration` combinator method this unit lowers to, e.g.
    /// `Duration.ofHours` / `.plusHours`.
    pub fn duration_method(self, is_first: bool) -> &'static str {
        match (self, is_first) {
            (TemporalUnit::Days, true) => "ofDays",
            (TemporalUnit::Hours, true) => "ofHours",
            (TemporalUnit::Minutes, true) => "ofMinutes",
            (TemporalUnit::Seconds, true) => "ofSeconds",
            (TemporalUnit::Millis, true) => "ofMillis",
            (TemporalUnit::Days, false) => "plusDays",
            (TemporalUnit::Hours, false) => "plusHours",
            (TemporalUnit::Minutes, false) => "plusMinutes",
            (TemporalUnit::Seconds, false) => "plusSeconds",
            (TemporalUnit::Millis, false) => "plusMillis",
        }
    }
}

/// A single EIR node: a tagged sum with span and (once resolved) static
/// type attached uniformly — every
/// value-producing node carries a resolved type after lowering.
#[derive(Debug, Clone)]
pub struct Eir {
    /// Source span this node was parsed from (or [`Span::synthetic`] for
    /// lowering-inserted nodes).
    pub span: Span,
    /// Static type of the value this node leaves on the stack, if it is
    /// value-producing and has been resolved. `None` is only valid before
    /// lowering completes, or on nodes (statements) that produce no value.
    pub ty: Option<TypeDescriptor>,
    /// The node payload.
    pub kind: EirKind,
}

impl Eir {
    /// Construct a node with no resolved type yet (parser output prior to
    /// type annotation, or statement nodes that never carry one).
    pub fn new(span: Span, kind: EirKind) -> Self {
        Self {
            span,
            ty: None,
            kind,
        }
    }

    /// Construct a node with a resolved static type attached.
    pub fn typed(span: Span, ty: TypeDescriptor, kind: EirKind) -> Self {
        Self {
            span,
            ty: Some(ty),
            kind,
        }
    }

    /// Shallow child nodes, in evaluation order. Used by the lowering
    /// idempotence check and by `can_emit`'s post-order walk.
    pub fn children(&self) -> Vec<&Eir> {
        use EirKind::*;
        match &self.kind {
            IntLit(_) | LongLit(_) | DoubleLit(_) | FloatLit(_) | BoolLit(_) | StringLit(_)
            | NullLit | CharLit(_) | BigDecimalLit(_) | BigIntegerLit(_)
            | TemporalDurationLit(_) | NameRef(_) | Empty => vec![],
            MapLiteral(entries) => entries.iter().flat_map(|(k, v)| [k, v]).collect(),
            ListLiteral(items) => items.iter().collect(),
            FieldGet { scope, .. } => vec![scope.as_ref()],
            MethodCall { scope, args, .. } => {
                let mut v: Vec<&Eir> = scope.as_deref().into_iter().collect();
                v.extend(args.iter());
                v
            }
            ObjectNew { args, .. } => args.iter().collect(),
            ArrayAccess { scope, index } => vec![scope.as_ref(), index.as_ref()],
            Unary { inner, .. } => vec![inner.as_ref()],
            Binary { left, right, .. } => vec![left.as_ref(), right.as_ref()],
            Assign { target, value, .. } => vec![target.as_ref(), value.as_ref()],
            Conditional { cond, then_expr, else_expr } => {
                vec![cond.as_ref(), then_expr.as_ref(), else_expr.as_ref()]
            }
            Cast { inner, .. } => vec![inner.as_ref()],
            Enclosed(inner) => vec![inner.as_ref()],
            ExprStmt(inner) => vec![inner.as_ref()],
            VarDecl { init, .. } => init.as_deref().into_iter().collect(),
            If {
                cond,
                then_branch,
                else_branch,
            } => {
                let mut v = vec![cond.as_ref(), then_branch.as_ref()];
                if let Some(e) = else_branch {
                    v.push(e.as_ref());
                }
                v
            }
            Block(stmts) => stmts.iter().collect(),
            Return(expr) => expr.as_deref().into_iter().collect(),
            NullSafeFieldGet { scope, .. } => vec![scope.as_ref()],
            NullSafeMethodCall { scope, args, .. } => {
                let mut v = vec![scope.as_ref()];
                v.extend(args.iter());
                v
            }
            Modify { target, stmts } | With { target, stmts } => {
                let mut v = vec![target.as_ref()];
                v.extend(stmts.iter());
                v
            }
            InlineCast { inner, .. } => vec![inner.as_ref()],
        }
    }

    /// Whether this node is a statement-shaped control node that always
    /// returns (so emitting a trailing `goto end` after it would be dead
    /// code the verifier rejects).
    pub fn always_returns(&self) -> bool {
        match &self.kind {
            EirKind::Return(_) => true,
            EirKind::Block(stmts) => stmts.last().is_some_and(|s| s.always_returns()),
            EirKind::If {
                then_branch,
                else_branch: Some(else_branch),
                ..
            } => then_branch.always_returns() && else_branch.always_returns(),
            _ => false,
        }
    }
}

/// The EIR node payload.
#[derive(Debug, Clone)]
pub enum EirKind {
    // ---- Literals ----
    /// `42`
    IntLit(i32),
    /// `42L`
    LongLit(i64),
    /// `3.14`
    DoubleLit(f64),
    /// `3.14f`
    FloatLit(f32),
    /// `true` / `false`
    BoolLit(bool),
    /// `"text"`
    StringLit(String),
    /// `null`
    NullLit,
    /// `'c'`
    CharLit(char),
    /// `0B` big-decimal literal, kept as its exact decimal text.
    BigDecimalLit(String),
    /// `0I` big-integer literal, kept as its exact decimal text.
    BigIntegerLit(String),
    /// `12h30m` duration literal, pre-lowering: an ordered list of
    /// `(unit, amount)` components.
    TemporalDurationLit(Vec<(TemporalUnit, i64)>),
    /// `[k1: v1, k2: v2]`
    MapLiteral(Vec<(Eir, Eir)>),
    /// `[v1, v2]`
    ListLiteral(Vec<Eir>),

    // ---- References ----
    /// A bare name, resolved against the declaration table.
    NameRef(Symbol),
    /// `scope.field`
    FieldGet { scope: Box<Eir>, field: Symbol },
    /// `scope.name(args)` (or a free function call when `scope` is `None`).
    MethodCall {
        scope: Option<Box<Eir>>,
        name: Symbol,
        args: Vec<Eir>,
    },
    /// `new Type(args)`
    ObjectNew { ty: String, args: Vec<Eir> },
    /// `scope[index]`
    ArrayAccess { scope: Box<Eir>, index: Box<Eir> },

    // ---- Operators ----
    /// Unary operator application.
    Unary { op: UnOp, inner: Box<Eir> },
    /// Binary operator application.
    Binary {
        op: BinOp,
        left: Box<Eir>,
        right: Box<Eir>,
    },
    /// Simple or compound assignment. `target` is always a place (a
    /// `NameRef` in the supported subset).
    Assign {
        target: Box<Eir>,
        op: AssignOp,
        value: Box<Eir>,
    },
    /// `(T) expr`
    Cast {
        target_type: TypeDescriptor,
        inner: Box<Eir>,
    },
    /// `cond ? then_expr : else_expr`. Never produced by the parser —
    /// introduced only by lowering's null-safe-access desugaring
    /// (`a!.b` -> `a == null ? null : a.b`). Fallback-only: the direct
    /// emitter's supported subset has no value-producing branch merge, so
    /// `can_emit` always rejects this node and it reaches the emitter
    /// only via `exprc-fallback`'s pretty-printer.
    Conditional {
        cond: Box<Eir>,
        then_expr: Box<Eir>,
        else_expr: Box<Eir>,
    },
    /// `(expr)` — a parenthesized expression, kept distinct from its inner
    /// node only to preserve source spans; carries no semantics of its
    /// own.
    Enclosed(Box<Eir>),

    // ---- Statements ----
    /// An expression evaluated for its side effect; the stack value (if
    /// any) is discarded.
    ExprStmt(Box<Eir>),
    /// `var name = init;` or `Type name = init;`
    VarDecl {
        declared_type: Option<TypeDescriptor>,
        name: Symbol,
        init: Option<Box<Eir>>,
    },
    /// `if (cond) then [else else_branch]`
    If {
        cond: Box<Eir>,
        then_branch: Box<Eir>,
        else_branch: Option<Box<Eir>>,
    },
    /// `{ stmts }`
    Block(Vec<Eir>),
    /// `return [expr];`
    Return(Option<Box<Eir>>),
    /// `;` with no effect.
    Empty,

    // ---- Desugaring targets (present only before B runs) ----
    /// `scope!.field` — rewritten by the lowerer into a null check plus a
    /// plain [`EirKind::FieldGet`].
    NullSafeFieldGet { scope: Box<Eir>, field: Symbol },
    /// `scope!.name(args)` — rewritten analogously to
    /// [`EirKind::NullSafeFieldGet`].
    NullSafeMethodCall {
        scope: Box<Eir>,
        name: Symbol,
        args: Vec<Eir>,
    },
    /// `modify(target) { stmts }` — rewritten into `stmts` with `target`
    /// as implicit receiver, followed by a synthesized `update(target)`
    /// call.
    Modify { target: Box<Eir>, stmts: Vec<Eir> },
    /// `with(target) { stmts }` — rewritten like [`EirKind::Modify`] but
    /// without the trailing write-back call.
    With { target: Box<Eir>, stmts: Vec<Eir> },
    /// `expr#T` — rewritten into a plain [`EirKind::Cast`].
    InlineCast {
        target_type: TypeDescriptor,
        inner: Box<Eir>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::Interner;

    #[test]
    fn always_returns_detects_trailing_return() {
        let block = Eir::new(
            Span::synthetic(),
            EirKind::Block(vec![Eir::new(Span::synthetic(), EirKind::Return(None))]),
        );
        assert!(block.always_returns());
    }

    #[test]
    fn always_returns_requires_both_if_branches() {
        let mut interner = Interner::new();
        let name = interner.intern("a");
        let then_branch = Eir::new(Span::synthetic(), EirKind::Return(None));
        let cond = Eir::new(Span::synthetic(), EirKind::NameRef(name));
        let if_no_else = Eir::new(
            Span::synthetic(),
            EirKind::If {
                cond: Box::new(cond),
                then_branch: Box::new(then_branch),
                else_branch: None,
            },
        );
        assert!(!if_no_else.always_returns());
    }

    #[test]
    fn children_walks_binary_operands() {
        let left = Eir::new(Span::synthetic(), EirKind::IntLit(1));
        let right = Eir::new(Span::synthetic(), EirKind::IntLit(2));
        let add = Eir::new(
            Span::synthetic(),
            EirKind::Binary {
                op: BinOp::Add,
                left: Box::new(left),
                right: Box::new(right),
            },
        );
        assert_eq!(add.children().len(), 2);
    }
}
