//! The capability gate (`can_emit`) and its companion `diagnose_rejection`,
//! required so the fallback dispatcher and telemetry both get a concrete
//! reason rather than a bare `false`.

use crate::reflection::{MethodSignature, ReflectionCache};
use crate::wellknown;
use exprc_ir::{Eir, EirKind, Interner};
use exprc_types::{DeclarationTable, TypeDescriptor};

/// Chained method-call resolution stops after this many hops. Falling back
/// beyond this depth is a policy choice, not a technical limit — named
/// here so raising it later is a one-line change.
pub const MAX_CHAIN_DEPTH: usize = 2;

/// A node the direct emitter refuses, with a human-readable reason naming
/// a concrete unsupported construct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    /// Why this node forces the fallback path.
    pub reason: String,
}

impl Rejection {
    fn new(reason: impl Into<String>) -> Self {
        Self { reason: reason.into() }
    }
}

/// Whether the direct emitter can produce bytes for `eir` under
/// `declarations`, using `reflection` to resolve method/constructor
/// targets and `interner` to resolve symbol text.
pub fn can_emit(
    eir: &Eir,
    declarations: &DeclarationTable,
    reflection: &ReflectionCache,
    interner: &Interner,
) -> bool {
    diagnose_rejection(eir, declarations, reflection, interner).is_none()
}

/// Find the first node (pre-order) the direct emitter's supported subset
/// rejects, with a reason. `None` means the whole tree is emittable.
pub fn diagnose_rejection(
    eir: &Eir,
    declarations: &DeclarationTable,
    reflection: &ReflectionCache,
    interner: &Interner,
) -> Option<Rejection> {
    check_node(eir, declarations, reflection, interner, 0)
}

fn check_node(
    eir: &Eir,
    declarations: &DeclarationTable,
    reflection: &ReflectionCache,
    interner: &Interner,
    depth: usize,
) -> Option<Rejection> {
    match &eir.kind {
        EirKind::IntLit(_)
        | EirKind::LongLit(_)
        | EirKind::DoubleLit(_)
        | EirKind::FloatLit(_)
        | EirKind::BoolLit(_)
        | EirKind::StringLit(_)
        | EirKind::NullLit
        | EirKind::CharLit(_)
        | EirKind::Empty => None,

        EirKind::NameRef(sym) => {
            let name = interner.resolve(*sym);
            if eir.ty.is_some() || declarations.find(name).is_some() || declarations.context.name == name {
                None
            } else {
                Some(Rejection::new(format!(
                    "`{name}` is not a declared variable or known static scope"
                )))
            }
        }

        EirKind::Enclosed(inner) => check_node(inner, declarations, reflection, interner, depth),

        EirKind::Cast { target_type, inner } => {
            if matches!(target_type, TypeDescriptor::Parameterized(_)) {
                return Some(Rejection::new("cast to an unresolved generic type"));
            }
            check_node(inner, declarations, reflection, interner, depth)
        }

        EirKind::Unary { inner, .. } => check_node(inner, declarations, reflection, interner, depth),

        EirKind::Binary { op, left, right } => {
            if op.is_arithmetic() {
                if let (Some(l), Some(r)) = (&left.ty, &right.ty) {
                    let l_ref = !l.is_primitive();
                    let r_ref = !r.is_primitive();
                    let either_string = matches!(l, TypeDescriptor::Reference(n) if n == "java.lang.String")
                        || matches!(r, TypeDescriptor::Reference(n) if n == "java.lang.String");
                    if l_ref && r_ref && !either_string {
                        return Some(Rejection::new(
                            "string/reference concatenation requires at least one String operand",
                        ));
                    }
                }
            }
            check_node(left, declarations, reflection, interner, depth)
                .or_else(|| check_node(right, declarations, reflection, interner, depth))
        }

        EirKind::Assign { target, op, value } => {
            if op.as_binop().is_some() {
                if let Some(TypeDescriptor::Reference(fqcn)) = &target.ty {
                    if fqcn == "java.math.BigDecimal" || fqcn == "java.math.BigInteger" {
                        return Some(Rejection::new(
                            "compound assignment on a big-number type is a permanent fallback category",
                        ));
                    }
                }
            }
            if !matches!(target.kind, EirKind::NameRef(_)) {
                return Some(Rejection::new("assignment target is not a declared variable"));
            }
            check_node(target, declarations, reflection, interner, depth)
                .or_else(|| check_node(value, declarations, reflection, interner, depth))
        }

        EirKind::MethodCall { scope, args, .. } => {
            if resolve_call_signature(eir, reflection, interner, depth).is_none() {
                return Some(Rejection::new(match scope {
                    None => "scope-less free-function call relying on static import".to_string(),
                    Some(_) => {
                        "method call does not resolve statically within the chain-depth budget"
                            .to_string()
                    }
                }));
            }
            if let Some(scope) = scope {
                if let Some(r) = check_node(scope, declarations, reflection, interner, depth) {
                    return Some(r);
                }
            }
            args.iter()
                .find_map(|a| check_node(a, declarations, reflection, interner, depth))
        }

        EirKind::ObjectNew { ty, args } => {
            let Some(fqcn) = wellknown::resolve_class_name(ty) else {
                return Some(Rejection::new(format!("`new {ty}` targets an unresolved class")));
            };
            if !reflection.has_constructor(&fqcn, args.len()) {
                return Some(Rejection::new(format!(
                    "no {}-arg constructor resolves on `{fqcn}`",
                    args.len()
                )));
            }
            args.iter()
                .find_map(|a| check_node(a, declarations, reflection, interner, depth))
        }

        EirKind::ExprStmt(inner) => check_node(inner, declarations, reflection, interner, depth),

        EirKind::VarDecl { init, .. } => {
            init.as_ref().and_then(|i| check_node(i, declarations, reflection, interner, depth))
        }

        EirKind::If { cond, then_branch, else_branch } => {
            check_node(cond, declarations, reflection, interner, depth)
                .or_else(|| check_node(then_branch, declarations, reflection, interner, depth))
                .or_else(|| {
                    else_branch
                        .as_ref()
                        .and_then(|e| check_node(e, declarations, reflection, interner, depth))
                })
        }

        EirKind::Block(stmts) => stmts
            .iter()
            .find_map(|s| check_node(s, declarations, reflection, interner, depth)),

        EirKind::Return(expr) => expr
            .as_ref()
            .and_then(|e| check_node(e, declarations, reflection, interner, depth)),

        // Explicitly excluded from the supported subset: the enumerated
        // emittable forms never cover these, and array access is named
        // outright as a permanent fallback category.
        EirKind::FieldGet { .. } => {
            Some(Rejection::new("field access is not in the direct emitter's supported subset"))
        }
        EirKind::ArrayAccess { .. } => {
            Some(Rejection::new("array creation/access is a permanent fallback category"))
        }
        EirKind::Conditional { .. } => Some(Rejection::new(
            "conditional (ternary) expressions are not in the direct emitter's supported subset",
        )),

        // These only exist pre-lowering; reaching the emitter with one
        // still present is a lowering bug, not a legitimate rejection, but
        // defensively still route to the fallback rather than panic.
        EirKind::MapLiteral(_) => Some(Rejection::new("unlowered map literal reached the emitter")),
        EirKind::ListLiteral(_) => Some(Rejection::new("unlowered list literal reached the emitter")),
        EirKind::BigDecimalLit(_) => {
            Some(Rejection::new("unlowered big-decimal literal reached the emitter"))
        }
        EirKind::BigIntegerLit(_) => {
            Some(Rejection::new("unlowered big-integer literal reached the emitter"))
        }
        EirKind::TemporalDurationLit(_) => {
            Some(Rejection::new("unlowered temporal literal reached the emitter"))
        }
        EirKind::NullSafeFieldGet { .. } | EirKind::NullSafeMethodCall { .. } => {
            Some(Rejection::new("unlowered null-safe access reached the emitter"))
        }
        EirKind::Modify { .. } | EirKind::With { .. } => {
            Some(Rejection::new("unlowered modify/with block reached the emitter"))
        }
        EirKind::InlineCast { .. } => Some(Rejection::new("unlowered inline cast reached the emitter")),
    }
}

/// Resolve a `MethodCall`'s target signature per the method-resolution
/// order below, returning `None` if nothing in the order matches
/// within [`MAX_CHAIN_DEPTH`].
pub(crate) fn resolve_call_signature(
    eir: &Eir,
    reflection: &ReflectionCache,
    interner: &Interner,
    depth: usize,
) -> Option<MethodSignature> {
    let EirKind::MethodCall { scope, name, args } = &eir.kind else {
        return None;
    };
    // A scope-less call relies on a static import the emitter cannot
    // resolve without a live classpath — always a fallback category.
    let scope = scope.as_ref()?;
    let owner = resolve_scope_owner(scope, reflection, depth)?;
    let name = interner.resolve(*name);
    reflection.resolve_method(&owner, name, args.len())
}

/// Resolve a `MethodCall` scope expression's static owner class, in this
/// order: a known class constant, a variable
/// whose declared type is reflectively introspectable, or (recursively,
/// up to [`MAX_CHAIN_DEPTH`]) another method call's reflective return
/// type.
pub(crate) fn resolve_scope_owner(
    scope: &Eir,
    reflection: &ReflectionCache,
    depth: usize,
) -> Option<String> {
    match &scope.kind {
        EirKind::NameRef(_) => match &scope.ty {
            Some(TypeDescriptor::Reference(fqcn)) => Some(fqcn.clone()),
            _ => None,
        },
        EirKind::MethodCall { .. } => {
            if depth >= MAX_CHAIN_DEPTH {
                return None;
            }
            let _ = reflection;
            match &scope.ty {
                Some(TypeDescriptor::Reference(fqcn)) => Some(fqcn.clone()),
                _ => None,
            }
        }
        EirKind::Enclosed(inner) => resolve_scope_owner(inner, reflection, depth),
        _ => None,
    }
}
