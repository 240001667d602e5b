//! `infer_stack_type`: the pure function the emitter treats
//! as the single source of truth for what primitive/reference kind an
//! expression leaves on the stack. Every widening, boxing, and branch
//! (`ifeq` vs `if_icmpeq` vs reference `if_acmpeq`) decision in `emit.rs`
//! defers to this rather than re-deriving a type inline, so there is
//! exactly one place that can disagree with the verifier.

use crate::reflection::ReflectionCache;
use crate::slots::SlotTable;
use exprc_ir::{BinOp, Eir, EirKind, Interner, UnOp};
use exprc_types::{widen, DeclarationTable, PrimitiveTag, TypeDescriptor};

/// Infer the static type `eir` leaves on the stack once emitted.
///
/// Nodes the parser or lowerer already annotated (`eir.ty.is_some()`) are
/// trusted as-is; this function exists for the handful of shapes the
/// emitter builds or rewrites locally where re-deriving the type from
/// children is cheaper and more reliable than threading an annotation
/// through.
pub fn infer_stack_type(
    eir: &Eir,
    slots: &SlotTable,
    declarations: &DeclarationTable,
    reflection: &ReflectionCache,
    interner: &Interner,
) -> Option<TypeDescriptor> {
    if let Some(ty) = &eir.ty {
        return Some(ty.clone());
    }

    match &eir.kind {
        EirKind::IntLit(_) => Some(TypeDescriptor::Primitive(PrimitiveTag::Int)),
        EirKind::LongLit(_) => Some(TypeDescriptor::Primitive(PrimitiveTag::Long)),
        EirKind::DoubleLit(_) => Some(TypeDescriptor::Primitive(PrimitiveTag::Double)),
        EirKind::FloatLit(_) => Some(TypeDescriptor::Primitive(PrimitiveTag::Float)),
        EirKind::BoolLit(_) => Some(TypeDescriptor::Primitive(PrimitiveTag::Boolean)),
        EirKind::CharLit(_) => Some(TypeDescriptor::Primitive(PrimitiveTag::Char)),
        EirKind::StringLit(_) => Some(TypeDescriptor::reference("java.lang.String")),
        EirKind::NullLit => Some(TypeDescriptor::reference("java.lang.Object")),

        EirKind::NameRef(sym) => {
            let name = interner.resolve(*sym);
            if name == declarations.context.name {
                return Some(declarations.context.ty.clone());
            }
            slots
                .get(name)
                .map(|(_, ty)| ty.clone())
                .or_else(|| declarations.find(name).map(|d| d.ty.clone()))
        }

        EirKind::Unary { op, inner } => {
            let inner_ty = infer_stack_type(inner, slots, declarations, reflection, interner)?;
            match op {
                UnOp::Not => Some(TypeDescriptor::Primitive(PrimitiveTag::Boolean)),
                UnOp::Neg | UnOp::BitNot => Some(inner_ty),
            }
        }

        EirKind::Binary { op, left, right } => {
            if op.is_comparison() || op.is_short_circuit() {
                return Some(TypeDescriptor::Primitive(PrimitiveTag::Boolean));
            }
            let lt = infer_stack_type(left, slots, declarations, reflection, interner)?;
            let rt = infer_stack_type(right, slots, declarations, reflection, interner)?;
            if *op == BinOp::Add {
                let either_string = matches!(&lt, TypeDescriptor::Reference(n) if n == "java.lang.String")
                    || matches!(&rt, TypeDescriptor::Reference(n) if n == "java.lang.String");
                if either_string {
                    return Some(TypeDescriptor::reference("java.lang.String"));
                }
            }
            match (lt.as_primitive(), rt.as_primitive()) {
                (Some(a), Some(b)) => Some(TypeDescriptor::Primitive(widen(a, b))),
                _ => Some(lt),
            }
        }

        EirKind::Assign { target, .. } => infer_stack_type(target, slots, declarations, reflection, interner),

        EirKind::Cast { target_type, .. } => Some(target_type.clone()),

        EirKind::Enclosed(inner) => infer_stack_type(inner, slots, declarations, reflection, interner),

        EirKind::MethodCall { scope, name, args } => {
            let owner = scope
                .as_ref()
                .and_then(|s| infer_stack_type(s, slots, declarations, reflection, interner))?;
            let owner_fqcn = owner.erased_class_name();
            let sig = reflection.resolve_method(owner_fqcn, interner.resolve(*name), args.len())?;
            sig.ret.or_else(|| Some(TypeDescriptor::reference("java.lang.Object")))
        }

        EirKind::ObjectNew { ty, .. } => Some(TypeDescriptor::reference(
            crate::wellknown::resolve_class_name(ty).unwrap_or_else(|| ty.clone()),
        )),

        // Statement-shaped nodes produce no stack value.
        EirKind::ExprStmt(_)
        | EirKind::VarDecl { .. }
        | EirKind::If { .. }
        | EirKind::Block(_)
        | EirKind::Return(_)
        | EirKind::Empty => None,

        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use exprc_ir::Span;
    use exprc_types::Declaration;

    fn declarations() -> DeclarationTable {
        DeclarationTable::new(
            Declaration::new("ctx", TypeDescriptor::reference("java.util.Map")),
            vec![Declaration::new("a", TypeDescriptor::Primitive(PrimitiveTag::Int))],
        )
    }

    #[test]
    fn arithmetic_widens_int_and_long() {
        let slots = SlotTable::new("ctx", TypeDescriptor::reference("java.util.Map"));
        let reflection = ReflectionCache::well_known();
        let interner = Interner::new();
        let left = Eir::new(Span::synthetic(), EirKind::IntLit(1));
        let right = Eir::new(Span::synthetic(), EirKind::LongLit(2));
        let add = Eir::new(
            Span::synthetic(),
            EirKind::Binary { op: BinOp::Add, left: Box::new(left), right: Box::new(right) },
        );
        let ty = infer_stack_type(&add, &slots, &declarations(), &reflection, &interner).unwrap();
        assert_eq!(ty, TypeDescriptor::Primitive(PrimitiveTag::Long));
    }

    #[test]
    fn comparison_is_always_boolean() {
        let slots = SlotTable::new("ctx", TypeDescriptor::reference("java.util.Map"));
        let reflection = ReflectionCache::well_known();
        let interner = Interner::new();
        let left = Eir::new(Span::synthetic(), EirKind::IntLit(1));
        let right = Eir::new(Span::synthetic(), EirKind::IntLit(2));
        let cmp = Eir::new(
            Span::synthetic(),
            EirKind::Binary { op: BinOp::Lt, left: Box::new(left), right: Box::new(right) },
        );
        let ty = infer_stack_type(&cmp, &slots, &declarations(), &reflection, &interner).unwrap();
        assert_eq!(ty, TypeDescriptor::Primitive(PrimitiveTag::Boolean));
    }

    #[test]
    fn string_concat_with_either_operand_a_string_yields_string() {
        let slots = SlotTable::new("ctx", TypeDescriptor::reference("java.util.Map"));
        let reflection = ReflectionCache::well_known();
        let interner = Interner::new();
        let left = Eir::typed(Span::synthetic(), TypeDescriptor::reference("java.lang.String"), EirKind::StringLit("x".into()));
        let right = Eir::new(Span::synthetic(), EirKind::IntLit(1));
        let add = Eir::new(
            Span::synthetic(),
            EirKind::Binary { op: BinOp::Add, left: Box::new(left), right: Box::new(right) },
        );
        let ty = infer_stack_type(&add, &slots, &declarations(), &reflection, &interner).unwrap();
        assert_eq!(ty, TypeDescriptor::reference("java.lang.String"));
    }

    #[test]
    fn name_ref_resolves_against_slot_table() {
        let mut slots = SlotTable::new("ctx", TypeDescriptor::reference("java.util.Map"));
        slots.declare("a", TypeDescriptor::Primitive(PrimitiveTag::Int));
        let reflection = ReflectionCache::well_known();
        let mut interner = Interner::new();
        let a = interner.intern("a");
        let name_ref = Eir::new(Span::synthetic(), EirKind::NameRef(a));
        let ty = infer_stack_type(&name_ref, &slots, &declarations(), &reflection, &interner).unwrap();
        assert_eq!(ty, TypeDescriptor::Primitive(PrimitiveTag::Int));
    }
}
