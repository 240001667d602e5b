//! The emission algorithm ("Emission algorithm"): a single
//! post-order walk over an already-`can_emit`-accepted EIR tree, driving a
//! [`CodeBuilder`] and a shared [`ConstantPool`] to produce one evaluator
//! class's bytes.

use crate::infer::infer_stack_type;
use crate::slots::SlotTable;
use crate::wellknown;
use crate::EmitError;
use exprc_classfile::{
    descriptor_for, internal_name, method_descriptor, ClassFile, CodeBuilder, ConstantPool,
    FieldDef, MethodDef, Opcode,
};
use exprc_ir::{AssignOp, BinOp, Eir, EirKind, Interner, Symbol, UnOp};
use exprc_types::{ContextKind, DeclarationTable, PrimitiveTag, TypeDescriptor};

use crate::reflection::ReflectionCache;

/// `public final` no-supertype evaluator class, with a `super` flag (JVM
/// spec requires it on every class file since Java 1.1).
const CLASS_ACCESS: u16 = exprc_classfile::ACC_PUBLIC | exprc_classfile::ACC_FINAL | exprc_classfile::ACC_SUPER;
const MEMBER_ACCESS: u16 = exprc_classfile::ACC_PUBLIC_MEMBER;

/// Internal name of the marker interface every generated evaluator
/// declares it implements. The host runtime provides and loads this
/// interface class; this crate only ever writes its name into the
/// `interfaces` table, never its bytes.
const EVALUATOR_INTERFACE: &str = "exprc/runtime/Evaluator";

/// `name` -> `getName` (the reflective getter convention the Pojo
/// [`ContextKind`] resolves variable reads through).
fn getter_name(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => format!("get{}{}", first.to_uppercase(), chars.as_str()),
        None => "get".to_string(),
    }
}

fn word_size(p: PrimitiveTag) -> i32 {
    if p.is_wide() { 2 } else { 1 }
}

fn load_opcode(ty: &TypeDescriptor) -> (Opcode, bool) {
    match ty.as_primitive() {
        Some(PrimitiveTag::Long) => (Opcode::Lload, true),
        Some(PrimitiveTag::Float) => (Opcode::Fload, false),
        Some(PrimitiveTag::Double) => (Opcode::Dload, true),
        Some(_) => (Opcode::Iload, false),
        None => (Opcode::Aload, false),
    }
}

fn store_opcode(ty: &TypeDescriptor) -> (Opcode, bool) {
    match ty.as_primitive() {
        Some(PrimitiveTag::Long) => (Opcode::Lstore, true),
        Some(PrimitiveTag::Float) => (Opcode::Fstore, false),
        Some(PrimitiveTag::Double) => (Opcode::Dstore, true),
        Some(_) => (Opcode::Istore, false),
        None => (Opcode::Astore, false),
    }
}

fn return_opcode(ty: &TypeDescriptor) -> (Opcode, i32) {
    match ty.as_primitive() {
        Some(PrimitiveTag::Long) => (Opcode::Lreturn, 2),
        Some(PrimitiveTag::Float) => (Opcode::Freturn, 1),
        Some(PrimitiveTag::Double) => (Opcode::Dreturn, 1),
        Some(_) => (Opcode::Ireturn, 1),
        None => (Opcode::Areturn, 1),
    }
}

fn arithmetic_opcode(op: BinOp, ty: PrimitiveTag) -> Result<Opcode, EmitError> {
    use PrimitiveTag::*;
    let op = match (op, ty) {
        (BinOp::Add, Int) => Opcode::Iadd,
        (BinOp::Add, Long) => Opcode::Ladd,
        (BinOp::Add, Float) => Opcode::Fadd,
        (BinOp::Add, Double) => Opcode::Dadd,
        (BinOp::Sub, Int) => Opcode::Isub,
        (BinOp::Sub, Long) => Opcode::Lsub,
        (BinOp::Sub, Float) => Opcode::Fsub,
        (BinOp::Sub, Double) => Opcode::Dsub,
        (BinOp::Mul, Int) => Opcode::Imul,
        (BinOp::Mul, Long) => Opcode::Lmul,
        (BinOp::Mul, Float) => Opcode::Fmul,
        (BinOp::Mul, Double) => Opcode::Dmul,
        (BinOp::Div, Int) => Opcode::Idiv,
        (BinOp::Div, Long) => Opcode::Ldiv,
        (BinOp::Div, Float) => Opcode::Fdiv,
        (BinOp::Div, Double) => Opcode::Ddiv,
        (BinOp::Rem, Int) => Opcode::Irem,
        (BinOp::Rem, Long) => Opcode::Lrem,
        (BinOp::Rem, Float) => Opcode::Frem,
        (BinOp::Rem, Double) => Opcode::Drem,
        (BinOp::BitAnd, Int) => Opcode::Iand,
        (BinOp::BitAnd, Long) => Opcode::Land,
        (BinOp::BitOr, Int) => Opcode::Ior,
        (BinOp::BitOr, Long) => Opcode::Lor,
        (BinOp::BitXor, Int) => Opcode::Ixor,
        (BinOp::BitXor, Long) => Opcode::Lxor,
        (BinOp::Shl, Int) => Opcode::Ishl,
        (BinOp::Shl, Long) => Opcode::Lshl,
        (BinOp::Shr, Int) => Opcode::Ishr,
        (BinOp::Shr, Long) => Opcode::Lshr,
        (BinOp::UShr, Int) => Opcode::Iushr,
        (BinOp::UShr, Long) => Opcode::Lushr,
        _ => {
            return Err(EmitError::UnsupportedOperator {
                op: format!("{op:?}"),
                ty: ty.to_string(),
            })
        }
    };
    Ok(op)
}

fn if_icmp_opcode(op: BinOp) -> Opcode {
    match op {
        BinOp::Eq => Opcode::IfIcmpeq,
        BinOp::Ne => Opcode::IfIcmpne,
        BinOp::Lt => Opcode::IfIcmplt,
        BinOp::Le => Opcode::IfIcmple,
        BinOp::Gt => Opcode::IfIcmpgt,
        BinOp::Ge => Opcode::IfIcmpge,
        _ => unreachable!("only comparison operators reach if_icmp_opcode"),
    }
}

fn post_cmp_branch_opcode(op: BinOp) -> Opcode {
    match op {
        BinOp::Eq => Opcode::Ifeq,
        BinOp::Ne => Opcode::Ifne,
        BinOp::Lt => Opcode::Iflt,
        BinOp::Le => Opcode::Ifle,
        BinOp::Gt => Opcode::Ifgt,
        BinOp::Ge => Opcode::Ifge,
        _ => unreachable!("only comparison operators reach post_cmp_branch_opcode"),
    }
}

/// `fcmpg`/`fcmpl` selection so NaN always lands on the "false" side of a
/// comparison ("NaN-safe variant"): `<`/`<=` use `fcmpg` (NaN
/// compares as `1`, failing the subsequent `< 0`/`<= 0` test), `>`/`>=` use
/// `fcmpl` (NaN compares as `-1`, failing `> 0`/`>= 0`); `==` uses `fcmpl`
/// and `!=` uses `fcmpg` so NaN never equals anything but always compares
/// unequal.
fn float_cmp_opcode(op: BinOp) -> Opcode {
    match op {
        BinOp::Lt | BinOp::Le => Opcode::Fcmpg,
        BinOp::Gt | BinOp::Ge | BinOp::Eq => Opcode::Fcmpl,
        BinOp::Ne => Opcode::Fcmpg,
        _ => unreachable!("only comparison operators reach float_cmp_opcode"),
    }
}

fn double_cmp_opcode(op: BinOp) -> Opcode {
    match op {
        BinOp::Lt | BinOp::Le => Opcode::Dcmpg,
        BinOp::Gt | BinOp::Ge | BinOp::Eq => Opcode::Dcmpl,
        BinOp::Ne => Opcode::Dcmpg,
        _ => unreachable!("only comparison operators reach double_cmp_opcode"),
    }
}

/// Drives one evaluator method body's emission. Holds two pieces of
/// mutable state: the local slot table and the `CodeBuilder`, plus the
/// read-only inputs (declarations, context kind, reflection, interner) the
/// walk consults but never mutates.
struct Emitter<'a> {
    constants: &'a mut ConstantPool,
    code: CodeBuilder,
    slots: SlotTable,
    declarations: &'a DeclarationTable,
    context_kind: ContextKind,
    reflection: &'a ReflectionCache,
    interner: &'a Interner,
}

impl<'a> Emitter<'a> {
    fn infer(&self, eir: &Eir) -> Option<TypeDescriptor> {
        infer_stack_type(eir, &self.slots, self.declarations, self.reflection, self.interner)
    }

    fn emit_stmt(&mut self, stmt: &Eir, out_type: &TypeDescriptor) -> Result<(), EmitError> {
        match &stmt.kind {
            EirKind::ExprStmt(inner) => {
                let ty = self.emit_expr(inner)?;
                self.pop_value(&ty);
                Ok(())
            }
            EirKind::VarDecl { declared_type, name, init } => self.emit_var_decl(declared_type, *name, init),
            EirKind::If { cond, then_branch, else_branch } => {
                self.emit_if(cond, then_branch, else_branch, out_type)
            }
            EirKind::Block(stmts) => {
                for s in stmts {
                    self.emit_stmt(s, out_type)?;
                }
                Ok(())
            }
            EirKind::Return(expr) => self.emit_return(expr, out_type),
            EirKind::Empty => Ok(()),
            EirKind::Enclosed(inner) => self.emit_stmt(inner, out_type),
            // A body whose content kind is a bare EXPRESSION
            // reaches here as a plain value-producing node rather than a
            // statement; evaluate it and return the result.
            _ => {
                let ty = self.emit_expr(stmt)?;
                self.coerce(&ty, out_type)?;
                let (op, words) = return_opcode(out_type);
                self.code.return_op(op, words);
                Ok(())
            }
        }
    }

    fn pop_value(&mut self, ty: &TypeDescriptor) {
        if ty.as_primitive().is_some_and(|p| p.is_wide()) {
            self.code.op(Opcode::Pop2, 2, 0);
        } else {
            self.code.op(Opcode::Pop, 1, 0);
        }
    }

    fn dup_value(&mut self, ty: &TypeDescriptor) {
        if ty.as_primitive().is_some_and(|p| p.is_wide()) {
            self.code.dup2();
        } else {
            self.code.dup();
        }
    }

    fn load_slot(&mut self, slot: u16, ty: &TypeDescriptor) {
        let (op, wide) = load_opcode(ty);
        if wide {
            self.code.load_wide(op, slot as u8);
        } else {
            self.code.load(op, slot as u8);
        }
    }

    fn store_slot(&mut self, slot: u16, ty: &TypeDescriptor) {
        let (op, wide) = store_opcode(ty);
        if wide {
            self.code.store_wide(op, slot as u8);
        } else {
            self.code.store(op, slot as u8);
        }
    }

    fn emit_var_decl(
        &mut self,
        declared_type: &Option<TypeDescriptor>,
        name: Symbol,
        init: &Option<Box<Eir>>,
    ) -> Result<(), EmitError> {
        let name_text = self.interner.resolve(name).to_string();
        let init = init
            .as_ref()
            .ok_or_else(|| EmitError::Unsupported(format!("variable `{name_text}` declared with no initializer")))?;
        let init_ty = self.emit_expr(init)?;
        let effective_ty = declared_type.clone().unwrap_or_else(|| init_ty.clone());
        self.coerce(&init_ty, &effective_ty)?;
        let slot = self.slots.declare(&name_text, effective_ty.clone());
        self.store_slot(slot, &effective_ty);
        Ok(())
    }

    fn emit_if(
        &mut self,
        cond: &Eir,
        then_branch: &Eir,
        else_branch: &Option<Box<Eir>>,
        out_type: &TypeDescriptor,
    ) -> Result<(), EmitError> {
        let else_label = self.code.new_label();
        let end_label = self.code.new_label();
        self.emit_expr(cond)?;
        self.code.branch(Opcode::Ifeq, else_label, 1);
        self.emit_stmt(then_branch, out_type)?;
        if !then_branch.always_returns() {
            self.code.branch(Opcode::Goto, end_label, 0);
        }
        self.code.bind_label(else_label);
        if let Some(else_branch) = else_branch {
            self.emit_stmt(else_branch, out_type)?;
        }
        self.code.bind_label(end_label);
        Ok(())
    }

    fn emit_return(&mut self, expr: &Option<Box<Eir>>, out_type: &TypeDescriptor) -> Result<(), EmitError> {
        match expr {
            None => self.code.return_op(Opcode::Return, 0),
            Some(e) => {
                let ty = self.emit_expr(e)?;
                self.coerce(&ty, out_type)?;
                let (op, words) = return_opcode(out_type);
                self.code.return_op(op, words);
            }
        }
        Ok(())
    }

    fn emit_expr(&mut self, eir: &Eir) -> Result<TypeDescriptor, EmitError> {
        match &eir.kind {
            EirKind::IntLit(v) => {
                self.push_int(*v);
                Ok(TypeDescriptor::Primitive(PrimitiveTag::Int))
            }
            EirKind::LongLit(v) => {
                let idx = self.constants.long(*v);
                self.code.ldc2_w(idx);
                Ok(TypeDescriptor::Primitive(PrimitiveTag::Long))
            }
            EirKind::DoubleLit(v) => {
                let idx = self.constants.double(*v);
                self.code.ldc2_w(idx);
                Ok(TypeDescriptor::Primitive(PrimitiveTag::Double))
            }
            EirKind::FloatLit(v) => {
                let idx = self.constants.float(*v);
                self.code.ldc(idx);
                Ok(TypeDescriptor::Primitive(PrimitiveTag::Float))
            }
            EirKind::BoolLit(b) => {
                self.code.op(if *b { Opcode::Iconst1 } else { Opcode::Iconst0 }, 0, 1);
                Ok(TypeDescriptor::Primitive(PrimitiveTag::Boolean))
            }
            EirKind::CharLit(c) => {
                self.push_int(*c as i32);
                Ok(TypeDescriptor::Primitive(PrimitiveTag::Char))
            }
            EirKind::StringLit(s) => {
                let idx = self.constants.string(s);
                self.code.ldc(idx);
                Ok(TypeDescriptor::reference("java.lang.String"))
            }
            EirKind::NullLit => {
                self.code.op(Opcode::AconstNull, 0, 1);
                Ok(TypeDescriptor::reference("java.lang.Object"))
            }
            EirKind::Enclosed(inner) => self.emit_expr(inner),
            EirKind::NameRef(sym) => self.emit_name_ref(*sym),
            EirKind::Unary { op, inner } => self.emit_unary(*op, inner),
            EirKind::Binary { op, left, right } => self.emit_binary(*op, left, right),
            EirKind::Assign { target, op, value } => self.emit_assign(target, *op, value),
            EirKind::Cast { target_type, inner } => self.emit_cast(target_type, inner),
            EirKind::MethodCall { scope, name, args } => self.emit_method_call(scope, *name, args),
            EirKind::ObjectNew { ty, args } => self.emit_object_new(ty, args),
            other => Err(EmitError::Unsupported(format!("{other:?}"))),
        }
    }

    fn push_int(&mut self, v: i32) {
        match v {
            -1 => self.code.op(Opcode::IconstM1, 0, 1),
            0 => self.code.op(Opcode::Iconst0, 0, 1),
            1 => self.code.op(Opcode::Iconst1, 0, 1),
            2 => self.code.op(Opcode::Iconst2, 0, 1),
            3 => self.code.op(Opcode::Iconst3, 0, 1),
            4 => self.code.op(Opcode::Iconst4, 0, 1),
            5 => self.code.op(Opcode::Iconst5, 0, 1),
            v if i8::try_from(v).is_ok() => self.code.push_byte(v as i8),
            v if i16::try_from(v).is_ok() => self.code.push_short(v as i16),
            v => {
                let idx = self.constants.integer(v);
                self.code.ldc(idx);
            }
        }
    }

    fn emit_name_ref(&mut self, sym: Symbol) -> Result<TypeDescriptor, EmitError> {
        let name = self.interner.resolve(sym).to_string();
        if let Some((slot, ty)) = self.slots.get(&name) {
            let ty = ty.clone();
            self.load_slot(slot, &ty);
            return Ok(ty);
        }
        if name == self.declarations.context.name {
            self.code.load(Opcode::Aload, 1);
            return Ok(self.declarations.context.ty.clone());
        }
        let decl = self
            .declarations
            .find(&name)
            .ok_or_else(|| EmitError::UnresolvedName(name.clone()))?
            .clone();
        self.emit_context_lookup(&decl.name, &decl.ty)
    }

    /// Resolve a declared (but not yet locally stored) variable against the
    /// runtime context object, per its [`ContextKind`].
    fn emit_context_lookup(&mut self, name: &str, ty: &TypeDescriptor) -> Result<TypeDescriptor, EmitError> {
        match self.context_kind {
            ContextKind::Map => {
                self.code.load(Opcode::Aload, 1);
                let idx = self.constants.string(name);
                self.code.ldc(idx);
                let desc = "(Ljava/lang/Object;)Ljava/lang/Object;";
                let mref = self.constants.interface_methodref("java/util/Map", "get", desc);
                self.code.invoke_interface(mref, desc, 2);
                self.coerce_context_value(ty)
            }
            ContextKind::List => {
                self.code.load(Opcode::Aload, 1);
                let index = self.declarations.position_of(name).ok_or_else(|| EmitError::UnresolvedName(name.to_string()))?;
                self.push_int(index as i32);
                let desc = "(I)Ljava/lang/Object;";
                let mref = self.constants.interface_methodref("java/util/List", "get", desc);
                self.code.invoke_interface(mref, desc, 2);
                self.coerce_context_value(ty)
            }
            ContextKind::Pojo => {
                let context_fqcn = self.declarations.context.ty.erased_class_name().to_string();
                let getter = getter_name(name);
                let sig = self
                    .reflection
                    .resolve_method(&context_fqcn, &getter, 0)
                    .ok_or_else(|| EmitError::MethodResolution { owner: context_fqcn.clone(), name: getter.clone(), arity: 0 })?;
                self.code.load(Opcode::Aload, 1);
                let internal_owner = internal_name(&context_fqcn);
                let descriptor = method_descriptor(&[], sig.ret.as_ref());
                let mref = self.constants.methodref(&internal_owner, &getter, &descriptor);
                self.code.invoke(Opcode::Invokevirtual, mref, &descriptor, true);
                Ok(sig.ret.unwrap_or_else(|| TypeDescriptor::reference("java.lang.Object")))
            }
        }
    }

    /// `Map`/`List` element access always yields `Object` on the stack;
    /// narrow it to the declaration's real type (checkcast, then unbox if
    /// the declaration is primitive).
    fn coerce_context_value(&mut self, declared: &TypeDescriptor) -> Result<TypeDescriptor, EmitError> {
        match declared.as_primitive() {
            Some(p) => {
                self.unbox_reference(p);
                Ok(TypeDescriptor::Primitive(p))
            }
            None => {
                let internal = internal_name(declared.erased_class_name());
                let idx = self.constants.class(&internal);
                self.code.type_check(Opcode::Checkcast, idx, 0, 0);
                Ok(declared.clone())
            }
        }
    }

    fn emit_unary(&mut self, op: UnOp, inner: &Eir) -> Result<TypeDescriptor, EmitError> {
        match op {
            UnOp::Not => {
                self.emit_expr(inner)?;
                self.code.op(Opcode::Iconst1, 0, 1);
                self.code.op(Opcode::Ixor, 2, 1);
                Ok(TypeDescriptor::Primitive(PrimitiveTag::Boolean))
            }
            UnOp::Neg => {
                let ty = self.emit_expr(inner)?;
                let p = ty.as_primitive().ok_or_else(|| EmitError::Unsupported("unary minus on a non-numeric type".into()))?;
                let op = match p {
                    PrimitiveTag::Long => Opcode::Lneg,
                    PrimitiveTag::Float => Opcode::Fneg,
                    PrimitiveTag::Double => Opcode::Dneg,
                    _ => Opcode::Ineg,
                };
                self.code.op(op, word_size(p), word_size(p));
                Ok(TypeDescriptor::Primitive(p))
            }
            UnOp::BitNot => {
                let ty = self.emit_expr(inner)?;
                let p = ty.as_primitive().ok_or_else(|| EmitError::Unsupported("bitwise-not on a non-integral type".into()))?;
                if p == PrimitiveTag::Long {
                    let idx = self.constants.long(-1);
                    self.code.ldc2_w(idx);
                    self.code.op(Opcode::Lxor, 4, 2);
                } else {
                    self.code.op(Opcode::IconstM1, 0, 1);
                    self.code.op(Opcode::Ixor, 2, 1);
                }
                Ok(TypeDescriptor::Primitive(p))
            }
        }
    }

    fn emit_binary(&mut self, op: BinOp, left: &Eir, right: &Eir) -> Result<TypeDescriptor, EmitError> {
        if op.is_short_circuit() {
            return self.emit_short_circuit(op, left, right);
        }
        if op.is_comparison() {
            return self.emit_comparison(op, left, right);
        }

        let lt = self.infer(left).ok_or_else(|| EmitError::Unsupported("unresolvable left operand type".into()))?;
        let rt = self.infer(right).ok_or_else(|| EmitError::Unsupported("unresolvable right operand type".into()))?;

        if op == BinOp::Add {
            let either_string = matches!(&lt, TypeDescriptor::Reference(n) if n == "java.lang.String")
                || matches!(&rt, TypeDescriptor::Reference(n) if n == "java.lang.String");
            if either_string {
                return self.emit_string_concat(left, right);
            }
        }

        let lp = lt
            .as_primitive()
            .ok_or_else(|| EmitError::Unsupported("arithmetic/bitwise operator on a reference type".into()))?;
        let rp = rt
            .as_primitive()
            .ok_or_else(|| EmitError::Unsupported("arithmetic/bitwise operator on a reference type".into()))?;
        let widened = exprc_types::widen(lp, rp);

        self.emit_expr(left)?;
        self.convert_primitive(lp, widened);
        self.emit_expr(right)?;
        self.convert_primitive(rp, widened);

        let opcode = arithmetic_opcode(op, widened)?;
        self.code.op(opcode, word_size(widened) * 2, word_size(widened));
        Ok(TypeDescriptor::Primitive(widened))
    }

    /// `StringBuilder`-chain concatenation: the emitter's only string-typed
    /// binary operator.
    fn emit_string_concat(&mut self, left: &Eir, right: &Eir) -> Result<TypeDescriptor, EmitError> {
        let sb_internal = "java/lang/StringBuilder";
        let class_idx = self.constants.class(sb_internal);
        self.code.new_object(class_idx);
        self.code.op(Opcode::Dup, 0, 1);
        let ctor_idx = self.constants.methodref(sb_internal, "<init>", "()V");
        self.code.invoke(Opcode::Invokespecial, ctor_idx, "()V", true);

        for operand in [left, right] {
            let ty = self.emit_expr(operand)?;
            self.coerce(&ty, &TypeDescriptor::reference("java.lang.Object"))?;
            let desc = "(Ljava/lang/Object;)Ljava/lang/StringBuilder;";
            let mref = self.constants.methodref(sb_internal, "append", desc);
            self.code.invoke(Opcode::Invokevirtual, mref, desc, true);
        }

        let desc = "()Ljava/lang/String;";
        let mref = self.constants.methodref(sb_internal, "toString", desc);
        self.code.invoke(Opcode::Invokevirtual, mref, desc, true);
        Ok(TypeDescriptor::reference("java.lang.String"))
    }

    fn emit_short_circuit(&mut self, op: BinOp, left: &Eir, right: &Eir) -> Result<TypeDescriptor, EmitError> {
        let short_circuit = self.code.new_label();
        let merge = self.code.new_label();
        self.emit_expr(left)?;
        match op {
            BinOp::And => self.code.branch(Opcode::Ifeq, short_circuit, 1),
            BinOp::Or => self.code.branch(Opcode::Ifne, short_circuit, 1),
            _ => unreachable!("only && and || reach emit_short_circuit"),
        }
        self.emit_expr(right)?;
        self.code.branch(Opcode::Goto, merge, 0);
        self.code.bind_label(short_circuit);
        match op {
            BinOp::And => self.code.op(Opcode::Iconst0, 0, 1),
            BinOp::Or => self.code.op(Opcode::Iconst1, 0, 1),
            _ => unreachable!(),
        }
        self.code.bind_label(merge);
        Ok(TypeDescriptor::Primitive(PrimitiveTag::Boolean))
    }

    fn emit_comparison(&mut self, op: BinOp, left: &Eir, right: &Eir) -> Result<TypeDescriptor, EmitError> {
        let lt = self.infer(left).ok_or_else(|| EmitError::Unsupported("unresolvable left operand type".into()))?;
        let rt = self.infer(right).ok_or_else(|| EmitError::Unsupported("unresolvable right operand type".into()))?;
        let true_label = self.code.new_label();
        let end_label = self.code.new_label();

        match (lt.as_primitive(), rt.as_primitive()) {
            (Some(lp), Some(rp)) => {
                let widened = exprc_types::widen(lp, rp);
                self.emit_expr(left)?;
                self.convert_primitive(lp, widened);
                self.emit_expr(right)?;
                self.convert_primitive(rp, widened);
                match widened {
                    PrimitiveTag::Long => {
                        self.code.op(Opcode::Lcmp, 4, 1);
                        self.code.branch(post_cmp_branch_opcode(op), true_label, 1);
                    }
                    PrimitiveTag::Float => {
                        self.code.op(float_cmp_opcode(op), 2, 1);
                        self.code.branch(post_cmp_branch_opcode(op), true_label, 1);
                    }
                    PrimitiveTag::Double => {
                        self.code.op(double_cmp_opcode(op), 4, 1);
                        self.code.branch(post_cmp_branch_opcode(op), true_label, 1);
                    }
                    _ => {
                        self.code.branch(if_icmp_opcode(op), true_label, 2);
                    }
                }
            }
            _ => {
                self.emit_expr(left)?;
                self.emit_expr(right)?;
                let branch_op = if op == BinOp::Ne { Opcode::IfAcmpne } else { Opcode::IfAcmpeq };
                self.code.branch(branch_op, true_label, 2);
            }
        }

        self.code.op(Opcode::Iconst0, 0, 1);
        self.code.branch(Opcode::Goto, end_label, 0);
        self.code.bind_label(true_label);
        self.code.op(Opcode::Iconst1, 0, 1);
        self.code.bind_label(end_label);
        Ok(TypeDescriptor::Primitive(PrimitiveTag::Boolean))
    }

    fn emit_assign(&mut self, target: &Eir, op: AssignOp, value: &Eir) -> Result<TypeDescriptor, EmitError> {
        let EirKind::NameRef(sym) = &target.kind else {
            return Err(EmitError::Unsupported("assignment target is not a bare variable".into()));
        };
        let name = self.interner.resolve(*sym).to_string();
        let (slot, target_ty) = match self.slots.get(&name) {
            Some((s, t)) => (s, t.clone()),
            // First write to a name that only resolves against the
            // runtime context so far (a MAP/LIST/POJO declaration, not a
            // `var`-declared local): give it a local
            // slot now. A compound assignment reads the current value
            // before combining it, so seed that slot from the context
            // lookup before anything else touches it.
            None => {
                let decl = self
                    .declarations
                    .find(&name)
                    .ok_or_else(|| EmitError::UnresolvedName(name.clone()))?
                    .clone();
                let slot = self.slots.declare(&decl.name, decl.ty.clone());
                if op.as_binop().is_some() {
                    self.emit_context_lookup(&decl.name, &decl.ty)?;
                    self.store_slot(slot, &decl.ty);
                }
                (slot, decl.ty)
            }
        };

        let value_ty = if let Some(binop) = op.as_binop() {
            let target_prim = target_ty
                .as_primitive()
                .ok_or_else(|| EmitError::Unsupported("compound assignment on a reference type".into()))?;
            let value_ty = self.infer(value).ok_or_else(|| EmitError::Unsupported("unresolvable assignment operand".into()))?;
            let value_prim = value_ty
                .as_primitive()
                .ok_or_else(|| EmitError::Unsupported("compound assignment with a reference operand".into()))?;
            let widened = exprc_types::widen(target_prim, value_prim);
            self.load_slot(slot, &target_ty);
            self.convert_primitive(target_prim, widened);
            self.emit_expr(value)?;
            self.convert_primitive(value_prim, widened);
            let opcode = arithmetic_opcode(binop, widened)?;
            self.code.op(opcode, word_size(widened) * 2, word_size(widened));
            TypeDescriptor::Primitive(widened)
        } else {
            self.emit_expr(value)?
        };

        self.coerce(&value_ty, &target_ty)?;
        self.dup_value(&target_ty);
        self.store_slot(slot, &target_ty);
        Ok(target_ty)
    }

    fn emit_cast(&mut self, target_type: &TypeDescriptor, inner: &Eir) -> Result<TypeDescriptor, EmitError> {
        let inner_ty = self.emit_expr(inner)?;
        match target_type.as_primitive() {
            Some(p) => match inner_ty.as_primitive() {
                Some(from) => self.convert_primitive(from, p),
                None => self.unbox_reference(p),
            },
            None => {
                let internal = internal_name(target_type.erased_class_name());
                let idx = self.constants.class(&internal);
                self.code.type_check(Opcode::Checkcast, idx, 0, 0);
            }
        }
        Ok(target_type.clone())
    }

    fn emit_method_call(&mut self, scope: &Option<Box<Eir>>, name: Symbol, args: &[Eir]) -> Result<TypeDescriptor, EmitError> {
        let name_text = self.interner.resolve(name).to_string();
        let scope = scope
            .as_ref()
            .ok_or_else(|| EmitError::Unsupported(format!("scope-less call to `{name_text}` reached the emitter")))?;
        let scope_ty = self
            .infer(scope)
            .ok_or_else(|| EmitError::Unsupported(format!("unresolvable call scope for `{name_text}`")))?;
        let owner_fqcn = scope_ty.erased_class_name().to_string();

        // Map-like pattern (resolution rule 1).
        if name_text == "get" && args.len() == 1 && owner_fqcn == "java.util.Map" {
            self.emit_expr(scope)?;
            let arg_ty = self.emit_expr(&args[0])?;
            self.coerce(&arg_ty, &TypeDescriptor::reference("java.lang.Object"))?;
            let desc = "(Ljava/lang/Object;)Ljava/lang/Object;";
            let mref = self.constants.interface_methodref("java/util/Map", "get", desc);
            self.code.invoke_interface(mref, desc, 2);
            return Ok(TypeDescriptor::reference("java.lang.Object"));
        }

        let sig = self
            .reflection
            .resolve_method(&owner_fqcn, &name_text, args.len())
            .ok_or_else(|| EmitError::MethodResolution { owner: owner_fqcn.clone(), name: name_text.clone(), arity: args.len() })?;

        if !sig.is_static {
            self.emit_expr(scope)?;
        }
        for (arg, param_ty) in args.iter().zip(sig.params.iter()) {
            let arg_ty = self.emit_expr(arg)?;
            self.coerce(&arg_ty, param_ty)?;
        }

        let internal_owner = internal_name(&owner_fqcn);
        let descriptor = method_descriptor(&sig.params, sig.ret.as_ref());
        if sig.is_interface {
            let mref = self.constants.interface_methodref(&internal_owner, &name_text, &descriptor);
            self.code.invoke_interface(mref, &descriptor, (sig.params.len() + 1) as u8);
        } else {
            let op = if sig.is_static { Opcode::Invokestatic } else { Opcode::Invokevirtual };
            let mref = self.constants.methodref(&internal_owner, &name_text, &descriptor);
            self.code.invoke(op, mref, &descriptor, !sig.is_static);
        }
        Ok(sig.ret.unwrap_or_else(|| TypeDescriptor::reference("java.lang.Object")))
    }

    fn emit_object_new(&mut self, ty: &str, args: &[Eir]) -> Result<TypeDescriptor, EmitError> {
        let fqcn = wellknown::resolve_class_name(ty)
            .ok_or_else(|| EmitError::ConstructorResolution { owner: ty.to_string(), arity: args.len() })?;
        let internal = internal_name(&fqcn);
        let class_idx = self.constants.class(&internal);
        self.code.new_object(class_idx);
        self.code.op(Opcode::Dup, 0, 1);

        let mut param_types = Vec::with_capacity(args.len());
        for arg in args {
            param_types.push(self.emit_expr(arg)?);
        }
        let descriptor = method_descriptor(&param_types, None);
        let ctor_idx = self.constants.methodref(&internal, "<init>", &descriptor);
        self.code.invoke(Opcode::Invokespecial, ctor_idx, &descriptor, true);
        Ok(TypeDescriptor::reference(fqcn))
    }

    /// Narrow/widen between two primitive kinds (JVM spec §6.5 `i2l`-style
    /// conversions), including the two-step narrowing chain javac itself
    /// emits for e.g. `double` -> `byte` (`d2i` then `i2b`).
    fn convert_primitive(&mut self, from: PrimitiveTag, to: PrimitiveTag) {
        use PrimitiveTag::*;
        if from == to || from.rank() == to.rank() {
            return;
        }
        if to == Double && from != Double {
            let op = match from {
                Float => Opcode::F2d,
                Long => Opcode::L2d,
                _ => Opcode::I2d,
            };
            self.code.op(op, word_size(from), 2);
            return;
        }
        if to == Float && !matches!(from, Float | Double) {
            let op = if from == Long { Opcode::L2f } else { Opcode::I2f };
            self.code.op(op, word_size(from), 1);
            return;
        }
        if to == Long && matches!(from, Int | Short | Byte | Char) {
            self.code.op(Opcode::I2l, 1, 2);
            return;
        }
        match (from, to) {
            (Double, Float) => self.code.op(Opcode::D2f, 2, 1),
            (Double, Long) => self.code.op(Opcode::D2l, 2, 2),
            (Double, _) => self.code.op(Opcode::D2i, 2, 1),
            (Float, Long) => self.code.op(Opcode::F2l, 1, 2),
            (Float, _) => self.code.op(Opcode::F2i, 1, 1),
            (Long, _) => self.code.op(Opcode::L2i, 2, 1),
            _ => {}
        }
        match to {
            Byte => self.code.op(Opcode::I2b, 1, 1),
            Char => self.code.op(Opcode::I2c, 1, 1),
            Short => self.code.op(Opcode::I2s, 1, 1),
            _ => {}
        }
    }

    /// Box a primitive value on top of the stack via its own wrapper's
    /// `valueOf`. The declared target drives which wrapper to box to, not
    /// the primitive's own natural boxed form — a boolean-returning
    /// comparison still boxes as `Boolean.valueOf`.
    fn box_primitive(&mut self, from: PrimitiveTag) {
        let boxed_internal = internal_name(from.boxed_class());
        let desc = format!("({})L{boxed_internal};", descriptor_for(&TypeDescriptor::Primitive(from)));
        let idx = self.constants.methodref(&boxed_internal, "valueOf", &desc);
        self.code.invoke(Opcode::Invokestatic, idx, &desc, false);
    }

    fn unbox_reference(&mut self, to: PrimitiveTag) {
        let boxed_internal = internal_name(to.boxed_class());
        let class_idx = self.constants.class(&boxed_internal);
        self.code.type_check(Opcode::Checkcast, class_idx, 0, 0);
        let desc = format!("(){}", descriptor_for(&TypeDescriptor::Primitive(to)));
        let idx = self.constants.methodref(&boxed_internal, to.unbox_method(), &desc);
        self.code.invoke(Opcode::Invokevirtual, idx, &desc, true);
    }

    fn coerce(&mut self, from: &TypeDescriptor, to: &TypeDescriptor) -> Result<(), EmitError> {
        match (from.as_primitive(), to.as_primitive()) {
            (Some(f), Some(t)) => {
                self.convert_primitive(f, t);
                Ok(())
            }
            (Some(f), None) => {
                self.box_primitive(f);
                Ok(())
            }
            (None, Some(t)) => {
                self.unbox_reference(t);
                Ok(())
            }
            (None, None) => Ok(()),
        }
    }
}

/// Emit a complete evaluator class for `body` ("Class shape").
///
/// `body` is the lowered EIR root — either a single expression (content
/// kind EXPRESSION) or a `Block` ending in an explicit `Return` (content
/// kind BLOCK). `class_internal_name` is the slash-separated name the
/// generated class will be defined under (the registry assigns this).
pub fn emit_class(
    body: &Eir,
    declarations: &DeclarationTable,
    context_kind: ContextKind,
    out_type: &TypeDescriptor,
    reflection: &ReflectionCache,
    interner: &Interner,
    class_internal_name: &str,
) -> Result<ClassFile, EmitError> {
    let mut constants = ConstantPool::new();
    let context_ty = declarations.context.ty.clone();
    let slots = SlotTable::new(&declarations.context.name, context_ty.clone());
    let code = CodeBuilder::new(slots.max_locals());

    let (code_bytes, max_stack, max_locals) = {
        let mut emitter = Emitter {
            constants: &mut constants,
            code,
            slots,
            declarations,
            context_kind,
            reflection,
            interner,
        };
        emitter.emit_stmt(body, out_type)?;
        emitter.code.finish()
    };
    exprc_classfile::verify_code("eval", &code_bytes)?;

    let context_internal = internal_name(context_ty.erased_class_name());
    let context_descriptor = format!("L{context_internal};");
    let out_descriptor = descriptor_for(out_type);
    let eval_descriptor = format!("({context_descriptor}){out_descriptor}");

    let eval_method = MethodDef {
        access_flags: MEMBER_ACCESS,
        name: "eval".to_string(),
        descriptor: eval_descriptor.clone(),
        code: code_bytes,
        max_stack,
        max_locals,
    };

    let mut ctor_code = CodeBuilder::new(1);
    ctor_code.load(Opcode::Aload, 0);
    let object_init = constants.methodref("java/lang/Object", "<init>", "()V");
    ctor_code.invoke(Opcode::Invokespecial, object_init, "()V", true);
    ctor_code.return_op(Opcode::Return, 0);
    let (ctor_bytes, ctor_max_stack, ctor_max_locals) = ctor_code.finish();
    let ctor = MethodDef {
        access_flags: MEMBER_ACCESS,
        name: "<init>".to_string(),
        descriptor: "()V".to_string(),
        code: ctor_bytes,
        max_stack: ctor_max_stack,
        max_locals: ctor_max_locals,
    };

    let mut methods = vec![ctor, eval_method];

    // Bridge method ("Bridge method"), skipped only when the
    // concrete context is already `java.lang.Object`.
    if context_internal != "java/lang/Object" {
        let mut bridge_code = CodeBuilder::new(2);
        bridge_code.load(Opcode::Aload, 0);
        bridge_code.load(Opcode::Aload, 1);
        let class_idx = constants.class(&context_internal);
        bridge_code.type_check(Opcode::Checkcast, class_idx, 0, 0);
        let concrete_idx = constants.methodref(class_internal_name, "eval", &eval_descriptor);
        bridge_code.invoke(Opcode::Invokevirtual, concrete_idx, &eval_descriptor, true);
        if let Some(p) = out_type.as_primitive() {
            let boxed_internal = internal_name(p.boxed_class());
            let box_desc = format!("({})L{boxed_internal};", descriptor_for(out_type));
            let box_idx = constants.methodref(&boxed_internal, "valueOf", &box_desc);
            bridge_code.invoke(Opcode::Invokestatic, box_idx, &box_desc, false);
        }
        bridge_code.return_op(Opcode::Areturn, 1);
        let (bridge_bytes, bridge_max_stack, bridge_max_locals) = bridge_code.finish();
        methods.push(MethodDef {
            access_flags: MEMBER_ACCESS,
            name: "eval".to_string(),
            descriptor: "(Ljava/lang/Object;)Ljava/lang/Object;".to_string(),
            code: bridge_bytes,
            max_stack: bridge_max_stack,
            max_locals: bridge_max_locals,
        });
    }

    Ok(ClassFile {
        constants,
        access_flags: CLASS_ACCESS,
        this_class: class_internal_name.to_string(),
        super_class: "java/lang/Object".to_string(),
        interfaces: vec![EVALUATOR_INTERFACE.to_string()],
        fields: Vec::<FieldDef>::new(),
        methods,
    })
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
    fn emits_a_well_formed_class_for_a_literal_sum() {
        let reflection = ReflectionCache::well_known();
        let interner = Interner::new();
        let left = Eir::new(Span::synthetic(), EirKind::IntLit(1));
        let right = Eir::new(Span::synthetic(), EirKind::IntLit(2));
        let body = Eir::new(
            Span::synthetic(),
            EirKind::Binary { op: BinOp::Add, left: Box::new(left), right: Box::new(right) },
        );
        let class = emit_class(
            &body,
            &declarations(),
            ContextKind::Map,
            &TypeDescriptor::Primitive(PrimitiveTag::Int),
            &reflection,
            &interner,
            "generated/Eval0",
        )
        .unwrap();
        let bytes = class.write();
        assert_eq!(&bytes[0..4], &0xCAFEBABEu32.to_be_bytes());
    }

    #[test]
    fn emits_a_variable_lookup_against_a_map_context() {
        let reflection = ReflectionCache::well_known();
        let mut interner = Interner::new();
        let a = interner.intern("a");
        let body = Eir::new(Span::synthetic(), EirKind::Return(Some(Box::new(Eir::new(Span::synthetic(), EirKind::NameRef(a))))));
        let class = emit_class(
            &body,
            &declarations(),
            ContextKind::Map,
            &TypeDescriptor::Primitive(PrimitiveTag::Int),
            &reflection,
            &interner,
            "generated/Eval1",
        )
        .unwrap();
        let bytes = class.write();
        assert!(!bytes.is_empty());
    }

    #[test]
    fn rejects_a_compound_assign_on_an_unknown_local() {
        let reflection = ReflectionCache::well_known();
        let mut interner = Interner::new();
        let missing = interner.intern("missing");
        let target = Eir::new(Span::synthetic(), EirKind::NameRef(missing));
        let value = Eir::new(Span::synthetic(), EirKind::IntLit(1));
        let assign = Eir::new(
            Span::synthetic(),
            EirKind::Assign { target: Box::new(target), op: AssignOp::AddAssign, value: Box::new(value) },
        );
        let body = Eir::new(Span::synthetic(), EirKind::ExprStmt(Box::new(assign)));
        let result = emit_class(
            &body,
            &declarations(),
            ContextKind::Map,
            &TypeDescriptor::Primitive(PrimitiveTag::Int),
            &reflection,
            &interner,
            "generated/Eval2",
        );
        assert!(result.is_err());
    }

    #[test]
    fn assigning_to_a_context_resolved_variable_allocates_a_slot_on_first_write() {
        // `a = a + 1; return a;` against a declaration (not a `var` local)
        // must not reach `emit_assign`'s "unresolved name" branch: the
        // first write gives it a slot, seeded from the context lookup.
        let reflection = ReflectionCache::well_known();
        let mut interner = Interner::new();
        let a = interner.intern("a");
        let target = Eir::new(Span::synthetic(), EirKind::NameRef(a));
        let one = Eir::new(Span::synthetic(), EirKind::IntLit(1));
        let sum = Eir::new(
            Span::synthetic(),
            EirKind::Binary { op: BinOp::Add, left: Box::new(Eir::new(Span::synthetic(), EirKind::NameRef(a))), right: Box::new(one) },
        );
        let assign = Eir::new(Span::synthetic(), EirKind::Assign { target: Box::new(target), op: AssignOp::Assign, value: Box::new(sum) });
        let ret = Eir::new(Span::synthetic(), EirKind::Return(Some(Box::new(Eir::new(Span::synthetic(), EirKind::NameRef(a))))));
        let body = Eir::new(Span::synthetic(), EirKind::Block(vec![Eir::new(Span::synthetic(), EirKind::ExprStmt(Box::new(assign))), ret]));
        let class = emit_class(
            &body,
            &declarations(),
            ContextKind::Map,
            &TypeDescriptor::Primitive(PrimitiveTag::Int),
            &reflection,
            &interner,
            "generated/Eval3",
        )
        .unwrap();
        assert!(!class.write().is_empty());
    }

    #[test]
    fn compound_assign_on_a_context_resolved_variable_seeds_the_slot_before_combining() {
        // `a += 1;` must read the context's current value of `a` once
        // (not twice, and not garbage from an unstored slot) before the
        // add.
        let reflection = ReflectionCache::well_known();
        let mut interner = Interner::new();
        let a = interner.intern("a");
        let target = Eir::new(Span::synthetic(), EirKind::NameRef(a));
        let one = Eir::new(Span::synthetic(), EirKind::IntLit(1));
        let assign = Eir::new(Span::synthetic(), EirKind::Assign { target: Box::new(target), op: AssignOp::AddAssign, value: Box::new(one) });
        let ret = Eir::new(Span::synthetic(), EirKind::Return(Some(Box::new(Eir::new(Span::synthetic(), EirKind::NameRef(a))))));
        let body = Eir::new(Span::synthetic(), EirKind::Block(vec![Eir::new(Span::synthetic(), EirKind::ExprStmt(Box::new(assign))), ret]));
        let class = emit_class(
            &body,
            &declarations(),
            ContextKind::Map,
            &TypeDescriptor::Primitive(PrimitiveTag::Int),
            &reflection,
            &interner,
            "generated/Eval4",
        )
        .unwrap();
        assert!(!class.write().is_empty());
    }
}
