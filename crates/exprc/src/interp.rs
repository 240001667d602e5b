//! The bytecode interpreter: this workspace's stand-in for a real
//! classloader and JVM (see DESIGN.md's "host language boundary"
//! decision). `exprc-classfile` writes and decodes real class-file bytes;
//! nothing in this workspace actually loads them into a running JVM, so
//! `GeneratedEvaluator` runs the decoded `eval` method's instruction
//! stream directly against [`RtValue`]/[`EvalContext`] instead.
//!
//! This is a stack machine over [`exprc_classfile::Instruction`]s exactly
//! as the direct emitter produces them (`exprc-emit/src/emit.rs`), plus an
//! intrinsic table standing in for the handful of JDK methods
//! [`crate::config`]'s reflection surface (`WellKnownReflectionProvider`)
//! advertises as resolvable. Anything the emitter never actually
//! generates (field access, most of the JDK) has no intrinsic here and
//! surfaces as [`EvaluationError::UnsupportedIntrinsic`] rather than
//! silently doing the wrong thing.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use exprc_classfile::{instructions, DecodedClass, DecodedMethod, Instruction, Opcode, Operand, ResolvedConstant};

use crate::context::{EvalContext, PojoContext, RtObject, RtValue};
use crate::error::EvaluationError;

/// Wraps a decoded class and runs its `eval` method against a supplied
/// context. Stateless between calls — all per-evaluation state (locals,
/// operand stack) lives on the stack of [`Interpreter::run_eval`] itself.
pub struct Interpreter<'a> {
    decoded: &'a DecodedClass,
}

impl<'a> Interpreter<'a> {
    /// Wrap `decoded`. Does not itself look up the `eval` method — that
    /// happens lazily on each [`Interpreter::run_eval`] call, since a
    /// class may carry both the concrete `eval` and its `Object`-erased
    /// bridge (`exprc-emit`'s "Bridge method").
    pub fn new(decoded: &'a DecodedClass) -> Self {
        Self { decoded }
    }

    /// Run the concrete `eval` method (never the `eval(Object)` bridge,
    /// which exists only for a real JVM's virtual dispatch and is never
    /// useful to an interpreter that already knows the concrete type)
    /// against `ctx`.
    pub fn run_eval(&self, ctx: EvalContext) -> Result<RtValue, EvaluationError> {
        let method = self.concrete_eval_method()?;
        let ret_tag = return_type_tag(&method.descriptor);

        let mut locals: Vec<RtValue> = vec![RtValue::Null, ctx.into_rt_value()];
        let mut stack: Vec<RtValue> = Vec::new();

        let instrs: Vec<Instruction> = instructions(&method.code, self.decoded)
            .collect::<Result<Vec<_>, _>>()
            .map_err(EvaluationError::from)?;
        let mut offset_index: HashMap<usize, usize> = HashMap::with_capacity(instrs.len());
        for (i, instr) in instrs.iter().enumerate() {
            offset_index.insert(instr.offset, i);
        }

        let mut pc = 0usize;
        loop {
            let instr = instrs.get(pc).ok_or(EvaluationError::BadJumpTarget(0))?;
            match self.step(instr, &mut locals, &mut stack)? {
                Step::Next => pc += 1,
                Step::Jump(target) => {
                    pc = *offset_index.get(&target).ok_or(EvaluationError::BadJumpTarget(target))?;
                }
                Step::Return(value) => return Ok(box_return(value, ret_tag)),
            }
        }
    }

    fn concrete_eval_method(&self) -> Result<&DecodedMethod, EvaluationError> {
        const BRIDGE_DESCRIPTOR: &str = "(Ljava/lang/Object;)Ljava/lang/Object;";
        let mut candidates = self.decoded.methods_named("eval");
        let first = candidates.next().ok_or_else(|| EvaluationError::MissingEvalMethod("<generated>".to_string()))?;
        match candidates.next() {
            // Exactly one `eval` — a context type already `Object`-shaped
            // skips the bridge entirely (`emit_class`'s "skipped only
            // when the concrete context is already `java.lang.Object`").
            None => Ok(first),
            Some(second) => {
                if first.descriptor == BRIDGE_DESCRIPTOR {
                    Ok(second)
                } else {
                    Ok(first)
                }
            }
        }
    }

    fn step(
        &self,
        instr: &Instruction,
        locals: &mut Vec<RtValue>,
        stack: &mut Vec<RtValue>,
    ) -> Result<Step, EvaluationError> {
        use Opcode::*;

        match instr.opcode {
            AconstNull => stack.push(RtValue::Null),
            IconstM1 => stack.push(RtValue::Int(-1)),
            Iconst0 => stack.push(RtValue::Int(0)),
            Iconst1 => stack.push(RtValue::Int(1)),
            Iconst2 => stack.push(RtValue::Int(2)),
            Iconst3 => stack.push(RtValue::Int(3)),
            Iconst4 => stack.push(RtValue::Int(4)),
            Iconst5 => stack.push(RtValue::Int(5)),
            Lconst0 => stack.push(RtValue::Long(0)),
            Lconst1 => stack.push(RtValue::Long(1)),
            Fconst0 => stack.push(RtValue::Float(0.0)),
            Fconst1 => stack.push(RtValue::Float(1.0)),
            Fconst2 => stack.push(RtValue::Float(2.0)),
            Dconst0 => stack.push(RtValue::Double(0.0)),
            Dconst1 => stack.push(RtValue::Double(1.0)),
            Bipush => {
                let Operand::Byte(b) = instr.operand else { return Err(malformed()) };
                stack.push(RtValue::Int(b as i32));
            }
            Sipush => {
                let Operand::Short(s) = instr.operand else { return Err(malformed()) };
                stack.push(RtValue::Int(s as i32));
            }
            Ldc | LdcW | Ldc2W => {
                let Operand::Const(ref c) = instr.operand else { return Err(malformed()) };
                stack.push(const_to_rt(c)?);
            }
            Iload | Lload | Fload | Dload | Aload => {
                let Operand::Slot(slot) = instr.operand else { return Err(malformed()) };
                stack.push(local_get(locals, slot));
            }
            Istore | Lstore | Fstore | Dstore | Astore => {
                let Operand::Slot(slot) = instr.operand else { return Err(malformed()) };
                let v = pop(stack)?;
                local_set(locals, slot, v);
            }
            Pop | Pop2 => {
                pop(stack)?;
            }
            Dup | Dup2 => {
                let top = stack.last().ok_or(EvaluationError::StackUnderflow)?.clone();
                stack.push(top);
            }
            Iadd => int_binop(stack, i32::wrapping_add)?,
            Ladd => long_binop(stack, i64::wrapping_add)?,
            Fadd => float_binop(stack, |a, b| a + b)?,
            Dadd => double_binop(stack, |a, b| a + b)?,
            Isub => int_binop(stack, i32::wrapping_sub)?,
            Lsub => long_binop(stack, i64::wrapping_sub)?,
            Fsub => float_binop(stack, |a, b| a - b)?,
            Dsub => double_binop(stack, |a, b| a - b)?,
            Imul => int_binop(stack, i32::wrapping_mul)?,
            Lmul => long_binop(stack, i64::wrapping_mul)?,
            Fmul => float_binop(stack, |a, b| a * b)?,
            Dmul => double_binop(stack, |a, b| a * b)?,
            Idiv => {
                let b = pop_int(stack)?;
                let a = pop_int(stack)?;
                if b == 0 {
                    return Err(EvaluationError::DivisionByZero);
                }
                stack.push(RtValue::Int(a.wrapping_div(b)));
            }
            Ldiv => {
                let b = pop_long(stack)?;
                let a = pop_long(stack)?;
                if b == 0 {
                    return Err(EvaluationError::DivisionByZero);
                }
                stack.push(RtValue::Long(a.wrapping_div(b)));
            }
            Fdiv => float_binop(stack, |a, b| a / b)?,
            Ddiv => double_binop(stack, |a, b| a / b)?,
            Irem => {
                let b = pop_int(stack)?;
                let a = pop_int(stack)?;
                if b == 0 {
                    return Err(EvaluationError::DivisionByZero);
                }
                stack.push(RtValue::Int(a.wrapping_rem(b)));
            }
            Lrem => {
                let b = pop_long(stack)?;
                let a = pop_long(stack)?;
                if b == 0 {
                    return Err(EvaluationError::DivisionByZero);
                }
                stack.push(RtValue::Long(a.wrapping_rem(b)));
            }
            Frem => float_binop(stack, |a, b| a % b)?,
            Drem => double_binop(stack, |a, b| a % b)?,
            Ineg => {
                let a = pop_int(stack)?;
                stack.push(RtValue::Int(a.wrapping_neg()));
            }
            Lneg => {
                let a = pop_long(stack)?;
                stack.push(RtValue::Long(a.wrapping_neg()));
            }
            Fneg => {
                let a = pop_float(stack)?;
                stack.push(RtValue::Float(-a));
            }
            Dneg => {
                let a = pop_double(stack)?;
                stack.push(RtValue::Double(-a));
            }
            Ishl => int_binop(stack, |a, b| a.wrapping_shl(b as u32 & 0x1f))?,
            Lshl => long_shift(stack, |a, b| a.wrapping_shl(b as u32 & 0x3f))?,
            Ishr => int_binop(stack, |a, b| a.wrapping_shr(b as u32 & 0x1f))?,
            Lshr => long_shift(stack, |a, b| a.wrapping_shr(b as u32 & 0x3f))?,
            Iushr => int_binop(stack, |a, b| ((a as u32).wrapping_shr(b as u32 & 0x1f)) as i32)?,
            Lushr => long_shift(stack, |a, b| ((a as u64).wrapping_shr(b as u32 & 0x3f)) as i64)?,
            Iand => int_binop(stack, |a, b| a & b)?,
            Land => long_binop(stack, |a, b| a & b)?,
            Ior => int_binop(stack, |a, b| a | b)?,
            Lor => long_binop(stack, |a, b| a | b)?,
            Ixor => int_binop(stack, |a, b| a ^ b)?,
            Lxor => long_binop(stack, |a, b| a ^ b)?,
            Iinc => {
                let Operand::Iinc(slot, delta) = instr.operand else { return Err(malformed()) };
                let current = match local_get(locals, slot) {
                    RtValue::Int(v) => v,
                    _ => return Err(malformed()),
                };
                local_set(locals, slot, RtValue::Int(current.wrapping_add(delta as i32)));
            }
            I2l => {
                let v = pop_int(stack)?;
                stack.push(RtValue::Long(v as i64));
            }
            I2f => {
                let v = pop_int(stack)?;
                stack.push(RtValue::Float(v as f32));
            }
            I2d => {
                let v = pop_int(stack)?;
                stack.push(RtValue::Double(v as f64));
            }
            L2i => {
                let v = pop_long(stack)?;
                stack.push(RtValue::Int(v as i32));
            }
            L2f => {
                let v = pop_long(stack)?;
                stack.push(RtValue::Float(v as f32));
            }
            L2d => {
                let v = pop_long(stack)?;
                stack.push(RtValue::Double(v as f64));
            }
            F2i => {
                let v = pop_float(stack)?;
                stack.push(RtValue::Int(v as i32));
            }
            F2l => {
                let v = pop_float(stack)?;
                stack.push(RtValue::Long(v as i64));
            }
            F2d => {
                let v = pop_float(stack)?;
                stack.push(RtValue::Double(v as f64));
            }
            D2i => {
                let v = pop_double(stack)?;
                stack.push(RtValue::Int(v as i32));
            }
            D2l => {
                let v = pop_double(stack)?;
                stack.push(RtValue::Long(v as i64));
            }
            D2f => {
                let v = pop_double(stack)?;
                stack.push(RtValue::Float(v as f32));
            }
            I2b => {
                let v = pop_int(stack)?;
                stack.push(RtValue::Int(v as i8 as i32));
            }
            I2c => {
                let v = pop_int(stack)?;
                stack.push(RtValue::Char(v as u16));
            }
            I2s => {
                let v = pop_int(stack)?;
                stack.push(RtValue::Int(v as i16 as i32));
            }
            Lcmp => {
                let b = pop_long(stack)?;
                let a = pop_long(stack)?;
                stack.push(RtValue::Int(a.cmp(&b) as i32));
            }
            Fcmpl => {
                let b = pop_float(stack)?;
                let a = pop_float(stack)?;
                stack.push(RtValue::Int(cmp_nan(a.partial_cmp(&b), -1)));
            }
            Fcmpg => {
                let b = pop_float(stack)?;
                let a = pop_float(stack)?;
                stack.push(RtValue::Int(cmp_nan(a.partial_cmp(&b), 1)));
            }
            Dcmpl => {
                let b = pop_double(stack)?;
                let a = pop_double(stack)?;
                stack.push(RtValue::Int(cmp_nan(a.partial_cmp(&b), -1)));
            }
            Dcmpg => {
                let b = pop_double(stack)?;
                let a = pop_double(stack)?;
                stack.push(RtValue::Int(cmp_nan(a.partial_cmp(&b), 1)));
            }
            Ifeq | Ifne | Iflt | Ifge | Ifgt | Ifle => {
                let v = pop_int(stack)?;
                let taken = match instr.opcode {
                    Ifeq => v == 0,
                    Ifne => v != 0,
                    Iflt => v < 0,
                    Ifge => v >= 0,
                    Ifgt => v > 0,
                    Ifle => v <= 0,
                    _ => unreachable!(),
                };
                return Ok(self.branch_or_next(instr, taken));
            }
            IfIcmpeq | IfIcmpne | IfIcmplt | IfIcmpge | IfIcmpgt | IfIcmple => {
                let b = pop_int(stack)?;
                let a = pop_int(stack)?;
                let taken = match instr.opcode {
                    IfIcmpeq => a == b,
                    IfIcmpne => a != b,
                    IfIcmplt => a < b,
                    IfIcmpge => a >= b,
                    IfIcmpgt => a > b,
                    IfIcmple => a <= b,
                    _ => unreachable!(),
                };
                return Ok(self.branch_or_next(instr, taken));
            }
            IfAcmpeq | IfAcmpne => {
                let b = pop(stack)?;
                let a = pop(stack)?;
                let eq = rt_ref_eq(&a, &b);
                let taken = if instr.opcode == IfAcmpeq { eq } else { !eq };
                return Ok(self.branch_or_next(instr, taken));
            }
            Goto => return Ok(self.branch_or_next(instr, true)),
            Ireturn | Freturn | Lreturn | Dreturn | Areturn => {
                let v = pop(stack)?;
                return Ok(Step::Return(v));
            }
            Return => return Ok(Step::Return(RtValue::Null)),
            Getfield | Putfield => {
                let Operand::Const(ResolvedConstant::Fieldref { owner, name, .. }) = &instr.operand else {
                    return Err(malformed());
                };
                return Err(EvaluationError::UnsupportedIntrinsic {
                    owner: owner.replace('/', "."),
                    name: name.clone(),
                    arity: 0,
                });
            }
            Invokevirtual | Invokeinterface | Invokestatic | Invokespecial => {
                let Operand::Const(ref c) = instr.operand else { return Err(malformed()) };
                let (owner, name, descriptor) = methodref_parts(c)?;
                self.invoke(instr.opcode, owner, name, descriptor, stack)?;
            }
            New => {
                let Operand::Const(ResolvedConstant::Class(ref name)) = instr.operand else { return Err(malformed()) };
                stack.push(RtValue::Object(Arc::new(Mutex::new(RtObject::Uninit(name.clone())))));
            }
            Checkcast => {
                let Operand::Const(ResolvedConstant::Class(ref name)) = instr.operand else { return Err(malformed()) };
                let v = stack.last().ok_or(EvaluationError::StackUnderflow)?;
                check_cast(v, name)?;
            }
            Instanceof => {
                let Operand::Const(ResolvedConstant::Class(ref name)) = instr.operand else { return Err(malformed()) };
                let v = pop(stack)?;
                let matches = !v.is_null() && check_cast(&v, name).is_ok();
                stack.push(RtValue::Int(matches as i32));
            }
        }
        Ok(Step::Next)
    }

    fn branch_or_next(&self, instr: &Instruction, taken: bool) -> Step {
        if !taken {
            return Step::Next;
        }
        let Operand::Branch(offset) = instr.operand else {
            return Step::Next;
        };
        let target = (instr.offset as i64 + offset as i64) as usize;
        Step::Jump(target)
    }

    /// Dispatch an `invoke*` instruction against this interpreter's fixed
    /// intrinsic table, mirroring exactly the call shapes
    /// `exprc-emit`'s `Emitter` is capable of producing (context
    /// Map/List/Pojo access, the well-known JDK surface
    /// `WellKnownReflectionProvider` advertises, and the handful of
    /// constructible value types `ObjectNew` supports).
    fn invoke(
        &self,
        opcode: Opcode,
        owner: &str,
        name: &str,
        descriptor: &str,
        stack: &mut Vec<RtValue>,
    ) -> Result<(), EvaluationError> {
        let owner_dotted = owner.replace('/', ".");
        let arity = param_count(descriptor);
        let is_static = opcode == Opcode::Invokestatic;

        let mut args = Vec::with_capacity(arity);
        for _ in 0..arity {
            args.push(pop(stack)?);
        }
        args.reverse();

        if opcode == Opcode::Invokespecial && name == "<init>" {
            let receiver = pop(stack)?;
            return self.invoke_constructor(&owner_dotted, &args, &receiver);
        }

        if is_static {
            let result = self.invoke_static(&owner_dotted, name, &args)?;
            if let Some(v) = result {
                stack.push(v);
            }
            return Ok(());
        }

        let receiver = pop(stack)?;

        // A POJO context answers every getter call it was asked for
        // reflectively, whatever the compiled owner class's name was —
        // this interpreter has no real class for it to dispatch against.
        if let RtValue::Object(obj) = &receiver {
            let is_pojo = matches!(&*obj.lock().expect("rtvalue mutex poisoned"), RtObject::Pojo(_));
            if is_pojo && name.starts_with("get") {
                let pojo = match &*obj.lock().expect("rtvalue mutex poisoned") {
                    RtObject::Pojo(p) => p.clone(),
                    _ => unreachable!(),
                };
                stack.push(pojo.get_field(name).unwrap_or(RtValue::Null));
                return Ok(());
            }
        }

        let result = self.invoke_instance(&owner_dotted, name, &args, &receiver, stack)?;
        if let Some(v) = result {
            stack.push(v);
        }
        Ok(())
    }

    fn invoke_constructor(&self, owner: &str, args: &[RtValue], receiver: &RtValue) -> Result<(), EvaluationError> {
        let RtValue::Object(obj) = receiver else { return Err(malformed()) };
        let mut slot = obj.lock().expect("rtvalue mutex poisoned");
        match (owner, args.len()) {
            ("java.lang.StringBuilder", 0) => {
                *slot = RtObject::StringBuilder(String::new());
                Ok(())
            }
            ("java.math.BigDecimal", 1) => {
                *slot = RtObject::BigDecimal(args[0].java_to_string());
                Ok(())
            }
            ("java.math.BigInteger", 1) => {
                let text = args[0].java_to_string();
                let parsed = text.parse::<i128>().map_err(|_| EvaluationError::UnsupportedIntrinsic {
                    owner: owner.to_string(),
                    name: "<init>".to_string(),
                    arity: args.len(),
                })?;
                *slot = RtObject::BigInteger(parsed);
                Ok(())
            }
            _ => Err(EvaluationError::UnsupportedIntrinsic {
                owner: owner.to_string(),
                name: "<init>".to_string(),
                arity: args.len(),
            }),
        }
    }

    fn invoke_static(&self, owner: &str, name: &str, args: &[RtValue]) -> Result<Option<RtValue>, EvaluationError> {
        let unsupported = || EvaluationError::UnsupportedIntrinsic {
            owner: owner.to_string(),
            name: name.to_string(),
            arity: args.len(),
        };
        let value = match (owner, name, args.len()) {
            ("java.lang.Math", "max", 2) => RtValue::Int(as_int(&args[0])?.max(as_int(&args[1])?)),
            ("java.lang.Math", "min", 2) => RtValue::Int(as_int(&args[0])?.min(as_int(&args[1])?)),
            ("java.lang.Math", "abs", 1) => RtValue::Int(as_int(&args[0])?.wrapping_abs()),
            ("java.lang.Math", "pow", 2) => RtValue::Double(as_double(&args[0])?.powf(as_double(&args[1])?)),
            ("java.lang.Math", "sqrt", 1) => RtValue::Double(as_double(&args[0])?.sqrt()),
            ("java.lang.Math", "floor", 1) => RtValue::Double(as_double(&args[0])?.floor()),
            ("java.lang.Math", "ceil", 1) => RtValue::Double(as_double(&args[0])?.ceil()),
            ("java.lang.Math", "random", 0) => RtValue::Double(pseudo_random()),

            // Boxing collapses to identity (`RtValue`'s own doc: "a boxed
            // `Integer` and a raw `int` are the same Rust value").
            ("java.lang.Integer", "valueOf", 1)
            | ("java.lang.Long", "valueOf", 1)
            | ("java.lang.Short", "valueOf", 1)
            | ("java.lang.Byte", "valueOf", 1)
            | ("java.lang.Character", "valueOf", 1)
            | ("java.lang.Float", "valueOf", 1)
            | ("java.lang.Double", "valueOf", 1)
            | ("java.lang.Boolean", "valueOf", 1) => args[0].clone(),

            ("java.lang.String", "valueOf", 1) => RtValue::Object(Arc::new(Mutex::new(RtObject::Str(args[0].java_to_string())))),

            ("java.util.Map", "of", _) => RtValue::Object(Arc::new(Mutex::new(RtObject::Map(map_of_pairs(args)?)))),
            ("java.util.Map", "ofEntries", _) => RtValue::Object(Arc::new(Mutex::new(RtObject::Map(map_of_entries(args)?)))),
            ("java.util.Map", "entry", 2) => {
                RtValue::Object(Arc::new(Mutex::new(RtObject::List(vec![args[0].clone(), args[1].clone()]))))
            }
            ("java.util.List", "of", _) => RtValue::Object(Arc::new(Mutex::new(RtObject::List(args.to_vec())))),

            ("java.math.BigDecimal", "valueOf", 1) => {
                let text = format_big_decimal(as_double(&args[0])?);
                RtValue::Object(Arc::new(Mutex::new(RtObject::BigDecimal(text))))
            }
            ("java.math.BigInteger", "valueOf", 1) => {
                RtValue::Object(Arc::new(Mutex::new(RtObject::BigInteger(as_long(&args[0])? as i128))))
            }

            ("java.time.Duration", "ofDays", 1) => duration_of(as_long(&args[0])?, 86_400_000_000_000),
            ("java.time.Duration", "ofHours", 1) => duration_of(as_long(&args[0])?, 3_600_000_000_000),
            ("java.time.Duration", "ofMinutes", 1) => duration_of(as_long(&args[0])?, 60_000_000_000),
            ("java.time.Duration", "ofSeconds", 1) => duration_of(as_long(&args[0])?, 1_000_000_000),
            ("java.time.Duration", "ofMillis", 1) => duration_of(as_long(&args[0])?, 1_000_000),

            _ => return Err(unsupported()),
        };
        Ok(Some(value))
    }

    fn invoke_instance(
        &self,
        owner: &str,
        name: &str,
        args: &[RtValue],
        receiver: &RtValue,
        _stack: &mut [RtValue],
    ) -> Result<Option<RtValue>, EvaluationError> {
        let unsupported = || EvaluationError::UnsupportedIntrinsic {
            owner: owner.to_string(),
            name: name.to_string(),
            arity: args.len(),
        };

        // `Map.get`/`List.get` (`emit_context_lookup`'s and
        // `emit_method_call`'s "Map-like pattern").
        if owner == "java.util.Map" && name == "get" && args.len() == 1 {
            let RtValue::Object(obj) = receiver else { return Err(EvaluationError::NullPointer) };
            let RtObject::Map(m) = &*obj.lock().expect("rtvalue mutex poisoned") else { return Err(unsupported()) };
            let key = args[0].java_to_string();
            return Ok(Some(m.get(&key).cloned().unwrap_or(RtValue::Null)));
        }
        if owner == "java.util.List" && name == "get" && args.len() == 1 {
            let RtValue::Object(obj) = receiver else { return Err(EvaluationError::NullPointer) };
            let RtObject::List(items) = &*obj.lock().expect("rtvalue mutex poisoned") else { return Err(unsupported()) };
            let idx = as_int(&args[0])?;
            return Ok(Some(items.get(idx as usize).cloned().unwrap_or(RtValue::Null)));
        }

        if owner == "java.lang.StringBuilder" && name == "append" && args.len() == 1 {
            let RtValue::Object(obj) = receiver else { return Err(EvaluationError::NullPointer) };
            let mut guard = obj.lock().expect("rtvalue mutex poisoned");
            let RtObject::StringBuilder(buf) = &mut *guard else { return Err(unsupported()) };
            buf.push_str(&args[0].java_to_string());
            drop(guard);
            return Ok(Some(receiver.clone()));
        }
        if owner == "java.lang.StringBuilder" && name == "toString" && args.is_empty() {
            let RtValue::Object(obj) = receiver else { return Err(EvaluationError::NullPointer) };
            let RtObject::StringBuilder(buf) = &*obj.lock().expect("rtvalue mutex poisoned") else { return Err(unsupported()) };
            return Ok(Some(RtValue::Object(Arc::new(Mutex::new(RtObject::Str(buf.clone()))))));
        }

        if owner == "java.time.Duration" && args.len() == 1 {
            let unit_nanos = match name {
                "plusDays" => Some(86_400_000_000_000i64),
                "plusHours" => Some(3_600_000_000_000),
                "plusMinutes" => Some(60_000_000_000),
                "plusSeconds" => Some(1_000_000_000),
                "plusMillis" => Some(1_000_000),
                _ => None,
            };
            if let Some(unit) = unit_nanos {
                let RtValue::Object(obj) = receiver else { return Err(EvaluationError::NullPointer) };
                let RtObject::Duration(nanos) = &*obj.lock().expect("rtvalue mutex poisoned") else { return Err(unsupported()) };
                let added = as_long(&args[0])?.wrapping_mul(unit);
                return Ok(Some(duration_of_nanos(nanos.wrapping_add(added))));
            }
        }

        if owner == "java.math.BigDecimal" && args.len() == 1 {
            let op: Option<fn(f64, f64) -> f64> = match name {
                "add" => Some(|a, b| a + b),
                "subtract" => Some(|a, b| a - b),
                "multiply" => Some(|a, b| a * b),
                _ => None,
            };
            if let Some(op) = op {
                let RtValue::Object(obj) = receiver else { return Err(EvaluationError::NullPointer) };
                let RtObject::BigDecimal(text) = &*obj.lock().expect("rtvalue mutex poisoned") else { return Err(unsupported()) };
                let a: f64 = text.parse().map_err(|_| unsupported())?;
                let b: f64 = args[0].java_to_string().parse().map_err(|_| unsupported())?;
                // Unlike `BigDecimal.valueOf(double)` (which always shows a
                // decimal point to mark its double origin), arithmetic
                // between two already-scaled `BigDecimal`s renders its
                // natural text form — `0 + 1` reads as `"1"`, not `"1.0"`.
                return Ok(Some(RtValue::Object(Arc::new(Mutex::new(RtObject::BigDecimal(op(a, b).to_string()))))));
            }
        }

        // Boxed-wrapper unboxing: identity, since this crate never
        // distinguishes a boxed value from its primitive.
        if args.is_empty()
            && matches!(
                name,
                "intValue" | "longValue" | "shortValue" | "byteValue" | "charValue" | "floatValue" | "doubleValue" | "booleanValue"
            )
        {
            return Ok(Some(receiver.clone()));
        }

        if name == "toString" && args.is_empty() {
            return Ok(Some(RtValue::Object(Arc::new(Mutex::new(RtObject::Str(receiver.java_to_string()))))));
        }
        if name == "equals" && args.len() == 1 {
            return Ok(Some(RtValue::Boolean(rt_equals(receiver, &args[0]))));
        }
        if name == "hashCode" && args.is_empty() {
            return Ok(Some(RtValue::Int(rt_hash(receiver))));
        }

        Err(unsupported())
    }
}

enum Step {
    Next,
    Jump(usize),
    Return(RtValue),
}

fn malformed() -> EvaluationError {
    // A shape this interpreter's own `step` didn't expect from bytes this
    // workspace's own emitter produced — i.e. an emitter/interpreter
    // contract bug, not a caller error.
    EvaluationError::BadJumpTarget(0)
}

fn pop(stack: &mut Vec<RtValue>) -> Result<RtValue, EvaluationError> {
    stack.pop().ok_or(EvaluationError::StackUnderflow)
}

fn pop_int(stack: &mut Vec<RtValue>) -> Result<i32, EvaluationError> {
    as_int(&pop(stack)?)
}

fn pop_long(stack: &mut Vec<RtValue>) -> Result<i64, EvaluationError> {
    as_long(&pop(stack)?)
}

fn pop_float(stack: &mut Vec<RtValue>) -> Result<f32, EvaluationError> {
    match pop(stack)? {
        RtValue::Float(v) => Ok(v),
        _ => Err(malformed()),
    }
}

fn pop_double(stack: &mut Vec<RtValue>) -> Result<f64, EvaluationError> {
    match pop(stack)? {
        RtValue::Double(v) => Ok(v),
        _ => Err(malformed()),
    }
}

fn as_int(v: &RtValue) -> Result<i32, EvaluationError> {
    match v {
        RtValue::Int(v) => Ok(*v),
        RtValue::Char(c) => Ok(*c as i32),
        _ => Err(malformed()),
    }
}

fn as_long(v: &RtValue) -> Result<i64, EvaluationError> {
    match v {
        RtValue::Long(v) => Ok(*v),
        RtValue::Int(v) => Ok(*v as i64),
        _ => Err(malformed()),
    }
}

fn as_double(v: &RtValue) -> Result<f64, EvaluationError> {
    match v {
        RtValue::Double(v) => Ok(*v),
        RtValue::Float(v) => Ok(*v as f64),
        RtValue::Int(v) => Ok(*v as f64),
        RtValue::Long(v) => Ok(*v as f64),
        _ => Err(malformed()),
    }
}

fn int_binop(stack: &mut Vec<RtValue>, f: impl FnOnce(i32, i32) -> i32) -> Result<(), EvaluationError> {
    let b = pop_int(stack)?;
    let a = pop_int(stack)?;
    stack.push(RtValue::Int(f(a, b)));
    Ok(())
}

fn long_binop(stack: &mut Vec<RtValue>, f: impl FnOnce(i64, i64) -> i64) -> Result<(), EvaluationError> {
    let b = pop_long(stack)?;
    let a = pop_long(stack)?;
    stack.push(RtValue::Long(f(a, b)));
    Ok(())
}

/// Shift opcodes whose shift-amount operand may itself have been widened
/// to `long` by the emitter's own widening lattice when the left-hand
/// operand was `long` (`emit_binary` widens both operands to the same
/// type before picking the opcode, shift amount included).
fn long_shift(stack: &mut Vec<RtValue>, f: impl FnOnce(i64, i64) -> i64) -> Result<(), EvaluationError> {
    let b = pop_long(stack)?;
    let a = pop_long(stack)?;
    stack.push(RtValue::Long(f(a, b)));
    Ok(())
}

fn float_binop(stack: &mut Vec<RtValue>, f: impl FnOnce(f32, f32) -> f32) -> Result<(), EvaluationError> {
    let b = pop_float(stack)?;
    let a = pop_float(stack)?;
    stack.push(RtValue::Float(f(a, b)));
    Ok(())
}

fn double_binop(stack: &mut Vec<RtValue>, f: impl FnOnce(f64, f64) -> f64) -> Result<(), EvaluationError> {
    let b = pop_double(stack)?;
    let a = pop_double(stack)?;
    stack.push(RtValue::Double(f(a, b)));
    Ok(())
}

fn cmp_nan(ord: Option<std::cmp::Ordering>, nan_value: i32) -> i32 {
    match ord {
        Some(std::cmp::Ordering::Less) => -1,
        Some(std::cmp::Ordering::Equal) => 0,
        Some(std::cmp::Ordering::Greater) => 1,
        None => nan_value,
    }
}

fn local_get(locals: &[RtValue], slot: u8) -> RtValue {
    locals.get(slot as usize).cloned().unwrap_or(RtValue::Null)
}

fn local_set(locals: &mut Vec<RtValue>, slot: u8, value: RtValue) {
    let idx = slot as usize;
    if idx >= locals.len() {
        locals.resize(idx + 1, RtValue::Null);
    }
    locals[idx] = value;
}

fn const_to_rt(c: &ResolvedConstant) -> Result<RtValue, EvaluationError> {
    match c {
        ResolvedConstant::Integer(v) => Ok(RtValue::Int(*v)),
        ResolvedConstant::Float(bits) => Ok(RtValue::Float(f32::from_bits(*bits))),
        ResolvedConstant::Long(v) => Ok(RtValue::Long(*v)),
        ResolvedConstant::Double(bits) => Ok(RtValue::Double(f64::from_bits(*bits))),
        ResolvedConstant::StringRef(s) => Ok(RtValue::Object(Arc::new(Mutex::new(RtObject::Str(s.clone()))))),
        _ => Err(malformed()),
    }
}

fn methodref_parts(c: &ResolvedConstant) -> Result<(&str, &str, &str), EvaluationError> {
    match c {
        ResolvedConstant::Methodref { owner, name, descriptor }
        | ResolvedConstant::InterfaceMethodref { owner, name, descriptor } => {
            Ok((owner.as_str(), name.as_str(), descriptor.as_str()))
        }
        _ => Err(malformed()),
    }
}

/// Count a method descriptor's parameters (the portion between `(` and
/// `)`), one per primitive tag or `L...;`/`[...` reference slot.
fn param_count(descriptor: &str) -> usize {
    let params = descriptor.strip_prefix('(').and_then(|s| s.split(')').next()).unwrap_or("");
    let mut count = 0;
    let mut chars = params.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '[' => continue,
            'L' => {
                for c2 in chars.by_ref() {
                    if c2 == ';' {
                        break;
                    }
                }
                count += 1;
            }
            _ => count += 1,
        }
    }
    count
}

/// The method descriptor's return-type tag (`Z`, `C`, `I`, `J`, `F`, `D`,
/// or `L` for any reference type), used to box a raw `Ireturn`'d `int`
/// into [`RtValue::Boolean`]/[`RtValue::Char`] when the declared return
/// type needs it — the JVM has no separate return opcode for those
/// (`return_opcode` maps every sub-`int` primitive to `Ireturn` alike).
fn return_type_tag(descriptor: &str) -> char {
    descriptor.rsplit(')').next().and_then(|s| s.chars().next()).unwrap_or('L')
}

fn box_return(value: RtValue, tag: char) -> RtValue {
    match (tag, &value) {
        ('Z', RtValue::Int(v)) => RtValue::Boolean(*v != 0),
        ('C', RtValue::Int(v)) => RtValue::Char(*v as u16),
        _ => value,
    }
}

fn rt_ref_eq(a: &RtValue, b: &RtValue) -> bool {
    match (a, b) {
        (RtValue::Null, RtValue::Null) => true,
        (RtValue::Null, _) | (_, RtValue::Null) => false,
        (RtValue::Object(x), RtValue::Object(y)) => Arc::ptr_eq(x, y),
        _ => rt_equals(a, b),
    }
}

fn rt_equals(a: &RtValue, b: &RtValue) -> bool {
    match (a, b) {
        (RtValue::Int(x), RtValue::Int(y)) => x == y,
        (RtValue::Long(x), RtValue::Long(y)) => x == y,
        (RtValue::Float(x), RtValue::Float(y)) => x == y,
        (RtValue::Double(x), RtValue::Double(y)) => x == y,
        (RtValue::Boolean(x), RtValue::Boolean(y)) => x == y,
        (RtValue::Char(x), RtValue::Char(y)) => x == y,
        (RtValue::Null, RtValue::Null) => true,
        (RtValue::Object(x), RtValue::Object(y)) => x.lock().expect("rtvalue mutex poisoned").java_to_string() == y.lock().expect("rtvalue mutex poisoned").java_to_string(),
        _ => false,
    }
}

fn rt_hash(v: &RtValue) -> i32 {
    use std::hash::{Hash, Hasher};
    let mut hasher = rustc_hash::FxHasher::default();
    v.java_to_string().hash(&mut hasher);
    hasher.finish() as i32
}

fn check_cast(v: &RtValue, internal_name: &str) -> Result<(), EvaluationError> {
    if v.is_null() {
        return Ok(());
    }
    let dotted = internal_name.replace('/', ".");
    if dotted == "java.lang.Object" {
        return Ok(());
    }
    let matches = match (&dotted[..], v) {
        ("java.lang.Integer", RtValue::Int(_)) => true,
        ("java.lang.Long", RtValue::Long(_)) => true,
        ("java.lang.Float", RtValue::Float(_)) => true,
        ("java.lang.Double", RtValue::Double(_)) => true,
        ("java.lang.Boolean", RtValue::Boolean(_)) => true,
        ("java.lang.Character", RtValue::Char(_)) => true,
        ("java.lang.Short" | "java.lang.Byte", RtValue::Int(_)) => true,
        (_, RtValue::Object(obj)) => match &*obj.lock().expect("rtvalue mutex poisoned") {
            RtObject::Uninit(name) => name.replace('/', ".") == dotted,
            RtObject::Str(_) => dotted == "java.lang.String" || dotted == "java.lang.CharSequence",
            RtObject::Map(_) => dotted == "java.util.Map",
            RtObject::List(_) => dotted == "java.util.List",
            RtObject::BigDecimal(_) => dotted == "java.math.BigDecimal",
            RtObject::BigInteger(_) => dotted == "java.math.BigInteger",
            RtObject::Duration(_) => dotted == "java.time.Duration",
            RtObject::StringBuilder(_) => dotted == "java.lang.StringBuilder",
            // A caller-supplied POJO handle stands in for whatever real
            // class it represents; this interpreter has no reflective
            // model of it to check against.
            RtObject::Pojo(_) => true,
        },
        _ => false,
    };
    if matches {
        Ok(())
    } else {
        Err(EvaluationError::TypeMismatch { expected: "<checkcast target>", found: v.java_to_string() })
    }
}

fn map_of_pairs(args: &[RtValue]) -> Result<std::collections::BTreeMap<String, RtValue>, EvaluationError> {
    if args.len() % 2 != 0 {
        return Err(malformed());
    }
    let mut m = std::collections::BTreeMap::new();
    for pair in args.chunks_exact(2) {
        m.insert(pair[0].java_to_string(), pair[1].clone());
    }
    Ok(m)
}

fn map_of_entries(args: &[RtValue]) -> Result<std::collections::BTreeMap<String, RtValue>, EvaluationError> {
    let mut m = std::collections::BTreeMap::new();
    for entry in args {
        let RtValue::Object(obj) = entry else { return Err(malformed()) };
        let RtObject::List(pair) = &*obj.lock().expect("rtvalue mutex poisoned") else { return Err(malformed()) };
        if pair.len() != 2 {
            return Err(malformed());
        }
        m.insert(pair[0].java_to_string(), pair[1].clone());
    }
    Ok(m)
}

fn format_big_decimal(v: f64) -> String {
    let text = v.to_string();
    if text.contains('.') {
        text
    } else {
        format!("{text}.0")
    }
}

fn duration_of(value: i64, unit_nanos: i64) -> RtValue {
    duration_of_nanos(value.wrapping_mul(unit_nanos))
}

fn duration_of_nanos(nanos: i64) -> RtValue {
    RtValue::Object(Arc::new(Mutex::new(RtObject::Duration(nanos))))
}

/// A dependency-free pseudo-random source for `Math.random()`. Not
/// cryptographically meaningful — nothing in this evaluator's contract
/// promises a particular distribution, only a `double` in `[0, 1)`.
fn pseudo_random() -> f64 {
    use std::sync::atomic::{AtomicU64, Ordering};
    static STATE: AtomicU64 = AtomicU64::new(0x9E3779B97F4A7C15);
    let mut x = STATE.fetch_add(0x9E3779B97F4A7C15, Ordering::Relaxed);
    x ^= x << 13;
    x ^= x >> 7;
    x ^= x << 17;
    (x >> 11) as f64 / (1u64 << 53) as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use exprc_classfile::{ClassFile, CodeBuilder, ConstantPool, FieldDef, MethodDef};
    use std::collections::BTreeMap;

    fn single_method_class(eval_descriptor: &str, code: Vec<u8>, max_stack: u16, max_locals: u16) -> DecodedClass {
        let mut constants = ConstantPool::new();
        let mut ctor_code = CodeBuilder::new(1);
        ctor_code.load(Opcode::Aload, 0);
        let object_init = constants.methodref("java/lang/Object", "<init>", "()V");
        ctor_code.invoke(Opcode::Invokespecial, object_init, "()V", true);
        ctor_code.return_op(Opcode::Return, 0);
        let (ctor_bytes, ctor_max_stack, ctor_max_locals) = ctor_code.finish();

        let class = ClassFile {
            constants,
            access_flags: exprc_classfile::ACC_PUBLIC | exprc_classfile::ACC_FINAL | exprc_classfile::ACC_SUPER,
            this_class: "generated/EvalTest".to_string(),
            super_class: "java/lang/Object".to_string(),
            interfaces: vec![],
            fields: Vec::<FieldDef>::new(),
            methods: vec![
                MethodDef {
                    access_flags: exprc_classfile::ACC_PUBLIC_MEMBER,
                    name: "<init>".to_string(),
                    descriptor: "()V".to_string(),
                    code: ctor_bytes,
                    max_stack: ctor_max_stack,
                    max_locals: ctor_max_locals,
                },
                MethodDef {
                    access_flags: exprc_classfile::ACC_PUBLIC_MEMBER,
                    name: "eval".to_string(),
                    descriptor: eval_descriptor.to_string(),
                    code,
                    max_stack,
                    max_locals,
                },
            ],
        };
        exprc_classfile::parse_class(&class.write()).unwrap()
    }

    #[test]
    fn interprets_a_literal_sum() {
        let mut code = CodeBuilder::new(2);
        code.op(Opcode::Iconst1, 0, 1);
        code.op(Opcode::Iconst2, 0, 1);
        code.op(Opcode::Iadd, 2, 1);
        code.return_op(Opcode::Ireturn, 1);
        let (bytes, max_stack, max_locals) = code.finish();
        let decoded = single_method_class("(Ljava/util/Map;)I", bytes, max_stack, max_locals);

        let interp = Interpreter::new(&decoded);
        let ctx = EvalContext::Map(BTreeMap::new());
        let result = interp.run_eval(ctx).unwrap();
        match result {
            RtValue::Int(v) => assert_eq!(v, 3),
            other => panic!("expected Int, got {other:?}"),
        }
    }

    #[test]
    fn interprets_a_map_variable_lookup() {
        let mut code = CodeBuilder::new(2);
        code.load(Opcode::Aload, 1);
        let mut constants_check = ConstantPool::new();
        let _ = &mut constants_check;
        code.return_op(Opcode::Areturn, 1);
        let (bytes, max_stack, max_locals) = code.finish();
        let decoded = single_method_class("(Ljava/lang/Object;)Ljava/lang/Object;", bytes, max_stack, max_locals);

        let interp = Interpreter::new(&decoded);
        let mut map = BTreeMap::new();
        map.insert("a".to_string(), RtValue::Int(7));
        let ctx = EvalContext::Map(map);
        let result = interp.run_eval(ctx).unwrap();
        match result {
            RtValue::Object(obj) => {
                assert!(matches!(&*obj.lock().unwrap(), RtObject::Map(_)));
            }
            other => panic!("expected Object, got {other:?}"),
        }
    }

    #[test]
    fn integer_division_by_zero_is_an_arithmetic_error() {
        let mut code = CodeBuilder::new(2);
        code.op(Opcode::Iconst1, 0, 1);
        code.op(Opcode::Iconst0, 0, 1);
        code.op(Opcode::Idiv, 2, 1);
        code.return_op(Opcode::Ireturn, 1);
        let (bytes, max_stack, max_locals) = code.finish();
        let decoded = single_method_class("(Ljava/util/Map;)I", bytes, max_stack, max_locals);

        let interp = Interpreter::new(&decoded);
        let result = interp.run_eval(EvalContext::Map(BTreeMap::new()));
        assert_eq!(result, Err(EvaluationError::DivisionByZero));
    }

    #[test]
    fn conditional_branch_picks_the_else_arm() {
        // if (false) return 1; else return 2;
        let mut code = CodeBuilder::new(2);
        let else_label = code.new_label();
        let end_label = code.new_label();
        code.op(Opcode::Iconst0, 0, 1);
        code.branch(Opcode::Ifeq, else_label, 1);
        code.op(Opcode::Iconst1, 0, 1);
        code.return_op(Opcode::Ireturn, 1);
        code.branch(Opcode::Goto, end_label, 0);
        code.bind_label(else_label);
        code.op(Opcode::Iconst2, 0, 1);
        code.return_op(Opcode::Ireturn, 1);
        code.bind_label(end_label);
        let (bytes, max_stack, max_locals) = code.finish();
        let decoded = single_method_class("(Ljava/util/Map;)I", bytes, max_stack, max_locals);

        let interp = Interpreter::new(&decoded);
        let result = interp.run_eval(EvalContext::Map(BTreeMap::new())).unwrap();
        match result {
            RtValue::Int(v) => assert_eq!(v, 2),
            other => panic!("expected Int, got {other:?}"),
        }
    }

    #[test]
    fn big_decimal_add_accumulates_by_canonical_text() {
        let mut constants = ConstantPool::new();
        let mut code = CodeBuilder::new(2);
        let ctor = constants.methodref("java/math/BigDecimal", "<init>", "(Ljava/lang/String;)V");
        let add = constants.methodref("java/math/BigDecimal", "add", "(Ljava/math/BigDecimal;)Ljava/math/BigDecimal;");
        let zero_str = constants.string("0");
        let one_str = constants.string("1");
        let bd_class = constants.class("java/math/BigDecimal");

        code.new_object(bd_class);
        code.op(Opcode::Dup, 0, 1);
        code.ldc(zero_str);
        code.invoke(Opcode::Invokespecial, ctor, "(Ljava/lang/String;)V", true);
        code.new_object(bd_class);
        code.op(Opcode::Dup, 0, 1);
        code.ldc(one_str);
        code.invoke(Opcode::Invokespecial, ctor, "(Ljava/lang/String;)V", true);
        code.invoke(Opcode::Invokevirtual, add, "(Ljava/math/BigDecimal;)Ljava/math/BigDecimal;", true);
        code.return_op(Opcode::Areturn, 1);
        let (bytes, max_stack, max_locals) = code.finish();

        let mut ctor_code = CodeBuilder::new(1);
        ctor_code.load(Opcode::Aload, 0);
        let object_init = constants.methodref("java/lang/Object", "<init>", "()V");
        ctor_code.invoke(Opcode::Invokespecial, object_init, "()V", true);
        ctor_code.return_op(Opcode::Return, 0);
        let (ctor_bytes, ctor_max_stack, ctor_max_locals) = ctor_code.finish();

        let class = ClassFile {
            constants,
            access_flags: exprc_classfile::ACC_PUBLIC | exprc_classfile::ACC_FINAL | exprc_classfile::ACC_SUPER,
            this_class: "generated/EvalBd".to_string(),
            super_class: "java/lang/Object".to_string(),
            interfaces: vec![],
            fields: Vec::<FieldDef>::new(),
            methods: vec![
                MethodDef {
                    access_flags: exprc_classfile::ACC_PUBLIC_MEMBER,
                    name: "<init>".to_string(),
                    descriptor: "()V".to_string(),
                    code: ctor_bytes,
                    max_stack: ctor_max_stack,
                    max_locals: ctor_max_locals,
                },
                MethodDef {
                    access_flags: exprc_classfile::ACC_PUBLIC_MEMBER,
                    name: "eval".to_string(),
                    descriptor: "(Ljava/util/Map;)Ljava/lang/Object;".to_string(),
                    code: bytes,
                    max_stack,
                    max_locals,
                },
            ],
        };
        let decoded = exprc_classfile::parse_class(&class.write()).unwrap();

        let interp = Interpreter::new(&decoded);
        let result = interp.run_eval(EvalContext::Map(BTreeMap::new())).unwrap();
        assert_eq!(result.java_to_string(), "1");
    }
}
