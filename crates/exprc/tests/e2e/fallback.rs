//! Shapes the direct emitter's `can_emit` gate permanently rejects
//! (`BigDecimal` compound assignment, a generic-erased `List` chain),
//! routed through the fallback compiler adapter. Since this workspace
//! never shells out to a real host compiler, these tests supply their own
//! [`HostCompiler`] returning hand-built class bytes — standing in for
//! whatever a real host compiler would have produced from the
//! pretty-printed source, exercised the same way [`exprc_registry`]'s own
//! tests build classes by hand.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use exprc::{Compiler, CompilerConfig, CompilerError, Evaluator, GeneratedEvaluator, PojoContext, RtValue};
use exprc_classfile::{ClassFile, CodeBuilder, ConstantPool, FieldDef, MethodDef, Opcode};
use exprc_fallback::{Diagnostic, HostCompileRequest, HostCompiler};
use exprc_types::{ContentKind, Declaration, TypeDescriptor};

use super::harness::{map_ctx, map_request};

/// A [`HostCompiler`] that hands back one fixed class body regardless of
/// the pretty-printed source it's asked to compile — the hand-built bytes
/// already implement the scenario under test.
struct CannedHostCompiler {
    bytes: Vec<u8>,
}

impl HostCompiler for CannedHostCompiler {
    fn compile(&self, request: &HostCompileRequest) -> Result<BTreeMap<String, Vec<u8>>, Vec<Diagnostic>> {
        Ok(BTreeMap::from([(request.class_name.clone(), self.bytes.clone())]))
    }
}

fn no_arg_object_ctor(constants: &mut ConstantPool) -> MethodDef {
    let mut code = CodeBuilder::new(1);
    code.load(Opcode::Aload, 0);
    let object_init = constants.methodref("java/lang/Object", "<init>", "()V");
    code.invoke(Opcode::Invokespecial, object_init, "()V", true);
    code.return_op(Opcode::Return, 0);
    let (bytes, max_stack, max_locals) = code.finish();
    MethodDef {
        access_flags: exprc_classfile::ACC_PUBLIC_MEMBER,
        name: "<init>".to_string(),
        descriptor: "()V".to_string(),
        code: bytes,
        max_stack,
        max_locals,
    }
}

fn build_class(this_class: &str, constants: ConstantPool, eval_method: MethodDef, ctor: MethodDef) -> Vec<u8> {
    ClassFile {
        constants,
        access_flags: exprc_classfile::ACC_PUBLIC | exprc_classfile::ACC_FINAL | exprc_classfile::ACC_SUPER,
        this_class: this_class.to_string(),
        super_class: "java/lang/Object".to_string(),
        interfaces: vec![],
        fields: Vec::<FieldDef>::new(),
        methods: vec![ctor, eval_method],
    }
    .write()
}

/// Hand-builds `eval(Map)` for `var s = 0B; s += 1; s += 1; return s;`
/// against a `BigDecimal` local — the `add` intrinsic this crate's
/// interpreter supports for boxed-big-number arithmetic.
fn build_big_decimal_accumulator_class(this_class: &str) -> Vec<u8> {
    let mut constants = ConstantPool::new();
    let bd_class = constants.class("java/math/BigDecimal");
    let ctor_ref = constants.methodref("java/math/BigDecimal", "<init>", "(Ljava/lang/String;)V");
    let add_ref = constants.methodref(
        "java/math/BigDecimal",
        "add",
        "(Ljava/math/BigDecimal;)Ljava/math/BigDecimal;",
    );
    let zero = constants.string("0");
    let one = constants.string("1");

    // locals: 0 = this, 1 = ctx map, 2 = s
    let mut code = CodeBuilder::new(3);
    code.new_object(bd_class);
    code.dup();
    code.ldc(zero);
    code.invoke(Opcode::Invokespecial, ctor_ref, "(Ljava/lang/String;)V", true);
    code.store(Opcode::Astore, 2);

    for _ in 0..2 {
        code.load(Opcode::Aload, 2);
        code.new_object(bd_class);
        code.dup();
        code.ldc(one);
        code.invoke(Opcode::Invokespecial, ctor_ref, "(Ljava/lang/String;)V", true);
        code.invoke(Opcode::Invokevirtual, add_ref, "(Ljava/math/BigDecimal;)Ljava/math/BigDecimal;", true);
        code.store(Opcode::Astore, 2);
    }

    code.load(Opcode::Aload, 2);
    code.return_op(Opcode::Areturn, 1);
    let (bytes, max_stack, max_locals) = code.finish();

    let ctor = no_arg_object_ctor(&mut constants);
    let eval_method = MethodDef {
        access_flags: exprc_classfile::ACC_PUBLIC_MEMBER,
        name: "eval".to_string(),
        descriptor: "(Ljava/util/Map;)Ljava/lang/Object;".to_string(),
        code: bytes,
        max_stack,
        max_locals,
    };
    build_class(this_class, constants, eval_method, ctor)
}

#[test]
fn scenario_4_big_decimal_accumulator_renders_canonical_text() {
    let request = map_request(
        "var s = 0B; s += 1; s += 1; return s;",
        ContentKind::Block,
        TypeDescriptor::reference("java.math.BigDecimal"),
        vec![],
    );

    // `compile()` mints class names from a per-compiler counter starting
    // at 0, so the first compilation on a fresh `Compiler` always names
    // `exprc/generated/Eval0`.
    let this_class = "exprc/generated/Eval0";
    let bytes = build_big_decimal_accumulator_class(this_class);
    let host_compiler = Arc::new(CannedHostCompiler { bytes });
    let compiler = Compiler::with_host_compiler(CompilerConfig::default(), host_compiler);

    let evaluator: GeneratedEvaluator<RtValue> = compiler.compile(&request).unwrap();
    let ctx = exprc::EvalContext::Map(BTreeMap::new());
    let result = evaluator.eval(&ctx).unwrap();
    assert_eq!(result.java_to_string(), "2");
}

/// A minimal two-entry POJO standing in for `foos[0]`/`foos[1]` — each
/// `get_field("getName")` lookup answers the way a generated reflective
/// getter call against a real `Foo.getName()` would.
#[derive(Debug)]
struct NamedPojo {
    name: &'static str,
}

impl PojoContext for NamedPojo {
    fn get_field(&self, getter: &str) -> Option<RtValue> {
        match getter {
            "getName" => Some(RtValue::Object(Arc::new(Mutex::new(exprc::RtObject::Str(self.name.to_string()))))),
            _ => None,
        }
    }
}

/// Hand-builds `eval(Map)` for `foos[0].name + foos[1].name` over a
/// `java.util.List<Foo>`-typed declared variable (the declared type
/// `can_emit` permanently rejects, since `Parameterized` types are
/// fallback-only) whose elements are reflective POJOs, using
/// `StringBuilder` the way the emitter's own string-concatenation
/// lowering would.
fn build_list_pojo_concat_class(this_class: &str) -> Vec<u8> {
    let mut constants = ConstantPool::new();
    let map_get = constants.interface_methodref("java/util/Map", "get", "(Ljava/lang/Object;)Ljava/lang/Object;");
    let list_get = constants.interface_methodref("java/util/List", "get", "(I)Ljava/lang/Object;");
    // The interpreter's reflective-getter dispatch keys on the method name
    // (`name.starts_with("get")`) for any `Pojo`-backed receiver, not the
    // compiled owner class, so a placeholder owner name is fine here.
    let name_methodref = constants.methodref("demo/Foo", "getName", "()Ljava/lang/String;");
    let foos_key = constants.string("foos");
    let sb_class = constants.class("java/lang/StringBuilder");
    let sb_ctor = constants.methodref("java/lang/StringBuilder", "<init>", "()V");
    let sb_append = constants.methodref(
        "java/lang/StringBuilder",
        "append",
        "(Ljava/lang/String;)Ljava/lang/StringBuilder;",
    );
    let sb_tostring = constants.methodref("java/lang/StringBuilder", "toString", "()Ljava/lang/String;");

    // locals: 0 = this, 1 = ctx map
    let mut code = CodeBuilder::new(2);
    code.new_object(sb_class);
    code.dup();
    code.invoke(Opcode::Invokespecial, sb_ctor, "()V", true);

    for index in 0i8..2 {
        code.load(Opcode::Aload, 1);
        code.ldc(foos_key);
        code.invoke_interface(map_get, "(Ljava/lang/Object;)Ljava/lang/Object;", 2);
        code.push_byte(index);
        code.invoke_interface(list_get, "(I)Ljava/lang/Object;", 2);
        code.invoke(Opcode::Invokevirtual, name_methodref, "()Ljava/lang/String;", true);
        code.invoke(Opcode::Invokevirtual, sb_append, "(Ljava/lang/String;)Ljava/lang/StringBuilder;", true);
    }

    code.invoke(Opcode::Invokevirtual, sb_tostring, "()Ljava/lang/String;", true);
    code.return_op(Opcode::Areturn, 1);
    let (bytes, max_stack, max_locals) = code.finish();

    let ctor = no_arg_object_ctor(&mut constants);
    let eval_method = MethodDef {
        access_flags: exprc_classfile::ACC_PUBLIC_MEMBER,
        name: "eval".to_string(),
        descriptor: "(Ljava/util/Map;)Ljava/lang/Object;".to_string(),
        code: bytes,
        max_stack,
        max_locals,
    };
    build_class(this_class, constants, eval_method, ctor)
}

#[test]
fn scenario_5_list_of_pojos_concatenates_reflective_getters() {
    let vars = vec![Declaration::new("foos", TypeDescriptor::Parameterized("java.util.List<Foo>".to_string()))];
    let request = map_request(
        "foos[0].name + foos[1].name",
        ContentKind::Expression,
        TypeDescriptor::reference("java.lang.String"),
        vars,
    );

    let this_class = "exprc/generated/Eval0";
    let bytes = build_list_pojo_concat_class(this_class);
    let host_compiler = Arc::new(CannedHostCompiler { bytes });
    let compiler = Compiler::with_host_compiler(CompilerConfig::default(), host_compiler);

    let evaluator: GeneratedEvaluator<String> = compiler.compile(&request).unwrap();
    let alice = Arc::new(NamedPojo { name: "Alice" }) as Arc<dyn PojoContext>;
    let bob = Arc::new(NamedPojo { name: "Bob" }) as Arc<dyn PojoContext>;
    let foos = RtValue::Object(Arc::new(Mutex::new(exprc::RtObject::List(vec![
        RtValue::Object(Arc::new(Mutex::new(exprc::RtObject::Pojo(alice)))),
        RtValue::Object(Arc::new(Mutex::new(exprc::RtObject::Pojo(bob)))),
    ]))));
    let ctx = map_ctx(vec![("foos", foos)]);
    let result = evaluator.eval(&ctx).unwrap();
    assert_eq!(result, "AliceBob");
}

/// Hand-builds `eval(Map)` for `a!.b` — `a == null ? null : a.b` once
/// lowered — over a declared `a: demo.Foo` reflective POJO, using
/// `if_acmpne` reference-equality branching the way the direct emitter's
/// own `emit_comparison` would (never `ifnull`/`ifnonnull`, since this
/// crate's emitter has no codegen path that reaches for those opcodes).
fn build_null_safe_field_get_class(this_class: &str) -> Vec<u8> {
    let mut constants = ConstantPool::new();
    let map_get = constants.interface_methodref("java/util/Map", "get", "(Ljava/lang/Object;)Ljava/lang/Object;");
    let a_key = constants.string("a");
    let foo_class = constants.class("demo/Foo");
    let get_b = constants.methodref("demo/Foo", "getB", "()Ljava/lang/String;");

    // locals: 0 = this, 1 = ctx map, 2 = a
    let mut code = CodeBuilder::new(3);
    code.load(Opcode::Aload, 1);
    code.ldc(a_key);
    code.invoke_interface(map_get, "(Ljava/lang/Object;)Ljava/lang/Object;", 2);
    code.store(Opcode::Astore, 2);

    let not_null_label = code.new_label();
    code.load(Opcode::Aload, 2);
    code.op(Opcode::AconstNull, 0, 1);
    code.branch(Opcode::IfAcmpne, not_null_label, 2);
    code.op(Opcode::AconstNull, 0, 1);
    code.return_op(Opcode::Areturn, 1);

    code.bind_label(not_null_label);
    code.load(Opcode::Aload, 2);
    code.type_check(Opcode::Checkcast, foo_class, 0, 0);
    code.invoke(Opcode::Invokevirtual, get_b, "()Ljava/lang/String;", true);
    code.return_op(Opcode::Areturn, 1);

    let (bytes, max_stack, max_locals) = code.finish();
    let ctor = no_arg_object_ctor(&mut constants);
    let eval_method = MethodDef {
        access_flags: exprc_classfile::ACC_PUBLIC_MEMBER,
        name: "eval".to_string(),
        descriptor: "(Ljava/util/Map;)Ljava/lang/Object;".to_string(),
        code: bytes,
        max_stack,
        max_locals,
    };
    build_class(this_class, constants, eval_method, ctor)
}

/// A single-field POJO standing in for `demo.Foo`, reflectively answering
/// `getB()` the way a generated reflective getter call against a real
/// `Foo.getB()` would.
#[derive(Debug)]
struct FooWithB {
    b: &'static str,
}

impl PojoContext for FooWithB {
    fn get_field(&self, getter: &str) -> Option<RtValue> {
        match getter {
            "getB" => Some(RtValue::Object(Arc::new(Mutex::new(exprc::RtObject::Str(self.b.to_string()))))),
            _ => None,
        }
    }
}

fn null_safe_field_get_request() -> exprc::CompilerRequest {
    let vars = vec![Declaration::new("a", TypeDescriptor::reference("demo.Foo"))];
    map_request("a!.b", ContentKind::Expression, TypeDescriptor::reference("java.lang.Object"), vars)
}

#[test]
fn null_safe_field_get_lowers_to_a_conditional_the_direct_emitter_rejects() {
    use exprc_emit::{can_emit, diagnose_rejection, ReflectionCache};
    use exprc_types::{ContextKind, Declaration as Decl, DeclarationTable};

    let context = Decl::new("ctx", TypeDescriptor::reference("java.util.Map"));
    let a = Decl::new("a", TypeDescriptor::reference("demo.Foo"));
    let declarations = DeclarationTable::new(context, vec![a]);

    let parsed = exprc_parser::parse(
        "a!.b",
        ContentKind::Expression,
        ContextKind::Map,
        &declarations,
        &[],
    )
    .unwrap();
    let mut parsed_interner = parsed.interner;
    let mut lowerer = exprc_compiler::Lowerer::new(&mut parsed_interner);
    let lowered = lowerer.lower(parsed.root).unwrap();
    assert!(matches!(lowered.kind, exprc_ir::EirKind::Conditional { .. }));

    let reflection = ReflectionCache::well_known();
    let rejection = diagnose_rejection(&lowered, &declarations, &reflection, &parsed_interner)
        .expect("a Conditional node must be rejected by the direct emitter");
    assert!(rejection.reason.contains("conditional"));
    assert!(!can_emit(&lowered, &declarations, &reflection, &parsed_interner));
}

#[test]
fn scenario_null_safe_field_get_non_null_branch_calls_the_reflective_getter() {
    let request = null_safe_field_get_request();
    let this_class = "exprc/generated/Eval0";
    let bytes = build_null_safe_field_get_class(this_class);
    let host_compiler = Arc::new(CannedHostCompiler { bytes });
    let compiler = Compiler::with_host_compiler(CompilerConfig::default(), host_compiler);

    let evaluator: GeneratedEvaluator<RtValue> = compiler.compile(&request).unwrap();
    let foo = Arc::new(FooWithB { b: "hi" }) as Arc<dyn PojoContext>;
    let value = RtValue::Object(Arc::new(Mutex::new(exprc::RtObject::Pojo(foo))));
    let ctx = map_ctx(vec![("a", value)]);
    let result = evaluator.eval(&ctx).unwrap();
    assert_eq!(result.java_to_string(), "hi");
}

#[test]
fn scenario_null_safe_field_get_null_branch_short_circuits_to_null() {
    let request = null_safe_field_get_request();
    let this_class = "exprc/generated/Eval0";
    let bytes = build_null_safe_field_get_class(this_class);
    let host_compiler = Arc::new(CannedHostCompiler { bytes });
    let compiler = Compiler::with_host_compiler(CompilerConfig::default(), host_compiler);

    let evaluator: GeneratedEvaluator<RtValue> = compiler.compile(&request).unwrap();
    let ctx = map_ctx(vec![("a", RtValue::Null)]);
    let result = evaluator.eval(&ctx).unwrap();
    assert!(matches!(result, RtValue::Null));
}

#[test]
fn falling_back_with_no_host_compiler_configured_surfaces_diagnostics() {
    let compiler = Compiler::new(CompilerConfig::default());
    let request = map_request(
        "var s = 0B; s += 1; return s;",
        ContentKind::Block,
        TypeDescriptor::reference("java.math.BigDecimal"),
        vec![],
    );
    let err = compiler.compile::<RtValue>(&request).unwrap_err();
    assert!(matches!(err, CompilerError::Fallback(_)));
}
