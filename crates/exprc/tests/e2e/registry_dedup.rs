//! Compiling the same expression twice produces two distinct generated
//! class names but dedups to one registered class, courtesy of the
//! content-hash registry.

use exprc::{Compiler, CompilerConfig, Evaluator, GeneratedEvaluator, RtValue};
use exprc_types::{ContentKind, Declaration, PrimitiveTag, TypeDescriptor};

use super::harness::{map_ctx, map_request};

#[test]
fn scenario_6_repeated_compiles_share_one_backing_class() {
    let compiler = Compiler::new(CompilerConfig::default());
    let vars = vec![
        Declaration::new("a", TypeDescriptor::Primitive(PrimitiveTag::Int)),
        Declaration::new("b", TypeDescriptor::Primitive(PrimitiveTag::Int)),
    ];
    let request = || {
        map_request(
            "a + b",
            ContentKind::Expression,
            TypeDescriptor::Primitive(PrimitiveTag::Int),
            vars.clone(),
        )
    };

    let first: GeneratedEvaluator<i32> = compiler.compile(&request()).unwrap();
    let second: GeneratedEvaluator<i32> = compiler.compile(&request()).unwrap();

    // Each `compile()` call mints its own generated-class name...
    assert_ne!(first.class_name(), second.class_name());
    // ...but the registry recognizes identical bytecode and keeps one entry.
    assert_eq!(compiler.registry().len(), 1);

    let ctx = map_ctx(vec![("a", RtValue::Int(19)), ("b", RtValue::Int(23))]);
    assert_eq!(first.eval(&ctx).unwrap(), 42);
    assert_eq!(second.eval(&ctx).unwrap(), 42);
}
