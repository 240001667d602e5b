//! A `;`-separated statement block with compound assignment over declared
//! `Map` variables, compiled through the direct emitter (no fallback
//! needed — `emit_assign` lazily allocates a local slot for each
//! assigned-to declaration).

use exprc::{Compiler, CompilerConfig, Evaluator, GeneratedEvaluator, RtValue};
use exprc_types::{ContentKind, Declaration, PrimitiveTag, TypeDescriptor};

use super::harness::{map_ctx, map_request};

#[test]
fn scenario_3_reassigned_locals_feed_the_return_expression() {
    let compiler = Compiler::new(CompilerConfig::default());
    let vars = vec![
        Declaration::new("a", TypeDescriptor::Primitive(PrimitiveTag::Int)),
        Declaration::new("b", TypeDescriptor::Primitive(PrimitiveTag::Int)),
    ];
    let request = map_request(
        "a = a + 1; b = b * 2; return a + b;",
        ContentKind::Block,
        TypeDescriptor::Primitive(PrimitiveTag::Int),
        vars,
    );
    let evaluator: GeneratedEvaluator<i32> = compiler.compile(&request).unwrap();
    let ctx = map_ctx(vec![("a", RtValue::Int(3)), ("b", RtValue::Int(4))]);
    assert_eq!(evaluator.eval(&ctx).unwrap(), 12);
}
