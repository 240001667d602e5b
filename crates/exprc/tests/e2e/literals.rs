//! Straight-line boolean and arithmetic expressions compiled through the
//! direct emitter.

use exprc::{Compiler, CompilerConfig, Evaluator, GeneratedEvaluator, RtValue};
use exprc_types::{ContentKind, Declaration, PrimitiveTag, TypeDescriptor};

use super::harness::{map_ctx, map_request};

// Scenario 1: `influence > 50 && !atWar && stability > 30`.
fn compile_scenario_1(compiler: &Compiler) -> GeneratedEvaluator<bool> {
    let vars = vec![
        Declaration::new("influence", TypeDescriptor::Primitive(PrimitiveTag::Int)),
        Declaration::new("atWar", TypeDescriptor::Primitive(PrimitiveTag::Boolean)),
        Declaration::new("stability", TypeDescriptor::Primitive(PrimitiveTag::Int)),
    ];
    let request = map_request(
        "influence > 50 && !atWar && stability > 30",
        ContentKind::Expression,
        TypeDescriptor::Primitive(PrimitiveTag::Boolean),
        vars,
    );
    compiler.compile(&request).unwrap()
}

#[test]
fn scenario_1_stable_peaceful_nation_is_true() {
    let compiler = Compiler::new(CompilerConfig::default());
    let evaluator = compile_scenario_1(&compiler);
    let ctx = map_ctx(vec![
        ("influence", RtValue::Int(75)),
        ("atWar", RtValue::Boolean(false)),
        ("stability", RtValue::Int(50)),
    ]);
    assert!(evaluator.eval(&ctx).unwrap());
}

#[test]
fn scenario_1_at_war_is_false() {
    let compiler = Compiler::new(CompilerConfig::default());
    let evaluator = compile_scenario_1(&compiler);
    let ctx = map_ctx(vec![
        ("influence", RtValue::Int(75)),
        ("atWar", RtValue::Boolean(true)),
        ("stability", RtValue::Int(50)),
    ]);
    assert!(!evaluator.eval(&ctx).unwrap());
}

#[test]
fn scenario_1_low_influence_is_false() {
    let compiler = Compiler::new(CompilerConfig::default());
    let evaluator = compile_scenario_1(&compiler);
    let ctx = map_ctx(vec![
        ("influence", RtValue::Int(25)),
        ("atWar", RtValue::Boolean(false)),
        ("stability", RtValue::Int(50)),
    ]);
    assert!(!evaluator.eval(&ctx).unwrap());
}

// Scenario 2: `a + b`.
#[test]
fn scenario_2_int_sum() {
    let compiler = Compiler::new(CompilerConfig::default());
    let vars = vec![
        Declaration::new("a", TypeDescriptor::Primitive(PrimitiveTag::Int)),
        Declaration::new("b", TypeDescriptor::Primitive(PrimitiveTag::Int)),
    ];
    let request = map_request("a + b", ContentKind::Expression, TypeDescriptor::Primitive(PrimitiveTag::Int), vars);
    let evaluator: GeneratedEvaluator<i32> = compiler.compile(&request).unwrap();
    let ctx = map_ctx(vec![("a", RtValue::Int(10)), ("b", RtValue::Int(32))]);
    assert_eq!(evaluator.eval(&ctx).unwrap(), 42);
}
