//! Facade (ties components A-E together): parse, lower, emit-or-fallback,
//! register, and hand back a callable [`Evaluator`].
//!
//! A single [`Compiler`] owns the pieces worth keeping alive across many
//! `compile()` calls: the deduplicating class [`exprc_registry::Registry`]
//! (component E) and the reflective method table (component C's gate and
//! emitter share one [`ReflectionCache`]). [`CompilerRequest`] carries
//! everything specific to one compilation.

#![warn(missing_docs)]

mod config;
mod context;
mod error;
mod evaluator;
mod interp;
mod request;

pub use config::{CompilerConfig, CompilerConfigBuilder};
pub use context::{EvalContext, FromRtValue, PojoContext, RtObject, RtValue};
pub use error::{CompilerError, DisasmErrorEq, EvaluationError};
pub use evaluator::{Evaluator, GeneratedEvaluator};
pub use request::CompilerRequest;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use exprc_compiler::Lowerer;
use exprc_emit::{can_emit, diagnose_rejection, emit_class, ReflectionCache};
use exprc_fallback::{FallbackAdapter, HostCompiler, NullHostCompiler};
use exprc_registry::Registry;
use exprc_types::{ContextKind, TypeDescriptor};

/// Owns the long-lived pieces of the compilation pipeline: the
/// deduplicating registry (component E), the reflective method table
/// (shared between component C's `can_emit` gate and its emitter), and
/// the default fallback host compiler (component D) used when a request
/// supplies none of its own.
pub struct Compiler {
    config: CompilerConfig,
    registry: Registry,
    reflection: ReflectionCache,
    default_host_compiler: Arc<dyn HostCompiler>,
    generated_classes: DashMap<String, Vec<u8>>,
    next_class_id: AtomicU64,
}

impl Compiler {
    /// Build a compiler with no fallback host compiler configured — every
    /// request that falls back to component D fails with
    /// [`exprc_fallback::CompileError`] unless it supplies its own
    /// [`HostCompiler`] via [`CompilerRequest::with_host_compiler`].
    pub fn new(config: CompilerConfig) -> Self {
        Self::with_host_compiler(config, Arc::new(NullHostCompiler))
    }

    /// Build a compiler with a default fallback host compiler, used for
    /// every request that doesn't override it.
    pub fn with_host_compiler(config: CompilerConfig, host_compiler: Arc<dyn HostCompiler>) -> Self {
        Self {
            config,
            registry: Registry::new(),
            reflection: ReflectionCache::well_known(),
            default_host_compiler: host_compiler,
            generated_classes: DashMap::new(),
            next_class_id: AtomicU64::new(0),
        }
    }

    /// This compiler's configuration.
    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    /// The deduplicating class registry backing every evaluator this
    /// compiler has produced.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// The generated bytes for `class_name`, if
    /// [`CompilerConfig::persist_generated_classes`] was enabled and this
    /// compiler generated (rather than reused, via dedup, a
    /// previously-generated) a class under that name.
    pub fn generated_bytes(&self, class_name: &str) -> Option<Vec<u8>> {
        self.generated_classes.get(class_name).map(|e| e.value().clone())
    }

    /// Run the full pipeline — parse, lower, emit-or-fallback, register —
    /// and hand back an [`Evaluator<Out>`] a caller can invoke repeatedly.
    pub fn compile<Out>(&self, request: &CompilerRequest) -> Result<GeneratedEvaluator<Out>, CompilerError>
    where
        Out: FromRtValue + Send + Sync,
    {
        let context_kind = infer_context_kind(&request.declarations.context.ty);

        let parsed = exprc_parser::parse(
            &request.source,
            request.content_kind,
            context_kind,
            &request.declarations,
            &request.imports,
        )?;
        let mut interner = parsed.interner;
        for warning in &parsed.warnings {
            tracing::debug!(warning, "parser diagnostic");
        }

        let mut lowerer = Lowerer::new(&mut interner);
        let body = lowerer.lower(parsed.root)?;

        let class_name = format!("exprc/generated/Eval{}", self.next_class_id.fetch_add(1, Ordering::Relaxed));

        let classes = if self.config.direct_emitter_enabled()
            && can_emit(&body, &request.declarations, &self.reflection, &interner)
        {
            let class_file = emit_class(
                &body,
                &request.declarations,
                context_kind,
                &request.out_type,
                &self.reflection,
                &interner,
                &class_name,
            )?;
            std::collections::BTreeMap::from([(class_name.clone(), class_file.write())])
        } else {
            if self.config.debug_can_emit() {
                if let Some(rejection) = diagnose_rejection(&body, &request.declarations, &self.reflection, &interner) {
                    tracing::debug!(class_name, reason = %rejection.reason, "direct emitter declined, falling back");
                }
            }
            let host_compiler = request.host_compiler.clone().unwrap_or_else(|| Arc::clone(&self.default_host_compiler));
            let adapter = FallbackAdapter::new(host_compiler);
            adapter.compile(
                &class_name,
                &body,
                &request.declarations,
                context_kind,
                &request.out_type,
                &interner,
                &request.classpath,
                &request.imports,
            )?
        };

        if self.config.persist_generated_classes() {
            for (name, bytes) in &classes {
                self.generated_classes.insert(name.clone(), bytes.clone());
            }
        }

        let loaded = self.registry.define(classes)?;
        let primary = loaded
            .into_iter()
            .find(|c| c.name == class_name)
            .expect("the primary class name is always among the names just defined");

        Ok(GeneratedEvaluator::new(primary))
    }
}

/// Which of the three context access patterns a declared context type
/// implies: `java.util.Map` and `java.util.List` get their dedicated
/// access pattern, everything else (including a POJO's own fully
/// qualified class name) is reflective.
fn infer_context_kind(context_ty: &TypeDescriptor) -> ContextKind {
    match context_ty.erased_class_name() {
        "java.util.Map" => ContextKind::Map,
        "java.util.List" => ContextKind::List,
        _ => ContextKind::Pojo,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use exprc_types::{ContentKind, Declaration, DeclarationTable, PrimitiveTag};
    use std::collections::BTreeMap;

    fn map_request(source: &str, out_type: TypeDescriptor, vars: Vec<Declaration>) -> CompilerRequest {
        let declarations = DeclarationTable::new(Declaration::new("ctx", TypeDescriptor::reference("java.util.Map")), vars);
        CompilerRequest::new(declarations, source, ContentKind::Expression, out_type, vec![])
    }

    #[test]
    fn compiles_and_evaluates_a_literal_sum_via_the_direct_emitter() {
        let compiler = Compiler::new(CompilerConfig::default());
        let request = map_request("1 + 2", TypeDescriptor::Primitive(PrimitiveTag::Int), vec![]);
        let evaluator: GeneratedEvaluator<i32> = compiler.compile(&request).unwrap();
        let result = evaluator.eval(&EvalContext::Map(BTreeMap::new())).unwrap();
        assert_eq!(result, 3);
    }

    #[test]
    fn compiles_and_evaluates_a_declared_variable_reference() {
        let compiler = Compiler::new(CompilerConfig::default());
        let vars = vec![Declaration::new("a", TypeDescriptor::Primitive(PrimitiveTag::Int))];
        let request = map_request("a + 1", TypeDescriptor::Primitive(PrimitiveTag::Int), vars);
        let evaluator: GeneratedEvaluator<i32> = compiler.compile(&request).unwrap();
        let mut map = BTreeMap::new();
        map.insert("a".to_string(), RtValue::Int(41));
        let result = evaluator.eval(&EvalContext::Map(map)).unwrap();
        assert_eq!(result, 42);
    }

    #[test]
    fn identical_expressions_dedup_to_one_registered_class() {
        let compiler = Compiler::new(CompilerConfig::default());
        let request_a = map_request("1 + 2", TypeDescriptor::Primitive(PrimitiveTag::Int), vec![]);
        let request_b = map_request("1 + 2", TypeDescriptor::Primitive(PrimitiveTag::Int), vec![]);
        let a: GeneratedEvaluator<i32> = compiler.compile(&request_a).unwrap();
        let b: GeneratedEvaluator<i32> = compiler.compile(&request_b).unwrap();
        assert_eq!(compiler.registry().len(), 1);
        assert_ne!(a.class_name(), b.class_name());
    }

    #[test]
    fn boolean_result_round_trips_through_the_interpreter() {
        let compiler = Compiler::new(CompilerConfig::default());
        let vars = vec![Declaration::new("a", TypeDescriptor::Primitive(PrimitiveTag::Int))];
        let request = map_request("a > 10", TypeDescriptor::Primitive(PrimitiveTag::Boolean), vars);
        let evaluator: GeneratedEvaluator<bool> = compiler.compile(&request).unwrap();
        let mut map = BTreeMap::new();
        map.insert("a".to_string(), RtValue::Int(20));
        let result = evaluator.eval(&EvalContext::Map(map)).unwrap();
        assert!(result);
    }

    #[test]
    fn string_concatenation_compiles_and_evaluates() {
        let compiler = Compiler::new(CompilerConfig::default());
        let vars = vec![Declaration::new("name", TypeDescriptor::reference("java.lang.String"))];
        let request = map_request(r#"name + "!""#, TypeDescriptor::reference("java.lang.String"), vars);
        let evaluator: GeneratedEvaluator<String> = compiler.compile(&request).unwrap();
        let mut map = BTreeMap::new();
        map.insert("name".to_string(), RtValue::Object(Arc::new(std::sync::Mutex::new(RtObject::Str("world".to_string())))));
        let result = evaluator.eval(&EvalContext::Map(map)).unwrap();
        assert_eq!(result, "world!");
    }

    #[test]
    fn disabling_the_direct_emitter_forces_the_fallback_path() {
        let config = CompilerConfig::builder().direct_emitter_enabled(false).build();
        let compiler = Compiler::new(config);
        let request = map_request("1 + 2", TypeDescriptor::Primitive(PrimitiveTag::Int), vec![]);
        let err = compiler.compile::<i32>(&request).unwrap_err();
        assert!(matches!(err, CompilerError::Fallback(_)));
    }
}
