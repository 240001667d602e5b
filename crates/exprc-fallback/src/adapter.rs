//! The fallback compiler adapter itself (component D):
//! pretty-print, invoke the injected [`HostCompiler`], wrap diagnostics.
//! The adapter adds no rewrites of its own past pretty-printing — its
//! contract is to produce a byte-for-byte equivalent class to what a
//! human would compile by hand from the same source.

use crate::error::CompileError;
use crate::host_compiler::{HostCompileRequest, HostCompiler, NullHostCompiler};
use crate::pretty::pretty_print_class;
use exprc_ir::{Eir, Interner};
use exprc_types::{ContextKind, DeclarationTable, TypeDescriptor};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Drives the fallback path for one compilation: pretty-print the lowered
/// EIR, hand it to the injected [`HostCompiler`], return the resulting
/// class bytes keyed by fully qualified name.
pub struct FallbackAdapter {
    host_compiler: Arc<dyn HostCompiler>,
}

impl FallbackAdapter {
    /// Build an adapter around a caller-supplied [`HostCompiler`].
    pub fn new(host_compiler: Arc<dyn HostCompiler>) -> Self {
        Self { host_compiler }
    }

    /// Pretty-print `body` as `class_name` and compile it, returning every
    /// class the compilation produced. `classpath` and `imports` are
    /// passed through to the injected compiler untouched — the source,
    /// the current class loader's visible classpath, and the set of
    /// imports, with no further rewrites added.
    pub fn compile(
        &self,
        class_name: &str,
        body: &Eir,
        declarations: &DeclarationTable,
        context_kind: ContextKind,
        out_type: &TypeDescriptor,
        interner: &Interner,
        classpath: &[String],
        imports: &[String],
    ) -> Result<BTreeMap<String, Vec<u8>>, CompileError> {
        let simple_name = class_name.rsplit('/').next().unwrap_or(class_name);
        let source = pretty_print_class(simple_name, body, declarations, context_kind, out_type, interner);

        let request = HostCompileRequest {
            class_name: class_name.to_string(),
            source: source.clone(),
            classpath: classpath.to_vec(),
            imports: imports.to_vec(),
        };

        tracing::debug!(class_name, "dispatching to fallback host compiler");

        self.host_compiler.compile(&request).map_err(|diagnostics| CompileError {
            class_name: class_name.to_string(),
            generated_source: source,
            diagnostics,
        })
    }
}

impl Default for FallbackAdapter {
    /// An adapter around [`NullHostCompiler`]: usable out of the box by a
    /// caller that never needs the fallback path to actually succeed.
    fn default() -> Self {
        Self::new(Arc::new(NullHostCompiler))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host_compiler::test_support::FakeHostCompiler;
    use crate::host_compiler::Diagnostic;
    use exprc_ir::{BinOp, EirKind, Span};
    use exprc_types::{Declaration, PrimitiveTag};

    fn declarations() -> DeclarationTable {
        DeclarationTable::new(
            Declaration::new("ctx", TypeDescriptor::reference("java.util.Map")),
            vec![Declaration::new("a", TypeDescriptor::Primitive(PrimitiveTag::Int))],
        )
    }

    fn sum_body(interner: &mut Interner) -> Eir {
        let a = interner.intern("a");
        let left = Eir::new(Span::synthetic(), EirKind::NameRef(a));
        let right = Eir::new(Span::synthetic(), EirKind::IntLit(1));
        Eir::new(
            Span::synthetic(),
            EirKind::Binary { op: BinOp::Add, left: Box::new(left), right: Box::new(right) },
        )
    }

    #[test]
    fn compiles_via_the_injected_host_compiler() {
        let mut interner = Interner::new();
        let body = sum_body(&mut interner);
        let canned = BTreeMap::from([("generated/Eval0".to_string(), vec![0xCA, 0xFE, 0xBA, 0xBE])]);
        let compiler = Arc::new(FakeHostCompiler { canned, fail_with: None });
        let adapter = FallbackAdapter::new(compiler);
        let result = adapter
            .compile(
                "generated/Eval0",
                &body,
                &declarations(),
                ContextKind::Map,
                &TypeDescriptor::Primitive(PrimitiveTag::Int),
                &interner,
                &[],
                &[],
            )
            .unwrap();
        assert_eq!(result.get("generated/Eval0"), Some(&vec![0xCA, 0xFE, 0xBA, 0xBE]));
    }

    #[test]
    fn wraps_host_compiler_diagnostics_as_compile_error() {
        let mut interner = Interner::new();
        let body = sum_body(&mut interner);
        let diags = vec![Diagnostic { message: "cannot find symbol".to_string(), line: Some(3) }];
        let compiler = Arc::new(FakeHostCompiler { canned: BTreeMap::new(), fail_with: Some(diags.clone()) });
        let adapter = FallbackAdapter::new(compiler);
        let err = adapter
            .compile(
                "generated/Eval0",
                &body,
                &declarations(),
                ContextKind::Map,
                &TypeDescriptor::Primitive(PrimitiveTag::Int),
                &interner,
                &[],
                &[],
            )
            .unwrap_err();
        assert_eq!(err.diagnostics, diags);
        assert!(err.generated_source.contains("return (a + 1);"));
    }
}
