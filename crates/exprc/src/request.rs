//! The immutable compile request.

use exprc_fallback::HostCompiler;
use exprc_types::{ContentKind, DeclarationTable, TypeDescriptor};
use std::sync::Arc;

/// Everything `compile()` needs: the declared shape of the context and
/// variables, the source text to parse, the expected output type, the
/// import set for type-name resolution, and an optional host-compiler hook
/// for the fallback path.
///
/// `CompilerRequest` owns no state shared across calls — the long-lived
/// pieces (registry, reflection cache) live on [`crate::Compiler`] instead.
#[derive(Clone)]
pub struct CompilerRequest {
    /// Context kind plus the ordered variable declarations.
    pub declarations: DeclarationTable,
    /// Raw source text.
    pub source: String,
    /// Whether `source` is a bare expression or a statement block.
    pub content_kind: ContentKind,
    /// Expected static type of the evaluated result.
    pub out_type: TypeDescriptor,
    /// Reference type names reachable by simple name (e.g. `"com.acme.Foo"`
    /// importable as `Foo`), consulted by the parser's type resolver and
    /// forwarded to the fallback compiler as-is.
    pub imports: Vec<String>,
    /// Classpath entries forwarded to the fallback host compiler untouched.
    /// Unused by the direct emitter.
    pub classpath: Vec<String>,
    /// Per-request override of the fallback host compiler. When absent, the
    /// owning [`crate::Compiler`]'s configured compiler is used.
    pub host_compiler: Option<Arc<dyn HostCompiler>>,
}

impl CompilerRequest {
    /// Build a request with no classpath entries and no per-request host
    /// compiler override — the common case.
    pub fn new(
        declarations: DeclarationTable,
        source: impl Into<String>,
        content_kind: ContentKind,
        out_type: TypeDescriptor,
        imports: Vec<String>,
    ) -> Self {
        Self {
            declarations,
            source: source.into(),
            content_kind,
            out_type,
            imports,
            classpath: Vec::new(),
            host_compiler: None,
        }
    }

    /// Attach classpath entries visible to a fallback compilation.
    pub fn with_classpath(mut self, classpath: Vec<String>) -> Self {
        self.classpath = classpath;
        self
    }

    /// Override the host compiler used if this request falls back.
    pub fn with_host_compiler(mut self, host_compiler: Arc<dyn HostCompiler>) -> Self {
        self.host_compiler = Some(host_compiler);
        self
    }
}
