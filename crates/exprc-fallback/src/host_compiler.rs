//! The injected boundary to an external host-language compiler. This
//! crate never invokes `javac` (or any concrete
//! compiler) itself — callers that need real bytes from pretty-printed
//! source wire in their own implementation; tests use an in-memory fake.

use std::collections::BTreeMap;

/// One compiler diagnostic, severity-agnostic (the source compiler's own
/// error/warning distinction is preserved verbatim in `message`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Raw diagnostic text from the host compiler.
    pub message: String,
    /// 1-based line number into the pretty-printed source, if the host
    /// compiler reported one.
    pub line: Option<u32>,
}

/// What the fallback path hands an external compiler: pretty-printed
/// source, the classpath entries the defining loader should see, and the
/// simple names importable by the generated class.
#[derive(Debug, Clone)]
pub struct HostCompileRequest {
    /// Fully qualified name of the class being compiled.
    pub class_name: String,
    /// Pretty-printed host-language source text.
    pub source: String,
    /// Classpath entries visible to the compilation (jar paths or
    /// directories, caller-defined).
    pub classpath: Vec<String>,
    /// Import set carried through from the original `CompilerRequest`.
    pub imports: Vec<String>,
}

/// The external host-language compiler boundary: given
/// pretty-printed source, produce `{class_name: bytes}` or diagnostics.
/// Implementations are expected to shell out to (or embed) a real
/// compiler for the target host language; this crate only defines the
/// contract.
pub trait HostCompiler: Send + Sync {
    /// Compile `request.source`, returning every class file the
    /// compilation produced (a single expression class may nest an
    /// anonymous helper, hence a map rather than one blob) keyed by fully
    /// qualified name, or the compiler's diagnostics on failure.
    fn compile(&self, request: &HostCompileRequest) -> Result<BTreeMap<String, Vec<u8>>, Vec<Diagnostic>>;
}

/// Default [`HostCompiler`]: refuses every request with a diagnostic
/// explaining that no host compiler was configured. Lets a caller that
/// never exercises the fallback path skip wiring one in.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullHostCompiler;

impl HostCompiler for NullHostCompiler {
    fn compile(&self, request: &HostCompileRequest) -> Result<BTreeMap<String, Vec<u8>>, Vec<Diagnostic>> {
        Err(vec![Diagnostic {
            message: format!(
                "no host compiler configured; cannot fall back to compile `{}`",
                request.class_name
            ),
            line: None,
        }])
    }
}
