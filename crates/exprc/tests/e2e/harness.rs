//! Shared request-building helpers for the end-to-end scenario tests
//! (spec.md §8), mirroring the harness-module convention this workspace's
//! other crates use for their own `tests/e2e/` suites.

use std::collections::BTreeMap;

use exprc::{CompilerRequest, EvalContext, RtValue};
use exprc_types::{ContentKind, Declaration, DeclarationTable, TypeDescriptor};

/// Build a request against a `java.util.Map` context with the given
/// variable declarations, source text, and expected output type.
pub fn map_request(
    source: &str,
    content_kind: ContentKind,
    out_type: TypeDescriptor,
    vars: Vec<Declaration>,
) -> CompilerRequest {
    let declarations = DeclarationTable::new(Declaration::new("ctx", TypeDescriptor::reference("java.util.Map")), vars);
    CompilerRequest::new(declarations, source, content_kind, out_type, vec![])
}

/// Build a `java.util.Map`-shaped [`EvalContext`] from `(name, value)` pairs.
pub fn map_ctx(entries: Vec<(&str, RtValue)>) -> EvalContext {
    let mut map = BTreeMap::new();
    for (k, v) in entries {
        map.insert(k.to_string(), v);
    }
    EvalContext::Map(map)
}
