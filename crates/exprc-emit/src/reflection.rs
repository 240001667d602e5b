//! Reflective method/field/constructor resolution, cached by `(class,
//! name, arity)` behind a concurrent map; a cache miss is a genuine
//! `MethodResolutionError`, never a silent fallback to an Object-typed
//! descriptor.
//!
//! This workspace has no live JVM to introspect, so the boundary a JVM
//! implementation crosses via `java.lang.reflect` is expressed here as an
//! injected [`ReflectionProvider`] trait — the emitter still only ever
//! *consumes* reflective signatures, it never owns how they're produced.
//! [`WellKnownReflectionProvider`] answers for the fixed set of JDK
//! classes always treated as resolvable static-call targets
//! (`Math`, `BigDecimal`, `BigInteger`, boxed primitives, `String`, the
//! collection factory methods lowering introduces); a caller's own POJO
//! classes are resolved by whatever `ReflectionProvider` the caller
//! injects (or chained via [`ChainedReflectionProvider`]).

use dashmap::DashMap;
use exprc_types::TypeDescriptor;
use std::sync::Arc;

/// A resolved method's reflective shape: parameter types in declared
/// order, return type (`None` for `void`), and whether the owner is an
/// interface (selects `invokeinterface` over `invokevirtual`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodSignature {
    /// Parameter types, in declaration order.
    pub params: Vec<TypeDescriptor>,
    /// Return type, or `None` for `void`.
    pub ret: Option<TypeDescriptor>,
    /// Whether this method is static (no receiver popped at the call
    /// site).
    pub is_static: bool,
    /// Whether the owner is a JVM interface (`invokeinterface` vs.
    /// `invokevirtual`).
    pub is_interface: bool,
}

/// Answers reflective questions the direct emitter needs: does a
/// `(class, method, arity)` triple resolve, and to what signature; does a
/// `(class, field)` pair resolve, and to what type; does a class have a
/// constructor of a given arity.
pub trait ReflectionProvider: Send + Sync {
    /// Resolve an instance or static method by owner class (fully
    /// qualified name), method name, and argument count. Overload
    /// resolution beyond arity is out of scope — methods resolve by
    /// `(name, arg count)` only.
    fn resolve_method(&self, owner: &str, name: &str, arity: usize) -> Option<MethodSignature>;

    /// Resolve an instance field's type.
    fn resolve_field(&self, _owner: &str, _name: &str) -> Option<TypeDescriptor> {
        None
    }

    /// Whether `owner` has a constructor accepting `arity` arguments
    /// ("ObjectNew for classes whose constructor matches by
    /// arity").
    fn has_constructor(&self, owner: &str, arity: usize) -> bool {
        let _ = (owner, arity);
        false
    }
}

/// Falls back through a list of providers in order, returning the first
/// match. Lets a caller layer its own POJO reflection on top of
/// [`WellKnownReflectionProvider`] without reimplementing the JDK surface.
pub struct ChainedReflectionProvider {
    providers: Vec<Arc<dyn ReflectionProvider>>,
}

impl ChainedReflectionProvider {
    /// Build a chain, consulted in order.
    pub fn new(providers: Vec<Arc<dyn ReflectionProvider>>) -> Self {
        Self { providers }
    }
}

impl ReflectionProvider for ChainedReflectionProvider {
    fn resolve_method(&self, owner: &str, name: &str, arity: usize) -> Option<MethodSignature> {
        self.providers.iter().find_map(|p| p.resolve_method(owner, name, arity))
    }

    fn resolve_field(&self, owner: &str, name: &str) -> Option<TypeDescriptor> {
        self.providers.iter().find_map(|p| p.resolve_field(owner, name))
    }

    fn has_constructor(&self, owner: &str, arity: usize) -> bool {
        self.providers.iter().any(|p| p.has_constructor(owner, arity))
    }
}

fn prim(tag: exprc_types::PrimitiveTag) -> TypeDescriptor {
    TypeDescriptor::Primitive(tag)
}

fn reference(fqcn: &str) -> TypeDescriptor {
    TypeDescriptor::reference(fqcn)
}

fn sig(params: Vec<TypeDescriptor>, ret: Option<TypeDescriptor>, is_static: bool) -> MethodSignature {
    MethodSignature { params, ret, is_static, is_interface: false }
}

/// Resolves the fixed surface of JDK classes treated as always-available
/// static-call targets, plus the instance methods the
/// lowerer's desugared factory/chain calls rely on (`Map.of`, `List.of`,
/// `BigDecimal.valueOf`, `Duration.ofHours`/`.plusMinutes`, boxed-wrapper
/// unboxing methods, `String` concatenation helpers).
pub struct WellKnownReflectionProvider;

impl ReflectionProvider for WellKnownReflectionProvider {
    fn resolve_method(&self, owner: &str, name: &str, arity: usize) -> Option<MethodSignature> {
        use exprc_types::PrimitiveTag::*;
        match (owner, name, arity) {
            ("java.lang.Math", "max", 2) => Some(sig(vec![prim(Int), prim(Int)], Some(prim(Int)), true)),
            ("java.lang.Math", "min", 2) => Some(sig(vec![prim(Int), prim(Int)], Some(prim(Int)), true)),
            ("java.lang.Math", "abs", 1) => Some(sig(vec![prim(Int)], Some(prim(Int)), true)),
            ("java.lang.Math", "pow", 2) => Some(sig(vec![prim(Double), prim(Double)], Some(prim(Double)), true)),
            ("java.lang.Math", "sqrt", 1) => Some(sig(vec![prim(Double)], Some(prim(Double)), true)),
            ("java.lang.Math", "floor", 1) => Some(sig(vec![prim(Double)], Some(prim(Double)), true)),
            ("java.lang.Math", "ceil", 1) => Some(sig(vec![prim(Double)], Some(prim(Double)), true)),
            ("java.lang.Math", "random", 0) => Some(sig(vec![], Some(prim(Double)), true)),

            ("java.lang.String", "valueOf", 1) => Some(sig(vec![reference("java.lang.Object")], Some(reference("java.lang.String")), true)),
            ("java.lang.Integer", "valueOf", 1) => Some(sig(vec![prim(Int)], Some(reference("java.lang.Integer")), true)),
            ("java.lang.Long", "valueOf", 1) => Some(sig(vec![prim(Long)], Some(reference("java.lang.Long")), true)),
            ("java.lang.Short", "valueOf", 1) => Some(sig(vec![prim(Short)], Some(reference("java.lang.Short")), true)),
            ("java.lang.Byte", "valueOf", 1) => Some(sig(vec![prim(Byte)], Some(reference("java.lang.Byte")), true)),
            ("java.lang.Character", "valueOf", 1) => Some(sig(vec![prim(Char)], Some(reference("java.lang.Character")), true)),
            ("java.lang.Float", "valueOf", 1) => Some(sig(vec![prim(Float)], Some(reference("java.lang.Float")), true)),
            ("java.lang.Double", "valueOf", 1) => Some(sig(vec![prim(Double)], Some(reference("java.lang.Double")), true)),
            ("java.lang.Boolean", "valueOf", 1) => Some(sig(vec![prim(Boolean)], Some(reference("java.lang.Boolean")), true)),

            ("java.util.Map", "of", _) => Some(sig(
                (0..arity).map(|_| reference("java.lang.Object")).collect(),
                Some(reference("java.util.Map")),
                true,
            )),
            ("java.util.Map", "ofEntries", _) => Some(sig(
                (0..arity).map(|_| reference("java.util.Map$Entry")).collect(),
                Some(reference("java.util.Map")),
                true,
            )),
            ("java.util.Map", "entry", 2) => Some(sig(
                vec![reference("java.lang.Object"), reference("java.lang.Object")],
                Some(reference("java.util.Map$Entry")),
                true,
            )),
            ("java.util.List", "of", _) => Some(sig(
                (0..arity).map(|_| reference("java.lang.Object")).collect(),
                Some(reference("java.util.List")),
                true,
            )),

            ("java.math.BigDecimal", "valueOf", 1) => Some(sig(vec![prim(Double)], Some(reference("java.math.BigDecimal")), true)),
            ("java.math.BigInteger", "valueOf", 1) => Some(sig(vec![prim(Long)], Some(reference("java.math.BigInteger")), true)),

            ("java.time.Duration", "ofDays", 1)
            | ("java.time.Duration", "ofHours", 1)
            | ("java.time.Duration", "ofMinutes", 1)
            | ("java.time.Duration", "ofSeconds", 1)
            | ("java.time.Duration", "ofMillis", 1) => Some(sig(vec![prim(Long)], Some(reference("java.time.Duration")), true)),
            ("java.time.Duration", "plusDays", 1)
            | ("java.time.Duration", "plusHours", 1)
            | ("java.time.Duration", "plusMinutes", 1)
            | ("java.time.Duration", "plusSeconds", 1)
            | ("java.time.Duration", "plusMillis", 1) => Some(sig(vec![prim(Long)], Some(reference("java.time.Duration")), false)),

            // unbox methods
            ("java.lang.Integer", "intValue", 0) => Some(sig(vec![], Some(prim(Int)), false)),
            ("java.lang.Long", "longValue", 0) => Some(sig(vec![], Some(prim(Long)), false)),
            ("java.lang.Short", "shortValue", 0) => Some(sig(vec![], Some(prim(Short)), false)),
            ("java.lang.Byte", "byteValue", 0) => Some(sig(vec![], Some(prim(Byte)), false)),
            ("java.lang.Character", "charValue", 0) => Some(sig(vec![], Some(prim(Char)), false)),
            ("java.lang.Float", "floatValue", 0) => Some(sig(vec![], Some(prim(Float)), false)),
            ("java.lang.Double", "doubleValue", 0) => Some(sig(vec![], Some(prim(Double)), false)),
            ("java.lang.Boolean", "booleanValue", 0) => Some(sig(vec![], Some(prim(Boolean)), false)),

            ("java.lang.Object", "toString", 0) => Some(sig(vec![], Some(reference("java.lang.String")), false)),
            ("java.lang.Object", "equals", 1) => Some(sig(vec![reference("java.lang.Object")], Some(prim(Boolean)), false)),
            ("java.lang.Object", "hashCode", 0) => Some(sig(vec![], Some(prim(Int)), false)),

            // string-concatenation helper the emitter's string-concat path
            // chains calls through ("string concatenation with
            // at least one String operand").
            ("java.lang.StringBuilder", "append", 1) => Some(sig(
                vec![reference("java.lang.Object")],
                Some(reference("java.lang.StringBuilder")),
                false,
            )),
            ("java.lang.StringBuilder", "toString", 0) => Some(sig(vec![], Some(reference("java.lang.String")), false)),

            _ => None,
        }
    }

    fn has_constructor(&self, owner: &str, arity: usize) -> bool {
        matches!(
            (owner, arity),
            ("java.lang.StringBuilder", 0)
                | ("java.math.BigDecimal", 1)
                | ("java.math.BigInteger", 1)
        )
    }
}

/// Wraps any [`ReflectionProvider`] with a `(owner, name, arity)`-keyed
/// concurrent cache, so repeated lookups against the same reflective
/// surface across many `compile()` calls pay the resolution cost once
/// ("Reflection: all reflective lookups are idempotent and may
/// be cached").
pub struct ReflectionCache {
    provider: Arc<dyn ReflectionProvider>,
    methods: DashMap<(String, String, usize), Option<MethodSignature>>,
}

impl ReflectionCache {
    /// Wrap `provider` with a fresh, empty cache.
    pub fn new(provider: Arc<dyn ReflectionProvider>) -> Self {
        Self { provider, methods: DashMap::new() }
    }

    /// Build a cache over [`WellKnownReflectionProvider`] alone — the
    /// default for a caller with no POJO context types to resolve.
    pub fn well_known() -> Self {
        Self::new(Arc::new(WellKnownReflectionProvider))
    }

    /// Resolve a method, consulting (and populating) the cache.
    pub fn resolve_method(&self, owner: &str, name: &str, arity: usize) -> Option<MethodSignature> {
        let key = (owner.to_string(), name.to_string(), arity);
        if let Some(cached) = self.methods.get(&key) {
            return cached.clone();
        }
        let resolved = self.provider.resolve_method(owner, name, arity);
        self.methods.insert(key, resolved.clone());
        resolved
    }

    /// Resolve a field's type (not cached separately — fields are looked up
    /// far less often than methods in practice; add a cache here if that
    /// assumption stops holding).
    pub fn resolve_field(&self, owner: &str, name: &str) -> Option<TypeDescriptor> {
        self.provider.resolve_field(owner, name)
    }

    /// Whether `owner` has a constructor of the given arity.
    pub fn has_constructor(&self, owner: &str, arity: usize) -> bool {
        self.provider.has_constructor(owner, arity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_well_known_static_method() {
        let cache = ReflectionCache::well_known();
        let sig = cache.resolve_method("java.lang.Math", "max", 2).unwrap();
        assert!(sig.is_static);
        assert_eq!(sig.ret, Some(TypeDescriptor::Primitive(exprc_types::PrimitiveTag::Int)));
    }

    #[test]
    fn unresolved_lookup_caches_the_negative_result() {
        let cache = ReflectionCache::well_known();
        assert!(cache.resolve_method("com.acme.Frobnicator", "frob", 0).is_none());
        assert!(cache.resolve_method("com.acme.Frobnicator", "frob", 0).is_none());
    }

    #[test]
    fn string_builder_has_a_no_arg_constructor() {
        let cache = ReflectionCache::well_known();
        assert!(cache.has_constructor("java.lang.StringBuilder", 0));
        assert!(!cache.has_constructor("java.lang.StringBuilder", 1));
    }

    #[test]
    fn chained_provider_falls_through_to_second_provider() {
        struct PojoProvider;
        impl ReflectionProvider for PojoProvider {
            fn resolve_method(&self, owner: &str, name: &str, arity: usize) -> Option<MethodSignature> {
                if owner == "com.acme.Foo" && name == "getName" && arity == 0 {
                    Some(sig(vec![], Some(reference("java.lang.String")), false))
                } else {
                    None
                }
            }
        }
        let chained = ChainedReflectionProvider::new(vec![
            Arc::new(WellKnownReflectionProvider),
            Arc::new(PojoProvider),
        ]);
        assert!(chained.resolve_method("java.lang.Math", "max", 2).is_some());
        assert!(chained.resolve_method("com.acme.Foo", "getName", 0).is_some());
    }
}
