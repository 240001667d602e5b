//! Resolves cast/`new`/declaration type names against the caller's import
//! set plus well-known prefixes (`java.lang.*`,
//! `java.math.*`, `java.util.*`).

use crate::error::TypeResolutionError;
use exprc_types::{PrimitiveTag, TypeDescriptor};
use rustc_hash::FxHashMap;

/// Simple names pre-seeded from the well-known prefixes, so a bare `String`
/// or `Map` resolves without the caller needing to spell out an import for
/// every JDK class.
fn well_known() -> FxHashMap<&'static str, &'static str> {
    [
        ("Object", "java.lang.Object"),
        ("String", "java.lang.String"),
        ("Boolean", "java.lang.Boolean"),
        ("Integer", "java.lang.Integer"),
        ("Long", "java.lang.Long"),
        ("Short", "java.lang.Short"),
        ("Byte", "java.lang.Byte"),
        ("Character", "java.lang.Character"),
        ("Float", "java.lang.Float"),
        ("Double", "java.lang.Double"),
        ("Number", "java.lang.Number"),
        ("Math", "java.lang.Math"),
        ("BigDecimal", "java.math.BigDecimal"),
        ("BigInteger", "java.math.BigInteger"),
        ("Map", "java.util.Map"),
        ("List", "java.util.List"),
        ("Set", "java.util.Set"),
        ("Duration", "java.time.Duration"),
    ]
    .into_iter()
    .collect()
}

/// Resolves simple type names to fully qualified class names.
pub struct TypeResolver {
    /// Caller-supplied `simple name -> fqcn` imports, checked before the
    /// well-known prefixes.
    imports: FxHashMap<String, String>,
}

impl TypeResolver {
    /// Build a resolver from the request's import set (fqcn strings; the
    /// simple name is the part after the last `.`).
    pub fn new(import_set: &[String]) -> Self {
        let mut imports = FxHashMap::default();
        for fqcn in import_set {
            let simple = fqcn.rsplit('.').next().unwrap_or(fqcn.as_str());
            imports.insert(simple.to_string(), fqcn.clone());
        }
        Self { imports }
    }

    /// Resolve a source-level type name to a [`TypeDescriptor`]. Primitive
    /// tags are recognized by keyword; anything already dotted is assumed
    /// fully qualified; otherwise the import set, then the well-known
    /// prefixes, are consulted.
    pub fn resolve(&self, name: &str) -> Result<TypeDescriptor, TypeResolutionError> {
        if let Some(tag) = primitive_tag(name) {
            return Ok(TypeDescriptor::Primitive(tag));
        }
        if name.contains('.') {
            return Ok(TypeDescriptor::reference(name));
        }
        if let Some(fqcn) = self.imports.get(name) {
            return Ok(TypeDescriptor::reference(fqcn.clone()));
        }
        if let Some(fqcn) = well_known().get(name) {
            return Ok(TypeDescriptor::reference(*fqcn));
        }
        Err(TypeResolutionError {
            name: name.to_string(),
        })
    }

    /// Like [`Self::resolve`], but a generic/parameterized form (anything
    /// containing `<...>`) is retained unresolved for the fallback path
    /// rather than rejected.
    pub fn resolve_permissive(&self, name: &str) -> TypeDescriptor {
        if let Some(idx) = name.find('<') {
            let base = &name[..idx];
            if let Ok(resolved) = self.resolve(base) {
                let _ = resolved;
            }
            return TypeDescriptor::Parameterized(name.to_string());
        }
        self.resolve(name)
            .unwrap_or_else(|_| TypeDescriptor::Parameterized(name.to_string()))
    }
}

fn primitive_tag(name: &str) -> Option<PrimitiveTag> {
    Some(match name {
        "int" => PrimitiveTag::Int,
        "long" => PrimitiveTag::Long,
        "short" => PrimitiveTag::Short,
        "byte" => PrimitiveTag::Byte,
        "char" => PrimitiveTag::Char,
        "float" => PrimitiveTag::Float,
        "double" => PrimitiveTag::Double,
        "boolean" => PrimitiveTag::Boolean,
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_primitive_keywords() {
        let resolver = TypeResolver::new(&[]);
        assert_eq!(
            resolver.resolve("int").unwrap(),
            TypeDescriptor::Primitive(PrimitiveTag::Int)
        );
    }

    #[test]
    fn resolves_well_known_simple_names() {
        let resolver = TypeResolver::new(&[]);
        assert_eq!(
            resolver.resolve("BigDecimal").unwrap(),
            TypeDescriptor::reference("java.math.BigDecimal")
        );
    }

    #[test]
    fn resolves_imported_simple_names_over_well_known() {
        let resolver = TypeResolver::new(&["com.acme.Map".to_string()]);
        assert_eq!(
            resolver.resolve("Map").unwrap(),
            TypeDescriptor::reference("com.acme.Map")
        );
    }

    #[test]
    fn rejects_unresolvable_names() {
        let resolver = TypeResolver::new(&[]);
        assert!(resolver.resolve("Frobnicator").is_err());
    }

    #[test]
    fn permissive_resolution_keeps_generics_unresolved() {
        let resolver = TypeResolver::new(&[]);
        assert_eq!(
            resolver.resolve_permissive("List<Foo>"),
            TypeDescriptor::Parameterized("List<Foo>".to_string())
        );
    }
}
