//! The small, fixed set of simple class names the direct emitter resolves
//! without a caller-supplied import set — the same JDK surface treated
//! elsewhere as always-available static-call targets, plus a few common
//! `new`-able collection/value classes. Distinct from (and deliberately
//! smaller than) `exprc_parser::TypeResolver`'s well-known-prefix table:
//! that one resolves *any* cast/declaration type name against the
//! request's import set; this one only needs to recognize the handful of
//! classes the emitter treats specially (static scopes, constructible
//! value types), and never sees the caller's import set at all.

/// Resolve a simple or already-dotted class name to its fully qualified
/// name, for the fixed set of classes the emitter treats specially.
pub fn resolve_class_name(name: &str) -> Option<String> {
    if name.contains('.') {
        return Some(name.to_string());
    }
    let fqcn = match name {
        "Math" => "java.lang.Math",
        "String" => "java.lang.String",
        "Object" => "java.lang.Object",
        "Boolean" => "java.lang.Boolean",
        "Integer" => "java.lang.Integer",
        "Long" => "java.lang.Long",
        "Short" => "java.lang.Short",
        "Byte" => "java.lang.Byte",
        "Character" => "java.lang.Character",
        "Float" => "java.lang.Float",
        "Double" => "java.lang.Double",
        "BigDecimal" => "java.math.BigDecimal",
        "BigInteger" => "java.math.BigInteger",
        "Map" => "java.util.Map",
        "List" => "java.util.List",
        "Duration" => "java.time.Duration",
        "MVEL" => "org.mvel2.MVEL",
        _ => return None,
    };
    Some(fqcn.to_string())
}

/// The boxed-wrapper classes, for recognizing an auto-unboxing target.
pub fn is_boxed_wrapper(fqcn: &str) -> bool {
    matches!(
        fqcn,
        "java.lang.Integer"
            | "java.lang.Long"
            | "java.lang.Short"
            | "java.lang.Byte"
            | "java.lang.Character"
            | "java.lang.Float"
            | "java.lang.Double"
            | "java.lang.Boolean"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_well_known_simple_names() {
        assert_eq!(resolve_class_name("Math"), Some("java.lang.Math".to_string()));
        assert_eq!(resolve_class_name("BigDecimal"), Some("java.math.BigDecimal".to_string()));
    }

    #[test]
    fn unknown_simple_name_does_not_resolve() {
        assert_eq!(resolve_class_name("Frobnicator"), None);
    }

    #[test]
    fn already_dotted_name_passes_through() {
        assert_eq!(resolve_class_name("com.acme.Foo"), Some("com.acme.Foo".to_string()));
    }
}
