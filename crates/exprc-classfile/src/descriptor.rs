//! JVM descriptor-string construction (JVM Spec §4.3) from this
//! workspace's [`exprc_types::TypeDescriptor`].

use exprc_types::{PrimitiveTag, TypeDescriptor};

/// The internal (slash-separated) form of a fully qualified class name,
/// e.g. `java.lang.String` -> `java/lang/String`.
pub fn internal_name(fqcn: &str) -> String {
    fqcn.replace('.', "/")
}

/// The field/parameter descriptor for a single type, e.g. `int` -> `"I"`,
/// `java.lang.String` -> `"Ljava/lang/String;"`.
pub fn descriptor_for(ty: &TypeDescriptor) -> String {
    match ty {
        TypeDescriptor::Primitive(p) => primitive_descriptor(*p).to_string(),
        TypeDescriptor::Reference(fqcn) => format!("L{};", internal_name(fqcn)),
        // Erased at the descriptor level: a generic reference is still a
        // reference on the stack, just `Object`-shaped at the bytecode
        // layer (the fallback path is the one that cares about the full
        // generic signature, via a Signature attribute it is free to add).
        TypeDescriptor::Parameterized(_) => "Ljava/lang/Object;".to_string(),
    }
}

fn primitive_descriptor(p: PrimitiveTag) -> &'static str {
    match p {
        PrimitiveTag::Int => "I",
        PrimitiveTag::Long => "J",
        PrimitiveTag::Short => "S",
        PrimitiveTag::Byte => "B",
        PrimitiveTag::Char => "C",
        PrimitiveTag::Float => "F",
        PrimitiveTag::Double => "D",
        PrimitiveTag::Boolean => "Z",
    }
}

/// A full method descriptor, e.g. `(I I) -> boolean` becomes
/// `"(II)Z"`. `ret` of `None` denotes `void`.
pub fn method_descriptor(params: &[TypeDescriptor], ret: Option<&TypeDescriptor>) -> String {
    let mut s = String::from("(");
    for p in params {
        s.push_str(&descriptor_for(p));
    }
    s.push(')');
    match ret {
        Some(ty) => s.push_str(&descriptor_for(ty)),
        None => s.push('V'),
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitive_descriptors_match_jvm_letters() {
        assert_eq!(descriptor_for(&TypeDescriptor::Primitive(PrimitiveTag::Int)), "I");
        assert_eq!(descriptor_for(&TypeDescriptor::Primitive(PrimitiveTag::Boolean)), "Z");
        assert_eq!(descriptor_for(&TypeDescriptor::Primitive(PrimitiveTag::Long)), "J");
    }

    #[test]
    fn reference_descriptor_uses_internal_name() {
        assert_eq!(
            descriptor_for(&TypeDescriptor::reference("java.lang.String")),
            "Ljava/lang/String;"
        );
    }

    #[test]
    fn method_descriptor_concatenates_params_and_return() {
        let params = vec![
            TypeDescriptor::Primitive(PrimitiveTag::Int),
            TypeDescriptor::Primitive(PrimitiveTag::Int),
        ];
        let ret = TypeDescriptor::Primitive(PrimitiveTag::Boolean);
        assert_eq!(method_descriptor(&params, Some(&ret)), "(II)Z");
        assert_eq!(method_descriptor(&[], None), "()V");
    }
}
