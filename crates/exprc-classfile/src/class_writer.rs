//! Top-level class-file byte layout (JVM Spec §4.1): magic, version,
//! constant pool, access flags, superclass/interfaces, fields, methods,
//! attributes.
//!
//! Target major version is pinned to **49** (Java SE 5) rather than 50+,
//! so the classes this crate writes are checked by the old type-inferring
//! verifier and never need a `StackMapTable` attribute — see `DESIGN.md`
//! for the rationale (computing split/merged stack-map frames for
//! arbitrary branch shapes is a second compiler pass this workspace does
//! not need to carry for a straight-line expression evaluator).

use crate::constant_pool::ConstantPool;

const MAGIC: u32 = 0xCAFEBABE;
const MAJOR_VERSION: u16 = 49;
const MINOR_VERSION: u16 = 0;

/// `public final` access flags for the generated evaluator class.
pub const ACC_PUBLIC: u16 = 0x0001;
/// `final` — emitted classes are never subclassed.
pub const ACC_FINAL: u16 = 0x0010;
/// `super` — required on every class file since Java 1.1 (invokespecial
/// uses the "new" semantics this flag selects).
pub const ACC_SUPER: u16 = 0x0020;
/// `public` method/field access.
pub const ACC_PUBLIC_MEMBER: u16 = 0x0001;

/// A method body plus its name/descriptor/access flags, ready to be
/// serialized into a `method_info` structure.
pub struct MethodDef {
    /// Method access flags (`ACC_PUBLIC`, etc.).
    pub access_flags: u16,
    /// Method name, e.g. `"eval"` or `"<init>"`.
    pub name: String,
    /// JVM method descriptor, e.g. `"(Ljava/util/Map;)Z"`.
    pub descriptor: String,
    /// Raw `Code` attribute body (already has branch offsets patched).
    pub code: Vec<u8>,
    /// `max_stack` computed by [`crate::CodeBuilder::finish`].
    pub max_stack: u16,
    /// `max_locals` computed by [`crate::CodeBuilder::finish`].
    pub max_locals: u16,
}

/// A field declaration (unused by the generated evaluator today — no
/// evaluator carries instance state — but present so the writer's shape
/// matches a general class file, not a evaluator-only special case).
pub struct FieldDef {
    /// Field access flags.
    pub access_flags: u16,
    /// Field name.
    pub name: String,
    /// JVM field descriptor.
    pub descriptor: String,
}

/// A complete class ready to serialize.
pub struct ClassFile {
    /// Constant pool backing every name/descriptor/reference below.
    pub constants: ConstantPool,
    /// Class-level access flags.
    pub access_flags: u16,
    /// This class's internal (slash-separated) name.
    pub this_class: String,
    /// Superclass's internal name (`"java/lang/Object"` unless the
    /// evaluator interface contract requires otherwise).
    pub super_class: String,
    /// Implemented interfaces, internal names (e.g. the `Evaluator`
    /// interface this class implements).
    pub interfaces: Vec<String>,
    /// Field declarations.
    pub fields: Vec<FieldDef>,
    /// Method declarations, including the no-arg constructor.
    pub methods: Vec<MethodDef>,
}

impl ClassFile {
    /// Serialize the full class file to bytes.
    pub fn write(mut self) -> Vec<u8> {
        let this_class_idx = self.constants.class(&self.this_class);
        let super_class_idx = self.constants.class(&self.super_class);
        let interface_idxs: Vec<u16> = self
            .interfaces
            .iter()
            .map(|i| self.constants.class(i))
            .collect();

        // Pre-intern every name/descriptor/Code-attribute-name UTF8 so the
        // constant pool is fully populated before `constant_pool_count` and
        // the pool body are written.
        let code_attr_name = self.constants.utf8("Code");
        let mut method_parts = Vec::with_capacity(self.methods.len());
        for m in &self.methods {
            let name_idx = self.constants.utf8(&m.name);
            let desc_idx = self.constants.utf8(&m.descriptor);
            method_parts.push((name_idx, desc_idx));
        }
        let mut field_parts = Vec::with_capacity(self.fields.len());
        for f in &self.fields {
            let name_idx = self.constants.utf8(&f.name);
            let desc_idx = self.constants.utf8(&f.descriptor);
            field_parts.push((name_idx, desc_idx));
        }

        let mut out = Vec::new();
        out.extend_from_slice(&MAGIC.to_be_bytes());
        out.extend_from_slice(&MINOR_VERSION.to_be_bytes());
        out.extend_from_slice(&MAJOR_VERSION.to_be_bytes());
        out.extend_from_slice(&self.constants.count().to_be_bytes());
        self.constants.write(&mut out);
        out.extend_from_slice(&self.access_flags.to_be_bytes());
        out.extend_from_slice(&this_class_idx.to_be_bytes());
        out.extend_from_slice(&super_class_idx.to_be_bytes());
        out.extend_from_slice(&(interface_idxs.len() as u16).to_be_bytes());
        for idx in &interface_idxs {
            out.extend_from_slice(&idx.to_be_bytes());
        }

        out.extend_from_slice(&(self.fields.len() as u16).to_be_bytes());
        for (field, (name_idx, desc_idx)) in self.fields.iter().zip(&field_parts) {
            out.extend_from_slice(&field.access_flags.to_be_bytes());
            out.extend_from_slice(&name_idx.to_be_bytes());
            out.extend_from_slice(&desc_idx.to_be_bytes());
            out.extend_from_slice(&0u16.to_be_bytes()); // attributes_count
        }

        out.extend_from_slice(&(self.methods.len() as u16).to_be_bytes());
        for (method, (name_idx, desc_idx)) in self.methods.iter().zip(&method_parts) {
            out.extend_from_slice(&method.access_flags.to_be_bytes());
            out.extend_from_slice(&name_idx.to_be_bytes());
            out.extend_from_slice(&desc_idx.to_be_bytes());
            out.extend_from_slice(&1u16.to_be_bytes()); // attributes_count: Code only

            let mut code_attr = Vec::new();
            code_attr.extend_from_slice(&method.max_stack.to_be_bytes());
            code_attr.extend_from_slice(&method.max_locals.to_be_bytes());
            code_attr.extend_from_slice(&(method.code.len() as u32).to_be_bytes());
            code_attr.extend_from_slice(&method.code);
            code_attr.extend_from_slice(&0u16.to_be_bytes()); // exception_table_length
            code_attr.extend_from_slice(&0u16.to_be_bytes()); // attributes_count (no LocalVariableTable/LineNumberTable)

            out.extend_from_slice(&code_attr_name.to_be_bytes());
            out.extend_from_slice(&(code_attr.len() as u32).to_be_bytes());
            out.extend_from_slice(&code_attr);
        }

        out.extend_from_slice(&0u16.to_be_bytes()); // class attributes_count: no SourceFile, no annotations
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opcode::Opcode;
    use crate::CodeBuilder;

    #[test]
    fn writes_well_formed_header() {
        let mut constants = ConstantPool::new();
        let mut code = CodeBuilder::new(1);
        code.load(Opcode::Iload, 1);
        code.return_op(Opcode::Ireturn, 1);
        let (bytes, max_stack, max_locals) = code.finish();
        let ctor_code = {
            let mut c = CodeBuilder::new(1);
            c.load(Opcode::Aload, 0);
            let object_init = constants.methodref("java/lang/Object", "<init>", "()V");
            c.invoke(Opcode::Invokespecial, object_init, "()V", true);
            c.return_op(Opcode::Return, 0);
            c.finish()
        };

        let class = ClassFile {
            constants,
            access_flags: ACC_PUBLIC | ACC_FINAL | ACC_SUPER,
            this_class: "generated/Eval0".to_string(),
            super_class: "java/lang/Object".to_string(),
            interfaces: vec![],
            fields: vec![],
            methods: vec![
                MethodDef {
                    access_flags: ACC_PUBLIC_MEMBER,
                    name: "<init>".to_string(),
                    descriptor: "()V".to_string(),
                    code: ctor_code.0,
                    max_stack: ctor_code.1,
                    max_locals: ctor_code.2,
                },
                MethodDef {
                    access_flags: ACC_PUBLIC_MEMBER,
                    name: "eval".to_string(),
                    descriptor: "(I)I".to_string(),
                    code: bytes,
                    max_stack,
                    max_locals,
                },
            ],
        };
        let out = class.write();
        assert_eq!(&out[0..4], &MAGIC.to_be_bytes());
        let major = u16::from_be_bytes([out[6], out[7]]);
        assert_eq!(major, MAJOR_VERSION);
    }
}
