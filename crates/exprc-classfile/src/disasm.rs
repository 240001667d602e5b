//! Minimal class-file reader: the inverse of [`crate::class_writer`],
//! just deep enough to support `exprc-registry`'s normalized bytecode
//! digest, which walks a method's instructions and needs
//! every name/descriptor a `methodref`/`fieldref`/`class` entry resolves
//! to. This is not a general-purpose class-file parser — it reads exactly
//! the shape [`crate::ClassFile::write`] produces (no `StackMapTable`, no
//! debug attributes, no annotations) and rejects anything else as a
//! structural error rather than trying to skip unknown attributes
//! generically.

use std::collections::HashMap;
use thiserror::Error;

use crate::opcode::Opcode;

/// A constant-pool entry, resolved one level past raw indices so callers
/// never re-chase `NameAndType`/`Class` references themselves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedConstant {
    /// Raw UTF-8 entry.
    Utf8(String),
    /// `int` constant.
    Integer(i32),
    /// `float` constant (bit pattern).
    Float(u32),
    /// `long` constant.
    Long(i64),
    /// `double` constant (bit pattern).
    Double(u64),
    /// A class reference, resolved to its internal name.
    Class(String),
    /// A `String` literal constant, resolved to its text.
    StringRef(String),
    /// `owner.name<descriptor>` for a `Fieldref`.
    Fieldref { owner: String, name: String, descriptor: String },
    /// `owner.name<descriptor>` for a `Methodref`.
    Methodref { owner: String, name: String, descriptor: String },
    /// `owner.name<descriptor>` for an `InterfaceMethodref`.
    InterfaceMethodref { owner: String, name: String, descriptor: String },
    /// A placeholder slot following a `Long`/`Double` entry (JVM spec
    /// quirk: wide entries occupy two pool indices).
    Unusable,
}

/// One parsed method: name, descriptor, and its `Code` attribute body if
/// it has one (native/abstract methods would not, but this crate never
/// writes those).
#[derive(Debug, Clone)]
pub struct DecodedMethod {
    /// Method name, e.g. `"eval"`.
    pub name: String,
    /// JVM method descriptor.
    pub descriptor: String,
    /// Raw instruction bytes of the method's `Code` attribute.
    pub code: Vec<u8>,
}

/// A parsed class: the constant pool (resolved) plus its methods.
#[derive(Debug)]
pub struct DecodedClass {
    constants: Vec<ResolvedConstant>,
    /// Parsed methods, in class-file declaration order.
    pub methods: Vec<DecodedMethod>,
}

impl DecodedClass {
    /// Resolve a 1-based constant-pool index.
    pub fn constant(&self, index: u16) -> &ResolvedConstant {
        &self.constants[index as usize - 1]
    }

    /// Find a method by name. When more than one method shares the name
    /// (the concrete `eval` and its erasure-bridge `eval(Object)`), the
    /// caller disambiguates by descriptor.
    pub fn methods_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a DecodedMethod> {
        self.methods.iter().filter(move |m| m.name == name)
    }
}

/// A structural failure while reading a class file this crate did not
/// itself produce, or a corrupted buffer.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DisasmError {
    /// Buffer too short or magic number mismatch.
    #[error("not a well-formed class file")]
    BadMagic,
    /// Ran past the end of the buffer while reading a fixed-size field.
    #[error("truncated class file")]
    Truncated,
    /// A constant-pool index pointed outside the pool, or at the wrong
    /// entry kind for the context it was used in.
    #[error("invalid constant pool reference at index {0}")]
    BadConstantRef(u16),
    /// A `Code` attribute's bytes could not be located for a method this
    /// crate expects one on.
    #[error("method `{0}` has no Code attribute")]
    MissingCode(String),
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn u8(&mut self) -> Result<u8, DisasmError> {
        let b = *self.bytes.get(self.pos).ok_or(DisasmError::Truncated)?;
        self.pos += 1;
        Ok(b)
    }

    fn u16(&mut self) -> Result<u16, DisasmError> {
        let hi = self.u8()? as u16;
        let lo = self.u8()? as u16;
        Ok((hi << 8) | lo)
    }

    fn u32(&mut self) -> Result<u32, DisasmError> {
        let hi = self.u16()? as u32;
        let lo = self.u16()? as u32;
        Ok((hi << 16) | lo)
    }

    fn bytes(&mut self, n: usize) -> Result<&'a [u8], DisasmError> {
        let slice = self.bytes.get(self.pos..self.pos + n).ok_or(DisasmError::Truncated)?;
        self.pos += n;
        Ok(slice)
    }

    fn skip(&mut self, n: usize) -> Result<(), DisasmError> {
        if self.pos + n > self.bytes.len() {
            return Err(DisasmError::Truncated);
        }
        self.pos += n;
        Ok(())
    }
}

/// Raw (pre-resolution) constant-pool tags, used only while reading the
/// pool; `parse` resolves these into [`ResolvedConstant`] in a second pass
/// once every entry is loaded (a `Methodref` can only resolve its owner
/// class name once the `Class` entry it points at has been read, which in
/// a well-formed pool always comes first, but resolving eagerly would
/// still require two passes for `NameAndType`).
enum RawEntry {
    Utf8(String),
    Integer(i32),
    Float(u32),
    Long(i64),
    Double(u64),
    Class { name_index: u16 },
    StringRef { utf8_index: u16 },
    NameAndType { name_index: u16, descriptor_index: u16 },
    Fieldref { class_index: u16, nat_index: u16 },
    Methodref { class_index: u16, nat_index: u16 },
    InterfaceMethodref { class_index: u16, nat_index: u16 },
    Unusable,
}

fn utf8_at(raw: &[RawEntry], index: u16) -> Result<&str, DisasmError> {
    match raw.get(index as usize - 1) {
        Some(RawEntry::Utf8(s)) => Ok(s),
        _ => Err(DisasmError::BadConstantRef(index)),
    }
}

fn class_name_at(raw: &[RawEntry], index: u16) -> Result<&str, DisasmError> {
    match raw.get(index as usize - 1) {
        Some(RawEntry::Class { name_index }) => utf8_at(raw, *name_index),
        _ => Err(DisasmError::BadConstantRef(index)),
    }
}

fn name_and_type_at(raw: &[RawEntry], index: u16) -> Result<(&str, &str), DisasmError> {
    match raw.get(index as usize - 1) {
        Some(RawEntry::NameAndType { name_index, descriptor_index }) => {
            Ok((utf8_at(raw, *name_index)?, utf8_at(raw, *descriptor_index)?))
        }
        _ => Err(DisasmError::BadConstantRef(index)),
    }
}

/// Parse a complete class file as written by [`crate::ClassFile::write`].
pub fn parse_class(bytes: &[u8]) -> Result<DecodedClass, DisasmError> {
    let mut r = Reader::new(bytes);
    if r.bytes.len() < 10 || r.u32()? != 0xCAFEBABE {
        return Err(DisasmError::BadMagic);
    }
    let _minor = r.u16()?;
    let _major = r.u16()?;

    let pool_count = r.u16()?;
    let mut raw: Vec<RawEntry> = Vec::with_capacity(pool_count as usize);
    while raw.len() + 1 < pool_count as usize {
        let tag = r.u8()?;
        let (entry, wide) = match tag {
            1 => {
                let len = r.u16()? as usize;
                let data = r.bytes(len)?;
                (RawEntry::Utf8(String::from_utf8_lossy(data).into_owned()), false)
            }
            3 => (RawEntry::Integer(r.u32()? as i32), false),
            4 => (RawEntry::Float(r.u32()?), false),
            5 => {
                let hi = r.u32()? as u64;
                let lo = r.u32()? as u64;
                (RawEntry::Long((((hi << 32) | lo) as i64)), true)
            }
            6 => {
                let hi = r.u32()? as u64;
                let lo = r.u32()? as u64;
                (RawEntry::Double((hi << 32) | lo), true)
            }
            7 => (RawEntry::Class { name_index: r.u16()? }, false),
            8 => (RawEntry::StringRef { utf8_index: r.u16()? }, false),
            9 => (
                RawEntry::Fieldref { class_index: r.u16()?, nat_index: r.u16()? },
                false,
            ),
            10 => (
                RawEntry::Methodref { class_index: r.u16()?, nat_index: r.u16()? },
                false,
            ),
            11 => (
                RawEntry::InterfaceMethodref { class_index: r.u16()?, nat_index: r.u16()? },
                false,
            ),
            12 => (
                RawEntry::NameAndType { name_index: r.u16()?, descriptor_index: r.u16()? },
                false,
            ),
            _ => return Err(DisasmError::BadConstantRef(raw.len() as u16 + 1)),
        };
        raw.push(entry);
        if wide {
            raw.push(RawEntry::Unusable);
        }
    }

    let mut constants = Vec::with_capacity(raw.len());
    for entry in &raw {
        constants.push(match entry {
            RawEntry::Utf8(s) => ResolvedConstant::Utf8(s.clone()),
            RawEntry::Integer(v) => ResolvedConstant::Integer(*v),
            RawEntry::Float(bits) => ResolvedConstant::Float(*bits),
            RawEntry::Long(v) => ResolvedConstant::Long(*v),
            RawEntry::Double(bits) => ResolvedConstant::Double(*bits),
            RawEntry::Class { name_index } => ResolvedConstant::Class(utf8_at(&raw, *name_index)?.to_string()),
            RawEntry::StringRef { utf8_index } => {
                ResolvedConstant::StringRef(utf8_at(&raw, *utf8_index)?.to_string())
            }
            RawEntry::Fieldref { class_index, nat_index } => {
                let owner = class_name_at(&raw, *class_index)?.to_string();
                let (name, descriptor) = name_and_type_at(&raw, *nat_index)?;
                ResolvedConstant::Fieldref { owner, name: name.to_string(), descriptor: descriptor.to_string() }
            }
            RawEntry::Methodref { class_index, nat_index } => {
                let owner = class_name_at(&raw, *class_index)?.to_string();
                let (name, descriptor) = name_and_type_at(&raw, *nat_index)?;
                ResolvedConstant::Methodref { owner, name: name.to_string(), descriptor: descriptor.to_string() }
            }
            RawEntry::InterfaceMethodref { class_index, nat_index } => {
                let owner = class_name_at(&raw, *class_index)?.to_string();
                let (name, descriptor) = name_and_type_at(&raw, *nat_index)?;
                ResolvedConstant::InterfaceMethodref {
                    owner,
                    name: name.to_string(),
                    descriptor: descriptor.to_string(),
                }
            }
            RawEntry::NameAndType { .. } => ResolvedConstant::Unusable,
            RawEntry::Unusable => ResolvedConstant::Unusable,
        });
    }

    let _access_flags = r.u16()?;
    let _this_class = r.u16()?;
    let _super_class = r.u16()?;
    let interfaces_count = r.u16()?;
    r.skip(interfaces_count as usize * 2)?;

    let fields_count = r.u16()?;
    for _ in 0..fields_count {
        let _access_flags = r.u16()?;
        let _name_index = r.u16()?;
        let _descriptor_index = r.u16()?;
        let attrs = r.u16()?;
        skip_attributes(&mut r, attrs)?;
    }

    let methods_count = r.u16()?;
    let mut methods = Vec::with_capacity(methods_count as usize);
    for _ in 0..methods_count {
        let _access_flags = r.u16()?;
        let name_index = r.u16()?;
        let descriptor_index = r.u16()?;
        let name = utf8_at(&raw, name_index)?.to_string();
        let descriptor = utf8_at(&raw, descriptor_index)?.to_string();
        let attrs = r.u16()?;
        let mut code = None;
        for _ in 0..attrs {
            let attr_name_index = r.u16()?;
            let attr_len = r.u32()?;
            let attr_name = utf8_at(&raw, attr_name_index)?;
            if attr_name == "Code" {
                let _max_stack = r.u16()?;
                let _max_locals = r.u16()?;
                let code_len = r.u32()? as usize;
                let body = r.bytes(code_len)?.to_vec();
                let exception_table_len = r.u16()?;
                r.skip(exception_table_len as usize * 8)?;
                let code_attrs = r.u16()?;
                skip_attributes(&mut r, code_attrs)?;
                code = Some(body);
            } else {
                r.skip(attr_len as usize)?;
            }
        }
        methods.push(DecodedMethod {
            name: name.clone(),
            descriptor,
            code: code.ok_or(DisasmError::MissingCode(name))?,
        });
    }

    Ok(DecodedClass { constants, methods })
}

fn skip_attributes(r: &mut Reader, count: u16) -> Result<(), DisasmError> {
    for _ in 0..count {
        let _name_index = r.u16()?;
        let len = r.u32()?;
        r.skip(len as usize)?;
    }
    Ok(())
}

/// A single decoded instruction: its mnemonic opcode plus whatever operand
/// shape it carries, already split into the fields the digest format names
/// (`<opcode> <slot>`, `<opcode> <owner>.<name><descriptor>`, ...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    /// No operand (arithmetic, stack, conversion, return opcodes).
    None,
    /// A local-variable slot (`iload`, `istore`, ...).
    Slot(u8),
    /// `iinc`'s `(slot, constant)` pair.
    Iinc(u8, i8),
    /// `bipush`'s narrow constant.
    Byte(i8),
    /// `sipush`'s wide constant.
    Short(i16),
    /// A constant-pool reference resolved to its [`ResolvedConstant`].
    Const(ResolvedConstant),
    /// A branch instruction's target, as a signed offset from the start of
    /// the branch instruction itself (JVM spec §4.10.1.9 semantics). The
    /// normalized digest (`exprc-registry`) renders this opcode as `jump
    /// <opcode>` and ignores the payload — "no label, to stay
    /// label-offset-free" — but an interpreter walking the same stream
    /// needs the real target, so the offset is carried rather than erased.
    Branch(i16),
}

/// One decoded instruction at its byte offset. `offset` is not itself part
/// of the normalized digest (branch targets are rendered opcode-only
/// there), but a caller executing the stream needs it to resolve a
/// `Branch` operand to an absolute position (`offset + branch_offset`).
pub struct Instruction {
    /// Byte offset of this instruction's opcode within the method's code.
    pub offset: usize,
    /// The instruction's opcode.
    pub opcode: Opcode,
    /// Its operand, already classified by shape.
    pub operand: Operand,
}

/// Walk a method's `Code` bytes, yielding one [`Instruction`] per step.
/// Resolves constant-pool operands against `class` so callers never see
/// raw indices.
pub fn instructions<'a>(
    code: &'a [u8],
    class: &'a DecodedClass,
) -> impl Iterator<Item = Result<Instruction, DisasmError>> + 'a {
    InstructionIter { code, pos: 0, class }
}

struct InstructionIter<'a> {
    code: &'a [u8],
    pos: usize,
    class: &'a DecodedClass,
}

impl<'a> Iterator for InstructionIter<'a> {
    type Item = Result<Instruction, DisasmError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos >= self.code.len() {
            return None;
        }
        Some(self.step())
    }
}

impl<'a> InstructionIter<'a> {
    fn u8(&mut self) -> Result<u8, DisasmError> {
        let b = *self.code.get(self.pos).ok_or(DisasmError::Truncated)?;
        self.pos += 1;
        Ok(b)
    }

    fn u16(&mut self) -> Result<u16, DisasmError> {
        let hi = self.u8()? as u16;
        let lo = self.u8()? as u16;
        Ok((hi << 8) | lo)
    }

    fn step(&mut self) -> Result<Instruction, DisasmError> {
        let start = self.pos;
        let raw_op = self.u8()?;
        let opcode = Opcode::from_byte(raw_op).ok_or(DisasmError::Truncated)?;

        let operand = if opcode.is_branch() {
            let offset = self.u16()? as i16;
            Operand::Branch(offset)
        } else {
            use Opcode::*;
            match opcode {
                Iload | Lload | Fload | Dload | Aload | Istore | Lstore | Fstore | Dstore
                | Astore => Operand::Slot(self.u8()?),
                Iinc => {
                    let slot = self.u8()?;
                    let delta = self.u8()? as i8;
                    Operand::Iinc(slot, delta)
                }
                Bipush => Operand::Byte(self.u8()? as i8),
                Sipush => Operand::Short(self.u16()? as i16),
                Ldc => {
                    let idx = self.u8()? as u16;
                    Operand::Const(self.class.constant(idx).clone())
                }
                LdcW | Ldc2W => {
                    let idx = self.u16()?;
                    Operand::Const(self.class.constant(idx).clone())
                }
                Getfield | Putfield | Invokevirtual | Invokespecial | Invokestatic | New
                | Checkcast | Instanceof => {
                    let idx = self.u16()?;
                    Operand::Const(self.class.constant(idx).clone())
                }
                Invokeinterface => {
                    let idx = self.u16()?;
                    let _count = self.u8()?;
                    let _zero = self.u8()?;
                    Operand::Const(self.class.constant(idx).clone())
                }
                _ => Operand::None,
            }
        };

        Ok(Instruction { offset: start, opcode, operand })
    }
}

/// Build a cache keyed by `(class internal name, member name, descriptor)`
/// for resolved constants seen across a class's `Code` bodies — exposed
/// for callers (the registry's digest builder) that want to avoid
/// re-walking the pool per instruction; not used internally by `parse_class`
/// itself, which resolves eagerly.
pub type ConstantIndex = HashMap<(String, String, String), ResolvedConstant>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ClassFile, CodeBuilder, ConstantPool, FieldDef, MethodDef};

    fn sample_class() -> Vec<u8> {
        let mut constants = ConstantPool::new();
        let mut code = CodeBuilder::new(2);
        code.load(Opcode::Iload, 1);
        code.op(Opcode::Iconst1, 0, 1);
        code.op(Opcode::Iadd, 2, 1);
        code.return_op(Opcode::Ireturn, 1);
        let (bytes, max_stack, max_locals) = code.finish();

        let mut ctor_code = CodeBuilder::new(1);
        ctor_code.load(Opcode::Aload, 0);
        let object_init = constants.methodref("java/lang/Object", "<init>", "()V");
        ctor_code.invoke(Opcode::Invokespecial, object_init, "()V", true);
        ctor_code.return_op(Opcode::Return, 0);
        let (ctor_bytes, ctor_max_stack, ctor_max_locals) = ctor_code.finish();

        let class = ClassFile {
            constants,
            access_flags: crate::ACC_PUBLIC | crate::ACC_FINAL | crate::ACC_SUPER,
            this_class: "generated/Eval0".to_string(),
            super_class: "java/lang/Object".to_string(),
            interfaces: vec![],
            fields: Vec::<FieldDef>::new(),
            methods: vec![
                MethodDef {
                    access_flags: crate::ACC_PUBLIC_MEMBER,
                    name: "<init>".to_string(),
                    descriptor: "()V".to_string(),
                    code: ctor_bytes,
                    max_stack: ctor_max_stack,
                    max_locals: ctor_max_locals,
                },
                MethodDef {
                    access_flags: crate::ACC_PUBLIC_MEMBER,
                    name: "eval".to_string(),
                    descriptor: "(I)I".to_string(),
                    code: bytes,
                    max_stack,
                    max_locals,
                },
            ],
        };
        class.write()
    }

    #[test]
    fn round_trips_method_names_and_descriptors() {
        let bytes = sample_class();
        let decoded = parse_class(&bytes).unwrap();
        let eval = decoded.methods_named("eval").next().unwrap();
        assert_eq!(eval.descriptor, "(I)I");
    }

    #[test]
    fn decodes_instruction_stream_in_order() {
        let bytes = sample_class();
        let decoded = parse_class(&bytes).unwrap();
        let eval = decoded.methods_named("eval").next().unwrap();
        let ops: Vec<Opcode> = instructions(&eval.code, &decoded)
            .map(|i| i.unwrap().opcode)
            .collect();
        assert_eq!(ops, vec![Opcode::Iload, Opcode::Iconst1, Opcode::Iadd, Opcode::Ireturn]);
    }

    #[test]
    fn rejects_bad_magic() {
        assert_eq!(parse_class(&[0, 1, 2, 3]), Err(DisasmError::BadMagic));
    }
}
