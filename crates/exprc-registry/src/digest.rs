//! Normalized bytecode digest: walk a method's
//! instructions in order, render each one per its own per-opcode-class
//! rule, and hash the UTF-8 encoding of the resulting text with
//! Murmur3-128. Line numbers, local-variable debug names, and labels
//! never appear in a class this crate's sibling `exprc-classfile` writes,
//! so there is nothing to strip here — only branch targets need erasing,
//! which `exprc_classfile::disasm` already does by decoding a branch's
//! operand as [`exprc_classfile::Operand::Branch`] rather than the raw
//! offset.

use exprc_classfile::{instructions, DecodedClass, DecodedMethod, Opcode, Operand, ResolvedConstant};
use std::io::Cursor;

/// A 128-bit content digest plus the normalized string it was computed
/// from. Equality of digest AND equality of the normalized string
/// (collision guard) together constitute the identity key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodDigest {
    /// Murmur3-128 hash of `normalized`.
    pub hash: u128,
    /// The per-instruction normalized text the hash was computed over.
    pub normalized: String,
}

/// Render and hash the named method's body. `None` if the class carries
/// no method of that name (the registry falls back to a whole-class
/// digest in that case — see [`crate::ClassDigest::compute`]).
pub fn digest_method(class: &DecodedClass, method_name: &str) -> Option<MethodDigest> {
    let method = class.methods_named(method_name).next()?;
    Some(digest_for(class, method))
}

fn digest_for(class: &DecodedClass, method: &DecodedMethod) -> MethodDigest {
    let mut lines = Vec::new();
    for instr in instructions(&method.code, class) {
        // A malformed instruction stream here would mean this crate wrote
        // bytes its own disassembler can't read back — a bug in the
        // writer, not a recoverable registry condition.
        let instr = instr.expect("registry digest: malformed instruction in self-produced class");
        lines.push(render_instruction(&instr.opcode, &instr.operand));
    }
    let normalized = lines.join("\n");
    let hash = murmur3_128(normalized.as_bytes());
    MethodDigest { hash, normalized }
}

/// Hash arbitrary bytes directly — used for classes with no `eval` method
/// (fallback-compiled helper classes) where there is no single method
/// body to normalize, so the whole class-file byte sequence stands in.
pub fn digest_bytes(bytes: &[u8]) -> u128 {
    murmur3_128(bytes)
}

fn murmur3_128(bytes: &[u8]) -> u128 {
    murmur3::murmur3_x64_128(&mut Cursor::new(bytes), 0)
        .expect("murmur3 hashing over an in-memory buffer cannot fail")
}

fn render_instruction(opcode: &Opcode, operand: &Operand) -> String {
    match operand {
        Operand::None => match implicit_const(*opcode) {
            Some(value) => format!("const {value}"),
            None => opcode.mnemonic().to_string(),
        },
        Operand::Slot(slot) => format!("{} {slot}", opcode.mnemonic()),
        Operand::Iinc(slot, delta) => format!("IINC {slot} {delta}"),
        Operand::Byte(b) => format!("const {b}"),
        Operand::Short(s) => format!("const {s}"),
        Operand::Const(c) => render_const(*opcode, c),
        Operand::Branch(_) => format!("jump {}", opcode.mnemonic()),
    }
}

/// The value an `iconst_*`/`lconst_*`/`fconst_*`/`dconst_*`/`aconst_null`
/// opcode pushes implicitly (no operand bytes at all — the value is
/// baked into the opcode itself).
fn implicit_const(opcode: Opcode) -> Option<&'static str> {
    use Opcode::*;
    Some(match opcode {
        AconstNull => "null",
        IconstM1 => "-1",
        Iconst0 => "0",
        Iconst1 => "1",
        Iconst2 => "2",
        Iconst3 => "3",
        Iconst4 => "4",
        Iconst5 => "5",
        Lconst0 => "0L",
        Lconst1 => "1L",
        Fconst0 => "0.0f",
        Fconst1 => "1.0f",
        Fconst2 => "2.0f",
        Dconst0 => "0.0",
        Dconst1 => "1.0",
        _ => return None,
    })
}

fn render_const(opcode: Opcode, c: &ResolvedConstant) -> String {
    use Opcode::*;
    match opcode {
        Ldc | LdcW | Ldc2W => format!("const {}", render_const_value(c)),
        Getfield | Putfield => match c {
            ResolvedConstant::Fieldref { owner, name, descriptor } => {
                format!("{} {owner}.{name}{descriptor}", opcode.mnemonic())
            }
            other => unreachable!("{opcode:?} carries a non-fieldref constant: {other:?}"),
        },
        Invokevirtual | Invokespecial | Invokestatic | Invokeinterface => match c {
            ResolvedConstant::Methodref { owner, name, descriptor }
            | ResolvedConstant::InterfaceMethodref { owner, name, descriptor } => {
                format!("{} {owner}.{name}{descriptor}", opcode.mnemonic())
            }
            other => unreachable!("{opcode:?} carries a non-methodref constant: {other:?}"),
        },
        New | Checkcast | Instanceof => match c {
            ResolvedConstant::Class(name) => format!("{} {name}", opcode.mnemonic()),
            other => unreachable!("{opcode:?} carries a non-class constant: {other:?}"),
        },
        other => unreachable!("{other:?} does not carry a resolved constant operand"),
    }
}

fn render_const_value(c: &ResolvedConstant) -> String {
    match c {
        ResolvedConstant::Integer(v) => v.to_string(),
        ResolvedConstant::Float(bits) => f32::from_bits(*bits).to_string(),
        ResolvedConstant::Long(v) => v.to_string(),
        ResolvedConstant::Double(bits) => f64::from_bits(*bits).to_string(),
        ResolvedConstant::StringRef(s) => format!("{s:?}"),
        ResolvedConstant::Class(name) => name.clone(),
        other => unreachable!("constant-pool entry {other:?} cannot be an `ldc` operand"),
    }
}
