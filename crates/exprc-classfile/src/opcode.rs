//! The subset of real JVM opcodes the direct emitter needs, with their
//! standard numeric values (JVM Spec §6.5) — unlike a custom bytecode
//! format's opcode space, this table is fixed by the target format, not
//! chosen by this workspace.

/// A single-byte JVM instruction opcode. Only the instructions the direct
/// emitter actually emits are named; the target format has
/// many more, but an emitter that never reaches for them doesn't need
/// their mnemonics cluttering this table.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    /// Push `null`.
    AconstNull = 0x01,
    /// Push int constant -1.
    IconstM1 = 0x02,
    /// Push int constant 0.
    Iconst0 = 0x03,
    /// Push int constant 1.
    Iconst1 = 0x04,
    /// Push int constant 2.
    Iconst2 = 0x05,
    /// Push int constant 3.
    Iconst3 = 0x06,
    /// Push int constant 4.
    Iconst4 = 0x07,
    /// Push int constant 5.
    Iconst5 = 0x08,
    /// Push long constant 0.
    Lconst0 = 0x09,
    /// Push long constant 1.
    Lconst1 = 0x0A,
    /// Push float constant 0.0.
    Fconst0 = 0x0B,
    /// Push float constant 1.0.
    Fconst1 = 0x0C,
    /// Push float constant 2.0.
    Fconst2 = 0x0D,
    /// Push double constant 0.0.
    Dconst0 = 0x0E,
    /// Push double constant 1.0.
    Dconst1 = 0x0F,
    /// Push byte, sign-extended to int (operand: i8).
    Bipush = 0x10,
    /// Push short, sign-extended to int (operand: i16).
    Sipush = 0x11,
    /// Push a constant-pool entry (operand: u8 index).
    Ldc = 0x12,
    /// Push a wide constant-pool entry (operand: u16 index).
    LdcW = 0x13,
    /// Push a long/double constant-pool entry (operand: u16 index).
    Ldc2W = 0x14,
    /// Load int local (operand: u8 slot).
    Iload = 0x15,
    /// Load long local (operand: u8 slot).
    Lload = 0x16,
    /// Load float local (operand: u8 slot).
    Fload = 0x17,
    /// Load double local (operand: u8 slot).
    Dload = 0x18,
    /// Load reference local (operand: u8 slot).
    Aload = 0x19,
    /// Store int local (operand: u8 slot).
    Istore = 0x36,
    /// Store long local (operand: u8 slot).
    Lstore = 0x37,
    /// Store float local (operand: u8 slot).
    Fstore = 0x38,
    /// Store double local (operand: u8 slot).
    Dstore = 0x39,
    /// Store reference local (operand: u8 slot).
    Astore = 0x3A,
    /// Pop top of stack (category 1).
    Pop = 0x57,
    /// Pop top two category-1 values, or one category-2 value.
    Pop2 = 0x58,
    /// Duplicate top of stack (category 1).
    Dup = 0x59,
    /// Duplicate the top category-2 value (long/double), or the top two
    /// category-1 values.
    Dup2 = 0x5C,
    /// Integer add.
    Iadd = 0x60,
    /// Long add.
    Ladd = 0x61,
    /// Float add.
    Fadd = 0x62,
    /// Double add.
    Dadd = 0x63,
    /// Integer subtract.
    Isub = 0x64,
    /// Long subtract.
    Lsub = 0x65,
    /// Float subtract.
    Fsub = 0x66,
    /// Double subtract.
    Dsub = 0x67,
    /// Integer multiply.
    Imul = 0x68,
    /// Long multiply.
    Lmul = 0x69,
    /// Float multiply.
    Fmul = 0x6A,
    /// Double multiply.
    Dmul = 0x6B,
    /// Integer divide.
    Idiv = 0x6C,
    /// Long divide.
    Ldiv = 0x6D,
    /// Float divide.
    Fdiv = 0x6E,
    /// Double divide.
    Ddiv = 0x6F,
    /// Integer remainder.
    Irem = 0x70,
    /// Long remainder.
    Lrem = 0x71,
    /// Float remainder.
    Frem = 0x72,
    /// Double remainder.
    Drem = 0x73,
    /// Integer negate.
    Ineg = 0x74,
    /// Long negate.
    Lneg = 0x75,
    /// Float negate.
    Fneg = 0x76,
    /// Double negate.
    Dneg = 0x77,
    /// Integer shift left.
    Ishl = 0x78,
    /// Long shift left.
    Lshl = 0x79,
    /// Integer arithmetic shift right.
    Ishr = 0x7A,
    /// Long arithmetic shift right.
    Lshr = 0x7B,
    /// Integer logical shift right.
    Iushr = 0x7C,
    /// Long logical shift right.
    Lushr = 0x7D,
    /// Integer bitwise and.
    Iand = 0x7E,
    /// Long bitwise and.
    Land = 0x7F,
    /// Integer bitwise or.
    Ior = 0x80,
    /// Long bitwise or.
    Lor = 0x81,
    /// Integer bitwise xor.
    Ixor = 0x82,
    /// Long bitwise xor.
    Lxor = 0x83,
    /// Increment int local by a constant (operand: u8 slot, i8 const).
    Iinc = 0x84,
    /// Widen int to long.
    I2l = 0x85,
    /// Widen int to float.
    I2f = 0x86,
    /// Widen int to double.
    I2d = 0x87,
    /// Narrow long to int.
    L2i = 0x88,
    /// Narrow/widen long to float.
    L2f = 0x89,
    /// Narrow/widen long to double.
    L2d = 0x8A,
    /// Narrow/widen float to int.
    F2i = 0x8B,
    /// Narrow/widen float to long.
    F2l = 0x8C,
    /// Widen float to double.
    F2d = 0x8D,
    /// Narrow double to int.
    D2i = 0x8E,
    /// Narrow double to long.
    D2l = 0x8F,
    /// Narrow double to float.
    D2f = 0x90,
    /// Narrow int to byte.
    I2b = 0x91,
    /// Narrow int to char.
    I2c = 0x92,
    /// Narrow int to short.
    I2s = 0x93,
    /// Long compare, pushes -1/0/1.
    Lcmp = 0x94,
    /// Float compare, NaN pushes 1 (used where NaN must compare "greater").
    Fcmpl = 0x95,
    /// Float compare, NaN pushes -1.
    Fcmpg = 0x96,
    /// Double compare, NaN pushes 1.
    Dcmpl = 0x97,
    /// Double compare, NaN pushes -1.
    Dcmpg = 0x98,
    /// Branch if int == 0.
    Ifeq = 0x99,
    /// Branch if int != 0.
    Ifne = 0x9A,
    /// Branch if int < 0.
    Iflt = 0x9B,
    /// Branch if int >= 0.
    Ifge = 0x9C,
    /// Branch if int > 0.
    Ifgt = 0x9D,
    /// Branch if int <= 0.
    Ifle = 0x9E,
    /// Branch if int == int.
    IfIcmpeq = 0x9F,
    /// Branch if int != int.
    IfIcmpne = 0xA0,
    /// Branch if int < int.
    IfIcmplt = 0xA1,
    /// Branch if int >= int.
    IfIcmpge = 0xA2,
    /// Branch if int > int.
    IfIcmpgt = 0xA3,
    /// Branch if int <= int.
    IfIcmple = 0xA4,
    /// Branch if reference == reference.
    IfAcmpeq = 0xA5,
    /// Branch if reference != reference.
    IfAcmpne = 0xA6,
    /// Unconditional branch.
    Goto = 0xA7,
    /// Return int (or boolean/byte/char/short) from method.
    Ireturn = 0xAC,
    /// Return long.
    Lreturn = 0xAD,
    /// Return float.
    Freturn = 0xAE,
    /// Return double.
    Dreturn = 0xAF,
    /// Return reference.
    Areturn = 0xB0,
    /// Return void.
    Return = 0xB1,
    /// Fetch field from object (operand: u16 fieldref).
    Getfield = 0xB4,
    /// Store field in object (operand: u16 fieldref).
    Putfield = 0xB5,
    /// Invoke instance method (virtual dispatch, operand: u16 methodref).
    Invokevirtual = 0xB6,
    /// Invoke instance method (direct dispatch, operand: u16 methodref).
    Invokespecial = 0xB7,
    /// Invoke a class (static) method (operand: u16 methodref).
    Invokestatic = 0xB8,
    /// Invoke an interface method (operand: u16 methodref, u8 count, 0).
    Invokeinterface = 0xB9,
    /// Create a new object of a class (operand: u16 class index).
    New = 0xBB,
    /// Check that an object is of a given type (operand: u16 class index).
    Checkcast = 0xC0,
    /// Test whether an object is of a given type (operand: u16 class index).
    Instanceof = 0xC1,
}

impl Opcode {
    /// Raw byte value.
    pub fn byte(self) -> u8 {
        self as u8
    }

    /// Whether this opcode consumes a 2-byte signed branch offset operand.
    pub fn is_branch(self) -> bool {
        matches!(
            self,
            Opcode::Ifeq
                | Opcode::Ifne
                | Opcode::Iflt
                | Opcode::Ifge
                | Opcode::Ifgt
                | Opcode::Ifle
                | Opcode::IfIcmpeq
                | Opcode::IfIcmpne
                | Opcode::IfIcmplt
                | Opcode::IfIcmpge
                | Opcode::IfIcmpgt
                | Opcode::IfIcmple
                | Opcode::IfAcmpeq
                | Opcode::IfAcmpne
                | Opcode::Goto
        )
    }

    /// Reverse lookup from a raw instruction byte, for the disassembler
    /// (`exprc-registry`'s normalized bytecode digest walks real class
    /// bytes, so it needs to decode them back into the same enum the
    /// writer emits from).
    pub fn from_byte(b: u8) -> Option<Opcode> {
        use Opcode::*;
        const TABLE: &[Opcode] = &[
            AconstNull, IconstM1, Iconst0, Iconst1, Iconst2, Iconst3, Iconst4, Iconst5, Lconst0,
            Lconst1, Fconst0, Fconst1, Fconst2, Dconst0, Dconst1, Bipush, Sipush, Ldc, LdcW,
            Ldc2W, Iload, Lload, Fload, Dload, Aload, Istore, Lstore, Fstore, Dstore, Astore, Pop,
            Pop2, Dup, Dup2, Iadd, Ladd, Fadd, Dadd, Isub, Lsub, Fsub, Dsub, Imul, Lmul, Fmul,
            Dmul, Idiv, Ldiv, Fdiv, Ddiv, Irem, Lrem, Frem, Drem, Ineg, Lneg, Fneg, Dneg, Ishl,
            Lshl, Ishr, Lshr, Iushr, Lushr, Iand, Land, Ior, Lor, Ixor, Lxor, Iinc, I2l, I2f, I2d,
            L2i, L2f, L2d, F2i, F2l, F2d, D2i, D2l, D2f, I2b, I2c, I2s, Lcmp, Fcmpl, Fcmpg, Dcmpl,
            Dcmpg, Ifeq, Ifne, Iflt, Ifge, Ifgt, Ifle, IfIcmpeq, IfIcmpne, IfIcmplt, IfIcmpge,
            IfIcmpgt, IfIcmple, IfAcmpeq, IfAcmpne, Goto, Ireturn, Lreturn, Freturn, Dreturn,
            Areturn, Return, Getfield, Putfield, Invokevirtual, Invokespecial, Invokestatic,
            Invokeinterface, New, Checkcast, Instanceof,
        ];
        TABLE.iter().copied().find(|op| op.byte() == b)
    }

    /// The instruction's mnemonic text, used verbatim by the registry's
    /// normalized-digest rendering for opcodes that carry no operand —
    /// stack, conversion, return, and arithmetic operators render as just
    /// the opcode name.
    pub fn mnemonic(self) -> &'static str {
        use Opcode::*;
        match self {
            AconstNull => "ACONST_NULL",
            IconstM1 => "ICONST_M1",
            Iconst0 => "ICONST_0",
            Iconst1 => "ICONST_1",
            Iconst2 => "ICONST_2",
            Iconst3 => "ICONST_3",
            Iconst4 => "ICONST_4",
            Iconst5 => "ICONST_5",
            Lconst0 => "LCONST_0",
            Lconst1 => "LCONST_1",
            Fconst0 => "FCONST_0",
            Fconst1 => "FCONST_1",
            Fconst2 => "FCONST_2",
            Dconst0 => "DCONST_0",
            Dconst1 => "DCONST_1",
            Bipush => "BIPUSH",
            Sipush => "SIPUSH",
            Ldc => "LDC",
            LdcW => "LDC_W",
            Ldc2W => "LDC2_W",
            Iload => "ILOAD",
            Lload => "LLOAD",
            Fload => "FLOAD",
            Dload => "DLOAD",
            Aload => "ALOAD",
            Istore => "ISTORE",
            Lstore => "LSTORE",
            Fstore => "FSTORE",
            Dstore => "DSTORE",
            Astore => "ASTORE",
            Pop => "POP",
            Pop2 => "POP2",
            Dup => "DUP",
            Dup2 => "DUP2",
            Iadd => "IADD",
            Ladd => "LADD",
            Fadd => "FADD",
            Dadd => "DADD",
            Isub => "ISUB",
            Lsub => "LSUB",
            Fsub => "FSUB",
            Dsub => "DSUB",
            Imul => "IMUL",
            Lmul => "LMUL",
            Fmul => "FMUL",
            Dmul => "DMUL",
            Idiv => "IDIV",
            Ldiv => "LDIV",
            Fdiv => "FDIV",
            Ddiv => "DDIV",
            Irem => "IREM",
            Lrem => "LREM",
            Frem => "FREM",
            Drem => "DREM",
            Ineg => "INEG",
            Lneg => "LNEG",
            Fneg => "FNEG",
            Dneg => "DNEG",
            Ishl => "ISHL",
            Lshl => "LSHL",
            Ishr => "ISHR",
            Lshr => "LSHR",
            Iushr => "IUSHR",
            Lushr => "LUSHR",
            Iand => "IAND",
            Land => "LAND",
            Ior => "IOR",
            Lor => "LOR",
            Ixor => "IXOR",
            Lxor => "LXOR",
            Iinc => "IINC",
            I2l => "I2L",
            I2f => "I2F",
            I2d => "I2D",
            L2i => "L2I",
            L2f => "L2F",
            L2d => "L2D",
            F2i => "F2I",
            F2l => "F2L",
            F2d => "F2D",
            D2i => "D2I",
            D2l => "D2L",
            D2f => "D2F",
            I2b => "I2B",
            I2c => "I2C",
            I2s => "I2S",
            Lcmp => "LCMP",
            Fcmpl => "FCMPL",
            Fcmpg => "FCMPG",
            Dcmpl => "DCMPL",
            Dcmpg => "DCMPG",
            Ifeq => "IFEQ",
            Ifne => "IFNE",
            Iflt => "IFLT",
            Ifge => "IFGE",
            Ifgt => "IFGT",
            Ifle => "IFLE",
            IfIcmpeq => "IF_ICMPEQ",
            IfIcmpne => "IF_ICMPNE",
            IfIcmplt => "IF_ICMPLT",
            IfIcmpge => "IF_ICMPGE",
            IfIcmpgt => "IF_ICMPGT",
            IfIcmple => "IF_ICMPLE",
            IfAcmpeq => "IF_ACMPEQ",
            IfAcmpne => "IF_ACMPNE",
            Goto => "GOTO",
            Ireturn => "IRETURN",
            Lreturn => "LRETURN",
            Freturn => "FRETURN",
            Dreturn => "DRETURN",
            Areturn => "ARETURN",
            Return => "RETURN",
            Getfield => "GETFIELD",
            Putfield => "PUTFIELD",
            Invokevirtual => "INVOKEVIRTUAL",
            Invokespecial => "INVOKESPECIAL",
            Invokestatic => "INVOKESTATIC",
            Invokeinterface => "INVOKEINTERFACE",
            New => "NEW",
            Checkcast => "CHECKCAST",
            Instanceof => "INSTANCEOF",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_values_match_jvm_spec() {
        assert_eq!(Opcode::Iadd.byte(), 0x60);
        assert_eq!(Opcode::Invokevirtual.byte(), 0xB6);
        assert_eq!(Opcode::Areturn.byte(), 0xB0);
    }

    #[test]
    fn branch_opcodes_are_identified() {
        assert!(Opcode::IfIcmpge.is_branch());
        assert!(!Opcode::Iadd.is_branch());
    }
}
