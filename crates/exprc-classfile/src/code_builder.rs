//! `CodeBuilder`: the emitter's imperative instruction-stream API. Tracks
//! bytecode bytes, a label table for forward/backward branches, and
//! running/maximum operand-stack depth so
//! the class writer can fill in `Code` attribute's `max_stack` without a
//! second pass over the instructions.

use crate::opcode::Opcode;

/// An unbound branch target. Allocated with [`CodeBuilder::new_label`],
/// bound exactly once with [`CodeBuilder::bind_label`] before
/// [`CodeBuilder::finish`] is called.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Label(usize);

struct PendingBranch {
    /// Byte offset of the 2-byte operand to patch (immediately after the
    /// opcode byte).
    operand_at: usize,
    target: Label,
}

/// Accumulates one method's `Code` attribute body.
pub struct CodeBuilder {
    bytes: Vec<u8>,
    labels: Vec<Option<usize>>,
    pending: Vec<PendingBranch>,
    stack: i32,
    max_stack: i32,
    max_locals: u16,
}

impl CodeBuilder {
    /// Start an empty code builder. `max_locals` is known up front from the
    /// emitter's slot table ("Local slot table"), since slots
    /// are allocated before any code is emitted.
    pub fn new(max_locals: u16) -> Self {
        Self {
            bytes: Vec::new(),
            labels: Vec::new(),
            pending: Vec::new(),
            stack: 0,
            max_stack: 0,
            max_locals,
        }
    }

    /// Current emitted length, usable as a raw jump target for loops that
    /// branch to a point already emitted (not yet needed by straight-line
    /// control flow, but exposed for completeness).
    pub fn position(&self) -> usize {
        self.bytes.len()
    }

    /// Allocate a new, as-yet-unbound label.
    pub fn new_label(&mut self) -> Label {
        self.labels.push(None);
        Label(self.labels.len() - 1)
    }

    /// Bind a label to the current emission position. Must be called
    /// exactly once per label before [`Self::finish`].
    pub fn bind_label(&mut self, label: Label) {
        self.labels[label.0] = Some(self.bytes.len());
    }

    fn note(&mut self, pop: i32, push: i32) {
        self.stack -= pop;
        debug_assert!(self.stack >= 0, "operand stack underflow during emission");
        self.stack += push;
        if self.stack > self.max_stack {
            self.max_stack = self.stack;
        }
    }

    fn push_u8(&mut self, op: Opcode, operand: u8) {
        self.bytes.push(op.byte());
        self.bytes.push(operand);
    }

    fn push_u16(&mut self, op: Opcode, operand: u16) {
        self.bytes.push(op.byte());
        self.bytes.extend_from_slice(&operand.to_be_bytes());
    }

    /// Emit a bare opcode with no operand bytes, noting its stack effect.
    pub fn op(&mut self, op: Opcode, pop: i32, push: i32) {
        self.bytes.push(op.byte());
        self.note(pop, push);
    }

    /// `bipush`/`sipush`-style narrow int push.
    pub fn push_byte(&mut self, value: i8) {
        self.push_u8(Opcode::Bipush, value as u8);
        self.note(0, 1);
    }

    /// `sipush`.
    pub fn push_short(&mut self, value: i16) {
        self.bytes.push(Opcode::Sipush.byte());
        self.bytes.extend_from_slice(&value.to_be_bytes());
        self.note(0, 1);
    }

    /// `ldc`/`ldc_w` of a single-slot constant-pool entry.
    pub fn ldc(&mut self, pool_index: u16) {
        if pool_index <= 0xFF {
            self.push_u8(Opcode::Ldc, pool_index as u8);
        } else {
            self.push_u16(Opcode::LdcW, pool_index);
        }
        self.note(0, 1);
    }

    /// `ldc2_w` of a wide (long/double) constant-pool entry.
    pub fn ldc2_w(&mut self, pool_index: u16) {
        self.push_u16(Opcode::Ldc2W, pool_index);
        self.note(0, 2);
    }

    /// Load a local variable (category 1: int/float/reference).
    pub fn load(&mut self, op: Opcode, slot: u8) {
        self.push_u8(op, slot);
        self.note(0, 1);
    }

    /// Load a local variable (category 2: long/double) — pushes two stack
    /// words.
    pub fn load_wide(&mut self, op: Opcode, slot: u8) {
        self.push_u8(op, slot);
        self.note(0, 2);
    }

    /// Store a local variable (category 1).
    pub fn store(&mut self, op: Opcode, slot: u8) {
        self.push_u8(op, slot);
        self.note(1, 0);
    }

    /// Store a local variable (category 2).
    pub fn store_wide(&mut self, op: Opcode, slot: u8) {
        self.push_u8(op, slot);
        self.note(2, 0);
    }

    /// `iinc` — increments a local in place without touching the stack.
    pub fn iinc(&mut self, slot: u8, delta: i8) {
        self.bytes.push(Opcode::Iinc.byte());
        self.bytes.push(slot);
        self.bytes.push(delta as u8);
    }

    /// A 2-operand branch instruction (`ifeq`, `if_icmpge`, `goto`, ...).
    /// The operand is patched to the label's bound offset at
    /// [`Self::finish`].
    pub fn branch(&mut self, op: Opcode, target: Label, pop: i32) {
        debug_assert!(op.is_branch());
        self.bytes.push(op.byte());
        let operand_at = self.bytes.len();
        self.bytes.extend_from_slice(&[0, 0]);
        self.pending.push(PendingBranch { operand_at, target });
        self.note(pop, 0);
    }

    /// `invokestatic`/`invokevirtual`/`invokespecial` — `descriptor` drives
    /// the stack effect (argument slots popped, return slots pushed);
    /// `has_receiver` additionally pops the receiver for instance calls.
    pub fn invoke(&mut self, op: Opcode, methodref_index: u16, descriptor: &str, has_receiver: bool) {
        self.push_u16(op, methodref_index);
        let (arg_slots, ret_slots) = descriptor_stack_effect(descriptor);
        let pop = arg_slots + if has_receiver { 1 } else { 0 };
        self.note(pop, ret_slots);
    }

    /// `invokeinterface` — carries an extra `count`/`0` operand pair beyond
    /// the methodref index (JVM spec §6.5 `invokeinterface`).
    pub fn invoke_interface(&mut self, methodref_index: u16, descriptor: &str, arg_count: u8) {
        self.bytes.push(Opcode::Invokeinterface.byte());
        self.bytes.extend_from_slice(&methodref_index.to_be_bytes());
        self.bytes.push(arg_count);
        self.bytes.push(0);
        let (arg_slots, ret_slots) = descriptor_stack_effect(descriptor);
        self.note(arg_slots + 1, ret_slots);
    }

    /// `getfield`/`putfield`/`getstatic`/`putstatic`-style field access.
    pub fn field(&mut self, op: Opcode, fieldref_index: u16, pop: i32, push: i32) {
        self.push_u16(op, fieldref_index);
        self.note(pop, push);
    }

    /// `new` — pushes an uninitialized object reference.
    pub fn new_object(&mut self, class_index: u16) {
        self.push_u16(Opcode::New, class_index);
        self.note(0, 1);
    }

    /// `checkcast`/`instanceof` — stack neutral except `instanceof`, whose
    /// caller passes `pop`/`push` accordingly.
    pub fn type_check(&mut self, op: Opcode, class_index: u16, pop: i32, push: i32) {
        self.push_u16(op, class_index);
        self.note(pop, push);
    }

    /// `dup` — category-1 duplicate.
    pub fn dup(&mut self) {
        self.op(Opcode::Dup, 0, 1);
        // note() already accounted pop 0 push 1, but semantically dup pops
        // nothing and pushes a copy of the existing top; push reflects the
        // net stack growth of +1 correctly.
    }

    /// `dup2` — category-2 duplicate (a long/double, kept whole).
    pub fn dup2(&mut self) {
        self.op(Opcode::Dup2, 0, 2);
    }

    /// A return instruction carrying `slots` words off the stack (0 for
    /// `void`, 1 for int/float/reference, 2 for long/double).
    pub fn return_op(&mut self, op: Opcode, slots: i32) {
        self.op(op, slots, 0);
    }

    /// Finalize the method body: patch every branch operand to its bound
    /// label's offset (relative to the branch instruction's own opcode
    /// byte, per JVM spec §6.5), and return the bytes plus computed
    /// `max_stack`/`max_locals`.
    ///
    /// # Panics
    /// Panics if a label was allocated but never bound — that is an
    /// emitter bug (every `new_label` the emission algorithm creates is
    /// reachable exactly once from a control-flow construct that always
    /// binds it).
    pub fn finish(mut self) -> (Vec<u8>, u16, u16) {
        for pending in &self.pending {
            let target = self.labels[pending.target.0]
                .unwrap_or_else(|| panic!("label {:?} bound to no position", pending.target));
            let branch_at = pending.operand_at - 1;
            let offset = target as i64 - branch_at as i64;
            let offset = offset as i16;
            self.bytes[pending.operand_at..pending.operand_at + 2]
                .copy_from_slice(&offset.to_be_bytes());
        }
        (self.bytes, self.max_stack.max(1) as u16, self.max_locals)
    }
}

/// Parse a JVM method descriptor's parameter slot count and return slot
/// count (0 void, 1 category-1, 2 category-2), without needing the full
/// descriptor grammar — just enough to track `maxStack` during emission.
fn descriptor_stack_effect(descriptor: &str) -> (i32, i32) {
    let (params, ret) = descriptor
        .strip_prefix('(')
        .and_then(|rest| rest.split_once(')'))
        .unwrap_or(("", ""));
    let mut arg_slots = 0;
    let mut chars = params.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            'J' | 'D' => arg_slots += 2,
            'L' => {
                while chars.next_if(|&c| c != ';').is_some() {}
                chars.next(); // consume ';'
                arg_slots += 1;
            }
            '[' => {
                while chars.next_if(|&c| c == '[').is_some() {}
                match chars.next() {
                    Some('L') => {
                        while chars.next_if(|&c| c != ';').is_some() {}
                        chars.next();
                    }
                    _ => {}
                }
                arg_slots += 1;
            }
            _ => arg_slots += 1,
        }
    }
    let ret_slots = match ret {
        "V" => 0,
        "J" | "D" => 2,
        _ => 1,
    };
    (arg_slots, ret_slots)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptor_stack_effect_counts_wide_args_as_two_slots() {
        assert_eq!(descriptor_stack_effect("(IJLjava/lang/String;)Z"), (4, 1));
        assert_eq!(descriptor_stack_effect("()V"), (0, 0));
        assert_eq!(descriptor_stack_effect("()D"), (0, 2));
    }

    #[test]
    fn branch_offset_is_relative_to_opcode_byte() {
        let mut b = CodeBuilder::new(2);
        let end = b.new_label();
        b.load(Opcode::Iload, 0);
        b.branch(Opcode::Ifeq, end, 1);
        b.op(Opcode::Iconst1, 0, 1);
        b.bind_label(end);
        let (bytes, _max_stack, _max_locals) = b.finish();
        // ifeq opcode at index 2, operand at 3..5, branch target is the
        // bind position (index 6): offset = 6 - 2 = 4.
        assert_eq!(bytes[2], Opcode::Ifeq.byte());
        let offset = i16::from_be_bytes([bytes[3], bytes[4]]);
        assert_eq!(offset, 4);
    }

    #[test]
    fn max_stack_tracks_peak_depth() {
        let mut b = CodeBuilder::new(1);
        b.op(Opcode::Iconst1, 0, 1);
        b.op(Opcode::Iconst2, 0, 1);
        b.op(Opcode::Iadd, 2, 1);
        let (_bytes, max_stack, _max_locals) = b.finish();
        assert_eq!(max_stack, 2);
    }
}
