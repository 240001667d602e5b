//! Local variable slot table: slot 0 is the receiver,
//! slot 1 is the context parameter; every other declared name gets the
//! next free slot, with 64-bit primitives consuming two consecutive slots.
//! Slots are allocated at first declaration and never reused — the
//! emission algorithm is a single post-order walk with no block-scoped
//! slot recycling to reason about.

use exprc_types::TypeDescriptor;
use rustc_hash::FxHashMap;

/// Maps declared names to their allocated slot and resolved type.
pub struct SlotTable {
    slots: FxHashMap<String, (u16, TypeDescriptor)>,
    next_free: u16,
}

impl SlotTable {
    /// Build a slot table with slot 0 reserved for the receiver and slot 1
    /// for the context parameter (`context_name`, `context_type`); any
    /// other declarations are allocated afterward via [`Self::declare`].
    pub fn new(context_name: &str, context_type: TypeDescriptor) -> Self {
        let mut slots = FxHashMap::default();
        // slot 0: `this` (no declared name, tracked implicitly by the
        // emitter — not entered here since EIR never names the receiver).
        slots.insert(context_name.to_string(), (1, context_type));
        Self { slots, next_free: 2 }
    }

    /// Allocate (if not already declared) a slot for `name` of type `ty`,
    /// returning the assigned slot index. Re-declaring an existing name
    /// (shadowing within the same flat scope, which this DSL does not
    /// support) returns its existing slot.
    pub fn declare(&mut self, name: &str, ty: TypeDescriptor) -> u16 {
        if let Some((slot, _)) = self.slots.get(name) {
            return *slot;
        }
        let slot = self.next_free;
        let width = if ty.as_primitive().is_some_and(|p| p.is_wide()) { 2 } else { 1 };
        self.next_free += width;
        self.slots.insert(name.to_string(), (slot, ty));
        slot
    }

    /// Look up a previously declared name's slot and type.
    pub fn get(&self, name: &str) -> Option<(u16, &TypeDescriptor)> {
        self.slots.get(name).map(|(slot, ty)| (*slot, ty))
    }

    /// Total local slot count needed (`max_locals`), i.e. the next free
    /// slot after every declaration seen so far.
    pub fn max_locals(&self) -> u16 {
        self.next_free
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use exprc_types::PrimitiveTag;

    #[test]
    fn context_occupies_slot_one() {
        let table = SlotTable::new("ctx", TypeDescriptor::reference("java.util.Map"));
        assert_eq!(table.get("ctx").unwrap().0, 1);
        assert_eq!(table.max_locals(), 2);
    }

    #[test]
    fn wide_primitives_consume_two_slots() {
        let mut table = SlotTable::new("ctx", TypeDescriptor::reference("java.util.Map"));
        let a = table.declare("a", TypeDescriptor::Primitive(PrimitiveTag::Long));
        let b = table.declare("b", TypeDescriptor::Primitive(PrimitiveTag::Int));
        assert_eq!(a, 2);
        assert_eq!(b, 4);
    }

    #[test]
    fn redeclaring_the_same_name_reuses_its_slot() {
        let mut table = SlotTable::new("ctx", TypeDescriptor::reference("java.util.Map"));
        let a1 = table.declare("a", TypeDescriptor::Primitive(PrimitiveTag::Int));
        let a2 = table.declare("a", TypeDescriptor::Primitive(PrimitiveTag::Int));
        assert_eq!(a1, a2);
    }
}
