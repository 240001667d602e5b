//! JVM constant pool: the class file's single namespace for every literal,
//! name, and symbolic reference, deduplicated by content exactly as the
//! target format requires (re-adding an equal entry returns the existing
//! index rather than growing the pool).

use std::collections::HashMap;

/// A single constant-pool entry. Variants mirror the JVM spec's `CONSTANT_*`
/// tags, restricted to the ones the direct emitter ever constructs.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Entry {
    Utf8(String),
    Integer(i32),
    Float(u32),
    Long(i64),
    Double(u64),
    Class { name_index: u16 },
    String { utf8_index: u16 },
    NameAndType { name_index: u16, descriptor_index: u16 },
    Fieldref { class_index: u16, nat_index: u16 },
    Methodref { class_index: u16, nat_index: u16 },
    InterfaceMethodref { class_index: u16, nat_index: u16 },
}

/// The class file's constant pool, 1-indexed per the JVM spec (index 0 is
/// reserved/unused). `Long`/`Double` entries additionally consume the
/// following index, per spec — callers never need to account for this
/// manually since every accessor returns the entry's own index.
#[derive(Debug, Default)]
pub struct ConstantPool {
    entries: Vec<Entry>,
    index_of: HashMap<Entry, u16>,
}

impl ConstantPool {
    /// Build an empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    fn intern(&mut self, entry: Entry) -> u16 {
        if let Some(&idx) = self.index_of.get(&entry) {
            return idx;
        }
        let wide = matches!(entry, Entry::Long(_) | Entry::Double(_));
        let idx = (self.entries.len() + 1) as u16;
        self.index_of.insert(entry.clone(), idx);
        self.entries.push(entry);
        if wide {
            // Long/Double occupy two pool slots; push a placeholder so
            // the next real entry lands on the correct index.
            self.entries.push(Entry::Utf8(String::new()));
        }
        idx
    }

    /// Intern a UTF-8 constant (class/method/field names, descriptors,
    /// string literal payloads).
    pub fn utf8(&mut self, s: &str) -> u16 {
        self.intern(Entry::Utf8(s.to_string()))
    }

    /// Intern an `int` constant.
    pub fn integer(&mut self, v: i32) -> u16 {
        self.intern(Entry::Integer(v))
    }

    /// Intern a `float` constant (bit pattern).
    pub fn float(&mut self, v: f32) -> u16 {
        self.intern(Entry::Float(v.to_bits()))
    }

    /// Intern a `long` constant.
    pub fn long(&mut self, v: i64) -> u16 {
        self.intern(Entry::Long(v))
    }

    /// Intern a `double` constant (bit pattern).
    pub fn double(&mut self, v: f64) -> u16 {
        self.intern(Entry::Double(v.to_bits()))
    }

    /// Intern a `String` literal constant, referencing an interned `Utf8`.
    pub fn string(&mut self, s: &str) -> u16 {
        let utf8_index = self.utf8(s);
        self.intern(Entry::String { utf8_index })
    }

    /// Intern a `Class` reference by internal (slash-separated) name.
    pub fn class(&mut self, internal_name: &str) -> u16 {
        let name_index = self.utf8(internal_name);
        self.intern(Entry::Class { name_index })
    }

    /// Intern a `NameAndType` pair.
    pub fn name_and_type(&mut self, name: &str, descriptor: &str) -> u16 {
        let name_index = self.utf8(name);
        let descriptor_index = self.utf8(descriptor);
        self.intern(Entry::NameAndType { name_index, descriptor_index })
    }

    /// Intern a field reference.
    pub fn fieldref(&mut self, owner_internal_name: &str, name: &str, descriptor: &str) -> u16 {
        let class_index = self.class(owner_internal_name);
        let nat_index = self.name_and_type(name, descriptor);
        self.intern(Entry::Fieldref { class_index, nat_index })
    }

    /// Intern a method reference for `invokevirtual`/`invokestatic`/`invokespecial`.
    pub fn methodref(&mut self, owner_internal_name: &str, name: &str, descriptor: &str) -> u16 {
        let class_index = self.class(owner_internal_name);
        let nat_index = self.name_and_type(name, descriptor);
        self.intern(Entry::Methodref { class_index, nat_index })
    }

    /// Intern an interface method reference for `invokeinterface`.
    pub fn interface_methodref(&mut self, owner_internal_name: &str, name: &str, descriptor: &str) -> u16 {
        let class_index = self.class(owner_internal_name);
        let nat_index = self.name_and_type(name, descriptor);
        self.intern(Entry::InterfaceMethodref { class_index, nat_index })
    }

    /// Number of pool slots used (including the reserved index 0 and the
    /// placeholder slots long/double entries occupy), i.e. the
    /// `constant_pool_count` field of the class file.
    pub fn count(&self) -> u16 {
        (self.entries.len() + 1) as u16
    }

    /// Serialize the pool body (not including `constant_pool_count`) in
    /// class-file byte order.
    pub fn write(&self, out: &mut Vec<u8>) {
        for entry in &self.entries {
            match entry {
                Entry::Utf8(s) if s.is_empty() && self.is_wide_placeholder(entry) => {
                    // placeholder slot following a Long/Double entry: no bytes
                }
                Entry::Utf8(s) => {
                    out.push(1);
                    out.extend_from_slice(&(s.len() as u16).to_be_bytes());
                    out.extend_from_slice(s.as_bytes());
                }
                Entry::Integer(v) => {
                    out.push(3);
                    out.extend_from_slice(&v.to_be_bytes());
                }
                Entry::Float(bits) => {
                    out.push(4);
                    out.extend_from_slice(&bits.to_be_bytes());
                }
                Entry::Long(v) => {
                    out.push(5);
                    out.extend_from_slice(&v.to_be_bytes());
                }
                Entry::Double(bits) => {
                    out.push(6);
                    out.extend_from_slice(&bits.to_be_bytes());
                }
                Entry::Class { name_index } => {
                    out.push(7);
                    out.extend_from_slice(&name_index.to_be_bytes());
                }
                Entry::String { utf8_index } => {
                    out.push(8);
                    out.extend_from_slice(&utf8_index.to_be_bytes());
                }
                Entry::Fieldref { class_index, nat_index } => {
                    out.push(9);
                    out.extend_from_slice(&class_index.to_be_bytes());
                    out.extend_from_slice(&nat_index.to_be_bytes());
                }
                Entry::Methodref { class_index, nat_index } => {
                    out.push(10);
                    out.extend_from_slice(&class_index.to_be_bytes());
                    out.extend_from_slice(&nat_index.to_be_bytes());
                }
                Entry::InterfaceMethodref { class_index, nat_index } => {
                    out.push(11);
                    out.extend_from_slice(&class_index.to_be_bytes());
                    out.extend_from_slice(&nat_index.to_be_bytes());
                }
                Entry::NameAndType { name_index, descriptor_index } => {
                    out.push(12);
                    out.extend_from_slice(&name_index.to_be_bytes());
                    out.extend_from_slice(&descriptor_index.to_be_bytes());
                }
            }
        }
    }

    fn is_wide_placeholder(&self, entry: &Entry) -> bool {
        // An empty-string Utf8 only ever occurs as the placeholder slot
        // this pool inserts after Long/Double; a real empty descriptor
        // string never occurs in practice for this emitter's use.
        matches!(entry, Entry::Utf8(s) if s.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_deduplicates_equal_utf8_entries() {
        let mut pool = ConstantPool::new();
        let a = pool.utf8("eval");
        let b = pool.utf8("eval");
        assert_eq!(a, b);
    }

    #[test]
    fn long_and_double_entries_occupy_two_slots() {
        let mut pool = ConstantPool::new();
        let before = pool.count();
        pool.long(42);
        let after_long = pool.count();
        assert_eq!(after_long - before, 2);
        pool.double(1.5);
        let after_double = pool.count();
        assert_eq!(after_double - after_long, 2);
    }

    #[test]
    fn methodref_chains_through_class_and_name_and_type() {
        let mut pool = ConstantPool::new();
        let mref = pool.methodref("java/lang/Math", "max", "(II)I");
        let mref_again = pool.methodref("java/lang/Math", "max", "(II)I");
        assert_eq!(mref, mref_again);
    }
}
