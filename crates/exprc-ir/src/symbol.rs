//! String interning for EIR names.

use rustc_hash::FxHashMap;
use std::num::NonZeroU32;

/// An interned name symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Symbol(NonZeroU32);

impl Symbol {
    #[inline]
    fn from_raw(raw: u32) -> Self {
        Symbol(NonZeroU32::new(raw + 1).unwrap())
    }

    #[inline]
    fn to_raw(self) -> usize {
        (self.0.get() - 1) as usize
    }
}

/// Deduplicating string table for identifiers referenced by the EIR
/// (variable names, field names, method names). Declaration-table lookups
/// and `NameRef` resolution both key off the same symbol, so comparison is
/// a cheap integer compare rather than a string compare.
#[derive(Clone, Default)]
pub struct Interner {
    map: FxHashMap<String, Symbol>,
    strings: Vec<String>,
}

impl Interner {
    /// Create a new empty interner.
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a name, returning its symbol. Re-interning the same string
    /// returns the same symbol.
    pub fn intern(&mut self, s: &str) -> Symbol {
        if let Some(&sym) = self.map.get(s) {
            return sym;
        }
        let sym = Symbol::from_raw(self.strings.len() as u32);
        self.strings.push(s.to_string());
        self.map.insert(s.to_string(), sym);
        sym
    }

    /// Resolve a symbol back to its string.
    #[inline]
    pub fn resolve(&self, sym: Symbol) -> &str {
        &self.strings[sym.to_raw()]
    }

    /// Number of unique interned strings.
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    /// Whether the interner holds no strings.
    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intern_deduplicates() {
        let mut interner = Interner::new();
        let a = interner.intern("influence");
        let b = interner.intern("stability");
        let c = interner.intern("influence");
        assert_eq!(a, c);
        assert_ne!(a, b);
        assert_eq!(interner.len(), 2);
        assert_eq!(interner.resolve(a), "influence");
    }
}
