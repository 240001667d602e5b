//! The runtime class registry (component E): accepts
//! `{name, bytes}` maps, deduplicates by normalized bytecode digest, and
//! caches `Class` handles keyed by fully qualified name. No real class
//! loader exists in this workspace, so "defining a class" here means
//! parsing it once with `exprc_classfile::disasm` and keeping the decoded
//! form plus its raw bytes alive behind an `Arc` — whatever stands in for
//! the JVM's defining loader on the caller's side of `exprc` does the
//! actual loading.

use crate::digest::{digest_bytes, digest_method, MethodDigest};
use crate::error::DefineError;
use dashmap::DashMap;
use exprc_classfile::{parse_class, DecodedClass};
use std::collections::BTreeMap;
use std::sync::Arc;

/// A class that has been defined into the registry: its bytes, its decoded
/// form (for an interpreter or further introspection), and the digest it
/// was deduplicated on.
#[derive(Debug)]
pub struct LoadedClass {
    /// Fully qualified (slash-separated) class name.
    pub name: String,
    /// The exact bytes that won the race to define this digest — the
    /// first definer to install its class in the registry is the one
    /// whose class is returned to every caller.
    pub bytes: Vec<u8>,
    /// The class, already parsed once so repeated lookups never re-parse.
    pub decoded: DecodedClass,
}

/// A secondary hash of the normalized string, used only as a cheap
/// discriminator inside the `(digest, secondary)` entry key — the
/// collision guard is the normalized string itself, which this
/// crate stores alongside and compares on insert.
fn secondary_hash(normalized: &str) -> u64 {
    use std::hash::{Hash, Hasher};
    let mut hasher = rustc_hash::FxHasher::default();
    normalized.hash(&mut hasher);
    hasher.finish()
}

struct Entry {
    normalized: String,
    class: Arc<LoadedClass>,
}

/// Deduplicating, concurrently-accessible class registry. `define` and
/// `lookup` tolerate concurrent callers without torn reads;
/// a race between two `define` calls for equal digests resolves to one
/// surviving class, with the loser's bytes discarded.
#[derive(Default)]
pub struct Registry {
    entries: DashMap<(u128, u64), Entry>,
    by_name: DashMap<String, Arc<LoadedClass>>,
}

impl Registry {
    /// Build an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Define every `{name: bytes}` pair, deduplicating each by its
    /// normalized `eval` digest (or, for a class with no `eval` method —
    /// a fallback-compiled helper class — by the whole-class byte
    /// sequence). Returns the resulting `Class` handle per name, in the
    /// same order `classes` was given.
    pub fn define(&self, classes: BTreeMap<String, Vec<u8>>) -> Result<Vec<Arc<LoadedClass>>, DefineError> {
        let mut out = Vec::with_capacity(classes.len());
        for (name, bytes) in classes {
            out.push(self.define_one(name, bytes)?);
        }
        Ok(out)
    }

    fn define_one(&self, name: String, bytes: Vec<u8>) -> Result<Arc<LoadedClass>, DefineError> {
        let decoded = parse_class(&bytes).map_err(|source| DefineError::Malformed { class_name: name.clone(), source })?;

        let MethodDigest { hash, normalized } = match digest_method(&decoded, "eval") {
            Some(d) => d,
            None => MethodDigest { hash: digest_bytes(&bytes), normalized: String::new() },
        };
        let key = (hash, secondary_hash(&normalized));

        let class = match self.entries.entry(key) {
            dashmap::mapref::entry::Entry::Occupied(existing) => {
                let existing = existing.get();
                if existing.normalized != normalized {
                    tracing::warn!(class_name = %name, "murmur3 digest collision with distinct normalized bytecode");
                }
                tracing::debug!(class_name = %name, "reusing previously defined class for equal digest");
                Arc::clone(&existing.class)
            }
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                let loaded = Arc::new(LoadedClass { name: name.clone(), bytes, decoded });
                slot.insert(Entry { normalized, class: Arc::clone(&loaded) });
                tracing::debug!(class_name = %name, "defined new class");
                loaded
            }
        };

        self.by_name.insert(name, Arc::clone(&class));
        Ok(class)
    }

    /// Exact name lookup.
    pub fn lookup(&self, name: &str) -> Option<Arc<LoadedClass>> {
        self.by_name.get(name).map(|entry| Arc::clone(entry.value()))
    }

    /// Number of distinct classes currently defined (post-dedup). Test
    /// and introspection use only.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the registry currently holds no classes.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Every name a class has been defined under, regardless of dedup
    /// (two names may map to the same underlying class). Test and
    /// introspection use only.
    pub fn defined_names(&self) -> Vec<String> {
        self.by_name.iter().map(|e| e.key().clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use exprc_classfile::{ClassFile, CodeBuilder, ConstantPool, FieldDef, MethodDef, Opcode};

    fn eval_class(name: &str) -> Vec<u8> {
        let mut constants = ConstantPool::new();
        let mut code = CodeBuilder::new(2);
        code.load(Opcode::Iload, 1);
        code.op(Opcode::Iconst1, 0, 1);
        code.op(Opcode::Iadd, 2, 1);
        code.return_op(Opcode::Ireturn, 1);
        let (bytes, max_stack, max_locals) = code.finish();
        let ctor = {
            let mut c = CodeBuilder::new(1);
            c.load(Opcode::Aload, 0);
            let object_init = constants.methodref("java/lang/Object", "<init>", "()V");
            c.invoke(Opcode::Invokespecial, object_init, "()V", true);
            c.return_op(Opcode::Return, 0);
            c.finish()
        };
        let class = ClassFile {
            constants,
            access_flags: exprc_classfile::ACC_PUBLIC | exprc_classfile::ACC_FINAL | exprc_classfile::ACC_SUPER,
            this_class: name.to_string(),
            super_class: "java/lang/Object".to_string(),
            interfaces: vec![],
            fields: Vec::<FieldDef>::new(),
            methods: vec![
                MethodDef {
                    access_flags: exprc_classfile::ACC_PUBLIC_MEMBER,
                    name: "<init>".to_string(),
                    descriptor: "()V".to_string(),
                    code: ctor.0,
                    max_stack: ctor.1,
                    max_locals: ctor.2,
                },
                MethodDef {
                    access_flags: exprc_classfile::ACC_PUBLIC_MEMBER,
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
    fn define_is_idempotent_for_equal_bytes() {
        let registry = Registry::new();
        let bytes = eval_class("generated/Eval0");
        registry.define(BTreeMap::from([("generated/Eval0".to_string(), bytes.clone())])).unwrap();
        registry.define(BTreeMap::from([("generated/Eval0".to_string(), bytes)])).unwrap();
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn two_names_with_equal_bytecode_share_one_class() {
        let registry = Registry::new();
        let a = registry
            .define(BTreeMap::from([("generated/Eval0".to_string(), eval_class("generated/Eval0"))]))
            .unwrap()
            .remove(0);
        let b = registry
            .define(BTreeMap::from([("generated/Eval1".to_string(), eval_class("generated/Eval1"))]))
            .unwrap()
            .remove(0);
        assert_eq!(registry.len(), 1);
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn lookup_resolves_by_exact_name() {
        let registry = Registry::new();
        registry
            .define(BTreeMap::from([("generated/Eval0".to_string(), eval_class("generated/Eval0"))]))
            .unwrap();
        assert!(registry.lookup("generated/Eval0").is_some());
        assert!(registry.lookup("generated/Missing").is_none());
    }

    #[test]
    fn malformed_bytes_are_refused() {
        let registry = Registry::new();
        let err = registry
            .define(BTreeMap::from([("generated/Bad".to_string(), vec![0, 1, 2, 3])]))
            .unwrap_err();
        assert!(matches!(err, DefineError::Malformed { .. }));
    }
}
