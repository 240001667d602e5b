//! Declaration and type-descriptor data model.
//!
//! This crate carries the data a [`CompilerRequest`]-shaped caller hands to
//! the compiler: the declared variable names and their types, and the kind
//! of context object they resolve against at `eval` time. None of it
//! depends on the parser, the lowered IR, or the emitter — it is the
//! vocabulary every other crate in the workspace shares.

#![warn(missing_docs)]

use serde::{Deserialize, Serialize};
use std::fmt;

/// A primitive type tag, mirroring the host VM's primitive set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrimitiveTag {
    /// 32-bit signed integer
    Int,
    /// 64-bit signed integer (occupies two local slots at emission time)
    Long,
    /// 16-bit signed integer
    Short,
    /// 8-bit signed integer
    Byte,
    /// UTF-16 code unit
    Char,
    /// 32-bit IEEE-754 float
    Float,
    /// 64-bit IEEE-754 float (occupies two local slots at emission time)
    Double,
    /// Boolean
    Boolean,
}

impl PrimitiveTag {
    /// Rank in the `double > float > long > int` widening lattice. Types
    /// not on the arithmetic ladder (`short`, `byte`, `char`, `boolean`)
    /// share `int`'s rank since they widen to `int` at load time.
    pub fn rank(self) -> u8 {
        match self {
            PrimitiveTag::Double => 4,
            PrimitiveTag::Float => 3,
            PrimitiveTag::Long => 2,
            PrimitiveTag::Int => 1,
            PrimitiveTag::Short | PrimitiveTag::Byte | PrimitiveTag::Char => 1,
            PrimitiveTag::Boolean => 0,
        }
    }

    /// Whether this primitive occupies two consecutive local slots in the
    /// emitted method (the JVM-style local-variable ABI).
    pub fn is_wide(self) -> bool {
        matches!(self, PrimitiveTag::Long | PrimitiveTag::Double)
    }

    /// Whether this primitive is one of the four arithmetic ladder types
    /// (`int`, `long`, `float`, `double`) after integral promotion.
    pub fn is_numeric(self) -> bool {
        !matches!(self, PrimitiveTag::Boolean)
    }

    /// The boxed wrapper class's fully qualified name, e.g. `int` ->
    /// `java.lang.Integer`.
    pub fn boxed_class(self) -> &'static str {
        match self {
            PrimitiveTag::Int => "java.lang.Integer",
            PrimitiveTag::Long => "java.lang.Long",
            PrimitiveTag::Short => "java.lang.Short",
            PrimitiveTag::Byte => "java.lang.Byte",
            PrimitiveTag::Char => "java.lang.Character",
            PrimitiveTag::Float => "java.lang.Float",
            PrimitiveTag::Double => "java.lang.Double",
            PrimitiveTag::Boolean => "java.lang.Boolean",
        }
    }

    /// The name of the boxed wrapper's primitive-extraction method, e.g.
    /// `Integer.intValue()`.
    pub fn unbox_method(self) -> &'static str {
        match self {
            PrimitiveTag::Int => "intValue",
            PrimitiveTag::Long => "longValue",
            PrimitiveTag::Short => "shortValue",
            PrimitiveTag::Byte => "byteValue",
            PrimitiveTag::Char => "charValue",
            PrimitiveTag::Float => "floatValue",
            PrimitiveTag::Double => "doubleValue",
            PrimitiveTag::Boolean => "booleanValue",
        }
    }

    /// The boxed wrapper's static boxing factory, e.g. `Integer.valueOf`.
    pub fn box_method(self) -> &'static str {
        "valueOf"
    }
}

impl fmt::Display for PrimitiveTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PrimitiveTag::Int => "int",
            PrimitiveTag::Long => "long",
            PrimitiveTag::Short => "short",
            PrimitiveTag::Byte => "byte",
            PrimitiveTag::Char => "char",
            PrimitiveTag::Float => "float",
            PrimitiveTag::Double => "double",
            PrimitiveTag::Boolean => "boolean",
        };
        f.write_str(s)
    }
}

/// Widen a pair of primitive operand types per the `double > float > long >
/// int` lattice ("Numeric widening").
pub fn widen(a: PrimitiveTag, b: PrimitiveTag) -> PrimitiveTag {
    if a.rank() >= b.rank() {
        a
    } else {
        b
    }
}

/// A type descriptor: either a primitive, a resolved reference type, or an
/// unresolved generic string retained only for the fallback path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeDescriptor {
    /// Primitive type.
    Primitive(PrimitiveTag),
    /// Resolved reference type by fully qualified class name.
    Reference(String),
    /// Unresolved parameterized/generic type, e.g. `List<Foo>`. Emittable
    /// only by the fallback compiler adapter; the direct emitter's
    /// `can_emit` rejects any node whose static type is this variant.
    Parameterized(String),
}

impl TypeDescriptor {
    /// Convenience constructor for a reference descriptor.
    pub fn reference(fqcn: impl Into<String>) -> Self {
        TypeDescriptor::Reference(fqcn.into())
    }

    /// True if this descriptor names a primitive.
    pub fn is_primitive(&self) -> bool {
        matches!(self, TypeDescriptor::Primitive(_))
    }

    /// The primitive tag, if this is a primitive descriptor.
    pub fn as_primitive(&self) -> Option<PrimitiveTag> {
        match self {
            TypeDescriptor::Primitive(p) => Some(*p),
            _ => None,
        }
    }

    /// The fully qualified class name this descriptor denotes on the
    /// stack, boxing primitives to their wrapper class. Used when a
    /// reference-typed slot is needed (return widening, boxed locals).
    pub fn erased_class_name(&self) -> &str {
        match self {
            TypeDescriptor::Primitive(p) => p.boxed_class(),
            TypeDescriptor::Reference(name) => name,
            TypeDescriptor::Parameterized(name) => name,
        }
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeDescriptor::Primitive(p) => write!(f, "{p}"),
            TypeDescriptor::Reference(name) => write!(f, "{name}"),
            TypeDescriptor::Parameterized(name) => write!(f, "{name}"),
        }
    }
}

/// A single `(name, type)` binding in the declaration table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Declaration {
    /// Declared variable name as it appears in source.
    pub name: String,
    /// Declared type.
    pub ty: TypeDescriptor,
}

impl Declaration {
    /// Build a new declaration.
    pub fn new(name: impl Into<String>, ty: TypeDescriptor) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// Selects how bare name references resolve against the runtime context
/// object ("Context kind").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContextKind {
    /// `name` resolves via `context.get("name")` + checked cast.
    Map,
    /// `name` resolves via `context.get(index)` by declaration position.
    List,
    /// `name` resolves via `context.getName()` reflective getter lookup.
    Pojo,
}

/// Ordered declaration table plus the single context (receiver)
/// declaration. Order is significant only under [`ContextKind::List`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclarationTable {
    /// The receiver/context declaration (slot 1 at emission time).
    pub context: Declaration,
    /// Ordered variable declarations.
    pub declarations: Vec<Declaration>,
}

impl DeclarationTable {
    /// Build a declaration table from a context declaration and its
    /// variables.
    pub fn new(context: Declaration, declarations: Vec<Declaration>) -> Self {
        Self {
            context,
            declarations,
        }
    }

    /// Look up a declaration by name (the `Map`/`Pojo` resolution path).
    pub fn find(&self, name: &str) -> Option<&Declaration> {
        self.declarations.iter().find(|d| d.name == name)
    }

    /// Look up a declaration's positional index (the `List` resolution
    /// path). Position is the declaration's index within `declarations`,
    /// in insertion order.
    pub fn position_of(&self, name: &str) -> Option<usize> {
        self.declarations.iter().position(|d| d.name == name)
    }
}

/// Whether the source text is a bare expression or a statement block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContentKind {
    /// A single expression, e.g. `a + b`.
    Expression,
    /// A `;`-separated statement block with an explicit `return`.
    Block,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn widening_lattice_prefers_wider_rank() {
        assert_eq!(widen(PrimitiveTag::Int, PrimitiveTag::Long), PrimitiveTag::Long);
        assert_eq!(widen(PrimitiveTag::Double, PrimitiveTag::Float), PrimitiveTag::Double);
        assert_eq!(widen(PrimitiveTag::Short, PrimitiveTag::Byte), PrimitiveTag::Int);
    }

    #[test]
    fn declaration_table_resolves_by_name_and_position() {
        let table = DeclarationTable::new(
            Declaration::new("ctx", TypeDescriptor::reference("java.util.Map")),
            vec![
                Declaration::new("a", TypeDescriptor::Primitive(PrimitiveTag::Int)),
                Declaration::new("b", TypeDescriptor::Primitive(PrimitiveTag::Int)),
            ],
        );
        assert_eq!(table.position_of("b"), Some(1));
        assert_eq!(table.find("a").unwrap().ty, TypeDescriptor::Primitive(PrimitiveTag::Int));
        assert_eq!(table.find("z"), None);
    }

    #[test]
    fn erased_class_name_boxes_primitives() {
        let ty = TypeDescriptor::Primitive(PrimitiveTag::Boolean);
        assert_eq!(ty.erased_class_name(), "java.lang.Boolean");
    }
}
