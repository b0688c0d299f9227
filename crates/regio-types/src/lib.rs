//! Regio Type & Class Model
//!
//! Declared types of IR values and class fields, and the class table that
//! maps class names to their ordered field declarations.
//!
//! # Types
//!
//! Every IR value and every field has one of three types:
//!
//! - `Owned(C)` - a linear reference to an object of class `C` that carries
//!   the right to transfer or deallocate the region it enters.
//! - `Unowned(C)` - an aliasing reference with no deallocation rights.
//! - `Primitive(name)` - a non-reference value (`i64`, `bool`, ...).
//!
//! Type compatibility is structural equality; there is no subtyping.
//!
//! # Class table
//!
//! Classes are declared through [`ClassTableBuilder`] and sealed into an
//! immutable [`ClassTable`]. Field types name classes rather than embed them,
//! so self-referential and mutually recursive class graphs need no special
//! handling.

pub mod class_table;
mod error_diagnostic;

use smol_str::SmolStr;
use std::fmt;
use thiserror::Error;

pub use class_table::{ClassDecl, ClassTable, ClassTableBuilder, FieldDecl, PendingClass};

/// Symbolic class name, written `@Name` in printed IR.
pub type ClassName = SmolStr;

/// Index of a class in its class table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassId(pub u32);

impl ClassId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "class#{}", self.0)
    }
}

/// The declared type of an IR value or a field.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    /// Linear reference carrying transfer and deallocation rights.
    Owned(ClassName),
    /// Aliasing reference, observation only.
    Unowned(ClassName),
    /// Non-reference value.
    Primitive(SmolStr),
}

impl Type {
    pub fn owned(class: impl Into<ClassName>) -> Self {
        Type::Owned(class.into())
    }

    pub fn unowned(class: impl Into<ClassName>) -> Self {
        Type::Unowned(class.into())
    }

    pub fn primitive(name: impl Into<SmolStr>) -> Self {
        Type::Primitive(name.into())
    }

    /// The referenced class, for reference types.
    pub fn class_name(&self) -> Option<&ClassName> {
        match self {
            Type::Owned(class) | Type::Unowned(class) => Some(class),
            Type::Primitive(_) => None,
        }
    }

    pub fn is_owned(&self) -> bool {
        matches!(self, Type::Owned(_))
    }

    pub fn is_unowned(&self) -> bool {
        matches!(self, Type::Unowned(_))
    }

    pub fn is_reference(&self) -> bool {
        !matches!(self, Type::Primitive(_))
    }

    /// The unowned alias type for a reference, or the type itself for a
    /// primitive. This is the type `view` and `field_read` produce.
    pub fn as_unowned(&self) -> Type {
        match self {
            Type::Owned(class) | Type::Unowned(class) => Type::Unowned(class.clone()),
            Type::Primitive(name) => Type::Primitive(name.clone()),
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Owned(class) => write!(f, "owned @{}", class),
            Type::Unowned(class) => write!(f, "unowned @{}", class),
            Type::Primitive(name) => write!(f, "{}", name),
        }
    }
}

/// Whether a value of type `provided` may fill a slot declared as
/// `declared`. Structural equality on the variant and its payload.
pub fn types_compatible(declared: &Type, provided: &Type) -> bool {
    declared == provided
}

/// Errors raised while populating or querying the class table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClassError {
    #[error("class `@{name}` is declared more than once")]
    DuplicateClass { name: ClassName },

    #[error("field `{field}` is declared more than once in class `@{class}`")]
    DuplicateField { class: ClassName, field: SmolStr },

    #[error("field `{field}` of class `@{class}` refers to undeclared class `@{target}`")]
    UnresolvedFieldType {
        class: ClassName,
        field: SmolStr,
        target: ClassName,
    },

    #[error("class `@{class}` has no field `{field}`")]
    UnknownField { class: ClassName, field: SmolStr },

    #[error("unknown class `@{name}`")]
    UnknownClass { name: ClassName },
}

/// Result type for class table operations.
pub type ClassResult<T> = Result<T, ClassError>;
