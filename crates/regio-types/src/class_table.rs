//! Class table population and validation.
//!
//! Classes are declared and filled in through [`ClassTableBuilder`], in
//! declaration order. Field types may name classes that are declared later;
//! resolution only happens in [`ClassTableBuilder::finish`], which checks
//! each field type once by name. No class graph is ever walked, so
//! recursive and mutually recursive classes cannot make validation loop.

use crate::{ClassError, ClassId, ClassName, ClassResult, Type};
use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use smol_str::SmolStr;
use tracing::debug;

/// A declared field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDecl {
    pub name: SmolStr,
    pub ty: Type,
}

impl FieldDecl {
    pub fn new(name: impl Into<SmolStr>, ty: Type) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// A declared class with its fields in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassDecl {
    pub name: ClassName,
    fields: IndexMap<SmolStr, FieldDecl>,
}

impl ClassDecl {
    /// A class with no fields yet.
    pub fn new(name: impl Into<ClassName>) -> Self {
        Self {
            name: name.into(),
            fields: IndexMap::new(),
        }
    }

    /// Fields in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = &FieldDecl> {
        self.fields.values()
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    pub fn get_field(&self, name: &str) -> Option<&FieldDecl> {
        self.fields.get(name)
    }

    /// Position of a field in declaration order.
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.get_index_of(name)
    }
}

/// A class body as written by the front end, before duplicate checking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingClass {
    pub name: ClassName,
    pub fields: Vec<FieldDecl>,
}

impl PendingClass {
    pub fn new(name: impl Into<ClassName>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    pub fn field(mut self, name: impl Into<SmolStr>, ty: Type) -> Self {
        self.fields.push(FieldDecl::new(name, ty));
        self
    }
}

impl From<ClassDecl> for PendingClass {
    fn from(decl: ClassDecl) -> Self {
        Self {
            name: decl.name,
            fields: decl.fields.into_values().collect(),
        }
    }
}

/// Mutable class table under construction.
#[derive(Debug, Default)]
pub struct ClassTableBuilder {
    classes: Vec<ClassDecl>,
    by_name: FxHashMap<ClassName, ClassId>,
}

impl ClassTableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new, empty class.
    pub fn declare_class(&mut self, name: impl Into<ClassName>) -> ClassResult<ClassId> {
        let name = name.into();
        if self.by_name.contains_key(&name) {
            return Err(ClassError::DuplicateClass { name });
        }
        let id = ClassId(self.classes.len() as u32);
        self.by_name.insert(name.clone(), id);
        self.classes.push(ClassDecl::new(name));
        Ok(id)
    }

    /// Append a field to a declared class.
    pub fn add_field(&mut self, class: ClassId, name: impl Into<SmolStr>, ty: Type) -> ClassResult<()> {
        let decl = self
            .classes
            .get_mut(class.index())
            .ok_or_else(|| ClassError::UnknownClass {
                name: class.to_string().into(),
            })?;
        let name = name.into();
        if decl.fields.contains_key(&name) {
            return Err(ClassError::DuplicateField {
                class: decl.name.clone(),
                field: name,
            });
        }
        decl.fields.insert(name.clone(), FieldDecl::new(name, ty));
        Ok(())
    }

    /// Declare a class together with its whole body.
    pub fn declare(&mut self, class: impl Into<PendingClass>) -> ClassResult<ClassId> {
        let class = class.into();
        let id = self.declare_class(class.name)?;
        for field in class.fields {
            self.add_field(id, field.name, field.ty)?;
        }
        Ok(id)
    }

    /// Resolve every field type and seal the table.
    pub fn finish(self) -> ClassResult<ClassTable> {
        for decl in &self.classes {
            for field in decl.fields.values() {
                if let Some(target) = field.ty.class_name() {
                    if !self.by_name.contains_key(target) {
                        return Err(ClassError::UnresolvedFieldType {
                            class: decl.name.clone(),
                            field: field.name.clone(),
                            target: target.clone(),
                        });
                    }
                }
            }
        }
        debug!(classes = self.classes.len(), "class table sealed");
        Ok(ClassTable {
            classes: self.classes,
            by_name: self.by_name,
        })
    }
}

/// Sealed, immutable class table. Cheap to share between verifier
/// instances by reference.
#[derive(Debug, Clone, Default)]
pub struct ClassTable {
    classes: Vec<ClassDecl>,
    by_name: FxHashMap<ClassName, ClassId>,
}

impl ClassTable {
    /// Populate and seal a table from complete class bodies, in order.
    pub fn from_decls<I, C>(decls: I) -> ClassResult<Self>
    where
        I: IntoIterator<Item = C>,
        C: Into<PendingClass>,
    {
        let mut builder = ClassTableBuilder::new();
        for decl in decls {
            builder.declare(decl)?;
        }
        builder.finish()
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn class(&self, id: ClassId) -> Option<&ClassDecl> {
        self.classes.get(id.index())
    }

    pub fn class_id(&self, name: &str) -> ClassResult<ClassId> {
        self.by_name
            .get(name)
            .copied()
            .ok_or_else(|| ClassError::UnknownClass { name: name.into() })
    }

    pub fn lookup_class(&self, name: &str) -> ClassResult<(ClassId, &ClassDecl)> {
        let id = self.class_id(name)?;
        Ok((id, &self.classes[id.index()]))
    }

    /// Declared type of `field` on class `class`.
    pub fn lookup_field(&self, class: ClassId, field: &str) -> ClassResult<&Type> {
        let decl = self.class(class).ok_or_else(|| ClassError::UnknownClass {
            name: class.to_string().into(),
        })?;
        decl.get_field(field)
            .map(|f| &f.ty)
            .ok_or_else(|| ClassError::UnknownField {
                class: decl.name.clone(),
                field: field.into(),
            })
    }

    /// Classes in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (ClassId, &ClassDecl)> {
        self.classes
            .iter()
            .enumerate()
            .map(|(i, decl)| (ClassId(i as u32), decl))
    }
}
