//! IR data structures.
//!
//! A compilation unit is a flat, ordered sequence of operations over
//! SSA-style value handles. Control flow is out of scope; the order of the
//! sequence is the def-before-use order the verifier walks.

use regio_diagnostics::span::SourceSpan;
use regio_types::{ClassName, ClassResult, ClassTable, PendingClass, Type};
use smol_str::SmolStr;
use std::fmt;

// ============================================================================
// Identifiers
// ============================================================================

/// SSA value handle, printed `%N`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ValueId(pub u32);

impl ValueId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Position of an operation in its unit, printed `#N`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OpId(pub u32);

impl OpId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ValueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{}", self.0)
    }
}

impl fmt::Display for OpId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ============================================================================
// Operations
// ============================================================================

/// The operation kinds of the IR.
///
/// Class and field declarations are not operations; they live in
/// [`Module::classes`] and are processed before any unit is verified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpKind {
    /// Re-materialize `input` under a fresh identity, consuming it.
    Copy { input: ValueId, result: ValueId },

    /// Create an unowned alias of `input` without consuming it.
    View { input: ValueId, result: ValueId },

    /// Read `origin.field` as an unowned alias. `output` is the result type
    /// the producer annotated, if any.
    FieldRead {
        origin: ValueId,
        field: SmolStr,
        output: Option<Type>,
        result: ValueId,
    },

    /// Store `value` into `origin.field`; `result` is the previous occupant.
    FieldWrite {
        origin: ValueId,
        field: SmolStr,
        value: ValueId,
        result: ValueId,
    },

    /// Reclamation hint on a region entrypoint.
    Tidy { region: ValueId },

    /// Consume `value`; deallocates the region when it is an owned
    /// entrypoint reference.
    Drop { value: ValueId },

    /// Allocate the entrypoint of a fresh region.
    NewRegion {
        class: ClassName,
        fields: Vec<SmolStr>,
        values: Vec<ValueId>,
        result: ValueId,
    },

    /// Allocate an object inside the region `region` points into.
    NewObject {
        region: ValueId,
        class: ClassName,
        fields: Vec<SmolStr>,
        values: Vec<ValueId>,
        result: ValueId,
    },
}

impl OpKind {
    /// Mnemonic used by the printer and in diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            OpKind::Copy { .. } => "copy",
            OpKind::View { .. } => "view",
            OpKind::FieldRead { .. } => "field_read",
            OpKind::FieldWrite { .. } => "field_write",
            OpKind::Tidy { .. } => "tidy",
            OpKind::Drop { .. } => "drop",
            OpKind::NewRegion { .. } => "new_region",
            OpKind::NewObject { .. } => "new_object",
        }
    }

    /// All operands, in printed order.
    pub fn operands(&self) -> Vec<ValueId> {
        match self {
            OpKind::Copy { input, .. } | OpKind::View { input, .. } => vec![*input],
            OpKind::FieldRead { origin, .. } => vec![*origin],
            OpKind::FieldWrite { origin, value, .. } => vec![*origin, *value],
            OpKind::Tidy { region } => vec![*region],
            OpKind::Drop { value } => vec![*value],
            OpKind::NewRegion { values, .. } => values.clone(),
            OpKind::NewObject { region, values, .. } => {
                let mut operands = Vec::with_capacity(values.len() + 1);
                operands.push(*region);
                operands.extend(values.iter().copied());
                operands
            }
        }
    }

    /// The value this operation defines, if any.
    pub fn result(&self) -> Option<ValueId> {
        match self {
            OpKind::Copy { result, .. }
            | OpKind::View { result, .. }
            | OpKind::FieldRead { result, .. }
            | OpKind::FieldWrite { result, .. }
            | OpKind::NewRegion { result, .. }
            | OpKind::NewObject { result, .. } => Some(*result),
            OpKind::Tidy { .. } | OpKind::Drop { .. } => None,
        }
    }
}

/// An operation record: its kind plus the source span the front end
/// attached, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    pub kind: OpKind,
    pub span: Option<SourceSpan>,
}

impl Operation {
    pub fn new(kind: OpKind) -> Self {
        Self { kind, span: None }
    }

    pub fn with_span(mut self, span: SourceSpan) -> Self {
        self.span = Some(span);
        self
    }
}

impl From<OpKind> for Operation {
    fn from(kind: OpKind) -> Self {
        Operation::new(kind)
    }
}

// ============================================================================
// Units and modules
// ============================================================================

/// A value defined on entry to a unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub value: ValueId,
    pub ty: Type,
}

/// One compilation unit: parameters, an ordered operation sequence and the
/// values that escape the unit.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Unit {
    pub name: SmolStr,
    pub params: Vec<Param>,
    pub ops: Vec<Operation>,
    pub returns: Vec<ValueId>,
    next_value: u32,
}

impl Unit {
    pub fn new(name: impl Into<SmolStr>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Allocate a value handle that no operation defines yet. Once the
    /// handle space is exhausted this keeps returning `u32::MAX`, which the
    /// verifier reports as a redefinition.
    pub fn fresh_value(&mut self) -> ValueId {
        let id = ValueId(self.next_value);
        self.next_value = self.next_value.saturating_add(1);
        id
    }

    /// Number of value handles allocated so far.
    pub fn value_count(&self) -> usize {
        self.next_value as usize
    }

    /// Add a parameter of type `ty`.
    pub fn add_param(&mut self, ty: Type) -> ValueId {
        let value = self.fresh_value();
        self.params.push(Param { value, ty });
        value
    }

    /// Append an operation. Handles used by `op` are not checked here; a
    /// raw handle the unit never allocated is reported by the verifier.
    pub fn push(&mut self, op: impl Into<Operation>) -> OpId {
        let op = op.into();
        for value in op.kind.operands().into_iter().chain(op.kind.result()) {
            self.next_value = self.next_value.max(value.0.saturating_add(1));
        }
        let id = OpId(self.ops.len() as u32);
        self.ops.push(op);
        id
    }

    pub fn op(&self, id: OpId) -> Option<&Operation> {
        self.ops.get(id.index())
    }

    pub fn iter(&self) -> impl Iterator<Item = (OpId, &Operation)> {
        self.ops
            .iter()
            .enumerate()
            .map(|(i, op)| (OpId(i as u32), op))
    }
}

/// Class declarations plus the units that use them.
#[derive(Debug, Clone, Default)]
pub struct Module {
    pub classes: Vec<PendingClass>,
    pub units: Vec<Unit>,
}

impl Module {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_class(mut self, class: PendingClass) -> Self {
        self.classes.push(class);
        self
    }

    pub fn with_unit(mut self, unit: Unit) -> Self {
        self.units.push(unit);
        self
    }

    /// Populate and seal the class table from the module's declarations.
    pub fn class_table(&self) -> ClassResult<ClassTable> {
        ClassTable::from_decls(self.classes.iter().cloned())
    }
}
