//! Builder for compilation units.
//!
//! Allocates fresh value handles and appends operations in order, so the
//! resulting sequence is def-before-use by construction.

use crate::ir::{OpId, OpKind, Operation, Unit, ValueId};
use regio_diagnostics::span::SourceSpan;
use regio_types::{ClassName, Type};
use smol_str::SmolStr;

/// Incrementally builds a [`Unit`].
#[derive(Debug)]
pub struct UnitBuilder {
    unit: Unit,
    span: Option<SourceSpan>,
}

impl UnitBuilder {
    pub fn new(name: impl Into<SmolStr>) -> Self {
        Self {
            unit: Unit::new(name),
            span: None,
        }
    }

    /// Declare a parameter of type `ty`.
    pub fn param(&mut self, ty: Type) -> ValueId {
        self.unit.add_param(ty)
    }

    /// Attach `span` to the next operation appended.
    pub fn at(&mut self, span: SourceSpan) -> &mut Self {
        self.span = Some(span);
        self
    }

    fn push(&mut self, kind: OpKind) -> OpId {
        let mut op = Operation::new(kind);
        op.span = self.span.take();
        self.unit.push(op)
    }

    pub fn copy(&mut self, input: ValueId) -> ValueId {
        let result = self.unit.fresh_value();
        self.push(OpKind::Copy { input, result });
        result
    }

    pub fn view(&mut self, input: ValueId) -> ValueId {
        let result = self.unit.fresh_value();
        self.push(OpKind::View { input, result });
        result
    }

    pub fn field_read(&mut self, origin: ValueId, field: &str) -> ValueId {
        let result = self.unit.fresh_value();
        self.push(OpKind::FieldRead {
            origin,
            field: field.into(),
            output: None,
            result,
        });
        result
    }

    /// `field_read` with an annotated result type.
    pub fn field_read_as(&mut self, origin: ValueId, field: &str, output: Type) -> ValueId {
        let result = self.unit.fresh_value();
        self.push(OpKind::FieldRead {
            origin,
            field: field.into(),
            output: Some(output),
            result,
        });
        result
    }

    /// Returns the previous field occupant.
    pub fn field_write(&mut self, origin: ValueId, field: &str, value: ValueId) -> ValueId {
        let result = self.unit.fresh_value();
        self.push(OpKind::FieldWrite {
            origin,
            field: field.into(),
            value,
            result,
        });
        result
    }

    pub fn tidy(&mut self, region: ValueId) -> OpId {
        self.push(OpKind::Tidy { region })
    }

    pub fn drop(&mut self, value: ValueId) -> OpId {
        self.push(OpKind::Drop { value })
    }

    /// `fields` and `values` are parallel lists; their lengths are not
    /// checked here.
    pub fn new_region(&mut self, class: &str, fields: &[&str], values: &[ValueId]) -> ValueId {
        let result = self.unit.fresh_value();
        self.push(OpKind::NewRegion {
            class: ClassName::from(class),
            fields: fields.iter().map(|f| SmolStr::from(*f)).collect(),
            values: values.to_vec(),
            result,
        });
        result
    }

    pub fn new_object(
        &mut self,
        region: ValueId,
        class: &str,
        fields: &[&str],
        values: &[ValueId],
    ) -> ValueId {
        let result = self.unit.fresh_value();
        self.push(OpKind::NewObject {
            region,
            class: ClassName::from(class),
            fields: fields.iter().map(|f| SmolStr::from(*f)).collect(),
            values: values.to_vec(),
            result,
        });
        result
    }

    /// Mark `values` as escaping the unit.
    pub fn returns(&mut self, values: &[ValueId]) -> &mut Self {
        self.unit.returns.extend_from_slice(values);
        self
    }

    pub fn finish(self) -> Unit {
        self.unit
    }
}
