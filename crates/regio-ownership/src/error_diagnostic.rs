//! Conversion from verification errors to user-facing diagnostics.

use crate::error::{ConsumeCause, ErrorKind, Violation, VerifyError};
use regio_diagnostics::{Diagnostic, IrPosition};
use regio_ir::{op_to_string, Unit};

impl ErrorKind {
    /// Stable error code for this kind.
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::TypeMismatch { .. } => "E0001",
            ErrorKind::FieldArityMismatch { .. } => "E0002",
            ErrorKind::DuplicateField { .. } => "E1002",
            ErrorKind::UnknownClass { .. } => "E1003",
            ErrorKind::UnknownField { .. } => "E1004",
            ErrorKind::UndefinedValue { .. } => "E1005",
            ErrorKind::ValueRedefined { .. } => "E1006",
            ErrorKind::UseAfterConsume { .. } => "E2001",
            ErrorKind::RegionCycle { .. } => "E2002",
            ErrorKind::LeakedOwned { .. } => "E2003",
            ErrorKind::Internal { .. } => "E9001",
        }
    }

    fn notes(&self) -> Vec<Diagnostic> {
        match self {
            ErrorKind::UseAfterConsume { consumed_at, .. } => {
                let mut notes = vec![Diagnostic::note(format!("value was {}", consumed_at))];
                if consumed_at.cause == ConsumeCause::Operand {
                    notes.push(Diagnostic::help(
                        "use `view` to create an unowned alias before consuming",
                    ));
                }
                notes
            }
            ErrorKind::RegionCycle { .. } => vec![Diagnostic::note(
                "a region cannot be stored inside itself or a region it owns",
            )],
            ErrorKind::LeakedOwned { .. } => vec![Diagnostic::help(
                "`drop` the value, store it in a field, or return it from the unit",
            )],
            ErrorKind::FieldArityMismatch { .. } => vec![Diagnostic::note(
                "field names and field values are matched by position",
            )],
            _ => Vec::new(),
        }
    }
}

impl Violation {
    /// Convert this violation into a diagnostic positioned in `unit`.
    pub fn to_diagnostic(&self, unit: &Unit) -> Diagnostic {
        let mut position = IrPosition::unit(unit.name.as_str());
        if let Some(op) = self.op {
            position.op = Some(op.index());
            if let Some(record) = unit.op(op) {
                position = position.with_op_text(op_to_string(&record.kind));
            }
        }

        let mut diag = Diagnostic::error(self.kind.code(), self.kind.to_string()).at(position);
        if let Some(span) = &self.span {
            diag = diag.with_primary_span(span.clone(), self.kind.to_string());
        }
        if let ErrorKind::UseAfterConsume { consumed_at, .. } = &self.kind {
            let earlier = unit.op(consumed_at.op).and_then(|op| op.span.clone());
            if let Some(span) = earlier {
                diag = diag.with_secondary_span(span, "consumed here");
            }
        }
        self.kind.notes().into_iter().fold(diag, Diagnostic::with_child)
    }
}

impl VerifyError {
    /// One diagnostic per violation, in the order they were found.
    pub fn to_diagnostics(&self, unit: &Unit) -> Vec<Diagnostic> {
        self.violations().map(|v| v.to_diagnostic(unit)).collect()
    }
}
