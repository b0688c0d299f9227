//! Conversion from `ClassError` to user-facing diagnostics.

use crate::ClassError;
use regio_diagnostics::{Diagnostic, IrPosition};

impl ClassError {
    /// Stable error code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            ClassError::UnresolvedFieldType { .. } => "E0003",
            ClassError::DuplicateClass { .. } => "E1001",
            ClassError::DuplicateField { .. } => "E1002",
            ClassError::UnknownClass { .. } => "E1003",
            ClassError::UnknownField { .. } => "E1004",
        }
    }

    /// Convert this error into a diagnostic. Class-table errors have no
    /// operation position.
    pub fn to_diagnostic(&self) -> Diagnostic {
        let diag = Diagnostic::error(self.code(), self.to_string()).at(IrPosition::default());
        match self {
            ClassError::UnresolvedFieldType { target, .. } => diag.with_child(Diagnostic::help(
                format!("declare class `@{}` anywhere in the compilation unit", target),
            )),
            ClassError::DuplicateField { field, .. } => diag.with_child(Diagnostic::note(format!(
                "field names must be unique within a class; rename one `{}`",
                field
            ))),
            _ => diag,
        }
    }
}
