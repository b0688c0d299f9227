//! Verification errors.

use regio_diagnostics::span::SourceSpan;
use regio_ir::{OpId, ValueId};
use regio_types::{ClassError, ClassName, Type};
use smol_str::SmolStr;
use std::fmt;
use thiserror::Error;

/// Why a value stopped being usable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConsumeCause {
    /// An operation took the value as a consuming operand.
    Operand,
    /// The region the value points into was deallocated by a `drop`.
    RegionDropped,
}

/// Where and how a value was consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConsumedAt {
    pub op: OpId,
    pub cause: ConsumeCause,
}

impl fmt::Display for ConsumedAt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.cause {
            ConsumeCause::Operand => write!(f, "consumed by op {}", self.op),
            ConsumeCause::RegionDropped => {
                write!(f, "invalidated when its region was dropped by op {}", self.op)
            }
        }
    }
}

/// The kind of a verification violation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ErrorKind {
    #[error("use of consumed value `{value}` ({consumed_at})")]
    UseAfterConsume { value: ValueId, consumed_at: ConsumedAt },

    #[error("mismatched types: expected `{expected}`, found `{found}`")]
    TypeMismatch { expected: String, found: String },

    #[error("`@{class}` allocation lists {fields} field names but {values} values")]
    FieldArityMismatch {
        class: ClassName,
        fields: usize,
        values: usize,
    },

    #[error("unknown class `@{name}`")]
    UnknownClass { name: ClassName },

    #[error("class `@{class}` has no field `{field}`")]
    UnknownField { class: ClassName, field: SmolStr },

    #[error("field `{field}` of `@{class}` is initialized more than once")]
    DuplicateField { class: ClassName, field: SmolStr },

    #[error("value `{value}` is used before it is defined")]
    UndefinedValue { value: ValueId },

    #[error("value `{value}` is defined more than once")]
    ValueRedefined { value: ValueId },

    #[error("storing `{value}` would make its region own itself")]
    RegionCycle { value: ValueId },

    #[error("owned value `{value}` of type `{ty}` is never consumed")]
    LeakedOwned { value: ValueId, ty: Type },

    #[error("internal verifier error: {message}")]
    Internal { message: String },
}

impl ErrorKind {
    pub(crate) fn mismatch(expected: impl fmt::Display, found: impl fmt::Display) -> Self {
        ErrorKind::TypeMismatch {
            expected: expected.to_string(),
            found: found.to_string(),
        }
    }

    pub(crate) fn internal(message: impl Into<String>) -> Self {
        ErrorKind::Internal {
            message: message.into(),
        }
    }
}

impl From<ClassError> for ErrorKind {
    fn from(err: ClassError) -> Self {
        match err {
            ClassError::UnknownClass { name } => ErrorKind::UnknownClass { name },
            ClassError::UnknownField { class, field } => ErrorKind::UnknownField { class, field },
            ClassError::DuplicateField { class, field } => ErrorKind::DuplicateField { class, field },
            // Sealed tables never produce these during verification.
            other => ErrorKind::internal(other.to_string()),
        }
    }
}

/// One violation: its kind and the offending operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub kind: ErrorKind,
    /// `None` for parameter binding and end-of-unit checks.
    pub op: Option<OpId>,
    pub span: Option<SourceSpan>,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.op {
            Some(op) => write!(f, "op {}: {}", op, self.kind),
            None => write!(f, "{}", self.kind),
        }
    }
}

/// A rejected unit. Holds at least one violation; the first one is the
/// violation that rejected the unit.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unit `{unit}` rejected: {first}{}", more(.rest.len()))]
pub struct VerifyError {
    pub unit: SmolStr,
    first: Violation,
    rest: Vec<Violation>,
}

fn more(extra: usize) -> String {
    match extra {
        0 => String::new(),
        1 => " (and 1 more violation)".to_string(),
        n => format!(" (and {} more violations)", n),
    }
}

impl VerifyError {
    pub(crate) fn new(unit: SmolStr, first: Violation, rest: Vec<Violation>) -> Self {
        Self { unit, first, rest }
    }

    /// The violation that rejected the unit.
    pub fn first(&self) -> &Violation {
        &self.first
    }

    /// Every collected violation, in the order found.
    pub fn violations(&self) -> impl Iterator<Item = &Violation> {
        std::iter::once(&self.first).chain(&self.rest)
    }

    pub fn violation_count(&self) -> usize {
        1 + self.rest.len()
    }

    /// Kind of the first violation.
    pub fn kind(&self) -> &ErrorKind {
        &self.first().kind
    }
}

/// Result type for verification.
pub type VerifyResult<T> = Result<T, VerifyError>;

/// Failure of a single semantic step. Uses of poisoned values are not
/// reported again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Rejection {
    Error(ErrorKind),
    Poisoned,
}

impl From<ErrorKind> for Rejection {
    fn from(kind: ErrorKind) -> Self {
        Rejection::Error(kind)
    }
}

impl From<ClassError> for Rejection {
    fn from(err: ClassError) -> Self {
        Rejection::Error(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_use_after_consume_message() {
        let kind = ErrorKind::UseAfterConsume {
            value: ValueId(2),
            consumed_at: ConsumedAt {
                op: OpId(1),
                cause: ConsumeCause::Operand,
            },
        };
        assert_eq!(kind.to_string(), "use of consumed value `%2` (consumed by op #1)");
    }

    #[test]
    fn test_verify_error_message_counts_extra_violations() {
        let violation = |n| Violation {
            kind: ErrorKind::UndefinedValue { value: ValueId(n) },
            op: Some(OpId(n)),
            span: None,
        };
        let err = VerifyError::new("main".into(), violation(0), vec![violation(1), violation(2)]);
        assert_eq!(
            err.to_string(),
            "unit `main` rejected: op #0: value `%0` is used before it is defined (and 2 more violations)"
        );
        assert_eq!(err.kind(), &ErrorKind::UndefinedValue { value: ValueId(0) });
        assert_eq!(err.violation_count(), 3);
        let ops: Vec<_> = err.violations().map(|v| v.op).collect();
        assert_eq!(ops, vec![Some(OpId(0)), Some(OpId(1)), Some(OpId(2))]);
    }

    #[test]
    fn test_class_error_conversion() {
        let kind: ErrorKind = ClassError::UnknownClass { name: "C".into() }.into();
        assert_eq!(kind, ErrorKind::UnknownClass { name: "C".into() });
    }
}
