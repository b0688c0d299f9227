//! Diagnostics for the Regio ownership IR.
//!
//! Class-table errors and verifier violations are both lowered to a
//! [`Diagnostic`]: a stable code, a message, the IR position of the
//! offending operation and whatever source spans the front end attached.
//! [`render`] turns them into terminal output.
//!
//! ```rust
//! use regio_diagnostics::{Diagnostic, DiagnosticSeverity, IrPosition};
//! use regio_diagnostics::span::SourceSpan;
//!
//! let diagnostic = Diagnostic::error("E2001", "use of consumed value `%2`")
//!     .at(IrPosition::op(3).in_unit("main"))
//!     .with_primary_span(SourceSpan::new("main.rg", 20, 24), "value used here")
//!     .with_child(Diagnostic::note("`%2` was consumed by op #1"));
//!
//! assert_eq!(diagnostic.severity, DiagnosticSeverity::Error);
//! assert_eq!(diagnostic.code.as_deref(), Some("E2001"));
//! ```

pub mod render;
pub mod span;

use std::fmt;

use indexmap::IndexMap;
use span::{MultiSpan, SourceSpan};
use thiserror::Error;

/// Verification either accepts a unit or rejects it, so there are no
/// warnings. Notes and helps only appear as children of an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DiagnosticSeverity {
    #[default]
    Error,
    Note,
    Help,
}

impl DiagnosticSeverity {
    pub fn prefix(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Note => "note",
            Self::Help => "help",
        }
    }

    /// Character used to underline a primary label.
    pub fn underline_char(self) -> char {
        match self {
            Self::Error => '^',
            Self::Note => '-',
            Self::Help => '+',
        }
    }

    pub fn is_fatal(self) -> bool {
        self == Self::Error
    }
}

/// Where a diagnostic points inside the IR.
///
/// `op` is the zero-based index into the unit's operation sequence. It is
/// `None` for class-table errors and for checks run after the last op.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct IrPosition {
    pub unit: Option<String>,
    pub op: Option<usize>,
    /// The offending op as printed by the IR pretty-printer.
    pub op_text: Option<String>,
}

impl IrPosition {
    pub fn op(index: usize) -> Self {
        Self {
            op: Some(index),
            ..Self::default()
        }
    }

    pub fn unit(name: impl Into<String>) -> Self {
        Self {
            unit: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn in_unit(self, name: impl Into<String>) -> Self {
        Self {
            unit: Some(name.into()),
            ..self
        }
    }

    pub fn with_op_text(self, text: impl Into<String>) -> Self {
        Self {
            op_text: Some(text.into()),
            ..self
        }
    }
}

impl fmt::Display for IrPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.unit, self.op) {
            (Some(unit), Some(op)) => write!(f, "unit `{}`, op #{}", unit, op),
            (Some(unit), None) => write!(f, "unit `{}`", unit),
            (None, Some(op)) => write!(f, "op #{}", op),
            (None, None) => f.write_str("<class table>"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub code: Option<String>,
    pub severity: DiagnosticSeverity,
    pub message: String,
    pub position: Option<IrPosition>,
    pub spans: MultiSpan,
    /// Notes and helps rendered under the main message.
    pub children: Vec<Diagnostic>,
}

impl Diagnostic {
    pub fn new(severity: DiagnosticSeverity, code: Option<String>, message: impl Into<String>) -> Self {
        Self {
            code,
            severity,
            message: message.into(),
            position: None,
            spans: MultiSpan::new(),
            children: Vec::new(),
        }
    }

    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(DiagnosticSeverity::Error, Some(code.into()), message)
    }

    pub fn note(message: impl Into<String>) -> Self {
        Self::new(DiagnosticSeverity::Note, None, message)
    }

    pub fn help(message: impl Into<String>) -> Self {
        Self::new(DiagnosticSeverity::Help, None, message)
    }

    pub fn at(mut self, position: IrPosition) -> Self {
        self.position = Some(position);
        self
    }

    pub fn with_primary_span(mut self, span: SourceSpan, message: impl Into<String>) -> Self {
        self.spans.push_primary(span, message);
        self
    }

    pub fn with_secondary_span(mut self, span: SourceSpan, message: impl Into<String>) -> Self {
        self.spans.push_secondary(span, message);
        self
    }

    pub fn with_child(mut self, child: Diagnostic) -> Self {
        self.children.push(child);
        self
    }

    /// `{base_url}/{code}`, for diagnostics that carry a code.
    pub fn docs_url(&self, base_url: &str) -> Option<String> {
        let code = self.code.as_deref()?;
        Some(format!("{}/{}", base_url.trim_end_matches('/'), code))
    }

    pub fn has_spans(&self) -> bool {
        !self.spans.is_empty()
    }
}

/// Codes are `E` followed by four digits; the first digit is the category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// `E0xxx`: types and arities that do not line up.
    Shape,
    /// `E1xxx`: unknown, duplicate or undefined names.
    Naming,
    /// `E2xxx`: consumption and region structure.
    Ownership,
    /// `E9xxx`
    Internal,
}

impl ErrorCategory {
    pub fn from_code(code: &str) -> Option<Self> {
        let digits = code.strip_prefix('E')?;
        if digits.len() != 4 || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        match digits.as_bytes()[0] {
            b'0' => Some(Self::Shape),
            b'1' => Some(Self::Naming),
            b'2' => Some(Self::Ownership),
            b'9' => Some(Self::Internal),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Shape => "Shape",
            Self::Naming => "Naming",
            Self::Ownership => "Ownership/Regions",
            Self::Internal => "Internal",
        }
    }
}

const STANDARD_CODES: &[(&str, &str)] = &[
    ("E0001", "type mismatch"),
    ("E0002", "field arity mismatch"),
    ("E0003", "unresolved field type"),
    ("E1001", "duplicate class"),
    ("E1002", "duplicate field"),
    ("E1003", "unknown class"),
    ("E1004", "unknown field"),
    ("E1005", "undefined value"),
    ("E1006", "value redefined"),
    ("E2001", "use after consume"),
    ("E2002", "region cycle"),
    ("E2003", "leaked owned value"),
    ("E9001", "internal verifier error"),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorCodeInfo {
    pub code: String,
    pub category: ErrorCategory,
    pub description: String,
}

/// Known error codes, in registration order.
#[derive(Debug, Default)]
pub struct ErrorCodeRegistry {
    codes: IndexMap<String, ErrorCodeInfo>,
}

impl ErrorCodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_standard_codes() -> Self {
        let mut registry = Self::new();
        for (code, description) in STANDARD_CODES {
            registry.register(*code, *description);
        }
        registry
    }

    /// Returns false, and registers nothing, if `code` is malformed.
    pub fn register(&mut self, code: impl Into<String>, description: impl Into<String>) -> bool {
        let code = code.into();
        let Some(category) = ErrorCategory::from_code(&code) else {
            return false;
        };
        let info = ErrorCodeInfo {
            code: code.clone(),
            category,
            description: description.into(),
        };
        self.codes.insert(code, info);
        true
    }

    pub fn get(&self, code: &str) -> Option<&ErrorCodeInfo> {
        self.codes.get(code)
    }

    pub fn codes_in_category(&self, category: ErrorCategory) -> impl Iterator<Item = &ErrorCodeInfo> {
        self.codes.values().filter(move |info| info.category == category)
    }
}

pub type DiagnosticResult<T> = Result<T, DiagnosticError>;

#[derive(Debug, Error)]
pub enum DiagnosticError {
    #[error("failed to write diagnostic: {0}")]
    Io(#[from] std::io::Error),
}
