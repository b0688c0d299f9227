//! Source spans attached to operation records.
//!
//! The IR has no textual form of its own. A front end may attach a span to
//! each operation it emits; the verifier carries it into diagnostics
//! untouched.

use std::path::PathBuf;

/// Byte range `start..end` in `file`. `new` orders the bounds.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceSpan {
    pub file: PathBuf,
    pub start: usize,
    pub end: usize,
}

impl SourceSpan {
    pub fn new(file: impl Into<PathBuf>, start: usize, end: usize) -> Self {
        let (start, end) = if end < start { (end, start) } else { (start, end) };
        Self {
            file: file.into(),
            start,
            end,
        }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// `^^^` for the offending operation, `---` for related ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LabelStyle {
    Primary,
    Secondary,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
    pub span: SourceSpan,
    pub message: String,
    pub style: LabelStyle,
}

/// Labelled spans of one diagnostic. The first primary label is the one
/// the renderer excerpts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultiSpan {
    labels: Vec<Label>,
}

impl MultiSpan {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, style: LabelStyle, span: SourceSpan, message: impl Into<String>) {
        self.labels.push(Label {
            span,
            message: message.into(),
            style,
        });
    }

    pub fn push_primary(&mut self, span: SourceSpan, message: impl Into<String>) {
        self.push(LabelStyle::Primary, span, message);
    }

    pub fn push_secondary(&mut self, span: SourceSpan, message: impl Into<String>) {
        self.push(LabelStyle::Secondary, span, message);
    }

    pub fn primary_span(&self) -> Option<&SourceSpan> {
        self.labels
            .iter()
            .find(|label| label.style == LabelStyle::Primary)
            .map(|label| &label.span)
    }

    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// 1-based line and column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LineColumn {
    pub line: usize,
    pub column: usize,
}

impl LineColumn {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

/// A span looked up in its source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSpan {
    pub span: SourceSpan,
    pub start: LineColumn,
    pub end: LineColumn,
    /// Every line the span touches, in full.
    pub source_lines: Vec<String>,
}
