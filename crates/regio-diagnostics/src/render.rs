//! Diagnostic rendering for terminal output.
//!
//! `TerminalRenderer` writes to any `termcolor::WriteColor`, so the same
//! code path drives colored stderr output and plain buffers in tests.

use crate::span::{Label, LabelStyle, LineColumn, ResolvedSpan, SourceSpan};
use crate::{Diagnostic, DiagnosticResult, DiagnosticSeverity};
use std::collections::HashMap;
use std::io::Write;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};
use unicode_width::UnicodeWidthStr;

/// Palette selection. `Cvd` uses an orange/blue scheme that stays
/// distinguishable under common color vision deficiencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorMode {
    #[default]
    Standard,
    Cvd,
    HighContrast,
}

#[derive(Debug, Clone)]
pub struct RenderConfig {
    pub use_color: bool,
    pub color_mode: ColorMode,
    /// Source lines wider than this are cut off with `...`.
    pub max_width: usize,
    pub show_docs_links: bool,
    pub docs_base_url: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            use_color: true,
            color_mode: ColorMode::Standard,
            max_width: 100,
            show_docs_links: true,
            docs_base_url: "https://regio.dev/errors".to_string(),
        }
    }
}

pub trait DiagnosticRenderer {
    fn render(&mut self, diagnostic: &Diagnostic, sources: &SourceCache) -> DiagnosticResult<()>;

    /// Renders each diagnostic, then the summary line.
    fn render_all(&mut self, diagnostics: &[Diagnostic], sources: &SourceCache) -> DiagnosticResult<()> {
        diagnostics
            .iter()
            .try_for_each(|diagnostic| self.render(diagnostic, sources))?;
        self.render_summary(diagnostics)
    }

    fn render_summary(&mut self, diagnostics: &[Diagnostic]) -> DiagnosticResult<()>;
}

/// Front-end source text, keyed by the path stored in each span.
#[derive(Debug, Default)]
pub struct SourceCache {
    files: HashMap<String, String>,
}

impl SourceCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_source(&mut self, path: impl Into<String>, source: impl Into<String>) {
        self.files.insert(path.into(), source.into());
    }

    pub fn get_source(&self, path: &str) -> Option<&str> {
        self.files.get(path).map(String::as_str)
    }

    /// `None` when the span's file was never added.
    pub fn resolve_span(&self, span: &SourceSpan) -> Option<ResolvedSpan> {
        let source = self.get_source(&span.file.to_string_lossy())?;
        let start = line_column(source, span.start);
        let end = line_column(source, span.end);

        let source_lines = source
            .lines()
            .skip(start.line - 1)
            .take(end.line.saturating_sub(start.line) + 1)
            .map(str::to_owned)
            .collect();

        Some(ResolvedSpan {
            span: span.clone(),
            start,
            end,
            source_lines,
        })
    }
}

fn line_column(source: &str, offset: usize) -> LineColumn {
    let before = &source[..floor_char_boundary(source, offset)];
    let line = before.matches('\n').count() + 1;
    let line_start = before.rfind('\n').map_or(0, |i| i + 1);
    LineColumn::new(line, before[line_start..].chars().count() + 1)
}

fn floor_char_boundary(source: &str, offset: usize) -> usize {
    let mut offset = offset.min(source.len());
    while !source.is_char_boundary(offset) {
        offset -= 1;
    }
    offset
}

/// Display width of the first `chars` characters of `line`.
fn display_width(line: &str, chars: usize) -> usize {
    let end = line
        .char_indices()
        .nth(chars)
        .map(|(i, _)| i)
        .unwrap_or(line.len());
    line[..end].width()
}

/// Renders diagnostics as rustc-style text.
pub struct TerminalRenderer<W: WriteColor> {
    config: RenderConfig,
    out: W,
}

impl TerminalRenderer<StandardStream> {
    pub fn stderr(config: RenderConfig) -> Self {
        let color_choice = if config.use_color {
            ColorChoice::Auto
        } else {
            ColorChoice::Never
        };
        Self::new(StandardStream::stderr(color_choice), config)
    }
}

impl<W: WriteColor> TerminalRenderer<W> {
    pub fn new(out: W, config: RenderConfig) -> Self {
        Self { config, out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn severity_color(&self, severity: DiagnosticSeverity) -> Color {
        match (severity, self.config.color_mode) {
            (DiagnosticSeverity::Error, ColorMode::Standard | ColorMode::HighContrast) => Color::Red,
            (DiagnosticSeverity::Note, ColorMode::Standard | ColorMode::HighContrast) => Color::Cyan,
            (DiagnosticSeverity::Help, ColorMode::Standard | ColorMode::HighContrast) => Color::Green,
            (DiagnosticSeverity::Error, ColorMode::Cvd) => Color::Rgb(213, 94, 0),
            (DiagnosticSeverity::Note, ColorMode::Cvd) => Color::Rgb(0, 114, 178),
            (DiagnosticSeverity::Help, ColorMode::Cvd) => Color::Rgb(0, 114, 178),
        }
    }

    fn underline_char(style: LabelStyle, severity: DiagnosticSeverity) -> char {
        match style {
            LabelStyle::Primary => severity.underline_char(),
            LabelStyle::Secondary => '-',
        }
    }

    fn write_colored(&mut self, text: &str, color: Color, bold: bool) -> DiagnosticResult<()> {
        let mut spec = ColorSpec::new();
        spec.set_fg(Some(color));
        if bold || self.config.color_mode == ColorMode::HighContrast {
            spec.set_bold(true);
        }
        self.out.set_color(&spec)?;
        write!(self.out, "{}", text)?;
        self.out.reset()?;
        Ok(())
    }

    /// `error[E2001]: message`
    fn write_severity_header(&mut self, diagnostic: &Diagnostic) -> DiagnosticResult<()> {
        let color = self.severity_color(diagnostic.severity);
        let header = match &diagnostic.code {
            Some(code) => format!("{}[{}]: {}", diagnostic.severity.prefix(), code, diagnostic.message),
            None => format!("{}: {}", diagnostic.severity.prefix(), diagnostic.message),
        };
        self.write_colored(&header, color, true)?;
        writeln!(self.out)?;
        Ok(())
    }

    fn write_ir_position(&mut self, diagnostic: &Diagnostic) -> DiagnosticResult<()> {
        if let Some(position) = &diagnostic.position {
            writeln!(self.out, " --> {}", position)?;
            if let Some(text) = &position.op_text {
                self.write_colored("  |", Color::Blue, false)?;
                writeln!(self.out, " {}", text)?;
            }
        }
        Ok(())
    }

    fn write_source_line(&mut self, line_num: usize, line: &str, gutter: usize) -> DiagnosticResult<()> {
        let line_num_str = format!("{:>width$}", line_num, width = gutter);
        self.write_colored(&line_num_str, Color::Blue, false)?;
        write!(self.out, " | ")?;

        let limit = self.config.max_width.saturating_sub(gutter + 3);
        if line.chars().count() > limit {
            let shown: String = line.chars().take(limit.saturating_sub(3)).collect();
            writeln!(self.out, "{}...", shown)?;
        } else {
            writeln!(self.out, "{}", line)?;
        }
        Ok(())
    }

    fn write_underline(
        &mut self,
        label: &Label,
        resolved: &ResolvedSpan,
        severity: DiagnosticSeverity,
        gutter: usize,
    ) -> DiagnosticResult<()> {
        let color = self.severity_color(if label.style == LabelStyle::Primary {
            severity
        } else {
            DiagnosticSeverity::Note
        });

        write!(self.out, "{:>width$} | ", "", width = gutter)?;

        let first_line = resolved.source_lines.first().map(String::as_str).unwrap_or("");
        let pad = display_width(first_line, resolved.start.column.saturating_sub(1));
        write!(self.out, "{:>width$}", "", width = pad)?;

        let underline_len = if resolved.start.line == resolved.end.line {
            resolved.end.column.saturating_sub(resolved.start.column).max(1)
        } else {
            1
        };
        let underline: String = std::iter::repeat(Self::underline_char(label.style, severity))
            .take(underline_len)
            .collect();
        self.write_colored(&underline, color, false)?;

        if !label.message.is_empty() {
            write!(self.out, " ")?;
            self.write_colored(&label.message, color, false)?;
        }
        writeln!(self.out)?;
        Ok(())
    }

    fn write_source_context(&mut self, diagnostic: &Diagnostic, sources: &SourceCache) -> DiagnosticResult<()> {
        let Some(primary_span) = diagnostic.spans.primary_span() else {
            return Ok(());
        };
        let Some(resolved) = sources.resolve_span(primary_span) else {
            // No source text: still point at the file offset.
            writeln!(
                self.out,
                " --> {}@{}..{}",
                primary_span.file.display(),
                primary_span.start,
                primary_span.end
            )?;
            return Ok(());
        };

        writeln!(
            self.out,
            " --> {}:{}:{}",
            resolved.span.file.display(),
            resolved.start.line,
            resolved.start.column
        )?;
        let gutter = resolved.end.line.to_string().len().max(2);
        writeln!(self.out, "{:>width$} |", "", width = gutter)?;
        for (i, line) in resolved.source_lines.iter().enumerate() {
            self.write_source_line(resolved.start.line + i, line, gutter)?;
        }
        for label in diagnostic.spans.labels() {
            if let Some(label_resolved) = sources.resolve_span(&label.span) {
                if label_resolved.start.line == resolved.start.line {
                    self.write_underline(label, &label_resolved, diagnostic.severity, gutter)?;
                }
            }
        }
        Ok(())
    }

    fn write_children(&mut self, diagnostic: &Diagnostic) -> DiagnosticResult<()> {
        for child in &diagnostic.children {
            let color = self.severity_color(child.severity);
            write!(self.out, "  = ")?;
            self.write_colored(child.severity.prefix(), color, true)?;
            writeln!(self.out, ": {}", child.message)?;
        }
        Ok(())
    }

    fn write_docs_link(&mut self, code: &str) -> DiagnosticResult<()> {
        if self.config.show_docs_links {
            let color = self.severity_color(DiagnosticSeverity::Note);
            self.write_colored("  docs: ", color, false)?;
            writeln!(self.out, "{}/{}", self.config.docs_base_url, code)?;
        }
        Ok(())
    }
}

impl<W: WriteColor> DiagnosticRenderer for TerminalRenderer<W> {
    fn render(&mut self, diagnostic: &Diagnostic, sources: &SourceCache) -> DiagnosticResult<()> {
        self.write_severity_header(diagnostic)?;
        self.write_ir_position(diagnostic)?;
        self.write_source_context(diagnostic, sources)?;
        self.write_children(diagnostic)?;
        if let Some(code) = &diagnostic.code {
            self.write_docs_link(code)?;
        }
        writeln!(self.out)?;
        Ok(())
    }

    fn render_summary(&mut self, diagnostics: &[Diagnostic]) -> DiagnosticResult<()> {
        let errors = diagnostics.iter().filter(|d| d.severity.is_fatal()).count();
        if errors == 0 {
            return Ok(());
        }

        let color = self.severity_color(DiagnosticSeverity::Error);
        self.write_colored("error", color, true)?;
        let plural = if errors == 1 { "" } else { "s" };
        writeln!(self.out, ": verification failed due to {} error{}", errors, plural)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::IrPosition;
    use pretty_assertions::assert_eq;
    use termcolor::Buffer;

    fn plain_config() -> RenderConfig {
        RenderConfig {
            use_color: false,
            show_docs_links: false,
            ..RenderConfig::default()
        }
    }

    fn render_to_string(diagnostics: &[Diagnostic], sources: &SourceCache) -> String {
        let mut renderer = TerminalRenderer::new(Buffer::no_color(), plain_config());
        renderer.render_all(diagnostics, sources).unwrap();
        String::from_utf8(renderer.into_inner().into_inner()).unwrap()
    }

    #[test]
    fn test_line_column() {
        let source = "line 1\nline 2\nline 3";
        assert_eq!(line_column(source, 0), LineColumn::new(1, 1));
        assert_eq!(line_column(source, 5), LineColumn::new(1, 6));
        assert_eq!(line_column(source, 7), LineColumn::new(2, 1));
        assert_eq!(line_column(source, 14), LineColumn::new(3, 1));
        assert_eq!(line_column(source, 999), LineColumn::new(3, 7));
    }

    #[test]
    fn test_resolve_span() {
        let mut cache = SourceCache::new();
        cache.add_source("unit.rg", "%0 = new_region @C\ndrop %0");

        let resolved = cache.resolve_span(&SourceSpan::new("unit.rg", 24, 26)).unwrap();
        assert_eq!(resolved.start, LineColumn::new(2, 6));
        assert_eq!(resolved.source_lines, vec!["drop %0".to_string()]);
        assert!(cache.resolve_span(&SourceSpan::new("other.rg", 0, 1)).is_none());
    }

    #[test]
    fn test_resolve_reversed_span() {
        let mut cache = SourceCache::new();
        cache.add_source("unit.rg", "%0 = new_region @C\ndrop %0");

        let reversed = SourceSpan {
            file: "unit.rg".into(),
            start: 24,
            end: 2,
        };
        let resolved = cache.resolve_span(&reversed).unwrap();
        assert_eq!(resolved.start, LineColumn::new(2, 6));
        assert_eq!(resolved.source_lines, vec!["drop %0".to_string()]);
    }

    #[test]
    fn test_render_ir_position_and_notes() {
        let diag = Diagnostic::error("E2001", "use of consumed value `%1`")
            .at(IrPosition::op(3).in_unit("main").with_op_text("drop %1"))
            .with_child(Diagnostic::note("`%1` was consumed by op #1"));

        let out = render_to_string(&[diag], &SourceCache::new());
        assert_eq!(
            out,
            "error[E2001]: use of consumed value `%1`\n \
             --> unit `main`, op #3\n  \
             | drop %1\n  \
             = note: `%1` was consumed by op #1\n\n\
             error: verification failed due to 1 error\n"
        );
    }

    #[test]
    fn test_render_source_excerpt() {
        let mut cache = SourceCache::new();
        cache.add_source("unit.rg", "%0 = new_region @C\ndrop %0");

        let diag = Diagnostic::error("E2001", "use of consumed value `%0`")
            .with_primary_span(SourceSpan::new("unit.rg", 24, 26), "used here");

        let out = render_to_string(&[diag], &cache);
        assert!(out.contains(" --> unit.rg:2:6\n"));
        assert!(out.contains(" 2 | drop %0\n"));
        assert!(out.contains("   |      ^^ used here\n"));
    }

    #[test]
    fn test_render_config_default() {
        let config = RenderConfig::default();
        assert!(config.use_color);
        assert_eq!(config.color_mode, ColorMode::Standard);
        assert_eq!(config.max_width, 100);
        assert!(config.show_docs_links);
    }
}
