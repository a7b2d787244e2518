//! Rendering parse diagnostics against their source text.

use ariadne::{Color, Config, Label, Report, ReportKind, Source};
use miette::Diagnostic;

use crate::ParseError;
use onyx_ast::Span;

impl ParseError {
    /// Short text for the label under the offending span
    pub fn label(&self) -> String {
        match self {
            ParseError::UnexpectedToken { found, .. } => format!("found {}", found),
            ParseError::UnexpectedEof { .. } => "input ends here".to_string(),
            ParseError::MissingOperand { .. } => "expected an operand here".to_string(),
            ParseError::UnclosedDelimiter { expected, .. } => format!("expected {}", expected),
            ParseError::InvalidPattern { .. } => "not a valid pattern".to_string(),
            ParseError::Ambiguous { .. } => "read as an object literal".to_string(),
            ParseError::NestingTooDeep { .. } => "nesting limit reached here".to_string(),
            ParseError::Lex(_) => "here".to_string(),
        }
    }
}

/// Byte range for a label; empty spans grow to cover one character so they
/// stay visible, including at end of input.
fn label_range(source: &str, span: Span) -> std::ops::Range<usize> {
    let start = span.start.min(source.len());
    let end = span.end.min(source.len());
    if start < end {
        return start..end;
    }
    if let Some(c) = source[start..].chars().next() {
        return start..start + c.len_utf8();
    }
    match source.char_indices().next_back() {
        Some((i, _)) => i..source.len(),
        None => 0..0,
    }
}

/// Render one diagnostic as plain text (no ANSI colors).
pub fn render(filename: &str, source: &str, error: &ParseError) -> String {
    let range = label_range(source, error.span());
    let code = error
        .code()
        .map(|c| c.to_string())
        .unwrap_or_else(|| "onyx::parse".to_string());

    let mut builder = Report::build(ReportKind::Error, filename, range.start)
        .with_config(Config::default().with_color(false))
        .with_code(code)
        .with_message(error.to_string())
        .with_label(
            Label::new((filename, range))
                .with_message(error.label())
                .with_color(Color::Red),
        );

    if let ParseError::UnclosedDelimiter {
        delimiter,
        open_span,
        ..
    } = error
    {
        builder = builder.with_label(
            Label::new((filename, label_range(source, *open_span)))
                .with_message(format!("{} opened here", delimiter))
                .with_color(Color::Blue),
        );
    }
    if let Some(help) = error.help() {
        builder = builder.with_help(help.to_string());
    }

    let mut out = Vec::new();
    match builder
        .finish()
        .write((filename, Source::from(source)), &mut out)
    {
        Ok(()) => String::from_utf8_lossy(&out).into_owned(),
        Err(_) => error.to_string(),
    }
}

/// Render every diagnostic, in order, separated by blank lines.
pub fn render_all(filename: &str, source: &str, errors: &[ParseError]) -> String {
    errors
        .iter()
        .map(|e| render(filename, source, e))
        .collect::<Vec<_>>()
        .join("\n")
}
