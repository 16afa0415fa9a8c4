//! Error types and diagnostic reporting

use std::cell::RefCell;
use std::io::Write;

use codespan_reporting::diagnostic::{Diagnostic, Label};
use codespan_reporting::files::SimpleFiles;
use codespan_reporting::term;
use codespan_reporting::term::termcolor::{ColorChoice, StandardStream};
use thiserror::Error;

use super::{BufferId, SourcePos};

/// Compile error with source location
#[derive(Error, Debug)]
pub enum CompileError {
    #[error("lexical error: {message}")]
    Lexer { message: String, pos: SourcePos },

    #[error("syntax error: {message}")]
    Parser { message: String, pos: SourcePos },

    #[error("semantic error: {message}")]
    Semantic { message: String, pos: SourcePos },

    #[error("code generation error: {message}")]
    Codegen { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CompileError {
    pub fn lexer(message: impl Into<String>, pos: SourcePos) -> Self {
        Self::Lexer {
            message: message.into(),
            pos,
        }
    }

    pub fn parser(message: impl Into<String>, pos: SourcePos) -> Self {
        Self::Parser {
            message: message.into(),
            pos,
        }
    }

    pub fn semantic(message: impl Into<String>, pos: SourcePos) -> Self {
        Self::Semantic {
            message: message.into(),
            pos,
        }
    }

    pub fn codegen(message: impl Into<String>) -> Self {
        Self::Codegen {
            message: message.into(),
        }
    }

    pub fn kind(&self) -> DiagnosticKind {
        match self {
            CompileError::Lexer { .. } => DiagnosticKind::Lexical,
            CompileError::Parser { .. } => DiagnosticKind::Syntax,
            CompileError::Semantic { .. } | CompileError::Codegen { .. } => DiagnosticKind::Semantic,
            CompileError::Io(_) => DiagnosticKind::Io,
        }
    }

    /// Message without the kind prefix
    pub fn message(&self) -> String {
        match self {
            CompileError::Lexer { message, .. }
            | CompileError::Parser { message, .. }
            | CompileError::Semantic { message, .. }
            | CompileError::Codegen { message } => message.clone(),
            CompileError::Io(err) => err.to_string(),
        }
    }

    pub fn pos(&self) -> Option<SourcePos> {
        match self {
            CompileError::Lexer { pos, .. }
            | CompileError::Parser { pos, .. }
            | CompileError::Semantic { pos, .. } => Some(*pos),
            CompileError::Codegen { .. } | CompileError::Io(_) => None,
        }
    }
}

pub type CompileResult<T> = Result<T, CompileError>;

/// Coarse classification of a reported error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    Lexical,
    Syntax,
    Semantic,
    Io,
}

impl DiagnosticKind {
    fn title(&self) -> &'static str {
        match self {
            DiagnosticKind::Lexical => "Lexical error",
            DiagnosticKind::Syntax => "Syntax error",
            DiagnosticKind::Semantic => "Semantic error",
            DiagnosticKind::Io => "IO error",
        }
    }
}

/// One diagnostic as recorded by the reporter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportedDiagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
    pub pos: Option<SourcePos>,
}

/// How reported errors are rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DiagnosticStyle {
    /// `<line>: error: <message>.`
    #[default]
    Plain,
    /// Source snippets through codespan-reporting
    Rich,
    /// Record only, print nothing
    Silent,
}

/// Shared diagnostic sink.
///
/// Lexer, parser and code generator all hold a shared reference; reporting
/// never fails and never aborts the pipeline. Every source buffer is
/// registered here so positions can be rendered against their text.
pub struct DiagnosticReporter {
    files: RefCell<SimpleFiles<String, String>>,
    reported: RefCell<Vec<ReportedDiagnostic>>,
    writer: StandardStream,
    config: term::Config,
    style: DiagnosticStyle,
}

impl DiagnosticReporter {
    pub fn new() -> Self {
        Self::with_style(DiagnosticStyle::Plain)
    }

    pub fn with_style(style: DiagnosticStyle) -> Self {
        Self {
            files: RefCell::new(SimpleFiles::new()),
            reported: RefCell::new(Vec::new()),
            writer: StandardStream::stderr(ColorChoice::Auto),
            config: term::Config::default(),
            style,
        }
    }

    /// Reporter that records diagnostics without printing them
    pub fn silent() -> Self {
        Self::with_style(DiagnosticStyle::Silent)
    }

    pub fn add_file(&self, name: impl Into<String>, source: impl Into<String>) -> BufferId {
        BufferId(self.files.borrow_mut().add(name.into(), source.into()))
    }

    pub fn file_name(&self, id: BufferId) -> Option<String> {
        self.files.borrow().get(id.0).ok().map(|file| file.name().clone())
    }

    pub fn report_error(&self, error: &CompileError) {
        let record = ReportedDiagnostic {
            kind: error.kind(),
            message: error.message(),
            pos: error.pos(),
        };

        match self.style {
            DiagnosticStyle::Plain => self.emit_plain(&record),
            DiagnosticStyle::Rich => self.emit_rich(&record),
            DiagnosticStyle::Silent => {}
        }

        self.reported.borrow_mut().push(record);
    }

    pub fn error_count(&self) -> usize {
        self.reported.borrow().len()
    }

    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }

    pub fn diagnostics(&self) -> Vec<ReportedDiagnostic> {
        self.reported.borrow().clone()
    }

    pub fn count_of(&self, kind: DiagnosticKind) -> usize {
        self.reported.borrow().iter().filter(|d| d.kind == kind).count()
    }

    fn emit_plain(&self, record: &ReportedDiagnostic) {
        let _ = writeln!(self.writer.lock(), "{}", plain_line(record));
    }

    fn emit_rich(&self, record: &ReportedDiagnostic) {
        let diagnostic = match record.pos {
            Some(pos) => Diagnostic::error()
                .with_message(record.kind.title())
                .with_labels(vec![
                    Label::primary(pos.buffer.0, pos.span.start..pos.span.end)
                        .with_message(record.message.clone()),
                ]),
            None => Diagnostic::error()
                .with_message(format!("{}: {}", record.kind.title(), record.message)),
        };

        let files = self.files.borrow();
        let _ = term::emit(&mut self.writer.lock(), &self.config, &*files, &diagnostic);
    }
}

/// `<line>: error: <message>.` with the 0-based line of the position
fn plain_line(record: &ReportedDiagnostic) -> String {
    match record.pos {
        Some(pos) => format!("{}: error: {}.", pos.line, record.message),
        None => format!("error: {}.", record.message),
    }
}

impl Default for DiagnosticReporter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Span;

    #[test]
    fn test_records_every_report() {
        let reporter = DiagnosticReporter::silent();
        let file = reporter.add_file("main.c", "int main() { return x; }");
        let pos = SourcePos::new(file, 0, Span::new(20, 21));

        reporter.report_error(&CompileError::semantic("undefined variable 'x'", pos));
        reporter.report_error(&CompileError::codegen("label counter exhausted"));

        assert_eq!(reporter.error_count(), 2);
        assert_eq!(reporter.count_of(DiagnosticKind::Semantic), 2);
        let first = &reporter.diagnostics()[0];
        assert_eq!(first.message, "undefined variable 'x'");
        assert_eq!(first.pos, Some(pos));
        assert_eq!(reporter.file_name(file).as_deref(), Some("main.c"));
    }

    #[test]
    fn test_plain_line_format() {
        let reporter = DiagnosticReporter::silent();
        let file = reporter.add_file("main.c", "int main()\n{\n  return 1\n}");
        let pos = SourcePos::new(file, 3, Span::new(23, 24));
        reporter.report_error(&CompileError::parser("expected ';' after return value", pos));
        reporter.report_error(&CompileError::codegen("label counter exhausted"));

        let lines: Vec<String> = reporter.diagnostics().iter().map(plain_line).collect();
        assert_eq!(
            lines,
            vec![
                "3: error: expected ';' after return value.",
                "error: label counter exhausted.",
            ]
        );
    }
}
