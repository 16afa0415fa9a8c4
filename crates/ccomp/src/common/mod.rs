//! Common infrastructure shared by the frontend, backend and driver

mod error;
mod span;

pub use error::{
    CompileError, CompileResult, DiagnosticKind, DiagnosticReporter, DiagnosticStyle,
    ReportedDiagnostic,
};
pub use span::{BufferId, SourcePos, Span};
