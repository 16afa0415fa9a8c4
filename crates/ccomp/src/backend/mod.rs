//! Backend trait and implementations
//!
//! Backends are responsible for:
//! 1. Lowering the AST to target-specific instructions
//! 2. Stack frame layout
//! 3. Emitting assembly text

pub mod x86;

use crate::common::DiagnosticReporter;
use crate::frontend::ast::TranslationUnit;

pub use x86::X86Backend;

/// Output from a backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendOutput {
    /// Assembly text
    pub text: String,
    /// False if any error was reported while generating; the text is then
    /// best-effort and must not be assembled
    pub success: bool,
}

/// Trait for code generation backends
///
/// A backend converts a parsed translation unit to target output, reporting
/// semantic errors through the shared reporter.
pub trait Backend {
    /// The name of this backend (e.g., "x86")
    fn name(&self) -> &'static str;

    /// Target architecture description
    fn target(&self) -> &'static str;

    /// Generate output from the AST
    fn generate(&self, unit: &TranslationUnit, reporter: &DiagnosticReporter) -> BackendOutput;
}
