//! x86 code generation backend
//!
//! This backend generates 32-bit x86 assembly in AT&T syntax for a Linux
//! process: `_start` calls `main` and exits with its result.

mod emit;
mod frame;
mod inst;

pub use emit::CodeGenerator;
pub use frame::{FrameLayout, LabelAllocator, WORD_SIZE};
pub use inst::*;

use crate::backend::{Backend, BackendOutput};
use crate::common::DiagnosticReporter;
use crate::frontend::ast::TranslationUnit;

/// x86 assembly backend
#[derive(Debug, Clone, Copy, Default)]
pub struct X86Backend;

impl X86Backend {
    pub fn new() -> Self {
        Self
    }
}

impl Backend for X86Backend {
    fn name(&self) -> &'static str {
        "x86"
    }

    fn target(&self) -> &'static str {
        "x86 32-bit (GNU as, AT&T syntax)"
    }

    fn generate(&self, unit: &TranslationUnit, reporter: &DiagnosticReporter) -> BackendOutput {
        let mut codegen = CodeGenerator::new(reporter);
        let text = codegen.generate(unit);
        BackendOutput {
            text,
            success: !codegen.had_error(),
        }
    }
}
