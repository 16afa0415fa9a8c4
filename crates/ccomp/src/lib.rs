//! CComp - single-pass compiler for a small subset of C
//!
//! This library compiles `int`-only C functions to 32-bit x86 assembly in
//! AT&T syntax, ready for the GNU assembler.
//!
//! ## Architecture
//!
//! The compiler is organized into:
//! - **Frontend** (`frontend/`): lexing with an integrated preprocessor,
//!   parsing with error recovery, AST printing
//! - **Backends** (`backend/`): target-specific code generation (x86)
//! - **Driver** (`driver/`): the pipeline tying the two together
//! - **Common** (`common/`): shared infrastructure (errors, positions)

pub mod backend;
pub mod common;
pub mod driver;
pub mod frontend;

// Re-exports for convenience
pub use backend::{Backend, BackendOutput, X86Backend};
pub use common::{CompileError, CompileResult, DiagnosticReporter, DiagnosticStyle, SourcePos};
pub use driver::{CompileOptions, CompileOutput, Pipeline, compile_source};
pub use frontend::{CFrontend, CompileContext, Frontend, FrontendConfig, LexerConfig};
