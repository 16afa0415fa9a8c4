//! Compilation driver and pipeline orchestration

use std::fs;
use std::path::Path;

use log::info;

use crate::backend::{Backend, X86Backend};
use crate::common::{CompileResult, DiagnosticReporter};
use crate::frontend::{
    CFrontend, CompileContext, FileLoader, Frontend, FrontendConfig, FsLoader, LexerConfig,
};

/// Options for one compilation
#[derive(Debug, Clone, Default)]
pub struct CompileOptions {
    pub lexer: LexerConfig,
    /// Print every token on stderr before parsing
    pub dump_tokens: bool,
    /// Print the AST on stderr after parsing
    pub dump_ast: bool,
}

impl CompileOptions {
    fn frontend_config(&self) -> FrontendConfig {
        FrontendConfig {
            lexer: self.lexer.clone(),
            dump_tokens: self.dump_tokens,
            dump_ast: self.dump_ast,
        }
    }
}

/// Result of running the pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileOutput {
    /// Usable assembly; `None` once any error was reported
    pub assembly: Option<String>,
    /// Errors reported during this compilation
    pub error_count: usize,
}

impl CompileOutput {
    pub fn success(&self) -> bool {
        self.assembly.is_some()
    }
}

/// Compilation pipeline that coordinates the frontend and backend
pub struct Pipeline {
    frontend: Box<dyn Frontend>,
    backend: Box<dyn Backend>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::with(Box::new(CFrontend::new()), Box::new(X86Backend::new()))
    }

    pub fn with(frontend: Box<dyn Frontend>, backend: Box<dyn Backend>) -> Self {
        Self { frontend, backend }
    }

    pub fn frontend(&self) -> &dyn Frontend {
        self.frontend.as_ref()
    }

    /// Compile `source`, the contents of the file at `path`.
    ///
    /// Every error goes through `reporter`; a syntax error stops the
    /// pipeline before code generation.
    pub fn compile(
        &self,
        path: &Path,
        source: &str,
        options: &CompileOptions,
        reporter: &DiagnosticReporter,
        loader: &dyn FileLoader,
    ) -> CompileOutput {
        let errors_before = reporter.error_count();
        let ctx = CompileContext::new(path, reporter, loader);

        info!(
            "compiling {} ({} -> {})",
            path.display(),
            self.frontend.name(),
            self.backend.target()
        );

        let Some(unit) = self.frontend.parse(source, &ctx, &options.frontend_config()) else {
            return CompileOutput {
                assembly: None,
                error_count: reporter.error_count() - errors_before,
            };
        };

        let output = self.backend.generate(&unit, reporter);
        info!("generated {} lines of assembly", output.text.lines().count());

        CompileOutput {
            assembly: output.success.then_some(output.text),
            error_count: reporter.error_count() - errors_before,
        }
    }

    /// Read and compile the file at `path`; includes come from the filesystem
    pub fn compile_file(
        &self,
        path: &Path,
        options: &CompileOptions,
        reporter: &DiagnosticReporter,
    ) -> CompileResult<CompileOutput> {
        let source = fs::read_to_string(path)?;
        Ok(self.compile(path, &source, options, reporter, &FsLoader))
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

/// Compile an in-memory source with default options
pub fn compile_source(source: &str, reporter: &DiagnosticReporter) -> CompileOutput {
    Pipeline::new().compile(
        Path::new("<input>"),
        source,
        &CompileOptions::default(),
        reporter,
        &FsLoader,
    )
}
