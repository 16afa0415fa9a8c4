//! C subset frontend
//!
//! This frontend handles:
//! - Preprocessing (`#include`, `#define`, `#undef`) inside the lexer
//! - Lexing source buffers into tokens
//! - Parsing tokens into the AST with error recovery

pub mod ast;
pub mod lexer;
pub mod parser;
pub mod preprocessor;
pub mod printer;
pub mod source;

use std::path::PathBuf;

use log::info;

use crate::common::DiagnosticReporter;

pub use ast::TranslationUnit;
pub use lexer::{Lexer, LexerConfig, Token, TokenKind};
pub use parser::Parser;
pub use source::{FileLoader, FsLoader, MemoryLoader};

/// Configuration options passed to frontends
#[derive(Debug, Clone, Default)]
pub struct FrontendConfig {
    pub lexer: LexerConfig,
    pub dump_tokens: bool,
    pub dump_ast: bool,
}

/// Compilation context providing access to diagnostics and file loading
pub struct CompileContext<'a> {
    /// Path of the main source file; quoted includes resolve against its directory
    pub path: PathBuf,
    pub reporter: &'a DiagnosticReporter,
    pub loader: &'a dyn FileLoader,
}

impl<'a> CompileContext<'a> {
    pub fn new(
        path: impl Into<PathBuf>,
        reporter: &'a DiagnosticReporter,
        loader: &'a dyn FileLoader,
    ) -> Self {
        Self {
            path: path.into(),
            reporter,
            loader,
        }
    }
}

/// Trait for language frontends
///
/// A frontend turns source text into an AST, reporting every lexical and
/// syntax error through the context's reporter.
pub trait Frontend {
    /// The name of this frontend (e.g., "c")
    fn name(&self) -> &'static str;

    /// File extensions this frontend handles
    fn extensions(&self) -> &'static [&'static str];

    /// Parse `source`; `None` if any error was reported
    fn parse(
        &self,
        source: &str,
        ctx: &CompileContext,
        config: &FrontendConfig,
    ) -> Option<TranslationUnit>;
}

/// Frontend for the C subset
#[derive(Debug, Clone, Copy, Default)]
pub struct CFrontend;

impl CFrontend {
    pub fn new() -> Self {
        Self
    }

    fn lexer<'a>(
        &self,
        source: &str,
        ctx: &CompileContext<'a>,
        reporter: &'a DiagnosticReporter,
        config: &FrontendConfig,
    ) -> Lexer<'a> {
        Lexer::new(
            ctx.path.clone(),
            source,
            reporter,
            ctx.loader,
            config.lexer.clone(),
        )
    }
}

impl Frontend for CFrontend {
    fn name(&self) -> &'static str {
        "c"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &[".c", ".h"]
    }

    fn parse(
        &self,
        source: &str,
        ctx: &CompileContext,
        config: &FrontendConfig,
    ) -> Option<TranslationUnit> {
        // Optional token dump, on a separate lexer so nothing is reported twice
        if config.dump_tokens {
            let quiet = DiagnosticReporter::silent();
            let tokens = self.lexer(source, ctx, &quiet, config).tokenize_all();
            eprintln!("=== Tokens ===");
            for token in &tokens {
                eprintln!("{}: {:?} {:?}", token.pos.line, token.kind, token.lexeme);
            }
            eprintln!("=== End Tokens ===\n");
        }

        info!("parsing {}", ctx.path.display());
        let lexer = self.lexer(source, ctx, ctx.reporter, config);
        let mut parser = Parser::new(lexer, ctx.reporter);
        let unit = parser.parse();

        if parser.had_error() {
            return None;
        }

        if config.dump_ast {
            eprintln!("=== AST ===");
            eprint!("{}", printer::print_unit(&unit));
            eprintln!("=== End AST ===\n");
        }

        Some(unit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frontend_parses_with_includes() {
        let reporter = DiagnosticReporter::silent();
        let loader = MemoryLoader::new().with_file("lib/answer.h", "#define ANSWER 42\n");
        let ctx = CompileContext::new("main.c", &reporter, &loader);
        let config = FrontendConfig {
            lexer: LexerConfig::default().with_include_dir("lib"),
            ..FrontendConfig::default()
        };

        let unit = CFrontend::new()
            .parse("#include <answer.h>\nint main() { return ANSWER; }", &ctx, &config)
            .expect("parse failed");
        assert_eq!(unit.functions().count(), 1);
    }

    #[test]
    fn test_frontend_reports_failure() {
        let reporter = DiagnosticReporter::silent();
        let loader = MemoryLoader::new();
        let ctx = CompileContext::new("main.c", &reporter, &loader);

        let unit = CFrontend::new().parse("int main() { return }", &ctx, &FrontendConfig::default());
        assert!(unit.is_none());
        assert!(reporter.has_errors());
    }
}
