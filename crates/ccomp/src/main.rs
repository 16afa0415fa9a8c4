//! CComp - compiler for a small subset of C targeting 32-bit x86
//!
//! Usage: ccomp [OPTIONS] <input> [-o <output>]

use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use clap::{Parser as ClapParser, ValueEnum};
use env_logger::Env;
use log::{debug, info, warn};

use ccomp::{CompileOptions, DiagnosticReporter, DiagnosticStyle, LexerConfig, Pipeline};

/// How diagnostics are printed
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Default)]
enum Diagnostics {
    /// `<line>: error: <message>.`
    #[default]
    Plain,
    /// Annotated source snippets
    Rich,
}

impl From<Diagnostics> for DiagnosticStyle {
    fn from(value: Diagnostics) -> Self {
        match value {
            Diagnostics::Plain => DiagnosticStyle::Plain,
            Diagnostics::Rich => DiagnosticStyle::Rich,
        }
    }
}

#[derive(ClapParser, Debug)]
#[command(name = "ccomp")]
#[command(version)]
#[command(about = "Compiler for a small C subset targeting x86 (AT&T syntax)", long_about = None)]
struct Args {
    /// Input C source file
    #[arg(required = true)]
    input: PathBuf,

    /// Output assembly file (defaults to stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Additional directories searched by `#include`
    #[arg(short = 'I', long = "include", value_name = "DIR")]
    include_dirs: Vec<PathBuf>,

    /// Predefine an object-like macro
    #[arg(short = 'D', long = "define", value_name = "NAME[=VALUE]")]
    defines: Vec<String>,

    /// Maximum include and macro expansion depth
    #[arg(long, default_value_t = ccomp::frontend::lexer::DEFAULT_MAX_NESTING_DEPTH)]
    max_depth: usize,

    /// Diagnostic format
    #[arg(long, value_enum, default_value = "plain")]
    diagnostics: Diagnostics,

    /// Dump tokens (for debugging)
    #[arg(long)]
    dump_tokens: bool,

    /// Dump AST (for debugging)
    #[arg(long)]
    dump_ast: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let args = Args::parse();

    let level = if args.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(Env::default().default_filter_or(level)).init();

    match run(&args) {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            eprintln!("error: {:#}", e);
            process::exit(1);
        }
    }
}

/// `NAME=VALUE` defines NAME as VALUE; a bare `NAME` defines it as `1`
fn parse_define(define: &str) -> (String, String) {
    match define.split_once('=') {
        Some((name, value)) => (name.to_string(), value.to_string()),
        None => (define.to_string(), "1".to_string()),
    }
}

fn lexer_config(args: &Args) -> LexerConfig {
    let mut config = LexerConfig {
        max_nesting_depth: args.max_depth,
        ..LexerConfig::default()
    };
    for dir in &args.include_dirs {
        config = config.with_include_dir(dir.clone());
    }
    for define in &args.defines {
        let (name, value) = parse_define(define);
        config = config.with_define(name, value);
    }
    config
}

/// Compile the input; `Ok(false)` when the source had errors
fn run(args: &Args) -> Result<bool> {
    let options = CompileOptions {
        lexer: lexer_config(args),
        dump_tokens: args.dump_tokens,
        dump_ast: args.dump_ast,
    };
    debug!("{:?}", options);

    let pipeline = Pipeline::new();
    let extension = args
        .input
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()));
    let known = extension
        .as_deref()
        .is_some_and(|ext| pipeline.frontend().extensions().iter().any(|known| *known == ext));
    if !known {
        warn!(
            "{} does not look like a C source file, compiling it anyway",
            args.input.display()
        );
    }

    let reporter = DiagnosticReporter::with_style(args.diagnostics.into());
    let output = pipeline
        .compile_file(&args.input, &options, &reporter)
        .with_context(|| format!("unable to read {}", args.input.display()))?;

    let Some(assembly) = output.assembly else {
        info!("{} error(s), no output written", output.error_count);
        return Ok(false);
    };

    match &args.output {
        Some(path) => {
            fs::write(path, &assembly)
                .with_context(|| format!("unable to write {}", path.display()))?;
            info!("wrote {}", path.display());
        }
        None => {
            let mut stdout = io::stdout().lock();
            stdout
                .write_all(assembly.as_bytes())
                .context("unable to write assembly to stdout")?;
        }
    }

    Ok(true)
}
