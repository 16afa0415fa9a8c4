//! Lexer implementation using logos over a stack of source buffers

use std::mem;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use log::{debug, trace};
use logos::Logos;

use super::token::{Token, TokenKind};
use crate::common::{DiagnosticReporter, SourcePos, Span};
use crate::frontend::preprocessor::{Directive, IncludeStyle, Macro, MacroTable, parse_directive};
use crate::frontend::source::{FileLoader, FsLoader, SourceBuffer};

/// Combined limit on nested includes and macro expansions
pub const DEFAULT_MAX_NESTING_DEPTH: usize = 200;

/// Lexer configuration
#[derive(Debug, Clone)]
pub struct LexerConfig {
    /// Searched for `<...>` includes, and after the including file's
    /// directory for `"..."` includes
    pub include_dirs: Vec<PathBuf>,
    /// Object-like macros defined before scanning starts
    pub defines: Vec<(String, String)>,
    pub max_nesting_depth: usize,
}

impl Default for LexerConfig {
    fn default() -> Self {
        Self {
            include_dirs: Vec::new(),
            defines: Vec::new(),
            max_nesting_depth: DEFAULT_MAX_NESTING_DEPTH,
        }
    }
}

impl LexerConfig {
    pub fn with_include_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.include_dirs.push(dir.into());
        self
    }

    pub fn with_define(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.defines.push((name.into(), value.into()));
        self
    }
}

/// Scanning state of one buffer on the stack
struct BufferFrame {
    buffer: Rc<SourceBuffer>,
    cursor: usize,
    line: usize,
    at_line_start: bool,
    /// Directory for quoted includes; macro frames inherit their caller's
    include_dir: Option<PathBuf>,
}

impl BufferFrame {
    fn new(buffer: Rc<SourceBuffer>, include_dir: Option<PathBuf>) -> Self {
        Self {
            buffer,
            cursor: 0,
            line: 0,
            at_line_start: true,
            include_dir,
        }
    }

    fn pos(&self, span: Span) -> SourcePos {
        SourcePos::new(self.buffer.id(), self.line, span)
    }
}

/// Lexer for the C subset.
///
/// Produces tokens on demand. Includes and macro expansions push the active
/// buffer and switch to a new one; when that buffer runs out the caller is
/// resumed exactly where it stopped. Invalid input never aborts scanning, it
/// yields an `Error` token whose lexeme is the diagnostic message.
pub struct Lexer<'a> {
    reporter: &'a DiagnosticReporter,
    loader: &'a dyn FileLoader,
    config: LexerConfig,
    active: BufferFrame,
    saved: Vec<BufferFrame>,
    macros: MacroTable,
}

impl<'a> Lexer<'a> {
    /// Create a lexer for the file at `path` whose contents are `text`
    pub fn new(
        path: impl Into<PathBuf>,
        text: impl Into<String>,
        reporter: &'a DiagnosticReporter,
        loader: &'a dyn FileLoader,
        config: LexerConfig,
    ) -> Self {
        let path = path.into();
        let text = text.into();
        let id = reporter.add_file(path.display().to_string(), text.clone());
        let buffer = Rc::new(SourceBuffer::file(id, path, text));
        let include_dir = buffer.directory();

        let mut lexer = Self {
            reporter,
            loader,
            config,
            active: BufferFrame::new(buffer, include_dir),
            saved: Vec::new(),
            macros: MacroTable::new(),
        };

        let defines = mem::take(&mut lexer.config.defines);
        for (name, value) in &defines {
            lexer.define_macro(name, value);
        }
        lexer.config.defines = defines;

        lexer
    }

    /// Lexer over an in-memory string; includes are read from the filesystem
    pub fn from_source(source: &str, reporter: &'a DiagnosticReporter) -> Self {
        Self::new("<input>", source, reporter, &FsLoader, LexerConfig::default())
    }

    pub fn macros(&self) -> &MacroTable {
        &self.macros
    }

    /// Number of buffers currently suspended beneath the active one
    pub fn depth(&self) -> usize {
        self.saved.len()
    }

    /// Get the next token
    pub fn next_token(&mut self) -> Token {
        loop {
            let text = self.active.buffer.shared_text();
            let rest = &text[self.active.cursor..];
            let mut inner = TokenKind::lexer(rest);

            let Some(result) = inner.next() else {
                self.active.line += rest.matches('\n').count();
                self.active.cursor = text.len();

                if let Some(caller) = self.saved.pop() {
                    trace!("leaving buffer {:?}", self.active.buffer.kind());
                    self.active = caller;
                    continue;
                }

                let end = text.len();
                return Token::eof(self.active.pos(Span::new(end, end)));
            };

            let range = inner.span();
            let start = self.active.cursor + range.start;
            let gap_lines = rest[..range.start].matches('\n').count();
            if gap_lines > 0 {
                self.active.line += gap_lines;
                self.active.at_line_start = true;
            }
            let at_line_start = mem::replace(&mut self.active.at_line_start, false);

            let kind = match result {
                Ok(kind) => kind,
                Err(()) => {
                    // Step over exactly one character
                    let ch = rest[range.start..].chars().next().unwrap_or('\0');
                    let end = start + ch.len_utf8();
                    self.active.cursor = end;
                    return Token::error(
                        format!("unrecognized character '{}'", ch.escape_default()),
                        self.active.pos(Span::new(start, end)),
                    );
                }
            };

            let end = self.active.cursor + range.end;
            self.active.cursor = end;
            let pos = self.active.pos(Span::new(start, end));
            let lexeme = inner.slice();

            match kind {
                TokenKind::Hash if at_line_start && self.active.buffer.is_file() => {
                    if let Some(error) = self.handle_directive(&text, pos) {
                        return error;
                    }
                }
                TokenKind::Hash => return Token::error("stray '#' in program", pos),
                kind if kind.is_word() && self.macros.contains(lexeme) => {
                    if let Some(token) = self.expand_macro(kind, lexeme, pos) {
                        return token;
                    }
                }
                kind => return Token::new(kind, lexeme, pos),
            }
        }
    }

    /// Scan until end of file; the returned list ends with the `Eof` token
    pub fn tokenize_all(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            let done = token.is_eof();
            tokens.push(token);
            if done {
                return tokens;
            }
        }
    }

    /// Handle the directive introduced by the `#` at `pos`.
    /// Returns an error token when the directive is rejected.
    fn handle_directive(&mut self, text: &str, pos: SourcePos) -> Option<Token> {
        let parsed = parse_directive(text, pos.span.end);
        self.active.cursor = parsed.end;
        self.active.line += parsed.newlines;

        let directive = match parsed.result {
            Ok(directive) => directive,
            Err(message) => return Some(Token::error(message, pos)),
        };

        match directive {
            Directive::Null => None,
            Directive::Define { name, body } => {
                self.define_macro(&name, &body);
                None
            }
            Directive::Undef { name } => {
                if self.macros.undefine(&name) {
                    debug!("undefined macro {}", name);
                }
                None
            }
            Directive::Include { path, style } => self.push_include(&path, style, pos),
        }
    }

    fn define_macro(&mut self, name: &str, body: &str) {
        let id = self.reporter.add_file(format!("<macro {}>", name), body);
        let buffer = Rc::new(SourceBuffer::macro_body(id, name, body));
        debug!("defined macro {} as {:?}", name, body);
        self.macros.define(Macro::object_like(name, buffer));
    }

    fn push_include(&mut self, path: &str, style: IncludeStyle, pos: SourcePos) -> Option<Token> {
        if let Some(error) = self.check_depth(pos) {
            return Some(error);
        }

        let Some((resolved, text)) = self.resolve_include(path, style) else {
            return Some(Token::error(format!("unable to read file '{}'", path), pos));
        };

        debug!("including {}", resolved.display());
        let id = self.reporter.add_file(resolved.display().to_string(), text.clone());
        let buffer = Rc::new(SourceBuffer::file(id, resolved, text));
        let include_dir = buffer.directory();
        self.push_buffer(buffer, include_dir);
        None
    }

    fn resolve_include(&self, path: &str, style: IncludeStyle) -> Option<(PathBuf, String)> {
        let local = match style {
            IncludeStyle::Quoted => self.active.include_dir.as_deref(),
            IncludeStyle::Angled => None,
        };

        local
            .into_iter()
            .chain(self.config.include_dirs.iter().map(PathBuf::as_path))
            .map(|dir: &Path| dir.join(path))
            .find_map(|candidate| {
                let text = self.loader.load(&candidate).ok()?;
                Some((candidate, text))
            })
    }

    /// Switch to the macro's replacement text, or produce the name as a plain
    /// token when the macro is already being expanded
    fn expand_macro(&mut self, kind: TokenKind, name: &str, pos: SourcePos) -> Option<Token> {
        if self.is_expanding(name) {
            return Some(Token::new(kind, name, pos));
        }
        if let Some(error) = self.check_depth(pos) {
            return Some(error);
        }

        let buffer = Rc::clone(&self.macros.get(name)?.replacement);
        trace!("expanding macro {}", name);
        let include_dir = self.active.include_dir.clone();
        self.push_buffer(buffer, include_dir);
        None
    }

    fn is_expanding(&self, name: &str) -> bool {
        self.saved
            .iter()
            .chain(std::iter::once(&self.active))
            .any(|frame| frame.buffer.macro_name() == Some(name))
    }

    fn check_depth(&self, pos: SourcePos) -> Option<Token> {
        if self.saved.len() < self.config.max_nesting_depth {
            return None;
        }
        Some(Token::error(
            format!(
                "include and macro nesting exceeds {} levels",
                self.config.max_nesting_depth
            ),
            pos,
        ))
    }

    fn push_buffer(&mut self, buffer: Rc<SourceBuffer>, include_dir: Option<PathBuf>) {
        let frame = BufferFrame::new(buffer, include_dir);
        let caller = mem::replace(&mut self.active, frame);
        self.saved.push(caller);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::source::MemoryLoader;
    use pretty_assertions::assert_eq;

    fn scan(loader: &MemoryLoader, path: &str, config: LexerConfig) -> Vec<Token> {
        let reporter = DiagnosticReporter::silent();
        let text = loader.load(Path::new(path)).unwrap();
        let mut lexer = Lexer::new(path, text, &reporter, loader, config);
        lexer.tokenize_all()
    }

    fn kinds(source: &str) -> Vec<TokenKind> {
        let reporter = DiagnosticReporter::silent();
        let mut lexer = Lexer::from_source(source, &reporter);
        lexer.tokenize_all().into_iter().map(|t| t.kind).collect()
    }

    fn lexemes(tokens: &[Token]) -> Vec<(TokenKind, &str)> {
        tokens.iter().map(|t| (t.kind, t.lexeme.as_str())).collect()
    }

    fn scan_source(source: &str) -> Vec<Token> {
        let loader = MemoryLoader::new().with_file("main.c", source);
        scan(&loader, "main.c", LexerConfig::default())
    }

    #[test]
    fn test_simple_tokens() {
        assert_eq!(
            kinds("int main() { return 0; }"),
            vec![
                TokenKind::Int,
                TokenKind::Identifier,
                TokenKind::LParen,
                TokenKind::RParen,
                TokenKind::LBrace,
                TokenKind::Return,
                TokenKind::IntegerNumber,
                TokenKind::Semi,
                TokenKind::RBrace,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_longest_match_punctuators() {
        assert_eq!(
            kinds(">>= >> >= > <<= << <= < ++ + +="),
            vec![
                TokenKind::GtGtEq,
                TokenKind::GtGt,
                TokenKind::GtEq,
                TokenKind::Gt,
                TokenKind::LtLtEq,
                TokenKind::LtLt,
                TokenKind::LtEq,
                TokenKind::Lt,
                TokenKind::PlusPlus,
                TokenKind::Plus,
                TokenKind::PlusEq,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_keywords_need_exact_match() {
        assert_eq!(
            kinds("int integer return returned _x1"),
            vec![
                TokenKind::Int,
                TokenKind::Identifier,
                TokenKind::Return,
                TokenKind::Identifier,
                TokenKind::Identifier,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_line_counting_through_comments() {
        let tokens = scan_source("a\n\nb /* one\ntwo */ c // tail\nd");
        let lines: Vec<usize> = tokens.iter().map(|t| t.pos.line).collect();
        assert_eq!(lines, vec![0, 2, 3, 4, 4]);
    }

    #[test]
    fn test_unrecognized_character_continues() {
        let tokens = scan_source("a @ b");
        assert_eq!(
            lexemes(&tokens),
            vec![
                (TokenKind::Identifier, "a"),
                (TokenKind::Error, "unrecognized character '@'"),
                (TokenKind::Identifier, "b"),
                (TokenKind::Eof, ""),
            ]
        );
    }

    #[test]
    fn test_object_macro_matches_literal() {
        let expanded = scan_source("#define N 42\nint x = N;");
        let direct = scan_source("int x = 42;");
        assert_eq!(lexemes(&expanded), lexemes(&direct));
    }

    #[test]
    fn test_macro_expansion_resumes_caller() {
        let tokens = scan_source("#define TWO 1 + 1\nTWO * 3");
        assert_eq!(
            lexemes(&tokens),
            vec![
                (TokenKind::IntegerNumber, "1"),
                (TokenKind::Plus, "+"),
                (TokenKind::IntegerNumber, "1"),
                (TokenKind::Star, "*"),
                (TokenKind::IntegerNumber, "3"),
                (TokenKind::Eof, ""),
            ]
        );
        // Expanded tokens carry the macro buffer, resumed tokens the file
        assert_ne!(tokens[0].pos.buffer, tokens[3].pos.buffer);
        assert_eq!(tokens[3].pos.buffer, tokens[4].pos.buffer);
        assert_eq!(tokens[3].pos.line, 1);
    }

    #[test]
    fn test_self_reference_is_not_reexpanded() {
        let tokens = scan_source("#define X X + 1\nX");
        assert_eq!(
            lexemes(&tokens),
            vec![
                (TokenKind::Identifier, "X"),
                (TokenKind::Plus, "+"),
                (TokenKind::IntegerNumber, "1"),
                (TokenKind::Eof, ""),
            ]
        );

        let mutual = scan_source("#define A B\n#define B A\nA");
        assert_eq!(
            lexemes(&mutual),
            vec![(TokenKind::Identifier, "A"), (TokenKind::Eof, "")]
        );
    }

    #[test]
    fn test_nesting_depth_limit() {
        let loader =
            MemoryLoader::new().with_file("main.c", "#define A B\n#define B C\n#define C 1\nA");
        let config = LexerConfig {
            max_nesting_depth: 2,
            ..LexerConfig::default()
        };
        let tokens = scan(&loader, "main.c", config);
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].kind, TokenKind::Error);
        assert!(tokens[0].lexeme.contains("nesting exceeds 2"));
        assert!(tokens[1].is_eof());
    }

    #[test]
    fn test_undef_and_redefine() {
        let tokens = scan_source("#define N 1\n#define N 2\nN\n#undef N\nN");
        assert_eq!(
            lexemes(&tokens),
            vec![
                (TokenKind::IntegerNumber, "2"),
                (TokenKind::Identifier, "N"),
                (TokenKind::Eof, ""),
            ]
        );
    }

    #[test]
    fn test_directive_errors_yield_error_tokens() {
        let tokens = scan_source("#define F(x) x\nint # y\n#bogus\nreturn");
        let kinds: Vec<TokenKind> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Error,
                TokenKind::Int,
                TokenKind::Error,
                TokenKind::Identifier,
                TokenKind::Error,
                TokenKind::Return,
                TokenKind::Eof,
            ]
        );
        assert_eq!(tokens[0].lexeme, "function-like macros are not supported");
        assert_eq!(tokens[2].lexeme, "stray '#' in program");
        assert_eq!(tokens[5].pos.line, 3);
    }

    #[test]
    fn test_continued_define_keeps_line_numbers() {
        let tokens = scan_source("#define S 1 + \\\n  2\nint");
        assert_eq!(tokens[0].kind, TokenKind::Int);
        assert_eq!(tokens[0].pos.line, 2);
    }

    #[test]
    fn test_quoted_include_searches_including_directory() {
        let loader = MemoryLoader::new()
            .with_file("src/main.c", "#include \"defs.h\"\nreturn V;")
            .with_file("src/defs.h", "#define V 7\n");
        let tokens = scan(&loader, "src/main.c", LexerConfig::default());
        assert_eq!(
            lexemes(&tokens),
            vec![
                (TokenKind::Return, "return"),
                (TokenKind::IntegerNumber, "7"),
                (TokenKind::Semi, ";"),
                (TokenKind::Eof, ""),
            ]
        );
        assert_eq!(tokens[0].pos.line, 1);
    }

    #[test]
    fn test_angled_include_uses_include_dirs_only() {
        let loader = MemoryLoader::new()
            .with_file("main.c", "#include <val.h>\n")
            .with_file("val.h", "1")
            .with_file("lib/val.h", "2");

        let with_dir = scan(&loader, "main.c", LexerConfig::default().with_include_dir("lib"));
        assert_eq!(with_dir[0].lexeme, "2");

        let without = scan(&loader, "main.c", LexerConfig::default());
        assert_eq!(without[0].kind, TokenKind::Error);
        assert_eq!(without[0].lexeme, "unable to read file 'val.h'");
    }

    #[test]
    fn test_missing_include_then_continue() {
        let loader = MemoryLoader::new().with_file("main.c", "#include \"gone.h\"\nint");
        let tokens = scan(&loader, "main.c", LexerConfig::default());
        assert_eq!(tokens[0].kind, TokenKind::Error);
        assert_eq!(tokens[1].kind, TokenKind::Int);
        assert_eq!(tokens[1].pos.line, 1);
    }

    #[test]
    fn test_predefined_macros() {
        let loader = MemoryLoader::new().with_file("main.c", "DEBUG");
        let tokens = scan(&loader, "main.c", LexerConfig::default().with_define("DEBUG", "1"));
        assert_eq!(tokens[0].kind, TokenKind::IntegerNumber);
        assert_eq!(tokens[0].lexeme, "1");
    }

    #[test]
    fn test_undef_removes_macro() {
        let reporter = DiagnosticReporter::silent();
        let mut lexer = Lexer::from_source("#define A 1\n#define B 2\n#undef A\nB", &reporter);
        let tokens = lexer.tokenize_all();
        assert_eq!(tokens[0].lexeme, "2");
        assert!(!lexer.macros().contains("A"));
        assert!(lexer.macros().contains("B"));
        assert_eq!(lexer.macros().len(), 1);
    }

    #[test]
    fn test_eof_is_sticky() {
        let reporter = DiagnosticReporter::silent();
        let mut lexer = Lexer::from_source("x\n", &reporter);
        assert_eq!(lexer.next_token().kind, TokenKind::Identifier);
        let eof = lexer.next_token();
        assert!(eof.is_eof());
        assert_eq!(eof.pos.line, 1);
        assert!(lexer.next_token().is_eof());
        assert_eq!(lexer.depth(), 0);
    }
}
