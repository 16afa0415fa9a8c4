//! Preprocessor directives and the macro table
//!
//! This module handles the textual side of the preprocessor:
//! - `#include "file"` / `#include <file>` - parsed into an include request
//! - `#define NAME body` - object-like macros, with `\` line continuation
//! - `#undef NAME`
//!
//! The lexer owns the buffer stack; it asks [`parse_directive`] what a
//! directive line means and then performs the include or expansion itself.

use std::collections::HashMap;
use std::rc::Rc;

use super::source::SourceBuffer;

/// Delimiter style of an include path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncludeStyle {
    /// `#include "file"`: the including file's directory first
    Quoted,
    /// `#include <file>`: include directories only
    Angled,
}

/// A parsed directive line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    Include { path: String, style: IncludeStyle },
    Define { name: String, body: String },
    Undef { name: String },
    /// A `#` alone on its line
    Null,
}

/// Result of scanning one directive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedDirective {
    pub result: Result<Directive, String>,
    /// Byte offset just past the directive. The terminating newline is left
    /// in place so the scanner counts it like any other.
    pub end: usize,
    /// Newlines consumed inside the directive (line continuations)
    pub newlines: usize,
}

/// An object-like macro
#[derive(Debug, Clone)]
pub struct Macro {
    pub name: String,
    /// Always false for stored macros: function-like definitions are rejected
    pub is_function_like: bool,
    pub arg_count: usize,
    pub replacement: Rc<SourceBuffer>,
}

impl Macro {
    pub fn object_like(name: impl Into<String>, replacement: Rc<SourceBuffer>) -> Self {
        Self {
            name: name.into(),
            is_function_like: false,
            arg_count: 0,
            replacement,
        }
    }

    pub fn body(&self) -> &str {
        self.replacement.text()
    }
}

/// Macros visible to one lexer. Redefinition overwrites silently.
#[derive(Debug, Default)]
pub struct MacroTable {
    macros: HashMap<String, Macro>,
}

impl MacroTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn define(&mut self, mac: Macro) {
        self.macros.insert(mac.name.clone(), mac);
    }

    pub fn undefine(&mut self, name: &str) -> bool {
        self.macros.remove(name).is_some()
    }

    pub fn get(&self, name: &str) -> Option<&Macro> {
        self.macros.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.macros.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.macros.len()
    }

    pub fn is_empty(&self) -> bool {
        self.macros.is_empty()
    }
}

/// Character cursor over one directive line
struct LineCursor<'t> {
    text: &'t str,
    pos: usize,
    newlines: usize,
}

impl<'t> LineCursor<'t> {
    fn new(text: &'t str, pos: usize) -> Self {
        Self { text, pos, newlines: 0 }
    }

    fn peek(&self) -> Option<char> {
        self.text[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn at_line_end(&self) -> bool {
        matches!(self.peek(), None | Some('\n'))
    }

    fn skip_blanks(&mut self) {
        while matches!(self.peek(), Some(' ' | '\t' | '\r' | '\x0c' | '\x0b')) {
            self.pos += 1;
        }
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> &'t str {
        let start = self.pos;
        while let Some(ch) = self.peek() {
            if !pred(ch) {
                break;
            }
            self.pos += ch.len_utf8();
        }
        &self.text[start..self.pos]
    }

    fn take_identifier(&mut self) -> Option<&'t str> {
        match self.peek() {
            Some(ch) if ch.is_ascii_alphabetic() || ch == '_' => {
                Some(self.take_while(|c| c.is_ascii_alphanumeric() || c == '_'))
            }
            _ => None,
        }
    }

    /// Physical line segment up to (not including) the newline
    fn take_segment(&mut self) -> &'t str {
        self.take_while(|c| c != '\n')
    }

    /// Remainder of the logical line, honouring `\` continuations.
    /// Each backslash-newline pair becomes a single newline.
    fn take_logical_line(&mut self) -> String {
        let mut body = String::new();
        loop {
            let segment = self.take_segment().trim_end_matches('\r');
            match segment.strip_suffix('\\') {
                Some(head) if self.peek() == Some('\n') => {
                    body.push_str(head);
                    body.push('\n');
                    self.bump();
                    self.newlines += 1;
                    self.skip_blanks();
                }
                Some(head) => {
                    body.push_str(head);
                    break;
                }
                None => {
                    body.push_str(segment);
                    break;
                }
            }
        }
        body.trim_end().to_string()
    }

    fn finish(self, result: Result<Directive, String>) -> ParsedDirective {
        ParsedDirective {
            result,
            end: self.pos,
            newlines: self.newlines,
        }
    }
}

/// Parse the directive whose text starts at `start`, just after the `#`.
///
/// Malformed directives discard the rest of their logical line so scanning
/// resumes on the next one.
pub fn parse_directive(text: &str, start: usize) -> ParsedDirective {
    let mut cursor = LineCursor::new(text, start);
    cursor.skip_blanks();

    if cursor.at_line_end() {
        return cursor.finish(Ok(Directive::Null));
    }

    let Some(name) = cursor.take_identifier() else {
        cursor.take_logical_line();
        return cursor.finish(Err("expected preprocessor directive name".to_string()));
    };

    let result = match name {
        "include" => parse_include(&mut cursor),
        "define" => parse_define(&mut cursor),
        "undef" => parse_undef(&mut cursor),
        other => Err(format!("unknown preprocessor directive '#{}'", other)),
    };

    if result.is_err() || !cursor.at_line_end() {
        cursor.take_logical_line();
    }

    cursor.finish(result)
}

fn parse_include(cursor: &mut LineCursor) -> Result<Directive, String> {
    cursor.skip_blanks();
    if cursor.at_line_end() {
        return Err("expected include path".to_string());
    }

    let (close, style) = match cursor.bump() {
        Some('"') => ('"', IncludeStyle::Quoted),
        Some('<') => ('>', IncludeStyle::Angled),
        _ => return Err("expected '\"' or '<' before include path".to_string()),
    };

    let path = cursor.take_while(|c| c != close && c != '\n');
    if cursor.peek() != Some(close) {
        return Err("expected end of include path".to_string());
    }
    cursor.bump();

    if path.is_empty() {
        return Err("empty include path".to_string());
    }

    // Trailing tokens on an include line are ignored
    cursor.take_logical_line();

    Ok(Directive::Include {
        path: path.to_string(),
        style,
    })
}

fn parse_define(cursor: &mut LineCursor) -> Result<Directive, String> {
    cursor.skip_blanks();
    let Some(name) = cursor.take_identifier() else {
        return Err("expected macro name".to_string());
    };

    // A parameter list must follow the name directly
    if cursor.peek() == Some('(') {
        return Err("function-like macros are not supported".to_string());
    }

    cursor.skip_blanks();
    let body = cursor.take_logical_line();

    Ok(Directive::Define {
        name: name.to_string(),
        body,
    })
}

fn parse_undef(cursor: &mut LineCursor) -> Result<Directive, String> {
    cursor.skip_blanks();
    let Some(name) = cursor.take_identifier() else {
        return Err("expected macro name".to_string());
    };
    Ok(Directive::Undef {
        name: name.to_string(),
    })
}
