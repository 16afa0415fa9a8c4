//! Source buffers and the file loading seam

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::common::BufferId;

/// What a buffer was created from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BufferKind {
    /// A loaded file (the main source or an `#include` target)
    File { path: PathBuf },
    /// Replacement text of an object-like macro
    Macro { name: String },
}

/// Immutable, randomly indexable source text.
///
/// Shared between the lexer's buffer stack and the macro table, so it is
/// always handled through `Rc`.
#[derive(Debug)]
pub struct SourceBuffer {
    id: BufferId,
    kind: BufferKind,
    text: Rc<str>,
}

impl SourceBuffer {
    pub fn file(id: BufferId, path: impl Into<PathBuf>, text: impl Into<Rc<str>>) -> Self {
        Self {
            id,
            kind: BufferKind::File { path: path.into() },
            text: text.into(),
        }
    }

    pub fn macro_body(id: BufferId, name: impl Into<String>, text: impl Into<Rc<str>>) -> Self {
        Self {
            id,
            kind: BufferKind::Macro { name: name.into() },
            text: text.into(),
        }
    }

    pub fn id(&self) -> BufferId {
        self.id
    }

    pub fn kind(&self) -> &BufferKind {
        &self.kind
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn shared_text(&self) -> Rc<str> {
        Rc::clone(&self.text)
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn is_file(&self) -> bool {
        matches!(self.kind, BufferKind::File { .. })
    }

    /// Name of the macro this buffer expands, if it is a macro body
    pub fn macro_name(&self) -> Option<&str> {
        match &self.kind {
            BufferKind::Macro { name } => Some(name),
            BufferKind::File { .. } => None,
        }
    }

    /// Directory used to resolve quoted includes found in this buffer
    pub fn directory(&self) -> Option<PathBuf> {
        match &self.kind {
            BufferKind::File { path } => Some(
                path.parent()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| PathBuf::from(".")),
            ),
            BufferKind::Macro { .. } => None,
        }
    }
}

/// Loads the complete contents of a source file.
///
/// Used for `#include`; a failure becomes an error token, never an abort.
pub trait FileLoader {
    fn load(&self, path: &Path) -> io::Result<String>;
}

/// Reads files from the local filesystem
#[derive(Debug, Clone, Copy, Default)]
pub struct FsLoader;

impl FileLoader for FsLoader {
    fn load(&self, path: &Path) -> io::Result<String> {
        fs::read_to_string(path)
    }
}

/// In-memory file set, keyed by path
#[derive(Debug, Clone, Default)]
pub struct MemoryLoader {
    files: HashMap<PathBuf, String>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        self.insert(path, text);
        self
    }

    pub fn insert(&mut self, path: impl Into<PathBuf>, text: impl Into<String>) {
        self.files.insert(path.into(), text.into());
    }
}

impl FileLoader for MemoryLoader {
    fn load(&self, path: &Path) -> io::Result<String> {
        self.files.get(path).cloned().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("{} not found", path.display()))
        })
    }
}
