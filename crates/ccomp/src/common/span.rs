//! Source positions

/// Byte range inside one source buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Handle of a registered source buffer (a file or a macro body).
///
/// Buffers are registered with the [`DiagnosticReporter`](super::DiagnosticReporter),
/// so the handle doubles as the file id used when rendering diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BufferId(pub usize);

/// Position of a token or node: the buffer it was scanned from, the 0-based
/// line inside that buffer and the byte span of the originating token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SourcePos {
    pub buffer: BufferId,
    pub line: usize,
    pub span: Span,
}

impl SourcePos {
    pub fn new(buffer: BufferId, line: usize, span: Span) -> Self {
        Self { buffer, line, span }
    }
}
