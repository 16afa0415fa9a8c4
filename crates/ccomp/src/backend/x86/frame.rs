//! Stack frame layout and label allocation

use std::collections::HashMap;

use log::trace;
use string_interner::{DefaultStringInterner, DefaultSymbol};

use crate::common::{CompileError, CompileResult};

/// Size of one frame slot in bytes
pub const WORD_SIZE: i32 = 4;

/// Flat per-function table from variable names to frame slots.
///
/// Slots are handed out in declaration order at `-4(%ebp)`, `-8(%ebp)`, ...
/// matching the `pushl` that stores each initial value. There is no block
/// scoping: a name can be bound once per function.
#[derive(Debug)]
pub struct FrameLayout {
    names: DefaultStringInterner,
    slots: HashMap<DefaultSymbol, i32>,
    next_offset: i32,
}

impl FrameLayout {
    pub fn new() -> Self {
        Self {
            names: DefaultStringInterner::default(),
            slots: HashMap::new(),
            next_offset: -WORD_SIZE,
        }
    }

    /// Bind `name` to the next free slot; `None` if it is already bound
    pub fn declare(&mut self, name: &str) -> Option<i32> {
        let symbol = self.names.get_or_intern(name);
        if self.slots.contains_key(&symbol) {
            return None;
        }

        let offset = self.next_offset;
        self.slots.insert(symbol, offset);
        self.next_offset -= WORD_SIZE;
        trace!("slot {}(%ebp) for {}", offset, name);
        Some(offset)
    }

    pub fn lookup(&self, name: &str) -> Option<i32> {
        let symbol = self.names.get(name)?;
        self.slots.get(&symbol).copied()
    }

    /// Number of bound variables
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Forget every binding, for the next function
    pub fn reset(&mut self) {
        self.slots.clear();
        self.next_offset = -WORD_SIZE;
    }
}

impl Default for FrameLayout {
    fn default() -> Self {
        Self::new()
    }
}

/// Source of unique `_label<n>` names for one compilation
#[derive(Debug, Clone)]
pub struct LabelAllocator {
    next: u64,
    limit: u64,
}

impl LabelAllocator {
    pub fn new() -> Self {
        Self::with_limit(u64::MAX)
    }

    /// Allocator that fails after `limit` labels
    pub fn with_limit(limit: u64) -> Self {
        Self { next: 0, limit }
    }

    pub fn fresh(&mut self) -> CompileResult<String> {
        if self.next >= self.limit {
            return Err(CompileError::codegen("label counter exhausted"));
        }
        let label = format!("_label{}", self.next);
        self.next += 1;
        Ok(label)
    }

    /// Labels handed out so far
    pub fn count(&self) -> u64 {
        self.next
    }
}

impl Default for LabelAllocator {
    fn default() -> Self {
        Self::new()
    }
}
