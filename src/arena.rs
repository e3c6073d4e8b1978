//! The reusable parse context: one `Tokenizer`, one `AstStore`, and a small
//! pool of scratch buffers, all reset in place between parses so that a
//! context used in a steady-state loop allocates nothing beyond its warm-up
//! parse.
//!
//! Views themselves (`ObjectView`, `ArrayView`, ...) are plain stack values
//! in this crate — they borrow `&AstStore`/`&I` rather than living behind an
//! indirection a pool could recycle, so there is nothing to free-list there.
//! What genuinely needs pooling on this path is the one thing views
//! allocate: the `String`/`Vec<u8>` buffers a decode or big-number parse
//! produces. `ViewArena` pools those.

use crate::ast::AstStore;
use crate::input::InputSource;
use crate::tokenizer::Tokenizer;
use crate::{Error, Result};
use crate::ast::NodeIndex;
use crate::view::Value;

const DEFAULT_POOL_CAPACITY: usize = 64;
const DEFAULT_MAX_DEPTH: usize = 64;

/// Construction-time configuration for a `ParseContext`; there is no
/// runtime-mutable configuration surface, per spec.md §6 ("the core has
/// none").
#[derive(Debug, Clone, Copy)]
pub struct ParseContextConfig {
    pub max_depth: usize,
    pub pool_capacity: usize,
}

impl Default for ParseContextConfig {
    fn default() -> Self {
        Self { max_depth: DEFAULT_MAX_DEPTH, pool_capacity: DEFAULT_POOL_CAPACITY }
    }
}

/// A free list of reusable `String` scratch buffers, bounded by a fixed
/// inline capacity. Buffers beyond the cap are simply dropped on recall
/// instead of growing the pool without limit.
pub struct ViewArena {
    string_bufs: Vec<String>,
    capacity: usize,
}

impl ViewArena {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_POOL_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self { string_bufs: Vec::with_capacity(capacity), capacity }
    }

    /// Pops a free buffer (LIFO) or allocates a fresh empty one.
    pub fn take_string_buf(&mut self) -> String {
        self.string_bufs.pop().unwrap_or_default()
    }

    /// Clears and returns a buffer to the pool, unless the pool is already
    /// at its cap, in which case the buffer is dropped.
    pub fn recycle_string_buf(&mut self, mut buf: String) {
        if self.string_bufs.len() < self.capacity {
            buf.clear();
            self.string_bufs.push(buf);
        }
    }

    pub fn reset(&mut self) {
        self.string_bufs.clear();
    }

    pub fn pooled_len(&self) -> usize {
        self.string_bufs.len()
    }
}

impl Default for ViewArena {
    fn default() -> Self {
        Self::new()
    }
}

/// Owns one reusable `Tokenizer`, one reusable `AstStore`, and one
/// `ViewArena`, plus the most recently parsed input descriptor. `I` is fixed
/// at the context's type (e.g. `BytesInput<'a>`), so a single context
/// serves one input lifetime/shape across repeated parses — the intended
/// usage is "one context per logical actor," each parse call re-pointing it
/// at a fresh buffer of the same shape.
pub struct ParseContext<I> {
    tokenizer: Tokenizer,
    store: AstStore,
    arena: ViewArena,
    input: Option<I>,
}

impl<I: InputSource + Copy> ParseContext<I> {
    pub fn new() -> Self {
        Self::with_config(ParseContextConfig::default())
    }

    pub fn with_config(config: ParseContextConfig) -> Self {
        Self {
            tokenizer: Tokenizer::with_max_depth(config.max_depth),
            store: AstStore::new(),
            arena: ViewArena::with_capacity(config.pool_capacity),
            input: None,
        }
    }

    /// Resets the `AstStore` and tokenizes `input`, storing it as the
    /// context's current input so views can be materialized afterward.
    pub fn parse(&mut self, input: I) -> Result<()> {
        self.arena.reset();
        self.input = Some(input);
        let root = self.tokenizer.tokenize(&input, &mut self.store)?;
        self.store.set_root(root);
        Ok(())
    }

    /// Returns a view over the root of the most recent successful parse.
    /// Panics if called before any `parse` call has succeeded — this mirrors
    /// the teacher's own "programmer error, not recoverable failure"
    /// treatment of writer misuse, applied here to context misuse.
    pub fn root(&self) -> Value<'_, I> {
        let input = self.input.as_ref().expect("ParseContext::root called before a successful parse");
        let root = self.store.root();
        assert!(root.is_some(), "ParseContext has no parsed root");
        Value::from_node(&self.store, input, root)
    }

    pub fn node(&self, index: NodeIndex) -> Result<Value<'_, I>> {
        let input = self.input.as_ref().ok_or_else(|| Error::parse(0, "no input has been parsed yet"))?;
        Ok(Value::from_node(&self.store, input, index))
    }

    pub fn arena_mut(&mut self) -> &mut ViewArena {
        &mut self.arena
    }

    /// Returns all loaned scratch buffers to their free lists and drops the
    /// current input reference, without shrinking any backing capacity.
    pub fn close(&mut self) {
        self.arena.reset();
        self.store.reset();
        self.input = None;
    }
}

impl<I: InputSource + Copy> Default for ParseContext<I> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::BytesInput;

    #[test]
    fn parse_then_read_root_object() {
        let mut ctx: ParseContext<BytesInput<'_>> = ParseContext::new();
        ctx.parse(BytesInput::new(br#"{"a":1}"#)).unwrap();
        let obj = ctx.root().as_object().unwrap();
        assert_eq!(obj.size(), 1);
    }

    #[test]
    fn repeated_parses_on_same_context_reuse_storage() {
        let mut ctx: ParseContext<BytesInput<'_>> = ParseContext::new();
        ctx.parse(BytesInput::new(b"[1,2,3]")).unwrap();
        assert_eq!(ctx.root().as_array().unwrap().size(), 3);
        ctx.parse(BytesInput::new(b"[1,2,3,4,5]")).unwrap();
        assert_eq!(ctx.root().as_array().unwrap().size(), 5);
    }

    #[test]
    fn string_buf_pool_round_trips() {
        let mut arena = ViewArena::with_capacity(2);
        let buf = arena.take_string_buf();
        assert_eq!(arena.pooled_len(), 0);
        arena.recycle_string_buf(buf);
        assert_eq!(arena.pooled_len(), 1);
    }

    #[test]
    fn close_resets_everything() {
        let mut ctx: ParseContext<BytesInput<'_>> = ParseContext::new();
        ctx.parse(BytesInput::new(b"[1,2,3]")).unwrap();
        ctx.close();
        assert!(ctx.input.is_none());
    }
}
