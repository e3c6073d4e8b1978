//! The single-pass, iterative tokenizer: walks an `InputSource` left to
//! right and populates an `AstStore` with one node per recognized JSON
//! value, linking containers as it goes.
//!
//! There is deliberately no recursion here — nesting is tracked by a private
//! `Vec<NodeIndex>` of open container node indices, capped at a fixed depth
//! so that adversarial input cannot blow the native stack. This mirrors the
//! container stack in the teacher's `custom_lazy.rs` cursor, generalized
//! from "walk on demand" to "walk once, eagerly, recording every span."

use crate::ast::{AstStore, NodeFlags, NodeIndex, NodeKind};
use crate::error::{Error, Result};
use crate::input::InputSource;
use crate::string_escape::hash_field_name;

const DEFAULT_MAX_DEPTH: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ContainerKind {
    Object,
    Array,
}

struct OpenContainer {
    node: NodeIndex,
    kind: ContainerKind,
    /// true once the container's first child has already been consumed;
    /// used to detect a leading comma (`{,...}` / `[,...]`).
    has_child: bool,
}

/// The tokenizer state machine. Holds only the container-nesting stack; the
/// current byte position is local to `tokenize`'s call, not stored on
/// `self`, since a tokenizer never suspends mid-document (spec: one complete
/// document per call).
pub struct Tokenizer {
    stack: Vec<OpenContainer>,
    max_depth: usize,
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Tokenizer {
    pub fn new() -> Self {
        Self::with_max_depth(DEFAULT_MAX_DEPTH)
    }

    pub fn with_max_depth(max_depth: usize) -> Self {
        Self { stack: Vec::with_capacity(max_depth.min(DEFAULT_MAX_DEPTH)), max_depth }
    }

    /// Clears any state left over from a prior parse (normally empty already
    /// — a clean `tokenize` call pops every frame it pushes — but a prior
    /// call that errored out mid-document can leave frames behind).
    fn reset(&mut self) {
        self.stack.clear();
    }

    #[cfg_attr(feature = "trace", tracing::instrument(skip(self, input, store), fields(input_len = input.len())))]
    pub fn tokenize<I: InputSource>(&mut self, input: &I, store: &mut AstStore) -> Result<NodeIndex> {
        self.reset();
        store.reset();
        let mut cursor = Cursor { input, pos: 0 };
        cursor.skip_whitespace();
        let root = self.parse_value(&mut cursor, store)?;
        cursor.skip_whitespace();
        if cursor.pos != cursor.input.len() {
            return Err(Error::parse(cursor.pos, "trailing characters after root value"));
        }
        store.set_root(root);
        Ok(root)
    }

    fn push_container(&mut self, node: NodeIndex, kind: ContainerKind, pos: usize) -> Result<()> {
        if self.stack.len() >= self.max_depth {
            return Err(Error::parse(pos, "maximum container nesting depth exceeded"));
        }
        self.stack.push(OpenContainer { node, kind, has_child: false });
        Ok(())
    }

    fn parse_value<I: InputSource>(&mut self, cursor: &mut Cursor<I>, store: &mut AstStore) -> Result<NodeIndex> {
        let pos = cursor.pos;
        match cursor.peek() {
            None => Err(Error::parse(pos, "unexpected end of input, expected a value")),
            Some(b'{') => self.parse_object(cursor, store),
            Some(b'[') => self.parse_array(cursor, store),
            Some(b'"') => self.parse_string(cursor, store, false).map(|(idx, _)| idx),
            Some(b't') => self.parse_literal(cursor, b"true", NodeKind::BoolTrue, store),
            Some(b'f') => self.parse_literal(cursor, b"false", NodeKind::BoolFalse, store),
            Some(b'n') => self.parse_literal(cursor, b"null", NodeKind::Null, store),
            Some(b'-') | Some(b'0'..=b'9') => self.parse_number(cursor, store),
            Some(other) => Err(Error::parse(pos, format!("unexpected byte {:#04x}", other))),
        }
    }

    fn parse_literal<I: InputSource>(&mut self, cursor: &mut Cursor<I>, literal: &[u8], kind: NodeKind, store: &mut AstStore) -> Result<NodeIndex> {
        let start = cursor.pos;
        for &expected in literal {
            match cursor.peek() {
                Some(b) if b == expected => cursor.advance(),
                _ => {
                    return Err(Error::parse(
                        cursor.pos,
                        format!("expected literal {:?}", std::str::from_utf8(literal).unwrap_or("?")),
                    ))
                }
            }
        }
        Ok(store.add_node(kind, start as u32, cursor.pos as u32, NodeFlags::empty(), 0))
    }

    fn parse_object<I: InputSource>(&mut self, cursor: &mut Cursor<I>, store: &mut AstStore) -> Result<NodeIndex> {
        let obj_start = cursor.pos;
        cursor.advance(); // consume '{'
        let obj = store.add_node(NodeKind::Object, obj_start as u32, 0, NodeFlags::empty(), 0);
        cursor.skip_whitespace();
        if cursor.peek() == Some(b'}') {
            cursor.advance();
            store.set_end(obj, cursor.pos as u32);
            return Ok(obj);
        }
        self.push_container(obj, ContainerKind::Object, obj_start)?;
        loop {
            cursor.skip_whitespace();
            if cursor.peek() != Some(b'"') {
                return Err(Error::parse(cursor.pos, "expected '\"' to start an object key"));
            }
            let (key, key_hash) = self.parse_string(cursor, store, true)?;
            cursor.skip_whitespace();
            if cursor.peek() != Some(b':') {
                return Err(Error::parse(cursor.pos, "expected ':' after object key"));
            }
            cursor.advance();
            cursor.skip_whitespace();
            let value = self.parse_value(cursor, store)?;
            let field = store.add_node(NodeKind::Field, key.0, value.0, NodeFlags::empty(), key_hash);
            store.add_child(obj, field);
            self.mark_has_child(obj);
            cursor.skip_whitespace();
            match cursor.peek() {
                Some(b',') => {
                    cursor.advance();
                    cursor.skip_whitespace();
                    if cursor.peek() == Some(b'}') {
                        return Err(Error::parse(cursor.pos, "trailing comma before '}'"));
                    }
                }
                Some(b'}') => {
                    cursor.advance();
                    break;
                }
                _ => return Err(Error::parse(cursor.pos, "expected ',' or '}' in object")),
            }
        }
        self.stack.pop();
        store.set_end(obj, cursor.pos as u32);
        Ok(obj)
    }

    fn parse_array<I: InputSource>(&mut self, cursor: &mut Cursor<I>, store: &mut AstStore) -> Result<NodeIndex> {
        let arr_start = cursor.pos;
        cursor.advance(); // consume '['
        let arr = store.add_node(NodeKind::Array, arr_start as u32, 0, NodeFlags::empty(), 0);
        cursor.skip_whitespace();
        if cursor.peek() == Some(b']') {
            cursor.advance();
            store.set_end(arr, cursor.pos as u32);
            return Ok(arr);
        }
        self.push_container(arr, ContainerKind::Array, arr_start)?;
        loop {
            cursor.skip_whitespace();
            let value = self.parse_value(cursor, store)?;
            store.add_child(arr, value);
            self.mark_has_child(arr);
            cursor.skip_whitespace();
            match cursor.peek() {
                Some(b',') => {
                    cursor.advance();
                    cursor.skip_whitespace();
                    if cursor.peek() == Some(b']') {
                        return Err(Error::parse(cursor.pos, "trailing comma before ']'"));
                    }
                }
                Some(b']') => {
                    cursor.advance();
                    break;
                }
                _ => return Err(Error::parse(cursor.pos, "expected ',' or ']' in array")),
            }
        }
        self.stack.pop();
        store.set_end(arr, cursor.pos as u32);
        Ok(arr)
    }

    fn mark_has_child(&mut self, container: NodeIndex) {
        if let Some(top) = self.stack.last_mut() {
            if top.node == container {
                top.has_child = true;
            }
        }
    }

    /// Parses a quoted string starting at the current `"`. When
    /// `is_field_key` is true, also folds the decoded code points into a
    /// hash as it goes (spec.md §4.3's live hash computation). Returns the
    /// string node and its hash (0 for non-key strings).
    fn parse_string<I: InputSource>(&mut self, cursor: &mut Cursor<I>, store: &mut AstStore, is_field_key: bool) -> Result<(NodeIndex, u64)> {
        cursor.advance(); // consume opening '"'
        let content_start = cursor.pos;
        let mut escaped = false;
        let mut hash: u64 = 0;

        loop {
            let byte = cursor.peek().ok_or_else(|| Error::parse(cursor.pos, "unterminated string"))?;
            match byte {
                b'"' => break,
                b'\\' => {
                    escaped = true;
                    let escape_start = cursor.pos;
                    cursor.advance();
                    let next = cursor.peek().ok_or_else(|| Error::parse(cursor.pos, "unterminated escape sequence"))?;
                    if is_field_key {
                        hash = Self::fold_escape_hash(hash, cursor, escape_start)?;
                    } else {
                        // Full unescaping is deferred to materialization; the
                        // tokenizer only needs to skip past the escape body.
                        match next {
                            b'u' => {
                                cursor.advance();
                                for _ in 0..4 {
                                    cursor
                                        .peek()
                                        .ok_or_else(|| Error::parse(cursor.pos, "truncated \\u escape"))?;
                                    cursor.advance();
                                }
                                continue;
                            }
                            _ => cursor.advance(),
                        }
                        continue;
                    }
                }
                0x00..=0x1F => {
                    return Err(Error::parse(cursor.pos, "unescaped control character in string"));
                }
                b if is_field_key && b < 0x80 => {
                    hash = hash.wrapping_mul(31).wrapping_add(u64::from(b));
                    cursor.advance();
                }
                _ if is_field_key => {
                    hash = Self::fold_utf8_hash(hash, cursor)?;
                }
                _ => cursor.advance(),
            }
        }
        let content_end = cursor.pos;
        cursor.advance(); // consume closing '"'

        let mut flags = NodeFlags::empty();
        if escaped {
            flags.set(NodeFlags::STRING_ESCAPED);
        }
        let node = store.add_node(NodeKind::String, content_start as u32, content_end as u32, flags, if is_field_key { hash } else { 0 });
        Ok((node, hash))
    }

    /// Folds the raw post-backslash byte into the hash for an escape
    /// sequence (`\n` contributes `'n'`, `\uXXXX` contributes each of the
    /// four hex digit bytes) and advances the cursor past the escape body.
    /// This is the documented fast-hash shortcut: it does not decode the
    /// escape to its true code point.
    fn fold_escape_hash<I: InputSource>(mut hash: u64, cursor: &mut Cursor<I>, _escape_start: usize) -> Result<u64> {
        let marker = cursor.peek().expect("caller already confirmed a byte follows the backslash");
        if marker == b'u' {
            cursor.advance();
            for _ in 0..4 {
                let digit = cursor.peek().ok_or_else(|| Error::parse(cursor.pos, "truncated \\u escape"))?;
                hash = hash.wrapping_mul(31).wrapping_add(u64::from(digit));
                cursor.advance();
            }
        } else {
            hash = hash.wrapping_mul(31).wrapping_add(u64::from(marker));
            cursor.advance();
        }
        Ok(hash)
    }

    /// Folds one UTF-8 code point (2-, 3-, or 4-byte sequence) into the hash
    /// and advances the cursor past it. A 4-byte sequence is hashed as its
    /// two surrogate code units, per spec.md §4.3, rather than its combined
    /// astral code point.
    fn fold_utf8_hash<I: InputSource>(mut hash: u64, cursor: &mut Cursor<I>) -> Result<u64> {
        let lead = cursor.peek().expect("caller already confirmed a byte at this position");
        let len = match lead {
            0xC0..=0xDF => 2,
            0xE0..=0xEF => 3,
            0xF0..=0xF7 => 4,
            _ => return Err(Error::parse(cursor.pos, "invalid UTF-8 lead byte in string")),
        };
        let mut bytes = [0u8; 4];
        for slot in bytes.iter_mut().take(len) {
            *slot = cursor.peek().ok_or_else(|| Error::parse(cursor.pos, "truncated UTF-8 sequence in string"))?;
            cursor.advance();
        }
        match len {
            2 => {
                let cp = (u32::from(bytes[0] & 0x1F) << 6) | u32::from(bytes[1] & 0x3F);
                hash = hash.wrapping_mul(31).wrapping_add(u64::from(cp));
            }
            3 => {
                let cp = (u32::from(bytes[0] & 0x0F) << 12) | (u32::from(bytes[1] & 0x3F) << 6) | u32::from(bytes[2] & 0x3F);
                hash = hash.wrapping_mul(31).wrapping_add(u64::from(cp));
            }
            4 => {
                let cp = (u32::from(bytes[0] & 0x07) << 18)
                    | (u32::from(bytes[1] & 0x3F) << 12)
                    | (u32::from(bytes[2] & 0x3F) << 6)
                    | u32::from(bytes[3] & 0x3F);
                let astral = cp - 0x10000;
                let high = 0xD800 + (astral >> 10);
                let low = 0xDC00 + (astral & 0x3FF);
                hash = hash.wrapping_mul(31).wrapping_add(u64::from(high));
                hash = hash.wrapping_mul(31).wrapping_add(u64::from(low));
            }
            _ => unreachable!(),
        }
        Ok(hash)
    }

    fn parse_number<I: InputSource>(&mut self, cursor: &mut Cursor<I>, store: &mut AstStore) -> Result<NodeIndex> {
        let start = cursor.pos;
        let mut is_float = false;

        if cursor.peek() == Some(b'-') {
            cursor.advance();
        }
        match cursor.peek() {
            Some(b'0') => cursor.advance(),
            Some(b'1'..=b'9') => {
                cursor.advance();
                while matches!(cursor.peek(), Some(b'0'..=b'9')) {
                    cursor.advance();
                }
            }
            _ => return Err(Error::parse(cursor.pos, "expected a digit to start a number")),
        }
        if cursor.peek() == Some(b'.') {
            is_float = true;
            cursor.advance();
            if !matches!(cursor.peek(), Some(b'0'..=b'9')) {
                return Err(Error::parse(cursor.pos, "expected a digit after decimal point"));
            }
            while matches!(cursor.peek(), Some(b'0'..=b'9')) {
                cursor.advance();
            }
        }
        if matches!(cursor.peek(), Some(b'e') | Some(b'E')) {
            is_float = true;
            cursor.advance();
            if matches!(cursor.peek(), Some(b'+') | Some(b'-')) {
                cursor.advance();
            }
            if !matches!(cursor.peek(), Some(b'0'..=b'9')) {
                return Err(Error::parse(cursor.pos, "expected a digit in exponent"));
            }
            while matches!(cursor.peek(), Some(b'0'..=b'9')) {
                cursor.advance();
            }
        }
        let mut flags = NodeFlags::empty();
        if is_float {
            flags.set(NodeFlags::NUMBER_FLOAT);
        }
        Ok(store.add_node(NodeKind::Number, start as u32, cursor.pos as u32, flags, 0))
    }
}

struct Cursor<'a, I> {
    input: &'a I,
    pos: usize,
}

impl<'a, I: InputSource> Cursor<'a, I> {
    fn peek(&self) -> Option<u8> {
        if self.pos < self.input.len() {
            Some(self.input.byte_at(self.pos))
        } else {
            None
        }
    }

    fn advance(&mut self) {
        self.pos += 1;
    }

    fn skip_whitespace(&mut self) {
        while let Some(b) = self.peek() {
            match b {
                b' ' | b'\t' | b'\n' | b'\r' => self.advance(),
                _ => break,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::BytesInput;

    fn tokenize(json: &[u8]) -> Result<(AstStore, NodeIndex)> {
        let input = BytesInput::new(json);
        let mut tokenizer = Tokenizer::new();
        let mut store = AstStore::new();
        let root = tokenizer.tokenize(&input, &mut store)?;
        Ok((store, root))
    }

    #[test]
    fn parses_object_with_two_fields() {
        let (store, root) = tokenize(br#"{"name":"test","value":42}"#).unwrap();
        assert_eq!(store.get_kind(root), NodeKind::Object);
        let mut count = 0;
        let mut cur = store.get_first_child(root);
        while cur.is_some() {
            count += 1;
            cur = store.get_next_sibling(cur);
        }
        assert_eq!(count, 2);
    }

    #[test]
    fn parses_array_of_numbers() {
        let (store, root) = tokenize(b"[1,2,3]").unwrap();
        assert_eq!(store.get_kind(root), NodeKind::Array);
        let mut count = 0;
        let mut cur = store.get_first_child(root);
        while cur.is_some() {
            count += 1;
            cur = store.get_next_sibling(cur);
        }
        assert_eq!(count, 3);
    }

    #[test]
    fn empty_object_and_array_have_no_children() {
        let (store, root) = tokenize(b"{}").unwrap();
        assert_eq!(store.get_kind(root), NodeKind::Object);
        assert!(store.get_first_child(root).is_none());

        let (store, root) = tokenize(b"[]").unwrap();
        assert_eq!(store.get_kind(root), NodeKind::Array);
        assert!(store.get_first_child(root).is_none());
    }

    #[test]
    fn rejects_unterminated_object() {
        let err = tokenize(b"{").unwrap_err();
        match err {
            Error::Parse { offset, .. } => assert_eq!(offset, 1),
            other => panic!("expected Parse error, got {other:?}"),
        }
    }

    #[test]
    fn rejects_trailing_comma_in_object() {
        assert!(tokenize(br#"{"a":1,}"#).is_err());
    }

    #[test]
    fn rejects_trailing_comma_in_array() {
        assert!(tokenize(b"[1,2,]").is_err());
    }

    #[test]
    fn rejects_leading_plus_and_bare_dot_numbers() {
        assert!(tokenize(b"+5").is_err());
        assert!(tokenize(b".5").is_err());
        assert!(tokenize(b"5.").is_err());
    }

    #[test]
    fn rejects_trailing_bytes_after_root() {
        assert!(tokenize(b"1 2").is_err());
    }

    #[test]
    fn accepts_nesting_at_stack_cap_rejects_beyond() {
        let mut tokenizer = Tokenizer::with_max_depth(4);
        let mut store = AstStore::new();

        let ok_json = b"[[[[1]]]]";
        let input = BytesInput::new(ok_json);
        assert!(tokenizer.tokenize(&input, &mut store).is_ok());

        let too_deep = b"[[[[[1]]]]]";
        let input = BytesInput::new(too_deep);
        assert!(tokenizer.tokenize(&input, &mut store).is_err());
    }

    #[test]
    fn duplicate_keys_both_retained_in_order() {
        let (store, root) = tokenize(br#"{"a":1,"a":2}"#).unwrap();
        let mut values = vec![];
        let mut field = store.get_first_child(root);
        while field.is_some() {
            let value_idx = NodeIndex(store.get_end(field));
            values.push(store.get_start(value_idx));
            field = store.get_next_sibling(field);
        }
        assert_eq!(values.len(), 2);
    }

    #[test]
    fn field_name_hash_matches_decoded_hash() {
        let (store, root) = tokenize(br#"{"symbol":1}"#).unwrap();
        let field = store.get_first_child(root);
        assert_eq!(store.get_hash(field), hash_field_name(b"symbol"));
    }
}
