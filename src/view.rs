//! Lazy view layer: cheap handles over `AstStore` nodes that materialize
//! strings, numbers, and child lookups only when asked.
//!
//! Every view is `{ store: &AstStore, input: &I, node: NodeIndex }` plus, for
//! the views spec.md calls out, a small interior-mutable cache slot. None of
//! this allocates by itself — the one place a view allocates is decoding a
//! string or parsing an arbitrary-precision number, and even then at most
//! once per view (the single-slot cache rule).

use std::cell::{Cell, RefCell};

use bigdecimal::BigDecimal;
use num_bigint::BigInt;

use crate::ast::{AstStore, NodeIndex, NodeKind};
use crate::error::{Error, Result};
use crate::input::InputSource;
use crate::number::{NumberFormatter, NumberParser};
use crate::string_escape::StringDecode;
use crate::writer::OutputSink;

/// The uniform typed handle returned by lookups. `Missing` is the stable
/// sentinel `ObjectView::get` returns for an absent key — distinct from
/// `Null`, which means the key was present and its value was the JSON
/// literal `null`.
pub enum Value<'a, I> {
    Object(ObjectView<'a, I>),
    Array(ArrayView<'a, I>),
    String(StringView<'a, I>),
    Number(NumberView<'a, I>),
    Bool(bool),
    Null,
    Missing,
}

impl<'a, I: InputSource> Value<'a, I> {
    pub(crate) fn from_node(store: &'a AstStore, input: &'a I, node: NodeIndex) -> Self {
        match store.get_kind(node) {
            NodeKind::Object => Value::Object(ObjectView::new(store, input, node)),
            NodeKind::Array => Value::Array(ArrayView::new(store, input, node)),
            NodeKind::String => Value::String(StringView::new(store, input, node)),
            NodeKind::Number => Value::Number(NumberView::new(store, input, node)),
            NodeKind::BoolTrue => Value::Bool(true),
            NodeKind::BoolFalse => Value::Bool(false),
            NodeKind::Null => Value::Null,
            NodeKind::Field => panic!("Field nodes are never exposed as values directly"),
        }
    }

    pub fn is_object(&self) -> bool {
        matches!(self, Value::Object(_))
    }
    pub fn is_array(&self) -> bool {
        matches!(self, Value::Array(_))
    }
    pub fn is_string(&self) -> bool {
        matches!(self, Value::String(_))
    }
    pub fn is_number(&self) -> bool {
        matches!(self, Value::Number(_))
    }
    pub fn is_boolean(&self) -> bool {
        matches!(self, Value::Bool(_))
    }
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }

    pub fn as_object(self) -> Result<ObjectView<'a, I>> {
        match self {
            Value::Object(v) => Ok(v),
            other => Err(other.type_mismatch("object")),
        }
    }

    pub fn as_array(self) -> Result<ArrayView<'a, I>> {
        match self {
            Value::Array(v) => Ok(v),
            other => Err(other.type_mismatch("array")),
        }
    }

    pub fn as_string(self) -> Result<StringView<'a, I>> {
        match self {
            Value::String(v) => Ok(v),
            other => Err(other.type_mismatch("string")),
        }
    }

    pub fn as_number(self) -> Result<NumberView<'a, I>> {
        match self {
            Value::Number(v) => Ok(v),
            other => Err(other.type_mismatch("number")),
        }
    }

    pub fn as_bool(self) -> Result<bool> {
        match self {
            Value::Bool(v) => Ok(v),
            other => Err(other.type_mismatch("boolean")),
        }
    }

    fn type_mismatch(&self, expected: &'static str) -> Error {
        Error::TypeMismatch { expected, actual: self.kind_name() }
    }

    fn kind_name(&self) -> &'static str {
        match self {
            Value::Object(_) => "object",
            Value::Array(_) => "array",
            Value::String(_) => "string",
            Value::Number(_) => "number",
            Value::Bool(_) => "boolean",
            Value::Null => "null",
            Value::Missing => "missing",
        }
    }
}

fn field_key_matches<I: InputSource>(store: &AstStore, input: &I, field: NodeIndex, key: &str, key_hash: u64) -> Result<bool> {
    let key_node = NodeIndex(store.get_start(field));
    if store.get_hash(field) != key_hash {
        return Ok(false);
    }
    StringView::new(store, input, key_node).equals(key.as_bytes())
}

/// Lazy handle over an Object node. `get` caches the last `(hash, field
/// index)` pair it resolved so repeated lookups of the same hot key in a
/// loop are O(1) after the first.
pub struct ObjectView<'a, I> {
    store: &'a AstStore,
    input: &'a I,
    node: NodeIndex,
    size_cache: Cell<Option<usize>>,
    last_get: Cell<Option<(u64, NodeIndex)>>,
}

impl<'a, I: InputSource> ObjectView<'a, I> {
    pub(crate) fn new(store: &'a AstStore, input: &'a I, node: NodeIndex) -> Self {
        Self { store, input, node, size_cache: Cell::new(None), last_get: Cell::new(None) }
    }

    pub fn size(&self) -> usize {
        if let Some(n) = self.size_cache.get() {
            return n;
        }
        let mut n = 0usize;
        let mut cur = self.store.get_first_child(self.node);
        while cur.is_some() {
            n += 1;
            cur = self.store.get_next_sibling(cur);
        }
        self.size_cache.set(Some(n));
        n
    }

    /// Linear search over Field children, per spec.md §4.6.1: compare the
    /// precomputed hash first, then the decoded bytes. Duplicate keys return
    /// the first match in parse order.
    pub fn get(&self, key: &str) -> Result<Value<'a, I>> {
        let key_hash = crate::string_escape::hash_field_name(key.as_bytes());
        if let Some((h, field)) = self.last_get.get() {
            if h == key_hash && field_key_matches(self.store, self.input, field, key, key_hash)? {
                let value_node = NodeIndex(self.store.get_end(field));
                return Ok(Value::from_node(self.store, self.input, value_node));
            }
        }
        let mut cur = self.store.get_first_child(self.node);
        while cur.is_some() {
            if field_key_matches(self.store, self.input, cur, key, key_hash)? {
                self.last_get.set(Some((key_hash, cur)));
                let value_node = NodeIndex(self.store.get_end(cur));
                return Ok(Value::from_node(self.store, self.input, value_node));
            }
            cur = self.store.get_next_sibling(cur);
        }
        Ok(Value::Missing)
    }

    pub fn get_object(&self, key: &str) -> Result<Option<ObjectView<'a, I>>> {
        self.get_typed(key, |v| v.as_object())
    }

    pub fn get_array(&self, key: &str) -> Result<Option<ArrayView<'a, I>>> {
        self.get_typed(key, |v| v.as_array())
    }

    pub fn get_string(&self, key: &str) -> Result<Option<StringView<'a, I>>> {
        self.get_typed(key, |v| v.as_string())
    }

    pub fn get_number(&self, key: &str) -> Result<Option<NumberView<'a, I>>> {
        self.get_typed(key, |v| v.as_number())
    }

    pub fn get_boolean(&self, key: &str) -> Result<Option<bool>> {
        self.get_typed(key, |v| v.as_bool())
    }

    fn get_typed<T>(&self, key: &str, convert: impl FnOnce(Value<'a, I>) -> Result<T>) -> Result<Option<T>> {
        match self.get(key)? {
            Value::Missing | Value::Null => Ok(None),
            other => convert(other).map(Some),
        }
    }

    /// Source-order iteration over `(key, value)` pairs.
    pub fn iter(&self) -> ObjectIter<'a, I> {
        ObjectIter { store: self.store, input: self.input, next: self.store.get_first_child(self.node) }
    }
}

pub struct ObjectIter<'a, I> {
    store: &'a AstStore,
    input: &'a I,
    next: NodeIndex,
}

impl<'a, I: InputSource> Iterator for ObjectIter<'a, I> {
    type Item = Result<(StringView<'a, I>, Value<'a, I>)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next.is_none() {
            return None;
        }
        let field = self.next;
        self.next = self.store.get_next_sibling(field);
        let key_node = NodeIndex(self.store.get_start(field));
        let value_node = NodeIndex(self.store.get_end(field));
        Some(Ok((
            StringView::new(self.store, self.input, key_node),
            Value::from_node(self.store, self.input, value_node),
        )))
    }
}

/// Lazy handle over an Array node. `get` caches the last `(index, node)` it
/// resolved to accelerate monotonically increasing access patterns, per
/// spec.md §4.6.2.
pub struct ArrayView<'a, I> {
    store: &'a AstStore,
    input: &'a I,
    node: NodeIndex,
    size_cache: Cell<Option<usize>>,
    last_get: Cell<Option<(usize, NodeIndex)>>,
}

impl<'a, I: InputSource> ArrayView<'a, I> {
    pub(crate) fn new(store: &'a AstStore, input: &'a I, node: NodeIndex) -> Self {
        Self { store, input, node, size_cache: Cell::new(None), last_get: Cell::new(None) }
    }

    pub fn size(&self) -> usize {
        if let Some(n) = self.size_cache.get() {
            return n;
        }
        let mut n = 0usize;
        let mut cur = self.store.get_first_child(self.node);
        while cur.is_some() {
            n += 1;
            cur = self.store.get_next_sibling(cur);
        }
        self.size_cache.set(Some(n));
        n
    }

    pub fn get(&self, index: usize) -> Result<Value<'a, I>> {
        let (mut i, mut cur) = match self.last_get.get() {
            Some((last_i, last_node)) if last_i <= index => (last_i, last_node),
            _ => (0, self.store.get_first_child(self.node)),
        };
        while i < index && cur.is_some() {
            cur = self.store.get_next_sibling(cur);
            i += 1;
        }
        if cur.is_none() {
            let size = self.size();
            return Err(Error::IndexOutOfRange { index, size });
        }
        self.last_get.set(Some((i, cur)));
        Ok(Value::from_node(self.store, self.input, cur))
    }

    pub fn iter(&self) -> ArrayIter<'a, I> {
        ArrayIter { store: self.store, input: self.input, next: self.store.get_first_child(self.node) }
    }

    /// A cursor that walks the sibling chain without pre-materializing a
    /// `Vec` of child views, for callers processing large arrays in a
    /// single forward pass.
    pub fn stream(&self) -> ArrayStream<'a, I> {
        ArrayStream { store: self.store, input: self.input, next: self.store.get_first_child(self.node) }
    }
}

pub struct ArrayIter<'a, I> {
    store: &'a AstStore,
    input: &'a I,
    next: NodeIndex,
}

impl<'a, I: InputSource> Iterator for ArrayIter<'a, I> {
    type Item = Value<'a, I>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next.is_none() {
            return None;
        }
        let node = self.next;
        self.next = self.store.get_next_sibling(node);
        Some(Value::from_node(self.store, self.input, node))
    }
}

/// The streaming array cursor named in spec.md §4.6.2 and detailed in the
/// ambient spec's §4.13: no allocation, one `get_next_sibling` lookup per
/// `next()`.
pub struct ArrayStream<'a, I> {
    store: &'a AstStore,
    input: &'a I,
    next: NodeIndex,
}

impl<'a, I: InputSource> ArrayStream<'a, I> {
    pub fn has_next(&self) -> bool {
        self.next.is_some()
    }

    pub fn next(&mut self) -> Option<Value<'a, I>> {
        if self.next.is_none() {
            return None;
        }
        let node = self.next;
        self.next = self.store.get_next_sibling(node);
        Some(Value::from_node(self.store, self.input, node))
    }
}

/// Lazy handle over a String node. `decoded()` caches its one `String`
/// allocation; `slice()` and `equals()` never allocate.
pub struct StringView<'a, I> {
    store: &'a AstStore,
    input: &'a I,
    node: NodeIndex,
    decoded_cache: RefCell<Option<String>>,
}

impl<'a, I: InputSource> StringView<'a, I> {
    pub(crate) fn new(store: &'a AstStore, input: &'a I, node: NodeIndex) -> Self {
        Self { store, input, node, decoded_cache: RefCell::new(None) }
    }

    fn raw(&self) -> &'a [u8] {
        self.input.slice(self.store.get_start(self.node) as usize, self.store.get_end(self.node) as usize)
    }

    /// Zero-copy access to the raw JSON bytes between the quotes — escape
    /// sequences, if any, are still present unescaped.
    pub fn slice(&self) -> &'a [u8] {
        self.raw()
    }

    pub fn is_escaped(&self) -> bool {
        self.store.get_flags(self.node).contains(crate::ast::NodeFlags::STRING_ESCAPED)
    }

    pub fn decoded(&self) -> Result<String> {
        if let Some(cached) = self.decoded_cache.borrow().as_ref() {
            return Ok(cached.clone());
        }
        let decoded = if self.is_escaped() {
            StringDecode::decode(self.raw())?
        } else {
            std::str::from_utf8(self.raw()).map_err(|_| Error::InvalidEscape(self.store.get_start(self.node) as usize))?.to_owned()
        };
        *self.decoded_cache.borrow_mut() = Some(decoded.clone());
        Ok(decoded)
    }

    pub fn parse_i64(&self) -> Result<i64> {
        NumberParser::parse_i64(self.raw())
    }

    pub fn parse_f64(&self) -> Result<f64> {
        NumberParser::parse_f64(self.raw())
    }

    /// Byte-exact comparison against `other` without decoding, unless this
    /// view's raw bytes contain an escape — in that case, fall back to
    /// comparing the decoded string, per spec.md §4.6.3.
    pub fn equals(&self, other: &[u8]) -> Result<bool> {
        if !self.is_escaped() {
            return Ok(self.raw() == other);
        }
        let decoded = self.decoded()?;
        Ok(decoded.as_bytes() == other)
    }

    pub fn append_to<S: OutputSink + ?Sized>(&self, sink: &mut S) -> Result<()> {
        if !self.is_escaped() {
            sink.write_all(self.raw()).map_err(|_| Error::NumberFormat("sink overflow while appending string".into()))?;
            return Ok(());
        }
        let decoded = self.decoded()?;
        sink.write_all(decoded.as_bytes()).map_err(|_| Error::NumberFormat("sink overflow while appending string".into()))?;
        Ok(())
    }
}

/// Lazy handle over a Number node. Each `as_*` accessor caches its own
/// single slot — a view materialized as both `as_i64` and `as_f64` pays for
/// two slots, which is intentional: spec.md's "single decoded representation"
/// rule is per accessor type, not a single untyped slot.
pub struct NumberView<'a, I> {
    store: &'a AstStore,
    input: &'a I,
    node: NodeIndex,
    i64_cache: Cell<Option<i64>>,
    f64_cache: Cell<Option<f64>>,
}

impl<'a, I: InputSource> NumberView<'a, I> {
    pub(crate) fn new(store: &'a AstStore, input: &'a I, node: NodeIndex) -> Self {
        Self { store, input, node, i64_cache: Cell::new(None), f64_cache: Cell::new(None) }
    }

    fn raw(&self) -> &'a [u8] {
        self.input.slice(self.store.get_start(self.node) as usize, self.store.get_end(self.node) as usize)
    }

    pub fn is_integer(&self) -> bool {
        !self.store.get_flags(self.node).contains(crate::ast::NodeFlags::NUMBER_FLOAT)
    }

    pub fn is_negative(&self) -> bool {
        NumberParser::is_negative(self.raw())
    }

    pub fn as_i64(&self) -> Result<i64> {
        if let Some(v) = self.i64_cache.get() {
            return Ok(v);
        }
        let v = NumberParser::parse_i64(self.raw())?;
        self.i64_cache.set(Some(v));
        Ok(v)
    }

    pub fn as_i32(&self) -> Result<i32> {
        let v = self.as_i64()?;
        i32::try_from(v).map_err(|_| Error::NumberFormat("i32 overflow".into()))
    }

    pub fn as_f64(&self) -> Result<f64> {
        if let Some(v) = self.f64_cache.get() {
            return Ok(v);
        }
        let v = NumberParser::parse_f64(self.raw())?;
        self.f64_cache.set(Some(v));
        Ok(v)
    }

    pub fn as_f32(&self) -> Result<f32> {
        Ok(self.as_f64()? as f32)
    }

    pub fn as_big_integer(&self) -> Result<BigInt> {
        NumberParser::parse_big_integer(self.raw())
    }

    pub fn as_big_decimal(&self) -> Result<BigDecimal> {
        NumberParser::parse_big_decimal(self.raw())
    }

    /// Writes this number's canonical formatted form (not necessarily its
    /// original raw bytes — e.g. `1.50` round-trips through the formatter as
    /// `1.5`) to `sink`. Mostly useful when re-serializing a parsed document.
    pub fn write_canonical<S: OutputSink + ?Sized>(&self, sink: &mut S) -> Result<()> {
        let outcome = if self.is_integer() {
            NumberFormatter::write_i64(sink, self.as_i64()?)
        } else {
            NumberFormatter::write_f64(sink, self.as_f64()?)
        };
        outcome.map_err(|_| Error::NumberFormat("sink overflow while writing number".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::AstStore;
    use crate::input::BytesInput;
    use crate::tokenizer::Tokenizer;

    fn parse(json: &[u8]) -> (AstStore, BytesInput<'_>, NodeIndex) {
        let input = BytesInput::new(json);
        let mut tokenizer = Tokenizer::new();
        let mut store = AstStore::new();
        let root = tokenizer.tokenize(&input, &mut store).unwrap();
        (store, input, root)
    }

    #[test]
    fn object_get_and_typed_accessors() {
        let (store, input, root) = parse(br#"{"name":"test","value":42}"#);
        let obj = ObjectView::new(&store, &input, root);
        assert_eq!(obj.size(), 2);
        let name = obj.get_string("name").unwrap().unwrap();
        assert_eq!(name.decoded().unwrap(), "test");
        let value = obj.get_number("value").unwrap().unwrap();
        assert_eq!(value.as_i32().unwrap(), 42);
    }

    #[test]
    fn object_get_missing_key_is_missing_not_error() {
        let (store, input, root) = parse(br#"{"a":1}"#);
        let obj = ObjectView::new(&store, &input, root);
        let v = obj.get("nope").unwrap();
        assert!(v.is_missing());
        assert!(obj.get_string("nope").unwrap().is_none());
    }

    #[test]
    fn duplicate_keys_get_returns_first_match() {
        let (store, input, root) = parse(br#"{"a":1,"a":2}"#);
        let obj = ObjectView::new(&store, &input, root);
        assert_eq!(obj.size(), 2);
        let v = obj.get("a").unwrap().as_number().unwrap();
        assert_eq!(v.as_i32().unwrap(), 1);
    }

    #[test]
    fn repeated_get_uses_cache_and_agrees_with_fresh_lookup() {
        let (store, input, root) = parse(br#"{"a":1,"b":2}"#);
        let obj = ObjectView::new(&store, &input, root);
        let first = obj.get("b").unwrap().as_number().unwrap().as_i32().unwrap();
        let second = obj.get("b").unwrap().as_number().unwrap().as_i32().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn array_get_and_iter() {
        let (store, input, root) = parse(b"[1,2,3]");
        let arr = ArrayView::new(&store, &input, root);
        assert_eq!(arr.size(), 3);
        assert_eq!(arr.get(0).unwrap().as_number().unwrap().as_i32().unwrap(), 1);
        assert_eq!(arr.get(2).unwrap().as_number().unwrap().as_i32().unwrap(), 3);
        let collected: Vec<i32> = arr.iter().map(|v| v.as_number().unwrap().as_i32().unwrap()).collect();
        assert_eq!(collected, vec![1, 2, 3]);
    }

    #[test]
    fn array_get_out_of_range_is_index_error() {
        let (store, input, root) = parse(b"[1,2,3]");
        let arr = ArrayView::new(&store, &input, root);
        let err = arr.get(5).unwrap_err();
        assert_eq!(err, Error::IndexOutOfRange { index: 5, size: 3 });
    }

    #[test]
    fn nested_lookup_matches_literal_scenario_three() {
        let (store, input, root) = parse(br#"{"asks":[["27000.5","8.760"]]}"#);
        let obj = ObjectView::new(&store, &input, root);
        let asks = obj.get_array("asks").unwrap().unwrap();
        let first = asks.get(0).unwrap().as_array().unwrap();
        let price = first.get(0).unwrap().as_string().unwrap();
        let parsed = price.parse_f64().unwrap();
        assert!((parsed - 27000.5).abs() < 1e-9);
    }

    #[test]
    fn string_decode_handles_unicode_escape() {
        let (store, input, root) = parse(b"\"hello \\u4e16\\u754c\"");
        let s = StringView::new(&store, &input, root);
        assert_eq!(s.decoded().unwrap(), "hello \u{4e16}\u{754c}");
    }

    #[test]
    fn array_stream_walks_without_materializing_all_at_once() {
        let (store, input, root) = parse(b"[10,20,30]");
        let arr = ArrayView::new(&store, &input, root);
        let mut stream = arr.stream();
        let mut collected = vec![];
        while stream.has_next() {
            let v = stream.next().unwrap().as_number().unwrap().as_i32().unwrap();
            collected.push(v);
        }
        assert_eq!(collected, vec![10, 20, 30]);
    }

    #[test]
    fn object_get_finds_raw_non_ascii_key() {
        let json = "{\"\u{4e16}\":1}".into_bytes();
        let input = BytesInput::new(&json);
        let mut tokenizer = Tokenizer::new();
        let mut store = AstStore::new();
        let root = tokenizer.tokenize(&input, &mut store).unwrap();
        let obj = ObjectView::new(&store, &input, root);
        let v = obj.get("\u{4e16}").unwrap();
        assert!(!v.is_missing());
        assert_eq!(v.as_number().unwrap().as_i32().unwrap(), 1);
    }
}
