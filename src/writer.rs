//! Output sinks and the immediate-mode writer state machine.
//!
//! The writer never builds an intermediate tree: every structural call emits
//! bytes directly into the caller-supplied sink. The only error this
//! subsystem can raise is a sink reporting that it cannot accept more bytes
//! (e.g. a fixed-size buffer sink running out of room) — every other writer
//! misuse (calling `object_end` outside an object, etc.) is a programmer
//! error the production build does not recover from, per spec.md §4.8.

use crate::number::NumberFormatter;
use crate::string_escape::StringEscape;

/// The one failure mode a sink can report.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkError {
    #[error("output sink capacity exceeded")]
    CapacityExceeded,
}

pub type SinkResult<T> = std::result::Result<T, SinkError>;

/// A polymorphic byte-level output target.
pub trait OutputSink {
    fn write_byte(&mut self, b: u8) -> SinkResult<()>;
    fn write_bytes(&mut self, src: &[u8], off: usize, len: usize) -> SinkResult<()>;
    fn size(&self) -> usize;
    fn reset(&mut self);

    fn write_all(&mut self, src: &[u8]) -> SinkResult<()> {
        self.write_bytes(src, 0, src.len())
    }
}

/// A growable, owned buffer. The only allocation on this path is the one
/// `to_bytes()` performs to hand the caller a freshly sized copy of the
/// filled prefix.
#[derive(Default)]
pub struct VecSink {
    buf: Vec<u8>,
}

impl VecSink {
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    pub fn with_capacity(cap: usize) -> Self {
        Self { buf: Vec::with_capacity(cap) }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.buf.clone()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }
}

impl OutputSink for VecSink {
    fn write_byte(&mut self, b: u8) -> SinkResult<()> {
        self.buf.push(b);
        Ok(())
    }

    fn write_bytes(&mut self, src: &[u8], off: usize, len: usize) -> SinkResult<()> {
        self.buf.extend_from_slice(&src[off..off + len]);
        Ok(())
    }

    fn size(&self) -> usize {
        self.buf.len()
    }

    fn reset(&mut self) {
        self.buf.clear();
    }
}

/// A caller-provided fixed byte array. No allocation ever; overflow is
/// reported rather than panicking, since this is the one sink shape that can
/// genuinely run out of room.
pub struct FixedSink<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl<'a> FixedSink<'a> {
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn filled(&self) -> &[u8] {
        &self.buf[..self.pos]
    }
}

impl<'a> OutputSink for FixedSink<'a> {
    fn write_byte(&mut self, b: u8) -> SinkResult<()> {
        if self.pos >= self.buf.len() {
            return Err(SinkError::CapacityExceeded);
        }
        self.buf[self.pos] = b;
        self.pos += 1;
        Ok(())
    }

    fn write_bytes(&mut self, src: &[u8], off: usize, len: usize) -> SinkResult<()> {
        if self.pos + len > self.buf.len() {
            return Err(SinkError::CapacityExceeded);
        }
        self.buf[self.pos..self.pos + len].copy_from_slice(&src[off..off + len]);
        self.pos += len;
        Ok(())
    }

    fn size(&self) -> usize {
        self.pos
    }

    fn reset(&mut self) {
        self.pos = 0;
    }
}

/// A caller-provided positionable byte buffer, e.g. a `Vec<u8>` the caller
/// keeps ownership of and wants to append to directly without a final copy.
pub struct AppendSink<'a> {
    buf: &'a mut Vec<u8>,
}

impl<'a> AppendSink<'a> {
    pub fn new(buf: &'a mut Vec<u8>) -> Self {
        Self { buf }
    }
}

impl<'a> OutputSink for AppendSink<'a> {
    fn write_byte(&mut self, b: u8) -> SinkResult<()> {
        self.buf.push(b);
        Ok(())
    }

    fn write_bytes(&mut self, src: &[u8], off: usize, len: usize) -> SinkResult<()> {
        self.buf.extend_from_slice(&src[off..off + len]);
        Ok(())
    }

    fn size(&self) -> usize {
        self.buf.len()
    }

    fn reset(&mut self) {
        self.buf.clear();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameKind {
    Object,
    Array,
}

#[derive(Debug, Clone, Copy)]
struct Frame {
    kind: FrameKind,
    is_first: bool,
}

/// The immediate-mode state machine. Tracks whether a value/field separator
/// is needed and emits structural tokens as the caller drives it.
pub struct Writer<S> {
    sink: S,
    stack: Vec<Frame>,
}

impl<S: OutputSink> Writer<S> {
    pub fn new(sink: S) -> Self {
        Self { sink, stack: Vec::new() }
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    fn comma_if_needed(&mut self) -> SinkResult<()> {
        if let Some(frame) = self.stack.last_mut() {
            if frame.is_first {
                frame.is_first = false;
            } else {
                self.sink.write_byte(b',')?;
            }
        }
        Ok(())
    }

    pub fn object_start(&mut self) -> SinkResult<()> {
        self.write_value_prefix()?;
        self.sink.write_byte(b'{')?;
        self.stack.push(Frame { kind: FrameKind::Object, is_first: true });
        Ok(())
    }

    pub fn object_end(&mut self) -> SinkResult<()> {
        debug_assert!(matches!(self.stack.last(), Some(Frame { kind: FrameKind::Object, .. })));
        self.stack.pop();
        self.sink.write_byte(b'}')
    }

    pub fn array_start(&mut self) -> SinkResult<()> {
        self.write_value_prefix()?;
        self.sink.write_byte(b'[')?;
        self.stack.push(Frame { kind: FrameKind::Array, is_first: true });
        Ok(())
    }

    pub fn array_end(&mut self) -> SinkResult<()> {
        debug_assert!(matches!(self.stack.last(), Some(Frame { kind: FrameKind::Array, .. })));
        self.stack.pop();
        self.sink.write_byte(b']')
    }

    pub fn field_name(&mut self, name: &str) -> SinkResult<()> {
        debug_assert!(matches!(self.stack.last(), Some(Frame { kind: FrameKind::Object, .. })));
        self.comma_if_needed()?;
        self.sink.write_byte(b'"')?;
        StringEscape::write_escaped(&mut self.sink, name.as_bytes())?;
        self.sink.write_byte(b'"')?;
        self.sink.write_byte(b':')
    }

    pub fn write_string(&mut self, value: &str) -> SinkResult<()> {
        self.write_value_prefix()?;
        self.sink.write_byte(b'"')?;
        StringEscape::write_escaped(&mut self.sink, value.as_bytes())?;
        self.sink.write_byte(b'"')
    }

    pub fn write_i64(&mut self, value: i64) -> SinkResult<()> {
        self.write_value_prefix()?;
        NumberFormatter::write_i64(&mut self.sink, value)
    }

    pub fn write_i32(&mut self, value: i32) -> SinkResult<()> {
        self.write_i64(value as i64)
    }

    pub fn write_f64(&mut self, value: f64) -> SinkResult<()> {
        self.write_value_prefix()?;
        NumberFormatter::write_f64(&mut self.sink, value)
    }

    pub fn write_bool(&mut self, value: bool) -> SinkResult<()> {
        self.write_value_prefix()?;
        self.sink.write_all(if value { b"true" } else { b"false" })
    }

    pub fn write_null(&mut self) -> SinkResult<()> {
        self.write_value_prefix()?;
        self.sink.write_all(b"null")
    }

    /// Emits the comma needed when the caller is inside an array position
    /// (or does nothing at the top level); inside an object this is a no-op
    /// because `field_name` already emitted the comma and colon. Used by
    /// every value-position write, including `object_start`/`array_start` —
    /// a container used as an object field's value must not re-emit the
    /// comma `field_name` already placed before the `:`.
    fn write_value_prefix(&mut self) -> SinkResult<()> {
        match self.stack.last() {
            Some(Frame { kind: FrameKind::Array, .. }) => self.comma_if_needed(),
            _ => Ok(()),
        }
    }

    pub fn field_i64(&mut self, name: &str, value: i64) -> SinkResult<()> {
        self.field_name(name)?;
        NumberFormatter::write_i64(&mut self.sink, value)
    }

    pub fn field_i32(&mut self, name: &str, value: i32) -> SinkResult<()> {
        self.field_i64(name, value as i64)
    }

    pub fn field_f64(&mut self, name: &str, value: f64) -> SinkResult<()> {
        self.field_name(name)?;
        NumberFormatter::write_f64(&mut self.sink, value)
    }

    pub fn field_string(&mut self, name: &str, value: &str) -> SinkResult<()> {
        self.field_name(name)?;
        self.sink.write_byte(b'"')?;
        StringEscape::write_escaped(&mut self.sink, value.as_bytes())?;
        self.sink.write_byte(b'"')
    }

    pub fn field_bool(&mut self, name: &str, value: bool) -> SinkResult<()> {
        self.field_name(name)?;
        self.sink.write_all(if value { b"true" } else { b"false" })
    }

    pub fn field_null(&mut self, name: &str) -> SinkResult<()> {
        self.field_name(name)?;
        self.sink.write_all(b"null")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_with_fields_matches_exact_bytes() {
        let mut w = Writer::new(VecSink::new());
        w.object_start().unwrap();
        w.field_string("symbol", "BTCUSDT").unwrap();
        w.field_f64("price", 27000.5).unwrap();
        w.field_bool("active", true).unwrap();
        w.object_end().unwrap();
        let out = w.into_sink().to_bytes();
        assert_eq!(out, br#"{"symbol":"BTCUSDT","price":27000.5,"active":true}"#);
    }

    #[test]
    fn nan_field_serializes_to_null() {
        let mut w = Writer::new(VecSink::new());
        w.object_start().unwrap();
        w.field_f64("value", f64::NAN).unwrap();
        w.object_end().unwrap();
        let out = w.into_sink().to_bytes();
        assert_eq!(out, br#"{"value":null}"#);
    }

    #[test]
    fn array_of_values_has_no_trailing_comma() {
        let mut w = Writer::new(VecSink::new());
        w.array_start().unwrap();
        w.write_i64(1).unwrap();
        w.write_i64(2).unwrap();
        w.write_i64(3).unwrap();
        w.array_end().unwrap();
        assert_eq!(w.into_sink().to_bytes(), b"[1,2,3]");
    }

    #[test]
    fn empty_object_and_array() {
        let mut w = Writer::new(VecSink::new());
        w.object_start().unwrap();
        w.object_end().unwrap();
        assert_eq!(w.into_sink().to_bytes(), b"{}");

        let mut w = Writer::new(VecSink::new());
        w.array_start().unwrap();
        w.array_end().unwrap();
        assert_eq!(w.into_sink().to_bytes(), b"[]");
    }

    #[test]
    fn nested_object_in_array() {
        let mut w = Writer::new(VecSink::new());
        w.array_start().unwrap();
        w.object_start().unwrap();
        w.field_i64("a", 1).unwrap();
        w.object_end().unwrap();
        w.write_null().unwrap();
        w.array_end().unwrap();
        assert_eq!(w.into_sink().to_bytes(), br#"[{"a":1},null]"#);
    }

    #[test]
    fn fixed_sink_reports_capacity_exceeded() {
        let mut buf = [0u8; 3];
        let sink = FixedSink::new(&mut buf);
        let mut w = Writer::new(sink);
        w.array_start().unwrap();
        let err = w.write_i64(12345).unwrap_err();
        assert_eq!(err, SinkError::CapacityExceeded);
    }

    #[test]
    fn string_escaping_in_writer() {
        let mut w = Writer::new(VecSink::new());
        w.write_string("line\nbreak \"quote\"").unwrap();
        assert_eq!(w.into_sink().to_bytes(), br#""line\nbreak \"quote\"""#);
    }
}
