//! A thin, stateful fluent layer over `Writer`. No new semantics beyond
//! `writer.rs` — `Builder` exists purely so structural correctness (matched
//! `object`/`array` nesting) falls out of lexical nesting of closures rather
//! than the caller having to track the writer's state machine by hand.

use crate::writer::{OutputSink, SinkResult, Writer};

pub struct Builder<S> {
    writer: Writer<S>,
}

impl<S: OutputSink> Builder<S> {
    pub fn new(sink: S) -> Self {
        Self { writer: Writer::new(sink) }
    }

    pub fn into_sink(self) -> S {
        self.writer.into_sink()
    }

    /// Opens an object, runs `body` with a builder scoped to it, and closes
    /// the object — the closure's lexical extent is the object's extent, so
    /// there is no way to forget `object_end` or call it early.
    pub fn object(&mut self, body: impl FnOnce(&mut Self) -> SinkResult<()>) -> SinkResult<()> {
        self.writer.object_start()?;
        body(self)?;
        self.writer.object_end()
    }

    pub fn array(&mut self, body: impl FnOnce(&mut Self) -> SinkResult<()>) -> SinkResult<()> {
        self.writer.array_start()?;
        body(self)?;
        self.writer.array_end()
    }

    pub fn field(&mut self, name: &str, body: impl FnOnce(&mut Self) -> SinkResult<()>) -> SinkResult<()> {
        self.writer.field_name(name)?;
        body(self)
    }

    pub fn field_i64(&mut self, name: &str, value: i64) -> SinkResult<()> {
        self.writer.field_i64(name, value)
    }

    pub fn field_i32(&mut self, name: &str, value: i32) -> SinkResult<()> {
        self.writer.field_i32(name, value)
    }

    pub fn field_f64(&mut self, name: &str, value: f64) -> SinkResult<()> {
        self.writer.field_f64(name, value)
    }

    pub fn field_string(&mut self, name: &str, value: &str) -> SinkResult<()> {
        self.writer.field_string(name, value)
    }

    pub fn field_bool(&mut self, name: &str, value: bool) -> SinkResult<()> {
        self.writer.field_bool(name, value)
    }

    pub fn field_null(&mut self, name: &str) -> SinkResult<()> {
        self.writer.field_null(name)
    }

    pub fn value_i64(&mut self, value: i64) -> SinkResult<()> {
        self.writer.write_i64(value)
    }

    pub fn value_i32(&mut self, value: i32) -> SinkResult<()> {
        self.writer.write_i32(value)
    }

    pub fn value_f64(&mut self, value: f64) -> SinkResult<()> {
        self.writer.write_f64(value)
    }

    pub fn value_string(&mut self, value: &str) -> SinkResult<()> {
        self.writer.write_string(value)
    }

    pub fn value_bool(&mut self, value: bool) -> SinkResult<()> {
        self.writer.write_bool(value)
    }

    pub fn value_null(&mut self) -> SinkResult<()> {
        self.writer.write_null()
    }
}
