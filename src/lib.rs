//! `flatjson`: a zero-copy, lazy-materialization JSON parser and an
//! immediate-mode JSON serializer, built around one idea — never do work the
//! caller didn't ask for.
//!
//! On the read side, `tokenize()` makes a single left-to-right pass over the
//! input and records a flat array of node spans (a structure-of-arrays
//! [`AstStore`]); no string is decoded, no number is parsed, until a
//! [`view`] is asked for that value. On the write side, [`Writer`] streams
//! bytes directly into a caller-supplied [`OutputSink`] as the caller makes
//! structural calls, with no intermediate tree ever built.
//!
//! A typical parse:
//!
//! ```
//! use flatjson::{BytesInput, ParseContext};
//!
//! let mut ctx: ParseContext<BytesInput<'_>> = ParseContext::new();
//! ctx.parse(BytesInput::new(br#"{"name":"test","value":42}"#)).unwrap();
//! let root = ctx.root().as_object().unwrap();
//! assert_eq!(root.get_string("name").unwrap().unwrap().decoded().unwrap(), "test");
//! assert_eq!(root.get_number("value").unwrap().unwrap().as_i32().unwrap(), 42);
//! ```
//!
//! A typical serialize:
//!
//! ```
//! use flatjson::{Builder, VecSink};
//!
//! let mut b = Builder::new(VecSink::new());
//! b.object(|b| {
//!     b.field_string("symbol", "BTCUSDT")?;
//!     b.field_f64("price", 27000.5)
//! }).unwrap();
//! assert_eq!(b.into_sink().to_bytes(), br#"{"symbol":"BTCUSDT","price":27000.5}"#);
//! ```

pub mod arena;
pub mod ast;
pub mod builder;
pub mod error;
pub mod input;
pub mod number;
pub mod string_escape;
pub mod tokenizer;
pub mod view;
pub mod writer;

pub use arena::{ParseContext, ParseContextConfig, ViewArena};
pub use ast::{AstStore, NodeFlags, NodeIndex, NodeKind};
pub use builder::Builder;
pub use error::{Error, Result};
pub use input::{BytesInput, InputSource, StrInput};
pub use number::{NumberFormatter, NumberParser};
pub use string_escape::{hash_field_name, StringDecode, StringEscape};
pub use tokenizer::Tokenizer;
pub use view::{ArrayIter, ArrayStream, ArrayView, NumberView, ObjectIter, ObjectView, StringView, Value};
pub use writer::{AppendSink, FixedSink, OutputSink, SinkError, SinkResult, VecSink, Writer};
