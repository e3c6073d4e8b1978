//! The crate-wide error taxonomy.
//!
//! Every fallible operation in this crate returns one of these variants. There
//! is no local recovery anywhere in the core: a `ParseError` leaves the
//! `AstStore` in a partial state that must be reset by the next `tokenize`
//! call, and view conversions / number parses simply fail outward.

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// A syntax violation encountered while tokenizing, at the given byte offset.
    #[error("parse error at byte {offset}: {message}")]
    Parse { offset: usize, message: String },

    /// A number byte-slice was not a valid integer/float for the requested
    /// precision, or overflowed the requested type.
    #[error("number format error: {0}")]
    NumberFormat(String),

    /// A view conversion (`as_object`, `as_array`, ...) was attempted on a
    /// node of a different kind.
    #[error("type mismatch: expected {expected}, found {actual}")]
    TypeMismatch {
        expected: &'static str,
        actual: &'static str,
    },

    /// An array index was out of range. Object lookups never raise this —
    /// absence there is represented by the `Missing` sentinel, not an error.
    #[error("index {index} out of range (size {size})")]
    IndexOutOfRange { index: usize, size: usize },

    /// The string decoder encountered a malformed escape sequence at the
    /// given byte offset (relative to the start of the raw string bytes).
    #[error("invalid escape sequence at byte {0}")]
    InvalidEscape(usize),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn parse(offset: usize, message: impl Into<String>) -> Self {
        let message = message.into();
        #[cfg(feature = "trace")]
        tracing::debug!(offset, %message, "parse error");
        Error::Parse { offset, message }
    }
}
