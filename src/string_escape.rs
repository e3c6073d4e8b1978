//! String escaping (write side), decoding (read side), and the field-name
//! hash used to accelerate object-key lookup.
//!
//! The write-side escape table and the hash's per-codepoint step are the two
//! places this crate trades a little cleverness for throughput: escaping
//! looks every byte up in a 128-entry table instead of branching, and hashing
//! folds UTF-8 continuation bytes into the accumulator without first
//! decoding to `char` (see `hash_field_name` doc comment for the tradeoff
//! this implies).

use once_cell::sync::Lazy;

use crate::error::{Error, Result};
use crate::writer::{OutputSink, SinkResult};

/// `ESCAPE_TABLE[b]` is `Some(replacement)` for the handful of bytes below
/// `0x80` that JSON requires (or this writer chooses) to escape; `None`
/// otherwise, meaning "copy verbatim". Bytes `>= 0x80` are always UTF-8
/// continuation/lead bytes of already-valid-UTF-8 input and are copied
/// verbatim too.
static ESCAPE_TABLE: Lazy<[Option<&'static [u8]>; 128]> = Lazy::new(|| {
    let mut table: [Option<&'static [u8]>; 128] = [None; 128];
    table[b'"' as usize] = Some(b"\\\"");
    table[b'\\' as usize] = Some(b"\\\\");
    table[0x08] = Some(b"\\b");
    table[0x0C] = Some(b"\\f");
    table[b'\n' as usize] = Some(b"\\n");
    table[b'\r' as usize] = Some(b"\\r");
    table[b'\t' as usize] = Some(b"\\t");
    let mut c = 0u8;
    while c < 0x20 {
        if table[c as usize].is_none() {
            // Control characters with no short escape use \u00XX; these are
            // rendered on demand below rather than stored as `'static` slices.
        }
        c += 1;
    }
    table
});

pub struct StringEscape;

impl StringEscape {
    /// Writes `bytes` as the interior of a JSON string (the surrounding
    /// quotes are the caller's responsibility, since field names and string
    /// values share this routine but aren't always framed identically).
    pub fn write_escaped<S: OutputSink + ?Sized>(sink: &mut S, bytes: &[u8]) -> SinkResult<()> {
        let mut run_start = 0usize;
        for (i, &b) in bytes.iter().enumerate() {
            if b >= 0x80 {
                continue;
            }
            if b < 0x20 {
                if run_start < i {
                    sink.write_all(&bytes[run_start..i])?;
                }
                if let Some(rep) = ESCAPE_TABLE[b as usize] {
                    sink.write_all(rep)?;
                } else {
                    Self::write_unicode_escape(sink, b as u32)?;
                }
                run_start = i + 1;
                continue;
            }
            if let Some(rep) = ESCAPE_TABLE[b as usize] {
                if run_start < i {
                    sink.write_all(&bytes[run_start..i])?;
                }
                sink.write_all(rep)?;
                run_start = i + 1;
            }
        }
        if run_start < bytes.len() {
            sink.write_all(&bytes[run_start..])?;
        }
        Ok(())
    }

    fn write_unicode_escape<S: OutputSink + ?Sized>(sink: &mut S, cp: u32) -> SinkResult<()> {
        const HEX: &[u8; 16] = b"0123456789abcdef";
        let buf = [
            b'\\',
            b'u',
            HEX[((cp >> 12) & 0xF) as usize],
            HEX[((cp >> 8) & 0xF) as usize],
            HEX[((cp >> 4) & 0xF) as usize],
            HEX[(cp & 0xF) as usize],
        ];
        sink.write_all(&buf)
    }
}

/// Decodes the raw bytes between a string's quotes (escapes still present)
/// into an owned, escape-free `String`. Only called when a view's consumer
/// actually asks for the decoded text — the tokenizer and the raw-bytes view
/// accessors never pay this cost.
pub struct StringDecode;

impl StringDecode {
    pub fn decode(raw: &[u8]) -> Result<String> {
        let mut out = String::with_capacity(raw.len());
        let mut i = 0usize;
        while i < raw.len() {
            let b = raw[i];
            if b != b'\\' {
                // Copy the longest run of non-backslash bytes at once; we
                // still have to validate UTF-8 over the whole result at the
                // end since input isn't pre-validated.
                let start = i;
                while i < raw.len() && raw[i] != b'\\' {
                    i += 1;
                }
                let chunk = std::str::from_utf8(&raw[start..i])
                    .map_err(|_| Error::InvalidEscape(start))?;
                out.push_str(chunk);
                continue;
            }
            if i + 1 >= raw.len() {
                return Err(Error::InvalidEscape(i));
            }
            match raw[i + 1] {
                b'"' => {
                    out.push('"');
                    i += 2;
                }
                b'\\' => {
                    out.push('\\');
                    i += 2;
                }
                b'/' => {
                    out.push('/');
                    i += 2;
                }
                b'b' => {
                    out.push('\u{0008}');
                    i += 2;
                }
                b'f' => {
                    out.push('\u{000C}');
                    i += 2;
                }
                b'n' => {
                    out.push('\n');
                    i += 2;
                }
                b'r' => {
                    out.push('\r');
                    i += 2;
                }
                b't' => {
                    out.push('\t');
                    i += 2;
                }
                b'u' => {
                    let (cp, consumed) = Self::decode_unicode_escape(raw, i)?;
                    out.push(cp);
                    i += consumed;
                }
                _ => return Err(Error::InvalidEscape(i)),
            }
        }
        Ok(out)
    }

    /// Decodes a `\uXXXX` escape starting at `raw[at]` (the backslash),
    /// consuming a trailing low surrogate's `\uXXXX` too when `raw[at..]`
    /// starts with a high surrogate. Returns `(char, bytes_consumed)`.
    fn decode_unicode_escape(raw: &[u8], at: usize) -> Result<(char, usize)> {
        let high = Self::hex4(raw, at + 2)?;
        if (0xD800..=0xDBFF).contains(&high) {
            if raw.len() < at + 12 || raw[at + 6] != b'\\' || raw[at + 7] != b'u' {
                return Err(Error::InvalidEscape(at));
            }
            let low = Self::hex4(raw, at + 8)?;
            if !(0xDC00..=0xDFFF).contains(&low) {
                return Err(Error::InvalidEscape(at));
            }
            let cp = 0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00);
            let c = char::from_u32(cp).ok_or(Error::InvalidEscape(at))?;
            Ok((c, 12))
        } else {
            let c = char::from_u32(high).ok_or(Error::InvalidEscape(at))?;
            Ok((c, 6))
        }
    }

    fn hex4(raw: &[u8], at: usize) -> Result<u32> {
        if raw.len() < at + 4 {
            return Err(Error::InvalidEscape(at));
        }
        let mut v = 0u32;
        for &b in &raw[at..at + 4] {
            let digit = match b {
                b'0'..=b'9' => u32::from(b - b'0'),
                b'a'..=b'f' => u32::from(b - b'a') + 10,
                b'A'..=b'F' => u32::from(b - b'A') + 10,
                _ => return Err(Error::InvalidEscape(at)),
            };
            v = v * 16 + digit;
        }
        Ok(v)
    }
}

/// `h = 31*h + codepoint`, folded over the *decoded* code points of a field
/// name. Mirrors the tokenizer's live field-key hash (`tokenizer.rs`'s
/// `fold_utf8_hash`) bit for bit for the escape-free case: ASCII bytes fold
/// as their own code point, and a multi-byte UTF-8 sequence is decoded to
/// its code point before folding — a 4-byte (astral) sequence folds as its
/// high/low surrogate pair, not the combined code point, since that is what
/// the tokenizer does. Getting this wrong for non-ASCII keys means
/// `ObjectView::get` would reject a present key on the hash check alone
/// before ever comparing bytes.
///
/// When a key contains a `\uXXXX` escape, this function falls back to
/// `StringDecode::decode` so the hash is at least self-consistent, at the
/// cost of an allocation on that (rare) path — see the design note on this
/// tradeoff for why this still does not match the tokenizer's own (distinct)
/// escape-hash shortcut, and why `field_key_matches` never trusts a hash
/// match alone.
pub fn hash_field_name(raw: &[u8]) -> u64 {
    if raw.contains(&b'\\') {
        return match StringDecode::decode(raw) {
            Ok(decoded) => hash_str(&decoded),
            Err(_) => hash_bytes_fast(raw),
        };
    }
    hash_bytes_fast(raw)
}

/// Folds `raw` by decoded code point, exactly as the tokenizer's
/// `fold_utf8_hash` does for unescaped string content.
fn hash_bytes_fast(raw: &[u8]) -> u64 {
    let mut h: u64 = 0;
    let mut i = 0usize;
    while i < raw.len() {
        let b = raw[i];
        if b < 0x80 {
            h = h.wrapping_mul(31).wrapping_add(u64::from(b));
            i += 1;
            continue;
        }
        let len = match b {
            0xC0..=0xDF => 2,
            0xE0..=0xEF => 3,
            0xF0..=0xF7 => 4,
            _ => {
                // Not a valid UTF-8 lead byte; fold it alone rather than panic.
                h = h.wrapping_mul(31).wrapping_add(u64::from(b));
                i += 1;
                continue;
            }
        };
        if i + len > raw.len() {
            h = h.wrapping_mul(31).wrapping_add(u64::from(b));
            i += 1;
            continue;
        }
        match len {
            2 => {
                let cp = (u32::from(raw[i] & 0x1F) << 6) | u32::from(raw[i + 1] & 0x3F);
                h = h.wrapping_mul(31).wrapping_add(u64::from(cp));
            }
            3 => {
                let cp = (u32::from(raw[i] & 0x0F) << 12) | (u32::from(raw[i + 1] & 0x3F) << 6) | u32::from(raw[i + 2] & 0x3F);
                h = h.wrapping_mul(31).wrapping_add(u64::from(cp));
            }
            4 => {
                let cp = (u32::from(raw[i] & 0x07) << 18)
                    | (u32::from(raw[i + 1] & 0x3F) << 12)
                    | (u32::from(raw[i + 2] & 0x3F) << 6)
                    | u32::from(raw[i + 3] & 0x3F);
                let astral = cp - 0x10000;
                let high = 0xD800 + (astral >> 10);
                let low = 0xDC00 + (astral & 0x3FF);
                h = h.wrapping_mul(31).wrapping_add(u64::from(high));
                h = h.wrapping_mul(31).wrapping_add(u64::from(low));
            }
            _ => unreachable!(),
        }
        i += len;
    }
    h
}

fn hash_str(s: &str) -> u64 {
    let mut h: u64 = 0;
    for c in s.chars() {
        h = h.wrapping_mul(31).wrapping_add(u64::from(c as u32));
    }
    h
}
