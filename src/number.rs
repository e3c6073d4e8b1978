//! Number parsing and formatting: byte-range <-> i32/i64/f64/f32, plus
//! arbitrary-precision fallbacks.
//!
//! The formatter's hot paths (`write_i32`/`write_i64`) use a precomputed
//! two-digit-pair table so that most digit output is one table lookup + two
//! byte writes per two digits, rather than one division + one byte write per
//! digit.

use once_cell::sync::Lazy;

use crate::error::{Error, Result};
use crate::writer::{OutputSink, SinkResult};

/// `DIGIT_PAIRS[n]` is the two ASCII digits of `n` for `0 <= n < 100`, e.g.
/// `DIGIT_PAIRS[7] == *b"07"`. Shared, immutable, initialized once.
static DIGIT_PAIRS: Lazy<[[u8; 2]; 100]> = Lazy::new(|| {
    let mut table = [[0u8; 2]; 100];
    let mut i = 0usize;
    while i < 100 {
        table[i] = [b'0' + (i / 10) as u8, b'0' + (i % 10) as u8];
        i += 1;
    }
    table
});

/// `POW10[n] == 10f64.powi(n)` for `0 <= n <= 18`.
static POW10: Lazy<[f64; 19]> = Lazy::new(|| {
    let mut table = [1.0f64; 19];
    let mut i = 1usize;
    while i <= 18 {
        table[i] = table[i - 1] * 10.0;
        i += 1;
    }
    table
});

pub struct NumberParser;

impl NumberParser {
    /// Classifies without parsing: true if the raw slice contains none of
    /// `.`, `e`, `E` (i.e. it denotes an integer literal).
    pub fn is_integer(bytes: &[u8]) -> bool {
        !bytes.iter().any(|&b| b == b'.' || b == b'e' || b == b'E')
    }

    pub fn is_negative(bytes: &[u8]) -> bool {
        bytes.first() == Some(&b'-')
    }

    /// Parses an integer-or-integer-valued-float byte slice into an `i64`,
    /// raising `NumberFormat` on malformed input or overflow. A trailing
    /// `.0..0` fraction is accepted and discarded, per spec.
    pub fn parse_i64(bytes: &[u8]) -> Result<i64> {
        let mut i = 0usize;
        let negative = bytes.first() == Some(&b'-');
        if negative {
            i = 1;
        }
        let digits_start = i;
        let mut magnitude: i128 = 0;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            magnitude = magnitude * 10 + i128::from(bytes[i] - b'0');
            i += 1;
            if magnitude > i128::from(u64::MAX) {
                return Err(Error::NumberFormat("integer magnitude overflow".into()));
            }
        }
        if i == digits_start {
            return Err(Error::NumberFormat("expected at least one digit".into()));
        }
        if i < bytes.len() && bytes[i] == b'.' {
            i += 1;
            let frac_start = i;
            while i < bytes.len() && bytes[i] == b'0' {
                i += 1;
            }
            if i < bytes.len() && bytes[i].is_ascii_digit() {
                return Err(Error::NumberFormat(
                    "non-integer fractional part in integer parse".into(),
                ));
            }
            if i == frac_start {
                return Err(Error::NumberFormat("empty fractional part".into()));
            }
        }
        if i != bytes.len() {
            return Err(Error::NumberFormat("trailing characters after number".into()));
        }
        let signed = if negative { -magnitude } else { magnitude };
        if signed < i128::from(i64::MIN) || signed > i128::from(i64::MAX) {
            return Err(Error::NumberFormat("i64 overflow".into()));
        }
        Ok(signed as i64)
    }

    pub fn parse_i32(bytes: &[u8]) -> Result<i32> {
        let v = Self::parse_i64(bytes)?;
        i32::try_from(v).map_err(|_| Error::NumberFormat("i32 overflow".into()))
    }

    /// Fast path for `mantissa * 10^(-scale)` with `0 <= scale <= 18` and
    /// mantissa fitting `i64`; otherwise falls back to the host's full
    /// IEEE-754 decimal-to-double routine (`str::parse`).
    pub fn parse_f64(bytes: &[u8]) -> Result<f64> {
        if let Some(v) = Self::try_fast_f64(bytes) {
            return Ok(v);
        }
        Self::fallback_f64(bytes)
    }

    pub fn parse_f32(bytes: &[u8]) -> Result<f32> {
        Ok(Self::parse_f64(bytes)? as f32)
    }

    fn try_fast_f64(bytes: &[u8]) -> Option<f64> {
        let mut i = 0usize;
        let negative = bytes.first() == Some(&b'-');
        if negative {
            i = 1;
        }
        let mut mantissa: i64 = 0;
        let mut any_digit = false;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            mantissa = mantissa.checked_mul(10)?.checked_add(i64::from(bytes[i] - b'0'))?;
            i += 1;
            any_digit = true;
        }
        let mut scale: u32 = 0;
        if i < bytes.len() && bytes[i] == b'.' {
            i += 1;
            while i < bytes.len() && bytes[i].is_ascii_digit() {
                mantissa = mantissa.checked_mul(10)?.checked_add(i64::from(bytes[i] - b'0'))?;
                scale += 1;
                i += 1;
                any_digit = true;
            }
        }
        if !any_digit || i != bytes.len() || scale > 18 {
            // Exponents, empty mantissas, and scales beyond the fast-path
            // window all fall back to the host formatter.
            return None;
        }
        let mut value = mantissa as f64 / POW10[scale as usize];
        if negative {
            value = -value;
        }
        Some(value)
    }

    fn fallback_f64(bytes: &[u8]) -> Result<f64> {
        let s = std::str::from_utf8(bytes)
            .map_err(|_| Error::NumberFormat("number bytes were not valid UTF-8".into()))?;
        s.parse::<f64>()
            .map_err(|e| Error::NumberFormat(format!("invalid float: {e}")))
    }

    pub fn parse_big_integer(bytes: &[u8]) -> Result<num_bigint::BigInt> {
        let s = std::str::from_utf8(bytes)
            .map_err(|_| Error::NumberFormat("number bytes were not valid UTF-8".into()))?;
        s.parse::<num_bigint::BigInt>()
            .map_err(|e| Error::NumberFormat(format!("invalid big integer: {e}")))
    }

    pub fn parse_big_decimal(bytes: &[u8]) -> Result<bigdecimal::BigDecimal> {
        let s = std::str::from_utf8(bytes)
            .map_err(|_| Error::NumberFormat("number bytes were not valid UTF-8".into()))?;
        s.parse::<bigdecimal::BigDecimal>()
            .map_err(|e| Error::NumberFormat(format!("invalid big decimal: {e}")))
    }
}

pub struct NumberFormatter;

impl NumberFormatter {
    fn write_u128<S: OutputSink + ?Sized>(sink: &mut S, mut v: u128) -> SinkResult<()> {
        // 39 bytes is enough for u128::MAX; i64/f64 fast paths never need
        // more than a fraction of that.
        let mut buf = [0u8; 39];
        let mut pos = buf.len();
        if v == 0 {
            return sink.write_byte(b'0');
        }
        while v >= 100 {
            let pair = DIGIT_PAIRS[(v % 100) as usize];
            pos -= 2;
            buf[pos] = pair[0];
            buf[pos + 1] = pair[1];
            v /= 100;
        }
        if v >= 10 {
            let pair = DIGIT_PAIRS[v as usize];
            pos -= 2;
            buf[pos] = pair[0];
            buf[pos + 1] = pair[1];
        } else {
            pos -= 1;
            buf[pos] = b'0' + v as u8;
        }
        sink.write_all(&buf[pos..])
    }

    pub fn write_i64<S: OutputSink + ?Sized>(sink: &mut S, v: i64) -> SinkResult<()> {
        if v == i64::MIN {
            return sink.write_all(b"-9223372036854775808");
        }
        if v < 0 {
            sink.write_byte(b'-')?;
            Self::write_u128(sink, (-v) as u128)
        } else {
            Self::write_u128(sink, v as u128)
        }
    }

    pub fn write_i32<S: OutputSink + ?Sized>(sink: &mut S, v: i32) -> SinkResult<()> {
        if v == i32::MIN {
            return sink.write_all(b"-2147483648");
        }
        Self::write_i64(sink, v as i64)
    }

    /// Fast path for `|v| in [1e-4, 1e15)`: scales `v` to an integer with up
    /// to 8 fractional digits, verifies the scaled value round-trips within
    /// tolerance, and strips trailing fractional zeros (but always leaves at
    /// least one fractional digit, so `27000.50` writes as `27000.5`, never
    /// as an integer). Falls back to the host's round-trip `Display` for
    /// everything else, including NaN/Infinity (mapped to `null`) and exact
    /// zero (mapped to `0.0` / `-0.0`).
    pub fn write_f64<S: OutputSink + ?Sized>(sink: &mut S, v: f64) -> SinkResult<()> {
        if v.is_nan() || v.is_infinite() {
            return sink.write_all(b"null");
        }
        if v == 0.0 {
            return sink.write_all(if v.is_sign_negative() { b"-0.0" } else { b"0.0" });
        }

        let abs = v.abs();
        if (1e-4..1e15).contains(&abs) {
            if let Some((int_part, frac_part)) = Self::scaled_fast_path(v, abs) {
                if v.is_sign_negative() {
                    sink.write_byte(b'-')?;
                }
                Self::write_u128(sink, int_part)?;
                sink.write_byte(b'.')?;
                return Self::write_stripped_fraction(sink, frac_part);
            }
        }
        sink.write_all(Self::fallback_display(v).as_bytes())
    }

    const FRACTION_SCALE: f64 = 1e8;
    const FRACTION_DIGITS: u32 = 8;

    fn scaled_fast_path(v: f64, abs: f64) -> Option<(u128, u64)> {
        let scaled = (abs * Self::FRACTION_SCALE).round();
        if !scaled.is_finite() || scaled > (u128::MAX as f64) {
            return None;
        }
        let scaled = scaled as u128;
        let int_part = scaled / (Self::FRACTION_SCALE as u128);
        let frac_part = (scaled % (Self::FRACTION_SCALE as u128)) as u64;

        let reconstructed = (int_part as f64) + (frac_part as f64) / Self::FRACTION_SCALE;
        let reconstructed = if v.is_sign_negative() { -reconstructed } else { reconstructed };
        let tolerance = (v.abs() * 1e-10).max(1e-15);
        if (reconstructed - v).abs() <= tolerance {
            Some((int_part, frac_part))
        } else {
            None
        }
    }

    fn write_stripped_fraction<S: OutputSink + ?Sized>(sink: &mut S, frac_part: u64) -> SinkResult<()> {
        let mut digits = [0u8; Self::FRACTION_DIGITS as usize];
        let mut v = frac_part;
        let mut i = digits.len();
        while i > 0 {
            i -= 1;
            digits[i] = b'0' + (v % 10) as u8;
            v /= 10;
        }
        let mut last = digits.len();
        while last > 1 && digits[last - 1] == b'0' {
            last -= 1;
        }
        sink.write_all(&digits[..last])
    }

    fn fallback_display(v: f64) -> String {
        let mut s = format!("{v}");
        // Rust's `Display` for f64 omits the decimal point for integer-valued
        // floats (`1e20` -> "100000000000000000000"); JSON output from this
        // writer always wants a fractional marker to distinguish floats from
        // integers in the surrounding document.
        if !s.contains('.') && !s.contains('e') && !s.contains('E') {
            s.push_str(".0");
        }
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::VecSink;

    #[test]
    fn parse_i64_accepts_plain_integer() {
        assert_eq!(NumberParser::parse_i64(b"42").unwrap(), 42);
        assert_eq!(NumberParser::parse_i64(b"-42").unwrap(), -42);
        assert_eq!(NumberParser::parse_i64(b"0").unwrap(), 0);
    }

    #[test]
    fn parse_i64_accepts_trailing_integer_valued_fraction() {
        assert_eq!(NumberParser::parse_i64(b"42.00").unwrap(), 42);
    }

    #[test]
    fn parse_i64_rejects_non_integer_fraction() {
        assert!(NumberParser::parse_i64(b"42.5").is_err());
    }

    #[test]
    fn parse_i64_min_max_roundtrip() {
        let mut s = VecSink::new();
        NumberFormatter::write_i64(&mut s, i64::MIN).unwrap();
        assert_eq!(NumberParser::parse_i64(s.as_slice()).unwrap(), i64::MIN);

        let mut s = VecSink::new();
        NumberFormatter::write_i64(&mut s, i64::MAX).unwrap();
        assert_eq!(NumberParser::parse_i64(s.as_slice()).unwrap(), i64::MAX);
    }

    #[test]
    fn parse_i32_overflow() {
        assert!(NumberParser::parse_i32(b"2147483648").is_err());
        assert_eq!(NumberParser::parse_i32(b"2147483647").unwrap(), i32::MAX);
    }

    #[test]
    fn parse_f64_fast_path() {
        let v = NumberParser::parse_f64(b"27000.5").unwrap();
        assert!((v - 27000.5).abs() < 1e-9);
    }

    #[test]
    fn parse_f64_fallback_for_exponent() {
        let v = NumberParser::parse_f64(b"1e-20").unwrap();
        assert!((v - 1e-20).abs() < 1e-30);
    }

    #[test]
    fn write_f64_strips_trailing_zeros() {
        let mut s = VecSink::new();
        NumberFormatter::write_f64(&mut s, 27000.50).unwrap();
        assert_eq!(s.as_slice(), b"27000.5");
    }

    #[test]
    fn write_f64_special_values() {
        let mut s = VecSink::new();
        NumberFormatter::write_f64(&mut s, f64::NAN).unwrap();
        assert_eq!(s.as_slice(), b"null");

        let mut s = VecSink::new();
        NumberFormatter::write_f64(&mut s, f64::INFINITY).unwrap();
        assert_eq!(s.as_slice(), b"null");

        let mut s = VecSink::new();
        NumberFormatter::write_f64(&mut s, 0.0).unwrap();
        assert_eq!(s.as_slice(), b"0.0");

        let mut s = VecSink::new();
        NumberFormatter::write_f64(&mut s, -0.0).unwrap();
        assert_eq!(s.as_slice(), b"-0.0");
    }

    #[test]
    fn is_integer_classification() {
        assert!(NumberParser::is_integer(b"123"));
        assert!(!NumberParser::is_integer(b"1.5"));
        assert!(!NumberParser::is_integer(b"1e5"));
    }

    #[test]
    fn big_integer_and_decimal() {
        let big = NumberParser::parse_big_integer(b"123456789012345678901234567890").unwrap();
        assert_eq!(big.to_string(), "123456789012345678901234567890");

        let dec = NumberParser::parse_big_decimal(b"1.000000000000000001").unwrap();
        assert_eq!(dec.to_string(), "1.000000000000000001");
    }
}
