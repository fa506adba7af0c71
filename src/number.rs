//! Fixed-point digit-string decoding (component C2 of the design).
//!
//! Gerber and Excellon coordinate fields are bare digit strings whose
//! decimal point position is implied by a [`CoordinateFormat`] rather than
//! written out. This module turns those strings into `f64` values and back,
//! and separately parses the decimal-point literals that show up in
//! parameter fields (aperture dimensions, macro arguments, `FILE_FORMAT`).

use crate::error::CamError;

/// How the zeros that the decimal-point form would have carried are
/// omitted from the wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZeroSuppression {
    /// Leading zeros are omitted; the digit string is right-aligned.
    Leading,
    /// Trailing zeros are omitted; the digit string is left-aligned.
    Trailing,
    /// No suppression; the digit string must be exactly `integer + decimal` wide.
    None,
}

/// `G90`/`G91`-style coordinate interpretation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notation {
    Absolute,
    Incremental,
}

/// Linear unit the coordinate format (and the file as a whole) is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Units {
    Millimeters,
    Inches,
}

/// The `(integer_digits, decimal_digits, zero_suppression, notation, units)`
/// tuple that governs decoding of bare digit strings, per spec.md §3.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateFormat {
    pub integer_digits: u8,
    pub decimal_digits: u8,
    pub zero_suppression: ZeroSuppression,
    pub notation: Notation,
    pub units: Units,
}

impl CoordinateFormat {
    pub fn width(&self) -> usize {
        self.integer_digits as usize + self.decimal_digits as usize
    }
}

/// Split a raw coordinate field into `(negative, digits)`.
fn split_sign(s: &str) -> (bool, &str) {
    match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s.strip_prefix('+').unwrap_or(s)),
    }
}

/// Zero-fill `digits` (already sign-stripped, decimal-point-free) to
/// `format.width()` per the configured suppression, returning the padded
/// digit string on success.
fn zero_fill(digits: &str, format: &CoordinateFormat) -> Result<String, CamError> {
    let width = format.width();
    if digits.len() > width || digits.is_empty() {
        return Err(CamError::NumberOverflow {
            digits: digits.to_string(),
            integer: format.integer_digits,
            decimal: format.decimal_digits,
        });
    }
    Ok(match format.zero_suppression {
        ZeroSuppression::Leading => format!("{:0>width$}", digits, width = width),
        ZeroSuppression::Trailing => format!("{:0<width$}", digits, width = width),
        ZeroSuppression::None => {
            if digits.len() != width {
                return Err(CamError::NumberOverflow {
                    digits: digits.to_string(),
                    integer: format.integer_digits,
                    decimal: format.decimal_digits,
                });
            }
            digits.to_string()
        }
    })
}

/// Decode a raw digit-string coordinate field (e.g. `X0015000` with the
/// leading `X` already stripped) into a value expressed in `format.units`.
pub fn decode_digits(raw: &str, format: &CoordinateFormat) -> Result<f64, CamError> {
    let (negative, digits) = split_sign(raw);
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(CamError::NumberOverflow {
            digits: raw.to_string(),
            integer: format.integer_digits,
            decimal: format.decimal_digits,
        });
    }
    let padded = zero_fill(digits, format)?;
    // `padded` is ASCII-digits-only and at most a handful of characters
    // wider than an i64 can hold for any sane board; `.unwrap()` here
    // mirrors the teacher's `into_i32`/`into_f64` trust-boundary helpers.
    let magnitude: i64 = padded.parse().unwrap_or(0);
    let scale = 10f64.powi(format.decimal_digits as i32);
    let value = magnitude as f64 / scale;
    Ok(if negative { -value } else { value })
}

/// Re-encode `value` under `format`, producing the canonical suppressed
/// digit string a conformant writer would emit. Used by the C2 round-trip
/// property (spec.md §8, law 1) and not otherwise needed by the core.
pub fn encode_digits(value: f64, format: &CoordinateFormat) -> String {
    let width = format.width();
    let scale = 10f64.powi(format.decimal_digits as i32);
    let magnitude = (value.abs() * scale).round() as i64;
    let full = format!("{:0>width$}", magnitude, width = width);
    let body = match format.zero_suppression {
        ZeroSuppression::Leading => {
            let trimmed = full.trim_start_matches('0');
            if trimmed.is_empty() {
                "0".to_string()
            } else {
                trimmed.to_string()
            }
        }
        ZeroSuppression::Trailing => {
            let trimmed = full.trim_end_matches('0');
            if trimmed.is_empty() {
                "0".to_string()
            } else {
                trimmed.to_string()
            }
        }
        ZeroSuppression::None => full,
    };
    if value < 0.0 {
        format!("-{body}")
    } else {
        body
    }
}

/// Parse a decimal-point literal (aperture dimensions, macro call-site
/// arguments, `FILE_FORMAT=i:d`) independently of any [`CoordinateFormat`].
pub fn decode_decimal_field(s: &str) -> Result<f64, CamError> {
    nom::combinator::all_consuming(crate::data::decimal)(s)
        .map(|(_, v)| v)
        .map_err(|_| CamError::Format(format!("not a decimal literal: {s:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fmt(
        integer: u8,
        decimal: u8,
        zero_suppression: ZeroSuppression,
    ) -> CoordinateFormat {
        CoordinateFormat {
            integer_digits: integer,
            decimal_digits: decimal,
            zero_suppression,
            notation: Notation::Absolute,
            units: Units::Millimeters,
        }
    }

    #[test]
    fn leading_zero_suppression() {
        let format = fmt(2, 4, ZeroSuppression::Leading);
        assert_eq!(decode_digits("10000", &format).unwrap(), 1.0);
        assert_eq!(decode_digits("-10000", &format).unwrap(), -1.0);
        assert_eq!(decode_digits("0", &format).unwrap(), 0.0);
    }

    #[test]
    fn trailing_zero_suppression() {
        let format = fmt(2, 4, ZeroSuppression::Trailing);
        // "1" left-aligned to width 6 -> "100000" -> 10.0000
        assert_eq!(decode_digits("1", &format).unwrap(), 10.0);
        assert_eq!(decode_digits("01", &format).unwrap(), 1.0);
    }

    #[test]
    fn no_suppression_requires_exact_width() {
        let format = fmt(2, 4, ZeroSuppression::None);
        assert_eq!(decode_digits("001000", &format).unwrap(), 0.1);
        assert!(decode_digits("1000", &format).is_err());
    }

    #[test]
    fn overflow_is_rejected() {
        let format = fmt(2, 4, ZeroSuppression::Leading);
        assert!(decode_digits("1234567", &format).is_err());
    }

    #[test]
    fn round_trip() {
        let format = fmt(2, 4, ZeroSuppression::Leading);
        for raw in ["0", "10000", "1234", "999999"] {
            let value = decode_digits(raw, &format).unwrap();
            let reencoded = encode_digits(value, &format);
            let reparsed = decode_digits(&reencoded, &format).unwrap();
            assert!((value - reparsed).abs() < 1e-9);
        }
    }

    #[test]
    fn decimal_field_literal() {
        assert_eq!(decode_decimal_field("0.5").unwrap(), 0.5);
        assert_eq!(decode_decimal_field("-1.25").unwrap(), -1.25);
        assert_eq!(decode_decimal_field("3").unwrap(), 3.0);
    }
}
