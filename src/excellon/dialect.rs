//! Excellon format-parameter inference (component C6).
//!
//! Excellon has no single normative grammar: units, zero suppression, and
//! digit widths are often left implicit. This module resolves them in the
//! priority order spec.md §4.6 lays out, tagging the result with how
//! confident the resolution is so a caller can warn on `Inferred`.

use std::collections::BTreeSet;

use crate::error::CamError;
use crate::excellon::lexer::{Line, Section};
use crate::number::{CoordinateFormat, Notation, Units, ZeroSuppression};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confidence {
    Declared,
    Defaulted,
    Inferred,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DialectResult {
    pub format: CoordinateFormat,
    pub confidence: Confidence,
}

fn header_text(lines: &[Line<'_>]) -> String {
    lines
        .iter()
        .filter(|l| l.section == Section::Header)
        .map(|l| l.text)
        .collect::<Vec<_>>()
        .join("\n")
}

fn find_units(text: &str) -> Option<Units> {
    if text.contains("METRIC") {
        Some(Units::Millimeters)
    } else if text.contains("INCH") {
        Some(Units::Inches)
    } else {
        None
    }
}

fn find_zero_suppression(text: &str) -> Option<ZeroSuppression> {
    if text.contains("LZ") {
        Some(ZeroSuppression::Leading)
    } else if text.contains("TZ") {
        Some(ZeroSuppression::Trailing)
    } else {
        None
    }
}

/// Parse `;FILE_FORMAT=i:d` (or `;FILE_FORMAT=i.d`), if present.
fn find_file_format(text: &str) -> Option<(u8, u8)> {
    let pos = text.find("FILE_FORMAT")?;
    let rest = &text[pos + "FILE_FORMAT".len()..];
    let rest = rest.trim_start().strip_prefix('=')?;
    let rest = rest.trim();
    let (i, d) = rest.split_once([':', '.'])?;
    Some((i.trim().parse().ok()?, d.trim().parse().ok()?))
}

/// Pull out the bare digit runs following `X`/`Y` in body coordinate lines,
/// sign stripped, for length-based format inference.
fn collect_coordinate_digits(lines: &[Line<'_>]) -> Vec<String> {
    let mut out = Vec::new();
    for line in lines.iter().filter(|l| l.section == Section::Body) {
        let bytes = line.text.as_bytes();
        let mut i = 0;
        while i < bytes.len() {
            if bytes[i] == b'X' || bytes[i] == b'Y' {
                let mut j = i + 1;
                if j < bytes.len() && (bytes[j] == b'+' || bytes[j] == b'-') {
                    j += 1;
                }
                let start = j;
                while j < bytes.len() && bytes[j].is_ascii_digit() {
                    j += 1;
                }
                if j > start {
                    out.push(line.text[start..j].to_string());
                }
                i = j;
            } else {
                i += 1;
            }
        }
    }
    out
}

/// Typical PCB panels span at most this many millimeters per axis; a
/// candidate format whose decoded magnitude exceeds it is implausible.
const MAX_PLAUSIBLE_EXTENT_MM: f64 = 600.0;

/// A candidate that never decodes past a fraction of a millimeter is
/// almost always an over-long decimal guess rather than a real board size;
/// reject it so inference doesn't degenerate toward maximal decimal_digits.
const MIN_PLAUSIBLE_EXTENT_MM: f64 = 5.0;

/// Decode `digits` under a candidate `(integer, decimal, zero_suppression)`
/// triple, returning the magnitude in millimeters (so inch and metric
/// candidates compare on the same scale).
fn decoded_magnitude_mm(digits: &str, integer: u8, decimal: u8, zs: ZeroSuppression, units: Units) -> Option<f64> {
    let width = integer as usize + decimal as usize;
    if digits.len() > width || digits.is_empty() {
        return None;
    }
    let padded = match zs {
        ZeroSuppression::Leading => format!("{digits:0>width$}"),
        ZeroSuppression::Trailing => format!("{digits:0<width$}"),
        ZeroSuppression::None => {
            if digits.len() != width {
                return None;
            }
            digits.to_string()
        }
    };
    let magnitude: f64 = padded.parse().ok()?;
    let value = magnitude / 10f64.powi(decimal as i32);
    Some(match units {
        Units::Millimeters => value,
        Units::Inches => value * 25.4,
    })
}

fn infer_from_body(
    digits: &[String],
    units_hint: Option<Units>,
    zs_hint: Option<ZeroSuppression>,
) -> Result<DialectResult, CamError> {
    if digits.is_empty() {
        return Err(CamError::UnknownDialect(
            "no coordinate data in body to infer a format from".to_string(),
        ));
    }
    let lengths: BTreeSet<usize> = digits.iter().map(String::len).collect();
    let units = units_hint.unwrap_or(Units::Millimeters);
    let zs_candidates: Vec<ZeroSuppression> = match zs_hint {
        Some(zs) => vec![zs],
        None => vec![ZeroSuppression::Leading, ZeroSuppression::Trailing],
    };

    let mut best: Option<(f64, u8, CoordinateFormat)> = None;
    for &len in &lengths {
        if len == 0 || len > 12 {
            continue;
        }
        for integer in 1..=6u8 {
            if integer as usize > len {
                continue;
            }
            let decimal = len as i32 - integer as i32;
            if !(0..=6).contains(&decimal) {
                continue;
            }
            let decimal = decimal as u8;
            for &zs in &zs_candidates {
                let max_extent = digits
                    .iter()
                    .filter_map(|d| decoded_magnitude_mm(d, integer, decimal, zs, units))
                    .fold(0.0_f64, f64::max);
                if max_extent > MAX_PLAUSIBLE_EXTENT_MM || max_extent < MIN_PLAUSIBLE_EXTENT_MM {
                    continue;
                }
                let format = CoordinateFormat {
                    integer_digits: integer,
                    decimal_digits: decimal,
                    zero_suppression: zs,
                    notation: Notation::Absolute,
                    units,
                };
                let better = match &best {
                    None => true,
                    Some((best_extent, best_decimal, _)) => {
                        max_extent < best_extent - 1e-9
                            || ((max_extent - best_extent).abs() < 1e-9 && decimal < *best_decimal)
                    }
                };
                if better {
                    best = Some((max_extent, decimal, format));
                }
            }
        }
    }
    match best {
        Some((_, _, format)) => Ok(DialectResult {
            format,
            confidence: Confidence::Inferred,
        }),
        None => Err(CamError::UnknownDialect(
            "no (integer, decimal) candidate produced a plausible bounding box".to_string(),
        )),
    }
}

/// Resolve the [`CoordinateFormat`] for an already-lexed Excellon file.
pub fn detect(lines: &[Line<'_>]) -> Result<DialectResult, CamError> {
    let header = header_text(lines);

    if let Some((integer, decimal)) = find_file_format(&header) {
        let units = find_units(&header).unwrap_or(Units::Inches);
        let zero_suppression = find_zero_suppression(&header).unwrap_or(ZeroSuppression::Trailing);
        return Ok(DialectResult {
            format: CoordinateFormat {
                integer_digits: integer,
                decimal_digits: decimal,
                zero_suppression,
                notation: Notation::Absolute,
                units,
            },
            confidence: Confidence::Declared,
        });
    }

    let units_hint = find_units(&header);
    let zs_hint = find_zero_suppression(&header);
    if let (Some(units), Some(zero_suppression)) = (units_hint, zs_hint) {
        let (integer, decimal) = match units {
            Units::Inches => (2, 4),
            Units::Millimeters => (3, 3),
        };
        return Ok(DialectResult {
            format: CoordinateFormat {
                integer_digits: integer,
                decimal_digits: decimal,
                zero_suppression,
                notation: Notation::Absolute,
                units,
            },
            confidence: Confidence::Defaulted,
        });
    }

    let digits = collect_coordinate_digits(lines);
    infer_from_body(&digits, units_hint, zs_hint)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::excellon::lexer::lex;

    #[test]
    fn explicit_file_format_wins() {
        let lines = lex("M48\n;FILE_FORMAT=2:4\nINCH,TZ\n%\nT01\nX010000Y020000\nM30\n");
        let result = detect(&lines).unwrap();
        assert_eq!(result.confidence, Confidence::Declared);
        assert_eq!(result.format.integer_digits, 2);
        assert_eq!(result.format.decimal_digits, 4);
    }

    #[test]
    fn header_units_and_suppression_default_to_2_4() {
        let lines = lex("M48\nINCH,TZ\nT01C0.020\n%\nT01\nX01Y01\nM30\n");
        let result = detect(&lines).unwrap();
        assert_eq!(result.confidence, Confidence::Defaulted);
        assert_eq!(result.format.integer_digits, 2);
        assert_eq!(result.format.decimal_digits, 4);
        assert_eq!(result.format.zero_suppression, ZeroSuppression::Trailing);
    }

    #[test]
    fn metric_defaults_to_3_3() {
        let lines = lex("M48\nMETRIC,LZ\nT01C0.50\n%\nT01\nX001000Y002000\nM30\n");
        let result = detect(&lines).unwrap();
        assert_eq!(result.format.integer_digits, 3);
        assert_eq!(result.format.decimal_digits, 3);
    }

    #[test]
    fn body_only_infers_metric_format() {
        let lines = lex("X007500Y005000\nX015000Y010000\n");
        let result = detect(&lines).unwrap();
        assert_eq!(result.confidence, Confidence::Inferred);
        // 1:5 and 2:4 both decode under the 5mm plausibility floor (0.15mm,
        // 1.5mm); 4:2 clears 600mm (150mm). 3:3 is the smallest format left
        // standing (15mm), matching the conventional metric default.
        assert_eq!(result.format.integer_digits, 3);
        assert_eq!(result.format.decimal_digits, 3);
    }

    #[test]
    fn too_short_body_fails_to_infer() {
        let lines = lex("G00\n");
        assert!(detect(&lines).is_err());
    }
}
