//! Parsers and stateful graphics interpreters for the two file formats that
//! drive PCB fabrication: RS-274X (Gerber) and Excellon (NC-drill).
//!
//! ## Current Limitations
//!
//! * Rendering, numeric-unit transforms, and any CLI surface are out of
//!   scope — this crate stops at an ordered list of [`primitive::Primitive`]
//!   values plus the dictionaries and notes needed to interpret them.
//! * Aperture macro primitive codes 0/1/4/5/6/7/20/21 are covered; vendor
//!   extensions to the macro language are not.
//!
//! ## Implementation Notes
//!
//! Gerber's `*`-terminated, `%...%`-delimited grammar is genuinely
//! context-free at the block level, so [`gerber::command`] parses each
//! block with [nom](https://crates.io/crates/nom) independently of any
//! running state; [`gerber::interpreter`] is the only place that consults
//! or mutates the modal graphics state (current point, aperture, polarity,
//! region/quadrant mode) described in the format's specification.
//!
//! Excellon has no single normative grammar: several vendor dialects
//! coexist, and the coordinate format is frequently left implicit. Rather
//! than guess silently, [`excellon::dialect`] tags its result with how it
//! arrived at a format (`declared`, `defaulted`, or `inferred`) so a caller
//! can choose to warn when the confidence is low.
//!
//! [`camfile::parse`] is the entry point most callers want: it detects
//! which of the two formats it's looking at and dispatches accordingly.

pub mod aperture;
pub mod camfile;
pub mod data;
pub mod error;
pub mod excellon;
pub mod gerber;
pub mod macro_eval;
pub mod number;
pub mod primitive;

pub use camfile::{CamFile, Dictionary, FileStats, FormatTag};
pub use error::{CamError, Note, NoteKind};

/// Shorthand for a `nom` parser result over a `&str` input, used throughout
/// the block- and field-level grammars.
pub(crate) type IResult<'a, T> = nom::IResult<&'a str, T>;

/// Parse `input`, auto-detecting Gerber vs. Excellon. `extension_hint`
/// (e.g. `"gbr"` or `"drl"`) is only consulted when the content itself is
/// ambiguous; pass `None` if the caller has no filename to go on.
pub fn parse(input: &str, extension_hint: Option<&str>) -> Result<CamFile, CamError> {
    camfile::parse(input, extension_hint)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn top_level_parse_dispatches_to_gerber() {
        let file = parse("%FSLAX24Y24*%\n%MOMM*%\n%ADD10C,0.5*%\nD10*\nX0Y0D03*\nM02*\n", None).unwrap();
        assert_eq!(file.format, FormatTag::Gerber);
    }

    #[test]
    fn top_level_parse_dispatches_to_excellon() {
        let file = parse("M48\nINCH,TZ\nT01C0.02\n%\nT01\nX01Y01\nM30\n", None).unwrap();
        assert_eq!(file.format, FormatTag::Excellon);
    }
}
