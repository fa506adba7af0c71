//! Format auto-detection and the `CamFile` aggregate output type (spec.md §6).

use crate::error::{CamError, Note};
use crate::excellon::{ExcellonOutput, ToolDictionary};
use crate::gerber::interpreter::GerberOutput;
use crate::aperture::ApertureDictionary;
use crate::number::Units;
use crate::primitive::{BoundingBox, Primitive};

/// Which file format a [`CamFile`] was read as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatTag {
    Gerber,
    Excellon,
}

/// Aperture dictionary (Gerber) or tool dictionary (Excellon); whichever
/// applies to `CamFile.format`.
#[derive(Debug, Clone)]
pub enum Dictionary {
    Apertures(ApertureDictionary),
    Tools(ToolDictionary),
}

/// Summary statistics the interpreter accumulates alongside the primitive
/// list: units (once established) and the union bounding box of every
/// emitted primitive's geometry.
#[derive(Debug, Clone, Default)]
pub struct FileStats {
    pub units: Option<Units>,
    pub bbox: Option<BoundingBox>,
}

impl FileStats {
    fn from_primitives(units: Option<Units>, primitives: &[Primitive]) -> Self {
        let bbox = primitives
            .iter()
            .map(Primitive::bounding_box)
            .reduce(|a, b| a.union(&b));
        Self { units, bbox }
    }
}

/// The parser's aggregate output: everything spec.md §6 says a reader
/// produces from one input file.
#[derive(Debug, Clone)]
pub struct CamFile {
    pub format: FormatTag,
    pub stats: FileStats,
    pub primitives: Vec<Primitive>,
    pub dictionary: Dictionary,
    pub attributes: Vec<(String, String)>,
    pub notes: Vec<Note>,
}

fn window(input: &str) -> &str {
    let limit = input.len().min(4096);
    // `input` is valid UTF-8; back off to the nearest char boundary so the
    // slice never panics on a multi-byte character straddling byte 4096.
    let mut limit = limit;
    while limit > 0 && !input.is_char_boundary(limit) {
        limit -= 1;
    }
    &input[..limit]
}

fn looks_like_tool_definition(text: &str) -> bool {
    let bytes = text.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'T' {
            let mut j = i + 1;
            let digit_start = j;
            while j < bytes.len() && bytes[j].is_ascii_digit() {
                j += 1;
            }
            if j > digit_start && j < bytes.len() && bytes[j] == b'C' {
                let mut k = j + 1;
                if k < bytes.len() && bytes[k].is_ascii_digit() {
                    while k < bytes.len() && (bytes[k].is_ascii_digit() || bytes[k] == b'.') {
                        k += 1;
                    }
                    return true;
                }
            }
        }
        i += 1;
    }
    false
}

/// Auto-detect Gerber vs. Excellon per spec.md §6: scan the first 4096
/// bytes for Gerber parameter markers, then for Excellon header/tool
/// markers, then fall back to the caller-supplied extension hint.
pub fn detect_format(input: &str, extension_hint: Option<&str>) -> Result<FormatTag, CamError> {
    let head = window(input);
    if head.contains("%FS") || head.contains("%MO") || head.contains("%AD") {
        return Ok(FormatTag::Gerber);
    }
    if head.contains("M48") || looks_like_tool_definition(head) {
        return Ok(FormatTag::Excellon);
    }
    match extension_hint.map(|s| s.trim_start_matches('.').to_ascii_lowercase()).as_deref() {
        Some("gbr" | "gtl" | "gbl" | "gts" | "gto" | "gbs" | "gbo" | "gko" | "gm1") => Ok(FormatTag::Gerber),
        Some("drl" | "txt" | "xln" | "nc") => Ok(FormatTag::Excellon),
        _ => Err(CamError::UnknownFormat),
    }
}

fn from_gerber(output: GerberOutput) -> CamFile {
    let stats = FileStats::from_primitives(output.format.map(|f| f.units), &output.primitives);
    CamFile {
        format: FormatTag::Gerber,
        stats,
        primitives: output.primitives,
        dictionary: Dictionary::Apertures(output.apertures),
        attributes: output.file_attributes,
        notes: output.notes,
    }
}

fn from_excellon(output: ExcellonOutput, units: Units) -> CamFile {
    let stats = FileStats::from_primitives(Some(units), &output.primitives);
    CamFile {
        format: FormatTag::Excellon,
        stats,
        primitives: output.primitives,
        dictionary: Dictionary::Tools(output.tools),
        attributes: Vec::new(),
        notes: output.notes,
    }
}

/// Parse `input`, auto-detecting its format, and return the aggregate
/// [`CamFile`]. `extension_hint` is consulted only when the byte-level
/// heuristics are inconclusive.
pub fn parse(input: &str, extension_hint: Option<&str>) -> Result<CamFile, CamError> {
    match detect_format(input, extension_hint)? {
        FormatTag::Gerber => {
            let units = crate::gerber::parse(input)?;
            let output = crate::gerber::interpreter::interpret(&units)?;
            Ok(from_gerber(output))
        }
        FormatTag::Excellon => {
            let (output, dialect) = crate::excellon::parse(input)?;
            Ok(from_excellon(output, dialect.format.units))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_gerber_by_parameter_marker() {
        assert_eq!(
            detect_format("%FSLAX24Y24*%\n%MOMM*%\n", None).unwrap(),
            FormatTag::Gerber
        );
    }

    #[test]
    fn detects_excellon_by_m48() {
        assert_eq!(detect_format("M48\nINCH,TZ\n%\n", None).unwrap(), FormatTag::Excellon);
    }

    #[test]
    fn detects_excellon_by_tool_definition_without_m48() {
        assert_eq!(
            detect_format("T01C0.020\nT01\nX01Y01\n", None).unwrap(),
            FormatTag::Excellon
        );
    }

    #[test]
    fn falls_back_to_extension_hint() {
        assert_eq!(detect_format("garbage", Some(".gbr")).unwrap(), FormatTag::Gerber);
        assert_eq!(detect_format("garbage", Some("drl")).unwrap(), FormatTag::Excellon);
    }

    #[test]
    fn unknown_format_without_hint_fails() {
        assert!(detect_format("garbage", None).is_err());
    }

    #[test]
    fn parses_minimal_gerber_file() {
        let file = parse(
            "%FSLAX24Y24*%\n%MOMM*%\n%ADD10C,0.5*%\nD10*\nX1000000Y1000000D03*\nM02*\n",
            None,
        )
        .unwrap();
        assert_eq!(file.format, FormatTag::Gerber);
        assert_eq!(file.primitives.len(), 1);
        assert!(matches!(file.dictionary, Dictionary::Apertures(_)));
    }

    #[test]
    fn parses_minimal_excellon_file() {
        let file = parse("M48\nINCH,TZ\nT01C0.020\n%\nT01\nX01Y01\nM30\n", None).unwrap();
        assert_eq!(file.format, FormatTag::Excellon);
        assert_eq!(file.primitives.len(), 1);
        assert!(matches!(file.dictionary, Dictionary::Tools(_)));
    }
}
