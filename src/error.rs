//! Error and non-fatal note types shared by the Gerber and Excellon readers.

use thiserror::Error;

/// Fatal errors which abort a parse.
///
/// Anything that can be recovered from by dropping a single emission is
/// instead represented as a [`Note`] pushed onto `FileStats.notes`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CamError {
    #[error("lex error at byte {pos}: {reason}")]
    Lex { pos: usize, reason: String },

    #[error("format error: {0}")]
    Format(String),

    #[error("could not determine whether input is Gerber or Excellon")]
    UnknownFormat,

    #[error("excellon dialect could not be inferred: {0}")]
    UnknownDialect(String),

    #[error("unknown aperture macro primitive code {code} in macro {macro_name}")]
    UnknownMacroPrimitive { macro_name: String, code: i32 },

    #[error("digit string {digits:?} overflows coordinate format ({integer}.{decimal})")]
    NumberOverflow {
        digits: String,
        integer: u8,
        decimal: u8,
    },
}

/// A non-fatal condition recorded while parsing continues.
#[derive(Debug, Clone, PartialEq)]
pub struct Note {
    pub line: Option<u32>,
    pub kind: NoteKind,
    pub detail: String,
}

impl Note {
    pub fn new(line: Option<u32>, kind: NoteKind, detail: impl Into<String>) -> Self {
        Self {
            line,
            kind,
            detail: detail.into(),
        }
    }
}

/// The kind of non-fatal condition a [`Note`] records.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteKind {
    #[error("number overflowed its coordinate format")]
    NumberOverflow,
    #[error("D-code referenced before it was defined")]
    UndefinedAperture,
    #[error("tool referenced before it was defined")]
    UndefinedTool,
    #[error("flash emitted while a region was open")]
    FlashInRegion,
    #[error("no arc sign combination produced a valid <=90 degree sweep")]
    AmbiguousArc,
    #[error("region was not closed before end of file")]
    UnclosedRegion,
    #[error("a D-code was redefined, last definition wins")]
    DuplicateAperture,
    #[error("an unrecognized command was skipped")]
    UnknownCommand,
    #[error("a deprecated or vendor-specific code was tolerated")]
    LegacyCode,
}

/// Push a [`Note`] onto `notes` and mirror it to the `log` facade so an
/// embedding binary gets observability without the core dictating a
/// logging backend.
pub(crate) fn note(notes: &mut Vec<Note>, line: Option<u32>, kind: NoteKind, detail: impl Into<String>) {
    let detail = detail.into();
    log::warn!("{kind}: {detail}");
    notes.push(Note::new(line, kind, detail));
}
