//! Excellon line reader (the Excellon half of component C1).
//!
//! Line-oriented, unlike the Gerber `*`-delimited lexer: leading whitespace
//! is insignificant, `;` introduces a trailing comment, and the header
//! section runs from `M48` to a bare `%` or `M95`. Files with no `M48` at
//! all are legacy body-only dialects (spec.md §4.6's inference path),
//! so the whole file is treated as body in that case.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Header,
    Body,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Line<'a> {
    pub section: Section,
    pub text: &'a str,
}

fn strip_comment(line: &str) -> &str {
    match line.find(';') {
        Some(0) => line,
        Some(pos) => line[..pos].trim_end(),
        None => line,
    }
}

/// Segment `input` into header/body [`Line`]s. Never fails: anything not
/// recognized downstream becomes an `Unknown` statement there instead.
pub fn lex(input: &str) -> Vec<Line<'_>> {
    let mut lines = Vec::new();
    let mut section = if input.contains("M48") {
        Section::Header
    } else {
        Section::Body
    };
    for raw in input.lines() {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            continue;
        }
        if section == Section::Header && (trimmed == "%" || trimmed == "M95") {
            lines.push(Line {
                section,
                text: trimmed,
            });
            section = Section::Body;
            continue;
        }
        // whole-line comments (e.g. `;FILE_FORMAT=2:4`) are kept verbatim so
        // the dialect detector can scan them; inline trailing comments on a
        // command line are stripped since they carry no parseable content.
        let text = if trimmed.starts_with(';') {
            trimmed
        } else {
            strip_comment(trimmed)
        };
        if text.is_empty() {
            continue;
        }
        lines.push(Line { section, text });
        if text == "M48" {
            section = Section::Header;
        }
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_and_body_split_on_percent() {
        let lines = lex("M48\nINCH,TZ\nT01C0.020\n%\nT01\nX01Y01\nM30\n");
        assert_eq!(lines[0].section, Section::Header);
        assert_eq!(lines[0].text, "M48");
        assert_eq!(lines.last().unwrap().section, Section::Body);
        assert!(lines.iter().any(|l| l.text == "%" && l.section == Section::Header));
    }

    #[test]
    fn body_only_file_has_no_header() {
        let lines = lex("X007500Y005000\nX015000Y010000\n");
        assert!(lines.iter().all(|l| l.section == Section::Body));
    }

    #[test]
    fn trailing_comment_is_stripped() {
        let lines = lex("T01C0.020 ; 20 mil drill\n");
        assert_eq!(lines[0].text, "T01C0.020");
    }

    #[test]
    fn whole_line_comment_is_preserved() {
        let lines = lex("M48\n;FILE_FORMAT=2:4\n%\n");
        assert!(lines.iter().any(|l| l.text == ";FILE_FORMAT=2:4"));
    }
}
