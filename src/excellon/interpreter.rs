//! Excellon header/body interpreter (component C7).
//!
//! Consumes the [`Line`]s from [`super::lexer::lex`] plus the
//! [`super::dialect::DialectResult`] resolved for them, and emits
//! [`Primitive::Drill`]/[`Primitive::Slot`] values against a tool
//! dictionary built from the header's `T<n>C<diameter>` definitions.

use std::collections::BTreeMap;

use nom::{
    character::complete::{char, digit1},
    combinator::{map, map_res, opt, recognize},
    sequence::{pair, preceded, tuple},
};

use crate::error::{note, CamError, Note, NoteKind};
use crate::excellon::lexer::{Line, Section};
use crate::number::{decode_digits, CoordinateFormat};
use crate::primitive::{Point, Primitive};
use crate::IResult;

/// A `T<n>` tool number. Distinct from [`crate::aperture::ApertureId`]:
/// Excellon tools and Gerber apertures are separate namespaces that
/// happen to both be small positive integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ToolId(pub u32);

/// Whether a tool's hole is plated, from the `TYPE=PLATED`/`TYPE=NON_PLATED`
/// attribute comment some generators emit (spec.md §9 supplement).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatingType {
    Plated,
    NonPlated,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tool {
    pub id: ToolId,
    pub diameter: f64,
    pub plating: Option<PlatingType>,
}

#[derive(Debug, Clone, Default)]
pub struct ToolDictionary {
    tools: BTreeMap<u32, Tool>,
}

impl ToolDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn define(&mut self, tool: Tool) -> Option<Tool> {
        self.tools.insert(tool.id.0, tool)
    }

    pub fn lookup(&self, id: ToolId) -> Option<&Tool> {
        self.tools.get(&id.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Tool> {
        self.tools.values()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ExcellonOutput {
    pub primitives: Vec<Primitive>,
    pub tools: ToolDictionary,
    pub notes: Vec<Note>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RouteMode {
    Drill,
    Rout,
}

fn tool_id(input: &str) -> IResult<ToolId> {
    map(preceded(char('T'), map_res(digit1, str::parse)), ToolId)(input)
}

fn header_tool_definition(input: &str) -> IResult<Tool> {
    map(
        tuple((
            tool_id,
            preceded(char('C'), crate::data::unsigned_decimal),
            opt(preceded(char('F'), digit1)),
            opt(preceded(char('S'), digit1)),
        )),
        |(id, diameter, _feed, _speed)| Tool {
            id,
            diameter,
            plating: None,
        },
    )(input)
}

fn signed_digits(input: &str) -> IResult<&str> {
    recognize(pair(opt(char('-')), digit1))(input)
}

fn coordinate_token(axis: char, input: &str) -> IResult<&str> {
    preceded(char(axis), signed_digits)(input)
}

struct Interpreter {
    format: CoordinateFormat,
    tools: ToolDictionary,
    current_tool: Option<ToolId>,
    current_point: Point,
    route_mode: RouteMode,
    notes: Vec<Note>,
    primitives: Vec<Primitive>,
}

impl Interpreter {
    fn new(format: CoordinateFormat) -> Self {
        Self {
            format,
            tools: ToolDictionary::new(),
            current_tool: None,
            current_point: Point::new(0.0, 0.0),
            route_mode: RouteMode::Drill,
            notes: Vec::new(),
            primitives: Vec::new(),
        }
    }

    fn note(&mut self, kind: NoteKind, detail: impl Into<String>) {
        note(&mut self.notes, None, kind, detail);
    }

    fn decode_point(&self, line: &str) -> Result<Point, CamError> {
        let x = coordinate_token('X', line).ok().map(|(_, d)| d);
        let y = coordinate_token('Y', line).ok().map(|(_, d)| d);
        let x = x.map(|d| decode_digits(d, &self.format)).transpose()?;
        let y = y.map(|d| decode_digits(d, &self.format)).transpose()?;
        Ok(Point::new(
            x.unwrap_or(self.current_point.x),
            y.unwrap_or(self.current_point.y),
        ))
    }

    fn header_line(&mut self, text: &str) {
        if text.starts_with(";FILE_FORMAT") {
            return;
        }
        if let Ok((_, tool)) = header_tool_definition(text) {
            self.tools.define(tool);
            return;
        }
        if text.starts_with("TYPE=") {
            // applies to the most recently defined tool
            let plating = if text.contains("NON_PLATED") {
                PlatingType::NonPlated
            } else if text.contains("PLATED") {
                PlatingType::Plated
            } else {
                return;
            };
            if let Some((&last_id, _)) = self.tools.tools.iter().next_back() {
                if let Some(tool) = self.tools.tools.get_mut(&last_id) {
                    tool.plating = Some(plating);
                }
            }
        }
        // M48, FMAT,n, INCH/METRIC, LZ/TZ and unrecognized header lines are
        // consumed by the dialect detector or carry no further state here.
    }

    fn body_line(&mut self, text: &str) -> Result<(), CamError> {
        if let Ok((_, id)) = tool_id_only(text) {
            self.current_tool = if id.0 == 0 { None } else { Some(id) };
            return Ok(());
        }
        if text == "G00" {
            self.route_mode = RouteMode::Rout;
            return Ok(());
        }
        if text == "G05" {
            self.route_mode = RouteMode::Drill;
            return Ok(());
        }
        if text == "G01" {
            return Ok(());
        }
        if text == "M30" || text == "M00" {
            return Ok(());
        }
        if let Some(rest) = text.strip_prefix('R') {
            return self.repeat_hit(rest);
        }
        if text.contains('X') || text.contains('Y') {
            let point = self.decode_point(text)?;
            self.hit_or_rout(point);
            return Ok(());
        }
        self.note(NoteKind::UnknownCommand, text.to_string());
        Ok(())
    }

    fn hit_or_rout(&mut self, point: Point) {
        let Some(tool) = self.current_tool else {
            self.note(NoteKind::UndefinedTool, "coordinate with no tool selected");
            self.current_point = point;
            return;
        };
        match self.route_mode {
            RouteMode::Drill => {
                self.primitives.push(Primitive::Drill { position: point, tool });
            }
            RouteMode::Rout => {
                self.primitives.push(Primitive::Slot {
                    start: self.current_point,
                    end: point,
                    tool,
                });
            }
        }
        self.current_point = point;
    }

    fn repeat_hit(&mut self, rest: &str) -> Result<(), CamError> {
        let (rest, count_digits) = repeat_count(rest)
            .map_err(|_| CamError::Format(format!("malformed repeat-hit count: R{rest:?}")))?;
        let count: u32 = count_digits
            .parse()
            .map_err(|_| CamError::Format(format!("malformed repeat-hit count: {count_digits:?}")))?;
        let delta = self.decode_point(rest)?;
        // R<n> repeats the last drill `n` additional times, each offset by
        // the same (dx, dy) delta from the previous hit (spec.md §9).
        let dx = if rest.contains('X') {
            delta.x - self.current_point.x
        } else {
            0.0
        };
        let dy = if rest.contains('Y') {
            delta.y - self.current_point.y
        } else {
            0.0
        };
        let Some(tool) = self.current_tool else {
            self.note(NoteKind::UndefinedTool, "R repeat-hit with no tool selected");
            return Ok(());
        };
        for _ in 0..count {
            let next = Point::new(self.current_point.x + dx, self.current_point.y + dy);
            self.primitives.push(Primitive::Drill { position: next, tool });
            self.current_point = next;
        }
        Ok(())
    }
}

fn tool_id_only(input: &str) -> IResult<ToolId> {
    nom::combinator::all_consuming(tool_id)(input)
}

fn repeat_count(input: &str) -> IResult<&str> {
    digit1(input)
}

/// Interpret an already dialect-resolved Excellon file.
pub fn interpret(lines: &[Line<'_>], format: CoordinateFormat) -> Result<ExcellonOutput, CamError> {
    let mut interpreter = Interpreter::new(format);
    for line in lines {
        match line.section {
            Section::Header => interpreter.header_line(line.text),
            Section::Body => {
                if line.text == "M48" || line.text == "%" || line.text == "M95" {
                    continue;
                }
                interpreter.body_line(line.text)?;
            }
        }
    }
    Ok(ExcellonOutput {
        primitives: interpreter.primitives,
        tools: interpreter.tools,
        notes: interpreter.notes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::excellon::lexer::lex;
    use crate::number::{Notation, Units, ZeroSuppression};

    fn format() -> CoordinateFormat {
        CoordinateFormat {
            integer_digits: 2,
            decimal_digits: 4,
            zero_suppression: ZeroSuppression::Trailing,
            notation: Notation::Absolute,
            units: Units::Inches,
        }
    }

    #[test]
    fn trailing_zero_suppression_hits() {
        // Format 2:4, trailing suppression: the full 6-digit field for 0.1in
        // is "001000"; with trailing zeros dropped that's "001".
        let lines = lex("M48\nINCH,TZ\nT01C0.020\n%\nT01\nX001Y001\nX002Y002\nM30\n");
        let output = interpret(&lines, format()).unwrap();
        assert_eq!(output.primitives.len(), 2);
        match &output.primitives[0] {
            Primitive::Drill { position, tool } => {
                assert!((position.x - 0.1).abs() < 1e-9);
                assert!((position.y - 0.1).abs() < 1e-9);
                assert_eq!(*tool, ToolId(1));
            }
            other => panic!("expected Drill, got {other:?}"),
        }
    }

    #[test]
    fn rout_mode_emits_slot() {
        let lines = lex("M48\nINCH,TZ\nT01C0.031\n%\nT01\nX001Y001\nG00\nX002Y001\nM30\n");
        let output = interpret(&lines, format()).unwrap();
        assert_eq!(output.primitives.len(), 2);
        assert!(matches!(output.primitives[0], Primitive::Drill { .. }));
        match &output.primitives[1] {
            Primitive::Slot { start, end, .. } => {
                assert!((start.x - 0.1).abs() < 1e-9);
                assert!((end.x - 0.2).abs() < 1e-9);
            }
            other => panic!("expected Slot, got {other:?}"),
        }
    }

    #[test]
    fn repeat_hit_emits_additional_drills() {
        let lines = lex("M48\nINCH,TZ\nT01C0.020\n%\nT01\nX01Y01\nR3X01Y0\nM30\n");
        let output = interpret(&lines, format()).unwrap();
        assert_eq!(output.primitives.len(), 4);
    }

    #[test]
    fn undefined_tool_is_noted() {
        let lines = lex("M48\nINCH,TZ\n%\nX01Y01\nM30\n");
        let output = interpret(&lines, format()).unwrap();
        assert!(output.primitives.is_empty());
        assert!(output.notes.iter().any(|n| n.kind == NoteKind::UndefinedTool));
    }
}
