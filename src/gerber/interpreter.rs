//! Stateful graphics interpreter (component C5).
//!
//! Walks the [`super::GerberUnit`] list produced by [`super::parse`],
//! maintaining the modal graphics state spec.md §3 describes, and emits
//! [`Primitive`]s. Aperture redefinition, undefined-aperture references,
//! ambiguous arcs, and flashes inside an open region are all non-fatal:
//! each records a [`Note`] and the interpreter keeps going.

use std::collections::HashMap;

use crate::aperture::{Aperture, ApertureDictionary, ApertureId, Shape};
use crate::error::{note, CamError, Note, NoteKind};
use crate::gerber::command::{
    ApertureShapeSpec, ImagePolarity, Interpolation, OpCode, QuadrantMode as CmdQuadrantMode,
    RawCoordinates, Statement,
};
use crate::gerber::GerberUnit;
use crate::macro_eval::{self, MacroDefinition};
use crate::number::{decode_digits, CoordinateFormat, Notation, Units, ZeroSuppression};
use crate::primitive::{Attributes, Point, Polarity, QuadrantMode, Segment, SweepDirection};
use crate::primitive::Primitive;

/// Everything the Gerber interpreter produces, before [`crate::camfile`]
/// wraps it with format-detection and combined Excellon output.
#[derive(Debug, Clone, Default)]
pub struct GerberOutput {
    pub primitives: Vec<Primitive>,
    pub apertures: ApertureDictionary,
    pub file_attributes: Vec<(String, String)>,
    pub notes: Vec<Note>,
    pub format: Option<CoordinateFormat>,
    pub image_polarity: ImagePolarity,
}

impl Default for ImagePolarity {
    fn default() -> Self {
        ImagePolarity::Positive
    }
}

/// One level of the aperture-block / step-and-repeat nesting stack. Body
/// primitives accumulate in `buffer` instead of the main output list until
/// the frame closes, at which point they either become an `AB` aperture
/// definition or get replicated across the `SR` grid.
enum Frame {
    Block {
        id: ApertureId,
        buffer: Vec<Primitive>,
    },
    StepAndRepeat {
        nx: i32,
        ny: i32,
        dx: f64,
        dy: f64,
        buffer: Vec<Primitive>,
    },
}

struct Interpreter {
    format: Option<CoordinateFormat>,
    units: Option<Units>,
    current_point: Point,
    current_aperture: Option<ApertureId>,
    interpolation: Interpolation,
    quadrant_mode: CmdQuadrantMode,
    level_polarity: Polarity,
    image_polarity: ImagePolarity,
    region_open: bool,
    region_contour: Vec<Segment>,
    pending_attributes: Vec<(String, String)>,
    file_attributes: Vec<(String, String)>,
    apertures: ApertureDictionary,
    macros: HashMap<String, MacroDefinition>,
    frames: Vec<Frame>,
    saved_points: Vec<Point>,
    root: Vec<Primitive>,
    notes: Vec<Note>,
}

impl Interpreter {
    fn new() -> Self {
        Self {
            format: None,
            units: None,
            current_point: Point::new(0.0, 0.0),
            current_aperture: None,
            interpolation: Interpolation::Linear,
            quadrant_mode: CmdQuadrantMode::Multi,
            level_polarity: Polarity::Dark,
            image_polarity: ImagePolarity::Positive,
            region_open: false,
            region_contour: Vec::new(),
            pending_attributes: Vec::new(),
            file_attributes: Vec::new(),
            apertures: ApertureDictionary::new(),
            macros: HashMap::new(),
            frames: Vec::new(),
            saved_points: Vec::new(),
            root: Vec::new(),
            notes: Vec::new(),
        }
    }

    fn note(&mut self, kind: NoteKind, detail: impl Into<String>) {
        note(&mut self.notes, None, kind, detail);
    }

    fn format_or_note(&mut self) -> Option<CoordinateFormat> {
        if self.format.is_none() {
            self.note(NoteKind::UnknownCommand, "coordinate data before FS/MO was established");
        }
        self.format
    }

    fn target(&mut self) -> &mut Vec<Primitive> {
        match self.frames.last_mut() {
            Some(Frame::Block { buffer, .. }) => buffer,
            Some(Frame::StepAndRepeat { buffer, .. }) => buffer,
            None => &mut self.root,
        }
    }

    fn take_attributes(&mut self) -> Attributes {
        std::mem::take(&mut self.pending_attributes)
    }

    fn emit(&mut self, primitive: Primitive) {
        self.target().push(primitive);
    }

    fn run(&mut self, units: &[GerberUnit<'_>]) -> Result<(), CamError> {
        let mut iter = units.iter();
        while let Some(unit) = iter.next() {
            match unit {
                GerberUnit::MacroDefine(def) => {
                    self.macros.insert(def.name.clone(), def.clone());
                }
                GerberUnit::Statement(statement) => {
                    if self.statement(statement)? {
                        // EndOfFile: ignore anything after it, but note if present.
                        if iter.next().is_some() {
                            self.note(NoteKind::UnknownCommand, "data found after M02");
                        }
                        break;
                    }
                }
            }
        }
        if self.region_open {
            self.note(NoteKind::UnclosedRegion, "file ended with an open region");
        }
        Ok(())
    }

    /// Returns `Ok(true)` if this was `M02` (end of file).
    fn statement(&mut self, statement: &Statement<'_>) -> Result<bool, CamError> {
        match statement {
            Statement::Comment(_) => {}
            Statement::FormatSpecification {
                x,
                y,
                zero_suppression,
                notation,
            } => {
                if self.format.is_some() {
                    return Err(CamError::Format("FS specified more than once".into()));
                }
                if x != y {
                    self.note(
                        NoteKind::UnknownCommand,
                        format!("FS X format {x:?} and Y format {y:?} differ; using X"),
                    );
                }
                let units = self.units.unwrap_or(Units::Millimeters);
                self.format = Some(CoordinateFormat {
                    integer_digits: x.0,
                    decimal_digits: x.1,
                    zero_suppression: *zero_suppression,
                    notation: *notation,
                    units,
                });
            }
            Statement::UnitMode(units) => {
                if self.units.is_some() {
                    return Err(CamError::Format("MO specified more than once".into()));
                }
                self.units = Some(*units);
                if let Some(format) = self.format.as_mut() {
                    format.units = *units;
                }
            }
            Statement::ApertureDefine { id, shape } => {
                let aperture = self.build_aperture(*id, shape)?;
                if self.apertures.define(aperture).is_some() {
                    self.note(NoteKind::DuplicateAperture, format!("D{} redefined", id.0));
                }
            }
            Statement::ApertureMacroStart(_) => {
                // Folded into a `GerberUnit::MacroDefine` upstream; a bare
                // occurrence here means the lexer group-based accumulation
                // failed to capture a body, which is a lex-level bug, not a
                // condition this layer can recover from.
                return Err(CamError::Format("AM start reached the interpreter unaccumulated".into()));
            }
            Statement::LoadPolarity(polarity) => self.level_polarity = *polarity,
            Statement::ImagePolarityStatement(polarity) => self.image_polarity = *polarity,
            Statement::StepAndRepeatOpen { nx, ny, dx, dy } => {
                self.frames.push(Frame::StepAndRepeat {
                    nx: (*nx).max(1),
                    ny: (*ny).max(1),
                    dx: *dx,
                    dy: *dy,
                    buffer: Vec::new(),
                });
            }
            Statement::StepAndRepeatClose => self.close_step_and_repeat(),
            Statement::ApertureBlockOpen(id) => {
                self.saved_points.push(self.current_point);
                self.current_point = Point::new(0.0, 0.0);
                self.frames.push(Frame::Block {
                    id: *id,
                    buffer: Vec::new(),
                });
            }
            Statement::ApertureBlockClose => self.close_aperture_block(),
            Statement::FileAttribute { name, values } => {
                self.file_attributes.push((name.clone(), values.join(",")));
            }
            Statement::ApertureAttribute { name, values } | Statement::ObjectAttribute { name, values } => {
                self.pending_attributes.push((name.clone(), values.join(",")));
            }
            Statement::DeleteAttribute(name) => match name {
                Some(name) => self.pending_attributes.retain(|(n, _)| n != name),
                None => self.pending_attributes.clear(),
            },
            Statement::SetInterpolation(mode) => self.interpolation = *mode,
            Statement::ArcMode(mode) => self.quadrant_mode = *mode,
            Statement::RegionOpen => {
                self.region_open = true;
                self.region_contour.clear();
            }
            Statement::RegionClose => self.close_region(),
            Statement::SelectAperture(id) => self.current_aperture = Some(*id),
            Statement::Operate { coordinates, code } => self.operate(coordinates, *code)?,
            Statement::LegacyUnits(units) => {
                self.note(NoteKind::LegacyCode, "G70/G71 legacy unit selection");
                self.units = Some(*units);
                if let Some(format) = self.format.as_mut() {
                    format.units = *units;
                }
            }
            Statement::LegacyNotation(notation) => {
                self.note(NoteKind::LegacyCode, "G90/G91 legacy notation selection");
                if let Some(format) = self.format.as_mut() {
                    format.notation = *notation;
                }
            }
            Statement::LegacyCode(code) => {
                self.note(NoteKind::LegacyCode, code.to_string());
            }
            Statement::EndOfFile => return Ok(true),
            Statement::OptionalStop => {
                self.note(NoteKind::LegacyCode, "M00/M01 optional stop tolerated");
            }
            Statement::Unknown(text) => {
                self.note(NoteKind::UnknownCommand, text.to_string());
            }
        }
        Ok(false)
    }

    fn build_aperture(&mut self, id: ApertureId, spec: &ApertureShapeSpec) -> Result<Aperture, CamError> {
        let (shape, hole) = match spec {
            ApertureShapeSpec::Circle { diameter, hole } => (Shape::Circle { diameter: *diameter }, hole.clone()),
            ApertureShapeSpec::Rectangle { width, height, hole } => (
                Shape::Rectangle {
                    width: *width,
                    height: *height,
                },
                hole.clone(),
            ),
            ApertureShapeSpec::Obround { width, height, hole } => (
                Shape::Obround {
                    width: *width,
                    height: *height,
                },
                hole.clone(),
            ),
            ApertureShapeSpec::Polygon {
                diameter,
                vertices,
                rotation,
                hole,
            } => (
                Shape::Polygon {
                    diameter: *diameter,
                    vertices: *vertices,
                    rotation: *rotation,
                },
                hole.clone(),
            ),
            ApertureShapeSpec::MacroCall { name, args } => {
                let definition = self
                    .macros
                    .get(name)
                    .ok_or_else(|| CamError::Format(format!("undefined aperture macro {name:?}")))?;
                let primitives = macro_eval::expand(definition, args)?;
                (
                    Shape::Macro {
                        name: name.clone(),
                        args: args.clone(),
                        primitives,
                    },
                    None,
                )
            }
        };
        Ok(Aperture { id, shape, hole })
    }

    fn next_point(&mut self, coordinates: &RawCoordinates<'_>) -> Result<Point, CamError> {
        let format = match self.format_or_note() {
            Some(format) => format,
            None => return Err(CamError::Format("no coordinate format established".into())),
        };
        let x = coordinates.x.map(|s| decode_digits(s, &format)).transpose()?;
        let y = coordinates.y.map(|s| decode_digits(s, &format)).transpose()?;
        Ok(match format.notation {
            Notation::Absolute => Point::new(
                x.unwrap_or(self.current_point.x),
                y.unwrap_or(self.current_point.y),
            ),
            Notation::Incremental => Point::new(
                self.current_point.x + x.unwrap_or(0.0),
                self.current_point.y + y.unwrap_or(0.0),
            ),
        })
    }

    fn operate(&mut self, coordinates: &RawCoordinates<'_>, code: OpCode) -> Result<(), CamError> {
        let end = self.next_point(coordinates)?;
        match code {
            OpCode::Move => {
                if self.region_open && !self.region_contour.is_empty() {
                    self.close_region_contour();
                }
                self.current_point = end;
            }
            OpCode::Flash => {
                if self.region_open {
                    self.note(NoteKind::FlashInRegion, "D03 flash skipped inside open region");
                } else {
                    self.emit_flash(end);
                }
                self.current_point = end;
            }
            OpCode::Plot => {
                let start = self.current_point;
                let segment = self.plot_segment(start, end, coordinates)?;
                if self.region_open {
                    self.region_contour.push(segment);
                } else {
                    self.emit_plot_primitive(segment);
                }
                self.current_point = end;
            }
        }
        Ok(())
    }

    fn plot_segment(
        &mut self,
        start: Point,
        end: Point,
        coordinates: &RawCoordinates<'_>,
    ) -> Result<Segment, CamError> {
        match self.interpolation {
            Interpolation::Linear => Ok(Segment::Line { start, end }),
            Interpolation::ClockwiseCircular | Interpolation::CounterClockwiseCircular => {
                let format = self.format.expect("checked by next_point");
                let i = coordinates
                    .i
                    .map(|s| decode_digits(s, &format))
                    .transpose()?
                    .unwrap_or(0.0);
                let j = coordinates
                    .j
                    .map(|s| decode_digits(s, &format))
                    .transpose()?
                    .unwrap_or(0.0);
                let sweep = if self.interpolation == Interpolation::ClockwiseCircular {
                    SweepDirection::Clockwise
                } else {
                    SweepDirection::CounterClockwise
                };
                let quadrant = match self.quadrant_mode {
                    CmdQuadrantMode::Single => QuadrantMode::Single,
                    CmdQuadrantMode::Multi => QuadrantMode::Multi,
                };
                let center = match self.quadrant_mode {
                    CmdQuadrantMode::Multi => Point::new(start.x + i, start.y + j),
                    CmdQuadrantMode::Single => {
                        let tolerance = 10f64.powi(-(format.decimal_digits as i32 + 1));
                        match resolve_single_quadrant_center(start, end, i.abs(), j.abs(), sweep, tolerance) {
                            Some(center) => center,
                            None => {
                                self.note(
                                    NoteKind::AmbiguousArc,
                                    format!("no quadrant resolved a <=90deg sweep from {start:?} to {end:?}"),
                                );
                                start
                            }
                        }
                    }
                };
                Ok(Segment::Arc {
                    start,
                    end,
                    center,
                    sweep,
                    quadrant,
                })
            }
        }
    }

    fn emit_plot_primitive(&mut self, segment: Segment) {
        let aperture = self.current_aperture;
        let polarity = self.level_polarity;
        let attributes = self.take_attributes();
        let Some(aperture) = aperture else {
            self.note(NoteKind::UndefinedAperture, "draw with no aperture selected");
            return;
        };
        let primitive = match segment {
            Segment::Line { start, end } => Primitive::Line {
                start,
                end,
                aperture,
                polarity,
                attributes,
            },
            Segment::Arc {
                start,
                end,
                center,
                sweep,
                quadrant,
            } => Primitive::Arc {
                start,
                end,
                center,
                sweep,
                quadrant,
                aperture,
                polarity,
                attributes,
            },
        };
        self.emit(primitive);
    }

    fn emit_flash(&mut self, position: Point) {
        let polarity = self.level_polarity;
        let attributes = self.take_attributes();
        let Some(aperture_id) = self.current_aperture else {
            self.note(NoteKind::UndefinedAperture, "flash with no aperture selected");
            return;
        };
        let Some(aperture) = self.apertures.lookup(aperture_id).cloned() else {
            self.note(NoteKind::UndefinedAperture, format!("flash referenced undefined D{}", aperture_id.0));
            return;
        };
        if let Shape::Block { body } = aperture.shape {
            for child in &body {
                let translated = translate_primitive(child, position.x, position.y);
                self.emit(translated);
            }
        } else {
            self.emit(Primitive::Flash {
                position,
                aperture: aperture_id,
                polarity,
                attributes,
            });
        }
    }

    fn close_region_contour(&mut self) {
        if self.region_contour.is_empty() {
            return;
        }
        let contour = std::mem::take(&mut self.region_contour);
        let polarity = self.level_polarity;
        let attributes = self.take_attributes();
        self.emit(Primitive::Region {
            contour,
            polarity,
            attributes,
        });
    }

    fn close_region(&mut self) {
        self.close_region_contour();
        self.region_open = false;
    }

    fn close_aperture_block(&mut self) {
        match self.frames.pop() {
            Some(Frame::Block { id, buffer }) => {
                let aperture = Aperture {
                    id,
                    shape: Shape::Block { body: buffer },
                    hole: None,
                };
                if self.apertures.define(aperture).is_some() {
                    self.note(NoteKind::DuplicateAperture, format!("D{} redefined by AB", id.0));
                }
                if let Some(point) = self.saved_points.pop() {
                    self.current_point = point;
                }
            }
            Some(other) => self.frames.push(other),
            None => self.note(NoteKind::UnknownCommand, "AB close with no matching AB open"),
        }
    }

    fn close_step_and_repeat(&mut self) {
        match self.frames.pop() {
            Some(Frame::StepAndRepeat { nx, ny, dx, dy, buffer }) => {
                for iy in 0..ny {
                    for ix in 0..nx {
                        let (ox, oy) = (ix as f64 * dx, iy as f64 * dy);
                        for primitive in &buffer {
                            let translated = translate_primitive(primitive, ox, oy);
                            self.target().push(translated);
                        }
                    }
                }
            }
            Some(other) => self.frames.push(other),
            None => self.note(NoteKind::UnknownCommand, "SR close with no matching SR open"),
        }
    }
}

fn angle_degrees(center: Point, p: Point) -> f64 {
    (p.y - center.y).atan2(p.x - center.x).to_degrees()
}

fn normalize_degrees(mut a: f64) -> f64 {
    while a < 0.0 {
        a += 360.0;
    }
    while a >= 360.0 {
        a -= 360.0;
    }
    a
}

/// Try all four sign combinations of `(+-i_mag, +-j_mag)` around `start`,
/// returning the first candidate center equidistant (within `tolerance`)
/// from `start` and `end` whose sweep in `direction` is at most 90 degrees.
fn resolve_single_quadrant_center(
    start: Point,
    end: Point,
    i_mag: f64,
    j_mag: f64,
    direction: SweepDirection,
    tolerance: f64,
) -> Option<Point> {
    for (si, sj) in [(1.0, 1.0), (1.0, -1.0), (-1.0, 1.0), (-1.0, -1.0)] {
        let center = Point::new(start.x + si * i_mag, start.y + sj * j_mag);
        let r1 = ((start.x - center.x).powi(2) + (start.y - center.y).powi(2)).sqrt();
        let r2 = ((end.x - center.x).powi(2) + (end.y - center.y).powi(2)).sqrt();
        if (r1 - r2).abs() > tolerance {
            continue;
        }
        let a0 = angle_degrees(center, start);
        let a1 = angle_degrees(center, end);
        let sweep = match direction {
            SweepDirection::Clockwise => normalize_degrees(a0 - a1),
            SweepDirection::CounterClockwise => normalize_degrees(a1 - a0),
        };
        let sweep = if sweep == 0.0 { 360.0 } else { sweep };
        if sweep <= 90.0 + 1e-6 {
            return Some(center);
        }
    }
    None
}

fn translate_point(p: Point, dx: f64, dy: f64) -> Point {
    Point::new(p.x + dx, p.y + dy)
}

fn translate_primitive(primitive: &Primitive, dx: f64, dy: f64) -> Primitive {
    match primitive {
        Primitive::Line {
            start,
            end,
            aperture,
            polarity,
            attributes,
        } => Primitive::Line {
            start: translate_point(*start, dx, dy),
            end: translate_point(*end, dx, dy),
            aperture: *aperture,
            polarity: *polarity,
            attributes: attributes.clone(),
        },
        Primitive::Arc {
            start,
            end,
            center,
            sweep,
            quadrant,
            aperture,
            polarity,
            attributes,
        } => Primitive::Arc {
            start: translate_point(*start, dx, dy),
            end: translate_point(*end, dx, dy),
            center: translate_point(*center, dx, dy),
            sweep: *sweep,
            quadrant: *quadrant,
            aperture: *aperture,
            polarity: *polarity,
            attributes: attributes.clone(),
        },
        Primitive::Flash {
            position,
            aperture,
            polarity,
            attributes,
        } => Primitive::Flash {
            position: translate_point(*position, dx, dy),
            aperture: *aperture,
            polarity: *polarity,
            attributes: attributes.clone(),
        },
        Primitive::Region {
            contour,
            polarity,
            attributes,
        } => Primitive::Region {
            contour: contour
                .iter()
                .map(|segment| match segment {
                    Segment::Line { start, end } => Segment::Line {
                        start: translate_point(*start, dx, dy),
                        end: translate_point(*end, dx, dy),
                    },
                    Segment::Arc {
                        start,
                        end,
                        center,
                        sweep,
                        quadrant,
                    } => Segment::Arc {
                        start: translate_point(*start, dx, dy),
                        end: translate_point(*end, dx, dy),
                        center: translate_point(*center, dx, dy),
                        sweep: *sweep,
                        quadrant: *quadrant,
                    },
                })
                .collect(),
            polarity: *polarity,
            attributes: attributes.clone(),
        },
        Primitive::Drill { position, tool } => Primitive::Drill {
            position: translate_point(*position, dx, dy),
            tool: *tool,
        },
        Primitive::Slot { start, end, tool } => Primitive::Slot {
            start: translate_point(*start, dx, dy),
            end: translate_point(*end, dx, dy),
            tool: *tool,
        },
    }
}

/// Walk `units`, producing the ordered primitive list and accumulated
/// apertures/attributes/notes. Only returns `Err` for conditions spec.md
/// treats as fatal (a malformed macro, coordinates before any `FS`); every
/// other irregularity becomes a [`Note`] and interpretation continues.
pub fn interpret(units: &[GerberUnit<'_>]) -> Result<GerberOutput, CamError> {
    let mut interpreter = Interpreter::new();
    interpreter.run(units)?;
    Ok(GerberOutput {
        primitives: interpreter.root,
        apertures: interpreter.apertures,
        file_attributes: interpreter.file_attributes,
        notes: interpreter.notes,
        format: interpreter.format,
        image_polarity: interpreter.image_polarity,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gerber::parse;

    fn run(src: &str) -> GerberOutput {
        let units = parse(src).unwrap();
        interpret(&units).unwrap()
    }

    #[test]
    fn minimal_flash() {
        let output = run("%FSLAX24Y24*%\n%MOMM*%\n%ADD10C,0.5*%\nD10*\nX1000000Y2000000D03*\nM02*\n");
        assert_eq!(output.primitives.len(), 1);
        match &output.primitives[0] {
            Primitive::Flash { position, aperture, .. } => {
                assert_eq!(*aperture, ApertureId(10));
                assert!((position.x - 100.0).abs() < 1e-9);
                assert!((position.y - 200.0).abs() < 1e-9);
            }
            other => panic!("expected Flash, got {other:?}"),
        }
    }

    #[test]
    fn linear_draw() {
        let output = run(
            "%FSLAX24Y24*%\n%MOMM*%\n%ADD10C,0.2*%\nD10*\nX0Y0D02*\nX1000000Y0D01*\nM02*\n",
        );
        assert_eq!(output.primitives.len(), 1);
        assert!(matches!(output.primitives[0], Primitive::Line { .. }));
    }

    #[test]
    fn region_closes_into_primitive() {
        let output = run(concat!(
            "%FSLAX24Y24*%\n%MOMM*%\n%ADD10C,0.1*%\nD10*\nG36*\n",
            "X0Y0D02*\nX1000000Y0D01*\nX1000000Y1000000D01*\nX0Y0D01*\nG37*\nM02*\n"
        ));
        assert_eq!(output.primitives.len(), 1);
        match &output.primitives[0] {
            Primitive::Region { contour, .. } => assert_eq!(contour.len(), 3),
            other => panic!("expected Region, got {other:?}"),
        }
    }

    #[test]
    fn duplicate_format_specification_is_fatal() {
        let units = parse("%FSLAX24Y24*%\n%MOMM*%\n%FSLAX23Y23*%\nM02*\n").unwrap();
        assert!(interpret(&units).is_err());
    }

    #[test]
    fn undefined_aperture_flash_is_noted_and_dropped() {
        let output = run("%FSLAX24Y24*%\n%MOMM*%\nD99*\nX0Y0D03*\nM02*\n");
        assert!(output.primitives.is_empty());
        assert!(output.notes.iter().any(|n| n.kind == NoteKind::UndefinedAperture));
    }

    #[test]
    fn flash_inside_region_is_noted_and_dropped() {
        let output = run(concat!(
            "%FSLAX24Y24*%\n%MOMM*%\n%ADD10C,0.1*%\nD10*\nG36*\n",
            "X0Y0D02*\nX0Y0D03*\nX1000000Y0D01*\nX0Y0D01*\nG37*\nM02*\n"
        ));
        assert!(output.notes.iter().any(|n| n.kind == NoteKind::FlashInRegion));
    }

    #[test]
    fn step_and_repeat_materializes_grid() {
        let output = run(concat!(
            "%FSLAX24Y24*%\n%MOMM*%\n%ADD10C,0.1*%\nD10*\n",
            "%SRX2Y2I1.0J1.0*%\nX0Y0D03*\n%SR*%\nM02*\n"
        ));
        assert_eq!(output.primitives.len(), 4);
    }

    #[test]
    fn aperture_block_flash_expands_body() {
        let output = run(concat!(
            "%FSLAX24Y24*%\n%MOMM*%\n%ADD10C,0.1*%\n",
            "%ABD20*%\nD10*\nX0Y0D03*\nX500000Y0D03*\n%AB*%\n",
            "D20*\nX1000000Y1000000D03*\nM02*\n"
        ));
        assert_eq!(output.primitives.len(), 2);
        match &output.primitives[0] {
            Primitive::Flash { position, .. } => {
                assert!((position.x - 100.0).abs() < 1e-9);
                assert!((position.y - 100.0).abs() < 1e-9);
            }
            other => panic!("expected Flash, got {other:?}"),
        }
    }

    #[test]
    fn single_quadrant_arc_resolves_center() {
        // Quarter circle from (1,0) to (0,1) around origin, CCW, radius 1.
        // G74 (single quadrant): I/J are unsigned magnitudes, so the
        // interpreter must try all four sign combinations to find the
        // center that makes this a <=90 degree sweep.
        let output = run(concat!(
            "%FSLAX24Y24*%\n%MOMM*%\n%ADD10C,0.1*%\nD10*\nG74*\nG03*\n",
            "X1000000Y0D02*\nX0Y1000000I1000000J0D01*\nM02*\n"
        ));
        assert_eq!(output.primitives.len(), 1);
        match &output.primitives[0] {
            Primitive::Arc { center, .. } => {
                assert!(center.x.abs() < 1e-6);
                assert!(center.y.abs() < 1e-6);
            }
            other => panic!("expected Arc, got {other:?}"),
        }
    }
}
