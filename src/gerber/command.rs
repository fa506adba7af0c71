//! Per-block statement grammar (the second half of component C1, and the
//! context-free part of C2): turns one lexed [`DataBlock`] of text into a
//! typed [`Statement`]. No [`crate::gerber::interpreter::GraphicsState`] is
//! consulted here — that's the interpreter's job.

use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::{char, digit1, one_of},
    combinator::{map, map_res, opt, recognize, value},
    multi::{many0, separated_list1},
    sequence::{delimited, pair, preceded, tuple},
};

use crate::aperture::{ApertureId, Hole};
use crate::data::{aperture_identifier, decimal, name};
use crate::gerber::attribute::{attribute_name, FileAttributeName};
use crate::number::{Notation, Units, ZeroSuppression};
use crate::primitive::Polarity;
use crate::IResult;

/// A parsed but not-yet-interpreted aperture shape, as written by `AD`.
/// Standard shapes carry their raw parameters; a macro call is resolved
/// against the macro table by the interpreter.
#[derive(Debug, Clone, PartialEq)]
pub enum ApertureShapeSpec {
    Circle {
        diameter: f64,
        hole: Option<Hole>,
    },
    Rectangle {
        width: f64,
        height: f64,
        hole: Option<Hole>,
    },
    Obround {
        width: f64,
        height: f64,
        hole: Option<Hole>,
    },
    Polygon {
        diameter: f64,
        vertices: u32,
        rotation: f64,
        hole: Option<Hole>,
    },
    MacroCall {
        name: String,
        args: Vec<f64>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interpolation {
    Linear,
    ClockwiseCircular,
    CounterClockwiseCircular,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuadrantMode {
    Single,
    Multi,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImagePolarity {
    Positive,
    Negative,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpCode {
    Plot,
    Move,
    Flash,
}

/// Raw (not yet format-decoded) coordinate fields from an operation block.
/// Decoding needs the current [`crate::number::CoordinateFormat`], which
/// only the interpreter has, so these stay as digit-string slices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RawCoordinates<'a> {
    pub x: Option<&'a str>,
    pub y: Option<&'a str>,
    pub i: Option<&'a str>,
    pub j: Option<&'a str>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement<'a> {
    Comment(&'a str),
    FormatSpecification {
        x: (u8, u8),
        y: (u8, u8),
        zero_suppression: ZeroSuppression,
        notation: Notation,
    },
    UnitMode(Units),
    ApertureDefine {
        id: ApertureId,
        shape: ApertureShapeSpec,
    },
    /// The opening block of an `AM` section; the body statements that
    /// follow in the same lexer group are handled separately (see
    /// [`crate::gerber`]'s `parse`), since their grammar is
    /// [`crate::macro_eval`]'s, not this module's.
    ApertureMacroStart(&'a str),
    LoadPolarity(Polarity),
    ImagePolarityStatement(ImagePolarity),
    StepAndRepeatOpen {
        nx: i32,
        ny: i32,
        dx: f64,
        dy: f64,
    },
    StepAndRepeatClose,
    ApertureBlockOpen(ApertureId),
    ApertureBlockClose,
    FileAttribute {
        name: String,
        values: Vec<String>,
    },
    ApertureAttribute {
        name: String,
        values: Vec<String>,
    },
    ObjectAttribute {
        name: String,
        values: Vec<String>,
    },
    DeleteAttribute(Option<String>),
    SetInterpolation(Interpolation),
    ArcMode(QuadrantMode),
    RegionOpen,
    RegionClose,
    SelectAperture(ApertureId),
    Operate {
        coordinates: RawCoordinates<'a>,
        code: OpCode,
    },
    LegacyUnits(Units),
    LegacyNotation(Notation),
    LegacyCode(&'a str),
    EndOfFile,
    OptionalStop,
    Unknown(&'a str),
}

fn decimal_list(input: &str) -> IResult<Vec<f64>> {
    separated_list1(char('X'), decimal)(input)
}

fn digit_pair(input: &str) -> IResult<u8> {
    map_res(
        nom::character::complete::satisfy(|c| c.is_ascii_digit()),
        |c: char| c.to_digit(10).map(|d| d as u8).ok_or(()),
    )(input)
}

pub(crate) fn comment(input: &str) -> IResult<Statement> {
    map(preceded(tag("G04"), recognize(many0(nom::character::complete::anychar))), |s: &str| {
        Statement::Comment(s.strip_prefix(' ').unwrap_or(s))
    })(input)
}

fn unit_mode(input: &str) -> IResult<Statement> {
    map(
        preceded(tag("MO"), alt((value(Units::Millimeters, tag("MM")), value(Units::Inches, tag("IN"))))),
        Statement::UnitMode,
    )(input)
}

fn format_specification(input: &str) -> IResult<Statement> {
    map(
        preceded(
            tag("FS"),
            tuple((
                one_of("LT"),
                one_of("AI"),
                preceded(char('X'), pair(digit_pair, digit_pair)),
                preceded(char('Y'), pair(digit_pair, digit_pair)),
            )),
        ),
        |(zs, notation, x, y)| Statement::FormatSpecification {
            x,
            y,
            zero_suppression: if zs == 'L' {
                ZeroSuppression::Leading
            } else {
                ZeroSuppression::Trailing
            },
            notation: if notation == 'A' {
                Notation::Absolute
            } else {
                Notation::Incremental
            },
        },
    )(input)
}

fn hole_from_tail(tail: &[f64]) -> Option<Hole> {
    match tail {
        [] => None,
        [d] => Some(Hole::Round { diameter: *d }),
        [w, h, ..] => Some(Hole::Rectangle {
            width: *w,
            height: *h,
        }),
    }
}

fn aperture_shape_standard(input: &str) -> IResult<ApertureShapeSpec> {
    alt((
        map(preceded(tag("C,"), decimal_list), |params| {
            ApertureShapeSpec::Circle {
                diameter: params[0],
                hole: hole_from_tail(&params[1..]),
            }
        }),
        map(preceded(tag("R,"), decimal_list), |params| {
            ApertureShapeSpec::Rectangle {
                width: params[0],
                height: params[1],
                hole: hole_from_tail(&params[2..]),
            }
        }),
        map(preceded(tag("O,"), decimal_list), |params| {
            ApertureShapeSpec::Obround {
                width: params[0],
                height: params[1],
                hole: hole_from_tail(&params[2..]),
            }
        }),
        map(preceded(tag("P,"), decimal_list), |params| {
            ApertureShapeSpec::Polygon {
                diameter: params[0],
                vertices: params[1].round() as u32,
                rotation: params.get(2).copied().unwrap_or(0.0),
                hole: hole_from_tail(if params.len() > 3 { &params[3..] } else { &[] }),
            }
        }),
    ))(input)
}

fn aperture_shape_macro(input: &str) -> IResult<ApertureShapeSpec> {
    map(
        pair(name, opt(preceded(char(','), decimal_list))),
        |(macro_name, args)| ApertureShapeSpec::MacroCall {
            name: macro_name.to_string(),
            args: args.unwrap_or_default(),
        },
    )(input)
}

fn aperture_define(input: &str) -> IResult<Statement> {
    map(
        preceded(
            tag("AD"),
            pair(
                aperture_identifier,
                alt((aperture_shape_standard, aperture_shape_macro)),
            ),
        ),
        |(id, shape)| Statement::ApertureDefine { id, shape },
    )(input)
}

fn aperture_macro_start(input: &str) -> IResult<Statement> {
    map(preceded(tag("AM"), name), Statement::ApertureMacroStart)(input)
}

fn load_polarity(input: &str) -> IResult<Statement> {
    map(
        preceded(tag("LP"), alt((value(Polarity::Dark, char('D')), value(Polarity::Clear, char('C'))))),
        Statement::LoadPolarity,
    )(input)
}

fn image_polarity(input: &str) -> IResult<Statement> {
    map(
        preceded(
            tag("IP"),
            alt((
                value(ImagePolarity::Positive, tag("POS")),
                value(ImagePolarity::Negative, tag("NEG")),
            )),
        ),
        Statement::ImagePolarityStatement,
    )(input)
}

fn signed_int(input: &str) -> IResult<i32> {
    map_res(recognize(pair(opt(one_of("+-")), digit1)), |s: &str| s.parse())(input)
}

fn step_and_repeat(input: &str) -> IResult<Statement> {
    alt((
        map(
            preceded(
                tag("SR"),
                tuple((
                    preceded(char('X'), signed_int),
                    preceded(char('Y'), signed_int),
                    preceded(char('I'), decimal),
                    preceded(char('J'), decimal),
                )),
            ),
            |(nx, ny, dx, dy)| Statement::StepAndRepeatOpen { nx, ny, dx, dy },
        ),
        value(Statement::StepAndRepeatClose, tag("SR")),
    ))(input)
}

fn aperture_block(input: &str) -> IResult<Statement> {
    alt((
        map(preceded(tag("AB"), aperture_identifier), Statement::ApertureBlockOpen),
        value(Statement::ApertureBlockClose, tag("AB")),
    ))(input)
}

fn attribute_field(input: &str) -> IResult<&str> {
    recognize(many0(nom::character::complete::none_of(",*")))(input)
}

fn attribute_values(input: &str) -> IResult<Vec<String>> {
    map(many0(preceded(char(','), attribute_field)), |fields| {
        fields.into_iter().map(str::to_string).collect()
    })(input)
}

fn file_attribute(input: &str) -> IResult<Statement> {
    map(
        preceded(tag("TF"), pair(FileAttributeName::parse, attribute_values)),
        |(name, values)| Statement::FileAttribute {
            name: name.to_string(),
            values,
        },
    )(input)
}

fn aperture_attribute(input: &str) -> IResult<Statement> {
    map(
        preceded(tag("TA"), pair(attribute_name, attribute_values)),
        |(name, values)| Statement::ApertureAttribute {
            name: name.to_string(),
            values,
        },
    )(input)
}

fn object_attribute(input: &str) -> IResult<Statement> {
    map(
        preceded(tag("TO"), pair(attribute_name, attribute_values)),
        |(name, values)| Statement::ObjectAttribute {
            name: name.to_string(),
            values,
        },
    )(input)
}

fn delete_attribute(input: &str) -> IResult<Statement> {
    map(
        preceded(tag("TD"), opt(attribute_name)),
        |name| Statement::DeleteAttribute(name.map(str::to_string)),
    )(input)
}

fn set_interpolation(input: &str) -> IResult<Statement> {
    map(
        alt((
            value(Interpolation::Linear, tag("G01")),
            value(Interpolation::ClockwiseCircular, tag("G02")),
            value(Interpolation::CounterClockwiseCircular, tag("G03")),
        )),
        Statement::SetInterpolation,
    )(input)
}

fn arc_mode(input: &str) -> IResult<Statement> {
    map(
        alt((
            value(QuadrantMode::Single, tag("G74")),
            value(QuadrantMode::Multi, tag("G75")),
        )),
        Statement::ArcMode,
    )(input)
}

fn region(input: &str) -> IResult<Statement> {
    alt((
        value(Statement::RegionOpen, tag("G36")),
        value(Statement::RegionClose, tag("G37")),
    ))(input)
}

fn legacy_units(input: &str) -> IResult<Statement> {
    map(
        alt((value(Units::Inches, tag("G70")), value(Units::Millimeters, tag("G71")))),
        Statement::LegacyUnits,
    )(input)
}

fn legacy_notation(input: &str) -> IResult<Statement> {
    map(
        alt((value(Notation::Absolute, tag("G90")), value(Notation::Incremental, tag("G91")))),
        Statement::LegacyNotation,
    )(input)
}

fn legacy_code(input: &str) -> IResult<Statement> {
    map(recognize(alt((tag("G54"), tag("G55")))), Statement::LegacyCode)(input)
}

fn select_aperture(input: &str) -> IResult<Statement> {
    map(aperture_identifier, Statement::SelectAperture)(input)
}

fn coordinate_field<'a>(axis: char) -> impl FnMut(&'a str) -> IResult<'a, &'a str> {
    move |input| preceded(char(axis), recognize(pair(opt(one_of("+-")), digit1)))(input)
}

fn operation(input: &str) -> IResult<Statement> {
    map(
        tuple((
            opt(coordinate_field('X')),
            opt(coordinate_field('Y')),
            opt(coordinate_field('I')),
            opt(coordinate_field('J')),
            alt((
                value(OpCode::Plot, tag("D01")),
                value(OpCode::Move, tag("D02")),
                value(OpCode::Flash, tag("D03")),
            )),
        )),
        |(x, y, i, j, code)| Statement::Operate {
            coordinates: RawCoordinates { x, y, i, j },
            code,
        },
    )(input)
}

fn end_of_file(input: &str) -> IResult<Statement> {
    value(Statement::EndOfFile, tag("M02"))(input)
}

fn optional_stop(input: &str) -> IResult<Statement> {
    value(Statement::OptionalStop, alt((tag("M00"), tag("M01"))))(input)
}

/// Parse one non-parameter (word command) block's text into a [`Statement`].
pub fn parse_word(input: &str) -> Statement {
    // legacy G54/G55 may prefix an aperture select in the same block
    let input = input
        .strip_prefix("G54")
        .or_else(|| input.strip_prefix("G55"))
        .unwrap_or(input);
    let result: IResult<Statement> = alt((
        comment,
        set_interpolation,
        arc_mode,
        region,
        legacy_units,
        legacy_notation,
        legacy_code,
        operation,
        select_aperture,
        end_of_file,
        optional_stop,
    ))(input);
    match result {
        Ok((rest, statement)) if rest.is_empty() => statement,
        _ => Statement::Unknown(input),
    }
}

/// Parse one parameter-section (`%...%`) block's text into a [`Statement`].
pub fn parse_parameter(input: &str) -> Statement {
    let result: IResult<Statement> = alt((
        format_specification,
        unit_mode,
        aperture_define,
        aperture_macro_start,
        load_polarity,
        image_polarity,
        step_and_repeat,
        aperture_block,
        file_attribute,
        aperture_attribute,
        object_attribute,
        delete_attribute,
    ))(input);
    match result {
        Ok((rest, statement)) if rest.is_empty() => statement,
        _ => Statement::Unknown(input),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_format_specification() {
        assert_eq!(
            parse_parameter("FSLAX24Y24"),
            Statement::FormatSpecification {
                x: (2, 4),
                y: (2, 4),
                zero_suppression: ZeroSuppression::Leading,
                notation: Notation::Absolute,
            }
        );
    }

    #[test]
    fn parses_unit_mode() {
        assert_eq!(parse_parameter("MOMM"), Statement::UnitMode(Units::Millimeters));
        assert_eq!(parse_parameter("MOIN"), Statement::UnitMode(Units::Inches));
    }

    #[test]
    fn parses_circle_aperture() {
        assert_eq!(
            parse_parameter("ADD10C,0.5"),
            Statement::ApertureDefine {
                id: ApertureId(10),
                shape: ApertureShapeSpec::Circle {
                    diameter: 0.5,
                    hole: None
                },
            }
        );
    }

    #[test]
    fn parses_rectangle_with_round_hole() {
        assert_eq!(
            parse_parameter("ADD11R,1.5X1.0X0.2"),
            Statement::ApertureDefine {
                id: ApertureId(11),
                shape: ApertureShapeSpec::Rectangle {
                    width: 1.5,
                    height: 1.0,
                    hole: Some(Hole::Round { diameter: 0.2 }),
                },
            }
        );
    }

    #[test]
    fn parses_macro_aperture_call() {
        assert_eq!(
            parse_parameter("ADD12Donut,0.3X0X0"),
            Statement::ApertureDefine {
                id: ApertureId(12),
                shape: ApertureShapeSpec::MacroCall {
                    name: "Donut".to_string(),
                    args: vec![0.3, 0.0, 0.0],
                },
            }
        );
    }

    #[test]
    fn parses_operation_with_all_fields() {
        assert_eq!(
            parse_word("X2000000Y0I1000000J0D01"),
            Statement::Operate {
                coordinates: RawCoordinates {
                    x: Some("2000000"),
                    y: Some("0"),
                    i: Some("1000000"),
                    j: Some("0"),
                },
                code: OpCode::Plot,
            }
        );
    }

    #[test]
    fn parses_move_without_all_axes() {
        assert_eq!(
            parse_word("Y0D02"),
            Statement::Operate {
                coordinates: RawCoordinates {
                    x: None,
                    y: Some("0"),
                    i: None,
                    j: None,
                },
                code: OpCode::Move,
            }
        );
    }

    #[test]
    fn parses_select_aperture() {
        assert_eq!(parse_word("D10"), Statement::SelectAperture(ApertureId(10)));
    }

    #[test]
    fn parses_comment() {
        assert_eq!(parse_word("G04 hello"), Statement::Comment("hello"));
    }

    #[test]
    fn parses_end_of_file() {
        assert_eq!(parse_word("M02"), Statement::EndOfFile);
    }

    #[test]
    fn unknown_word_falls_back() {
        assert_eq!(parse_word("G99"), Statement::Unknown("G99"));
    }

    #[test]
    fn legacy_prefixed_select_aperture() {
        assert_eq!(parse_word("G54D11"), Statement::SelectAperture(ApertureId(11)));
    }

    #[test]
    fn parses_file_attribute() {
        assert_eq!(
            parse_parameter("TF.Part,Single"),
            Statement::FileAttribute {
                name: ".Part".to_string(),
                values: vec!["Single".to_string()],
            }
        );
    }
}
