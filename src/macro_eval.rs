//! Aperture macro expression AST and evaluator (component C4).
//!
//! An `AM` body is a sequence of `*`-terminated statements: arithmetic
//! variable assignments (`$4=$1x0.75`) and macro-primitive lines
//! (`1,1,$1,$2,$3`). Call-site arguments from `AD<d><name>,a1Xa2Xa3…` bind
//! to `$1..$k` before evaluation. Evaluation is pure: the same
//! `(definition, args)` pair always yields the same primitive list.

use nom::{
    branch::alt,
    character::complete::{char, one_of, space0},
    combinator::map,
    multi::many0,
    sequence::{delimited, pair, preceded},
};
use std::collections::HashMap;

use crate::data::decimal;
use crate::error::CamError;
use crate::IResult;

/// A minimal arithmetic expression: literals, `$n` parameter references,
/// and `+ - x /` with conventional precedence, left-to-right associativity,
/// and unary minus.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(f64),
    Var(u32),
    Neg(Box<Expr>),
    Add(Box<Expr>, Box<Expr>),
    Sub(Box<Expr>, Box<Expr>),
    Mul(Box<Expr>, Box<Expr>),
    Div(Box<Expr>, Box<Expr>),
}

impl Expr {
    /// `params[0]` is `$1`; a reference past the end or to `$0` evaluates
    /// to zero (mirrors how unreferenced parameters are simply never read,
    /// per spec.md §3's macro parameter invariant).
    pub fn eval(&self, params: &HashMap<u32, f64>) -> f64 {
        match self {
            Expr::Literal(v) => *v,
            Expr::Var(n) => params.get(n).copied().unwrap_or(0.0),
            Expr::Neg(e) => -e.eval(params),
            Expr::Add(a, b) => a.eval(params) + b.eval(params),
            Expr::Sub(a, b) => a.eval(params) - b.eval(params),
            Expr::Mul(a, b) => a.eval(params) * b.eval(params),
            Expr::Div(a, b) => a.eval(params) / b.eval(params),
        }
    }
}

fn variable(input: &str) -> IResult<Expr> {
    map(preceded(char('$'), crate::data::unsigned_integer), |n: i32| {
        Expr::Var(n as u32)
    })(input)
}

fn literal(input: &str) -> IResult<Expr> {
    map(decimal, Expr::Literal)(input)
}

fn atom(input: &str) -> IResult<Expr> {
    delimited(
        space0,
        alt((
            delimited(char('('), expr, char(')')),
            map(preceded(char('-'), atom_no_space), |e| Expr::Neg(Box::new(e))),
            variable,
            literal,
        )),
        space0,
    )(input)
}

// Like `atom`, but without surrounding space0 so `-(expr)` and `-$1`
// compose cleanly inside the unary-minus branch above.
fn atom_no_space(input: &str) -> IResult<Expr> {
    alt((delimited(char('('), expr, char(')')), variable, literal))(input)
}

fn term(input: &str) -> IResult<Expr> {
    let (input, first) = atom(input)?;
    let (input, rest) = many0(pair(one_of("xX/"), atom))(input)?;
    Ok((
        input,
        rest.into_iter().fold(first, |acc, (op, rhs)| match op {
            'x' | 'X' => Expr::Mul(Box::new(acc), Box::new(rhs)),
            _ => Expr::Div(Box::new(acc), Box::new(rhs)),
        }),
    ))
}

fn expr(input: &str) -> IResult<Expr> {
    let (input, first) = term(input)?;
    let (input, rest) = many0(pair(one_of("+-"), term))(input)?;
    Ok((
        input,
        rest.into_iter().fold(first, |acc, (op, rhs)| match op {
            '+' => Expr::Add(Box::new(acc), Box::new(rhs)),
            _ => Expr::Sub(Box::new(acc), Box::new(rhs)),
        }),
    ))
}

/// Parse a single arithmetic expression field (no surrounding `*`).
pub fn parse_expr(input: &str) -> Result<Expr, CamError> {
    nom::combinator::all_consuming(expr)(input.trim())
        .map(|(_, e)| e)
        .map_err(|_| CamError::Format(format!("invalid macro expression: {input:?}")))
}

/// One statement inside an `AM` body.
#[derive(Debug, Clone, PartialEq)]
pub enum MacroStatement {
    Assignment { var: u32, expr: Expr },
    Primitive(MacroPrimitiveTemplate),
}

/// A macro-primitive line, still in template form (fields unevaluated).
#[derive(Debug, Clone, PartialEq)]
pub enum MacroPrimitiveTemplate {
    Comment,
    Circle {
        exposure: Expr,
        diameter: Expr,
        center: (Expr, Expr),
        rotation: Option<Expr>,
    },
    VectorLine {
        exposure: Expr,
        width: Expr,
        start: (Expr, Expr),
        end: (Expr, Expr),
        rotation: Expr,
    },
    CenterLine {
        exposure: Expr,
        width: Expr,
        height: Expr,
        center: (Expr, Expr),
        rotation: Expr,
    },
    Outline {
        exposure: Expr,
        points: Vec<(Expr, Expr)>,
        rotation: Expr,
    },
    Polygon {
        exposure: Expr,
        vertices: Expr,
        center: (Expr, Expr),
        diameter: Expr,
        rotation: Expr,
    },
    Moire {
        center: (Expr, Expr),
        outer_diameter: Expr,
        ring_thickness: Expr,
        gap: Expr,
        max_rings: Expr,
        crosshair_thickness: Expr,
        crosshair_length: Expr,
        rotation: Expr,
    },
    Thermal {
        center: (Expr, Expr),
        outer_diameter: Expr,
        inner_diameter: Expr,
        gap: Expr,
        rotation: Expr,
    },
}

/// A macro definition: name plus the ordered statement list from its `AM`
/// body. Parameter arity is implied by the highest `$n` any statement
/// references; this is not precomputed since callers can over-supply
/// arguments harmlessly (unreferenced parameters are permitted).
#[derive(Debug, Clone, PartialEq)]
pub struct MacroDefinition {
    pub name: String,
    pub body: Vec<MacroStatement>,
}

/// Exposure flag: `1` = add (dark relative to current polarity), `0` = subtract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exposure {
    Add,
    Subtract,
}

fn exposure_from(v: f64) -> Exposure {
    if v == 0.0 {
        Exposure::Subtract
    } else {
        Exposure::Add
    }
}

/// A macro primitive after evaluation against call-site parameters:
/// concrete geometry, ready for the aperture dictionary or a Flash.
#[derive(Debug, Clone, PartialEq)]
pub enum MacroPrimitive {
    Circle {
        exposure: Exposure,
        diameter: f64,
        center: (f64, f64),
        rotation: f64,
    },
    VectorLine {
        exposure: Exposure,
        width: f64,
        start: (f64, f64),
        end: (f64, f64),
        rotation: f64,
    },
    CenterLine {
        exposure: Exposure,
        width: f64,
        height: f64,
        center: (f64, f64),
        rotation: f64,
    },
    Outline {
        exposure: Exposure,
        points: Vec<(f64, f64)>,
        rotation: f64,
    },
    Polygon {
        exposure: Exposure,
        vertices: u32,
        center: (f64, f64),
        diameter: f64,
        rotation: f64,
    },
    Moire {
        center: (f64, f64),
        outer_diameter: f64,
        ring_thickness: f64,
        gap: f64,
        max_rings: u32,
        crosshair_thickness: f64,
        crosshair_length: f64,
        rotation: f64,
    },
    Thermal {
        center: (f64, f64),
        outer_diameter: f64,
        inner_diameter: f64,
        gap: f64,
        rotation: f64,
    },
}

/// Parse one `*`-terminated statement from an `AM` body (the `*` itself
/// already stripped by the block reader).
pub fn parse_statement(text: &str) -> Result<MacroStatement, CamError> {
    let text = text.trim();
    if let Some((var, rhs)) = parse_assignment_prefix(text) {
        return Ok(MacroStatement::Assignment {
            var,
            expr: parse_expr(rhs)?,
        });
    }
    parse_primitive(text).map(MacroStatement::Primitive)
}

fn parse_assignment_prefix(text: &str) -> Option<(u32, &str)> {
    fn assignment(input: &str) -> IResult<u32> {
        map(
            delimited(
                char('$'),
                crate::data::unsigned_integer,
                preceded(space0, char('=')),
            ),
            |n| n as u32,
        )(input)
    }
    assignment(text).ok().map(|(rest, var)| (var, rest))
}

fn fields(text: &str) -> Vec<&str> {
    text.split(',').map(str::trim).collect()
}

fn parse_primitive(text: &str) -> Result<MacroPrimitiveTemplate, CamError> {
    let parts = fields(text);
    let code: i32 = parts[0]
        .parse()
        .map_err(|_| CamError::Format(format!("bad macro primitive code: {text:?}")))?;
    let e = |s: &str| parse_expr(s);
    match code {
        0 => Ok(MacroPrimitiveTemplate::Comment),
        1 => {
            if parts.len() < 5 {
                return Err(bad_arity(text));
            }
            Ok(MacroPrimitiveTemplate::Circle {
                exposure: e(parts[1])?,
                diameter: e(parts[2])?,
                center: (e(parts[3])?, e(parts[4])?),
                rotation: parts.get(5).map(|s| e(s)).transpose()?,
            })
        }
        20 => {
            if parts.len() < 8 {
                return Err(bad_arity(text));
            }
            Ok(MacroPrimitiveTemplate::VectorLine {
                exposure: e(parts[1])?,
                width: e(parts[2])?,
                start: (e(parts[3])?, e(parts[4])?),
                end: (e(parts[5])?, e(parts[6])?),
                rotation: e(parts[7])?,
            })
        }
        21 => {
            if parts.len() < 7 {
                return Err(bad_arity(text));
            }
            Ok(MacroPrimitiveTemplate::CenterLine {
                exposure: e(parts[1])?,
                width: e(parts[2])?,
                height: e(parts[3])?,
                center: (e(parts[4])?, e(parts[5])?),
                rotation: e(parts[6])?,
            })
        }
        4 => {
            if parts.len() < 3 {
                return Err(bad_arity(text));
            }
            // parts[2] is the declared point count, redundant with the
            // number of coordinate pairs actually present; trust the pairs.
            let rotation = e(parts.last().ok_or_else(|| bad_arity(text))?)?;
            // Vertex coordinates run from index 3 up to (but not including)
            // the trailing rotation field, in (x, y) pairs.
            let coord_fields = &parts[3..parts.len() - 1];
            if coord_fields.is_empty() || coord_fields.len() % 2 != 0 {
                return Err(bad_arity(text));
            }
            let mut points = Vec::with_capacity(coord_fields.len() / 2);
            for pair in coord_fields.chunks_exact(2) {
                points.push((e(pair[0])?, e(pair[1])?));
            }
            Ok(MacroPrimitiveTemplate::Outline {
                exposure: e(parts[1])?,
                points,
                rotation,
            })
        }
        5 => {
            if parts.len() < 7 {
                return Err(bad_arity(text));
            }
            Ok(MacroPrimitiveTemplate::Polygon {
                exposure: e(parts[1])?,
                vertices: e(parts[2])?,
                center: (e(parts[3])?, e(parts[4])?),
                diameter: e(parts[5])?,
                rotation: e(parts[6])?,
            })
        }
        6 => {
            if parts.len() < 9 {
                return Err(bad_arity(text));
            }
            Ok(MacroPrimitiveTemplate::Moire {
                center: (e(parts[1])?, e(parts[2])?),
                outer_diameter: e(parts[3])?,
                ring_thickness: e(parts[4])?,
                gap: e(parts[5])?,
                max_rings: e(parts[6])?,
                crosshair_thickness: e(parts[7])?,
                crosshair_length: e(parts[8])?,
                rotation: e(parts.get(9).copied().unwrap_or("0"))?,
            })
        }
        7 => {
            if parts.len() < 6 {
                return Err(bad_arity(text));
            }
            Ok(MacroPrimitiveTemplate::Thermal {
                center: (e(parts[1])?, e(parts[2])?),
                outer_diameter: e(parts[3])?,
                inner_diameter: e(parts[4])?,
                gap: e(parts[5])?,
                rotation: e(parts.get(6).copied().unwrap_or("0"))?,
            })
        }
        other => Err(CamError::UnknownMacroPrimitive {
            macro_name: String::new(),
            code: other,
        }),
    }
}

fn bad_arity(text: &str) -> CamError {
    CamError::Format(format!("wrong field count for macro primitive: {text:?}"))
}

/// Evaluate a [`MacroDefinition`] against call-site `args` (args\[0\] binds
/// to `$1`), returning the ordered, concrete primitive list. Pure: the
/// same `(definition, args)` always yields identical output.
pub fn expand(definition: &MacroDefinition, args: &[f64]) -> Result<Vec<MacroPrimitive>, CamError> {
    let mut env: HashMap<u32, f64> = HashMap::new();
    for (i, v) in args.iter().enumerate() {
        env.insert(i as u32 + 1, *v);
    }
    let mut out = Vec::new();
    for statement in &definition.body {
        match statement {
            MacroStatement::Assignment { var, expr } => {
                let value = expr.eval(&env);
                env.insert(*var, value);
            }
            MacroStatement::Primitive(template) => {
                if let Some(resolved) = resolve(template, &env)? {
                    out.push(resolved);
                }
            }
        }
    }
    Ok(out)
}

fn resolve(
    template: &MacroPrimitiveTemplate,
    env: &HashMap<u32, f64>,
) -> Result<Option<MacroPrimitive>, CamError> {
    let ev = |x: &Expr| x.eval(env);
    Ok(match template {
        MacroPrimitiveTemplate::Comment => None,
        MacroPrimitiveTemplate::Circle {
            exposure,
            diameter,
            center,
            rotation,
        } => Some(MacroPrimitive::Circle {
            exposure: exposure_from(ev(exposure)),
            diameter: ev(diameter),
            center: (ev(&center.0), ev(&center.1)),
            rotation: rotation.as_ref().map(ev).unwrap_or(0.0),
        }),
        MacroPrimitiveTemplate::VectorLine {
            exposure,
            width,
            start,
            end,
            rotation,
        } => Some(MacroPrimitive::VectorLine {
            exposure: exposure_from(ev(exposure)),
            width: ev(width),
            start: (ev(&start.0), ev(&start.1)),
            end: (ev(&end.0), ev(&end.1)),
            rotation: ev(rotation),
        }),
        MacroPrimitiveTemplate::CenterLine {
            exposure,
            width,
            height,
            center,
            rotation,
        } => Some(MacroPrimitive::CenterLine {
            exposure: exposure_from(ev(exposure)),
            width: ev(width),
            height: ev(height),
            center: (ev(&center.0), ev(&center.1)),
            rotation: ev(rotation),
        }),
        MacroPrimitiveTemplate::Outline {
            exposure,
            points,
            rotation,
        } => Some(MacroPrimitive::Outline {
            exposure: exposure_from(ev(exposure)),
            points: points.iter().map(|(x, y)| (ev(x), ev(y))).collect(),
            rotation: ev(rotation),
        }),
        MacroPrimitiveTemplate::Polygon {
            exposure,
            vertices,
            center,
            diameter,
            rotation,
        } => Some(MacroPrimitive::Polygon {
            exposure: exposure_from(ev(exposure)),
            vertices: ev(vertices).round() as u32,
            center: (ev(&center.0), ev(&center.1)),
            diameter: ev(diameter),
            rotation: ev(rotation),
        }),
        MacroPrimitiveTemplate::Moire {
            center,
            outer_diameter,
            ring_thickness,
            gap,
            max_rings,
            crosshair_thickness,
            crosshair_length,
            rotation,
        } => Some(MacroPrimitive::Moire {
            center: (ev(&center.0), ev(&center.1)),
            outer_diameter: ev(outer_diameter),
            ring_thickness: ev(ring_thickness),
            gap: ev(gap),
            max_rings: ev(max_rings).round() as u32,
            crosshair_thickness: ev(crosshair_thickness),
            crosshair_length: ev(crosshair_length),
            rotation: ev(rotation),
        }),
        MacroPrimitiveTemplate::Thermal {
            center,
            outer_diameter,
            inner_diameter,
            gap,
            rotation,
        } => Some(MacroPrimitive::Thermal {
            center: (ev(&center.0), ev(&center.1)),
            outer_diameter: ev(outer_diameter),
            inner_diameter: ev(inner_diameter),
            gap: ev(gap),
            rotation: ev(rotation),
        }),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expr_precedence_and_associativity() {
        assert_eq!(parse_expr("1+2x3").unwrap().eval(&HashMap::new()), 7.0);
        assert_eq!(parse_expr("1-2-3").unwrap().eval(&HashMap::new()), -4.0);
        assert_eq!(parse_expr("-5").unwrap().eval(&HashMap::new()), -5.0);
    }

    #[test]
    fn expr_variable_reference() {
        let mut env = HashMap::new();
        env.insert(1, 4.0);
        env.insert(2, 3.0);
        assert_eq!(parse_expr("$1x0.75").unwrap().eval(&env), 3.0);
        assert_eq!(parse_expr("$1+$2").unwrap().eval(&env), 7.0);
        // unreferenced parameters don't need to be bound
        assert_eq!(parse_expr("$9").unwrap().eval(&env), 0.0);
    }

    #[test]
    fn donut_macro_expands() {
        // The classic "Donut" macro from the Gerber spec appendix.
        let definition = MacroDefinition {
            name: "Donut".to_string(),
            body: vec![
                MacroStatement::Primitive(parse_primitive("1,1,$1,$2,$3").unwrap()),
                MacroStatement::Assignment {
                    var: 4,
                    expr: parse_expr("$1x0.75").unwrap(),
                },
                MacroStatement::Primitive(parse_primitive("1,0,$4,$2,$3").unwrap()),
            ],
        };
        let resolved = expand(&definition, &[0.30, 0.0, 0.0]).unwrap();
        assert_eq!(resolved.len(), 2);
        match &resolved[0] {
            MacroPrimitive::Circle {
                exposure, diameter, ..
            } => {
                assert_eq!(*exposure, Exposure::Add);
                assert_eq!(*diameter, 0.30);
            }
            other => panic!("expected circle, got {other:?}"),
        }
        match &resolved[1] {
            MacroPrimitive::Circle {
                exposure, diameter, ..
            } => {
                assert_eq!(*exposure, Exposure::Subtract);
                assert!((*diameter - 0.225).abs() < 1e-9);
            }
            other => panic!("expected circle, got {other:?}"),
        }
    }

    #[test]
    fn comment_primitive_is_skipped() {
        let definition = MacroDefinition {
            name: "C".to_string(),
            body: vec![MacroStatement::Primitive(MacroPrimitiveTemplate::Comment)],
        };
        assert_eq!(expand(&definition, &[]).unwrap(), vec![]);
    }

    #[test]
    fn unknown_code_is_rejected() {
        assert!(parse_primitive("99,1,1,0,0").is_err());
    }
}
