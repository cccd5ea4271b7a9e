//! Segment and polygon intersection primitives.
//!
//! Coordinates follow the screen convention: `y` grows downward, so a
//! vehicle heading at angle 0 travels toward decreasing `y`.

use bevy::math::Vec2;

/// Plain 2D coordinate
pub type Point = Vec2;

/// Directed line segment from `start` to `end`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub start: Point,
    pub end: Point,
}

impl Segment {
    pub fn new(start: Point, end: Point) -> Self {
        Self { start, end }
    }

    /// Point at parameter `t` along the segment
    pub fn at(&self, t: f32) -> Point {
        Point::new(lerp(self.start.x, self.end.x, t), lerp(self.start.y, self.end.y, t))
    }
}

/// Hit point plus its parameter along the first segment (0 = start, 1 = end)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Intersection {
    pub point: Point,
    pub offset: f32,
}

pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Intersection of segments `a->b` and `c->d`.
///
/// Parallel and collinear pairs never report a hit, even when they overlap.
pub fn segment_intersection(a: Point, b: Point, c: Point, d: Point) -> Option<Intersection> {
    let t_top = (d.x - c.x) * (a.y - c.y) - (d.y - c.y) * (a.x - c.x);
    let u_top = (c.y - a.y) * (a.x - b.x) - (c.x - a.x) * (a.y - b.y);
    let bottom = (d.y - c.y) * (b.x - a.x) - (d.x - c.x) * (b.y - a.y);

    if bottom == 0.0 {
        return None;
    }

    let t = t_top / bottom;
    let u = u_top / bottom;
    if (0.0..=1.0).contains(&t) && (0.0..=1.0).contains(&u) {
        Some(Intersection {
            point: Segment::new(a, b).at(t),
            offset: t,
        })
    } else {
        None
    }
}

/// Closed-loop edges of a polygon; edge `i` joins point `i` to point `(i + 1) % n`
pub fn edges(polygon: &[Point]) -> impl Iterator<Item = Segment> + '_ {
    let n = polygon.len();
    (0..n).map(move |i| Segment::new(polygon[i], polygon[(i + 1) % n]))
}

/// True if any edge of `p` crosses any edge of `q`
pub fn polygons_intersect(p: &[Point], q: &[Point]) -> bool {
    edges(p).any(|e| {
        edges(q).any(|f| segment_intersection(e.start, e.end, f.start, f.end).is_some())
    })
}

/// True if any edge of `polygon` crosses `segment`
pub fn polygon_touches_segment(polygon: &[Point], segment: &Segment) -> bool {
    edges(polygon)
        .any(|e| segment_intersection(e.start, e.end, segment.start, segment.end).is_some())
}
