use bevy::color::Color;

use crate::geometry::Point;

/// Drawing surface the kernel renders into. Colors are always chosen by the caller.
pub trait Canvas {
    fn fill_polygon(&mut self, points: &[Point], color: Color);
    fn stroke_segment(&mut self, start: Point, end: Point, color: Color);
}
