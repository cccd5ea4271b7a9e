use bevy::color::Color;

use crate::canvas::Canvas;
use crate::config::ROAD_EXTENT;
use crate::geometry::{Point, Segment, lerp};

/// Straight multi-lane road bounded by two vertical borders
#[derive(Debug, Clone)]
pub struct Road {
    pub x: f32,
    pub width: f32,
    pub lane_count: usize,
    pub left: f32,
    pub right: f32,
    pub top: f32,
    pub bottom: f32,
    borders: Vec<Segment>,
}

impl Road {
    pub fn new(x: f32, width: f32, lane_count: usize) -> Self {
        let left = x - width / 2.0;
        let right = x + width / 2.0;
        let top = -ROAD_EXTENT;
        let bottom = ROAD_EXTENT;

        let borders = vec![
            Segment::new(Point::new(left, top), Point::new(left, bottom)),
            Segment::new(Point::new(right, top), Point::new(right, bottom)),
        ];

        Self {
            x,
            width,
            lane_count: lane_count.max(1),
            left,
            right,
            top,
            bottom,
            borders,
        }
    }

    pub fn borders(&self) -> &[Segment] {
        &self.borders
    }

    pub fn lane_width(&self) -> f32 {
        self.width / self.lane_count as f32
    }

    /// x coordinate of the middle of lane `index`; indices past the last lane clamp to it
    pub fn lane_center(&self, index: usize) -> f32 {
        let lane_width = self.lane_width();
        self.left + lane_width / 2.0 + index.min(self.lane_count - 1) as f32 * lane_width
    }

    /// Draws lane markings between `from_y` and `to_y`, then the borders over that span
    pub fn draw(&self, canvas: &mut dyn Canvas, from_y: f32, to_y: f32, color: Color) {
        const DASH: f32 = 20.0;

        for i in 1..self.lane_count {
            let x = lerp(self.left, self.right, i as f32 / self.lane_count as f32);
            let mut y = from_y.min(to_y);
            let end = from_y.max(to_y);
            while y < end {
                let dash_end = (y + DASH).min(end);
                canvas.stroke_segment(Point::new(x, y), Point::new(x, dash_end), color);
                y += DASH * 2.0;
            }
        }

        for border in &self.borders {
            let start = Point::new(border.start.x, from_y.max(self.top));
            let end = Point::new(border.end.x, to_y.min(self.bottom));
            canvas.stroke_segment(start, end, color);
        }
    }
}
