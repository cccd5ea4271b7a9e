use bevy::color::Color;

use crate::canvas::Canvas;
use crate::config::SensorParams;
use crate::geometry::{Intersection, Point, Segment, edges, lerp, segment_intersection};

/// Fan of rays cast from a vehicle's center, reporting the nearest hit per ray
#[derive(Debug, Clone)]
pub struct Sensor {
    pub ray_count: usize,
    pub ray_length: f32,
    pub ray_spread: f32,
    rays: Vec<Segment>,
    readings: Vec<Option<Intersection>>,
}

impl Sensor {
    pub fn new(params: SensorParams) -> Self {
        Self {
            ray_count: params.ray_count,
            ray_length: params.ray_length,
            ray_spread: params.ray_spread,
            rays: Vec::with_capacity(params.ray_count),
            readings: Vec::with_capacity(params.ray_count),
        }
    }

    pub fn rays(&self) -> &[Segment] {
        &self.rays
    }

    /// Nearest hit per ray from the latest update; `None` means nothing in range
    pub fn readings(&self) -> &[Option<Intersection>] {
        &self.readings
    }

    /// Network inputs: 0 for an empty ray, approaching 1 as the obstacle gets closer
    pub fn inputs(&self) -> Vec<f32> {
        self.readings
            .iter()
            .map(|r| r.map_or(0.0, |hit| 1.0 - hit.offset))
            .collect()
    }

    /// Recasts every ray from `origin` at `heading` and takes fresh readings
    pub fn update<'a>(
        &mut self,
        origin: Point,
        heading: f32,
        borders: &[Segment],
        obstacles: impl Iterator<Item = &'a [Point]> + Clone,
    ) {
        self.cast_rays(origin, heading);
        self.readings.clear();
        for ray in &self.rays {
            let reading = nearest_hit(ray, borders, obstacles.clone());
            self.readings.push(reading);
        }
    }

    fn cast_rays(&mut self, origin: Point, heading: f32) {
        self.rays.clear();
        for i in 0..self.ray_count {
            let t = if self.ray_count == 1 {
                0.5
            } else {
                i as f32 / (self.ray_count - 1) as f32
            };
            let angle = lerp(self.ray_spread / 2.0, -self.ray_spread / 2.0, t) + heading;
            let end = Point::new(
                origin.x - angle.sin() * self.ray_length,
                origin.y - angle.cos() * self.ray_length,
            );
            self.rays.push(Segment::new(origin, end));
        }
    }

    /// Each ray is drawn up to its hit in `color`, the blocked remainder in `blocked`
    pub fn draw(&self, canvas: &mut dyn Canvas, color: Color, blocked: Color) {
        for (ray, reading) in self.rays.iter().zip(&self.readings) {
            let reach = reading.map_or(ray.end, |hit| hit.point);
            canvas.stroke_segment(ray.start, reach, color);
            if reading.is_some() {
                canvas.stroke_segment(reach, ray.end, blocked);
            }
        }
    }
}

fn nearest_hit<'a>(
    ray: &Segment,
    borders: &[Segment],
    obstacles: impl Iterator<Item = &'a [Point]>,
) -> Option<Intersection> {
    let border_hits = borders
        .iter()
        .filter_map(|b| segment_intersection(ray.start, ray.end, b.start, b.end));
    let obstacle_hits = obstacles.flat_map(|polygon| {
        edges(polygon).filter_map(|e| segment_intersection(ray.start, ray.end, e.start, e.end))
    });

    border_hits
        .chain(obstacle_hits)
        .min_by(|a, b| a.offset.total_cmp(&b.offset))
}
