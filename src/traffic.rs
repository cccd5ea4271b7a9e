use rand::Rng;

use crate::config::VehicleParams;
use crate::geometry::Point;
use crate::road::Road;
use crate::vehicle::Vehicle;

/// Obstacle course, top row first. `X` marks an occupied lane.
const TRAINING_PATTERN: [&str; 49] = [
    " XX", "   ", "   ", " XX", "   ", "   ", "XX ", "   ", "   ", "XX ",
    "   ", "   ", "  X", "   ", "   ", "XX ", "   ", "   ", " XX", "   ",
    "   ", "X X", "   ", "   ", "XX ", "   ", "   ", "X X", "   ", "   ",
    " X ", "   ", "   ", " X ", "   ", "   ", "X  ", "   ", "   ", " X ",
    "   ", "   ", "  X", "   ", "   ", " X ", "   ", "   ", "X X",
];

const FIRST_ROW_Y: f32 = -100.0;
const ROW_SPACING: f32 = 75.0;

/// The fixed training course, laid out bottom row first starting just ahead of the start line
pub fn training_traffic(road: &Road, params: VehicleParams) -> Vec<Vehicle> {
    let mut traffic = Vec::new();
    let mut y = FIRST_ROW_Y;

    for row in TRAINING_PATTERN.iter().rev() {
        for (lane, cell) in row.chars().enumerate() {
            if cell == 'X' {
                traffic.push(Vehicle::traffic(
                    Point::new(road.lane_center(lane), y),
                    params,
                ));
            }
        }
        y -= ROW_SPACING;
    }

    traffic
}

/// `count` vehicles in random lanes, 100 to 200 units apart
pub fn random_traffic(
    road: &Road,
    count: usize,
    params: VehicleParams,
    rng: &mut impl Rng,
) -> Vec<Vehicle> {
    let mut y = FIRST_ROW_Y;
    (0..count)
        .map(|_| {
            let lane = rng.gen_range(0..road.lane_count);
            let vehicle = Vehicle::traffic(Point::new(road.lane_center(lane), y), params);
            y -= rng.gen_range(100.0..200.0);
            vehicle
        })
        .collect()
}

/// Moves traffic that fell `distance` behind `leader_y` forward by `jump`, into a random lane.
/// Returns how many vehicles were moved.
pub fn recycle(
    traffic: &mut [Vehicle],
    road: &Road,
    leader_y: f32,
    distance: f32,
    jump: f32,
    rng: &mut impl Rng,
) -> usize {
    let mut moved = 0;
    for vehicle in traffic.iter_mut().filter(|v| v.position.y > leader_y + distance) {
        let lane = rng.gen_range(0..road.lane_count);
        let speed = vehicle.speed;
        *vehicle = Vehicle::traffic(
            Point::new(road.lane_center(lane), vehicle.position.y - jump),
            vehicle.params,
        );
        vehicle.speed = speed;
        moved += 1;
    }
    moved
}
