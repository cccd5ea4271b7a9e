use bevy::color::Color;
use evo_drive::canvas::Canvas;
use evo_drive::config::{SensorParams, VehicleParams};
use evo_drive::controls::{Controls, NoInput};
use evo_drive::geometry::{Point, Segment};
use evo_drive::network::{NetworkError, NeuralNetwork};
use evo_drive::road::Road;
use evo_drive::sensor::Sensor;
use evo_drive::vehicle::{Driver, Vehicle};
use rand::SeedableRng;
use rand::rngs::StdRng;

/// Records draw calls instead of rendering them
#[derive(Default)]
struct RecordingCanvas {
    polygons: Vec<Vec<Point>>,
    segments: Vec<(Point, Point, Color)>,
}

impl Canvas for RecordingCanvas {
    fn fill_polygon(&mut self, points: &[Point], _color: Color) {
        self.polygons.push(points.to_vec());
    }

    fn stroke_segment(&mut self, start: Point, end: Point, color: Color) {
        self.segments.push((start, end, color));
    }
}

fn road() -> Road {
    Road::new(100.0, 180.0, 3)
}

fn human(position: Point) -> Vehicle {
    let driver = Driver::HumanInput {
        sensor: Sensor::new(SensorParams::default()),
    };
    Vehicle::new(None, position, VehicleParams::default(), driver)
}

#[test]
fn test_one_tick_of_acceleration_minus_friction() {
    let mut car = human(Point::new(0.0, 0.0));
    car.update(&[], &[], &Controls::forward_only());

    assert!((car.speed - 0.09).abs() < 1e-6, "speed {}", car.speed);
    assert!((car.position.y + car.speed).abs() < 1e-6);
    assert_eq!(car.position.x, 0.0);
}

#[test]
fn test_motionless_vehicle_never_moves_or_breaks() {
    let params = VehicleParams {
        acceleration: 0.0,
        ..VehicleParams::default()
    };
    let start = Point::new(road().lane_center(1), 0.0);
    let mut car = Vehicle::traffic(start, params);

    for _ in 0..200 {
        car.update(road().borders(), &[], &NoInput);
    }

    assert_eq!(car.position, start);
    assert_eq!(car.speed, 0.0);
    assert!(!car.is_damaged());
}

#[test]
fn test_forward_and_reverse_together_cancel() {
    let mut car = human(Point::new(0.0, 0.0));
    let both = Controls {
        forward: true,
        reverse: true,
        ..Controls::default()
    };
    car.update(&[], &[], &both);

    assert_eq!(car.speed, 0.0);
    assert_eq!(car.position, Point::new(0.0, 0.0));
}

#[test]
fn test_steering_needs_speed() {
    let mut car = human(Point::new(0.0, 0.0));
    let left = Controls {
        left: true,
        ..Controls::default()
    };
    car.update(&[], &[], &left);
    assert_eq!(car.angle, 0.0);
}

#[test]
fn test_steering_flips_when_reversing() {
    let mut forward = human(Point::new(0.0, 0.0));
    forward.update(
        &[],
        &[],
        &Controls {
            forward: true,
            left: true,
            ..Controls::default()
        },
    );
    assert!(forward.angle > 0.0);

    let mut backward = human(Point::new(0.0, 0.0));
    backward.update(
        &[],
        &[],
        &Controls {
            reverse: true,
            left: true,
            ..Controls::default()
        },
    );
    assert!(backward.angle < 0.0);
    assert!(backward.speed < 0.0);
    // Reversing moves toward increasing y
    assert!(backward.position.y > 0.0);
}

#[test]
fn test_speed_is_capped_then_slowed_by_friction() {
    let mut car = human(Point::new(0.0, 0.0));
    for _ in 0..200 {
        car.update(&[], &[], &Controls::forward_only());
    }
    let params = VehicleParams::default();
    assert!((car.speed - (params.max_forward_speed - params.friction)).abs() < 1e-5);

    for _ in 0..1000 {
        car.update(&[], &[], &NoInput);
    }
    assert_eq!(car.speed, 0.0);
}

#[test]
fn test_tiny_speed_snaps_to_zero() {
    let mut car = human(Point::new(0.0, 0.0));
    car.speed = 0.005;
    car.update(&[], &[], &NoInput);
    assert_eq!(car.speed, 0.0);

    car.speed = -0.015;
    car.update(&[], &[], &NoInput);
    assert_eq!(car.speed, 0.0);
}

#[test]
fn test_hull_is_the_rotated_body_rectangle() {
    let car = human(Point::new(0.0, 0.0));
    let hull = car.polygon();
    assert_eq!(hull.len(), 4);

    for corner in [
        Point::new(15.0, -25.0),
        Point::new(-15.0, -25.0),
        Point::new(-15.0, 25.0),
        Point::new(15.0, 25.0),
    ] {
        assert!(
            hull.iter().any(|p| (*p - corner).length() < 1e-4),
            "missing corner {corner:?} in {hull:?}"
        );
    }
    // First two corners are the front
    assert!(hull[0].y < 0.0 && hull[1].y < 0.0);
}

#[test]
fn test_crossing_a_border_damages_and_freezes() {
    let road = road();
    let mut car = Vehicle::traffic(Point::new(road.left, 0.0), VehicleParams::traffic());
    car.update(road.borders(), &[], &NoInput);
    assert!(car.is_damaged());

    let frozen = (car.position, car.polygon().to_vec());
    for _ in 0..10 {
        car.update(road.borders(), &[], &NoInput);
    }
    assert!(car.is_damaged());
    assert_eq!((car.position, car.polygon().to_vec()), frozen);
}

#[test]
fn test_touching_another_vehicle_damages() {
    let road = road();
    let x = road.lane_center(1);
    let obstacle = Vehicle::traffic(Point::new(x + 10.0, -40.0), VehicleParams::traffic());
    let mut car = human(Point::new(x, 0.0));

    car.update(road.borders(), &[obstacle], &NoInput);
    assert!(car.is_damaged());
}

#[test]
fn test_best_ever_flag_is_sticky() {
    let mut car = human(Point::new(0.0, 0.0));
    assert!(!car.was_best_ever());
    car.mark_best_ever();
    car.update(&[], &[], &NoInput);
    assert!(car.was_best_ever());
}

#[test]
fn test_sensor_fan_spans_the_spread() {
    let road = road();
    let mut car = human(Point::new(road.lane_center(1), 0.0));
    car.update(road.borders(), &[], &NoInput);

    let sensor = car.sensor().unwrap();
    assert_eq!(sensor.rays().len(), 7);
    assert_eq!(sensor.readings().len(), 7);

    // Leftmost ray leans left, middle ray points straight ahead
    let left = sensor.rays()[0];
    assert!(left.end.x < left.start.x);
    let middle = sensor.rays()[3];
    assert!((middle.end.x - middle.start.x).abs() < 1e-3);
    assert!((middle.start.y - middle.end.y - 200.0).abs() < 1e-3);
}

#[test]
fn test_sensor_reports_borders_and_obstacles() {
    let road = road();
    let x = road.lane_center(1);
    let obstacle = Vehicle::traffic(Point::new(x, -100.0), VehicleParams::traffic());
    let mut car = human(Point::new(x, 0.0));
    car.update(road.borders(), std::slice::from_ref(&obstacle), &NoInput);

    let sensor = car.sensor().unwrap();
    let readings = sensor.readings();
    // Outermost rays reach the borders
    assert!(readings[0].is_some());
    assert!(readings[6].is_some());

    // Middle ray stops at the obstacle's rear edge, 75 units ahead
    let ahead = readings[3].expect("obstacle ahead");
    assert!((ahead.offset - 0.375).abs() < 1e-3);
    assert!((ahead.point.y + 75.0).abs() < 1e-2);

    let inputs = sensor.inputs();
    assert!((inputs[3] - 0.625).abs() < 1e-3);
}

#[test]
fn test_sensor_keeps_the_nearest_hit() {
    let mut sensor = Sensor::new(SensorParams {
        ray_count: 1,
        ray_length: 100.0,
        ray_spread: 1.0,
    });
    let walls = [
        Segment::new(Point::new(-10.0, -80.0), Point::new(10.0, -80.0)),
        Segment::new(Point::new(-10.0, -30.0), Point::new(10.0, -30.0)),
    ];
    sensor.update(Point::new(0.0, 0.0), 0.0, &walls, std::iter::empty());

    let hit = sensor.readings()[0].unwrap();
    assert!((hit.offset - 0.3).abs() < 1e-5);
}

#[test]
fn test_single_ray_points_straight_ahead() {
    let mut sensor = Sensor::new(SensorParams {
        ray_count: 1,
        ray_length: 50.0,
        ray_spread: 2.0,
    });
    sensor.update(Point::new(5.0, 5.0), 0.0, &[], std::iter::empty());

    let ray = sensor.rays()[0];
    assert!((ray.end - Point::new(5.0, -45.0)).length() < 1e-4);
    assert_eq!(sensor.readings(), &[None]);
    assert_eq!(sensor.inputs(), vec![0.0]);
}

#[test]
fn test_neural_driver_requires_matching_shape() {
    let mut rng = StdRng::seed_from_u64(1);
    let sensor = Sensor::new(SensorParams::default());

    let fits = NeuralNetwork::new(&[7, 6, 4], &mut rng).unwrap();
    assert!(Driver::neural(sensor.clone(), fits).is_ok());

    let too_few_inputs = NeuralNetwork::new(&[5, 6, 4], &mut rng).unwrap();
    assert!(Driver::neural(sensor.clone(), too_few_inputs).is_err());

    let too_many_outputs = NeuralNetwork::new(&[7, 6, 5], &mut rng).unwrap();
    assert!(Driver::neural(sensor, too_many_outputs).is_err());
}

#[test]
fn test_undersized_network_cannot_drive_a_wider_sensor() {
    let mut rng = StdRng::seed_from_u64(2);
    let sensor = Sensor::new(SensorParams::default());
    let narrow = NeuralNetwork::new(&[5, 4], &mut rng).unwrap();

    let err = Driver::neural(sensor, narrow).unwrap_err();
    assert_eq!(
        err,
        NetworkError::ShapeMismatch {
            expected: vec![7, 4],
            found: vec![5, 4],
        }
    );
}

#[test]
fn test_neural_driver_exposes_its_parts_read_only() {
    let mut rng = StdRng::seed_from_u64(4);
    let brain = NeuralNetwork::new(&[7, 6, 4], &mut rng).unwrap();
    let driver = Driver::neural(Sensor::new(SensorParams::default()), brain.clone()).unwrap();

    let Driver::NeuralDriven(neural) = &driver else {
        panic!("expected a neural driver");
    };
    assert_eq!(neural.brain(), &brain);
    assert_eq!(neural.sensor().ray_count, 7);
    assert_eq!(driver.brain(), Some(&brain));
}

#[test]
fn test_neural_vehicle_takes_controls_from_its_network() {
    let road = road();
    let mut rng = StdRng::seed_from_u64(3);
    let brain = NeuralNetwork::new(&[7, 6, 4], &mut rng).unwrap();
    let driver = Driver::neural(Sensor::new(SensorParams::default()), brain.clone()).unwrap();
    let mut car = Vehicle::new(
        Some(0),
        Point::new(road.lane_center(1), 0.0),
        VehicleParams::default(),
        driver,
    );

    car.update(road.borders(), &[], &NoInput);

    let inputs = car.sensor().unwrap().inputs();
    let mut expected_brain = brain;
    let outputs = expected_brain.feed_forward(&inputs).unwrap();
    assert_eq!(car.controls, Controls::from_outputs(&outputs));
}

#[test]
fn test_damaged_vehicle_still_senses() {
    let road = road();
    let mut rng = StdRng::seed_from_u64(5);
    let brain = NeuralNetwork::new(&[7, 6, 4], &mut rng).unwrap();
    let driver = Driver::neural(Sensor::new(SensorParams::default()), brain).unwrap();
    let mut car = Vehicle::new(Some(0), Point::new(road.left, 0.0), VehicleParams::default(), driver);

    car.update(road.borders(), &[], &NoInput);
    assert!(car.is_damaged());
    assert_eq!(car.sensor().unwrap().readings().len(), 7);
}

#[test]
fn test_scripted_traffic_ignores_human_input() {
    let mut car = Vehicle::traffic(Point::new(0.0, 0.0), VehicleParams::traffic());
    let reverse = Controls {
        reverse: true,
        ..Controls::default()
    };
    car.update(&[], &[], &reverse);
    assert_eq!(car.controls, Controls::forward_only());
    assert!(car.speed > 0.0);
    assert!(car.sensor().is_none());
    assert!(car.brain().is_none());
}

#[test]
fn test_drawing_emits_hull_and_rays() {
    let road = road();
    let mut car = human(Point::new(road.lane_center(1), 0.0));
    car.update(road.borders(), &[], &NoInput);

    let mut canvas = RecordingCanvas::default();
    let ray = Color::srgb(1.0, 1.0, 0.0);
    let blocked = Color::srgb(1.0, 0.0, 0.0);
    car.draw(&mut canvas, Color::WHITE);
    car.draw_sensor(&mut canvas, ray, blocked);

    assert_eq!(canvas.polygons.len(), 1);
    assert_eq!(canvas.polygons[0].len(), 4);
    let hits = car.sensor().unwrap().readings().iter().flatten().count();
    assert_eq!(canvas.segments.len(), 7 + hits);
    assert_eq!(
        canvas.segments.iter().filter(|(_, _, c)| *c == blocked).count(),
        hits
    );
}

#[test]
fn test_road_lanes_and_borders() {
    let road = road();
    assert_eq!(road.left, 10.0);
    assert_eq!(road.right, 190.0);
    assert_eq!(road.lane_center(0), 40.0);
    assert_eq!(road.lane_center(1), 100.0);
    assert_eq!(road.lane_center(2), 160.0);
    // Past the last lane clamps to it
    assert_eq!(road.lane_center(9), 160.0);
    assert_eq!(road.borders().len(), 2);

    let mut canvas = RecordingCanvas::default();
    road.draw(&mut canvas, -100.0, 100.0, Color::WHITE);
    assert!(canvas.segments.len() > 2);
}
