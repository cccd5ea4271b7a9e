use std::f32::consts::PI;

use bevy::color::Color;
use bevy::log::error;

use crate::canvas::Canvas;
use crate::config::VehicleParams;
use crate::controls::{Controls, InputSource};
use crate::geometry::{Point, Segment, polygon_touches_segment, polygons_intersect};
use crate::network::{NetworkError, NeuralNetwork};
use crate::sensor::Sensor;

/// What decides a vehicle's controls each tick
#[derive(Debug, Clone)]
pub enum Driver {
    /// Reads the live input source; the sensor is only for display
    HumanInput { sensor: Sensor },
    /// Holds the accelerator forever
    ScriptedForward,
    /// Sensor readings through the network become the next tick's controls
    NeuralDriven(NeuralDriver),
}

/// A sensor paired with a network sized to read it. Only built by [`Driver::neural`].
#[derive(Debug, Clone)]
pub struct NeuralDriver {
    sensor: Sensor,
    brain: NeuralNetwork,
}

impl NeuralDriver {
    pub fn sensor(&self) -> &Sensor {
        &self.sensor
    }

    pub fn brain(&self) -> &NeuralNetwork {
        &self.brain
    }
}

impl Driver {
    /// Pairs a sensor with a network that reads exactly its rays and emits four signals
    pub fn neural(sensor: Sensor, brain: NeuralNetwork) -> Result<Self, NetworkError> {
        let shape = brain.shape();
        let expected_inputs = sensor.ray_count;
        if shape.first() != Some(&expected_inputs) || shape.last() != Some(&4) {
            let mut expected = shape.clone();
            if let Some(first) = expected.first_mut() {
                *first = expected_inputs;
            }
            if let Some(last) = expected.last_mut() {
                *last = 4;
            }
            return Err(NetworkError::ShapeMismatch {
                expected,
                found: shape,
            });
        }
        Ok(Self::NeuralDriven(NeuralDriver { sensor, brain }))
    }

    pub fn sensor(&self) -> Option<&Sensor> {
        match self {
            Driver::HumanInput { sensor } => Some(sensor),
            Driver::NeuralDriven(neural) => Some(&neural.sensor),
            Driver::ScriptedForward => None,
        }
    }

    pub fn brain(&self) -> Option<&NeuralNetwork> {
        match self {
            Driver::NeuralDriven(neural) => Some(&neural.brain),
            _ => None,
        }
    }
}

/// Kinematic state of one car plus whatever drives it
#[derive(Debug, Clone)]
pub struct Vehicle {
    /// Absent for traffic, which never competes
    pub id: Option<usize>,
    pub position: Point,
    /// Heading in radians, 0 = toward decreasing y
    pub angle: f32,
    pub speed: f32,
    pub params: VehicleParams,
    pub controls: Controls,
    driver: Driver,
    polygon: Vec<Point>,
    damaged: bool,
    was_best_ever: bool,
}

impl Vehicle {
    pub fn new(id: Option<usize>, position: Point, params: VehicleParams, driver: Driver) -> Self {
        let controls = match driver {
            Driver::ScriptedForward => Controls::forward_only(),
            _ => Controls::default(),
        };
        let mut vehicle = Self {
            id,
            position,
            angle: 0.0,
            speed: 0.0,
            params,
            controls,
            driver,
            polygon: Vec::with_capacity(4),
            damaged: false,
            was_best_ever: false,
        };
        vehicle.polygon = vehicle.hull();
        vehicle
    }

    /// Obstacle traffic: no id, scripted to drive straight ahead
    pub fn traffic(position: Point, params: VehicleParams) -> Self {
        Self::new(None, position, params, Driver::ScriptedForward)
    }

    pub fn driver(&self) -> &Driver {
        &self.driver
    }

    pub fn brain(&self) -> Option<&NeuralNetwork> {
        self.driver.brain()
    }

    pub fn sensor(&self) -> Option<&Sensor> {
        self.driver.sensor()
    }

    pub fn polygon(&self) -> &[Point] {
        &self.polygon
    }

    pub fn is_damaged(&self) -> bool {
        self.damaged
    }

    pub fn was_best_ever(&self) -> bool {
        self.was_best_ever
    }

    /// One-way: a vehicle that has led once stays flagged for its whole life
    pub fn mark_best_ever(&mut self) {
        self.was_best_ever = true;
    }

    /// Advances one tick: kinematics and damage while intact, then perception and
    /// control decisions for the next tick
    pub fn update(&mut self, borders: &[Segment], obstacles: &[Vehicle], input: &dyn InputSource) {
        if matches!(self.driver, Driver::HumanInput { .. }) {
            self.controls = input.controls();
        }

        if !self.damaged {
            self.drive();
            self.polygon = self.hull();
            self.damaged = self.assess_damage(borders, obstacles);
        }

        let (position, angle) = (self.position, self.angle);
        let polygons = obstacles.iter().map(Vehicle::polygon);
        match &mut self.driver {
            Driver::HumanInput { sensor } => sensor.update(position, angle, borders, polygons),
            Driver::NeuralDriven(NeuralDriver { sensor, brain }) => {
                sensor.update(position, angle, borders, polygons);
                if !self.damaged {
                    match brain.feed_forward(&sensor.inputs()) {
                        Ok(outputs) => self.controls = Controls::from_outputs(&outputs),
                        Err(e) => error!("vehicle {:?} cannot read its sensor: {e}", self.id),
                    }
                }
            }
            Driver::ScriptedForward => {}
        }
    }

    fn drive(&mut self) {
        let p = self.params;

        if self.controls.forward {
            self.speed += p.acceleration;
        }
        if self.controls.reverse {
            self.speed -= p.acceleration;
        }

        if self.speed != 0.0 {
            let flip = self.speed.signum();
            if self.controls.left {
                self.angle += p.steer_rate * flip;
            }
            if self.controls.right {
                self.angle -= p.steer_rate * flip;
            }
        }

        self.speed = self.speed.clamp(-p.max_backward_speed, p.max_forward_speed);

        if self.speed > 0.0 {
            self.speed -= p.friction;
        } else if self.speed < 0.0 {
            self.speed += p.friction;
        }
        if self.speed.abs() < p.friction {
            self.speed = 0.0;
        }

        self.position.x -= self.angle.sin() * self.speed;
        self.position.y -= self.angle.cos() * self.speed;
    }

    /// Corners of the rotated body, the two front ones first
    fn hull(&self) -> Vec<Point> {
        let radius = self.params.width.hypot(self.params.height) / 2.0;
        let alpha = self.params.width.atan2(self.params.height);
        let corner = |theta: f32| {
            Point::new(
                self.position.x - theta.sin() * radius,
                self.position.y - theta.cos() * radius,
            )
        };

        vec![
            corner(self.angle - alpha),
            corner(self.angle + alpha),
            corner(PI + self.angle - alpha),
            corner(PI + self.angle + alpha),
        ]
    }

    fn assess_damage(&self, borders: &[Segment], obstacles: &[Vehicle]) -> bool {
        borders
            .iter()
            .any(|border| polygon_touches_segment(&self.polygon, border))
            || obstacles
                .iter()
                .any(|other| polygons_intersect(&self.polygon, &other.polygon))
    }

    pub fn draw(&self, canvas: &mut dyn Canvas, color: Color) {
        canvas.fill_polygon(&self.polygon, color);
    }

    pub fn draw_sensor(&self, canvas: &mut dyn Canvas, color: Color, blocked: Color) {
        if let Some(sensor) = self.sensor() {
            sensor.draw(canvas, color, blocked);
        }
    }
}
