//! Configuration constants for the driving simulator

use std::f32::consts::FRAC_PI_2;
use thiserror::Error;

use crate::network::NetworkError;

// ============================================================================
// ROAD SETTINGS
// ============================================================================

/// Number of lanes on the road
pub const LANE_COUNT: usize = 3;

/// Horizontal center of the road
pub const ROAD_CENTER_X: f32 = 100.0;

/// Full road width, borders included
pub const ROAD_WIDTH: f32 = 180.0;

/// Vertical reach of the road borders (±ROAD_EXTENT)
pub const ROAD_EXTENT: f32 = 1_000_000.0;

// ============================================================================
// VEHICLE SETTINGS
// ============================================================================

pub const VEHICLE_WIDTH: f32 = 30.0;
pub const VEHICLE_HEIGHT: f32 = 50.0;

/// Speed gained per tick while accelerating
pub const ACCELERATION: f32 = 0.1;

/// Speed cap for population vehicles
pub const MAX_FORWARD_SPEED: f32 = 4.0;

/// Speed cap for scripted traffic
pub const TRAFFIC_MAX_FORWARD_SPEED: f32 = 1.0;

pub const MAX_BACKWARD_SPEED: f32 = 1.0;

/// Speed lost per tick to friction
pub const FRICTION: f32 = 0.01;

/// Heading change per tick while steering (radians)
pub const STEER_RATE: f32 = 0.01;

/// Lane the population starts in
pub const START_LANE: usize = 1;

/// Starting y coordinate of the population
pub const START_Y: f32 = 100.0;

// ============================================================================
// SENSOR SETTINGS
// ============================================================================

pub const RAY_COUNT: usize = 7;
pub const RAY_LENGTH: f32 = 200.0;
pub const RAY_SPREAD: f32 = FRAC_PI_2;

// ============================================================================
// NETWORK & EVOLUTION SETTINGS
// ============================================================================

/// Number of vehicles per generation
pub const POPULATION_SIZE: usize = 100;

/// Layer sizes: sensor rays -> hidden -> drive signals
pub const NETWORK_SHAPE: [usize; 3] = [RAY_COUNT, 6, 4];

/// Blend factor toward a fresh random value when mutating a genome
pub const MUTATION_RATE: f32 = 0.1;

/// Ticks without progress before an automatic restart (~5 seconds at 60fps)
pub const STUCK_THRESHOLD: u32 = 300;

/// Minimum movement of the best vehicle that counts as progress
pub const MIN_PROGRESS: f32 = 5.0;

/// Ticks without progress before the stuck status is reported
pub const STUCK_NOTICE_TICKS: u32 = 60;

/// Vehicles slower than this are considered idle
pub const IDLE_SPEED: f32 = 0.1;

/// Ticks every live vehicle may idle before the generation ends
pub const IDLE_GRACE_TICKS: u32 = 120;

/// Distance behind the best vehicle beyond which undamaged vehicles are culled
pub const SELECTION_HORIZON: f32 = 350.0;

/// Ticks between scheduling a stagnation restart and reseeding
pub const STAGNATION_RESTART_DELAY: u32 = 30;

/// Ticks between the end of a generation and reseeding
pub const GENERATION_RESTART_DELAY: u32 = 60;

/// Traffic further than this behind the best vehicle is recycled ahead
pub const TRAFFIC_RECYCLE_DISTANCE: f32 = 800.0;

/// Distance a recycled traffic vehicle jumps forward
pub const TRAFFIC_RECYCLE_JUMP: f32 = 3200.0;

/// Simulation ticks advanced per rendered frame
pub const TICKS_PER_FRAME: u32 = 1;

// ============================================================================
// HOST SETTINGS
// ============================================================================

/// Directory holding the persisted genome and generation counter
pub const SAVE_DIR: &str = "saves";

/// Environment variable overriding SAVE_DIR
pub const SAVE_DIR_ENV: &str = "EVO_DRIVE_SAVE_DIR";

/// Speed multipliers offered in the control panel
pub const SIMULATION_SPEEDS: [u32; 4] = [1, 2, 3, 5];

/// Fraction of the viewport height kept below the best vehicle
pub const CAMERA_LEAD: f32 = 0.2;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("population size must be at least 1")]
    EmptyPopulation,
    #[error("road needs at least one lane")]
    NoLanes,
    #[error("network shape {0:?} needs at least an input and an output layer")]
    ShallowNetwork(Vec<usize>),
    #[error("network takes {inputs} inputs but the sensor casts {rays} rays")]
    SensorMismatch { inputs: usize, rays: usize },
    #[error("network must produce 4 drive signals, got {0}")]
    OutputMismatch(usize),
    #[error(transparent)]
    Network(#[from] NetworkError),
}

/// Physical and handling parameters of a vehicle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VehicleParams {
    pub width: f32,
    pub height: f32,
    pub acceleration: f32,
    pub max_forward_speed: f32,
    pub max_backward_speed: f32,
    pub friction: f32,
    pub steer_rate: f32,
}

impl Default for VehicleParams {
    fn default() -> Self {
        Self {
            width: VEHICLE_WIDTH,
            height: VEHICLE_HEIGHT,
            acceleration: ACCELERATION,
            max_forward_speed: MAX_FORWARD_SPEED,
            max_backward_speed: MAX_BACKWARD_SPEED,
            friction: FRICTION,
            steer_rate: STEER_RATE,
        }
    }
}

impl VehicleParams {
    /// Parameters used for scripted obstacle traffic
    pub fn traffic() -> Self {
        Self {
            max_forward_speed: TRAFFIC_MAX_FORWARD_SPEED,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorParams {
    pub ray_count: usize,
    pub ray_length: f32,
    pub ray_spread: f32,
}

impl Default for SensorParams {
    fn default() -> Self {
        Self {
            ray_count: RAY_COUNT,
            ray_length: RAY_LENGTH,
            ray_spread: RAY_SPREAD,
        }
    }
}

/// Everything the evolution controller needs to run generations
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    pub lane_count: usize,
    pub road_center_x: f32,
    pub road_width: f32,
    pub population_size: usize,
    pub start_lane: usize,
    pub start_y: f32,
    pub vehicle: VehicleParams,
    pub traffic_vehicle: VehicleParams,
    pub sensor: SensorParams,
    pub network_shape: Vec<usize>,
    pub mutation_rate: f32,
    pub stuck_threshold: u32,
    pub min_progress: f32,
    pub stuck_notice_ticks: u32,
    pub idle_speed: f32,
    pub idle_grace_ticks: u32,
    pub selection_horizon: f32,
    pub stagnation_restart_delay: u32,
    pub generation_restart_delay: u32,
    pub traffic_recycle_distance: f32,
    pub traffic_recycle_jump: f32,
    pub ticks_per_frame: u32,
    pub seed: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            lane_count: LANE_COUNT,
            road_center_x: ROAD_CENTER_X,
            road_width: ROAD_WIDTH,
            population_size: POPULATION_SIZE,
            start_lane: START_LANE,
            start_y: START_Y,
            vehicle: VehicleParams::default(),
            traffic_vehicle: VehicleParams::traffic(),
            sensor: SensorParams::default(),
            network_shape: NETWORK_SHAPE.to_vec(),
            mutation_rate: MUTATION_RATE,
            stuck_threshold: STUCK_THRESHOLD,
            min_progress: MIN_PROGRESS,
            stuck_notice_ticks: STUCK_NOTICE_TICKS,
            idle_speed: IDLE_SPEED,
            idle_grace_ticks: IDLE_GRACE_TICKS,
            selection_horizon: SELECTION_HORIZON,
            stagnation_restart_delay: STAGNATION_RESTART_DELAY,
            generation_restart_delay: GENERATION_RESTART_DELAY,
            traffic_recycle_distance: TRAFFIC_RECYCLE_DISTANCE,
            traffic_recycle_jump: TRAFFIC_RECYCLE_JUMP,
            ticks_per_frame: TICKS_PER_FRAME,
            seed: None,
        }
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.population_size == 0 {
            return Err(ConfigError::EmptyPopulation);
        }
        if self.lane_count == 0 {
            return Err(ConfigError::NoLanes);
        }
        let (Some(&inputs), Some(&outputs)) =
            (self.network_shape.first(), self.network_shape.last())
        else {
            return Err(ConfigError::ShallowNetwork(self.network_shape.clone()));
        };
        if self.network_shape.len() < 2 || self.network_shape.contains(&0) {
            return Err(ConfigError::ShallowNetwork(self.network_shape.clone()));
        }
        if inputs != self.sensor.ray_count {
            return Err(ConfigError::SensorMismatch {
                inputs,
                rays: self.sensor.ray_count,
            });
        }
        if outputs != 4 {
            return Err(ConfigError::OutputMismatch(outputs));
        }
        Ok(())
    }
}
