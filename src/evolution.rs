//! Generational evolution of neural drivers.
//!
//! Every generation starts from clones of the saved best genome; all but one
//! are mutated so the champion lineage survives unchanged while its variants
//! explore. Fitness is forward progress, i.e. the lowest `y` reached.

use bevy::log::{debug, error, info, warn};
use bevy::utils::{Duration, Instant};
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::config::{ConfigError, SimulationConfig};
use crate::controls::NoInput;
use crate::geometry::Point;
use crate::network::{NetworkError, NeuralNetwork};
use crate::road::Road;
use crate::sensor::Sensor;
use crate::storage::{GenomeArchive, KeyValueStore, StorageError};
use crate::traffic;
use crate::vehicle::{Driver, Vehicle};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestartReason {
    /// The best vehicle stopped making progress
    Stagnation,
    /// Every vehicle crashed or came to rest
    GenerationComplete,
    Manual,
    /// Saved progress was thrown away; the next generation starts from random genomes
    Discard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Running,
    Stuck,
    /// All live vehicles are at rest, waiting out the grace period
    Finishing,
    RestartPending(RestartReason),
}

/// What happened during one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickOutcome {
    pub status: Status,
    /// Set on the tick a restart got scheduled
    pub scheduled: Option<RestartReason>,
    /// Set when this tick began by reseeding a new generation
    pub reseeded: bool,
}

#[derive(Debug, Clone)]
pub struct GenerationStats {
    pub generation: u32,
    pub alive: usize,
    pub damaged: usize,
    pub total: usize,
    pub best_distance: f32,
    pub best_speed: f32,
    pub elapsed: Duration,
    pub has_saved_brain: bool,
}

#[derive(Debug, Clone, Copy)]
struct PendingRestart {
    reason: RestartReason,
    ticks_left: u32,
}

pub struct EvolutionController<S> {
    config: SimulationConfig,
    road: Road,
    archive: GenomeArchive<S>,
    rng: StdRng,
    population: Vec<Vehicle>,
    traffic: Vec<Vehicle>,
    best: Option<usize>,
    generation: u32,
    last_best_y: f32,
    stuck_ticks: u32,
    idle_ticks: u32,
    pending: Option<PendingRestart>,
    generation_started: Instant,
}

impl<S: KeyValueStore> EvolutionController<S> {
    /// Starts from the saved generation and genome, or from random genomes when none load
    pub fn new(config: SimulationConfig, store: S) -> Result<Self, ConfigError> {
        let mut controller = Self::empty(config, store)?;
        controller.generation = match controller.archive.load_generation() {
            Ok(generation) => generation,
            Err(e) => {
                warn!("could not load generation counter, starting at 1: {e}");
                1
            }
        };
        controller.population = controller.spawn_population()?;
        controller.traffic =
            traffic::training_traffic(&controller.road, controller.config.traffic_vehicle);
        controller.begin_generation();
        info!(
            "generation {} started with {} vehicles",
            controller.generation,
            controller.population.len()
        );
        Ok(controller)
    }

    /// Runs a hand-built scene instead of a freshly spawned population
    pub fn with_population(
        config: SimulationConfig,
        store: S,
        population: Vec<Vehicle>,
        traffic: Vec<Vehicle>,
    ) -> Result<Self, ConfigError> {
        let mut controller = Self::empty(config, store)?;
        controller.population = population;
        controller.traffic = traffic;
        controller.begin_generation();
        Ok(controller)
    }

    fn empty(config: SimulationConfig, store: S) -> Result<Self, ConfigError> {
        config.validate()?;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let road = Road::new(config.road_center_x, config.road_width, config.lane_count);
        Ok(Self {
            config,
            road,
            archive: GenomeArchive::new(store),
            rng,
            population: Vec::new(),
            traffic: Vec::new(),
            best: None,
            generation: 1,
            last_best_y: 0.0,
            stuck_ticks: 0,
            idle_ticks: 0,
            pending: None,
            generation_started: Instant::now(),
        })
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn road(&self) -> &Road {
        &self.road
    }

    pub fn archive(&self) -> &GenomeArchive<S> {
        &self.archive
    }

    pub fn population(&self) -> &[Vehicle] {
        &self.population
    }

    pub fn traffic(&self) -> &[Vehicle] {
        &self.traffic
    }

    /// The fittest vehicle as of the last tick
    pub fn best(&self) -> Option<&Vehicle> {
        self.best.and_then(|i| self.population.get(i))
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    pub fn stuck_ticks(&self) -> u32 {
        self.stuck_ticks
    }

    pub fn is_restart_pending(&self) -> bool {
        self.pending.is_some()
    }

    fn is_discard_pending(&self) -> bool {
        self.pending
            .is_some_and(|pending| pending.reason == RestartReason::Discard)
    }

    pub fn set_ticks_per_frame(&mut self, ticks: u32) {
        self.config.ticks_per_frame = ticks.max(1);
    }

    /// Runs `ticks_per_frame` ticks. The returned outcome is the last tick's,
    /// carrying any restart scheduled during the frame.
    pub fn advance_frame(&mut self) -> TickOutcome {
        let mut scheduled = None;
        let mut reseeded = false;
        let mut outcome = None;
        for _ in 0..self.config.ticks_per_frame.max(1) {
            let tick = self.tick();
            scheduled = scheduled.or(tick.scheduled);
            reseeded |= tick.reseeded;
            outcome = Some(tick);
        }
        let last = outcome.unwrap_or(TickOutcome {
            status: self.status(),
            scheduled: None,
            reseeded: false,
        });
        TickOutcome {
            scheduled,
            reseeded,
            ..last
        }
    }

    /// Advances the whole scene by one simulation step
    pub fn tick(&mut self) -> TickOutcome {
        let reseeded = self.count_down_restart();

        for vehicle in &mut self.traffic {
            vehicle.update(self.road.borders(), &[], &NoInput);
        }
        for vehicle in &mut self.population {
            vehicle.update(self.road.borders(), &self.traffic, &NoInput);
        }

        self.best = self.fittest();
        if let Some(i) = self.best {
            self.population[i].mark_best_ever();
        }

        let mut scheduled = self.check_stagnation();

        if self.pending.is_none() {
            self.cull();
            self.best = self.fittest();
        }

        if let Some(best_y) = self.best().map(|b| b.position.y) {
            let moved = traffic::recycle(
                &mut self.traffic,
                &self.road,
                best_y,
                self.config.traffic_recycle_distance,
                self.config.traffic_recycle_jump,
                &mut self.rng,
            );
            if moved > 0 {
                debug!("recycled {moved} traffic vehicles ahead of the leader");
            }
        }

        if scheduled.is_none() {
            scheduled = self.check_generation_end();
        }

        TickOutcome {
            status: self.status(),
            scheduled,
            reseeded,
        }
    }

    /// Saves the current best genome. `Ok(false)` when the best vehicle has no network,
    /// or while a discard is pending so the next generation still starts from random genomes.
    pub fn save_best(&mut self) -> Result<bool, StorageError> {
        if self.is_discard_pending() {
            debug!("save ignored while a discard is pending");
            return Ok(false);
        }
        let Some(brain) = self.best.and_then(|i| self.population[i].brain()) else {
            return Ok(false);
        };
        self.archive.save_best(brain)?;
        Ok(true)
    }

    /// Schedules an immediate reseed from the saved genome; ignored while one is pending
    pub fn request_restart(&mut self) -> bool {
        self.schedule_restart(RestartReason::Manual).is_some()
    }

    /// Forgets the saved genome and generation, then reseeds with random genomes
    pub fn discard(&mut self) -> bool {
        if self.pending.is_some() {
            return false;
        }
        if let Err(e) = self.archive.clear_all() {
            warn!("failed to clear saved progress: {e}");
        }
        self.generation = 1;
        self.schedule_restart(RestartReason::Discard).is_some()
    }

    pub fn status(&self) -> Status {
        if let Some(pending) = self.pending {
            Status::RestartPending(pending.reason)
        } else if self.all_live_idle() {
            Status::Finishing
        } else if self.stuck_ticks > self.config.stuck_notice_ticks {
            Status::Stuck
        } else {
            Status::Running
        }
    }

    pub fn stats(&self) -> GenerationStats {
        let alive = self.population.iter().filter(|v| !v.is_damaged()).count();
        let best = self.best();
        GenerationStats {
            generation: self.generation,
            alive,
            damaged: self.population.len() - alive,
            total: self.population.len(),
            best_distance: best.map_or(0.0, |b| (self.config.start_y - b.position.y).max(0.0)),
            best_speed: best.map_or(0.0, |b| b.speed),
            elapsed: self.generation_started.elapsed(),
            has_saved_brain: self.archive.has_saved_best(),
        }
    }

    fn fittest(&self) -> Option<usize> {
        self.population
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| a.position.y.total_cmp(&b.position.y))
            .map(|(i, _)| i)
    }

    fn check_stagnation(&mut self) -> Option<RestartReason> {
        let best_y = self.best()?.position.y;
        if (best_y - self.last_best_y).abs() < self.config.min_progress {
            self.stuck_ticks += 1;
        } else {
            self.last_best_y = best_y;
            self.stuck_ticks = 0;
        }

        if self.stuck_ticks > self.config.stuck_threshold {
            self.schedule_restart(RestartReason::Stagnation)
        } else {
            None
        }
    }

    /// Drops vehicles that fell beyond the selection horizon and crashed vehicles
    /// that never led. A crashed former leader stays, frozen, until the generation ends.
    fn cull(&mut self) {
        let Some(best_y) = self.best().map(|b| b.position.y) else {
            return;
        };
        let horizon = self.config.selection_horizon;
        self.population.retain(|v| {
            let far_behind = !v.is_damaged() && v.position.y > best_y + horizon;
            let dead_weight = v.is_damaged() && !v.was_best_ever();
            !(far_behind || dead_weight)
        });
    }

    fn all_live_idle(&self) -> bool {
        let mut live = self.population.iter().filter(|v| !v.is_damaged()).peekable();
        live.peek().is_some() && live.all(|v| v.speed.abs() < self.config.idle_speed)
    }

    fn check_generation_end(&mut self) -> Option<RestartReason> {
        let extinct = self.population.iter().all(Vehicle::is_damaged);
        if self.all_live_idle() {
            self.idle_ticks += 1;
        } else {
            self.idle_ticks = 0;
        }

        if !(extinct || self.idle_ticks > self.config.idle_grace_ticks) {
            return None;
        }
        let scheduled = self.schedule_restart(RestartReason::GenerationComplete)?;
        let stats = self.stats();
        info!(
            "generation {} complete: best distance {:.0}, {} still alive",
            stats.generation, stats.best_distance, stats.alive
        );
        Some(scheduled)
    }

    fn schedule_restart(&mut self, reason: RestartReason) -> Option<RestartReason> {
        if self.pending.is_some() {
            return None;
        }

        if matches!(
            reason,
            RestartReason::Stagnation | RestartReason::GenerationComplete
        ) {
            match self.save_best() {
                Ok(true) => {}
                Ok(false) => debug!("best vehicle has no genome to save"),
                Err(e) => warn!("best genome not saved, continuing without it: {e}"),
            }
        }

        let ticks_left = match reason {
            RestartReason::Stagnation | RestartReason::Discard => {
                self.config.stagnation_restart_delay
            }
            RestartReason::GenerationComplete => self.config.generation_restart_delay,
            RestartReason::Manual => 0,
        };
        info!("restart scheduled ({reason:?}) in {ticks_left} ticks");
        self.pending = Some(PendingRestart { reason, ticks_left });
        Some(reason)
    }

    /// Returns true when this call performed the reseed
    fn count_down_restart(&mut self) -> bool {
        let Some(pending) = self.pending.as_mut() else {
            return false;
        };
        if pending.ticks_left > 0 {
            pending.ticks_left -= 1;
            return false;
        }

        let reason = pending.reason;
        self.reseed(reason);
        true
    }

    fn reseed(&mut self, reason: RestartReason) {
        if reason != RestartReason::Discard {
            self.generation += 1;
        }
        if let Err(e) = self.archive.save_generation(self.generation) {
            warn!("generation counter not saved: {e}");
        }

        match self.spawn_population() {
            Ok(population) => self.population = population,
            Err(e) => error!("could not build a new population, keeping the old one: {e}"),
        }
        self.traffic = traffic::training_traffic(&self.road, self.config.traffic_vehicle);
        self.begin_generation();
        info!("generation {} started ({reason:?})", self.generation);
    }

    fn begin_generation(&mut self) {
        self.pending = None;
        self.stuck_ticks = 0;
        self.idle_ticks = 0;
        self.best = self.fittest();
        self.last_best_y = self.best().map_or(self.config.start_y, |b| b.position.y);
        self.generation_started = Instant::now();
    }

    /// The saved genome, or `None` when missing or unusable
    fn load_saved_brain(&mut self) -> Option<NeuralNetwork> {
        match self.archive.load_best(&self.config.network_shape) {
            Ok(brain) => brain,
            Err(e) if e.is_incompatible() => {
                error!("discarding saved genome: {e}");
                if let Err(e) = self.archive.clear_best() {
                    warn!("failed to remove incompatible genome: {e}");
                }
                None
            }
            Err(e) => {
                warn!("could not load saved genome, using random genomes: {e}");
                None
            }
        }
    }

    fn spawn_population(&mut self) -> Result<Vec<Vehicle>, NetworkError> {
        let saved = self.load_saved_brain();
        let start = Point::new(
            self.road.lane_center(self.config.start_lane),
            self.config.start_y,
        );

        (0..self.config.population_size)
            .map(|i| -> Result<Vehicle, NetworkError> {
                let brain = match &saved {
                    Some(champion) => {
                        let mut brain = champion.clone();
                        if i != 0 {
                            brain.mutate(self.config.mutation_rate, &mut self.rng);
                        }
                        brain
                    }
                    None => NeuralNetwork::new(&self.config.network_shape, &mut self.rng)?,
                };
                let driver = Driver::neural(Sensor::new(self.config.sensor), brain)?;
                Ok(Vehicle::new(Some(i), start, self.config.vehicle, driver))
            })
            .collect()
    }
}
