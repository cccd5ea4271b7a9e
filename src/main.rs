mod camera;
mod dashboard;

use bevy::prelude::*;
use bevy::window::PrimaryWindow;
use bevy_egui::EguiPlugin;
use camera::{CameraState, MainCamera, camera_follow, camera_zoom, setup_camera};
use dashboard::{DashboardState, ui_system};
use evo_drive::canvas::Canvas;
use evo_drive::config::*;
use evo_drive::controls::Controls;
use evo_drive::evolution::EvolutionController;
use evo_drive::geometry::Point;
use evo_drive::sensor::Sensor;
use evo_drive::storage::FileStore;
use evo_drive::vehicle::{Driver, Vehicle};

const BEST_COLOR: Color = Color::srgb(0.2, 0.4, 1.0);
const POPULATION_COLOR: Color = Color::srgba(0.2, 0.4, 1.0, 0.2);
const TRAFFIC_COLOR: Color = Color::srgb(0.85, 0.85, 0.85);
const MANUAL_COLOR: Color = Color::srgb(0.2, 0.9, 0.3);
const DAMAGED_COLOR: Color = Color::srgb(0.5, 0.5, 0.5);
const ROAD_COLOR: Color = Color::srgb(1.0, 1.0, 1.0);
const RAY_COLOR: Color = Color::srgb(1.0, 0.9, 0.1);
const BLOCKED_RAY_COLOR: Color = Color::srgb(0.9, 0.1, 0.1);

/// Resource to control simulation state
#[derive(Resource, PartialEq, Eq, Clone, Copy)]
pub enum SimulationState {
    Running,
    Paused,
}

impl Default for SimulationState {
    fn default() -> Self {
        SimulationState::Running
    }
}

/// The evolution controller, persisting to disk
#[derive(Resource)]
pub struct Simulation(pub EvolutionController<FileStore>);

/// Arrow keys held this frame
#[derive(Resource, Default)]
pub struct KeyboardControls(pub Controls);

/// Optional keyboard-driven car sharing the road with the population
#[derive(Resource, Default)]
pub struct ManualDrive {
    pub vehicle: Option<Vehicle>,
}

impl ManualDrive {
    pub fn spawn(&mut self, config: &SimulationConfig, lane_center: f32) {
        let driver = Driver::HumanInput {
            sensor: Sensor::new(config.sensor),
        };
        self.vehicle = Some(Vehicle::new(
            None,
            Point::new(lane_center, config.start_y),
            config.vehicle,
            driver,
        ));
    }
}

fn main() {
    App::new()
        .add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(Window {
                title: "Evolving Drivers".to_string(),
                resolution: (1280.0, 720.0).into(),
                ..default()
            }),
            ..default()
        }))
        .add_plugins(EguiPlugin)
        .init_resource::<CameraState>()
        .init_resource::<SimulationState>()
        .init_resource::<KeyboardControls>()
        .init_resource::<ManualDrive>()
        .init_resource::<DashboardState>()
        .add_systems(Startup, (setup_camera, setup_simulation))
        .add_systems(
            Update,
            (
                // Always run (even when paused)
                read_keyboard,
                camera_zoom,
                camera_follow,
                draw_world,
                ui_system,
            )
                .run_if(resource_exists::<Simulation>),
        )
        .add_systems(
            Update,
            (
                // Only run when simulation is running
                advance_simulation,
                drive_manual_vehicle,
            )
                .chain()
                .run_if(resource_exists::<Simulation>)
                .run_if(|state: Res<SimulationState>| *state == SimulationState::Running),
        )
        .run();
}

fn setup_simulation(mut commands: Commands, mut exit: EventWriter<AppExit>) {
    let dir = std::env::var(SAVE_DIR_ENV).unwrap_or_else(|_| SAVE_DIR.to_string());
    let store = FileStore::new(dir);
    info!("persisting progress in {}", store.dir().display());

    match EvolutionController::new(SimulationConfig::default(), store) {
        Ok(controller) => commands.insert_resource(Simulation(controller)),
        Err(e) => {
            error!("invalid simulation configuration: {e}");
            exit.send(AppExit::error());
        }
    }
}

fn read_keyboard(keys: Res<ButtonInput<KeyCode>>, mut controls: ResMut<KeyboardControls>) {
    controls.0 = Controls {
        forward: keys.pressed(KeyCode::ArrowUp),
        left: keys.pressed(KeyCode::ArrowLeft),
        right: keys.pressed(KeyCode::ArrowRight),
        reverse: keys.pressed(KeyCode::ArrowDown),
    };
}

fn advance_simulation(mut simulation: ResMut<Simulation>, mut dashboard: ResMut<DashboardState>) {
    let outcome = simulation.0.advance_frame();
    if let Some(reason) = outcome.scheduled {
        dashboard.notice = Some(format!("Restart scheduled: {reason:?}"));
    }
    if outcome.reseeded {
        dashboard.notice = None;
    }
}

fn drive_manual_vehicle(
    simulation: Res<Simulation>,
    controls: Res<KeyboardControls>,
    mut manual: ResMut<ManualDrive>,
) {
    if let Some(vehicle) = manual.vehicle.as_mut() {
        let controller = &simulation.0;
        for _ in 0..controller.config().ticks_per_frame {
            vehicle.update(controller.road().borders(), controller.traffic(), &controls.0);
        }
    }
}

/// Canvas over bevy gizmos, flipping the simulation's downward y axis
struct GizmoCanvas<'a, 'w, 's> {
    gizmos: &'a mut Gizmos<'w, 's>,
}

fn flip(p: Point) -> Vec2 {
    Vec2::new(p.x, -p.y)
}

impl Canvas for GizmoCanvas<'_, '_, '_> {
    fn fill_polygon(&mut self, points: &[Point], color: Color) {
        let closed = points.iter().chain(points.first()).map(|&p| flip(p));
        self.gizmos.linestrip_2d(closed, color);
    }

    fn stroke_segment(&mut self, start: Point, end: Point, color: Color) {
        self.gizmos.line_2d(flip(start), flip(end), color);
    }
}

fn draw_world(
    mut gizmos: Gizmos,
    simulation: Res<Simulation>,
    manual: Res<ManualDrive>,
    windows: Query<&Window, With<PrimaryWindow>>,
    cameras: Query<(&Transform, &OrthographicProjection), With<MainCamera>>,
) {
    let controller = &simulation.0;
    let mut canvas = GizmoCanvas {
        gizmos: &mut gizmos,
    };

    if let (Ok(window), Ok((transform, projection))) = (windows.get_single(), cameras.get_single())
    {
        let center_y = -transform.translation.y;
        let half_height = window.height() / 2.0 * projection.scale;
        controller
            .road()
            .draw(&mut canvas, center_y - half_height, center_y + half_height, ROAD_COLOR);
    }

    for vehicle in controller.traffic() {
        let color = if vehicle.is_damaged() { DAMAGED_COLOR } else { TRAFFIC_COLOR };
        vehicle.draw(&mut canvas, color);
    }

    for vehicle in controller.population() {
        let color = if vehicle.is_damaged() { DAMAGED_COLOR } else { POPULATION_COLOR };
        vehicle.draw(&mut canvas, color);
    }

    if let Some(best) = controller.best() {
        let color = if best.is_damaged() { DAMAGED_COLOR } else { BEST_COLOR };
        best.draw(&mut canvas, color);
        best.draw_sensor(&mut canvas, RAY_COLOR, BLOCKED_RAY_COLOR);
    }

    if let Some(vehicle) = &manual.vehicle {
        let color = if vehicle.is_damaged() { DAMAGED_COLOR } else { MANUAL_COLOR };
        vehicle.draw(&mut canvas, color);
        vehicle.draw_sensor(&mut canvas, RAY_COLOR, BLOCKED_RAY_COLOR);
    }
}
