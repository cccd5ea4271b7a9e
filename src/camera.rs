use bevy::input::mouse::MouseWheel;
use bevy::prelude::*;
use bevy::window::PrimaryWindow;

use evo_drive::config::CAMERA_LEAD;

use crate::Simulation;

#[derive(Component)]
pub struct MainCamera;

#[derive(Resource)]
pub struct CameraState {
    pub zoom: f32,
    /// Track the best vehicle; toggled from the dashboard
    pub follow: bool,
}

impl Default for CameraState {
    fn default() -> Self {
        Self {
            zoom: 1.0,
            follow: true,
        }
    }
}

pub fn setup_camera(mut commands: Commands) {
    commands.spawn((
        Camera2d,
        MainCamera,
        Transform::from_xyz(0.0, 0.0, 0.0),
        OrthographicProjection {
            scale: 1.0,
            ..OrthographicProjection::default_2d()
        },
    ));
}

pub fn camera_zoom(
    mut scroll_events: EventReader<MouseWheel>,
    mut camera_state: ResMut<CameraState>,
    mut query: Query<&mut OrthographicProjection, With<MainCamera>>,
) {
    for event in scroll_events.read() {
        let zoom_delta = -event.y * 0.1;
        camera_state.zoom = (camera_state.zoom + zoom_delta).clamp(0.25, 4.0);

        if let Ok(mut projection) = query.get_single_mut() {
            projection.scale = camera_state.zoom;
        }
    }
}

/// Keeps the road centered and the best vehicle near the bottom of the view.
/// World y is the simulation's y flipped, since the simulation's y grows downward.
pub fn camera_follow(
    camera_state: Res<CameraState>,
    simulation: Res<Simulation>,
    windows: Query<&Window, With<PrimaryWindow>>,
    mut query: Query<&mut Transform, With<MainCamera>>,
) {
    if !camera_state.follow {
        return;
    }
    let Some(best) = simulation.0.best() else {
        return;
    };
    let Ok(window) = windows.get_single() else {
        return;
    };
    if let Ok(mut transform) = query.get_single_mut() {
        let lead = window.height() * CAMERA_LEAD * camera_state.zoom;
        transform.translation.x = simulation.0.road().x;
        transform.translation.y = -best.position.y + lead;
    }
}
