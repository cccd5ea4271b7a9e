use bevy::prelude::*;
use bevy_egui::{EguiContexts, egui};

use evo_drive::config::SIMULATION_SPEEDS;
use evo_drive::evolution::{RestartReason, Status};
use evo_drive::network::NeuralNetwork;

use crate::camera::CameraState;
use crate::{ManualDrive, Simulation, SimulationState};

/// Feedback line shown under the controls
#[derive(Resource, Default)]
pub struct DashboardState {
    pub notice: Option<String>,
}

pub fn ui_system(
    mut contexts: EguiContexts,
    mut simulation: ResMut<Simulation>,
    mut simulation_state: ResMut<SimulationState>,
    mut camera_state: ResMut<CameraState>,
    mut manual: ResMut<ManualDrive>,
    mut dashboard: ResMut<DashboardState>,
) {
    let controller = &mut simulation.0;
    let stats = controller.stats();
    let status = controller.status();

    egui::Window::new("Simulation Info")
        .default_pos(egui::pos2(10.0, 10.0))
        .show(contexts.ctx_mut(), |ui| {
            ui.horizontal(|ui| {
                let button_text = if *simulation_state == SimulationState::Running {
                    "⏸ Pause"
                } else {
                    "▶ Resume"
                };

                if ui.button(button_text).clicked() {
                    *simulation_state = if *simulation_state == SimulationState::Running {
                        SimulationState::Paused
                    } else {
                        SimulationState::Running
                    };
                }

                let (color, text) = status_label(status);
                ui.colored_label(color, text);
            });

            ui.horizontal(|ui| {
                ui.label("Speed:");
                for speed in SIMULATION_SPEEDS {
                    let selected = controller.config().ticks_per_frame == speed;
                    if ui.selectable_label(selected, format!("{speed}x")).clicked() {
                        controller.set_ticks_per_frame(speed);
                    }
                }
            });

            ui.horizontal(|ui| {
                let can_save = status != Status::RestartPending(RestartReason::Discard);
                if ui.add_enabled(can_save, egui::Button::new("💾 Save")).clicked() {
                    dashboard.notice = Some(match controller.save_best() {
                        Ok(true) => "Best genome saved".to_string(),
                        Ok(false) => "Nothing to save".to_string(),
                        Err(e) => format!("Save failed: {e}"),
                    });
                }
                if ui.button("🔄 Restart").clicked() && controller.request_restart() {
                    *simulation_state = SimulationState::Running;
                }
                if ui.button("🗑 Discard").clicked() && controller.discard() {
                    dashboard.notice = Some("Saved progress discarded".to_string());
                    *simulation_state = SimulationState::Running;
                }
            });

            if let Some(notice) = &dashboard.notice {
                ui.colored_label(egui::Color32::LIGHT_BLUE, notice.as_str());
            }

            ui.separator();
            ui.heading("Generation Stats");
            ui.separator();

            ui.label(format!("Generation: {}", stats.generation));
            ui.label(format!("Active cars: {} / {}", stats.alive, stats.total));
            ui.label(format!("Crashed (kept): {}", stats.damaged));
            ui.label(format!("Best distance: {:.0}m", stats.best_distance / 10.0));
            ui.label(format!("Best speed: {:.2}", stats.best_speed));
            ui.label(format!("Elapsed: {:.1}s", stats.elapsed.as_secs_f32()));
            ui.label(format!(
                "Saved brain: {}",
                if stats.has_saved_brain { "yes" } else { "no" }
            ));

            ui.separator();
            ui.checkbox(&mut camera_state.follow, "Follow best car");
            ui.horizontal(|ui| {
                let label = if manual.vehicle.is_some() {
                    "🚗 Reset manual car"
                } else {
                    "🚗 Drive manually"
                };
                if ui.button(label).clicked() {
                    let config = controller.config();
                    let lane = controller.road().lane_center(config.start_lane);
                    manual.spawn(config, lane);
                }
                if manual.vehicle.is_some() && ui.button("Remove").clicked() {
                    manual.vehicle = None;
                }
            });

            ui.separator();
            ui.label("Controls:");
            ui.label("• Arrow keys - Drive the manual car");
            ui.label("• Mouse Wheel - Zoom in/out");
        });

    if let Some(brain) = controller.best().and_then(|best| best.brain()) {
        egui::Window::new("Best Network")
            .default_pos(egui::pos2(900.0, 10.0))
            .default_size(egui::vec2(360.0, 420.0))
            .show(contexts.ctx_mut(), |ui| network_view(ui, brain));
    }
}

fn status_label(status: Status) -> (egui::Color32, String) {
    match status {
        Status::Running => (egui::Color32::GREEN, "Running".to_string()),
        Status::Stuck => (egui::Color32::YELLOW, "Cars stuck".to_string()),
        Status::Finishing => (egui::Color32::YELLOW, "Finishing".to_string()),
        Status::RestartPending(reason) => {
            (egui::Color32::LIGHT_RED, format!("Restarting ({reason:?})"))
        }
    }
}

/// Draws levels bottom (inputs) to top (outputs). Edge color follows the weight's sign,
/// opacity its magnitude; node rings show biases the same way.
fn network_view(ui: &mut egui::Ui, brain: &NeuralNetwork) {
    const MARGIN: f32 = 30.0;
    const NODE_RADIUS: f32 = 12.0;
    const OUTPUT_LABELS: [&str; 4] = ["↑", "←", "→", "↓"];

    let size = egui::vec2(ui.available_width().max(200.0), 380.0);
    let (response, painter) = ui.allocate_painter(size, egui::Sense::hover());
    let rect = response.rect.shrink(MARGIN);

    let shape = brain.shape();
    let layers = shape.len();
    let node_pos = |layer: usize, index: usize| {
        let count = shape[layer];
        let x = if count == 1 {
            rect.center().x
        } else {
            rect.left() + rect.width() * index as f32 / (count - 1) as f32
        };
        let y = rect.bottom() - rect.height() * layer as f32 / (layers - 1).max(1) as f32;
        egui::pos2(x, y)
    };

    for (l, level) in brain.levels().iter().enumerate() {
        for (i, row) in level.weights().iter().enumerate() {
            for (o, &weight) in row.iter().enumerate() {
                painter.line_segment(
                    [node_pos(l, i), node_pos(l + 1, o)],
                    egui::Stroke::new(2.0, value_color(weight)),
                );
            }
        }
    }

    for layer in 0..layers {
        for index in 0..shape[layer] {
            let center = node_pos(layer, index);
            painter.circle_filled(center, NODE_RADIUS, egui::Color32::BLACK);
            if layer > 0 {
                let bias = brain.levels()[layer - 1].biases()[index];
                painter.circle_stroke(center, NODE_RADIUS, egui::Stroke::new(2.0, value_color(bias)));
            }
            if layer == layers - 1 {
                if let Some(label) = OUTPUT_LABELS.get(index) {
                    painter.text(
                        center,
                        egui::Align2::CENTER_CENTER,
                        label,
                        egui::FontId::monospace(14.0),
                        egui::Color32::WHITE,
                    );
                }
            }
        }
    }
}

fn value_color(value: f32) -> egui::Color32 {
    let alpha = (value.abs().min(1.0) * 255.0) as u8;
    if value < 0.0 {
        egui::Color32::from_rgba_unmultiplied(0, 0, 255, alpha)
    } else {
        egui::Color32::from_rgba_unmultiplied(255, 255, 0, alpha)
    }
}
