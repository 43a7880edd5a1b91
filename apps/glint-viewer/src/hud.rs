use crate::app::AppState;
use egui::Context as EguiContext;
use glint_render::{DebugTextRenderer, Renderer};
use glint_render_wgpu::Composer;
use glint_scene::Stage;

fn stage_row(ui: &mut egui::Ui, label: &str, stage: &Stage) {
    ui.horizontal(|ui| {
        ui.label(format!("{label}:"));
        match stage {
            Stage::Pending => {
                ui.weak("pending");
            }
            Stage::Loading { fraction: Some(f) } => {
                ui.add(egui::ProgressBar::new(*f).show_percentage());
            }
            Stage::Loading { fraction: None } => {
                ui.spinner();
            }
            Stage::Ready => {
                ui.label("ready");
            }
            Stage::Failed(e) => {
                ui.colored_label(egui::Color32::LIGHT_RED, format!("failed: {e}"));
            }
        }
    });
}

pub fn draw(ctx: &EguiContext, state: &AppState, composer: &mut Composer) {
    if !state.show_hud {
        return;
    }

    egui::Window::new("Glint")
        .default_width(300.0)
        .resizable(false)
        .show(ctx, |ui| {
            let status = state.scene.status();
            stage_row(ui, "Environment", &status.environment);
            stage_row(ui, "Model", &status.model);

            let target = state.rotation.target();
            let easing = if state.rotation.is_animating(state.now()) {
                " (easing)"
            } else {
                ""
            };
            ui.label(format!(
                "Rotation target: ({:.3}, {:.3}){easing}",
                target.x, target.y
            ));
            let (w, h) = composer.render_size();
            ui.label(format!(
                "Render size: {w}x{h} (ratio {:.2})",
                composer.viewport().pixel_ratio()
            ));
            ui.separator();

            ui.heading("RGB shift");
            let shift = composer.rgb_shift_mut();
            ui.add(egui::Slider::new(&mut shift.amount, 0.0..=0.02).text("amount"));
            ui.add(
                egui::Slider::new(&mut shift.angle, 0.0..=std::f32::consts::TAU).text("angle"),
            );
            ui.separator();

            ui.heading("Output");
            let tone = composer.tone_mapping_mut();
            ui.add(egui::Slider::new(&mut tone.exposure, 0.05..=2.0).text("exposure"));
            ui.checkbox(composer.show_background_mut(), "Show environment");

            ui.collapsing("Scene", |ui| {
                ui.monospace(DebugTextRenderer::new().render(&state.scene));
            });

            ui.separator();
            ui.small("F1: Toggle HUD | Esc: Quit");
        });
}
