use egui::{Color32, Context, RichText, ScrollArea, Ui};

use crate::noise::NOISE_PRESETS;
use crate::ui::state::UiState;
use crate::ui::theme::*;

/// One-shot requests raised by the panel. The shell consumes them after the
/// UI pass and resets them next frame via Default.
#[derive(Default)]
pub struct UiActions {
    pub reload_shaders: bool,
    pub regenerate_mesh: bool,
    pub export_mesh: bool,
    pub reset_camera: bool,
}

/// Read-only numbers the shell refreshes every frame for the stats box.
#[derive(Default)]
pub struct FrameStats {
    pub fps: f32,
    pub frame_ms: f32,
    pub vertex_count: u32,
    pub triangle_count: u32,
    pub last_generation_ms: f32,
}

pub fn draw_side_panel(
    ctx: &Context,
    state: &mut UiState,
    stats: &FrameStats,
    last_error: &Option<String>,
    wireframe_supported: bool,
) -> UiActions {
    let mut actions = UiActions::default();

    egui::SidePanel::right("control_panel")
        .min_width(300.0)
        .max_width(400.0)
        .default_width(330.0)
        .frame(egui::Frame::default().fill(BG_PANEL).inner_margin(16.0))
        .show(ctx, |ui| {
            ScrollArea::vertical().show(ui, |ui| {
                ui.heading(RichText::new("NOISEFIELD").strong());
                ui.add_space(4.0);
                ui.label(
                    RichText::new("Displaced Terrain Viewer")
                        .color(TEXT_MUTED)
                        .size(11.0),
                );
                ui.add_space(12.0);

                error_frame(ui, last_error);

                section_header(ui, "NOISE");
                egui::ComboBox::from_id_salt("noise_presets")
                    .selected_text(NOISE_PRESETS[state.selected_preset].name)
                    .width(ui.available_width())
                    .show_ui(ui, |ui| {
                        for (i, preset) in NOISE_PRESETS.iter().enumerate() {
                            if ui
                                .selectable_label(state.selected_preset == i, preset.name)
                                .clicked()
                            {
                                state.selected_preset = i;
                                state.amplitude = preset.amplitude;
                                state.rate = preset.rate;
                                state.octaves = preset.octaves;
                                state.lacunarity = preset.lacunarity;
                            }
                        }
                    });
                ui.add_space(4.0);
                ui.label(
                    RichText::new(NOISE_PRESETS[state.selected_preset].description)
                        .color(TEXT_MUTED)
                        .size(11.0)
                        .italics(),
                );
                ui.add_space(8.0);

                ui.horizontal(|ui| {
                    ui.label("Amplitude:");
                    ui.add(egui::Slider::new(&mut state.amplitude, 0.0..=1.0));
                });
                ui.horizontal(|ui| {
                    ui.label("Rate:");
                    ui.add(egui::Slider::new(&mut state.rate, 0.0..=4.0));
                });
                ui.horizontal(|ui| {
                    ui.label("Octaves:");
                    ui.add(egui::Slider::new(&mut state.octaves, 1..=10));
                });
                ui.horizontal(|ui| {
                    ui.label("Lacunarity:");
                    ui.add(egui::Slider::new(&mut state.lacunarity, 1.0..=8.0));
                });
                ui.add_space(16.0);

                section_header(ui, "DISPLAY");
                ui.checkbox(&mut state.falloff_enabled, "Edge falloff");
                ui.checkbox(&mut state.show_maps, "Show noise maps");
                ui.add_enabled(
                    wireframe_supported,
                    egui::Checkbox::new(&mut state.wireframe, "Wireframe"),
                )
                .on_disabled_hover_text("Line polygon mode is not supported by this adapter");
                ui.add_space(16.0);

                section_header(ui, "MESH");
                ui.horizontal(|ui| {
                    ui.label("X:");
                    ui.add(
                        egui::DragValue::new(&mut state.resolution_x)
                            .speed(1.0)
                            .range(2..=512),
                    );
                    ui.label("Z:");
                    ui.add(
                        egui::DragValue::new(&mut state.resolution_z)
                            .speed(1.0)
                            .range(2..=512),
                    );
                });
                ui.add_space(8.0);
                if ui
                    .add(
                        egui::Button::new(RichText::new("Regenerate").color(BG_PURE_BLACK))
                            .fill(ACCENT_TEAL)
                            .min_size(egui::vec2(ui.available_width(), 32.0)),
                    )
                    .clicked()
                {
                    actions.regenerate_mesh = true;
                }
                ui.add_space(4.0);
                if ui
                    .add(egui::Button::new("Export OBJ").min_size(egui::vec2(ui.available_width(), 26.0)))
                    .clicked()
                {
                    actions.export_mesh = true;
                }
                ui.add_space(16.0);

                section_header(ui, "SHADER");
                if ui
                    .add(egui::Button::new("Reload Shaders").min_size(egui::vec2(ui.available_width(), 26.0)))
                    .clicked()
                {
                    actions.reload_shaders = true;
                }
                ui.add_space(4.0);
                ui.label(
                    RichText::new("Reads src/renderer/shaders.wgsl from disk")
                        .color(TEXT_MUTED)
                        .size(10.0)
                        .italics(),
                );
                ui.add_space(16.0);

                section_header(ui, "CAMERA");
                if ui
                    .add(egui::Button::new("Reset View").min_size(egui::vec2(ui.available_width(), 26.0)))
                    .clicked()
                {
                    actions.reset_camera = true;
                }
                ui.add_space(16.0);

                perf_controls(ui, state);
                ui.add_space(16.0);

                ui.separator();
                ui.add_space(12.0);

                if state.show_stats {
                    stats_panel(ui, stats, state.rate);
                }
            });
        });

    actions
}

fn section_header(ui: &mut Ui, text: &str) {
    ui.label(RichText::new(text).color(TEXT_MUTED).size(11.0).strong());
    ui.add_space(4.0);
}

fn error_frame(ui: &mut Ui, error: &Option<String>) {
    if let Some(err) = error {
        egui::Frame::default()
            .fill(Color32::from_rgb(40, 15, 15))
            .stroke(egui::Stroke::new(1.0, ACCENT_RED))
            .rounding(4.0)
            .inner_margin(8.0)
            .show(ui, |ui| {
                ui.label(RichText::new(err).color(ACCENT_RED).size(11.0));
            });
        ui.add_space(12.0);
    }
}

fn perf_controls(ui: &mut Ui, state: &mut UiState) {
    section_header(ui, "PERFORMANCE");
    ui.horizontal(|ui| {
        ui.checkbox(&mut state.vsync_enabled, "VSync");
        ui.checkbox(&mut state.show_stats, "Stats");
    });
    ui.horizontal(|ui| {
        ui.checkbox(&mut state.fps_cap_enabled, "FPS Cap:");
        ui.add_enabled(
            state.fps_cap_enabled,
            egui::DragValue::new(&mut state.fps_cap)
                .range(30..=500)
                .suffix(" fps"),
        );
    });
}

fn stats_panel(ui: &mut Ui, stats: &FrameStats, rate: f32) {
    section_header(ui, "STATISTICS");
    egui::Frame::default()
        .fill(BG_WIDGET)
        .stroke(egui::Stroke::new(1.0, BORDER_SUBTLE))
        .rounding(6.0)
        .inner_margin(12.0)
        .show(ui, |ui| {
            ui.style_mut().override_font_id =
                Some(egui::FontId::new(11.0, egui::FontFamily::Monospace));

            let fps_color = if stats.fps >= 60.0 {
                ACCENT_GREEN
            } else if stats.fps >= 30.0 {
                ACCENT_AMBER
            } else {
                ACCENT_RED
            };

            egui::Grid::new("stats")
                .num_columns(2)
                .spacing([20.0, 4.0])
                .show(ui, |ui| {
                    ui.label(RichText::new("FPS").color(TEXT_MUTED));
                    ui.label(RichText::new(format!("{:.0}", stats.fps)).color(fps_color));
                    ui.end_row();

                    ui.label(RichText::new("Frame ms").color(TEXT_MUTED));
                    ui.label(
                        RichText::new(format!("{:.2}", stats.frame_ms)).color(TEXT_PRIMARY),
                    );
                    ui.end_row();

                    ui.label(RichText::new("Vertices").color(TEXT_MUTED));
                    ui.label(
                        RichText::new(fmt_num(stats.vertex_count as usize)).color(ACCENT_TEAL),
                    );
                    ui.end_row();

                    ui.label(RichText::new("Triangles").color(TEXT_MUTED));
                    ui.label(
                        RichText::new(fmt_num(stats.triangle_count as usize))
                            .color(TEXT_PRIMARY),
                    );
                    ui.end_row();

                    ui.label(RichText::new("Gen ms").color(TEXT_MUTED));
                    ui.label(
                        RichText::new(format!("{:.1}", stats.last_generation_ms))
                            .color(TEXT_PRIMARY),
                    );
                    ui.end_row();
                });

            ui.add_space(8.0);

            let status = if rate > 0.0 {
                RichText::new("ANIMATING").color(ACCENT_GREEN)
            } else {
                RichText::new("STATIC").color(ACCENT_AMBER)
            };
            ui.horizontal(|ui| {
                ui.label(RichText::new("Field:").color(TEXT_MUTED));
                ui.label(status);
            });
        });
}

pub fn draw_help_overlay(ctx: &Context, camera_distance: f32) {
    egui::Area::new(egui::Id::new("help_overlay"))
        .anchor(egui::Align2::LEFT_BOTTOM, egui::vec2(12.0, -12.0))
        .show(ctx, |ui| {
            egui::Frame::default()
                .fill(Color32::from_black_alpha(180))
                .rounding(6.0)
                .inner_margin(10.0)
                .show(ui, |ui| {
                    ui.style_mut().override_font_id =
                        Some(egui::FontId::new(11.0, egui::FontFamily::Monospace));
                    ui.label(
                        RichText::new("LMB+Drag - Orbit | Scroll - Zoom | Esc - Quit")
                            .color(TEXT_MUTED),
                    );
                    ui.label(
                        RichText::new(format!(
                            "S - Reload | T - Maps | Q - Falloff | W - Wireframe | Dist: {:.0}",
                            camera_distance
                        ))
                        .color(TEXT_MUTED),
                    );
                });
        });
}

fn fmt_num(n: usize) -> String {
    if n >= 1_000_000 {
        format!("{:.2}M", n as f64 / 1_000_000.0)
    } else if n >= 1_000 {
        format!("{:.1}K", n as f64 / 1_000.0)
    } else {
        format!("{}", n)
    }
}
