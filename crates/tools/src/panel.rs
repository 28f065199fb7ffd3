use cubecam_common::Color;
use cubecam_render::FrameStats;
use cubecam_scene::{Config, Helper, SceneSettings};

/// Allowed field of view, degrees.
const FOV_RANGE: std::ops::RangeInclusive<f32> = 1.0..=179.0;

/// One edit made through the panel, ready to apply to live scene state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PanelChange {
    Background(Color),
    FieldOfView(f32),
    Helper(Helper, bool),
}

impl PanelChange {
    pub fn apply(&self, settings: &mut impl SceneSettings) {
        match *self {
            PanelChange::Background(color) => settings.set_background(color),
            PanelChange::FieldOfView(degrees) => settings.set_field_of_view(degrees),
            PanelChange::Helper(helper, visible) => settings.set_helper_visible(helper, visible),
        }
    }
}

/// Commands that turn a stage configured with `before` into one configured
/// with `after`, in panel order.
pub fn config_changes(before: &Config, after: &Config) -> Vec<PanelChange> {
    let mut changes = Vec::new();
    if before.background != after.background {
        changes.push(PanelChange::Background(after.background));
    }
    if before.fov != after.fov {
        changes.push(PanelChange::FieldOfView(after.fov));
    }
    if before.grid != after.grid {
        changes.push(PanelChange::Helper(Helper::Grid, after.grid));
    }
    if before.axes != after.axes {
        changes.push(PanelChange::Helper(Helper::Axes, after.axes));
    }
    changes
}

/// Floating "Controls" window in the top-right corner.
#[derive(Debug, Clone)]
pub struct DebugPanel {
    visible: bool,
}

impl Default for DebugPanel {
    fn default() -> Self {
        Self { visible: true }
    }
}

impl DebugPanel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn toggle(&mut self) {
        self.visible = !self.visible;
    }

    /// Draw the panel, writing edits into `config`. Returns the edits made
    /// this frame; the caller applies them.
    pub fn show(&mut self, ctx: &egui::Context, config: &mut Config) -> Vec<PanelChange> {
        if !self.visible {
            return Vec::new();
        }
        let before = *config;

        egui::Window::new("Controls")
            .anchor(egui::Align2::RIGHT_TOP, [-8.0, 8.0])
            .resizable(false)
            .collapsible(true)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    // Written back only when edited; 8-bit sRGB is lossy.
                    let mut rgb = config.background.to_srgb8();
                    if ui.color_edit_button_srgb(&mut rgb).changed() {
                        config.background = Color::from_srgb8(rgb);
                    }
                    ui.label("bg");
                });

                egui::CollapsingHeader::new("camera")
                    .default_open(false)
                    .show(ui, |ui| {
                        ui.horizontal(|ui| {
                            ui.add(
                                egui::DragValue::new(&mut config.fov)
                                    .speed(0.1)
                                    .range(FOV_RANGE),
                            );
                            ui.label("fov");
                        });
                    });

                ui.checkbox(&mut config.grid, "grid");
                ui.checkbox(&mut config.axes, "axes");
            });

        let changes = config_changes(&before, config);
        for change in &changes {
            tracing::debug!(?change, "panel change");
        }
        changes
    }
}

/// Frame rate and frame time in the top-left corner.
pub fn stats_overlay(ctx: &egui::Context, stats: &FrameStats) {
    egui::Area::new(egui::Id::new("frame_stats"))
        .anchor(egui::Align2::LEFT_TOP, [8.0, 8.0])
        .interactable(false)
        .show(ctx, |ui| {
            ui.label(egui::RichText::new(stats.to_string()).monospace());
        });
}
