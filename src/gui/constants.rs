//! GUI-specific constants for layout, colors and overlay behavior

use egui;

/// Main window dimensions
pub const WINDOW_WIDTH: f32 = 600.0;
pub const WINDOW_HEIGHT: f32 = 400.0;
pub const WINDOW_MIN_WIDTH: f32 = 420.0;
pub const WINDOW_MIN_HEIGHT: f32 = 300.0;

/// Layout spacing
pub const PADDING: f32 = 10.0;
pub const SECTION_SPACING: f32 = 15.0;
pub const ITEM_SPACING: f32 = 8.0;
pub const FORM_LABEL_WIDTH: f32 = 110.0;

/// Status colors
pub const STATUS_ACTIVE: egui::Color32 = egui::Color32::from_rgb(0, 200, 0);
pub const STATUS_INACTIVE: egui::Color32 = egui::Color32::from_rgb(200, 0, 0);
pub const STATUS_WARNING: egui::Color32 = egui::Color32::from_rgb(200, 200, 0);

/// Region box appearance
pub const REGION_FILL: egui::Color32 = egui::Color32::from_rgba_premultiplied(0, 30, 77, 77);
pub const REGION_STROKE: egui::Color32 = egui::Color32::from_rgb(0, 100, 255);
pub const REGION_STROKE_WIDTH: f32 = 2.0;
pub const RESIZE_HANDLE_COLOR: egui::Color32 = egui::Color32::from_rgb(0, 100, 0);
pub const RESIZE_HANDLE_SIZE: f32 = 20.0;

/// Status overlay appearance
pub const STATUS_OVERLAY_WIDTH: f32 = 150.0;
pub const STATUS_OVERLAY_HEIGHT: f32 = 24.0;
pub const STATUS_OVERLAY_FILL: egui::Color32 = egui::Color32::from_black_alpha(180);

/// A drag whose geometry stops changing for this long counts as released
pub const DRAG_SETTLE_MS: u64 = 300;

/// Viewport ids
pub const REGION_VIEWPORT: &str = "autoshake_region_box";
pub const STATUS_VIEWPORT: &str = "autoshake_status_overlay";
