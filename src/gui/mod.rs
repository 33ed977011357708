//! egui front end: main window plus the two overlay viewports

mod app;
mod components;
mod constants;
mod overlays;

use anyhow::{Result, anyhow};
use eframe::{NativeOptions, egui};

pub use app::Launch;
use app::AutoShakeApp;
use constants::*;

pub fn run_gui(launch: Launch) -> Result<()> {
    let options = NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([WINDOW_WIDTH, WINDOW_HEIGHT])
            .with_min_inner_size([WINDOW_MIN_WIDTH, WINDOW_MIN_HEIGHT])
            .with_title("AutoShake"),
        ..Default::default()
    };

    eframe::run_native(
        "AutoShake",
        options,
        Box::new(|cc| Ok(Box::new(AutoShakeApp::new(cc, launch)?))),
    )
    .map_err(|err| anyhow!("Failed to launch egui app: {err}"))
}
