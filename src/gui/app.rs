//! Main window, command handling and shutdown

use std::sync::Arc;
use std::sync::mpsc::{self, Receiver};
use std::thread::JoinHandle;
use std::time::Duration;

use anyhow::{Context, Result};
use eframe::{CreationContext, egui};
use tracing::{error, info, warn};

use super::components::settings_form::{self, SettingsFormState};
use super::constants::*;
use super::overlays::{RegionBox, StatusOverlay, status_color, status_text};
use crate::action::KeyTap;
use crate::capture::ScreenCapture;
use crate::config::{Config, ConfigStore};
use crate::detection::{EventSink, LoopEvent, LoopShared, RegionCell, RunControl, worker};
use crate::hotkeys::{self, BindingStatus, GlobalHotkeyBackend, HotkeyAction, HotkeyBackend, HotkeyRegistry};
use crate::types::{AppCommand, DetectionState};

/// Everything `main` resolves before the window opens
pub struct Launch {
    pub store: ConfigStore,
    pub config: Config,
    pub start_active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tab {
    Home,
    Settings,
}

pub struct AutoShakeApp {
    store: ConfigStore,
    config: Config,
    shared: LoopShared,
    detection_thread: Option<JoinHandle<()>>,
    loop_events: Receiver<LoopEvent>,
    commands: Receiver<AppCommand>,
    hotkeys: Option<HotkeyRegistry<GlobalHotkeyBackend>>,
    form: SettingsFormState,
    region_box: RegionBox,
    status_overlay: StatusOverlay,
    state: DetectionState,
    trigger_count: u64,
    tab: Tab,
    shut_down: bool,
}

impl AutoShakeApp {
    pub fn new(cc: &CreationContext<'_>, launch: Launch) -> Result<Self> {
        info!("Initializing egui app");
        let Launch { store, config, start_active } = launch;
        let ctx = cc.egui_ctx.clone();

        let shared = LoopShared {
            control: Arc::new(RunControl::new(start_active)),
            region: Arc::new(RegionCell::new(config.capture_region)),
        };

        let (event_tx, loop_events) = mpsc::channel();
        let repaint = ctx.clone();
        let sink = EventSink::new(event_tx, move || repaint.request_repaint());
        let trigger_key = config.detection.trigger_key.clone();
        let detection_thread = worker::spawn(
            shared.clone(),
            Duration::from_millis(config.detection.min_cycle_ms),
            sink,
            move || (ScreenCapture::new(), KeyTap::from_name(&trigger_key)),
        )
        .context("Failed to spawn detection thread")?;

        let (command_tx, commands) = mpsc::channel();

        let hotkeys = match GlobalHotkeyBackend::new() {
            Ok(backend) => {
                let mut registry = HotkeyRegistry::new(backend);
                registry.apply(&config.hotkeys);
                let repaint = ctx.clone();
                hotkeys::install_event_handler(registry.action_map(), command_tx.clone(), move || {
                    repaint.request_repaint()
                });
                Some(registry)
            }
            Err(err) => {
                error!(error = ?err, "Hotkeys unavailable");
                warn!(continuing = true, "Continuing without hotkey support...");
                None
            }
        };

        #[cfg(unix)]
        {
            let repaint = ctx.clone();
            if let Err(err) = crate::signals::spawn_listener(command_tx, move || repaint.request_repaint()) {
                warn!(error = ?err, "Signals will not trigger a clean shutdown");
            }
        }

        Ok(Self {
            form: SettingsFormState::from_config(&config),
            region_box: RegionBox::new(config.capture_region),
            status_overlay: StatusOverlay::new(config.ui.status_position()),
            store,
            config,
            shared,
            detection_thread: Some(detection_thread),
            loop_events,
            commands,
            hotkeys,
            state: DetectionState::Inactive,
            trigger_count: 0,
            tab: Tab::Home,
            shut_down: false,
        })
    }

    fn process_commands(&mut self, ctx: &egui::Context) {
        while let Ok(command) = self.commands.try_recv() {
            info!(command = ?command, "Handling command");
            match command {
                AppCommand::ToggleRegionOverlay => self.toggle_region_box(),
                AppCommand::ToggleDetection => {
                    self.shared.control.toggle();
                }
                AppCommand::Exit => {
                    self.shutdown();
                    ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                }
            }
        }
    }

    fn process_loop_events(&mut self) {
        while let Ok(event) = self.loop_events.try_recv() {
            match event {
                LoopEvent::StateChanged(state) => {
                    info!(state = state.label(), "Detection state changed");
                    self.state = state;
                }
                LoopEvent::Triggered => self.trigger_count += 1,
            }
        }
    }

    fn toggle_region_box(&mut self) {
        toggle_region_box(&mut self.region_box, &self.config, &self.store);
    }

    fn persist(&self, reason: &str) {
        persist(&self.store, &self.config, reason);
    }

    fn save_and_apply(&mut self) {
        save_and_apply(&mut self.form, &mut self.config, &self.store, self.hotkeys.as_mut());
    }

    fn hotkey_status(&self, action: HotkeyAction) -> Option<BindingStatus> {
        self.hotkeys.as_ref().and_then(|r| r.status(action).cloned())
    }

    fn hotkey_summary(&self) -> String {
        HotkeyAction::ALL
            .iter()
            .map(|&action| {
                let combo = match action {
                    HotkeyAction::ToggleBox => &self.config.hotkeys.toggle_box,
                    HotkeyAction::ToggleAction => &self.config.hotkeys.toggle_action,
                    HotkeyAction::ExitApp => &self.config.hotkeys.exit_app,
                };
                let short = match action {
                    HotkeyAction::ToggleBox => "Box",
                    HotkeyAction::ToggleAction => "Start/Stop",
                    HotkeyAction::ExitApp => "Exit",
                };
                match self.hotkey_status(action) {
                    Some(BindingStatus::Registered) => format!("{combo}: {short}"),
                    _ => format!("{short}: disabled"),
                }
            })
            .collect::<Vec<_>>()
            .join(" | ")
    }

    fn home_ui(&mut self, ui: &mut egui::Ui) {
        ui.label("Watches the capture region for a bright box and presses a key when one appears.");
        ui.add_space(SECTION_SPACING);

        ui.group(|ui| {
            ui.label(egui::RichText::new("Status").strong());
            ui.colored_label(status_color(self.state), egui::RichText::new(status_text(self.state)).strong());
            ui.label(format!("Triggers this session: {}", self.trigger_count));
            ui.label(format!("Region: {}", self.config.capture_region));
        });

        ui.add_space(SECTION_SPACING);

        ui.horizontal(|ui| {
            let toggle_label = if self.shared.control.is_active() { "Stop" } else { "Start" };
            if ui.button(toggle_label).clicked() {
                self.shared.control.toggle();
            }
            let box_label = if self.region_box.is_visible() { "Hide Capture Box" } else { "Show Capture Box" };
            if ui.button(box_label).clicked() {
                self.toggle_region_box();
            }
        });

        ui.add_space(SECTION_SPACING);
        ui.label(self.hotkey_summary());
    }

    fn show_overlays(&mut self, ctx: &egui::Context) {
        if let Some(region) = self.region_box.show(ctx, self.config.capture_region) {
            info!(region = %region, "Capture region moved");
            self.config.capture_region = region;
            self.shared.region.set(region);
            self.persist("region box released");
        }

        if self.config.ui.enable_overlay
            && let Some(position) = self.status_overlay.show(ctx, self.config.ui.status_position(), self.state)
        {
            info!(x = position.x, y = position.y, "Status overlay moved");
            self.config.ui.set_status_position(position);
            self.persist("status overlay released");
        }
    }

    /// Stop and join the loop, then persist; safe to call more than once
    fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;
        info!("Shutting down");

        self.shared.control.request_stop();
        if let Some(handle) = self.detection_thread.take()
            && handle.join().is_err()
        {
            error!("Detection thread panicked");
        }
        self.persist("shutdown");
    }
}

fn persist(store: &ConfigStore, config: &Config, reason: &str) {
    if let Err(err) = store.save(config) {
        error!(error = ?err, reason, "Failed to save config");
    }
}

/// Show or hide the region box; hiding it is the "done positioning" gesture and saves
fn toggle_region_box(region_box: &mut RegionBox, config: &Config, store: &ConfigStore) {
    if !region_box.toggle() {
        persist(store, config, "region box hidden");
    }
}

/// Commit the form into `config`, save it and re-register hotkeys
fn save_and_apply<B: HotkeyBackend>(
    form: &mut SettingsFormState,
    config: &mut Config,
    store: &ConfigStore,
    hotkeys: Option<&mut HotkeyRegistry<B>>,
) {
    form.apply_to(config);
    let save_error = store.save(config).err().map(|err| format!("{err:#}"));
    if let Some(err) = &save_error {
        error!(error = %err, "Failed to save settings");
    }

    let failures = match hotkeys {
        Some(registry) => registry.apply(&config.hotkeys),
        None => Vec::new(),
    };
    info!(
        overlay = config.ui.enable_overlay,
        disabled_hotkeys = failures.len(),
        "Settings applied"
    );
    form.set_result(save_error, &failures);
}

impl eframe::App for AutoShakeApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.process_commands(ctx);
        self.process_loop_events();

        if ctx.input(|i| i.viewport().close_requested()) {
            self.shutdown();
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.add_space(PADDING);
            ui.horizontal(|ui| {
                ui.heading("AutoShake");
                ui.add_space(SECTION_SPACING);
                ui.selectable_value(&mut self.tab, Tab::Home, "Home");
                ui.selectable_value(&mut self.tab, Tab::Settings, "Settings");
            });
            ui.separator();
            ui.add_space(ITEM_SPACING);

            match self.tab {
                Tab::Home => self.home_ui(ui),
                Tab::Settings => {
                    let statuses: Vec<_> = HotkeyAction::ALL.iter().map(|&a| (a, self.hotkey_status(a))).collect();
                    let status = |action| statuses.iter().find(|(a, _)| *a == action).and_then(|(_, s)| s.clone());
                    if settings_form::ui(ui, &mut self.form, status) {
                        self.save_and_apply();
                    }
                }
            }
        });

        if !self.shared.control.is_stopping() {
            self.show_overlays(ctx);
        }
    }

    fn clear_color(&self, _visuals: &egui::Visuals) -> [f32; 4] {
        // Overlay viewports are see-through
        [0.0, 0.0, 0.0, 0.0]
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        self.shutdown();
        info!("App exiting");
    }
}
