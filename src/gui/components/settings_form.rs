//! Settings tab: hotkey fields, overlay switch and "Save & Apply"

use eframe::egui;

use crate::config::Config;
use crate::error::Error;
use crate::gui::constants::*;
use crate::hotkeys::{BindingStatus, HotkeyAction};

/// Edit buffers; the config is only touched on "Save & Apply"
pub struct SettingsFormState {
    toggle_box: String,
    toggle_action: String,
    exit_app: String,
    enable_overlay: bool,
    message: Option<(String, egui::Color32)>,
}

impl SettingsFormState {
    pub fn from_config(config: &Config) -> Self {
        Self {
            toggle_box: config.hotkeys.toggle_box.clone(),
            toggle_action: config.hotkeys.toggle_action.clone(),
            exit_app: config.hotkeys.exit_app.clone(),
            enable_overlay: config.ui.enable_overlay,
            message: None,
        }
    }

    /// Copy the buffers into `config`, trimming whitespace around combos
    pub fn apply_to(&self, config: &mut Config) {
        config.hotkeys.toggle_box = self.toggle_box.trim().to_string();
        config.hotkeys.toggle_action = self.toggle_action.trim().to_string();
        config.hotkeys.exit_app = self.exit_app.trim().to_string();
        config.ui.enable_overlay = self.enable_overlay;
    }

    /// Summarize the outcome of the last apply for display under the button
    pub fn set_result(&mut self, save_error: Option<String>, hotkey_failures: &[Error]) {
        self.message = Some(match (save_error, hotkey_failures.len()) {
            (Some(err), _) => (format!("Failed to save settings: {err}"), STATUS_INACTIVE),
            (None, 0) => ("Settings saved".to_string(), STATUS_ACTIVE),
            (None, n) => (format!("Settings saved, {n} hotkey(s) disabled"), STATUS_WARNING),
        });
    }

    fn buffer(&mut self, action: HotkeyAction) -> &mut String {
        match action {
            HotkeyAction::ToggleBox => &mut self.toggle_box,
            HotkeyAction::ToggleAction => &mut self.toggle_action,
            HotkeyAction::ExitApp => &mut self.exit_app,
        }
    }
}

/// Note shown under the overlay switch while it is off
pub fn overlay_hint(enable_overlay: bool) -> Option<&'static str> {
    (!enable_overlay).then_some("The indicator stays hidden while detection runs, even when started by hotkey")
}

/// Renders the form and returns true when "Save & Apply" was clicked
pub fn ui(
    ui: &mut egui::Ui,
    state: &mut SettingsFormState,
    status: impl Fn(HotkeyAction) -> Option<BindingStatus>,
) -> bool {
    let mut apply = false;

    ui.group(|ui| {
        ui.label(egui::RichText::new("Hotkeys").strong());
        ui.label("Combos use global-hotkey syntax, e.g. F3 or ctrl+shift+KeyS");
        ui.add_space(ITEM_SPACING);

        egui::Grid::new("hotkey_grid")
            .num_columns(3)
            .spacing([ITEM_SPACING, ITEM_SPACING])
            .show(ui, |ui| {
                for action in HotkeyAction::ALL {
                    ui.add_sized([FORM_LABEL_WIDTH, 20.0], egui::Label::new(action.label()));
                    ui.text_edit_singleline(state.buffer(action));
                    match status(action) {
                        Some(BindingStatus::Registered) => {
                            ui.colored_label(STATUS_ACTIVE, "active");
                        }
                        Some(BindingStatus::Disabled(reason)) => {
                            ui.colored_label(STATUS_INACTIVE, "disabled").on_hover_text(reason);
                        }
                        None => {
                            ui.colored_label(STATUS_WARNING, "unavailable");
                        }
                    }
                    ui.end_row();
                }
            });
    });

    ui.add_space(SECTION_SPACING);

    ui.group(|ui| {
        ui.label(egui::RichText::new("Status Overlay").strong());
        ui.checkbox(&mut state.enable_overlay, "Show floating status indicator");
        if let Some(hint) = overlay_hint(state.enable_overlay) {
            ui.colored_label(STATUS_WARNING, hint);
        }
    });

    ui.add_space(SECTION_SPACING);

    ui.horizontal(|ui| {
        if ui.button("Save & Apply").clicked() {
            apply = true;
        }
        if let Some((text, color)) = &state.message {
            ui.colored_label(*color, text);
        }
    });

    apply
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_form_roundtrips_config_fields() {
        let mut config = Config::default();
        let mut form = SettingsFormState::from_config(&config);
        *form.buffer(HotkeyAction::ExitApp) = "  ctrl+KeyQ ".to_string();
        form.enable_overlay = false;

        form.apply_to(&mut config);
        assert_eq!(config.hotkeys.exit_app, "ctrl+KeyQ");
        assert_eq!(config.hotkeys.toggle_box, "F3");
        assert!(!config.ui.enable_overlay);
    }

    #[test]
    fn test_overlay_hint_only_when_disabled() {
        assert_eq!(overlay_hint(true), None);
        assert!(overlay_hint(false).unwrap().contains("stays hidden"));
    }

    #[test]
    fn test_result_message_reports_disabled_hotkeys() {
        let mut form = SettingsFormState::from_config(&Config::default());
        let failures = vec![Error::HotkeyRegistration {
            action: HotkeyAction::ToggleBox,
            combo: "###".to_string(),
            reason: "invalid".to_string(),
        }];

        form.set_result(None, &failures);
        let (text, color) = form.message.clone().unwrap();
        assert!(text.contains("1 hotkey(s) disabled"));
        assert_eq!(color, STATUS_WARNING);

        form.set_result(Some("disk full".to_string()), &[]);
        assert!(form.message.unwrap().0.contains("disk full"));
    }
}
