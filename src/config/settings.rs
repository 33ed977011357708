//! Typed configuration with built-in defaults
//!
//! Every section and key has a serde default, so deserializing a partial file yields a fully
//! populated [`Config`]. Nothing downstream deals with missing keys.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::constants::{config::*, pacing, validation};
use crate::types::{CaptureRegion, OverlayPosition};

/// Everything persisted between runs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    #[serde(rename = "capture-region")]
    pub capture_region: CaptureRegion,
    pub hotkeys: HotkeyBindings,
    pub ui: UiSettings,
    pub detection: DetectionSettings,
}

impl Default for CaptureRegion {
    fn default() -> Self {
        Self {
            x: DEFAULT_REGION_X,
            y: DEFAULT_REGION_Y,
            width: DEFAULT_REGION_WIDTH,
            height: DEFAULT_REGION_HEIGHT,
        }
    }
}

/// Key combinations for the three global actions
///
/// An empty or unparsable value leaves that action without a hotkey.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HotkeyBindings {
    pub toggle_box: String,
    pub toggle_action: String,
    pub exit_app: String,
}

impl Default for HotkeyBindings {
    fn default() -> Self {
        Self {
            toggle_box: DEFAULT_TOGGLE_BOX.to_string(),
            toggle_action: DEFAULT_TOGGLE_ACTION.to_string(),
            exit_app: DEFAULT_EXIT_APP.to_string(),
        }
    }
}

/// Status overlay visibility and placement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiSettings {
    pub enable_overlay: bool,
    pub status_x: i32,
    pub status_y: i32,
}

impl UiSettings {
    pub fn status_position(&self) -> OverlayPosition {
        OverlayPosition::new(self.status_x, self.status_y)
    }

    pub fn set_status_position(&mut self, position: OverlayPosition) {
        self.status_x = position.x;
        self.status_y = position.y;
    }
}

impl Default for UiSettings {
    fn default() -> Self {
        Self {
            enable_overlay: true,
            status_x: DEFAULT_STATUS_X,
            status_y: DEFAULT_STATUS_Y,
        }
    }
}

/// What the loop does on a hit and how fast it may spin
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionSettings {
    /// Key tapped on every positive cycle
    pub trigger_key: String,
    /// Minimum milliseconds between cycle starts (0 = capture-bound)
    pub min_cycle_ms: u64,
}

impl Default for DetectionSettings {
    fn default() -> Self {
        Self {
            trigger_key: DEFAULT_TRIGGER_KEY.to_string(),
            min_cycle_ms: pacing::DEFAULT_MIN_CYCLE_MS,
        }
    }
}

impl Config {
    /// Clamp values into their supported ranges
    ///
    /// Returns true when anything was changed so the caller can persist the corrected file.
    pub fn validate_and_clamp(&mut self) -> bool {
        let mut changed = false;
        let region = &mut self.capture_region;

        for (name, side) in [("width", &mut region.width), ("height", &mut region.height)] {
            if *side < validation::MIN_REGION_SIDE {
                warn!(side = name, value = *side, min = validation::MIN_REGION_SIDE, "capture region side below minimum, clamping");
                *side = validation::MIN_REGION_SIDE;
                changed = true;
            } else if *side > validation::MAX_REGION_SIDE {
                warn!(side = name, value = *side, max = validation::MAX_REGION_SIDE, "capture region side exceeds maximum, clamping");
                *side = validation::MAX_REGION_SIDE;
                changed = true;
            }
        }

        if self.detection.min_cycle_ms > pacing::MAX_MIN_CYCLE_MS {
            warn!(min_cycle_ms = self.detection.min_cycle_ms, max = pacing::MAX_MIN_CYCLE_MS, "min_cycle_ms exceeds maximum, clamping");
            self.detection.min_cycle_ms = pacing::MAX_MIN_CYCLE_MS;
            changed = true;
        }

        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.capture_region, CaptureRegion::new(122, 40, 1162, 586));
        assert_eq!(config.hotkeys.toggle_box, "F3");
        assert_eq!(config.hotkeys.toggle_action, "F4");
        assert_eq!(config.hotkeys.exit_app, "F5");
        assert!(config.ui.enable_overlay);
        assert_eq!(config.ui.status_position(), OverlayPosition::new(85, 1));
        assert_eq!(config.detection.trigger_key, "enter");
        assert_eq!(config.detection.min_cycle_ms, 10);
    }

    #[test]
    fn test_partial_sections_are_backfilled() {
        let contents = r#"
[capture-region]
x = 10
width = 300

[hotkeys]
exit_app = "ctrl+KeyQ"
"#;
        let config: Config = toml::from_str(contents).unwrap();
        assert_eq!(config.capture_region, CaptureRegion::new(10, 40, 300, 586));
        assert_eq!(config.hotkeys.toggle_box, "F3");
        assert_eq!(config.hotkeys.exit_app, "ctrl+KeyQ");
        assert_eq!(config.ui, UiSettings::default());
        assert_eq!(config.detection, DetectionSettings::default());
    }

    #[test]
    fn test_unknown_keys_are_ignored_by_the_schema() {
        let contents = r#"
theme = "dark"

[ui]
enable_overlay = false
font = "mono"
"#;
        let config: Config = toml::from_str(contents).unwrap();
        assert!(!config.ui.enable_overlay);
    }

    #[test]
    fn test_wrong_type_is_a_parse_error() {
        let contents = r#"
[capture-region]
width = "wide"
"#;
        assert!(toml::from_str::<Config>(contents).is_err());
    }

    #[test]
    fn test_validate_and_clamp_fixes_region_and_interval() {
        let mut config = Config::default();
        config.capture_region.width = 0;
        config.capture_region.height = 100_000;
        config.detection.min_cycle_ms = 60_000;

        assert!(config.validate_and_clamp());
        assert_eq!(config.capture_region.width, 1);
        assert_eq!(config.capture_region.height, 16384);
        assert_eq!(config.detection.min_cycle_ms, 1000);

        // Second pass has nothing left to fix
        assert!(!config.validate_and_clamp());
    }
}
