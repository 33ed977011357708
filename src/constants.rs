//! Application-wide constants
//!
//! Single source of truth for thresholds, defaults and file names.

/// Shape detector tuning
pub mod detection {
    /// Luminance at or above this value counts as foreground (0-255 scale)
    pub const BRIGHTNESS_THRESHOLD: u8 = 240;

    /// A component qualifies when its bounding box is strictly wider than this
    pub const MIN_BOX_WIDTH: u32 = 40;

    /// A component qualifies when its bounding box is strictly taller than this
    pub const MIN_BOX_HEIGHT: u32 = 40;
}

/// Detection loop pacing
pub mod pacing {
    /// Default minimum time between two cycles in milliseconds
    pub const DEFAULT_MIN_CYCLE_MS: u64 = 10;

    /// Upper bound accepted from the config file
    pub const MAX_MIN_CYCLE_MS: u64 = 1000;

    /// How long a cached monitor handle is trusted before re-enumerating displays
    pub const MONITOR_REFRESH_MS: u64 = 2000;
}

/// Config file location and built-in defaults
pub mod config {
    /// Directory under the platform config dir
    pub const APP_DIR: &str = "autoshake";

    /// Config file name
    pub const FILENAME: &str = "autoshake.toml";

    pub const DEFAULT_REGION_X: i32 = 122;
    pub const DEFAULT_REGION_Y: i32 = 40;
    pub const DEFAULT_REGION_WIDTH: u32 = 1162;
    pub const DEFAULT_REGION_HEIGHT: u32 = 586;

    pub const DEFAULT_TOGGLE_BOX: &str = "F3";
    pub const DEFAULT_TOGGLE_ACTION: &str = "F4";
    pub const DEFAULT_EXIT_APP: &str = "F5";

    pub const DEFAULT_STATUS_X: i32 = 85;
    pub const DEFAULT_STATUS_Y: i32 = 1;

    pub const DEFAULT_TRIGGER_KEY: &str = "enter";
}

/// Bounds applied when validating a loaded config
pub mod validation {
    /// Region sides below this are raised to it
    pub const MIN_REGION_SIDE: u32 = 1;

    /// Region sides above this are clamped
    pub const MAX_REGION_SIDE: u32 = 16384;

    /// Smallest region side reachable through the resize handle
    pub const MIN_RESIZE_SIDE: u32 = 50;
}
