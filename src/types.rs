//! Geometry and state types shared between the detection loop, the GUI and the config

use serde::{Deserialize, Serialize};
use std::fmt;

/// Screen-space rectangle the detection loop watches
///
/// Origin is the top-left corner of the primary display. The user moves and resizes it
/// through the region overlay; the loop clamps it to the display before every capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureRegion {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl CaptureRegion {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Edge representation, right/bottom exclusive
    pub fn to_rect(self) -> ScreenRect {
        ScreenRect {
            left: self.x,
            top: self.y,
            right: self.x.saturating_add(self.width.min(i32::MAX as u32) as i32),
            bottom: self.y.saturating_add(self.height.min(i32::MAX as u32) as i32),
        }
    }

    /// Part of this region that is actually on screen, `None` when nothing is
    pub fn clamp_to(self, bounds: ScreenRect) -> Option<ScreenRect> {
        self.to_rect().intersect(bounds)
    }
}

impl fmt::Display for CaptureRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}+{}+{}", self.width, self.height, self.x, self.y)
    }
}

/// Rectangle by edges, right/bottom exclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenRect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl ScreenRect {
    pub fn from_origin_size(x: i32, y: i32, width: u32, height: u32) -> Self {
        CaptureRegion::new(x, y, width, height).to_rect()
    }

    pub fn width(&self) -> u32 {
        (i64::from(self.right) - i64::from(self.left)).clamp(0, u32::MAX as i64) as u32
    }

    pub fn height(&self) -> u32 {
        (i64::from(self.bottom) - i64::from(self.top)).clamp(0, u32::MAX as i64) as u32
    }

    pub fn is_empty(&self) -> bool {
        self.right <= self.left || self.bottom <= self.top
    }

    /// Shift by `(dx, dy)`, saturating at the `i32` range
    pub fn translate(&self, dx: i32, dy: i32) -> ScreenRect {
        ScreenRect {
            left: self.left.saturating_add(dx),
            top: self.top.saturating_add(dy),
            right: self.right.saturating_add(dx),
            bottom: self.bottom.saturating_add(dy),
        }
    }

    /// Overlap of two rectangles; a zero-area overlap counts as no overlap
    pub fn intersect(&self, other: ScreenRect) -> Option<ScreenRect> {
        let rect = ScreenRect {
            left: self.left.max(other.left),
            top: self.top.max(other.top),
            right: self.right.min(other.right),
            bottom: self.bottom.min(other.bottom),
        };
        if rect.is_empty() { None } else { Some(rect) }
    }
}

/// Top-left corner of the floating status indicator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OverlayPosition {
    pub x: i32,
    pub y: i32,
}

impl OverlayPosition {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Whether the detection loop is allowed to capture and act
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DetectionState {
    #[default]
    Inactive,
    Active,
}

impl DetectionState {
    pub fn from_active(active: bool) -> Self {
        if active { Self::Active } else { Self::Inactive }
    }

    pub fn is_active(self) -> bool {
        matches!(self, Self::Active)
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Active => "Active",
            Self::Inactive => "Inactive",
        }
    }
}

/// Requests posted to the UI thread by hotkeys and signal handlers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppCommand {
    ToggleRegionOverlay,
    ToggleDetection,
    Exit,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn primary_1080p() -> ScreenRect {
        ScreenRect::from_origin_size(0, 0, 1920, 1080)
    }

    #[test]
    fn test_region_inside_screen_is_unchanged() {
        let region = CaptureRegion::new(122, 40, 1162, 586);
        let clamped = region.clamp_to(primary_1080p()).unwrap();
        assert_eq!(clamped, ScreenRect { left: 122, top: 40, right: 1284, bottom: 626 });
        assert_eq!(clamped.width(), 1162);
        assert_eq!(clamped.height(), 586);
    }

    #[test]
    fn test_region_partially_offscreen_is_clipped() {
        let region = CaptureRegion::new(-100, 1000, 300, 200);
        let clamped = region.clamp_to(primary_1080p()).unwrap();
        assert_eq!(clamped, ScreenRect { left: 0, top: 1000, right: 200, bottom: 1080 });
    }

    #[test]
    fn test_region_fully_offscreen_has_no_intersection() {
        let region = CaptureRegion::new(5000, 5000, 100, 100);
        assert_eq!(region.clamp_to(primary_1080p()), None);

        // Touching the edge is still zero area
        let touching = CaptureRegion::new(1920, 0, 100, 100);
        assert_eq!(touching.clamp_to(primary_1080p()), None);
    }

    #[test]
    fn test_region_clamps_against_offset_primary() {
        let primary = ScreenRect::from_origin_size(1920, 0, 2560, 1440);
        let region = CaptureRegion::new(1900, 100, 200, 200);
        assert_eq!(
            region.clamp_to(primary),
            Some(ScreenRect { left: 1920, top: 100, right: 2100, bottom: 300 })
        );
        assert_eq!(
            primary.translate(-1920, 0),
            ScreenRect::from_origin_size(0, 0, 2560, 1440)
        );
    }

    #[test]
    fn test_huge_region_does_not_overflow() {
        let region = CaptureRegion::new(i32::MAX - 10, 0, u32::MAX, 10);
        let rect = region.to_rect();
        assert_eq!(rect.right, i32::MAX);
        assert_eq!(region.clamp_to(primary_1080p()), None);
    }

    #[test]
    fn test_detection_state_helpers() {
        assert_eq!(DetectionState::default(), DetectionState::Inactive);
        assert!(DetectionState::from_active(true).is_active());
        assert_eq!(DetectionState::from_active(false).label(), "Inactive");
    }
}
