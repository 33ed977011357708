//! Screen capture backed by xcap
//!
//! Coordinates are desktop coordinates, the same space the overlay windows are placed in; the
//! primary display sits at its own offset within it (usually the origin). The monitor handle is
//! cached between cycles and re-enumerated every [`MONITOR_REFRESH_MS`] or after any failure,
//! so hot-plugging or resolution changes are picked up without restarting.

use image::RgbaImage;
use image::imageops;
use std::time::{Duration, Instant};
use tracing::{debug, info};
use xcap::Monitor;

use crate::constants::pacing::MONITOR_REFRESH_MS;
use crate::error::{Error, Result};
use crate::types::ScreenRect;

/// Where the detection loop gets its pixels from
pub trait FrameSource {
    /// Extent of the primary display, `None` when it cannot be determined right now
    fn screen_bounds(&mut self) -> Option<ScreenRect>;

    /// Pixels inside `rect`, `None` on any transient failure
    fn capture(&mut self, rect: ScreenRect) -> Option<RgbaImage>;

    /// Drop any OS handles held between captures
    fn release(&mut self);
}

struct CachedMonitor {
    monitor: Monitor,
    bounds: ScreenRect,
    fetched_at: Instant,
}

#[derive(Default)]
pub struct ScreenCapture {
    cached: Option<CachedMonitor>,
}

impl ScreenCapture {
    pub fn new() -> Self {
        Self::default()
    }

    fn monitor(&mut self) -> Result<&CachedMonitor> {
        let stale = self
            .cached
            .as_ref()
            .is_none_or(|c| c.fetched_at.elapsed() >= Duration::from_millis(MONITOR_REFRESH_MS));
        if stale {
            self.cached = Some(Self::primary_monitor()?);
        }
        self.cached
            .as_ref()
            .ok_or_else(|| Error::TransientCapture("no monitor cached".to_string()))
    }

    fn primary_monitor() -> Result<CachedMonitor> {
        let monitors = Monitor::all()
            .map_err(|err| Error::TransientCapture(format!("failed to enumerate monitors: {err}")))?;
        let monitor = monitors
            .iter()
            .find(|m| m.is_primary())
            .or(monitors.first())
            .cloned()
            .ok_or_else(|| Error::TransientCapture("no monitor found".to_string()))?;

        let bounds =
            ScreenRect::from_origin_size(monitor.x(), monitor.y(), monitor.width(), monitor.height());
        debug!(
            primary = monitor.is_primary(),
            x = bounds.left,
            y = bounds.top,
            width = bounds.width(),
            height = bounds.height(),
            "Refreshed primary monitor"
        );
        Ok(CachedMonitor { monitor, bounds, fetched_at: Instant::now() })
    }

    fn grab(&mut self, rect: ScreenRect) -> Result<RgbaImage> {
        let cached = self.monitor()?;
        let screenshot = cached
            .monitor
            .capture_image()
            .map_err(|err| Error::TransientCapture(format!("capture failed: {err}")))?;
        crop_to(&screenshot, cached.bounds, rect)
            .ok_or_else(|| Error::TransientCapture(format!("{rect:?} outside captured frame")))
    }
}

impl FrameSource for ScreenCapture {
    fn screen_bounds(&mut self) -> Option<ScreenRect> {
        match self.monitor() {
            Ok(cached) => Some(cached.bounds),
            Err(err) => {
                debug!(error = %err, "Screen bounds unavailable");
                self.cached = None;
                None
            }
        }
    }

    fn capture(&mut self, rect: ScreenRect) -> Option<RgbaImage> {
        match self.grab(rect) {
            Ok(frame) => Some(frame),
            Err(err) => {
                debug!(error = %err, "No frame this cycle");
                self.cached = None;
                None
            }
        }
    }

    fn release(&mut self) {
        if self.cached.take().is_some() {
            info!("Released screen capture handle");
        }
    }
}

/// Cut desktop-space `rect` out of a screenshot of the monitor at `monitor`
///
/// The screenshot may be smaller than the logical monitor size on scaled displays; the crop is
/// clipped to what was actually captured.
fn crop_to(screenshot: &RgbaImage, monitor: ScreenRect, rect: ScreenRect) -> Option<RgbaImage> {
    let local = rect.translate(-monitor.left, -monitor.top);
    let captured = ScreenRect::from_origin_size(0, 0, screenshot.width(), screenshot.height());
    let visible = local.intersect(captured)?;
    let cropped = imageops::crop_imm(
        screenshot,
        visible.left as u32,
        visible.top as u32,
        visible.width(),
        visible.height(),
    )
    .to_image();
    Some(cropped)
}
