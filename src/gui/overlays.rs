//! Borderless always-on-top viewports: the capture region box and the status indicator
//!
//! Both are moved by dragging anywhere inside them; the region box also has a resize handle in
//! its bottom-right corner. The OS performs the actual move or resize, so the new geometry is
//! read back from the viewport and committed once the user lets go.

use eframe::egui;
use std::time::{Duration, Instant};

use super::constants::*;
use crate::constants::validation::MIN_RESIZE_SIDE;
use crate::types::{CaptureRegion, DetectionState, OverlayPosition};

/// Turns a stream of observed window geometries into "user finished" commits
///
/// Only geometry changes that follow a user grab are considered; placement noise from the
/// window manager is ignored. A change is committed when the button is released or, since some
/// platforms swallow the release after an OS-driven move, when it has been stable for
/// [`DRAG_SETTLE_MS`].
#[derive(Debug)]
pub struct DragTracker<T> {
    committed: T,
    pending: Option<(T, Instant)>,
    interacting: bool,
    settle: Duration,
}

impl<T: Copy + PartialEq> DragTracker<T> {
    pub fn new(committed: T) -> Self {
        Self {
            committed,
            pending: None,
            interacting: false,
            settle: Duration::from_millis(DRAG_SETTLE_MS),
        }
    }

    pub fn begin(&mut self) {
        self.interacting = true;
    }

    pub fn is_interacting(&self) -> bool {
        self.interacting
    }

    /// Feed the current geometry; returns the new value when it should be persisted
    pub fn observe(&mut self, current: T, button_down: bool, now: Instant) -> Option<T> {
        if !self.interacting {
            return None;
        }

        match self.pending {
            Some((value, _)) if value == current => {}
            _ => self.pending = Some((current, now)),
        }
        let (value, since) = self.pending?;

        let settled = !button_down || now.duration_since(since) >= self.settle;
        if !settled {
            return None;
        }

        self.pending = None;
        if !button_down {
            self.interacting = false;
        }
        if value == self.committed {
            return None;
        }
        self.committed = value;
        Some(value)
    }
}

/// Physical pixels to egui points
pub fn region_to_points(region: CaptureRegion, pixels_per_point: f32) -> (egui::Pos2, egui::Vec2) {
    (
        egui::pos2(region.x as f32 / pixels_per_point, region.y as f32 / pixels_per_point),
        egui::vec2(region.width as f32 / pixels_per_point, region.height as f32 / pixels_per_point),
    )
}

/// egui points to physical pixels, never below one pixel per side
pub fn rect_to_region(rect: egui::Rect, pixels_per_point: f32) -> CaptureRegion {
    CaptureRegion::new(
        (rect.min.x * pixels_per_point).round() as i32,
        (rect.min.y * pixels_per_point).round() as i32,
        (rect.width() * pixels_per_point).round().max(1.0) as u32,
        (rect.height() * pixels_per_point).round().max(1.0) as u32,
    )
}

fn pos_to_position(pos: egui::Pos2, pixels_per_point: f32) -> OverlayPosition {
    OverlayPosition::new(
        (pos.x * pixels_per_point).round() as i32,
        (pos.y * pixels_per_point).round() as i32,
    )
}

fn overlay_builder(title: &str) -> egui::ViewportBuilder {
    egui::ViewportBuilder::default()
        .with_title(title)
        .with_decorations(false)
        .with_transparent(true)
        .with_window_level(egui::WindowLevel::AlwaysOnTop)
        .with_taskbar(false)
}

/// Move the viewport on a drag anywhere in `rect`
fn drag_to_move<T: Copy + PartialEq>(ui: &mut egui::Ui, rect: egui::Rect, tracker: &mut DragTracker<T>) {
    let body = ui.interact(rect, ui.id().with("body"), egui::Sense::drag());
    if body.drag_started_by(egui::PointerButton::Primary) {
        ui.ctx().send_viewport_cmd(egui::ViewportCommand::StartDrag);
        tracker.begin();
    }
}

fn observe<T: Copy + PartialEq>(ctx: &egui::Context, tracker: &mut DragTracker<T>, current: Option<T>) -> Option<T> {
    let down = ctx.input(|i| i.pointer.primary_down());
    let committed = current.and_then(|value| tracker.observe(value, down, Instant::now()));
    if tracker.is_interacting() {
        ctx.request_repaint_after(Duration::from_millis(DRAG_SETTLE_MS));
    }
    committed
}

pub struct RegionBox {
    visible: bool,
    tracker: DragTracker<CaptureRegion>,
}

impl RegionBox {
    pub fn new(region: CaptureRegion) -> Self {
        Self { visible: false, tracker: DragTracker::new(region) }
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Returns the new visibility
    pub fn toggle(&mut self) -> bool {
        self.visible = !self.visible;
        self.visible
    }

    /// Draw the box at `region`; returns the new region once a move or resize completes
    pub fn show(&mut self, ctx: &egui::Context, region: CaptureRegion) -> Option<CaptureRegion> {
        if !self.visible {
            return None;
        }

        let ppp = ctx.pixels_per_point();
        let (position, size) = region_to_points(region, ppp);
        let min_side = MIN_RESIZE_SIDE as f32 / ppp;
        let builder = overlay_builder("Capture Region")
            .with_resizable(true)
            .with_position(position)
            .with_inner_size(size)
            .with_min_inner_size([min_side, min_side]);

        let tracker = &mut self.tracker;
        ctx.show_viewport_immediate(
            egui::ViewportId::from_hash_of(REGION_VIEWPORT),
            builder,
            |ctx, _class| {
                let frame = egui::Frame::new()
                    .fill(REGION_FILL)
                    .stroke(egui::Stroke::new(REGION_STROKE_WIDTH, REGION_STROKE));

                egui::CentralPanel::default().frame(frame).show(ctx, |ui| {
                    let full = ui.max_rect();
                    drag_to_move(ui, full, tracker);

                    let handle_rect = egui::Rect::from_min_max(
                        full.max - egui::vec2(RESIZE_HANDLE_SIZE, RESIZE_HANDLE_SIZE),
                        full.max,
                    );
                    let handle = ui.interact(handle_rect, ui.id().with("resize"), egui::Sense::drag());
                    if handle.drag_started_by(egui::PointerButton::Primary) {
                        ctx.send_viewport_cmd(egui::ViewportCommand::BeginResize(
                            egui::ResizeDirection::SouthEast,
                        ));
                        tracker.begin();
                    }
                    if handle.hovered() {
                        ctx.set_cursor_icon(egui::CursorIcon::ResizeSouthEast);
                    }

                    let painter = ui.painter();
                    painter.rect_filled(handle_rect, 0.0, RESIZE_HANDLE_COLOR);
                    painter.text(
                        full.center(),
                        egui::Align2::CENTER_CENTER,
                        "Capture Region",
                        egui::FontId::proportional(14.0),
                        egui::Color32::WHITE,
                    );
                });

                let ppp = ctx.pixels_per_point();
                let current = ctx.input(|i| i.viewport().inner_rect).map(|r| rect_to_region(r, ppp));
                observe(ctx, tracker, current)
            },
        )
    }
}

pub struct StatusOverlay {
    tracker: DragTracker<OverlayPosition>,
}

impl StatusOverlay {
    pub fn new(position: OverlayPosition) -> Self {
        Self { tracker: DragTracker::new(position) }
    }

    /// Returns the new position once a drag completes
    pub fn show(
        &mut self,
        ctx: &egui::Context,
        position: OverlayPosition,
        state: DetectionState,
    ) -> Option<OverlayPosition> {
        let ppp = ctx.pixels_per_point();
        let builder = overlay_builder("AutoShake Status")
            .with_resizable(false)
            .with_position(egui::pos2(position.x as f32 / ppp, position.y as f32 / ppp))
            .with_inner_size([STATUS_OVERLAY_WIDTH, STATUS_OVERLAY_HEIGHT]);

        let tracker = &mut self.tracker;
        ctx.show_viewport_immediate(
            egui::ViewportId::from_hash_of(STATUS_VIEWPORT),
            builder,
            |ctx, _class| {
                let frame = egui::Frame::new().fill(STATUS_OVERLAY_FILL).corner_radius(5.0);
                egui::CentralPanel::default().frame(frame).show(ctx, |ui| {
                    let full = ui.max_rect();
                    drag_to_move(ui, full, tracker);
                    ui.painter().text(
                        full.center(),
                        egui::Align2::CENTER_CENTER,
                        status_text(state),
                        egui::FontId::proportional(13.0),
                        status_color(state),
                    );
                });

                let ppp = ctx.pixels_per_point();
                let current = ctx.input(|i| i.viewport().outer_rect).map(|r| pos_to_position(r.min, ppp));
                observe(ctx, tracker, current)
            },
        )
    }
}

pub fn status_text(state: DetectionState) -> String {
    format!("AutoShake: {}", state.label())
}

pub fn status_color(state: DetectionState) -> egui::Color32 {
    if state.is_active() { STATUS_ACTIVE } else { STATUS_INACTIVE }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(base: Instant, offset: u64) -> Instant {
        base + Duration::from_millis(offset)
    }

    #[test]
    fn test_tracker_ignores_changes_without_grab() {
        let mut tracker = DragTracker::new(OverlayPosition::new(85, 1));
        let now = Instant::now();
        assert_eq!(tracker.observe(OverlayPosition::new(0, 0), false, now), None);
        assert!(!tracker.is_interacting());
    }

    #[test]
    fn test_tracker_commits_on_release() {
        let mut tracker = DragTracker::new(OverlayPosition::new(85, 1));
        let t0 = Instant::now();
        tracker.begin();

        assert_eq!(tracker.observe(OverlayPosition::new(90, 5), true, t0), None);
        assert_eq!(tracker.observe(OverlayPosition::new(120, 40), true, ms(t0, 10)), None);
        assert_eq!(
            tracker.observe(OverlayPosition::new(120, 40), false, ms(t0, 20)),
            Some(OverlayPosition::new(120, 40))
        );
        assert!(!tracker.is_interacting());
    }

    #[test]
    fn test_tracker_commits_after_settle_when_release_is_lost() {
        let mut tracker = DragTracker::new(OverlayPosition::new(0, 0));
        let t0 = Instant::now();
        tracker.begin();

        assert_eq!(tracker.observe(OverlayPosition::new(50, 50), true, t0), None);
        assert_eq!(tracker.observe(OverlayPosition::new(50, 50), true, ms(t0, 100)), None);
        assert_eq!(
            tracker.observe(OverlayPosition::new(50, 50), true, ms(t0, DRAG_SETTLE_MS)),
            Some(OverlayPosition::new(50, 50))
        );

        // Still holding: a later move is committed too
        assert_eq!(tracker.observe(OverlayPosition::new(70, 50), true, ms(t0, 400)), None);
        assert_eq!(
            tracker.observe(OverlayPosition::new(70, 50), false, ms(t0, 410)),
            Some(OverlayPosition::new(70, 50))
        );
    }

    #[test]
    fn test_tracker_click_without_move_commits_nothing() {
        let region = CaptureRegion::new(122, 40, 1162, 586);
        let mut tracker = DragTracker::new(region);
        tracker.begin();
        assert_eq!(tracker.observe(region, false, Instant::now()), None);
        assert!(!tracker.is_interacting());
    }

    #[test]
    fn test_points_pixels_conversion_roundtrips() {
        let region = CaptureRegion::new(122, 40, 1162, 586);
        for ppp in [1.0, 1.25, 1.5, 2.0] {
            let (pos, size) = region_to_points(region, ppp);
            let rect = egui::Rect::from_min_size(pos, size);
            assert_eq!(rect_to_region(rect, ppp), region, "ppp {ppp}");
        }
    }

    #[test]
    fn test_rect_to_region_keeps_positive_size() {
        let rect = egui::Rect::from_min_size(egui::pos2(-3.0, 4.0), egui::vec2(0.0, 0.2));
        assert_eq!(rect_to_region(rect, 1.0), CaptureRegion::new(-3, 4, 1, 1));
    }

    #[test]
    fn test_status_text_and_color() {
        assert_eq!(status_text(DetectionState::Active), "AutoShake: Active");
        assert_eq!(status_color(DetectionState::Inactive), STATUS_INACTIVE);
    }
}
