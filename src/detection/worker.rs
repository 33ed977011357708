//! Capture -> detect -> act loop on its own thread

use std::io;
use std::sync::Arc;
use std::sync::mpsc::Sender;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, trace, warn};

use super::control::{RegionCell, RunControl, Wake};
use super::shape::ShapeDetector;
use crate::action::Action;
use crate::capture::FrameSource;
use crate::types::DetectionState;

/// Notifications from the loop to the UI
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopEvent {
    StateChanged(DetectionState),
    Triggered,
}

/// Channel to the UI plus a callback that wakes its event loop
pub struct EventSink {
    tx: Sender<LoopEvent>,
    wake: Box<dyn Fn() + Send>,
}

impl EventSink {
    pub fn new(tx: Sender<LoopEvent>, wake: impl Fn() + Send + 'static) -> Self {
        Self { tx, wake: Box::new(wake) }
    }

    fn emit(&self, event: LoopEvent) {
        // A closed receiver only means the UI is already gone
        if self.tx.send(event).is_ok() {
            (self.wake)();
        }
    }
}

/// Handles the UI keeps to steer the loop
#[derive(Clone)]
pub struct LoopShared {
    pub control: Arc<RunControl>,
    pub region: Arc<RegionCell>,
}

enum CycleOutcome {
    Offscreen,
    NoFrame,
    Miss,
    Hit,
    DispatchFailed,
}

pub struct DetectionLoop<S, A> {
    shared: LoopShared,
    source: S,
    action: A,
    detector: ShapeDetector,
    min_cycle: Duration,
    events: EventSink,
    reported: DetectionState,
}

impl<S: FrameSource, A: Action> DetectionLoop<S, A> {
    pub fn new(shared: LoopShared, source: S, action: A, min_cycle: Duration, events: EventSink) -> Self {
        Self {
            shared,
            source,
            action,
            detector: ShapeDetector::default(),
            min_cycle,
            events,
            reported: DetectionState::Inactive,
        }
    }

    /// Run until stop is requested, then release the capture backend
    pub fn run(mut self) {
        info!(min_cycle_ms = self.min_cycle.as_millis() as u64, "Detection loop started");

        while self.shared.control.wait_for_active_or_stop() == Wake::Active {
            self.report(DetectionState::Active);

            let started = Instant::now();
            match self.run_cycle() {
                CycleOutcome::Hit => self.events.emit(LoopEvent::Triggered),
                CycleOutcome::Offscreen => trace!("Capture region off screen, skipping"),
                CycleOutcome::NoFrame | CycleOutcome::Miss | CycleOutcome::DispatchFailed => {}
            }

            // Also bounds the spin rate while the region is off screen
            if let Some(rest) = self.min_cycle.checked_sub(started.elapsed()) {
                self.shared.control.pause(rest);
            }

            let state = self.shared.control.state();
            if state == DetectionState::Inactive {
                self.report(state);
            }
        }

        self.source.release();
        self.report(DetectionState::Inactive);
        info!("Detection loop stopped");
    }

    fn run_cycle(&mut self) -> CycleOutcome {
        let region = self.shared.region.get();
        let Some(rect) = self
            .source
            .screen_bounds()
            .and_then(|bounds| region.clamp_to(bounds))
        else {
            return CycleOutcome::Offscreen;
        };

        let Some(frame) = self.source.capture(rect) else {
            return CycleOutcome::NoFrame;
        };

        if !self.detector.detect(&frame) {
            trace!(width = frame.width(), height = frame.height(), "No shape");
            return CycleOutcome::Miss;
        }

        match self.action.trigger() {
            Ok(()) => {
                debug!(region = %region, "Shape detected, action fired");
                CycleOutcome::Hit
            }
            Err(err) => {
                warn!(error = %err, "Action dispatch failed");
                CycleOutcome::DispatchFailed
            }
        }
    }

    fn report(&mut self, state: DetectionState) {
        if self.reported != state {
            self.reported = state;
            self.events.emit(LoopEvent::StateChanged(state));
        }
    }
}

/// Start the loop thread
///
/// `backends` runs on the new thread, so capture and input handles never cross threads.
pub fn spawn<S, A, F>(
    shared: LoopShared,
    min_cycle: Duration,
    events: EventSink,
    backends: F,
) -> io::Result<JoinHandle<()>>
where
    S: FrameSource + 'static,
    A: Action + 'static,
    F: FnOnce() -> (S, A) + Send + 'static,
{
    thread::Builder::new()
        .name("detection".to_string())
        .spawn(move || {
            let (source, action) = backends();
            DetectionLoop::new(shared, source, action, min_cycle, events).run();
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::types::{CaptureRegion, ScreenRect};
    use image::{Rgba, RgbaImage};
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc::{self, Receiver};

    #[derive(Default)]
    struct Counters {
        bounds: AtomicUsize,
        captures: AtomicUsize,
        triggers: AtomicUsize,
        releases: AtomicUsize,
        wakes: AtomicUsize,
    }

    impl Counters {
        fn get(counter: &AtomicUsize) -> usize {
            counter.load(Ordering::SeqCst)
        }
    }

    /// Serves scripted frames, then a fallback frame (or nothing) forever
    struct ScriptedSource {
        counters: Arc<Counters>,
        screen: ScreenRect,
        frames: VecDeque<RgbaImage>,
        fallback: Option<RgbaImage>,
        requested: Arc<Mutex<Vec<ScreenRect>>>,
    }

    impl FrameSource for ScriptedSource {
        fn screen_bounds(&mut self) -> Option<ScreenRect> {
            self.counters.bounds.fetch_add(1, Ordering::SeqCst);
            Some(self.screen)
        }

        fn capture(&mut self, rect: ScreenRect) -> Option<RgbaImage> {
            self.counters.captures.fetch_add(1, Ordering::SeqCst);
            self.requested.lock().unwrap().push(rect);
            self.frames.pop_front().or_else(|| self.fallback.clone())
        }

        fn release(&mut self) {
            self.counters.releases.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct CountingAction {
        counters: Arc<Counters>,
        fail: bool,
    }

    impl Action for CountingAction {
        fn trigger(&mut self) -> crate::error::Result<()> {
            if self.fail {
                return Err(Error::ActionDispatch("backend unavailable".to_string()));
            }
            self.counters.triggers.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct Harness {
        shared: LoopShared,
        counters: Arc<Counters>,
        requested: Arc<Mutex<Vec<ScreenRect>>>,
        events: Receiver<LoopEvent>,
        handle: Option<JoinHandle<()>>,
    }

    impl Harness {
        fn start(
            region: CaptureRegion,
            active: bool,
            frames: Vec<RgbaImage>,
            fallback: Option<RgbaImage>,
            fail_action: bool,
        ) -> Self {
            let shared = LoopShared {
                control: Arc::new(RunControl::new(active)),
                region: Arc::new(RegionCell::new(region)),
            };
            let counters = Arc::new(Counters::default());
            let requested = Arc::new(Mutex::new(Vec::new()));
            let (tx, rx) = mpsc::channel();

            let wake_counters = Arc::clone(&counters);
            let sink = EventSink::new(tx, move || {
                wake_counters.wakes.fetch_add(1, Ordering::SeqCst);
            });

            let source = ScriptedSource {
                counters: Arc::clone(&counters),
                screen: ScreenRect::from_origin_size(0, 0, 1920, 1080),
                frames: frames.into(),
                fallback,
                requested: Arc::clone(&requested),
            };
            let action = CountingAction { counters: Arc::clone(&counters), fail: fail_action };

            let handle = spawn(shared.clone(), Duration::from_millis(1), sink, move || (source, action)).unwrap();
            Self { shared, counters, requested, events: rx, handle: Some(handle) }
        }

        fn stop(&mut self) {
            self.shared.control.request_stop();
            if let Some(handle) = self.handle.take() {
                handle.join().unwrap();
            }
        }

        fn events(&self) -> Vec<LoopEvent> {
            self.events.try_iter().collect()
        }
    }

    fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if condition() {
                return true;
            }
            thread::sleep(Duration::from_millis(2));
        }
        condition()
    }

    fn frame_with_square(side: u32) -> RgbaImage {
        let mut frame = RgbaImage::from_pixel(1162, 586, Rgba([0, 0, 0, 255]));
        for y in 10..10 + side {
            for x in 10..10 + side {
                frame.put_pixel(x, y, Rgba([255, 255, 255, 255]));
            }
        }
        frame
    }

    fn default_region() -> CaptureRegion {
        CaptureRegion::new(122, 40, 1162, 586)
    }

    #[test]
    fn test_50px_square_fires_exactly_once() {
        let mut harness = Harness::start(default_region(), true, vec![frame_with_square(50)], None, false);

        assert!(wait_until(|| Counters::get(&harness.counters.captures) >= 3));
        harness.stop();

        assert_eq!(Counters::get(&harness.counters.triggers), 1);
        let requested = harness.requested.lock().unwrap();
        assert_eq!(requested[0], ScreenRect { left: 122, top: 40, right: 1284, bottom: 626 });

        let events = harness.events();
        assert_eq!(events.iter().filter(|e| **e == LoopEvent::Triggered).count(), 1);
        assert_eq!(events.first(), Some(&LoopEvent::StateChanged(DetectionState::Active)));
        assert!(Counters::get(&harness.counters.wakes) >= events.len());
    }

    #[test]
    fn test_30px_square_never_fires() {
        let mut harness = Harness::start(default_region(), true, Vec::new(), Some(frame_with_square(30)), false);

        assert!(wait_until(|| Counters::get(&harness.counters.captures) >= 5));
        harness.stop();

        assert_eq!(Counters::get(&harness.counters.triggers), 0);
        assert!(!harness.events().contains(&LoopEvent::Triggered));
    }

    #[test]
    fn test_persistent_shape_retriggers_every_cycle() {
        let mut harness = Harness::start(default_region(), true, Vec::new(), Some(frame_with_square(60)), false);

        assert!(wait_until(|| Counters::get(&harness.counters.triggers) >= 3));
        harness.stop();
        assert_eq!(
            Counters::get(&harness.counters.triggers),
            Counters::get(&harness.counters.captures)
        );
    }

    #[test]
    fn test_offscreen_region_never_captures() {
        let region = CaptureRegion::new(5000, 5000, 200, 200);
        let mut harness = Harness::start(region, true, Vec::new(), Some(frame_with_square(60)), false);

        assert!(wait_until(|| Counters::get(&harness.counters.bounds) >= 5));
        harness.stop();

        assert_eq!(Counters::get(&harness.counters.captures), 0);
        assert_eq!(Counters::get(&harness.counters.triggers), 0);
    }

    #[test]
    fn test_region_update_applies_next_cycle() {
        let region = CaptureRegion::new(5000, 5000, 200, 200);
        let mut harness = Harness::start(region, true, Vec::new(), None, false);

        assert!(wait_until(|| Counters::get(&harness.counters.bounds) >= 2));
        harness.shared.region.set(CaptureRegion::new(-10, 0, 100, 100));
        assert!(wait_until(|| Counters::get(&harness.counters.captures) >= 1));
        harness.stop();

        let requested = harness.requested.lock().unwrap();
        assert_eq!(requested[0], ScreenRect { left: 0, top: 0, right: 90, bottom: 100 });
    }

    #[test]
    fn test_deactivation_stops_captures() {
        let mut harness = Harness::start(default_region(), true, Vec::new(), None, false);

        assert!(wait_until(|| Counters::get(&harness.counters.captures) >= 3));
        harness.shared.control.set_active(false);
        assert!(wait_until(|| harness
            .events()
            .contains(&LoopEvent::StateChanged(DetectionState::Inactive))));

        let settled = Counters::get(&harness.counters.captures);
        thread::sleep(Duration::from_millis(50));
        assert_eq!(Counters::get(&harness.counters.captures), settled);

        // Reactivation resumes capturing
        harness.shared.control.set_active(true);
        assert!(wait_until(|| Counters::get(&harness.counters.captures) > settled));
        harness.stop();
    }

    #[test]
    fn test_inactive_loop_does_nothing_until_enabled() {
        let mut harness = Harness::start(default_region(), false, Vec::new(), None, false);

        thread::sleep(Duration::from_millis(30));
        assert_eq!(Counters::get(&harness.counters.bounds), 0);
        assert!(harness.events().is_empty());

        harness.shared.control.toggle();
        assert!(wait_until(|| Counters::get(&harness.counters.captures) >= 1));
        harness.stop();
    }

    #[test]
    fn test_stop_exits_and_releases_capture() {
        let mut idle = Harness::start(default_region(), false, Vec::new(), None, false);
        idle.stop();
        assert_eq!(Counters::get(&idle.counters.releases), 1);

        let mut busy = Harness::start(default_region(), true, Vec::new(), None, false);
        assert!(wait_until(|| Counters::get(&busy.counters.captures) >= 1));
        busy.stop();
        assert_eq!(Counters::get(&busy.counters.releases), 1);
        assert_eq!(
            busy.events().last(),
            Some(&LoopEvent::StateChanged(DetectionState::Inactive))
        );
    }

    #[test]
    fn test_dispatch_failure_is_a_miss() {
        let mut harness = Harness::start(default_region(), true, Vec::new(), Some(frame_with_square(60)), true);

        assert!(wait_until(|| Counters::get(&harness.counters.captures) >= 3));
        harness.stop();

        assert_eq!(Counters::get(&harness.counters.triggers), 0);
        assert!(!harness.events().contains(&LoopEvent::Triggered));
    }
}
