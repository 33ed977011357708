//! Shared state between the UI thread and the detection loop

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, info};

use crate::types::{CaptureRegion, DetectionState};

/// Why [`RunControl::wait_for_active_or_stop`] returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wake {
    Active,
    Stop,
}

#[derive(Debug, Default)]
struct RunState {
    active: bool,
    stopping: bool,
}

/// Enable/disable switch plus the stop request, guarded by one lock
///
/// Every mutation notifies the condition variable, so a loop parked in
/// [`wait_for_active_or_stop`](Self::wait_for_active_or_stop) or [`pause`](Self::pause) reacts
/// immediately.
#[derive(Debug, Default)]
pub struct RunControl {
    state: Mutex<RunState>,
    changed: Condvar,
}

impl RunControl {
    pub fn new(active: bool) -> Self {
        Self {
            state: Mutex::new(RunState { active, stopping: false }),
            changed: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, RunState> {
        // The state is two plain flags; a panicked holder cannot leave them torn
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Ignored once stop has been requested
    pub fn set_active(&self, active: bool) -> DetectionState {
        let mut state = self.lock();
        if !state.stopping && state.active != active {
            state.active = active;
            info!(active, "Detection toggled");
            self.changed.notify_all();
        }
        DetectionState::from_active(state.active)
    }

    pub fn toggle(&self) -> DetectionState {
        let mut state = self.lock();
        if !state.stopping {
            state.active = !state.active;
            info!(active = state.active, "Detection toggled");
            self.changed.notify_all();
        }
        DetectionState::from_active(state.active)
    }

    /// Terminal: clears the active flag and wakes every waiter
    pub fn request_stop(&self) {
        let mut state = self.lock();
        if !state.stopping {
            debug!("Stop requested");
        }
        state.stopping = true;
        state.active = false;
        self.changed.notify_all();
    }

    pub fn is_active(&self) -> bool {
        self.lock().active
    }

    pub fn is_stopping(&self) -> bool {
        self.lock().stopping
    }

    pub fn state(&self) -> DetectionState {
        DetectionState::from_active(self.is_active())
    }

    /// Block without spinning until detection is enabled or stop is requested
    pub fn wait_for_active_or_stop(&self) -> Wake {
        let guard = self.lock();
        let state = self
            .changed
            .wait_while(guard, |s| !s.active && !s.stopping)
            .unwrap_or_else(PoisonError::into_inner);
        if state.stopping { Wake::Stop } else { Wake::Active }
    }

    /// Sleep for up to `duration`, cut short by deactivation or stop
    ///
    /// Returns true when the full duration elapsed while still active.
    pub fn pause(&self, duration: Duration) -> bool {
        if duration.is_zero() {
            return self.is_active();
        }
        let guard = self.lock();
        let (state, _) = self
            .changed
            .wait_timeout_while(guard, duration, |s| s.active && !s.stopping)
            .unwrap_or_else(PoisonError::into_inner);
        state.active && !state.stopping
    }
}

/// Latest capture region, copied out whole so the loop never sees a half-updated rectangle
#[derive(Debug, Default)]
pub struct RegionCell {
    region: Mutex<CaptureRegion>,
}

impl RegionCell {
    pub fn new(region: CaptureRegion) -> Self {
        Self { region: Mutex::new(region) }
    }

    pub fn get(&self) -> CaptureRegion {
        *self.region.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set(&self, region: CaptureRegion) {
        *self.region.lock().unwrap_or_else(PoisonError::into_inner) = region;
    }
}
