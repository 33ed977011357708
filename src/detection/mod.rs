//! The capture-detect-act core

pub mod control;
pub mod shape;
pub mod worker;

pub use control::{RegionCell, RunControl};
pub use shape::ShapeDetector;
pub use worker::{EventSink, LoopEvent, LoopShared};
