//! Shared utilities for evolve.
//!
//! - Logging setup with tracing
//! - Injectable clocks for time-gated behavior

pub mod clock;
pub mod log;

pub use clock::{Clock, ManualClock, SharedClock, SystemClock};
