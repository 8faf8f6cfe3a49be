//! Periodic sweep engine.
//!
//! Sweeps are registered in code with fixed cadences: simple intervals
//! (reminder delivery, cache purge, conversation expiry) or UK-clock-aligned
//! weekly slots (catalog refresh, weekly announcement). The engine polls
//! once a second, runs at most one instance of each sweep, and drains
//! in-flight sweeps with a bounded grace on shutdown.

mod engine;
mod schedule;
mod types;

pub use engine::SweepEngine;
pub use schedule::compute_next_run;
pub use types::{Cadence, Sweep, SweepError};
