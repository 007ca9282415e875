//! Time-driven event lifecycle.
//!
//! Three triggers are registered when an event is created:
//!
//! - a confirm check 30 minutes before start (`Waiting` → `Canceled`,
//!   `Full` → `Confirmed`),
//! - a start trigger at the start time (→ `Disputing`),
//! - a finish trigger at the end time (`Disputing` → `Finished`).
//!
//! [`scheduler`] owns the triggers and when they fire; [`engine`] owns
//! what a fired trigger means. Transitions are a pure function of the
//! event's current status, so re-delivering a trigger can never
//! double-transition.

pub mod engine;
pub mod scheduler;
