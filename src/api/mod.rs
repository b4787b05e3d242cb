//! API Module
//!
//! Read-only polling surface over a running engine.
//!
//! Usage:
//! - `api::get_engine_status(&handle)` - status summary
//! - `api::get_decision_history(&handle, 20)` - recent decisions
//! - `api::decision_from_command("ALARM:FIRE")` - decode a queued command

pub mod engine_status;

pub use engine_status::*;
