//! Logic Module - Decision Engine
//!
//! ## Pipeline
//! `store` → `snapshot` → `features` → `model` → `alarm` → `dispatch`,
//! driven by `analysis_loop` and observed through `status`.

// Data path
pub mod snapshot;
pub mod features;
pub mod model;
pub mod alarm;
pub mod dispatch;

// Outside world
pub mod store;
pub mod config;
pub mod status;

// Tick loop
pub mod analysis_loop;
