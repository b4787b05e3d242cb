//! Smart Home AI Core
//!
//! Real-time hazard decision engine: turns periodic sensor snapshots into
//! debounced alarm commands.

pub mod api;
pub mod constants;
pub mod logic;
