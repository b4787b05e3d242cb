//! Alarm Module
//!
//! Turns a stream of per-tick predictions into sustained, debounced decisions.
//!
//! ## Structure
//! - `types`: `ClassLabel`, `Decision`
//! - `rules`: per-class confirmation thresholds
//! - `confirm`: `AlarmState`, the hysteresis machine
//!
//! ## Usage
//! ```ignore
//! let mut state = AlarmState::new();
//! let decision = state.observe(ClassLabel::Gas, &AlarmThresholds::default());
//! assert_eq!(decision, Decision::Normal); // 1/3, not confirmed yet
//! ```

pub mod types;
pub mod rules;
pub mod confirm;


pub use types::{ClassLabel, Decision};
pub use rules::AlarmThresholds;
pub use confirm::{AlarmPhase, AlarmState};
