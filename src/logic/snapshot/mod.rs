//! Snapshot Module
//!
//! Raw telemetry rows → typed `SensorSnapshot`.
//!
//! ## Structure
//! - `types`: `RawRecord`, `SensorSnapshot`, schema constants
//! - `parser`: tolerant attribute-string parsing + alias resolution

pub mod types;
pub mod parser;

pub use types::{RawRecord, SensorSnapshot, REQUIRED_FIELDS, SNAPSHOT_SCHEMA_VERSION};
pub use parser::{parse_details, parse_record, parse_snapshot};
