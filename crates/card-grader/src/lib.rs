//! Deterministic card grading: turns a structured defect report into a whole-number
//! grade with an auditable breakdown, then runs a downward-only validation pass.

pub mod config;
pub mod error;
pub mod grading;
pub mod telemetry;
