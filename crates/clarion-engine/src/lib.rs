//! Engine crate: the coordinator, the JSON command surface, and runtime
//! configuration for the `clarion` binary.

pub mod commands;
pub mod config;
pub mod coordinator;

pub use commands::{dispatch, Command};
pub use config::Config;
pub use coordinator::{is_fresh, Coordinator, ANALYSIS_TTL_MS, MAX_RECORD_AGE_MS};
