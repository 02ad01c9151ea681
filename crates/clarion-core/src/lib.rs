pub mod error;
pub mod storage;
pub mod types;

pub use error::{ClarionError, Result};
pub use storage::{RedbStore, Store, CURRENT_SCHEMA_VERSION, DEBATE_HISTORY_CAP};
pub use types::*;
