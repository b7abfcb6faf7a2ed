//! Shared types for the checksum checker
//!
//! Types used by the checker worker and by anything else that reads the
//! fixity tables: the result taxonomy, status and history records, content
//! object references, the unified error system and time helpers.

pub mod error;
pub mod models;
pub mod util;

// Re-exports
pub use serde::{Deserialize, Serialize};

pub use models::{
    BitstreamInfo, ChecksumHistory, ChecksumHistoryCreate, ChecksumResult, DsoRecord, DsoRef,
    DsoType, MostRecentChecksum, ParseModelError,
};
