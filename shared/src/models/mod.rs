//! Data models
//!
//! Persisted as JSON values in the checker's redb tables.
//! Bitstream and container IDs are `u64` (redb keys sort numerically).

pub mod checksum;
pub mod dso;

// Re-exports
pub use checksum::*;
pub use dso::*;

use thiserror::Error;

/// Errors produced when parsing model values from user input
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseModelError {
    #[error("Unknown checksum result: {0}")]
    UnknownResult(String),
    #[error("Unknown object type: {0}")]
    UnknownType(String),
    #[error("Invalid object reference: {0} (expected TYPE.ID)")]
    InvalidReference(String),
}
