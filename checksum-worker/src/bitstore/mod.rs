//! 位流存储 - 按 bitstream id 读取原始字节
//!
//! | Implementation | Backing | Use |
//! |----------------|---------|-----|
//! | [`FileBitstreamStore`] | assetstore directory tree | production |
//! | [`MemoryBitstreamStore`] | in-process map | tests and tooling |

mod file;
mod memory;

pub use file::FileBitstreamStore;
pub use memory::MemoryBitstreamStore;

use crate::db::StorageError;
use std::io::Read;
use thiserror::Error;

/// Failure to obtain a byte stream
#[derive(Debug, Error)]
pub enum RetrieveError {
    /// The bytes are not in storage
    #[error("Bitstream {0} not found in storage")]
    NotFound(u64),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Supporting metadata could not be loaded
    #[error("Repository error: {0}")]
    Repository(#[from] StorageError),
}

/// 位流字节来源
pub trait BitstreamStore: Send + Sync {
    /// Open a readable stream over the stored bytes.
    ///
    /// The caller owns the stream; dropping it releases the underlying handle.
    fn retrieve(&self, bitstream_id: u64) -> Result<Box<dyn Read + '_>, RetrieveError>;
}
