//! Crate error taxonomy: exhaustion, not-found, invalid-argument and I/O
//! failures. Locally recoverable conditions (a cache miss, a bucket that
//! needs to split) are handled inside their component and never surface as
//! an error.

use thiserror::Error;

use super::config::{FrameId, PageId};

#[derive(Error, Debug)]
pub enum BustubError {
    #[error("no evictable frame available to satisfy the request")]
    BufferPoolFull,

    #[error("page {0} not found in the buffer pool")]
    PageNotFound(PageId),

    #[error("frame id {0} is out of range for this replacer")]
    InvalidFrameId(FrameId),

    #[error("page {0} is still pinned and cannot be deleted")]
    PageStillPinned(PageId),

    #[error("directory is already at its maximum depth")]
    DirectoryAtMaxDepth,

    #[error("disk I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, BustubError>;
