//! Convenience re-exports of the types most callers need: the buffer pool
//! and its guards, the disk manager, and the extendible hash index with its
//! default comparator/hash function.

pub use crate::buffer::{BufferPoolManager, LRUKReplacer};
pub use crate::common::config::{PageId, BUSTUB_PAGE_SIZE, INVALID_PAGE_ID};
pub use crate::common::error::{BustubError, Result};
pub use crate::container::hash::{
    DefaultComparator, DefaultHashFunction, DiskExtendibleHashTable, HashFunction, IntComparator,
    StorageComparator,
};
pub use crate::storage::disk::DiskManager;
pub use crate::storage::page::{BasicPageGuard, Page, ReadPageGuard, WritePageGuard};
