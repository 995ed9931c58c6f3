pub mod bucket_page;
pub mod codec;
pub mod comparator;
pub mod directory_page;
pub mod disk_extendible_hash_table;
pub mod hash_function;
pub mod header_page;

use serde::{de::DeserializeOwned, Serialize};

pub use bucket_page::ExtendibleHtableBucketPage;
pub use comparator::{DefaultComparator, IntComparator, StorageComparator};
pub use directory_page::ExtendibleHtableDirectoryPage;
pub use disk_extendible_hash_table::DiskExtendibleHashTable;
pub use hash_function::{DefaultHashFunction, HashFunction};
pub use header_page::ExtendibleHtableHeaderPage;

/// Bound satisfied by any key the index can store: cheap to clone, and
/// serializable into a bucket page's on-disk payload.
pub trait StorageKey: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {}
impl<T> StorageKey for T where T: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {}

/// Bound satisfied by any value the index can store.
pub trait StorageValue: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {}
impl<T> StorageValue for T where T: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {}
