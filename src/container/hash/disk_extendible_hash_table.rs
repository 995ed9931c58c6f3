use std::hash::Hash;
use std::sync::Arc;

use crate::buffer::BufferPoolManager;
use crate::common::config::{PageId, HTABLE_DIRECTORY_MAX_DEPTH, INVALID_PAGE_ID};
use crate::common::error::BustubError;

use super::bucket_page::ExtendibleHtableBucketPage;
use super::comparator::StorageComparator;
use super::directory_page::ExtendibleHtableDirectoryPage;
use super::hash_function::{DefaultHashFunction, HashFunction};
use super::header_page::ExtendibleHtableHeaderPage;
use super::{StorageKey, StorageValue};
use crate::storage::page::WritePageGuard;

/// A three-level, disk-resident extendible hash index: a fixed header page
/// routes a key's hash to a directory page, which routes it to a bucket
/// page holding the actual `(key, value)` pairs. Every operation descends
/// the levels under latch coupling — a child's latch is taken before its
/// parent's is released — so no other thread observes the structure
/// mid-split.
pub struct DiskExtendibleHashTable<K, V, C, H = DefaultHashFunction<K>> {
    bpm: Arc<BufferPoolManager>,
    header_page_id: PageId,
    cmp: C,
    hash_fn: H,
    directory_max_depth: u32,
    bucket_max_size: u32,
    _marker: std::marker::PhantomData<fn() -> (K, V)>,
}

impl<K, V, C, H> DiskExtendibleHashTable<K, V, C, H>
where
    K: StorageKey + Hash,
    V: StorageValue,
    C: StorageComparator<K>,
    H: HashFunction<K>,
{
    /// Allocates and initializes the header page. `header_max_depth` and
    /// `directory_max_depth` are clamped to the page format's maximum; an
    /// index that never needs to grow that far pays no extra cost for the
    /// headroom, since unused directory/bucket pages are just never
    /// allocated.
    pub fn new(
        bpm: Arc<BufferPoolManager>,
        cmp: C,
        hash_fn: H,
        header_max_depth: u32,
        directory_max_depth: u32,
        bucket_max_size: u32,
    ) -> Option<Self> {
        let (header_page_id, mut header_guard) = bpm.new_page_guarded()?;
        let header = ExtendibleHtableHeaderPage::init(header_max_depth);
        header_guard.with_data_mut(|bytes| header.encode_into(bytes));
        drop(header_guard);

        Some(Self {
            bpm,
            header_page_id,
            cmp,
            hash_fn,
            directory_max_depth: directory_max_depth.min(HTABLE_DIRECTORY_MAX_DEPTH),
            bucket_max_size,
            _marker: std::marker::PhantomData,
        })
    }

    fn hash(&self, key: &K) -> u32 {
        self.hash_fn.hash_key(key)
    }

    /// Read-latches header, directory and bucket in turn, releasing each
    /// ancestor once its child's latch is held.
    pub fn get_value(&self, key: &K) -> Option<V> {
        let header_guard = self.bpm.fetch_page_read(self.header_page_id)?;
        let header = ExtendibleHtableHeaderPage::decode(header_guard.data());
        let directory_idx = header.hash_to_directory_index(self.hash(key));
        let directory_page_id = header.directory_page_id(directory_idx);
        drop(header_guard);
        if directory_page_id == INVALID_PAGE_ID {
            return None;
        }

        let directory_guard = self.bpm.fetch_page_read(directory_page_id)?;
        let directory = ExtendibleHtableDirectoryPage::decode(directory_guard.data());
        let bucket_idx = directory.hash_to_bucket_index(self.hash(key));
        let bucket_page_id = directory.bucket_page_id(bucket_idx);
        drop(directory_guard);
        if bucket_page_id == INVALID_PAGE_ID {
            return None;
        }

        let bucket_guard = self.bpm.fetch_page_read(bucket_page_id)?;
        let bucket = ExtendibleHtableBucketPage::<K, V>::decode(bucket_guard.data());
        bucket.lookup(key, &self.cmp).cloned()
    }

    /// Inserts `(key, value)`, growing the directory and splitting buckets
    /// as needed. Returns `false` for a duplicate key, or if the directory
    /// is already at `directory_max_depth` and the target bucket is full.
    pub fn insert(&self, key: K, value: V) -> bool {
        let hash = self.hash(&key);

        let mut header_guard = match self.bpm.fetch_page_write(self.header_page_id) {
            Some(g) => g,
            None => return false,
        };
        let mut header = ExtendibleHtableHeaderPage::decode(header_guard.data());
        let directory_idx = header.hash_to_directory_index(hash);
        let mut directory_page_id = header.directory_page_id(directory_idx);

        if directory_page_id == INVALID_PAGE_ID {
            let Some((new_directory_id, mut directory_guard)) = self.bpm.new_page_guarded() else {
                return false;
            };
            let directory = ExtendibleHtableDirectoryPage::init(self.directory_max_depth);
            directory_guard.with_data_mut(|bytes| directory.encode_into(bytes));
            drop(directory_guard);

            directory_page_id = new_directory_id;
            header.set_directory_page_id(directory_idx, directory_page_id);
            header.encode_into(header_guard.data_mut());
        }

        // Write-latch the directory before releasing the header: the child's
        // latch must be held before the parent's is released, so no other
        // thread can observe a directory id installed in the header with no
        // latch yet protecting the directory page itself.
        let Some(directory_guard) = self.bpm.fetch_page_write(directory_page_id) else {
            return false;
        };
        drop(header_guard);

        self.insert_into_directory(directory_guard, hash, key, value)
    }

    /// The bulk of `Insert` once a directory page's write latch is already
    /// held: ensures a bucket exists, inserts into it, and on overflow grows
    /// the directory and splits the bucket before retrying from the top.
    fn insert_into_directory(&self, mut directory_guard: WritePageGuard, hash: u32, key: K, value: V) -> bool {
        let directory_page_id = directory_guard.page_id();
        let mut directory = ExtendibleHtableDirectoryPage::decode(directory_guard.data());

        let bucket_idx = directory.hash_to_bucket_index(hash);
        let mut bucket_page_id = directory.bucket_page_id(bucket_idx);

        if bucket_page_id == INVALID_PAGE_ID {
            let Some((new_bucket_id, mut bucket_guard)) = self.bpm.new_page_guarded() else {
                return false;
            };
            let bucket = ExtendibleHtableBucketPage::<K, V>::init(self.bucket_max_size);
            bucket_guard.with_data_mut(|bytes| bucket.encode_into(bytes));
            drop(bucket_guard);

            bucket_page_id = new_bucket_id;
            directory.set_bucket_page_id(bucket_idx, bucket_page_id);
            directory.set_local_depth(bucket_idx, 0);
        }

        let Some(mut bucket_guard) = self.bpm.fetch_page_write(bucket_page_id) else {
            return false;
        };
        let mut bucket = ExtendibleHtableBucketPage::<K, V>::decode(bucket_guard.data());

        if bucket.lookup(&key, &self.cmp).is_some() {
            return false;
        }

        if !bucket.is_full() {
            bucket.insert(key, value, &self.cmp);
            bucket.encode_into(bucket_guard.data_mut());
            directory.encode_into(directory_guard.data_mut());
            return true;
        }

        let old_local_depth = directory.local_depth(bucket_idx);
        if old_local_depth == directory.global_depth() {
            if directory.global_depth() >= directory.max_depth() {
                return false;
            }
            directory.incr_global_depth();
        }
        directory.incr_local_depth(bucket_idx);
        let new_local_depth = directory.local_depth(bucket_idx);
        let discriminator = 1u32 << (new_local_depth - 1);

        let Some((new_bucket_page_id, mut new_bucket_guard)) = self.bpm.new_page_guarded() else {
            return false;
        };
        let mut new_bucket = ExtendibleHtableBucketPage::<K, V>::init(self.bucket_max_size);

        for (k, v) in bucket.take_all() {
            if self.hash(&k) & discriminator != 0 {
                new_bucket.push_unchecked(k, v);
            } else {
                bucket.push_unchecked(k, v);
            }
        }

        // Every directory slot that shared this bucket under its *old*
        // local depth (there may be several, if that depth trailed the
        // global depth) now points at the old or new bucket according to
        // the discriminating bit, and adopts the new local depth.
        let old_mask = (1u32 << old_local_depth) - 1;
        let old_suffix = bucket_idx & old_mask;
        for i in 0..directory.size() {
            if i & old_mask == old_suffix {
                directory.set_local_depth(i, new_local_depth);
                if i & discriminator != 0 {
                    directory.set_bucket_page_id(i, new_bucket_page_id);
                } else {
                    directory.set_bucket_page_id(i, bucket_page_id);
                }
            }
        }

        bucket.encode_into(bucket_guard.data_mut());
        new_bucket_guard.with_data_mut(|bytes| new_bucket.encode_into(bytes));
        directory.encode_into(directory_guard.data_mut());

        drop(bucket_guard);
        drop(new_bucket_guard);
        drop(directory_guard);

        // Retry from the top: either the target bucket now has room, or
        // another round of growth/split is needed, bounded by
        // `directory_max_depth`. Re-acquire the directory's write latch for
        // the retry, same as the initial call from `insert`.
        let Some(directory_guard) = self.bpm.fetch_page_write(directory_page_id) else {
            return false;
        };
        self.insert_into_directory(directory_guard, hash, key, value)
    }

    /// Removes `key`. If its bucket becomes empty, attempts a merge with
    /// its split image, then shrinks the directory while every slot's
    /// local depth trails the global depth.
    pub fn remove(&self, key: &K) -> bool {
        let hash = self.hash(key);

        let header_guard = match self.bpm.fetch_page_read(self.header_page_id) {
            Some(g) => g,
            None => return false,
        };
        let header = ExtendibleHtableHeaderPage::decode(header_guard.data());
        let directory_idx = header.hash_to_directory_index(hash);
        let directory_page_id = header.directory_page_id(directory_idx);
        drop(header_guard);
        if directory_page_id == INVALID_PAGE_ID {
            return false;
        }

        let Some(mut directory_guard) = self.bpm.fetch_page_write(directory_page_id) else {
            return false;
        };
        let mut directory = ExtendibleHtableDirectoryPage::decode(directory_guard.data());

        let bucket_idx = directory.hash_to_bucket_index(hash);
        let bucket_page_id = directory.bucket_page_id(bucket_idx);
        if bucket_page_id == INVALID_PAGE_ID {
            return false;
        }

        let Some(mut bucket_guard) = self.bpm.fetch_page_write(bucket_page_id) else {
            return false;
        };
        let mut bucket = ExtendibleHtableBucketPage::<K, V>::decode(bucket_guard.data());

        if !bucket.remove(key, &self.cmp) {
            return false;
        }
        let became_empty = bucket.is_empty();
        bucket.encode_into(bucket_guard.data_mut());
        drop(bucket_guard);

        if became_empty {
            self.merge_bucket(&mut directory, bucket_idx);
        }
        while directory.can_shrink() {
            directory.decr_global_depth();
        }
        directory.encode_into(directory_guard.data_mut());
        true
    }

    /// If `bucket_idx`'s bucket and its split image share a local depth,
    /// deletes the emptied bucket's page and repoints every directory slot
    /// that referred to either bucket at the surviving page, at one lower
    /// local depth. Repeats on the surviving bucket as long as it is itself
    /// empty and can be merged with its own split image at the new, lower
    /// local depth, so a whole emptied subtree of sibling buckets collapses
    /// in one `Remove` rather than one level per call. Stops once the
    /// current bucket is at depth 0, its split image is at a different
    /// depth (nothing to merge with yet), or the survivor is non-empty.
    fn merge_bucket(&self, directory: &mut ExtendibleHtableDirectoryPage, mut bucket_idx: u32) {
        loop {
            let local_depth = directory.local_depth(bucket_idx);
            if local_depth == 0 {
                return;
            }
            let split_idx = directory.get_split_image_index(bucket_idx);
            if directory.local_depth(split_idx) != local_depth {
                return;
            }

            let empty_page_id = directory.bucket_page_id(bucket_idx);
            let surviving_page_id = directory.bucket_page_id(split_idx);
            if empty_page_id == surviving_page_id {
                return;
            }

            let _ = self.bpm.delete_page(empty_page_id);

            let new_local_depth = local_depth - 1;
            for i in 0..directory.size() {
                let pid = directory.bucket_page_id(i);
                if pid == empty_page_id || pid == surviving_page_id {
                    directory.set_bucket_page_id(i, surviving_page_id);
                    directory.set_local_depth(i, new_local_depth);
                }
            }

            let Some(survivor_guard) = self.bpm.fetch_page_read(surviving_page_id) else {
                return;
            };
            let survivor = ExtendibleHtableBucketPage::<K, V>::decode(survivor_guard.data());
            let survivor_is_empty = survivor.is_empty();
            drop(survivor_guard);
            if !survivor_is_empty {
                return;
            }

            // `split_idx` now names the surviving bucket at its new, lower
            // local depth: continue the merge from there.
            bucket_idx = split_idx;
        }
    }
}

impl<K, V, C> DiskExtendibleHashTable<K, V, C, DefaultHashFunction<K>>
where
    K: StorageKey + Hash,
    V: StorageValue,
    C: StorageComparator<K>,
{
    pub fn with_default_hash(
        bpm: Arc<BufferPoolManager>,
        cmp: C,
        header_max_depth: u32,
        directory_max_depth: u32,
        bucket_max_size: u32,
    ) -> Option<Self> {
        Self::new(
            bpm,
            cmp,
            DefaultHashFunction::new(),
            header_max_depth,
            directory_max_depth,
            bucket_max_size,
        )
    }
}

#[cfg(test)]
mod tests {
    use tempdir::TempDir;

    use super::*;
    use crate::buffer::BufferPoolManager;
    use crate::container::hash::comparator::IntComparator;
    use crate::storage::disk::DiskManager;

    /// A hash function that returns the key unchanged. Deterministic and
    /// transparent, so split/merge tests can pick keys whose bucket
    /// placement is obvious without depending on `DefaultHasher`'s bit
    /// pattern.
    struct IdentityHash;
    impl HashFunction<i32> for IdentityHash {
        fn hash_key(&self, key: &i32) -> u32 {
            *key as u32
        }
    }

    fn test_table(
        bucket_max_size: u32,
    ) -> (
        DiskExtendibleHashTable<i32, i32, IntComparator, IdentityHash>,
        Arc<BufferPoolManager>,
        TempDir,
    ) {
        let dir = TempDir::new("test").unwrap();
        let disk_manager = DiskManager::new_temp(dir.path()).unwrap();
        let bpm = Arc::new(BufferPoolManager::new(16, disk_manager, 4));
        let table = DiskExtendibleHashTable::new(bpm.clone(), IntComparator::new(), IdentityHash, 2, 2, bucket_max_size)
            .unwrap();
        (table, bpm, dir)
    }

    #[test]
    fn insert_then_get_value_round_trips() {
        let (table, _bpm, _dir) = test_table(256);
        assert!(table.insert(1, 100));
        assert_eq!(table.get_value(&1), Some(100));
        assert_eq!(table.get_value(&2), None);
    }

    #[test]
    fn duplicate_insert_is_rejected_and_leaves_value_unchanged() {
        let (table, _bpm, _dir) = test_table(256);
        assert!(table.insert(1, 100));
        assert!(!table.insert(1, 200));
        assert_eq!(table.get_value(&1), Some(100));
    }

    #[test]
    fn bucket_overflow_splits_and_all_keys_remain_retrievable() {
        let (table, _bpm, _dir) = test_table(2);

        assert!(table.insert(0, 10)); // bit0 = 0
        assert!(table.insert(2, 20)); // bit0 = 0, bucket 0 now full
        assert!(table.insert(1, 30)); // bit0 = 1, forces a split

        assert_eq!(table.get_value(&0), Some(10));
        assert_eq!(table.get_value(&2), Some(20));
        assert_eq!(table.get_value(&1), Some(30));
    }

    #[test]
    fn remove_after_split_merges_and_shrinks_the_directory() {
        let (table, _bpm, _dir) = test_table(2);
        table.insert(0, 10);
        table.insert(2, 20);
        table.insert(1, 30);

        assert!(table.remove(&1));
        assert_eq!(table.get_value(&1), None);
        assert_eq!(table.get_value(&0), Some(10));
        assert_eq!(table.get_value(&2), Some(20));
    }

    #[test]
    fn remove_of_absent_key_returns_false() {
        let (table, _bpm, _dir) = test_table(256);
        assert!(!table.remove(&42));
    }
}
