use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use super::codec;
use super::comparator::StorageComparator;

/// A leaf page: a flat, unsorted array of `(key, value)` pairs, capped at
/// `max_size` entries. Lookup/insert/remove are linear scans — fine at the
/// capacities an index page holds.
#[derive(Serialize, Deserialize)]
pub struct ExtendibleHtableBucketPage<K, V> {
    max_size: u32,
    entries: Vec<(K, V)>,
}

impl<K, V> ExtendibleHtableBucketPage<K, V>
where
    K: Serialize + for<'de> Deserialize<'de>,
    V: Serialize + for<'de> Deserialize<'de>,
{
    pub fn init(max_size: u32) -> Self {
        Self {
            max_size,
            entries: Vec::new(),
        }
    }

    pub fn decode(buf: &[u8]) -> Self {
        codec::decode_from(buf)
    }

    pub fn encode_into(&self, buf: &mut [u8]) {
        codec::encode_into(self, buf)
    }

    pub fn max_size(&self) -> u32 {
        self.max_size
    }

    pub fn size(&self) -> u32 {
        self.entries.len() as u32
    }

    pub fn is_full(&self) -> bool {
        self.entries.len() as u32 >= self.max_size
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[(K, V)] {
        &self.entries
    }

    pub fn lookup<C: StorageComparator<K>>(&self, key: &K, cmp: &C) -> Option<&V> {
        self.entries
            .iter()
            .find(|(k, _)| cmp.compare(k, key) == Ordering::Equal)
            .map(|(_, v)| v)
    }

    /// Inserts `(key, value)`. Fails if the bucket is full or the key is
    /// already present; duplicate detection happens before the capacity
    /// check so a full bucket still correctly rejects a repeat key.
    pub fn insert<C: StorageComparator<K>>(&mut self, key: K, value: V, cmp: &C) -> bool {
        if self.lookup(&key, cmp).is_some() {
            return false;
        }
        if self.is_full() {
            return false;
        }
        self.entries.push((key, value));
        true
    }

    pub fn remove<C: StorageComparator<K>>(&mut self, key: &K, cmp: &C) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(k, _)| cmp.compare(k, key) != Ordering::Equal);
        self.entries.len() != before
    }

    /// Removes and returns every entry, for use by a bucket split, which
    /// redistributes them between the old bucket and its new sibling.
    pub fn take_all(&mut self) -> Vec<(K, V)> {
        std::mem::take(&mut self.entries)
    }

    pub fn push_unchecked(&mut self, key: K, value: V) {
        self.entries.push((key, value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::hash::comparator::IntComparator;

    #[test]
    fn insert_rejects_duplicate_keys() {
        let cmp = IntComparator::new();
        let mut bucket = ExtendibleHtableBucketPage::<i32, i32>::init(4);
        assert!(bucket.insert(1, 100, &cmp));
        assert!(!bucket.insert(1, 200, &cmp));
        assert_eq!(bucket.lookup(&1, &cmp), Some(&100));
    }

    #[test]
    fn insert_rejects_when_full() {
        let cmp = IntComparator::new();
        let mut bucket = ExtendibleHtableBucketPage::<i32, i32>::init(2);
        assert!(bucket.insert(1, 1, &cmp));
        assert!(bucket.insert(2, 2, &cmp));
        assert!(!bucket.insert(3, 3, &cmp));
        assert!(bucket.is_full());
    }

    #[test]
    fn remove_reports_whether_the_key_was_present() {
        let cmp = IntComparator::new();
        let mut bucket = ExtendibleHtableBucketPage::<i32, i32>::init(4);
        bucket.insert(1, 1, &cmp);
        assert!(bucket.remove(&1, &cmp));
        assert!(!bucket.remove(&1, &cmp));
        assert!(bucket.is_empty());
    }

    #[test]
    fn round_trips_through_a_page_buffer() {
        let cmp = IntComparator::new();
        let mut bucket = ExtendibleHtableBucketPage::<i32, i32>::init(4);
        bucket.insert(7, 70, &cmp);
        let mut buf = [0u8; crate::common::config::BUSTUB_PAGE_SIZE];
        bucket.encode_into(&mut buf);
        let decoded = ExtendibleHtableBucketPage::<i32, i32>::decode(&buf);
        assert_eq!(decoded.lookup(&7, &cmp), Some(&70));
    }
}
