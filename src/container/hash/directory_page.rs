use serde::{Deserialize, Serialize};

use crate::common::config::{PageId, INVALID_PAGE_ID};

use super::codec;

/// Maps a key's low `global_depth` hash bits to a bucket page id. Grows by
/// doubling (`IncrGlobalDepth`) and shrinks by halving (`DecrGlobalDepth`);
/// each slot additionally tracks its own `local_depth`, the number of hash
/// bits that slot's bucket actually distinguishes on.
#[derive(Serialize, Deserialize)]
pub struct ExtendibleHtableDirectoryPage {
    max_depth: u32,
    global_depth: u32,
    bucket_page_ids: Vec<PageId>,
    local_depths: Vec<u8>,
}

impl ExtendibleHtableDirectoryPage {
    pub fn init(max_depth: u32) -> Self {
        let max_depth = max_depth.min(crate::common::config::HTABLE_DIRECTORY_MAX_DEPTH);
        let capacity = 1usize << max_depth;
        Self {
            max_depth,
            global_depth: 0,
            bucket_page_ids: vec![INVALID_PAGE_ID; capacity],
            local_depths: vec![0; capacity],
        }
    }

    pub fn decode(buf: &[u8]) -> Self {
        codec::decode_from(buf)
    }

    pub fn encode_into(&self, buf: &mut [u8]) {
        codec::encode_into(self, buf)
    }

    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }

    pub fn global_depth(&self) -> u32 {
        self.global_depth
    }

    /// Number of directory slots currently in use: `2^global_depth`.
    pub fn size(&self) -> u32 {
        1 << self.global_depth
    }

    pub fn hash_to_bucket_index(&self, hash: u32) -> u32 {
        if self.global_depth == 0 {
            0
        } else {
            hash & ((1 << self.global_depth) - 1)
        }
    }

    pub fn bucket_page_id(&self, bucket_idx: u32) -> PageId {
        self.bucket_page_ids
            .get(bucket_idx as usize)
            .copied()
            .unwrap_or(INVALID_PAGE_ID)
    }

    pub fn set_bucket_page_id(&mut self, bucket_idx: u32, bucket_page_id: PageId) {
        if let Some(slot) = self.bucket_page_ids.get_mut(bucket_idx as usize) {
            *slot = bucket_page_id;
        }
    }

    pub fn local_depth(&self, bucket_idx: u32) -> u32 {
        self.local_depths.get(bucket_idx as usize).copied().unwrap_or(0) as u32
    }

    pub fn set_local_depth(&mut self, bucket_idx: u32, local_depth: u32) {
        if let Some(slot) = self.local_depths.get_mut(bucket_idx as usize) {
            *slot = local_depth as u8;
        }
    }

    pub fn incr_local_depth(&mut self, bucket_idx: u32) {
        if let Some(slot) = self.local_depths.get_mut(bucket_idx as usize) {
            *slot += 1;
        }
    }

    /// The bucket this one will be paired with after a split at its current
    /// local depth: the index differing only in the discriminating bit
    /// `1 << (local_depth - 1)`.
    pub fn get_split_image_index(&self, bucket_idx: u32) -> u32 {
        let local_depth = self.local_depth(bucket_idx);
        bucket_idx ^ (1 << (local_depth - 1))
    }

    /// Doubles the directory by mirroring every slot in `[0, 2^global_depth)`
    /// into `[2^global_depth, 2^(global_depth+1))`, then bumps the depth.
    /// A no-op once `global_depth == max_depth`.
    pub fn incr_global_depth(&mut self) {
        if self.global_depth >= self.max_depth {
            return;
        }
        let half = 1u32 << self.global_depth;
        for i in 0..half {
            self.bucket_page_ids[(half + i) as usize] = self.bucket_page_ids[i as usize];
            self.local_depths[(half + i) as usize] = self.local_depths[i as usize];
        }
        self.global_depth += 1;
    }

    pub fn decr_global_depth(&mut self) {
        if self.global_depth > 0 {
            self.global_depth -= 1;
        }
    }

    /// True once every in-use slot's local depth is strictly less than the
    /// global depth, meaning the upper half of the directory is redundant.
    pub fn can_shrink(&self) -> bool {
        if self.global_depth == 0 {
            return false;
        }
        (0..self.size()).all(|i| self.local_depth(i) < self.global_depth)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn incr_global_depth_mirrors_the_lower_half() {
        let mut dir = ExtendibleHtableDirectoryPage::init(2);
        dir.set_bucket_page_id(0, 10);
        dir.set_local_depth(0, 1);
        dir.incr_global_depth();
        assert_eq!(dir.global_depth(), 1);
        assert_eq!(dir.bucket_page_id(1), 10);
        assert_eq!(dir.local_depth(1), 1);
    }

    #[test]
    fn split_image_differs_by_the_discriminating_bit() {
        let mut dir = ExtendibleHtableDirectoryPage::init(3);
        dir.set_local_depth(0, 2);
        assert_eq!(dir.get_split_image_index(0), 2);
        dir.set_local_depth(3, 2);
        assert_eq!(dir.get_split_image_index(3), 1);
    }

    #[test]
    fn can_shrink_true_only_when_every_slot_is_below_global_depth() {
        let mut dir = ExtendibleHtableDirectoryPage::init(2);
        dir.incr_global_depth();
        dir.incr_global_depth();
        // size() == 4, every local depth starts at 0 < 2
        assert!(dir.can_shrink());
        dir.set_local_depth(0, 2);
        assert!(!dir.can_shrink());
    }

    #[test]
    fn round_trips_through_a_page_buffer() {
        let mut dir = ExtendibleHtableDirectoryPage::init(3);
        dir.incr_global_depth();
        dir.set_bucket_page_id(1, 99);
        dir.set_local_depth(1, 1);

        let mut buf = [0u8; crate::common::config::BUSTUB_PAGE_SIZE];
        dir.encode_into(&mut buf);
        let decoded = ExtendibleHtableDirectoryPage::decode(&buf);
        assert_eq!(decoded.global_depth(), 1);
        assert_eq!(decoded.bucket_page_id(1), 99);
        assert_eq!(decoded.local_depth(1), 1);
    }
}
