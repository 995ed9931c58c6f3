use serde::{Deserialize, Serialize};

use crate::common::config::{PageId, INVALID_PAGE_ID};

use super::codec;

/// The root of a disk-resident extendible hash index. Maps the top
/// `max_depth` bits of a key's hash to a directory page id, lazily
/// allocated the first time a key hashing into that slot is inserted.
#[derive(Serialize, Deserialize)]
pub struct ExtendibleHtableHeaderPage {
    max_depth: u32,
    directory_page_ids: Vec<PageId>,
}

impl ExtendibleHtableHeaderPage {
    pub fn init(max_depth: u32) -> Self {
        let max_depth = max_depth.min(crate::common::config::HTABLE_HEADER_MAX_DEPTH);
        Self {
            max_depth,
            directory_page_ids: vec![INVALID_PAGE_ID; 1usize << max_depth],
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

    /// Index of the directory this key's hash belongs to: the top
    /// `max_depth` bits of `hash`.
    pub fn hash_to_directory_index(&self, hash: u32) -> u32 {
        if self.max_depth == 0 {
            0
        } else {
            hash >> (32 - self.max_depth)
        }
    }

    pub fn directory_page_id(&self, directory_idx: u32) -> PageId {
        self.directory_page_ids
            .get(directory_idx as usize)
            .copied()
            .unwrap_or(INVALID_PAGE_ID)
    }

    pub fn set_directory_page_id(&mut self, directory_idx: u32, directory_page_id: PageId) {
        if let Some(slot) = self.directory_page_ids.get_mut(directory_idx as usize) {
            *slot = directory_page_id;
        }
    }

    pub fn max_num_directories(&self) -> usize {
        self.directory_page_ids.len()
    }
}
