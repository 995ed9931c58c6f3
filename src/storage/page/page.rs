use std::sync::Arc;

use parking_lot::{MappedRwLockReadGuard, MappedRwLockWriteGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::common::config::{PageId, BUSTUB_PAGE_SIZE};

/// The raw contents of one buffer-pool frame, plus the reader/writer latch
/// guards take before touching it.
///
/// Frame bookkeeping (page id, pin count, dirty bit) lives in the buffer
/// pool's own bookkeeping mutex; this type only holds the PAGE_SIZE bytes
/// themselves, behind the lock that serves as the page's latch. `PageGuard`s
/// are the only callers expected to take this lock directly; the buffer
/// pool manager touches it only while holding no outstanding guard for the
/// same frame (on eviction, on a fresh read/write from disk, or when
/// zeroing a newly allocated page).
pub type FrameBuffer = RwLock<Box<[u8; BUSTUB_PAGE_SIZE]>>;

pub fn new_frame_buffer() -> Arc<FrameBuffer> {
    Arc::new(RwLock::new(Box::new([0u8; BUSTUB_PAGE_SIZE])))
}

/// An unscoped handle to a page's bytes: a page id plus a cloneable
/// reference to its frame. Unlike `BasicPageGuard`/`ReadPageGuard`/
/// `WritePageGuard`, dropping a `Page` has no effect on its pin; callers
/// that take one from `BufferPoolManager::new_page`/`fetch_page` are
/// responsible for calling `unpin_page` themselves. Prefer the guarded
/// helpers unless this manual bookkeeping is actually what's needed.
#[derive(Clone)]
pub struct Page {
    page_id: PageId,
    frame: Arc<FrameBuffer>,
}

impl Page {
    pub(crate) fn new(page_id: PageId, frame: Arc<FrameBuffer>) -> Self {
        Self { page_id, frame }
    }

    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    pub(crate) fn frame_arc(&self) -> Arc<FrameBuffer> {
        self.frame.clone()
    }

    pub fn get_data(&self) -> MappedRwLockReadGuard<'_, [u8]> {
        RwLockReadGuard::map(self.frame.read(), |b| &b[..])
    }

    pub fn get_data_mut(&self) -> MappedRwLockWriteGuard<'_, [u8]> {
        RwLockWriteGuard::map(self.frame.write(), |b| &mut b[..])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_buffer_starts_zeroed() {
        let buf = new_frame_buffer();
        assert_eq!(**buf.read(), [0u8; BUSTUB_PAGE_SIZE]);
    }

    #[test]
    fn frame_buffer_write_then_read() {
        let buf = new_frame_buffer();
        buf.write()[0] = 7;
        assert_eq!(buf.read()[0], 7);
    }

    #[test]
    fn page_get_data_reflects_frame_writes() {
        let frame = new_frame_buffer();
        frame.write()[0..3].copy_from_slice(b"abc");
        let page = Page::new(0, frame);
        assert_eq!(&page.get_data()[0..3], b"abc");
        page.get_data_mut()[0] = b'z';
        assert_eq!(page.get_data()[0], b'z');
    }
}
