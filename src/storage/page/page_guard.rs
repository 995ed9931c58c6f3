use std::sync::Arc;

use parking_lot::{RwLockReadGuard, RwLockWriteGuard};

use crate::buffer::buffer_pool_manager::BufferPoolManager;
use crate::common::config::PageId;

use super::page::FrameBuffer;

/// A scoped handle that owns a page's pin and releases it exactly once,
/// on first drop. `BasicPageGuard` does not hold the page's latch; callers
/// that need a stable, latched view should upgrade to a `ReadPageGuard` or
/// `WritePageGuard`, or fetch one directly from the buffer pool.
pub struct BasicPageGuard {
    bpm: Option<Arc<BufferPoolManager>>,
    frame: Option<Arc<FrameBuffer>>,
    page_id: PageId,
    is_dirty: bool,
}

impl BasicPageGuard {
    pub(crate) fn new(bpm: Arc<BufferPoolManager>, page_id: PageId, frame: Arc<FrameBuffer>) -> Self {
        Self {
            bpm: Some(bpm),
            frame: Some(frame),
            page_id,
            is_dirty: false,
        }
    }

    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    /// Reads the page's bytes. This takes the page's latch only for the
    /// duration of the call; it does not hold it across the guard's
    /// lifetime the way `ReadPageGuard` does.
    pub fn data(&self) -> Vec<u8> {
        self.frame.as_ref().unwrap().read().to_vec()
    }

    /// Writes into the page's bytes via `f`, marking the guard dirty.
    /// Latches only for the duration of the call.
    pub fn with_data_mut<R>(&mut self, f: impl FnOnce(&mut [u8]) -> R) -> R {
        self.is_dirty = true;
        let mut guard = self.frame.as_ref().unwrap().write();
        f(&mut guard[..])
    }

    /// Releases the pin (and, for idempotency, is a no-op if already
    /// released). Equivalent to letting the guard drop.
    pub fn drop_guard(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(bpm) = self.bpm.take() {
            bpm.unpin_page(self.page_id, self.is_dirty);
        }
        self.frame.take();
    }

    /// Converts this guard into a `ReadPageGuard`, acquiring the page's
    /// shared latch. The source guard is left empty; its own drop becomes
    /// a no-op.
    pub fn upgrade_read(mut self) -> ReadPageGuard {
        let frame = self.frame.take().expect("guard already released");
        let bpm = self.bpm.take().expect("guard already released");
        let page_id = self.page_id;
        let is_dirty = self.is_dirty;

        let data_guard = frame.read();
        // SAFETY: `frame` is kept alive by the Arc stored alongside this
        // guard; the lock and the data it borrows from live exactly as
        // long as this guard does.
        let data_guard: RwLockReadGuard<'static, Box<[u8; crate::common::config::BUSTUB_PAGE_SIZE]>> =
            unsafe { std::mem::transmute(data_guard) };

        ReadPageGuard {
            bpm: Some(bpm),
            frame: Some(frame),
            page_id,
            is_dirty,
            data_guard: Some(data_guard),
        }
    }

    /// Converts this guard into a `WritePageGuard`, acquiring the page's
    /// exclusive latch. The source guard is left empty; its own drop
    /// becomes a no-op.
    pub fn upgrade_write(mut self) -> WritePageGuard {
        let frame = self.frame.take().expect("guard already released");
        let bpm = self.bpm.take().expect("guard already released");
        let page_id = self.page_id;
        let is_dirty = self.is_dirty;

        let data_guard = frame.write();
        // SAFETY: see `upgrade_read`.
        let data_guard: RwLockWriteGuard<'static, Box<[u8; crate::common::config::BUSTUB_PAGE_SIZE]>> =
            unsafe { std::mem::transmute(data_guard) };

        WritePageGuard {
            bpm: Some(bpm),
            frame: Some(frame),
            page_id,
            is_dirty,
            data_guard: Some(data_guard),
        }
    }
}

impl Drop for BasicPageGuard {
    fn drop(&mut self) {
        self.release();
    }
}

/// A scoped handle holding a page's pin and a shared (read) latch,
/// acquired at construction and released before the pin is dropped.
pub struct ReadPageGuard {
    bpm: Option<Arc<BufferPoolManager>>,
    frame: Option<Arc<FrameBuffer>>,
    page_id: PageId,
    is_dirty: bool,
    data_guard: Option<RwLockReadGuard<'static, Box<[u8; crate::common::config::BUSTUB_PAGE_SIZE]>>>,
}

impl ReadPageGuard {
    pub(crate) fn new(bpm: Arc<BufferPoolManager>, page_id: PageId, frame: Arc<FrameBuffer>) -> Self {
        let data_guard = frame.read();
        // SAFETY: see `BasicPageGuard::upgrade_read`.
        let data_guard: RwLockReadGuard<'static, Box<[u8; crate::common::config::BUSTUB_PAGE_SIZE]>> =
            unsafe { std::mem::transmute(data_guard) };
        Self {
            bpm: Some(bpm),
            frame: Some(frame),
            page_id,
            is_dirty: false,
            data_guard: Some(data_guard),
        }
    }

    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    pub fn data(&self) -> &[u8] {
        &self.data_guard.as_ref().unwrap()[..]
    }

    /// Drops the guard early, releasing latch then pin. Equivalent to
    /// letting it go out of scope; provided for call sites that want to
    /// make the release point explicit (e.g. latch coupling).
    pub fn drop_guard(self) {
        drop(self);
    }

    fn release(&mut self) {
        // Release the latch before the pin, per the guard contract.
        self.data_guard.take();
        if let Some(bpm) = self.bpm.take() {
            bpm.unpin_page(self.page_id, self.is_dirty);
        }
        self.frame.take();
    }
}

impl Drop for ReadPageGuard {
    fn drop(&mut self) {
        self.release();
    }
}

/// A scoped handle holding a page's pin and an exclusive (write) latch.
/// Any mutable access marks the guard dirty so the page is written back
/// before eviction.
pub struct WritePageGuard {
    bpm: Option<Arc<BufferPoolManager>>,
    frame: Option<Arc<FrameBuffer>>,
    page_id: PageId,
    is_dirty: bool,
    data_guard: Option<RwLockWriteGuard<'static, Box<[u8; crate::common::config::BUSTUB_PAGE_SIZE]>>>,
}

impl WritePageGuard {
    pub(crate) fn new(bpm: Arc<BufferPoolManager>, page_id: PageId, frame: Arc<FrameBuffer>) -> Self {
        let data_guard = frame.write();
        // SAFETY: see `BasicPageGuard::upgrade_read`.
        let data_guard: RwLockWriteGuard<'static, Box<[u8; crate::common::config::BUSTUB_PAGE_SIZE]>> =
            unsafe { std::mem::transmute(data_guard) };
        Self {
            bpm: Some(bpm),
            frame: Some(frame),
            page_id,
            is_dirty: false,
            data_guard: Some(data_guard),
        }
    }

    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    pub fn data(&self) -> &[u8] {
        &self.data_guard.as_ref().unwrap()[..]
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        self.is_dirty = true;
        &mut self.data_guard.as_mut().unwrap()[..]
    }

    pub fn drop_guard(self) {
        drop(self);
    }

    fn release(&mut self) {
        self.data_guard.take();
        if let Some(bpm) = self.bpm.take() {
            bpm.unpin_page(self.page_id, self.is_dirty);
        }
        self.frame.take();
    }
}

impl Drop for WritePageGuard {
    fn drop(&mut self) {
        self.release();
    }
}
