use std::sync::Arc;
use std::thread;

use tokio::sync::oneshot;

use crate::common::config::PageId;
use crate::storage::disk::DiskManager;
use crate::storage::page::page::FrameBuffer;

/// A Write or Read request for the `DiskManager` to execute.
pub enum DiskRequest {
    Read {
        page_id: PageId,
        /// The frame the read result is written into.
        frame: Arc<FrameBuffer>,
        /// Signaled exactly once when the request completes; carries the
        /// I/O result so failures reach the issuing caller instead of
        /// panicking the worker thread.
        callback: oneshot::Sender<std::io::Result<()>>,
    },
    Write {
        page_id: PageId,
        /// The frame whose current contents are written out to disk.
        frame: Arc<FrameBuffer>,
        callback: oneshot::Sender<std::io::Result<()>>,
    },
}

/// Schedules disk read and write operations.
///
/// A request is scheduled by calling `schedule` with an appropriate
/// `DiskRequest`. The scheduler maintains a single background worker thread
/// that processes requests against the disk manager in submission order;
/// the worker is spawned in the constructor and joined in `Drop`.
pub struct DiskScheduler {
    /// Shared queue used to submit requests. `None` signals the background
    /// thread to stop.
    request_queue: std::sync::mpsc::Sender<Option<DiskRequest>>,
    background_thread: Option<thread::JoinHandle<()>>,
}

impl DiskScheduler {
    pub fn new(disk_manager: DiskManager) -> Self {
        let (tx, rx) = std::sync::mpsc::channel();
        Self {
            request_queue: tx,
            background_thread: Some(thread::spawn(move || {
                Self::start_worker_thread(rx, disk_manager)
            })),
        }
    }

    /// Schedules a request for the disk manager to execute. Submission is
    /// non-blocking; callers wait on the request's completion handle when
    /// synchronous semantics are required.
    pub fn schedule(&self, r: DiskRequest) {
        self.request_queue
            .send(Some(r))
            .expect("disk scheduler worker thread has exited");
    }

    /// The background worker: runs until a `None` sentinel is received,
    /// executing each request against the disk manager exactly once and
    /// signaling its completion exactly once. Never panics on I/O failure;
    /// the error is handed back through the request's callback instead.
    fn start_worker_thread(
        rx: std::sync::mpsc::Receiver<Option<DiskRequest>>,
        mut disk_manager: DiskManager,
    ) {
        while let Ok(Some(request)) = rx.recv() {
            match request {
                DiskRequest::Read {
                    page_id,
                    frame,
                    callback,
                } => {
                    let result = {
                        let mut data = frame.write();
                        disk_manager.read_page(page_id, &mut data[..])
                    };
                    let _ = callback.send(result);
                }
                DiskRequest::Write {
                    page_id,
                    frame,
                    callback,
                } => {
                    let result = {
                        let data = frame.read();
                        disk_manager.write_page(page_id, &data[..])
                    };
                    let _ = callback.send(result);
                }
            }
        }
    }
}

impl Drop for DiskScheduler {
    fn drop(&mut self) {
        // draining happens naturally: every request already queued is
        // processed before the worker sees this `None` sentinel.
        let _ = self.request_queue.send(None);
        if let Some(handle) = self.background_thread.take() {
            let _ = handle.join();
        }
    }
}
