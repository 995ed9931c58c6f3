pub mod page;
pub mod page_guard;

pub use page::{new_frame_buffer, FrameBuffer, Page};
pub use page_guard::{BasicPageGuard, ReadPageGuard, WritePageGuard};
