/// Size, in bytes, of a single database page.
pub const BUSTUB_PAGE_SIZE: usize = 4096;

/// Sentinel page id meaning "no page".
pub const INVALID_PAGE_ID: PageId = std::u32::MAX;

/// Maximum directory-index depth a hash header page can address. A
/// header's `max_depth` (and therefore its directory-id array length) is
/// clamped to this at construction.
pub const HTABLE_HEADER_MAX_DEPTH: u32 = 9;

/// Maximum depth a hash directory page can grow to. A directory's
/// `max_depth` is clamped to this at construction, bounding how far
/// `IncrGlobalDepth` can double its arrays.
pub const HTABLE_DIRECTORY_MAX_DEPTH: u32 = 9;

pub type FrameId = u32;
pub type PageId = u32;
