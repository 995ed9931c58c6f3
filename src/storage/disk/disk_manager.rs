use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::Mutex;

use log::debug;

use crate::common::config::{PageId, BUSTUB_PAGE_SIZE};

/// DiskManager takes care of the allocation and deallocation of pages within
/// a database. It performs the reading and writing of pages to and from
/// disk, providing a logical file layer within the context of a database
/// management system.
///
/// WAL/recovery is out of scope for this crate; `DiskManager` only persists
/// page-sized blocks, not a log file.
pub struct DiskManager {
    /// Stream to write the db file. A mutex protects file access since
    /// multiple buffer pool instances could in principle share one manager.
    db_io: Mutex<File>,
    file_name: String,
    num_flushes: u64,
    num_writes: u64,
}

impl DiskManager {
    /// Creates a new disk manager that writes to the specified database
    /// file, creating it if it does not already exist.
    pub fn new(db_file: &str) -> std::io::Result<Self> {
        let db_io = OpenOptions::new()
            .read(true)
            .write(true)
            .open(db_file)
            .or_else(|_| {
                OpenOptions::new()
                    .create(true)
                    .read(true)
                    .write(true)
                    .open(db_file)
            })?;

        Ok(Self {
            db_io: Mutex::new(db_io),
            file_name: db_file.to_string(),
            num_flushes: 0,
            num_writes: 0,
        })
    }

    /// Creates a disk manager backed by a temporary file, for tests.
    pub fn new_temp(dir: &Path) -> std::io::Result<Self> {
        Self::new(dir.join("test.db").to_str().unwrap())
    }

    /// Writes a page to the database file.
    pub fn write_page(&mut self, page_id: PageId, page_data: &[u8]) -> std::io::Result<()> {
        assert_eq!(page_data.len(), BUSTUB_PAGE_SIZE);

        let offset = page_id as u64 * BUSTUB_PAGE_SIZE as u64;
        self.num_writes += 1;

        let mut db_io = self.db_io.lock().unwrap();
        db_io.seek(SeekFrom::Start(offset))?;
        db_io.write_all(page_data)?;
        db_io.flush()?;
        self.num_flushes += 1;
        Ok(())
    }

    /// Reads a page from the database file. A read past the end of the file
    /// is tolerated: the destination buffer is zero-filled instead of
    /// erroring, since a page that was never written is indistinguishable
    /// from an all-zero page.
    pub fn read_page(&mut self, page_id: PageId, page_data: &mut [u8]) -> std::io::Result<()> {
        assert_eq!(page_data.len(), BUSTUB_PAGE_SIZE);

        let offset = page_id as u64 * BUSTUB_PAGE_SIZE as u64;
        let mut db_io = self.db_io.lock().unwrap();

        let file_len = db_io.metadata()?.len();
        if offset >= file_len {
            debug!("read_page({page_id}) past end of file, returning zeroed page");
            page_data.fill(0);
            return Ok(());
        }

        db_io.seek(SeekFrom::Start(offset))?;
        let read_count = db_io.read(page_data)?;
        if read_count < BUSTUB_PAGE_SIZE {
            debug!("read_page({page_id}) read less than a page, zero-filling the rest");
            page_data[read_count..].fill(0);
        }
        Ok(())
    }

    /// Returns the number of times a page write has been flushed to disk.
    pub fn get_num_flushes(&self) -> u64 {
        self.num_flushes
    }

    /// Returns the number of page writes issued so far.
    pub fn get_num_writes(&self) -> u64 {
        self.num_writes
    }

    /// Returns the path of the backing database file.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }
}

#[cfg(test)]
mod tests {
    use tempdir::TempDir;

    use super::*;
    use crate::common::config::BUSTUB_PAGE_SIZE;

    #[test]
    fn read_write_page() {
        let mut buf = [0; BUSTUB_PAGE_SIZE];
        let mut data = [0; BUSTUB_PAGE_SIZE];

        let dir = TempDir::new("test").unwrap();
        let db_file = dir.path().join("test.db");
        let mut dm = DiskManager::new(db_file.to_str().unwrap()).unwrap();
        let test_str = b"A test string.";
        data[..test_str.len()].copy_from_slice(test_str);

        dm.read_page(0, &mut buf).unwrap(); // tolerate empty read

        dm.write_page(0, &data).unwrap();
        dm.read_page(0, &mut buf).unwrap();
        assert_eq!(buf, data);

        buf.fill(0);
        dm.write_page(5, &data).unwrap();
        dm.read_page(5, &mut buf).unwrap();
        assert_eq!(buf, data);
    }

    #[test]
    fn read_past_end_of_file_zero_fills() {
        let dir = TempDir::new("test").unwrap();
        let db_file = dir.path().join("test.db");
        let mut dm = DiskManager::new(db_file.to_str().unwrap()).unwrap();

        let mut buf = [0xAB; BUSTUB_PAGE_SIZE];
        dm.read_page(42, &mut buf).unwrap();
        assert_eq!(buf, [0u8; BUSTUB_PAGE_SIZE]);
    }
}
