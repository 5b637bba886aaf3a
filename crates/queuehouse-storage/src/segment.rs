//! Segment File Management
//!
//! Segment files hold the queue's frames in sequence-numbered order:
//! `<name>.diskqueue.000000.dat`, `<name>.diskqueue.000001.dat`, ...
//! The writer appends to the highest-numbered segment; everything below it is
//! complete and immutable. The reader deletes segments once it has consumed
//! them. Metadata files for both sides live next to the segments in the same
//! data directory, and no other files in that directory are touched.

use std::io::SeekFrom;
use std::path::{Path, PathBuf};

use queuehouse_core::Result;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncSeekExt;
use tracing::warn;

/// Path layout and file operations for one queue's segments.
#[derive(Debug, Clone)]
pub struct SegmentFiles {
    name: String,
    data_dir: PathBuf,
}

impl SegmentFiles {
    pub fn new(name: &str, data_dir: &Path) -> Self {
        Self {
            name: name.to_string(),
            data_dir: data_dir.to_path_buf(),
        }
    }

    pub fn segment_path(&self, file_num: i64) -> PathBuf {
        self.data_dir
            .join(format!("{}.diskqueue.{:06}.dat", self.name, file_num))
    }

    pub fn writer_meta_path(&self) -> PathBuf {
        self.data_dir
            .join(format!("{}.diskqueue.meta.dat", self.name))
    }

    pub fn reader_meta_path(&self, reader_id: &str) -> PathBuf {
        self.data_dir
            .join(format!("{}.diskqueue.{}.meta.dat", self.name, reader_id))
    }

    /// Open (creating on demand, along with the data directory) the segment
    /// for appending, positioned at `pos`.
    pub async fn open_for_append(&self, file_num: i64, pos: i64) -> Result<File> {
        tokio::fs::create_dir_all(&self.data_dir).await?;
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(self.segment_path(file_num))
            .await?;
        file.seek(SeekFrom::Start(pos as u64)).await?;
        Ok(file)
    }

    /// Open the segment read-only, positioned at `pos`.
    pub async fn open_for_read(&self, file_num: i64, pos: i64) -> Result<File> {
        let mut file = File::open(self.segment_path(file_num)).await?;
        if pos > 0 {
            file.seek(SeekFrom::Start(pos as u64)).await?;
        }
        Ok(file)
    }

    /// Current size of the segment in bytes; 0 when it does not exist yet.
    pub async fn size_of(&self, file_num: i64) -> Result<i64> {
        match tokio::fs::metadata(self.segment_path(file_num)).await {
            Ok(meta) => Ok(meta.len() as i64),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(0),
            Err(e) => Err(e.into()),
        }
    }

    /// Truncate the segment to `len` bytes and fsync it.
    pub async fn truncate(&self, file_num: i64, len: i64) -> Result<()> {
        let file = OpenOptions::new()
            .write(true)
            .open(self.segment_path(file_num))
            .await?;
        file.set_len(len as u64).await?;
        file.sync_all().await?;
        Ok(())
    }

    /// Delete the segment. Deleting a segment that is already gone is not an
    /// error; the reader and `empty()` race over the same files.
    pub async fn remove(&self, file_num: i64) -> Result<()> {
        match tokio::fs::remove_file(self.segment_path(file_num)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Best-effort delete of segments `0..=last`. Keeps going past failures
    /// and reports the first error afterwards.
    pub async fn remove_through(&self, last: i64) -> Result<()> {
        let mut first_err = None;
        for file_num in 0..=last {
            if let Err(e) = self.remove(file_num).await {
                warn!(
                    queue = %self.name,
                    file_num,
                    error = %e,
                    "failed to remove segment"
                );
                first_err.get_or_insert(e);
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tokio::io::AsyncWriteExt;

    #[test]
    fn test_path_layout() {
        let files = SegmentFiles::new("orders", Path::new("/data"));
        assert_eq!(
            files.segment_path(0),
            PathBuf::from("/data/orders.diskqueue.000000.dat")
        );
        assert_eq!(
            files.segment_path(1234567),
            PathBuf::from("/data/orders.diskqueue.1234567.dat")
        );
        assert_eq!(
            files.writer_meta_path(),
            PathBuf::from("/data/orders.diskqueue.meta.dat")
        );
        assert_eq!(
            files.reader_meta_path("ch"),
            PathBuf::from("/data/orders.diskqueue.ch.meta.dat")
        );
    }

    #[tokio::test]
    async fn test_open_for_append_creates_dir_and_file() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("nested").join("queues");
        let files = SegmentFiles::new("q", &dir);

        let mut file = files.open_for_append(0, 0).await.unwrap();
        file.write_all(b"abc").await.unwrap();
        file.sync_all().await.unwrap();

        assert_eq!(files.size_of(0).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_size_of_missing_is_zero() {
        let tmp = TempDir::new().unwrap();
        let files = SegmentFiles::new("q", tmp.path());
        assert_eq!(files.size_of(42).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_truncate_and_remove() {
        let tmp = TempDir::new().unwrap();
        let files = SegmentFiles::new("q", tmp.path());

        let mut file = files.open_for_append(0, 0).await.unwrap();
        file.write_all(&[0u8; 100]).await.unwrap();
        file.sync_all().await.unwrap();
        drop(file);

        files.truncate(0, 37).await.unwrap();
        assert_eq!(files.size_of(0).await.unwrap(), 37);

        files.remove(0).await.unwrap();
        assert_eq!(files.size_of(0).await.unwrap(), 0);

        // removing again is fine
        files.remove(0).await.unwrap();
    }

    #[tokio::test]
    async fn test_remove_through_skips_missing() {
        let tmp = TempDir::new().unwrap();
        let files = SegmentFiles::new("q", tmp.path());

        for n in [0i64, 2] {
            let mut f = files.open_for_append(n, 0).await.unwrap();
            f.write_all(b"x").await.unwrap();
        }

        files.remove_through(3).await.unwrap();
        for n in 0..=3 {
            assert_eq!(files.size_of(n).await.unwrap(), 0);
        }
    }
}
