//! Disk Queue Writer
//!
//! `DiskQueueWriter` owns the append path of a queue: it frames messages,
//! appends them to the current segment file, rolls to the next segment once
//! the current one grows past the configured threshold, and flushes + fsyncs
//! on a count/timer policy.
//!
//! ## Write Flow
//!
//! ```text
//! put(msg)
//!     ↓
//! encode frame            ← size validation, nothing on disk on failure
//!     ↓
//! append to segment       ← open lazily, seek to write_pos
//!     ↓
//! write_pos > max_bytes_per_file?
//!     ↓ YES
//! sync + roll             ← fsync, persist metadata, next file starts at 0
//!     ↓
//! count-triggered sync?
//!     ↓
//! return QueueEnd         ← (file_num, pos, total_msg_count)
//! ```
//!
//! ## Concurrency
//!
//! Producers may call `put` from any number of tasks; a single mutex
//! serializes them. A background task wakes every `sync_timeout` and performs
//! the same flush + fsync + metadata persist as a count-triggered sync, so a
//! quiet queue still becomes durable without waiting for the next put.
//!
//! ## Recovery
//!
//! On construction the writer reloads its metadata. A segment longer than the
//! persisted write position means the process died after writing but before
//! persisting; the extra bytes are unaccounted trailing garbage and are
//! truncated away. A segment *shorter* than the persisted position means the
//! metadata promises data that does not exist; that queue cannot be trusted
//! and construction fails with `MetaCorrupt`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::BytesMut;
use queuehouse_core::frame;
use queuehouse_core::{Error, QueueEnd, ReadPosition, Result};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::config::QueueConfig;
use crate::meta::QueueMeta;
use crate::segment::SegmentFiles;

/// Append side of a durable segmented disk queue.
///
/// Cheap to share behind an `Arc`; all operations take `&self`.
#[derive(Debug)]
pub struct DiskQueueWriter {
    name: String,
    inner: Arc<Mutex<WriterCore>>,
    shutdown: Arc<Notify>,
    sync_task: Mutex<Option<JoinHandle<()>>>,
}

#[derive(Debug)]
struct WriterCore {
    name: String,
    files: SegmentFiles,
    meta_path: PathBuf,
    config: QueueConfig,

    write_file: Option<File>,
    write_file_num: i64,
    write_pos: i64,
    total_msg_count: i64,
    puts_since_sync: i64,
    closed: bool,
}

impl DiskQueueWriter {
    /// Open (or recover) the queue named `name` in `data_dir` and start the
    /// sync-timer task.
    pub async fn new(name: &str, data_dir: &Path, config: QueueConfig) -> Result<Self> {
        let files = SegmentFiles::new(name, data_dir);
        let meta_path = files.writer_meta_path();

        let mut core = WriterCore {
            name: name.to_string(),
            files,
            meta_path,
            config: config.clone(),
            write_file: None,
            write_file_num: 0,
            write_pos: 0,
            total_msg_count: 0,
            puts_since_sync: 0,
            closed: false,
        };
        core.restore().await?;

        info!(
            queue = %name,
            file_num = core.write_file_num,
            pos = core.write_pos,
            msg_count = core.total_msg_count,
            "disk queue writer opened"
        );

        let inner = Arc::new(Mutex::new(core));
        let shutdown = Arc::new(Notify::new());
        let sync_task = spawn_sync_task(
            name.to_string(),
            Arc::clone(&inner),
            Arc::clone(&shutdown),
            config.sync_timeout,
        );

        Ok(Self {
            name: name.to_string(),
            inner,
            shutdown,
            sync_task: Mutex::new(Some(sync_task)),
        })
    }

    /// Append one message and return the new queue end.
    ///
    /// The returned end reflects logical order, not durability. Call
    /// [`flush`](Self::flush) first if the end is about to be advertised to
    /// replicas that require the data on disk.
    pub async fn put(&self, msg: &[u8]) -> Result<QueueEnd> {
        let mut core = self.inner.lock().await;
        if core.closed {
            return Err(Error::Closed);
        }
        core.put_one(msg).await
    }

    /// Flush buffered writes, fsync the segment, and persist metadata.
    pub async fn flush(&self) -> Result<()> {
        let mut core = self.inner.lock().await;
        if core.closed {
            return Err(Error::Closed);
        }
        core.sync().await
    }

    /// Delete every segment file and the metadata file, resetting the queue
    /// to empty. Deletion is best-effort: all files are attempted and the
    /// first error is reported. Idempotent.
    pub async fn empty(&self) -> Result<()> {
        let mut core = self.inner.lock().await;
        if core.closed {
            return Err(Error::Closed);
        }
        core.empty().await
    }

    /// Snapshot of the current end without mutating anything.
    pub async fn queue_read_end(&self) -> QueueEnd {
        let core = self.inner.lock().await;
        core.end()
    }

    /// Messages put since the queue was created or last emptied.
    pub async fn total_msg_count(&self) -> i64 {
        self.inner.lock().await.total_msg_count
    }

    /// Current `(file_num, pos)` of the append cursor.
    pub async fn write_position(&self) -> ReadPosition {
        let core = self.inner.lock().await;
        ReadPosition {
            file_num: core.write_file_num,
            pos: core.write_pos,
        }
    }

    /// Final sync, persist metadata, release handles, stop the timer task.
    /// Subsequent puts fail with `Closed`. Idempotent.
    pub async fn close(&self) -> Result<()> {
        let result = {
            let mut core = self.inner.lock().await;
            if core.closed {
                Ok(())
            } else {
                core.closed = true;
                let result = core.sync().await;
                core.write_file = None;
                result
            }
        };

        self.shutdown.notify_one();
        if let Some(task) = self.sync_task.lock().await.take() {
            let _ = task.await;
        }

        debug!(queue = %self.name, "disk queue writer closed");
        result
    }
}

impl WriterCore {
    async fn restore(&mut self) -> Result<()> {
        let Some(meta) = QueueMeta::load(&self.meta_path).await? else {
            return Ok(());
        };
        self.total_msg_count = meta.total_msg_count;
        self.write_file_num = meta.file_num;
        self.write_pos = meta.pos;

        let size = self.files.size_of(self.write_file_num).await?;
        if size < self.write_pos {
            return Err(Error::MetaCorrupt(format!(
                "segment {} is {} bytes but metadata expects {}",
                self.write_file_num, size, self.write_pos
            )));
        }
        if size > self.write_pos {
            warn!(
                queue = %self.name,
                file_num = self.write_file_num,
                size,
                write_pos = self.write_pos,
                "truncating trailing bytes left by unclean shutdown"
            );
            self.files.truncate(self.write_file_num, self.write_pos).await?;
        }
        Ok(())
    }

    fn end(&self) -> QueueEnd {
        QueueEnd {
            file_num: self.write_file_num,
            pos: self.write_pos,
            total_msg_count: self.total_msg_count,
        }
    }

    async fn put_one(&mut self, msg: &[u8]) -> Result<QueueEnd> {
        let mut buf = BytesMut::with_capacity(frame::frame_len(msg));
        frame::encode_frame(
            &mut buf,
            msg,
            self.config.min_msg_size,
            self.config.max_msg_size,
        )?;

        if self.write_file.is_none() {
            let file = self
                .files
                .open_for_append(self.write_file_num, self.write_pos)
                .await?;
            debug!(
                queue = %self.name,
                file_num = self.write_file_num,
                pos = self.write_pos,
                "opened segment for append"
            );
            self.write_file = Some(file);
        }
        let Some(file) = self.write_file.as_mut() else {
            return Err(Error::Io(std::io::Error::other("segment not open")));
        };

        if let Err(e) = file.write_all(&buf).await {
            // A partial frame may be on disk. Drop the handle so the next put
            // reopens and re-seeks to the committed write position.
            self.write_file = None;
            return Err(e.into());
        }

        self.write_pos += buf.len() as i64;
        self.total_msg_count += 1;
        self.puts_since_sync += 1;

        if self.write_pos > self.config.max_bytes_per_file {
            info!(
                queue = %self.name,
                file_num = self.write_file_num,
                size = self.write_pos,
                "segment full, rolling to next file"
            );
            self.sync().await?;
            self.write_file = None;
            self.write_file_num += 1;
            self.write_pos = 0;
        } else if self.puts_since_sync >= self.config.sync_every {
            self.sync().await?;
        }

        Ok(self.end())
    }

    async fn sync(&mut self) -> Result<()> {
        if let Some(file) = self.write_file.as_mut() {
            file.flush().await?;
            file.sync_all().await?;
        }
        self.persist_meta().await?;
        self.puts_since_sync = 0;
        Ok(())
    }

    async fn persist_meta(&self) -> Result<()> {
        QueueMeta {
            total_msg_count: self.total_msg_count,
            file_num: self.write_file_num,
            pos: self.write_pos,
        }
        .save(&self.meta_path)
        .await
    }

    async fn empty(&mut self) -> Result<()> {
        info!(
            queue = %self.name,
            through_file = self.write_file_num,
            "emptying queue"
        );
        self.write_file = None;

        let mut first_err = None;
        if let Err(e) = self.files.remove_through(self.write_file_num).await {
            first_err = Some(e);
        }
        match tokio::fs::remove_file(&self.meta_path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                warn!(queue = %self.name, error = %e, "failed to remove metadata file");
                first_err.get_or_insert(e.into());
            }
        }

        self.write_file_num = 0;
        self.write_pos = 0;
        self.total_msg_count = 0;
        self.puts_since_sync = 0;

        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

fn spawn_sync_task(
    name: String,
    inner: Arc<Mutex<WriterCore>>,
    shutdown: Arc<Notify>,
    timeout: std::time::Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let start = tokio::time::Instant::now() + timeout;
        let mut ticker = tokio::time::interval_at(start, timeout);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let mut core = inner.lock().await;
                    if core.closed {
                        break;
                    }
                    if core.puts_since_sync > 0 {
                        if let Err(e) = core.sync().await {
                            error!(queue = %name, error = %e, "timed sync failed");
                        }
                    }
                }
                _ = shutdown.notified() => break,
            }
        }
    })
}
