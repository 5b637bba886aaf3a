//! Disk Queue Reader
//!
//! `DiskQueueReader` owns the consume path of a queue. A single background
//! worker task holds all mutable reader state (the cursors, the open segment
//! handle, the staged message), so the decode position is never shared across
//! threads. The outside world talks to the worker through two channels:
//!
//! - an inbound command channel (`update_queue_end`, `skip_to_end`,
//!   `reset_read_to`, `close`)
//! - a bounded outbound message channel, handed to consumers via
//!   [`ReadChan`]
//!
//! ## Cursors
//!
//! The worker keeps two positions:
//!
//! - `next_read`: the decode cursor, where the next frame will be read from.
//!   It runs ahead by the staged message plus the one sitting in the output
//!   channel.
//! - `read_pos`: the committed cursor, persisted to the reader's metadata
//!   file. It advances only once a consumer has received the message, so a
//!   message handed to the channel but never received is redelivered after a
//!   restart. Segments are deleted when the committed cursor moves past them.
//!
//! ## Worker Loop
//!
//! ```text
//! loop:
//!   decode cursor caught up with the published end? → park on commands
//!   intermediate segment fully decoded?             → advance to the next
//!   decode one frame
//!     corrupt + more segments ahead                 → drop rest of segment, resync
//!     corrupt in the tail segment                   → park until the end moves past it
//!     ok                                            → stage message
//!   offer on the output channel (suspension point)
//!   channel slot free = previous message received   → commit it, send the next
//! ```
//!
//! The worker never decodes bytes beyond the writer-published end, even when
//! it is tailing the segment the writer is still appending to.
//!
//! ## Corruption
//!
//! A frame with a zero or oversized length prefix, or a segment that ends
//! mid-frame, marks the rest of that segment as garbage. The worker logs a
//! warning, bumps a counter visible through
//! [`DiskQueueReader::corruption_events`], and continues at the next segment.
//! The reader does not halt on corruption.

use std::path::PathBuf;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use queuehouse_core::frame::{self, FRAME_HEADER_LEN};
use queuehouse_core::{Error, QueueEnd, ReadPosition, Result};
use tokio::fs::File;
use tokio::io::{AsyncReadExt, BufReader};
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::config::QueueConfig;
use crate::meta::QueueMeta;
use crate::segment::SegmentFiles;

const READ_BUFFER_SIZE: usize = 64 * 1024;

/// One delivered message: the payload and the cursor position immediately
/// after its frame.
#[derive(Debug, Clone)]
pub struct ReadResult {
    pub data: Bytes,
    pub offset: ReadPosition,
}

/// Cloneable handle on the reader's bounded output channel. Multiple
/// consumer tasks may share one; each message is delivered exactly once.
#[derive(Clone)]
pub struct ReadChan {
    rx: Arc<Mutex<mpsc::Receiver<ReadResult>>>,
}

impl ReadChan {
    /// Receive the next message. `None` once the reader is closed and the
    /// channel is drained.
    pub async fn recv(&self) -> Option<ReadResult> {
        self.rx.lock().await.recv().await
    }
}

enum Command {
    UpdateEnd(QueueEnd, oneshot::Sender<Result<()>>),
    SkipToEnd(oneshot::Sender<Result<()>>),
    ResetReadTo(ReadPosition, oneshot::Sender<Result<()>>),
    Close(oneshot::Sender<Result<()>>),
}

struct Gauges {
    end_count: AtomicI64,
    read_count: AtomicI64,
    corruptions: AtomicU64,
}

/// Consume side of a durable segmented disk queue.
pub struct DiskQueueReader {
    name: String,
    commands: mpsc::UnboundedSender<Command>,
    chan: ReadChan,
    gauges: Arc<Gauges>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl DiskQueueReader {
    /// Open the reader identified by `reader_id` for the queue `name` in
    /// `data_dir`, restore its cursor, and start the worker task.
    pub async fn new(
        name: &str,
        reader_id: &str,
        data_dir: &std::path::Path,
        config: QueueConfig,
    ) -> Result<Self> {
        let files = SegmentFiles::new(name, data_dir);
        let meta_path = files.reader_meta_path(reader_id);
        let meta = QueueMeta::load(&meta_path).await?.unwrap_or_default();

        info!(
            queue = %name,
            reader = %reader_id,
            file_num = meta.file_num,
            pos = meta.pos,
            msg_count = meta.total_msg_count,
            "disk queue reader opened"
        );

        let gauges = Arc::new(Gauges {
            end_count: AtomicI64::new(meta.total_msg_count),
            read_count: AtomicI64::new(meta.total_msg_count),
            corruptions: AtomicU64::new(0),
        });

        let cursor = ReadPosition {
            file_num: meta.file_num,
            pos: meta.pos,
        };
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (out_tx, out_rx) = mpsc::channel(1);

        let worker = ReaderWorker {
            name: name.to_string(),
            reader_id: reader_id.to_string(),
            files,
            meta_path,
            config,
            open: None,
            read_pos: cursor,
            next_read: cursor,
            read_msg_count: meta.total_msg_count,
            queue_end: QueueEnd {
                file_num: meta.file_num,
                pos: meta.pos,
                total_msg_count: meta.total_msg_count,
            },
            staged: None,
            inflight: None,
            msgs_since_sync: 0,
            dirty: false,
            gauges: Arc::clone(&gauges),
            out: out_tx,
            commands: cmd_rx,
        };
        let handle = tokio::spawn(worker.run());

        Ok(Self {
            name: name.to_string(),
            commands: cmd_tx,
            chan: ReadChan {
                rx: Arc::new(Mutex::new(out_rx)),
            },
            gauges,
            worker: Mutex::new(Some(handle)),
        })
    }

    /// The bounded output channel carrying decoded messages.
    pub fn read_chan(&self) -> ReadChan {
        self.chan.clone()
    }

    /// Publish a new queue end for the worker to read up to.
    ///
    /// Ends must be monotonically non-decreasing. The one exception is the
    /// signature of a queue that was emptied and reused (position and total
    /// message count both below the previous end), which rewinds the reader
    /// to the start. Any other regression is rejected.
    pub async fn update_queue_end(&self, end: QueueEnd) -> Result<()> {
        self.roundtrip(|reply| Command::UpdateEnd(end, reply)).await
    }

    /// Messages published but not yet received by a consumer.
    pub fn depth(&self) -> i64 {
        self.gauges.end_count.load(Ordering::Relaxed)
            - self.gauges.read_count.load(Ordering::Relaxed)
    }

    /// Count of corrupt-frame events the worker has skipped past.
    pub fn corruption_events(&self) -> u64 {
        self.gauges.corruptions.load(Ordering::Relaxed)
    }

    /// Advance the cursor to the current end, deleting fully-consumed
    /// segments, and persist it.
    pub async fn skip_to_end(&self) -> Result<()> {
        self.roundtrip(Command::SkipToEnd).await
    }

    /// Move the durable cursor to an arbitrary frame boundary. Positions that
    /// do not land on a frame boundary, or lie beyond the published end, are
    /// rejected without changing state.
    pub async fn reset_read_to(&self, pos: ReadPosition) -> Result<()> {
        self.roundtrip(|reply| Command::ResetReadTo(pos, reply)).await
    }

    /// Persist the cursor and stop the worker. Consumers blocked on
    /// [`ReadChan::recv`] observe end-of-channel. Idempotent.
    pub async fn close(&self) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        if self.commands.send(Command::Close(reply)).is_err() {
            return Ok(());
        }
        let result = rx.await.unwrap_or(Ok(()));
        if let Some(handle) = self.worker.lock().await.take() {
            let _ = handle.await;
        }
        debug!(queue = %self.name, "disk queue reader closed");
        result
    }

    async fn roundtrip(
        &self,
        make: impl FnOnce(oneshot::Sender<Result<()>>) -> Command,
    ) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(make(reply))
            .map_err(|_| Error::Closed)?;
        rx.await.map_err(|_| Error::Closed)?
    }
}

struct Staged {
    result: ReadResult,
    post: ReadPosition,
}

enum SegmentSource {
    Direct(File),
    Buffered(BufReader<File>),
}

impl SegmentSource {
    async fn read_exact(&mut self, buf: &mut [u8]) -> std::io::Result<()> {
        match self {
            SegmentSource::Direct(file) => file.read_exact(buf).await.map(|_| ()),
            SegmentSource::Buffered(reader) => reader.read_exact(buf).await.map(|_| ()),
        }
    }
}

struct OpenSegment {
    src: SegmentSource,
    at: ReadPosition,
}

struct ReaderWorker {
    name: String,
    reader_id: String,
    files: SegmentFiles,
    meta_path: PathBuf,
    config: QueueConfig,

    open: Option<OpenSegment>,
    /// Committed cursor, persisted to metadata.
    read_pos: ReadPosition,
    /// Decode cursor, ahead of `read_pos` by the staged and in-channel
    /// messages.
    next_read: ReadPosition,
    read_msg_count: i64,
    queue_end: QueueEnd,
    staged: Option<Staged>,
    /// Post-frame position of the message sitting in the output channel.
    inflight: Option<ReadPosition>,
    msgs_since_sync: i64,
    dirty: bool,

    gauges: Arc<Gauges>,
    out: mpsc::Sender<ReadResult>,
    commands: mpsc::UnboundedReceiver<Command>,
}

impl ReaderWorker {
    async fn run(mut self) {
        let start = tokio::time::Instant::now() + self.config.sync_timeout;
        let mut sync_ticker = tokio::time::interval_at(start, self.config.sync_timeout);
        sync_ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            if self.staged.is_none() {
                self.fill_staged().await;
            }

            let out = self.out.clone();
            tokio::select! {
                biased;

                cmd = self.commands.recv() => {
                    match cmd {
                        Some(Command::UpdateEnd(end, reply)) => {
                            let _ = reply.send(self.update_end(end).await);
                        }
                        Some(Command::SkipToEnd(reply)) => {
                            let _ = reply.send(self.skip_to_end().await);
                        }
                        Some(Command::ResetReadTo(pos, reply)) => {
                            let _ = reply.send(self.reset_read_to(pos).await);
                        }
                        Some(Command::Close(reply)) => {
                            self.commit_received().await;
                            let _ = reply.send(self.persist().await);
                            break;
                        }
                        None => {
                            self.commit_received().await;
                            if self.dirty {
                                let _ = self.persist().await;
                            }
                            break;
                        }
                    }
                }

                permit = out.reserve(), if self.staged.is_some() || self.inflight.is_some() => {
                    match permit {
                        Ok(permit) => {
                            // A free slot means any previously-sent message
                            // has been received.
                            if let Some(post) = self.inflight.take() {
                                self.commit(post).await;
                            }
                            if let Some(staged) = self.staged.take() {
                                self.inflight = Some(staged.post);
                                permit.send(staged.result);
                            }
                        }
                        Err(_) => break,
                    }
                }

                _ = sync_ticker.tick() => {
                    if self.dirty {
                        if let Err(e) = self.persist().await {
                            error!(
                                queue = %self.name,
                                reader = %self.reader_id,
                                error = %e,
                                "failed to persist read cursor"
                            );
                        }
                    }
                }
            }
        }

        info!(queue = %self.name, reader = %self.reader_id, "reader worker stopped");
    }

    /// Commit the in-channel message if a consumer has already received it.
    async fn commit_received(&mut self) {
        if self.inflight.is_some() && self.out.try_reserve().is_ok() {
            if let Some(post) = self.inflight.take() {
                self.commit(post).await;
            }
        }
    }

    /// Decode forward until a message is staged, the decode cursor catches up
    /// with the published end, or the next frame is not yet readable.
    async fn fill_staged(&mut self) {
        while self.staged.is_none() {
            let end = self.queue_end;
            if self.next_read >= end.position() {
                return;
            }

            if self.next_read.file_num < end.file_num {
                let size = match self.files.size_of(self.next_read.file_num).await {
                    Ok(size) => size,
                    Err(e) => {
                        error!(
                            queue = %self.name,
                            reader = %self.reader_id,
                            file_num = self.next_read.file_num,
                            error = %e,
                            "failed to stat segment"
                        );
                        return;
                    }
                };
                if self.next_read.pos >= size {
                    self.advance_segment().await;
                    continue;
                }
            }

            match self.decode_next(end).await {
                Ok(Some(staged)) => {
                    self.staged = Some(staged);
                }
                Ok(None) => return,
                Err(e) if e.is_corruption() => {
                    self.gauges.corruptions.fetch_add(1, Ordering::Relaxed);
                    if self.next_read.file_num < end.file_num {
                        warn!(
                            queue = %self.name,
                            reader = %self.reader_id,
                            file_num = self.next_read.file_num,
                            pos = self.next_read.pos,
                            error = %e,
                            "corrupt frame, dropping rest of segment"
                        );
                        self.advance_segment().await;
                        continue;
                    }
                    warn!(
                        queue = %self.name,
                        reader = %self.reader_id,
                        file_num = self.next_read.file_num,
                        pos = self.next_read.pos,
                        error = %e,
                        "corrupt frame in tail segment, waiting for queue end to advance"
                    );
                    return;
                }
                Err(e) => {
                    error!(
                        queue = %self.name,
                        reader = %self.reader_id,
                        file_num = self.next_read.file_num,
                        pos = self.next_read.pos,
                        error = %e,
                        "segment read failed"
                    );
                    return;
                }
            }
        }
    }

    /// Read one frame at the decode cursor. `Ok(None)` means the frame is not
    /// yet available inside the published end.
    async fn decode_next(&mut self, end: QueueEnd) -> Result<Option<Staged>> {
        let start = self.next_read;
        if start.file_num == end.file_num && start.pos + FRAME_HEADER_LEN as i64 > end.pos {
            return Ok(None);
        }

        self.ensure_open().await?;
        let max_msg_size = self.config.max_msg_size;

        let mut header = [0u8; FRAME_HEADER_LEN];
        let Some(open) = self.open.as_mut() else {
            return Ok(None);
        };
        if let Err(e) = open.src.read_exact(&mut header).await {
            self.open = None;
            return Err(self.map_read_err(e, start.pos, FRAME_HEADER_LEN).await?);
        }

        let len = u32::from_be_bytes(header);
        let payload_len = match frame::validate_frame_len(len, max_msg_size) {
            Ok(payload_len) => payload_len,
            Err(e) => {
                self.open = None;
                return Err(e);
            }
        };

        let post = ReadPosition {
            file_num: start.file_num,
            pos: start.pos + (FRAME_HEADER_LEN + payload_len) as i64,
        };
        if start.file_num == end.file_num && post.pos > end.pos {
            // The header was consumed off the source; force a re-seek when
            // this frame becomes readable.
            self.open = None;
            return Ok(None);
        }

        let mut payload = vec![0u8; payload_len];
        let Some(open) = self.open.as_mut() else {
            return Ok(None);
        };
        if let Err(e) = open.src.read_exact(&mut payload).await {
            self.open = None;
            return Err(self
                .map_read_err(e, start.pos + FRAME_HEADER_LEN as i64, payload_len)
                .await?);
        }
        open.at = post;
        self.next_read = post;

        Ok(Some(Staged {
            result: ReadResult {
                data: Bytes::from(payload),
                offset: post,
            },
            post,
        }))
    }

    async fn ensure_open(&mut self) -> Result<()> {
        let positioned = self.open.as_ref().is_some_and(|o| o.at == self.next_read);
        if positioned {
            return Ok(());
        }

        let file = self
            .files
            .open_for_read(self.next_read.file_num, self.next_read.pos)
            .await?;
        let src = if self.config.read_buffer_enabled {
            SegmentSource::Buffered(BufReader::with_capacity(READ_BUFFER_SIZE, file))
        } else {
            SegmentSource::Direct(file)
        };
        debug!(
            queue = %self.name,
            reader = %self.reader_id,
            file_num = self.next_read.file_num,
            pos = self.next_read.pos,
            "opened segment for read"
        );
        self.open = Some(OpenSegment {
            src,
            at: self.next_read,
        });
        Ok(())
    }

    /// Map an EOF from `read_exact` to `ShortRead` with the byte counts the
    /// segment actually holds past `from`.
    async fn map_read_err(&mut self, e: std::io::Error, from: i64, wanted: usize) -> Result<Error> {
        if e.kind() != std::io::ErrorKind::UnexpectedEof {
            return Ok(Error::Io(e));
        }
        let size = self.files.size_of(self.next_read.file_num).await?;
        Ok(Error::ShortRead {
            wanted,
            got: (size - from).max(0) as usize,
        })
    }

    /// Move the decode cursor to the start of the next segment. The exhausted
    /// segment is deleted later, when the committed cursor moves past it.
    async fn advance_segment(&mut self) {
        self.open = None;
        debug!(
            queue = %self.name,
            reader = %self.reader_id,
            file_num = self.next_read.file_num,
            "segment decoded, advancing"
        );
        self.next_read = ReadPosition {
            file_num: self.next_read.file_num + 1,
            pos: 0,
        };
    }

    /// Advance the committed cursor to `post`, deleting segments it has fully
    /// consumed, and persist the cursor every `sync_every` messages.
    async fn commit(&mut self, post: ReadPosition) {
        while self.read_pos.file_num < post.file_num {
            if let Err(e) = self.files.remove(self.read_pos.file_num).await {
                warn!(
                    queue = %self.name,
                    reader = %self.reader_id,
                    file_num = self.read_pos.file_num,
                    error = %e,
                    "failed to remove consumed segment"
                );
            }
            self.read_pos.file_num += 1;
        }
        self.read_pos = post;
        self.read_msg_count += 1;
        self.gauges
            .read_count
            .store(self.read_msg_count, Ordering::Relaxed);
        self.msgs_since_sync += 1;
        self.dirty = true;
        if self.msgs_since_sync >= self.config.sync_every {
            if let Err(e) = self.persist().await {
                error!(
                    queue = %self.name,
                    reader = %self.reader_id,
                    error = %e,
                    "failed to persist read cursor"
                );
            }
        }
    }

    async fn update_end(&mut self, end: QueueEnd) -> Result<()> {
        let prev = self.queue_end;
        if end == prev {
            return Ok(());
        }

        if end.position() < prev.position() {
            if end.total_msg_count < prev.total_msg_count {
                warn!(
                    queue = %self.name,
                    reader = %self.reader_id,
                    %prev,
                    new = %end,
                    "queue end regressed with message count, assuming queue was emptied; rewinding"
                );
                self.staged = None;
                self.inflight = None;
                self.open = None;
                self.read_pos = ReadPosition::default();
                self.next_read = ReadPosition::default();
                self.read_msg_count = 0;
                self.gauges.read_count.store(0, Ordering::Relaxed);
                self.dirty = true;
                self.persist().await?;
            } else {
                return Err(Error::InvalidReadPosition(format!(
                    "queue end regressed from {prev} to {end}"
                )));
            }
        }

        self.queue_end = end;
        self.gauges
            .end_count
            .store(end.total_msg_count, Ordering::Relaxed);
        Ok(())
    }

    async fn skip_to_end(&mut self) -> Result<()> {
        let end = self.queue_end;
        info!(
            queue = %self.name,
            reader = %self.reader_id,
            %end,
            "skipping read cursor to queue end"
        );
        self.staged = None;
        self.inflight = None;
        self.open = None;

        let mut file_num = self.read_pos.file_num;
        while file_num < end.file_num {
            if let Err(e) = self.files.remove(file_num).await {
                warn!(
                    queue = %self.name,
                    reader = %self.reader_id,
                    file_num,
                    error = %e,
                    "failed to remove skipped segment"
                );
            }
            file_num += 1;
        }

        self.read_pos = end.position();
        self.next_read = end.position();
        self.read_msg_count = end.total_msg_count;
        self.gauges
            .read_count
            .store(end.total_msg_count, Ordering::Relaxed);
        self.dirty = true;
        self.persist().await
    }

    /// Move both cursors to `pos` after proving it lies on a frame boundary
    /// by walking the segment's frames from the start.
    ///
    /// The message count cannot be recovered for an arbitrary position, so
    /// `depth()` is approximate until the next skip or empty.
    async fn reset_read_to(&mut self, pos: ReadPosition) -> Result<()> {
        let end = self.queue_end;
        if pos.file_num < 0 || pos.pos < 0 || pos > end.position() {
            return Err(Error::InvalidReadPosition(format!(
                "{pos} is outside the published queue end {end}"
            )));
        }

        if pos.pos > 0 {
            let unaligned =
                || Error::InvalidReadPosition(format!("{pos} is not on a frame boundary"));
            let file = self.files.open_for_read(pos.file_num, 0).await?;
            let mut src = BufReader::with_capacity(READ_BUFFER_SIZE, file);
            let mut off: i64 = 0;
            while off < pos.pos {
                let mut header = [0u8; FRAME_HEADER_LEN];
                src.read_exact(&mut header).await.map_err(|_| unaligned())?;
                let len = u32::from_be_bytes(header);
                let payload_len = frame::validate_frame_len(len, self.config.max_msg_size)
                    .map_err(|_| unaligned())?;
                let mut payload = vec![0u8; payload_len];
                src.read_exact(&mut payload).await.map_err(|_| unaligned())?;
                off += (FRAME_HEADER_LEN + payload_len) as i64;
            }
            if off != pos.pos {
                return Err(unaligned());
            }
        }

        info!(
            queue = %self.name,
            reader = %self.reader_id,
            %pos,
            "read cursor reset"
        );
        self.staged = None;
        self.inflight = None;
        self.open = None;
        self.read_pos = pos;
        self.next_read = pos;
        self.dirty = true;
        self.persist().await
    }

    async fn persist(&mut self) -> Result<()> {
        QueueMeta {
            total_msg_count: self.read_msg_count,
            file_num: self.read_pos.file_num,
            pos: self.read_pos.pos,
        }
        .save(&self.meta_path)
        .await?;
        self.msgs_since_sync = 0;
        self.dirty = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::DiskQueueWriter;
    use std::time::Duration;
    use tempfile::TempDir;

    fn config(max_bytes_per_file: i64) -> QueueConfig {
        QueueConfig {
            max_bytes_per_file,
            min_msg_size: 0,
            max_msg_size: 1 << 10,
            sync_every: 2500,
            ..Default::default()
        }
    }

    async fn wait_for_depth(reader: &DiskQueueReader, want: i64) {
        for _ in 0..500 {
            if reader.depth() == want {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(reader.depth(), want);
    }

    async fn filled_queue(
        tmp: &TempDir,
        max_bytes_per_file: i64,
        count: usize,
        msg: &[u8],
    ) -> (DiskQueueWriter, QueueEnd) {
        let writer = DiskQueueWriter::new("rq", tmp.path(), config(max_bytes_per_file))
            .await
            .unwrap();
        let mut end = QueueEnd::default();
        for _ in 0..count {
            end = writer.put(msg).await.unwrap();
        }
        (writer, end)
    }

    #[tokio::test]
    async fn test_reader_delivers_in_order() {
        let tmp = TempDir::new().unwrap();
        let writer = DiskQueueWriter::new("rq", tmp.path(), config(1024))
            .await
            .unwrap();
        let reader = DiskQueueReader::new("rq", "ch", tmp.path(), config(1024))
            .await
            .unwrap();

        let mut end = QueueEnd::default();
        for i in 0u8..5 {
            end = writer.put(&[i; 10]).await.unwrap();
        }
        reader.update_queue_end(end).await.unwrap();

        let chan = reader.read_chan();
        for i in 0u8..5 {
            let msg = chan.recv().await.unwrap();
            assert_eq!(msg.data.as_ref(), &[i; 10]);
            assert_eq!(msg.offset.pos, 14 * (i as i64 + 1));
        }
        wait_for_depth(&reader, 0).await;

        reader.close().await.unwrap();
        writer.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_update_end_rejects_bare_regression() {
        let tmp = TempDir::new().unwrap();
        let (writer, end) = filled_queue(&tmp, 1024, 5, &[0; 10]).await;
        let reader = DiskQueueReader::new("rq", "ch", tmp.path(), config(1024))
            .await
            .unwrap();

        reader.update_queue_end(end).await.unwrap();
        // same count, smaller position: caller bug, not an empty
        let bogus = QueueEnd {
            file_num: 0,
            pos: 14,
            total_msg_count: end.total_msg_count,
        };
        let err = reader.update_queue_end(bogus).await.unwrap_err();
        assert!(matches!(err, Error::InvalidReadPosition(_)));

        // re-publishing the same end is fine
        reader.update_queue_end(end).await.unwrap();

        reader.close().await.unwrap();
        writer.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_never_reads_past_published_end() {
        let tmp = TempDir::new().unwrap();
        let writer = DiskQueueWriter::new("rq", tmp.path(), config(1024))
            .await
            .unwrap();
        let reader = DiskQueueReader::new("rq", "ch", tmp.path(), config(1024))
            .await
            .unwrap();

        let first = writer.put(&[1; 10]).await.unwrap();
        writer.put(&[2; 10]).await.unwrap();

        // only the first message is published
        reader.update_queue_end(first).await.unwrap();
        let chan = reader.read_chan();
        let msg = chan.recv().await.unwrap();
        assert_eq!(msg.data.as_ref(), &[1; 10]);
        wait_for_depth(&reader, 0).await;

        let second = writer.queue_read_end().await;
        reader.update_queue_end(second).await.unwrap();
        let msg = chan.recv().await.unwrap();
        assert_eq!(msg.data.as_ref(), &[2; 10]);

        reader.close().await.unwrap();
        writer.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_skip_to_end_drops_pending_and_persists() {
        let tmp = TempDir::new().unwrap();
        let (writer, end) = filled_queue(&tmp, 1024, 10, &[7; 10]).await;
        let reader = DiskQueueReader::new("rq", "ch", tmp.path(), config(1024))
            .await
            .unwrap();

        reader.update_queue_end(end).await.unwrap();
        reader.skip_to_end().await.unwrap();
        assert_eq!(reader.depth(), 0);

        let meta = QueueMeta::load(&tmp.path().join("rq.diskqueue.ch.meta.dat"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(meta.total_msg_count, 10);
        assert_eq!(meta.pos, end.pos);

        // a new message after the skip is still delivered; one pre-skip
        // message may already sit in the channel buffer
        let end = writer.put(&[9; 10]).await.unwrap();
        reader.update_queue_end(end).await.unwrap();
        let chan = reader.read_chan();
        let mut msg = chan.recv().await.unwrap();
        if msg.data.as_ref() == [7u8; 10] {
            msg = chan.recv().await.unwrap();
        }
        assert_eq!(msg.data.as_ref(), &[9; 10]);

        reader.close().await.unwrap();
        writer.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_reset_read_to_frame_boundaries() {
        let tmp = TempDir::new().unwrap();
        let (writer, end) = filled_queue(&tmp, 1024, 5, &[3; 10]).await;
        writer.flush().await.unwrap();
        let reader = DiskQueueReader::new("rq", "ch", tmp.path(), config(1024))
            .await
            .unwrap();
        reader.update_queue_end(end).await.unwrap();

        // frames are 14 bytes; 28 is the boundary after the 2nd message
        reader
            .reset_read_to(ReadPosition {
                file_num: 0,
                pos: 28,
            })
            .await
            .unwrap();
        // the first pre-reset message may already sit in the channel buffer
        let chan = reader.read_chan();
        let mut msg = chan.recv().await.unwrap();
        if msg.offset.pos == 14 {
            msg = chan.recv().await.unwrap();
        }
        assert_eq!(msg.offset.pos, 42);

        for bad_pos in [1, 13, 15, 27] {
            let err = reader
                .reset_read_to(ReadPosition {
                    file_num: 0,
                    pos: bad_pos,
                })
                .await
                .unwrap_err();
            assert!(
                matches!(err, Error::InvalidReadPosition(_)),
                "accepted unaligned pos {bad_pos}"
            );
        }

        // beyond the published end
        let err = reader
            .reset_read_to(ReadPosition {
                file_num: 0,
                pos: end.pos + 14,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidReadPosition(_)));

        reader.close().await.unwrap();
        writer.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_close_unblocks_consumers() {
        let tmp = TempDir::new().unwrap();
        let reader = Arc::new(
            DiskQueueReader::new("rq", "ch", tmp.path(), config(1024))
                .await
                .unwrap(),
        );

        let chan = reader.read_chan();
        let consumer = tokio::spawn(async move { chan.recv().await });

        tokio::time::sleep(Duration::from_millis(50)).await;
        reader.close().await.unwrap();
        reader.close().await.unwrap();

        assert!(consumer.await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_restart_resumes_from_received_cursor() {
        let tmp = TempDir::new().unwrap();
        let (writer, end) = filled_queue(&tmp, 1024, 6, &[5; 10]).await;
        writer.flush().await.unwrap();

        {
            let reader = DiskQueueReader::new("rq", "ch", tmp.path(), config(1024))
                .await
                .unwrap();
            reader.update_queue_end(end).await.unwrap();
            let chan = reader.read_chan();
            for _ in 0..3 {
                chan.recv().await.unwrap();
            }
            reader.close().await.unwrap();
        }

        // only the 3 received messages are committed; anything handed to the
        // channel but never received is redelivered
        let reader = DiskQueueReader::new("rq", "ch", tmp.path(), config(1024))
            .await
            .unwrap();
        reader.update_queue_end(end).await.unwrap();
        assert_eq!(reader.depth(), 3);
        let chan = reader.read_chan();
        for i in 4..=6 {
            let msg = chan.recv().await.unwrap();
            assert_eq!(msg.offset.pos, 14 * i);
        }
        wait_for_depth(&reader, 0).await;
        reader.close().await.unwrap();
        writer.close().await.unwrap();
    }
}
