//! Queue Metadata Persistence
//!
//! Both sides of a queue persist a three-field tuple (message count, segment
//! number, byte offset) in a small text file:
//!
//! ```text
//! totalMsgCount\n
//! fileNum,pos\n
//! ```
//!
//! Saves are atomic: write to a `.tmp` sibling, fsync, rename over the real
//! name. A missing file on first use is a fresh queue, not an error;
//! unparseable contents are `MetaCorrupt` and fatal for the instance.

use std::path::Path;

use queuehouse_core::{Error, Result};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct QueueMeta {
    pub total_msg_count: i64,
    pub file_num: i64,
    pub pos: i64,
}

impl QueueMeta {
    /// Load metadata from `path`. `Ok(None)` when the file does not exist.
    pub async fn load(path: &Path) -> Result<Option<QueueMeta>> {
        let raw = match tokio::fs::read_to_string(path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Self::parse(&raw)
            .ok_or_else(|| {
                Error::MetaCorrupt(format!("unparseable metadata in {}: {raw:?}", path.display()))
            })
            .map(Some)
    }

    fn parse(raw: &str) -> Option<QueueMeta> {
        let mut lines = raw.lines();
        let total_msg_count: i64 = lines.next()?.trim().parse().ok()?;
        let (file_num, pos) = lines.next()?.trim().split_once(',')?;
        let file_num: i64 = file_num.parse().ok()?;
        let pos: i64 = pos.parse().ok()?;
        if total_msg_count < 0 || file_num < 0 || pos < 0 {
            return None;
        }
        Some(QueueMeta {
            total_msg_count,
            file_num,
            pos,
        })
    }

    /// Atomically replace the metadata at `path` with this tuple.
    pub async fn save(&self, path: &Path) -> Result<()> {
        let tmp_path = path.with_extension("tmp");

        let mut file = File::create(&tmp_path).await?;
        let contents = format!("{}\n{},{}\n", self.total_msg_count, self.file_num, self.pos);
        file.write_all(contents.as_bytes()).await?;
        file.sync_all().await?;
        drop(file);

        tokio::fs::rename(&tmp_path, path).await?;
        Ok(())
    }
}
