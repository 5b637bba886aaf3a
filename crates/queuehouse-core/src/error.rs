//! Error Types for the QueueHouse Storage Core
//!
//! This module defines all error types that can occur in disk queue operations.
//!
//! ## Error Categories
//!
//! ### Argument Errors
//! - `InvalidMessageSize`: Put() payload outside the configured size bounds
//! - `InvalidReadPosition`: non-monotonic queue end, or a cursor reset that
//!   does not land on a frame boundary
//!
//! ### I/O Errors
//! - `Io`: any file system operation failure (write, fsync, rename, stat)
//!
//! ### Data Integrity Errors
//! - `BadFrameLength`: a frame length prefix of zero, or larger than the
//!   configured maximum message size
//! - `ShortRead`: EOF before a full frame could be read
//!
//! ### Fatal Errors
//! - `MetaCorrupt`: metadata file unparseable, or ahead of the segment data
//!   on recovery; the queue instance cannot be trusted
//! - `Closed`: operation attempted after Close()
//!
//! ## Usage
//!
//! All queue operations return `Result<T>`, aliased to `Result<T, Error>`,
//! so errors propagate cleanly with `?`.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("message size {size} out of bounds [{min}, {max}]")]
    InvalidMessageSize { size: usize, min: i32, max: i32 },

    #[error("invalid read position: {0}")]
    InvalidReadPosition(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("bad frame length {len} (max {max})")]
    BadFrameLength { len: u32, max: i32 },

    #[error("short read: wanted {wanted} bytes, got {got}")]
    ShortRead { wanted: usize, got: usize },

    #[error("metadata corrupt: {0}")]
    MetaCorrupt(String),

    #[error("queue is closed")]
    Closed,
}

impl Error {
    /// Frame-level corruption that the reader recovers from by resyncing to
    /// the next segment, as opposed to errors surfaced to the caller.
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            Error::BadFrameLength { .. } | Error::ShortRead { .. }
        )
    }
}
