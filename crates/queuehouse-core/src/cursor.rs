//! Queue Cursors
//!
//! Two small value types describe positions in a segmented disk queue:
//!
//! - `QueueEnd` is published by the writer after every Put(). It is the upper
//!   bound readers may read up to, plus the running message count. The cluster
//!   layer treats it as an opaque token: it only compares ends for ordering
//!   and passes them between nodes.
//! - `ReadPosition` is a reader's durable cursor.
//!
//! Both order lexicographically by `(file_num, pos)`, which is the on-disk
//! order of frames. Over the life of a queue (ignoring Empty()) every
//! published end is `>=` all ends published before it.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The writer-published upper bound for readers.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct QueueEnd {
    /// Segment sequence number of the writer's current file.
    pub file_num: i64,
    /// Byte offset of the next write within that segment.
    pub pos: i64,
    /// Messages put since the queue was created or last emptied.
    pub total_msg_count: i64,
}

impl QueueEnd {
    /// The end as a bare position, for comparison against a read cursor.
    pub fn position(&self) -> ReadPosition {
        ReadPosition {
            file_num: self.file_num,
            pos: self.pos,
        }
    }
}

impl fmt::Display for QueueEnd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "(file: {}, pos: {}, count: {})",
            self.file_num, self.pos, self.total_msg_count
        )
    }
}

/// A reader's position within the queue: segment number and byte offset.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct ReadPosition {
    pub file_num: i64,
    pub pos: i64,
}

impl fmt::Display for ReadPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(file: {}, pos: {})", self.file_num, self.pos)
    }
}
