//! QueueHouse Storage Layer
//!
//! This crate implements the durable, segmented disk-backed FIFO queue that
//! backs one topic partition of a QueueHouse broker. Producers append opaque
//! byte messages; a single logical consumer reads them back in order. The
//! queue survives process restarts, rolls to a new segment file when a size
//! limit is reached, tolerates trailing corruption, and keeps the reader's
//! cursor independent of (and never ahead of) the writer's published end.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────┐
//! │  Producers  │
//! └──────┬──────┘
//!        │ put(bytes)
//!        ▼
//! ┌─────────────────┐  frames   ┌──────────────────────────┐
//! │ DiskQueueWriter ├──────────▶│ segment files            │
//! │ - frames        │           │ name.diskqueue.000000.dat│
//! │ - rolls         │           │ name.diskqueue.000001.dat│
//! │ - syncs         │           │ ...                      │
//! └────────┬────────┘           └────────────┬─────────────┘
//!          │ QueueEnd                        │ frames
//!          ▼                                 ▼
//! ┌─────────────────┐  update   ┌──────────────────────────┐
//! │  broker layer   ├──────────▶│ DiskQueueReader          │
//! └─────────────────┘           │ - decodes up to the end  │
//!                               │ - resyncs on corruption  │
//!                               │ - bounded output channel │
//!                               └────────────┬─────────────┘
//!                                            ▼
//!                                       ┌──────────┐
//!                                       │ Consumer │
//!                                       └──────────┘
//! ```
//!
//! ## Main Components
//!
//! ### DiskQueueWriter
//! Serializes concurrent producers, appends length-prefixed frames to the
//! current segment, rolls segments past the size threshold, and flushes +
//! fsyncs on a count/timer policy. Every `put` returns the new [`QueueEnd`],
//! which the broker forwards to readers.
//!
//! ### DiskQueueReader
//! A single background worker owns the read cursor. It decodes frames from
//! its persisted position up to (never past) the published end, deletes
//! segments it has fully consumed, skips the remainder of a segment when it
//! finds a corrupt frame, and offers each message on a bounded channel.
//!
//! ### Durability
//! A put is durable only after the next sync (count- or time-triggered), an
//! explicit [`DiskQueueWriter::flush`], or a successful close. The returned
//! `QueueEnd` reflects logical order, not durability.
//!
//! [`QueueEnd`]: queuehouse_core::QueueEnd

pub mod config;
pub mod meta;
pub mod reader;
pub mod segment;
pub mod writer;

pub use config::QueueConfig;
pub use meta::QueueMeta;
pub use reader::{DiskQueueReader, ReadChan, ReadResult};
pub use segment::SegmentFiles;
pub use writer::DiskQueueWriter;

pub use queuehouse_core::{Error, QueueEnd, ReadPosition, Result};
