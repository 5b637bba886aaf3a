//! QueueHouse Cluster Primitives
//!
//! The pieces of the coordination layer that the storage core and RPC
//! surfaces share: the typed coordination error carried across RPC
//! boundaries, and the node-identity string format used to address brokers
//! in cluster metadata.
//!
//! The replication/election machinery itself lives elsewhere; this crate
//! only defines the vocabulary it speaks.

pub mod error;
pub mod node;

pub use error::{CoordError, CoordErrorKind, RpcRetCode};
pub use node::NodeInfo;
