//! Coordination Error Taxonomy
//!
//! Cluster operations fail in ways that demand different reactions from the
//! caller: a network timeout is retried against the same node, a stale-epoch
//! rejection forces a metadata refresh, a local disk failure takes the
//! replica out of the write path. `CoordError` carries three fields so
//! callers can decide without string matching:
//!
//! - **kind**: which subsystem failed and whether the failure is transient
//! - **code**: a stable numeric identifier surfaced over RPC boundaries
//! - **msg**: human-readable detail
//!
//! Well-known failures are predeclared as `const` sentinels (for example
//! [`ERR_NOT_TOPIC_LEADER`]). Equality between errors follows the protocol
//! rule: two errors match when kind and code match; the message is compared
//! only for the generic common code, where it is the sole discriminator.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

/// Which subsystem produced a coordination error, and whether it is
/// transient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CoordErrorKind {
    /// No error; the zero value of a wire response.
    None,
    /// Generic failure, distinguished by message.
    Common,
    /// Network failure talking to a peer.
    Net,
    /// Leadership/epoch state is stale; caller must re-check sync state.
    Election,
    /// Leadership churn in progress; safe to retry shortly.
    ElectionTmp,
    /// Cluster metadata problem.
    Cluster,
    /// Failure local to this node.
    Local,
    /// Transient local condition; safe to retry.
    Tmp,
}

/// Stable numeric return code carried over RPC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcRetCode(pub i32);

impl RpcRetCode {
    pub const NO_ERR: RpcRetCode = RpcRetCode(0);
    pub const COMMON: RpcRetCode = RpcRetCode(1);

    // election / replication codes
    pub const NOT_TOPIC_LEADER: RpcRetCode = RpcRetCode(300);
    pub const EPOCH_MISMATCH: RpcRetCode = RpcRetCode(301);
    pub const EPOCH_LESS_THAN_CURRENT: RpcRetCode = RpcRetCode(302);
    pub const WRITE_QUORUM_FAILED: RpcRetCode = RpcRetCode(303);
    pub const COMMIT_LOG_ID_DUP: RpcRetCode = RpcRetCode(304);
    pub const MISSING_TOPIC_LEADER_SESSION: RpcRetCode = RpcRetCode(305);
    pub const LEADER_SESSION_MISMATCH: RpcRetCode = RpcRetCode(306);
    pub const WRITE_DISABLED: RpcRetCode = RpcRetCode(307);
    pub const LEAVING_ISR_WAIT: RpcRetCode = RpcRetCode(308);
    pub const TOPIC_LEADER_CHANGED: RpcRetCode = RpcRetCode(309);

    // commit log codes
    pub const COMMIT_LOG_EOF: RpcRetCode = RpcRetCode(310);
    pub const COMMIT_LOG_OUT_OF_BOUND: RpcRetCode = RpcRetCode(311);

    // cluster metadata codes
    pub const TOPIC_COORD_EXISTING_AND_MISMATCH: RpcRetCode = RpcRetCode(400);
    pub const MISSING_TOPIC_COORD: RpcRetCode = RpcRetCode(401);

    // local codes
    pub const TOPIC_LOADING: RpcRetCode = RpcRetCode(500);
}

/// A typed coordination error: `(kind, code, message)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoordError {
    pub msg: Cow<'static, str>,
    pub code: RpcRetCode,
    pub kind: CoordErrorKind,
}

impl CoordError {
    /// A generic-coded error, distinguished from others by its message.
    pub const fn new(msg: &'static str, kind: CoordErrorKind) -> Self {
        Self {
            msg: Cow::Borrowed(msg),
            code: RpcRetCode::COMMON,
            kind,
        }
    }

    /// An error with a dedicated protocol code.
    pub const fn with_code(msg: &'static str, kind: CoordErrorKind, code: RpcRetCode) -> Self {
        Self {
            msg: Cow::Borrowed(msg),
            code,
            kind,
        }
    }

    /// A generic-coded error with a runtime-built message.
    pub fn from_message(msg: impl Into<Cow<'static, str>>, kind: CoordErrorKind) -> Self {
        Self {
            msg: msg.into(),
            code: RpcRetCode::COMMON,
            kind,
        }
    }

    pub fn has_error(&self) -> bool {
        !(self.kind == CoordErrorKind::None && self.code == RpcRetCode::NO_ERR)
    }

    /// Protocol equality: kind and code must match; the message matters only
    /// for the generic common code.
    pub fn is_equal(&self, other: &CoordError) -> bool {
        if self.code != other.code || self.kind != other.kind {
            return false;
        }
        if self.code != RpcRetCode::COMMON {
            return true;
        }
        self.msg == other.msg
    }

    pub fn is_net_error(&self) -> bool {
        self.kind == CoordErrorKind::Net
    }

    /// Transient failures the caller may retry without refreshing state.
    pub fn can_retry(&self) -> bool {
        matches!(
            self.kind,
            CoordErrorKind::Tmp | CoordErrorKind::ElectionTmp
        )
    }

    /// Election errors mean the local replica may have diverged and must
    /// re-check its sync state before serving writes.
    pub fn needs_sync_check(&self) -> bool {
        self.kind == CoordErrorKind::Election
    }
}

impl fmt::Display for CoordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.msg)
    }
}

impl std::error::Error for CoordError {}

pub const ERR_TOPIC_INFO_NOT_FOUND: CoordError =
    CoordError::new("topic info not found", CoordErrorKind::Cluster);

pub const ERR_NOT_TOPIC_LEADER: CoordError = CoordError::with_code(
    "not topic leader",
    CoordErrorKind::Election,
    RpcRetCode::NOT_TOPIC_LEADER,
);
pub const ERR_EPOCH_MISMATCH: CoordError = CoordError::with_code(
    "commit epoch not match",
    CoordErrorKind::Election,
    RpcRetCode::EPOCH_MISMATCH,
);
pub const ERR_EPOCH_LESS_THAN_CURRENT: CoordError = CoordError::with_code(
    "epoch should be increased",
    CoordErrorKind::Election,
    RpcRetCode::EPOCH_LESS_THAN_CURRENT,
);
pub const ERR_WRITE_QUORUM_FAILED: CoordError = CoordError::with_code(
    "write to quorum failed",
    CoordErrorKind::ElectionTmp,
    RpcRetCode::WRITE_QUORUM_FAILED,
);
pub const ERR_COMMIT_LOG_ID_DUP: CoordError = CoordError::with_code(
    "commit id duplicated",
    CoordErrorKind::Election,
    RpcRetCode::COMMIT_LOG_ID_DUP,
);
pub const ERR_MISSING_TOPIC_LEADER_SESSION: CoordError = CoordError::with_code(
    "missing topic leader session",
    CoordErrorKind::Election,
    RpcRetCode::MISSING_TOPIC_LEADER_SESSION,
);
pub const ERR_LEADER_SESSION_MISMATCH: CoordError = CoordError::with_code(
    "leader session mismatch",
    CoordErrorKind::Election,
    RpcRetCode::LEADER_SESSION_MISMATCH,
);
pub const ERR_WRITE_DISABLED: CoordError = CoordError::with_code(
    "write is disabled on the topic",
    CoordErrorKind::ElectionTmp,
    RpcRetCode::WRITE_DISABLED,
);
pub const ERR_LEAVING_ISR_WAIT: CoordError = CoordError::with_code(
    "leaving isr need wait",
    CoordErrorKind::ElectionTmp,
    RpcRetCode::LEAVING_ISR_WAIT,
);
pub const ERR_TOPIC_COORD_EXISTING_AND_MISMATCH: CoordError = CoordError::with_code(
    "topic coordinator existing with a different partition",
    CoordErrorKind::Cluster,
    RpcRetCode::TOPIC_COORD_EXISTING_AND_MISMATCH,
);
pub const ERR_TOPIC_LEADER_CHANGED: CoordError = CoordError::with_code(
    "topic leader changed",
    CoordErrorKind::ElectionTmp,
    RpcRetCode::TOPIC_LEADER_CHANGED,
);
pub const ERR_TOPIC_COMMIT_LOG_EOF: CoordError = CoordError::with_code(
    "topic commit log end of file",
    CoordErrorKind::Common,
    RpcRetCode::COMMIT_LOG_EOF,
);
pub const ERR_TOPIC_COMMIT_LOG_OUT_OF_BOUND: CoordError = CoordError::with_code(
    "topic commit log offset out of bound",
    CoordErrorKind::Common,
    RpcRetCode::COMMIT_LOG_OUT_OF_BOUND,
);
pub const ERR_MISSING_TOPIC_COORD: CoordError = CoordError::with_code(
    "missing topic coordinator",
    CoordErrorKind::Cluster,
    RpcRetCode::MISSING_TOPIC_COORD,
);
pub const ERR_TOPIC_LOADING: CoordError = CoordError::with_code(
    "topic is still loading data",
    CoordErrorKind::Local,
    RpcRetCode::TOPIC_LOADING,
);

pub const ERR_PUB_ARG_ERROR: CoordError =
    CoordError::new("pub argument error", CoordErrorKind::Common);
pub const ERR_TOPIC_NOT_RELATED: CoordError =
    CoordError::new("topic not related to me", CoordErrorKind::Common);
pub const ERR_TOPIC_CATCHUP_ALREADY_RUNNING: CoordError =
    CoordError::new("topic is already running catchup", CoordErrorKind::Common);

pub const ERR_MISSING_TOPIC_LOG: CoordError =
    CoordError::new("missing topic log", CoordErrorKind::Local);
pub const ERR_LOCAL_TOPIC_PARTITION_MISMATCH: CoordError =
    CoordError::new("local topic partition not match", CoordErrorKind::Local);
pub const ERR_LOCAL_FALL_BEHIND: CoordError =
    CoordError::new("local data fall behind", CoordErrorKind::Election);
pub const ERR_LOCAL_FORWARD_THAN_LEADER: CoordError =
    CoordError::new("local data is more than leader", CoordErrorKind::Election);
pub const ERR_LOCAL_WRITE_FAILED: CoordError =
    CoordError::new("write data to local failed", CoordErrorKind::Local);
pub const ERR_LOCAL_MISSING_TOPIC: CoordError =
    CoordError::new("local topic missing", CoordErrorKind::Local);
pub const ERR_LOCAL_NOT_READY_FOR_WRITE: CoordError =
    CoordError::new("local topic is not ready for write", CoordErrorKind::Local);
pub const ERR_LOCAL_INIT_TOPIC_FAILED: CoordError =
    CoordError::new("local topic init failed", CoordErrorKind::Local);
pub const ERR_LOCAL_INIT_TOPIC_COORD_FAILED: CoordError =
    CoordError::new("topic coordinator init failed", CoordErrorKind::Local);
pub const ERR_LOCAL_TOPIC_DATA_CORRUPT: CoordError =
    CoordError::new("local topic data corrupt", CoordErrorKind::Local);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_error() {
        let none = CoordError {
            msg: Cow::Borrowed(""),
            code: RpcRetCode::NO_ERR,
            kind: CoordErrorKind::None,
        };
        assert!(!none.has_error());
        assert!(ERR_NOT_TOPIC_LEADER.has_error());
        assert!(ERR_PUB_ARG_ERROR.has_error());
    }

    #[test]
    fn test_is_equal_ignores_message_for_coded_errors() {
        let renamed = CoordError::with_code(
            "a different message",
            CoordErrorKind::Election,
            RpcRetCode::NOT_TOPIC_LEADER,
        );
        assert!(ERR_NOT_TOPIC_LEADER.is_equal(&renamed));
        assert!(renamed.is_equal(&ERR_NOT_TOPIC_LEADER));
    }

    #[test]
    fn test_is_equal_compares_message_for_common_code() {
        assert!(ERR_PUB_ARG_ERROR.is_equal(&ERR_PUB_ARG_ERROR.clone()));
        assert!(!ERR_PUB_ARG_ERROR.is_equal(&ERR_TOPIC_NOT_RELATED));

        let same_words = CoordError::from_message("pub argument error", CoordErrorKind::Common);
        assert!(ERR_PUB_ARG_ERROR.is_equal(&same_words));
    }

    #[test]
    fn test_is_equal_requires_matching_kind() {
        let wrong_kind = CoordError::with_code(
            "not topic leader",
            CoordErrorKind::Cluster,
            RpcRetCode::NOT_TOPIC_LEADER,
        );
        assert!(!ERR_NOT_TOPIC_LEADER.is_equal(&wrong_kind));
    }

    #[test]
    fn test_retry_and_sync_check_predicates() {
        assert!(ERR_WRITE_QUORUM_FAILED.can_retry());
        assert!(ERR_TOPIC_LEADER_CHANGED.can_retry());
        assert!(!ERR_NOT_TOPIC_LEADER.can_retry());
        assert!(!ERR_LOCAL_WRITE_FAILED.can_retry());

        assert!(ERR_NOT_TOPIC_LEADER.needs_sync_check());
        assert!(ERR_LOCAL_FALL_BEHIND.needs_sync_check());
        assert!(!ERR_WRITE_QUORUM_FAILED.needs_sync_check());

        assert!(!ERR_NOT_TOPIC_LEADER.is_net_error());
        assert!(CoordError::from_message("peer unreachable", CoordErrorKind::Net).is_net_error());
    }

    #[test]
    fn test_display_is_the_message() {
        assert_eq!(ERR_NOT_TOPIC_LEADER.to_string(), "not topic leader");
    }

    #[test]
    fn test_serde_roundtrip() {
        let raw = serde_json::to_string(&ERR_EPOCH_MISMATCH).unwrap();
        let back: CoordError = serde_json::from_str(&raw).unwrap();
        assert!(back.is_equal(&ERR_EPOCH_MISMATCH));
        assert_eq!(back.code, RpcRetCode::EPOCH_MISMATCH);
    }
}
