//! Queue Configuration
//!
//! ## QueueConfig
//!
//! Controls how a disk queue frames, rolls, and syncs its segments:
//!
//! - **max_bytes_per_file**: roll to the next segment once the current one
//!   grows past this size (default: 100MB). Soft bound; a completed segment
//!   may exceed it by at most one frame.
//! - **min_msg_size** / **max_msg_size**: payload validation bounds
//! - **sync_every**: flush + fsync + persist metadata after this many puts
//!   (default: 2500)
//! - **sync_timeout**: flush + fsync + persist metadata after this interval
//!   even when the put count has not been reached (default: 2s)
//! - **read_buffer_enabled**: hint; when set, the reader decodes through a
//!   buffered reader instead of issuing one syscall per frame
//!
//! ## Usage
//!
//! ```ignore
//! use queuehouse_storage::QueueConfig;
//!
//! // Small segments for tests
//! let config = QueueConfig {
//!     max_bytes_per_file: 1024,
//!     min_msg_size: 4,
//!     ..Default::default()
//! };
//! ```

use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Segment size threshold in bytes before rolling (default: 100MB)
    #[serde(default = "default_max_bytes_per_file")]
    pub max_bytes_per_file: i64,

    /// Minimum accepted payload size in bytes (default: 0)
    #[serde(default)]
    pub min_msg_size: i32,

    /// Maximum accepted payload size in bytes (default: 1MB)
    #[serde(default = "default_max_msg_size")]
    pub max_msg_size: i32,

    /// Puts between count-triggered syncs (default: 2500)
    #[serde(default = "default_sync_every")]
    pub sync_every: i64,

    /// Interval for time-triggered syncs (default: 2s)
    #[serde(default = "default_sync_timeout", with = "duration_ms")]
    pub sync_timeout: Duration,

    /// Read through a buffered reader (default: true)
    #[serde(default = "default_read_buffer_enabled")]
    pub read_buffer_enabled: bool,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_bytes_per_file: default_max_bytes_per_file(),
            min_msg_size: 0,
            max_msg_size: default_max_msg_size(),
            sync_every: default_sync_every(),
            sync_timeout: default_sync_timeout(),
            read_buffer_enabled: default_read_buffer_enabled(),
        }
    }
}

fn default_max_bytes_per_file() -> i64 {
    100 * 1024 * 1024 // 100MB
}

fn default_max_msg_size() -> i32 {
    1024 * 1024 // 1MB
}

fn default_sync_every() -> i64 {
    2500
}

fn default_sync_timeout() -> Duration {
    Duration::from_secs(2)
}

fn default_read_buffer_enabled() -> bool {
    true
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let ms = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = QueueConfig::default();
        assert_eq!(config.max_bytes_per_file, 100 * 1024 * 1024);
        assert_eq!(config.min_msg_size, 0);
        assert_eq!(config.max_msg_size, 1024 * 1024);
        assert_eq!(config.sync_every, 2500);
        assert_eq!(config.sync_timeout, Duration::from_secs(2));
        assert!(config.read_buffer_enabled);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: QueueConfig =
            serde_json::from_str(r#"{"max_bytes_per_file": 1024, "sync_timeout": 250}"#).unwrap();
        assert_eq!(config.max_bytes_per_file, 1024);
        assert_eq!(config.sync_timeout, Duration::from_millis(250));
        assert_eq!(config.sync_every, 2500);
    }
}
