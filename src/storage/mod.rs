//! Storage abstractions for snapshot logs.
//!
//! Snapshots are plain JSON files, one per entity and second:
//!
//! ```text
//! logfiles/
//! ├── countries/
//! │   └── DE/
//! │       └── log_2026_10_16__14_05_00.json
//! ├── cities/
//! │   └── 619/
//! │       ├── log_2026_10_16__14_05_00.json
//! │       └── log_2026_10_16__14_06_00.json
//! └── stations/ organizations/ bikes/
//! ```

pub mod local;
pub mod snapshot;

use async_trait::async_trait;

use crate::error::Result;

// Re-export for convenience
pub use local::LocalStorage;
pub use snapshot::{LogOutcome, SnapshotLogger, snapshot_key};

/// Minimal blob store the snapshot logger writes through.
///
/// Keys are `/`-separated paths relative to the store root.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Whether a blob exists at `key`.
    async fn exists(&self, key: &str) -> Result<bool>;

    /// Create the directory `key` and all of its parents.
    async fn create_dir_all(&self, key: &str) -> Result<()>;

    /// Write `bytes` to `key`, replacing any previous content.
    async fn write(&self, key: &str, bytes: &[u8]) -> Result<()>;

    /// Read the blob at `key`, `None` if it does not exist.
    async fn read(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Human-readable location of `key`, used in logs and outcomes.
    fn location(&self, key: &str) -> String {
        key.to_string()
    }
}
