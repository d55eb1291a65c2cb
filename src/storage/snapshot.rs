// src/storage/snapshot.rs

//! Timestamped entity snapshots.
//!
//! Every snapshot lands at `{kind}/{id}/log_{timestamp}.json` below the blob
//! store root. Timestamps have whole-second granularity; a second snapshot of
//! the same entity within the same second is skipped, never overwritten.

use std::fmt::Write;
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{AppError, Result};
use crate::models::EntityKind;
use crate::storage::{BlobStore, LocalStorage};

/// File name timestamp, e.g. `2026_10_16__14_05_00`.
pub const TIMESTAMP_FORMAT: &str = "%Y_%m_%d__%H_%M_%S";

/// Result of a snapshot attempt that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogOutcome {
    /// A new snapshot was written at this location
    Written(String),
    /// A snapshot for this entity and second already exists here
    AlreadyLogged(String),
}

impl LogOutcome {
    pub fn location(&self) -> &str {
        match self {
            LogOutcome::Written(location) | LogOutcome::AlreadyLogged(location) => location,
        }
    }
}

/// Blob key of the snapshot of one entity at one point in time.
pub fn snapshot_key(kind: EntityKind, id: &str, at: DateTime<Utc>) -> String {
    format!(
        "{}/{}/log_{}.json",
        kind,
        encode_id(id),
        at.format(TIMESTAMP_FORMAT)
    )
}

/// Directory name for an entity id.
///
/// Organization names are free text, so path separators, `%`, control
/// characters, leading or trailing whitespace and the names `.` and `..` are
/// percent-encoded. Distinct ids always get distinct directories; the empty
/// id becomes a lone `%`, which no encoded id can produce.
pub fn encode_id(id: &str) -> String {
    match id {
        "" => return "%".to_string(),
        "." => return "%2E".to_string(),
        ".." => return "%2E%2E".to_string(),
        _ => {}
    }

    let leading = id.len() - id.trim_start().len();
    let trailing = id.trim_end().len();
    let mut out = String::with_capacity(id.len());
    for (pos, c) in id.char_indices() {
        let edge_space = c.is_whitespace() && (pos < leading || pos >= trailing);
        if edge_space || c.is_control() || matches!(c, '/' | '\\' | '%') {
            let mut buf = [0u8; 4];
            for byte in c.encode_utf8(&mut buf).bytes() {
                // Writing to a String cannot fail.
                let _ = write!(out, "%{byte:02X}");
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Serialize an entity the way snapshots are stored: sorted keys, indented.
pub fn to_snapshot_json<T: Serialize + ?Sized>(entity: &T) -> Result<Vec<u8>> {
    // `serde_json::Map` is ordered by key, so the detour sorts all objects.
    let value = serde_json::to_value(entity)?;
    let mut bytes = serde_json::to_vec_pretty(&value)?;
    bytes.push(b'\n');
    Ok(bytes)
}

/// Parse a stored snapshot back into an entity.
pub fn from_snapshot_json<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Load a snapshot file from anywhere on disk.
pub fn load_snapshot_file<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let bytes = std::fs::read(path)?;
    from_snapshot_json(&bytes)
}

/// Writes entity snapshots through a [`BlobStore`].
#[derive(Clone)]
pub struct SnapshotLogger {
    store: Arc<dyn BlobStore>,
}

impl SnapshotLogger {
    pub fn new(store: Arc<dyn BlobStore>) -> Self {
        Self { store }
    }

    /// Logger writing below a local directory.
    pub fn local(root_dir: impl AsRef<Path>) -> Self {
        Self::new(Arc::new(LocalStorage::new(root_dir.as_ref())))
    }

    /// Write a snapshot of `entity` unless one exists for the same second.
    ///
    /// Any storage or serialization problem is reported as
    /// [`AppError::Write`] for this entity only.
    pub async fn log<T: Serialize + ?Sized>(
        &self,
        entity: &T,
        kind: EntityKind,
        id: &str,
        at: DateTime<Utc>,
    ) -> Result<LogOutcome> {
        let key = snapshot_key(kind, id, at);
        let location = self.store.location(&key);
        let write_failure = |e: AppError| AppError::write(location.clone(), e);

        let bytes = to_snapshot_json(entity).map_err(write_failure)?;

        if self.store.exists(&key).await.map_err(write_failure)? {
            log::debug!("Snapshot already exists at {}, skipping", location);
            return Ok(LogOutcome::AlreadyLogged(location));
        }

        if let Some((dir, _)) = key.rsplit_once('/') {
            self.store.create_dir_all(dir).await.map_err(write_failure)?;
        }
        self.store.write(&key, &bytes).await.map_err(write_failure)?;

        log::debug!("Logged {} {} to {}", kind, id, location);
        Ok(LogOutcome::Written(location))
    }

    /// Load a snapshot by its blob key.
    pub async fn load<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        let bytes = self
            .store
            .read(key)
            .await?
            .ok_or_else(|| AppError::not_found("snapshot", self.store.location(key)))?;
        from_snapshot_json(&bytes)
    }
}
