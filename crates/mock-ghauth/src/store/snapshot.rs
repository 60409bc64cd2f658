//! Flat-file JSON snapshots shared by all stores.
//!
//! A snapshot is one JSON object mapping entry key to entry value. An empty path
//! means "not configured" and turns both load and save into no-ops.

use std::collections::HashMap;
use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;

use crate::error::{SnapshotError, SnapshotResult};

/// Snapshot files hold credentials, so only the owner may read them.
#[cfg(unix)]
const SNAPSHOT_MODE: u32 = 0o600;

fn is_unset(path: &Path) -> bool {
    path.as_os_str().is_empty()
}

/// Read a snapshot file into a map.
///
/// Returns `Ok(None)` when `path` is empty.
pub async fn read_map<V: DeserializeOwned>(
    kind: &'static str,
    path: &Path,
) -> SnapshotResult<Option<HashMap<String, V>>> {
    if is_unset(path) {
        return Ok(None);
    }

    let buf = tokio::fs::read(path)
        .await
        .map_err(|e| SnapshotError::read(kind, path, e))?;
    let map = serde_json::from_slice(&buf)
        .map_err(|e| SnapshotError::parse(kind, path, e))?;

    Ok(Some(map))
}

/// Encode a map as a snapshot document (compact JSON plus trailing newline).
pub fn encode_map<V: Serialize>(
    kind: &'static str,
    map: &HashMap<String, V>,
) -> SnapshotResult<Vec<u8>> {
    let mut buf = serde_json::to_vec(map)
        .map_err(|source| SnapshotError::Encode { kind, source })?;
    buf.push(b'\n');
    Ok(buf)
}

/// Write an encoded snapshot with owner-only permissions.
///
/// A new file is created with the restricted mode; an existing file is
/// tightened before any content is written.
///
/// Returns `Ok(false)` when `path` is empty and nothing was written.
pub async fn write_bytes(kind: &'static str, path: &Path, buf: &[u8]) -> SnapshotResult<bool> {
    if is_unset(path) {
        return Ok(false);
    }

    let write_err = |e: std::io::Error| SnapshotError::write(kind, path, e);

    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    options.mode(SNAPSHOT_MODE);

    let mut file = options.open(path).await.map_err(write_err)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(SNAPSHOT_MODE);
        file.set_permissions(perms).await.map_err(write_err)?;
    }

    file.write_all(buf).await.map_err(write_err)?;
    file.flush().await.map_err(write_err)?;

    Ok(true)
}
