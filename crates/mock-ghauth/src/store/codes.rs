//! Authorization codes issued by the authorize step.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::{new_identifier, snapshot};
use crate::error::SnapshotResult;

const KIND: &str = "code";

/// Issued authorization codes, keyed by code value, holding the issue time.
#[derive(Clone, Default)]
pub struct CodeStore {
    codes: Arc<RwLock<HashMap<String, DateTime<Utc>>>>,
}

impl CodeStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a new code stamped with the current time.
    pub async fn issue(&self) -> String {
        let code = new_identifier();
        self.codes.write().await.insert(code.clone(), Utc::now());
        code
    }

    pub async fn exists(&self, code: &str) -> bool {
        self.codes.read().await.contains_key(code)
    }

    /// Issue time of `code`, if it exists.
    pub async fn get(&self, code: &str) -> Option<DateTime<Utc>> {
        self.codes.read().await.get(code).copied()
    }

    pub async fn revoke(&self, code: &str) {
        self.codes.write().await.remove(code);
    }

    /// Remove `code` and return its issue time.
    ///
    /// Check and removal happen under one write lock, so a code can only be
    /// redeemed once even when two exchanges race.
    pub async fn redeem(&self, code: &str) -> Option<DateTime<Utc>> {
        self.codes.write().await.remove(code)
    }

    pub async fn len(&self) -> usize {
        self.codes.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.codes.read().await.is_empty()
    }

    /// Merge codes from a snapshot file. An empty path is a no-op.
    pub async fn load_snapshot(&self, path: impl AsRef<Path>) -> SnapshotResult<()> {
        let path = path.as_ref();
        let Some(loaded) = snapshot::read_map::<DateTime<Utc>>(KIND, path).await? else {
            return Ok(());
        };

        tracing::info!(
            count = loaded.len(),
            path = %path.display(),
            "Loaded codes snapshot"
        );
        self.codes.write().await.extend(loaded);
        Ok(())
    }

    /// Write all codes to a snapshot file. An empty path is a no-op.
    pub async fn save_snapshot(&self, path: impl AsRef<Path>) -> SnapshotResult<()> {
        let buf = snapshot::encode_map(KIND, &*self.codes.read().await)?;
        snapshot::write_bytes(KIND, path.as_ref(), &buf).await?;
        Ok(())
    }
}

impl fmt::Debug for CodeStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CodeStore").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_issue_exists_get() {
        let store = CodeStore::new();
        let before = Utc::now();
        let code = store.issue().await;
        let after = Utc::now();

        assert!(code.len() >= 32);
        assert!(store.exists(&code).await);

        let issued = store.get(&code).await.unwrap();
        assert!(issued >= before && issued <= after);

        // Reads don't change state
        assert_eq!(store.get(&code).await, Some(issued));
        assert!(store.exists(&code).await);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_revoke() {
        let store = CodeStore::new();
        let code = store.issue().await;

        store.revoke(&code).await;
        assert!(!store.exists(&code).await);
        assert!(store.get(&code).await.is_none());

        // Revoking twice is harmless
        store.revoke(&code).await;
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_redeem_is_single_use() {
        let store = CodeStore::new();
        let code = store.issue().await;
        let issued = store.get(&code).await;

        assert_eq!(store.redeem(&code).await, issued);
        assert!(store.redeem(&code).await.is_none());
        assert!(!store.exists(&code).await);
    }

    #[tokio::test]
    async fn test_concurrent_redeem_succeeds_once() {
        let store = CodeStore::new();
        let code = store.issue().await;

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                let code = code.clone();
                tokio::spawn(async move { store.redeem(&code).await.is_some() })
            })
            .collect();

        let mut redeemed = 0;
        for handle in handles {
            if handle.await.unwrap() {
                redeemed += 1;
            }
        }
        assert_eq!(redeemed, 1);
    }

    #[tokio::test]
    async fn test_snapshot_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("codes.json");

        let store = CodeStore::new();
        let a = store.issue().await;
        let b = store.issue().await;
        store.save_snapshot(&path).await.unwrap();

        let restored = CodeStore::new();
        restored.load_snapshot(&path).await.unwrap();

        assert_eq!(restored.len().await, 2);
        assert_eq!(restored.get(&a).await, store.get(&a).await);
        assert_eq!(restored.get(&b).await, store.get(&b).await);
    }
}
