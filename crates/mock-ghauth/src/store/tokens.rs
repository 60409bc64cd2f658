//! Bearer access tokens issued by the token exchange.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use tokio::sync::RwLock;

use super::{new_identifier, snapshot};
use crate::error::SnapshotResult;

const KIND: &str = "token";

/// Prefix carried by every issued token.
pub const TOKEN_PREFIX: &str = "ght_";

/// Token lifetime used until `configure_lifetime` is called: 1 minute.
pub const DEFAULT_LIFETIME: Duration = Duration::from_secs(60);

/// Which tokens a sweep evicts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SweepPolicy {
    /// Evict tokens whose expiry is at or before the reference time.
    #[default]
    Expired,
    /// Evict tokens whose expiry is after the reference time.
    ///
    /// Removes tokens that are still valid. Selected with `--legacy-sweep`.
    Legacy,
}

impl SweepPolicy {
    /// Whether a token expiring at `expires_at` is evicted by a sweep at `reference`.
    #[must_use]
    pub fn evicts(self, expires_at: DateTime<Utc>, reference: DateTime<Utc>) -> bool {
        match self {
            Self::Expired => expires_at <= reference,
            Self::Legacy => expires_at > reference,
        }
    }
}

struct Inner {
    lifetime: TimeDelta,
    tokens: HashMap<String, DateTime<Utc>>,
}

/// Issued access tokens, keyed by token value, holding the expiry time.
#[derive(Clone)]
pub struct TokenStore {
    inner: Arc<RwLock<Inner>>,
}

impl TokenStore {
    #[must_use]
    pub fn new() -> Self {
        Self::with_lifetime(DEFAULT_LIFETIME)
    }

    #[must_use]
    pub fn with_lifetime(lifetime: Duration) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner {
                lifetime: to_delta(lifetime),
                tokens: HashMap::new(),
            })),
        }
    }

    /// Set the validity window applied to tokens issued from now on.
    pub async fn configure_lifetime(&self, lifetime: Duration) {
        self.inner.write().await.lifetime = to_delta(lifetime);
    }

    pub async fn lifetime(&self) -> Duration {
        self.inner
            .read()
            .await
            .lifetime
            .to_std()
            .unwrap_or(Duration::ZERO)
    }

    /// Issue a new token expiring one lifetime from now.
    pub async fn issue(&self) -> String {
        let token = format!("{TOKEN_PREFIX}{}", new_identifier().to_lowercase());

        let mut inner = self.inner.write().await;
        let expires_at = Utc::now()
            .checked_add_signed(inner.lifetime)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        inner.tokens.insert(token.clone(), expires_at);

        token
    }

    pub async fn exists(&self, token: &str) -> bool {
        self.inner.read().await.tokens.contains_key(token)
    }

    /// Expiry of `token`, if it exists.
    pub async fn get_expiry(&self, token: &str) -> Option<DateTime<Utc>> {
        self.inner.read().await.tokens.get(token).copied()
    }

    /// True when `token` exists and expires after `now`.
    pub async fn is_live(&self, token: &str, now: DateTime<Utc>) -> bool {
        self.get_expiry(token)
            .await
            .is_some_and(|expires_at| expires_at > now)
    }

    pub async fn revoke(&self, token: &str) {
        self.inner.write().await.tokens.remove(token);
    }

    /// Evict tokens according to `policy`, returning how many were removed.
    pub async fn sweep(&self, reference: DateTime<Utc>, policy: SweepPolicy) -> usize {
        let mut inner = self.inner.write().await;
        let before = inner.tokens.len();
        let evicted = |expires_at: &DateTime<Utc>| policy.evicts(*expires_at, reference);
        inner.tokens.retain(|_, expires_at| !evicted(expires_at));
        before - inner.tokens.len()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.tokens.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.tokens.is_empty()
    }

    /// Merge tokens from a snapshot file. An empty path is a no-op.
    pub async fn load_snapshot(&self, path: impl AsRef<Path>) -> SnapshotResult<()> {
        let path = path.as_ref();
        let Some(loaded) = snapshot::read_map::<DateTime<Utc>>(KIND, path).await? else {
            return Ok(());
        };

        tracing::info!(
            count = loaded.len(),
            path = %path.display(),
            "Loaded tokens snapshot"
        );
        self.inner.write().await.tokens.extend(loaded);
        Ok(())
    }

    /// Write all tokens to a snapshot file. An empty path is a no-op.
    pub async fn save_snapshot(&self, path: impl AsRef<Path>) -> SnapshotResult<()> {
        let buf = snapshot::encode_map(KIND, &self.inner.read().await.tokens)?;
        snapshot::write_bytes(KIND, path.as_ref(), &buf).await?;
        Ok(())
    }
}

impl Default for TokenStore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenStore").finish_non_exhaustive()
    }
}

fn to_delta(lifetime: Duration) -> TimeDelta {
    TimeDelta::from_std(lifetime).unwrap_or(TimeDelta::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_default_lifetime() {
        let store = TokenStore::default();
        assert_eq!(store.lifetime().await, DEFAULT_LIFETIME);
    }

    #[tokio::test]
    async fn test_issue_format() {
        let store = TokenStore::new();
        let token = store.issue().await;

        assert!(token.starts_with(TOKEN_PREFIX));
        assert_eq!(token, token.to_lowercase());
        assert!(store.exists(&token).await);
    }

    #[tokio::test]
    async fn test_expiry_matches_lifetime() {
        let store = TokenStore::new();
        store.configure_lifetime(Duration::from_secs(90)).await;

        let before = Utc::now();
        let token = store.issue().await;
        let after = Utc::now();

        let expires_at = store.get_expiry(&token).await.unwrap();
        assert!(expires_at >= before + TimeDelta::seconds(90));
        assert!(expires_at <= after + TimeDelta::seconds(90));
    }

    #[tokio::test]
    async fn test_huge_lifetime_saturates() {
        let store = TokenStore::with_lifetime(Duration::MAX);
        let token = store.issue().await;
        assert!(store.is_live(&token, Utc::now()).await);
    }

    #[tokio::test]
    async fn test_revoke() {
        let store = TokenStore::new();
        let token = store.issue().await;

        store.revoke(&token).await;
        assert!(!store.exists(&token).await);
        assert!(store.get_expiry(&token).await.is_none());
    }

    #[tokio::test]
    async fn test_is_live() {
        let store = TokenStore::with_lifetime(Duration::from_secs(1));
        let token = store.issue().await;
        let expires_at = store.get_expiry(&token).await.unwrap();

        let just_before = expires_at - TimeDelta::milliseconds(1);
        assert!(store.is_live(&token, just_before).await);
        assert!(!store.is_live(&token, expires_at).await);
        assert!(!store.is_live("ght_unknown", Utc::now()).await);
    }

    #[tokio::test]
    async fn test_sweep_expired_keeps_live_tokens() {
        let store = TokenStore::new();
        store.configure_lifetime(Duration::from_secs(1)).await;
        let token = store.issue().await;
        let expires_at = store.get_expiry(&token).await.unwrap();

        let before = expires_at - TimeDelta::seconds(1);
        let removed = store.sweep(before, SweepPolicy::Expired).await;
        assert_eq!(removed, 0);
        assert!(store.exists(&token).await);

        let removed = store.sweep(expires_at, SweepPolicy::Expired).await;
        assert_eq!(removed, 1);
        assert!(!store.exists(&token).await);
    }

    #[tokio::test]
    async fn test_sweep_legacy_evicts_unexpired_tokens() {
        let store = TokenStore::new();
        store.configure_lifetime(Duration::from_secs(1)).await;
        let token = store.issue().await;

        let before = Utc::now() - TimeDelta::seconds(1);
        let removed = store.sweep(before, SweepPolicy::Legacy).await;
        assert_eq!(removed, 1);
        assert!(!store.exists(&token).await);
    }

    #[tokio::test]
    async fn test_snapshot_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tokens.json");

        let store = TokenStore::new();
        let token = store.issue().await;
        store.save_snapshot(&path).await.unwrap();

        let restored = TokenStore::new();
        restored.load_snapshot(&path).await.unwrap();

        assert_eq!(restored.len().await, 1);
        assert_eq!(
            restored.get_expiry(&token).await,
            store.get_expiry(&token).await
        );
    }

    #[test]
    fn test_policy_boundaries() {
        let now = Utc::now();
        let later = now + TimeDelta::seconds(1);
        assert!(SweepPolicy::Expired.evicts(now, now));
        assert!(!SweepPolicy::Expired.evicts(later, now));
        assert!(SweepPolicy::Legacy.evicts(later, now));
        assert!(!SweepPolicy::Legacy.evicts(now, now));
    }
}
