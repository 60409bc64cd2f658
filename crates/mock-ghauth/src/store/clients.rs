//! Registry of OAuth clients allowed to start a login.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use super::{new_identifier, snapshot};
use crate::error::SnapshotResult;

const KIND: &str = "clients";

/// Secret handed out with every generated client.
pub const GENERATED_SECRET: &str = "secret-token";

/// A registered OAuth client.
#[derive(Clone, Serialize, Deserialize)]
pub struct Client {
    pub id: String,
    pub secret: String,
}

impl Client {
    #[must_use]
    pub fn new(id: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            secret: secret.into(),
        }
    }

    /// Case-insensitive comparison of both id and secret.
    #[must_use]
    pub fn matches(&self, other: &Self) -> bool {
        self.id.eq_ignore_ascii_case(&other.id)
            && self.secret.eq_ignore_ascii_case(&other.secret)
    }
}

impl fmt::Display for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ID:{}, len(Secret):{}", self.id, self.secret.len())
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("id", &self.id)
            .field("secret", &format_args!("<{} bytes>", self.secret.len()))
            .finish()
    }
}

/// In-memory client registry keyed by client id.
#[derive(Clone, Default)]
pub struct ClientRegistry {
    clients: Arc<RwLock<HashMap<String, Client>>>,
}

impl ClientRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint a client with a random id and the placeholder secret.
    pub async fn generate(&self) -> (String, String) {
        let id = new_identifier();
        self.register(id.clone(), GENERATED_SECRET).await;

        (id, GENERATED_SECRET.to_owned())
    }

    /// Insert a client, replacing any existing entry with the same id.
    pub async fn register(&self, id: impl Into<String>, secret: impl Into<String>) {
        let client = Client::new(id, secret);
        self.clients
            .write()
            .await
            .insert(client.id.clone(), client);
    }

    pub async fn exists(&self, id: &str) -> bool {
        self.clients.read().await.contains_key(id)
    }

    pub async fn lookup(&self, id: &str) -> Option<Client> {
        self.clients.read().await.get(id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.clients.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.clients.read().await.is_empty()
    }

    /// Merge clients from a snapshot file. An empty path is a no-op.
    pub async fn load_snapshot(&self, path: impl AsRef<Path>) -> SnapshotResult<()> {
        let path = path.as_ref();
        let Some(loaded) = snapshot::read_map::<Client>(KIND, path).await? else {
            return Ok(());
        };

        tracing::info!(
            count = loaded.len(),
            path = %path.display(),
            "Loaded clients snapshot"
        );
        self.clients.write().await.extend(loaded);
        Ok(())
    }

    /// Write all clients to a snapshot file. An empty path is a no-op.
    pub async fn save_snapshot(&self, path: impl AsRef<Path>) -> SnapshotResult<()> {
        let buf = snapshot::encode_map(KIND, &*self.clients.read().await)?;
        snapshot::write_bytes(KIND, path.as_ref(), &buf).await?;
        Ok(())
    }
}

impl fmt::Debug for ClientRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientRegistry").finish_non_exhaustive()
    }
}
