//! Mock GitHub Enterprise OAuth server
//!
//! A test double for the GitHub OAuth authorization-code flow. Client
//! applications point their GitHub Enterprise base URL at it and run the full
//! login round-trip without a real identity provider.
//!
//! # Features
//!
//! - **Authorization-code grant**: `/login/oauth/authorize` and `/login/oauth/access_token`
//! - **Authenticated user**: `/api/v3/user` backed by a fixed octocat profile
//! - **Snapshots**: preload or export clients, codes and tokens as JSON
//! - **Reaper**: background eviction of expired access tokens
//!
//! # Example
//!
//! ```no_run
//! use mock_ghauth::{config::Config, server::MockServer};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::new("127.0.0.1:8080".parse()?)?;
//!     let server = MockServer::new(config).await?;
//!     server.add_client("github-client-id", "github-client-secret").await;
//!
//!     server.run(CancellationToken::new()).await
//! }
//! ```

pub mod config;
pub mod error;
pub mod server;
pub mod store;

pub use config::Config;
pub use error::{ApiError, SnapshotError};
pub use server::MockServer;
