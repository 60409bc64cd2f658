//! Mock GitHub OAuth server.
//!
//! `MockServer` is the composition root: it owns one instance of each store and
//! the flow controller, and runs the HTTP listener alongside the token reaper.
//!
//! ## Supervision
//!
//! Listener and reaper run as sibling tasks on a `JoinSet`. Whichever exits first
//! cancels the shared `CancellationToken`, the rest drain, and the first error is
//! reported.

pub mod flow;
pub mod handlers;
pub mod reaper;
pub mod types;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::{
    Router,
    http::StatusCode,
    routing::{get, post},
};
use tokio::net::TcpListener;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::config::{Config, SnapshotPaths, resolve_base_url};
use crate::error::SnapshotResult;
use crate::store::{ClientRegistry, CodeStore, TokenStore};

pub use flow::OAuthFlow;
pub use reaper::ExpiryReaper;

/// Shared state for HTTP handlers.
pub struct HttpState {
    pub flow: OAuthFlow,
}

/// Create the HTTP router for the mocked endpoints.
pub fn create_router(flow: OAuthFlow, request_timeout: Duration) -> Router {
    let state = Arc::new(HttpState { flow });

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/login/oauth/authorize", get(handlers::handle_authorize))
        .route(
            "/login/oauth/access_token",
            post(handlers::handle_access_token),
        )
        .route("/api/v3/user", get(handlers::handle_user))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            request_timeout,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// The mock server and the stores it owns.
pub struct MockServer {
    config: Config,
    clients: ClientRegistry,
    codes: CodeStore,
    tokens: TokenStore,
    flow: OAuthFlow,
}

impl MockServer {
    /// Build the stores and preload any configured snapshots.
    ///
    /// # Errors
    ///
    /// Returns error if a configured snapshot can't be read or parsed. Callers
    /// should treat this as fatal: a broken fixture invalidates every test run.
    pub async fn new(config: Config) -> SnapshotResult<Self> {
        let clients = ClientRegistry::new();
        let codes = CodeStore::new();
        let tokens = TokenStore::with_lifetime(config.token_lifetime);

        if let Some(path) = &config.load.codes {
            codes.load_snapshot(path).await?;
        }
        if let Some(path) = &config.load.clients {
            clients.load_snapshot(path).await?;
        }
        if let Some(path) = &config.load.tokens {
            tokens.load_snapshot(path).await?;
        }

        let flow = OAuthFlow::new(
            clients.clone(),
            codes.clone(),
            tokens.clone(),
            config.base_url.clone(),
        );

        Ok(Self {
            config,
            clients,
            codes,
            tokens,
            flow,
        })
    }

    /// Register a client that may log in.
    pub async fn add_client(&self, id: impl Into<String>, secret: impl Into<String>) {
        let id = id.into();
        tracing::info!(client_id = %id, "Registered OAuth client");
        self.clients.register(id, secret).await;
    }

    #[must_use]
    pub const fn clients(&self) -> &ClientRegistry {
        &self.clients
    }

    #[must_use]
    pub const fn codes(&self) -> &CodeStore {
        &self.codes
    }

    #[must_use]
    pub const fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    #[must_use]
    pub fn router(&self) -> Router {
        create_router(self.flow.clone(), self.config.request_timeout)
    }

    /// Bind the configured address and serve until `shutdown` fires or a task fails.
    ///
    /// # Errors
    ///
    /// Returns error if binding fails or the listener or reaper task fails.
    pub async fn run(&self, shutdown: CancellationToken) -> anyhow::Result<()> {
        let listener = TcpListener::bind(self.config.bind)
            .await
            .with_context(|| format!("unable to bind {}", self.config.bind))?;

        self.serve(listener, shutdown).await
    }

    /// Serve on an already bound listener.
    ///
    /// A base URL carrying port 0 is resolved to the listener's actual port.
    ///
    /// # Errors
    ///
    /// Returns the first error from the listener or reaper task.
    pub async fn serve(
        &self,
        listener: TcpListener,
        shutdown: CancellationToken,
    ) -> anyhow::Result<()> {
        let addr = listener.local_addr()?;
        let base_url = resolve_base_url(&self.config.base_url, addr);
        let flow = self.flow.clone().with_base_url(base_url);
        tracing::info!(%addr, base_url = %flow.base_url(), "HTTP server listening");

        let mut tasks = JoinSet::new();

        let router = create_router(flow, self.config.request_timeout);
        let token = shutdown.clone();
        tasks.spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(token.cancelled_owned())
                .await
                .context("HTTP server failed")
        });

        let reaper = ExpiryReaper::new(
            self.tokens.clone(),
            self.config.reaper_interval,
            self.config.sweep_policy,
        );
        let token = shutdown.clone();
        tasks.spawn(async move {
            reaper.run(token).await;
            Ok(())
        });

        let mut first_error = None;
        while let Some(joined) = tasks.join_next().await {
            // One task ending takes the others down with it
            shutdown.cancel();

            let result = joined
                .map_err(anyhow::Error::from)
                .and_then(std::convert::identity);
            if let Err(err) = result {
                tracing::error!(error = %err, "Server task failed");
                first_error.get_or_insert(err);
            }
        }

        tracing::info!("HTTP server shut down");
        first_error.map_or(Ok(()), Err)
    }

    /// Export the stores to the given snapshot files.
    ///
    /// # Errors
    ///
    /// Returns the first write failure.
    pub async fn save_snapshots(&self, paths: &SnapshotPaths) -> SnapshotResult<()> {
        if let Some(path) = &paths.clients {
            self.clients.save_snapshot(path).await?;
        }
        if let Some(path) = &paths.codes {
            self.codes.save_snapshot(path).await?;
        }
        if let Some(path) = &paths.tokens {
            self.tokens.save_snapshot(path).await?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for MockServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockServer")
            .field("bind", &self.config.bind)
            .finish_non_exhaustive()
    }
}
