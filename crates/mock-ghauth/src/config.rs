//! Configuration for the mock GitHub OAuth server.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use crate::store::SweepPolicy;

/// Default values.
pub mod defaults {
    use std::net::{IpAddr, Ipv4Addr, SocketAddr};
    use std::time::Duration;

    /// Listen address: 0.0.0.0:8080.
    pub const BIND: SocketAddr = SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 8080);

    /// Access token lifetime (1 minute).
    pub const TOKEN_LIFETIME: Duration = Duration::from_secs(60);

    /// Interval between token sweeps (1 minute).
    pub const REAPER_INTERVAL: Duration = Duration::from_secs(60);

    /// Per-request timeout on the HTTP layer.
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

    /// Client registered at startup unless overridden.
    pub const CLIENT_ID: &str = "github-client-id";

    /// Secret of the startup client.
    pub const CLIENT_SECRET: &str = "github-client-secret";
}

/// Snapshot files, one per store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnapshotPaths {
    pub clients: Option<PathBuf>,
    pub codes: Option<PathBuf>,
    pub tokens: Option<PathBuf>,
}

impl SnapshotPaths {
    /// True when no snapshot file is configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clients.is_none() && self.codes.is_none() && self.tokens.is_none()
    }
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Address the listener binds to.
    pub bind: SocketAddr,

    /// Public base URL; user profile URLs are rooted here.
    pub base_url: Url,

    /// Snapshots preloaded at startup. Any failure aborts startup.
    pub load: SnapshotPaths,

    /// Snapshots written on shutdown.
    pub save: SnapshotPaths,

    /// Lifetime applied to newly issued access tokens.
    pub token_lifetime: Duration,

    /// Interval between token sweeps.
    pub reaper_interval: Duration,

    /// Which tokens a sweep evicts.
    pub sweep_policy: SweepPolicy,

    /// Per-request timeout on the HTTP layer.
    pub request_timeout: Duration,
}

impl Config {
    /// Create a configuration listening on `bind`, with base URL `http://<bind>`.
    ///
    /// # Errors
    ///
    /// Returns error if the bind address doesn't form a valid URL.
    pub fn new(bind: SocketAddr) -> Result<Self, url::ParseError> {
        Ok(Self::with_base_url(bind, base_url_for(bind)?))
    }

    /// Create a configuration with an explicit public base URL.
    #[must_use]
    pub fn with_base_url(bind: SocketAddr, base_url: Url) -> Self {
        Self {
            bind,
            base_url,
            load: SnapshotPaths::default(),
            save: SnapshotPaths::default(),
            token_lifetime: defaults::TOKEN_LIFETIME,
            reaper_interval: defaults::REAPER_INTERVAL,
            sweep_policy: SweepPolicy::default(),
            request_timeout: defaults::REQUEST_TIMEOUT,
        }
    }

    /// Create a test configuration on an ephemeral local port.
    #[must_use]
    pub fn for_testing(base_url: Url) -> Self {
        let bind = SocketAddr::from(([127, 0, 0, 1], 0));
        Self {
            reaper_interval: Duration::from_millis(50),
            request_timeout: Duration::from_secs(5),
            ..Self::with_base_url(bind, base_url)
        }
    }
}

/// Base URL a listener on `bind` is reachable at.
///
/// With port 0 the result also carries port 0; [`resolve_base_url`] fills in
/// the real port once the listener is bound.
pub fn base_url_for(bind: SocketAddr) -> Result<Url, url::ParseError> {
    Url::parse(&format!("http://{bind}"))
}

/// Replace port 0 in `base_url` with the port of the bound listener.
#[must_use]
pub fn resolve_base_url(base_url: &Url, local_addr: SocketAddr) -> Url {
    let mut resolved = base_url.clone();
    if resolved.port() == Some(0) {
        // A URL with an explicit port always has a host, so this can't fail
        let _ = resolved.set_port(Some(local_addr.port()));
    }
    resolved
}
