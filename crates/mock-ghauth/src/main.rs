//! Mock GitHub OAuth Server - Entry Point

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use clap::builder::BoolishValueParser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use url::Url;

use mock_ghauth::config::{self, Config, SnapshotPaths, defaults};
use mock_ghauth::server::MockServer;
use mock_ghauth::store::SweepPolicy;

#[derive(Parser, Debug)]
#[command(name = "mock-ghauth")]
#[command(about = "Mock GitHub Enterprise OAuth server for automated tests")]
#[command(version)]
struct Cli {
    /// Debug output
    #[arg(short, long, env = "DEBUG", value_parser = BoolishValueParser::new())]
    debug: bool,

    /// Address to listen on
    #[arg(long, default_value_t = defaults::BIND, env = "SERVER_BIND")]
    bind: SocketAddr,

    /// Override the port of the bind address
    #[arg(long, env = "PORT")]
    port: Option<u16>,

    /// Public base URL user profile links are rooted at (default: http://<bind>)
    #[arg(long, env = "BASE_URL")]
    base_url: Option<Url>,

    /// Clients snapshot to load at startup
    #[arg(long, env = "LOAD_CLIENTS_FILE")]
    load_clients_file: Option<PathBuf>,

    /// Codes snapshot to load at startup
    #[arg(long, env = "LOAD_CODE_FILE")]
    load_code_file: Option<PathBuf>,

    /// Tokens snapshot to load at startup
    #[arg(long, env = "LOAD_TOKENS_FILE")]
    load_tokens_file: Option<PathBuf>,

    /// Write the clients snapshot here on shutdown
    #[arg(long, env = "SAVE_CLIENTS_FILE")]
    save_clients_file: Option<PathBuf>,

    /// Write the codes snapshot here on shutdown
    #[arg(long, env = "SAVE_CODE_FILE")]
    save_code_file: Option<PathBuf>,

    /// Write the tokens snapshot here on shutdown
    #[arg(long, env = "SAVE_TOKENS_FILE")]
    save_tokens_file: Option<PathBuf>,

    /// Lifetime of issued access tokens, in seconds
    #[arg(
        long,
        default_value_t = defaults::TOKEN_LIFETIME.as_secs(),
        env = "TOKEN_LIFETIME_SECS"
    )]
    token_lifetime_secs: u64,

    /// Interval between token sweeps, in seconds
    #[arg(
        long,
        default_value_t = defaults::REAPER_INTERVAL.as_secs(),
        env = "REAPER_INTERVAL_SECS"
    )]
    reaper_interval_secs: u64,

    /// Sweep with the legacy rule (evict tokens expiring after now)
    #[arg(long, env = "LEGACY_SWEEP", value_parser = BoolishValueParser::new())]
    legacy_sweep: bool,

    /// Client registered at startup
    #[arg(long, default_value = defaults::CLIENT_ID, env = "CLIENT_ID")]
    client_id: String,

    /// Secret of the client registered at startup
    #[arg(long, default_value = defaults::CLIENT_SECRET, env = "CLIENT_SECRET")]
    client_secret: String,

    /// Mint an extra client with a random id and print its credentials
    #[arg(long)]
    generate_client: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "RUST_LOG")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long)]
    json_logs: bool,
}

impl Cli {
    fn into_config(self) -> anyhow::Result<Config> {
        let mut bind = self.bind;
        if let Some(port) = self.port {
            bind.set_port(port);
        }

        let base_url = match self.base_url {
            Some(url) => url,
            None => config::base_url_for(bind).context("unable to derive base URL")?,
        };

        let mut config = Config::with_base_url(bind, base_url);
        config.load = SnapshotPaths {
            clients: self.load_clients_file,
            codes: self.load_code_file,
            tokens: self.load_tokens_file,
        };
        config.save = SnapshotPaths {
            clients: self.save_clients_file,
            codes: self.save_code_file,
            tokens: self.save_tokens_file,
        };
        config.token_lifetime = Duration::from_secs(self.token_lifetime_secs);
        config.reaper_interval = Duration::from_secs(self.reaper_interval_secs);
        if self.legacy_sweep {
            config.sweep_policy = SweepPolicy::Legacy;
        }

        Ok(config)
    }
}

/// `--debug` wins over `RUST_LOG`; otherwise `RUST_LOG` directives, then `log_level`.
fn env_filter(log_level: &str, debug: bool) -> EnvFilter {
    if debug {
        return EnvFilter::new("debug");
    }
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level))
}

fn init_tracing(filter: EnvFilter, json: bool) {
    let subscriber = tracing_subscriber::registry().with(filter);

    let fmt_layer = tracing_subscriber::fmt::layer();
    if json {
        subscriber.with(fmt_layer.json()).init();
    } else {
        subscriber.with(fmt_layer.compact()).init();
    }
}

fn spawn_signal_handler(shutdown: CancellationToken) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("Received shutdown signal");
                shutdown.cancel();
            }
            Err(err) => tracing::warn!(error = %err, "Unable to listen for shutdown signal"),
        }
    });
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    init_tracing(env_filter(&cli.log_level, cli.debug), cli.json_logs);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting mock GitHub OAuth server"
    );

    let client_id = cli.client_id.clone();
    let client_secret = cli.client_secret.clone();
    let generate_client = cli.generate_client;
    let config = cli.into_config()?;
    let save = config.save.clone();

    let server = MockServer::new(config)
        .await
        .context("unable to load snapshot")?;
    server.add_client(client_id, client_secret).await;

    if generate_client {
        let (id, secret) = server.clients().generate().await;
        tracing::info!(client_id = %id, "Generated OAuth client");
        println!("client_id={id} client_secret={secret}");
    }

    let shutdown = CancellationToken::new();
    spawn_signal_handler(shutdown.clone());

    let result = server.run(shutdown).await;

    if !save.is_empty() {
        match server.save_snapshots(&save).await {
            Ok(()) => tracing::info!("Saved snapshots"),
            Err(err) => tracing::error!(error = %err, "Unable to save snapshots"),
        }
    }

    result
}
