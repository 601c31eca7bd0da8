//! mountgate: a service gateway that reloads its configuration live.
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌──────────────────────────────────────────────────────┐
//!                      │                      MOUNTGATE                        │
//!                      │                                                       │
//!   Client Request     │  ┌─────────┐    ┌──────────────┐    ┌─────────────┐  │
//!   ───────────────────┼─▶│  http   │───▶│   routing    │───▶│ sub-service │  │
//!                      │  │ server  │    │ (mount table │    │   router    │  │
//!                      │  └─────────┘    │  snapshot)   │    └─────────────┘  │
//!                      │                 └──────▲───────┘                      │
//!                      │                        │ atomic publish               │
//!                      │                 ┌──────┴───────┐                      │
//!                      │                 │    reload    │                      │
//!                      │                 │ coordinator  │                      │
//!                      │                 └──────▲───────┘                      │
//!                      │                        │ runtime task                 │
//!                      │  ┌───────────────┐  ┌──┴─────────┐                    │
//!   config.json ───────┼─▶│ watcher thread│─▶│   bridge   │                    │
//!                      │  │  + debounce   │  │  (channel) │                    │
//!                      │  └───────────────┘  └────────────┘                    │
//!                      └──────────────────────────────────────────────────────┘
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use mountgate::config::WatchOptions;
use mountgate::lifecycle::{signals, startup, Shutdown};
use mountgate::observability::{logging, metrics};
use mountgate::service::{GatewayPolicy, RouterFactory};
use mountgate::{HttpServer, ServerContext};

#[derive(Parser, Debug)]
#[command(name = "mountgate")]
#[command(about = "Expose configured backends as HTTP sub-services, reloading the config live", long_about = None)]
struct Cli {
    /// Path to the JSON config file.
    #[arg(short, long)]
    config: PathBuf,

    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    #[arg(short, long, default_value_t = 8000)]
    port: u16,

    /// Watch the config file and apply changes without a restart.
    #[arg(long)]
    hot_reload: bool,

    /// Coalescing interval for config file events.
    #[arg(long, default_value_t = 500)]
    debounce_ms: u64,

    /// Prefix every service is mounted under.
    #[arg(long, default_value = "/")]
    path_prefix: String,

    /// Bearer key required by mounted services.
    #[arg(long)]
    api_key: Option<String>,

    /// Also require the key on health endpoints.
    #[arg(long)]
    strict_auth: bool,

    #[arg(long = "cors-allow-origins", default_value = "*")]
    cors_allow_origins: Vec<String>,

    /// Enables the admin API under /_admin.
    #[arg(long)]
    admin_key: Option<String>,

    /// Prometheus listener, e.g. 0.0.0.0:9090.
    #[arg(long)]
    metrics_address: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    logging::init(logging::DEFAULT_FILTER);

    tracing::info!("mountgate v{} starting", env!("CARGO_PKG_VERSION"));

    if let Some(addr) = cli.metrics_address {
        metrics::init_metrics(addr);
    }

    let policy = GatewayPolicy {
        api_key: cli.api_key.clone(),
        strict_auth: cli.strict_auth,
        cors_allow_origins: cli.cors_allow_origins.clone(),
    };
    let ctx = Arc::new(
        ServerContext::new(policy, Arc::new(RouterFactory))
            .with_path_prefix(&cli.path_prefix)
            .with_config_path(cli.config.clone()),
    );

    startup::bootstrap(&ctx, &cli.config).await?;

    let hot_reload = if cli.hot_reload {
        let options = WatchOptions::new(cli.config.clone()).with_debounce_ms(cli.debounce_ms);
        match startup::start_watcher(ctx.clone(), &options) {
            Ok(hot_reload) => Some(hot_reload),
            Err(e) => {
                tracing::error!(error = %e, "Hot reload disabled");
                None
            }
        }
    } else {
        None
    };

    let listener = TcpListener::bind((cli.host.as_str(), cli.port)).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Arc::new(Shutdown::new());
    signals::spawn_signal_listener(shutdown.clone());

    let server = HttpServer::new(ctx.clone(), cli.admin_key.clone());
    server.run(listener, shutdown.subscribe()).await?;

    if let Some(hot_reload) = hot_reload {
        hot_reload.shutdown().await;
    }
    ctx.teardown_all();

    tracing::info!("Shutdown complete");
    Ok(())
}
