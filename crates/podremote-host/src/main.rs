//! PodRemote host entry point.
//!
//! Loads the configuration, installs logging, starts the server, and waits
//! for Ctrl-C or a client's `exit` command.
//!
//! # Architecture
//!
//! ```text
//! main()
//!  └─ load_config_from / load_config   -- TOML file or defaults
//!  └─ Server::new(...)
//!       ├─ LoggingExecutor             -- dry-run host actions
//!       └─ MdnsAdvertiser              -- DNS-SD record (if enabled)
//!  └─ HostAppState::toggle()           -- the power button, pressed once
//!  └─ connectivity watcher             -- logs "device (dis)connected"
//! ```
//!
//! Usage: `podremote-host [CONFIG_PATH]`

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use podremote_host::application::execute_action::ActionExecutor;
use podremote_host::infrastructure::actions::logging::LoggingExecutor;
use podremote_host::infrastructure::discovery::mdns::MdnsAdvertiser;
use podremote_host::infrastructure::discovery::Advertiser;
use podremote_host::infrastructure::network::server::Server;
use podremote_host::infrastructure::storage::config::{load_config, load_config_from};
use podremote_host::infrastructure::ui_bridge::{HostAppState, CONNECTED_LABEL, DISCONNECTED_LABEL};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::args_os().nth(1).map(PathBuf::from);
    let config = match &config_path {
        Some(path) => load_config_from(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => load_config().context("loading config")?,
    };

    // `RUST_LOG` wins over the configured level.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "PodRemote host starting");

    let server_config = config.server_config().context("invalid configuration")?;
    let executor: Arc<dyn ActionExecutor> = Arc::new(LoggingExecutor::new());
    let mdns = server_config
        .discovery_enabled
        .then(|| Arc::new(MdnsAdvertiser::new()));
    let advertiser = mdns.clone().map(|m| m as Arc<dyn Advertiser>);

    let server = Arc::new(Server::new(server_config, executor, advertiser));
    let state = HostAppState::new(Arc::clone(&server));
    state.toggle().await.context("starting server")?;

    let mut connectivity = server.connectivity();
    tokio::spawn(async move {
        while connectivity.changed().await.is_ok() {
            let count = *connectivity.borrow_and_update();
            let label = if count > 0 {
                CONNECTED_LABEL
            } else {
                DISCONNECTED_LABEL
            };
            info!(connections = count, "{label}");
        }
    });

    info!("PodRemote host ready.  Press Ctrl-C to exit.");

    let exit = server.exit_requested();
    tokio::select! {
        signal = tokio::signal::ctrl_c() => match signal {
            Ok(()) => info!("shutdown signal received"),
            Err(e) => warn!(error = %e, "could not listen for Ctrl-C; shutting down"),
        },
        _ = exit.cancelled() => info!("exit requested by a client"),
    }

    server.stop().await;
    if let Some(mdns) = mdns {
        mdns.shutdown();
    }

    info!("PodRemote host stopped");
    Ok(())
}
