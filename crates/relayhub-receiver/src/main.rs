//! `RelayHub` Agent Receiver
//!
//! HTTP service that registers relays, hands them tasks and forwards the
//! monitoring data they collect.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::info;

use relayhub_core::config::{self, ReceiverConfig};
use relayhub_receiver::activation::{ActivationCoordinator, ConfigSnapshotResolver};
use relayhub_receiver::certs::{LocalCa, RegistrationService};
use relayhub_receiver::lifecycle::RelayLifecycle;
use relayhub_receiver::monitoring::{MonitoringForwarder, UnixSocketSink};
use relayhub_receiver::registry::RelayRegistry;
use relayhub_receiver::server::{AppState, build_router};
use relayhub_receiver::site::RestSiteDirectory;
use relayhub_receiver::storage::ReceiverDatabase;
use relayhub_receiver::tasks::TaskStore;

#[derive(Parser, Debug)]
#[command(name = "relayhub-receiver")]
#[command(
    version,
    about = "RelayHub agent receiver - relay registration and task distribution"
)]
struct Args {
    /// Path to a JSON config file.
    #[arg(long, env = "RELAYHUB_CONFIG")]
    config: Option<PathBuf>,

    /// Address to listen on.
    #[arg(long)]
    listen_addr: Option<SocketAddr>,

    /// Path to SQLite database file.
    #[arg(long)]
    database_path: Option<PathBuf>,

    /// Directory with rendered relay configuration snapshots.
    #[arg(long)]
    config_root: Option<PathBuf>,

    /// Unix socket of the monitoring core's raw-data input.
    #[arg(long)]
    raw_data_socket: Option<PathBuf>,

    /// REST base URL of the site.
    #[arg(long)]
    site_url: Option<String>,

    /// Directory holding the receiver CA.
    #[arg(long)]
    ca_dir: Option<PathBuf>,

    /// Run as a remote site (relay registration disabled).
    #[arg(long)]
    is_remote_site: bool,

    /// Output logs as JSON (for structured log aggregation).
    #[arg(long)]
    log_json: bool,
}

impl Args {
    fn apply(self, config: &mut ReceiverConfig) {
        if let Some(addr) = self.listen_addr {
            config.listen_addr = addr;
        }
        if let Some(path) = self.database_path {
            config.database_path = Some(path);
        }
        if let Some(root) = self.config_root {
            config.config_root = root;
        }
        if let Some(socket) = self.raw_data_socket {
            config.raw_data_socket = socket;
        }
        if let Some(url) = self.site_url {
            config.site_url = url;
        }
        if let Some(dir) = self.ca_dir {
            config.ca_dir = Some(dir);
        }
        config.is_remote_site |= self.is_remote_site;
        config.log_json |= self.log_json;
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let mut config = config::load_config(args.config.as_deref())?;
    args.apply(&mut config);

    relayhub_core::tracing_init::init_tracing("relayhub_receiver=info", config.log_json)?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        addr = %config.listen_addr,
        remote_site = config.is_remote_site,
        task_retention = ?config.task_retention,
        "Starting relayhub-receiver"
    );

    let db_path = config
        .database_path
        .clone()
        .or_else(config::database_path)
        .context("Cannot determine database path")?;
    info!(path = %db_path.display(), "Opening receiver database");
    let db = ReceiverDatabase::open(&db_path).await?;

    let ca_dir = config
        .ca_dir
        .clone()
        .or_else(config::ca_dir)
        .context("Cannot determine CA directory")?;
    let ca = LocalCa::load_or_generate(&ca_dir)
        .with_context(|| format!("Loading CA from {}", ca_dir.display()))?;

    let site = RestSiteDirectory::new(&config.site_url)?;
    let sink = UnixSocketSink::new(config.raw_data_socket.clone());

    let registry = RelayRegistry::new(db.clone());
    let lifecycle = RelayLifecycle::new(registry.clone(), Arc::new(site));
    let tasks = TaskStore::new(db, registry.clone());
    let snapshots = ConfigSnapshotResolver::new(&config.config_root);
    let state = AppState {
        coordinator: ActivationCoordinator::new(
            lifecycle.clone(),
            tasks.clone(),
            snapshots.clone(),
        ),
        registration: RegistrationService::new(
            lifecycle.clone(),
            Arc::new(ca),
            config.is_remote_site,
        ),
        forwarder: MonitoringForwarder::new(registry, Arc::new(sink)),
        snapshots,
        lifecycle,
        tasks,
    };

    let listener = TcpListener::bind(config.listen_addr).await?;
    info!(addr = %config.listen_addr, "Receiver listening");

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(async {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Received shutdown signal");
            }
        })
        .await?;

    info!("Receiver stopped");
    Ok(())
}
