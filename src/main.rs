mod api;
mod dispatch;
mod realtime;
mod session;

#[cfg(test)]
mod testing;

use clap::{Parser, Subcommand};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use wasend_channels::whatsapp::{self, WhatsAppClient};
use wasend_core::config::{self, Config};
use wasend_core::traits::MessagingClient;
use wasend_store::Store;

use crate::api::AppState;
use crate::dispatch::Dispatcher;
use crate::session::SessionManager;

#[derive(Parser)]
#[command(name = "wasend", version, about = "WhatsApp bulk messaging server")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file.
    #[arg(short, long, default_value = "config.toml")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server and realtime channel.
    Start {
        /// Listen port (overrides `api.port`).
        #[arg(long, env = "PORT")]
        port: Option<u16>,
        /// Listen address (overrides `api.host`).
        #[arg(long)]
        host: Option<String>,
    },
    /// Show configuration, session and record counts.
    Status,
    /// Delete the stored WhatsApp session so the next start pairs again.
    Reset,
}

fn env_filter(default: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

/// Stdout plus a daily-rolling file under `{data_dir}/logs`.
fn init_server_logging(cfg: &Config) -> anyhow::Result<WorkerGuard> {
    let logs_dir = cfg.logs_dir();
    std::fs::create_dir_all(&logs_dir)?;
    let (file_writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::daily(&logs_dir, "wasend.log"));

    tracing_subscriber::registry()
        .with(env_filter(&cfg.app.log_level))
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(file_writer),
        )
        .init();
    Ok(guard)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("failed to listen for ctrl-c: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    info!("Received shutdown signal");
}

async fn start(mut cfg: Config, port: Option<u16>, host: Option<String>) -> anyhow::Result<()> {
    if let Some(port) = port {
        cfg.api.port = port;
    }
    if let Some(host) = host {
        cfg.api.host = host;
    }
    let _log_guard = init_server_logging(&cfg)?;

    let store = Store::from_config(&cfg).await?;
    let client: Arc<dyn MessagingClient> = Arc::new(WhatsAppClient::new(
        cfg.whatsapp.clone(),
        cfg.session_dir(),
    ));

    let (events, _) = broadcast::channel(64);
    let session = SessionManager::new(client.clone(), cfg.connection.clone(), events.clone());
    let dispatcher = Arc::new(Dispatcher::new(
        client,
        store.clone(),
        cfg.messaging.clone(),
        events,
    ));
    let state = AppState::new(&cfg, session.clone(), dispatcher, store);

    // Resume a paired session without waiting for the browser.
    if cfg.session_dir().join("whatsapp.db").exists() {
        info!("stored session found, reconnecting");
        if let Err(e) = session.request_connect().await {
            warn!("startup reconnect failed: {e}");
        }
    }

    println!("wasend — listening on http://{}:{}", cfg.api.host, cfg.api.port);
    api::serve(&cfg.api, state, shutdown_signal()).await?;

    session.shutdown().await;
    info!("wasend stopped");
    Ok(())
}

async fn status(cfg: &Config, config_path: &str) -> anyhow::Result<()> {
    println!("wasend — Status Check\n");
    println!("Config: {config_path}");
    println!("Data dir: {}", cfg.data_dir().display());
    println!("API: http://{}:{}", cfg.api.host, cfg.api.port);
    println!(
        "Auth: {}",
        if cfg.api.api_key.is_empty() {
            "disabled"
        } else {
            "bearer token"
        }
    );
    println!();

    let session_dir = cfg.session_dir();
    println!(
        "  whatsapp session: {}",
        if session_dir.join("whatsapp.db").exists() {
            "stored (will reconnect on start)"
        } else {
            "none (pair with QR on start)"
        }
    );

    let store = Store::from_config(cfg).await?;
    let counts = store.counts().await?;
    println!("  storage: {}", store.backend().as_str());
    if let Some(dir) = store.dir() {
        println!("  storage dir: {}", dir.display());
    }
    println!(
        "  records: {} contacts, {} groups, {} templates, {} logs",
        counts.contacts, counts.groups, counts.templates, counts.logs
    );
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load(&cli.config)?;

    match cli.command {
        Commands::Start { port, host } => start(cfg, port, host).await?,
        Commands::Status => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter("warn"))
                .init();
            status(&cfg, &cli.config).await?;
        }
        Commands::Reset => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter(&cfg.app.log_level))
                .init();
            if whatsapp::remove_session(&cfg.session_dir())? {
                println!("WhatsApp session deleted. Scan a new QR code on next start.");
            } else {
                println!("No stored WhatsApp session.");
            }
        }
    }
    Ok(())
}
