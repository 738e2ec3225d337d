//! Driverelay - OAuth login and Google Drive file relay for a browser frontend.
//!
//! Every option can also be supplied through the environment.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use driverelay_server::{config, create_router, AppState, ServerConfig};
use driverelay_storage::{GoogleProvider, OAuthConfig};

#[derive(Parser)]
#[command(name = "driverelay")]
#[command(about = "Relay a browser frontend's file operations to Google Drive")]
#[command(version)]
struct Cli {
    /// OAuth client ID.
    #[arg(long, env = "GOOGLE_CLIENT_ID")]
    client_id: String,

    /// OAuth client secret.
    #[arg(long, env = "GOOGLE_CLIENT_SECRET", hide_env_values = true)]
    client_secret: String,

    /// Redirect URI registered with Google, pointing at `/callback`.
    #[arg(long, env = "REDIRECT_URI")]
    redirect_uri: String,

    /// Frontend URL that receives the tokens after login.
    #[arg(long, env = "FRONT_END_URI")]
    front_end_uri: String,

    /// Address to bind.
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on.
    #[arg(short, long, env = "PORT", default_value_t = 3000)]
    port: u16,

    /// Directory for spooling uploads.
    #[arg(long, env = "UPLOAD_DIR", default_value = config::DEFAULT_UPLOAD_DIR)]
    upload_dir: PathBuf,

    /// Largest accepted upload request, in bytes.
    #[arg(long, env = "MAX_UPLOAD_SIZE", default_value_t = config::DEFAULT_MAX_UPLOAD_SIZE)]
    max_upload_size: usize,

    /// Connect and read timeout for Google calls, in seconds (0 disables).
    #[arg(long, env = "UPSTREAM_TIMEOUT_SECS", default_value_t = 30)]
    upstream_timeout_secs: u64,

    /// Comma-separated CORS allow-list (default: any origin).
    #[arg(long, env = "CORS_ORIGINS", value_delimiter = ',')]
    cors_origins: Vec<String>,

    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG takes precedence over -v.
    let default_directive = if cli.verbose {
        "driverelay=debug,tower_http=debug"
    } else {
        "driverelay=info"
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();

    let timeout = (cli.upstream_timeout_secs > 0)
        .then(|| Duration::from_secs(cli.upstream_timeout_secs));

    let oauth = OAuthConfig {
        client_id: cli.client_id,
        client_secret: cli.client_secret,
        redirect_url: cli.redirect_uri,
    };
    let provider =
        GoogleProvider::new(oauth, timeout).context("Invalid OAuth configuration")?;

    let config = ServerConfig::new(&cli.front_end_uri)
        .context("Invalid frontend URI")?
        .with_upload_dir(&cli.upload_dir)
        .with_max_upload_size(cli.max_upload_size)
        .with_cors_origins(cli.cors_origins);

    tokio::fs::create_dir_all(&cli.upload_dir)
        .await
        .with_context(|| format!("Failed to create upload directory {:?}", cli.upload_dir))?;

    let app = create_router(AppState::new(Arc::new(provider), config));

    let listener = TcpListener::bind((cli.host.as_str(), cli.port))
        .await
        .with_context(|| format!("Failed to bind {}:{}", cli.host, cli.port))?;
    info!(address = %listener.local_addr()?, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server stopped");
    Ok(())
}

/// Resolves on Ctrl-C or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
