use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

use photoframe::{AppState, Config, catalog::CatalogWatcher, create_app, startup_checks, sync};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Global options that apply to all commands
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: PathBuf,

    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the photo frame server (default if no command specified)
    Serve {
        #[arg(short, long)]
        port: Option<u16>,

        #[arg(long)]
        host: Option<String>,

        /// Automatically quit after specified number of seconds (useful for testing)
        #[arg(long)]
        quit_after: Option<u64>,
    },

    /// Download the items listed in a remote-library manifest into an album
    Import {
        /// Album directory to land the items in, under the photo directory
        #[arg(short, long)]
        album: String,

        /// JSON array of items with id, filename and baseUrl
        #[arg(short, long)]
        manifest: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Set up logging first
    let level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = Config::load_or_create(&cli.config).await;

    match cli.command {
        Some(Commands::Import { album, manifest }) => run_import(config, album, manifest).await,
        Some(Commands::Serve {
            port,
            host,
            quit_after,
        }) => run_server(config, port, host, quit_after).await,
        None => run_server(config, None, None, None).await,
    }
}

async fn run_import(
    config: Config,
    album: String,
    manifest: PathBuf,
) -> Result<(), Box<dyn std::error::Error>> {
    if !config.google_photos.enabled {
        info!("Google Photos sync is disabled");
        return Ok(());
    }

    let items = sync::load_manifest(&manifest).await?;
    let downloader = sync::HttpDownloader::new()?;
    let report = sync::sync_album(&config.photos_dir, &album, &items, &downloader).await?;

    if report.failed > 0 {
        tracing::warn!("{} items failed to sync", report.failed);
    }
    info!("Sync complete!");
    Ok(())
}

async fn run_server(
    config: Config,
    port: Option<u16>,
    host: Option<String>,
    quit_after: Option<u64>,
) -> Result<(), Box<dyn std::error::Error>> {
    let host = host.unwrap_or(config.host.clone());
    let port = port.unwrap_or(config.port);

    info!("Photo directory: {:?}", config.photos_dir);
    info!("Static files directory: {:?}", config.static_dir);

    if let Err(errors) = startup_checks::perform_startup_checks(&config).await {
        for error in &errors {
            tracing::warn!("Startup check failed: {}", error);
        }
        tracing::warn!("Continuing in degraded mode");
    }

    let app_state = AppState::new(config)?;
    let catalog = Arc::clone(&app_state.catalog);

    // Subscribe before the initial scan so changes made while it runs still
    // queue a rescan.
    let _watcher = match CatalogWatcher::start(Arc::clone(&catalog)) {
        Ok(watcher) => Some(watcher),
        Err(e) => {
            tracing::error!("File watcher not started, catalog will not refresh: {}", e);
            None
        }
    };
    catalog.refresh().await;

    let app = create_app(app_state);

    let addr = SocketAddr::from((host.parse::<std::net::IpAddr>()?, port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Photo frame server running at http://{}", addr);

    let server = axum::serve(listener, app);
    let graceful = server.with_graceful_shutdown(shutdown_signal(quit_after));

    if let Err(e) = graceful.await {
        tracing::error!("Server error: {}", e);
    }

    info!("Shut down");
    Ok(())
}

async fn shutdown_signal(quit_after: Option<u64>) {
    use tokio::signal;
    use tokio::time::{Duration, sleep};

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let quit_timer = async {
        if let Some(seconds) = quit_after {
            info!(
                "Server will automatically shut down after {} seconds",
                seconds
            );
            sleep(Duration::from_secs(seconds)).await;
            info!("Quit timer expired, shutting down");
        } else {
            std::future::pending::<()>().await
        }
    };

    tokio::select! {
        _ = ctrl_c => {
            info!("Shutdown signal received (Ctrl+C)");
        },
        _ = terminate => {
            info!("Shutdown signal received (SIGTERM)");
        },
        _ = quit_timer => {},
    }
}
