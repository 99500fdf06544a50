use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use photohub::config::ServerConfig;
use photohub::hub::PhotoHub;
use photohub::server::{AppState, create_router};

#[derive(Parser)]
#[command(name = "photohub")]
#[command(about = "A photo storage and serving server", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the server
    Serve {
        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(long, short, default_value = "8080")]
        port: u16,

        /// Data directory for the catalog, originals, and thumbnails
        #[arg(long, default_value = "./data")]
        data_dir: String,

        /// Folder of existing photos to catalog once at startup
        #[arg(long)]
        local_photos: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("photohub=info".parse()?))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            host,
            port,
            data_dir,
            local_photos,
        } => {
            let config = ServerConfig {
                host,
                port,
                data_dir: data_dir.into(),
                local_photos,
            };

            let hub = PhotoHub::open(&config)?;
            hub.initialize().await?;

            if let Some(folder) = config.local_photos.clone() {
                let added = hub.scan_local_folder(folder.clone()).await?;
                info!("Cataloged {added} photos from {}", folder.display());
            }

            let state = Arc::new(AppState { hub: Arc::new(hub) });
            let app = create_router(state);
            let addr = config.socket_addr()?;

            info!("Starting server on {}", addr);

            let listener = tokio::net::TcpListener::bind(addr).await?;
            axum::serve(listener, app).await?;
        }
    }

    Ok(())
}
