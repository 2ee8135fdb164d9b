use clap::{Parser, Subcommand};
use savora::config::Config;
use savora::error::AppResult;
use savora::server;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Savora - REST API backend for the catering storefront
#[derive(Parser, Debug)]
#[command(name = "savora")]
#[command(version = "1.0.0")]
#[command(about = "REST API backend for the Savora catering storefront", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the API server
    Serve {
        /// Host to bind to (overrides HOST env var)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to (overrides PORT env var)
        #[arg(long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() -> AppResult<()> {
    let cli = Cli::parse();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(Level::INFO.to_string())),
        )
        .init();

    // Load configuration
    let config = Config::from_env()?;

    match cli.command {
        Commands::Serve { host, port } => {
            // Override config with CLI args if provided
            let host = host.unwrap_or_else(|| config.server.host.clone());
            let port = port.unwrap_or(config.server.port);
            let addr = format!("{}:{}", host, port);

            server::run_server(config, addr).await
        }
    }
}
