//! imgdesk Web Console
//!
//! Browser console for an upstream image-hosting API.

use clap::Parser;
use imgdesk_core::{init_logging, FileConfig, LoggingConfig};
use imgdesk_web::{ImgdeskServerBuilder, WebConfig};
use std::path::PathBuf;
use tracing::{error, info};

/// imgdesk Web Console - sign in, browse and manage images on an upstream API
#[derive(Parser, Debug)]
#[command(name = "imgdesk-web")]
#[command(about = "Browser console for an upstream image API")]
#[command(version)]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Server host to bind to
    #[arg(long)]
    host: Option<String>,

    /// Server port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Base URL of the upstream image API
    #[arg(long)]
    api_server: Option<String>,

    /// Upstream request timeout in seconds
    #[arg(long)]
    upstream_timeout: Option<u64>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Load environment variables
    dotenvy::dotenv().ok();

    let file = match args.config.as_deref().map(FileConfig::from_file).transpose() {
        Ok(file) => file.unwrap_or_default(),
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    let logging = match (&args.log_level, &file.logging) {
        (Some(level), _) => LoggingConfig::with_level(level),
        (None, Some(logging)) => logging.clone(),
        (None, None) => LoggingConfig::with_level("info"),
    };
    if let Err(e) = init_logging(&logging) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    // File settings first, then environment, then flags
    let mut config = WebConfig::default();
    config.apply_file(&file);
    config.apply_env();

    let mut builder = ImgdeskServerBuilder::new(config);
    if let Some(host) = args.host {
        builder = builder.host(host);
    }
    if let Some(port) = args.port {
        builder = builder.port(port);
    }
    if let Some(api_server) = args.api_server {
        builder = builder.api_server(api_server);
    }
    if let Some(timeout) = args.upstream_timeout {
        builder = builder.upstream_timeout(timeout);
    }

    let server = match builder.build() {
        Ok(server) => server,
        Err(e) => {
            error!("Failed to build server: {}", e);
            std::process::exit(1);
        }
    };

    info!("Upstream API: {}", server.config().api_server);
    if let Err(e) = server.start().await {
        error!("Server failed: {}", e);
        std::process::exit(1);
    }
}
