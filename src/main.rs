use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use product_studio::{api, config, workflows};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load configuration
    config::Config::dotenv_load();
    let config = match config::Config::new() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("{}", e);
            std::process::exit(1);
        }
    };
    config.print_env_vars();

    let studio = match workflows::Studio::from_config(&config).await {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("failed to initialize: {}", e);
            std::process::exit(1);
        }
    };
    let state = Arc::new(api::AppState { studio, max_upload_bytes: config.max_upload_bytes });
    let app = api::router(state, &config.static_dir);

    // Run our application with safe parsing
    let ip: std::net::IpAddr = config.api_host.parse().unwrap_or_else(|_| {
        tracing::warn!("Invalid API_HOST '{}', falling back to 0.0.0.0", config.api_host);
        std::net::IpAddr::from([0, 0, 0, 0])
    });
    let port: u16 = config.api_port.parse().unwrap_or_else(|_| {
        tracing::warn!("Invalid PORT '{}', falling back to 10000", config.api_port);
        10000
    });
    let socket_address = SocketAddr::new(ip, port);
    tracing::info!("listening on {}", socket_address);
    if let Err(e) = axum::Server::bind(&socket_address).serve(app.into_make_service()).await {
        tracing::error!("server error: {}", e);
        std::process::exit(1);
    }
}
