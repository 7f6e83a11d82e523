use std::sync::Arc;

use anyhow::Result;
use shared::jwt::JwtConfig;
use tracing::info;

use sharoushi_api::app::{self, AppState};
use sharoushi_api::config;
use sharoushi_api::middleware;
use sharoushi_api::services::{build_email_sender, GoogleClient};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let config = config::Config::load()?;

    middleware::logging::init_logging(&config.logging)?;
    middleware::init_metrics()?;

    info!("Starting Sharoushi API v{}", env!("CARGO_PKG_VERSION"));

    let pool = persistence::db::create_pool(&config.database.to_pool_config()).await?;

    info!("Running database migrations...");
    persistence::db::run_migrations(&pool).await?;
    info!("Migrations completed");

    let jwt = JwtConfig::with_leeway(
        &config.jwt.secret,
        config.jwt.access_token_expiry_secs,
        config.jwt.leeway_secs,
    )?;
    let email = build_email_sender(&config.email)?;
    let google = GoogleClient::new(config.google.clone(), pool.clone())?;

    let addr = config.socket_addr()?;
    let state = AppState {
        pool,
        config: Arc::new(config),
        jwt: Arc::new(jwt),
        email,
        google,
    };
    let app = app::create_app(state);

    info!("Server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
