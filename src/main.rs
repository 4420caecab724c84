//! Pokédex Server
//!
//! Pokémon reference API with image identification.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      POKÉDEX SERVER                         │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌───────────┐  ┌──────────────────┐  ┌──────────────────┐  │
//! │  │  API      │  │  Identification  │  │  Static files    │  │
//! │  │  (Axum)   │  │  ONNX | fallback │  │  (ServeDir)      │  │
//! │  └─────┬─────┘  └────────┬─────────┘  └──────────────────┘  │
//! │        └─────────────────┤                                  │
//! │                          ▼                                  │
//! │                   ┌─────────────┐                           │
//! │                   │ PostgreSQL  │                           │
//! │                   └─────────────┘                           │
//! └─────────────────────────────────────────────────────────────┘
//! ```

mod config;
mod db;
mod models;
mod handlers;
mod classifier;
mod error;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use tower_http::{
    cors::{CorsLayer, Any},
    trace::TraceLayer,
    compression::CompressionLayer,
    services::ServeDir,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use classifier::IdentificationService;
use models::PokemonDirectory;

pub use error::{AppError, AppResult};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    dotenvy::dotenv().ok();
    let config = config::Config::from_env();

    init_logging(&config);

    tracing::info!("Pokédex Server starting...");
    tracing::info!("Database: {}", config.database_url.split('@').last().unwrap_or("***"));

    // Initialize database pool
    let pool = db::create_pool(&config.database_url).await
        .context("Failed to create database pool")?;

    // Run migrations
    tracing::info!("Running database migrations...");
    db::run_migrations(&pool).await
        .context("Failed to run migrations")?;

    // Model is tried exactly once, here
    let identifier = Arc::new(IdentificationService::initialize(&config));

    // Build application state
    let state = AppState {
        directory: Arc::new(pool.clone()),
        pool,
        identifier,
        config: config.clone(),
    };

    // Build router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("🚀 Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn init_logging(config: &config::Config) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "pokedex_server=debug,tower_http=debug".into());

    if config.is_production() {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub pool: sqlx::PgPool,
    pub config: config::Config,
    pub identifier: Arc<IdentificationService>,
    pub directory: Arc<dyn PokemonDirectory>,
}

/// Create the main router with all routes
fn create_router(state: AppState) -> Router {
    // Identification (multipart upload)
    let predict_routes = Router::new()
        .route("/predict", post(handlers::predict::predict))
        .route("/api/classifier/status", get(handlers::health::classifier_status))
        .layer(DefaultBodyLimit::max(state.config.max_upload_bytes));

    // Browsing
    let pokemon_routes = Router::new()
        .route("/api/pokemon/:identifier", get(handlers::pokemon::get))
        .route("/api/pokemon/:identifier/images", get(handlers::pokemon::images))
        .route("/api/pokemon/:identifier/card-data", get(handlers::pokemon::card_data))
        .route("/api/download-card/:identifier", get(handlers::pokemon::download_card))
        .route("/search", get(handlers::pokemon::search))
        .route("/api/types", get(handlers::pokemon::types))
        .route("/api/random", get(handlers::pokemon::random))
        .route("/api/stats", get(handlers::pokemon::stats))
        .route("/api/pokemon-of-the-day", get(handlers::pokemon::of_the_day))
        .route("/api/gallery", get(handlers::pokemon::gallery));

    // Tools
    let tool_routes = Router::new()
        .route("/api/compare", post(handlers::tools::compare))
        .route("/api/team-analysis", post(handlers::tools::team_analysis))
        .route("/api/quiz/question", get(handlers::quiz::question))
        .route("/api/quiz/submit", post(handlers::quiz::submit))
        .route("/api/quiz/leaderboard", get(handlers::quiz::leaderboard));

    // Files on disk
    let static_dir = ServeDir::new(&state.config.static_dir);
    let pokedata_dir = ServeDir::new(&state.config.pokemon_data_dir);

    // Combine all routes
    Router::new()
        .route("/health", get(handlers::health::check))
        .merge(predict_routes)
        .merge(pokemon_routes)
        .merge(tool_routes)
        .nest_service("/static", static_dir)
        .nest_service("/pokedata", pokedata_dir)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        )
        .with_state(state)
}
