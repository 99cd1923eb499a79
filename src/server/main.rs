//! Report server for property utility analysis.
//!
//! `POST /v1/analyze` runs the engine over caller-supplied GeoJSON;
//! `GET /v1/report` fetches features from the configured providers.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use clap::Parser;
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use utility_proximity::report::{generate, AnalyzeRequest, UtilityReport};
use utility_proximity::sources::SourceOrchestrator;
use utility_proximity::{Config, FeatureKind, GeoPoint};

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[derive(Parser, Debug)]
#[command(name = "server")]
#[command(about = "Utility proximity report server")]
struct Args {
    /// TOML config with [global] and [[sources]]
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen address (overrides the config file)
    #[arg(short, long)]
    listen: Option<String>,
}

/// Application state shared across handlers
struct AppState {
    orchestrator: SourceOrchestrator,
    source_count: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::DEBUG)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();

    info!("Utility Proximity Server");

    let config = match &args.config {
        Some(path) => {
            info!("Loading config from {}", path.display());
            Config::load_from_file(path)?
        }
        None => Config::default(),
    };
    let listen = args.listen.unwrap_or_else(|| config.global.listen.clone());

    let orchestrator =
        SourceOrchestrator::from_config(&config).context("Failed to build upstream providers")?;
    let source_count = config.enabled_sources().len();
    info!("{} upstream sources enabled", source_count);

    let state = Arc::new(AppState {
        orchestrator,
        source_count,
    });

    // Build router
    let app = Router::new()
        .route("/health", get(health_handler))
        .route("/v1/analyze", post(analyze_handler))
        .route("/v1/report", get(report_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    info!("Starting server on {}", listen);

    let listener = tokio::net::TcpListener::bind(&listen).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Health check endpoint
async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let kinds = FeatureKind::all()
        .iter()
        .filter(|kind| !state.orchestrator.providers_for(**kind).is_empty())
        .count();

    Json(HealthResponse {
        status: "ok",
        sources: state.source_count,
        kinds_covered: kinds,
    })
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    sources: usize,
    kinds_covered: usize,
}

/// Analyze caller-supplied collections
async fn analyze_handler(
    Json(request): Json<AnalyzeRequest>,
) -> Result<Json<UtilityReport>, (StatusCode, String)> {
    validate_property(request.property)?;
    Ok(Json(request.run().await))
}

/// Report from the configured upstream providers
async fn report_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ReportQueryParams>,
) -> Result<Json<UtilityReport>, (StatusCode, String)> {
    let property = GeoPoint::new(params.lat, params.lon);
    validate_property(property)?;

    Ok(Json(generate(&state.orchestrator, property).await))
}

#[derive(Deserialize)]
struct ReportQueryParams {
    /// Property latitude
    lat: f64,
    /// Property longitude
    lon: f64,
}

fn validate_property(property: GeoPoint) -> Result<(), (StatusCode, String)> {
    let in_range =
        (-90.0..=90.0).contains(&property.lat) && (-180.0..=180.0).contains(&property.lon);
    if property.is_finite() && in_range {
        Ok(())
    } else {
        Err((
            StatusCode::BAD_REQUEST,
            format!("invalid coordinates ({}, {})", property.lat, property.lon),
        ))
    }
}
