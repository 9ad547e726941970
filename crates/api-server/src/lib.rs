//! HTTP surface for the financial ratio dashboard.
//!
//! One data route: `GET /api/dashboard/:ticker` returns the five ratio
//! groups plus the trailing price series as JSON.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use dashboard_core::{DashboardError, DashboardResult};
use dashboard_service::DashboardService;
use serde_json::json;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::EnvFilter;
use yahoo_client::YahooClient;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<DashboardService>,
}

/// User-visible request failure. Fatal per-query errors from the core
/// (format, missing field, provider) surface here with a message; degraded
/// individual ratios never do, they arrive as NaN cells in a 200 body.
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: String,
}

impl AppError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl From<DashboardError> for AppError {
    fn from(err: DashboardError) -> Self {
        Self {
            status: StatusCode::BAD_GATEWAY,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/dashboard/:ticker", get(get_dashboard))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn get_dashboard(
    State(state): State<AppState>,
    Path(ticker): Path<String>,
) -> Result<Json<DashboardResult>, AppError> {
    if ticker.trim().is_empty() {
        return Err(AppError::bad_request("ticker must not be empty"));
    }

    let result = state.service.compute_dashboard(&ticker).await?;
    Ok(Json(result))
}

pub async fn run_server() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let provider = Arc::new(YahooClient::new());
    let state = AppState {
        service: Arc::new(DashboardService::new(provider)),
    };

    let port: u16 = std::env::var("API_PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(8080);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    tracing::info!("API server listening on port {}", port);
    axum::serve(listener, app(state)).await?;

    Ok(())
}
