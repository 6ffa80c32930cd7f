//! Read-only HTTP surface over the comparison engines.

use std::sync::Arc;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use sqlx::sqlite::SqlitePool;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::EnvFilter;

use benchmark_analysis::BenchmarkComparisonEngine;
use dashboard_orchestrator::DashboardOrchestrator;
use peer_analysis::PeerComparisonEngine;
use ratio_core::{AnalysisError, RatioCatalog, RatioRepository};
use ratio_store::SqliteRatioStore;
use trend_analysis::TrendAnalysisEngine;

mod company_routes;

pub use company_routes::company_routes;

/// Uniform response envelope for every endpoint.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Error wrapper that maps engine errors onto HTTP status codes.
pub struct AppError(pub anyhow::Error);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self.0.downcast_ref::<AnalysisError>() {
            Some(AnalysisError::NotFound(_)) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!("request failed: {:#}", self.0);
        }
        (status, Json(ApiResponse::<()>::error(self.0.to_string()))).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<dyn RatioRepository>,
    pub benchmark_engine: Arc<BenchmarkComparisonEngine>,
    pub peer_engine: Arc<PeerComparisonEngine>,
    pub trend_engine: Arc<TrendAnalysisEngine>,
    pub orchestrator: Arc<DashboardOrchestrator>,
}

impl AppState {
    pub fn new(repo: Arc<dyn RatioRepository>) -> Self {
        let catalog = RatioCatalog::new();
        Self {
            benchmark_engine: Arc::new(BenchmarkComparisonEngine::new(repo.clone(), catalog)),
            peer_engine: Arc::new(PeerComparisonEngine::new(repo.clone(), catalog)),
            trend_engine: Arc::new(TrendAnalysisEngine::new(repo.clone(), catalog)),
            orchestrator: Arc::new(DashboardOrchestrator::new(repo.clone())),
            repo,
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .merge(company_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> Json<ApiResponse<&'static str>> {
    Json(ApiResponse::success("ok"))
}

pub async fn run_server() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let database_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://ratios.db".to_string());
    let pool = SqlitePool::connect(&database_url).await?;
    ratio_store::init_schema(&pool).await?;

    let state = AppState::new(Arc::new(SqliteRatioStore::new(pool)));
    let app = router(state);

    let addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("listening on {}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
