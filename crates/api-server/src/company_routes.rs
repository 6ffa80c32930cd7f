//! Company Analytics API Routes
//!
//! Endpoints for the benchmark, peer and trend views plus the
//! aggregated dashboard.

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use ratio_core::{BenchmarkComparison, DashboardReport, EvolutionReport, PeerComparison};

use crate::{ApiResponse, AppError, AppState};

#[derive(Debug, Deserialize)]
pub struct YearQuery {
    #[serde(default)]
    pub year: Option<i32>,
}

pub fn company_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/companies/:id/comparison/benchmark",
            get(benchmark_comparison),
        )
        .route("/api/companies/:id/comparison/peers", get(peer_comparison))
        .route("/api/companies/:id/evolution", get(evolution))
        .route("/api/companies/:id/evolution/:ratio_key", get(ratio_evolution))
        .route("/api/companies/:id/dashboard", get(dashboard))
}

/// Resolve the year to analyze: an explicit query year, else the
/// latest year with data. Companies without data yield empty
/// comparison lists regardless of the year used.
async fn resolve_year(
    state: &AppState,
    company_id: i64,
    requested: Option<i32>,
) -> Result<i32, AppError> {
    if let Some(year) = requested {
        return Ok(year);
    }
    let years = state.repo.distinct_years(company_id).await?;
    Ok(years.last().copied().unwrap_or(0))
}

async fn benchmark_comparison(
    State(state): State<AppState>,
    Path(company_id): Path<i64>,
    Query(query): Query<YearQuery>,
) -> Result<Json<ApiResponse<Vec<BenchmarkComparison>>>, AppError> {
    let year = resolve_year(&state, company_id, query.year).await?;
    let entries = state.benchmark_engine.compare(company_id, year).await?;
    Ok(Json(ApiResponse::success(entries)))
}

async fn peer_comparison(
    State(state): State<AppState>,
    Path(company_id): Path<i64>,
    Query(query): Query<YearQuery>,
) -> Result<Json<ApiResponse<Vec<PeerComparison>>>, AppError> {
    let year = resolve_year(&state, company_id, query.year).await?;
    let entries = state.peer_engine.compare(company_id, year).await?;
    Ok(Json(ApiResponse::success(entries)))
}

async fn evolution(
    State(state): State<AppState>,
    Path(company_id): Path<i64>,
) -> Result<Json<ApiResponse<EvolutionReport>>, AppError> {
    let report = state.trend_engine.analyze_company(company_id).await?;
    Ok(Json(ApiResponse::success(report)))
}

async fn ratio_evolution(
    State(state): State<AppState>,
    Path((company_id, ratio_key)): Path<(i64, String)>,
) -> Result<Json<ApiResponse<EvolutionReport>>, AppError> {
    let report = state
        .trend_engine
        .analyze_ratio(company_id, &ratio_key)
        .await?;
    Ok(Json(ApiResponse::success(report)))
}

async fn dashboard(
    State(state): State<AppState>,
    Path(company_id): Path<i64>,
    Query(query): Query<YearQuery>,
) -> Result<Json<ApiResponse<DashboardReport>>, AppError> {
    let report = state.orchestrator.dashboard(company_id, query.year).await?;
    Ok(Json(ApiResponse::success(report)))
}
