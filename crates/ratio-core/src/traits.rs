use async_trait::async_trait;

use crate::{AnalysisError, Company, ComputedRatio, PeerStats, SectorBenchmark};

/// Read-only access to persisted ratio and benchmark data.
///
/// The engines never write; every method is a plain lookup and any
/// failure surfaces immediately (no retries, no silent defaults).
#[async_trait]
pub trait RatioRepository: Send + Sync {
    /// Resolve a company and its sector. `NotFound` when absent.
    async fn find_company(&self, company_id: i64) -> Result<Company, AnalysisError>;

    /// Computed ratios for one company and fiscal year, ordered by key.
    async fn computed_ratios(
        &self,
        company_id: i64,
        year: i32,
    ) -> Result<Vec<ComputedRatio>, AnalysisError>;

    /// Computed ratios for one company across all years, ordered by
    /// key then year.
    async fn computed_ratios_all_years(
        &self,
        company_id: i64,
    ) -> Result<Vec<ComputedRatio>, AnalysisError>;

    /// Curated benchmark values for a sector.
    async fn sector_benchmarks(
        &self,
        sector_id: i64,
    ) -> Result<Vec<SectorBenchmark>, AnalysisError>;

    /// Aggregate statistics across all companies of a sector for one
    /// (year, ratio key). `exclude_zero` drops exact-zero values from
    /// the sample.
    async fn peer_stats(
        &self,
        sector_id: i64,
        year: i32,
        ratio_key: &str,
        exclude_zero: bool,
    ) -> Result<PeerStats, AnalysisError>;

    /// Fiscal years for which the company has any computed ratio,
    /// ascending.
    async fn distinct_years(&self, company_id: i64) -> Result<Vec<i32>, AnalysisError>;
}
