use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::catalog::RatioCategory;
use crate::rules::{ComparisonState, Diff, RelativePosition, TrendDirection};

/// Company row, with its sector resolved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Company {
    pub id: i64,
    pub name: String,
    pub sector_id: i64,
    pub sector_name: String,
}

/// One persisted ratio value for a company and fiscal year.
/// At most one row exists per (company, year, key).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputedRatio {
    pub company_id: i64,
    pub fiscal_year: i32,
    pub ratio_key: String,
    pub value: f64,
}

/// Curated sector reference value for one ratio key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectorBenchmark {
    pub sector_id: i64,
    pub ratio_key: String,
    pub value: f64,
    pub source: Option<String>,
}

/// Aggregate statistics over sector peers for one (year, ratio key).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PeerStats {
    pub average: f64,
    /// Number of distinct companies that contributed a value.
    pub count: i64,
    pub min: f64,
    pub max: f64,
}

/// Company header embedded in evolution and dashboard payloads.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanySummary {
    pub id: i64,
    pub name: String,
    pub sector: String,
}

impl From<&Company> for CompanySummary {
    fn from(company: &Company) -> Self {
        Self {
            id: company.id,
            name: company.name.clone(),
            sector: company.sector_name.clone(),
        }
    }
}

/// Benchmark section of a comparison entry. Absent when the sector has
/// no curated reference for the key.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BenchmarkSection {
    pub value: f64,
    pub source: Option<String>,
    pub diff: Diff,
    pub meets: bool,
    pub state: ComparisonState,
    pub interpretation: String,
}

/// One company ratio compared against its sector benchmark.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BenchmarkComparison {
    pub ratio_display_name: String,
    pub ratio_key: String,
    pub company_value: f64,
    pub formula: String,
    pub category: RatioCategory,
    pub benchmark: Option<BenchmarkSection>,
}

/// Peer-average section of a comparison entry. Absent when the peer
/// sample is too small or degenerate to be meaningful.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeerAverageSection {
    pub value: f64,
    pub peer_count: i64,
    pub min: f64,
    pub max: f64,
    pub diff: Diff,
    pub relative_position: RelativePosition,
    pub interpretation: String,
}

/// One company ratio compared against the live sector peer average.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeerComparison {
    pub ratio_display_name: String,
    pub ratio_key: String,
    pub company_value: f64,
    pub formula: String,
    pub category: RatioCategory,
    pub peer_average: Option<PeerAverageSection>,
    pub no_reference: bool,
}

/// One (year, value) point of a ratio time series.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub year: i32,
    pub value: f64,
}

/// First-to-last change of a ratio series.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RatioTrend {
    pub direction: TrendDirection,
    pub change: f64,
    #[serde(rename = "initial")]
    pub initial_value: Option<f64>,
    #[serde(rename = "final")]
    pub final_value: Option<f64>,
}

impl RatioTrend {
    /// Trend for a series with fewer than two points.
    pub fn no_data() -> Self {
        Self {
            direction: TrendDirection::NoData,
            change: 0.0,
            initial_value: None,
            final_value: None,
        }
    }
}

/// Multi-year view of one ratio: the company series, the constant
/// sector benchmark, and year-aligned peer averages.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RatioEvolution {
    pub display_name: String,
    pub formula: String,
    pub category: RatioCategory,
    pub series: Vec<SeriesPoint>,
    pub benchmark: Option<f64>,
    pub peer_yearly_average: BTreeMap<i32, f64>,
    pub trend: RatioTrend,
}

/// Full evolution payload for a company.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvolutionReport {
    pub company: CompanySummary,
    pub available_years: Vec<i32>,
    pub ratios: BTreeMap<String, RatioEvolution>,
}

/// Per-category benchmark attainment, used for best/opportunity picks.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryScore {
    pub category: RatioCategory,
    pub met: usize,
    pub total: usize,
    pub percent: f64,
}

/// The strongest upward trend across all ratios.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImprovementHighlight {
    pub ratio_key: String,
    pub display_name: String,
    pub change_percent: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub total_ratios: usize,
    pub best_category: Option<CategoryScore>,
    pub opportunity_category: Option<CategoryScore>,
    pub biggest_improvement: Option<ImprovementHighlight>,
}

impl DashboardSummary {
    pub fn empty() -> Self {
        Self {
            total_ratios: 0,
            best_category: None,
            opportunity_category: None,
            biggest_improvement: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BenchmarkPreview {
    pub met: usize,
    pub total: usize,
    pub percent: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeerPreview {
    /// Categories where more than half of the ratios sit above the
    /// peer average.
    pub strong_categories: usize,
    pub total_categories: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendPreview {
    pub years_of_data: usize,
    pub overall_direction: TrendDirection,
}

/// Aggregated dashboard payload for one company and selected year.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardReport {
    pub company: CompanySummary,
    pub available_years: Vec<i32>,
    pub selected_year: Option<i32>,
    pub has_data: bool,
    pub summary: DashboardSummary,
    pub preview_benchmark: BenchmarkPreview,
    pub preview_peer: PeerPreview,
    pub preview_trend: TrendPreview,
}

impl DashboardReport {
    /// Fixed payload for a company with no computed ratios at all.
    pub fn empty(company: CompanySummary) -> Self {
        Self {
            company,
            available_years: Vec::new(),
            selected_year: None,
            has_data: false,
            summary: DashboardSummary::empty(),
            preview_benchmark: BenchmarkPreview {
                met: 0,
                total: 0,
                percent: 0.0,
            },
            preview_peer: PeerPreview {
                strong_categories: 0,
                total_categories: 0,
            },
            preview_trend: TrendPreview {
                years_of_data: 0,
                overall_direction: TrendDirection::Flat,
            },
        }
    }
}
