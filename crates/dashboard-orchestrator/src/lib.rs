//! Aggregates the three comparison engines into one dashboard payload
//! for a selected fiscal year.

use std::collections::BTreeMap;
use std::sync::Arc;

use benchmark_analysis::BenchmarkComparisonEngine;
use peer_analysis::PeerComparisonEngine;
use ratio_core::{
    round2, AnalysisError, BenchmarkComparison, BenchmarkPreview, CategoryScore,
    DashboardReport, DashboardSummary, EvolutionReport, ImprovementHighlight, PeerComparison,
    PeerPreview, RatioCatalog, RatioCategory, RatioRepository, RelativePosition, TrendDirection,
    TrendPreview,
};
use trend_analysis::TrendAnalysisEngine;

pub struct DashboardOrchestrator {
    repo: Arc<dyn RatioRepository>,
    benchmark_engine: BenchmarkComparisonEngine,
    peer_engine: PeerComparisonEngine,
    trend_engine: TrendAnalysisEngine,
}

impl DashboardOrchestrator {
    pub fn new(repo: Arc<dyn RatioRepository>) -> Self {
        let catalog = RatioCatalog::new();
        Self {
            benchmark_engine: BenchmarkComparisonEngine::new(repo.clone(), catalog),
            peer_engine: PeerComparisonEngine::new(repo.clone(), catalog),
            trend_engine: TrendAnalysisEngine::new(repo.clone(), catalog),
            repo,
        }
    }

    /// Build the dashboard for a company. A requested year that is not
    /// among the company's available years falls back to the latest
    /// available year; no request defaults to the latest year.
    pub async fn dashboard(
        &self,
        company_id: i64,
        requested_year: Option<i32>,
    ) -> Result<DashboardReport, AnalysisError> {
        let company = self.repo.find_company(company_id).await?;
        let available_years = self.repo.distinct_years(company_id).await?;

        // Companies without any computed ratio short-circuit to the
        // fixed empty payload; no engine runs.
        if available_years.is_empty() {
            tracing::info!(company_id, "no ratio years, returning empty dashboard");
            return Ok(DashboardReport::empty((&company).into()));
        }

        let latest = available_years[available_years.len() - 1];
        let selected_year = match requested_year {
            Some(year) if available_years.contains(&year) => year,
            _ => latest,
        };

        tracing::debug!(company_id, selected_year, "aggregating dashboard");

        // The three views are independent; running them concurrently
        // is purely a latency optimization.
        let (benchmark_entries, peer_entries, evolution) = tokio::join!(
            self.benchmark_engine.compare(company_id, selected_year),
            self.peer_engine.compare(company_id, selected_year),
            self.trend_engine.analyze_company(company_id),
        );
        let benchmark_entries = benchmark_entries?;
        let peer_entries = peer_entries?;
        let evolution = evolution?;

        Ok(DashboardReport {
            company: (&company).into(),
            selected_year: Some(selected_year),
            has_data: true,
            summary: build_summary(&benchmark_entries, &evolution),
            preview_benchmark: benchmark_preview(&benchmark_entries),
            preview_peer: peer_preview(&peer_entries),
            preview_trend: trend_preview(&available_years, &evolution),
            available_years,
        })
    }
}

fn entry_meets(entry: &BenchmarkComparison) -> bool {
    entry.benchmark.as_ref().is_some_and(|b| b.meets)
}

/// Met/total per category, in category order.
fn category_scores(entries: &[BenchmarkComparison]) -> BTreeMap<RatioCategory, CategoryScore> {
    let mut scores: BTreeMap<RatioCategory, CategoryScore> = BTreeMap::new();
    for entry in entries {
        let score = scores.entry(entry.category).or_insert(CategoryScore {
            category: entry.category,
            met: 0,
            total: 0,
            percent: 0.0,
        });
        score.total += 1;
        if entry_meets(entry) {
            score.met += 1;
        }
    }
    for score in scores.values_mut() {
        score.percent = round2(score.met as f64 / score.total as f64 * 100.0);
    }
    scores
}

fn build_summary(entries: &[BenchmarkComparison], evolution: &EvolutionReport) -> DashboardSummary {
    let scores = category_scores(entries);

    // Strict comparisons keep the first category on ties, which is
    // deterministic thanks to the ordered map.
    let mut best_category: Option<CategoryScore> = None;
    let mut opportunity_category: Option<CategoryScore> = None;
    for score in scores.values() {
        if best_category
            .as_ref()
            .map_or(true, |best| score.percent > best.percent)
        {
            best_category = Some(score.clone());
        }
        if opportunity_category
            .as_ref()
            .map_or(true, |worst| score.percent < worst.percent)
        {
            opportunity_category = Some(score.clone());
        }
    }

    let mut biggest_improvement: Option<ImprovementHighlight> = None;
    for (key, ratio) in &evolution.ratios {
        if ratio.trend.direction != TrendDirection::Up {
            continue;
        }
        let magnitude = ratio.trend.change.abs();
        if biggest_improvement
            .as_ref()
            .map_or(true, |best| magnitude > best.change_percent.abs())
        {
            biggest_improvement = Some(ImprovementHighlight {
                ratio_key: key.clone(),
                display_name: ratio.display_name.clone(),
                change_percent: ratio.trend.change,
            });
        }
    }

    DashboardSummary {
        total_ratios: entries.len(),
        best_category,
        opportunity_category,
        biggest_improvement,
    }
}

fn benchmark_preview(entries: &[BenchmarkComparison]) -> BenchmarkPreview {
    let total = entries.len();
    let met = entries.iter().filter(|e| entry_meets(e)).count();
    let percent = if total > 0 {
        round2(met as f64 / total as f64 * 100.0)
    } else {
        0.0
    };
    BenchmarkPreview {
        met,
        total,
        percent,
    }
}

/// Counts categories where more than half of the ratios sit above the
/// peer average.
fn peer_preview(entries: &[PeerComparison]) -> PeerPreview {
    let mut per_category: BTreeMap<RatioCategory, (usize, usize)> = BTreeMap::new();
    for entry in entries {
        let (above, total) = per_category.entry(entry.category).or_insert((0, 0));
        *total += 1;
        let position = entry.peer_average.as_ref().map(|p| p.relative_position);
        if matches!(
            position,
            Some(RelativePosition::Above) | Some(RelativePosition::FarAbove)
        ) {
            *above += 1;
        }
    }

    let total_categories = per_category.len();
    let strong_categories = per_category
        .values()
        .filter(|(above, total)| above * 2 > *total)
        .count();

    PeerPreview {
        strong_categories,
        total_categories,
    }
}

/// Majority vote of up vs down trends; flat on a tie or no votes.
fn trend_preview(available_years: &[i32], evolution: &EvolutionReport) -> TrendPreview {
    let mut up = 0usize;
    let mut down = 0usize;
    for ratio in evolution.ratios.values() {
        match ratio.trend.direction {
            TrendDirection::Up => up += 1,
            TrendDirection::Down => down += 1,
            _ => {}
        }
    }

    let overall_direction = if up > down {
        TrendDirection::Up
    } else if down > up {
        TrendDirection::Down
    } else {
        TrendDirection::Flat
    };

    TrendPreview {
        years_of_data: available_years.len(),
        overall_direction,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratio_store::{init_schema, SqliteRatioStore};
    use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

    async fn setup() -> (SqlitePool, DashboardOrchestrator) {
        // A single connection keeps every query on the same in-memory
        // database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("in-memory SQLite");
        init_schema(&pool).await.unwrap();

        sqlx::query("INSERT INTO sectors (id, name) VALUES (1, 'Retail')")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query(
            "INSERT INTO companies (id, name, sector_id) VALUES
             (1, 'Acme Retail', 1),
             (2, 'Budget Goods', 1)",
        )
        .execute(&pool)
        .await
        .unwrap();

        let repo = Arc::new(SqliteRatioStore::new(pool.clone()));
        let orchestrator = DashboardOrchestrator::new(repo);
        (pool, orchestrator)
    }

    async fn seed_ratio(pool: &SqlitePool, company: i64, year: i32, key: &str, value: &str) {
        sqlx::query(
            "INSERT INTO computed_ratios (company_id, fiscal_year, ratio_key, value)
             VALUES (?, ?, ?, ?)",
        )
        .bind(company)
        .bind(year)
        .bind(key)
        .bind(value)
        .execute(pool)
        .await
        .unwrap();
    }

    async fn seed_benchmark(pool: &SqlitePool, key: &str, value: &str) {
        sqlx::query(
            "INSERT INTO sector_benchmarks (sector_id, ratio_key, value, source)
             VALUES (1, ?, ?, 'survey')",
        )
        .bind(key)
        .bind(value)
        .execute(pool)
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn company_without_data_gets_the_empty_payload() {
        let (_pool, orchestrator) = setup().await;
        let report = orchestrator.dashboard(1, Some(2023)).await.unwrap();

        assert!(!report.has_data);
        assert!(report.available_years.is_empty());
        assert!(report.selected_year.is_none());
        assert_eq!(report.summary.total_ratios, 0);
        assert_eq!(report.preview_benchmark.total, 0);
        assert_eq!(report.preview_peer.total_categories, 0);
        assert_eq!(report.preview_trend.years_of_data, 0);
        assert_eq!(
            report.preview_trend.overall_direction,
            TrendDirection::Flat
        );
    }

    #[tokio::test]
    async fn unavailable_year_falls_back_to_latest() {
        let (pool, orchestrator) = setup().await;
        seed_ratio(&pool, 1, 2021, "roe", "10.0").await;
        seed_ratio(&pool, 1, 2023, "roe", "15.0").await;

        let report = orchestrator.dashboard(1, Some(2019)).await.unwrap();
        assert_eq!(report.selected_year, Some(2023));

        let report = orchestrator.dashboard(1, None).await.unwrap();
        assert_eq!(report.selected_year, Some(2023));

        let report = orchestrator.dashboard(1, Some(2021)).await.unwrap();
        assert_eq!(report.selected_year, Some(2021));
    }

    #[tokio::test]
    async fn summary_counts_and_previews() {
        let (pool, orchestrator) = setup().await;
        // Profitability: meets. Leverage: misses (lower is better).
        seed_ratio(&pool, 1, 2023, "roe", "15.0").await;
        seed_ratio(&pool, 1, 2023, "debt_ratio", "0.70").await;
        seed_benchmark(&pool, "roe", "12.0").await;
        seed_benchmark(&pool, "debt_ratio", "0.50").await;
        // Trend history for roe: up 50%.
        seed_ratio(&pool, 1, 2020, "roe", "10.0").await;
        // A second company so the peer average is valid.
        seed_ratio(&pool, 2, 2023, "roe", "11.0").await;
        seed_ratio(&pool, 2, 2023, "debt_ratio", "0.80").await;

        let report = orchestrator.dashboard(1, Some(2023)).await.unwrap();
        assert!(report.has_data);
        assert_eq!(report.summary.total_ratios, 2);

        let best = report.summary.best_category.as_ref().unwrap();
        assert_eq!(best.category, RatioCategory::Profitability);
        assert_eq!(best.percent, 100.0);

        let opportunity = report.summary.opportunity_category.as_ref().unwrap();
        assert_eq!(opportunity.category, RatioCategory::Leverage);
        assert_eq!(opportunity.percent, 0.0);

        let improvement = report.summary.biggest_improvement.as_ref().unwrap();
        assert_eq!(improvement.ratio_key, "roe");
        assert_eq!(improvement.change_percent, 50.0);

        assert_eq!(report.preview_benchmark.met, 1);
        assert_eq!(report.preview_benchmark.total, 2);
        assert_eq!(report.preview_benchmark.percent, 50.0);

        // roe 15 vs peer avg 13 is above (+15.38%); debt_ratio 0.70 vs
        // avg 0.75 is below. One strong category out of two.
        assert_eq!(report.preview_peer.total_categories, 2);
        assert_eq!(report.preview_peer.strong_categories, 1);

        assert_eq!(report.preview_trend.years_of_data, 2);
        assert_eq!(report.preview_trend.overall_direction, TrendDirection::Up);
    }

    #[tokio::test]
    async fn trend_tie_votes_flat() {
        let (pool, orchestrator) = setup().await;
        seed_ratio(&pool, 1, 2020, "roe", "10.0").await;
        seed_ratio(&pool, 1, 2023, "roe", "15.0").await;
        seed_ratio(&pool, 1, 2020, "roa", "8.0").await;
        seed_ratio(&pool, 1, 2023, "roa", "4.0").await;

        let report = orchestrator.dashboard(1, None).await.unwrap();
        assert_eq!(
            report.preview_trend.overall_direction,
            TrendDirection::Flat
        );
    }

    #[tokio::test]
    async fn unknown_company_is_an_error() {
        let (_pool, orchestrator) = setup().await;
        let err = orchestrator.dashboard(42, None).await.unwrap_err();
        assert!(matches!(err, AnalysisError::NotFound(_)));
    }
}
