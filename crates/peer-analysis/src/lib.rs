//! Compares a company's ratios for one fiscal year against statistics
//! computed live across its sector peers.
//!
//! Exact-zero peer values are excluded from the sample here; the trend
//! engine's year-aligned peer averages keep them. Both behaviors are
//! asserted by tests and must not be harmonized.

use std::sync::Arc;

use ratio_core::{
    diff_against, relative_position, AnalysisError, Deviation, PeerAverageSection,
    PeerComparison, PeerStats, RatioCatalog, RatioRepository, EPSILON, NEUTRAL_BAND_PCT,
};

/// Minimum number of contributing peers for the average to count.
const MIN_PEER_SAMPLE: i64 = 2;

pub struct PeerComparisonEngine {
    repo: Arc<dyn RatioRepository>,
    catalog: RatioCatalog,
}

impl PeerComparisonEngine {
    pub fn new(repo: Arc<dyn RatioRepository>, catalog: RatioCatalog) -> Self {
        Self { repo, catalog }
    }

    /// One entry per computed ratio of the company/year. When the peer
    /// sample is too small or entirely zero the entry carries no peer
    /// section and is flagged `no_reference`.
    pub async fn compare(
        &self,
        company_id: i64,
        year: i32,
    ) -> Result<Vec<PeerComparison>, AnalysisError> {
        let company = self.repo.find_company(company_id).await?;
        let ratios = self.repo.computed_ratios(company_id, year).await?;

        tracing::debug!(
            company_id,
            year,
            ratios = ratios.len(),
            "running peer comparison"
        );

        let mut entries = Vec::with_capacity(ratios.len());
        for ratio in ratios {
            let stats = self
                .repo
                .peer_stats(company.sector_id, year, &ratio.ratio_key, true)
                .await?;

            let definition = self.catalog.definition(&ratio.ratio_key);
            let lower_is_better = definition.map(|d| d.lower_is_better).unwrap_or(false);

            let peer_average = if is_valid_average(&stats) {
                let diff = diff_against(ratio.value, stats.average);
                let deviation = Deviation::new(diff, lower_is_better);
                Some(PeerAverageSection {
                    value: stats.average,
                    peer_count: stats.count,
                    min: stats.min,
                    max: stats.max,
                    diff,
                    relative_position: relative_position(ratio.value, stats.average, diff.percent),
                    interpretation: interpret(&deviation),
                })
            } else {
                None
            };

            let no_reference = peer_average.is_none();
            entries.push(PeerComparison {
                ratio_display_name: definition
                    .map(|d| d.display_name.to_string())
                    .unwrap_or_else(|| ratio.ratio_key.clone()),
                ratio_key: ratio.ratio_key.clone(),
                company_value: ratio.value,
                formula: definition.map(|d| d.formula.to_string()).unwrap_or_default(),
                category: self.catalog.category(&ratio.ratio_key),
                peer_average,
                no_reference,
            });
        }

        Ok(entries)
    }
}

/// A peer average is meaningful with at least two contributors and a
/// sample that is not entirely zero.
fn is_valid_average(stats: &PeerStats) -> bool {
    if stats.count < MIN_PEER_SAMPLE {
        return false;
    }
    let all_zero =
        stats.average.abs() < EPSILON && stats.min.abs() < EPSILON && stats.max.abs() < EPSILON;
    !all_zero
}

/// Wording mirrors the state decision table branch for branch.
fn interpret(deviation: &Deviation) -> String {
    if deviation.abs_pct < NEUTRAL_BAND_PCT {
        return "Similar to the sector average.".to_string();
    }
    match (deviation.above, deviation.lower_is_better) {
        (true, false) => format!(
            "Stands {:.2}% above the sector average, a favorable position.",
            deviation.abs_pct
        ),
        (false, true) => format!(
            "Stands {:.2}% below the sector average; favorable, since lower values are preferable for this ratio.",
            deviation.abs_pct
        ),
        (false, false) => format!(
            "Stands {:.2}% below the sector average and needs improvement.",
            deviation.abs_pct
        ),
        (true, true) => format!(
            "Stands {:.2}% above the sector average and needs improvement, since lower values are preferable for this ratio.",
            deviation.abs_pct
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratio_core::RelativePosition;
    use ratio_store::{init_schema, SqliteRatioStore};
    use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

    async fn setup() -> (SqlitePool, PeerComparisonEngine) {
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
             (2, 'Budget Goods', 1),
             (3, 'Corner Shops', 1)",
        )
        .execute(&pool)
        .await
        .unwrap();

        let repo = Arc::new(SqliteRatioStore::new(pool.clone()));
        let engine = PeerComparisonEngine::new(repo, RatioCatalog::new());
        (pool, engine)
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

    #[tokio::test]
    async fn empty_year_yields_empty_list() {
        let (_pool, engine) = setup().await;
        let entries = engine.compare(1, 2023).await.unwrap();
        assert!(entries.is_empty());
    }

    #[tokio::test]
    async fn far_below_the_sector_average() {
        let (pool, engine) = setup().await;
        // Peer sample includes the company itself: [10, 15, 20].
        seed_ratio(&pool, 1, 2023, "roe", "10.0").await;
        seed_ratio(&pool, 2, 2023, "roe", "15.0").await;
        seed_ratio(&pool, 3, 2023, "roe", "20.0").await;

        let entries = engine.compare(1, 2023).await.unwrap();
        assert_eq!(entries.len(), 1);
        let section = entries[0].peer_average.as_ref().unwrap();
        assert_eq!(section.value, 15.0);
        assert_eq!(section.peer_count, 3);
        assert_eq!(section.min, 10.0);
        assert_eq!(section.max, 20.0);
        assert_eq!(section.diff.percent, -33.33);
        assert_eq!(section.relative_position, RelativePosition::FarBelow);
        assert!(!entries[0].no_reference);
    }

    #[tokio::test]
    async fn zero_valued_peers_are_excluded() {
        let (pool, engine) = setup().await;
        seed_ratio(&pool, 1, 2023, "roe", "10.0").await;
        seed_ratio(&pool, 2, 2023, "roe", "20.0").await;
        seed_ratio(&pool, 3, 2023, "roe", "0.0").await;

        let entries = engine.compare(1, 2023).await.unwrap();
        let section = entries[0].peer_average.as_ref().unwrap();
        // Average over [10, 20], the zero entry dropped.
        assert_eq!(section.value, 15.0);
        assert_eq!(section.peer_count, 2);
    }

    #[tokio::test]
    async fn single_peer_is_no_reference() {
        let (pool, engine) = setup().await;
        seed_ratio(&pool, 1, 2023, "roe", "10.0").await;

        let entries = engine.compare(1, 2023).await.unwrap();
        assert!(entries[0].peer_average.is_none());
        assert!(entries[0].no_reference);
    }

    #[tokio::test]
    async fn value_near_average_reads_as_similar() {
        let (pool, engine) = setup().await;
        seed_ratio(&pool, 1, 2023, "roe", "15.1").await;
        seed_ratio(&pool, 2, 2023, "roe", "15.0").await;
        seed_ratio(&pool, 3, 2023, "roe", "15.2").await;

        let entries = engine.compare(1, 2023).await.unwrap();
        let section = entries[0].peer_average.as_ref().unwrap();
        assert_eq!(section.relative_position, RelativePosition::AtAverage);
        assert!(section.interpretation.contains("Similar to the sector average"));
    }

    #[tokio::test]
    async fn lower_is_better_above_average_needs_improvement() {
        let (pool, engine) = setup().await;
        seed_ratio(&pool, 1, 2023, "debt_ratio", "0.9").await;
        seed_ratio(&pool, 2, 2023, "debt_ratio", "0.5").await;
        seed_ratio(&pool, 3, 2023, "debt_ratio", "0.4").await;

        let entries = engine.compare(1, 2023).await.unwrap();
        let section = entries[0].peer_average.as_ref().unwrap();
        assert_eq!(section.relative_position, RelativePosition::FarAbove);
        assert!(section.interpretation.contains("needs improvement"));
    }

    #[tokio::test]
    async fn validity_check_rejects_all_zero_sample() {
        let (pool, engine) = setup().await;
        // exclude_zero drops both peers, leaving an empty sample.
        seed_ratio(&pool, 1, 2023, "roe", "0.0").await;
        seed_ratio(&pool, 2, 2023, "roe", "0.0").await;
        seed_ratio(&pool, 3, 2023, "roe", "0.0").await;

        let entries = engine.compare(1, 2023).await.unwrap();
        assert!(entries[0].no_reference);
    }
}
