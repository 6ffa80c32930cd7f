//! Builds multi-year time series for each canonical ratio of a company,
//! with the constant sector benchmark and year-aligned peer averages,
//! and classifies the trend direction.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use ratio_core::{
    series_change_pct, trend_direction, AnalysisError, EvolutionReport, RatioCatalog,
    RatioEvolution, RatioRepository, RatioTrend, SeriesPoint,
};

pub struct TrendAnalysisEngine {
    repo: Arc<dyn RatioRepository>,
    catalog: RatioCatalog,
}

impl TrendAnalysisEngine {
    pub fn new(repo: Arc<dyn RatioRepository>, catalog: RatioCatalog) -> Self {
        Self { repo, catalog }
    }

    /// Evolution of every canonical ratio the company has data for.
    pub async fn analyze_company(&self, company_id: i64) -> Result<EvolutionReport, AnalysisError> {
        self.build_report(company_id, None).await
    }

    /// Evolution restricted to one ratio key. Unknown keys and keys the
    /// company has no data for produce an empty ratio map, not an error.
    pub async fn analyze_ratio(
        &self,
        company_id: i64,
        ratio_key: &str,
    ) -> Result<EvolutionReport, AnalysisError> {
        self.build_report(company_id, Some(ratio_key)).await
    }

    async fn build_report(
        &self,
        company_id: i64,
        only_key: Option<&str>,
    ) -> Result<EvolutionReport, AnalysisError> {
        let company = self.repo.find_company(company_id).await?;
        let available_years = self.repo.distinct_years(company_id).await?;
        let all_ratios = self.repo.computed_ratios_all_years(company_id).await?;
        let benchmarks: HashMap<String, f64> = self
            .repo
            .sector_benchmarks(company.sector_id)
            .await?
            .into_iter()
            .map(|b| (b.ratio_key, b.value))
            .collect();

        tracing::debug!(
            company_id,
            years = available_years.len(),
            points = all_ratios.len(),
            "building ratio evolution"
        );

        let mut ratios = BTreeMap::new();
        for key in self.catalog.keys() {
            if only_key.is_some_and(|only| only != key) {
                continue;
            }

            // Rows arrive ordered by key then year, so the filtered
            // series is already ascending.
            let series: Vec<SeriesPoint> = all_ratios
                .iter()
                .filter(|r| r.ratio_key == key)
                .map(|r| SeriesPoint {
                    year: r.fiscal_year,
                    value: r.value,
                })
                .collect();
            if series.is_empty() {
                continue;
            }

            // Year-aligned peer averages keep zero-valued entries in
            // the sample, unlike the peer comparison engine.
            let mut peer_yearly_average = BTreeMap::new();
            for point in &series {
                let stats = self
                    .repo
                    .peer_stats(company.sector_id, point.year, key, false)
                    .await?;
                peer_yearly_average.insert(point.year, stats.average);
            }

            let definition = self.catalog.definition(key);
            ratios.insert(
                key.to_string(),
                RatioEvolution {
                    display_name: definition
                        .map(|d| d.display_name.to_string())
                        .unwrap_or_else(|| key.to_string()),
                    formula: definition.map(|d| d.formula.to_string()).unwrap_or_default(),
                    category: self.catalog.category(key),
                    benchmark: benchmarks.get(key).copied(),
                    trend: compute_trend(&series),
                    series,
                    peer_yearly_average,
                },
            );
        }

        Ok(EvolutionReport {
            company: (&company).into(),
            available_years,
            ratios,
        })
    }
}

/// First-to-last change of an ascending series; fewer than two points
/// carry no direction.
fn compute_trend(series: &[SeriesPoint]) -> RatioTrend {
    if series.len() < 2 {
        return RatioTrend::no_data();
    }
    let first = series[0].value;
    let last = series[series.len() - 1].value;
    let change = series_change_pct(first, last);
    RatioTrend {
        direction: trend_direction(change),
        change,
        initial_value: Some(first),
        final_value: Some(last),
    }
}
