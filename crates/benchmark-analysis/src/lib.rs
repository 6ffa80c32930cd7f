//! Compares a company's ratios for one fiscal year against the curated
//! sector benchmark values.

use std::collections::HashMap;
use std::sync::Arc;

use ratio_core::{
    classify_deviation, diff_against, meets_reference, AnalysisError, BenchmarkComparison,
    BenchmarkSection, Deviation, RatioCatalog, RatioRepository, SectorBenchmark,
    NEUTRAL_BAND_PCT,
};

pub struct BenchmarkComparisonEngine {
    repo: Arc<dyn RatioRepository>,
    catalog: RatioCatalog,
}

impl BenchmarkComparisonEngine {
    pub fn new(repo: Arc<dyn RatioRepository>, catalog: RatioCatalog) -> Self {
        Self { repo, catalog }
    }

    /// One entry per computed ratio of the company/year. A missing
    /// sector benchmark leaves the benchmark section empty; it is not
    /// an error.
    pub async fn compare(
        &self,
        company_id: i64,
        year: i32,
    ) -> Result<Vec<BenchmarkComparison>, AnalysisError> {
        let company = self.repo.find_company(company_id).await?;
        let ratios = self.repo.computed_ratios(company_id, year).await?;
        let benchmarks: HashMap<String, SectorBenchmark> = self
            .repo
            .sector_benchmarks(company.sector_id)
            .await?
            .into_iter()
            .map(|b| (b.ratio_key.clone(), b))
            .collect();

        tracing::debug!(
            company_id,
            year,
            ratios = ratios.len(),
            benchmarks = benchmarks.len(),
            "running benchmark comparison"
        );

        let mut entries = Vec::with_capacity(ratios.len());
        for ratio in ratios {
            let definition = self.catalog.definition(&ratio.ratio_key);
            let lower_is_better = definition.map(|d| d.lower_is_better).unwrap_or(false);

            let benchmark = benchmarks.get(&ratio.ratio_key).map(|reference| {
                let diff = diff_against(ratio.value, reference.value);
                let deviation = Deviation::new(diff, lower_is_better);
                BenchmarkSection {
                    value: reference.value,
                    source: reference.source.clone(),
                    diff,
                    meets: meets_reference(ratio.value, reference.value, lower_is_better),
                    state: classify_deviation(&deviation),
                    interpretation: interpret(&deviation),
                }
            });

            entries.push(BenchmarkComparison {
                ratio_display_name: definition
                    .map(|d| d.display_name.to_string())
                    .unwrap_or_else(|| ratio.ratio_key.clone()),
                ratio_key: ratio.ratio_key.clone(),
                company_value: ratio.value,
                formula: definition.map(|d| d.formula.to_string()).unwrap_or_default(),
                category: self.catalog.category(&ratio.ratio_key),
                benchmark,
            });
        }

        Ok(entries)
    }
}

/// Wording mirrors the state decision table branch for branch.
fn interpret(deviation: &Deviation) -> String {
    if deviation.abs_pct < NEUTRAL_BAND_PCT {
        return "Practically equal to the sector benchmark.".to_string();
    }
    match (deviation.above, deviation.lower_is_better) {
        (true, false) => format!(
            "Exceeds the sector benchmark by {:.2}%, a favorable position.",
            deviation.abs_pct
        ),
        (false, true) => format!(
            "Sits {:.2}% below the sector benchmark; favorable, since lower values are preferable for this ratio.",
            deviation.abs_pct
        ),
        (false, false) => format!(
            "Falls {:.2}% short of the sector benchmark, an unfavorable position.",
            deviation.abs_pct
        ),
        (true, true) => format!(
            "Exceeds the sector benchmark by {:.2}%; unfavorable, since lower values are preferable for this ratio.",
            deviation.abs_pct
        ),
    }
}
