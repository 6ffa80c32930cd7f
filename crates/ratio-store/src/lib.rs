//! SQLite-backed implementation of the `RatioRepository` trait.
//!
//! Ratio and benchmark values are persisted as TEXT (decimal strings)
//! and coerced to `f64` on read; a value that does not parse is a
//! data-integrity error and surfaces as `InvalidData`.

use async_trait::async_trait;
use sqlx::sqlite::SqlitePool;

use ratio_core::{
    round4, AnalysisError, Company, ComputedRatio, PeerStats, RatioRepository, SectorBenchmark,
};

/// Create the tables the store reads from. Used by the server at
/// startup and by tests against `sqlite::memory:`.
pub async fn init_schema(pool: &SqlitePool) -> Result<(), AnalysisError> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS sectors (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL
        )",
    )
    .execute(pool)
    .await
    .map_err(db_err)?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS companies (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            sector_id INTEGER NOT NULL REFERENCES sectors(id)
        )",
    )
    .execute(pool)
    .await
    .map_err(db_err)?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS computed_ratios (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            company_id INTEGER NOT NULL REFERENCES companies(id),
            fiscal_year INTEGER NOT NULL,
            ratio_key TEXT NOT NULL,
            value TEXT NOT NULL,
            UNIQUE(company_id, fiscal_year, ratio_key)
        )",
    )
    .execute(pool)
    .await
    .map_err(db_err)?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS sector_benchmarks (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            sector_id INTEGER NOT NULL REFERENCES sectors(id),
            ratio_key TEXT NOT NULL,
            value TEXT NOT NULL,
            source TEXT,
            UNIQUE(sector_id, ratio_key)
        )",
    )
    .execute(pool)
    .await
    .map_err(db_err)?;

    Ok(())
}

fn db_err(e: sqlx::Error) -> AnalysisError {
    AnalysisError::DatabaseError(e.to_string())
}

/// Coerce a persisted decimal string to `f64`. Failure is fatal, never
/// defaulted.
fn parse_decimal(raw: &str, context: &str) -> Result<f64, AnalysisError> {
    raw.trim().parse::<f64>().map_err(|_| {
        AnalysisError::InvalidData(format!("unparseable decimal '{}' for {}", raw, context))
    })
}

pub struct SqliteRatioStore {
    pool: SqlitePool,
}

impl SqliteRatioStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl RatioRepository for SqliteRatioStore {
    async fn find_company(&self, company_id: i64) -> Result<Company, AnalysisError> {
        let row: Option<(i64, String, i64, String)> = sqlx::query_as(
            "SELECT c.id, c.name, c.sector_id, s.name
             FROM companies c
             JOIN sectors s ON s.id = c.sector_id
             WHERE c.id = ?",
        )
        .bind(company_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        match row {
            Some((id, name, sector_id, sector_name)) => Ok(Company {
                id,
                name,
                sector_id,
                sector_name,
            }),
            None => Err(AnalysisError::NotFound(format!("company {}", company_id))),
        }
    }

    async fn computed_ratios(
        &self,
        company_id: i64,
        year: i32,
    ) -> Result<Vec<ComputedRatio>, AnalysisError> {
        let rows: Vec<(i64, i32, String, String)> = sqlx::query_as(
            "SELECT company_id, fiscal_year, ratio_key, value
             FROM computed_ratios
             WHERE company_id = ? AND fiscal_year = ?
             ORDER BY ratio_key",
        )
        .bind(company_id)
        .bind(year)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.into_iter()
            .map(|(company_id, fiscal_year, ratio_key, value)| {
                let value = parse_decimal(
                    &value,
                    &format!("ratio {} of company {}", ratio_key, company_id),
                )?;
                Ok(ComputedRatio {
                    company_id,
                    fiscal_year,
                    ratio_key,
                    value,
                })
            })
            .collect()
    }

    async fn computed_ratios_all_years(
        &self,
        company_id: i64,
    ) -> Result<Vec<ComputedRatio>, AnalysisError> {
        let rows: Vec<(i64, i32, String, String)> = sqlx::query_as(
            "SELECT company_id, fiscal_year, ratio_key, value
             FROM computed_ratios
             WHERE company_id = ?
             ORDER BY ratio_key, fiscal_year",
        )
        .bind(company_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.into_iter()
            .map(|(company_id, fiscal_year, ratio_key, value)| {
                let value = parse_decimal(
                    &value,
                    &format!("ratio {} of company {}", ratio_key, company_id),
                )?;
                Ok(ComputedRatio {
                    company_id,
                    fiscal_year,
                    ratio_key,
                    value,
                })
            })
            .collect()
    }

    async fn sector_benchmarks(
        &self,
        sector_id: i64,
    ) -> Result<Vec<SectorBenchmark>, AnalysisError> {
        let rows: Vec<(i64, String, String, Option<String>)> = sqlx::query_as(
            "SELECT sector_id, ratio_key, value, source
             FROM sector_benchmarks
             WHERE sector_id = ?
             ORDER BY ratio_key",
        )
        .bind(sector_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.into_iter()
            .map(|(sector_id, ratio_key, value, source)| {
                let value = parse_decimal(
                    &value,
                    &format!("benchmark {} of sector {}", ratio_key, sector_id),
                )?;
                Ok(SectorBenchmark {
                    sector_id,
                    ratio_key,
                    value,
                    source,
                })
            })
            .collect()
    }

    async fn peer_stats(
        &self,
        sector_id: i64,
        year: i32,
        ratio_key: &str,
        exclude_zero: bool,
    ) -> Result<PeerStats, AnalysisError> {
        // One row per company thanks to the (company, year, key)
        // uniqueness constraint.
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT cr.value
             FROM computed_ratios cr
             JOIN companies c ON c.id = cr.company_id
             WHERE c.sector_id = ? AND cr.fiscal_year = ? AND cr.ratio_key = ?
             ORDER BY cr.company_id",
        )
        .bind(sector_id)
        .bind(year)
        .bind(ratio_key)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        let mut values = Vec::with_capacity(rows.len());
        for (raw,) in rows {
            let value = parse_decimal(
                &raw,
                &format!("ratio {} of sector {} in {}", ratio_key, sector_id, year),
            )?;
            if exclude_zero && value == 0.0 {
                continue;
            }
            values.push(value);
        }

        if values.is_empty() {
            return Ok(PeerStats {
                average: 0.0,
                count: 0,
                min: 0.0,
                max: 0.0,
            });
        }

        let count = values.len() as i64;
        let sum: f64 = values.iter().sum();
        let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);

        tracing::debug!(
            sector_id,
            year,
            ratio_key,
            count,
            "computed peer statistics"
        );

        Ok(PeerStats {
            average: round4(sum / count as f64),
            count,
            min: round4(min),
            max: round4(max),
        })
    }

    async fn distinct_years(&self, company_id: i64) -> Result<Vec<i32>, AnalysisError> {
        let rows: Vec<(i32,)> = sqlx::query_as(
            "SELECT DISTINCT fiscal_year
             FROM computed_ratios
             WHERE company_id = ?
             ORDER BY fiscal_year ASC",
        )
        .bind(company_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(rows.into_iter().map(|(year,)| year).collect())
    }
}
