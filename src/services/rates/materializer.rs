// File: src/services/rates/materializer.rs
use crate::app_state::models::AppState;
use crate::db::clickhouse::models::currency_rate::DbCurrencyRate;
use crate::services::rates::normalizer::normalize_records;
use crate::services::rates::pivot::{dedupe_observations, pivot_rates, PivotedRow};
use chrono::{Duration, NaiveDate};
use std::sync::Arc;
use tracing::{debug, info};

pub struct RatesMaterializer {
    app_state: Arc<AppState>,
}

impl RatesMaterializer {
    pub fn new(app_state: Arc<AppState>) -> Self {
        Self { app_state }
    }

    /// Пересчитывает хвост широкой таблицы курсов и вставляет результат.
    /// Возвращает количество записанных строк.
    pub async fn run(&self) -> Result<usize, Box<dyn std::error::Error>> {
        let repo = &self.app_state.clickhouse_service.repository_currency_rate;
        let pipeline_config = &self.app_state.settings.app_config.pipeline;

        // High-water mark берется из самой таблицы
        let table_stats = repo.get_table_stats().await?;
        let high_water_mark = if table_stats.total_rows == 0 {
            None
        } else {
            NaiveDate::parse_from_str(&table_stats.max_end_date, "%Y-%m-%d").ok()
        };

        let floor = recompute_floor(high_water_mark, pipeline_config.lookback_days);

        info!(
            "Materializing rates from {} (high-water mark: {:?}, lookback {} days)",
            floor, high_water_mark, pipeline_config.lookback_days
        );

        let raw_records = repo.get_raw_records().await?;

        if raw_records.is_empty() {
            info!("No raw records found, nothing to materialize");
            return Ok(0);
        }

        let (observations, stats) = normalize_records(&raw_records);

        debug!(
            "Normalized {} observations from {} raw records",
            observations.len(),
            raw_records.len()
        );

        // Окно пересчета отбирается до дедупликации: ключ наблюдения
        // включает дату, полнота групп кандидатов сохраняется
        let in_scope: Vec<_> = observations
            .into_iter()
            .filter(|observation| observation.end_date >= floor)
            .collect();

        let deduplicated = dedupe_observations(in_scope);
        let pivoted = pivot_rates(deduplicated, &pipeline_config.tracked_currencies);

        if pivoted.is_empty() {
            info!(
                "No pivoted rows in recompute window (skipped_records={}, dropped_date_groups={}, dropped_rates={})",
                stats.skipped_records, stats.dropped_date_groups, stats.dropped_rates
            );
            return Ok(0);
        }

        let rows: Vec<DbCurrencyRate> = pivoted
            .iter()
            .map(|row| to_db_rate(row, &pipeline_config.tracked_currencies))
            .collect();

        let inserted = repo.insert_rates(rows).await?;

        info!(
            "Materialization complete: {} rows written (skipped_records={}, dropped_date_groups={}, dropped_rates={})",
            inserted, stats.skipped_records, stats.dropped_date_groups, stats.dropped_rates
        );

        Ok(inserted as usize)
    }
}

/// Нижняя граница окна пересчета: high-water mark минус lookback.
/// Для пустой таблицы - дата-страж в далеком прошлом, полный бэкфилл.
pub fn recompute_floor(high_water_mark: Option<NaiveDate>, lookback_days: u32) -> NaiveDate {
    match high_water_mark {
        Some(mark) => mark - Duration::days(lookback_days as i64),
        // 1970-01-01
        None => NaiveDate::default(),
    }
}

/// Переводит широкую строку в форму вставки: значения выровнены
/// по списку отслеживаемых валют, строка несет все колонки сразу
fn to_db_rate(row: &PivotedRow, tracked_currencies: &[String]) -> DbCurrencyRate {
    DbCurrencyRate {
        base_currency: row.base_currency.clone(),
        end_date: row.end_date.format("%Y-%m-%d").to_string(),
        rates: tracked_currencies
            .iter()
            .map(|code| row.rates.get(code).copied().flatten())
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::clickhouse::models::currency_rate::DbRawExchangeRecord;
    use std::collections::BTreeMap;

    #[test]
    fn test_pipeline_from_raw_record_to_pivoted_row() {
        let tracked = vec!["EUR".to_string(), "GBP".to_string(), "INR".to_string()];
        let records = vec![DbRawExchangeRecord {
            record: r#"{"source":"USD","quotes":{"2024-01-01":{"USDEUR":0.91,"USDGBP":0.79}}}"#
                .to_string(),
        }];

        let (observations, stats) = normalize_records(&records);
        let rows = pivot_rates(dedupe_observations(observations), &tracked);

        assert_eq!(stats.skipped_records, 0);
        assert_eq!(rows.len(), 1);

        let row = &rows[0];
        assert_eq!(row.base_currency, "USD");
        assert_eq!(row.end_date, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(row.rates.get("EUR"), Some(&Some(0.91)));
        assert_eq!(row.rates.get("GBP"), Some(&Some(0.79)));
        assert_eq!(row.rates.get("INR"), Some(&None));
    }

    #[test]
    fn test_recompute_floor_with_existing_mark() {
        let mark = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();

        assert_eq!(
            recompute_floor(Some(mark), 1),
            NaiveDate::from_ymd_opt(2024, 3, 9).unwrap()
        );
        assert_eq!(
            recompute_floor(Some(mark), 30),
            NaiveDate::from_ymd_opt(2024, 2, 9).unwrap()
        );
        assert_eq!(recompute_floor(Some(mark), 0), mark);
    }

    #[test]
    fn test_recompute_floor_empty_table_means_full_backfill() {
        assert_eq!(
            recompute_floor(None, 1),
            NaiveDate::from_ymd_opt(1970, 1, 1).unwrap()
        );
    }

    #[test]
    fn test_to_db_rate_aligns_columns_with_tracked_list() {
        let tracked = vec!["EUR".to_string(), "GBP".to_string(), "INR".to_string()];
        let mut rates = BTreeMap::new();
        rates.insert("EUR".to_string(), Some(0.91));
        rates.insert("GBP".to_string(), Some(0.79));
        rates.insert("INR".to_string(), None);

        let row = PivotedRow {
            base_currency: "USD".to_string(),
            end_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            rates,
        };

        let db_rate = to_db_rate(&row, &tracked);

        assert_eq!(db_rate.base_currency, "USD");
        assert_eq!(db_rate.end_date, "2024-01-01");
        assert_eq!(db_rate.rates, vec![Some(0.91), Some(0.79), None]);
    }
}
