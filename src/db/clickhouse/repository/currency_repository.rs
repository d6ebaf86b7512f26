// File: src/db/clickhouse/repository/currency_repository.rs
use crate::db::clickhouse::connection::ClickhouseConnection;
use crate::db::clickhouse::models::currency_rate::{
    DbCurrencyRate, DbRateSummary, DbRateTableStats, DbRateTrendPoint, DbRawExchangeRecord,
};
use async_trait::async_trait;
use clickhouse::error::Error as ClickhouseError;
use std::sync::Arc;
use tracing::{debug, error, info};

#[async_trait]
pub trait CurrencyRateRepository {
    /// Получает сырые записи выгрузки в детерминированном порядке загрузки
    async fn get_raw_records(&self) -> Result<Vec<DbRawExchangeRecord>, ClickhouseError>;

    /// Получает количество строк и high-water mark широкой таблицы курсов
    async fn get_table_stats(&self) -> Result<DbRateTableStats, ClickhouseError>;

    /// Вставляет материализованные строки курсов в БД
    async fn insert_rates(&self, rates: Vec<DbCurrencyRate>) -> Result<u64, ClickhouseError>;

    /// Сводка по каждой отслеживаемой валюте за скользящее окно
    async fn get_rate_summary(&self, window_days: i64) -> Result<Vec<DbRateSummary>, ClickhouseError>;

    /// Дневной тренд по каждой отслеживаемой валюте за окно
    async fn get_rate_trend(&self, window_days: i64) -> Result<Vec<DbRateTrendPoint>, ClickhouseError>;
}

pub struct ClickhouseCurrencyRateRepository {
    connection: Arc<ClickhouseConnection>,
    tracked_currencies: Vec<String>,
    insert_batch_size: usize,
}

impl ClickhouseCurrencyRateRepository {
    pub fn new(
        connection: Arc<ClickhouseConnection>,
        tracked_currencies: Vec<String>,
        insert_batch_size: usize,
    ) -> Self {
        Self {
            connection,
            tracked_currencies,
            insert_batch_size,
        }
    }

    /// Имена колонок курсов в порядке списка отслеживаемых валют
    fn rate_columns(&self) -> Vec<String> {
        self.tracked_currencies
            .iter()
            .map(|code| code.to_ascii_lowercase())
            .collect()
    }
}

#[async_trait]
impl CurrencyRateRepository for ClickhouseCurrencyRateRepository {
    async fn get_raw_records(&self) -> Result<Vec<DbRawExchangeRecord>, ClickhouseError> {
        let client = self.connection.get_client();

        // Порядок чтения фиксирован: от него зависит разрешение ничьих при дедупликации
        let query = "SELECT record
            FROM currency.exchange_rates_raw
            ORDER BY loaded_at ASC, record ASC";

        debug!("Fetching raw exchange records");

        let result = client.query(query).fetch_all::<DbRawExchangeRecord>().await?;

        info!("Fetched {} raw exchange records", result.len());

        Ok(result)
    }

    async fn get_table_stats(&self) -> Result<DbRateTableStats, ClickhouseError> {
        let client = self.connection.get_client();

        let query = "SELECT count() AS total_rows, toString(max(end_date)) AS max_end_date
            FROM currency.rates_daily FINAL";

        debug!("Fetching rates table stats");

        let stats = client.query(query).fetch_one::<DbRateTableStats>().await?;

        debug!(
            "Rates table stats: total_rows={}, max_end_date={}",
            stats.total_rows, stats.max_end_date
        );

        Ok(stats)
    }

    async fn insert_rates(&self, rates: Vec<DbCurrencyRate>) -> Result<u64, ClickhouseError> {
        if rates.is_empty() {
            debug!("No rates to insert");
            return Ok(0);
        }

        let client = self.connection.get_client();
        let columns = self.rate_columns();

        let total_count = rates.len();
        let mut successful_inserts = 0;

        info!("Starting batch insertion of {} rate rows", total_count);

        // Обработка по пакетам
        for batch_start in (0..rates.len()).step_by(self.insert_batch_size) {
            let batch_end = std::cmp::min(batch_start + self.insert_batch_size, rates.len());
            let batch = &rates[batch_start..batch_end];

            debug!(
                "Processing batch of {} rate rows, {}/{}",
                batch.len(),
                batch_start + batch.len(),
                total_count
            );

            // Формируем части VALUES для SQL запроса пакетной вставки
            let mut values_parts = Vec::with_capacity(batch.len());

            for rate in batch {
                // Строка несет все колонки валют целиком: частичное
                // обновление колонок по ключу невозможно по построению
                let rate_values: Vec<String> = rate
                    .rates
                    .iter()
                    .map(|value| format_rate_safe(*value))
                    .collect();

                values_parts.push(format!(
                    "('{}', toDate('{}'), {}, now())",
                    rate.base_currency,
                    rate.end_date,
                    rate_values.join(", ")
                ));
            }

            // Формируем полный SQL-запрос для пакетной вставки
            let sql = format!(
                "INSERT INTO currency.rates_daily
                (base_currency, end_date, {}, updated_at)
                VALUES {}",
                columns.join(", "),
                values_parts.join(",")
            );

            // Выполняем пакетную вставку
            match client.query(&sql).execute().await {
                Ok(_) => {
                    successful_inserts += batch.len() as u64;
                    debug!(
                        "Successfully inserted batch of {} rate rows ({}/{})",
                        batch.len(),
                        successful_inserts,
                        total_count
                    );
                }
                Err(e) => {
                    error!("Batch insertion failed: {}", e);
                    return Err(e);
                }
            }
        }

        info!(
            "Insertion complete. Successfully inserted {} rate rows",
            successful_inserts
        );

        Ok(successful_inserts)
    }

    async fn get_rate_summary(&self, window_days: i64) -> Result<Vec<DbRateSummary>, ClickhouseError> {
        let client = self.connection.get_client();

        // Одна ветка UNION ALL на отслеживаемую валюту
        let mut selects = Vec::with_capacity(self.tracked_currencies.len());

        for (code, column) in self.tracked_currencies.iter().zip(self.rate_columns()) {
            selects.push(format!(
                "SELECT base_currency,
                    '{code}' AS currency,
                    avg({column}) AS avg_rate,
                    min({column}) AS min_rate,
                    max({column}) AS max_rate,
                    argMax({column}, end_date) AS latest_rate
                FROM currency.rates_daily FINAL
                WHERE end_date >= today() - {window_days}
                GROUP BY base_currency"
            ));
        }

        let query = format!(
            "SELECT * FROM ({}) ORDER BY base_currency ASC, currency ASC",
            selects.join(" UNION ALL ")
        );

        debug!("Fetching rate summary for the last {} days", window_days);

        let result = client.query(&query).fetch_all::<DbRateSummary>().await?;

        info!("Fetched {} rate summary rows", result.len());

        Ok(result)
    }

    async fn get_rate_trend(&self, window_days: i64) -> Result<Vec<DbRateTrendPoint>, ClickhouseError> {
        let client = self.connection.get_client();

        let mut selects = Vec::with_capacity(self.tracked_currencies.len());

        for (code, column) in self.tracked_currencies.iter().zip(self.rate_columns()) {
            selects.push(format!(
                "SELECT base_currency,
                    toString(end_date) AS end_date,
                    '{code}' AS currency,
                    {column} AS rate
                FROM currency.rates_daily FINAL
                WHERE end_date >= today() - {window_days}"
            ));
        }

        let query = format!(
            "SELECT * FROM ({}) ORDER BY base_currency ASC, end_date ASC, currency ASC",
            selects.join(" UNION ALL ")
        );

        debug!("Fetching rate trend for the last {} days", window_days);

        let result = client.query(&query).fetch_all::<DbRateTrendPoint>().await?;

        info!("Fetched {} rate trend points", result.len());

        Ok(result)
    }
}

// Форматирует курс для вставки в SQL
// Отсутствующие значения, NaN и Infinity превращаются в NULL
fn format_rate_safe(value: Option<f64>) -> String {
    match value {
        Some(v) if v.is_nan() || v.is_infinite() => "NULL".to_string(),
        Some(v) => v.to_string(),
        None => "NULL".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_rate_safe() {
        assert_eq!(format_rate_safe(Some(0.91)), "0.91");
        assert_eq!(format_rate_safe(None), "NULL");
        assert_eq!(format_rate_safe(Some(f64::NAN)), "NULL");
        assert_eq!(format_rate_safe(Some(f64::INFINITY)), "NULL");
    }
}
