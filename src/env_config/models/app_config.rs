use super::app_env::Env;
use chrono::NaiveTime;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;

#[derive(Debug, Deserialize)]
pub struct AppConfig {
    pub log: LogConfig,
    pub clickhouse: ClickhouseConfig,
    pub postgres: PostgresConfig,
    pub pipeline: PipelineConfig,
    pub rates_updater: RatesUpdaterConfig,
    pub ingest_job: IngestJobConfig,
    pub notification: NotificationConfig,
    pub marts: MartsConfig,
}

#[derive(Debug, Deserialize)]
pub struct LogConfig {
    pub level: String,
    pub format: String,
}

#[derive(Debug, Deserialize)]
pub struct ClickhouseConfig {
    pub timeout: u64,
    pub pool_min: u32,
    pub pool_max: u32,
}

#[derive(Debug, Deserialize)]
pub struct PostgresConfig {
    pub timeout: u64,
    pub max_connections: u32,
    pub min_connections: u32,
    pub max_lifetime: u64,
    pub idle_timeout: u64,
}

/// Настройки пайплайна нормализации и материализации курсов
#[derive(Debug, Deserialize)]
pub struct PipelineConfig {
    /// Сколько дней до high-water mark пересчитывать при каждом запуске
    #[serde(default = "default_lookback_days")]
    pub lookback_days: u32,
    /// Отслеживаемые валюты (колонки широкой таблицы)
    #[serde(default = "default_tracked_currencies")]
    pub tracked_currencies: Vec<String>,
    #[serde(default = "default_insert_batch_size")]
    pub insert_batch_size: usize,
}

#[derive(Debug, Deserialize)]
pub struct RatesUpdaterConfig {
    pub enabled: bool,
    pub interval_seconds: u64,
    #[serde(default)]
    pub start_time: Option<String>, // Время начала в UTC, формат: "HH:MM:SS"
    #[serde(default)]
    pub end_time: Option<String>, // Время окончания в UTC, формат: "HH:MM:SS"
}

/// Настройки внешнего ingest-задания и его опроса
#[derive(Debug, Deserialize)]
pub struct IngestJobConfig {
    pub job_name: String,
    pub script_location: String,
    #[serde(default)]
    pub arguments: BTreeMap<String, String>,
    #[serde(default = "default_poll_interval_seconds")]
    pub poll_interval_seconds: u64,
    #[serde(default = "default_max_poll_attempts")]
    pub max_poll_attempts: u32,
    /// Произвольные данные, которые передаются в уведомление как есть
    #[serde(default)]
    pub metadata: serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub struct NotificationConfig {
    pub channel: String,
    pub project: String,
}

#[derive(Debug, Deserialize)]
pub struct MartsConfig {
    #[serde(default = "default_trend_window_days")]
    pub trend_window_days: i64,
    #[serde(default = "default_summary_window_days")]
    pub summary_window_days: i64,
}

impl AppConfig {
    /// Загружает конфигурацию из TOML файла для указанного окружения
    pub fn new(env: &Env) -> Self {
        let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| format!("config/{}.toml", env));

        let content = fs::read_to_string(&path)
            .unwrap_or_else(|e| panic!("Failed to read config file {}: {}", path, e));

        let config: AppConfig = toml::from_str(&content)
            .unwrap_or_else(|e| panic!("Failed to parse config file {}: {}", path, e));

        config.pipeline.validate();

        config
    }
}

impl PipelineConfig {
    /// Проверяет список отслеживаемых валют: коды попадают в имена колонок
    pub fn validate(&self) {
        if self.tracked_currencies.is_empty() {
            panic!("pipeline.tracked_currencies must not be empty");
        }

        for code in &self.tracked_currencies {
            if code.len() != 3 || !code.chars().all(|c| c.is_ascii_uppercase()) {
                panic!(
                    "pipeline.tracked_currencies: '{}' is not a 3-letter uppercase currency code",
                    code
                );
            }
        }
    }
}

impl RatesUpdaterConfig {
    /// Checks if the current time is within the allowed operation window
    pub fn is_operation_allowed(&self) -> bool {
        // If no time window is configured, always allow operation
        if self.start_time.is_none() || self.end_time.is_none() {
            return true;
        }

        // Get current UTC time
        let now = chrono::Utc::now().time();

        // Parse start and end times
        if let (Some(start_str), Some(end_str)) = (&self.start_time, &self.end_time) {
            if let (Ok(start), Ok(end)) = (
                NaiveTime::parse_from_str(start_str, "%H:%M:%S"),
                NaiveTime::parse_from_str(end_str, "%H:%M:%S"),
            ) {
                // Check if current time is within the operation window
                if start <= end {
                    // Simple case: start time is before end time
                    return start <= now && now <= end;
                } else {
                    // Case where operation window crosses midnight
                    // e.g., start=21:00:00, end=04:00:00
                    return start <= now || now <= end;
                }
            }
        }

        // If parsing fails, default to allowing operation
        true
    }
}

fn default_lookback_days() -> u32 {
    1
}

fn default_tracked_currencies() -> Vec<String> {
    vec!["EUR".to_string(), "GBP".to_string(), "INR".to_string()]
}

fn default_insert_batch_size() -> usize {
    1000
}

fn default_poll_interval_seconds() -> u64 {
    20
}

fn default_max_poll_attempts() -> u32 {
    150
}

fn default_trend_window_days() -> i64 {
    90
}

fn default_summary_window_days() -> i64 {
    365
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracked_currencies_validation() {
        let config = PipelineConfig {
            lookback_days: 1,
            tracked_currencies: vec!["EUR".to_string(), "GBP".to_string()],
            insert_batch_size: 1000,
        };
        config.validate();
    }

    #[test]
    #[should_panic]
    fn test_tracked_currencies_rejects_lowercase() {
        let config = PipelineConfig {
            lookback_days: 1,
            tracked_currencies: vec!["eur".to_string()],
            insert_batch_size: 1000,
        };
        config.validate();
    }

    #[test]
    #[should_panic]
    fn test_tracked_currencies_rejects_empty() {
        let config = PipelineConfig {
            lookback_days: 1,
            tracked_currencies: Vec::new(),
            insert_batch_size: 1000,
        };
        config.validate();
    }

    #[test]
    fn test_ingest_job_defaults() {
        let config: IngestJobConfig = toml::from_str(
            "job_name = \"currency-raw-ingest\"\nscript_location = \"jobs/currency_raw_ingest.py\"",
        )
        .unwrap();

        assert_eq!(config.poll_interval_seconds, 20);
        assert_eq!(config.max_poll_attempts, 150);
        assert!(config.arguments.is_empty());
        assert!(config.metadata.is_null());
    }
}
