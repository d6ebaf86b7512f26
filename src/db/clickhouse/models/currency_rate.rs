// File: src/db/clickhouse/models/currency_rate.rs
use clickhouse::Row;
use serde::{Deserialize, Serialize};

/// Сырая запись из таблицы выгрузки внешнего ingest-задания.
/// Колонка record хранит JSON payload как текст; порядок чтения
/// фиксируется сортировкой по времени загрузки.
#[derive(Debug, Clone, Serialize, Deserialize, Row)]
pub struct DbRawExchangeRecord {
    pub record: String,
}

/// Агрегаты широкой таблицы курсов, нужные контроллеру материализации
#[derive(Debug, Clone, Serialize, Deserialize, Row)]
pub struct DbRateTableStats {
    pub total_rows: u64,
    pub max_end_date: String,
}

/// Строка широкой таблицы курсов, подготовленная к вставке.
/// Значения в rates выровнены по списку отслеживаемых валют.
#[derive(Debug, Clone)]
pub struct DbCurrencyRate {
    pub base_currency: String,
    pub end_date: String,
    pub rates: Vec<Option<f64>>,
}

/// Строка сводки по валюте за скользящее окно
#[derive(Debug, Clone, Serialize, Deserialize, Row)]
pub struct DbRateSummary {
    pub base_currency: String,
    pub currency: String,
    pub avg_rate: Option<f64>,
    pub min_rate: Option<f64>,
    pub max_rate: Option<f64>,
    pub latest_rate: Option<f64>,
}

/// Точка дневного тренда по валюте
#[derive(Debug, Clone, Serialize, Deserialize, Row)]
pub struct DbRateTrendPoint {
    pub base_currency: String,
    pub end_date: String,
    pub currency: String,
    pub rate: Option<f64>,
}
