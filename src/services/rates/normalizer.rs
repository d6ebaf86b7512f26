// File: src/services/rates/normalizer.rs
use crate::db::clickhouse::models::currency_rate::DbRawExchangeRecord;
use crate::services::rates::payload::{parse_raw_record, CurrencyPayload};
use chrono::{DateTime, NaiveDate, Utc};
use tracing::debug;

/// Плоское наблюдение курса: одна валютная пара на одну дату
#[derive(Debug, Clone, PartialEq)]
pub struct ObservationRecord {
    pub base_currency: String,
    pub target_currency: String,
    pub end_date: NaiveDate,
    pub rate: f64,
    pub observed_at: Option<DateTime<Utc>>,
}

/// Счетчики отбракованных данных; структурный брак не фатален
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct NormalizeStats {
    /// Записи, из которых не удалось извлечь payload
    pub skipped_records: usize,
    /// Группы дат, отброшенные из-за нечитаемого ключа даты
    pub dropped_date_groups: usize,
    /// Отдельные значения курса, отброшенные как нечисловые
    pub dropped_rates: usize,
}

/// Разворачивает сырые записи в плоские наблюдения.
/// После этой стадии у каждого наблюдения есть полный ключ:
/// дедупликация неполных ключей не видит.
pub fn normalize_records(records: &[DbRawExchangeRecord]) -> (Vec<ObservationRecord>, NormalizeStats) {
    let mut observations = Vec::new();
    let mut stats = NormalizeStats::default();

    for record in records {
        match parse_raw_record(&record.record) {
            Some(payload) => flatten_payload(&payload, &mut observations, &mut stats),
            None => stats.skipped_records += 1,
        }
    }

    (observations, stats)
}

/// Разворачивает payload по датам и валютным парам
fn flatten_payload(
    payload: &CurrencyPayload,
    observations: &mut Vec<ObservationRecord>,
    stats: &mut NormalizeStats,
) {
    for (date_key, group) in &payload.quotes {
        // Нечитаемая дата отбрасывает группу целиком
        let end_date = match NaiveDate::parse_from_str(date_key, "%Y-%m-%d") {
            Ok(date) => date,
            Err(_) => {
                debug!("Dropping date group with malformed key '{}'", date_key);
                stats.dropped_date_groups += 1;
                continue;
            }
        };

        let pairs = match group.as_object() {
            Some(pairs) => pairs,
            None => {
                debug!("Dropping date group '{}', rates are not an object", date_key);
                stats.dropped_date_groups += 1;
                continue;
            }
        };

        for (pair_code, rate_value) in pairs {
            let rate = match rate_value.as_f64() {
                Some(rate) => rate,
                None => {
                    stats.dropped_rates += 1;
                    continue;
                }
            };

            observations.push(ObservationRecord {
                base_currency: payload.base_currency.clone(),
                target_currency: derive_target_currency(&payload.base_currency, pair_code),
                end_date,
                rate,
                observed_at: payload.observed_at,
            });
        }
    }
}

/// Выделяет целевую валюту из кода пары, отрезая префикс базовой.
/// Если префикс не совпал, остается полный код: так же разворачивается
/// и форма rates с голыми кодами валют.
fn derive_target_currency(base_currency: &str, pair_code: &str) -> String {
    let code = pair_code.trim().to_ascii_uppercase();

    if code.len() > base_currency.len() && code.starts_with(base_currency) {
        code[base_currency.len()..].to_string()
    } else {
        code
    }
}
