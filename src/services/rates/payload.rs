// File: src/services/rates/payload.rs
use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::{Map, Value};
use tracing::debug;

/// Канонический payload выгрузки после разбора сырой записи.
/// Внешний ключ quotes - дата, внутренний - код валютной пары.
#[derive(Debug, Clone)]
pub struct CurrencyPayload {
    pub base_currency: String,
    pub observed_at: Option<DateTime<Utc>>,
    pub privacy: Option<Value>,
    pub quotes: Map<String, Value>,
}

/// Извлекает канонический payload из текста сырой записи.
/// Запись может быть JSON объектом или JSON строкой, внутри которой
/// лежит тот же объект (двойное кодирование), обе формы равнозначны.
/// Непригодные записи пропускаются без ошибки.
pub fn parse_raw_record(record: &str) -> Option<CurrencyPayload> {
    let mut value: Value = match serde_json::from_str(record) {
        Ok(value) => value,
        Err(e) => {
            debug!("Skipping raw record, invalid JSON: {}", e);
            return None;
        }
    };

    // Вторичный разбор для строковой формы
    if let Value::String(inner) = value {
        value = match serde_json::from_str(&inner) {
            Ok(value) => value,
            Err(e) => {
                debug!("Skipping raw record, inner JSON is invalid: {}", e);
                return None;
            }
        };
    }

    let object = match value {
        Value::Object(object) => object,
        other => {
            debug!("Skipping raw record, payload is not an object: {}", other);
            return None;
        }
    };

    // Исходная выгрузка может нести вложенную карту под quotes или rates,
    // quotes предпочтительнее
    let quotes = ["quotes", "rates"]
        .iter()
        .find_map(|key| {
            object
                .get(*key)
                .and_then(Value::as_object)
                .filter(|map| !map.is_empty())
        })?
        .clone();

    let base_currency = match object.get("source").and_then(Value::as_str) {
        Some(source) if !source.is_empty() && source.chars().all(|c| c.is_ascii_alphabetic()) => {
            source.to_ascii_uppercase()
        }
        _ => {
            debug!("Skipping raw record, missing or malformed base currency hint");
            return None;
        }
    };

    Some(CurrencyPayload {
        base_currency,
        observed_at: parse_observed_at(object.get("timestamp")),
        privacy: object.get("privacy").cloned(),
        quotes,
    })
}

/// Разбирает метку времени публикации: unix секунды либо строка.
/// Неразборчивое значение трактуется как отсутствующее.
fn parse_observed_at(value: Option<&Value>) -> Option<DateTime<Utc>> {
    match value? {
        Value::Number(number) => {
            let seconds = number.as_i64().or_else(|| number.as_f64().map(|f| f as i64))?;
            DateTime::from_timestamp(seconds, 0)
        }
        Value::String(text) => DateTime::parse_from_rfc3339(text)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
            .or_else(|| {
                NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S")
                    .map(|dt| dt.and_utc())
                    .ok()
            }),
        _ => None,
    }
}
