// File: src/services/rates/pivot.rs
use crate::services::rates::normalizer::ObservationRecord;
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Широкая строка курсов: одна на пару (базовая валюта, дата).
/// Каждая отслеживаемая валюта присутствует ключом, отсутствующее
/// наблюдение - None, а не пропущенный ключ.
#[derive(Debug, Clone, PartialEq)]
pub struct PivotedRow {
    pub base_currency: String,
    pub end_date: NaiveDate,
    pub rates: BTreeMap<String, Option<f64>>,
}

/// Схлопывает дубликаты наблюдений по ключу (база, дата, валюта).
/// Выживает наблюдение с наибольшей меткой публикации; отсутствующая
/// метка проигрывает любой разобранной; при равенстве остается
/// первое по порядку загрузки.
/// Работает по полностью собранному набору кандидатов.
pub fn dedupe_observations(observations: Vec<ObservationRecord>) -> Vec<ObservationRecord> {
    let mut survivors: BTreeMap<(String, NaiveDate, String), ObservationRecord> = BTreeMap::new();

    for observation in observations {
        let key = (
            observation.base_currency.clone(),
            observation.end_date,
            observation.target_currency.clone(),
        );

        match survivors.get(&key) {
            // None < Some(_), позднее наблюдение строго новее
            Some(current) if observation.observed_at <= current.observed_at => {}
            _ => {
                survivors.insert(key, observation);
            }
        }
    }

    survivors.into_values().collect()
}

/// Переводит дедуплицированные наблюдения в широкие строки.
/// Группировка по (база, дата), по одному агрегату max на каждую
/// отслеживаемую валюту; прочие валюты игнорируются.
pub fn pivot_rates(
    deduplicated: Vec<ObservationRecord>,
    tracked_currencies: &[String],
) -> Vec<PivotedRow> {
    let mut groups: BTreeMap<(String, NaiveDate), BTreeMap<String, f64>> = BTreeMap::new();

    for observation in deduplicated {
        if !tracked_currencies.contains(&observation.target_currency) {
            continue;
        }

        groups
            .entry((observation.base_currency.clone(), observation.end_date))
            .or_default()
            .entry(observation.target_currency.clone())
            .and_modify(|rate| *rate = rate.max(observation.rate))
            .or_insert(observation.rate);
    }

    groups
        .into_iter()
        .map(|((base_currency, end_date), rates)| PivotedRow {
            base_currency,
            end_date,
            rates: tracked_currencies
                .iter()
                .map(|code| (code.clone(), rates.get(code).copied()))
                .collect(),
        })
        .collect()
}
