use axum::{extract::Extension, http::StatusCode, Json};
use std::sync::Arc;
use tracing::error;

use crate::app_state::models::AppState;
use crate::db::clickhouse::models::currency_rate::{DbRateSummary, DbRateTrendPoint};

/// Сводка по отслеживаемым валютам за скользящее окно
pub async fn rates_summary(
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<Json<Vec<DbRateSummary>>, StatusCode> {
    let window_days = app_state.settings.app_config.marts.summary_window_days;

    match app_state
        .clickhouse_service
        .repository_currency_rate
        .get_rate_summary(window_days)
        .await
    {
        Ok(rows) => Ok(Json(rows)),
        Err(e) => {
            error!("Failed to fetch rate summary: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Дневной тренд курсов за ограниченное окно
pub async fn rates_trend(
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<Json<Vec<DbRateTrendPoint>>, StatusCode> {
    let window_days = app_state.settings.app_config.marts.trend_window_days;

    match app_state
        .clickhouse_service
        .repository_currency_rate
        .get_rate_trend(window_days)
        .await
    {
        Ok(rows) => Ok(Json(rows)),
        Err(e) => {
            error!("Failed to fetch rate trend: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}
