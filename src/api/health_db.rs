use axum::{extract::Extension, http::StatusCode};
use std::sync::Arc;
use tracing::error;

use crate::app_state::models::AppState;

/// Проверка доступности обоих хранилищ сервиса
pub async fn health_db(
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<StatusCode, StatusCode> {
    // ClickHouse держит сырую выгрузку и широкую таблицу курсов
    let client = app_state.clickhouse_service.connection.get_client();
    let clickhouse_ok = match client.query("SELECT 1").execute().await {
        Ok(_) => true,
        Err(e) => {
            error!("ClickHouse health check failed: {}", e);
            false
        }
    };

    // PostgreSQL обслуживает канал уведомлений об исходах заданий
    let postgres_ok = match app_state
        .postgres_service
        .repository_health_check
        .check()
        .await
    {
        Ok(ok) => ok,
        Err(e) => {
            error!("PostgreSQL health check failed: {}", e);
            false
        }
    };

    if clickhouse_ok && postgres_ok {
        Ok(StatusCode::OK)
    } else {
        Err(StatusCode::INTERNAL_SERVER_ERROR)
    }
}
