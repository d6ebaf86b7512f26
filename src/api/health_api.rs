use axum::http::StatusCode;

/// Проверка живости самого сервиса
pub async fn health_api() -> StatusCode {
    StatusCode::OK
}
