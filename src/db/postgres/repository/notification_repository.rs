// src/db/postgres/repository/notification_repository.rs
use crate::db::postgres::connection::PostgresConnection;
use async_trait::async_trait;
use sqlx::Error as SqlxError;
use std::sync::Arc;
use tracing::{debug, error, info};

#[async_trait]
pub trait TraitNotificationRepository {
    /// Публикует готовый JSON в канал уведомлений (LISTEN/NOTIFY)
    async fn publish(&self, payload: &str) -> Result<(), SqlxError>;
}

pub struct StructNotificationRepository {
    connection: Arc<PostgresConnection>,
    channel: String,
}

impl StructNotificationRepository {
    pub fn new(connection: Arc<PostgresConnection>, channel: String) -> Self {
        Self { connection, channel }
    }
}

#[async_trait]
impl TraitNotificationRepository for StructNotificationRepository {
    async fn publish(&self, payload: &str) -> Result<(), SqlxError> {
        let pool = self.connection.get_pool();

        debug!(
            "Publishing notification to channel '{}', {} bytes",
            self.channel,
            payload.len()
        );

        let result = sqlx::query("SELECT pg_notify($1, $2)")
            .bind(&self.channel)
            .bind(payload)
            .execute(pool)
            .await;

        match &result {
            Ok(_) => info!("Published notification to channel '{}'", self.channel),
            Err(e) => error!("Failed to publish notification to '{}': {}", self.channel, e),
        }

        result.map(|_| ())
    }
}
