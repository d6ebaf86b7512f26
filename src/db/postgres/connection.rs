use crate::env_config::models::app_setting::AppSettings;
use sqlx::{Pool, Postgres, postgres::PgPoolOptions};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

#[derive(Clone)]
pub struct PostgresConnection {
    pool: Pool<Postgres>,
}

impl PostgresConnection {
    pub async fn new(settings: Arc<AppSettings>) -> Result<Self, sqlx::Error> {
        info!("Initializing PostgreSQL connection...");

        let pg_config = &settings.app_config.postgres;

        let connection_string = format!(
            "postgres://{}:{}@{}/{}",
            settings.app_env.postgres_user,
            settings.app_env.postgres_password,
            settings.app_env.postgres_host,
            settings.app_env.postgres_database
        );

        debug!(
            "PostgreSQL pool: {}..{} connections, acquire timeout {}s",
            pg_config.min_connections, pg_config.max_connections, pg_config.timeout
        );

        let pool = PgPoolOptions::new()
            .max_connections(pg_config.max_connections)
            .min_connections(pg_config.min_connections)
            .max_lifetime(Duration::from_secs(pg_config.max_lifetime))
            .idle_timeout(Duration::from_secs(pg_config.idle_timeout))
            .acquire_timeout(Duration::from_secs(pg_config.timeout))
            .connect(&connection_string)
            .await?;

        // Проверочный запрос
        match sqlx::query("SELECT 1").execute(&pool).await {
            Ok(_) => info!("PostgreSQL connection successful"),
            Err(e) => {
                error!("Failed to connect to PostgreSQL: {}", e);
                return Err(e);
            }
        }

        Ok(Self { pool })
    }

    pub fn get_pool(&self) -> &Pool<Postgres> {
        &self.pool
    }
}
