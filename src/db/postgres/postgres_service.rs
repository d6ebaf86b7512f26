use crate::db::postgres::repository::health_check_repository::TraitHealthCheckRepository;
use crate::db::postgres::repository::notification_repository::TraitNotificationRepository;

use crate::db::postgres::{
    connection::PostgresConnection,
    repository::health_check_repository::StructHealthCheckRepository,
    repository::notification_repository::StructNotificationRepository,
};
use crate::env_config::models::app_setting::AppSettings;
use std::sync::Arc;
use tracing::{error, info};

pub struct PostgresService {
    // Connection
    pub connection: Arc<PostgresConnection>,

    // Operational repositories (PostgreSQL)
    pub repository_health_check: Arc<dyn TraitHealthCheckRepository + Send + Sync>,
    pub repository_notification: Arc<dyn TraitNotificationRepository + Send + Sync>,
}

impl PostgresService {
    pub async fn new(settings: &Arc<AppSettings>) -> Result<Self, Box<dyn std::error::Error>> {
        info!("Initializing PostgreSQL service components");

        // Initialize PostgreSQL connection
        info!("Creating PostgreSQL connection");
        let postgres_connection = match PostgresConnection::new(settings.clone()).await {
            Ok(conn) => {
                info!("PostgreSQL connection established successfully");
                Arc::new(conn)
            }
            Err(e) => {
                error!("Failed to establish PostgreSQL connection: {}", e);
                return Err(Box::new(e));
            }
        };

        // Initialize repositories
        info!("Initializing repositories");

        let health_check_repository = Arc::new(StructHealthCheckRepository::new(
            postgres_connection.clone(),
        ))
            as Arc<dyn TraitHealthCheckRepository + Send + Sync>;

        let notification_repository = Arc::new(StructNotificationRepository::new(
            postgres_connection.clone(),
            settings.app_config.notification.channel.clone(),
        ))
            as Arc<dyn TraitNotificationRepository + Send + Sync>;

        info!("PostgreSQL service initialized successfully");
        Ok(Self {
            connection: postgres_connection,
            repository_health_check: health_check_repository,
            repository_notification: notification_repository,
        })
    }
}
