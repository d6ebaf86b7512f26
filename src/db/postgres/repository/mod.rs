pub mod health_check_repository;
pub mod notification_repository;
