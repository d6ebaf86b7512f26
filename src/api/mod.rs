pub mod health_api;
pub mod health_db;
pub mod rates;

pub use health_api::health_api;
pub use health_db::health_db;
pub use rates::{rates_summary, rates_trend};
