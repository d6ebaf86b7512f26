pub mod jobs;
pub mod rates;
