// File: src/services/jobs/runner.rs
use crate::services::jobs::models::{JobInvocation, JobRunStatus};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, info};

pub type RunnerError = Box<dyn std::error::Error + Send + Sync>;

/// Протокол запуска и опроса внешнего задания
#[async_trait]
pub trait JobRunner: Send + Sync {
    /// Запускает задание, возвращает идентификатор запуска
    async fn start_run(&self, invocation: &JobInvocation) -> Result<String, RunnerError>;

    /// Возвращает статус запущенного задания
    async fn poll_run(&self, job_name: &str, run_id: &str) -> Result<JobRunStatus, RunnerError>;
}

/// HTTP клиент сервиса запуска заданий
pub struct HttpJobRunner {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Serialize)]
struct StartRunRequest<'a> {
    script_location: &'a str,
    arguments: &'a BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct StartRunResponse {
    run_id: String,
}

impl HttpJobRunner {
    pub fn new(base_url: String) -> Result<Self, RunnerError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl JobRunner for HttpJobRunner {
    async fn start_run(&self, invocation: &JobInvocation) -> Result<String, RunnerError> {
        let url = format!("{}/api/jobs/{}/runs", self.base_url, invocation.job_name);

        debug!("Starting job run: POST {}", url);

        let response = self
            .client
            .post(&url)
            .json(&StartRunRequest {
                script_location: &invocation.script_location,
                arguments: &invocation.arguments,
            })
            .send()
            .await?
            .error_for_status()?
            .json::<StartRunResponse>()
            .await?;

        info!(
            "Started job '{}', run_id={}",
            invocation.job_name, response.run_id
        );

        Ok(response.run_id)
    }

    async fn poll_run(&self, job_name: &str, run_id: &str) -> Result<JobRunStatus, RunnerError> {
        let url = format!("{}/api/jobs/{}/runs/{}", self.base_url, job_name, run_id);

        debug!("Polling job run: GET {}", url);

        let status = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json::<JobRunStatus>()
            .await?;

        debug!("Job '{}' run {} reported state {}", job_name, run_id, status.state);

        Ok(status)
    }
}
