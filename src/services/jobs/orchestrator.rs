// File: src/services/jobs/orchestrator.rs
use crate::db::postgres::repository::notification_repository::TraitNotificationRepository;
use crate::services::jobs::models::{JobEvent, JobInvocation, JobOutcome, JobRun, JobState};
use crate::services::jobs::runner::JobRunner;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Параметры супервизии внешнего задания
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub project: String,
    pub environment: String,
    pub poll_interval: Duration,
    pub max_poll_attempts: u32,
}

/// Последовательная машина состояний вокруг одного запуска задания:
/// запуск, опрос с фиксированным интервалом в пределах бюджета попыток,
/// ровно одно итоговое уведомление
pub struct JobOrchestrator {
    runner: Arc<dyn JobRunner>,
    notifier: Arc<dyn TraitNotificationRepository + Send + Sync>,
    config: OrchestratorConfig,
}

impl JobOrchestrator {
    pub fn new(
        runner: Arc<dyn JobRunner>,
        notifier: Arc<dyn TraitNotificationRepository + Send + Sync>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            runner,
            notifier,
            config,
        }
    }

    /// Выполняет одну оркестрацию до терминального состояния.
    /// Ошибка возвращается только если не удалось опубликовать
    /// уведомление; неуспех самого задания - обычный исход.
    pub async fn execute(&self, invocation: JobInvocation) -> Result<JobOutcome, Box<dyn std::error::Error>> {
        let mut run = JobRun::new(invocation, self.config.max_poll_attempts);

        info!(
            "Orchestrating job '{}', invocation {}",
            run.invocation.job_name, run.invocation_id
        );

        let start_event = match self.runner.start_run(&run.invocation).await {
            Ok(run_id) => JobEvent::StartSucceeded { run_id },
            Err(e) => {
                error!("Failed to start job '{}': {}", run.invocation.job_name, e);
                JobEvent::StartFailed {
                    error: e.to_string(),
                }
            }
        };
        run.apply(start_event);

        // Цикл опроса: подождать интервал, запросить статус, применить
        while !run.is_terminal() {
            tokio::time::sleep(self.config.poll_interval).await;

            let event = match self.runner.poll_run(&run.invocation.job_name, &run.run_id).await {
                Ok(status) => JobEvent::PollCompleted { status },
                Err(e) => {
                    warn!(
                        "Poll failed for job '{}' run {}: {}",
                        run.invocation.job_name, run.run_id, e
                    );
                    JobEvent::PollFailed {
                        error: e.to_string(),
                    }
                }
            };

            let state = run.apply(event);

            debug!(
                "Job '{}' run {}: state {:?}, attempts {}/{}",
                run.invocation.job_name,
                run.run_id,
                state,
                run.attempts,
                self.config.max_poll_attempts
            );
        }

        match run.state {
            JobState::Succeeded => info!(
                "Job '{}' run {} succeeded after {} poll(s)",
                run.invocation.job_name, run.run_id, run.attempts + 1
            ),
            _ => warn!(
                "Job '{}' run '{}' failed: {}",
                run.invocation.job_name,
                run.run_id,
                run.error_message.as_deref().unwrap_or("")
            ),
        }

        let outcome = run.into_outcome(&self.config.project, &self.config.environment);

        // Ровно одно уведомление на оркестрацию
        let payload = serde_json::to_string(&outcome)?;
        self.notifier.publish(&payload).await?;

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::jobs::models::JobRunStatus;
    use crate::services::jobs::runner::RunnerError;
    use async_trait::async_trait;
    use sqlx::Error as SqlxError;
    use std::collections::{BTreeMap, VecDeque};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    struct MockRunner {
        start_error: Option<String>,
        statuses: Mutex<VecDeque<JobRunStatus>>,
        polls: AtomicU32,
    }

    impl MockRunner {
        fn with_statuses(statuses: Vec<JobRunStatus>) -> Self {
            Self {
                start_error: None,
                statuses: Mutex::new(statuses.into()),
                polls: AtomicU32::new(0),
            }
        }

        fn failing_start(error: &str) -> Self {
            Self {
                start_error: Some(error.to_string()),
                statuses: Mutex::new(VecDeque::new()),
                polls: AtomicU32::new(0),
            }
        }

        fn poll_count(&self) -> u32 {
            self.polls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl JobRunner for MockRunner {
        async fn start_run(&self, _invocation: &JobInvocation) -> Result<String, RunnerError> {
            match &self.start_error {
                Some(error) => Err(error.clone().into()),
                None => Ok("run-42".to_string()),
            }
        }

        async fn poll_run(&self, _job_name: &str, _run_id: &str) -> Result<JobRunStatus, RunnerError> {
            self.polls.fetch_add(1, Ordering::SeqCst);

            // Последний статус повторяется, когда очередь закончилась
            let mut statuses = self.statuses.lock().unwrap();
            if statuses.len() > 1 {
                Ok(statuses.pop_front().unwrap())
            } else {
                Ok(statuses.front().cloned().unwrap_or_default())
            }
        }
    }

    struct MockNotifier {
        published: Mutex<Vec<String>>,
    }

    impl MockNotifier {
        fn new() -> Self {
            Self {
                published: Mutex::new(Vec::new()),
            }
        }

        fn published(&self) -> Vec<String> {
            self.published.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl TraitNotificationRepository for MockNotifier {
        async fn publish(&self, payload: &str) -> Result<(), SqlxError> {
            self.published.lock().unwrap().push(payload.to_string());
            Ok(())
        }
    }

    fn status(state: &str) -> JobRunStatus {
        JobRunStatus {
            state: state.to_string(),
            ..JobRunStatus::default()
        }
    }

    fn invocation() -> JobInvocation {
        JobInvocation {
            job_name: "currency-raw-ingest".to_string(),
            script_location: "jobs/currency_raw_ingest.py".to_string(),
            arguments: BTreeMap::new(),
            metadata: serde_json::Value::Null,
        }
    }

    fn config(max_poll_attempts: u32) -> OrchestratorConfig {
        OrchestratorConfig {
            project: "capstone-currency".to_string(),
            environment: "local".to_string(),
            poll_interval: Duration::from_secs(20),
            max_poll_attempts,
        }
    }

    fn orchestrator(
        runner: Arc<MockRunner>,
        notifier: Arc<MockNotifier>,
        max_poll_attempts: u32,
    ) -> JobOrchestrator {
        JobOrchestrator::new(runner, notifier, config(max_poll_attempts))
    }

    #[tokio::test(start_paused = true)]
    async fn test_running_then_succeeded_polls_n_plus_one_times() {
        let runner = Arc::new(MockRunner::with_statuses(vec![
            status("RUNNING"),
            status("RUNNING"),
            status("RUNNING"),
            status("SUCCEEDED"),
        ]));
        let notifier = Arc::new(MockNotifier::new());

        let outcome = orchestrator(runner.clone(), notifier.clone(), 150)
            .execute(invocation())
            .await
            .unwrap();

        assert_eq!(outcome.status, "SUCCEEDED");
        assert_eq!(outcome.run_id, "run-42");
        assert_eq!(runner.poll_count(), 4);

        let published = notifier.published();
        assert_eq!(published.len(), 1);
        assert!(published[0].contains("\"status\":\"SUCCEEDED\""));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unrecognized_status_fails_after_budget() {
        let runner = Arc::new(MockRunner::with_statuses(vec![status("WAITING")]));
        let notifier = Arc::new(MockNotifier::new());

        let outcome = orchestrator(runner.clone(), notifier.clone(), 3)
            .execute(invocation())
            .await
            .unwrap();

        assert_eq!(outcome.status, "FAILED");
        assert_eq!(runner.poll_count(), 3);
        // Бюджет исчерпан: сообщение об ошибке пустое
        assert_eq!(outcome.error_message.as_deref(), Some(""));
        assert_eq!(notifier.published().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_failure_is_terminal_without_polling() {
        let runner = Arc::new(MockRunner::failing_start("connection refused"));
        let notifier = Arc::new(MockNotifier::new());

        let outcome = orchestrator(runner.clone(), notifier.clone(), 150)
            .execute(invocation())
            .await
            .unwrap();

        assert_eq!(outcome.status, "FAILED");
        assert_eq!(outcome.run_id, "");
        assert_eq!(outcome.error_message.as_deref(), Some("connection refused"));
        assert_eq!(runner.poll_count(), 0);
        assert_eq!(notifier.published().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_runner_reported_failure_carries_message() {
        let failed = JobRunStatus {
            state: "FAILED".to_string(),
            error_message: Some("disk full".to_string()),
            ..JobRunStatus::default()
        };
        let runner = Arc::new(MockRunner::with_statuses(vec![status("RUNNING"), failed]));
        let notifier = Arc::new(MockNotifier::new());

        let outcome = orchestrator(runner.clone(), notifier.clone(), 150)
            .execute(invocation())
            .await
            .unwrap();

        assert_eq!(outcome.status, "FAILED");
        assert_eq!(outcome.error_message.as_deref(), Some("disk full"));
        assert_eq!(runner.poll_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stuck_running_fails_when_budget_exhausted() {
        let runner = Arc::new(MockRunner::with_statuses(vec![status("RUNNING")]));
        let notifier = Arc::new(MockNotifier::new());

        let outcome = orchestrator(runner.clone(), notifier.clone(), 5)
            .execute(invocation())
            .await
            .unwrap();

        assert_eq!(outcome.status, "FAILED");
        assert_eq!(outcome.error_message.as_deref(), Some(""));
        assert_eq!(runner.poll_count(), 5);
    }
}
