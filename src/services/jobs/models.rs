// File: src/services/jobs/models.rs
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Состояния супервизии одного запуска внешнего задания
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Init,
    Started,
    Polling,
    Succeeded,
    Failed,
}

/// Статус запуска в терминах самого job runner'а
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunnerJobState {
    Running,
    Succeeded,
    Failed,
    Stopped,
    Timeout,
    Unknown(String),
}

impl From<&str> for RunnerJobState {
    fn from(s: &str) -> Self {
        match s.to_ascii_uppercase().as_str() {
            "RUNNING" => RunnerJobState::Running,
            "SUCCEEDED" => RunnerJobState::Succeeded,
            "FAILED" => RunnerJobState::Failed,
            "STOPPED" => RunnerJobState::Stopped,
            "TIMEOUT" => RunnerJobState::Timeout,
            other => RunnerJobState::Unknown(other.to_string()),
        }
    }
}

impl fmt::Display for RunnerJobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunnerJobState::Running => write!(f, "RUNNING"),
            RunnerJobState::Succeeded => write!(f, "SUCCEEDED"),
            RunnerJobState::Failed => write!(f, "FAILED"),
            RunnerJobState::Stopped => write!(f, "STOPPED"),
            RunnerJobState::Timeout => write!(f, "TIMEOUT"),
            RunnerJobState::Unknown(other) => write!(f, "{}", other),
        }
    }
}

/// Ответ runner'а на запрос статуса запуска
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobRunStatus {
    pub state: String,
    #[serde(default)]
    pub started_at: Option<String>,
    #[serde(default)]
    pub completed_at: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
}

/// Запрос на одну оркестрацию внешнего задания
#[derive(Debug, Clone)]
pub struct JobInvocation {
    pub job_name: String,
    pub script_location: String,
    pub arguments: BTreeMap<String, String>,
    pub metadata: serde_json::Value,
}

/// События, продвигающие машину состояний
#[derive(Debug)]
pub enum JobEvent {
    StartSucceeded { run_id: String },
    StartFailed { error: String },
    PollCompleted { status: JobRunStatus },
    PollFailed { error: String },
}

/// Состояние одной оркестрации. Живет от запроса до итогового
/// уведомления, дальше не сохраняется.
#[derive(Debug)]
pub struct JobRun {
    pub invocation_id: Uuid,
    pub invocation: JobInvocation,
    pub state: JobState,
    pub attempts: u32,
    pub run_id: String,
    pub started_at: Option<String>,
    pub completed_at: Option<String>,
    pub error_message: Option<String>,
    max_poll_attempts: u32,
}

impl JobRun {
    pub fn new(invocation: JobInvocation, max_poll_attempts: u32) -> Self {
        Self {
            invocation_id: Uuid::new_v4(),
            invocation,
            state: JobState::Init,
            attempts: 0,
            run_id: String::new(),
            started_at: None,
            completed_at: None,
            error_message: None,
            max_poll_attempts,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.state, JobState::Succeeded | JobState::Failed)
    }

    /// Применяет событие и возвращает новое состояние.
    /// Чистый переход без I/O; ввод-вывод остается оркестратору.
    pub fn apply(&mut self, event: JobEvent) -> JobState {
        match (self.state, event) {
            (JobState::Init, JobEvent::StartSucceeded { run_id }) => {
                self.run_id = run_id;
                self.state = JobState::Started;
            }
            (JobState::Init, JobEvent::StartFailed { error }) => {
                self.error_message = Some(error);
                self.state = JobState::Failed;
            }
            (JobState::Started | JobState::Polling, JobEvent::PollCompleted { status }) => {
                self.handle_poll(status);
            }
            (JobState::Started | JobState::Polling, JobEvent::PollFailed { .. }) => {
                // Недоступность runner'а не роняет здоровое задание,
                // но тратит попытку из бюджета опроса
                self.consume_attempt();
            }
            // Терминальные состояния событий не принимают
            (_, event) => {
                tracing::debug!("Ignoring event {:?} in state {:?}", event, self.state);
            }
        }

        self.state
    }

    fn handle_poll(&mut self, status: JobRunStatus) {
        if status.started_at.is_some() {
            self.started_at = status.started_at.clone();
        }
        if status.completed_at.is_some() {
            self.completed_at = status.completed_at.clone();
        }

        match RunnerJobState::from(status.state.as_str()) {
            RunnerJobState::Succeeded => {
                self.state = JobState::Succeeded;
            }
            RunnerJobState::Failed | RunnerJobState::Stopped | RunnerJobState::Timeout => {
                self.error_message = Some(status.error_message.unwrap_or_default());
                self.state = JobState::Failed;
            }
            // RUNNING и нераспознанные статусы крутят цикл опроса,
            // каждый опрос тратит попытку из бюджета
            RunnerJobState::Running | RunnerJobState::Unknown(_) => {
                self.consume_attempt();
            }
        }
    }

    fn consume_attempt(&mut self) {
        self.attempts += 1;

        if self.attempts >= self.max_poll_attempts {
            // Исчерпание бюджета отличимо от отказа runner'а
            // пустым сообщением об ошибке
            self.error_message = Some(String::new());
            self.state = JobState::Failed;
        } else {
            self.state = JobState::Polling;
        }
    }

    /// Собирает итоговое уведомление по терминальному состоянию
    pub fn into_outcome(self, project: &str, environment: &str) -> JobOutcome {
        let status = match self.state {
            JobState::Succeeded => "SUCCEEDED",
            _ => "FAILED",
        };

        JobOutcome {
            project: project.to_string(),
            environment: environment.to_string(),
            job_name: self.invocation.job_name,
            status: status.to_string(),
            run_id: self.run_id,
            script_location: self.invocation.script_location,
            started_at: self.started_at,
            completed_at: self.completed_at,
            error_message: self.error_message,
            metadata: self.invocation.metadata,
        }
    }
}

/// Итоговое уведомление об исходе задания; публикуется ровно один раз
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobOutcome {
    pub project: String,
    pub environment: String,
    pub job_name: String,
    pub status: String,
    pub run_id: String,
    pub script_location: String,
    pub started_at: Option<String>,
    pub completed_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub metadata: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invocation() -> JobInvocation {
        JobInvocation {
            job_name: "currency-raw-ingest".to_string(),
            script_location: "jobs/currency_raw_ingest.py".to_string(),
            arguments: BTreeMap::new(),
            metadata: serde_json::json!({"team": "data"}),
        }
    }

    fn poll(state: &str) -> JobEvent {
        JobEvent::PollCompleted {
            status: JobRunStatus {
                state: state.to_string(),
                ..JobRunStatus::default()
            },
        }
    }

    #[test]
    fn test_start_success_then_succeeded() {
        let mut run = JobRun::new(invocation(), 150);

        assert_eq!(
            run.apply(JobEvent::StartSucceeded {
                run_id: "run-1".to_string()
            }),
            JobState::Started
        );
        assert_eq!(run.apply(poll("RUNNING")), JobState::Polling);
        assert_eq!(run.apply(poll("SUCCEEDED")), JobState::Succeeded);
        assert_eq!(run.run_id, "run-1");
        assert!(run.error_message.is_none());
    }

    #[test]
    fn test_start_failure_goes_straight_to_failed() {
        let mut run = JobRun::new(invocation(), 150);

        assert_eq!(
            run.apply(JobEvent::StartFailed {
                error: "connection refused".to_string()
            }),
            JobState::Failed
        );
        assert_eq!(run.error_message.as_deref(), Some("connection refused"));
        assert_eq!(run.attempts, 0);
    }

    #[test]
    fn test_runner_reported_failure_carries_message() {
        let mut run = JobRun::new(invocation(), 150);
        run.apply(JobEvent::StartSucceeded {
            run_id: "run-1".to_string(),
        });

        let event = JobEvent::PollCompleted {
            status: JobRunStatus {
                state: "FAILED".to_string(),
                error_message: Some("disk full".to_string()),
                ..JobRunStatus::default()
            },
        };

        assert_eq!(run.apply(event), JobState::Failed);
        assert_eq!(run.error_message.as_deref(), Some("disk full"));
    }

    #[test]
    fn test_stopped_and_timeout_are_failures() {
        for state in ["STOPPED", "TIMEOUT"] {
            let mut run = JobRun::new(invocation(), 150);
            run.apply(JobEvent::StartSucceeded {
                run_id: "run-1".to_string(),
            });

            assert_eq!(run.apply(poll(state)), JobState::Failed);
        }
    }

    #[test]
    fn test_unknown_status_exhausts_attempt_budget() {
        let mut run = JobRun::new(invocation(), 3);
        run.apply(JobEvent::StartSucceeded {
            run_id: "run-1".to_string(),
        });

        assert_eq!(run.apply(poll("WAITING")), JobState::Polling);
        assert_eq!(run.apply(poll("WAITING")), JobState::Polling);
        assert_eq!(run.apply(poll("WAITING")), JobState::Failed);
        assert_eq!(run.attempts, 3);
        // Исчерпание бюджета: сообщение пустое
        assert_eq!(run.error_message.as_deref(), Some(""));
    }

    #[test]
    fn test_stuck_running_is_bounded_by_budget() {
        let mut run = JobRun::new(invocation(), 5);
        run.apply(JobEvent::StartSucceeded {
            run_id: "run-1".to_string(),
        });

        for _ in 0..4 {
            assert_eq!(run.apply(poll("RUNNING")), JobState::Polling);
        }
        assert_eq!(run.apply(poll("RUNNING")), JobState::Failed);
        assert_eq!(run.error_message.as_deref(), Some(""));
    }

    #[test]
    fn test_terminal_state_ignores_events() {
        let mut run = JobRun::new(invocation(), 150);
        run.apply(JobEvent::StartFailed {
            error: "boom".to_string(),
        });

        assert_eq!(run.apply(poll("SUCCEEDED")), JobState::Failed);
        assert_eq!(run.error_message.as_deref(), Some("boom"));
    }

    #[test]
    fn test_outcome_carries_passthrough_fields() {
        let mut run = JobRun::new(invocation(), 150);
        run.apply(JobEvent::StartSucceeded {
            run_id: "run-7".to_string(),
        });

        let event = JobEvent::PollCompleted {
            status: JobRunStatus {
                state: "SUCCEEDED".to_string(),
                started_at: Some("2024-01-01T02:00:00Z".to_string()),
                completed_at: Some("2024-01-01T02:05:00Z".to_string()),
                ..JobRunStatus::default()
            },
        };
        run.apply(event);

        let outcome = run.into_outcome("capstone-currency", "docker");

        assert_eq!(outcome.status, "SUCCEEDED");
        assert_eq!(outcome.run_id, "run-7");
        assert_eq!(outcome.project, "capstone-currency");
        assert_eq!(outcome.script_location, "jobs/currency_raw_ingest.py");
        assert_eq!(outcome.started_at.as_deref(), Some("2024-01-01T02:00:00Z"));
        assert_eq!(outcome.metadata, serde_json::json!({"team": "data"}));

        // Поле ошибки не сериализуется для успешного исхода
        let payload = serde_json::to_string(&outcome).unwrap();
        assert!(!payload.contains("error_message"));
    }
}
