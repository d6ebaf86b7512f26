// File: src/services/rates/scheduler.rs
use super::materializer::RatesMaterializer;
use crate::app_state::models::AppState;
use crate::services::jobs::models::JobInvocation;
use crate::services::jobs::orchestrator::{JobOrchestrator, OrchestratorConfig};
use crate::services::jobs::runner::HttpJobRunner;
use std::sync::Arc;
use std::time::Duration;
use tokio::time;
use tracing::{debug, error, info, warn};

pub struct RatesScheduler {
    app_state: Arc<AppState>,
}

impl RatesScheduler {
    pub fn new(app_state: Arc<AppState>) -> Self {
        Self { app_state }
    }

    /// Запускает полный цикл обновления: оркестрация внешнего
    /// ingest-задания, затем материализация курсов.
    /// Возвращает количество записанных строк.
    pub async fn trigger_update(&self) -> Result<usize, Box<dyn std::error::Error>> {
        info!("Starting rates update cycle");

        let settings = &self.app_state.settings;
        let job_config = &settings.app_config.ingest_job;

        // Оркестрация внешнего задания, которое пополняет сырую таблицу
        let runner = HttpJobRunner::new(settings.app_env.job_runner_url.clone())
            .map_err(|e| -> Box<dyn std::error::Error> { e })?;
        let orchestrator = JobOrchestrator::new(
            Arc::new(runner),
            self.app_state.postgres_service.repository_notification.clone(),
            OrchestratorConfig {
                project: settings.app_config.notification.project.clone(),
                environment: settings.app_env.env.to_string(),
                poll_interval: Duration::from_secs(job_config.poll_interval_seconds),
                max_poll_attempts: job_config.max_poll_attempts,
            },
        );

        let invocation = JobInvocation {
            job_name: job_config.job_name.clone(),
            script_location: job_config.script_location.clone(),
            arguments: job_config.arguments.clone(),
            metadata: job_config.metadata.clone(),
        };

        let outcome = orchestrator.execute(invocation).await?;

        if outcome.status != "SUCCEEDED" {
            warn!(
                "Ingest job '{}' did not succeed, skipping materialization",
                outcome.job_name
            );
            return Ok(0);
        }

        // Материализация широкой таблицы поверх свежей выгрузки
        let materializer = RatesMaterializer::new(self.app_state.clone());
        let count = materializer.run().await?;

        info!("Rates update cycle completed: {} rows materialized", count);

        Ok(count)
    }

    /// Запускает планировщик для регулярного обновления курсов
    pub async fn start(&self) {
        if !self.app_state.settings.app_config.rates_updater.enabled {
            info!("Rates scheduler is disabled in configuration");
            return;
        }

        let updater_config = &self.app_state.settings.app_config.rates_updater;

        // Вывод информации об окне работы, если оно настроено
        if let (Some(start), Some(end)) = (&updater_config.start_time, &updater_config.end_time) {
            info!(
                "Scheduler operation window configured: {} to {} UTC",
                start, end
            );
        }

        info!(
            "Starting rates scheduler with {} second interval",
            updater_config.interval_seconds,
        );

        // Клонирование app_state для использования в задаче
        let app_state = self.app_state.clone();

        // Создание интервала из конфигурации
        let interval_seconds = updater_config.interval_seconds;

        // Запуск цикла с интервалом
        let mut interval = time::interval(Duration::from_secs(interval_seconds));

        // Основной цикл планировщика
        tokio::spawn(async move {
            loop {
                interval.tick().await;

                // Проверка, находимся ли мы в разрешенном окне работы
                let updater_config = &app_state.settings.app_config.rates_updater;
                let operation_allowed = is_operation_allowed(updater_config);

                if !operation_allowed {
                    debug!(
                        "Scheduler: skipping update - outside operation window (current time: {})",
                        chrono::Utc::now().format("%H:%M:%S")
                    );
                    continue;
                }

                info!("Scheduler: triggering rates update");

                // Создание нового экземпляра планировщика
                let scheduler = RatesScheduler::new(app_state.clone());

                // Запуск цикла обновления
                match scheduler.trigger_update().await {
                    Ok(count) => info!(
                        "Scheduler: successfully materialized {} rate rows",
                        count
                    ),
                    Err(e) => error!("Scheduler: failed to update rates: {}", e),
                }
            }
        });

        // Возвращаемся сразу после запуска фоновой задачи
    }
}

// Вспомогательная функция для проверки, разрешена ли работа в текущий момент
fn is_operation_allowed(
    updater_config: &crate::env_config::models::app_config::RatesUpdaterConfig,
) -> bool {
    // Если окно времени не настроено, всегда разрешаем работу
    if updater_config.start_time.is_none() || updater_config.end_time.is_none() {
        return true;
    }

    // Получение текущего времени UTC
    let now = chrono::Utc::now().time();

    // Парсинг начального и конечного времени
    if let (Some(start_str), Some(end_str)) = (&updater_config.start_time, &updater_config.end_time) {
        if let (Ok(start), Ok(end)) = (
            chrono::NaiveTime::parse_from_str(start_str, "%H:%M:%S"),
            chrono::NaiveTime::parse_from_str(end_str, "%H:%M:%S"),
        ) {
            // Проверка, находится ли текущее время в окне работы
            if start <= end {
                // Простой случай: начальное время до конечного
                return start <= now && now <= end;
            } else {
                // Случай, когда окно работы пересекает полночь
                // например, start=21:00:00, end=04:00:00
                return start <= now || now <= end;
            }
        }
    }

    // Если парсинг не удался, по умолчанию разрешаем работу
    true
}
