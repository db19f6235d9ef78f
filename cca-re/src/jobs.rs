//! Background job runner
//!
//! Jobs live in the `jobs` table and run on spawned tokio tasks. A failed
//! attempt is retried with exponential backoff (`base * 2^(attempt-1)`)
//! while retries remain and the error is transient. Every state change is
//! published on the event bus.

use crate::db::jobs::{self, Job};
use crate::db::results;
use crate::insights::{self, InsightError, InsightGenerator};
use crate::reports::{self, ReportFormat};
use cca_common::api::{ApiError, ApiResult};
use cca_common::cache::CacheProvider;
use cca_common::db::settings;
use cca_common::events::{CcaEvent, EventBus, JobKind, JobState};
use cca_common::time::now;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Debug, Error)]
pub enum JobError {
    #[error(transparent)]
    Insight(#[from] InsightError),

    #[error(transparent)]
    Common(#[from] cca_common::Error),

    #[error("Invalid job payload: {0}")]
    InvalidPayload(String),
}

impl JobError {
    pub fn is_retryable(&self) -> bool {
        match self {
            JobError::Insight(e) => e.is_retryable(),
            JobError::Common(cca_common::Error::Database(_)) => true,
            JobError::Common(_) | JobError::InvalidPayload(_) => false,
        }
    }
}

/// Payload of a report render job
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RenderPayload {
    pub format: ReportFormat,
}

/// Delay before retrying after `attempt` failed attempts
pub fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1).min(16);
    base.saturating_mul(1u32 << exponent)
}

/// Enqueue result: the job and whether it was newly created
#[derive(Debug, Clone, Serialize)]
pub struct Enqueued {
    #[serde(flatten)]
    pub job: Job,
    pub created: bool,
}

#[derive(Clone)]
pub struct JobRunner {
    db: SqlitePool,
    cache: CacheProvider,
    events: EventBus,
    generator: Arc<dyn InsightGenerator>,
}

impl JobRunner {
    pub fn new(
        db: SqlitePool,
        cache: CacheProvider,
        events: EventBus,
        generator: Arc<dyn InsightGenerator>,
    ) -> Self {
        Self {
            db,
            cache,
            events,
            generator,
        }
    }

    /// Queue AI insight generation for a user
    ///
    /// Needs at least one completed result. An unfinished insight job for
    /// the same user is returned instead of creating another.
    pub async fn enqueue_insights(&self, user_id: &str) -> ApiResult<Enqueued> {
        if results::completed_tests(&self.db, user_id).await?.is_empty() {
            return Err(ApiError::BadRequest(
                "Complete at least one test before requesting insights".to_string(),
            ));
        }
        self.enqueue(user_id, JobKind::AiInsights, None).await
    }

    /// Queue a report rendering for a user
    pub async fn enqueue_report(&self, user_id: &str, format: ReportFormat) -> ApiResult<Enqueued> {
        let payload = serde_json::to_value(RenderPayload { format })
            .map_err(|e| ApiError::Internal(e.to_string()))?;
        self.enqueue(user_id, JobKind::ReportRender, Some(payload)).await
    }

    async fn enqueue(&self, user_id: &str, kind: JobKind, payload: Option<Value>) -> ApiResult<Enqueued> {
        let key = jobs::dedup_key(kind, payload.as_ref());
        if let Some(job) = jobs::find_active(&self.db, user_id, &key).await? {
            info!(job_id = %job.id, user_id = %user_id, kind = %kind, "Job already pending");
            return Ok(Enqueued {
                job,
                created: false,
            });
        }

        let max_retries = settings::job_max_retries(&self.db).await?;
        let job = match jobs::insert_job(&self.db, user_id, kind, max_retries, payload.as_ref()).await {
            Ok(job) => job,
            // Lost the race to a concurrent request for the same job
            Err(e) if e.is_unique_violation() => {
                let job = jobs::find_active(&self.db, user_id, &key).await?.ok_or_else(|| {
                    ApiError::Conflict(format!("Job '{}' for user {} changed state; retry", key, user_id))
                })?;
                info!(job_id = %job.id, user_id = %user_id, kind = %kind, "Job already pending");
                return Ok(Enqueued {
                    job,
                    created: false,
                });
            }
            Err(e) => return Err(e.into()),
        };
        info!(job_id = %job.id, user_id = %user_id, kind = %kind, "Job queued");
        self.publish(&job, None);
        self.spawn(job.id.clone());

        Ok(Enqueued { job, created: true })
    }

    /// Run a job to completion on its own task
    pub fn spawn(&self, job_id: String) {
        let runner = self.clone();
        tokio::spawn(async move {
            if let Err(e) = runner.run(&job_id).await {
                error!(job_id = %job_id, error = %e, "Job runner failed");
                runner.abandon(&job_id, &e).await;
            }
        });
    }

    /// Fail a job whose runner errored so it stops blocking new requests
    async fn abandon(&self, job_id: &str, cause: &cca_common::Error) {
        let message = format!("Job runner error: {}", cause);
        match jobs::abandon(&self.db, job_id, &message).await {
            Ok(Some(job)) => {
                warn!(job_id = %job_id, attempts = job.attempts, "Abandoned job after runner error");
                self.publish(&job, Some(message));
            }
            Ok(None) => {}
            Err(e) => error!(job_id = %job_id, error = %e, "Could not mark job failed"),
        }
    }

    /// Pick up jobs left unfinished by a previous process
    pub async fn resume_unfinished(&self) -> cca_common::Result<usize> {
        let interrupted = jobs::recover_interrupted(&self.db).await?;
        if interrupted > 0 {
            warn!(interrupted, "Recovered jobs interrupted by restart");
        }

        let pending = jobs::list_unfinished(&self.db).await?;
        for job in &pending {
            self.spawn(job.id.clone());
        }
        Ok(pending.len())
    }

    /// Attempt a job until it succeeds, fails permanently or runs out of
    /// retries
    pub async fn run(&self, job_id: &str) -> cca_common::Result<()> {
        let base = settings::job_backoff_base(&self.db).await?;

        loop {
            let Some(job) = jobs::start_attempt(&self.db, job_id).await? else {
                return Ok(());
            };
            self.publish(&job, None);

            match self.execute(&job).await {
                Ok(result) => {
                    jobs::finish_attempt(&self.db, job_id, JobState::Succeeded, Some(&result), None)
                        .await?;
                    info!(job_id = %job_id, kind = %job.kind, attempts = job.attempts, "Job succeeded");
                    self.publish_state(&job, JobState::Succeeded, None);
                    if job.kind == JobKind::AiInsights {
                        self.events.emit_lossy(CcaEvent::InsightsReady {
                            user_id: job.user_id.clone(),
                            job_id: job.id.clone(),
                            timestamp: now(),
                        });
                    }
                    return Ok(());
                }
                Err(e) if e.is_retryable() && job.attempts <= job.max_retries => {
                    let message = e.to_string();
                    jobs::finish_attempt(&self.db, job_id, JobState::Retrying, None, Some(&message))
                        .await?;
                    let delay = backoff_delay(base, job.attempts);
                    warn!(
                        job_id = %job_id,
                        attempt = job.attempts,
                        max_retries = job.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %message,
                        "Job attempt failed; retrying"
                    );
                    self.publish_state(&job, JobState::Retrying, Some(message));
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    let message = e.to_string();
                    jobs::finish_attempt(&self.db, job_id, JobState::Failed, None, Some(&message))
                        .await?;
                    error!(job_id = %job_id, attempts = job.attempts, error = %message, "Job failed");
                    self.publish_state(&job, JobState::Failed, Some(message));
                    return Ok(());
                }
            }
        }
    }

    async fn execute(&self, job: &Job) -> Result<Value, JobError> {
        let report = reports::build_report(&self.db, &self.cache, &job.user_id).await?;

        match job.kind {
            JobKind::AiInsights => {
                let blob = self.generator.generate(&report).await?;
                let stored = insights::save_insights(
                    &self.db,
                    &self.cache,
                    &job.user_id,
                    &blob,
                    self.generator.model(),
                    Some(&job.id),
                )
                .await?;
                Ok(json!({
                    "model": stored.model,
                    "generated_at": stored.generated_at,
                }))
            }
            JobKind::ReportRender => {
                let payload = job
                    .payload
                    .clone()
                    .ok_or_else(|| JobError::InvalidPayload("missing report format".to_string()))?;
                let format = serde_json::from_value::<RenderPayload>(payload)
                    .map_err(|e| JobError::InvalidPayload(e.to_string()))?
                    .format;
                let content = reports::render(&report, format)?;
                Ok(json!({
                    "format": format,
                    "content_type": format.content_type(),
                    "content": content,
                }))
            }
        }
    }

    fn publish(&self, job: &Job, error: Option<String>) {
        self.publish_state(job, job.state, error);
    }

    fn publish_state(&self, job: &Job, state: JobState, error: Option<String>) {
        self.events.emit_lossy(CcaEvent::JobStateChanged {
            job_id: job.id.clone(),
            user_id: job.user_id.clone(),
            kind: job.kind,
            state,
            attempts: job.attempts,
            error,
            timestamp: now(),
        });
    }
}
