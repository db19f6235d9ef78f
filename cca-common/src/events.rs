//! Event types and broadcast bus
//!
//! Services publish domain events on an in-process `EventBus`; the SSE
//! endpoint forwards them to connected clients.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Background job lifecycle
///
/// `Queued -> Running -> Succeeded | Failed`, passing through `Retrying`
/// between failed attempts while retries remain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobState {
    Queued,
    Running,
    Retrying,
    Succeeded,
    Failed,
}

impl JobState {
    pub fn as_str(self) -> &'static str {
        match self {
            JobState::Queued => "QUEUED",
            JobState::Running => "RUNNING",
            JobState::Retrying => "RETRYING",
            JobState::Succeeded => "SUCCEEDED",
            JobState::Failed => "FAILED",
        }
    }

    pub fn parse(s: &str) -> Option<JobState> {
        match s {
            "QUEUED" => Some(JobState::Queued),
            "RUNNING" => Some(JobState::Running),
            "RETRYING" => Some(JobState::Retrying),
            "SUCCEEDED" => Some(JobState::Succeeded),
            "FAILED" => Some(JobState::Failed),
            _ => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Succeeded | JobState::Failed)
    }

    /// Whether moving to `next` is a legal lifecycle step
    pub fn can_transition_to(self, next: JobState) -> bool {
        use JobState::*;
        matches!(
            (self, next),
            (Queued, Running)
                | (Running, Succeeded)
                | (Running, Failed)
                | (Running, Retrying)
                | (Retrying, Running)
                | (Retrying, Failed)
        )
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobKind {
    AiInsights,
    ReportRender,
}

impl JobKind {
    pub fn as_str(self) -> &'static str {
        match self {
            JobKind::AiInsights => "AI_INSIGHTS",
            JobKind::ReportRender => "REPORT_RENDER",
        }
    }

    pub fn parse(s: &str) -> Option<JobKind> {
        match s {
            "AI_INSIGHTS" => Some(JobKind::AiInsights),
            "REPORT_RENDER" => Some(JobKind::ReportRender),
            _ => None,
        }
    }
}

impl std::fmt::Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Events emitted by CCA services
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum CcaEvent {
    /// A test result was stored (first submission or retake)
    ResultSubmitted {
        user_id: String,
        test_id: i64,
        result_code: String,
        is_completed: bool,
        timestamp: DateTime<Utc>,
    },

    /// A user's test result was removed
    ResultDeleted {
        user_id: String,
        test_id: i64,
        timestamp: DateTime<Utc>,
    },

    /// A background job moved to a new state
    JobStateChanged {
        job_id: String,
        user_id: String,
        kind: JobKind,
        state: JobState,
        attempts: u32,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
        timestamp: DateTime<Utc>,
    },

    /// New AI insights are available for a user
    InsightsReady {
        user_id: String,
        job_id: String,
        timestamp: DateTime<Utc>,
    },
}

impl CcaEvent {
    /// SSE event name
    pub fn event_type(&self) -> &'static str {
        match self {
            CcaEvent::ResultSubmitted { .. } => "ResultSubmitted",
            CcaEvent::ResultDeleted { .. } => "ResultDeleted",
            CcaEvent::JobStateChanged { .. } => "JobStateChanged",
            CcaEvent::InsightsReady { .. } => "InsightsReady",
        }
    }

    /// The user this event concerns
    pub fn user_id(&self) -> &str {
        match self {
            CcaEvent::ResultSubmitted { user_id, .. }
            | CcaEvent::ResultDeleted { user_id, .. }
            | CcaEvent::JobStateChanged { user_id, .. }
            | CcaEvent::InsightsReady { user_id, .. } => user_id,
        }
    }
}

/// Central event distribution bus
///
/// Wraps `tokio::sync::broadcast`: publishing never blocks, slow subscribers
/// observe `Lagged` and skip ahead, and dropped receivers clean up on their
/// own.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<CcaEvent>,
    capacity: usize,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<CcaEvent> {
        self.tx.subscribe()
    }

    /// Emit an event; `Err` when nobody is subscribed
    #[allow(clippy::result_large_err)]
    pub fn emit(&self, event: CcaEvent) -> Result<usize, broadcast::error::SendError<CcaEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring the no-subscriber case
    pub fn emit_lossy(&self, event: CcaEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
