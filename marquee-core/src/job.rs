use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A queued booking request. Attempt bookkeeping lives with the worker that
/// processes it, not on the job itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingJob {
    pub id: Uuid,
    pub owner: String,
    pub seat_ids: Vec<Uuid>,
    pub show_id: Uuid,
}

impl BookingJob {
    pub fn new(owner: impl Into<String>, seat_ids: Vec<Uuid>, show_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner: owner.into(),
            seat_ids,
            show_id,
        }
    }
}

/// Pollable job state, keyed by job id in the pipeline's registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum JobStatus {
    Queued,
    InProgress { attempt: u32 },
    Completed,
    Failed { attempts: u32, error: String },
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed { .. })
    }
}

/// Completion-observer event. This is the only feedback channel for a job
/// beyond status polling; enqueuing callers never block on completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum BookingEvent {
    Completed {
        job_id: Uuid,
        owner: String,
        show_id: Uuid,
        seat_ids: Vec<Uuid>,
    },
    Failed {
        job_id: Uuid,
        attempts: u32,
        error: String,
    },
}

impl BookingEvent {
    pub fn job_id(&self) -> Uuid {
        match self {
            BookingEvent::Completed { job_id, .. } => *job_id,
            BookingEvent::Failed { job_id, .. } => *job_id,
        }
    }
}
