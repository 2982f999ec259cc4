use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, RwLock};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use uuid::Uuid;

use marquee_core::{
    lock_key, BookingError, BookingEvent, BookingJob, JobStatus, LockStore, SeatRepository,
};

const QUEUE_CAPACITY: usize = 100;
const EVENT_CAPACITY: usize = 100;

/// Pipeline tuning. Defaults: three attempts with a fixed 5000ms delay
/// between them.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub workers: usize,
    pub max_attempts: u32,
    pub retry_delay: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: 2,
            max_attempts: 3,
            retry_delay: Duration::from_millis(5000),
        }
    }
}

struct Inner {
    seats: Arc<dyn SeatRepository>,
    locks: Arc<dyn LockStore>,
    statuses: RwLock<HashMap<Uuid, JobStatus>>,
    events: broadcast::Sender<BookingEvent>,
    config: PipelineConfig,
}

/// Asynchronous booking pipeline: accepted jobs are processed by a worker pool
/// that turns a set of held locks into committed seats under one repository
/// transaction, with bounded retry. Callers get a job id back immediately and
/// learn the outcome through the status registry or the event channel.
pub struct BookingQueue {
    inner: Arc<Inner>,
    tx: std::sync::Mutex<Option<mpsc::Sender<BookingJob>>>,
    workers: std::sync::Mutex<Vec<JoinHandle<()>>>,
}

impl BookingQueue {
    /// Spawn the worker pool. Registration is explicit so a process can wire
    /// the pipeline at startup and drain it at teardown.
    pub fn start(
        config: PipelineConfig,
        seats: Arc<dyn SeatRepository>,
        locks: Arc<dyn LockStore>,
    ) -> Self {
        let (tx, rx) = mpsc::channel(QUEUE_CAPACITY);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        let inner = Arc::new(Inner {
            seats,
            locks,
            statuses: RwLock::new(HashMap::new()),
            events,
            config,
        });

        let rx = Arc::new(tokio::sync::Mutex::new(rx));
        let mut workers = Vec::new();
        for worker_id in 0..inner.config.workers.max(1) {
            let inner = inner.clone();
            let rx = rx.clone();
            workers.push(tokio::spawn(async move {
                info!("Booking worker {} started", worker_id);
                loop {
                    // The receiver lock is only held while waiting for a job;
                    // processing happens with it released, so workers overlap.
                    let job = { rx.lock().await.recv().await };
                    match job {
                        Some(job) => Self::process(&inner, job).await,
                        None => break,
                    }
                }
                info!("Booking worker {} stopped", worker_id);
            }));
        }

        Self {
            inner,
            tx: std::sync::Mutex::new(Some(tx)),
            workers: std::sync::Mutex::new(workers),
        }
    }

    /// Queue a booking for seats the caller currently holds.
    ///
    /// The checks here are advisory; the commit transaction re-validates
    /// against current state when the job runs. On success the caller only
    /// learns "queued"; completion arrives via the observer channel.
    pub async fn enqueue(
        &self,
        owner: &str,
        seat_ids: Vec<Uuid>,
        show_id: Uuid,
    ) -> Result<Uuid, BookingError> {
        if seat_ids.is_empty() {
            return Err(BookingError::EmptyRequest);
        }

        let in_show = self
            .inner
            .seats
            .find_by_ids_in_show(&seat_ids, show_id)
            .await
            .map_err(BookingError::Store)?;
        if in_show.len() != seat_ids.len() {
            let found: HashSet<Uuid> = in_show.iter().map(|s| s.id).collect();
            let seat_id = seat_ids
                .iter()
                .copied()
                .find(|id| !found.contains(id))
                .unwrap_or(seat_ids[0]);
            return Err(BookingError::SeatNotInShow { seat_id, show_id });
        }

        for seat_id in &seat_ids {
            match self
                .inner
                .locks
                .get(&lock_key(*seat_id))
                .await
                .map_err(BookingError::Store)?
            {
                Some(holder) if holder == owner => {}
                _ => return Err(BookingError::LockNotHeld(*seat_id)),
            }
        }

        let job = BookingJob::new(owner, seat_ids, show_id);
        let job_id = job.id;

        let tx = self
            .tx
            .lock()
            .unwrap()
            .clone()
            .ok_or(BookingError::QueueClosed)?;

        self.inner
            .statuses
            .write()
            .await
            .insert(job_id, JobStatus::Queued);

        if tx.send(job).await.is_err() {
            self.inner.statuses.write().await.remove(&job_id);
            return Err(BookingError::QueueClosed);
        }

        info!("Booking job {} queued for {}", job_id, owner);
        Ok(job_id)
    }

    /// Completion-observer registration.
    pub fn subscribe(&self) -> broadcast::Receiver<BookingEvent> {
        self.inner.events.subscribe()
    }

    pub async fn job_status(&self, job_id: Uuid) -> Option<JobStatus> {
        self.inner.statuses.read().await.get(&job_id).cloned()
    }

    /// Stop accepting jobs, drain what was already accepted, and join the
    /// workers.
    pub async fn shutdown(&self) {
        let _ = self.tx.lock().unwrap().take();
        let workers: Vec<JoinHandle<()>> = {
            let mut guard = self.workers.lock().unwrap();
            guard.drain(..).collect()
        };
        for handle in workers {
            if let Err(e) = handle.await {
                error!("Booking worker panicked: {}", e);
            }
        }
        info!("Booking pipeline drained and stopped");
    }

    async fn process(inner: &Inner, job: BookingJob) {
        for attempt in 1..=inner.config.max_attempts {
            inner
                .statuses
                .write()
                .await
                .insert(job.id, JobStatus::InProgress { attempt });

            match inner
                .seats
                .book_seats(&job.seat_ids, job.show_id, &job.owner)
                .await
            {
                Ok(()) => {
                    // The committed flag is now authoritative; lock cleanup may
                    // fail independently and the TTL finishes the job.
                    for seat_id in &job.seat_ids {
                        if let Err(e) = inner.locks.delete(&lock_key(*seat_id)).await {
                            warn!("Failed to delete lock for seat {}: {}", seat_id, e);
                        }
                    }

                    inner
                        .statuses
                        .write()
                        .await
                        .insert(job.id, JobStatus::Completed);
                    info!(
                        "Booking job {} committed {} seats for {}",
                        job.id,
                        job.seat_ids.len(),
                        job.owner
                    );
                    let _ = inner.events.send(BookingEvent::Completed {
                        job_id: job.id,
                        owner: job.owner.clone(),
                        show_id: job.show_id,
                        seat_ids: job.seat_ids.clone(),
                    });
                    return;
                }
                Err(e) => {
                    warn!(
                        "Booking job {} attempt {}/{} failed: {}",
                        job.id, attempt, inner.config.max_attempts, e
                    );
                    if attempt < inner.config.max_attempts {
                        tokio::time::sleep(inner.config.retry_delay).await;
                    } else {
                        inner.statuses.write().await.insert(
                            job.id,
                            JobStatus::Failed {
                                attempts: attempt,
                                error: e.to_string(),
                            },
                        );
                        error!("Booking job {} failed after {} attempts", job.id, attempt);
                        let _ = inner.events.send(BookingEvent::Failed {
                            job_id: job.id,
                            attempts: attempt,
                            error: e.to_string(),
                        });
                    }
                }
            }
        }
    }
}
