use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use marquee_booking::{BookingQueue, PipelineConfig};
use marquee_core::{
    lock_key, BookingEvent, BoxError, CommitError, JobStatus, LockStore, Seat, SeatRepository,
};
use marquee_hold::ReservationManager;
use marquee_store::{MemoryLockStore, MemorySeatRepository};

#[tokio::test(start_paused = true)]
async fn test_lock_then_book_commits_and_cleans_up() {
    let seats = Arc::new(MemorySeatRepository::new());
    let locks = Arc::new(MemoryLockStore::new());
    let show_id = Uuid::new_v4();
    let s1 = Seat::new(show_id, "A1");
    seats.insert(s1.clone());

    let manager = ReservationManager::new(locks.clone(), seats.clone(), Duration::from_secs(60));
    let queue = BookingQueue::start(PipelineConfig::default(), seats.clone(), locks.clone());
    let mut events = queue.subscribe();

    manager.acquire(s1.id, "user-1").await.unwrap();
    let job_id = queue
        .enqueue("user-1", vec![s1.id], show_id)
        .await
        .unwrap();

    match events.recv().await.unwrap() {
        BookingEvent::Completed {
            job_id: id, owner, ..
        } => {
            assert_eq!(id, job_id);
            assert_eq!(owner, "user-1");
        }
        other => panic!("unexpected event: {:?}", other),
    }

    let stored = seats.get(s1.id).unwrap();
    assert!(stored.is_booked);
    assert_eq!(stored.booked_by.as_deref(), Some("user-1"));
    assert_eq!(stored.locked_by, None);
    assert_eq!(stored.locked_until, None);
    // Lock entry deleted after the commit.
    assert_eq!(locks.get(&lock_key(s1.id)).await.unwrap(), None);
    assert_eq!(queue.job_status(job_id).await, Some(JobStatus::Completed));

    queue.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_overlapping_jobs_commit_at_most_once() {
    let seats = Arc::new(MemorySeatRepository::new());
    let locks = Arc::new(MemoryLockStore::new());
    let show_id = Uuid::new_v4();
    let s1 = Seat::new(show_id, "A1");
    let s2 = Seat::new(show_id, "A2");
    seats.insert(s1.clone());
    seats.insert(s2.clone());

    let manager = ReservationManager::new(locks.clone(), seats.clone(), Duration::from_secs(60));
    let queue = BookingQueue::start(PipelineConfig::default(), seats.clone(), locks.clone());
    let mut events = queue.subscribe();

    manager.acquire(s1.id, "user-1").await.unwrap();
    manager.acquire(s2.id, "user-1").await.unwrap();

    // Double submit over the same seat set: both pass the advisory checks,
    // only one transaction can commit.
    let job_a = queue
        .enqueue("user-1", vec![s1.id, s2.id], show_id)
        .await
        .unwrap();
    let job_b = queue
        .enqueue("user-1", vec![s1.id, s2.id], show_id)
        .await
        .unwrap();

    let first = events.recv().await.unwrap();
    let second = events.recv().await.unwrap();

    let (completed, failed) = match (&first, &second) {
        (BookingEvent::Completed { job_id, .. }, BookingEvent::Failed { .. }) => (*job_id, second.clone()),
        (BookingEvent::Failed { .. }, BookingEvent::Completed { job_id, .. }) => (*job_id, first.clone()),
        other => panic!("expected one completion and one failure, got {:?}", other),
    };

    assert!(completed == job_a || completed == job_b);
    match failed {
        BookingEvent::Failed {
            job_id,
            attempts,
            error,
        } => {
            assert_ne!(job_id, completed);
            assert_eq!(attempts, 3);
            assert!(error.contains("still available"), "error was: {}", error);
        }
        _ => unreachable!(),
    }

    // Exactly one owner booking survived; nothing half-committed.
    for id in [s1.id, s2.id] {
        let seat = seats.get(id).unwrap();
        assert!(seat.is_booked);
        assert_eq!(seat.booked_by.as_deref(), Some("user-1"));
        assert_eq!(seat.locked_by, None);
    }

    queue.shutdown().await;
}

struct FailingSeatRepository {
    inner: MemorySeatRepository,
}

#[async_trait]
impl SeatRepository for FailingSeatRepository {
    async fn find_by_id(&self, seat_id: Uuid) -> Result<Option<Seat>, BoxError> {
        self.inner.find_by_id(seat_id).await
    }

    async fn find_by_ids(&self, seat_ids: &[Uuid]) -> Result<Vec<Seat>, BoxError> {
        self.inner.find_by_ids(seat_ids).await
    }

    async fn find_by_ids_in_show(
        &self,
        seat_ids: &[Uuid],
        show_id: Uuid,
    ) -> Result<Vec<Seat>, BoxError> {
        self.inner.find_by_ids_in_show(seat_ids, show_id).await
    }

    async fn find_by_show(&self, show_id: Uuid) -> Result<Vec<Seat>, BoxError> {
        self.inner.find_by_show(show_id).await
    }

    async fn set_locked(
        &self,
        seat_id: Uuid,
        owner: &str,
        until: DateTime<Utc>,
    ) -> Result<(), BoxError> {
        self.inner.set_locked(seat_id, owner, until).await
    }

    async fn clear_locked(&self, seat_id: Uuid, owner: &str) -> Result<bool, BoxError> {
        self.inner.clear_locked(seat_id, owner).await
    }

    async fn clear_expired_locks(&self, now: DateTime<Utc>) -> Result<u64, BoxError> {
        self.inner.clear_expired_locks(now).await
    }

    async fn book_seats(
        &self,
        _seat_ids: &[Uuid],
        _show_id: Uuid,
        _owner: &str,
    ) -> Result<(), CommitError> {
        Err(CommitError::Backend("simulated transaction failure".into()))
    }
}

#[tokio::test(start_paused = true)]
async fn test_exhausted_retries_fire_failure_observer() {
    let inner = MemorySeatRepository::new();
    let show_id = Uuid::new_v4();
    let s1 = Seat::new(show_id, "A1");
    inner.insert(s1.clone());
    let seats = Arc::new(FailingSeatRepository { inner });
    let locks = Arc::new(MemoryLockStore::new());

    let queue = BookingQueue::start(PipelineConfig::default(), seats.clone(), locks.clone());
    let mut events = queue.subscribe();

    locks
        .set_if_absent(&lock_key(s1.id), "user-1", Duration::from_secs(60))
        .await
        .unwrap();

    let job_id = queue
        .enqueue("user-1", vec![s1.id], show_id)
        .await
        .unwrap();

    match events.recv().await.unwrap() {
        BookingEvent::Failed {
            job_id: id,
            attempts,
            error,
        } => {
            assert_eq!(id, job_id);
            assert_eq!(attempts, 3);
            assert!(error.contains("simulated transaction failure"));
        }
        other => panic!("unexpected event: {:?}", other),
    }

    assert_eq!(
        queue.job_status(job_id).await,
        Some(JobStatus::Failed {
            attempts: 3,
            error: "simulated transaction failure".to_string()
        })
    );

    // No partial commit: the seat is untouched and still held.
    let seat = seats.inner.get(s1.id).unwrap();
    assert!(!seat.is_booked);
    assert_eq!(
        locks.get(&lock_key(s1.id)).await.unwrap().as_deref(),
        Some("user-1")
    );

    queue.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_expired_hold_cannot_be_committed() {
    let seats = Arc::new(MemorySeatRepository::new());
    let locks = Arc::new(MemoryLockStore::new());
    let show_id = Uuid::new_v4();
    let s1 = Seat::new(show_id, "A1");
    seats.insert(s1.clone());

    let manager = ReservationManager::new(locks.clone(), seats.clone(), Duration::from_secs(60));
    let queue = BookingQueue::start(PipelineConfig::default(), seats.clone(), locks.clone());

    manager.acquire(s1.id, "user-1").await.unwrap();
    tokio::time::sleep(Duration::from_secs(61)).await;

    // The hold lapsed, so the enqueue-time check already rejects.
    let err = queue
        .enqueue("user-1", vec![s1.id], show_id)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        marquee_core::BookingError::LockNotHeld(id) if id == s1.id
    ));
    assert!(!seats.get(s1.id).unwrap().is_booked);

    queue.shutdown().await;
}
