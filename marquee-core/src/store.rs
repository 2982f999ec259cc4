use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;
use uuid::Uuid;

use crate::error::{BoxError, CommitError};
use crate::seat::Seat;

/// Key-value store holding short-lived ownership claims with per-key expiry.
///
/// `set_if_absent` is the sole arbiter between racing acquirers: the first
/// write to land owns the key until explicit deletion or TTL expiry. Store
/// errors must propagate; a claim is never assumed taken when the write could
/// not be confirmed.
#[async_trait]
pub trait LockStore: Send + Sync {
    /// Atomically create the entry if no live entry exists. Returns whether the
    /// claim was taken.
    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> Result<bool, BoxError>;

    /// Current live value for the key, if any.
    async fn get(&self, key: &str) -> Result<Option<String>, BoxError>;

    /// Delete the entry. Returns whether a live entry existed.
    async fn delete(&self, key: &str) -> Result<bool, BoxError>;
}

/// Durable store for seat records.
///
/// The repository is the single source of truth for booked/pending state; the
/// lock store is a fencing optimization in front of it. `book_seats` carries
/// the transactional guarantee: overlapping commits must not both succeed.
#[async_trait]
pub trait SeatRepository: Send + Sync {
    async fn find_by_id(&self, seat_id: Uuid) -> Result<Option<Seat>, BoxError>;

    async fn find_by_ids(&self, seat_ids: &[Uuid]) -> Result<Vec<Seat>, BoxError>;

    /// Only seats matching both the id set and the show.
    async fn find_by_ids_in_show(
        &self,
        seat_ids: &[Uuid],
        show_id: Uuid,
    ) -> Result<Vec<Seat>, BoxError>;

    async fn find_by_show(&self, show_id: Uuid) -> Result<Vec<Seat>, BoxError>;

    /// Record the pending hold on a seat.
    async fn set_locked(
        &self,
        seat_id: Uuid,
        owner: &str,
        until: DateTime<Utc>,
    ) -> Result<(), BoxError>;

    /// Clear the pending hold, guarded by owner match so a stale clear cannot
    /// wipe a subsequent holder's fields. Returns whether anything was cleared.
    async fn clear_locked(&self, seat_id: Uuid, owner: &str) -> Result<bool, BoxError>;

    /// Reconciliation primitive: clear pending fields on every unbooked seat
    /// whose lease expired before `now`. Returns the number of seats swept.
    async fn clear_expired_locks(&self, now: DateTime<Utc>) -> Result<u64, BoxError>;

    /// Transactionally book the seats: re-fetch filtered by show and
    /// availability, fail with `PartialAvailability` on any mismatch, otherwise
    /// mark all of them booked by `owner` and clear pending fields, all or
    /// nothing.
    async fn book_seats(
        &self,
        seat_ids: &[Uuid],
        show_id: Uuid,
        owner: &str,
    ) -> Result<(), CommitError>;
}
