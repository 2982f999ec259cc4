use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use uuid::Uuid;

use marquee_core::{lock_key, HoldError, LockStore, SeatRepository};

/// The lease granted to a successful acquirer.
#[derive(Debug, Clone, Serialize)]
pub struct SeatLock {
    pub seat_id: Uuid,
    pub owner: String,
    pub expires_at: DateTime<Utc>,
}

/// Synchronous-path lock lifecycle: acquire, release, inspect. The manager is
/// the only writer of seat pending fields besides the sweeper.
pub struct ReservationManager {
    locks: Arc<dyn LockStore>,
    seats: Arc<dyn SeatRepository>,
    ttl: Duration,
}

impl ReservationManager {
    pub fn new(locks: Arc<dyn LockStore>, seats: Arc<dyn SeatRepository>, ttl: Duration) -> Self {
        Self { locks, seats, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Take an exclusive short-lived hold on a seat.
    ///
    /// The `set_if_absent` write is the sole arbiter between racing acquirers;
    /// the preceding checks only produce the more specific rejections. The
    /// pending-field write follows the claim, so a reader can briefly see a
    /// lock entry without the mirror write, never the reverse.
    pub async fn acquire(&self, seat_id: Uuid, owner: &str) -> Result<SeatLock, HoldError> {
        let seat = self
            .seats
            .find_by_id(seat_id)
            .await
            .map_err(HoldError::Store)?
            .ok_or(HoldError::SeatNotFound(seat_id))?;

        let key = lock_key(seat_id);

        if self
            .locks
            .get(&key)
            .await
            .map_err(HoldError::Store)?
            .is_some()
        {
            return Err(HoldError::AlreadyLocked(seat_id));
        }
        if seat.is_booked {
            return Err(HoldError::AlreadyBooked(seat_id));
        }

        if !self
            .locks
            .set_if_absent(&key, owner, self.ttl)
            .await
            .map_err(HoldError::Store)?
        {
            // Lost the race after the advisory check.
            return Err(HoldError::AlreadyLocked(seat_id));
        }

        let expires_at = Utc::now() + chrono::Duration::seconds(self.ttl.as_secs() as i64);

        if let Err(e) = self.seats.set_locked(seat_id, owner, expires_at).await {
            // Roll the claim back so the seat is not stuck until TTL.
            let _ = self.locks.delete(&key).await;
            return Err(HoldError::Store(e));
        }

        info!("Seat {} locked by {} until {}", seat_id, owner, expires_at);
        Ok(SeatLock {
            seat_id,
            owner: owner.to_string(),
            expires_at,
        })
    }

    /// Give a hold back. Releasing a lock that no longer exists (or already
    /// expired) is a no-op success.
    pub async fn release(&self, seat_id: Uuid, owner: &str) -> Result<(), HoldError> {
        let key = lock_key(seat_id);

        match self.locks.get(&key).await.map_err(HoldError::Store)? {
            Some(holder) if holder != owner => return Err(HoldError::NotOwner(seat_id)),
            Some(_) => {
                self.locks.delete(&key).await.map_err(HoldError::Store)?;
            }
            None => {}
        }

        self.seats
            .clear_locked(seat_id, owner)
            .await
            .map_err(HoldError::Store)?;

        info!("Seat {} released by {}", seat_id, owner);
        Ok(())
    }

    /// Current live lock owner for a seat, if any.
    pub async fn holder(&self, seat_id: Uuid) -> Result<Option<String>, HoldError> {
        self.locks
            .get(&lock_key(seat_id))
            .await
            .map_err(HoldError::Store)
    }
}
