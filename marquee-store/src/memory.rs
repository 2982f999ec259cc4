use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;
use uuid::Uuid;

use marquee_core::{BoxError, CommitError, LockStore, Seat, SeatRepository};

struct LockEntry {
    value: String,
    expires_at: Instant,
}

/// Single-process lock store. Entries carry an expiry deadline checked on
/// every read, mirroring the store-native TTL of the Redis backend.
#[derive(Default)]
pub struct MemoryLockStore {
    entries: Mutex<HashMap<String, LockEntry>>,
}

impl MemoryLockStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LockStore for MemoryLockStore {
    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> Result<bool, BoxError> {
        let mut entries = self.entries.lock().unwrap();
        let now = Instant::now();
        if let Some(entry) = entries.get(key) {
            if entry.expires_at > now {
                return Ok(false);
            }
        }
        entries.insert(
            key.to_string(),
            LockEntry {
                value: value.to_string(),
                expires_at: now + ttl,
            },
        );
        Ok(true)
    }

    async fn get(&self, key: &str) -> Result<Option<String>, BoxError> {
        let mut entries = self.entries.lock().unwrap();
        match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => Ok(Some(entry.value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn delete(&self, key: &str) -> Result<bool, BoxError> {
        let mut entries = self.entries.lock().unwrap();
        match entries.remove(key) {
            Some(entry) => Ok(entry.expires_at > Instant::now()),
            None => Ok(false),
        }
    }
}

/// Single-process seat repository. Each operation holds the map lock for its
/// whole duration, so `book_seats` is one critical section and overlapping
/// commits serialize exactly like overlapping database transactions.
#[derive(Default)]
pub struct MemorySeatRepository {
    seats: Mutex<HashMap<Uuid, Seat>>,
}

impl MemorySeatRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog setup: register a seat.
    pub fn insert(&self, seat: Seat) {
        self.seats.lock().unwrap().insert(seat.id, seat);
    }

    pub fn get(&self, seat_id: Uuid) -> Option<Seat> {
        self.seats.lock().unwrap().get(&seat_id).cloned()
    }
}

#[async_trait]
impl SeatRepository for MemorySeatRepository {
    async fn find_by_id(&self, seat_id: Uuid) -> Result<Option<Seat>, BoxError> {
        Ok(self.get(seat_id))
    }

    async fn find_by_ids(&self, seat_ids: &[Uuid]) -> Result<Vec<Seat>, BoxError> {
        let seats = self.seats.lock().unwrap();
        Ok(seat_ids
            .iter()
            .filter_map(|id| seats.get(id).cloned())
            .collect())
    }

    async fn find_by_ids_in_show(
        &self,
        seat_ids: &[Uuid],
        show_id: Uuid,
    ) -> Result<Vec<Seat>, BoxError> {
        let seats = self.seats.lock().unwrap();
        Ok(seat_ids
            .iter()
            .filter_map(|id| seats.get(id))
            .filter(|s| s.show_id == show_id)
            .cloned()
            .collect())
    }

    async fn find_by_show(&self, show_id: Uuid) -> Result<Vec<Seat>, BoxError> {
        let seats = self.seats.lock().unwrap();
        let mut result: Vec<Seat> = seats
            .values()
            .filter(|s| s.show_id == show_id)
            .cloned()
            .collect();
        result.sort_by(|a, b| a.number.cmp(&b.number));
        Ok(result)
    }

    async fn set_locked(
        &self,
        seat_id: Uuid,
        owner: &str,
        until: DateTime<Utc>,
    ) -> Result<(), BoxError> {
        let mut seats = self.seats.lock().unwrap();
        if let Some(seat) = seats.get_mut(&seat_id) {
            seat.locked_by = Some(owner.to_string());
            seat.locked_until = Some(until);
        }
        Ok(())
    }

    async fn clear_locked(&self, seat_id: Uuid, owner: &str) -> Result<bool, BoxError> {
        let mut seats = self.seats.lock().unwrap();
        match seats.get_mut(&seat_id) {
            Some(seat) if seat.locked_by.as_deref() == Some(owner) => {
                seat.locked_by = None;
                seat.locked_until = None;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn clear_expired_locks(&self, now: DateTime<Utc>) -> Result<u64, BoxError> {
        let mut seats = self.seats.lock().unwrap();
        let mut swept = 0;
        for seat in seats.values_mut() {
            if !seat.is_booked && seat.locked_by.is_some() && !seat.has_live_lease(now) {
                seat.locked_by = None;
                seat.locked_until = None;
                swept += 1;
            }
        }
        Ok(swept)
    }

    async fn book_seats(
        &self,
        seat_ids: &[Uuid],
        show_id: Uuid,
        owner: &str,
    ) -> Result<(), CommitError> {
        let mut seats = self.seats.lock().unwrap();

        let matched: Vec<Uuid> = seat_ids
            .iter()
            .copied()
            .filter(|id| {
                seats
                    .get(id)
                    .map_or(false, |s| s.show_id == show_id && !s.is_booked)
            })
            .collect();

        if matched.len() != seat_ids.len() {
            return Err(CommitError::PartialAvailability {
                requested: seat_ids.len(),
                matched: matched.len(),
            });
        }

        for id in matched {
            if let Some(seat) = seats.get_mut(&id) {
                seat.is_booked = true;
                seat.booked_by = Some(owner.to_string());
                seat.locked_by = None;
                seat.locked_until = None;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_if_absent_is_exclusive() {
        let store = MemoryLockStore::new();
        let ttl = Duration::from_secs(60);

        assert!(store.set_if_absent("lock:s1", "user-1", ttl).await.unwrap());
        // Second claim loses regardless of owner.
        assert!(!store.set_if_absent("lock:s1", "user-2", ttl).await.unwrap());
        assert!(!store.set_if_absent("lock:s1", "user-1", ttl).await.unwrap());

        assert_eq!(
            store.get("lock:s1").await.unwrap(),
            Some("user-1".to_string())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_expires_after_ttl() {
        let store = MemoryLockStore::new();
        let ttl = Duration::from_secs(60);

        assert!(store.set_if_absent("lock:s1", "user-1", ttl).await.unwrap());

        tokio::time::sleep(Duration::from_secs(61)).await;

        assert_eq!(store.get("lock:s1").await.unwrap(), None);
        // A new owner can claim the expired key.
        assert!(store.set_if_absent("lock:s1", "user-2", ttl).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_reports_liveness() {
        let store = MemoryLockStore::new();
        let ttl = Duration::from_secs(60);

        store.set_if_absent("lock:s1", "user-1", ttl).await.unwrap();
        assert!(store.delete("lock:s1").await.unwrap());
        assert!(!store.delete("lock:s1").await.unwrap());
    }

    #[tokio::test]
    async fn test_book_seats_partial_availability() {
        let repo = MemorySeatRepository::new();
        let show_id = Uuid::new_v4();
        let s1 = Seat::new(show_id, "A1");
        let s2 = Seat::new(show_id, "A2");
        let ids = vec![s1.id, s2.id];
        repo.insert(s1.clone());
        repo.insert(s2.clone());

        // First booking takes both seats.
        repo.book_seats(&ids, show_id, "user-1").await.unwrap();
        assert!(repo.get(s1.id).unwrap().is_booked);

        // Second booking over the same set sees a reduced match count.
        let err = repo.book_seats(&ids, show_id, "user-2").await.unwrap_err();
        match err {
            CommitError::PartialAvailability { requested, matched } => {
                assert_eq!(requested, 2);
                assert_eq!(matched, 0);
            }
            other => panic!("unexpected error: {}", other),
        }
        // Loser left nothing behind.
        assert_eq!(repo.get(s1.id).unwrap().booked_by.as_deref(), Some("user-1"));
    }

    #[tokio::test]
    async fn test_clear_expired_locks_is_owner_guarded() {
        let repo = MemorySeatRepository::new();
        let show_id = Uuid::new_v4();
        let stale = Seat::new(show_id, "A1");
        let fresh = Seat::new(show_id, "A2");
        let now = Utc::now();

        repo.insert(stale.clone());
        repo.insert(fresh.clone());
        repo.set_locked(stale.id, "user-1", now - chrono::Duration::seconds(5))
            .await
            .unwrap();
        repo.set_locked(fresh.id, "user-2", now + chrono::Duration::seconds(60))
            .await
            .unwrap();

        let swept = repo.clear_expired_locks(now).await.unwrap();
        assert_eq!(swept, 1);
        assert_eq!(repo.get(stale.id).unwrap().locked_by, None);
        // The live lease is untouched.
        assert_eq!(
            repo.get(fresh.id).unwrap().locked_by.as_deref(),
            Some("user-2")
        );
    }
}
