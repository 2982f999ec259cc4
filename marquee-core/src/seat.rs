use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A bookable seat for a specific show.
///
/// Invariant: a booked seat never carries pending lock fields, and at most one
/// of `booked_by` / `locked_by` is set at any instant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Seat {
    pub id: Uuid,
    pub show_id: Uuid,
    pub number: String,
    pub is_booked: bool,
    pub booked_by: Option<String>,
    pub locked_by: Option<String>,
    pub locked_until: Option<DateTime<Utc>>,
}

impl Seat {
    pub fn new(show_id: Uuid, number: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            show_id,
            number: number.into(),
            is_booked: false,
            booked_by: None,
            locked_by: None,
            locked_until: None,
        }
    }

    /// A lease is live while a holder is recorded and its expiry is in the future.
    /// Readers must treat an expired lease as cleared even before the sweeper
    /// gets to it.
    pub fn has_live_lease(&self, now: DateTime<Utc>) -> bool {
        match (&self.locked_by, self.locked_until) {
            (Some(_), Some(until)) => until > now,
            _ => false,
        }
    }
}

/// Lock entries are keyed by seat id under a fixed prefix.
pub fn lock_key(seat_id: Uuid) -> String {
    format!("lock:{}", seat_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_lease_liveness() {
        let now = Utc::now();
        let mut seat = Seat::new(Uuid::new_v4(), "A1");
        assert!(!seat.has_live_lease(now));

        seat.locked_by = Some("user-1".to_string());
        seat.locked_until = Some(now + Duration::seconds(60));
        assert!(seat.has_live_lease(now));

        seat.locked_until = Some(now - Duration::seconds(1));
        assert!(!seat.has_live_lease(now));
    }

    #[test]
    fn test_lock_key_format() {
        let id = Uuid::new_v4();
        assert_eq!(lock_key(id), format!("lock:{}", id));
    }
}
