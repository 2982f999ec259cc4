use uuid::Uuid;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Synchronous-path failures of the reservation manager. All of these are
/// surfaced to the caller as immediate rejections; none leave side effects.
#[derive(Debug, thiserror::Error)]
pub enum HoldError {
    #[error("Seat not found: {0}")]
    SeatNotFound(Uuid),

    #[error("Seat {0} is already locked")]
    AlreadyLocked(Uuid),

    #[error("Seat {0} is already booked")]
    AlreadyBooked(Uuid),

    #[error("Seat {0} is locked by another user")]
    NotOwner(Uuid),

    #[error("Lock store unavailable: {0}")]
    Store(#[source] BoxError),
}

/// Enqueue-time failures of the booking pipeline.
#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("Booking request contains no seats")]
    EmptyRequest,

    #[error("Seat {seat_id} does not belong to show {show_id}")]
    SeatNotInShow { seat_id: Uuid, show_id: Uuid },

    #[error("Seat {0} is no longer held by the caller")]
    LockNotHeld(Uuid),

    #[error("Booking queue is not accepting jobs")]
    QueueClosed,

    #[error("Store unavailable: {0}")]
    Store(#[source] BoxError),
}

/// Failures of the transactional commit inside the seat repository. A
/// `PartialAvailability` means some targeted seat was booked out from under the
/// job or reassigned; the transaction rolled back with nothing half-updated.
#[derive(Debug, thiserror::Error)]
pub enum CommitError {
    #[error("Only {matched} of {requested} seats are still available for this show")]
    PartialAvailability { requested: usize, matched: usize },

    #[error(transparent)]
    Backend(BoxError),
}
