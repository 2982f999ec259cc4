pub mod error;
pub mod job;
pub mod seat;
pub mod store;

pub use error::{BookingError, BoxError, CommitError, HoldError};
pub use job::{BookingEvent, BookingJob, JobStatus};
pub use seat::{lock_key, Seat};
pub use store::{LockStore, SeatRepository};
