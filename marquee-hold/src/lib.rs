pub mod manager;
pub mod sweeper;

pub use manager::{ReservationManager, SeatLock};
pub use sweeper::LeaseSweeper;
