use std::sync::Arc;

use marquee_booking::BookingQueue;
use marquee_core::SeatRepository;
use marquee_hold::ReservationManager;

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
}

#[derive(Clone)]
pub struct AppState {
    pub seats: Arc<dyn SeatRepository>,
    pub reservations: Arc<ReservationManager>,
    pub bookings: Arc<BookingQueue>,
    pub auth: AuthConfig,
}
