use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use marquee_api::{
    app,
    state::{AppState, AuthConfig},
};
use marquee_booking::{BookingQueue, PipelineConfig};
use marquee_core::{LockStore, SeatRepository};
use marquee_hold::{LeaseSweeper, ReservationManager};
use marquee_store::{DbClient, PgSeatRepository, RedisLockStore};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "marquee_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = marquee_store::app_config::Config::load().expect("Failed to load config");
    tracing::info!("Starting Marquee API on port {}", config.server.port);

    let db = DbClient::new(&config.database.url)
        .await
        .expect("Failed to connect to Postgres");
    db.migrate().await.expect("Failed to run migrations");

    let redis = RedisLockStore::new(&config.redis.url)
        .await
        .expect("Failed to connect to Redis");

    let seats: Arc<dyn SeatRepository> = Arc::new(PgSeatRepository::new(db.pool.clone()));
    let locks: Arc<dyn LockStore> = Arc::new(redis);

    let reservations = Arc::new(ReservationManager::new(
        locks.clone(),
        seats.clone(),
        Duration::from_secs(config.booking.seat_lock_seconds),
    ));

    let sweeper = LeaseSweeper::start(
        seats.clone(),
        Duration::from_secs(config.booking.sweep_interval_seconds),
    );

    let bookings = Arc::new(BookingQueue::start(
        PipelineConfig {
            workers: config.booking.queue_workers,
            max_attempts: config.booking.max_attempts,
            retry_delay: Duration::from_millis(config.booking.retry_delay_ms),
        },
        seats.clone(),
        locks.clone(),
    ));

    let app_state = AppState {
        seats,
        reservations,
        bookings: bookings.clone(),
        auth: AuthConfig {
            secret: config.auth.jwt_secret.clone(),
        },
    };

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind listener");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // Stop intake and drain accepted bookings before exiting.
    bookings.shutdown().await;
    sweeper.stop();
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("Shutdown signal received");
}
