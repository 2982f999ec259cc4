pub mod app_config;
pub mod database;
pub mod memory;
pub mod redis_repo;
pub mod seat_repo;

pub use database::DbClient;
pub use memory::{MemoryLockStore, MemorySeatRepository};
pub use redis_repo::RedisLockStore;
pub use seat_repo::PgSeatRepository;
