use async_trait::async_trait;
use redis::AsyncCommands;
use std::time::Duration;

use marquee_core::{BoxError, LockStore};

/// Redis-backed lock store. Claims are written SET NX with a server-side TTL,
/// so expiry does not depend on this process staying alive for the duration of
/// the hold.
#[derive(Clone)]
pub struct RedisLockStore {
    client: redis::Client,
}

impl RedisLockStore {
    pub async fn new(connection_string: &str) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(connection_string)?;
        Ok(Self { client })
    }
}

#[async_trait]
impl LockStore for RedisLockStore {
    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> Result<bool, BoxError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        // SET NX: only set if key does not exist
        let result: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("NX")
            .arg("EX")
            .arg(ttl.as_secs())
            .query_async(&mut conn)
            .await?;

        Ok(result.is_some())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, BoxError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn delete(&self, key: &str) -> Result<bool, BoxError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let removed: i64 = conn.del(key).await?;
        Ok(removed > 0)
    }
}
