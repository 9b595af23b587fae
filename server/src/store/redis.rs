//! Redis-backed store using `fred`.

use std::time::Duration;

use async_trait::async_trait;
use fred::prelude::*;
use tracing::info;

use super::{KvStore, StoreError, StoreResult};

/// Shared Redis connection implementing [`KvStore`].
#[derive(Clone)]
pub struct RedisStore {
    client: Client,
}

impl RedisStore {
    /// Connect to Redis and wait until the connection is usable.
    pub async fn connect(redis_url: &str) -> anyhow::Result<Self> {
        let config = Config::from_url(redis_url)?;
        let client = Client::new(config, None, None, None);
        client.connect();
        client.wait_for_connect().await?;

        info!("Connected to Redis");
        Ok(Self { client })
    }
}

fn backend(e: Error) -> StoreError {
    StoreError::Backend(e.to_string())
}

#[async_trait]
impl KvStore for RedisStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        self.client.get::<Option<String>, _>(key).await.map_err(backend)
    }

    async fn put(&self, key: &str, value: &str, ttl: Option<Duration>) -> StoreResult<()> {
        let expiration = ttl.map(|t| Expiration::EX(t.as_secs().max(1) as i64));
        self.client
            .set::<(), _, _>(key, value, expiration, None, false)
            .await
            .map_err(backend)
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        self.client.del::<i64, _>(key).await.map_err(backend)?;
        Ok(())
    }

    async fn take(&self, key: &str) -> StoreResult<Option<String>> {
        self.client
            .getdel::<Option<String>, _>(key)
            .await
            .map_err(backend)
    }

    fn backend_name(&self) -> &'static str {
        "redis"
    }
}
