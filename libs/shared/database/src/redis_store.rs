use async_trait::async_trait;
use deadpool_redis::{Config, Connection, Pool, Runtime};
use redis::AsyncCommands;
use tracing::{debug, info};

use crate::store::{KeyValueStore, Versioned};
use crate::StoreError;

const VERSION_PREFIX: &str = "__version:";

const COMPARE_AND_SET: &str = r#"
local current = tonumber(redis.call('GET', KEYS[2]) or '0')
if current ~= tonumber(ARGV[1]) then
    return 0
end
redis.call('SET', KEYS[1], ARGV[2])
redis.call('SET', KEYS[2], current + 1)
return 1
"#;

/// Redis-backed store. Every value key has a sibling `__version:{key}` counter that the
/// compare-and-set script checks and bumps atomically.
pub struct RedisStore {
    pool: Pool,
    compare_and_set: redis::Script,
}

impl RedisStore {
    pub async fn new(redis_url: &str) -> Result<Self, StoreError> {
        let cfg = Config::from_url(redis_url);
        let pool = cfg
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| StoreError::Unavailable(format!("Pool creation error: {}", e)))?;

        // Test connection
        let mut conn = pool.get().await?;
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        info!("Redis store initialized successfully");

        Ok(Self {
            pool,
            compare_and_set: redis::Script::new(COMPARE_AND_SET),
        })
    }

    async fn connection(&self) -> Result<Connection, StoreError> {
        Ok(self.pool.get().await?)
    }

    fn version_key(key: &str) -> String {
        format!("{}{}", VERSION_PREFIX, key)
    }
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.connection().await?;
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str, ttl_seconds: Option<u64>) -> Result<(), StoreError> {
        let mut conn = self.connection().await?;
        let version_key = Self::version_key(key);

        let mut pipe = redis::pipe();
        pipe.atomic();
        match ttl_seconds {
            Some(ttl) => {
                pipe.cmd("SET").arg(key).arg(value).arg("EX").arg(ttl).ignore();
                pipe.cmd("INCR").arg(&version_key).ignore();
                pipe.cmd("EXPIRE").arg(&version_key).arg(ttl).ignore();
            }
            None => {
                pipe.cmd("SET").arg(key).arg(value).ignore();
                pipe.cmd("INCR").arg(&version_key).ignore();
            }
        }
        let _: () = pipe.query_async(&mut conn).await?;

        debug!("Set {} (ttl: {:?})", key, ttl_seconds);
        Ok(())
    }

    async fn set_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl_seconds: Option<u64>,
    ) -> Result<bool, StoreError> {
        let mut conn = self.connection().await?;

        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(value).arg("NX");
        if let Some(ttl) = ttl_seconds {
            cmd.arg("EX").arg(ttl);
        }

        let reply: Option<String> = cmd.query_async(&mut conn).await?;
        Ok(reply.is_some())
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        let mut conn = self.connection().await?;
        let version_key = Self::version_key(key);

        let (removed,): (i64,) = redis::pipe()
            .atomic()
            .cmd("DEL")
            .arg(key)
            .cmd("INCR")
            .arg(&version_key)
            .ignore()
            .query_async(&mut conn)
            .await?;

        Ok(removed > 0)
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>, StoreError> {
        let mut conn = self.connection().await?;
        let mut keys: Vec<String> = conn.keys(pattern).await?;
        keys.retain(|key| !key.starts_with(VERSION_PREFIX));
        keys.sort();
        Ok(keys)
    }

    async fn get_versioned(&self, key: &str) -> Result<Versioned, StoreError> {
        let mut conn = self.connection().await?;
        let version_key = Self::version_key(key);

        let (value, version): (Option<String>, Option<String>) = redis::cmd("MGET")
            .arg(key)
            .arg(&version_key)
            .query_async(&mut conn)
            .await?;

        let version = version
            .as_deref()
            .and_then(|raw| raw.parse::<u64>().ok())
            .unwrap_or(0);

        Ok(Versioned { value, version })
    }

    async fn compare_and_set(
        &self,
        key: &str,
        expected_version: u64,
        value: &str,
    ) -> Result<bool, StoreError> {
        let mut conn = self.connection().await?;
        let version_key = Self::version_key(key);

        let applied: i64 = self
            .compare_and_set
            .key(key)
            .key(&version_key)
            .arg(expected_version)
            .arg(value)
            .invoke_async(&mut conn)
            .await?;

        Ok(applied == 1)
    }
}
