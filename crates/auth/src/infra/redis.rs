//! Redis-backed TTL store
//!
//! The production implementation of [`TtlStore`]. All conditional
//! operations run as Lua scripts so they are atomic on the server, which is
//! what the lockout, rotation and single-use guarantees lean on when
//! multiple instances share one Redis.

use platform::store::{StoreError, StoreResult, TtlStore};
use redis::aio::ConnectionManager;
use redis::Script;
use std::time::Duration;

// INCR, stamping the window TTL only when the key is created
const INCR_WITH_TTL: &str = r#"
local v = redis.call('INCR', KEYS[1])
if v == 1 then
    redis.call('PEXPIRE', KEYS[1], ARGV[1])
end
return v
"#;

const COMPARE_AND_DELETE: &str = r#"
if redis.call('GET', KEYS[1]) == ARGV[1] then
    return redis.call('DEL', KEYS[1])
end
return 0
"#;

const COMPARE_AND_SWAP: &str = r#"
if redis.call('GET', KEYS[1]) == ARGV[1] then
    redis.call('SET', KEYS[1], ARGV[2], 'PX', ARGV[3])
    return 1
end
return 0
"#;

/// Shared TTL store on Redis
#[derive(Clone)]
pub struct RedisTtlStore {
    conn: ConnectionManager,
}

impl RedisTtlStore {
    /// Connect to Redis at `url` (e.g. `redis://127.0.0.1:6379`)
    pub async fn connect(url: &str) -> StoreResult<Self> {
        let client = redis::Client::open(url).map_err(unavailable)?;
        let conn = ConnectionManager::new(client).await.map_err(unavailable)?;
        tracing::info!("Connected to Redis");
        Ok(Self { conn })
    }

    pub fn from_connection(conn: ConnectionManager) -> Self {
        Self { conn }
    }
}

fn unavailable(err: redis::RedisError) -> StoreError {
    StoreError::Unavailable(err.to_string())
}

fn ttl_millis(ttl: Duration) -> u64 {
    // Sub-millisecond TTLs round up so a key never lives forever by accident
    (ttl.as_millis() as u64).max(1)
}

impl TtlStore for RedisTtlStore {
    async fn incr_with_ttl(&self, key: &str, ttl: Duration) -> StoreResult<i64> {
        let mut conn = self.conn.clone();
        Script::new(INCR_WITH_TTL)
            .key(key)
            .arg(ttl_millis(ttl))
            .invoke_async(&mut conn)
            .await
            .map_err(unavailable)
    }

    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<()> {
        let mut conn = self.conn.clone();
        redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("PX")
            .arg(ttl_millis(ttl))
            .query_async::<_, ()>(&mut conn)
            .await
            .map_err(unavailable)
    }

    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<bool> {
        let mut conn = self.conn.clone();
        let reply: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("NX")
            .arg("PX")
            .arg(ttl_millis(ttl))
            .query_async(&mut conn)
            .await
            .map_err(unavailable)?;
        Ok(reply.is_some())
    }

    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let mut conn = self.conn.clone();
        redis::cmd("GET")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(unavailable)
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        let mut conn = self.conn.clone();
        redis::cmd("DEL")
            .arg(key)
            .query_async::<_, ()>(&mut conn)
            .await
            .map_err(unavailable)
    }

    async fn compare_and_delete(&self, key: &str, expected: &str) -> StoreResult<bool> {
        let mut conn = self.conn.clone();
        let deleted: i64 = Script::new(COMPARE_AND_DELETE)
            .key(key)
            .arg(expected)
            .invoke_async(&mut conn)
            .await
            .map_err(unavailable)?;
        Ok(deleted == 1)
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        expected: &str,
        new: &str,
        ttl: Duration,
    ) -> StoreResult<bool> {
        let mut conn = self.conn.clone();
        let swapped: i64 = Script::new(COMPARE_AND_SWAP)
            .key(key)
            .arg(expected)
            .arg(new)
            .arg(ttl_millis(ttl))
            .invoke_async(&mut conn)
            .await
            .map_err(unavailable)?;
        Ok(swapped == 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ttl_millis_never_zero() {
        assert_eq!(ttl_millis(Duration::from_nanos(1)), 1);
        assert_eq!(ttl_millis(Duration::from_secs(2)), 2000);
    }
}
