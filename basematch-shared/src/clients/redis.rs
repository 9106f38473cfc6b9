use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

/// Fixed-window rate limiting keyed by an arbitrary string.
#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Counts one hit against `key` and reports whether it is within `limit`
    /// hits per `window_secs`.
    async fn check(&self, key: &str, limit: u64, window_secs: u64) -> Result<bool, String>;
}

#[derive(Clone)]
pub struct RedisClient {
    conn: ConnectionManager,
}

impl RedisClient {
    pub async fn connect(url: &str) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(url)?;
        let conn = client.get_connection_manager().await?;
        tracing::info!("connected to Redis");
        Ok(Self { conn })
    }
}

#[async_trait]
impl RateLimiter for RedisClient {
    async fn check(&self, key: &str, limit: u64, window_secs: u64) -> Result<bool, String> {
        let mut conn = self.conn.clone();
        let count: u64 = conn
            .incr(key, 1u64)
            .await
            .map_err(|e| format!("rate limit check failed: {e}"))?;
        // First hit opens the window.
        if count == 1 {
            conn.expire::<_, ()>(key, window_secs as i64)
                .await
                .map_err(|e| format!("rate limit expiry failed: {e}"))?;
        }
        Ok(count <= limit)
    }
}
