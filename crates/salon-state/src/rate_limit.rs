use deadpool_redis::Pool;
use redis::AsyncCommands;
use tracing::instrument;

use salon_core::config::RATE_LIMIT_PER_MINUTE;

use crate::error::Result;

/// Fixed-window rate limiter (§5): bucket key = `IP + minute`, limit
/// `RATE_LIMIT_PER_MINUTE` requests. Shares the checkpoint store's Redis
/// deployment rather than standing up separate infrastructure.
#[derive(Clone)]
pub struct RateLimiter {
    pool: Pool,
}

impl RateLimiter {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    fn bucket_key(ip: &str, minute_epoch: i64) -> String {
        format!("ratelimit:{ip}:{minute_epoch}")
    }

    /// Increment the counter for `ip` in the current UTC minute and report
    /// whether the caller is still within budget. The edge exempts
    /// authenticated admin routes and `/health` (§5) — this type has no
    /// opinion on that, callers decide whether to consult it at all.
    #[instrument(skip(self))]
    pub async fn check(&self, ip: &str) -> Result<bool> {
        let minute_epoch = chrono::Utc::now().timestamp() / 60;
        let key = Self::bucket_key(ip, minute_epoch);

        let mut conn = self.pool.get().await?;
        let count: i64 = conn.incr(&key, 1).await?;
        if count == 1 {
            // First hit in this window — set the bucket to expire once the
            // minute is over so it doesn't accumulate forever.
            let _: () = conn.expire(&key, 60).await?;
        }
        Ok(count <= RATE_LIMIT_PER_MINUTE as i64)
    }
}

#[cfg(test)]
mod tests {
    // Exercised against a live Redis in integration tests; the fixed-window
    // math itself (`count <= LIMIT`) is covered indirectly by `check`'s
    // single conditional and needs no further unit test here.
}
