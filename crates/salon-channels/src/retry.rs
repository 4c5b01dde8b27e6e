//! Exponential backoff for transient-external errors (§7 category 2:
//! "retried with exponential backoff 2-10s, up to 3 attempts"). Grounded on
//! the teacher's `connect_with_backoff`/`jitter_secs` channel-reconnect
//! helper, re-tuned to this spec's schedule and attempt count rather than
//! the original's 5s/300s/10-attempt reconnect loop.

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::warn;

use crate::error::ChannelError;

const BASE_DELAY_SECS: u64 = 2;
const MAX_DELAY_SECS: u64 = 10;
const MAX_ATTEMPTS: u32 = 3;
const JITTER_FRACTION: f64 = 0.10;

fn jitter_secs(base_secs: u64) -> u64 {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    let max_jitter = ((base_secs as f64) * JITTER_FRACTION) as u64;
    if max_jitter == 0 {
        return 0;
    }
    (nanos as u64) % max_jitter
}

/// Run `op`, retrying up to `MAX_ATTEMPTS` times on a transient error with
/// backoff `2s → 4s → ... → 10s (cap)`, each with ±10% jitter. A
/// non-transient error (4xx, malformed body, bad config) returns
/// immediately without retrying.
pub async fn retry_with_backoff<F, Fut, T>(dependency: &'static str, mut op: F) -> Result<T, ChannelError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ChannelError>>,
{
    let mut delay_secs = BASE_DELAY_SECS;

    for attempt in 1..=MAX_ATTEMPTS {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt == MAX_ATTEMPTS || !e.is_transient() => return Err(e),
            Err(e) => {
                let total = delay_secs + jitter_secs(delay_secs);
                warn!(
                    dependency,
                    attempt,
                    max = MAX_ATTEMPTS,
                    error = %e,
                    retry_after_secs = total,
                    "transient error, retrying with backoff"
                );
                sleep(Duration::from_secs(total)).await;
                delay_secs = (delay_secs * 2).min(MAX_DELAY_SECS);
            }
        }
    }

    unreachable!("retry loop exited without returning")
}
