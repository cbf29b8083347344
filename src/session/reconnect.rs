//! Reconnect backoff math, isolated so it can be tested without a socket.

use std::time::Duration;

/// Delay before attempt `k` (1-indexed): `base * 2^(k-1)`.
pub fn backoff_delay(attempt: u32, base_ms: u64) -> Duration {
    let attempt = attempt.max(1);
    let factor = 1u64.checked_shl(attempt - 1).unwrap_or(u64::MAX);
    Duration::from_millis(base_ms.saturating_mul(factor))
}
