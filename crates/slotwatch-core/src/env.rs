//! Environment abstraction.
//!
//! Everything the client needs from the outside world that is not I/O:
//! monotonic time for timers and heartbeats, wall-clock time for log
//! timestamps, sleeping, and randomness. Production wires this to tokio and
//! the system clock; tests substitute virtual time and a seeded RNG.

use std::{
    future::Future,
    time::{Duration, Instant},
};

use chrono::{DateTime, Utc};

/// Time and randomness provider.
pub trait Environment: Clone + Send + Sync + 'static {
    /// Monotonic time, used for heartbeat scheduling.
    fn now(&self) -> Instant;

    /// Wall-clock time, used to timestamp log entries.
    fn wall_clock(&self) -> DateTime<Utc>;

    /// Sleep for `duration`.
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send;

    /// Fill `buffer` with random bytes.
    fn random_bytes(&self, buffer: &mut [u8]);

    /// A random `u32`.
    fn random_u32(&self) -> u32 {
        let mut bytes = [0u8; 4];
        self.random_bytes(&mut bytes);
        u32::from_le_bytes(bytes)
    }
}
