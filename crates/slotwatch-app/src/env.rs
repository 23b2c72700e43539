//! Production environment.

use std::{future::Future, time::Duration};

use chrono::{DateTime, Utc};
use rand::RngCore;
use slotwatch_core::Environment;

/// Tokio clock, system wall clock, OS randomness.
///
/// `now` reads tokio's clock so paused-time tests drive heartbeats too.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemEnv;

impl Environment for SystemEnv {
    fn now(&self) -> std::time::Instant {
        tokio::time::Instant::now().into_std()
    }

    fn wall_clock(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }

    fn random_bytes(&self, buffer: &mut [u8]) {
        rand::thread_rng().fill_bytes(buffer);
    }
}
