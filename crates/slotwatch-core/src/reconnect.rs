//! Reconnect backoff policy.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::ClientError;

/// Geometric backoff for push channel reconnects.
///
/// Attempt `a` (1-based) waits `base_delay * multiplier^(a-1)`. After
/// `max_attempts` consecutive failures the connection gives up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconnectPolicy {
    /// Delay before the first retry
    #[serde(with = "millis")]
    pub base_delay: Duration,
    /// Retries allowed before entering `Failed`
    pub max_attempts: u32,
    /// Growth factor between consecutive retries
    pub multiplier: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self { base_delay: Duration::from_millis(1000), max_attempts: 5, multiplier: 2 }
    }
}

impl ReconnectPolicy {
    /// Delay before retry `attempt` (1-based). Attempt 0 is treated as 1.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1);
        let factor = self.multiplier.max(1).saturating_pow(exponent);
        self.base_delay.saturating_mul(factor)
    }

    /// Every retry delay in order, one per allowed attempt.
    pub fn schedule(&self) -> Vec<Duration> {
        (1..=self.max_attempts).map(|attempt| self.delay_for(attempt)).collect()
    }

    /// Reject policies that could never reconnect or would retry in a tight
    /// loop.
    pub fn validate(&self) -> Result<(), ClientError> {
        if self.max_attempts == 0 {
            return Err(ClientError::InvalidConfig {
                field: "reconnect.max_attempts",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.base_delay.is_zero() {
            return Err(ClientError::InvalidConfig {
                field: "reconnect.base_delay_ms",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.multiplier == 0 {
            return Err(ClientError::InvalidConfig {
                field: "reconnect.multiplier",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
