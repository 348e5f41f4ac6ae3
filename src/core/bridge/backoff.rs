use crate::domain::config::{BackoffStrategy, ReconnectConfig};
use std::time::Duration;

/// Delay schedule between reconnection attempts
#[derive(Debug, Clone, PartialEq)]
pub struct Backoff {
    strategy: BackoffStrategy,
    initial: Duration,
    max: Duration,
    multiplier: f64,
}

impl Backoff {
    pub fn new(strategy: BackoffStrategy, initial: Duration, max: Duration, multiplier: f64) -> Self {
        Self {
            strategy,
            initial,
            max: max.max(initial),
            multiplier: multiplier.max(1.0),
        }
    }

    pub fn from_config(config: &ReconnectConfig) -> Self {
        Self::new(
            config.strategy,
            Duration::from_millis(config.initial_delay_ms),
            Duration::from_millis(config.max_delay_ms),
            config.multiplier,
        )
    }

    /// Delay before the given attempt, counting from 1.
    pub fn delay(&self, attempt: u32) -> Duration {
        match self.strategy {
            BackoffStrategy::Fixed => self.initial,
            BackoffStrategy::Exponential => {
                let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
                let scaled = self.initial.as_secs_f64() * self.multiplier.powi(exponent);
                if scaled.is_finite() && scaled < self.max.as_secs_f64() {
                    Duration::from_secs_f64(scaled)
                } else {
                    self.max
                }
            }
        }
    }

    /// Delays for attempts `1..=attempts`.
    pub fn schedule(&self, attempts: u32) -> impl Iterator<Item = Duration> + '_ {
        (1..=attempts).map(move |attempt| self.delay(attempt))
    }
}
