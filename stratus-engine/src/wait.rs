//! Wait strategies between retry attempts.

use std::time::Duration;
use stratus_core::Response;

/// Strategy for how long to wait before the next attempt.
#[derive(Debug, Clone)]
pub enum WaitStrategy {
    /// No waiting.
    None,
    /// Fixed delay.
    Fixed(Duration),
    /// Linearly increasing delay.
    Linear {
        /// Initial delay.
        initial: Duration,
        /// Increment per attempt.
        increment: Duration,
        /// Maximum delay.
        max: Duration,
    },
    /// Exponential backoff.
    Exponential {
        /// Initial delay.
        initial: Duration,
        /// Maximum delay.
        max: Duration,
        /// Multiplier for each attempt.
        multiplier: f64,
    },
    /// Exponential backoff with jitter.
    ExponentialJitter {
        /// Initial delay.
        initial: Duration,
        /// Maximum delay.
        max: Duration,
        /// Multiplier for each attempt.
        multiplier: f64,
        /// Jitter factor (0.0 to 1.0).
        jitter: f64,
    },
    /// Respect the server's `Retry-After` when present.
    RetryAfter {
        /// Fallback when the server sent none.
        fallback: Box<WaitStrategy>,
        /// Maximum wait time.
        max_wait: Duration,
    },
}

impl Default for WaitStrategy {
    fn default() -> Self {
        WaitStrategy::Exponential {
            initial: Duration::from_millis(50),
            max: Duration::from_secs(10),
            multiplier: 2.0,
        }
    }
}

impl WaitStrategy {
    /// Calculate the wait before attempt `attempt + 1` (1-indexed failures).
    pub fn calculate(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        let attempt = attempt.max(1);
        match self {
            WaitStrategy::None => Duration::ZERO,
            WaitStrategy::Fixed(delay) => *delay,
            WaitStrategy::Linear {
                initial,
                increment,
                max,
            } => {
                let delay = *initial + *increment * (attempt - 1);
                delay.min(*max)
            }
            WaitStrategy::Exponential {
                initial,
                max,
                multiplier,
            } => {
                let delay = initial.as_secs_f64() * multiplier.powi(attempt as i32 - 1);
                Duration::from_secs_f64(delay.min(max.as_secs_f64()))
            }
            WaitStrategy::ExponentialJitter {
                initial,
                max,
                multiplier,
                jitter,
            } => {
                let base = initial.as_secs_f64() * multiplier.powi(attempt as i32 - 1);
                let jitter_amount = base * jitter * random_jitter();
                let delay = (base + jitter_amount).min(max.as_secs_f64());
                Duration::from_secs_f64(delay.max(0.0))
            }
            WaitStrategy::RetryAfter { fallback, max_wait } => retry_after
                .map(|d| d.min(*max_wait))
                .unwrap_or_else(|| fallback.calculate(attempt, None)),
        }
    }
}

/// Parse a `Retry-After` response header (delta-seconds form).
pub fn retry_after(response: &Response) -> Option<Duration> {
    response
        .headers()
        .get("retry-after")
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

/// Random jitter factor between -1.0 and 1.0.
fn random_jitter() -> f64 {
    use rand::Rng;
    let mut rng = rand::thread_rng();
    rng.gen_range(-1.0..1.0)
}
