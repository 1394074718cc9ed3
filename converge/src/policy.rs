use crate::error::PolicyError;
use rand::Rng;
use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// Retry budget for one poll
///
/// `retries` is the number of fetch attempts, not the number of re-tries
/// after the first one. `timeout`, when set, is an overall deadline measured
/// on the injected clock; whichever bound is hit first ends the poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PollPolicy {
    pub retries: u32,
    pub delay: Duration,
    pub timeout: Option<Duration>,
    pub jitter: bool,
}

impl PollPolicy {
    pub fn new(retries: u32, delay: Duration) -> Self {
        Self {
            retries,
            delay,
            timeout: None,
            jitter: false,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Scale each delay by a random factor in [0.5, 1.5)
    pub fn with_jitter(mut self) -> Self {
        self.jitter = true;
        self
    }

    pub fn validate(&self) -> Result<(), PolicyError> {
        if self.retries == 0 {
            return Err(PolicyError::ZeroRetries);
        }
        Ok(())
    }

    /// Longest the retry count alone allows the poll to wait
    pub fn budget(&self) -> Duration {
        self.delay.saturating_mul(self.retries.saturating_sub(1))
    }

    /// True when a timeout is set but the retry count always runs out first
    pub fn timeout_unreachable(&self) -> bool {
        !self.jitter && self.timeout.is_some_and(|timeout| self.budget() < timeout)
    }

    /// Delay before the next attempt, jittered if enabled
    pub fn next_delay(&self) -> Duration {
        if !self.jitter {
            return self.delay;
        }

        let factor = rand::thread_rng().gen_range(0.5..1.5);
        Duration::try_from_secs_f64(self.delay.as_secs_f64() * factor).unwrap_or(Duration::MAX)
    }
}

impl fmt::Display for PollPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} attempts every {:?}", self.retries, self.delay)?;
        if let Some(timeout) = self.timeout {
            write!(f, ", timeout {:?}", timeout)?;
        }
        if self.jitter {
            write!(f, ", jittered")?;
        }
        Ok(())
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::new(30, Duration::from_secs(10))
    }
}
