use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Time source for the poller, injectable so tests never really wait
#[async_trait]
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;

    async fn sleep(&self, duration: Duration);
}

/// Real clock backed by the tokio timer
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Virtual clock: `sleep` returns immediately and moves time forward
#[derive(Clone)]
pub struct FakeClock {
    state: Arc<Mutex<FakeState>>,
}

struct FakeState {
    now: Instant,
    sleeps: Vec<Duration>,
}

impl FakeClock {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(FakeState {
                now: Instant::now(),
                sleeps: Vec::new(),
            })),
        }
    }

    /// Move time forward without recording a sleep
    pub fn advance(&self, duration: Duration) {
        let mut state = self.state.lock().unwrap();
        state.now = state.now.checked_add(duration).unwrap_or(state.now);
    }

    /// Every duration passed to `sleep`, in order
    pub fn sleeps(&self) -> Vec<Duration> {
        self.state.lock().unwrap().sleeps.clone()
    }

    pub fn total_slept(&self) -> Duration {
        self.state
            .lock()
            .unwrap()
            .sleeps
            .iter()
            .fold(Duration::ZERO, |total, sleep| total.saturating_add(*sleep))
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Clock for FakeClock {
    fn now(&self) -> Instant {
        self.state.lock().unwrap().now
    }

    async fn sleep(&self, duration: Duration) {
        let mut state = self.state.lock().unwrap();
        // Instant has no maximum; a sleep past its range leaves time where it is
        state.now = state.now.checked_add(duration).unwrap_or(state.now);
        state.sleeps.push(duration);
    }
}
