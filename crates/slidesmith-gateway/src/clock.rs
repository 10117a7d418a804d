use futures::future::BoxFuture;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Time and sleep as an injected capability so backoff schedules and
/// deadlines are testable without wall-clock waits.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;

    fn sleep(&self, duration: Duration) -> BoxFuture<'_, ()>;
}

/// Real time. Sleeping blocks the current worker thread, which matches how
/// the gateway is driven (worker pool or `block_on`); a reactor-based
/// composition root injects its own timer instead.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            std::thread::sleep(duration);
        })
    }
}

/// Virtual time for tests: `sleep` records the request and advances the
/// clock instantly.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<Instant>,
    sleeps: Mutex<Vec<Duration>>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self {
            now: Mutex::new(Instant::now()),
            sleeps: Mutex::new(Vec::new()),
        }
    }
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, duration: Duration) {
        let mut now = self.now.lock().expect("clock lock");
        *now += duration;
    }

    /// Every sleep requested so far, in order.
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().expect("sleeps lock").clone()
    }

    pub fn total_slept(&self) -> Duration {
        self.sleeps().iter().sum()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock().expect("clock lock")
    }

    fn sleep(&self, duration: Duration) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            self.sleeps.lock().expect("sleeps lock").push(duration);
            self.advance(duration);
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;

    #[test]
    fn manual_clock_advances_on_sleep() {
        let clock = ManualClock::new();
        let before = clock.now();
        block_on(clock.sleep(Duration::from_secs(3)));
        assert_eq!(clock.now() - before, Duration::from_secs(3));
        assert_eq!(clock.sleeps(), vec![Duration::from_secs(3)]);
    }
}
