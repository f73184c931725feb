// Interval clock
// Drives playback by invoking a callback at a fixed period on a dedicated
// thread. Deadlines are computed from the start instant rather than by
// sleeping the period, so long callbacks do not accumulate drift.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Shared flag that stops a running clock
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Fixed-period callback timer backed by a spawned thread
///
/// The callback receives the number of completed ticks (0 on the first
/// call) and returns whether the clock should keep running.
pub struct IntervalClock {
    token: CancelToken,
    handle: Option<JoinHandle<()>>,
}

impl IntervalClock {
    /// Start ticking `on_tick` every `period` until it returns false or
    /// the clock is cancelled
    pub fn start<F>(period: Duration, mut on_tick: F) -> Self
    where
        F: FnMut(u64) -> bool + Send + 'static,
    {
        assert!(!period.is_zero(), "clock period must be > 0");
        let token = CancelToken::default();
        let thread_token = token.clone();
        let handle = thread::Builder::new()
            .name("interval-clock".into())
            .spawn(move || {
                let origin = Instant::now();
                let mut count: u64 = 0;
                loop {
                    let deadline = origin + period.mul_f64((count + 1) as f64);
                    while Instant::now() < deadline {
                        if thread_token.is_cancelled() {
                            return;
                        }
                        // short sleep keeps cancellation prompt
                        thread::sleep(Duration::from_millis(1).min(period));
                    }
                    if thread_token.is_cancelled() || !on_tick(count) {
                        return;
                    }
                    count += 1;
                }
            })
            .unwrap_or_else(|err| panic!("failed to spawn clock thread: {err}"));
        Self {
            token,
            handle: Some(handle),
        }
    }

    pub fn token(&self) -> CancelToken {
        self.token.clone()
    }

    /// Stop the clock and wait for the thread to exit
    pub fn cancel(&mut self) {
        self.token.cancel();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("clock thread panicked");
            }
        }
    }
}

impl Drop for IntervalClock {
    fn drop(&mut self) {
        self.cancel();
    }
}
