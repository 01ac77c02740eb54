use std::sync::Mutex;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, bounded};

/// Shared cap on in-flight provider requests plus a minimum spacing between request starts.
///
/// Permits live in a bounded channel: acquiring receives a token, dropping the permit sends it
/// back.
#[derive(Debug)]
pub struct RequestLimiter {
    tx: Sender<()>,
    rx: Receiver<()>,
    min_interval: Duration,
    last_start: Mutex<Option<Instant>>,
}

/// A held request slot. Released on drop.
#[derive(Debug)]
pub struct Permit<'a> {
    limiter: &'a RequestLimiter,
    held: bool,
}

impl RequestLimiter {
    /// Create a limiter with `max_concurrency` permits (at least one).
    pub fn new(max_concurrency: usize, min_interval: Duration) -> Self {
        let n = max_concurrency.max(1);
        let (tx, rx) = bounded(n);
        for _ in 0..n {
            let _ = tx.try_send(());
        }
        Self {
            tx,
            rx,
            min_interval,
            last_start: Mutex::new(None),
        }
    }

    /// Block until a permit is free and the minimum interval has elapsed.
    pub fn acquire(&self) -> Permit<'_> {
        let held = self.rx.recv().is_ok();
        if !self.min_interval.is_zero() {
            let mut last = self
                .last_start
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            if let Some(prev) = *last {
                let elapsed = prev.elapsed();
                if elapsed < self.min_interval {
                    std::thread::sleep(self.min_interval - elapsed);
                }
            }
            *last = Some(Instant::now());
        }
        Permit {
            limiter: self,
            held,
        }
    }

    /// Permits currently free.
    pub fn available(&self) -> usize {
        self.rx.len()
    }
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        if self.held {
            let _ = self.limiter.tx.try_send(());
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/content/limiter.rs"]
mod tests;
