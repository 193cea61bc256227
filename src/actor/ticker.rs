//! Telemetry Ticker: a thread that marks the end of each sampling window.
//!
//! The tick loop counts frames and checks the ticker once per tick without
//! blocking; whenever a sample is waiting it publishes the frame count and
//! entity count and starts a new window.

use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// End of one sampling window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sample {
    /// Window number, starting at 0.
    pub index: u64,
    /// Time since the ticker started.
    pub elapsed: Duration,
}

/// Ticker actor emitting one [`Sample`] per interval.
#[derive(Debug)]
pub struct TelemetryTicker {
    handle: Option<JoinHandle<()>>,
    shutdown: Arc<AtomicBool>,
    sample_rx: Receiver<Sample>,
}

impl TelemetryTicker {
    /// Spawn the ticker with the given sampling interval.
    ///
    /// # Panics
    ///
    /// Panics if the OS fails to spawn the thread.
    pub fn spawn(interval: Duration) -> Self {
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_clone = Arc::clone(&shutdown);

        // A slow tick loop sees at most one stale sample
        let (sample_tx, sample_rx) = bounded(1);

        let handle = thread::Builder::new()
            .name("tabletop-ticker".to_string())
            .spawn(move || {
                Self::run_loop(&sample_tx, &shutdown_clone, interval);
            })
            .expect("Failed to spawn ticker thread");

        Self {
            handle: Some(handle),
            shutdown,
            sample_rx,
        }
    }

    /// Take the pending sample, if a window has closed. Never blocks.
    pub fn try_sample(&self) -> Option<Sample> {
        match self.sample_rx.try_recv() {
            Ok(sample) => Some(sample),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    /// Receiver for blocking or `select!`-style waits.
    pub const fn receiver(&self) -> &Receiver<Sample> {
        &self.sample_rx
    }

    /// Signal the ticker to stop.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }

    /// Stop the ticker and wait for its thread.
    pub fn join(mut self) {
        self.shutdown();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }

    fn run_loop(sample_tx: &Sender<Sample>, shutdown: &AtomicBool, interval: Duration) {
        let start = Instant::now();
        let mut index = 0u64;
        let mut next = start + interval;

        while !shutdown.load(Ordering::Relaxed) {
            let now = Instant::now();
            if now < next {
                // Short naps keep shutdown responsive
                thread::sleep((next - now).min(Duration::from_millis(5)));
                continue;
            }

            // Dropped if the previous sample was never taken
            let _ = sample_tx.try_send(Sample {
                index,
                elapsed: now - start,
            });
            index += 1;
            next += interval;
            if next < now {
                next = now + interval;
            }
        }
    }
}

impl Drop for TelemetryTicker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_samples_arrive_in_order() {
        let ticker = TelemetryTicker::spawn(Duration::from_millis(10));

        let first = ticker.receiver().recv_timeout(Duration::from_millis(200));
        assert_eq!(first.unwrap().index, 0);

        let second = ticker.receiver().recv_timeout(Duration::from_millis(200)).unwrap();
        assert!(second.index >= 1);
        assert!(second.elapsed >= Duration::from_millis(10));

        ticker.join();
    }

    #[test]
    fn test_try_sample_is_non_blocking() {
        let ticker = TelemetryTicker::spawn(Duration::from_secs(60));
        assert_eq!(ticker.try_sample(), None);
        ticker.join();
    }
}
