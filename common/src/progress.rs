//! Background progress reporting for long-running phases.
//!
//! Workers bump their own [`Counter`] while a sampler thread periodically
//! sums every counter and forwards the completed fraction to a callback.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::Duration;

/// Receives the completed fraction of a phase, between 0.0 and 1.0.
pub type ProgressFn<'a> = dyn Fn(f64) + Sync + 'a;

pub const REPORT_INTERVAL: Duration = Duration::from_millis(100);

/// A progress slot written by a single worker.
#[derive(Clone, Copy)]
pub struct Counter<'a>(&'a AtomicU64);

impl Counter<'_> {
    pub fn add(&self, steps: u64) {
        self.0.fetch_add(steps, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

pub struct ProgressMonitor<'a> {
    callback: Option<&'a ProgressFn<'a>>,
    total: u64,
    interval: Duration,
}

impl<'a> ProgressMonitor<'a> {
    pub fn new(callback: Option<&'a ProgressFn<'a>>, total: u64) -> Self {
        Self {
            callback,
            total,
            interval: REPORT_INTERVAL,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Runs `phase` with `slots` fresh counters.
    ///
    /// When a callback is set, a sampler thread reports progress for the
    /// duration of `phase` and is joined before this returns, whether the
    /// phase succeeds, fails or panics.
    pub fn watch<R>(&self, slots: usize, phase: impl FnOnce(&[Counter<'_>]) -> R) -> R {
        let cells: Vec<AtomicU64> = (0..slots).map(|_| AtomicU64::new(0)).collect();
        let counters: Vec<Counter<'_>> = cells.iter().map(Counter).collect();

        let Some(callback) = self.callback else {
            return phase(&counters);
        };

        let (stop, stopped) = mpsc::channel::<()>();
        let cells = &cells;
        let (total, interval) = (self.total, self.interval);

        thread::scope(|scope| {
            scope.spawn(move || sample(cells, total, interval, callback, stopped));

            // Dropping `stop` wakes the sampler, also while unwinding.
            let result = phase(&counters);
            drop(stop);
            result
        })
    }
}

fn sample(
    cells: &[AtomicU64],
    total: u64,
    interval: Duration,
    callback: &ProgressFn<'_>,
    stopped: Receiver<()>,
) {
    let mut last = None;
    let mut stopping = false;

    loop {
        let done: u64 = cells.iter().map(|c| c.load(Ordering::Relaxed)).sum();

        if done >= total {
            callback(1.0);
            return;
        }

        if last != Some(done) {
            callback(done as f64 / total as f64);
            last = Some(done);
        }

        if stopping {
            return;
        }

        stopping = !matches!(
            stopped.recv_timeout(interval),
            Err(RecvTimeoutError::Timeout)
        );
    }
}
