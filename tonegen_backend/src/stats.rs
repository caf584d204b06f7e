//! Playback-loop counters.
//!
//! The feeding loop only touches atomics here; [`PlaybackStats::snapshot`]
//! is meant for the control thread (logging, diagnostics), never the loop
//! itself.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters updated from the playback loop.
pub struct PlaybackStats {
    buffers_written: AtomicU64,
    write_failures: AtomicU64,
    gain_reasserts: AtomicU64,
    /// EMA of the observed loop period, stored as f64 bits.
    ema_period_bits: AtomicU64,
    ema_alpha: f64,
}

/// A point-in-time copy of the counters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatsSnapshot {
    pub buffers_written: u64,
    pub write_failures: u64,
    pub gain_reasserts: u64,
    /// Exponential moving average of the loop period in nanoseconds; zero
    /// until the first period completes.
    pub ema_period_nanos: f64,
}

impl PlaybackStats {
    pub fn new() -> Self {
        Self::with_alpha(0.1)
    }

    /// `ema_alpha` in `(0, 1]` controls how quickly the period average
    /// tracks recent iterations.
    pub fn with_alpha(ema_alpha: f64) -> Self {
        assert!(ema_alpha > 0.0 && ema_alpha <= 1.0);
        Self {
            buffers_written: AtomicU64::new(0),
            write_failures: AtomicU64::new(0),
            gain_reasserts: AtomicU64::new(0),
            ema_period_bits: AtomicU64::new(0),
            ema_alpha,
        }
    }

    #[inline]
    pub fn record_buffer_written(&self) {
        self.buffers_written.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_write_failure(&self) {
        self.write_failures.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_gain_reassert(&self) {
        self.gain_reasserts.fetch_add(1, Ordering::Relaxed);
    }

    /// Fold one observed loop period into the moving average.
    #[inline]
    pub fn record_period_nanos(&self, nanos: u64) {
        let alpha = self.ema_alpha;
        let _ = self
            .ema_period_bits
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |bits| {
                let previous = f64::from_bits(bits);
                let updated = if previous == 0.0 {
                    nanos as f64
                } else {
                    alpha * nanos as f64 + (1.0 - alpha) * previous
                };
                Some(updated.to_bits())
            });
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            buffers_written: self.buffers_written.load(Ordering::Relaxed),
            write_failures: self.write_failures.load(Ordering::Relaxed),
            gain_reasserts: self.gain_reasserts.load(Ordering::Relaxed),
            ema_period_nanos: f64::from_bits(self.ema_period_bits.load(Ordering::Relaxed)),
        }
    }
}

impl Default for PlaybackStats {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate() {
        let stats = PlaybackStats::new();
        stats.record_buffer_written();
        stats.record_buffer_written();
        stats.record_write_failure();
        stats.record_gain_reassert();

        let snap = stats.snapshot();
        assert_eq!(snap.buffers_written, 2);
        assert_eq!(snap.write_failures, 1);
        assert_eq!(snap.gain_reasserts, 1);
    }

    #[test]
    fn first_period_seeds_the_average() {
        let stats = PlaybackStats::with_alpha(0.5);
        stats.record_period_nanos(1_000_000);
        assert_eq!(stats.snapshot().ema_period_nanos, 1_000_000.0);

        stats.record_period_nanos(2_000_000);
        assert_eq!(stats.snapshot().ema_period_nanos, 1_500_000.0);
    }
}
