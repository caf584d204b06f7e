//! The dedicated playback feeding thread.
//!
//! One session owns one thread that pulls fixed-size blocks from the shared
//! generator and writes them to the sink on a ~1 ms cadence, measured
//! against a monotonic clock. Within the leading slice of each period the
//! loop pushes the current stereo gain to the sink exactly once, so volume
//! and balance changes land at controlled moments instead of mid-buffer.
//!
//! The wait is a busy poll. A blocking timer would be cheaper on CPU, but
//! the poll keeps the gain window deterministic and bounds how long a stop
//! request can go unobserved.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::atomic::AtomicCell;
use quanta::Clock;
use tonegen_core::SharedGenerator;

use crate::sink::AudioSink;
use crate::stats::PlaybackStats;

/// Target interval between loop iterations.
const LOOP_PERIOD: Duration = Duration::from_millis(1);

/// Leading slice of each period during which the gain is reasserted.
const GAIN_WINDOW: Duration = Duration::from_micros(200);

/// A running playback thread. At most one exists per engine.
///
/// Dropping the session is equivalent to [`shutdown`](Self::shutdown): the
/// loop thread is always joined before the handle goes away.
pub struct PlaybackSession {
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl PlaybackSession {
    /// Spawn the feeding thread.
    ///
    /// With `clean_start` the generator's read cursor is rewound first, so
    /// the tone begins at the cycle start instead of continuing from the
    /// phase a previous session left behind.
    pub fn spawn(
        generator: SharedGenerator,
        sink: Arc<dyn AudioSink>,
        gain: Arc<AtomicCell<(f32, f32)>>,
        stats: Arc<PlaybackStats>,
        clean_start: bool,
    ) -> Self {
        let running = Arc::new(AtomicBool::new(true));
        let loop_running = Arc::clone(&running);
        let handle = thread::Builder::new()
            .name("tonegen-playback".into())
            .spawn(move || feed_loop(generator, sink, gain, stats, clean_start, loop_running));

        let handle = match handle {
            Ok(handle) => Some(handle),
            Err(e) => {
                eprintln!("tonegen: failed to spawn playback thread: {e}");
                running.store(false, Ordering::Release);
                None
            }
        };
        Self { running, handle }
    }

    /// Whether the feeding loop is still alive. Turns false on its own if
    /// the loop dies from a sink write failure.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Clear the running flag and block until the loop thread has exited.
    pub fn shutdown(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for PlaybackSession {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn feed_loop(
    generator: SharedGenerator,
    sink: Arc<dyn AudioSink>,
    gain: Arc<AtomicCell<(f32, f32)>>,
    stats: Arc<PlaybackStats>,
    clean_start: bool,
    running: Arc<AtomicBool>,
) {
    sink.flush();
    sink.reset_playback_position();

    // Prime the sink with one block before starting playback, so the device
    // never begins on an empty queue.
    let mut block = {
        let mut generator = generator.lock();
        if clean_start {
            generator.rewind();
        }
        let mut block = vec![0i16; generator.min_buffer_len()];
        generator.fill_next(&mut block);
        block
    };
    if let Err(e) = sink.write(&block) {
        eprintln!("tonegen: sink write failed, ending session: {e}");
        stats.record_write_failure();
        running.store(false, Ordering::Release);
        return;
    }
    stats.record_buffer_written();

    if let Err(e) = sink.play() {
        eprintln!("tonegen: sink refused to start: {e}");
        running.store(false, Ordering::Release);
        return;
    }

    let clock = Clock::new();
    let mut period_start = clock.now();
    let mut gain_applied = false;

    while running.load(Ordering::Acquire) {
        // Wait out one period. The gain is pushed once per period, inside
        // the leading window; the edge flag resets in the remainder so the
        // push never repeats within a window.
        loop {
            let elapsed = clock.now().saturating_duration_since(period_start);
            if elapsed >= LOOP_PERIOD {
                stats.record_period_nanos(elapsed.as_nanos() as u64);
                break;
            }
            if elapsed < GAIN_WINDOW {
                if !gain_applied {
                    let (left, right) = gain.load();
                    sink.set_stereo_gain(left, right);
                    stats.record_gain_reassert();
                    gain_applied = true;
                }
            } else {
                gain_applied = false;
            }
            std::hint::spin_loop();
        }

        generator.lock().fill_next(&mut block);
        match sink.write(&block) {
            Ok(_) => stats.record_buffer_written(),
            Err(e) => {
                eprintln!("tonegen: sink write failed, ending session: {e}");
                stats.record_write_failure();
                running.store(false, Ordering::Release);
            }
        }
        period_start = clock.now();
    }
}
