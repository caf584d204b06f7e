//! The audio output collaborator boundary.
//!
//! The playback loop only ever talks to a [`AudioSink`] trait object; the
//! concrete device lives behind it (see [`crate::device::CpalSink`]) and is
//! owned by whoever constructed it. Implementations are shared across the
//! control thread and the playback thread, so every operation takes `&self`
//! and must be safe to call from either side.

use std::fmt;

pub type SinkResult<T> = Result<T, SinkError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkError {
    /// No usable output device, or the stream could not be built.
    Unavailable(String),
    /// A buffer write failed. Fatal to the playback session.
    Write(String),
    /// The sink was released and accepts no further operations.
    Closed,
}

impl fmt::Display for SinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable(msg) => write!(f, "audio sink unavailable: {}", msg),
            Self::Write(msg) => write!(f, "audio sink write failed: {}", msg),
            Self::Closed => write!(f, "audio sink released"),
        }
    }
}

impl std::error::Error for SinkError {}

/// An audio output device that consumes mono 16-bit PCM.
///
/// The sink duplicates the mono signal across its output channels and
/// applies the per-channel gain last set via
/// [`set_stereo_gain`](Self::set_stereo_gain). Gain application is cheap
/// and idempotent; the playback loop reasserts it periodically.
pub trait AudioSink: Send + Sync {
    /// Queue mono samples for playback, returning how many were accepted.
    ///
    /// May block briefly while the device drains, but must return promptly
    /// once playback stops so the feeding loop can observe its running flag.
    fn write(&self, samples: &[i16]) -> SinkResult<usize>;

    /// Begin consuming queued samples.
    fn play(&self) -> SinkResult<()>;

    /// Stop consuming samples. Queued audio is kept.
    fn stop(&self) -> SinkResult<()>;

    /// Discard all queued samples.
    fn flush(&self);

    /// Zero the frames-played position counter.
    fn reset_playback_position(&self);

    /// Set the `(left, right)` gain pair, each in `[0, 1]`.
    fn set_stereo_gain(&self, left: f32, right: f32);

    /// Release the underlying device. The sink accepts no operations
    /// afterwards; `release` itself is idempotent.
    fn release(&self);
}

#[cfg(test)]
pub(crate) mod mock {
    //! A recording sink shared by the playback and engine tests.

    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use super::{AudioSink, SinkError, SinkResult};

    #[derive(Default)]
    pub struct MockSink {
        pub writes: Mutex<Vec<Vec<i16>>>,
        pub gains: Mutex<Vec<(f32, f32)>>,
        pub play_calls: AtomicUsize,
        pub stop_calls: AtomicUsize,
        pub flush_calls: AtomicUsize,
        pub reset_calls: AtomicUsize,
        pub released: AtomicBool,
        pub fail_writes: AtomicBool,
    }

    impl MockSink {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn write_count(&self) -> usize {
            self.writes.lock().unwrap().len()
        }

        pub fn first_write(&self) -> Option<Vec<i16>> {
            self.writes.lock().unwrap().first().cloned()
        }

        pub fn last_gain(&self) -> Option<(f32, f32)> {
            self.gains.lock().unwrap().last().copied()
        }
    }

    impl AudioSink for MockSink {
        fn write(&self, samples: &[i16]) -> SinkResult<usize> {
            if self.fail_writes.load(Ordering::Relaxed) {
                return Err(SinkError::Write("simulated failure".into()));
            }
            self.writes.lock().unwrap().push(samples.to_vec());
            Ok(samples.len())
        }

        fn play(&self) -> SinkResult<()> {
            self.play_calls.fetch_add(1, Ordering::Relaxed);
            Ok(())
        }

        fn stop(&self) -> SinkResult<()> {
            self.stop_calls.fetch_add(1, Ordering::Relaxed);
            Ok(())
        }

        fn flush(&self) {
            self.flush_calls.fetch_add(1, Ordering::Relaxed);
        }

        fn reset_playback_position(&self) {
            self.reset_calls.fetch_add(1, Ordering::Relaxed);
        }

        fn set_stereo_gain(&self, left: f32, right: f32) {
            self.gains.lock().unwrap().push((left, right));
        }

        fn release(&self) {
            self.released.store(true, Ordering::Relaxed);
        }
    }
}
