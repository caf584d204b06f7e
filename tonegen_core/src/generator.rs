use std::sync::Arc;

use dasp::Sample;
use parking_lot::Mutex;

use crate::error::{Error, Result};
use crate::waveform::WaveformKind;

/// Default minimum output buffer length, in samples.
///
/// Matches the block size the playback layer hands to the sink; a cycle
/// buffer is always at least this long so one `fill_next` call never has to
/// wrap more than once per period boundary.
pub const DEFAULT_MIN_BUFFER_LEN: usize = 2000;

/// Default tone frequency in Hz.
pub const DEFAULT_FREQUENCY: f32 = 440.0;

/// A generator shared between the control thread and the playback thread.
///
/// All cycle-buffer regeneration happens inside one lock acquisition, so a
/// reader never observes a buffer and cursor that are mutually inconsistent.
pub type SharedGenerator = Arc<Mutex<SignalGenerator>>;

/// Synthesizes one cycle of the active waveform as quantized 16-bit PCM and
/// streams it out in fixed-size blocks with a persistent read cursor.
///
/// The cycle buffer covers the smallest whole number of waveform periods
/// that is at least `min_buffer_len` samples long, so tiling it yields a
/// phase-continuous signal: the phase at the end of one output block is
/// exactly the phase at the start of the next.
#[derive(Debug, Clone)]
pub struct SignalGenerator {
    sample_rate: u32,
    frequency: f32,
    min_buffer_len: usize,
    waveform: WaveformKind,
    cycle: Vec<i16>,
    cursor: usize,
    auto_regenerate: bool,
}

impl SignalGenerator {
    /// Create a generator producing a 440 Hz sinusoid at `sample_rate`.
    ///
    /// `min_buffer_len` is the output block size required by the sink.
    /// Fails with [`Error::InvalidParameter`] if either argument is zero.
    pub fn new(min_buffer_len: usize, sample_rate: u32) -> Result<Self> {
        if min_buffer_len == 0 {
            return Err(Error::InvalidParameter("minimum buffer length is zero"));
        }
        if sample_rate == 0 {
            return Err(Error::InvalidParameter("sample rate is zero"));
        }
        let mut generator = Self {
            sample_rate,
            frequency: DEFAULT_FREQUENCY,
            min_buffer_len,
            waveform: WaveformKind::Sinusoidal,
            cycle: Vec::new(),
            cursor: 0,
            auto_regenerate: true,
        };
        generator.regenerate()?;
        Ok(generator)
    }

    /// Wrap this generator for sharing with a playback thread.
    pub fn into_shared(self) -> SharedGenerator {
        Arc::new(Mutex::new(self))
    }

    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn waveform(&self) -> WaveformKind {
        self.waveform
    }

    pub fn min_buffer_len(&self) -> usize {
        self.min_buffer_len
    }

    pub fn auto_regenerate(&self) -> bool {
        self.auto_regenerate
    }

    /// The current one-cycle sample buffer.
    pub fn cycle(&self) -> &[i16] {
        &self.cycle
    }

    /// Current read position within the cycle buffer.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Set the tone frequency in Hz.
    ///
    /// Rejects non-positive and non-finite values, leaving the previous
    /// cycle buffer untouched. With auto-regeneration enabled the cycle
    /// buffer is rebuilt immediately; otherwise the change is deferred
    /// until [`regenerate`](Self::regenerate).
    pub fn set_frequency(&mut self, hz: f32) -> Result<()> {
        if !hz.is_finite() || hz <= 0.0 {
            return Err(Error::InvalidParameter("frequency must be positive"));
        }
        self.frequency = hz;
        self.maybe_regenerate()
    }

    /// Set the sample rate in Hz. Zero is rejected without side effects.
    pub fn set_sample_rate(&mut self, hz: u32) -> Result<()> {
        if hz == 0 {
            return Err(Error::InvalidParameter("sample rate is zero"));
        }
        self.sample_rate = hz;
        self.maybe_regenerate()
    }

    /// Switch the active waveform shape.
    ///
    /// Setting the current shape again is a no-op and does not disturb the
    /// read cursor.
    pub fn set_waveform(&mut self, kind: WaveformKind) {
        if kind == self.waveform {
            return;
        }
        self.waveform = kind;
        // Parameters were already validated, so deferred regeneration is
        // the only possible outcome here.
        let _ = self.maybe_regenerate();
    }

    /// Control whether parameter changes rebuild the cycle buffer
    /// immediately or only on explicit [`regenerate`](Self::regenerate).
    pub fn set_auto_regenerate(&mut self, enabled: bool) {
        self.auto_regenerate = enabled;
    }

    fn maybe_regenerate(&mut self) -> Result<()> {
        if self.auto_regenerate { self.regenerate() } else { Ok(()) }
    }

    /// Rebuild the one-cycle buffer from the current parameters and reset
    /// the read cursor to the cycle start.
    ///
    /// On failure the previous buffer and cursor are retained unchanged.
    pub fn regenerate(&mut self) -> Result<()> {
        if !self.frequency.is_finite() || self.frequency <= 0.0 {
            return Err(Error::InvalidParameter("frequency must be positive"));
        }
        if self.sample_rate == 0 {
            return Err(Error::InvalidParameter("sample rate is zero"));
        }

        // Samples per waveform period. A frequency far above the sample
        // rate rounds to zero; clamp to one sample so the buffer degrades
        // to a constant at exactly the minimum length instead of dividing
        // by zero.
        let period = ((self.sample_rate as f64 / self.frequency as f64).round() as usize).max(1);
        let len = self.min_buffer_len.div_ceil(period) * period;

        let mut cycle = Vec::with_capacity(len);
        for i in 0..len {
            let phase = (i % period) as f32 / period as f32;
            cycle.push(quantize(self.waveform.amplitude(phase)));
        }

        self.cycle = cycle;
        self.cursor = 0;
        Ok(())
    }

    /// Reset the read cursor to the cycle start without rebuilding the
    /// buffer. The next `fill_next` begins at phase zero.
    pub fn rewind(&mut self) {
        self.cursor = 0;
    }

    /// Fill `out` by tiling the cycle buffer from the persistent cursor.
    ///
    /// The cursor advances by `out.len()` modulo the cycle length, so
    /// successive calls produce a gapless, phase-continuous stream.
    pub fn fill_next(&mut self, out: &mut [i16]) {
        debug_assert!(!self.cycle.is_empty());
        for sample in out.iter_mut() {
            *sample = self.cycle[self.cursor];
            self.cursor += 1;
            if self.cursor == self.cycle.len() {
                self.cursor = 0;
            }
        }
    }
}

/// Quantize a normalized amplitude to signed 16-bit PCM.
#[inline]
fn quantize(amplitude: f32) -> i16 {
    amplitude.to_sample::<i16>()
}
