use std::f32::consts::TAU;

use serde::{Deserialize, Serialize};

/// The periodic waveform shapes the generator can synthesize.
///
/// A closed set: runtime waveform changes swap the variant wholesale, they
/// never interpolate between shapes. A change takes effect on the next cycle
/// regeneration, not on an in-flight buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WaveformKind {
    Sinusoidal,
    Triangle,
    Square,
    Sawtooth,
}

impl WaveformKind {
    /// Evaluate this waveform at `phase` in `[0.0, 1.0)`.
    ///
    /// Pure and stateless; the result is always in `[-1.0, 1.0]`.
    ///
    /// Conventions:
    /// - Sinusoidal: `sin(2π·phase)`.
    /// - Triangle: 0 at phase 0, rising to +1 at 0.25, back through 0 at
    ///   0.5, down to -1 at 0.75.
    /// - Square: +1 on `[0, 0.5)`, -1 on `[0.5, 1)`.
    /// - Sawtooth: ramp from -1 at phase 0 to +1, resetting at the wrap.
    #[inline]
    pub fn amplitude(self, phase: f32) -> f32 {
        match self {
            WaveformKind::Sinusoidal => (TAU * phase).sin(),
            WaveformKind::Triangle => {
                if phase < 0.25 {
                    4.0 * phase
                } else if phase < 0.75 {
                    2.0 - 4.0 * phase
                } else {
                    4.0 * phase - 4.0
                }
            }
            WaveformKind::Square => {
                if phase < 0.5 { 1.0 } else { -1.0 }
            }
            WaveformKind::Sawtooth => 2.0 * phase - 1.0,
        }
    }
}

/// Wrap an arbitrary phase value back into `[0.0, 1.0)`.
#[inline]
pub fn normalize_phase(phase: f32) -> f32 {
    phase - phase.floor()
}
