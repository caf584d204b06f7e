use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::generator::{DEFAULT_FREQUENCY, DEFAULT_MIN_BUFFER_LEN, SignalGenerator};
use crate::waveform::WaveformKind;

/// A serializable generator preset.
///
/// Hosts can persist the current tone setup and restore it later; missing
/// fields fall back to the defaults, so a partial JSON document like
/// `{"frequency": 880.0}` is a valid preset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub sample_rate: u32,
    pub frequency: f32,
    pub waveform: WaveformKind,
    pub min_buffer_len: usize,
    pub auto_regenerate: bool,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44_100,
            frequency: DEFAULT_FREQUENCY,
            waveform: WaveformKind::Sinusoidal,
            min_buffer_len: DEFAULT_MIN_BUFFER_LEN,
            auto_regenerate: true,
        }
    }
}

impl GeneratorConfig {
    /// Build a [`SignalGenerator`] from this preset.
    pub fn build(self) -> Result<SignalGenerator> {
        let mut generator = SignalGenerator::new(self.min_buffer_len, self.sample_rate)?;
        generator.set_auto_regenerate(false);
        generator.set_waveform(self.waveform);
        generator.set_frequency(self.frequency)?;
        generator.regenerate()?;
        generator.set_auto_regenerate(self.auto_regenerate);
        Ok(generator)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl From<&SignalGenerator> for GeneratorConfig {
    fn from(generator: &SignalGenerator) -> Self {
        Self {
            sample_rate: generator.sample_rate(),
            frequency: generator.frequency(),
            waveform: generator.waveform(),
            min_buffer_len: generator.min_buffer_len(),
            auto_regenerate: generator.auto_regenerate(),
        }
    }
}
