//! Tonegen core — waveform synthesis without any audio I/O.
//!
//! Crate layout:
//! - [`waveform`]  : the four periodic waveform shapes and phase helpers
//! - [`generator`] : one-cycle PCM synthesis and the tiling stream reader
//! - [`gain`]      : master volume / stereo balance law
//! - [`config`]    : serializable generator presets
//! - [`error`]     : the error taxonomy
//!
//! Everything here is deterministic and thread-agnostic. The playback layer
//! (`tonegen-backend`) shares a [`SignalGenerator`] between its control and
//! feeding threads through the [`SharedGenerator`] cell; cycle regeneration
//! happens inside one lock acquisition so readers never observe a buffer
//! mid-overwrite.

pub mod config;
pub mod error;
pub mod gain;
pub mod generator;
pub mod waveform;

pub use config::GeneratorConfig;
pub use error::{Error, Result};
pub use gain::GainState;
pub use generator::{DEFAULT_FREQUENCY, DEFAULT_MIN_BUFFER_LEN, SharedGenerator, SignalGenerator};
pub use waveform::{WaveformKind, normalize_phase};
