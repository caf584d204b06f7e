//! Tonegen backend — continuous playback of the core's synthesized PCM.
//!
//! Crate layout:
//! - [`sink`]     : the [`AudioSink`] collaborator boundary
//! - [`device`]   : cpal-backed sink against the default output device
//! - [`playback`] : the dedicated feeding thread and its timing loop
//! - [`engine`]   : the [`SoundEngine`] control surface hosts drive
//! - [`notifier`] : playback-state-change observation
//! - [`stats`]    : atomic counters the feeding loop maintains
//!
//! Two threads of control exist: the host's control thread (setters,
//! start/stop) and one feeding thread per session. The only blocking
//! control call is `stop_playback`, which joins the feeding thread.

pub mod device;
pub mod engine;
pub mod notifier;
pub mod playback;
pub mod sink;
pub mod stats;

pub use device::CpalSink;
pub use engine::SoundEngine;
pub use notifier::{ChannelObserver, PlaybackObserver};
pub use playback::PlaybackSession;
pub use sink::{AudioSink, SinkError, SinkResult};
pub use stats::{PlaybackStats, StatsSnapshot};
