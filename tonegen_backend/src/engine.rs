//! The control surface a host application drives.
//!
//! [`SoundEngine`] ties the pieces together: it owns the shared generator
//! and sink handles, derives sink gains from the volume/balance law, and
//! runs the Idle → Starting → Running → Stopping → Idle state machine.
//! Every operation here is a control-plane call; the only one that blocks
//! is `stop_playback`, which joins the feeding thread.

use std::sync::Arc;

use crossbeam::atomic::AtomicCell;
use tonegen_core::{
    DEFAULT_MIN_BUFFER_LEN, GainState, Result, SharedGenerator, SignalGenerator, WaveformKind,
};

use crate::device::CpalSink;
use crate::notifier::PlaybackObserver;
use crate::playback::PlaybackSession;
use crate::sink::AudioSink;
use crate::stats::{PlaybackStats, StatsSnapshot};

/// A programmable tone generator bound to one audio sink.
///
/// Unusable until [`init`](Self::init) succeeds; parameter calls before
/// that are silent no-ops (getters report zero), matching the contract the
/// host bridge expects. At most one playback session runs at a time.
pub struct SoundEngine {
    generator: Option<SharedGenerator>,
    sink: Option<Arc<dyn AudioSink>>,
    session: Option<PlaybackSession>,
    observer: Option<Arc<dyn PlaybackObserver>>,
    gain_cell: Arc<AtomicCell<(f32, f32)>>,
    gain: GainState,
    stats: Arc<PlaybackStats>,
    clean_start: bool,
}

impl SoundEngine {
    pub fn new() -> Self {
        let gain = GainState::new();
        Self {
            generator: None,
            sink: None,
            session: None,
            observer: None,
            gain_cell: Arc::new(AtomicCell::new(gain.channel_gains())),
            gain,
            stats: Arc::new(PlaybackStats::new()),
            clean_start: false,
        }
    }

    /// Register the observer notified on playback-state transitions.
    pub fn set_observer(&mut self, observer: Arc<dyn PlaybackObserver>) {
        self.observer = Some(observer);
    }

    /// Initialize against the default output device at `sample_rate`.
    ///
    /// Returns `false` when no sink could be constructed; the engine stays
    /// unusable until a later attempt succeeds.
    pub fn init(&mut self, sample_rate: u32) -> bool {
        match CpalSink::open(sample_rate, DEFAULT_MIN_BUFFER_LEN) {
            Ok(sink) => self.init_with_sink(sample_rate, Arc::new(sink)),
            Err(e) => {
                eprintln!("tonegen: sink initialization failed: {e}");
                false
            }
        }
    }

    /// Initialize against a caller-supplied sink.
    ///
    /// Re-initializing stops any running playback first, so the previous
    /// session never outlives the handles it was spawned with.
    pub fn init_with_sink(&mut self, sample_rate: u32, sink: Arc<dyn AudioSink>) -> bool {
        self.stop_playback();
        let generator = match SignalGenerator::new(DEFAULT_MIN_BUFFER_LEN, sample_rate) {
            Ok(generator) => generator,
            Err(e) => {
                eprintln!("tonegen: generator initialization failed: {e}");
                return false;
            }
        };
        self.generator = Some(generator.into_shared());
        self.sink = Some(sink);
        self.push_gain();
        true
    }

    /// Switch the synthesized waveform shape. No-op before init.
    pub fn set_waveform(&mut self, kind: WaveformKind) {
        if let Some(generator) = &self.generator {
            generator.lock().set_waveform(kind);
        }
    }

    /// Set the tone frequency in Hz.
    ///
    /// Invalid values are reported and leave the audible output unchanged.
    /// No-op (Ok) before init.
    pub fn set_frequency(&mut self, hz: f32) -> Result<()> {
        match &self.generator {
            Some(generator) => generator.lock().set_frequency(hz),
            None => Ok(()),
        }
    }

    /// Current frequency in Hz; 0.0 before init.
    pub fn frequency(&self) -> f32 {
        self.generator.as_ref().map_or(0.0, |g| g.lock().frequency())
    }

    /// Change the synthesis sample rate.
    ///
    /// Only the generated data changes; the sink keeps the rate it was
    /// opened with until the next [`init`](Self::init).
    pub fn set_sample_rate(&mut self, hz: u32) -> Result<()> {
        match &self.generator {
            Some(generator) => generator.lock().set_sample_rate(hz),
            None => Ok(()),
        }
    }

    /// Current synthesis sample rate in Hz; 0 before init.
    pub fn sample_rate(&self) -> u32 {
        self.generator.as_ref().map_or(0, |g| g.lock().sample_rate())
    }

    /// Force a cycle-buffer rebuild from the current parameters.
    pub fn refresh_cycle_data(&mut self) -> Result<()> {
        match &self.generator {
            Some(generator) => generator.lock().regenerate(),
            None => Ok(()),
        }
    }

    /// Control whether parameter changes rebuild the cycle buffer
    /// immediately (default) or only on explicit refresh.
    pub fn set_auto_regenerate(&mut self, enabled: bool) {
        if let Some(generator) = &self.generator {
            generator.lock().set_auto_regenerate(enabled);
        }
    }

    /// When set, each playback start rewinds to the cycle beginning
    /// instead of continuing from the previous session's phase.
    pub fn set_clean_start(&mut self, clean_start: bool) {
        self.clean_start = clean_start;
    }

    /// Set master volume, clamped to `[0, 1]`, and push the combined gain
    /// to the sink if one is attached.
    pub fn set_volume(&mut self, volume: f32) {
        self.gain.set_volume(volume);
        self.push_gain();
    }

    /// Set stereo balance, clamped to `[-1, 1]`, and push the combined
    /// gain to the sink if one is attached.
    pub fn set_balance(&mut self, balance: f32) {
        self.gain.set_balance(balance);
        self.push_gain();
    }

    fn push_gain(&self) {
        let gains = self.gain.channel_gains();
        self.gain_cell.store(gains);
        if let Some(sink) = &self.sink {
            sink.set_stereo_gain(gains.0, gains.1);
        }
    }

    /// Start the playback session and notify the observer.
    ///
    /// Silently does nothing while a session exists or before init.
    pub fn start_playback(&mut self) {
        if self.session.is_some() {
            return;
        }
        let (Some(generator), Some(sink)) = (&self.generator, &self.sink) else {
            return;
        };
        let session = PlaybackSession::spawn(
            Arc::clone(generator),
            Arc::clone(sink),
            Arc::clone(&self.gain_cell),
            Arc::clone(&self.stats),
            self.clean_start,
        );
        self.session = Some(session);
        self.notify(true);
    }

    /// Stop playback: joins the feeding thread, notifies the observer,
    /// then stops the sink. No-op when nothing is playing.
    pub fn stop_playback(&mut self) {
        let Some(mut session) = self.session.take() else {
            return;
        };
        session.shutdown();
        self.notify(false);
        if let Some(sink) = &self.sink {
            if let Err(e) = sink.stop() {
                eprintln!("tonegen: sink stop failed: {e}");
            }
        }
    }

    /// Whether the feeding loop is currently alive.
    pub fn is_playing(&self) -> bool {
        self.session.as_ref().is_some_and(|s| s.is_running())
    }

    /// Stop if running, then release the sink. The engine needs a fresh
    /// [`init`](Self::init) before it can play again.
    pub fn release(&mut self) {
        self.stop_playback();
        if let Some(sink) = self.sink.take() {
            sink.release();
        }
    }

    /// Counters from the current/most recent playback session.
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    fn notify(&self, playing: bool) {
        if let Some(observer) = &self.observer {
            observer.playback_state_changed(playing);
        }
    }
}

impl Default for SoundEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for SoundEngine {
    fn drop(&mut self) {
        self.stop_playback();
    }
}

#[cfg(test)]
mod tests {
    use std::f32::consts::TAU;
    use std::sync::atomic::Ordering;
    use std::thread;
    use std::time::{Duration, Instant};

    use tonegen_core::Error;

    use super::*;
    use crate::notifier::ChannelObserver;
    use crate::sink::mock::MockSink;

    fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if condition() {
                return true;
            }
            thread::sleep(Duration::from_millis(1));
        }
        condition()
    }

    fn initialized_engine() -> (SoundEngine, Arc<MockSink>) {
        let mut engine = SoundEngine::new();
        let sink = Arc::new(MockSink::new());
        assert!(engine.init_with_sink(44_100, sink.clone()));
        (engine, sink)
    }

    #[test]
    fn stop_before_start_is_a_noop() {
        let (mut engine, sink) = initialized_engine();
        engine.stop_playback();
        assert!(!engine.is_playing());
        assert_eq!(sink.stop_calls.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn start_before_init_is_a_noop() {
        let mut engine = SoundEngine::new();
        engine.start_playback();
        assert!(!engine.is_playing());
    }

    #[test]
    fn getters_report_zero_before_init() {
        let mut engine = SoundEngine::new();
        assert_eq!(engine.frequency(), 0.0);
        assert_eq!(engine.sample_rate(), 0);
        // Setters are silent no-ops without a generator.
        assert!(engine.set_frequency(880.0).is_ok());
        assert!(engine.set_sample_rate(48_000).is_ok());
        assert!(engine.refresh_cycle_data().is_ok());
    }

    #[test]
    fn double_start_spawns_a_single_session() {
        let (mut engine, sink) = initialized_engine();
        let (observer, events) = ChannelObserver::new();
        engine.set_observer(Arc::new(observer));

        engine.start_playback();
        engine.start_playback();
        assert!(engine.is_playing());
        assert!(wait_until(Duration::from_secs(2), || {
            sink.play_calls.load(Ordering::Relaxed) >= 1
        }));
        assert_eq!(sink.play_calls.load(Ordering::Relaxed), 1);

        engine.stop_playback();
        let transitions: Vec<bool> = events.try_iter().collect();
        assert_eq!(transitions, vec![true, false]);
        assert!(!engine.is_playing());
        assert_eq!(sink.stop_calls.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn sine_scenario_produces_the_expected_tone() {
        let (mut engine, sink) = initialized_engine();
        engine.set_frequency(440.0).unwrap();
        engine.set_waveform(WaveformKind::Sinusoidal);

        engine.start_playback();
        assert!(wait_until(Duration::from_secs(2), || sink.write_count() >= 1));
        engine.stop_playback();
        assert!(!engine.is_playing());

        let buffer = sink.first_write().unwrap();
        assert_eq!(buffer.len(), DEFAULT_MIN_BUFFER_LEN);
        // 44100 / 440 rounds to 100 samples per period.
        for (i, &sample) in buffer.iter().take(250).enumerate() {
            let expected = (TAU * (i % 100) as f32 / 100.0).sin();
            let got = sample as f32 / 32_768.0;
            assert!(
                (got - expected).abs() < 2e-3,
                "sample {i}: got {got}, expected {expected}"
            );
        }
    }

    #[test]
    fn invalid_frequency_reports_and_preserves_output() {
        let (mut engine, _sink) = initialized_engine();
        engine.set_frequency(440.0).unwrap();

        assert!(matches!(engine.set_frequency(0.0), Err(Error::InvalidParameter(_))));
        assert!(matches!(engine.set_frequency(-10.0), Err(Error::InvalidParameter(_))));
        assert_eq!(engine.frequency(), 440.0);
    }

    #[test]
    fn volume_and_balance_combine_at_the_sink() {
        let (mut engine, sink) = initialized_engine();
        engine.set_volume(1.0);
        engine.set_balance(1.0);
        assert_eq!(sink.last_gain(), Some((0.0, 1.0)));

        engine.set_volume(0.5);
        assert_eq!(sink.last_gain(), Some((0.0, 0.5)));

        engine.set_balance(-2.0); // clamps to full left
        assert_eq!(sink.last_gain(), Some((0.5, 0.0)));
    }

    #[test]
    fn release_stops_playback_and_frees_the_sink() {
        let (mut engine, sink) = initialized_engine();
        let (observer, events) = ChannelObserver::new();
        engine.set_observer(Arc::new(observer));

        engine.start_playback();
        assert!(wait_until(Duration::from_secs(2), || sink.write_count() >= 1));
        engine.release();

        assert!(!engine.is_playing());
        assert!(sink.released.load(Ordering::Relaxed));
        assert_eq!(events.try_iter().collect::<Vec<_>>(), vec![true, false]);

        // Released engines cannot start again until re-initialized.
        engine.start_playback();
        assert!(!engine.is_playing());
    }

    #[test]
    fn write_failure_notifies_idle_exactly_once_on_stop() {
        let (mut engine, sink) = initialized_engine();
        let (observer, events) = ChannelObserver::new();
        engine.set_observer(Arc::new(observer));
        sink.fail_writes.store(true, Ordering::Relaxed);

        engine.start_playback();
        assert!(wait_until(Duration::from_secs(2), || !engine.is_playing()));
        assert_eq!(events.try_iter().collect::<Vec<_>>(), vec![true]);

        engine.stop_playback();
        assert_eq!(events.try_iter().collect::<Vec<_>>(), vec![false]);
        assert!(engine.stats().write_failures >= 1);
    }
}
