//! cpal-backed [`AudioSink`] implementation.
//!
//! `cpal::Stream` is not `Send`, so the stream lives on a dedicated worker
//! thread for the sink's whole lifetime; the rest of the sink communicates
//! with the audio callback through a shared state block. The callback never
//! blocks: it takes the queue lock with `try_lock` and emits silence when
//! contended or starved.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, SizedSample};
use crossbeam::atomic::AtomicCell;
use crossbeam::channel;
use spin::Mutex as SpinMutex;

use crate::sink::{AudioSink, SinkError, SinkResult};

/// State shared between the control side and the audio callback.
struct SinkShared {
    queue: SpinMutex<VecDeque<i16>>,
    capacity: usize,
    gain: AtomicCell<(f32, f32)>,
    playing: AtomicBool,
    released: AtomicBool,
    frames_played: AtomicU64,
}

/// An [`AudioSink`] writing to the default output device through cpal.
///
/// Mono 16-bit input is duplicated across the device's channels, with the
/// left gain on even channel indices and the right gain on odd ones.
pub struct CpalSink {
    shared: Arc<SinkShared>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl CpalSink {
    /// Open the default output device at (or nearest to) `sample_rate`.
    ///
    /// `min_buffer_samples` sizes the internal queue: four write blocks are
    /// buffered before `write` starts applying backpressure.
    pub fn open(sample_rate: u32, min_buffer_samples: usize) -> SinkResult<Self> {
        let capacity = min_buffer_samples.max(1) * 4;
        let shared = Arc::new(SinkShared {
            queue: SpinMutex::new(VecDeque::with_capacity(capacity)),
            capacity,
            gain: AtomicCell::new((1.0, 1.0)),
            playing: AtomicBool::new(false),
            released: AtomicBool::new(false),
            frames_played: AtomicU64::new(0),
        });

        let (ready_tx, ready_rx) = channel::bounded(1);
        let worker_shared = Arc::clone(&shared);
        let handle = thread::Builder::new()
            .name("tonegen-sink".into())
            .spawn(move || run_device(worker_shared, sample_rate, ready_tx))
            .map_err(|e| SinkError::Unavailable(e.to_string()))?;

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(Self { shared, worker: Mutex::new(Some(handle)) }),
            Ok(Err(e)) => {
                let _ = handle.join();
                Err(e)
            }
            Err(_) => {
                let _ = handle.join();
                Err(SinkError::Unavailable("sink thread exited during setup".into()))
            }
        }
    }

    /// Frames consumed by the device since the last position reset.
    pub fn position_frames(&self) -> u64 {
        self.shared.frames_played.load(Ordering::Relaxed)
    }
}

impl AudioSink for CpalSink {
    fn write(&self, samples: &[i16]) -> SinkResult<usize> {
        let mut written = 0;
        while written < samples.len() {
            if self.shared.released.load(Ordering::Acquire) {
                return Err(SinkError::Closed);
            }
            {
                let mut queue = self.shared.queue.lock();
                let free = self.shared.capacity.saturating_sub(queue.len());
                let take = free.min(samples.len() - written);
                queue.extend(samples[written..written + take].iter().copied());
                written += take;
            }
            if written == samples.len() {
                break;
            }
            if !self.shared.playing.load(Ordering::Acquire) {
                // Nothing drains the queue while stopped; report the short
                // write instead of stalling the caller.
                break;
            }
            thread::sleep(Duration::from_millis(1));
        }
        Ok(written)
    }

    fn play(&self) -> SinkResult<()> {
        if self.shared.released.load(Ordering::Acquire) {
            return Err(SinkError::Closed);
        }
        self.shared.playing.store(true, Ordering::Release);
        Ok(())
    }

    fn stop(&self) -> SinkResult<()> {
        self.shared.playing.store(false, Ordering::Release);
        Ok(())
    }

    fn flush(&self) {
        self.shared.queue.lock().clear();
    }

    fn reset_playback_position(&self) {
        self.shared.frames_played.store(0, Ordering::Relaxed);
    }

    fn set_stereo_gain(&self, left: f32, right: f32) {
        self.shared.gain.store((left.clamp(0.0, 1.0), right.clamp(0.0, 1.0)));
    }

    fn release(&self) {
        self.shared.released.store(true, Ordering::Release);
        self.shared.playing.store(false, Ordering::Release);
        self.shared.queue.lock().clear();
        if let Ok(mut worker) = self.worker.lock() {
            if let Some(handle) = worker.take() {
                handle.thread().unpark();
                let _ = handle.join();
            }
        }
    }
}

impl Drop for CpalSink {
    fn drop(&mut self) {
        self.release();
    }
}

/// Worker body: owns the cpal stream until release.
fn run_device(shared: Arc<SinkShared>, requested_rate: u32, ready: channel::Sender<SinkResult<()>>) {
    let stream = match build_stream(&shared, requested_rate) {
        Ok(stream) => stream,
        Err(e) => {
            let _ = ready.send(Err(e));
            return;
        }
    };
    if let Err(e) = stream.play() {
        let _ = ready.send(Err(SinkError::Unavailable(e.to_string())));
        return;
    }
    let _ = ready.send(Ok(()));

    while !shared.released.load(Ordering::Acquire) {
        thread::park_timeout(Duration::from_millis(50));
    }
    drop(stream);
}

fn build_stream(shared: &Arc<SinkShared>, requested_rate: u32) -> SinkResult<cpal::Stream> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| SinkError::Unavailable("no default output device".into()))?;
    let supported = select_output_config(&device, requested_rate)?;
    let sample_format = supported.sample_format();
    let config: cpal::StreamConfig = supported.into();

    match sample_format {
        cpal::SampleFormat::I8 => open_stream::<i8>(&device, &config, shared),
        cpal::SampleFormat::I16 => open_stream::<i16>(&device, &config, shared),
        cpal::SampleFormat::I32 => open_stream::<i32>(&device, &config, shared),
        cpal::SampleFormat::I64 => open_stream::<i64>(&device, &config, shared),
        cpal::SampleFormat::U8 => open_stream::<u8>(&device, &config, shared),
        cpal::SampleFormat::U16 => open_stream::<u16>(&device, &config, shared),
        cpal::SampleFormat::U32 => open_stream::<u32>(&device, &config, shared),
        cpal::SampleFormat::U64 => open_stream::<u64>(&device, &config, shared),
        cpal::SampleFormat::F32 => open_stream::<f32>(&device, &config, shared),
        cpal::SampleFormat::F64 => open_stream::<f64>(&device, &config, shared),
        other => Err(SinkError::Unavailable(format!("unsupported sample format '{other}'"))),
    }
}

/// Pick an output config covering `requested_rate`, preferring stereo, and
/// fall back to the device default when the rate is unsupported.
fn select_output_config(
    device: &cpal::Device,
    requested_rate: u32,
) -> SinkResult<cpal::SupportedStreamConfig> {
    let ranges = device
        .supported_output_configs()
        .map_err(|e| SinkError::Unavailable(e.to_string()))?;

    let mut best: Option<cpal::SupportedStreamConfigRange> = None;
    for range in ranges {
        if requested_rate < range.min_sample_rate().0 || requested_rate > range.max_sample_rate().0 {
            continue;
        }
        let replace = match &best {
            None => true,
            Some(current) => channel_penalty(&range) < channel_penalty(current),
        };
        if replace {
            best = Some(range);
        }
    }

    match best {
        Some(range) => Ok(range.with_sample_rate(cpal::SampleRate(requested_rate))),
        None => device
            .default_output_config()
            .map_err(|e| SinkError::Unavailable(e.to_string())),
    }
}

fn channel_penalty(range: &cpal::SupportedStreamConfigRange) -> u32 {
    (i32::from(range.channels()) - 2).unsigned_abs()
}

fn open_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    shared: &Arc<SinkShared>,
) -> SinkResult<cpal::Stream>
where
    T: SizedSample + FromSample<f32>,
{
    let channels = config.channels as usize;
    let shared = Arc::clone(shared);
    let err_fn = |err| eprintln!("audio stream error: {err}");

    device
        .build_output_stream(
            config,
            move |output: &mut [T], _: &cpal::OutputCallbackInfo| {
                render(&shared, output, channels);
            },
            err_fn,
            None,
        )
        .map_err(|e| SinkError::Unavailable(e.to_string()))
}

/// Realtime callback body. No allocation, no blocking lock.
fn render<T>(shared: &SinkShared, output: &mut [T], channels: usize)
where
    T: SizedSample + FromSample<f32>,
{
    let silence = T::from_sample(0.0f32);
    if !shared.playing.load(Ordering::Acquire) {
        output.fill(silence);
        return;
    }
    let Some(mut queue) = shared.queue.try_lock() else {
        // Contended by a control-side write; silence beats blocking here.
        output.fill(silence);
        return;
    };

    let (left, right) = shared.gain.load();
    let mut frames = 0u64;
    for frame in output.chunks_mut(channels.max(1)) {
        let sample = match queue.pop_front() {
            Some(s) => f32::from(s) / 32_768.0,
            None => 0.0, // underrun
        };
        for (ch, out) in frame.iter_mut().enumerate() {
            let gain = if ch % 2 == 0 { left } else { right };
            *out = T::from_sample(sample * gain);
        }
        frames += 1;
    }
    shared.frames_played.fetch_add(frames, Ordering::Relaxed);
}
