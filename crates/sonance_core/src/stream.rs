//! Audio Output Stream
//!
//! Binds a [`Device`] to a CPAL output stream. CPAL owns the real-time
//! thread and calls us serially; each callback is handed straight to
//! [`Device::process`].
//!
//! ```text
//! CPAL callback ──▶ Device::process ──▶ Mixer ──▶ SamplePlayer, SamplePlayer, ...
//!       │
//!       └── errors ──try_send──▶ crossbeam Sender<Event> ──▶ control thread
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Stream, StreamConfig as CpalStreamConfig};
use crossbeam_channel::Sender;
use tracing::{debug, info, warn};

use crate::config::{EngineConfig, StreamConfig, OUTPUT_CHANNELS};
use crate::device::Device;
use crate::error::{EngineError, EngineResult};
use crate::message::Event;

/// Counters written by the audio callback, read by control threads
pub struct StreamStats {
    callbacks: AtomicU64,
    frames_rendered: AtomicU64,
}

impl StreamStats {
    pub fn new() -> Self {
        Self {
            callbacks: AtomicU64::new(0),
            frames_rendered: AtomicU64::new(0),
        }
    }

    /// Record one rendered block of `samples` interleaved stereo samples
    #[inline]
    pub fn record_block(&self, samples: usize) {
        // Relaxed is enough: readers only want monotonically growing counters
        self.callbacks.fetch_add(1, Ordering::Relaxed);
        self.frames_rendered
            .fetch_add((samples / OUTPUT_CHANNELS as usize) as u64, Ordering::Relaxed);
    }

    pub fn callbacks(&self) -> u64 {
        self.callbacks.load(Ordering::Relaxed)
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered.load(Ordering::Relaxed)
    }
}

impl Default for StreamStats {
    fn default() -> Self {
        Self::new()
    }
}

/// A running hardware output stream driving one [`Device`]
///
/// Dropping it stops playback.
pub struct OutputStream {
    /// Kept alive to maintain audio flow
    stream: Stream,

    stats: Arc<StreamStats>,

    events: Sender<Event>,

    /// Current stream configuration
    pub config: StreamConfig,
}

impl OutputStream {
    /// Open the host's default output device
    pub fn open_default(
        config: &EngineConfig,
        device: Device,
        events: Sender<Event>,
    ) -> EngineResult<Self> {
        let host = cpal::default_host();
        let output = host
            .default_output_device()
            .ok_or(EngineError::NoDevicesFound)?;
        Self::open(&output, config, device, events)
    }

    /// Open `output` and start pulling blocks from `device`
    ///
    /// # Arguments
    ///
    /// * `output` - The hardware device to play on
    /// * `config` - Validated against itself; the mixer must cover the buffer size
    /// * `device` - Moved into the audio callback
    /// * `events` - Receives `Started`, `Stopped` and stream errors
    pub fn open(
        output: &cpal::Device,
        config: &EngineConfig,
        device: Device,
        events: Sender<Event>,
    ) -> EngineResult<Self> {
        config.validate()?;

        let cpal_config = CpalStreamConfig {
            channels: OUTPUT_CHANNELS,
            sample_rate: cpal::SampleRate(config.stream.sample_rate),
            buffer_size: cpal::BufferSize::Fixed(config.stream.buffer_size),
        };

        let stats = Arc::new(StreamStats::new());
        let stream = Self::build_output_stream(
            output,
            &cpal_config,
            device,
            Arc::clone(&stats),
            events.clone(),
        )?;

        stream
            .play()
            .map_err(|e| EngineError::StreamPlayError(e.to_string()))?;

        info!(
            "Output stream started on {}: {} Hz, {} frames ({:.1} ms)",
            output.name().unwrap_or_else(|_| "unknown device".to_string()),
            config.stream.sample_rate,
            config.stream.buffer_size,
            config.stream.latency_ms()
        );
        let _ = events.try_send(Event::Started);

        Ok(Self {
            stream,
            stats,
            events,
            config: config.stream.clone(),
        })
    }

    fn build_output_stream(
        output: &cpal::Device,
        config: &CpalStreamConfig,
        mut device: Device,
        stats: Arc<StreamStats>,
        event_sender: Sender<Event>,
    ) -> EngineResult<Stream> {
        let stream = output
            .build_output_stream(
                config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    // Real-time audio callback - NO allocations allowed here
                    device.process(data);
                    stats.record_block(data.len());
                },
                move |err| {
                    let _ = event_sender.try_send(Event::error(err));
                },
                None,
            )
            .map_err(|e| EngineError::StreamBuildError(e.to_string()))?;

        Ok(stream)
    }

    /// Pause the hardware stream
    pub fn pause(&self) -> EngineResult<()> {
        self.stream
            .pause()
            .map_err(|e| EngineError::StreamPlayError(e.to_string()))?;
        debug!("Output stream paused");
        let _ = self.events.try_send(Event::Stopped);
        Ok(())
    }

    /// Resume a paused hardware stream
    pub fn resume(&self) -> EngineResult<()> {
        self.stream
            .play()
            .map_err(|e| EngineError::StreamPlayError(e.to_string()))?;
        debug!("Output stream resumed");
        let _ = self.events.try_send(Event::Started);
        Ok(())
    }

    /// Counters updated from the audio callback
    pub fn stats(&self) -> &Arc<StreamStats> {
        &self.stats
    }
}

impl Drop for OutputStream {
    fn drop(&mut self) {
        if let Err(e) = self.stream.pause() {
            warn!("Failed to pause output stream on drop: {}", e);
        }
        info!(
            "Output stream closed after {} callbacks",
            self.stats.callbacks()
        );
        let _ = self.events.try_send(Event::Stopped);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mixer::Mixer;
    use crate::player::SamplePlayer;

    #[test]
    fn test_stats_defaults() {
        let stats = StreamStats::new();
        assert_eq!(stats.callbacks(), 0);
        assert_eq!(stats.frames_rendered(), 0);
    }

    #[test]
    fn test_stats_record_block() {
        let stats = StreamStats::new();
        stats.record_block(1024);
        stats.record_block(256);
        assert_eq!(stats.callbacks(), 2);
        assert_eq!(stats.frames_rendered(), 640);
    }

    #[test]
    fn test_invalid_config_rejected_before_hardware() {
        let host = cpal::default_host();
        let Some(output) = host.default_output_device() else {
            return;
        };

        let mut config = EngineConfig::default();
        config.mixer.max_block_frames = 16;
        let (sender, _receiver) = crossbeam_channel::unbounded();
        let result = OutputStream::open(&output, &config, Device::new(Mixer::default()), sender);
        assert!(matches!(result, Err(EngineError::ConfigError(_))));
    }

    // Hardware-dependent tests
    #[test]
    #[ignore = "requires audio hardware"]
    fn test_stream_plays_mixer() {
        let (sender, receiver) = crossbeam_channel::unbounded();
        let config = EngineConfig::default();

        let mixer = Mixer::new(&config.mixer);
        let tone: Vec<f32> = (0..4800)
            .map(|i| (i as f32 * 440.0 * std::f32::consts::TAU / 48000.0).sin() * 0.1)
            .collect();
        let player = SamplePlayer::new(tone, 4800, 1).unwrap();
        let controls = player.controls();
        mixer.add_channel(player);

        // May fail if no audio hardware, which is fine for CI
        if let Ok(stream) = OutputStream::open_default(&config, Device::new(mixer), sender) {
            assert!(matches!(receiver.try_recv(), Ok(Event::Started)));
            controls.play();
            std::thread::sleep(std::time::Duration::from_millis(200));
            assert!(stream.stats().callbacks() > 0);
            drop(stream);
            assert!(receiver.try_iter().any(|event| event == Event::Stopped));
        }
    }
}
