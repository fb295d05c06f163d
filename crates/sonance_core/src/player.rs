//! Sample Player
//!
//! Plays one pre-loaded PCM buffer as interleaved stereo, upmixing mono
//! material, and fires an end signal when the cursor reaches the last frame.
//!
//! # Thread Model
//!
//! ```text
//! Control thread                       Audio thread
//!  PlayerControls ──play/pause──▶ transport (AtomicU64) ◀── fill() auto-pause (CAS)
//!                 ──seek──────▶ pending_seek (AtomicUsize) ──▶ applied at block start
//!                 ◀─position─── position (AtomicUsize) ◀── fill() publishes pos
//! ```
//!
//! The cursor itself is only ever written by `fill()`. Seeks take effect at
//! the next block boundary, so the audio thread never waits on a lock.
//!
//! The transport word packs the playing flag with a counter bumped by every
//! `play()`/`pause()`. The end-of-buffer auto-pause is a compare-and-swap
//! against the word read at block start, so it can never overwrite a
//! transport change made while the block was running.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use tracing::debug;

use crate::error::{EngineError, EngineResult};
use crate::signal::{Signal, Trigger};
use crate::source::AudioSource;

/// No seek pending
const NO_SEEK: usize = usize::MAX;

/// Playing flag in the transport word; the remaining bits count play/pause calls
const PLAYING: u64 = 1;

/// Channel layout of a sample buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelLayout {
    Mono,
    Stereo,
}

impl ChannelLayout {
    /// Only mono and stereo material is supported
    pub fn from_count(channels: u16) -> EngineResult<Self> {
        match channels {
            1 => Ok(ChannelLayout::Mono),
            2 => Ok(ChannelLayout::Stereo),
            other => Err(EngineError::UnsupportedChannelCount(other)),
        }
    }

    pub fn channel_count(self) -> usize {
        match self {
            ChannelLayout::Mono => 1,
            ChannelLayout::Stereo => 2,
        }
    }
}

/// Immutable interleaved PCM data shared between players
#[derive(Debug, Clone)]
pub struct SampleBuffer {
    samples: Arc<[f32]>,
    frames: usize,
    layout: ChannelLayout,
}

impl SampleBuffer {
    /// Wrap `frames` frames of interleaved samples with `channels` channels
    ///
    /// Fails eagerly on channel counts other than 1 or 2, and when `samples`
    /// holds fewer than `frames * channels` values. Extra trailing samples
    /// are ignored.
    pub fn new(samples: impl Into<Arc<[f32]>>, frames: usize, channels: u16) -> EngineResult<Self> {
        let layout = ChannelLayout::from_count(channels)?;
        let samples = samples.into();

        let expected = frames
            .checked_mul(layout.channel_count())
            .ok_or(EngineError::BufferTooShort {
                expected: usize::MAX,
                got: samples.len(),
            })?;
        if samples.len() < expected {
            return Err(EngineError::BufferTooShort {
                expected,
                got: samples.len(),
            });
        }

        Ok(Self {
            samples,
            frames,
            layout,
        })
    }

    /// Wrap interleaved samples, deriving the frame count from their length
    pub fn from_interleaved(samples: impl Into<Arc<[f32]>>, channels: u16) -> EngineResult<Self> {
        let layout = ChannelLayout::from_count(channels)?;
        let samples = samples.into();
        let frames = samples.len() / layout.channel_count();
        Self::new(samples, frames, channels)
    }

    pub fn frames(&self) -> usize {
        self.frames
    }

    pub fn layout(&self) -> ChannelLayout {
        self.layout
    }

    pub fn channels(&self) -> usize {
        self.layout.channel_count()
    }

    /// Valid samples (`frames * channels` values)
    pub fn samples(&self) -> &[f32] {
        &self.samples[..self.frames * self.channels()]
    }

    /// Playback length at the given sample rate
    pub fn duration_secs(&self, sample_rate: u32) -> f64 {
        self.frames as f64 / sample_rate as f64
    }
}

/// State shared between a player and its controls
struct PlayerShared {
    transport: AtomicU64,
    pending_seek: AtomicUsize,
    position: AtomicUsize,
}

impl PlayerShared {
    fn new() -> Self {
        Self {
            transport: AtomicU64::new(0),
            pending_seek: AtomicUsize::new(NO_SEEK),
            position: AtomicUsize::new(0),
        }
    }

    fn set_playing(&self, playing: bool) {
        let _ = self
            .transport
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |word| {
                Some(((word >> 1).wrapping_add(1) << 1) | playing as u64)
            });
    }

    fn is_playing(&self) -> bool {
        self.transport.load(Ordering::Acquire) & PLAYING != 0
    }

    /// Clear the playing flag only if no play/pause happened since `observed`
    ///
    /// Returns whether the player was paused.
    fn auto_pause(&self, observed: u64) -> bool {
        self.transport
            .compare_exchange(
                observed,
                observed & !PLAYING,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }
}

/// Thread-safe remote for a [`SamplePlayer`]
///
/// Stays valid after the player has been moved into a mixer.
#[derive(Clone)]
pub struct PlayerControls {
    shared: Arc<PlayerShared>,
    frames: usize,
}

impl PlayerControls {
    pub fn play(&self) {
        self.shared.set_playing(true);
    }

    pub fn pause(&self) {
        self.shared.set_playing(false);
    }

    /// Request a new cursor position, applied at the start of the next block
    ///
    /// A player found at the end position pauses itself, unless `play` or
    /// `pause` was called after that block started. So `seek(0)` followed by
    /// `play()` always replays a finished sound, even while blocks are
    /// running. The reverse order can still lose the replay: a block landing
    /// between `play()` and `seek(0)` pauses at the end, and a seek on its
    /// own never resumes a player that has paused itself.
    pub fn seek(&self, frame: usize) {
        self.shared
            .pending_seek
            .store(frame.min(self.frames), Ordering::Release);
    }

    pub fn is_playing(&self) -> bool {
        self.shared.is_playing()
    }

    /// Current cursor, or the pending seek target if one is queued
    pub fn position(&self) -> usize {
        match self.shared.pending_seek.load(Ordering::Acquire) {
            NO_SEEK => self.shared.position.load(Ordering::Acquire),
            target => target,
        }
    }

    pub fn frames(&self) -> usize {
        self.frames
    }

    /// Whether the cursor sits at the end of the buffer
    pub fn is_finished(&self) -> bool {
        self.position() >= self.frames
    }
}

impl std::fmt::Debug for PlayerControls {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlayerControls")
            .field("playing", &self.is_playing())
            .field("position", &self.position())
            .field("frames", &self.frames)
            .finish()
    }
}

/// Plays a [`SampleBuffer`] as interleaved stereo blocks
///
/// Starts paused at frame 0. There is no terminal state: a finished player
/// can be rewound with `seek(0)` and played again.
pub struct SamplePlayer {
    buffer: SampleBuffer,
    pos: usize,
    shared: Arc<PlayerShared>,
    end_signal: Arc<dyn Signal>,
}

impl SamplePlayer {
    /// Create a paused player over `frames` frames of `channels`-channel data
    pub fn new(samples: impl Into<Arc<[f32]>>, frames: usize, channels: u16) -> EngineResult<Self> {
        Ok(Self::from_buffer(SampleBuffer::new(samples, frames, channels)?))
    }

    /// Create a paused player over an existing buffer
    ///
    /// The end signal defaults to a fresh [`Trigger`]; replace it with
    /// [`with_signal`](Self::with_signal) to observe it.
    pub fn from_buffer(buffer: SampleBuffer) -> Self {
        debug!(
            "Created sample player: {} frames, {:?}",
            buffer.frames(),
            buffer.layout()
        );

        Self {
            buffer,
            pos: 0,
            shared: Arc::new(PlayerShared::new()),
            end_signal: Arc::new(Trigger::new()),
        }
    }

    /// Replace the end-of-playback signal
    pub fn with_signal<S: Signal + 'static>(mut self, signal: S) -> Self {
        self.end_signal = Arc::new(signal);
        self
    }

    /// Get a remote that can drive this player from any thread
    pub fn controls(&self) -> PlayerControls {
        PlayerControls {
            shared: Arc::clone(&self.shared),
            frames: self.buffer.frames(),
        }
    }

    pub fn play(&self) {
        self.shared.set_playing(true);
    }

    pub fn pause(&self) {
        self.shared.set_playing(false);
    }

    /// See [`PlayerControls::seek`]
    pub fn seek(&self, frame: usize) {
        self.controls().seek(frame);
    }

    pub fn is_playing(&self) -> bool {
        self.shared.is_playing()
    }

    pub fn position(&self) -> usize {
        self.controls().position()
    }

    pub fn frames(&self) -> usize {
        self.buffer.frames()
    }

    pub fn buffer(&self) -> &SampleBuffer {
        &self.buffer
    }

    /// Copy `count` frames starting at the cursor into `out` as stereo
    #[inline]
    fn write_frames(&self, out: &mut [f32], count: usize) {
        let samples = self.buffer.samples();
        match self.buffer.layout() {
            ChannelLayout::Stereo => {
                let start = self.pos * 2;
                out[..count * 2].copy_from_slice(&samples[start..start + count * 2]);
            }
            ChannelLayout::Mono => {
                let src = &samples[self.pos..self.pos + count];
                for (frame, &sample) in out[..count * 2].chunks_exact_mut(2).zip(src) {
                    frame[0] = sample;
                    frame[1] = sample;
                }
            }
        }
    }
}

impl AudioSource for SamplePlayer {
    fn fill(&mut self, out: &mut [f32]) -> bool {
        let frame_count = out.len() / 2;
        let frames = self.buffer.frames();

        // Read before the seek slot, so a seek + play landing after this
        // point always changes the word and defeats the auto-pause
        let transport = self.shared.transport.load(Ordering::Acquire);

        let seek = self.shared.pending_seek.swap(NO_SEEK, Ordering::AcqRel);
        if seek != NO_SEEK {
            self.pos = seek;
        }
        self.pos = self.pos.min(frames);
        self.shared.position.store(self.pos, Ordering::Release);

        if transport & PLAYING == 0 {
            return false;
        }
        if self.pos == frames {
            self.shared.auto_pause(transport);
            return false;
        }

        let copy_count = (frames - self.pos).min(frame_count);
        self.write_frames(out, copy_count);
        // Tail silence when the buffer runs out mid-block
        out[copy_count * 2..].fill(0.0);

        self.pos += copy_count;
        self.shared.position.store(self.pos, Ordering::Release);

        if self.pos >= frames {
            self.end_signal.fire();
        }
        true
    }
}

impl std::fmt::Debug for SamplePlayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SamplePlayer")
            .field("frames", &self.buffer.frames())
            .field("layout", &self.buffer.layout())
            .field("pos", &self.pos)
            .field("playing", &self.is_playing())
            .finish()
    }
}
