//! Channel Mixer
//!
//! Sums any number of [`AudioSource`]s into one interleaved stereo stream.
//!
//! # Locking
//!
//! One `parking_lot::Mutex` guards the channel list and the scratch buffer.
//! The audio thread holds it for one bounded pass over the list; control
//! threads hold it for a single push or unlink. Nothing is allocated or
//! freed on the audio thread: the scratch buffer is sized once at
//! construction, and removed sources are handed back to the caller to drop.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::config::{MixerConfig, OUTPUT_CHANNELS};
use crate::source::AudioSource;

/// Handle to a channel inside a [`Mixer`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChannelId(u64);

impl ChannelId {
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

/// One participant in a mix
struct MixerChannel {
    id: ChannelId,
    source: Box<dyn AudioSource>,
}

struct MixerState {
    /// Stored oldest first; mixed newest first
    channels: Vec<MixerChannel>,

    /// Per-channel render target, never resized
    scratch: Box<[f32]>,

    next_id: u64,
}

/// Real-time mixer with a concurrently editable channel list
///
/// Clones share the same channel list, so one clone can live inside an
/// output callback while others add and remove channels. A mixer is itself
/// an [`AudioSource`] and can be nested inside another mixer; adding a mixer
/// to itself deadlocks on the first block.
#[derive(Clone)]
pub struct Mixer {
    state: Arc<Mutex<MixerState>>,
}

impl Mixer {
    pub fn new(config: &MixerConfig) -> Self {
        Self {
            state: Arc::new(Mutex::new(MixerState {
                channels: Vec::new(),
                scratch: vec![0.0; config.scratch_len()].into_boxed_slice(),
                next_id: 0,
            })),
        }
    }

    /// Create a mixer whose scratch buffer holds `frames` stereo frames
    ///
    /// Blocks larger than this are mixed in several passes.
    pub fn with_max_block_frames(frames: usize) -> Self {
        Self::new(&MixerConfig {
            max_block_frames: frames,
        })
    }

    /// Add a source to the mix
    ///
    /// Safe to call while another thread is mixing; the new channel joins at
    /// the next block.
    pub fn add_channel<S: AudioSource + 'static>(&self, source: S) -> ChannelId {
        self.add_boxed(Box::new(source))
    }

    /// Add an already boxed source, e.g. one returned by [`remove_channel`](Self::remove_channel)
    pub fn add_boxed(&self, source: Box<dyn AudioSource>) -> ChannelId {
        let (id, active) = {
            let mut state = self.state.lock();
            let id = ChannelId(state.next_id);
            state.next_id += 1;
            state.channels.push(MixerChannel { id, source });
            (id, state.channels.len())
        };
        // Log only after the guard is gone; the audio thread waits on this lock
        debug!("Mixer: added channel {} ({} active)", id.as_u64(), active);
        id
    }

    /// Unlink a channel and hand its source back to the caller
    ///
    /// Returns `None` if the id is unknown (or was already removed).
    pub fn remove_channel(&self, id: ChannelId) -> Option<Box<dyn AudioSource>> {
        let (channel, active) = {
            let mut state = self.state.lock();
            let index = state.channels.iter().position(|c| c.id == id)?;
            let channel = state.channels.remove(index);
            (channel, state.channels.len())
        };
        debug!("Mixer: removed channel {} ({} active)", id.as_u64(), active);
        Some(channel.source)
    }

    /// Remove every channel, returning the sources newest first
    pub fn clear(&self) -> Vec<Box<dyn AudioSource>> {
        let channels = std::mem::take(&mut self.state.lock().channels);
        debug!("Mixer: cleared {} channels", channels.len());
        channels.into_iter().rev().map(|c| c.source).collect()
    }

    pub fn contains(&self, id: ChannelId) -> bool {
        self.state.lock().channels.iter().any(|c| c.id == id)
    }

    pub fn channel_count(&self) -> usize {
        self.state.lock().channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().channels.is_empty()
    }

    /// Channel ids in mixing order (newest first)
    pub fn channel_ids(&self) -> Vec<ChannelId> {
        self.state.lock().channels.iter().rev().map(|c| c.id).collect()
    }

    /// Largest block mixed in a single pass, in stereo frames
    pub fn max_block_frames(&self) -> usize {
        self.state.lock().scratch.len() / OUTPUT_CHANNELS as usize
    }

    /// Mix one block of every channel into `out`
    ///
    /// Returns `false` and leaves `out` untouched when there are no channels.
    /// Otherwise `out` is zeroed, every channel that reports data is added
    /// sample by sample, and the result is `true` even if all were silent.
    pub fn mix(&self, out: &mut [f32]) -> bool {
        let mut guard = self.state.lock();
        let MixerState {
            channels, scratch, ..
        } = &mut *guard;

        if channels.is_empty() {
            return false;
        }

        out.fill(0.0);

        for chunk in out.chunks_mut(scratch.len()) {
            let scratch = &mut scratch[..chunk.len()];
            for channel in channels.iter_mut().rev() {
                if channel.source.fill(scratch) {
                    for (sample, &input) in chunk.iter_mut().zip(scratch.iter()) {
                        *sample += input;
                    }
                }
            }
        }

        true
    }
}

impl AudioSource for Mixer {
    #[inline]
    fn fill(&mut self, out: &mut [f32]) -> bool {
        self.mix(out)
    }
}

impl Default for Mixer {
    fn default() -> Self {
        Self::new(&MixerConfig::default())
    }
}

impl std::fmt::Debug for Mixer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mixer")
            .field("channels", &self.channel_count())
            .field("max_block_frames", &self.max_block_frames())
            .finish()
    }
}
