//! Sonance Core - Real-time Audio Mixing
//!
//! This crate provides the core of the Sonance audio engine:
//! - Sample players over pre-loaded float PCM buffers (mono or stereo)
//! - A mixer whose channel list can be edited while it is playing
//! - A device adapter that always hands the hardware a full block
//! - An optional CPAL output stream that drives the whole chain
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Control Threads                        │
//! │  Mixer::add_channel / remove_channel    PlayerControls      │
//! └─────────────────────────────────────────────────────────────┘
//!               │ parking_lot::Mutex            │ atomics
//!               ▼                               ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       Audio Thread                          │
//! │   OutputStream ──▶ Device ──▶ Mixer ──▶ SamplePlayer ...    │
//! │              (Zero allocation in this path)                 │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every stage speaks the same [`AudioSource`] capability, so a mixer can be
//! a channel of another mixer.

mod config;
mod device;
mod error;
mod message;
mod mixer;
mod player;
mod signal;
mod source;
mod stream;

pub use config::{EngineConfig, MixerConfig, StreamConfig, OUTPUT_CHANNELS};
pub use device::Device;
pub use error::{EngineError, EngineResult};
pub use message::Event;
pub use mixer::{ChannelId, Mixer};
pub use player::{ChannelLayout, PlayerControls, SampleBuffer, SamplePlayer};
pub use signal::{Signal, Trigger};
pub use source::{AudioSource, Constant, Silence};
pub use stream::{OutputStream, StreamStats};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crate_exports() {
        // Verify public API is accessible
        let config = EngineConfig::default();
        let mixer = Mixer::new(&config.mixer);
        let _device = Device::new(mixer);
    }

    #[test]
    fn test_full_chain_with_listener() {
        let (sender, receiver) = crossbeam_channel::unbounded();
        let mixer = Mixer::with_max_block_frames(8);
        let mut device = Device::new(mixer.clone());

        let player = SamplePlayer::new(vec![0.5; 8], 4, 2)
            .unwrap()
            .with_signal(Trigger::with_listener(sender));
        let controls = player.controls();
        mixer.add_channel(player);
        mixer.add_channel(Constant(0.25));
        controls.play();

        let mut block = vec![0.0; 8];
        device.process(&mut block);
        assert!(block.iter().all(|&s| s == 0.75));
        assert_eq!(receiver.try_recv().ok(), Some(Event::PlaybackEnded));

        device.process(&mut block);
        assert!(block.iter().all(|&s| s == 0.25));
        assert!(receiver.try_recv().is_err());
    }
}
