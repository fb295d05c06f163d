//! Engine, Stream and Mixer Configuration

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{EngineError, EngineResult};

/// Output is always interleaved stereo
pub const OUTPUT_CHANNELS: u16 = 2;

/// Audio output stream configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Sample rate in Hz (e.g., 44100, 48000, 96000)
    pub sample_rate: u32,

    /// Buffer size in frames (lower = less latency, higher = more stability)
    pub buffer_size: u32,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48000,
            buffer_size: 512,
        }
    }
}

impl StreamConfig {
    /// Number of interleaved output channels
    pub fn channels(&self) -> u16 {
        OUTPUT_CHANNELS
    }

    /// Calculate latency in milliseconds for this configuration
    pub fn latency_ms(&self) -> f32 {
        (self.buffer_size as f32 / self.sample_rate as f32) * 1000.0
    }

    /// Bytes per output frame (f32 samples * channels)
    pub fn bytes_per_frame(&self) -> usize {
        std::mem::size_of::<f32>() * OUTPUT_CHANNELS as usize
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.sample_rate < 8000 || self.sample_rate > 192000 {
            return Err(format!("Invalid sample rate: {}", self.sample_rate));
        }
        if self.buffer_size < 32 || self.buffer_size > 8192 {
            return Err(format!("Invalid buffer size: {}", self.buffer_size));
        }
        Ok(())
    }
}

/// Mixer configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MixerConfig {
    /// Largest block (in stereo frames) the mixer expects per callback.
    /// The scratch buffer is sized from this once and never grows.
    pub max_block_frames: usize,
}

impl Default for MixerConfig {
    fn default() -> Self {
        Self {
            max_block_frames: 4096,
        }
    }
}

impl MixerConfig {
    /// Scratch buffer length in samples (at least one frame)
    pub fn scratch_len(&self) -> usize {
        self.max_block_frames.max(1) * OUTPUT_CHANNELS as usize
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.max_block_frames == 0 {
            return Err("Mixer max block size must be at least one frame".to_string());
        }
        Ok(())
    }
}

/// Overall engine configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Output stream configuration
    pub stream: StreamConfig,

    /// Mixer configuration
    #[serde(default)]
    pub mixer: MixerConfig,
}

impl EngineConfig {
    /// Create config optimized for low latency
    pub fn low_latency() -> Self {
        Self {
            stream: StreamConfig {
                sample_rate: 48000,
                buffer_size: 128, // ~2.6ms latency
            },
            mixer: MixerConfig {
                max_block_frames: 1024,
            },
        }
    }

    /// Create config optimized for stability
    pub fn stable() -> Self {
        Self {
            stream: StreamConfig {
                sample_rate: 48000,
                buffer_size: 1024, // ~21ms latency
            },
            mixer: MixerConfig {
                max_block_frames: 8192,
            },
        }
    }

    /// Validate the stream and mixer settings against each other
    pub fn validate(&self) -> EngineResult<()> {
        self.stream.validate().map_err(EngineError::ConfigError)?;
        self.mixer.validate().map_err(EngineError::ConfigError)?;

        if self.mixer.max_block_frames < self.stream.buffer_size as usize {
            return Err(EngineError::ConfigError(format!(
                "Mixer max block ({} frames) is smaller than the stream buffer ({} frames)",
                self.mixer.max_block_frames, self.stream.buffer_size
            )));
        }
        Ok(())
    }

    /// Parse and validate a JSON configuration
    pub fn from_json_str(json: &str) -> EngineResult<Self> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON configuration file
    pub fn load(path: impl AsRef<Path>) -> EngineResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let config = Self::from_json_str(&json)?;
        debug!("Loaded engine config from {}", path.display());
        Ok(config)
    }

    pub fn to_json_string(&self) -> EngineResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
