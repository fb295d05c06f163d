//! Output Device Adapter
//!
//! The thinnest layer between a hardware callback and an [`AudioSource`]:
//! it asks the source for a block and substitutes silence when none comes.

use crate::source::AudioSource;

/// Callback adapter that always delivers a full block
pub struct Device {
    source: Box<dyn AudioSource>,
}

impl Device {
    pub fn new<S: AudioSource + 'static>(source: S) -> Self {
        Self {
            source: Box::new(source),
        }
    }

    /// Audio-thread entry point
    ///
    /// Every sample of `out` is written on every call: either by the source,
    /// or with zeros if the source reported no data.
    #[inline]
    pub fn process(&mut self, out: &mut [f32]) {
        if !self.source.fill(out) {
            out.fill(0.0);
        }
    }

    /// Give back the wrapped source
    pub fn into_inner(self) -> Box<dyn AudioSource> {
        self.source
    }
}

impl AudioSource for Device {
    fn fill(&mut self, out: &mut [f32]) -> bool {
        self.process(out);
        true
    }
}

impl std::fmt::Debug for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Device").finish_non_exhaustive()
    }
}
