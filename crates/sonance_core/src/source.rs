//! Audio Source Trait
//!
//! The single "fill a buffer" capability shared by every producer and sink
//! in the core. Sample players, mixers and plain closures all implement it,
//! so a mixer can be a channel of another mixer without any type coupling.

/// A producer of interleaved stereo `f32` samples
///
/// # Real-time Safety Contract
///
/// `fill()` runs on the audio callback thread. Implementors MUST:
/// - NOT allocate or free heap memory
/// - NOT perform I/O or log
/// - NOT block on anything other than a bounded critical section
/// - complete in O(n) time where n = `out.len()`
pub trait AudioSource: Send {
    /// Write one block of interleaved stereo samples into `out`.
    ///
    /// Returns `true` if `out` now holds valid samples. Returning `false`
    /// means "no data": the caller substitutes silence and the contents of
    /// `out` are unspecified (implementations should leave it untouched).
    fn fill(&mut self, out: &mut [f32]) -> bool;
}

impl<F> AudioSource for F
where
    F: FnMut(&mut [f32]) -> bool + Send,
{
    #[inline]
    fn fill(&mut self, out: &mut [f32]) -> bool {
        self(out)
    }
}

/// Source that always produces the same sample value
///
/// Handy as a test tone or DC offset when checking a mix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Constant(pub f32);

impl AudioSource for Constant {
    fn fill(&mut self, out: &mut [f32]) -> bool {
        out.fill(self.0);
        true
    }
}

/// Source that never produces data
#[derive(Debug, Clone, Copy, Default)]
pub struct Silence;

impl AudioSource for Silence {
    fn fill(&mut self, _out: &mut [f32]) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closure_source() {
        let mut calls = 0;
        let mut source = |out: &mut [f32]| {
            calls += 1;
            out.fill(0.25);
            true
        };

        let mut buffer = vec![0.0; 4];
        assert!(source.fill(&mut buffer));
        assert_eq!(buffer, vec![0.25; 4]);
        drop(source);
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_constant_source() {
        let mut buffer = vec![0.0; 6];
        assert!(Constant(-0.5).fill(&mut buffer));
        assert!(buffer.iter().all(|&s| s == -0.5));
    }

    #[test]
    fn test_silence_leaves_buffer() {
        let mut buffer = vec![0.7; 4];
        assert!(!Silence.fill(&mut buffer));
        assert_eq!(buffer, vec![0.7; 4]);
    }

    #[test]
    fn test_boxed_dyn_source() {
        let mut sources: Vec<Box<dyn AudioSource>> =
            vec![Box::new(Constant(1.0)), Box::new(Silence)];
        let mut buffer = vec![0.0; 2];
        let filled: Vec<bool> = sources.iter_mut().map(|s| s.fill(&mut buffer)).collect();
        assert_eq!(filled, vec![true, false]);
    }
}
