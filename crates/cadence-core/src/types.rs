//! Common types for Cadence
//!
//! Fundamental audio types shared by the source manager, submix graph and
//! output layer: the interleaved multi-channel buffer and the integer handles
//! used to address voice slots and submixes.

use std::ops::{Index, IndexMut};

/// Default device sample rate (48kHz)
pub const DEFAULT_SAMPLE_RATE: u32 = 48000;

/// Maximum render block size to pre-allocate for real-time safety
///
/// Every per-voice and per-submix scratch buffer is allocated to this many
/// frames up front so the render thread never allocates.
pub const MAX_BUFFER_SIZE: usize = 8192;

/// Maximum number of channels a single source may carry
pub const MAX_INPUT_CHANNELS: usize = 8;

/// Maximum number of device output channels (7.1)
pub const MAX_OUTPUT_CHANNELS: usize = 8;

/// Audio sample type (32-bit float for all processing)
pub type Sample = f32;

/// Device format every render-side component is sized for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderFormat {
    pub sample_rate: u32,
    /// Device output channels
    pub num_channels: usize,
    /// Largest block the render thread will ever be asked for
    pub max_block_frames: usize,
}

impl RenderFormat {
    pub fn new(sample_rate: u32, num_channels: usize, max_block_frames: usize) -> Self {
        Self {
            sample_rate,
            num_channels,
            max_block_frames,
        }
    }

    #[inline]
    pub fn nyquist(&self) -> f32 {
        self.sample_rate as f32 / 2.0
    }
}

/// Stable index of a voice slot in the source manager
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceId(pub usize);

impl SourceId {
    #[inline]
    pub fn index(&self) -> usize {
        self.0
    }
}

impl std::fmt::Display for SourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "source#{}", self.0)
    }
}

/// Index of a submix in the submix graph arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubmixId(pub usize);

impl SubmixId {
    /// The master submix is always the first node of the graph
    pub const MASTER: SubmixId = SubmixId(0);

    #[inline]
    pub fn index(&self) -> usize {
        self.0
    }
}

impl std::fmt::Display for SubmixId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "submix#{}", self.0)
    }
}

/// An interleaved multi-channel buffer of samples
///
/// Layout is frame-major: `[f0c0, f0c1, ..., f1c0, f1c1, ...]`. This is the
/// primary buffer type used for source outputs, submix accumulators and the
/// final device buffer.
#[derive(Debug, Clone)]
pub struct AudioBuffer {
    samples: Vec<Sample>,
    num_channels: usize,
}

impl AudioBuffer {
    /// Create an empty buffer with room for `max_frames` frames
    pub fn with_capacity(num_channels: usize, max_frames: usize) -> Self {
        assert!(num_channels > 0, "AudioBuffer needs at least one channel");
        Self {
            samples: Vec::with_capacity(num_channels * max_frames),
            num_channels,
        }
    }

    /// Create a buffer of `num_frames` silent frames
    pub fn silence(num_channels: usize, num_frames: usize) -> Self {
        assert!(num_channels > 0, "AudioBuffer needs at least one channel");
        Self {
            samples: vec![0.0; num_channels * num_frames],
            num_channels,
        }
    }

    /// Create a buffer from interleaved samples
    pub fn from_interleaved(num_channels: usize, interleaved: &[Sample]) -> Self {
        assert!(num_channels > 0, "AudioBuffer needs at least one channel");
        assert!(
            interleaved.len() % num_channels == 0,
            "Interleaved length must be a multiple of the channel count"
        );
        Self {
            samples: interleaved.to_vec(),
            num_channels,
        }
    }

    #[inline]
    pub fn num_channels(&self) -> usize {
        self.num_channels
    }

    /// Number of frames (samples per channel)
    #[inline]
    pub fn num_frames(&self) -> usize {
        self.samples.len() / self.num_channels
    }

    /// Total number of interleaved samples
    #[inline]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Set the working length of a pre-allocated buffer (real-time safe)
    ///
    /// Newly exposed frames are silent. Never allocates as long as the buffer
    /// was created with enough capacity.
    #[inline]
    pub fn set_num_frames(&mut self, num_frames: usize) {
        let len = num_frames * self.num_channels;
        if len > self.samples.len() {
            debug_assert!(
                len <= self.samples.capacity(),
                "set_num_frames called with len > capacity"
            );
            self.samples.resize(len, 0.0);
        } else {
            self.samples.truncate(len);
        }
    }

    /// Change channel count and length within the existing allocation
    ///
    /// Contents become silence. Used for scratch buffers shared by voices of
    /// different widths.
    #[inline]
    pub fn reshape(&mut self, num_channels: usize, num_frames: usize) {
        debug_assert!(num_channels > 0);
        debug_assert!(
            num_channels * num_frames <= self.samples.capacity(),
            "reshape called with len > capacity"
        );
        self.samples.clear();
        self.num_channels = num_channels;
        self.samples.resize(num_channels * num_frames, 0.0);
    }

    /// Fill the buffer with silence
    pub fn fill_silence(&mut self) {
        self.samples.fill(0.0);
    }

    #[inline]
    pub fn as_slice(&self) -> &[Sample] {
        &self.samples
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [Sample] {
        &mut self.samples
    }

    /// Samples of one frame
    #[inline]
    pub fn frame(&self, index: usize) -> &[Sample] {
        let start = index * self.num_channels;
        &self.samples[start..start + self.num_channels]
    }

    #[inline]
    pub fn frame_mut(&mut self, index: usize) -> &mut [Sample] {
        let start = index * self.num_channels;
        &mut self.samples[start..start + self.num_channels]
    }

    /// Iterate over frames
    pub fn frames(&self) -> std::slice::ChunksExact<'_, Sample> {
        self.samples.chunks_exact(self.num_channels)
    }

    /// Iterate mutably over frames
    pub fn frames_mut(&mut self) -> std::slice::ChunksExactMut<'_, Sample> {
        self.samples.chunks_exact_mut(self.num_channels)
    }

    /// Add another buffer to this one (summing samples)
    pub fn add_buffer(&mut self, other: &AudioBuffer) {
        self.add_scaled(other, 1.0);
    }

    /// Add another buffer scaled by `gain`
    pub fn add_scaled(&mut self, other: &AudioBuffer, gain: Sample) {
        assert_eq!(self.num_channels, other.num_channels, "Channel counts must match");
        assert_eq!(self.len(), other.len(), "Buffer lengths must match");
        for (dst, src) in self.samples.iter_mut().zip(other.samples.iter()) {
            *dst += *src * gain;
        }
    }

    /// Scale all samples by a factor
    pub fn scale(&mut self, factor: Sample) {
        for sample in &mut self.samples {
            *sample *= factor;
        }
    }

    /// Copy from another buffer of the same channel count (real-time safe if pre-allocated)
    pub fn copy_from(&mut self, other: &AudioBuffer) {
        assert_eq!(self.num_channels, other.num_channels, "Channel counts must match");
        let len = other.samples.len();
        debug_assert!(
            len <= self.samples.capacity(),
            "copy_from: insufficient capacity ({} < {})",
            self.samples.capacity(),
            len
        );
        if self.samples.len() != len {
            self.samples.resize(len, 0.0);
        }
        self.samples.copy_from_slice(&other.samples);
    }

    /// Peak absolute sample value
    pub fn peak(&self) -> Sample {
        self.samples.iter().map(|s| s.abs()).fold(0.0, Sample::max)
    }
}

impl Index<usize> for AudioBuffer {
    type Output = Sample;

    #[inline]
    fn index(&self, index: usize) -> &Self::Output {
        &self.samples[index]
    }
}

impl IndexMut<usize> for AudioBuffer {
    #[inline]
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.samples[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_from_interleaved() {
        let buffer = AudioBuffer::from_interleaved(2, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);

        assert_eq!(buffer.num_frames(), 3);
        assert_eq!(buffer.frame(0), &[1.0, 2.0]);
        assert_eq!(buffer.frame(2), &[5.0, 6.0]);
    }

    #[test]
    fn test_set_num_frames() {
        let mut buffer = AudioBuffer::with_capacity(2, 128);
        buffer.set_num_frames(64);

        assert_eq!(buffer.num_frames(), 64);
        assert!(buffer.as_slice().iter().all(|s| *s == 0.0));

        buffer.as_mut_slice()[0] = 1.0;
        buffer.set_num_frames(16);
        assert_eq!(buffer.len(), 32);
        assert_eq!(buffer[0], 1.0);
    }

    #[test]
    fn test_add_scaled() {
        let mut a = AudioBuffer::from_interleaved(2, &[1.0, 1.0, 1.0, 1.0]);
        let b = AudioBuffer::from_interleaved(2, &[0.5, 1.0, 1.5, 2.0]);
        a.add_scaled(&b, 2.0);

        assert_eq!(a.as_slice(), &[2.0, 3.0, 4.0, 5.0]);
    }

    #[test]
    fn test_peak() {
        let buffer = AudioBuffer::from_interleaved(1, &[0.1, -0.8, 0.3]);
        assert_eq!(buffer.peak(), 0.8);
    }
}
