//! PCM buffers submitted to voices
//!
//! Buffers are interleaved 16-bit signed or 32-bit float. They are created on
//! the game thread, wrapped in `basedrop::Shared` and handed to the render
//! thread, which drops them when fully consumed; the actual deallocation
//! happens on the collector thread.

use super::error::{SourceError, SourceResult};
use serde::{Deserialize, Serialize};

/// Scale applied to 16-bit samples
const I16_SCALE: f32 = 1.0 / 32768.0;

/// Sample encoding of a PCM buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleFormat {
    /// 16-bit signed little-endian
    I16,
    /// 32-bit IEEE float little-endian
    F32,
}

impl SampleFormat {
    pub fn bytes_per_sample(self) -> usize {
        match self {
            SampleFormat::I16 => 2,
            SampleFormat::F32 => 4,
        }
    }
}

/// Interleaved sample storage
#[derive(Debug, Clone, PartialEq)]
pub enum PcmData {
    I16(Vec<i16>),
    F32(Vec<f32>),
}

impl PcmData {
    fn len(&self) -> usize {
        match self {
            PcmData::I16(samples) => samples.len(),
            PcmData::F32(samples) => samples.len(),
        }
    }
}

/// A block of interleaved PCM queued on a voice
#[derive(Debug, Clone, PartialEq)]
pub struct PcmBuffer {
    data: PcmData,
    num_channels: usize,
    looping: bool,
}

impl PcmBuffer {
    /// Wrap interleaved 16-bit samples
    ///
    /// # Panics
    ///
    /// If `num_channels` is zero. Use [`PcmBuffer::from_le_bytes`] for
    /// untrusted input; it reports this as [`SourceError::InvalidPcm`].
    pub fn from_i16(num_channels: usize, samples: Vec<i16>) -> Self {
        Self::new(PcmData::I16(samples), num_channels)
    }

    /// Wrap interleaved float samples
    ///
    /// # Panics
    ///
    /// If `num_channels` is zero.
    pub fn from_f32(num_channels: usize, samples: Vec<f32>) -> Self {
        Self::new(PcmData::F32(samples), num_channels)
    }

    fn new(data: PcmData, num_channels: usize) -> Self {
        assert!(num_channels > 0, "PcmBuffer needs at least one channel");
        Self {
            data,
            num_channels,
            looping: false,
        }
    }

    /// Decode raw little-endian bytes
    pub fn from_le_bytes(
        format: SampleFormat,
        num_channels: usize,
        bytes: &[u8],
    ) -> SourceResult<Self> {
        if num_channels == 0 {
            return Err(SourceError::InvalidPcm("zero channels".to_string()));
        }
        let frame_bytes = format.bytes_per_sample() * num_channels;
        if bytes.len() % frame_bytes != 0 {
            return Err(SourceError::InvalidPcm(format!(
                "{} bytes is not a whole number of {}-byte frames",
                bytes.len(),
                frame_bytes
            )));
        }

        let data = match format {
            SampleFormat::I16 => {
                let mut samples = vec![0i16; bytes.len() / 2];
                bytemuck::cast_slice_mut::<i16, u8>(&mut samples).copy_from_slice(bytes);
                for sample in &mut samples {
                    *sample = i16::from_le(*sample);
                }
                PcmData::I16(samples)
            }
            SampleFormat::F32 => {
                let mut bits = vec![0u32; bytes.len() / 4];
                bytemuck::cast_slice_mut::<u32, u8>(&mut bits).copy_from_slice(bytes);
                PcmData::F32(bits.into_iter().map(|b| f32::from_bits(u32::from_le(b))).collect())
            }
        };
        Ok(Self::new(data, num_channels))
    }

    /// Mark the buffer as infinitely looping
    pub fn with_looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    #[inline]
    pub fn is_looping(&self) -> bool {
        self.looping
    }

    #[inline]
    pub fn num_channels(&self) -> usize {
        self.num_channels
    }

    #[inline]
    pub fn num_frames(&self) -> usize {
        self.data.len() / self.num_channels
    }

    /// Size of the sample data in bytes
    pub fn num_bytes(&self) -> usize {
        self.data.len() * self.format().bytes_per_sample()
    }

    pub fn format(&self) -> SampleFormat {
        match self.data {
            PcmData::I16(_) => SampleFormat::I16,
            PcmData::F32(_) => SampleFormat::F32,
        }
    }

    pub fn data(&self) -> &PcmData {
        &self.data
    }

    /// One sample as float, 16-bit scaled by 1/32768
    #[inline]
    pub fn sample(&self, frame: usize, channel: usize) -> f32 {
        let index = frame * self.num_channels + channel;
        match &self.data {
            PcmData::I16(samples) => samples[index] as f32 * I16_SCALE,
            PcmData::F32(samples) => samples[index],
        }
    }

    /// Read one frame as float into `out` (`out.len()` channels)
    #[inline]
    pub fn read_frame(&self, frame: usize, out: &mut [f32]) {
        let start = frame * self.num_channels;
        match &self.data {
            PcmData::I16(samples) => {
                for (dst, &src) in out.iter_mut().zip(&samples[start..start + self.num_channels]) {
                    *dst = src as f32 * I16_SCALE;
                }
            }
            PcmData::F32(samples) => {
                for (dst, &src) in out.iter_mut().zip(&samples[start..start + self.num_channels]) {
                    *dst = src;
                }
            }
        }
    }

    /// Copy out `num_frames` frames starting at `start` (used to chunk long clips)
    pub fn slice(&self, start: usize, num_frames: usize) -> Self {
        let begin = start * self.num_channels;
        let end = (start + num_frames) * self.num_channels;
        let data = match &self.data {
            PcmData::I16(samples) => PcmData::I16(samples[begin..end].to_vec()),
            PcmData::F32(samples) => PcmData::F32(samples[begin..end].to_vec()),
        };
        Self::new(data, self.num_channels)
    }
}
