//! Decode collaborators feeding voices with PCM
//!
//! A [`Decoder`] is owned by the game-side controller, one per streaming
//! voice. Whenever the render thread reports that a queued buffer was
//! consumed, the controller asks the decoder for the next one, keeping a
//! fixed number of buffers in flight.

use super::pcm::PcmBuffer;

/// Produces successive PCM buffers for one voice
pub trait Decoder: Send {
    fn num_channels(&self) -> usize;

    fn sample_rate(&self) -> u32;

    /// Next buffer, or `None` once the stream is exhausted
    fn decode_next(&mut self) -> Option<PcmBuffer>;
}

/// Streams an in-memory clip in fixed-size chunks
///
/// With `looping` the clip restarts after its last chunk and the stream
/// never ends.
pub struct PcmDecoder {
    clip: PcmBuffer,
    sample_rate: u32,
    chunk_frames: usize,
    position: usize,
    looping: bool,
}

impl PcmDecoder {
    pub fn new(clip: PcmBuffer, sample_rate: u32, chunk_frames: usize) -> Self {
        Self {
            clip,
            sample_rate,
            chunk_frames: chunk_frames.max(1),
            position: 0,
            looping: false,
        }
    }

    pub fn with_looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }
}

impl Decoder for PcmDecoder {
    fn num_channels(&self) -> usize {
        self.clip.num_channels()
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn decode_next(&mut self) -> Option<PcmBuffer> {
        let total = self.clip.num_frames();
        if total == 0 {
            return None;
        }
        if self.position >= total {
            if !self.looping {
                return None;
            }
            self.position = 0;
        }

        let frames = self.chunk_frames.min(total - self.position);
        let chunk = self.clip.slice(self.position, frames);
        self.position += frames;
        Some(chunk)
    }
}

/// Procedural sine tone, optionally limited to a duration
pub struct SineDecoder {
    frequency: f32,
    amplitude: f32,
    sample_rate: u32,
    num_channels: usize,
    chunk_frames: usize,
    phase: f32,
    remaining: Option<u64>,
}

impl SineDecoder {
    pub fn new(frequency: f32, sample_rate: u32, num_channels: usize) -> Self {
        Self {
            frequency,
            amplitude: 0.5,
            sample_rate,
            num_channels: num_channels.max(1),
            chunk_frames: 1024,
            phase: 0.0,
            remaining: None,
        }
    }

    pub fn with_amplitude(mut self, amplitude: f32) -> Self {
        self.amplitude = amplitude;
        self
    }

    pub fn with_chunk_frames(mut self, chunk_frames: usize) -> Self {
        self.chunk_frames = chunk_frames.max(1);
        self
    }

    /// Stop after this many seconds
    pub fn with_duration(mut self, seconds: f32) -> Self {
        self.remaining = Some((seconds.max(0.0) * self.sample_rate as f32) as u64);
        self
    }
}

impl Decoder for SineDecoder {
    fn num_channels(&self) -> usize {
        self.num_channels
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn decode_next(&mut self) -> Option<PcmBuffer> {
        let frames = match self.remaining {
            Some(0) => return None,
            Some(remaining) => (self.chunk_frames as u64).min(remaining) as usize,
            None => self.chunk_frames,
        };
        if let Some(remaining) = self.remaining.as_mut() {
            *remaining -= frames as u64;
        }

        let increment = self.frequency / self.sample_rate as f32;
        let mut samples = Vec::with_capacity(frames * self.num_channels);
        for _ in 0..frames {
            let value = self.amplitude * (std::f32::consts::TAU * self.phase).sin();
            samples.extend(std::iter::repeat(value).take(self.num_channels));
            self.phase = (self.phase + increment).fract();
        }
        Some(PcmBuffer::from_f32(self.num_channels, samples))
    }
}
