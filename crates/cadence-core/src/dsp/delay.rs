//! Fractional delay line and Schroeder all-pass

use super::{lerp, underflow_clamp};

/// Single-channel circular delay line with linearly interpolated reads
///
/// Delays are measured relative to the next write: a delay of `1.0` returns
/// the most recently written sample. The write index advances one sample per
/// [`write`](Self::write).
#[derive(Debug, Clone)]
pub struct DelayLine {
    buffer: Vec<f32>,
    write_pos: usize,
    delay: f32,
    max_delay: f32,
}

impl DelayLine {
    /// Create a delay line able to hold `max_delay` samples of history
    pub fn new(max_delay: usize) -> Self {
        let max_delay = max_delay.max(1);
        Self {
            buffer: vec![0.0; max_delay + 2],
            write_pos: 0,
            delay: max_delay as f32,
            max_delay: max_delay as f32,
        }
    }

    /// Set the delay used by [`process`](Self::process), clamped to `1..=max_delay`
    pub fn set_delay(&mut self, samples: f32) {
        self.delay = samples.clamp(1.0, self.max_delay);
    }

    pub fn delay(&self) -> f32 {
        self.delay
    }

    pub fn max_delay(&self) -> f32 {
        self.max_delay
    }

    /// Read the sample written `delay` samples ago (fractional)
    #[inline]
    pub fn read_at(&self, delay: f32) -> f32 {
        let len = self.buffer.len();
        let delay = delay.clamp(1.0, self.max_delay);

        let mut pos = self.write_pos as f32 - delay;
        if pos < 0.0 {
            pos += len as f32;
        }
        let index = pos as usize % len;
        let frac = pos - pos.floor();
        let next = (index + 1) % len;

        lerp(self.buffer[index], self.buffer[next], frac)
    }

    /// Write one sample and advance
    #[inline]
    pub fn write(&mut self, value: f32) {
        self.buffer[self.write_pos] = underflow_clamp(value);
        self.write_pos += 1;
        if self.write_pos == self.buffer.len() {
            self.write_pos = 0;
        }
    }

    /// Read at the configured delay, then write `input`
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let out = self.read_at(self.delay);
        self.write(input);
        out
    }

    pub fn reset(&mut self) {
        self.buffer.fill(0.0);
        self.write_pos = 0;
    }
}

/// Schroeder all-pass section
///
/// `w[n] = x[n] + g·w[n-D]`, `y[n] = -g·w[n] + w[n-D]`
#[derive(Debug, Clone)]
pub struct AllPass {
    delay: DelayLine,
    length: f32,
    gain: f32,
}

impl AllPass {
    pub fn new(length: usize, gain: f32) -> Self {
        let mut delay = DelayLine::new(length);
        delay.set_delay(length as f32);
        Self {
            delay,
            length: length.max(1) as f32,
            gain,
        }
    }

    pub fn set_gain(&mut self, gain: f32) {
        self.gain = gain;
    }

    pub fn gain(&self) -> f32 {
        self.gain
    }

    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let delayed = self.delay.read_at(self.length);
        let w = input + self.gain * delayed;
        self.delay.write(w);
        -self.gain * w + delayed
    }

    pub fn reset(&mut self) {
        self.delay.reset();
    }
}
