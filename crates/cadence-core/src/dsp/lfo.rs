//! Wavetable low-frequency oscillator

use super::lerp;
use serde::{Deserialize, Serialize};

/// Number of entries in the LFO wavetable
const TABLE_SIZE: usize = 1024;

/// LFO waveform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LfoShape {
    #[default]
    Sine,
    Saw,
    Triangle,
    Square,
}

impl LfoShape {
    /// Waveform value at `phase` in `[0, 1)`, range `[-1, 1]`
    fn evaluate(self, phase: f32) -> f32 {
        match self {
            LfoShape::Sine => (std::f32::consts::TAU * phase).sin(),
            LfoShape::Saw => 2.0 * phase - 1.0,
            LfoShape::Triangle => 1.0 - 4.0 * (phase - 0.5).abs(),
            LfoShape::Square => {
                if phase < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
        }
    }
}

/// Bipolar LFO reading a precomputed wavetable with linear interpolation
#[derive(Debug, Clone)]
pub struct Lfo {
    table: Vec<f32>,
    shape: LfoShape,
    phase: f32,
    increment: f32,
    frequency: f32,
    sample_rate: f32,
}

impl Lfo {
    pub fn new(shape: LfoShape, frequency: f32, sample_rate: u32) -> Self {
        let mut lfo = Self {
            table: vec![0.0; TABLE_SIZE],
            shape,
            phase: 0.0,
            increment: 0.0,
            frequency: 0.0,
            sample_rate: sample_rate.max(1) as f32,
        };
        lfo.fill_table();
        lfo.set_frequency(frequency);
        lfo
    }

    fn fill_table(&mut self) {
        for (i, entry) in self.table.iter_mut().enumerate() {
            *entry = self.shape.evaluate(i as f32 / TABLE_SIZE as f32);
        }
    }

    /// Change the waveform (rewrites the table in place)
    pub fn set_shape(&mut self, shape: LfoShape) {
        if shape != self.shape {
            self.shape = shape;
            self.fill_table();
        }
    }

    pub fn shape(&self) -> LfoShape {
        self.shape
    }

    /// Set the rate in Hz
    pub fn set_frequency(&mut self, frequency: f32) {
        self.frequency = frequency.max(0.0);
        self.increment = self.frequency / self.sample_rate;
    }

    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    /// Jump to a phase in `[0, 1)`, e.g. to offset the right channel of a chorus
    pub fn set_phase(&mut self, phase: f32) {
        self.phase = phase.rem_euclid(1.0);
    }

    pub fn phase(&self) -> f32 {
        self.phase
    }

    /// Current value in `[-1, 1]`, then advance one sample
    #[inline]
    pub fn next_value(&mut self) -> f32 {
        let pos = self.phase * TABLE_SIZE as f32;
        let index = (pos as usize).min(TABLE_SIZE - 1);
        let next = (index + 1) % TABLE_SIZE;
        let value = lerp(self.table[index], self.table[next], pos - index as f32);

        self.phase += self.increment;
        if self.phase >= 1.0 {
            self.phase -= self.phase.floor();
        }
        value
    }

    pub fn reset(&mut self) {
        self.phase = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sine_matches_reference() {
        let sample_rate = 48000;
        let mut lfo = Lfo::new(LfoShape::Sine, 3.0, sample_rate);

        for n in 0..2000 {
            let expected = (std::f32::consts::TAU * 3.0 * n as f32 / sample_rate as f32).sin();
            let value = lfo.next_value();
            assert!((value - expected).abs() < 1e-3, "sample {}: {} vs {}", n, value, expected);
        }
    }

    #[test]
    fn test_shapes_stay_in_range() {
        for shape in [LfoShape::Sine, LfoShape::Saw, LfoShape::Triangle, LfoShape::Square] {
            let mut lfo = Lfo::new(shape, 7.0, 1000);
            for _ in 0..5000 {
                let v = lfo.next_value();
                assert!((-1.0..=1.0).contains(&v), "{:?} out of range: {}", shape, v);
            }
        }
    }

    #[test]
    fn test_phase_wraps() {
        let mut lfo = Lfo::new(LfoShape::Saw, 100.0, 1000);
        for _ in 0..25 {
            lfo.next_value();
        }
        assert!(lfo.phase() < 1.0);
        assert!((lfo.phase() - 0.5).abs() < 1e-4);
    }

    #[test]
    fn test_set_phase() {
        let mut lfo = Lfo::new(LfoShape::Square, 1.0, 48000);
        lfo.set_phase(0.75);
        assert_eq!(lfo.next_value(), -1.0);
        lfo.set_phase(1.25);
        assert!((lfo.phase() - 0.25).abs() < 1e-6);
    }
}
