//! One-pole filters
//!
//! `y[n] = A0·x[n] + B1·y[n-1]`, with the cutoff `fc` normalized to Nyquist
//! (`0.0..=1.0`). Coefficients are only recomputed when the cutoff changes,
//! so a per-frame `set_frequency` with an unchanged value costs a compare.

use super::underflow_clamp;
use std::f32::consts::PI;

/// One-pole low-pass filter, `B1 = exp(-π·fc)`, `A0 = 1 - B1`
///
/// A cutoff of `1.0` or above means fully open: input passes through exactly
/// while the state keeps tracking it, so closing the filter again is
/// click-free.
#[derive(Debug, Clone, Copy)]
pub struct OnePoleLowPass {
    a0: f32,
    b1: f32,
    z1: f32,
    cutoff: f32,
}

impl OnePoleLowPass {
    /// Create a filter at the given normalized cutoff
    pub fn new(cutoff: f32) -> Self {
        let mut filter = Self {
            a0: 1.0,
            b1: 0.0,
            z1: 0.0,
            cutoff: f32::NAN,
        };
        filter.set_frequency(cutoff);
        filter
    }

    /// Create a filter from a raw feedback coefficient (`B1`)
    ///
    /// Used by the reverb combs, whose damping control maps straight onto the
    /// pole position rather than a cutoff frequency.
    pub fn with_coefficient(b1: f32) -> Self {
        let mut filter = Self::new(1.0);
        filter.set_coefficient(b1);
        filter
    }

    /// Set the normalized cutoff (fraction of Nyquist)
    #[inline]
    pub fn set_frequency(&mut self, cutoff: f32) {
        let cutoff = cutoff.max(0.0);
        if cutoff == self.cutoff {
            return;
        }
        self.cutoff = cutoff;
        if cutoff >= 1.0 {
            self.b1 = 0.0;
            self.a0 = 1.0;
        } else {
            self.b1 = (-PI * cutoff).exp();
            self.a0 = 1.0 - self.b1;
        }
    }

    /// Set the pole position directly
    pub fn set_coefficient(&mut self, b1: f32) {
        self.b1 = b1.clamp(0.0, 1.0);
        self.a0 = 1.0 - self.b1;
        self.cutoff = f32::NAN;
    }

    pub fn frequency(&self) -> f32 {
        self.cutoff
    }

    /// True when the filter is fully open and passes input unchanged
    #[inline]
    pub fn is_bypassed(&self) -> bool {
        self.cutoff >= 1.0
    }

    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        if self.is_bypassed() {
            self.z1 = input;
            return input;
        }
        let y = self.a0 * input + self.b1 * self.z1;
        self.z1 = underflow_clamp(y);
        self.z1
    }

    pub fn reset(&mut self) {
        self.z1 = 0.0;
    }
}

impl Default for OnePoleLowPass {
    fn default() -> Self {
        Self::new(1.0)
    }
}

/// One-pole high-pass filter, `B1 = -exp(-π·(1 - fc))`, `A0 = 1 + B1`
///
/// Unity gain at Nyquist; low frequencies are attenuated more strongly as
/// the cutoff rises.
#[derive(Debug, Clone, Copy)]
pub struct OnePoleHighPass {
    a0: f32,
    b1: f32,
    z1: f32,
    cutoff: f32,
}

impl OnePoleHighPass {
    pub fn new(cutoff: f32) -> Self {
        let mut filter = Self {
            a0: 1.0,
            b1: 0.0,
            z1: 0.0,
            cutoff: f32::NAN,
        };
        filter.set_frequency(cutoff);
        filter
    }

    #[inline]
    pub fn set_frequency(&mut self, cutoff: f32) {
        let cutoff = cutoff.clamp(0.0, 1.0);
        if cutoff == self.cutoff {
            return;
        }
        self.cutoff = cutoff;
        self.b1 = -(-PI * (1.0 - cutoff)).exp();
        self.a0 = 1.0 + self.b1;
    }

    pub fn frequency(&self) -> f32 {
        self.cutoff
    }

    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let y = self.a0 * input + self.b1 * self.z1;
        self.z1 = underflow_clamp(y);
        self.z1
    }

    pub fn reset(&mut self) {
        self.z1 = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Steady-state amplitude of a sine run through `process`
    fn sine_gain(mut process: impl FnMut(f32) -> f32, normalized_freq: f32) -> f32 {
        let omega = PI * normalized_freq;
        let mut peak = 0.0f32;
        for n in 0..4000 {
            let y = process((omega * n as f32).sin());
            if n > 2000 {
                peak = peak.max(y.abs());
            }
        }
        peak
    }

    #[test]
    fn test_lowpass_fully_open_is_exact() {
        let mut lpf = OnePoleLowPass::new(1.0);
        for x in [0.3, -0.7, 1.0, 0.0, 0.125] {
            assert_eq!(lpf.process(x), x);
        }
    }

    #[test]
    fn test_lowpass_converges_on_dc() {
        let mut lpf = OnePoleLowPass::new(0.1);
        let mut y = 0.0;
        for _ in 0..1000 {
            y = lpf.process(1.0);
        }
        assert!((y - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_lowpass_attenuates_high_frequencies() {
        let mut lpf = OnePoleLowPass::new(0.05);
        let gain = sine_gain(|x| lpf.process(x), 0.8);
        assert!(gain < 0.2, "high frequency gain too large: {}", gain);
    }

    #[test]
    fn test_lowpass_reengage_is_continuous() {
        let mut lpf = OnePoleLowPass::new(1.0);
        for _ in 0..10 {
            lpf.process(0.5);
        }
        lpf.set_frequency(0.2);
        let y = lpf.process(0.5);
        assert!((y - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_highpass_attenuates_low_end() {
        let mut hpf = OnePoleHighPass::new(0.9);
        let mut y = 1.0;
        for _ in 0..2000 {
            y = hpf.process(1.0);
        }
        // DC gain is A0 / (1 - B1)
        assert!(y.abs() < 0.2, "too much DC: {}", y);
    }

    #[test]
    fn test_highpass_passes_nyquist() {
        let mut hpf = OnePoleHighPass::new(0.9);
        let mut y = 0.0;
        for n in 0..2000 {
            let x = if n % 2 == 0 { 1.0 } else { -1.0 };
            y = hpf.process(x);
        }
        assert!((y.abs() - 1.0).abs() < 1e-3, "nyquist gain {}", y.abs());
    }

    #[test]
    fn test_underflow_never_reaches_subnormal() {
        let mut lpf = OnePoleLowPass::new(0.01);
        lpf.process(1.0);
        for _ in 0..200_000 {
            let y = lpf.process(0.0);
            assert!(y == 0.0 || y.abs() >= f32::MIN_POSITIVE);
        }
    }
}
