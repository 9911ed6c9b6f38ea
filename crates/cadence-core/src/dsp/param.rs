//! Click-free parameter ramps
//!
//! Every user-facing control on a voice (volume, pitch, wet level, low-pass
//! cutoff, each channel-map gain) is an [`InterpolatedParam`]. Setting a new
//! value starts a linear ramp from wherever the parameter currently is, so
//! a change in the middle of a ramp never produces a discontinuity.

use super::lerp;

/// Default ramp duration shared by all voice parameters
pub const DEFAULT_RAMP_MS: f32 = 33.0;

/// Number of frames a ramp of `ramp_ms` lasts at `sample_rate`
pub fn ramp_frames_for(ramp_ms: f32, sample_rate: u32) -> u32 {
    (ramp_ms.max(0.0) * sample_rate as f32 / 1000.0).round() as u32
}

/// A value that glides linearly towards its target over a fixed number of frames
#[derive(Debug, Clone, Copy)]
pub struct InterpolatedParam {
    start: f32,
    current: f32,
    target: f32,
    elapsed: u32,
    ramp_frames: u32,
    initialized: bool,
}

impl InterpolatedParam {
    /// Create an uninitialized parameter
    ///
    /// The first [`set_value`](Self::set_value) snaps instead of ramping.
    pub fn new(ramp_frames: u32) -> Self {
        Self {
            start: 0.0,
            current: 0.0,
            target: 0.0,
            elapsed: 0,
            ramp_frames,
            initialized: false,
        }
    }

    /// Set a new target
    ///
    /// The first call after creation or [`reset`](Self::reset) jumps straight
    /// to the value. Later calls ramp from the current value.
    pub fn set_value(&mut self, target: f32) {
        if !self.initialized {
            self.initialized = true;
            self.start = target;
            self.current = target;
            self.target = target;
            self.elapsed = self.ramp_frames;
            return;
        }

        self.start = self.current;
        self.target = target;
        self.elapsed = 0;
    }

    /// Advance one frame and return the value for that frame
    #[inline]
    pub fn next_value(&mut self) -> f32 {
        if self.elapsed >= self.ramp_frames {
            self.current = self.target;
            return self.current;
        }

        let alpha = self.elapsed as f32 / self.ramp_frames as f32;
        self.current = lerp(self.start, self.target, alpha);
        self.elapsed += 1;
        self.current
    }

    /// Value returned by the last `next_value` (or the snapped value)
    #[inline]
    pub fn value(&self) -> f32 {
        self.current
    }

    #[inline]
    pub fn target(&self) -> f32 {
        self.target
    }

    /// True once the ramp has reached its target
    #[inline]
    pub fn is_done(&self) -> bool {
        self.elapsed >= self.ramp_frames
    }

    pub fn ramp_frames(&self) -> u32 {
        self.ramp_frames
    }

    /// Forget the current value; the next `set_value` snaps again
    pub fn reset(&mut self) {
        self.start = 0.0;
        self.current = 0.0;
        self.target = 0.0;
        self.elapsed = 0;
        self.initialized = false;
    }
}

impl Default for InterpolatedParam {
    fn default() -> Self {
        Self::new(ramp_frames_for(DEFAULT_RAMP_MS, crate::types::DEFAULT_SAMPLE_RATE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_set_snaps() {
        let mut param = InterpolatedParam::new(100);
        param.set_value(0.5);

        assert_eq!(param.next_value(), 0.5);
        assert!(param.is_done());
    }

    #[test]
    fn test_ramp_reaches_target() {
        let mut param = InterpolatedParam::new(4);
        param.set_value(0.0);
        param.set_value(1.0);

        let values: Vec<f32> = (0..6).map(|_| param.next_value()).collect();
        assert_eq!(values, vec![0.0, 0.25, 0.5, 0.75, 1.0, 1.0]);
    }

    #[test]
    fn test_ramp_continuity_mid_ramp() {
        let mut param = InterpolatedParam::new(10);
        param.set_value(0.0);
        param.set_value(1.0);

        let mut last = 0.0;
        for _ in 0..5 {
            last = param.next_value();
        }

        // Retarget mid-ramp; the next value must start from where we were
        param.set_value(0.0);
        let next = param.next_value();
        assert!((next - last).abs() < 1e-6, "jumped from {} to {}", last, next);

        // And the ramp must never step by more than one ramp increment
        let mut prev = next;
        for _ in 0..20 {
            let v = param.next_value();
            assert!((v - prev).abs() <= last / 10.0 + 1e-6);
            prev = v;
        }
        assert_eq!(prev, 0.0);
    }

    #[test]
    fn test_zero_ramp_is_immediate() {
        let mut param = InterpolatedParam::new(0);
        param.set_value(0.2);
        param.set_value(0.9);
        assert_eq!(param.next_value(), 0.9);
    }

    #[test]
    fn test_reset_snaps_again() {
        let mut param = InterpolatedParam::new(50);
        param.set_value(1.0);
        param.reset();
        param.set_value(0.3);
        assert_eq!(param.next_value(), 0.3);
    }

    #[test]
    fn test_ramp_frames_for() {
        assert_eq!(ramp_frames_for(33.0, 48000), 1584);
        assert_eq!(ramp_frames_for(0.0, 48000), 0);
    }
}
