//! Spatialization collaborator
//!
//! Voices created with HRTF enabled hand their mono signal (after low-pass
//! and volume) to a [`Spatializer`], which renders it to stereo. When no
//! spatializer is installed, or it reports failure, the voice falls back to
//! plain mono channel mapping.

use std::f32::consts::{FRAC_PI_4, PI};

use serde::{Deserialize, Serialize};

use crate::types::SourceId;

/// Position of a voice relative to the listener
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpatializationParams {
    /// Horizontal angle in radians; 0 is straight ahead, positive is right
    pub azimuth: f32,
    /// Vertical angle in radians
    pub elevation: f32,
    /// Distance in world units (attenuation starts beyond 1.0)
    pub distance: f32,
}

impl Default for SpatializationParams {
    fn default() -> Self {
        Self {
            azimuth: 0.0,
            elevation: 0.0,
            distance: 1.0,
        }
    }
}

/// Renders a mono voice into a stereo pair
///
/// Runs on the render thread; implementations must not block or allocate in
/// any of these methods.
pub trait Spatializer: Send {
    /// A voice's position changed
    fn update_source(&mut self, _source: SourceId, _params: &SpatializationParams) {}

    /// A voice was released; forget any per-voice state
    fn release_source(&mut self, _source: SourceId) {}

    /// Render `mono_in` (one sample per frame) into interleaved `stereo_out`
    ///
    /// Returns `false` if the voice could not be spatialized; the caller then
    /// ignores `stereo_out`.
    fn process(&mut self, source: SourceId, mono_in: &[f32], stereo_out: &mut [f32]) -> bool;
}

/// Equal-power stereo panner driven by azimuth and distance
///
/// Not a true HRTF, but honours the same contract, so it serves as the
/// default spatializer and as a stand-in for tests.
pub struct EqualPowerPanner {
    params: Vec<SpatializationParams>,
}

impl EqualPowerPanner {
    /// Create a panner able to track `max_sources` voices
    pub fn new(max_sources: usize) -> Self {
        Self {
            params: vec![SpatializationParams::default(); max_sources],
        }
    }

    /// `(left, right)` gains for a position
    pub fn gains(params: &SpatializationParams) -> (f32, f32) {
        // Sources behind the listener fold onto the front arc
        let pan = params.azimuth.clamp(-PI, PI).sin();
        let angle = (pan + 1.0) * FRAC_PI_4;
        let attenuation = 1.0 / params.distance.max(1.0);
        (angle.cos() * attenuation, angle.sin() * attenuation)
    }
}

impl Spatializer for EqualPowerPanner {
    fn update_source(&mut self, source: SourceId, params: &SpatializationParams) {
        if let Some(slot) = self.params.get_mut(source.index()) {
            *slot = *params;
        }
    }

    fn release_source(&mut self, source: SourceId) {
        if let Some(slot) = self.params.get_mut(source.index()) {
            *slot = SpatializationParams::default();
        }
    }

    fn process(&mut self, source: SourceId, mono_in: &[f32], stereo_out: &mut [f32]) -> bool {
        let Some(params) = self.params.get(source.index()) else {
            return false;
        };
        if stereo_out.len() != mono_in.len() * 2 {
            return false;
        }

        let (left, right) = Self::gains(params);
        for (frame, &sample) in stereo_out.chunks_exact_mut(2).zip(mono_in) {
            frame[0] = sample * left;
            frame[1] = sample * right;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_center_is_equal_power() {
        let (l, r) = EqualPowerPanner::gains(&SpatializationParams::default());
        assert!((l - r).abs() < 1e-6);
        assert!((l * l + r * r - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_hard_right() {
        let params = SpatializationParams {
            azimuth: PI / 2.0,
            ..Default::default()
        };
        let (l, r) = EqualPowerPanner::gains(&params);
        assert!(l.abs() < 1e-6);
        assert!((r - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_distance_attenuates() {
        let params = SpatializationParams {
            distance: 4.0,
            ..Default::default()
        };
        let (l, _) = EqualPowerPanner::gains(&params);
        assert!((l - std::f32::consts::FRAC_1_SQRT_2 / 4.0).abs() < 1e-6);
    }

    #[test]
    fn test_process_unknown_source_fails() {
        let mut panner = EqualPowerPanner::new(2);
        let mut out = [0.0; 4];
        assert!(!panner.process(SourceId(5), &[1.0, 1.0], &mut out));
        assert!(panner.process(SourceId(1), &[1.0, 1.0], &mut out));
        assert!(out[0] > 0.0 && out[1] > 0.0);
    }
}
