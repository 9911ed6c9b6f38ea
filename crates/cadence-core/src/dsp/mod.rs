//! DSP primitives used by the source render path and the submix effects
//!
//! Everything in here is single-channel, allocation-free after construction
//! and computed in 32-bit float:
//! - [`InterpolatedParam`]: click-free parameter ramps
//! - [`OnePoleLowPass`] / [`OnePoleHighPass`]: per-source filters
//! - [`DelayLine`] / [`AllPass`]: fractional delay building blocks
//! - [`Lfo`] / [`ModulatedDelay`]: flanger and chorus
//! - [`SchroederReverb`]: comb + all-pass reverb

mod delay;
mod filter;
mod lfo;
mod modulated_delay;
mod param;
mod reverb;

pub use delay::{AllPass, DelayLine};
pub use filter::{OnePoleHighPass, OnePoleLowPass};
pub use lfo::{Lfo, LfoShape};
pub use modulated_delay::{ModulatedDelay, ModulatedDelaySettings};
pub use param::{ramp_frames_for, InterpolatedParam, DEFAULT_RAMP_MS};
pub use reverb::{ReverbSettings, SchroederReverb};

/// Linear interpolation between `a` and `b`
#[inline(always)]
pub fn lerp(a: f32, b: f32, alpha: f32) -> f32 {
    a + alpha * (b - a)
}

/// Zero out values too small to be represented as normal floats
///
/// Recursive filter states decay towards zero forever; once they reach the
/// subnormal range every multiply goes through the slow path on most CPUs.
#[inline(always)]
pub fn underflow_clamp(value: f32) -> f32 {
    if value.abs() < f32::MIN_POSITIVE {
        0.0
    } else {
        value
    }
}

/// Constant-power dry/wet gains for a wet level in `[0, 1]`
///
/// Returns `(dry, wet)` = `(cos(w·π/2), sin(w·π/2))`, so `dry² + wet² == 1`.
#[inline]
pub fn constant_power_gains(wet_level: f32) -> (f32, f32) {
    let angle = wet_level.clamp(0.0, 1.0) * std::f32::consts::FRAC_PI_2;
    (angle.cos(), angle.sin())
}
