//! Native submix effects
//!
//! Every effect is built for a fixed sample rate and channel count and
//! processes interleaved buffers of that width.

mod delay;
mod filter;
mod gain;
mod modulation;
mod reverb;

pub use delay::DelayEffect;
pub use filter::{FilterEffect, FilterMode};
pub use gain::GainEffect;
pub use modulation::ModulatedDelayEffect;
pub use reverb::ReverbEffect;
