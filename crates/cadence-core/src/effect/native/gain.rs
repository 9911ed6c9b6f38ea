//! Linear gain stage for submix chains

use crate::effect::{Effect, EffectBase, EffectInfo, ParamInfo, ParamValue};
use crate::types::AudioBuffer;

/// Scales every channel by one factor in 0.0..=2.0 (normalized 0.5 is unity)
pub struct GainEffect {
    base: EffectBase,
}

impl GainEffect {
    /// Format arguments are unused; all native constructors share one signature
    pub fn new(_sample_rate: u32, _num_channels: usize) -> Self {
        let info = EffectInfo::new("Gain", "Utility").with_param(
            ParamInfo::new("Gain", 0.5)
                .with_range(0.0, 2.0)
                .with_unit("×"),
        );

        Self {
            base: EffectBase::new(info),
        }
    }

    fn gain(&self) -> f32 {
        self.base.value(0)
    }
}

impl Effect for GainEffect {
    fn process(&mut self, buffer: &mut AudioBuffer) {
        let gain = self.gain();
        if !self.base.is_bypassed() && gain != 1.0 {
            buffer.scale(gain);
        }
    }

    fn info(&self) -> &EffectInfo {
        self.base.info()
    }

    fn param_values(&self) -> &[ParamValue] {
        self.base.values()
    }

    fn set_param(&mut self, index: usize, value: f32) {
        self.base.set_param(index, value);
    }

    fn set_bypass(&mut self, bypass: bool) {
        self.base.set_bypass(bypass);
    }

    fn is_bypassed(&self) -> bool {
        self.base.is_bypassed()
    }

    fn reset(&mut self) {}
}
