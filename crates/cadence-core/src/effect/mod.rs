//! Submix effects
//!
//! Every submix owns an [`EffectChain`] of boxed [`Effect`]s that runs on its
//! wet signal. Effects describe their parameters with [`ParamInfo`] and take
//! values in normalized form (0.0-1.0), which lets a chain be configured from
//! YAML or edited through the command queue without knowing concrete types.

mod chain;
mod config;
pub mod native;

pub use chain::{EffectChain, EffectChainError, EffectSlot, MAX_SUBMIX_EFFECTS};
pub use config::{EffectConfig, EffectKind};

use crate::types::AudioBuffer;

/// Description of one effect parameter
///
/// `default` is normalized; `min..=max` is the range it maps onto.
#[derive(Debug, Clone)]
pub struct ParamInfo {
    /// Display name, also used to match configuration keys
    pub name: String,
    pub default: f32,
    pub min: f32,
    pub max: f32,
    /// "ms", "Hz", "x", ...
    pub unit: String,
}

impl ParamInfo {
    /// A 0.0-1.0 parameter with the given normalized default
    pub fn new(name: impl Into<String>, default: f32) -> Self {
        Self {
            name: name.into(),
            default: default.clamp(0.0, 1.0),
            min: 0.0,
            max: 1.0,
            unit: String::new(),
        }
    }

    pub fn with_range(mut self, min: f32, max: f32) -> Self {
        self.min = min;
        self.max = max;
        self
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = unit.into();
        self
    }

    /// Default given in the parameter's own units
    pub fn with_actual_default(mut self, actual: f32) -> Self {
        self.default = self.normalize(actual);
        self
    }

    /// Range value for a normalized position (clamped)
    #[inline]
    pub fn denormalize(&self, normalized: f32) -> f32 {
        self.min + normalized.clamp(0.0, 1.0) * (self.max - self.min)
    }

    /// Normalized position of a range value (clamped)
    pub fn normalize(&self, actual: f32) -> f32 {
        let span = self.max - self.min;
        if span == 0.0 {
            0.0
        } else {
            ((actual - self.min) / span).clamp(0.0, 1.0)
        }
    }
}

/// A parameter's current setting in both representations
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamValue {
    pub normalized: f32,
    pub actual: f32,
}

impl ParamValue {
    pub fn from_normalized(normalized: f32, info: &ParamInfo) -> Self {
        Self {
            normalized: normalized.clamp(0.0, 1.0),
            actual: info.denormalize(normalized),
        }
    }
}

/// Name, category and parameter layout of an effect
#[derive(Debug, Clone)]
pub struct EffectInfo {
    pub name: String,
    /// "Filter", "Delay", "Reverb", ...
    pub category: String,
    pub params: Vec<ParamInfo>,
}

impl EffectInfo {
    pub fn new(name: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            category: category.into(),
            params: Vec::new(),
        }
    }

    pub fn with_param(mut self, param: ParamInfo) -> Self {
        self.params.push(param);
        self
    }

    pub fn param_count(&self) -> usize {
        self.params.len()
    }

    /// Index of the parameter called `name` (case-insensitive)
    pub fn param_index(&self, name: &str) -> Option<usize> {
        self.params
            .iter()
            .position(|p| p.name.eq_ignore_ascii_case(name))
    }
}

/// A submix effect
///
/// Called on the render thread: `process`, `set_param` and `set_bypass`
/// must not allocate or block.
pub trait Effect: Send {
    /// Process an interleaved buffer in place
    fn process(&mut self, buffer: &mut AudioBuffer);

    fn info(&self) -> &EffectInfo;

    fn param_values(&self) -> &[ParamValue];

    /// Set parameter `index` from a normalized value; unknown indices are ignored
    fn set_param(&mut self, index: usize, value: f32);

    fn set_bypass(&mut self, bypass: bool);

    fn is_bypassed(&self) -> bool;

    /// Forget all signal history (delay lines, filter memories)
    fn reset(&mut self);
}

/// Parameter storage and bypass flag shared by the native effects
#[derive(Debug, Clone)]
pub struct EffectBase {
    info: EffectInfo,
    values: Vec<ParamValue>,
    bypassed: bool,
}

impl EffectBase {
    pub fn new(info: EffectInfo) -> Self {
        let values = info
            .params
            .iter()
            .map(|param| ParamValue::from_normalized(param.default, param))
            .collect();
        Self {
            info,
            values,
            bypassed: false,
        }
    }

    pub fn info(&self) -> &EffectInfo {
        &self.info
    }

    pub fn values(&self) -> &[ParamValue] {
        &self.values
    }

    pub fn set_param(&mut self, index: usize, normalized: f32) {
        if let (Some(value), Some(param)) = (self.values.get_mut(index), self.info.params.get(index)) {
            *value = ParamValue::from_normalized(normalized, param);
        }
    }

    /// Current value of parameter `index` in its own units (0.0 if unknown)
    #[inline]
    pub fn value(&self, index: usize) -> f32 {
        self.values.get(index).map_or(0.0, |v| v.actual)
    }

    pub fn set_bypass(&mut self, bypass: bool) {
        self.bypassed = bypass;
    }

    pub fn is_bypassed(&self) -> bool {
        self.bypassed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delay_info() -> EffectInfo {
        EffectInfo::new("Delay", "Delay")
            .with_param(
                ParamInfo::new("Time", 0.0)
                    .with_range(10.0, 1010.0)
                    .with_unit("ms")
                    .with_actual_default(260.0),
            )
            .with_param(ParamInfo::new("Feedback", 0.0).with_range(-1.0, 1.0))
    }

    #[test]
    fn test_defaults_are_mapped_into_range() {
        let base = EffectBase::new(delay_info());

        assert_eq!(base.info().params[0].default, 0.25);
        assert_eq!(base.value(0), 260.0);
        assert_eq!(base.value(1), -1.0);
        assert_eq!(base.value(9), 0.0);
    }

    #[test]
    fn test_set_param_clamps_and_ignores_unknown() {
        let mut base = EffectBase::new(delay_info());

        base.set_param(1, 0.5);
        assert_eq!(base.value(1), 0.0);

        base.set_param(0, 3.0);
        assert_eq!(base.values()[0], ParamValue { normalized: 1.0, actual: 1010.0 });

        base.set_param(2, 1.0);
        assert_eq!(base.values().len(), 2);
    }

    #[test]
    fn test_normalize_degenerate_range() {
        let fixed = ParamInfo::new("Fixed", 0.5).with_range(3.0, 3.0);
        assert_eq!(fixed.normalize(3.0), 0.0);
        assert_eq!(fixed.denormalize(0.7), 3.0);

        let wide = ParamInfo::new("Wide", 0.5).with_range(-12.0, 12.0);
        assert_eq!(wide.normalize(-30.0), 0.0);
        assert_eq!(wide.normalize(6.0), 0.75);
    }

    #[test]
    fn test_lookup_ignores_case() {
        let info = delay_info();
        assert_eq!(info.param_count(), 2);
        assert_eq!(info.param_index("FEEDBACK"), Some(1));
        assert_eq!(info.param_index("Mix"), None);
    }

    #[test]
    fn test_bypass_flag() {
        let mut base = EffectBase::new(delay_info());
        assert!(!base.is_bypassed());
        base.set_bypass(true);
        assert!(base.is_bypassed());
    }
}
