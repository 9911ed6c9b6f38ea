//! Serializable effect descriptions used by submix configuration

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::native::{
    DelayEffect, FilterEffect, FilterMode, GainEffect, ModulatedDelayEffect, ReverbEffect,
};
use super::Effect;

/// The native effect types that can be instantiated from configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectKind {
    Gain,
    LowPass,
    HighPass,
    Delay,
    Chorus,
    Flanger,
    Reverb,
}

/// One entry of a submix effect chain
///
/// ```yaml
/// - type: reverb
///   params:
///     room size: 0.8
///     wet: 0.5
/// ```
///
/// Parameter values are normalized (0.0-1.0) and matched against the
/// effect's parameter names case-insensitively.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectConfig {
    #[serde(rename = "type")]
    pub kind: EffectKind,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub params: BTreeMap<String, f32>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub bypass: bool,
}

impl EffectConfig {
    pub fn new(kind: EffectKind) -> Self {
        Self {
            kind,
            params: BTreeMap::new(),
            bypass: false,
        }
    }

    /// Set a normalized parameter by name
    pub fn with_param(mut self, name: impl Into<String>, value: f32) -> Self {
        self.params.insert(name.into(), value);
        self
    }

    pub fn with_bypass(mut self, bypass: bool) -> Self {
        self.bypass = bypass;
        self
    }

    /// Instantiate the effect for the given output format
    ///
    /// Unknown parameter names are logged and skipped.
    pub fn build(&self, sample_rate: u32, num_channels: usize) -> Box<dyn Effect> {
        let mut effect: Box<dyn Effect> = match self.kind {
            EffectKind::Gain => Box::new(GainEffect::new(sample_rate, num_channels)),
            EffectKind::LowPass => Box::new(FilterEffect::new(
                FilterMode::LowPass,
                sample_rate,
                num_channels,
            )),
            EffectKind::HighPass => Box::new(FilterEffect::new(
                FilterMode::HighPass,
                sample_rate,
                num_channels,
            )),
            EffectKind::Delay => Box::new(DelayEffect::new(sample_rate, num_channels)),
            EffectKind::Chorus => Box::new(ModulatedDelayEffect::chorus(sample_rate, num_channels)),
            EffectKind::Flanger => {
                Box::new(ModulatedDelayEffect::flanger(sample_rate, num_channels))
            }
            EffectKind::Reverb => Box::new(ReverbEffect::new(sample_rate, num_channels)),
        };

        for (name, &value) in &self.params {
            match effect.info().param_index(name) {
                Some(index) => effect.set_param(index, value),
                None => log::warn!(
                    "Effect '{}' has no parameter named '{}', ignoring",
                    effect.info().name,
                    name
                ),
            }
        }
        effect.set_bypass(self.bypass);
        effect
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_applies_params() {
        let config = EffectConfig::new(EffectKind::Gain).with_param("gain", 0.25);
        let effect = config.build(48000, 2);

        assert_eq!(effect.info().name, "Gain");
        assert!((effect.param_values()[0].actual - 0.5).abs() < 1e-6);
        assert!(!effect.is_bypassed());
    }

    #[test]
    fn test_unknown_param_is_ignored() {
        let config = EffectConfig::new(EffectKind::Reverb)
            .with_param("shimmer", 1.0)
            .with_bypass(true);
        let effect = config.build(44100, 2);

        assert_eq!(effect.info().name, "Reverb");
        assert!(effect.is_bypassed());
    }

    #[test]
    fn test_yaml_shape() {
        let yaml = "type: low_pass\nparams:\n  cutoff: 0.3\n";
        let config: EffectConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.kind, EffectKind::LowPass);
        assert_eq!(config.params.get("cutoff"), Some(&0.3));
        assert!(!config.bypass);
    }
}
