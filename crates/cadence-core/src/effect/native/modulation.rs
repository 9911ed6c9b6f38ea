//! Chorus and flanger

use crate::dsp::{LfoShape, ModulatedDelay, ModulatedDelaySettings};
use crate::effect::{Effect, EffectBase, EffectInfo, ParamInfo, ParamValue};
use crate::types::AudioBuffer;

/// LFO phase offset between neighbouring channels
const CHANNEL_PHASE_OFFSET: f32 = 0.25;

/// LFO-modulated delay (chorus or flanger, depending on the preset)
///
/// Parameters:
/// - Delay: centre delay in ms (0.5-50ms)
/// - Depth: modulation swing in ms (0-20ms)
/// - Rate: LFO rate in Hz (0.01-10Hz)
/// - Feedback: -95% to 95%
/// - Mix: Dry/wet balance
pub struct ModulatedDelayEffect {
    base: EffectBase,
    channels: Vec<ModulatedDelay>,
    shape: LfoShape,
}

impl ModulatedDelayEffect {
    pub fn chorus(sample_rate: u32, num_channels: usize) -> Self {
        Self::new("Chorus", ModulatedDelaySettings::chorus(), sample_rate, num_channels)
    }

    pub fn flanger(sample_rate: u32, num_channels: usize) -> Self {
        Self::new("Flanger", ModulatedDelaySettings::flanger(), sample_rate, num_channels)
    }

    /// Build from explicit settings; the settings become the parameter defaults
    pub fn new(
        name: &str,
        settings: ModulatedDelaySettings,
        sample_rate: u32,
        num_channels: usize,
    ) -> Self {
        let info = EffectInfo::new(name, "Modulation")
            .with_param(
                ParamInfo::new("Delay", 0.0)
                    .with_range(0.5, 50.0)
                    .with_unit("ms")
                    .with_actual_default(settings.delay_ms),
            )
            .with_param(
                ParamInfo::new("Depth", 0.0)
                    .with_range(0.0, 20.0)
                    .with_unit("ms")
                    .with_actual_default(settings.depth_ms),
            )
            .with_param(
                ParamInfo::new("Rate", 0.0)
                    .with_range(0.01, 10.0)
                    .with_unit("Hz")
                    .with_actual_default(settings.rate_hz),
            )
            .with_param(
                ParamInfo::new("Feedback", 0.0)
                    .with_range(-0.95, 0.95)
                    .with_actual_default(settings.feedback),
            )
            .with_param(ParamInfo::new("Mix", 0.0).with_actual_default(settings.mix));

        let channels = (0..num_channels)
            .map(|ch| {
                let mut delay = ModulatedDelay::new(settings, sample_rate);
                delay.set_lfo_phase(ch as f32 * CHANNEL_PHASE_OFFSET);
                delay
            })
            .collect();

        let mut effect = Self {
            base: EffectBase::new(info),
            channels,
            shape: settings.shape,
        };
        effect.apply_params();
        effect
    }

    /// Settings derived from the current parameter values
    pub fn settings(&self) -> ModulatedDelaySettings {
        ModulatedDelaySettings {
            delay_ms: self.base.value(0),
            depth_ms: self.base.value(1),
            rate_hz: self.base.value(2),
            feedback: self.base.value(3),
            mix: self.base.value(4),
            shape: self.shape,
        }
    }

    fn apply_params(&mut self) {
        let settings = self.settings();
        for channel in &mut self.channels {
            channel.set_settings(settings);
        }
    }
}

impl Effect for ModulatedDelayEffect {
    fn process(&mut self, buffer: &mut AudioBuffer) {
        if self.base.is_bypassed() {
            return;
        }
        for frame in buffer.frames_mut() {
            for (sample, channel) in frame.iter_mut().zip(self.channels.iter_mut()) {
                *sample = channel.process(*sample);
            }
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
        self.apply_params();
    }

    fn set_bypass(&mut self, bypass: bool) {
        self.base.set_bypass(bypass);
    }

    fn is_bypassed(&self) -> bool {
        self.base.is_bypassed()
    }

    fn reset(&mut self) {
        for (ch, channel) in self.channels.iter_mut().enumerate() {
            channel.reset();
            channel.set_lfo_phase(ch as f32 * CHANNEL_PHASE_OFFSET);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_map_onto_params() {
        let chorus = ModulatedDelayEffect::chorus(48000, 2);
        let settings = chorus.settings();
        assert!((settings.delay_ms - 20.0).abs() < 1e-3);
        assert!((settings.rate_hz - 0.8).abs() < 1e-3);
        assert_eq!(chorus.info().name, "Chorus");

        let flanger = ModulatedDelayEffect::flanger(48000, 2);
        assert!((flanger.settings().feedback - 0.6).abs() < 1e-3);
        assert_eq!(flanger.settings().shape, LfoShape::Triangle);
    }

    #[test]
    fn test_channels_are_decorrelated() {
        let mut effect = ModulatedDelayEffect::chorus(48000, 2);
        let samples: Vec<f32> = (0..48000)
            .flat_map(|n| {
                let x = (n as f32 * 0.03).sin();
                [x, x]
            })
            .collect();
        let mut buffer = AudioBuffer::from_interleaved(2, &samples);
        effect.process(&mut buffer);

        let differs = buffer
            .frames()
            .skip(2000)
            .any(|frame| (frame[0] - frame[1]).abs() > 1e-3);
        assert!(differs);
    }

    #[test]
    fn test_dry_mix_is_transparent() {
        let mut effect = ModulatedDelayEffect::flanger(48000, 1);
        effect.set_param(4, 0.0);

        let mut buffer = AudioBuffer::from_interleaved(1, &[0.5, -0.5, 0.25]);
        effect.process(&mut buffer);
        assert_eq!(buffer.as_slice(), &[0.5, -0.5, 0.25]);
    }
}
