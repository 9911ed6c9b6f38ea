//! LFO-modulated delay: the common core of flanger and chorus

use super::{DelayLine, Lfo, LfoShape};
use serde::{Deserialize, Serialize};

/// Longest delay (centre + depth) a modulated delay can reach
pub const MAX_MODULATED_DELAY_MS: f32 = 100.0;

/// Settings for a [`ModulatedDelay`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModulatedDelaySettings {
    /// Centre delay in milliseconds
    pub delay_ms: f32,
    /// Modulation swing around the centre, in milliseconds
    pub depth_ms: f32,
    /// LFO rate in Hz
    pub rate_hz: f32,
    /// Fraction of the delayed signal fed back into the line (-0.95..0.95)
    pub feedback: f32,
    /// Wet/dry balance (0 = dry only, 1 = delayed only)
    pub mix: f32,
    pub shape: LfoShape,
}

impl ModulatedDelaySettings {
    /// Short, resonant sweep
    pub fn flanger() -> Self {
        Self {
            delay_ms: 2.5,
            depth_ms: 2.0,
            rate_hz: 0.25,
            feedback: 0.6,
            mix: 0.5,
            shape: LfoShape::Triangle,
        }
    }

    /// Longer, feedback-free detune
    pub fn chorus() -> Self {
        Self {
            delay_ms: 20.0,
            depth_ms: 5.0,
            rate_hz: 0.8,
            feedback: 0.0,
            mix: 0.5,
            shape: LfoShape::Sine,
        }
    }
}

impl Default for ModulatedDelaySettings {
    fn default() -> Self {
        Self::chorus()
    }
}

/// Single-channel delay whose length follows an LFO
#[derive(Debug, Clone)]
pub struct ModulatedDelay {
    line: DelayLine,
    lfo: Lfo,
    settings: ModulatedDelaySettings,
    sample_rate: f32,
    samples_per_ms: f32,
}

impl ModulatedDelay {
    pub fn new(settings: ModulatedDelaySettings, sample_rate: u32) -> Self {
        let samples_per_ms = sample_rate as f32 / 1000.0;
        let max_delay = (MAX_MODULATED_DELAY_MS * samples_per_ms).ceil() as usize + 1;
        let mut delay = Self {
            line: DelayLine::new(max_delay),
            lfo: Lfo::new(settings.shape, settings.rate_hz, sample_rate),
            settings,
            sample_rate: sample_rate as f32,
            samples_per_ms,
        };
        delay.set_settings(settings);
        delay
    }

    pub fn set_settings(&mut self, settings: ModulatedDelaySettings) {
        let mut settings = settings;
        settings.delay_ms = settings.delay_ms.clamp(0.0, MAX_MODULATED_DELAY_MS);
        settings.depth_ms = settings
            .depth_ms
            .clamp(0.0, MAX_MODULATED_DELAY_MS - settings.delay_ms);
        settings.feedback = settings.feedback.clamp(-0.95, 0.95);
        settings.mix = settings.mix.clamp(0.0, 1.0);

        self.lfo.set_shape(settings.shape);
        self.lfo.set_frequency(settings.rate_hz);
        self.settings = settings;
    }

    pub fn settings(&self) -> &ModulatedDelaySettings {
        &self.settings
    }

    /// Offset the LFO phase (used to decorrelate channels)
    pub fn set_lfo_phase(&mut self, phase: f32) {
        self.lfo.set_phase(phase);
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let modulation = self.lfo.next_value();
        let delay_ms = self.settings.delay_ms + self.settings.depth_ms * modulation;
        let delayed = self.line.read_at(delay_ms * self.samples_per_ms);

        self.line.write(input + self.settings.feedback * delayed);

        let mix = self.settings.mix;
        (1.0 - mix) * input + mix * delayed
    }

    pub fn reset(&mut self) {
        self.line.reset();
        self.lfo.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dry_mix_is_transparent() {
        let settings = ModulatedDelaySettings {
            mix: 0.0,
            ..ModulatedDelaySettings::flanger()
        };
        let mut delay = ModulatedDelay::new(settings, 48000);
        for n in 0..256 {
            let x = (n as f32 * 0.1).sin();
            assert!((delay.process(x) - x).abs() < 1e-6);
        }
    }

    #[test]
    fn test_zero_depth_is_plain_delay() {
        let settings = ModulatedDelaySettings {
            delay_ms: 1.0,
            depth_ms: 0.0,
            feedback: 0.0,
            mix: 1.0,
            ..ModulatedDelaySettings::chorus()
        };
        // 1ms at 8kHz = 8 samples
        let mut delay = ModulatedDelay::new(settings, 8000);
        let mut output = Vec::new();
        output.push(delay.process(1.0));
        for _ in 0..15 {
            output.push(delay.process(0.0));
        }
        assert!((output[8] - 1.0).abs() < 1e-6);
        assert!(output.iter().enumerate().all(|(i, v)| i == 8 || v.abs() < 1e-6));
    }

    #[test]
    fn test_chorus_modulates_delay() {
        let mut delay = ModulatedDelay::new(ModulatedDelaySettings::chorus(), 48000);
        // Feed a steady tone; a modulated tap makes the output differ from
        // a fixed delay of the same centre
        let mut fixed = DelayLine::new(4800);
        fixed.set_delay(20.0 * 48.0);
        let mut max_diff = 0.0f32;
        for n in 0..48000 {
            let x = (n as f32 * 0.05).sin();
            let y = delay.process(x);
            let reference = 0.5 * x + 0.5 * fixed.process(x);
            max_diff = max_diff.max((y - reference).abs());
        }
        assert!(max_diff > 0.01);
    }

    #[test]
    fn test_settings_are_clamped() {
        let settings = ModulatedDelaySettings {
            delay_ms: 500.0,
            depth_ms: 50.0,
            feedback: 2.0,
            mix: 3.0,
            ..Default::default()
        };
        let delay = ModulatedDelay::new(settings, 48000);
        assert_eq!(delay.settings().delay_ms, MAX_MODULATED_DELAY_MS);
        assert_eq!(delay.settings().depth_ms, 0.0);
        assert_eq!(delay.settings().feedback, 0.95);
        assert_eq!(delay.settings().mix, 1.0);
    }
}
