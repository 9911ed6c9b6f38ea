//! Feedback delay effect

use crate::dsp::DelayLine;
use crate::effect::{Effect, EffectBase, EffectInfo, ParamInfo, ParamValue};
use crate::types::AudioBuffer;

/// Maximum delay time in seconds
const MAX_DELAY_SECONDS: f32 = 2.0;

/// Multi-channel feedback delay
///
/// Parameters:
/// - Time: Delay time in ms (10-2000ms)
/// - Feedback: Amount of signal fed back (0-95%)
/// - Mix: Dry/wet balance (0% = dry, 100% = wet)
pub struct DelayEffect {
    base: EffectBase,
    lines: Vec<DelayLine>,
    samples_per_ms: f32,
}

impl DelayEffect {
    pub fn new(sample_rate: u32, num_channels: usize) -> Self {
        let info = EffectInfo::new("Delay", "Delay")
            .with_param(
                ParamInfo::new("Time", 0.0)
                    .with_range(10.0, 2000.0)
                    .with_unit("ms")
                    .with_actual_default(250.0),
            )
            .with_param(ParamInfo::new("Feedback", 0.4).with_range(0.0, 0.95))
            .with_param(ParamInfo::new("Mix", 0.3));

        let max_samples = (sample_rate as f32 * MAX_DELAY_SECONDS) as usize;
        let mut effect = Self {
            base: EffectBase::new(info),
            lines: (0..num_channels).map(|_| DelayLine::new(max_samples)).collect(),
            samples_per_ms: sample_rate as f32 / 1000.0,
        };
        effect.update_delay_time();
        effect
    }

    fn delay_time_ms(&self) -> f32 {
        self.base.value(0)
    }

    fn feedback(&self) -> f32 {
        self.base.value(1)
    }

    fn mix(&self) -> f32 {
        self.base.value(2)
    }

    fn update_delay_time(&mut self) {
        let samples = self.delay_time_ms() * self.samples_per_ms;
        for line in &mut self.lines {
            line.set_delay(samples);
        }
    }
}

impl Effect for DelayEffect {
    fn process(&mut self, buffer: &mut AudioBuffer) {
        if self.base.is_bypassed() {
            return;
        }

        let feedback = self.feedback();
        let wet = self.mix();
        let dry = 1.0 - wet;

        for frame in buffer.frames_mut() {
            for (sample, line) in frame.iter_mut().zip(self.lines.iter_mut()) {
                let delayed = line.read_at(line.delay());
                line.write(*sample + delayed * feedback);
                *sample = *sample * dry + delayed * wet;
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
        if index == 0 {
            self.update_delay_time();
        }
    }

    fn set_bypass(&mut self, bypass: bool) {
        self.base.set_bypass(bypass);
    }

    fn is_bypassed(&self) -> bool {
        self.base.is_bypassed()
    }

    fn reset(&mut self) {
        for line in &mut self.lines {
            line.reset();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_echo_position() {
        // 1kHz sample rate: 1 sample per ms
        let mut effect = DelayEffect::new(1000, 1);
        effect.set_param(0, ParamInfo::new("", 0.0).with_range(10.0, 2000.0).normalize(100.0));
        effect.set_param(1, 0.0); // no feedback
        effect.set_param(2, 1.0); // fully wet

        let mut samples = vec![0.0; 300];
        samples[0] = 1.0;
        let mut buffer = AudioBuffer::from_interleaved(1, &samples);
        effect.process(&mut buffer);

        let peak_index = buffer
            .as_slice()
            .iter()
            .position(|s| s.abs() > 0.5)
            .unwrap();
        assert!((99..=101).contains(&peak_index), "echo at {}", peak_index);
        assert!(buffer.as_slice()[..peak_index].iter().all(|s| s.abs() < 1e-3));
    }

    #[test]
    fn test_delay_dry_passes_input() {
        let mut effect = DelayEffect::new(48000, 2);
        effect.set_param(2, 0.0);

        let mut buffer = AudioBuffer::from_interleaved(2, &[0.3, -0.3, 0.6, -0.6]);
        effect.process(&mut buffer);
        assert_eq!(buffer.as_slice(), &[0.3, -0.3, 0.6, -0.6]);
    }

    #[test]
    fn test_delay_feedback_repeats() {
        let mut effect = DelayEffect::new(1000, 1);
        effect.set_param(0, 0.0); // 10ms
        effect.set_param(1, 0.5 / 0.95);
        effect.set_param(2, 1.0);

        let mut samples = vec![0.0; 64];
        samples[0] = 1.0;
        let mut buffer = AudioBuffer::from_interleaved(1, &samples);
        effect.process(&mut buffer);

        assert!((buffer[10] - 1.0).abs() < 1e-4);
        assert!((buffer[20] - 0.5).abs() < 1e-3);
        assert!((buffer[30] - 0.25).abs() < 1e-3);
    }
}
