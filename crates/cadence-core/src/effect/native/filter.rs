//! One-pole low-pass / high-pass submix filter

use crate::dsp::{OnePoleHighPass, OnePoleLowPass};
use crate::effect::{Effect, EffectBase, EffectInfo, ParamInfo, ParamValue};
use crate::types::AudioBuffer;

/// Lowest cutoff reachable from the normalized control
const MIN_CUTOFF_HZ: f32 = 20.0;

/// Which side of the spectrum the filter keeps
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterMode {
    LowPass,
    HighPass,
}

enum Filters {
    LowPass(Vec<OnePoleLowPass>),
    HighPass(Vec<OnePoleHighPass>),
}

/// Per-channel one-pole filter
///
/// Parameters:
/// - Cutoff: low-pass sweeps exponentially from 20Hz (0.0) to fully open at
///   Nyquist (1.0); high-pass is nearly flat at 0.0 and thins out towards 1.0
pub struct FilterEffect {
    base: EffectBase,
    filters: Filters,
    num_channels: usize,
    nyquist: f32,
}

impl FilterEffect {
    pub fn new(mode: FilterMode, sample_rate: u32, num_channels: usize) -> Self {
        let (name, default) = match mode {
            FilterMode::LowPass => ("Low-Pass", 1.0),
            FilterMode::HighPass => ("High-Pass", 0.0),
        };
        let info = EffectInfo::new(name, "Filter").with_param(ParamInfo::new("Cutoff", default));

        let filters = match mode {
            FilterMode::LowPass => Filters::LowPass(vec![OnePoleLowPass::default(); num_channels]),
            FilterMode::HighPass => {
                Filters::HighPass(vec![OnePoleHighPass::new(0.0); num_channels])
            }
        };

        let mut effect = Self {
            base: EffectBase::new(info),
            filters,
            num_channels,
            nyquist: sample_rate as f32 / 2.0,
        };
        effect.update_cutoff();
        effect
    }

    pub fn mode(&self) -> FilterMode {
        match self.filters {
            Filters::LowPass(_) => FilterMode::LowPass,
            Filters::HighPass(_) => FilterMode::HighPass,
        }
    }

    /// Cutoff in Hz for the current control position
    pub fn cutoff_hz(&self) -> f32 {
        let position = self.base.value(0);
        MIN_CUTOFF_HZ * (self.nyquist / MIN_CUTOFF_HZ).powf(position)
    }

    fn update_cutoff(&mut self) {
        let normalized = (self.cutoff_hz() / self.nyquist).min(1.0);
        match &mut self.filters {
            Filters::LowPass(filters) => filters.iter_mut().for_each(|f| f.set_frequency(normalized)),
            Filters::HighPass(filters) => {
                // The one-pole high-pass takes the control position as fc directly
                let position = self.base.value(0);
                filters.iter_mut().for_each(|f| f.set_frequency(position));
            }
        }
    }
}

impl Effect for FilterEffect {
    fn process(&mut self, buffer: &mut AudioBuffer) {
        if self.base.is_bypassed() {
            return;
        }
        debug_assert_eq!(buffer.num_channels(), self.num_channels);

        match &mut self.filters {
            Filters::LowPass(filters) => {
                for frame in buffer.frames_mut() {
                    for (sample, filter) in frame.iter_mut().zip(filters.iter_mut()) {
                        *sample = filter.process(*sample);
                    }
                }
            }
            Filters::HighPass(filters) => {
                for frame in buffer.frames_mut() {
                    for (sample, filter) in frame.iter_mut().zip(filters.iter_mut()) {
                        *sample = filter.process(*sample);
                    }
                }
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
        self.update_cutoff();
    }

    fn set_bypass(&mut self, bypass: bool) {
        self.base.set_bypass(bypass);
    }

    fn is_bypassed(&self) -> bool {
        self.base.is_bypassed()
    }

    fn reset(&mut self) {
        match &mut self.filters {
            Filters::LowPass(filters) => filters.iter_mut().for_each(|f| f.reset()),
            Filters::HighPass(filters) => filters.iter_mut().for_each(|f| f.reset()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alternating(num_frames: usize) -> AudioBuffer {
        let samples: Vec<f32> = (0..num_frames)
            .flat_map(|n| {
                let v = if n % 2 == 0 { 1.0 } else { -1.0 };
                [v, v]
            })
            .collect();
        AudioBuffer::from_interleaved(2, &samples)
    }

    #[test]
    fn test_open_lowpass_is_transparent() {
        let mut effect = FilterEffect::new(FilterMode::LowPass, 48000, 2);
        let mut buffer = alternating(64);
        effect.process(&mut buffer);
        assert_eq!(buffer.peak(), 1.0);
        assert_eq!(buffer[2], -1.0);
        assert_eq!(buffer[3], -1.0);
    }

    #[test]
    fn test_closed_lowpass_removes_nyquist() {
        let mut effect = FilterEffect::new(FilterMode::LowPass, 48000, 2);
        effect.set_param(0, 0.2);
        assert!(effect.cutoff_hz() < 100.0);

        let mut buffer = alternating(4096);
        effect.process(&mut buffer);
        let tail = &buffer.as_slice()[4000..];
        assert!(tail.iter().all(|s| s.abs() < 0.05));
    }

    #[test]
    fn test_highpass_mode() {
        let mut effect = FilterEffect::new(FilterMode::HighPass, 48000, 1);
        assert_eq!(effect.mode(), FilterMode::HighPass);
        effect.set_param(0, 0.9);

        let mut buffer = AudioBuffer::from_interleaved(1, &[1.0; 4096]);
        effect.process(&mut buffer);
        assert!(buffer[4095].abs() < 0.2);
    }
}
