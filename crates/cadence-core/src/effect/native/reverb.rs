//! Reverb effect wrapping the Schroeder reverb
//!
//! Channels are processed in pairs (FL/FR, C/LFE, ...), each pair through its
//! own stereo reverb. An odd trailing channel runs as mono through the left
//! half of its reverb.

use crate::dsp::{ReverbSettings, SchroederReverb};
use crate::effect::{Effect, EffectBase, EffectInfo, ParamInfo, ParamValue};
use crate::types::AudioBuffer;

/// Freeverb-style reverb
///
/// Parameters:
/// - Room Size: decay time (0.0-1.0)
/// - Damping: high frequency damping (0.0 = bright, 1.0 = dark)
/// - Width: stereo width (0.0 = mono, 1.0 = full stereo)
/// - Wet / Dry: output levels
/// - Freeze: above 0.5 the tail sustains forever and input is ignored
pub struct ReverbEffect {
    base: EffectBase,
    reverbs: Vec<SchroederReverb>,
    num_channels: usize,
}

impl ReverbEffect {
    pub fn new(sample_rate: u32, num_channels: usize) -> Self {
        let defaults = ReverbSettings::default();
        let info = EffectInfo::new("Reverb", "Reverb")
            .with_param(ParamInfo::new("Room Size", defaults.room_size))
            .with_param(ParamInfo::new("Damping", defaults.damping))
            .with_param(ParamInfo::new("Width", defaults.width))
            .with_param(ParamInfo::new("Wet", defaults.wet))
            .with_param(ParamInfo::new("Dry", defaults.dry))
            .with_param(ParamInfo::new("Freeze", 0.0));

        let pairs = num_channels.div_ceil(2);
        Self {
            base: EffectBase::new(info),
            reverbs: (0..pairs)
                .map(|_| SchroederReverb::new(defaults, sample_rate))
                .collect(),
            num_channels,
        }
    }

    fn settings(&self) -> ReverbSettings {
        ReverbSettings {
            room_size: self.base.value(0),
            damping: self.base.value(1),
            width: self.base.value(2),
            wet: self.base.value(3),
            dry: self.base.value(4),
            freeze: self.base.value(5) > 0.5,
        }
    }
}

impl Effect for ReverbEffect {
    fn process(&mut self, buffer: &mut AudioBuffer) {
        if self.base.is_bypassed() {
            return;
        }
        debug_assert_eq!(buffer.num_channels(), self.num_channels);

        for frame in buffer.frames_mut() {
            for (pair, reverb) in frame.chunks_mut(2).zip(self.reverbs.iter_mut()) {
                match pair {
                    [left, right] => {
                        let (l, r) = reverb.process(*left, *right);
                        *left = l;
                        *right = r;
                    }
                    [mono] => {
                        *mono = reverb.process(*mono, *mono).0;
                    }
                    _ => {}
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
        let settings = self.settings();
        for reverb in &mut self.reverbs {
            reverb.set_settings(settings);
        }
    }

    fn set_bypass(&mut self, bypass: bool) {
        self.base.set_bypass(bypass);
    }

    fn is_bypassed(&self) -> bool {
        self.base.is_bypassed()
    }

    fn reset(&mut self) {
        for reverb in &mut self.reverbs {
            reverb.reset();
        }
    }
}
