//! Schroeder/Freeverb-style reverb
//!
//! Eight parallel feedback combs (each damped by a one-pole low-pass in the
//! feedback path) feed four all-pass stages in series. The right channel
//! uses delay lengths offset by a small stereo spread.

use super::{underflow_clamp, AllPass, OnePoleLowPass};
use serde::{Deserialize, Serialize};

/// Comb delay lengths at 44.1kHz
const COMB_LENGTHS: [usize; 8] = [1557, 1617, 1491, 1422, 1277, 1356, 1188, 1116];

/// All-pass delay lengths at 44.1kHz
const ALLPASS_LENGTHS: [usize; 4] = [225, 556, 441, 341];

/// Right channel length offset (in samples at 44.1kHz)
const STEREO_SPREAD: usize = 23;

const FIXED_GAIN: f32 = 0.015;
const SCALE_WET: f32 = 3.0;
const SCALE_DRY: f32 = 2.0;
const SCALE_DAMP: f32 = 0.4;
const SCALE_ROOM: f32 = 0.28;
const OFFSET_ROOM: f32 = 0.7;
const ALLPASS_GAIN: f32 = 0.5;

/// User-facing reverb controls, all in `[0, 1]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReverbSettings {
    pub room_size: f32,
    pub damping: f32,
    pub width: f32,
    pub wet: f32,
    pub dry: f32,
    /// Infinite sustain: combs stop decaying and stop taking input
    pub freeze: bool,
}

impl Default for ReverbSettings {
    fn default() -> Self {
        Self {
            room_size: 0.5,
            damping: 0.5,
            width: 1.0,
            wet: 1.0 / SCALE_WET,
            dry: 0.0,
            freeze: false,
        }
    }
}

/// Feedback comb with a one-pole low-pass in the loop
#[derive(Debug, Clone)]
struct Comb {
    buffer: Vec<f32>,
    pos: usize,
    damping: OnePoleLowPass,
    feedback: f32,
}

impl Comb {
    fn new(length: usize) -> Self {
        Self {
            buffer: vec![0.0; length.max(1)],
            pos: 0,
            damping: OnePoleLowPass::with_coefficient(0.0),
            feedback: 0.0,
        }
    }

    #[inline]
    fn process(&mut self, input: f32) -> f32 {
        let output = self.buffer[self.pos];
        let filtered = self.damping.process(output);
        self.buffer[self.pos] = underflow_clamp(input + filtered * self.feedback);
        self.pos += 1;
        if self.pos == self.buffer.len() {
            self.pos = 0;
        }
        output
    }

    fn reset(&mut self) {
        self.buffer.fill(0.0);
        self.damping.reset();
        self.pos = 0;
    }
}

/// Stereo Schroeder reverb
#[derive(Debug, Clone)]
pub struct SchroederReverb {
    combs_l: Vec<Comb>,
    combs_r: Vec<Comb>,
    allpass_l: Vec<AllPass>,
    allpass_r: Vec<AllPass>,
    settings: ReverbSettings,
    gain: f32,
    wet1: f32,
    wet2: f32,
    dry: f32,
}

impl SchroederReverb {
    pub fn new(settings: ReverbSettings, sample_rate: u32) -> Self {
        let scale = sample_rate as f32 / 44100.0;
        let scaled = |len: usize| ((len as f32 * scale) as usize).max(1);

        let mut reverb = Self {
            combs_l: COMB_LENGTHS.iter().map(|&len| Comb::new(scaled(len))).collect(),
            combs_r: COMB_LENGTHS
                .iter()
                .map(|&len| Comb::new(scaled(len + STEREO_SPREAD)))
                .collect(),
            allpass_l: ALLPASS_LENGTHS
                .iter()
                .map(|&len| AllPass::new(scaled(len), ALLPASS_GAIN))
                .collect(),
            allpass_r: ALLPASS_LENGTHS
                .iter()
                .map(|&len| AllPass::new(scaled(len + STEREO_SPREAD), ALLPASS_GAIN))
                .collect(),
            settings,
            gain: FIXED_GAIN,
            wet1: 0.0,
            wet2: 0.0,
            dry: 0.0,
        };
        reverb.update();
        reverb
    }

    /// Replace all settings and recompute coefficients
    pub fn set_settings(&mut self, settings: ReverbSettings) {
        self.settings = settings;
        self.update();
    }

    pub fn settings(&self) -> &ReverbSettings {
        &self.settings
    }

    fn update(&mut self) {
        let s = &mut self.settings;
        s.room_size = s.room_size.clamp(0.0, 1.0);
        s.damping = s.damping.clamp(0.0, 1.0);
        s.width = s.width.clamp(0.0, 1.0);
        s.wet = s.wet.clamp(0.0, 1.0);
        s.dry = s.dry.clamp(0.0, 1.0);

        let wet = s.wet * SCALE_WET;
        self.wet1 = wet * (s.width / 2.0 + 0.5);
        self.wet2 = wet * ((1.0 - s.width) / 2.0);
        self.dry = s.dry * SCALE_DRY;

        let (feedback, damp, gain) = if s.freeze {
            (1.0, 0.0, 0.0)
        } else {
            (
                s.room_size * SCALE_ROOM + OFFSET_ROOM,
                s.damping * SCALE_DAMP,
                FIXED_GAIN,
            )
        };
        self.gain = gain;

        for comb in self.combs_l.iter_mut().chain(self.combs_r.iter_mut()) {
            comb.feedback = feedback;
            comb.damping.set_coefficient(damp);
        }
    }

    /// Process one stereo frame
    #[inline]
    pub fn process(&mut self, left: f32, right: f32) -> (f32, f32) {
        let input = (left + right) * self.gain;

        let mut out_l = 0.0;
        let mut out_r = 0.0;
        for comb in &mut self.combs_l {
            out_l += comb.process(input);
        }
        for comb in &mut self.combs_r {
            out_r += comb.process(input);
        }

        for ap in &mut self.allpass_l {
            out_l = ap.process(out_l);
        }
        for ap in &mut self.allpass_r {
            out_r = ap.process(out_r);
        }

        (
            out_l * self.wet1 + out_r * self.wet2 + left * self.dry,
            out_r * self.wet1 + out_l * self.wet2 + right * self.dry,
        )
    }

    pub fn reset(&mut self) {
        for comb in self.combs_l.iter_mut().chain(self.combs_r.iter_mut()) {
            comb.reset();
        }
        for ap in self.allpass_l.iter_mut().chain(self.allpass_r.iter_mut()) {
            ap.reset();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn impulse_response(reverb: &mut SchroederReverb, len: usize) -> Vec<(f32, f32)> {
        let mut out = Vec::with_capacity(len);
        out.push(reverb.process(1.0, 1.0));
        for _ in 1..len {
            out.push(reverb.process(0.0, 0.0));
        }
        out
    }

    #[test]
    fn test_dry_only_passes_input() {
        let settings = ReverbSettings {
            wet: 0.0,
            dry: 0.5,
            ..Default::default()
        };
        let mut reverb = SchroederReverb::new(settings, 48000);
        let (l, r) = reverb.process(0.3, -0.2);
        assert!((l - 0.3).abs() < 1e-6);
        assert!((r + 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_tail_after_shortest_comb() {
        let mut reverb = SchroederReverb::new(ReverbSettings::default(), 44100);
        let response = impulse_response(&mut reverb, 8192);

        // Nothing before the shortest comb delay (1116 samples)
        assert!(response[..1116].iter().all(|(l, _)| l.abs() < 1e-9));
        let tail: f32 = response[1116..].iter().map(|(l, _)| l.abs()).sum();
        assert!(tail > 0.0);
    }

    #[test]
    fn test_stereo_spread_decorrelates() {
        let mut reverb = SchroederReverb::new(ReverbSettings::default(), 48000);
        let response = impulse_response(&mut reverb, 8192);
        assert!(response[1500..].iter().any(|(l, r)| (l - r).abs() > 1e-6));
    }

    #[test]
    fn test_tail_decays() {
        let mut reverb = SchroederReverb::new(ReverbSettings::default(), 48000);
        let response = impulse_response(&mut reverb, 48000 * 4);

        let early: f32 = response[2000..12000].iter().map(|(l, _)| l * l).sum();
        let late: f32 = response[180000..190000].iter().map(|(l, _)| l * l).sum();
        assert!(late < early * 0.01, "early {} late {}", early, late);
    }

    #[test]
    fn test_freeze_holds_energy() {
        let mut reverb = SchroederReverb::new(ReverbSettings::default(), 48000);
        impulse_response(&mut reverb, 4000);

        reverb.set_settings(ReverbSettings {
            freeze: true,
            ..Default::default()
        });
        let first: f32 = (0..10000).map(|_| reverb.process(1.0, 1.0).0.powi(2)).sum();
        let second: f32 = (0..10000).map(|_| reverb.process(1.0, 1.0).0.powi(2)).sum();

        // Frozen: input is ignored and the loop neither grows nor decays
        assert!(first > 0.0);
        assert!((second / first - 1.0).abs() < 0.5, "first {} second {}", first, second);
    }

    #[test]
    fn test_reset_silences_tail() {
        let mut reverb = SchroederReverb::new(ReverbSettings::default(), 48000);
        impulse_response(&mut reverb, 4000);
        reverb.reset();
        let response = impulse_response(&mut reverb, 1);
        assert_eq!(response[0], (0.0, 0.0));
    }
}
