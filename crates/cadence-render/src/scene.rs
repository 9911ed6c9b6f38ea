//! Scripted demo scene
//!
//! A drone pad on the `music` submix, a mono bell that orbits the listener
//! through the spatializer, and optionally a looping user-supplied clip. A
//! reverb sits on the `fx` submix (or the master if the config has none).

use std::f32::consts::TAU;

use anyhow::Result;
use cadence_core::effect::{EffectConfig, EffectKind};
use cadence_core::engine::MixerController;
use cadence_core::source::{SineDecoder, SourceVoice, SpatializationParams, VoiceParams};
use cadence_core::SubmixId;

use crate::wav::WavClip;

/// Seconds per orbit of the bell
const ORBIT_PERIOD: f32 = 6.0;

pub struct Scene {
    pad: SourceVoice,
    bell: SourceVoice,
    clip: Option<SourceVoice>,
}

impl Scene {
    pub fn build(mixer: &mut MixerController, clip: Option<WavClip>) -> Result<Self> {
        let sample_rate = mixer.format().sample_rate;
        let music = mixer.submix_id("music").unwrap_or(SubmixId::MASTER);
        let fx = mixer.submix_id("fx").unwrap_or(SubmixId::MASTER);

        let reverb = EffectConfig::new(EffectKind::Reverb)
            .with_param("room size", 0.8)
            .with_param("wet", 1.0)
            .with_param("dry", 0.0);
        mixer.add_submix_effect(fx, &reverb)?;

        let pad = mixer.create_voice(
            VoiceParams::from_decoder(Box::new(
                SineDecoder::new(110.0, sample_rate, 2).with_amplitude(0.2),
            ))
            .with_submix(music)
            .with_wet_level(0.3)
            .with_lpf_frequency(2_000.0),
        )?;
        pad.play(mixer)?;

        // Rendered at a different rate to exercise resampling
        let bell = mixer.create_voice(
            VoiceParams::from_decoder(Box::new(
                SineDecoder::new(660.0, 44_100, 1).with_amplitude(0.3),
            ))
            .with_submix(fx)
            .with_hrtf(true)
            .with_wet_level(0.5),
        )?;
        bell.play(mixer)?;

        let clip = match clip {
            Some(clip) => {
                let voice = mixer.create_voice(
                    VoiceParams::new(clip.buffer.num_channels(), clip.sample_rate)
                        .with_submix(music)
                        .with_volume(0.8),
                )?;
                voice.submit_buffer(mixer, clip.buffer.with_looping(true))?;
                voice.play(mixer)?;
                Some(voice)
            }
            None => None,
        };

        log::info!(
            "Scene ready: {} voices, music -> {}, fx -> {}",
            mixer.active_voices(),
            music,
            fx
        );

        Ok(Self { pad, bell, clip })
    }

    /// Move the scene forward to `time` seconds
    pub fn advance(&self, mixer: &mut MixerController, time: f32) -> Result<()> {
        let phase = (time / ORBIT_PERIOD).fract() * TAU;
        self.bell.set_spatialization(
            mixer,
            SpatializationParams {
                azimuth: phase.sin() * std::f32::consts::FRAC_PI_2,
                elevation: 0.0,
                distance: 1.0 + phase.cos().abs() * 2.0,
            },
        )?;

        // Slow swell on the pad
        let swell = 0.6 + 0.4 * (time * TAU / 10.0).sin();
        self.pad.set_volume(mixer, swell)?;
        Ok(())
    }

    pub fn release(self, mixer: &mut MixerController) -> Result<()> {
        mixer.release_voice(self.pad)?;
        mixer.release_voice(self.bell)?;
        if let Some(clip) = self.clip {
            mixer.release_voice(clip)?;
        }
        Ok(())
    }
}
