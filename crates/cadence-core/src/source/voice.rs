//! Game-side voice handle
//!
//! A [`SourceVoice`] is what the game thread holds after
//! [`MixerController::create_voice`]. Every mutating call is validated against
//! the controller's view of the slot and then staged as a [`MixerCommand`];
//! nothing reaches the render thread until the next
//! [`MixerController::update`].
//!
//! Playback progress is read lock-free from the voice's [`SourceAtomics`].

use std::fmt;

use basedrop::{Owned, Shared};

use super::atomics::SourceAtomics;
use super::decoder::Decoder;
use super::error::{SourceError, SourceResult};
use super::manager::MAX_QUEUED_BUFFERS;
use super::pcm::PcmBuffer;
use super::spatial::SpatializationParams;
use crate::engine::{MixerCommand, MixerController};
use crate::types::{SourceId, SubmixId, MAX_INPUT_CHANNELS};

/// Everything needed to create a voice
///
/// Built with [`VoiceParams::new`] or [`VoiceParams::from_decoder`] and the
/// `with_*` methods.
pub struct VoiceParams {
    pub num_channels: usize,
    /// Sample rate of the PCM that will be submitted
    pub sample_rate: u32,
    pub submix: SubmixId,
    pub use_hrtf: bool,
    pub volume: f32,
    pub pitch: f32,
    pub wet_level: f32,
    /// Low-pass cutoff in Hz (`None` = fully open)
    pub lpf_frequency: Option<f32>,
    pub spatialization: SpatializationParams,
    /// Row-major `input × output` gains (`None` = default map for the layout)
    pub channel_map: Option<Vec<f32>>,
    /// Streaming source kept topped up by the controller
    pub decoder: Option<Box<dyn Decoder>>,
}

impl VoiceParams {
    pub fn new(num_channels: usize, sample_rate: u32) -> Self {
        Self {
            num_channels,
            sample_rate,
            submix: SubmixId::MASTER,
            use_hrtf: false,
            volume: 1.0,
            pitch: 1.0,
            wet_level: 0.0,
            lpf_frequency: None,
            spatialization: SpatializationParams::default(),
            channel_map: None,
            decoder: None,
        }
    }

    /// Stream from a decoder; channel count and rate are taken from it
    pub fn from_decoder(decoder: Box<dyn Decoder>) -> Self {
        let mut params = Self::new(decoder.num_channels(), decoder.sample_rate());
        params.decoder = Some(decoder);
        params
    }

    pub fn with_submix(mut self, submix: SubmixId) -> Self {
        self.submix = submix;
        self
    }

    pub fn with_hrtf(mut self, use_hrtf: bool) -> Self {
        self.use_hrtf = use_hrtf;
        self
    }

    pub fn with_volume(mut self, volume: f32) -> Self {
        self.volume = volume;
        self
    }

    pub fn with_pitch(mut self, pitch: f32) -> Self {
        self.pitch = pitch;
        self
    }

    pub fn with_wet_level(mut self, wet_level: f32) -> Self {
        self.wet_level = wet_level;
        self
    }

    pub fn with_lpf_frequency(mut self, frequency: f32) -> Self {
        self.lpf_frequency = Some(frequency);
        self
    }

    pub fn with_spatialization(mut self, params: SpatializationParams) -> Self {
        self.spatialization = params;
        self
    }

    pub fn with_channel_map(mut self, gains: Vec<f32>) -> Self {
        self.channel_map = Some(gains);
        self
    }

    /// Reject channel counts the render thread cannot hold
    pub(crate) fn validate(&self) -> SourceResult<()> {
        if self.num_channels == 0 || self.num_channels > MAX_INPUT_CHANNELS {
            return Err(SourceError::InvalidChannelCount {
                channels: self.num_channels,
                max: MAX_INPUT_CHANNELS,
            });
        }
        Ok(())
    }
}

impl fmt::Debug for VoiceParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VoiceParams")
            .field("num_channels", &self.num_channels)
            .field("sample_rate", &self.sample_rate)
            .field("submix", &self.submix)
            .field("use_hrtf", &self.use_hrtf)
            .field("volume", &self.volume)
            .field("pitch", &self.pitch)
            .field("wet_level", &self.wet_level)
            .field("lpf_frequency", &self.lpf_frequency)
            .field("decoder", &self.decoder.is_some())
            .finish()
    }
}

/// Handle to an active voice
///
/// The handle stays valid until the voice is released; afterwards every
/// call fails with [`SourceError::SlotNotBusy`], even if the slot has been
/// reused by another voice.
#[derive(Clone)]
pub struct SourceVoice {
    pub(crate) id: SourceId,
    pub(crate) generation: u64,
    pub(crate) num_channels: usize,
    pub(crate) atomics: Shared<SourceAtomics>,
}

impl SourceVoice {
    #[inline]
    pub fn id(&self) -> SourceId {
        self.id
    }

    pub fn num_channels(&self) -> usize {
        self.num_channels
    }

    /// Ran out of data or was stopped
    pub fn is_done(&self) -> bool {
        self.atomics.is_done()
    }

    pub fn is_playing(&self) -> bool {
        self.atomics.is_playing()
    }

    pub fn frames_played(&self) -> u64 {
        self.atomics.frames_played()
    }

    pub fn buffers_consumed(&self) -> u64 {
        self.atomics.buffers_consumed()
    }

    pub fn loops_completed(&self) -> u64 {
        self.atomics.loops_completed()
    }

    // ─────────────────────────────────────────────────────────────
    // Playback control
    // ─────────────────────────────────────────────────────────────

    pub fn play(&self, mixer: &mut MixerController) -> SourceResult<()> {
        mixer.voice_slot(self)?;
        mixer.stage(MixerCommand::Play { source: self.id });
        Ok(())
    }

    pub fn pause(&self, mixer: &mut MixerController) -> SourceResult<()> {
        mixer.voice_slot(self)?;
        mixer.stage(MixerCommand::Pause { source: self.id });
        Ok(())
    }

    /// Stop playback and discard queued buffers
    pub fn stop(&self, mixer: &mut MixerController) -> SourceResult<()> {
        let slot = mixer.voice_slot(self)?;
        slot.decoder = None;
        mixer.stage(MixerCommand::Stop { source: self.id });
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────
    // Parameters
    // ─────────────────────────────────────────────────────────────

    pub fn set_volume(&self, mixer: &mut MixerController, volume: f32) -> SourceResult<()> {
        mixer.voice_slot(self)?;
        mixer.stage(MixerCommand::SetVolume {
            source: self.id,
            volume: volume.max(0.0),
        });
        Ok(())
    }

    /// Playback speed ratio (1.0 = original pitch)
    pub fn set_pitch(&self, mixer: &mut MixerController, pitch: f32) -> SourceResult<()> {
        let sample_rate = mixer.voice_slot(self)?.sample_rate;
        let pitch = mixer.effective_pitch(pitch, sample_rate);
        mixer.stage(MixerCommand::SetPitch {
            source: self.id,
            pitch,
        });
        Ok(())
    }

    /// Share of the signal sent to the submix effect chain (0..1)
    pub fn set_wet_level(&self, mixer: &mut MixerController, wet_level: f32) -> SourceResult<()> {
        mixer.voice_slot(self)?;
        mixer.stage(MixerCommand::SetWetLevel {
            source: self.id,
            wet_level: wet_level.clamp(0.0, 1.0),
        });
        Ok(())
    }

    /// Low-pass cutoff in Hz; anything at or above Nyquist opens the filter
    pub fn set_lpf_frequency(&self, mixer: &mut MixerController, frequency: f32) -> SourceResult<()> {
        mixer.voice_slot(self)?;
        mixer.stage(MixerCommand::SetLowPassFrequency {
            source: self.id,
            frequency: frequency.max(0.0),
        });
        Ok(())
    }

    /// Replace the channel map (row-major `input × output` gains)
    pub fn set_channel_map(&self, mixer: &mut MixerController, gains: Vec<f32>) -> SourceResult<()> {
        let (num_channels, use_hrtf) = {
            let slot = mixer.voice_slot(self)?;
            (slot.num_channels, slot.use_hrtf)
        };
        let expected = mixer.channel_map_len(num_channels, use_hrtf);
        if gains.len() != expected {
            return Err(SourceError::ChannelMapSize {
                id: self.id,
                expected,
                actual: gains.len(),
            });
        }
        let gains = Owned::new(mixer.gc_handle(), gains);
        mixer.stage(MixerCommand::SetChannelMap {
            source: self.id,
            gains,
        });
        Ok(())
    }

    pub fn set_spatialization(
        &self,
        mixer: &mut MixerController,
        params: SpatializationParams,
    ) -> SourceResult<()> {
        mixer.voice_slot(self)?;
        mixer.stage(MixerCommand::SetSpatialization {
            source: self.id,
            params,
        });
        Ok(())
    }

    /// Route the voice into another submix
    pub fn set_submix(&self, mixer: &mut MixerController, submix: SubmixId) -> SourceResult<()> {
        mixer.voice_slot(self)?;
        if !mixer.has_submix(submix) {
            return Err(SourceError::UnknownSubmix { submix });
        }
        mixer.stage(MixerCommand::SetSubmix {
            source: self.id,
            submix,
        });
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────
    // Data
    // ─────────────────────────────────────────────────────────────

    /// Queue a PCM buffer for playback
    pub fn submit_buffer(&self, mixer: &mut MixerController, buffer: PcmBuffer) -> SourceResult<()> {
        let slot = mixer.voice_slot(self)?;
        if buffer.num_channels() != slot.num_channels {
            return Err(SourceError::FormatMismatch {
                id: self.id,
                expected: slot.num_channels,
                actual: buffer.num_channels(),
            });
        }
        let queued = slot.submitted.saturating_sub(self.buffers_consumed());
        if queued >= MAX_QUEUED_BUFFERS as u64 {
            return Err(SourceError::QueueFull {
                id: self.id,
                max: MAX_QUEUED_BUFFERS,
            });
        }
        slot.submitted += 1;

        let buffer = Shared::new(mixer.gc_handle(), buffer);
        mixer.stage(MixerCommand::SubmitBuffer {
            source: self.id,
            buffer,
        });
        Ok(())
    }
}

impl fmt::Debug for SourceVoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceVoice")
            .field("id", &self.id)
            .field("generation", &self.generation)
            .field("num_channels", &self.num_channels)
            .field("done", &self.is_done())
            .finish()
    }
}
