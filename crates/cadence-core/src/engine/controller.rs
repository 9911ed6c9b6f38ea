//! Game-side mixer control
//!
//! The [`MixerController`] is the only way the game thread talks to the
//! render thread. It keeps its own view of which voice slots are in use,
//! validates every request against it, and stages the resulting commands.
//! [`MixerController::update`] then tops up streaming voices and publishes
//! the whole batch at once.
//!
//! ```ignore
//! let (mut mixer, engine) = create_mixer(&config)?;
//! let voice = mixer.create_voice(VoiceParams::new(1, 48000))?;
//! voice.submit_buffer(&mut mixer, pcm)?;
//! voice.play(&mut mixer)?;
//! mixer.update();
//! ```

use basedrop::{Handle, Owned, Shared};

use super::command::{command_channel, MixerCommand, COMMAND_QUEUE_CAPACITY};
use super::engine::MixerEngine;
use super::error::{MixerError, MixerResult};
use super::gc::gc_handle;
use crate::config::MixerConfig;
use crate::dsp::ramp_frames_for;
use crate::effect::{EffectChainError, EffectConfig, MAX_SUBMIX_EFFECTS};
use crate::source::{
    default_channel_map, ChannelLayout, Decoder, EqualPowerPanner, SourceAtomics, SourceError,
    SourceInit, SourceManager, SourceResult, SourceVoice, VoiceParams, MAX_QUEUED_BUFFERS,
};
use crate::submix::{SubmixError, SubmixGraph, SubmixResult};
use crate::types::{RenderFormat, SourceId, SubmixId, MAX_BUFFER_SIZE, MAX_OUTPUT_CHANNELS};

/// Game-side state of a voice slot
pub(crate) struct VoiceSlot {
    pub(crate) generation: u64,
    pub(crate) num_channels: usize,
    pub(crate) sample_rate: u32,
    pub(crate) use_hrtf: bool,
    /// Buffers staged for this voice so far
    pub(crate) submitted: u64,
    pub(crate) atomics: Shared<SourceAtomics>,
    pub(crate) decoder: Option<Box<dyn Decoder>>,
}

/// Game-side view of a submix
struct SubmixEntry {
    name: String,
    num_effects: usize,
}

/// Build a mixer from configuration
///
/// Returns the game-side controller and the render-side engine. The two
/// share nothing but the command queue and per-voice atomics.
pub fn create_mixer(config: &MixerConfig) -> MixerResult<(MixerController, MixerEngine)> {
    validate_config(config)?;

    let format = RenderFormat::new(
        config.sample_rate,
        config.layout.num_channels(),
        config.max_block_frames,
    );
    let ramp_frames = ramp_frames_for(config.ramp_ms, config.sample_rate);
    let gc = gc_handle();

    let graph = SubmixGraph::build(
        &config.submixes,
        format,
        config.max_sources,
        ramp_frames,
        &gc,
    )?;
    let submixes = (0..graph.len())
        .map(|index| SubmixEntry {
            name: graph.name(SubmixId(index)).unwrap_or_default().to_string(),
            num_effects: graph.effect_count(SubmixId(index)),
        })
        .collect();

    let mut sources = SourceManager::new(format, config.max_sources, ramp_frames);
    sources.set_spatializer(Box::new(EqualPowerPanner::new(config.max_sources)));

    let (producer, consumer) = command_channel(COMMAND_QUEUE_CAPACITY);

    log::info!(
        "Mixer created: {}Hz, {} channels, {} voices, {} submixes, {} frame blocks, {} frame ramps",
        format.sample_rate,
        format.num_channels,
        config.max_sources,
        graph.len(),
        format.max_block_frames,
        ramp_frames
    );

    let controller = MixerController {
        format,
        layout: config.layout.clone(),
        producer,
        pending: Vec::with_capacity(COMMAND_QUEUE_CAPACITY),
        gc,
        slots: (0..config.max_sources).map(|_| None).collect(),
        generations: vec![0; config.max_sources],
        // Reversed so the lowest index is handed out first
        free: (0..config.max_sources).rev().collect(),
        submixes,
        queued_buffers: config.queued_buffers.clamp(1, MAX_QUEUED_BUFFERS),
    };
    let engine = MixerEngine::new(consumer, sources, graph);

    Ok((controller, engine))
}

fn validate_config(config: &MixerConfig) -> MixerResult<()> {
    let invalid = |msg: String| Err(MixerError::InvalidConfig(msg));

    if config.sample_rate == 0 {
        return invalid("sample rate must be positive".to_string());
    }
    let num_channels = config.layout.num_channels();
    if num_channels == 0 || num_channels > MAX_OUTPUT_CHANNELS {
        return invalid(format!(
            "layout has {} channels (expected 1..={})",
            num_channels, MAX_OUTPUT_CHANNELS
        ));
    }
    if config.max_sources == 0 {
        return invalid("max_sources must be at least 1".to_string());
    }
    if config.max_block_frames == 0 || config.max_block_frames > MAX_BUFFER_SIZE {
        return invalid(format!(
            "max_block_frames {} out of range (1..={})",
            config.max_block_frames, MAX_BUFFER_SIZE
        ));
    }
    if !(config.ramp_ms >= 0.0) {
        return invalid(format!("ramp_ms {} must be >= 0", config.ramp_ms));
    }
    Ok(())
}

/// The game half of a mixer
pub struct MixerController {
    format: RenderFormat,
    layout: ChannelLayout,
    producer: rtrb::Producer<MixerCommand>,
    /// Commands staged since the last publish
    pending: Vec<MixerCommand>,
    gc: Handle,
    slots: Vec<Option<VoiceSlot>>,
    generations: Vec<u64>,
    free: Vec<usize>,
    submixes: Vec<SubmixEntry>,
    /// Buffers kept in flight for decoder-driven voices
    queued_buffers: usize,
}

impl MixerController {
    pub fn format(&self) -> &RenderFormat {
        &self.format
    }

    pub fn layout(&self) -> &ChannelLayout {
        &self.layout
    }

    pub fn max_sources(&self) -> usize {
        self.slots.len()
    }

    /// Voices created and not yet released
    pub fn active_voices(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    /// Commands waiting for the next [`update`](Self::update)
    pub fn pending_commands(&self) -> usize {
        self.pending.len()
    }

    // ─────────────────────────────────────────────────────────────
    // Voices
    // ─────────────────────────────────────────────────────────────

    /// Acquire a free slot and stage its initialization
    ///
    /// The voice is created paused; call [`SourceVoice::play`] to start it.
    /// Fails with [`SourceError::NoFreeSlot`] when every slot is in use.
    pub fn create_voice(&mut self, params: VoiceParams) -> SourceResult<SourceVoice> {
        params.validate()?;
        let index = *self.free.last().ok_or(SourceError::NoFreeSlot {
            capacity: self.slots.len(),
        })?;
        let id = SourceId(index);

        if !self.has_submix(params.submix) {
            return Err(SourceError::UnknownSubmix {
                submix: params.submix,
            });
        }

        let use_hrtf = if params.use_hrtf && params.num_channels != 1 {
            log::warn!(
                "{}: HRTF needs a mono source, got {} channels; spatialization disabled",
                id,
                params.num_channels
            );
            false
        } else {
            params.use_hrtf
        };

        let expected = self.channel_map_len(params.num_channels, use_hrtf);
        let channel_map = match params.channel_map {
            Some(gains) if gains.len() != expected => {
                return Err(SourceError::ChannelMapSize {
                    id,
                    expected,
                    actual: gains.len(),
                });
            }
            Some(gains) => gains,
            None => default_channel_map(if use_hrtf { 2 } else { params.num_channels }, &self.layout),
        };

        self.free.pop();
        self.generations[index] += 1;
        let generation = self.generations[index];
        let atomics = Shared::new(&self.gc, SourceAtomics::new());

        let init = SourceInit {
            num_channels: params.num_channels,
            submix: params.submix,
            use_hrtf,
            volume: params.volume.max(0.0),
            pitch: self.effective_pitch(params.pitch, params.sample_rate),
            wet_level: params.wet_level.clamp(0.0, 1.0),
            lpf_frequency: params
                .lpf_frequency
                .unwrap_or_else(|| self.format.nyquist())
                .max(0.0),
            spatialization: params.spatialization,
            channel_map,
            atomics: atomics.clone(),
        };
        self.pending.push(MixerCommand::InitSource {
            source: id,
            init: Owned::new(&self.gc, init),
        });

        self.slots[index] = Some(VoiceSlot {
            generation,
            num_channels: params.num_channels,
            sample_rate: params.sample_rate,
            use_hrtf,
            submitted: 0,
            atomics: atomics.clone(),
            decoder: params.decoder,
        });
        self.top_up(index);

        log::debug!(
            "Created {} ({} ch @ {}Hz, {}{})",
            id,
            params.num_channels,
            params.sample_rate,
            params.submix,
            if use_hrtf { ", hrtf" } else { "" }
        );

        Ok(SourceVoice {
            id,
            generation,
            num_channels: params.num_channels,
            atomics,
        })
    }

    /// Stage the voice's release and return its slot to the pool
    ///
    /// The slot may be handed out again right away: its next init is queued
    /// behind this release.
    pub fn release_voice(&mut self, voice: SourceVoice) -> SourceResult<()> {
        self.voice_slot(&voice)?;
        let index = voice.id.index();
        self.slots[index] = None;
        self.free.push(index);
        self.pending.push(MixerCommand::Release { source: voice.id });
        log::debug!("Released {}", voice.id);
        Ok(())
    }

    /// Slot state for a live handle
    pub(crate) fn voice_slot(&mut self, voice: &SourceVoice) -> SourceResult<&mut VoiceSlot> {
        self.slots
            .get_mut(voice.id.index())
            .and_then(Option::as_mut)
            .filter(|slot| slot.generation == voice.generation)
            .ok_or(SourceError::SlotNotBusy { id: voice.id })
    }

    pub(crate) fn stage(&mut self, command: MixerCommand) {
        self.pending.push(command);
    }

    pub(crate) fn gc_handle(&self) -> &Handle {
        &self.gc
    }

    /// Requested pitch scaled so the source plays at its own rate
    pub(crate) fn effective_pitch(&self, pitch: f32, source_rate: u32) -> f32 {
        pitch.max(0.0) * source_rate as f32 / self.format.sample_rate as f32
    }

    /// Gains a channel map needs for a voice of this shape
    pub(crate) fn channel_map_len(&self, num_channels: usize, use_hrtf: bool) -> usize {
        let inputs = if use_hrtf { 2 } else { num_channels };
        inputs * self.format.num_channels
    }

    /// Keep a streaming voice's queue filled from its decoder
    fn top_up(&mut self, index: usize) {
        let Some(slot) = self.slots[index].as_mut() else {
            return;
        };
        let Some(decoder) = slot.decoder.as_mut() else {
            return;
        };

        let consumed = slot.atomics.buffers_consumed();
        let mut finished = false;
        while slot.submitted.saturating_sub(consumed) < self.queued_buffers as u64 {
            match decoder.decode_next() {
                Some(pcm) if pcm.num_channels() == slot.num_channels => {
                    slot.submitted += 1;
                    self.pending.push(MixerCommand::SubmitBuffer {
                        source: SourceId(index),
                        buffer: Shared::new(&self.gc, pcm),
                    });
                }
                Some(pcm) => {
                    log::warn!(
                        "{}: decoder produced {} channels, voice has {}; stream stopped",
                        SourceId(index),
                        pcm.num_channels(),
                        slot.num_channels
                    );
                    finished = true;
                    break;
                }
                None => {
                    log::debug!("{}: decoder finished", SourceId(index));
                    finished = true;
                    break;
                }
            }
        }
        if finished {
            slot.decoder = None;
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Submixes
    // ─────────────────────────────────────────────────────────────

    /// Look up a submix by its configured name
    pub fn submix_id(&self, name: &str) -> Option<SubmixId> {
        self.submixes.iter().position(|s| s.name == name).map(SubmixId)
    }

    pub fn has_submix(&self, submix: SubmixId) -> bool {
        submix.index() < self.submixes.len()
    }

    pub fn submix_effect_count(&self, submix: SubmixId) -> Option<usize> {
        self.submixes.get(submix.index()).map(|s| s.num_effects)
    }

    pub fn set_submix_wet_level(&mut self, submix: SubmixId, wet_level: f32) -> SubmixResult<()> {
        self.submix_entry(submix)?;
        self.pending.push(MixerCommand::SetSubmixWetLevel {
            submix,
            wet_level: wet_level.clamp(0.0, 1.0),
        });
        Ok(())
    }

    /// Append an effect to a submix chain, returning its index
    pub fn add_submix_effect(&mut self, submix: SubmixId, config: &EffectConfig) -> SubmixResult<usize> {
        let format = self.format;
        let entry = self.submix_entry(submix)?;
        if entry.num_effects >= MAX_SUBMIX_EFFECTS {
            return Err(SubmixError::Effect {
                submix,
                source: EffectChainError::ChainFull {
                    max: MAX_SUBMIX_EFFECTS,
                },
            });
        }
        let index = entry.num_effects;
        entry.num_effects += 1;

        let effect = config.build(format.sample_rate, format.num_channels);
        let effect = Owned::new(&self.gc, effect);
        self.pending
            .push(MixerCommand::AddSubmixEffect { submix, effect });
        Ok(index)
    }

    /// Remove an effect; later effects shift down by one
    pub fn remove_submix_effect(&mut self, submix: SubmixId, index: usize) -> SubmixResult<()> {
        let entry = self.submix_entry(submix)?;
        check_effect_index(submix, index, entry.num_effects)?;
        entry.num_effects -= 1;
        self.pending
            .push(MixerCommand::RemoveSubmixEffect { submix, index });
        Ok(())
    }

    /// Set a normalized effect parameter
    pub fn set_submix_effect_param(
        &mut self,
        submix: SubmixId,
        index: usize,
        param: usize,
        value: f32,
    ) -> SubmixResult<()> {
        let entry = self.submix_entry(submix)?;
        check_effect_index(submix, index, entry.num_effects)?;
        self.pending.push(MixerCommand::SetSubmixEffectParam {
            submix,
            index,
            param,
            value,
        });
        Ok(())
    }

    pub fn set_submix_effect_bypass(
        &mut self,
        submix: SubmixId,
        index: usize,
        bypass: bool,
    ) -> SubmixResult<()> {
        let entry = self.submix_entry(submix)?;
        check_effect_index(submix, index, entry.num_effects)?;
        self.pending.push(MixerCommand::SetSubmixEffectBypass {
            submix,
            index,
            bypass,
        });
        Ok(())
    }

    fn submix_entry(&mut self, submix: SubmixId) -> SubmixResult<&mut SubmixEntry> {
        self.submixes
            .get_mut(submix.index())
            .ok_or(SubmixError::UnknownSubmix { submix })
    }

    // ─────────────────────────────────────────────────────────────
    // Publishing
    // ─────────────────────────────────────────────────────────────

    /// Top up streaming voices and publish everything staged
    ///
    /// Returns the number of commands published. When the queue lacks room
    /// for the whole batch nothing is published and the batch is retried on
    /// the next call.
    pub fn update(&mut self) -> usize {
        for index in 0..self.slots.len() {
            self.top_up(index);
        }
        self.publish()
    }

    fn publish(&mut self) -> usize {
        let count = self.pending.len();
        if count == 0 {
            return 0;
        }

        let capacity = self.producer.buffer().capacity();
        if count > capacity {
            // Can never fit in one chunk; send what fits, in order
            let available = self.producer.slots();
            log::warn!(
                "{} staged commands exceed queue capacity {}, publishing {} now",
                count,
                capacity,
                available
            );
            return self.write_chunk(available);
        }

        match self.producer.write_chunk_uninit(count) {
            Ok(chunk) => chunk.fill_from_iter(self.pending.drain(..)),
            Err(e) => {
                log::warn!("Command queue busy ({}), holding {} commands", e, count);
                0
            }
        }
    }

    fn write_chunk(&mut self, count: usize) -> usize {
        if count == 0 {
            return 0;
        }
        match self.producer.write_chunk_uninit(count) {
            Ok(chunk) => chunk.fill_from_iter(self.pending.drain(..count)),
            Err(_) => 0,
        }
    }
}

fn check_effect_index(submix: SubmixId, index: usize, len: usize) -> SubmixResult<()> {
    if index >= len {
        return Err(SubmixError::Effect {
            submix,
            source: EffectChainError::IndexOutOfBounds { index, len },
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::AudioStreamCallback;
    use crate::config::SubmixConfig;
    use crate::effect::EffectKind;
    use crate::source::{PcmBuffer, PcmDecoder};
    use std::f32::consts::FRAC_1_SQRT_2;

    fn config(max_sources: usize) -> MixerConfig {
        MixerConfig {
            sample_rate: 48000,
            layout: ChannelLayout::stereo(),
            max_sources,
            ramp_ms: 1.0,
            max_block_frames: 64,
            queued_buffers: 2,
            ..Default::default()
        }
    }

    fn render(engine: &mut MixerEngine, num_frames: usize) -> Vec<f32> {
        let mut out = vec![0.0; num_frames * engine.format().num_channels];
        engine.on_process_audio_stream(&mut out);
        out
    }

    #[test]
    fn test_four_frame_scenario() {
        let (mut mixer, mut engine) = create_mixer(&config(4)).unwrap();

        let voice = mixer.create_voice(VoiceParams::new(1, 48000)).unwrap();
        voice
            .submit_buffer(&mut mixer, PcmBuffer::from_f32(1, vec![0.1, 0.2, 0.3, 0.4]))
            .unwrap();
        voice.play(&mut mixer).unwrap();
        assert_eq!(mixer.update(), 3);

        let out = render(&mut engine, 6);
        let g = FRAC_1_SQRT_2;
        let expected = [0.1, 0.2, 0.3, 0.4, 0.0, 0.0];
        for (frame, &e) in out.chunks(2).zip(&expected) {
            assert!((frame[0] - e * g).abs() < 1e-6);
            assert!((frame[1] - e * g).abs() < 1e-6);
        }
        assert!(voice.is_done());
        assert_eq!(voice.frames_played(), 4);
        assert_eq!(voice.buffers_consumed(), 1);
    }

    #[test]
    fn test_nothing_applies_before_update() {
        let (mut mixer, mut engine) = create_mixer(&config(2)).unwrap();
        let voice = mixer.create_voice(VoiceParams::new(1, 48000)).unwrap();
        voice
            .submit_buffer(&mut mixer, PcmBuffer::from_f32(1, vec![1.0; 32]))
            .unwrap();
        voice.play(&mut mixer).unwrap();

        assert!(render(&mut engine, 8).iter().all(|&s| s == 0.0));
        assert_eq!(mixer.pending_commands(), 3);

        mixer.update();
        assert!(render(&mut engine, 8).iter().any(|&s| s != 0.0));
    }

    #[test]
    fn test_last_writer_wins() {
        let mut cfg = config(1);
        cfg.ramp_ms = 0.0;
        let (mut mixer, mut engine) = create_mixer(&cfg).unwrap();
        let voice = mixer.create_voice(VoiceParams::new(1, 48000)).unwrap();
        voice
            .submit_buffer(&mut mixer, PcmBuffer::from_f32(1, vec![1.0; 64]))
            .unwrap();
        voice.set_volume(&mut mixer, 0.9).unwrap();
        voice.set_volume(&mut mixer, 0.25).unwrap();
        voice.play(&mut mixer).unwrap();
        mixer.update();

        let out = render(&mut engine, 4);
        for &s in &out {
            assert!((s - 0.25 * FRAC_1_SQRT_2).abs() < 1e-6, "{}", s);
        }
    }

    #[test]
    fn test_pool_exhaustion_and_reuse() {
        let (mut mixer, _engine) = create_mixer(&config(2)).unwrap();

        let a = mixer.create_voice(VoiceParams::new(1, 48000)).unwrap();
        let _b = mixer.create_voice(VoiceParams::new(2, 48000)).unwrap();
        assert_eq!(
            mixer.create_voice(VoiceParams::new(1, 48000)).unwrap_err(),
            SourceError::NoFreeSlot { capacity: 2 }
        );

        let stale = a.clone();
        mixer.release_voice(a).unwrap();
        assert_eq!(mixer.active_voices(), 1);

        let c = mixer.create_voice(VoiceParams::new(1, 48000)).unwrap();
        assert_eq!(c.id(), stale.id());
        assert_eq!(
            stale.play(&mut mixer).unwrap_err(),
            SourceError::SlotNotBusy { id: stale.id() }
        );
        assert!(c.play(&mut mixer).is_ok());
    }

    #[test]
    fn test_contract_violations_are_rejected() {
        let (mut mixer, _engine) = create_mixer(&config(2)).unwrap();

        assert!(matches!(
            mixer.create_voice(VoiceParams::new(0, 48000)),
            Err(SourceError::InvalidChannelCount { .. })
        ));
        assert!(matches!(
            mixer.create_voice(VoiceParams::new(1, 48000).with_submix(SubmixId(7))),
            Err(SourceError::UnknownSubmix { .. })
        ));
        assert!(matches!(
            mixer.create_voice(VoiceParams::new(1, 48000).with_channel_map(vec![1.0])),
            Err(SourceError::ChannelMapSize { expected: 2, actual: 1, .. })
        ));

        let voice = mixer.create_voice(VoiceParams::new(2, 48000)).unwrap();
        assert!(matches!(
            voice.submit_buffer(&mut mixer, PcmBuffer::from_f32(1, vec![0.0; 8])),
            Err(SourceError::FormatMismatch { expected: 2, actual: 1, .. })
        ));
        assert!(matches!(
            voice.set_channel_map(&mut mixer, vec![1.0; 3]),
            Err(SourceError::ChannelMapSize { expected: 4, .. })
        ));

        for _ in 0..MAX_QUEUED_BUFFERS {
            voice
                .submit_buffer(&mut mixer, PcmBuffer::from_f32(2, vec![0.0; 8]))
                .unwrap();
        }
        assert!(matches!(
            voice.submit_buffer(&mut mixer, PcmBuffer::from_f32(2, vec![0.0; 8])),
            Err(SourceError::QueueFull { .. })
        ));
    }

    #[test]
    fn test_looping_buffer_stays_queued() {
        let (mut mixer, mut engine) = create_mixer(&config(1)).unwrap();
        let voice = mixer.create_voice(VoiceParams::new(1, 48000)).unwrap();
        voice
            .submit_buffer(&mut mixer, PcmBuffer::from_f32(1, vec![0.25]).with_looping(true))
            .unwrap();
        voice.play(&mut mixer).unwrap();
        mixer.update();
        render(&mut engine, 64);

        assert_eq!(voice.loops_completed(), 63);
        assert_eq!(voice.buffers_consumed(), 0);

        for _ in 1..MAX_QUEUED_BUFFERS {
            voice
                .submit_buffer(&mut mixer, PcmBuffer::from_f32(1, vec![0.0; 4]))
                .unwrap();
        }
        assert!(matches!(
            voice.submit_buffer(&mut mixer, PcmBuffer::from_f32(1, vec![0.0; 4])),
            Err(SourceError::QueueFull { .. })
        ));

        // The render thread accepts everything that was let through
        mixer.update();
        let out = render(&mut engine, 64);
        assert!(out.iter().all(|s| s.is_finite()));
    }

    #[test]
    fn test_stop_frees_queue_space() {
        let (mut mixer, mut engine) = create_mixer(&config(1)).unwrap();
        let voice = mixer.create_voice(VoiceParams::new(1, 48000)).unwrap();
        for _ in 0..MAX_QUEUED_BUFFERS {
            voice
                .submit_buffer(&mut mixer, PcmBuffer::from_f32(1, vec![0.0; 4]))
                .unwrap();
        }
        voice.stop(&mut mixer).unwrap();
        mixer.update();
        render(&mut engine, 16);

        assert_eq!(voice.buffers_consumed(), MAX_QUEUED_BUFFERS as u64);
        assert!(voice
            .submit_buffer(&mut mixer, PcmBuffer::from_f32(1, vec![0.0; 4]))
            .is_ok());
    }

    #[test]
    fn test_hrtf_requires_mono() {
        let (mut mixer, _engine) = create_mixer(&config(2)).unwrap();
        let voice = mixer
            .create_voice(VoiceParams::new(2, 48000).with_hrtf(true))
            .unwrap();
        // Channel map is sized for the plain stereo voice
        assert!(voice.set_channel_map(&mut mixer, vec![1.0, 0.0, 0.0, 1.0]).is_ok());
    }

    #[test]
    fn test_effective_pitch_follows_source_rate() {
        let (mixer, _engine) = create_mixer(&config(1)).unwrap();
        assert_eq!(mixer.effective_pitch(1.0, 24000), 0.5);
        assert_eq!(mixer.effective_pitch(2.0, 48000), 2.0);
        assert_eq!(mixer.effective_pitch(-1.0, 48000), 0.0);
    }

    #[test]
    fn test_decoder_keeps_queue_topped_up() {
        let (mut mixer, mut engine) = create_mixer(&config(1)).unwrap();
        let clip = PcmBuffer::from_f32(1, vec![0.5; 40]);
        let decoder = PcmDecoder::new(clip, 48000, 16);

        let voice = mixer
            .create_voice(VoiceParams::from_decoder(Box::new(decoder)))
            .unwrap();
        voice.play(&mut mixer).unwrap();
        // init + 2 primed buffers + play
        assert_eq!(mixer.update(), 4);

        let mut frames = 0;
        for _ in 0..10 {
            render(&mut engine, 16);
            frames += 16;
            mixer.update();
            if voice.is_done() {
                break;
            }
        }
        assert!(voice.is_done());
        assert_eq!(voice.frames_played(), 40);
        assert_eq!(voice.buffers_consumed(), 3);
        assert!(frames >= 40);
    }

    #[test]
    fn test_submix_routing_and_effects() {
        let mut cfg = config(2);
        cfg.submixes = vec![SubmixConfig {
            name: "sfx".to_string(),
            parent: None,
            wet_level: 0.0,
            effects: Vec::new(),
        }];
        let (mut mixer, mut engine) = create_mixer(&cfg).unwrap();
        let sfx = mixer.submix_id("sfx").unwrap();
        assert_eq!(mixer.submix_id("master"), Some(SubmixId::MASTER));

        let voice = mixer
            .create_voice(VoiceParams::new(1, 48000).with_submix(sfx))
            .unwrap();
        voice.play(&mut mixer).unwrap();

        let gain = EffectConfig::new(EffectKind::Gain);
        assert_eq!(mixer.add_submix_effect(sfx, &gain).unwrap(), 0);
        mixer.set_submix_effect_param(sfx, 0, 0, 0.25).unwrap();
        mixer.set_submix_effect_bypass(sfx, 0, true).unwrap();
        assert!(mixer.set_submix_effect_param(sfx, 1, 0, 0.25).is_err());
        mixer.set_submix_wet_level(sfx, 0.5).unwrap();
        mixer.update();
        render(&mut engine, 4);

        assert_eq!(engine.graph().effect_names(sfx), vec!["Gain"]);
        assert_eq!(engine.graph().sources(sfx), &[voice.id()]);

        voice.set_submix(&mut mixer, SubmixId::MASTER).unwrap();
        mixer.remove_submix_effect(sfx, 0).unwrap();
        mixer.update();
        render(&mut engine, 4);

        assert!(engine.graph().sources(sfx).is_empty());
        assert_eq!(engine.graph().sources(SubmixId::MASTER), &[voice.id()]);
        assert_eq!(engine.graph().effect_count(sfx), 0);
        assert_eq!(mixer.submix_effect_count(sfx), Some(0));

        mixer.release_voice(voice).unwrap();
        mixer.update();
        render(&mut engine, 4);
        assert!(engine.graph().sources(SubmixId::MASTER).is_empty());
    }

    #[test]
    fn test_full_queue_holds_batch() {
        let (mut mixer, mut engine) = create_mixer(&config(1)).unwrap();
        let voice = mixer.create_voice(VoiceParams::new(1, 48000)).unwrap();
        mixer.update();

        // Fill the queue without letting the engine drain it
        for _ in 0..COMMAND_QUEUE_CAPACITY - 1 {
            voice.set_volume(&mut mixer, 0.5).unwrap();
        }
        assert_eq!(mixer.update(), COMMAND_QUEUE_CAPACITY - 1);

        voice.set_volume(&mut mixer, 0.1).unwrap();
        voice.play(&mut mixer).unwrap();
        assert_eq!(mixer.update(), 0);
        assert_eq!(mixer.pending_commands(), 2);

        render(&mut engine, 4);
        assert_eq!(mixer.update(), 2);
    }

    #[test]
    fn test_invalid_config() {
        let mut cfg = config(1);
        cfg.max_block_frames = 0;
        assert!(matches!(create_mixer(&cfg), Err(MixerError::InvalidConfig(_))));

        let mut cfg = config(1);
        cfg.submixes = vec![SubmixConfig {
            name: "a".to_string(),
            parent: Some("missing".to_string()),
            wet_level: 0.0,
            effects: Vec::new(),
        }];
        assert!(matches!(create_mixer(&cfg), Err(MixerError::Submix(_))));
    }
}
