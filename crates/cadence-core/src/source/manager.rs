//! Render-side voice pool
//!
//! The [`SourceManager`] owns every voice slot in structure-of-arrays form.
//! It is driven exclusively from the render thread: commands arrive through
//! the engine's command queue, then once per block [`SourceManager::render`]
//! resamples, filters and channel-maps every playing voice into its private
//! dry/wet buffers, which the submix graph collects through
//! [`SourceManager::mix_output_buffers`].
//!
//! Slot lifecycle: `Free → Initializing → Playing ⇄ Paused → Done → Free`.
//! Nothing here allocates after construction; queued PCM and init payloads
//! are `basedrop` pointers, so dropping them only enqueues work for the
//! collector thread.

use std::collections::VecDeque;
use std::f32::consts::FRAC_1_SQRT_2;
use std::sync::atomic::Ordering;

use basedrop::{Owned, Shared};

use super::atomics::SourceAtomics;
use super::pcm::PcmBuffer;
use super::spatial::{SpatializationParams, Spatializer};
use crate::dsp::{constant_power_gains, lerp, InterpolatedParam, OnePoleLowPass};
use crate::types::{AudioBuffer, RenderFormat, SourceId, SubmixId, MAX_INPUT_CHANNELS};

/// Buffers a voice can hold queued before the render-side queue would grow
pub const MAX_QUEUED_BUFFERS: usize = 16;

/// Channels a spatialized voice produces
const HRTF_CHANNELS: usize = 2;

/// Everything the render thread needs to bring a slot to life
pub struct SourceInit {
    pub num_channels: usize,
    pub submix: SubmixId,
    /// Only honoured for mono voices
    pub use_hrtf: bool,
    pub volume: f32,
    /// Effective pitch (already scaled by source/device rate)
    pub pitch: f32,
    pub wet_level: f32,
    /// Low-pass cutoff in Hz
    pub lpf_frequency: f32,
    pub spatialization: SpatializationParams,
    /// Row-major `input × output` gains
    pub channel_map: Vec<f32>,
    pub atomics: Shared<SourceAtomics>,
}

/// Pool of voice slots (structure of arrays, indexed by `SourceId`)
pub struct SourceManager {
    format: RenderFormat,

    // ─────────────────────────────────────────────────────────────
    // Slot state
    // ─────────────────────────────────────────────────────────────
    busy: Vec<bool>,
    playing: Vec<bool>,
    paused: Vec<bool>,
    done: Vec<bool>,
    num_input_channels: Vec<usize>,
    use_hrtf: Vec<bool>,
    submix: Vec<SubmixId>,
    spatialization: Vec<SpatializationParams>,
    atomics: Vec<Option<Shared<SourceAtomics>>>,

    // ─────────────────────────────────────────────────────────────
    // Ramped parameters and filters
    // ─────────────────────────────────────────────────────────────
    volume: Vec<InterpolatedParam>,
    pitch: Vec<InterpolatedParam>,
    wet_level: Vec<InterpolatedParam>,
    lpf_frequency: Vec<InterpolatedParam>,
    low_pass: Vec<[OnePoleLowPass; MAX_INPUT_CHANNELS]>,
    channel_map: Vec<Vec<InterpolatedParam>>,

    // ─────────────────────────────────────────────────────────────
    // Read cursor
    // ─────────────────────────────────────────────────────────────
    queue: Vec<VecDeque<Shared<PcmBuffer>>>,
    current_buffer: Vec<Option<Shared<PcmBuffer>>>,
    frame_index: Vec<usize>,
    frame_alpha: Vec<f32>,
    current_frame: Vec<[f32; MAX_INPUT_CHANNELS]>,
    next_frame: Vec<[f32; MAX_INPUT_CHANNELS]>,
    has_frame: Vec<bool>,
    frames_played: Vec<u64>,

    // ─────────────────────────────────────────────────────────────
    // Output
    // ─────────────────────────────────────────────────────────────
    dry: Vec<AudioBuffer>,
    wet: Vec<AudioBuffer>,
    /// Resampled source audio of the voice being rendered
    source_scratch: AudioBuffer,
    /// Spatializer output of the voice being rendered
    post_scratch: AudioBuffer,

    spatializer: Option<Box<dyn Spatializer>>,
}

impl SourceManager {
    /// Allocate `max_sources` slots sized for `format`
    pub fn new(format: RenderFormat, max_sources: usize, ramp_frames: u32) -> Self {
        let num_out = format.num_channels;
        let block = format.max_block_frames;
        let param = InterpolatedParam::new(ramp_frames);

        Self {
            format,
            busy: vec![false; max_sources],
            playing: vec![false; max_sources],
            paused: vec![false; max_sources],
            done: vec![false; max_sources],
            num_input_channels: vec![1; max_sources],
            use_hrtf: vec![false; max_sources],
            submix: vec![SubmixId::MASTER; max_sources],
            spatialization: vec![SpatializationParams::default(); max_sources],
            atomics: (0..max_sources).map(|_| None).collect(),
            volume: vec![param; max_sources],
            pitch: vec![param; max_sources],
            wet_level: vec![param; max_sources],
            lpf_frequency: vec![param; max_sources],
            low_pass: vec![[OnePoleLowPass::default(); MAX_INPUT_CHANNELS]; max_sources],
            channel_map: (0..max_sources)
                .map(|_| vec![param; MAX_INPUT_CHANNELS * num_out])
                .collect(),
            queue: (0..max_sources)
                .map(|_| VecDeque::with_capacity(MAX_QUEUED_BUFFERS))
                .collect(),
            current_buffer: (0..max_sources).map(|_| None).collect(),
            frame_index: vec![0; max_sources],
            frame_alpha: vec![0.0; max_sources],
            current_frame: vec![[0.0; MAX_INPUT_CHANNELS]; max_sources],
            next_frame: vec![[0.0; MAX_INPUT_CHANNELS]; max_sources],
            has_frame: vec![false; max_sources],
            frames_played: vec![0; max_sources],
            dry: (0..max_sources)
                .map(|_| AudioBuffer::with_capacity(num_out, block))
                .collect(),
            wet: (0..max_sources)
                .map(|_| AudioBuffer::with_capacity(num_out, block))
                .collect(),
            source_scratch: AudioBuffer::with_capacity(MAX_INPUT_CHANNELS, block),
            post_scratch: AudioBuffer::with_capacity(HRTF_CHANNELS, block),
            spatializer: None,
        }
    }

    /// Install the spatializer used by HRTF voices
    pub fn set_spatializer(&mut self, spatializer: Box<dyn Spatializer>) {
        self.spatializer = Some(spatializer);
    }

    pub fn format(&self) -> &RenderFormat {
        &self.format
    }

    pub fn max_sources(&self) -> usize {
        self.busy.len()
    }

    #[inline]
    pub fn is_busy(&self, id: SourceId) -> bool {
        self.busy.get(id.index()).copied().unwrap_or(false)
    }

    #[inline]
    pub fn is_done(&self, id: SourceId) -> bool {
        self.done.get(id.index()).copied().unwrap_or(false)
    }

    pub fn submix(&self, id: SourceId) -> SubmixId {
        self.submix[id.index()]
    }

    pub fn frames_played(&self, id: SourceId) -> u64 {
        self.frames_played[id.index()]
    }

    // ─────────────────────────────────────────────────────────────
    // Command handlers
    // ─────────────────────────────────────────────────────────────

    /// Bring a free slot into the `Initializing` state
    pub fn init(&mut self, id: SourceId, init: Owned<SourceInit>) {
        let index = id.index();
        debug_assert!(!self.busy[index], "{} initialized while busy", id);
        debug_assert!((1..=MAX_INPUT_CHANNELS).contains(&init.num_channels));

        let num_channels = init.num_channels.clamp(1, MAX_INPUT_CHANNELS);
        let use_hrtf = init.use_hrtf && num_channels == 1;

        self.busy[index] = true;
        self.playing[index] = false;
        self.paused[index] = false;
        self.done[index] = false;
        self.num_input_channels[index] = num_channels;
        self.use_hrtf[index] = use_hrtf;
        self.submix[index] = init.submix;
        self.spatialization[index] = init.spatialization;

        reset_to(&mut self.volume[index], init.volume);
        reset_to(&mut self.pitch[index], init.pitch);
        reset_to(&mut self.wet_level[index], init.wet_level);
        reset_to(&mut self.lpf_frequency[index], init.lpf_frequency);
        for filter in self.low_pass[index].iter_mut() {
            filter.reset();
            filter.set_frequency(1.0);
        }

        let map = &mut self.channel_map[index];
        for (i, param) in map.iter_mut().enumerate() {
            reset_to(param, init.channel_map.get(i).copied().unwrap_or(0.0));
        }

        self.queue[index].clear();
        self.current_buffer[index] = None;
        self.frame_index[index] = 0;
        self.frame_alpha[index] = 0.0;
        self.has_frame[index] = false;
        self.frames_played[index] = 0;
        self.atomics[index] = Some(init.atomics.clone());

        if use_hrtf {
            if let Some(spatializer) = self.spatializer.as_mut() {
                spatializer.update_source(id, &init.spatialization);
            }
        }
    }

    pub fn play(&mut self, id: SourceId) {
        let index = id.index();
        if !self.busy[index] {
            return;
        }
        self.playing[index] = true;
        self.paused[index] = false;
        self.publish_state(index);
    }

    pub fn pause(&mut self, id: SourceId) {
        let index = id.index();
        if !self.busy[index] {
            return;
        }
        self.paused[index] = true;
        self.publish_state(index);
    }

    /// Stop playback and drop queued data; the slot stays busy until released
    pub fn stop(&mut self, id: SourceId) {
        let index = id.index();
        if !self.busy[index] {
            return;
        }
        self.playing[index] = false;
        self.paused[index] = false;
        self.clear_data(index);
        self.mark_done(index);
    }

    /// Return the slot to `Free`
    pub fn release(&mut self, id: SourceId) {
        let index = id.index();
        if !self.busy[index] {
            return;
        }
        self.playing[index] = false;
        self.paused[index] = false;
        self.clear_data(index);
        self.mark_done(index);
        self.busy[index] = false;
        self.atomics[index] = None;

        if let Some(spatializer) = self.spatializer.as_mut() {
            spatializer.release_source(id);
        }
    }

    pub fn set_volume(&mut self, id: SourceId, volume: f32) {
        self.volume[id.index()].set_value(volume);
    }

    pub fn set_pitch(&mut self, id: SourceId, pitch: f32) {
        self.pitch[id.index()].set_value(pitch);
    }

    pub fn set_wet_level(&mut self, id: SourceId, wet_level: f32) {
        self.wet_level[id.index()].set_value(wet_level.clamp(0.0, 1.0));
    }

    /// Cutoff in Hz; at or above Nyquist the filter is fully open
    pub fn set_lpf_frequency(&mut self, id: SourceId, frequency: f32) {
        self.lpf_frequency[id.index()].set_value(frequency);
    }

    /// Ramp every channel-map gain towards `gains`
    pub fn set_channel_map(&mut self, id: SourceId, gains: &[f32]) {
        let index = id.index();
        debug_assert_eq!(gains.len(), self.map_len(index));
        for (param, &gain) in self.channel_map[index].iter_mut().zip(gains) {
            param.set_value(gain);
        }
    }

    pub fn set_spatialization(&mut self, id: SourceId, params: SpatializationParams) {
        let index = id.index();
        self.spatialization[index] = params;
        if self.use_hrtf[index] {
            if let Some(spatializer) = self.spatializer.as_mut() {
                spatializer.update_source(id, &params);
            }
        }
    }

    /// Record the owning submix (the graph keeps the back-reference)
    pub fn set_submix(&mut self, id: SourceId, submix: SubmixId) {
        self.submix[id.index()] = submix;
    }

    /// Append a buffer to the voice's queue
    pub fn submit_buffer(&mut self, id: SourceId, buffer: Shared<PcmBuffer>) {
        let index = id.index();
        debug_assert!(self.busy[index], "buffer submitted to free {}", id);
        debug_assert_eq!(buffer.num_channels(), self.num_input_channels[index]);
        if !self.busy[index] || buffer.num_channels() != self.num_input_channels[index] {
            return;
        }
        debug_assert!(self.queue[index].len() < MAX_QUEUED_BUFFERS);
        if self.queue[index].len() >= MAX_QUEUED_BUFFERS {
            // Pushing would grow the deque on the render thread
            return;
        }
        self.queue[index].push_back(buffer);
    }

    // ─────────────────────────────────────────────────────────────
    // Rendering
    // ─────────────────────────────────────────────────────────────

    /// Render `num_frames` frames for every slot into its dry/wet buffers
    pub fn render(&mut self, num_frames: usize) {
        debug_assert!(num_frames <= self.format.max_block_frames);

        for index in 0..self.busy.len() {
            self.dry[index].set_num_frames(num_frames);
            self.dry[index].fill_silence();
            self.wet[index].set_num_frames(num_frames);
            self.wet[index].fill_silence();

            if !self.busy[index] || !self.playing[index] || self.paused[index] || self.done[index] {
                continue;
            }

            // Frames after the voice runs dry stay exactly zero
            let produced = self.generate_source_audio(index, num_frames);
            if produced > 0 {
                self.apply_source_effects(index, produced);
                self.apply_channel_map(index, produced);
            }

            if let Some(atomics) = &self.atomics[index] {
                atomics
                    .frames_played
                    .store(self.frames_played[index], Ordering::Relaxed);
            }
        }
    }

    /// Add a voice's last rendered block into submix accumulators
    pub fn mix_output_buffers(&self, id: SourceId, dry: &mut AudioBuffer, wet: &mut AudioBuffer) {
        let index = id.index();
        if !self.busy[index] {
            return;
        }
        dry.add_buffer(&self.dry[index]);
        wet.add_buffer(&self.wet[index]);
    }

    /// Resample the queued PCM into `source_scratch`
    ///
    /// Returns the number of frames produced; fewer than `num_frames` when
    /// the voice ran out of data, and `source_scratch` is cut to that length.
    fn generate_source_audio(&mut self, index: usize, num_frames: usize) -> usize {
        let num_channels = self.num_input_channels[index];
        self.source_scratch.reshape(num_channels, num_frames);

        for frame in 0..num_frames {
            let mut read = !self.has_frame[index];
            while self.frame_alpha[index] >= 1.0 {
                self.frame_index[index] += 1;
                self.frame_alpha[index] -= 1.0;
                read = true;
            }
            if read {
                self.read_source_frame(index);
            }
            if self.done[index] {
                self.source_scratch.set_num_frames(frame);
                return frame;
            }

            let alpha = self.frame_alpha[index];
            let current = &self.current_frame[index];
            let next = &self.next_frame[index];
            for (ch, sample) in self.source_scratch.frame_mut(frame).iter_mut().enumerate() {
                *sample = lerp(current[ch], next[ch], alpha);
            }

            self.frames_played[index] += 1;
            self.frame_alpha[index] += self.pitch[index].next_value();
        }
        num_frames
    }

    /// Load current/next frame values for the cursor, advancing buffers as needed
    fn read_source_frame(&mut self, index: usize) {
        let num_channels = self.num_input_channels[index];

        loop {
            if self.current_buffer[index].is_none() {
                match self.queue[index].pop_front() {
                    Some(buffer) => self.current_buffer[index] = Some(buffer),
                    None => {
                        self.mark_done(index);
                        return;
                    }
                }
            }

            let Some(buffer) = self.current_buffer[index].as_ref() else {
                return;
            };
            let num_frames = buffer.num_frames();
            let looping = buffer.is_looping() && num_frames > 0;

            if self.frame_index[index] >= num_frames {
                if looping {
                    self.frame_index[index] %= num_frames;
                    self.notify_loop_completed(index);
                } else {
                    self.frame_index[index] -= num_frames;
                    self.current_buffer[index] = None;
                    self.notify_buffers_consumed(index, 1);
                }
                continue;
            }

            let Some(buffer) = self.current_buffer[index].as_ref() else {
                return;
            };
            let frame_index = self.frame_index[index];
            buffer.read_frame(frame_index, &mut self.current_frame[index][..num_channels]);

            let next = &mut self.next_frame[index][..num_channels];
            if frame_index + 1 < num_frames {
                buffer.read_frame(frame_index + 1, next);
            } else if looping {
                buffer.read_frame(0, next);
            } else if let Some(front) = self.queue[index].front().filter(|b| b.num_frames() > 0) {
                front.read_frame(0, next);
            } else {
                // End of data: hold the last value rather than read past it
                next.copy_from_slice(&self.current_frame[index][..num_channels]);
            }

            self.has_frame[index] = true;
            return;
        }
    }

    /// Low-pass, volume and optional spatialization
    fn apply_source_effects(&mut self, index: usize, num_frames: usize) {
        let nyquist = self.format.nyquist();

        for frame in self.source_scratch.frames_mut() {
            let cutoff = self.lpf_frequency[index].next_value() / nyquist;
            let volume = self.volume[index].next_value();
            for (sample, filter) in frame.iter_mut().zip(self.low_pass[index].iter_mut()) {
                filter.set_frequency(cutoff);
                *sample = filter.process(*sample) * volume;
            }
        }

        if !self.use_hrtf[index] {
            return;
        }

        self.post_scratch.reshape(HRTF_CHANNELS, num_frames);
        let spatialized = match self.spatializer.as_mut() {
            Some(spatializer) => spatializer.process(
                SourceId(index),
                self.source_scratch.as_slice(),
                self.post_scratch.as_mut_slice(),
            ),
            None => false,
        };
        if !spatialized {
            // Unspatialized fallback: plain -3dB mono image
            for (out, &mono) in self
                .post_scratch
                .frames_mut()
                .zip(self.source_scratch.as_slice())
            {
                out[0] = mono * FRAC_1_SQRT_2;
                out[1] = mono * FRAC_1_SQRT_2;
            }
        }
    }

    /// Channel-map into the dry/wet buffers with constant-power wet split
    fn apply_channel_map(&mut self, index: usize, num_frames: usize) {
        let num_out = self.format.num_channels;
        let input = if self.use_hrtf[index] {
            &self.post_scratch
        } else {
            &self.source_scratch
        };
        let map = &mut self.channel_map[index];
        let dry = &mut self.dry[index];
        let wet = &mut self.wet[index];

        for frame in 0..num_frames {
            let (dry_gain, wet_gain) = constant_power_gains(self.wet_level[index].next_value());
            let in_frame = input.frame(frame);

            for out in 0..num_out {
                let mut sum = 0.0;
                for (ch, &sample) in in_frame.iter().enumerate() {
                    sum += sample * map[ch * num_out + out].next_value();
                }
                dry.frame_mut(frame)[out] = sum * dry_gain;
                wet.frame_mut(frame)[out] = sum * wet_gain;
            }
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Helpers
    // ─────────────────────────────────────────────────────────────

    /// Number of channel-map gains the slot expects
    pub fn map_len(&self, index: usize) -> usize {
        let inputs = if self.use_hrtf[index] {
            HRTF_CHANNELS
        } else {
            self.num_input_channels[index]
        };
        inputs * self.format.num_channels
    }

    fn notify_buffers_consumed(&self, index: usize, count: u64) {
        if let Some(atomics) = &self.atomics[index] {
            atomics.buffers_consumed.fetch_add(count, Ordering::Relaxed);
        }
    }

    fn notify_loop_completed(&self, index: usize) {
        if let Some(atomics) = &self.atomics[index] {
            atomics.loops_completed.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Drop queued data; discarded buffers count as consumed
    fn clear_data(&mut self, index: usize) {
        let discarded = self.queue[index].len() + usize::from(self.current_buffer[index].is_some());
        self.queue[index].clear();
        self.current_buffer[index] = None;
        self.has_frame[index] = false;
        if discarded > 0 {
            self.notify_buffers_consumed(index, discarded as u64);
        }
    }

    fn mark_done(&mut self, index: usize) {
        self.done[index] = true;
        self.has_frame[index] = false;
        self.publish_state(index);
    }

    fn publish_state(&self, index: usize) {
        if let Some(atomics) = &self.atomics[index] {
            let playing = self.playing[index] && !self.paused[index] && !self.done[index];
            atomics.playing.store(playing, Ordering::Relaxed);
            atomics.done.store(self.done[index], Ordering::Relaxed);
            atomics
                .frames_played
                .store(self.frames_played[index], Ordering::Relaxed);
        }
    }
}

/// Forget a parameter's history and snap it to `value`
#[inline]
fn reset_to(param: &mut InterpolatedParam, value: f32) {
    param.reset();
    param.set_value(value);
}
