//! Render-side mixer
//!
//! [`MixerEngine`] owns everything the render thread touches: the command
//! consumer, the [`SourceManager`] and the [`SubmixGraph`]. Once per device
//! buffer it applies the commands published since the last buffer, then
//! renders in blocks of at most `max_block_frames`.

use super::command::MixerCommand;
use crate::audio::AudioStreamCallback;
use crate::source::{SourceManager, Spatializer};
use crate::submix::{SubmixGraph, SubmixResult};
use crate::types::{AudioBuffer, RenderFormat, SourceId};

/// The render half of a mixer
///
/// Created together with its [`MixerController`](super::MixerController) by
/// [`create_mixer`](super::create_mixer). Move it to the render thread (or
/// hand it to an output driver) and never share it.
pub struct MixerEngine {
    commands: rtrb::Consumer<MixerCommand>,
    sources: SourceManager,
    graph: SubmixGraph,
    format: RenderFormat,
    frames_rendered: u64,
}

impl MixerEngine {
    pub(crate) fn new(
        commands: rtrb::Consumer<MixerCommand>,
        sources: SourceManager,
        graph: SubmixGraph,
    ) -> Self {
        let format = *sources.format();
        Self {
            commands,
            sources,
            graph,
            format,
            frames_rendered: 0,
        }
    }

    pub fn format(&self) -> &RenderFormat {
        &self.format
    }

    pub fn sources(&self) -> &SourceManager {
        &self.sources
    }

    pub fn graph(&self) -> &SubmixGraph {
        &self.graph
    }

    /// Total frames delivered since creation
    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }

    /// Replace the spatializer used by HRTF voices
    pub fn set_spatializer(&mut self, spatializer: Box<dyn Spatializer>) {
        self.sources.set_spatializer(spatializer);
    }

    /// Apply every command published so far, in order
    ///
    /// The number of waiting commands is read once up front; anything
    /// published meanwhile waits for the next call.
    pub fn process_commands(&mut self) -> usize {
        let count = self.commands.slots();
        if count == 0 {
            return 0;
        }
        let Ok(chunk) = self.commands.read_chunk(count) else {
            return 0;
        };
        for command in chunk {
            Self::execute(&mut self.sources, &mut self.graph, command);
        }
        count
    }

    fn execute(sources: &mut SourceManager, graph: &mut SubmixGraph, command: MixerCommand) {
        match command {
            // Voice lifecycle
            MixerCommand::InitSource { source, init } => {
                if !valid_source(sources, source) {
                    return;
                }
                let submix = graph.attach(source, init.submix);
                sources.init(source, init);
                sources.set_submix(source, submix);
            }
            MixerCommand::Play { source } => {
                if valid_source(sources, source) {
                    sources.play(source);
                }
            }
            MixerCommand::Pause { source } => {
                if valid_source(sources, source) {
                    sources.pause(source);
                }
            }
            MixerCommand::Stop { source } => {
                if valid_source(sources, source) {
                    sources.stop(source);
                }
            }
            MixerCommand::Release { source } => {
                if valid_source(sources, source) && sources.is_busy(source) {
                    graph.detach(source, sources.submix(source));
                    sources.release(source);
                }
            }

            // Voice parameters
            MixerCommand::SetVolume { source, volume } => {
                if valid_source(sources, source) {
                    sources.set_volume(source, volume);
                }
            }
            MixerCommand::SetPitch { source, pitch } => {
                if valid_source(sources, source) {
                    sources.set_pitch(source, pitch);
                }
            }
            MixerCommand::SetWetLevel { source, wet_level } => {
                if valid_source(sources, source) {
                    sources.set_wet_level(source, wet_level);
                }
            }
            MixerCommand::SetLowPassFrequency { source, frequency } => {
                if valid_source(sources, source) {
                    sources.set_lpf_frequency(source, frequency);
                }
            }
            MixerCommand::SetChannelMap { source, gains } => {
                if valid_source(sources, source) {
                    sources.set_channel_map(source, &gains);
                }
            }
            MixerCommand::SetSpatialization { source, params } => {
                if valid_source(sources, source) {
                    sources.set_spatialization(source, params);
                }
            }
            MixerCommand::SetSubmix { source, submix } => {
                if valid_source(sources, source) && sources.is_busy(source) {
                    graph.detach(source, sources.submix(source));
                    let submix = graph.attach(source, submix);
                    sources.set_submix(source, submix);
                }
            }

            // Voice data
            MixerCommand::SubmitBuffer { source, buffer } => {
                if valid_source(sources, source) {
                    sources.submit_buffer(source, buffer);
                }
            }

            // Submixes
            MixerCommand::SetSubmixWetLevel { submix, wet_level } => {
                check(graph.set_wet_level(submix, wet_level));
            }
            MixerCommand::AddSubmixEffect { submix, effect } => {
                check(graph.add_effect(submix, effect));
            }
            MixerCommand::RemoveSubmixEffect { submix, index } => {
                // Dropped here, freed by the collector thread
                check(graph.remove_effect(submix, index));
            }
            MixerCommand::SetSubmixEffectParam {
                submix,
                index,
                param,
                value,
            } => {
                check(graph.set_effect_param(submix, index, param, value));
            }
            MixerCommand::SetSubmixEffectBypass {
                submix,
                index,
                bypass,
            } => {
                check(graph.set_effect_bypass(submix, index, bypass));
            }
        }
    }

    /// Render one block of at most `max_block_frames` into the master output
    pub fn render_block(&mut self, num_frames: usize) -> &AudioBuffer {
        let num_frames = num_frames.min(self.format.max_block_frames);
        self.sources.render(num_frames);
        self.graph.process(&self.sources, num_frames);
        self.frames_rendered += num_frames as u64;
        self.graph.output()
    }
}

impl AudioStreamCallback for MixerEngine {
    fn on_process_audio_stream(&mut self, output: &mut [f32]) {
        self.process_commands();

        let num_channels = self.format.num_channels;
        let block_len = self.format.max_block_frames * num_channels;
        for chunk in output.chunks_mut(block_len) {
            let num_frames = chunk.len() / num_channels;
            let rendered = self.render_block(num_frames).as_slice();
            let (head, tail) = chunk.split_at_mut(rendered.len());
            head.copy_from_slice(rendered);
            // Partial trailing frame
            tail.fill(0.0);
        }
    }
}

/// The controller never sends out-of-range ids; guard the indexing anyway
#[inline]
fn valid_source(sources: &SourceManager, source: SourceId) -> bool {
    let valid = source.index() < sources.max_sources();
    debug_assert!(valid, "{} out of range", source);
    valid
}

/// Submix edits are validated on the game thread; a failure here is a bug
#[inline]
fn check<T>(result: SubmixResult<T>) {
    debug_assert!(result.is_ok(), "submix command failed");
}
