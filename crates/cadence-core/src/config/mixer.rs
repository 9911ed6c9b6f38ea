//! Mixer configuration
//!
//! ```yaml
//! sample_rate: 48000
//! layout: [front_left, front_right]
//! max_sources: 64
//! ramp_ms: 33.0
//! max_block_frames: 256
//! queued_buffers: 3
//! submixes:
//!   - name: music
//!     wet_level: 0.2
//!     effects:
//!       - type: reverb
//!         params: { room size: 0.7 }
//!   - name: footsteps
//!     parent: sfx
//!   - name: sfx
//! output:
//!   block_frames: 512
//!   num_buffers: 3
//! ```
//!
//! Every field is optional; missing fields take their defaults.

use serde::{Deserialize, Serialize};

use crate::audio::OutputSettings;
use crate::dsp::DEFAULT_RAMP_MS;
use crate::effect::EffectConfig;
use crate::source::ChannelLayout;
use crate::types::DEFAULT_SAMPLE_RATE;

/// Default number of voice slots
pub const DEFAULT_MAX_SOURCES: usize = 64;

/// Default largest render block (frames)
pub const DEFAULT_MAX_BLOCK_FRAMES: usize = 256;

/// Default buffers kept in flight for streaming voices
pub const DEFAULT_QUEUED_BUFFERS: usize = 3;

/// Top-level mixer configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MixerConfig {
    /// Device sample rate in Hz
    pub sample_rate: u32,

    /// Output speakers; position in the list is the device channel
    pub layout: ChannelLayout,

    /// Number of voice slots
    pub max_sources: usize,

    /// Duration of parameter ramps in milliseconds
    pub ramp_ms: f32,

    /// Largest block rendered in one pass; device buffers are split into
    /// blocks of at most this many frames
    pub max_block_frames: usize,

    /// Buffers kept queued for decoder-driven voices
    pub queued_buffers: usize,

    /// Submixes below the master, in any order
    pub submixes: Vec<SubmixConfig>,

    pub output: OutputSettings,
}

impl Default for MixerConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            layout: ChannelLayout::default(),
            max_sources: DEFAULT_MAX_SOURCES,
            ramp_ms: DEFAULT_RAMP_MS,
            max_block_frames: DEFAULT_MAX_BLOCK_FRAMES,
            queued_buffers: DEFAULT_QUEUED_BUFFERS,
            submixes: Vec::new(),
            output: OutputSettings::default(),
        }
    }
}

impl MixerConfig {
    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    pub fn with_layout(mut self, layout: ChannelLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn with_max_sources(mut self, max_sources: usize) -> Self {
        self.max_sources = max_sources;
        self
    }

    pub fn with_submix(mut self, submix: SubmixConfig) -> Self {
        self.submixes.push(submix);
        self
    }
}

/// One submix below the master
///
/// A submix named `master` configures the master itself (effects only).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmixConfig {
    pub name: String,

    /// Parent submix name (None = master)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,

    /// Share of this submix's output sent to the parent's effect chain
    #[serde(default)]
    pub wet_level: f32,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub effects: Vec<EffectConfig>,
}

impl SubmixConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: None,
            wet_level: 0.0,
            effects: Vec::new(),
        }
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn with_wet_level(mut self, wet_level: f32) -> Self {
        self.wet_level = wet_level;
        self
    }

    pub fn with_effect(mut self, effect: EffectConfig) -> Self {
        self.effects.push(effect);
        self
    }
}
