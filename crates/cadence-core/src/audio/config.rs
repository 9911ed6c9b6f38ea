//! Output configuration
//!
//! [`OutputSettings`] is the serializable part stored in the mixer config;
//! [`OutputSpec`] is the fully resolved format handed to an output driver.

use serde::{Deserialize, Serialize};

use crate::types::{RenderFormat, MAX_BUFFER_SIZE};

/// Default device buffer size (frames)
pub const DEFAULT_BLOCK_FRAMES: usize = 512;

/// Default number of rotating output buffers
///
/// Two is the minimum for the render thread to fill one buffer while the
/// device plays the other; a third absorbs scheduling jitter.
pub const DEFAULT_NUM_BUFFERS: usize = 3;

/// Output settings from the configuration file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    /// Frames per output buffer
    pub block_frames: usize,

    /// Rotating buffers between render thread and device (at least 2)
    pub num_buffers: usize,

    /// Hardware device name (None = system default); used by the cpal adapter
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            block_frames: DEFAULT_BLOCK_FRAMES,
            num_buffers: DEFAULT_NUM_BUFFERS,
            device: None,
        }
    }
}

impl OutputSettings {
    pub fn with_block_frames(mut self, frames: usize) -> Self {
        self.block_frames = frames;
        self
    }

    pub fn with_num_buffers(mut self, count: usize) -> Self {
        self.num_buffers = count;
        self
    }

    pub fn with_device(mut self, name: impl Into<String>) -> Self {
        self.device = Some(name.into());
        self
    }

    /// Resolve against the mixer's render format
    pub fn spec(&self, format: &RenderFormat) -> OutputSpec {
        OutputSpec {
            sample_rate: format.sample_rate,
            num_channels: format.num_channels,
            block_frames: self.block_frames.clamp(1, MAX_BUFFER_SIZE),
            num_buffers: self.num_buffers.max(2),
        }
    }

    /// Latency added by the rotating buffers, in milliseconds
    pub fn latency_ms(&self, sample_rate: u32) -> f32 {
        (self.block_frames * self.num_buffers) as f32 / sample_rate as f32 * 1000.0
    }
}

/// Format of the interleaved `f32` buffers an output driver produces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputSpec {
    pub sample_rate: u32,
    pub num_channels: usize,
    /// Frames per buffer
    pub block_frames: usize,
    pub num_buffers: usize,
}

impl OutputSpec {
    /// Samples per buffer (all channels)
    pub fn buffer_len(&self) -> usize {
        self.block_frames * self.num_channels
    }
}
