//! Configuration
//!
//! - Generic YAML config loading/saving
//! - Default config locations
//! - The mixer configuration itself
//!
//! # Usage
//!
//! ```ignore
//! use cadence_core::config::{default_config_path, load_config, MixerConfig};
//!
//! let config: MixerConfig = load_config(&default_config_path("mixer.yaml"));
//! ```

mod io;
mod mixer;
mod paths;

pub use io::{load_config, save_config};
pub use mixer::{
    MixerConfig, SubmixConfig, DEFAULT_MAX_BLOCK_FRAMES, DEFAULT_MAX_SOURCES,
    DEFAULT_QUEUED_BUFFERS,
};
pub use paths::{default_config_dir, default_config_path};
