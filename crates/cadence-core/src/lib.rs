//! Cadence Core - real-time source voice mixer

pub mod audio;
pub mod config;
pub mod types;
pub mod dsp;
pub mod effect;
pub mod source;
pub mod submix;
pub mod engine;

pub use types::*;
