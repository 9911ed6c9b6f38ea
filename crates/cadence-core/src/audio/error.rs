//! Audio output error types

use thiserror::Error;

/// Errors that can occur while starting or running an output
#[derive(Error, Debug)]
pub enum AudioError {
    /// The output spec cannot be honoured
    #[error("Invalid output configuration: {0}")]
    InvalidSpec(String),

    /// Failed to spawn the render thread
    #[error("Failed to spawn render thread: {0}")]
    ThreadSpawn(String),

    /// The render thread has stopped; no more audio will arrive
    #[error("Output stream closed")]
    StreamClosed,

    /// The render thread panicked
    #[error("Render thread panicked")]
    RenderThreadPanicked,

    /// No audio devices available
    #[error("No audio output devices found")]
    NoDevices,

    /// Device not found
    #[error("Audio device not found: {0}")]
    DeviceNotFound(String),

    /// Failed to get device configuration
    #[error("Failed to get device config: {0}")]
    ConfigError(String),

    /// Failed to build audio stream
    #[error("Failed to build audio stream: {0}")]
    StreamBuildError(String),

    /// Failed to start/play stream
    #[error("Failed to start audio stream: {0}")]
    StreamPlayError(String),

    /// Device rate differs from the mixer rate
    #[error("Sample rate mismatch: mixer={mixer}Hz, device={device}Hz")]
    SampleRateMismatch { mixer: u32, device: u32 },
}

/// Result type for audio operations
pub type AudioResult<T> = Result<T, AudioError>;
