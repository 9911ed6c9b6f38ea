//! Mixer construction errors

use thiserror::Error;

use crate::submix::SubmixError;

/// Errors returned by [`create_mixer`](super::create_mixer)
#[derive(Debug, Error)]
pub enum MixerError {
    /// A configuration value is out of range
    #[error("invalid mixer config: {0}")]
    InvalidConfig(String),

    /// The submix tree could not be built
    #[error(transparent)]
    Submix(#[from] SubmixError),
}

/// Result type for mixer construction
pub type MixerResult<T> = Result<T, MixerError>;
