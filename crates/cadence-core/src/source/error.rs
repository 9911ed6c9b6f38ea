//! Source voice error types

use thiserror::Error;

use crate::types::{SourceId, SubmixId};

/// Errors returned by the game-side voice API
///
/// The render thread never sees these: every request is validated before it
/// is queued.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    /// Every voice slot is in use
    #[error("no free voice slot (all {capacity} in use)")]
    NoFreeSlot { capacity: usize },

    /// The handle refers to a slot that has been released
    #[error("{id} is not an active voice")]
    SlotNotBusy { id: SourceId },

    #[error("unsupported channel count {channels} (expected 1..={max})")]
    InvalidChannelCount { channels: usize, max: usize },

    /// A submitted buffer does not match the voice's channel count
    #[error("{id} plays {expected}-channel audio, buffer has {actual} channels")]
    FormatMismatch {
        id: SourceId,
        expected: usize,
        actual: usize,
    },

    #[error("channel map for {id} needs {expected} gains, got {actual}")]
    ChannelMapSize {
        id: SourceId,
        expected: usize,
        actual: usize,
    },

    /// Too many buffers submitted but not yet consumed
    #[error("{id} already has {max} buffers queued")]
    QueueFull { id: SourceId, max: usize },

    #[error("{submix} does not exist")]
    UnknownSubmix { submix: SubmixId },

    /// Raw PCM bytes could not be interpreted
    #[error("invalid PCM data: {0}")]
    InvalidPcm(String),
}

/// Result type for source voice operations
pub type SourceResult<T> = Result<T, SourceError>;
