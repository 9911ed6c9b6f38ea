//! Submix graph error types

use thiserror::Error;

use crate::effect::EffectChainError;
use crate::types::SubmixId;

/// Errors raised while building or editing the submix graph
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmixError {
    #[error("submix '{name}' is defined more than once")]
    DuplicateName { name: String },

    #[error("submix '{name}' names unknown parent '{parent}'")]
    UnknownParent { name: String, parent: String },

    /// Following parents from this submix never reaches the master
    #[error("submix '{name}' is part of a cycle")]
    Cycle { name: String },

    #[error("the master submix cannot have a parent (got '{parent}')")]
    MasterHasParent { parent: String },

    #[error("submix '{name}' has {count} effects (max {max})")]
    TooManyEffects { name: String, count: usize, max: usize },

    #[error("{submix} does not exist")]
    UnknownSubmix { submix: SubmixId },

    #[error("{submix}: {source}")]
    Effect {
        submix: SubmixId,
        #[source]
        source: EffectChainError,
    },
}

/// Result type for submix operations
pub type SubmixResult<T> = Result<T, SubmixError>;
