//! Mixer engine
//!
//! Split into a game-side [`MixerController`] and a render-side
//! [`MixerEngine`] connected by a lock-free command queue. Heap data crossing
//! the queue is reclaimed by the deferred-drop collector in [`gc`].

mod command;
mod controller;
mod engine;
mod error;
pub mod gc;

pub use command::{command_channel, MixerCommand, COMMAND_QUEUE_CAPACITY};
pub use controller::{create_mixer, MixerController};
pub use engine::MixerEngine;
pub use error::{MixerError, MixerResult};
