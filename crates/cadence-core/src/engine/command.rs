//! Command queue between the game thread and the render thread
//!
//! The game thread stages [`MixerCommand`]s through the
//! [`MixerController`](super::MixerController) and publishes them in one
//! chunk per `update()`. The render thread, at the start of every block,
//! snapshots how many commands are waiting and executes exactly those, in
//! order. A published batch is therefore applied within a single block and
//! never split across two.
//!
//! The queue is an `rtrb` single-producer single-consumer ring buffer:
//! allocated once, wait-free on both ends. Heap payloads travel as
//! `basedrop` pointers so the render thread can drop them without freeing.

use basedrop::{Owned, Shared};

use crate::effect::EffectSlot;
use crate::source::{PcmBuffer, SourceInit, SpatializationParams};
use crate::types::{SourceId, SubmixId};

/// Commands executed by the render thread
pub enum MixerCommand {
    // ─────────────────────────────────────────────────────────────
    // Voice lifecycle
    // ─────────────────────────────────────────────────────────────
    /// Bring a free slot to life
    InitSource {
        source: SourceId,
        init: Owned<SourceInit>,
    },
    Play { source: SourceId },
    Pause { source: SourceId },
    /// Stop playback and drop queued buffers (slot stays allocated)
    Stop { source: SourceId },
    /// Return the slot to the free pool
    Release { source: SourceId },

    // ─────────────────────────────────────────────────────────────
    // Voice parameters (ramped on the render thread)
    // ─────────────────────────────────────────────────────────────
    SetVolume { source: SourceId, volume: f32 },
    /// Effective pitch, already scaled by source/device rate
    SetPitch { source: SourceId, pitch: f32 },
    SetWetLevel { source: SourceId, wet_level: f32 },
    /// Cutoff in Hz
    SetLowPassFrequency { source: SourceId, frequency: f32 },
    SetChannelMap {
        source: SourceId,
        gains: Owned<Vec<f32>>,
    },
    SetSpatialization {
        source: SourceId,
        params: SpatializationParams,
    },
    SetSubmix { source: SourceId, submix: SubmixId },

    // ─────────────────────────────────────────────────────────────
    // Voice data
    // ─────────────────────────────────────────────────────────────
    SubmitBuffer {
        source: SourceId,
        buffer: Shared<PcmBuffer>,
    },

    // ─────────────────────────────────────────────────────────────
    // Submixes
    // ─────────────────────────────────────────────────────────────
    SetSubmixWetLevel { submix: SubmixId, wet_level: f32 },
    AddSubmixEffect {
        submix: SubmixId,
        effect: EffectSlot,
    },
    RemoveSubmixEffect { submix: SubmixId, index: usize },
    /// Normalized parameter value
    SetSubmixEffectParam {
        submix: SubmixId,
        index: usize,
        param: usize,
        value: f32,
    },
    SetSubmixEffectBypass {
        submix: SubmixId,
        index: usize,
        bypass: bool,
    },
}

impl MixerCommand {
    /// Short name for log messages
    pub fn name(&self) -> &'static str {
        match self {
            MixerCommand::InitSource { .. } => "InitSource",
            MixerCommand::Play { .. } => "Play",
            MixerCommand::Pause { .. } => "Pause",
            MixerCommand::Stop { .. } => "Stop",
            MixerCommand::Release { .. } => "Release",
            MixerCommand::SetVolume { .. } => "SetVolume",
            MixerCommand::SetPitch { .. } => "SetPitch",
            MixerCommand::SetWetLevel { .. } => "SetWetLevel",
            MixerCommand::SetLowPassFrequency { .. } => "SetLowPassFrequency",
            MixerCommand::SetChannelMap { .. } => "SetChannelMap",
            MixerCommand::SetSpatialization { .. } => "SetSpatialization",
            MixerCommand::SetSubmix { .. } => "SetSubmix",
            MixerCommand::SubmitBuffer { .. } => "SubmitBuffer",
            MixerCommand::SetSubmixWetLevel { .. } => "SetSubmixWetLevel",
            MixerCommand::AddSubmixEffect { .. } => "AddSubmixEffect",
            MixerCommand::RemoveSubmixEffect { .. } => "RemoveSubmixEffect",
            MixerCommand::SetSubmixEffectParam { .. } => "SetSubmixEffectParam",
            MixerCommand::SetSubmixEffectBypass { .. } => "SetSubmixEffectBypass",
        }
    }
}

/// Capacity of the command queue
///
/// Creating a voice with a full decode queue costs an init, a play and up to
/// [`MAX_QUEUED_BUFFERS`](crate::source::MAX_QUEUED_BUFFERS) submits, so a
/// burst of voice starts in one update fits comfortably.
pub const COMMAND_QUEUE_CAPACITY: usize = 1024;

/// Create a new command channel (producer/consumer pair)
///
/// The producer belongs to the game thread, the consumer to the render
/// thread.
pub fn command_channel(
    capacity: usize,
) -> (rtrb::Producer<MixerCommand>, rtrb::Consumer<MixerCommand>) {
    rtrb::RingBuffer::new(capacity)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_channel_fifo() {
        let (mut tx, mut rx) = command_channel(COMMAND_QUEUE_CAPACITY);

        assert!(tx.push(MixerCommand::Play { source: SourceId(3) }).is_ok());
        assert!(tx
            .push(MixerCommand::SetVolume {
                source: SourceId(3),
                volume: 0.5,
            })
            .is_ok());

        assert!(matches!(
            rx.pop().unwrap(),
            MixerCommand::Play { source: SourceId(3) }
        ));
        let second = rx.pop().unwrap();
        assert_eq!(second.name(), "SetVolume");
        assert!(rx.pop().is_err());
    }

    #[test]
    fn test_chunk_is_all_or_nothing() {
        let (mut tx, rx) = command_channel(4);
        let mut batch: Vec<_> = (0..5).map(|i| MixerCommand::Play { source: SourceId(i) }).collect();

        assert!(tx.write_chunk_uninit(batch.len()).is_err());
        assert_eq!(rx.slots(), 0);

        batch.truncate(4);
        let written = tx
            .write_chunk_uninit(batch.len())
            .map(|chunk| chunk.fill_from_iter(batch.drain(..)))
            .unwrap_or(0);
        assert_eq!(written, 4);
        assert_eq!(rx.slots(), 4);
    }

    #[test]
    fn test_command_size() {
        // Largest payload is SetSubmixEffectParam (submix + index + param + f32)
        let size = std::mem::size_of::<MixerCommand>();
        assert!(size <= 40, "MixerCommand is {} bytes, expected <= 40", size);
    }
}
