//! Lock-free per-voice state readable from the game thread

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Playback counters published by the render thread
///
/// A fresh instance is created for every voice, so a handle to a released
/// voice can never observe the next voice that reuses its slot.
///
/// All operations use `Ordering::Relaxed`; readers only need eventual
/// visibility of each counter on its own.
#[derive(Debug, Default)]
pub struct SourceAtomics {
    /// Frames rendered since the voice started
    pub frames_played: AtomicU64,
    /// PCM buffers that left the queue (played out, or discarded by stop)
    pub buffers_consumed: AtomicU64,
    /// Times a looping buffer wrapped back to its start
    pub loops_completed: AtomicU64,
    /// Playing and not paused
    pub playing: AtomicBool,
    /// Ran out of data or was stopped
    pub done: AtomicBool,
}

impl SourceAtomics {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn frames_played(&self) -> u64 {
        self.frames_played.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn buffers_consumed(&self) -> u64 {
        self.buffers_consumed.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn loops_completed(&self) -> u64 {
        self.loops_completed.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn is_playing(&self) -> bool {
        self.playing.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn is_done(&self) -> bool {
        self.done.load(Ordering::Relaxed)
    }
}
