//! Deferred deallocation for data released on the render thread
//!
//! PCM buffers, init payloads, channel maps and removed effects all cross
//! the command queue as `basedrop` pointers. When the render thread drops
//! the last reference, the pointer is only enqueued; the memory is freed
//! here, on a background thread, so the render thread never calls into the
//! allocator to free.
//!
//! ```ignore
//! use basedrop::Shared;
//! use crate::engine::gc::gc_handle;
//!
//! let pcm = Shared::new(&gc_handle(), PcmBuffer::from_f32(2, samples));
//! ```

use basedrop::{Collector, Handle};
use std::sync::mpsc;
use std::sync::OnceLock;
use std::thread;
use std::time::Duration;

/// How often the collector frees what the render thread released
const COLLECT_INTERVAL: Duration = Duration::from_millis(100);

static GC_HANDLE: OnceLock<Handle> = OnceLock::new();

/// Spawn the collector thread and return a handle to it
fn init_gc() -> Handle {
    let (tx, rx) = mpsc::channel();

    let spawned = thread::Builder::new()
        .name("cadence-gc".to_string())
        .spawn(move || {
            // Collector is !Sync, so it is created on the thread that owns it
            let mut collector = Collector::new();
            if tx.send(collector.handle()).is_err() {
                return;
            }

            log::info!("Deferred-drop collector thread started");

            loop {
                collector.collect();
                thread::sleep(COLLECT_INTERVAL);
            }
        });

    if let Err(e) = spawned {
        log::error!("Failed to spawn collector thread: {}", e);
    }

    match rx.recv() {
        Ok(handle) => handle,
        Err(_) => {
            // Without a collector thread nothing is ever freed; leaking is
            // the only option that keeps the render thread allocator-free.
            log::error!("No collector thread, released audio data will leak");
            let collector = Collector::new();
            let handle = collector.handle();
            std::mem::forget(collector);
            handle
        }
    }
}

/// Handle for creating `Shared`/`Owned` allocations
///
/// The first call starts the collector thread.
pub fn gc_handle() -> Handle {
    GC_HANDLE.get_or_init(init_gc).clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use basedrop::{Owned, Shared};

    #[test]
    fn test_handle_is_reusable() {
        let a = Shared::new(&gc_handle(), vec![0.0f32; 1024]);
        let b = a.clone();
        drop(a);
        assert_eq!(b.len(), 1024);

        let owned = Owned::new(&gc_handle(), 7u32);
        assert_eq!(*owned, 7);
    }
}
