//! Threaded output driver with rotating buffers
//!
//! ```text
//!   ┌──────────────────┐   filled   ┌──────────────────┐
//!   │  Render thread   │──────────►│  DeviceEndpoint  │──► device / file
//!   │ (owns callback)  │◄──────────│                  │
//!   └──────────────────┘  consumed  └──────────────────┘
//! ```
//!
//! A fixed set of buffers circulates by ownership through two bounded
//! channels. The render thread waits for a consumed buffer, fills it through
//! the [`AudioStreamCallback`] and hands it to the device side; returning a
//! buffer is the "buffer consumed" signal. That wait is the render thread's
//! only blocking point and no lock is ever held.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam::channel::{bounded, Receiver, Sender};
use crossbeam::select;

use super::config::OutputSpec;
use super::error::{AudioError, AudioResult};

/// Produces interleaved `f32` audio on demand
///
/// Called on the render thread, once per output buffer.
pub trait AudioStreamCallback: Send {
    fn on_process_audio_stream(&mut self, output: &mut [f32]);
}

/// Counters shared by the driver and the endpoint
#[derive(Debug, Default)]
pub struct OutputStats {
    buffers_rendered: AtomicU64,
    underruns: AtomicU64,
}

impl OutputStats {
    pub fn buffers_rendered(&self) -> u64 {
        self.buffers_rendered.load(Ordering::Relaxed)
    }

    /// Reads that found no rendered audio and played silence instead
    pub fn underruns(&self) -> u64 {
        self.underruns.load(Ordering::Relaxed)
    }
}

/// Start a render thread driving `callback`
///
/// Returns the driver (stop and join) and the device-side endpoint that
/// hands out the rendered audio.
pub fn start_output<C>(callback: C, spec: OutputSpec) -> AudioResult<(OutputDriver, DeviceEndpoint)>
where
    C: AudioStreamCallback + 'static,
{
    if spec.num_buffers < 2 {
        return Err(AudioError::InvalidSpec(format!(
            "need at least 2 buffers, got {}",
            spec.num_buffers
        )));
    }
    if spec.block_frames == 0 || spec.num_channels == 0 {
        return Err(AudioError::InvalidSpec(format!(
            "empty buffers ({} frames × {} channels)",
            spec.block_frames, spec.num_channels
        )));
    }

    let (free_tx, free_rx) = bounded::<Vec<f32>>(spec.num_buffers);
    let (filled_tx, filled_rx) = bounded::<Vec<f32>>(spec.num_buffers);
    let (stop_tx, stop_rx) = bounded::<()>(1);
    let stats = Arc::new(OutputStats::default());

    for _ in 0..spec.num_buffers {
        // Cannot fail: the channel holds exactly num_buffers
        let _ = free_tx.try_send(vec![0.0; spec.buffer_len()]);
    }

    let thread_stats = Arc::clone(&stats);
    let mut callback = callback;
    let thread = thread::Builder::new()
        .name("cadence-render".to_string())
        .spawn(move || {
            log::debug!("Render thread started");
            loop {
                select! {
                    recv(stop_rx) -> _ => break,
                    recv(free_rx) -> buffer => {
                        let Ok(mut buffer) = buffer else {
                            // Endpoint dropped
                            break;
                        };
                        callback.on_process_audio_stream(&mut buffer);
                        thread_stats.buffers_rendered.fetch_add(1, Ordering::Relaxed);
                        if filled_tx.send(buffer).is_err() {
                            break;
                        }
                    }
                }
            }
            log::debug!("Render thread stopped");
        })
        .map_err(|e| AudioError::ThreadSpawn(e.to_string()))?;

    log::info!(
        "Output started: {}Hz, {} channels, {} × {} frame buffers",
        spec.sample_rate,
        spec.num_channels,
        spec.num_buffers,
        spec.block_frames
    );

    let driver = OutputDriver {
        stop_tx: Some(stop_tx),
        thread: Some(thread),
        stats: Arc::clone(&stats),
        spec,
    };
    let endpoint = DeviceEndpoint {
        filled: filled_rx,
        free: free_tx,
        current: None,
        position: 0,
        stats,
        spec,
    };
    Ok((driver, endpoint))
}

/// Owner of the render thread
///
/// Dropping the driver stops the thread as well.
pub struct OutputDriver {
    stop_tx: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
    stats: Arc<OutputStats>,
    spec: OutputSpec,
}

impl OutputDriver {
    pub fn spec(&self) -> &OutputSpec {
        &self.spec
    }

    pub fn stats(&self) -> &OutputStats {
        &self.stats
    }

    /// Stop the render thread and wait for it to exit
    pub fn stop(mut self) -> AudioResult<()> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> AudioResult<()> {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.try_send(());
        }
        match self.thread.take() {
            Some(thread) => {
                thread.join().map_err(|_| AudioError::RenderThreadPanicked)?;
                log::info!(
                    "Output stopped after {} buffers ({} underruns)",
                    self.stats.buffers_rendered(),
                    self.stats.underruns()
                );
                Ok(())
            }
            None => Ok(()),
        }
    }
}

impl Drop for OutputDriver {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            log::error!("Output shutdown failed: {}", e);
        }
    }
}

/// Device side of an output
///
/// Owned by whatever consumes audio: a hardware callback, a file writer or
/// a test.
pub struct DeviceEndpoint {
    filled: Receiver<Vec<f32>>,
    free: Sender<Vec<f32>>,
    current: Option<Vec<f32>>,
    position: usize,
    stats: Arc<OutputStats>,
    spec: OutputSpec,
}

impl DeviceEndpoint {
    pub fn spec(&self) -> &OutputSpec {
        &self.spec
    }

    pub fn stats(&self) -> &OutputStats {
        &self.stats
    }

    /// Fill `out` without blocking (for hardware callbacks)
    ///
    /// Whatever the render thread has not produced yet is played as silence
    /// and counted as an underrun. Returns the number of rendered samples
    /// copied.
    pub fn read(&mut self, out: &mut [f32]) -> usize {
        let mut written = 0;
        while written < out.len() {
            if self.current.is_none() {
                match self.filled.try_recv() {
                    Ok(buffer) => {
                        self.current = Some(buffer);
                        self.position = 0;
                    }
                    Err(_) => {
                        out[written..].fill(0.0);
                        self.stats.underruns.fetch_add(1, Ordering::Relaxed);
                        return written;
                    }
                }
            }
            written += self.copy_current(&mut out[written..]);
        }
        written
    }

    /// Fill `out` completely, waiting for the render thread (offline use)
    pub fn read_blocking(&mut self, out: &mut [f32]) -> AudioResult<()> {
        let mut written = 0;
        while written < out.len() {
            if self.current.is_none() {
                let buffer = self.filled.recv().map_err(|_| AudioError::StreamClosed)?;
                self.current = Some(buffer);
                self.position = 0;
            }
            written += self.copy_current(&mut out[written..]);
        }
        Ok(())
    }

    /// Copy from the current buffer, returning it once exhausted
    fn copy_current(&mut self, out: &mut [f32]) -> usize {
        let Some(buffer) = self.current.as_ref() else {
            return 0;
        };
        let count = (buffer.len() - self.position).min(out.len());
        out[..count].copy_from_slice(&buffer[self.position..self.position + count]);
        self.position += count;

        if self.position >= buffer.len() {
            if let Some(buffer) = self.current.take() {
                // Fails only once the render thread is gone
                let _ = self.free.try_send(buffer);
            }
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    /// Writes the buffer sequence number into every sample
    struct Counter {
        next: f32,
    }

    impl AudioStreamCallback for Counter {
        fn on_process_audio_stream(&mut self, output: &mut [f32]) {
            output.fill(self.next);
            self.next += 1.0;
        }
    }

    fn spec(num_buffers: usize) -> OutputSpec {
        OutputSpec {
            sample_rate: 48000,
            num_channels: 2,
            block_frames: 4,
            num_buffers,
        }
    }

    #[test]
    fn test_buffers_rotate_in_order() {
        let (driver, mut endpoint) = start_output(Counter { next: 0.0 }, spec(2)).unwrap();

        // Reads straddle buffer boundaries on purpose
        let mut out = vec![0.0; 12];
        endpoint.read_blocking(&mut out).unwrap();
        assert_eq!(&out[..8], &[0.0; 8]);
        assert_eq!(&out[8..], &[1.0; 4]);

        endpoint.read_blocking(&mut out).unwrap();
        assert_eq!(&out[..4], &[1.0; 4]);
        assert_eq!(&out[4..], &[2.0; 8]);

        driver.stop().unwrap();
    }

    #[test]
    fn test_stop_closes_stream() {
        let (driver, mut endpoint) = start_output(Counter { next: 0.0 }, spec(3)).unwrap();
        let mut out = vec![0.0; 8];
        endpoint.read_blocking(&mut out).unwrap();

        driver.stop().unwrap();

        // Already rendered buffers drain, then the stream reports closed
        let mut closed = false;
        for _ in 0..8 {
            if endpoint.read_blocking(&mut out).is_err() {
                closed = true;
                break;
            }
        }
        assert!(closed);
    }

    #[test]
    fn test_underrun_plays_silence() {
        struct Gated {
            gate: Receiver<()>,
        }
        impl AudioStreamCallback for Gated {
            fn on_process_audio_stream(&mut self, output: &mut [f32]) {
                let _ = self.gate.recv();
                output.fill(1.0);
            }
        }

        let (gate_tx, gate_rx) = bounded(8);
        let (driver, mut endpoint) = start_output(Gated { gate: gate_rx }, spec(2)).unwrap();

        let mut out = vec![0.5; 8];
        assert_eq!(endpoint.read(&mut out), 0);
        assert!(out.iter().all(|&s| s == 0.0));
        assert_eq!(endpoint.stats().underruns(), 1);

        gate_tx.send(()).unwrap();
        let mut ready = false;
        for _ in 0..200 {
            if endpoint.read(&mut out) == 8 {
                ready = true;
                break;
            }
            thread::sleep(Duration::from_millis(5));
        }
        assert!(ready);
        assert!(out.iter().all(|&s| s == 1.0));

        drop(gate_tx);
        driver.stop().unwrap();
    }

    #[test]
    fn test_rejects_single_buffer() {
        let result = start_output(Counter { next: 0.0 }, spec(1));
        assert!(matches!(result, Err(AudioError::InvalidSpec(_))));
    }

    #[test]
    fn test_panicking_callback_is_reported() {
        struct Panics;
        impl AudioStreamCallback for Panics {
            fn on_process_audio_stream(&mut self, _output: &mut [f32]) {
                panic!("render failure");
            }
        }

        let (driver, mut endpoint) = start_output(Panics, spec(2)).unwrap();
        let mut out = vec![0.0; 8];
        assert!(endpoint.read_blocking(&mut out).is_err());
        assert!(matches!(driver.stop(), Err(AudioError::RenderThreadPanicked)));
    }

    #[test]
    fn test_drives_mixer_engine() {
        use crate::config::MixerConfig;
        use crate::engine::create_mixer;
        use crate::source::{PcmBuffer, VoiceParams};

        let config = MixerConfig::default();
        let (mut mixer, engine) = create_mixer(&config).unwrap();
        let voice = mixer.create_voice(VoiceParams::new(1, 48000)).unwrap();
        voice
            .submit_buffer(&mut mixer, PcmBuffer::from_f32(1, vec![0.5; 1024]))
            .unwrap();
        voice.play(&mut mixer).unwrap();
        mixer.update();

        let spec = config.output.spec(engine.format());
        let (driver, mut endpoint) = start_output(engine, spec).unwrap();
        let mut out = vec![0.0; spec.buffer_len()];
        endpoint.read_blocking(&mut out).unwrap();
        driver.stop().unwrap();

        assert!(out.iter().any(|&s| s > 0.3));
        assert!(voice.frames_played() > 0);
    }
}
