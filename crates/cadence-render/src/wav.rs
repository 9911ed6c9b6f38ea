//! WAV file input and output

use std::path::Path;

use anyhow::{bail, Context, Result};
use cadence_core::source::PcmBuffer;
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};

/// A decoded WAV file
pub struct WavClip {
    pub sample_rate: u32,
    pub buffer: PcmBuffer,
}

/// Load a 16-bit integer or 32-bit float WAV file
pub fn load_wav(path: &Path) -> Result<WavClip> {
    let mut reader = WavReader::open(path)
        .with_context(|| format!("Failed to open {:?}", path))?;
    let spec = reader.spec();
    let channels = spec.channels as usize;

    let buffer = match (spec.sample_format, spec.bits_per_sample) {
        (SampleFormat::Int, 16) => {
            let samples = reader
                .samples::<i16>()
                .collect::<Result<Vec<_>, _>>()
                .with_context(|| format!("Failed to decode {:?}", path))?;
            PcmBuffer::from_i16(channels, samples)
        }
        (SampleFormat::Float, 32) => {
            let samples = reader
                .samples::<f32>()
                .collect::<Result<Vec<_>, _>>()
                .with_context(|| format!("Failed to decode {:?}", path))?;
            PcmBuffer::from_f32(channels, samples)
        }
        (format, bits) => bail!("Unsupported WAV format {:?} {}-bit in {:?}", format, bits, path),
    };

    log::info!(
        "Loaded {:?}: {} channels, {}Hz, {} frames",
        path,
        channels,
        spec.sample_rate,
        buffer.num_frames()
    );

    Ok(WavClip {
        sample_rate: spec.sample_rate,
        buffer,
    })
}

/// Streams interleaved f32 blocks into a 32-bit float WAV file
pub struct WavSink {
    writer: WavWriter<std::io::BufWriter<std::fs::File>>,
    frames_written: u64,
    num_channels: usize,
}

impl WavSink {
    pub fn create(path: &Path, sample_rate: u32, num_channels: usize) -> Result<Self> {
        let spec = WavSpec {
            channels: num_channels as u16,
            sample_rate,
            bits_per_sample: 32,
            sample_format: SampleFormat::Float,
        };
        let writer = WavWriter::create(path, spec)
            .with_context(|| format!("Failed to create {:?}", path))?;
        Ok(Self {
            writer,
            frames_written: 0,
            num_channels,
        })
    }

    pub fn write_block(&mut self, samples: &[f32]) -> Result<()> {
        for &sample in samples {
            self.writer.write_sample(sample)?;
        }
        self.frames_written += (samples.len() / self.num_channels) as u64;
        Ok(())
    }

    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    pub fn finish(self) -> Result<u64> {
        let frames = self.frames_written;
        self.writer.finalize().context("Failed to finalize WAV file")?;
        Ok(frames)
    }
}
