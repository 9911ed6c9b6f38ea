//! CPAL hardware adapter
//!
//! Plays a [`DeviceEndpoint`] on a hardware output. The cpal callback only
//! calls the non-blocking [`DeviceEndpoint::read`], so a late render thread
//! shows up as counted underruns instead of a stalled device.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{BufferSize as CpalBufferSize, SampleFormat, SampleRate, Stream, StreamConfig};

use super::backend::DeviceEndpoint;
use super::error::{AudioError, AudioResult};

/// Keeps the hardware stream alive; drop it to stop playback
pub struct CpalOutput {
    _stream: Stream,
    device_name: String,
    sample_rate: u32,
    num_channels: usize,
}

impl CpalOutput {
    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn num_channels(&self) -> usize {
        self.num_channels
    }
}

/// Open `device` (or the default output) and play `endpoint` on it
///
/// The device must accept `f32` samples at the endpoint's rate and channel
/// count; no conversion happens here.
pub fn start_cpal_output(endpoint: DeviceEndpoint, device: Option<&str>) -> AudioResult<CpalOutput> {
    let spec = *endpoint.spec();
    let host = cpal::default_host();

    let device = match device {
        Some(name) => host
            .output_devices()
            .map_err(|e| AudioError::ConfigError(e.to_string()))?
            .find(|d| d.name().map(|n| n == name).unwrap_or(false))
            .ok_or_else(|| AudioError::DeviceNotFound(name.to_string()))?,
        None => host.default_output_device().ok_or(AudioError::NoDevices)?,
    };
    let device_name = device.name().unwrap_or_else(|_| "Unknown".to_string());
    log::info!("Using audio device: {}", device_name);

    let candidates: Vec<_> = device
        .supported_output_configs()
        .map_err(|e| AudioError::ConfigError(e.to_string()))?
        .filter(|c| c.sample_format() == SampleFormat::F32 && c.channels() as usize == spec.num_channels)
        .collect();
    if candidates.is_empty() {
        return Err(AudioError::ConfigError(format!(
            "{} has no f32 output with {} channels",
            device_name, spec.num_channels
        )));
    }
    let rate_supported = candidates.iter().any(|c| {
        spec.sample_rate >= c.min_sample_rate().0 && spec.sample_rate <= c.max_sample_rate().0
    });
    if !rate_supported {
        let device_rate = device
            .default_output_config()
            .map(|c| c.sample_rate().0)
            .unwrap_or_else(|_| candidates[0].max_sample_rate().0);
        return Err(AudioError::SampleRateMismatch {
            mixer: spec.sample_rate,
            device: device_rate,
        });
    }

    let config = StreamConfig {
        channels: spec.num_channels as u16,
        sample_rate: SampleRate(spec.sample_rate),
        buffer_size: CpalBufferSize::Fixed(spec.block_frames as u32),
    };

    let mut endpoint = endpoint;
    let stream = device
        .build_output_stream(
            &config,
            move |data: &mut [f32], _info: &cpal::OutputCallbackInfo| {
                endpoint.read(data);
            },
            move |err| {
                log::error!("Audio stream error: {}", err);
            },
            None,
        )
        .map_err(|e| AudioError::StreamBuildError(e.to_string()))?;

    stream
        .play()
        .map_err(|e| AudioError::StreamPlayError(e.to_string()))?;

    log::info!(
        "Audio stream started: {} channels, {}Hz, {} frames (~{:.1}ms)",
        spec.num_channels,
        spec.sample_rate,
        spec.block_frames,
        spec.block_frames as f32 / spec.sample_rate as f32 * 1000.0
    );

    Ok(CpalOutput {
        _stream: stream,
        device_name,
        sample_rate: spec.sample_rate,
        num_channels: spec.num_channels,
    })
}
