//! Cadence Render - drives the mixer through a scripted scene
//!
//! Renders the scene into a 32-bit float WAV file through the offline output
//! driver, exactly as a device would pull it.
//!
//! ## Command line
//!
//! ```text
//! cadence-render [OUTPUT.wav] [--config PATH] [--seconds N] [--clip INPUT.wav] [--play]
//! ```
//!
//! - `--config`: mixer config (default: `<config dir>/cadence/mixer.yaml`)
//! - `--clip`: loop a WAV file on the `music` submix
//! - `--play`: play on the default device instead (needs `cpal-backend`)

mod scene;
mod wav;

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use cadence_core::audio::start_output;
use cadence_core::config::{default_config_path, load_config, MixerConfig};
use cadence_core::engine::create_mixer;

use scene::Scene;
use wav::{load_wav, WavSink};

const CONFIG_FILENAME: &str = "mixer.yaml";
const DEFAULT_OUTPUT: &str = "cadence.wav";
const DEFAULT_SECONDS: f32 = 10.0;

struct Args {
    output: PathBuf,
    config: Option<PathBuf>,
    seconds: f32,
    clip: Option<PathBuf>,
    play: bool,
}

fn parse_args() -> Result<Args> {
    let mut args = Args {
        output: PathBuf::from(DEFAULT_OUTPUT),
        config: None,
        seconds: DEFAULT_SECONDS,
        clip: None,
        play: false,
    };

    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" => args.config = Some(iter.next().context("--config needs a path")?.into()),
            "--clip" => args.clip = Some(iter.next().context("--clip needs a path")?.into()),
            "--seconds" => {
                let value = iter.next().context("--seconds needs a value")?;
                args.seconds = value
                    .parse()
                    .with_context(|| format!("Invalid duration: {}", value))?;
            }
            "--play" => args.play = true,
            other if other.starts_with("--") => bail!("Unknown flag: {}", other),
            other => args.output = PathBuf::from(other),
        }
    }
    Ok(args)
}

fn main() -> Result<()> {
    // Set RUST_LOG=debug for voice and command tracing
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let args = parse_args()?;
    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| default_config_path(CONFIG_FILENAME));
    let config: MixerConfig = load_config(&config_path);

    let (mut mixer, engine) = create_mixer(&config)?;
    let clip = args.clip.as_deref().map(load_wav).transpose()?;
    let scene = Scene::build(&mut mixer, clip)?;
    mixer.update();

    let spec = config.output.spec(engine.format());
    log::info!(
        "Output: {} channels, {}Hz, {} x {} frames (~{:.1}ms)",
        spec.num_channels,
        spec.sample_rate,
        spec.num_buffers,
        spec.block_frames,
        config.output.latency_ms(spec.sample_rate)
    );
    let (driver, endpoint) = start_output(engine, spec)?;
    let total_frames = (args.seconds.max(0.0) * spec.sample_rate as f32) as u64;

    if args.play {
        play(&mut mixer, &scene, endpoint, config.output.device.as_deref(), args.seconds)?;
    } else {
        let mut endpoint = endpoint;
        let mut sink = WavSink::create(&args.output, spec.sample_rate, spec.num_channels)?;
        let mut block = vec![0.0; spec.buffer_len()];

        while sink.frames_written() < total_frames {
            let time = sink.frames_written() as f32 / spec.sample_rate as f32;
            scene.advance(&mut mixer, time)?;
            mixer.update();

            endpoint.read_blocking(&mut block)?;
            let remaining = (total_frames - sink.frames_written()) as usize * spec.num_channels;
            sink.write_block(&block[..block.len().min(remaining)])?;
        }

        let frames = sink.finish()?;
        log::info!("Wrote {} frames to {:?}", frames, args.output);
    }

    scene.release(&mut mixer)?;
    mixer.update();

    let underruns = driver.stats().underruns();
    driver.stop()?;
    if underruns > 0 {
        log::warn!("{} underruns during render", underruns);
    }
    Ok(())
}

#[cfg(feature = "cpal-backend")]
fn play(
    mixer: &mut cadence_core::engine::MixerController,
    scene: &Scene,
    endpoint: cadence_core::audio::DeviceEndpoint,
    device: Option<&str>,
    seconds: f32,
) -> Result<()> {
    use std::time::{Duration, Instant};

    let output = cadence_core::audio::start_cpal_output(endpoint, device)?;
    log::info!("Playing on {} for {:.1}s", output.device_name(), seconds);

    let start = Instant::now();
    while start.elapsed().as_secs_f32() < seconds {
        scene.advance(mixer, start.elapsed().as_secs_f32())?;
        mixer.update();
        std::thread::sleep(Duration::from_millis(10));
    }
    Ok(())
}

#[cfg(not(feature = "cpal-backend"))]
fn play(
    _mixer: &mut cadence_core::engine::MixerController,
    _scene: &Scene,
    _endpoint: cadence_core::audio::DeviceEndpoint,
    _device: Option<&str>,
    _seconds: f32,
) -> Result<()> {
    bail!("--play needs a build with the cpal-backend feature")
}
