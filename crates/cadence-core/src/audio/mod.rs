//! Platform output abstraction
//!
//! The mixer only ever sees an [`AudioStreamCallback`]. An output driver owns
//! the render thread that calls it and circulates a fixed set of buffers to
//! a [`DeviceEndpoint`]:
//!
//! - **Offline**: read the endpoint with [`DeviceEndpoint::read_blocking`]
//!   (file rendering, tests)
//! - **Hardware**: with the `cpal-backend` feature, [`start_cpal_output`]
//!   plays the endpoint on a device
//!
//! # Example Usage
//!
//! ```ignore
//! use cadence_core::audio::start_output;
//!
//! let spec = config.output.spec(engine.format());
//! let (driver, mut endpoint) = start_output(engine, spec)?;
//! endpoint.read_blocking(&mut buffer)?;
//! driver.stop()?;
//! ```

mod backend;
mod config;
mod error;

#[cfg(feature = "cpal-backend")]
mod cpal_backend;

pub use backend::{start_output, AudioStreamCallback, DeviceEndpoint, OutputDriver, OutputStats};
pub use config::{OutputSettings, OutputSpec, DEFAULT_BLOCK_FRAMES, DEFAULT_NUM_BUFFERS};
pub use error::{AudioError, AudioResult};

#[cfg(feature = "cpal-backend")]
pub use cpal_backend::{start_cpal_output, CpalOutput};
