//! YAML configuration I/O
//!
//! Works with any serializable configuration type; missing or broken files
//! fall back to defaults so a bad config never prevents start-up.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;

/// Read a YAML config, falling back to `T::default()`
///
/// A missing file is normal (first run). An unreadable or malformed file is
/// logged at `warn` and also yields the defaults.
///
/// ```ignore
/// let config: MixerConfig = load_config(Path::new("mixer.yaml"));
/// ```
pub fn load_config<T>(path: &Path) -> T
where
    T: DeserializeOwned + Default,
{
    match read_config(path) {
        Ok(Some(config)) => {
            log::info!("Loaded config {:?}", path);
            config
        }
        Ok(None) => {
            log::info!("No config at {:?}, using defaults", path);
            T::default()
        }
        Err(e) => {
            log::warn!("Ignoring config {:?}: {:#}", path, e);
            T::default()
        }
    }
}

fn read_config<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }
    let contents = std::fs::read_to_string(path).context("read failed")?;
    let config = serde_yaml::from_str(&contents).context("invalid YAML")?;
    Ok(Some(config))
}

/// Write a config as YAML, creating missing parent directories
pub fn save_config<T>(config: &T, path: &Path) -> Result<()>
where
    T: Serialize,
{
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).with_context(|| format!("Cannot create {:?}", dir))?;
    }
    let yaml = serde_yaml::to_string(config).context("Cannot serialize config")?;
    std::fs::write(path, yaml).with_context(|| format!("Cannot write {:?}", path))?;

    log::info!("Saved config {:?}", path);
    Ok(())
}
