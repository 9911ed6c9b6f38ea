//! Default locations of configuration files

use std::path::PathBuf;

/// Directory holding Cadence configuration
///
/// Returns: `<user config dir>/cadence` (e.g. `~/.config/cadence` on Linux),
/// or `./cadence` when the platform has no config directory.
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("cadence")
}

/// Path of a config file inside [`default_config_dir`]
pub fn default_config_path(filename: &str) -> PathBuf {
    default_config_dir().join(filename)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_dir_ends_with_cadence() {
        assert!(default_config_dir().ends_with("cadence"));
    }

    #[test]
    fn test_config_path_includes_filename() {
        let path = default_config_path("mixer.yaml");
        assert!(path.ends_with("cadence/mixer.yaml"));
    }
}
