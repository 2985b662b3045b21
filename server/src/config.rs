use std::path::PathBuf;

use awbtrack::config::apply_env_overrides;
use awbtrack::{load_config, Config, ConfigError};

/// Points at a config file to use instead of the default location.
pub const CONFIG_ENV: &str = "AWBTRACK_CONFIG";

/// `~/.awbtrack/config.json`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".awbtrack").join("config.json"))
}

/// The file to load: `AWBTRACK_CONFIG` if set, otherwise the default path
/// when it exists.
pub fn config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_ENV) {
        return Some(PathBuf::from(path));
    }
    default_config_path().filter(|path| path.is_file())
}

/// Loads the config file (or defaults) and applies `AWBTRACK_*` overrides.
/// Also returns the file the settings came from, if any.
pub fn resolve_config() -> Result<(Config, Option<PathBuf>), ConfigError> {
    let path = config_path();
    let mut config = match &path {
        Some(path) => load_config(path)?,
        None => Config::default(),
    };
    apply_env_overrides(&mut config, |name| std::env::var(name).ok())?;
    Ok((config, path))
}
