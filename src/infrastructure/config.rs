use crate::domain::config::BridgeConfig;
use crate::domain::error::{BridgeError, BridgeResult};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

const CONFIG_DIR: &str = "canbridge";
const PROJECT_DIR: &str = ".canbridge";
const CONFIG_FILE: &str = "config.toml";

/// Locates and loads the bridge configuration.
///
/// Precedence: an explicit file, then `.canbridge/config.toml` in the current
/// directory or any parent, then `~/.config/canbridge/config.toml`, then defaults.
pub struct ConfigManager {
    global_config_path: Option<PathBuf>,
    project_config_path: Option<PathBuf>,
}

impl ConfigManager {
    pub fn new() -> Self {
        Self {
            global_config_path: Self::get_global_config_path(),
            project_config_path: Self::find_project_config_path(),
        }
    }

    /// Manager with fixed search locations
    pub fn with_paths(global: Option<PathBuf>, project: Option<PathBuf>) -> Self {
        Self {
            global_config_path: global,
            project_config_path: project,
        }
    }

    /// Load and validate configuration, preferring `explicit` when given.
    pub fn load_config(&self, explicit: Option<&Path>) -> BridgeResult<BridgeConfig> {
        let config = self.read_config(explicit)?;
        config.validate()?;
        Ok(config)
    }

    /// Like `load_config`, but leaves validation to the caller.
    pub fn read_config(&self, explicit: Option<&Path>) -> BridgeResult<BridgeConfig> {
        let config = match self.resolve(explicit) {
            Some(path) => {
                debug!(path = %path.display(), "Loading configuration");
                Self::load_config_from_path(&path)?
            }
            None => {
                debug!("No configuration file found, using defaults");
                BridgeConfig::default()
            }
        };
        Ok(config)
    }

    /// The file `load_config` would read, if any.
    pub fn resolve(&self, explicit: Option<&Path>) -> Option<PathBuf> {
        if let Some(path) = explicit {
            return Some(path.to_path_buf());
        }

        [&self.project_config_path, &self.global_config_path]
            .into_iter()
            .flatten()
            .find(|path| path.exists())
            .cloned()
    }

    /// Where `config init` writes when no output file is given.
    pub fn default_init_path(&self) -> PathBuf {
        self.global_config_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(PROJECT_DIR).join(CONFIG_FILE))
    }

    fn get_global_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".config").join(CONFIG_DIR).join(CONFIG_FILE))
    }

    /// Walk up from the current directory looking for `.canbridge/config.toml`.
    fn find_project_config_path() -> Option<PathBuf> {
        let current_dir = std::env::current_dir().ok()?;
        let mut path = current_dir.as_path();

        loop {
            let config_path = path.join(PROJECT_DIR).join(CONFIG_FILE);
            if config_path.exists() {
                return Some(config_path);
            }

            path = path.parent()?;
        }
    }

    pub fn load_config_from_path(path: &Path) -> BridgeResult<BridgeConfig> {
        let content = fs::read_to_string(path).map_err(|e| {
            BridgeError::config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;

        toml::from_str(&content).map_err(|e| {
            BridgeError::config(format!("Failed to parse config file {}: {}", path.display(), e))
        })
    }

    pub fn save_config_to_path(path: &Path, config: &BridgeConfig) -> BridgeResult<()> {
        let content = toml::to_string_pretty(config)
            .map_err(|e| BridgeError::config(format!("Failed to serialize config: {}", e)))?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                BridgeError::config(format!("Failed to create config directory: {}", e))
            })?;
        }

        fs::write(path, content).map_err(|e| {
            BridgeError::config(format!("Failed to write config file {}: {}", path.display(), e))
        })
    }

    /// Write a default configuration file. Refuses to overwrite unless `force` is set.
    pub fn init_config(path: &Path, force: bool) -> BridgeResult<()> {
        if path.exists() && !force {
            return Err(BridgeError::config(format!(
                "Configuration already exists at {} (use --force to overwrite)",
                path.display()
            )));
        }

        Self::save_config_to_path(path, &BridgeConfig::default())
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}
