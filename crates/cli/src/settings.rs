use anyhow::{Context, Result};
use pinboard_site::SiteRegistry;
use pinboard_sync::{ConfigFile, PinboardConfig};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

const STORE_ENV: &str = "PINBOARD_STORE";
const CONFIG_ENV: &str = "PINBOARD_CONFIG";

/// Resolved configuration for one invocation.
pub struct Settings {
    pub store_path: PathBuf,
    pub timing: PinboardConfig,
    pub registry: SiteRegistry,
}

impl Settings {
    pub fn load(config: Option<&Path>, store: Option<PathBuf>) -> Result<Self> {
        let file = match config_path(config) {
            Some(path) => {
                let bytes = fs::read(&path)
                    .with_context(|| format!("Failed to read config {}", path.display()))?;
                log::debug!("using config {}", path.display());
                ConfigFile::parse(&bytes)
                    .with_context(|| format!("Invalid config {}", path.display()))?
            }
            None => ConfigFile::default(),
        };
        let registry = file.registry().context("Invalid [[sites]] entry")?;

        Ok(Self {
            store_path: store_path(store)?,
            timing: file.timing,
            registry,
        })
    }
}

fn config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    if let Some(path) = env::var_os(CONFIG_ENV) {
        return Some(PathBuf::from(path));
    }
    let default = dirs::config_dir()?.join("pinboard").join("config.toml");
    default.is_file().then_some(default)
}

fn store_path(explicit: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path);
    }
    if let Some(path) = env::var_os(STORE_ENV) {
        return Ok(PathBuf::from(path));
    }
    let data = dirs::data_dir()
        .context("No data directory on this platform; pass --store or set PINBOARD_STORE")?;
    Ok(data.join("pinboard").join("pinboard.json"))
}
