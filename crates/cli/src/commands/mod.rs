pub mod init;
pub mod list;
pub mod scan;
pub mod score;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use riskguard::config::Config;

pub const DEFAULT_CONFIG_FILE: &str = ".riskguard.toml";

/// Load the explicit config path, or `.riskguard.toml` when present.
pub fn load_config(path: Option<PathBuf>) -> Result<Config> {
    let path = path.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
    Config::load(Path::new(&path))
        .with_context(|| format!("Failed to load config from {}", path.display()))
}
