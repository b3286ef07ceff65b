use std::path::Path;

use anyhow::Result;
use riskguard::config::Config;

use super::DEFAULT_CONFIG_FILE;

pub fn run() -> Result<()> {
    let path = Path::new(DEFAULT_CONFIG_FILE);
    if path.exists() {
        eprintln!("Config file already exists: {}", path.display());
        return Ok(());
    }
    std::fs::write(path, Config::default_toml())?;
    println!("Created {}", path.display());
    Ok(())
}
