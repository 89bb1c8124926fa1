//! Config command implementations

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::output::{print_error, print_info, print_success};
use wx_core::config::{self, WsexecConfig};
use wx_core::ConfigError;

fn resolve_path(config_path: Option<&Path>) -> PathBuf {
    config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(config::default_config_path)
}

/// Load the configuration the commands run with
///
/// A missing file at the default location means defaults. A missing file
/// that was asked for explicitly is an error.
pub fn load_effective_config(config_path: Option<&Path>) -> Result<WsexecConfig> {
    let path = resolve_path(config_path);
    match config::load_config(&path) {
        Ok(config) => {
            tracing::debug!("Loaded configuration from {:?}", path);
            Ok(config)
        }
        Err(ConfigError::NotFound(_)) if config_path.is_none() => {
            tracing::debug!("No configuration at {:?}, using defaults", path);
            Ok(WsexecConfig::default())
        }
        Err(e) => Err(e).with_context(|| format!("Failed to load config {:?}", path)),
    }
}

/// Print the effective configuration as TOML
pub fn config_show(config: &WsexecConfig) -> Result<()> {
    print!("{}", config::to_toml(config)?);
    Ok(())
}

/// Print where the configuration file is looked up
pub fn config_path(config_path: Option<&Path>) {
    println!("{}", resolve_path(config_path).display());
}

/// Write the default configuration file
pub fn config_init(config_path: Option<&Path>, force: bool) -> Result<()> {
    let path = resolve_path(config_path);

    if path.exists() && !force {
        print_error(&format!("Config file already exists: {:?}", path));
        print_info("Use --force to overwrite");
        return Ok(());
    }

    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create config directory: {:?}", dir))?;
    }

    let content = config::to_toml(&WsexecConfig::default())?;
    std::fs::write(&path, content)
        .with_context(|| format!("Failed to write config file: {:?}", path))?;

    print_success(&format!("Created configuration file: {:?}", path));
    Ok(())
}
