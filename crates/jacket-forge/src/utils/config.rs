//! `forge.toml` handling.
//!
//! The file mirrors [`BatchConfig`]; every key is optional and falls back to
//! the batch defaults.

use crate::errors::CliError;
use abk_batch::BatchConfig;
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use std::io;

pub const DEFAULT_CONFIG_FILE: &str = "forge.toml";

/// The explicit `--config` path, or `forge.toml` in the working directory.
pub fn resolve_config_path(explicit: Option<&Utf8Path>) -> Utf8PathBuf {
    explicit
        .map(Utf8Path::to_path_buf)
        .unwrap_or_else(|| Utf8PathBuf::from(DEFAULT_CONFIG_FILE))
}

/// Load the configuration.
///
/// A missing default file yields the defaults; a missing explicit file is an error.
pub fn load_config(explicit: Option<&Utf8Path>) -> Result<(BatchConfig, Option<Utf8PathBuf>), CliError> {
    let path = resolve_config_path(explicit);
    if !path.is_file() {
        if explicit.is_some() {
            return Err(CliError::config_not_found(path));
        }
        tracing::debug!("No {} found, using defaults", path);
        return Ok((BatchConfig::default(), None));
    }

    let content = fs::read_to_string(&path)?;
    let config = parse_config(&content).map_err(|e| CliError::config_parse_error(path.clone(), e))?;
    tracing::debug!("Loaded configuration from {}", path);
    Ok((config, Some(path)))
}

pub fn parse_config(content: &str) -> Result<BatchConfig, toml::de::Error> {
    toml::from_str(content)
}

pub fn render_config(config: &BatchConfig) -> io::Result<String> {
    toml::to_string_pretty(config).map_err(io::Error::other)
}

pub fn save_config(path: &Utf8Path, config: &BatchConfig) -> io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, render_config(config)?)
}
