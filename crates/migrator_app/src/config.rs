//! Operator configuration stored as RON next to the working directory.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use engine_logging::{engine_info, engine_warn};
use migrator_core::MigrationSettings;
use migrator_engine::AtomicFileWriter;
use serde::{Deserialize, Serialize};

pub(crate) const DEFAULT_CONFIG_FILENAME: &str = "migrator.ron";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct AppConfig {
    pub migration: MigrationSettings,
    /// Where the progress record lives.
    pub state_dir: PathBuf,
    /// Migrated pages; images go to `assets/` below it.
    pub output_dir: PathBuf,
    /// Public URL prefix under which `output_dir/assets` is served.
    pub asset_base_url: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            migration: MigrationSettings::default(),
            state_dir: PathBuf::from(".migrator"),
            output_dir: PathBuf::from("migrated"),
            asset_base_url: "/assets".to_string(),
        }
    }
}

impl AppConfig {
    pub fn asset_dir(&self) -> PathBuf {
        self.output_dir.join("assets")
    }
}

/// Loads the config file; a missing file yields defaults.
pub(crate) fn load_config(path: &Path) -> Result<AppConfig> {
    let content = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            engine_info!("No config at {:?}, using defaults", path);
            return Ok(AppConfig::default());
        }
        Err(err) => {
            return Err(err).with_context(|| format!("failed to read config {}", path.display()))
        }
    };

    let config: AppConfig = ron::from_str(&content)
        .with_context(|| format!("failed to parse config {}", path.display()))?;
    engine_info!("Loaded config from {:?}", path);
    Ok(config)
}

/// Writes the config back so the next invocation starts from the last-used settings.
pub(crate) fn save_config(path: &Path, config: &AppConfig) {
    let pretty = ron::ser::PrettyConfig::new();
    let content = match ron::ser::to_string_pretty(config, pretty) {
        Ok(text) => text,
        Err(err) => {
            engine_warn!("Failed to serialize config: {}", err);
            return;
        }
    };

    let (dir, filename) = split_path(path);
    let writer = AtomicFileWriter::new(dir);
    if let Err(err) = writer.write(&filename, &content) {
        engine_warn!("Failed to save config to {:?}: {}", path, err);
    }
}

fn split_path(path: &Path) -> (PathBuf, String) {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let filename = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| DEFAULT_CONFIG_FILENAME.to_string());
    (dir, filename)
}
