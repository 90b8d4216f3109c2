//! Layered configuration loading.
//!
//! Layers are read lowest precedence first: user, project root, cwd, the
//! repo's `.organix/` directory, then explicit runtime files. Each layer is
//! shape-checked on its own, merged over the previous ones, and the result is
//! decoded and range-checked once.

mod discovery;
mod merge;
mod schema;

#[cfg(test)]
mod tests;

use crate::{ConfigError, OrganixConfig};
use log::{debug, info};
use serde_json::{Map, Value};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Merged config and the layers that produced it.
#[derive(Debug, Clone)]
pub struct LayeredConfig {
    pub config: OrganixConfig,
    /// Layers that were found, lowest precedence first.
    pub layers: Vec<ConfigLayer>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigLayerSource {
    User,
    Project,
    Cwd,
    Repo,
    Runtime,
}

impl fmt::Display for ConfigLayerSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::User => "user",
            Self::Project => "project",
            Self::Cwd => "cwd",
            Self::Repo => "repo",
            Self::Runtime => "runtime",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigLayer {
    pub source: ConfigLayerSource,
    pub path: PathBuf,
}

impl ConfigLayer {
    /// `source(path)`, as used in error messages.
    fn label(&self) -> String {
        format!("{}({})", self.source, self.path.display())
    }
}

/// Where to look for layers.
#[derive(Debug, Clone)]
pub struct LayeredConfigOptions {
    pub cwd: PathBuf,
    /// Defaults to `~/.organix/organix.json5`; `None` skips the user layer.
    pub user_config_path: Option<PathBuf>,
    /// Applied last, in order. These files must exist.
    pub runtime_paths: Vec<PathBuf>,
    /// Entries whose presence marks the project root.
    pub project_root_markers: Vec<String>,
}

impl LayeredConfigOptions {
    pub fn new(cwd: impl AsRef<Path>) -> Self {
        Self {
            cwd: cwd.as_ref().to_path_buf(),
            user_config_path: discovery::user_config_path(),
            runtime_paths: Vec::new(),
            project_root_markers: vec![".git".to_string()],
        }
    }

    pub fn with_runtime_path(mut self, path: impl AsRef<Path>) -> Self {
        self.runtime_paths.push(path.as_ref().to_path_buf());
        self
    }
}

impl OrganixConfig {
    /// Parse one JSON5 document; no layering.
    pub fn load_from_str(contents: &str) -> Result<Self, ConfigError> {
        let value = parse(contents, "config")?;
        finish(value, "config")
    }

    /// Read one JSON5 file; no layering.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        debug!("loading config file (path={})", path.display());
        let label = path.display().to_string();
        let value = parse(&read(path)?, &label)?;
        finish(value, &label)
    }

    /// Layered load with the default layer locations.
    pub fn load_layered(cwd: impl AsRef<Path>) -> Result<LayeredConfig, ConfigError> {
        Self::load_layered_with_options(LayeredConfigOptions::new(cwd))
    }

    pub fn load_layered_with_options(
        options: LayeredConfigOptions,
    ) -> Result<LayeredConfig, ConfigError> {
        let cwd = match options.cwd.canonicalize() {
            Ok(cwd) => cwd,
            Err(err) if err.kind() == io::ErrorKind::NotFound => options.cwd.clone(),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: options.cwd.clone(),
                    source,
                });
            }
        };

        let mut merged = Value::Object(Map::new());
        let mut layers = Vec::new();
        for candidate in discovery::candidates(&options, &cwd) {
            if !candidate.required && !candidate.path.exists() {
                continue;
            }
            let layer = ConfigLayer {
                source: candidate.source,
                path: candidate.path,
            };
            let label = layer.label();
            let value = parse(&read(&layer.path)?, &label)?;
            schema::check_layer(&value, &label)?;
            merge::overlay(&mut merged, value);
            debug!("config layer applied ({})", label);
            layers.push(layer);
        }

        let config = finish(merged, "merged config")?;
        info!(
            "config loaded (layers={}, cwd={})",
            layers.len(),
            cwd.display()
        );
        Ok(LayeredConfig { config, layers })
    }
}

fn read(path: &Path) -> Result<String, ConfigError> {
    fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })
}

fn parse(contents: &str, layer: &str) -> Result<Value, ConfigError> {
    json5::from_str(contents).map_err(|source| ConfigError::Syntax {
        layer: layer.to_string(),
        source,
    })
}

fn finish(value: Value, layer: &str) -> Result<OrganixConfig, ConfigError> {
    schema::check_layer(&value, layer)?;
    let config: OrganixConfig = serde_json::from_value(value)?;
    config.validate()?;
    Ok(config)
}
