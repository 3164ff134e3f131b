//! Station configuration file

use anyhow::{Context, Result};
use cosbit_link::rx::RxConfig;
use cosbit_link::tx::TxConfig;
use cosbit_modem::afsk::AfskConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Everything a station needs to transmit and receive, as stored in TOML:
///
/// ```toml
/// [modem]
/// amplitude = 0.5
///
/// [transmit]
/// chirp = true
///
/// [receive]
/// sync_tolerance = 0
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StationConfig {
    pub modem: AfskConfig,
    pub transmit: TxConfig,
    pub receive: RxConfig,
}

impl StationConfig {
    /// Load configuration from TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let config: Self = toml::from_str(&content).context("Failed to parse config file")?;

        Ok(config)
    }

    /// Load `path` if given, defaults otherwise
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    /// Save configuration to TOML file
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {:?}", path))?;

        Ok(())
    }
}
