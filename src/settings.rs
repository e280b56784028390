//! # Settings
//!
//! The application is configured with a single TOML file:
//!
//! ```toml
//! [device]
//! id = "ecowitt"
//! name = "Garden Station"
//! enabled = true
//! ```

use crate::prelude::*;
use anyhow::Context;
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Reads the settings file.
pub fn read<P: AsRef<Path>>(path: P) -> anyhow::Result<Settings> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).with_context(|| format!("failed to read `{}`", path.display()))?;
    parse(&contents)
}

pub fn parse(contents: &str) -> anyhow::Result<Settings> {
    Ok(toml::from_str(contents)?)
}

#[derive(Deserialize, Debug, Clone)]
pub struct Settings {
    pub device: DeviceSettings,
}

/// The weather station device.
#[derive(Deserialize, Debug, Clone)]
pub struct DeviceSettings {
    /// Unique device ID, the sensors get bound to it.
    pub id: String,

    #[serde(default = "default_name")]
    pub name: String,

    /// Disabled station ignores all pushes.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_name() -> String {
    "Weather Station".into()
}

const fn default_enabled() -> bool {
    true
}

impl From<&DeviceSettings> for ParentDevice {
    fn from(settings: &DeviceSettings) -> Self {
        Self {
            id: settings.id.clone(),
            name: settings.name.clone(),
            enabled: settings.enabled,
        }
    }
}
