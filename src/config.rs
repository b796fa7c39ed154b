// SPDX-License-Identifier: GPL-3.0-only

use crate::backends::hardware::SimulatedProvider;
use crate::constants::{
    AID_AUTOMOTIVE_EVS, DEFAULT_PROVIDER_NAME, DEFAULT_SIMULATED_CAMERAS, default_config_path,
};
use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

/// What happens to the previously active display when a new one is opened
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub enum DisplayTakeover {
    /// Stop routing to the old display; the provider decides whether it dies
    #[default]
    LeaveToProvider,
    /// Shut the old display down and close its hardware handle
    ///
    /// This happens before the new display is requested, so a refused open
    /// leaves no display at all.
    ShutdownPrevious,
}

/// Settings for the in-memory provider used by the CLI
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatedSettings {
    /// Camera ids to expose
    pub cameras: Vec<String>,
    /// Whether a display is available
    pub display: bool,
    /// Keep superseded display handles alive instead of invalidating them
    pub lenient_display: bool,
}

impl Default for SimulatedSettings {
    fn default() -> Self {
        Self {
            cameras: DEFAULT_SIMULATED_CAMERAS.iter().map(|s| s.to_string()).collect(),
            display: true,
            lenient_display: false,
        }
    }
}

impl SimulatedSettings {
    /// Build a provider matching these settings
    pub fn build_provider(&self) -> SimulatedProvider {
        let mut provider = SimulatedProvider::new(self.cameras.iter().cloned());
        if !self.display {
            provider = provider.without_display();
        }
        if self.lenient_display {
            provider = provider.with_lenient_display();
        }
        provider
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Service name of the hardware provider to bind at init
    pub provider_name: String,
    /// Caller uids allowed through the permission gate
    pub allowed_uids: Vec<u32>,
    /// Policy for the previously active display on a new open
    pub display_takeover: DisplayTakeover,
    /// Simulated provider setup (CLI only)
    pub simulated: SimulatedSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            provider_name: DEFAULT_PROVIDER_NAME.to_string(),
            allowed_uids: vec![AID_AUTOMOTIVE_EVS],
            display_takeover: DisplayTakeover::default(),
            simulated: SimulatedSettings::default(),
        }
    }
}

impl Config {
    /// Load configuration
    ///
    /// An explicit `path` must exist. Without one, the default location is
    /// tried and a missing file falls back to defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => match default_config_path() {
                Some(path) if path.exists() => Self::from_file(&path)?,
                _ => {
                    debug!("No config file found, using defaults");
                    Self::default()
                }
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Parse a config file without validating it
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        info!(path = %path.display(), "Loading config");
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// Parse config from a JSON string
    pub fn from_json(contents: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(contents)?)
    }

    /// Reject configurations the broker cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.provider_name.trim().is_empty() {
            return Err(ConfigError::Invalid("provider_name is empty".to_string()));
        }
        if self.allowed_uids.is_empty() {
            // Nobody could ever pass the permission gate
            return Err(ConfigError::Invalid("allowed_uids is empty".to_string()));
        }
        Ok(())
    }
}
