// SPDX-License-Identifier: GPL-3.0-only

//! Application-wide constants

/// Android-style uid reserved for the camera/display service clients
pub const AID_AUTOMOTIVE_EVS: u32 = 1062;

/// Service name the hardware provider registers under by default
pub const DEFAULT_PROVIDER_NAME: &str = "EvsEnumeratorHw";

/// Directory name used under the user's config dir
pub const CONFIG_DIR_NAME: &str = "camera-broker";

/// Config file name inside [`CONFIG_DIR_NAME`]
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Camera ids the simulated provider exposes when nothing is configured
pub const DEFAULT_SIMULATED_CAMERAS: [&str; 2] = ["cam0", "cam1"];

/// Application version, with git revision when built from a checkout
pub fn version() -> &'static str {
    env!("GIT_VERSION")
}

/// Default location of the config file, if the platform has a config dir
pub fn default_config_path() -> Option<std::path::PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}
