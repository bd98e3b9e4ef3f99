use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::model::{Coordinate, WeatherKitRequest};

/// Apple developer credentials used to sign WeatherKit tokens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credentials {
    pub team_id: String,
    pub service_id: String,
    pub key_id: String,
    /// Path to the `AuthKey_<key id>.p8` file downloaded from Apple.
    pub key_path: PathBuf,
}

/// Where and how to report the weather.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default = "default_language")]
    pub language: String,
    pub timezone: String,
    pub country_code: String,
}

fn default_language() -> String {
    "en".to_string()
}

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// [credentials]
/// team_id = "TEAM123"
/// service_id = "com.example.mirror"
/// key_id = "KEY123"
/// key_path = "/home/pi/AuthKey_KEY123.p8"
///
/// [location]
/// latitude = 51.5
/// longitude = -0.12
/// timezone = "Europe/London"
/// country_code = "GB"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    pub credentials: Option<Credentials>,
    pub location: Option<Location>,
}

impl Config {
    pub fn credentials(&self) -> Result<&Credentials> {
        self.credentials.as_ref().ok_or_else(|| {
            anyhow!(
                "No WeatherKit credentials configured.\n\
                 Hint: run `weatherkit configure` and enter your team, service and key ids."
            )
        })
    }

    pub fn location(&self) -> Result<&Location> {
        self.location.as_ref().ok_or_else(|| {
            anyhow!(
                "No location configured.\n\
                 Hint: run `weatherkit configure` and enter latitude and longitude."
            )
        })
    }

    pub fn set_credentials(&mut self, credentials: Credentials) {
        self.credentials = Some(credentials);
    }

    pub fn set_location(&mut self, location: Location) {
        self.location = Some(location);
    }

    /// Build the request payload the front-end would send for this config.
    pub fn to_request(&self, instance_id: Option<Value>) -> Result<WeatherKitRequest> {
        let credentials = self.credentials()?;
        let location = self.location()?;

        Ok(WeatherKitRequest {
            team_id: Some(credentials.team_id.clone()),
            service_id: Some(credentials.service_id.clone()),
            key_id: Some(credentials.key_id.clone()),
            latitude: Some(Coordinate::from(location.latitude)),
            longitude: Some(Coordinate::from(location.longitude)),
            language: Some(location.language.clone()),
            key_path: Some(credentials.key_path.clone()),
            timezone: Some(location.timezone.clone()),
            country_code: Some(location.country_code.clone()),
            instance_id,
        })
    }

    /// Load config from disk, or return an empty default if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_file_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_file_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "weatherkit", "weatherkit")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }
}
