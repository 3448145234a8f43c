use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path, path::PathBuf, time::Duration};

use crate::{
    location::{Accuracy, ip::Consent},
    model::{Coordinates, Units},
    provider::openweather,
    report::DisplayZone,
};

/// Environment variable that overrides the stored API key.
pub const API_KEY_ENV: &str = "LOCWEATHER_API_KEY";

/// Weather API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    /// Absent means "pick from the user's locale".
    pub units: Option<Units>,
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: openweather::DEFAULT_BASE_URL.to_string(),
            units: None,
            timeout_secs: openweather::DEFAULT_TIMEOUT.as_secs(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LocationSource {
    #[default]
    Ip,
    Fixed,
}

/// Where coordinates come from and whether we may use them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationConfig {
    pub source: LocationSource,
    pub enabled: bool,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub consent: Option<Consent>,
    pub lookup_url: String,
    pub lookup_timeout_secs: u64,
    pub accuracy: Accuracy,
    pub fix_timeout_secs: u64,
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            source: LocationSource::default(),
            enabled: true,
            latitude: None,
            longitude: None,
            consent: None,
            lookup_url: crate::location::ip::DEFAULT_LOOKUP_URL.to_string(),
            lookup_timeout_secs: crate::location::ip::DEFAULT_LOOKUP_TIMEOUT.as_secs(),
            accuracy: Accuracy::default(),
            fix_timeout_secs: crate::location::DEFAULT_FIX_TIMEOUT.as_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct DisplayConfig {
    /// IANA name, e.g. "Europe/London". Absent means system local time.
    pub timezone: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProbeKind {
    Sysfs,
    AssumeOnline,
}

impl Default for ProbeKind {
    fn default() -> Self {
        if cfg!(target_os = "linux") { ProbeKind::Sysfs } else { ProbeKind::AssumeOnline }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ConnectivityConfig {
    pub probe: ProbeKind,
}

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// [api]
/// api_key = "..."
/// units = "metric"
///
/// [location]
/// source = "fixed"
/// latitude = 51.5074
/// longitude = -0.1278
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub location: LocationConfig,
    pub display: DisplayConfig,
    pub connectivity: ConnectivityConfig,
}

impl Config {
    /// API key from the environment, falling back to the config file.
    pub fn api_key(&self) -> Result<String> {
        if let Ok(key) = std::env::var(API_KEY_ENV) {
            if !key.trim().is_empty() {
                return Ok(key);
            }
        }

        self.api
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                anyhow!(
                    "No API key configured.\n\
                     Hint: run `locweather configure` or set {API_KEY_ENV}."
                )
            })
    }

    pub fn set_api_key(&mut self, api_key: String) {
        self.api.api_key = Some(api_key);
    }

    pub fn set_consent(&mut self, consent: Consent) {
        self.location.consent = Some(consent);
    }

    /// Configured units, or the locale default.
    pub fn units(&self) -> Units {
        self.api.units.unwrap_or_else(|| locale_region().map_or(Units::Metric, |r| Units::for_region(&r)))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout_secs.max(1))
    }

    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_secs(self.location.lookup_timeout_secs.max(1))
    }

    pub fn fix_timeout(&self) -> Duration {
        Duration::from_secs(self.location.fix_timeout_secs.max(1))
    }

    pub fn display_zone(&self) -> Result<DisplayZone> {
        match self.display.timezone.as_deref() {
            Some(name) => DisplayZone::parse(name),
            None => Ok(DisplayZone::Local),
        }
    }

    /// Coordinates stored for the fixed location source, if both are set.
    pub fn fixed_coordinates(&self) -> Result<Option<Coordinates>> {
        match (self.location.latitude, self.location.longitude) {
            (Some(lat), Some(lon)) => Ok(Some(
                Coordinates::new(lat, lon).context("Invalid coordinates in config")?,
            )),
            _ => Ok(None),
        }
    }

    /// Load config from disk, or return an empty default if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_file_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            // First run: no config file, return empty.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::config_file_path()?;
        self.save_to(&path)?;
        Ok(path)
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
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "locweather", "locweather")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }
}

/// Region part of the POSIX locale, e.g. "US" from `en_US.UTF-8`.
pub fn locale_region() -> Option<String> {
    ["LC_ALL", "LC_MEASUREMENT", "LANG"]
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .find(|v| !v.is_empty())
        .and_then(|v| region_of(&v))
}

fn region_of(locale: &str) -> Option<String> {
    let base = locale.split(['.', '@']).next()?;
    let (_, region) = base.split_once(['_', '-'])?;
    (!region.is_empty()).then(|| region.to_uppercase())
}
