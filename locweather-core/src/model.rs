use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::LocationError;

/// A (latitude, longitude) pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    /// Build coordinates, rejecting values outside the WGS84 ranges.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, LocationError> {
        let valid = latitude.is_finite()
            && longitude.is_finite()
            && (-90.0..=90.0).contains(&latitude)
            && (-180.0..=180.0).contains(&longitude);

        if !valid {
            return Err(LocationError::InvalidCoordinates { latitude, longitude });
        }

        Ok(Self { latitude, longitude })
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}", self.latitude, self.longitude)
    }
}

/// Unit system understood by the weather API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    #[default]
    Metric,
    Imperial,
    Standard,
}

impl Units {
    pub fn as_str(&self) -> &'static str {
        match self {
            Units::Metric => "metric",
            Units::Imperial => "imperial",
            Units::Standard => "standard",
        }
    }

    pub const fn all() -> &'static [Units] {
        &[Units::Metric, Units::Imperial, Units::Standard]
    }

    pub fn temperature_symbol(&self) -> &'static str {
        match self {
            Units::Metric => "°C",
            Units::Imperial => "°F",
            Units::Standard => "K",
        }
    }

    pub fn speed_symbol(&self) -> &'static str {
        match self {
            Units::Imperial => "mph",
            Units::Metric | Units::Standard => "m/s",
        }
    }

    /// Locale default: the few regions still on Fahrenheit get imperial.
    pub fn for_region(region: &str) -> Self {
        match region.to_uppercase().as_str() {
            "US" | "LR" | "MM" => Units::Imperial,
            _ => Units::Metric,
        }
    }
}

impl fmt::Display for Units {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for Units {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "metric" => Ok(Units::Metric),
            "imperial" => Ok(Units::Imperial),
            "standard" => Ok(Units::Standard),
            _ => Err(anyhow::anyhow!(
                "Unknown units '{value}'. Supported units: metric, imperial, standard."
            )),
        }
    }
}

/// Everything needed for a single weather request.
#[derive(Clone)]
pub struct WeatherQuery {
    pub coordinates: Coordinates,
    pub units: Units,
    pub api_key: String,
}

impl WeatherQuery {
    pub fn new(coordinates: Coordinates, units: Units, api_key: impl Into<String>) -> Self {
        Self { coordinates, units, api_key: api_key.into() }
    }
}

impl fmt::Debug for WeatherQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeatherQuery")
            .field("coordinates", &self.coordinates)
            .field("units", &self.units)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

/// One weather condition entry, e.g. `Clear` / `clear sky`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeatherCondition {
    pub main: String,
    pub description: String,
}

/// Current weather at the queried coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherResponse {
    pub conditions: Vec<WeatherCondition>,
    pub temperature: f64,
    pub humidity_pct: u8,
    pub temp_min: f64,
    pub temp_max: f64,
    pub wind_speed: f64,
    pub location_name: String,
    pub country_code: String,
    pub sunrise: DateTime<Utc>,
    pub sunset: DateTime<Utc>,
}

impl WeatherResponse {
    /// The first condition reported; the API lists the dominant one first.
    pub fn primary_condition(&self) -> Option<&WeatherCondition> {
        self.conditions.first()
    }

    pub fn secondary_conditions(&self) -> &[WeatherCondition] {
        self.conditions.get(1..).unwrap_or(&[])
    }
}
