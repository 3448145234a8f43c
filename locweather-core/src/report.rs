//! Display-ready rendering of a [`WeatherResponse`].

use chrono::{DateTime, Local, Utc};
use chrono_tz::Tz;
use serde::Serialize;

use crate::model::{Units, WeatherResponse};

/// Time zone used for sunrise/sunset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplayZone {
    #[default]
    Local,
    Named(Tz),
}

impl DisplayZone {
    pub fn parse(name: &str) -> anyhow::Result<Self> {
        name.parse::<Tz>()
            .map(DisplayZone::Named)
            .map_err(|e| anyhow::anyhow!("Unknown time zone '{name}': {e}"))
    }

    /// `HH:mm` wall-clock time in this zone.
    pub fn clock(&self, instant: DateTime<Utc>) -> String {
        match self {
            DisplayZone::Local => instant.with_timezone(&Local).format("%H:%M").to_string(),
            DisplayZone::Named(tz) => instant.with_timezone(tz).format("%H:%M").to_string(),
        }
    }
}

/// The fixed set of fields shown to the user.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeatherReport {
    pub condition: String,
    pub description: String,
    pub also: Vec<String>,
    pub temperature: String,
    pub humidity: String,
    pub min: String,
    pub max: String,
    pub wind: String,
    pub location: String,
    pub country: String,
    pub sunrise: String,
    pub sunset: String,
}

impl WeatherReport {
    pub fn build(response: &WeatherResponse, units: Units, zone: &DisplayZone) -> Self {
        let (condition, description) = response
            .primary_condition()
            .map(|c| (c.main.clone(), c.description.clone()))
            .unwrap_or_else(|| ("Unknown".to_string(), String::new()));

        let also = response
            .secondary_conditions()
            .iter()
            .map(|c| c.description.clone())
            .collect();

        Self {
            condition,
            description,
            also,
            temperature: format!("{}{}", response.temperature, units.temperature_symbol()),
            humidity: format!("{} per cent", response.humidity_pct),
            min: format!("{} min", response.temp_min),
            max: format!("{} max", response.temp_max),
            wind: format!("{} {}", response.wind_speed, units.speed_symbol()),
            location: response.location_name.clone(),
            country: response.country_code.clone(),
            sunrise: zone.clock(response.sunrise),
            sunset: zone.clock(response.sunset),
        }
    }
}

impl std::fmt::Display for WeatherReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{}, {}", self.location, self.country)?;
        if self.description.is_empty() {
            writeln!(f, "{}", self.condition)?;
        } else {
            writeln!(f, "{}: {}", self.condition, self.description)?;
        }
        if !self.also.is_empty() {
            writeln!(f, "Also: {}", self.also.join(", "))?;
        }
        writeln!(f, "Temperature: {} ({} / {})", self.temperature, self.min, self.max)?;
        writeln!(f, "Humidity:    {}", self.humidity)?;
        writeln!(f, "Wind:        {}", self.wind)?;
        write!(f, "Sunrise:     {}   Sunset: {}", self.sunrise, self.sunset)
    }
}
