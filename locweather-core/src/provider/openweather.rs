use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use crate::{
    error::FetchError,
    model::{WeatherCondition, WeatherQuery, WeatherResponse},
};

use super::WeatherProvider;

pub const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org/data/2.5";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    base_url: String,
    http: Client,
}

impl OpenWeatherProvider {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, FetchError> {
        let http = Client::builder().timeout(timeout).build().map_err(FetchError::Transport)?;

        Ok(Self { base_url: base_url.into().trim_end_matches('/').to_string(), http })
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherProvider {
    async fn current_weather(&self, query: &WeatherQuery) -> Result<WeatherResponse, FetchError> {
        let url = format!("{}/weather", self.base_url);
        let lat = query.coordinates.latitude.to_string();
        let lon = query.coordinates.longitude.to_string();

        tracing::debug!(%url, %lat, %lon, units = %query.units, "Requesting current weather");

        let res = self
            .http
            .get(&url)
            .query(&[
                ("lat", lat.as_str()),
                ("lon", lon.as_str()),
                ("units", query.units.as_str()),
                ("appid", query.api_key.as_str()),
            ])
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Weather request failed");
                FetchError::Transport(e)
            })?;

        let status = res.status();
        let body = res.text().await.map_err(FetchError::Transport)?;

        if !status.is_success() {
            let err = FetchError::server(status.as_u16(), truncate_body(&body));
            tracing::error!(status = status.as_u16(), kind = ?err.server_kind(), "Weather API error");
            return Err(err);
        }

        parse_current(&body)
    }
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
    humidity: u8,
    temp_min: f64,
    temp_max: f64,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    main: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct OwWind {
    speed: f64,
}

#[derive(Debug, Deserialize)]
struct OwSys {
    country: String,
    sunrise: i64,
    sunset: i64,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    name: String,
    main: OwMain,
    weather: Vec<OwWeather>,
    wind: OwWind,
    sys: OwSys,
}

/// Parse a `/weather` body. Anything that does not match the schema is a
/// [`FetchError::MalformedResponse`].
pub(crate) fn parse_current(body: &str) -> Result<WeatherResponse, FetchError> {
    let parsed: OwCurrentResponse = serde_json::from_str(body)
        .map_err(|e| FetchError::MalformedResponse(e.to_string()))?;

    let sunrise = unix_to_utc(parsed.sys.sunrise)?;
    let sunset = unix_to_utc(parsed.sys.sunset)?;

    let conditions = parsed
        .weather
        .into_iter()
        .map(|w| WeatherCondition { main: w.main, description: w.description })
        .collect();

    Ok(WeatherResponse {
        conditions,
        temperature: parsed.main.temp,
        humidity_pct: parsed.main.humidity,
        temp_min: parsed.main.temp_min,
        temp_max: parsed.main.temp_max,
        wind_speed: parsed.wind.speed,
        location_name: parsed.name,
        country_code: parsed.sys.country,
        sunrise,
        sunset,
    })
}

fn unix_to_utc(ts: i64) -> Result<DateTime<Utc>, FetchError> {
    DateTime::from_timestamp(ts, 0)
        .ok_or_else(|| FetchError::MalformedResponse(format!("timestamp {ts} out of range")))
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
