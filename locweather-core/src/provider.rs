use crate::{FetchError, WeatherQuery, WeatherResponse};
use async_trait::async_trait;
use std::fmt::Debug;

pub mod openweather;

pub use openweather::OpenWeatherProvider;

/// A remote source of current weather.
#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    /// Issue exactly one request for `query`. No retries.
    async fn current_weather(&self, query: &WeatherQuery) -> Result<WeatherResponse, FetchError>;
}
