//! Location → weather orchestration.

use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::{
    config::{Config, LocationSource, ProbeKind},
    connectivity::{AssumeOnline, ConnectivityProbe, SysfsProbe},
    error::WorkflowError,
    fetcher::WeatherFetcher,
    location::{FixedLocation, IpLocation, LocationResolver, LocationService},
    model::{Coordinates, Units, WeatherQuery, WeatherResponse},
    provider::OpenWeatherProvider,
};

/// Resolves the current position, then fetches the weather for it.
///
/// Steps run strictly one after the other and nothing is retried; only the
/// coordinates flow from the first step into the second.
#[derive(Debug, Clone)]
pub struct WeatherWorkflow {
    resolver: LocationResolver,
    fetcher: WeatherFetcher,
    units: Units,
    api_key: String,
}

impl WeatherWorkflow {
    pub fn new(
        resolver: LocationResolver,
        fetcher: WeatherFetcher,
        units: Units,
        api_key: impl Into<String>,
    ) -> Self {
        Self { resolver, fetcher, units, api_key: api_key.into() }
    }

    /// Wire the workflow from configuration.
    ///
    /// `location_override` replaces the configured location source with
    /// fixed coordinates.
    pub fn from_config(config: &Config, location_override: Option<Coordinates>) -> anyhow::Result<Self> {
        let api_key = config.api_key()?;

        let provider = OpenWeatherProvider::new(&config.api.base_url, config.request_timeout())?;
        let fetcher = WeatherFetcher::new(Arc::new(provider), probe_from_config(config));

        Ok(Self::new(
            resolver_from_config(config, location_override)?,
            fetcher,
            config.units(),
            api_key,
        ))
    }

    /// Use `units` for this workflow only; the configuration is untouched.
    pub fn with_units(mut self, units: Units) -> Self {
        self.units = units;
        self
    }

    pub fn units(&self) -> Units {
        self.units
    }

    /// Run both steps under a child of `cancel`; anything still in flight
    /// when this returns or is dropped is cancelled with it.
    pub async fn run(&self, cancel: &CancellationToken) -> Result<WeatherResponse, WorkflowError> {
        let scope = cancel.child_token();
        let _guard = scope.clone().drop_guard();

        let coordinates = self.resolver.resolve(&scope).await?;
        let query = WeatherQuery::new(coordinates, self.units, self.api_key.clone());

        Ok(self.fetcher.fetch(query, &scope).await?)
    }
}

/// Only the location step, for callers that just need coordinates.
pub fn resolver_from_config(
    config: &Config,
    location_override: Option<Coordinates>,
) -> anyhow::Result<LocationResolver> {
    let service: Arc<dyn LocationService> = match (location_override, config.location.source) {
        (Some(coords), _) => Arc::new(FixedLocation::new(Some(coords))),
        (None, LocationSource::Fixed) => {
            let coords = config.fixed_coordinates()?.filter(|_| config.location.enabled);
            Arc::new(FixedLocation::new(coords))
        }
        (None, LocationSource::Ip) => Arc::new(IpLocation::new(
            config.location.lookup_url.clone(),
            config.location.enabled,
            config.location.consent,
            config.lookup_timeout(),
        )?),
    };

    Ok(LocationResolver::new(service)
        .with_accuracy(config.location.accuracy)
        .with_fix_timeout(config.fix_timeout()))
}

fn probe_from_config(config: &Config) -> Arc<dyn ConnectivityProbe> {
    match config.connectivity.probe {
        ProbeKind::Sysfs => Arc::new(SysfsProbe::new()),
        ProbeKind::AssumeOnline => Arc::new(AssumeOnline),
    }
}
