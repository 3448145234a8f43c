use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::mpsc;

use crate::{error::LocationError, model::Coordinates};

use super::{Accuracy, LocationService, LocationUpdate, LocationUpdates, PermissionOutcome};

pub const DEFAULT_LOOKUP_URL: &str = "http://ip-api.com/json";
pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_secs(10);

/// What the user answered when asked whether their IP may be used to
/// locate them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Consent {
    Granted,
    Denied,
    /// Denied and asked not to be prompted again.
    Never,
}

impl Consent {
    fn outcome(consent: Option<Consent>) -> PermissionOutcome {
        match consent {
            Some(Consent::Granted) => PermissionOutcome::Granted,
            Some(Consent::Never) => PermissionOutcome::PermanentlyDenied,
            Some(Consent::Denied) | None => PermissionOutcome::RationaleNeeded,
        }
    }
}

/// Approximate location from an IP geolocation service.
#[derive(Debug, Clone)]
pub struct IpLocation {
    http: Client,
    lookup_url: String,
    enabled: bool,
    consent: Option<Consent>,
}

#[derive(Debug, Deserialize)]
struct IpApiResponse {
    status: String,
    lat: Option<f64>,
    lon: Option<f64>,
    message: Option<String>,
}

impl IpLocation {
    pub fn new(
        lookup_url: impl Into<String>,
        enabled: bool,
        consent: Option<Consent>,
        timeout: Duration,
    ) -> Result<Self, LocationError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LocationError::Lookup(format!("cannot build HTTP client: {e}")))?;

        Ok(Self { http, lookup_url: lookup_url.into(), enabled, consent })
    }

    async fn lookup(http: Client, url: String) -> LocationUpdate {
        let res = http
            .get(&url)
            .send()
            .await
            .map_err(|e| LocationError::Lookup(format!("request to {url} failed: {e}")))?;

        let status = res.status();
        if !status.is_success() {
            return Err(LocationError::Lookup(format!("{url} returned status {status}")));
        }

        let body: IpApiResponse = res
            .json()
            .await
            .map_err(|e| LocationError::Lookup(format!("unreadable response: {e}")))?;

        if body.status != "success" {
            let reason = body.message.unwrap_or_else(|| body.status.clone());
            return Err(LocationError::Lookup(reason));
        }

        match (body.lat, body.lon) {
            (Some(lat), Some(lon)) => Coordinates::new(lat, lon),
            _ => Err(LocationError::Lookup("response carried no coordinates".to_string())),
        }
    }
}

#[async_trait]
impl LocationService for IpLocation {
    async fn is_enabled(&self) -> bool {
        self.enabled
    }

    async fn request_permission(&self) -> PermissionOutcome {
        Consent::outcome(self.consent)
    }

    async fn subscribe(&self, accuracy: Accuracy) -> Result<LocationUpdates, LocationError> {
        if accuracy == Accuracy::High {
            tracing::debug!("IP geolocation is city-level at best");
        }

        let (tx, rx) = mpsc::channel(1);
        let lookup = Self::lookup(self.http.clone(), self.lookup_url.clone());

        tokio::spawn(async move {
            let update = tokio::select! {
                _ = tx.closed() => {
                    tracing::debug!("Location subscription dropped before the lookup finished");
                    return;
                }
                update = lookup => update,
            };

            if let Err(e) = &update {
                tracing::warn!(error = %e, "IP geolocation failed");
            }
            let _ = tx.send(update).await;
        });

        Ok(rx)
    }
}
