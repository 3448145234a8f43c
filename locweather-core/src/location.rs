//! Location resolution.
//!
//! A [`LocationService`] is the device-side capability (is it on, may we use
//! it, stream of fixes). [`LocationResolver`] turns that into a single
//! awaitable result with the precondition order fixed: availability first,
//! then permission, then the first fix.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::{fmt::Debug, sync::Arc, time::Duration};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::{error::LocationError, model::Coordinates};

pub mod fixed;
pub mod ip;

pub use fixed::FixedLocation;
pub use ip::IpLocation;

/// Requested accuracy for location updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Accuracy {
    #[default]
    High,
    Balanced,
    Low,
}

/// Result of asking for location permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionOutcome {
    Granted,
    /// Denied for now; the caller should explain why before asking again.
    RationaleNeeded,
    /// The user opted out of prompts; only a settings change can undo it.
    PermanentlyDenied,
}

/// One item of a location subscription.
pub type LocationUpdate = Result<Coordinates, LocationError>;

/// Receiving end of a location subscription. Dropping it unsubscribes.
pub type LocationUpdates = mpsc::Receiver<LocationUpdate>;

#[async_trait]
pub trait LocationService: Send + Sync + Debug {
    async fn is_enabled(&self) -> bool;

    async fn request_permission(&self) -> PermissionOutcome;

    /// Start streaming location updates.
    async fn subscribe(&self, accuracy: Accuracy) -> Result<LocationUpdates, LocationError>;
}

#[derive(Debug, Clone)]
pub struct LocationResolver {
    service: Arc<dyn LocationService>,
    accuracy: Accuracy,
    fix_timeout: Duration,
}

pub const DEFAULT_FIX_TIMEOUT: Duration = Duration::from_secs(15);

impl LocationResolver {
    pub fn new(service: Arc<dyn LocationService>) -> Self {
        Self { service, accuracy: Accuracy::default(), fix_timeout: DEFAULT_FIX_TIMEOUT }
    }

    pub fn with_accuracy(mut self, accuracy: Accuracy) -> Self {
        self.accuracy = accuracy;
        self
    }

    pub fn with_fix_timeout(mut self, fix_timeout: Duration) -> Self {
        self.fix_timeout = fix_timeout;
        self
    }

    /// Resolve the current position once.
    ///
    /// The subscription is dropped as soon as the first update arrives, the
    /// fix timeout elapses, or `cancel` fires.
    pub async fn resolve(&self, cancel: &CancellationToken) -> Result<Coordinates, LocationError> {
        if !self.service.is_enabled().await {
            tracing::warn!("Location provider is turned off");
            return Err(LocationError::Unavailable);
        }

        match self.service.request_permission().await {
            PermissionOutcome::Granted => {}
            PermissionOutcome::RationaleNeeded => {
                tracing::info!("Location permission needs a rationale before asking again");
                return Err(LocationError::PermissionDenied { permanent: false });
            }
            PermissionOutcome::PermanentlyDenied => {
                tracing::warn!("Location permission permanently denied");
                return Err(LocationError::PermissionDenied { permanent: true });
            }
        }

        let mut updates = self.service.subscribe(self.accuracy).await?;

        let fix = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(LocationError::Cancelled),
            next = tokio::time::timeout(self.fix_timeout, updates.recv()) => match next {
                Err(_) => Err(LocationError::Timeout),
                Ok(None) => Err(LocationError::NoFix),
                Ok(Some(update)) => update,
            },
        };
        drop(updates);

        if let Ok(coordinates) = &fix {
            tracing::info!(
                latitude = coordinates.latitude,
                longitude = coordinates.longitude,
                "Resolved current location"
            );
        }

        fix
    }
}
