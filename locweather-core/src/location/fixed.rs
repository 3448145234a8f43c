use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::{error::LocationError, model::Coordinates};

use super::{Accuracy, LocationService, LocationUpdates, PermissionOutcome};

/// Coordinates supplied up front, e.g. from the config file or `--lat/--lon`.
///
/// Counts as "turned off" when no coordinates were given.
#[derive(Debug, Clone, Default)]
pub struct FixedLocation {
    coordinates: Option<Coordinates>,
}

impl FixedLocation {
    pub fn new(coordinates: Option<Coordinates>) -> Self {
        Self { coordinates }
    }
}

#[async_trait]
impl LocationService for FixedLocation {
    async fn is_enabled(&self) -> bool {
        self.coordinates.is_some()
    }

    async fn request_permission(&self) -> PermissionOutcome {
        PermissionOutcome::Granted
    }

    async fn subscribe(&self, _accuracy: Accuracy) -> Result<LocationUpdates, LocationError> {
        let coordinates = self.coordinates.ok_or(LocationError::Unavailable)?;
        let (tx, rx) = mpsc::channel(1);
        // Capacity 1 and a fresh channel: this cannot be full.
        let _ = tx.try_send(Ok(coordinates));
        Ok(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn without_coordinates_it_is_disabled() {
        let service = FixedLocation::default();
        assert!(!service.is_enabled().await);
        assert!(matches!(
            service.subscribe(Accuracy::High).await,
            Err(LocationError::Unavailable)
        ));
    }

    #[tokio::test]
    async fn yields_one_fix_then_ends() {
        let coords = Coordinates::new(51.5074, -0.1278).unwrap();
        let service = FixedLocation::new(Some(coords));

        assert!(service.is_enabled().await);
        assert_eq!(service.request_permission().await, PermissionOutcome::Granted);

        let mut updates = service.subscribe(Accuracy::Low).await.unwrap();
        assert_eq!(updates.recv().await.unwrap().unwrap(), coords);
        assert!(updates.recv().await.is_none());
    }
}
