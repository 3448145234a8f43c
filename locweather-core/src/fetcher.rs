//! Weather fetching with a connectivity precondition.
//!
//! Each call goes through a fresh [`FetchRequest`], which moves
//! `Idle -> Requesting -> Succeeded | Failed` and is consumed by
//! [`FetchRequest::run`], so a settled request is never re-entered.

use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::{
    connectivity::ConnectivityProbe,
    error::FetchError,
    model::{WeatherQuery, WeatherResponse},
    provider::WeatherProvider,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    Idle,
    Requesting,
    Succeeded,
    Failed,
}

impl RequestState {
    pub fn is_settled(&self) -> bool {
        matches!(self, RequestState::Succeeded | RequestState::Failed)
    }
}

#[derive(Debug, Clone)]
pub struct WeatherFetcher {
    provider: Arc<dyn WeatherProvider>,
    connectivity: Arc<dyn ConnectivityProbe>,
}

impl WeatherFetcher {
    pub fn new(provider: Arc<dyn WeatherProvider>, connectivity: Arc<dyn ConnectivityProbe>) -> Self {
        Self { provider, connectivity }
    }

    /// Prepare a request without starting it.
    pub fn request(&self, query: WeatherQuery) -> FetchRequest {
        let (state, _) = watch::channel(RequestState::Idle);
        FetchRequest {
            provider: Arc::clone(&self.provider),
            connectivity: Arc::clone(&self.connectivity),
            query,
            state,
        }
    }

    pub async fn fetch(
        &self,
        query: WeatherQuery,
        cancel: &CancellationToken,
    ) -> Result<WeatherResponse, FetchError> {
        self.request(query).run(cancel).await
    }
}

#[derive(Debug)]
pub struct FetchRequest {
    provider: Arc<dyn WeatherProvider>,
    connectivity: Arc<dyn ConnectivityProbe>,
    query: WeatherQuery,
    state: watch::Sender<RequestState>,
}

impl FetchRequest {
    /// Observe state transitions of this request.
    pub fn subscribe(&self) -> watch::Receiver<RequestState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> RequestState {
        *self.state.borrow()
    }

    pub async fn run(self, cancel: &CancellationToken) -> Result<WeatherResponse, FetchError> {
        if !self.connectivity.is_network_available().await {
            tracing::warn!("No internet connection available");
            self.state.send_replace(RequestState::Failed);
            return Err(FetchError::NoConnectivity);
        }

        self.state.send_replace(RequestState::Requesting);

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(FetchError::Cancelled),
            result = self.provider.current_weather(&self.query) => result,
        };

        let settled = match &result {
            Ok(response) => {
                tracing::info!(location = %response.location_name, "Weather fetched");
                RequestState::Succeeded
            }
            Err(e) => {
                tracing::warn!(error = %e, "Weather fetch failed");
                RequestState::Failed
            }
        };
        self.state.send_replace(settled);

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        connectivity::Transport,
        model::{Coordinates, Units},
    };
    use async_trait::async_trait;
    use chrono::DateTime;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug)]
    struct Probe(bool);

    #[async_trait]
    impl ConnectivityProbe for Probe {
        async fn active_transports(&self) -> Vec<Transport> {
            if self.0 { vec![Transport::Wifi] } else { Vec::new() }
        }
    }

    #[derive(Debug, Default)]
    struct CountingProvider {
        calls: AtomicUsize,
        hang: bool,
    }

    #[async_trait]
    impl WeatherProvider for CountingProvider {
        async fn current_weather(&self, _: &WeatherQuery) -> Result<WeatherResponse, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.hang {
                std::future::pending::<()>().await;
            }
            let ts = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
            Ok(WeatherResponse {
                conditions: vec![],
                temperature: 1.0,
                humidity_pct: 2,
                temp_min: 0.0,
                temp_max: 3.0,
                wind_speed: 4.0,
                location_name: "Somewhere".into(),
                country_code: "XX".into(),
                sunrise: ts,
                sunset: ts,
            })
        }
    }

    fn query() -> WeatherQuery {
        WeatherQuery::new(Coordinates::new(10.0, 20.0).unwrap(), Units::Metric, "KEY")
    }

    #[tokio::test]
    async fn offline_fails_fast_without_calling_provider() {
        let provider = Arc::new(CountingProvider::default());
        let fetcher = WeatherFetcher::new(provider.clone(), Arc::new(Probe(false)));

        let request = fetcher.request(query());
        let states = request.subscribe();
        let err = request.run(&CancellationToken::new()).await.unwrap_err();

        assert!(matches!(err, FetchError::NoConnectivity));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
        assert_eq!(*states.borrow(), RequestState::Failed);
    }

    #[tokio::test]
    async fn success_settles_in_succeeded() {
        let provider = Arc::new(CountingProvider::default());
        let fetcher = WeatherFetcher::new(provider.clone(), Arc::new(Probe(true)));

        let request = fetcher.request(query());
        assert_eq!(request.state(), RequestState::Idle);
        let states = request.subscribe();

        let response = request.run(&CancellationToken::new()).await.unwrap();
        assert_eq!(response.location_name, "Somewhere");
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
        assert_eq!(*states.borrow(), RequestState::Succeeded);
        assert!(states.borrow().is_settled());
    }

    #[tokio::test]
    async fn each_fetch_is_a_fresh_request() {
        let provider = Arc::new(CountingProvider::default());
        let fetcher = WeatherFetcher::new(provider.clone(), Arc::new(Probe(true)));

        let first = fetcher.request(query());
        let second = fetcher.request(query());
        first.run(&CancellationToken::new()).await.unwrap();

        assert_eq!(second.state(), RequestState::Idle);
    }

    #[tokio::test]
    async fn already_cancelled_token_wins_over_a_ready_provider() {
        let provider = Arc::new(CountingProvider::default());
        let fetcher = WeatherFetcher::new(provider.clone(), Arc::new(Probe(true)));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = fetcher.fetch(query(), &cancel).await.unwrap_err();

        assert!(matches!(err, FetchError::Cancelled));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn cancellation_fails_the_request() {
        let provider = Arc::new(CountingProvider { hang: true, ..Default::default() });
        let fetcher = WeatherFetcher::new(provider, Arc::new(Probe(true)));
        let cancel = CancellationToken::new();

        let request = fetcher.request(query());
        let mut states = request.subscribe();
        let task = tokio::spawn({
            let cancel = cancel.clone();
            async move { request.run(&cancel).await }
        });

        states.wait_for(|s| *s == RequestState::Requesting).await.unwrap();
        cancel.cancel();

        let err = task.await.unwrap().unwrap_err();
        assert!(matches!(err, FetchError::Cancelled));
        assert_eq!(*states.borrow(), RequestState::Failed);
    }
}
