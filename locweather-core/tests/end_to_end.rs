//! Full location → weather runs against mock servers.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use locweather_core::{
    Coordinates, DisplayZone, FetchError, LocationError, LocationResolver, OpenWeatherProvider,
    Units, WeatherFetcher, WeatherReport, WeatherResponse, WeatherWorkflow, WorkflowError,
    connectivity::{AssumeOnline, ConnectivityProbe, Transport},
    location::{FixedLocation, IpLocation, ip::Consent},
};
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Debug)]
struct Offline;

#[async_trait]
impl ConnectivityProbe for Offline {
    async fn active_transports(&self) -> Vec<Transport> {
        Vec::new()
    }
}

fn london_reply() -> serde_json::Value {
    serde_json::json!({
        "weather": [{ "main": "Clear", "description": "clear sky" }],
        "main": { "temp": 15.2, "humidity": 60, "temp_min": 14, "temp_max": 16 },
        "wind": { "speed": 3.1 },
        "name": "London",
        "sys": { "country": "GB", "sunrise": 1700000000, "sunset": 1700030000 }
    })
}

fn ip_location(geo: &MockServer, consent: Option<Consent>, timeout: Duration) -> IpLocation {
    IpLocation::new(format!("{}/json", geo.uri()), true, consent, timeout).unwrap()
}

fn workflow(
    server: &MockServer,
    location: FixedLocation,
    probe: Arc<dyn ConnectivityProbe>,
) -> WeatherWorkflow {
    let provider = OpenWeatherProvider::new(server.uri(), Duration::from_secs(5)).unwrap();
    WeatherWorkflow::new(
        LocationResolver::new(Arc::new(location)),
        WeatherFetcher::new(Arc::new(provider), probe),
        Units::Metric,
        "TEST_KEY",
    )
}

#[tokio::test]
async fn london_scenario() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/weather"))
        .and(query_param("lat", "51.5074"))
        .and(query_param("lon", "-0.1278"))
        .and(query_param("units", "metric"))
        .respond_with(ResponseTemplate::new(200).set_body_json(london_reply()))
        .expect(1)
        .mount(&server)
        .await;

    let coords = Coordinates::new(51.5074, -0.1278).unwrap();
    let workflow = workflow(&server, FixedLocation::new(Some(coords)), Arc::new(AssumeOnline));

    let response = workflow.run(&CancellationToken::new()).await.unwrap();

    let condition = response.primary_condition().unwrap();
    assert_eq!(condition.main, "Clear");
    assert_eq!(condition.description, "clear sky");
    assert_eq!(response.temperature, 15.2);
    assert_eq!(response.humidity_pct, 60);
    assert_eq!(response.temp_min, 14.0);
    assert_eq!(response.temp_max, 16.0);
    assert_eq!(response.wind_speed, 3.1);
    assert_eq!(response.location_name, "London");
    assert_eq!(response.country_code, "GB");

    let zone = DisplayZone::parse("Europe/London").unwrap();
    let report = WeatherReport::build(&response, workflow.units(), &zone);
    assert_eq!(report.sunrise, "22:13");
    assert_eq!(report.sunset, "06:33");
    assert_eq!(report.temperature, "15.2°C");
}

#[tokio::test]
async fn response_survives_json_roundtrip() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/weather"))
        .respond_with(ResponseTemplate::new(200).set_body_json(london_reply()))
        .mount(&server)
        .await;

    let coords = Coordinates::new(-33.8688, 151.2093).unwrap();
    let workflow = workflow(&server, FixedLocation::new(Some(coords)), Arc::new(AssumeOnline));
    let response = workflow.run(&CancellationToken::new()).await.unwrap();

    let encoded = serde_json::to_string(&response).unwrap();
    let decoded: WeatherResponse = serde_json::from_str(&encoded).unwrap();
    assert_eq!(decoded, response);
}

#[tokio::test]
async fn offline_never_reaches_the_api() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(london_reply()))
        .expect(0)
        .mount(&server)
        .await;

    let coords = Coordinates::new(51.5074, -0.1278).unwrap();
    let workflow = workflow(&server, FixedLocation::new(Some(coords)), Arc::new(Offline));

    let err = workflow.run(&CancellationToken::new()).await.unwrap_err();
    assert!(matches!(err, WorkflowError::Fetch(FetchError::NoConnectivity)));
}

#[tokio::test]
async fn disabled_location_never_reaches_the_api() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(london_reply()))
        .expect(0)
        .mount(&server)
        .await;

    let workflow = workflow(&server, FixedLocation::default(), Arc::new(AssumeOnline));

    let err = workflow.run(&CancellationToken::new()).await.unwrap_err();
    assert!(matches!(err, WorkflowError::Location(LocationError::Unavailable)));
}

#[tokio::test]
async fn cancelled_before_start() {
    let server = MockServer::start().await;
    let coords = Coordinates::new(51.5074, -0.1278).unwrap();
    let workflow = workflow(&server, FixedLocation::new(Some(coords)), Arc::new(AssumeOnline));

    let cancel = CancellationToken::new();
    cancel.cancel();

    // The fixed source has a fix ready, but cancellation is checked first.
    let err = workflow.run(&cancel).await.unwrap_err();
    assert!(matches!(err, WorkflowError::Location(LocationError::Cancelled)));
}

#[tokio::test]
async fn ip_location_feeds_the_weather_request() {
    let geo = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": "success",
            "country": "United Kingdom",
            "lat": 51.5074,
            "lon": -0.1278
        })))
        .expect(1)
        .mount(&geo)
        .await;

    let weather = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/weather"))
        .and(query_param("lat", "51.5074"))
        .and(query_param("lon", "-0.1278"))
        .respond_with(ResponseTemplate::new(200).set_body_json(london_reply()))
        .expect(1)
        .mount(&weather)
        .await;

    let location = ip_location(&geo, Some(Consent::Granted), Duration::from_secs(5));
    let provider = OpenWeatherProvider::new(weather.uri(), Duration::from_secs(5)).unwrap();
    let workflow = WeatherWorkflow::new(
        LocationResolver::new(Arc::new(location)),
        WeatherFetcher::new(Arc::new(provider), Arc::new(AssumeOnline)),
        Units::Metric,
        "TEST_KEY",
    );

    let response = workflow.run(&CancellationToken::new()).await.unwrap();
    assert_eq!(response.location_name, "London");
}

#[tokio::test]
async fn ip_lookup_failure_is_reported() {
    let geo = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": "fail",
            "message": "reserved range"
        })))
        .mount(&geo)
        .await;

    let location = ip_location(&geo, Some(Consent::Granted), Duration::from_secs(5));
    let resolver = LocationResolver::new(Arc::new(location));

    let err = resolver.resolve(&CancellationToken::new()).await.unwrap_err();
    assert!(matches!(err, LocationError::Lookup(msg) if msg == "reserved range"));
}

#[tokio::test]
async fn ip_lookup_without_consent_is_not_attempted() {
    let geo = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&geo)
        .await;

    let location = ip_location(&geo, None, Duration::from_secs(5));
    let resolver = LocationResolver::new(Arc::new(location));

    let err = resolver.resolve(&CancellationToken::new()).await.unwrap_err();
    assert!(matches!(err, LocationError::PermissionDenied { permanent: false }));
}

#[tokio::test]
async fn slow_ip_lookup_honours_the_lookup_timeout() {
    let geo = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/json"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "status": "success", "lat": 1.0, "lon": 2.0 }))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&geo)
        .await;

    let location = ip_location(&geo, Some(Consent::Granted), Duration::from_millis(200));
    let resolver = LocationResolver::new(Arc::new(location)).with_fix_timeout(Duration::from_secs(10));

    // The HTTP timeout fires long before the fix timeout would.
    let err = resolver.resolve(&CancellationToken::new()).await.unwrap_err();
    assert!(matches!(err, LocationError::Lookup(_)), "unexpected error: {err}");
}
