//! Core library for the `locweather` CLI.
//!
//! This crate defines:
//! - Location resolution (availability, permission, first fix)
//! - Weather fetching with a connectivity precondition
//! - The workflow tying both together, with cancellation
//! - Configuration & presentation helpers
//!
//! It is used by `locweather-cli`, but can also be reused by other binaries or services.

pub mod config;
pub mod connectivity;
pub mod error;
pub mod fetcher;
pub mod location;
pub mod model;
pub mod provider;
pub mod report;
pub mod workflow;

pub use config::Config;
pub use error::{FetchError, LocationError, ServerErrorKind, WorkflowError};
pub use fetcher::{FetchRequest, RequestState, WeatherFetcher};
pub use location::{LocationResolver, LocationService, PermissionOutcome};
pub use model::{Coordinates, Units, WeatherCondition, WeatherQuery, WeatherResponse};
pub use provider::{OpenWeatherProvider, WeatherProvider};
pub use report::{DisplayZone, WeatherReport};
pub use workflow::WeatherWorkflow;
