use anyhow::{Context, anyhow};
use clap::{Args, Parser, Subcommand};
use locweather_core::{
    Config, Coordinates, FetchError, LocationError, Units, WeatherReport, WeatherResponse,
    WeatherWorkflow, WorkflowError, config::LocationSource, location::ip::Consent,
    workflow::resolver_from_config,
};
use std::path::Path;
use tokio_util::sync::CancellationToken;

use crate::prompt;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "locweather", version, about = "Current weather for where you are")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Set the API key, units, location source and time zone.
    Configure,

    /// Show current weather for the resolved location.
    Show {
        #[command(flatten)]
        location: LocationArgs,

        /// Unit system: metric, imperial or standard.
        #[arg(long)]
        units: Option<String>,

        /// Print the raw response as JSON instead of the report.
        #[arg(long)]
        json: bool,
    },

    /// Resolve and print the current coordinates only.
    Locate {
        #[command(flatten)]
        location: LocationArgs,
    },
}

#[derive(Debug, Args)]
pub struct LocationArgs {
    /// Latitude to use instead of the configured location source.
    #[arg(long, requires = "lon", allow_negative_numbers = true)]
    lat: Option<f64>,

    /// Longitude to use instead of the configured location source.
    #[arg(long, requires = "lat", allow_negative_numbers = true)]
    lon: Option<f64>,
}

impl LocationArgs {
    fn coordinates(&self) -> anyhow::Result<Option<Coordinates>> {
        match (self.lat, self.lon) {
            (Some(lat), Some(lon)) => Ok(Some(Coordinates::new(lat, lon)?)),
            _ => Ok(None),
        }
    }
}

/// What a single attempt should produce.
enum Target {
    Weather,
    Location,
}

#[derive(Debug)]
enum Outcome {
    Weather(WeatherResponse, Units),
    Location(Coordinates),
}

/// One-off settings from the command line. Never written back to disk.
#[derive(Debug, Default, Clone, Copy)]
struct Overrides {
    location: Option<Coordinates>,
    units: Option<Units>,
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Configure => {
                let mut cfg = Config::load()?;
                prompt::configure(&mut cfg)?;
                let path = cfg.save()?;
                println!("Configuration saved to {}", path.display());
            }
            Command::Show { location, units, json } => {
                let path = Config::config_file_path()?;
                let mut cfg = Config::load_from(&path)?;
                let overrides = Overrides {
                    location: location.coordinates()?,
                    units: match units {
                        Some(units) => Some(Units::try_from(units.as_str())?),
                        None => None,
                    },
                };

                let cancel = interrupt_token();
                let outcome = execute(
                    &mut cfg,
                    &path,
                    Target::Weather,
                    overrides,
                    prompt::ask_location_consent,
                    &cancel,
                )
                .await?;
                let Outcome::Weather(response, units) = outcome else {
                    return Err(anyhow!("Expected a weather result"));
                };

                if json {
                    let out = serde_json::to_string_pretty(&response)
                        .context("Failed to serialize weather response")?;
                    println!("{out}");
                } else {
                    let zone = cfg.display_zone()?;
                    println!("{}", WeatherReport::build(&response, units, &zone));
                }
            }
            Command::Locate { location } => {
                let path = Config::config_file_path()?;
                let mut cfg = Config::load_from(&path)?;
                let overrides = Overrides { location: location.coordinates()?, units: None };

                let cancel = interrupt_token();
                let outcome = execute(
                    &mut cfg,
                    &path,
                    Target::Location,
                    overrides,
                    prompt::ask_location_consent,
                    &cancel,
                )
                .await?;
                let Outcome::Location(coords) = outcome else {
                    return Err(anyhow!("Expected a location result"));
                };
                println!("{coords}");
            }
        }

        Ok(())
    }
}

/// Token cancelled on Ctrl-C.
fn interrupt_token() -> CancellationToken {
    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });
    cancel
}

/// Run `target`, calling `ask_consent` at most once.
///
/// An answer is stored in `cfg` for the retry and saved to `config_path`.
async fn execute<F>(
    cfg: &mut Config,
    config_path: &Path,
    target: Target,
    overrides: Overrides,
    mut ask_consent: F,
    cancel: &CancellationToken,
) -> anyhow::Result<Outcome>
where
    F: FnMut() -> anyhow::Result<Consent>,
{
    tracing::debug!(?overrides, source = ?cfg.location.source, "Starting");

    let mut prompted = false;
    loop {
        let attempt = match target {
            Target::Weather => {
                let mut workflow = WeatherWorkflow::from_config(cfg, overrides.location)?;
                if let Some(units) = overrides.units {
                    workflow = workflow.with_units(units);
                }
                let units = workflow.units();
                workflow.run(cancel).await.map(|r| Outcome::Weather(r, units))
            }
            Target::Location => resolver_from_config(cfg, overrides.location)?
                .resolve(cancel)
                .await
                .map(Outcome::Location)
                .map_err(WorkflowError::from),
        };

        match attempt {
            Ok(outcome) => return Ok(outcome),
            Err(WorkflowError::Location(LocationError::PermissionDenied { permanent: false }))
                if !prompted
                    && overrides.location.is_none()
                    && cfg.location.source == LocationSource::Ip =>
            {
                prompted = true;
                let consent = ask_consent()?;
                cfg.set_consent(consent);
                save_consent(config_path, consent)?;
            }
            Err(err) => return Err(explain(err)),
        }
    }
}

/// Record `consent` in the file at `path`, leaving its other settings as they are.
fn save_consent(path: &Path, consent: Consent) -> anyhow::Result<()> {
    let mut on_disk = Config::load_from(path)?;
    on_disk.set_consent(consent);
    on_disk.save_to(path)?;
    tracing::debug!(?consent, path = %path.display(), "Saved location consent");
    Ok(())
}

/// Attach the hint the user needs to act on `err`.
fn explain(err: WorkflowError) -> anyhow::Error {
    match err {
        WorkflowError::Location(LocationError::Unavailable) => anyhow!(
            "Your location source is turned off.\n\
             Hint: run `locweather configure` to turn it on, or pass --lat and --lon."
        ),
        WorkflowError::Location(LocationError::PermissionDenied { permanent: true }) => anyhow!(
            "You had denied location access. It is required to show local weather.\n\
             Hint: run `locweather configure` to allow it, or pass --lat and --lon."
        ),
        WorkflowError::Location(LocationError::PermissionDenied { permanent: false }) => {
            anyhow!("Location access was not granted.")
        }
        WorkflowError::Fetch(FetchError::Server { status: 401, .. }) => anyhow::Error::new(err)
            .context("The weather API rejected the key. Hint: run `locweather configure`."),
        WorkflowError::Location(LocationError::Cancelled)
        | WorkflowError::Fetch(FetchError::Cancelled) => anyhow!("Interrupted."),
        other => anyhow::Error::new(other),
    }
}
