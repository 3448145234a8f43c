//! Interactive prompts (inquire).

use anyhow::{Context, Result};
use inquire::{CustomType, Password, Select, Text, validator::Validation};
use locweather_core::{
    Config, Units,
    config::LocationSource,
    location::ip::Consent,
    report::DisplayZone,
};

const FOLLOW_LOCALE: &str = "Follow system locale";

const CONSENT_ALLOW: &str = "Allow";
const CONSENT_NOT_NOW: &str = "Not now";
const CONSENT_NEVER: &str = "Never ask again";

/// Explain why location is needed and ask for consent.
pub fn ask_location_consent() -> Result<Consent> {
    println!(
        "locweather needs your approximate location to show local weather.\n\
         It is looked up from your public IP address and never stored."
    );

    let choice = Select::new(
        "Allow location lookup?",
        vec![CONSENT_ALLOW, CONSENT_NOT_NOW, CONSENT_NEVER],
    )
    .prompt()
    .context("Location consent prompt failed")?;

    Ok(match choice {
        CONSENT_ALLOW => Consent::Granted,
        CONSENT_NEVER => Consent::Never,
        _ => Consent::Denied,
    })
}

/// Walk through every setting, keeping current values as defaults.
pub fn configure(cfg: &mut Config) -> Result<()> {
    let key = Password::new("OpenWeather API key:")
        .without_confirmation()
        .with_help_message("Leave empty to keep the current key")
        .prompt()
        .context("Failed to read API key")?;
    if !key.trim().is_empty() {
        cfg.set_api_key(key.trim().to_string());
    }

    let mut unit_options = vec![FOLLOW_LOCALE.to_string()];
    unit_options.extend(Units::all().iter().map(|u| u.to_string()));
    let starting = cfg.api.units.map_or(0, |u| {
        Units::all().iter().position(|x| *x == u).map_or(0, |i| i + 1)
    });
    let units = Select::new("Units:", unit_options)
        .with_starting_cursor(starting)
        .prompt()
        .context("Failed to read units")?;
    cfg.api.units = match units.as_str() {
        FOLLOW_LOCALE => None,
        other => Some(Units::try_from(other)?),
    };

    let sources = vec!["ip", "fixed"];
    let starting = match cfg.location.source {
        LocationSource::Ip => 0,
        LocationSource::Fixed => 1,
    };
    let source = Select::new("Location source:", sources)
        .with_help_message("ip: approximate lookup by IP address; fixed: coordinates you enter")
        .with_starting_cursor(starting)
        .prompt()
        .context("Failed to read location source")?;
    cfg.location.enabled = true;

    if source == "fixed" {
        cfg.location.source = LocationSource::Fixed;
        cfg.location.latitude = Some(ask_degrees("Latitude:", 90.0, cfg.location.latitude)?);
        cfg.location.longitude = Some(ask_degrees("Longitude:", 180.0, cfg.location.longitude)?);
    } else {
        cfg.location.source = LocationSource::Ip;
        cfg.set_consent(ask_location_consent()?);
    }

    let current_tz = cfg.display.timezone.clone().unwrap_or_default();
    let tz = Text::new("Time zone (IANA name, empty for system local):")
        .with_default(&current_tz)
        .with_validator(|input: &str| {
            if input.trim().is_empty() || DisplayZone::parse(input.trim()).is_ok() {
                Ok(Validation::Valid)
            } else {
                Ok(Validation::Invalid("Unknown time zone, e.g. Europe/London".into()))
            }
        })
        .prompt()
        .context("Failed to read time zone")?;
    cfg.display.timezone = Some(tz.trim().to_string()).filter(|t| !t.is_empty());

    Ok(())
}

fn ask_degrees(message: &str, limit: f64, current: Option<f64>) -> Result<f64> {
    let mut prompt = CustomType::<f64>::new(message)
        .with_error_message("Please enter a number")
        .with_validator(move |value: &f64| {
            if value.abs() <= limit {
                Ok(Validation::Valid)
            } else {
                Ok(Validation::Invalid(format!("Must be between -{limit} and {limit}").into()))
            }
        });
    if let Some(current) = current {
        prompt = prompt.with_default(current);
    }

    prompt.prompt().with_context(|| format!("Failed to read {message}"))
}
