use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use inquire::{CustomType, Text};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{info, warn};
use weatherkit_core::{
    AppleWeatherKit, Config, Coordinate, Credentials, Envelope, Location, WeatherKitHelper,
    handle_request,
};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weatherkit", version, about = "Apple WeatherKit helper for smart mirrors")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store credentials and location; anything not given is prompted for.
    Configure(ConfigureArgs),

    /// Fetch one report for the configured location and print it as JSON.
    Show {
        /// Value echoed back as `instanceId` in the report.
        #[arg(long)]
        instance_id: Option<String>,

        /// Override the configured latitude.
        #[arg(long, allow_negative_numbers = true)]
        latitude: Option<f64>,

        /// Override the configured longitude.
        #[arg(long, allow_negative_numbers = true)]
        longitude: Option<f64>,
    },

    /// Bridge newline-delimited JSON notifications between stdin and stdout.
    Serve,
}

#[derive(Debug, Args)]
pub struct ConfigureArgs {
    #[arg(long)]
    pub team_id: Option<String>,
    #[arg(long)]
    pub service_id: Option<String>,
    #[arg(long)]
    pub key_id: Option<String>,
    /// Path to the AuthKey .p8 file.
    #[arg(long)]
    pub key_path: Option<PathBuf>,
    #[arg(long, allow_negative_numbers = true)]
    pub latitude: Option<f64>,
    #[arg(long, allow_negative_numbers = true)]
    pub longitude: Option<f64>,
    #[arg(long)]
    pub language: Option<String>,
    #[arg(long)]
    pub timezone: Option<String>,
    #[arg(long)]
    pub country_code: Option<String>,
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        match self.command {
            Command::Configure(args) => configure(args),
            Command::Show { instance_id, latitude, longitude } => {
                show(instance_id, latitude, longitude).await
            }
            Command::Serve => serve().await,
        }
    }
}

fn configure(args: ConfigureArgs) -> Result<()> {
    let mut config = Config::load()?;
    let creds = config.credentials.clone();
    let loc = config.location.clone();

    let credentials = Credentials {
        team_id: text_or_prompt(
            args.team_id,
            "Apple developer team id:",
            creds.as_ref().map(|c| c.team_id.as_str()),
        )?,
        service_id: text_or_prompt(
            args.service_id,
            "WeatherKit service id:",
            creds.as_ref().map(|c| c.service_id.as_str()),
        )?,
        key_id: text_or_prompt(
            args.key_id,
            "Signing key id:",
            creds.as_ref().map(|c| c.key_id.as_str()),
        )?,
        key_path: match args.key_path {
            Some(path) => path,
            None => PathBuf::from(text_or_prompt(
                None,
                "Path to AuthKey .p8 file:",
                creds.as_ref().and_then(|c| c.key_path.to_str()),
            )?),
        },
    };

    let location = Location {
        latitude: number_or_prompt(args.latitude, "Latitude:", loc.as_ref().map(|l| l.latitude))?,
        longitude: number_or_prompt(
            args.longitude,
            "Longitude:",
            loc.as_ref().map(|l| l.longitude),
        )?,
        language: text_or_prompt(
            args.language,
            "Language:",
            Some(loc.as_ref().map_or("en", |l| l.language.as_str())),
        )?,
        timezone: text_or_prompt(
            args.timezone,
            "Timezone (IANA name):",
            loc.as_ref().map(|l| l.timezone.as_str()),
        )?,
        country_code: text_or_prompt(
            args.country_code,
            "Country code:",
            loc.as_ref().map(|l| l.country_code.as_str()),
        )?,
    };

    config.set_credentials(credentials);
    config.set_location(location);
    config.save()?;

    println!("Saved configuration to {}", Config::config_file_path()?.display());
    Ok(())
}

fn text_or_prompt(value: Option<String>, message: &str, default: Option<&str>) -> Result<String> {
    if let Some(value) = value {
        return Ok(value);
    }

    let mut prompt = Text::new(message);
    if let Some(default) = default {
        prompt = prompt.with_default(default);
    }
    prompt.prompt().with_context(|| format!("Failed to read '{message}'"))
}

fn number_or_prompt(value: Option<f64>, message: &str, default: Option<f64>) -> Result<f64> {
    if let Some(value) = value {
        return Ok(value);
    }

    let mut prompt = CustomType::<f64>::new(message);
    if let Some(default) = default {
        prompt = prompt.with_default(default);
    }
    prompt.prompt().with_context(|| format!("Failed to read '{message}'"))
}

async fn show(
    instance_id: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
) -> Result<()> {
    let config = Config::load()?;
    let mut request = config.to_request(instance_id.map(Value::String))?;

    if let Some(latitude) = latitude {
        request.latitude = Some(Coordinate::from(latitude));
    }
    if let Some(longitude) = longitude {
        request.longitude = Some(Coordinate::from(longitude));
    }

    let report = handle_request(&AppleWeatherKit::new(), &request)
        .await
        .context("Failed to fetch WeatherKit report")?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn serve() -> Result<()> {
    let (helper, mut events) = WeatherKitHelper::new(Arc::new(AppleWeatherKit::new()));

    let writer = tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        while let Some(event) = events.recv().await {
            let mut line = serde_json::to_vec(&event)?;
            line.push(b'\n');
            stdout.write_all(&line).await?;
            stdout.flush().await?;
        }
        anyhow::Ok(())
    });

    info!("reading notifications from stdin");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("Failed to read from stdin")? {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<Envelope>(&line) {
            Ok(envelope) => {
                helper.notification_received(envelope);
            }
            Err(e) => warn!("skipping malformed notification line: {e}"),
        }
    }

    // Outstanding requests hold their own senders; the writer ends once they finish.
    drop(helper);
    writer.await.context("Event writer task failed")??;

    Ok(())
}
