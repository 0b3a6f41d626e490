use std::net::SocketAddr;

use anyhow::{Context, anyhow};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use inquire::{Password, Text};
use rainwatch_core::{Config, FileStore, RainResult, UpdateOutcome, Updater};

use crate::server;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "rainwatch", version, about = "Rain notifications for a single spot")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Configure the application id and the watched spot.
    Configure,

    /// Fetch readings once, store the new status and republish if it changed.
    Update {
        /// Run even outside the service window.
        #[arg(long)]
        force: bool,
    },

    /// Show the last stored status.
    Status,

    /// Print the last published feed document.
    Feed,

    /// Serve the feed on `/` and trigger updates on `/update`.
    Serve {
        #[arg(long, default_value = "0.0.0.0:8080")]
        addr: SocketAddr,

        /// Also run an update every N seconds.
        #[arg(long, value_name = "SECS")]
        every: Option<u64>,
    },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Configure => configure()?,
            Command::Update { force } => {
                let updater = Updater::from_config(Config::load()?)?;
                match updater.run(Utc::now(), force).await? {
                    UpdateOutcome::Closed(hours) => println!("closed: {hours}"),
                    UpdateOutcome::Skipped(result) => println!("skipped: {}", result.text),
                    UpdateOutcome::Published(result) => println!("published: {}", result.text),
                }
            }
            Command::Status => {
                let config = Config::load()?;
                let store = FileStore::new(config.data_dir()?);
                match store.load_result()? {
                    Some(result) => print_result(&config, &result),
                    None => println!("no data yet"),
                }
            }
            Command::Feed => {
                let config = Config::load()?;
                let store = FileStore::new(config.data_dir()?);
                let feed = store.load_feed()?.ok_or_else(|| {
                    anyhow!("No feed published yet.\nHint: run `rainwatch update` first.")
                })?;
                print!("{feed}");
            }
            Command::Serve { addr, every } => {
                let updater = Updater::from_config(Config::load()?)?;
                server::serve(updater, addr, every).await?;
            }
        }

        Ok(())
    }
}

fn configure() -> anyhow::Result<()> {
    let mut config = Config::load()?;

    let app_id = Password::new("Yahoo! application id:")
        .without_confirmation()
        .prompt()
        .context("Failed to read application id")?;
    let coordinates = Text::new("Coordinates (longitude,latitude):")
        .with_default(&config.coordinates)
        .prompt()
        .context("Failed to read coordinates")?;
    let spot_name = Text::new("Spot name:")
        .with_default(&config.spot_name)
        .prompt()
        .context("Failed to read spot name")?;

    config.app_id = Some(app_id.trim().to_string());
    config.coordinates = coordinates.trim().to_string();
    config.spot_name = spot_name.trim().to_string();
    config.validate()?;
    config.save()?;

    println!("Saved configuration to {}", Config::config_file_path()?.display());
    Ok(())
}

fn print_result(config: &Config, result: &RainResult) {
    let offset = config.window.offset();
    let local = |ts: i64| {
        DateTime::from_timestamp(ts, 0)
            .map(|dt| dt.with_timezone(&offset).format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| ts.to_string())
    };

    println!("{}: {}", config.spot_name, result.text);
    println!("status:  {}", result.status);
    println!("updated: {}", local(result.updated_at));
    if result.rain_since > 0 {
        println!("rain seen: {}", local(result.rain_since));
    }
}
