mod bot;
mod command;
mod config;
mod error;
mod geocode;
mod platform;
mod position;
mod report;
mod startup;

use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::bot::{Bot, LoopSettings, StopSignal};
use crate::config::Config;
use crate::geocode::LocationIqClient;
use crate::platform::webex::WebexClient;
use crate::position::OpenNotifyClient;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,issbot=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if dotenv::dotenv().is_err() {
        info!("No .env file found, using process environment");
    }

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    info!("Loading configuration from: {}", config_path.display());
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    // Missing geocoding key is fatal before anything touches the network
    let api_key = config.geocoder_api_key()?;

    let stdin = std::io::stdin();
    let mut input = stdin.lock();
    let mut output = std::io::stdout();

    let token = startup::resolve_token(&mut input, &mut output, &config.webex.token)?;
    info!("Token loaded");

    let chat = WebexClient::new(&config.webex, token)?;
    let room = startup::choose_room(
        &chat,
        &mut input,
        &mut output,
        config.webex.room.as_deref(),
    )
    .await?;
    drop(input);

    info!("Configuration resolved");
    info!("  Room: {} ({})", room.title, room.id);
    info!("  Position API: {}", config.position.url);
    info!("  Geocoder: {}", config.geocoder.base_url);

    let position = OpenNotifyClient::new(&config.position)?;
    let geocoder = LocationIqClient::new(&config.geocoder, api_key)?;

    let stop = StopSignal::new();
    let ctrl_c_stop = stop.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Interrupt received, stopping after the current step");
                ctrl_c_stop.raise();
            }
            Err(e) => warn!("Failed to listen for Ctrl-C: {}", e),
        }
    });

    let mut bot = Bot::new(
        chat,
        position,
        geocoder,
        room.id,
        LoopSettings::from(&config.poll),
        stop,
    );

    println!("Watching '{}'. Send /<seconds> to get the ISS position. Ctrl-C to quit.", room.title);
    bot.run().await?;

    println!("Stopped monitoring. Goodbye!");
    Ok(())
}
