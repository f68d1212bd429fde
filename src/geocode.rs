use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::config::GeocoderConfig;
use crate::error::{BotError, FetchResult};

/// Human-readable pieces of a reverse-geocoded position. Any may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeoLabel {
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    /// Provider's free-text place name
    pub display_fallback: Option<String>,
}

#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn reverse(&self, latitude: f64, longitude: f64) -> FetchResult<GeoLabel>;
}

#[derive(Debug, Deserialize, Default)]
struct Address {
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
    state: Option<String>,
    country: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ReverseResponse {
    #[serde(default)]
    address: Option<Address>,
    #[serde(default)]
    display_name: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn label_from_body(body: &str) -> FetchResult<GeoLabel> {
    let resp: ReverseResponse = serde_json::from_str(body)
        .map_err(|e| BotError::transient("Malformed LocationIQ response", e))?;

    let display_fallback = non_empty(resp.display_name);
    let Some(address) = resp.address else {
        return Ok(GeoLabel {
            display_fallback,
            ..GeoLabel::default()
        });
    };

    let city = non_empty(address.city)
        .or_else(|| non_empty(address.town))
        .or_else(|| non_empty(address.village));

    Ok(GeoLabel {
        city,
        state: non_empty(address.state),
        country: non_empty(address.country),
        display_fallback,
    })
}

/// LocationIQ answers 404 "Unable to geocode" over open water.
fn is_nothing_here(status: StatusCode, body: &str) -> bool {
    status == StatusCode::NOT_FOUND && body.contains("Unable to geocode")
}

pub struct LocationIqClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl LocationIqClient {
    pub fn new(config: &GeocoderConfig, api_key: &str) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(BotError::config("LocationIQ API key is empty").into());
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build LocationIQ HTTP client")?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: api_key.trim().to_string(),
        })
    }
}

#[async_trait]
impl Geocoder for LocationIqClient {
    async fn reverse(&self, latitude: f64, longitude: f64) -> FetchResult<GeoLabel> {
        let url = format!("{}/reverse", self.base_url);
        debug!("Reverse geocoding {}, {}", latitude, longitude);

        let lat = latitude.to_string();
        let lon = longitude.to_string();
        let response = self
            .client
            .get(&url)
            .query(&[
                ("key", self.api_key.as_str()),
                ("lat", lat.as_str()),
                ("lon", lon.as_str()),
                ("format", "json"),
            ])
            .send()
            .await
            .map_err(|e| BotError::transient("LocationIQ request failed", e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| BotError::transient("Failed to read LocationIQ response", e))?;

        if is_nothing_here(status, &body) {
            debug!("No address at {}, {}", latitude, longitude);
            return Ok(GeoLabel::default());
        }
        if !status.is_success() {
            return Err(BotError::TransientFetch(format!(
                "LocationIQ API error ({}): {}",
                status, body
            )));
        }

        label_from_body(&body)
    }
}
