use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::config::PositionConfig;
use crate::error::{BotError, FetchResult};

/// Where the station was at `timestamp` (Unix seconds).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionReading {
    pub latitude: f64,
    pub longitude: f64,
    pub timestamp: i64,
}

#[async_trait]
pub trait PositionSource: Send + Sync {
    async fn current_position(&self) -> FetchResult<PositionReading>;
}

/// Open Notify sends coordinates as strings; accept numbers too.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Coordinate {
    Number(f64),
    Text(String),
}

impl Coordinate {
    fn value(&self, name: &str) -> FetchResult<f64> {
        let value = match self {
            Coordinate::Number(n) => *n,
            Coordinate::Text(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|e| BotError::transient(&format!("Bad {} {:?}", name, s), e))?,
        };
        if !value.is_finite() {
            return Err(BotError::TransientFetch(format!("Bad {}: {}", name, value)));
        }
        Ok(value)
    }
}

#[derive(Debug, Deserialize)]
struct IssNowResponse {
    iss_position: IssPosition,
    timestamp: i64,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IssPosition {
    latitude: Coordinate,
    longitude: Coordinate,
}

fn reading_from_body(body: &str) -> FetchResult<PositionReading> {
    let resp: IssNowResponse = serde_json::from_str(body)
        .map_err(|e| BotError::transient("Malformed Open Notify response", e))?;

    if let Some(message) = resp.message.as_deref() {
        if message != "success" {
            return Err(BotError::TransientFetch(format!(
                "Open Notify reported: {}",
                message
            )));
        }
    }

    let latitude = resp.iss_position.latitude.value("latitude")?;
    let longitude = resp.iss_position.longitude.value("longitude")?;
    if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
        return Err(BotError::TransientFetch(format!(
            "Coordinates out of range: {}, {}",
            latitude, longitude
        )));
    }

    Ok(PositionReading {
        latitude,
        longitude,
        timestamp: resp.timestamp,
    })
}

pub struct OpenNotifyClient {
    client: reqwest::Client,
    url: String,
}

impl OpenNotifyClient {
    pub fn new(config: &PositionConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build Open Notify HTTP client")?;
        Ok(Self {
            client,
            url: config.url.clone(),
        })
    }
}

#[async_trait]
impl PositionSource for OpenNotifyClient {
    async fn current_position(&self) -> FetchResult<PositionReading> {
        debug!("Fetching ISS position from {}", self.url);

        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| BotError::transient("Open Notify request failed", e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BotError::TransientFetch(format!(
                "Open Notify API error ({}): {}",
                status, body
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| BotError::transient("Failed to read Open Notify response", e))?;
        reading_from_body(&body)
    }
}
