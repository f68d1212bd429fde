use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::config::WebexConfig;
use crate::error::{BotError, FetchResult};
use crate::platform::{ChatBackend, ChatMessage, Room};

const SERVICE: &str = "Webex";

#[derive(Debug, Deserialize)]
struct ItemList<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct RoomItem {
    id: String,
    #[serde(default)]
    title: String,
    #[serde(rename = "type", default)]
    room_type: String,
}

#[derive(Debug, Deserialize)]
struct MessageItem {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PostMessageRequest<'a> {
    room_id: &'a str,
    text: &'a str,
}

pub struct WebexClient {
    client: reqwest::Client,
    base_url: String,
    /// Full Authorization header value, "Bearer ..."
    token: String,
}

impl WebexClient {
    pub fn new(config: &WebexConfig, token: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build Webex HTTP client")?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    async fn read_body(&self, response: reqwest::Response) -> FetchResult<String> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| BotError::transient("Failed to read Webex response", e))?;
        if status != StatusCode::OK {
            return Err(BotError::ProtocolViolation {
                service: SERVICE,
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }

    async fn get(&self, path: &str, query: &[(&str, &str)]) -> FetchResult<String> {
        let url = format!("{}/{}", self.base_url, path);
        debug!("GET {}", url);
        let response = self
            .client
            .get(&url)
            .header("Authorization", &self.token)
            .header("Content-Type", "application/json")
            .query(query)
            .send()
            .await
            .map_err(|e| BotError::transient("Webex request failed", e))?;
        self.read_body(response).await
    }
}

fn decode<T: DeserializeOwned>(body: &str) -> FetchResult<T> {
    serde_json::from_str(body).map_err(|e| BotError::transient("Malformed Webex response", e))
}

fn rooms_from_body(body: &str) -> FetchResult<Vec<Room>> {
    let list: ItemList<RoomItem> = decode(body)?;
    Ok(list
        .items
        .into_iter()
        .map(|r| Room {
            id: r.id,
            title: r.title,
            room_type: r.room_type,
        })
        .collect())
}

fn latest_from_body(room_id: &str, body: &str) -> FetchResult<Option<ChatMessage>> {
    let list: ItemList<MessageItem> = decode(body)?;
    Ok(list
        .items
        .into_iter()
        .next()
        .and_then(|m| m.text)
        .map(|text| ChatMessage {
            room_id: room_id.to_string(),
            text,
        }))
}

#[async_trait]
impl ChatBackend for WebexClient {
    async fn list_rooms(&self) -> FetchResult<Vec<Room>> {
        let body = self.get("rooms", &[]).await?;
        rooms_from_body(&body)
    }

    async fn latest_message(&self, room_id: &str) -> FetchResult<Option<ChatMessage>> {
        let body = self
            .get("messages", &[("roomId", room_id), ("max", "1")])
            .await?;
        latest_from_body(room_id, &body)
    }

    async fn post_message(&self, room_id: &str, text: &str) -> FetchResult<()> {
        let url = format!("{}/messages", self.base_url);
        debug!("POST {}", url);
        let response = self
            .client
            .post(&url)
            .header("Authorization", &self.token)
            .header("Content-Type", "application/json")
            .json(&PostMessageRequest { room_id, text })
            .send()
            .await
            .map_err(|e| BotError::transient("Webex request failed", e))?;
        self.read_body(response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_rooms_from_body() {
        let body = r#"{"items":[
            {"id":"r1","title":"Space Club","type":"group","isLocked":false},
            {"id":"r2","title":"Alice","type":"direct"}
        ]}"#;
        let rooms = rooms_from_body(body).unwrap();
        assert_eq!(rooms.len(), 2);
        assert_eq!(rooms[0].id, "r1");
        assert_eq!(rooms[0].title, "Space Club");
        assert_eq!(rooms[0].room_type, "group");
        assert_eq!(rooms[1].room_type, "direct");
    }

    #[test]
    fn test_rooms_missing_items_is_empty() {
        assert!(rooms_from_body("{}").unwrap().is_empty());
    }

    #[test]
    fn test_latest_message_text() {
        let body = r#"{"items":[{"id":"m1","roomId":"r1","text":"/30"}]}"#;
        let msg = latest_from_body("r1", body).unwrap().unwrap();
        assert_eq!(msg.text, "/30");
        assert_eq!(msg.room_id, "r1");
    }

    #[test]
    fn test_latest_message_absent() {
        assert_eq!(latest_from_body("r1", r#"{"items":[]}"#).unwrap(), None);
        // file-only message has no text
        assert_eq!(
            latest_from_body("r1", r#"{"items":[{"id":"m1","files":["x"]}]}"#).unwrap(),
            None
        );
    }

    #[test]
    fn test_malformed_body_is_transient() {
        let err = latest_from_body("r1", "<html>oops</html>").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TransientFetch);
    }

    #[test]
    fn test_post_body_uses_camel_case() {
        let json = serde_json::to_value(PostMessageRequest {
            room_id: "r1",
            text: "hi",
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({"roomId": "r1", "text": "hi"}));
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let config = WebexConfig {
            base_url: "https://example.test/v1/".to_string(),
            ..WebexConfig::default()
        };
        let client = WebexClient::new(&config, "Bearer t".to_string()).unwrap();
        assert_eq!(client.base_url, "https://example.test/v1");
    }
}
