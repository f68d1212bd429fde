pub mod webex;

use async_trait::async_trait;

use crate::error::FetchResult;

/// A room the token holder belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Room {
    pub id: String,
    pub title: String,
    /// "group" or "direct"
    pub room_type: String,
}

/// The newest message in a monitored room. Fetched fresh every poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub room_id: String,
    pub text: String,
}

/// Anything the poll loop can read commands from and post results to.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn list_rooms(&self) -> FetchResult<Vec<Room>>;

    /// `None` when the room is empty or its newest message carries no text.
    async fn latest_message(&self, room_id: &str) -> FetchResult<Option<ChatMessage>>;

    async fn post_message(&self, room_id: &str, text: &str) -> FetchResult<()>;
}
