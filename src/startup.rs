//! One-time resolution of the Webex token and the monitored room.
//!
//! Runs before the poll loop; the loop itself only ever sees the resolved
//! token string and room id.

use anyhow::{Context, Result};
use std::io::{BufRead, Write};
use tracing::info;

use crate::error::BotError;
use crate::platform::{ChatBackend, Room};

const BEARER: &str = "Bearer ";

fn prompt<R: BufRead, W: Write>(input: &mut R, output: &mut W, text: &str) -> Result<String> {
    write!(output, "{}", text)?;
    output.flush()?;
    let mut buf = String::new();
    input.read_line(&mut buf).context("Failed to read from stdin")?;
    Ok(buf.trim().to_string())
}

/// Ask whether to type a token now; otherwise use the configured one
/// (config file or WEBEX_TOKEN), which must already start with "Bearer ".
pub fn resolve_token<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    configured: &str,
) -> Result<String> {
    let choice = prompt(
        input,
        output,
        "Do you want to enter the Webex access token now? (Y/N): ",
    )?;

    if choice.eq_ignore_ascii_case("y") {
        let raw = prompt(input, output, "Enter your Webex token (without 'Bearer '): ")?;
        let raw = raw.strip_prefix(BEARER).unwrap_or(raw.as_str()).trim();
        if raw.is_empty() {
            return Err(BotError::config("Empty token entered").into());
        }
        return Ok(format!("{}{}", BEARER, raw));
    }

    let configured = configured.trim();
    match configured.strip_prefix(BEARER) {
        Some(rest) if !rest.trim().is_empty() => Ok(configured.to_string()),
        _ => Err(BotError::config(
            "No token provided. Set WEBEX_TOKEN in .env as 'Bearer <token>' or enter one.",
        )
        .into()),
    }
}

/// First room whose title contains `filter`, ignoring case.
pub fn find_room<'a>(rooms: &'a [Room], filter: &str) -> Option<&'a Room> {
    let needle = filter.to_lowercase();
    rooms
        .iter()
        .find(|room| room.title.to_lowercase().contains(&needle))
}

pub fn print_rooms<W: Write>(output: &mut W, rooms: &[Room]) -> Result<()> {
    writeln!(output, "List of rooms:")?;
    for room in rooms {
        writeln!(output, "Type: '{}' Name: {}", room.room_type, room.title)?;
    }
    Ok(())
}

/// List the rooms, then pick one by the configured filter or by prompting.
pub async fn choose_room<C, R, W>(
    chat: &C,
    input: &mut R,
    output: &mut W,
    configured: Option<&str>,
) -> Result<Room>
where
    C: ChatBackend,
    R: BufRead,
    W: Write,
{
    let rooms = chat.list_rooms().await.context("Failed to list Webex rooms")?;
    print_rooms(output, &rooms)?;

    let filter = match configured.map(str::trim).filter(|f| !f.is_empty()) {
        Some(f) => {
            info!("Using configured room filter: {}", f);
            f.to_string()
        }
        None => prompt(input, output, "Enter part of the room name to monitor: ")?,
    };
    if filter.is_empty() {
        return Err(BotError::config("No room name entered").into());
    }

    let room = find_room(&rooms, &filter)
        .cloned()
        .ok_or_else(|| BotError::config(format!("No room matches '{}'", filter)))?;

    writeln!(output, "Found room: {}", room.title)?;
    Ok(room)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorKind, FetchResult};
    use crate::platform::ChatMessage;
    use async_trait::async_trait;
    use std::io::Cursor;

    fn kind(err: &anyhow::Error) -> Option<ErrorKind> {
        err.downcast_ref::<BotError>().map(BotError::kind)
    }

    fn room(id: &str, title: &str) -> Room {
        Room {
            id: id.to_string(),
            title: title.to_string(),
            room_type: "group".to_string(),
        }
    }

    struct Rooms(Vec<Room>);

    #[async_trait]
    impl ChatBackend for Rooms {
        async fn list_rooms(&self) -> FetchResult<Vec<Room>> {
            Ok(self.0.clone())
        }

        async fn latest_message(&self, _room_id: &str) -> FetchResult<Option<ChatMessage>> {
            Ok(None)
        }

        async fn post_message(&self, _room_id: &str, _text: &str) -> FetchResult<()> {
            Ok(())
        }
    }

    #[test]
    fn test_token_entered_interactively() {
        let mut input = Cursor::new("y\nabc123\n");
        let mut output = Vec::new();
        let token = resolve_token(&mut input, &mut output, "").unwrap();
        assert_eq!(token, "Bearer abc123");
        let shown = String::from_utf8(output).unwrap();
        assert!(shown.contains("(Y/N)"));
    }

    #[test]
    fn test_pasted_bearer_prefix_not_doubled() {
        let mut input = Cursor::new("Y\nBearer abc123\n");
        let token = resolve_token(&mut input, &mut Vec::new(), "").unwrap();
        assert_eq!(token, "Bearer abc123");
    }

    #[test]
    fn test_empty_entered_token_rejected() {
        let mut input = Cursor::new("y\n\n");
        let err = resolve_token(&mut input, &mut Vec::new(), "Bearer env").unwrap_err();
        assert_eq!(kind(&err), Some(ErrorKind::Configuration));
    }

    #[test]
    fn test_falls_back_to_configured_token() {
        let mut input = Cursor::new("n\n");
        let token = resolve_token(&mut input, &mut Vec::new(), "Bearer from-env").unwrap();
        assert_eq!(token, "Bearer from-env");
    }

    #[test]
    fn test_eof_falls_back_to_configured_token() {
        let mut input = Cursor::new("");
        let token = resolve_token(&mut input, &mut Vec::new(), " Bearer xyz ").unwrap();
        assert_eq!(token, "Bearer xyz");
    }

    #[test]
    fn test_configured_token_without_prefix_rejected() {
        for configured in ["", "abc123", "Bearer ", "bearer abc"] {
            let mut input = Cursor::new("n\n");
            let err = resolve_token(&mut input, &mut Vec::new(), configured).unwrap_err();
            assert_eq!(kind(&err), Some(ErrorKind::Configuration), "{:?}", configured);
        }
    }

    #[test]
    fn test_find_room_case_insensitive_first_match() {
        let rooms = vec![
            room("1", "Team Standup"),
            room("2", "ISS Watchers"),
            room("3", "iss fans"),
        ];
        assert_eq!(find_room(&rooms, "iss").unwrap().id, "2");
        assert_eq!(find_room(&rooms, "FANS").unwrap().id, "3");
        assert!(find_room(&rooms, "mars").is_none());
    }

    #[tokio::test]
    async fn test_choose_room_by_prompt() {
        let chat = Rooms(vec![room("1", "Team Standup"), room("2", "ISS Watchers")]);
        let mut input = Cursor::new("watch\n");
        let mut output = Vec::new();
        let chosen = choose_room(&chat, &mut input, &mut output, None)
            .await
            .unwrap();
        assert_eq!(chosen.id, "2");
        let shown = String::from_utf8(output).unwrap();
        assert!(shown.contains("Type: 'group' Name: Team Standup"));
        assert!(shown.contains("Found room: ISS Watchers"));
    }

    #[tokio::test]
    async fn test_choose_room_from_config_skips_prompt() {
        let chat = Rooms(vec![room("1", "Team Standup")]);
        let mut input = Cursor::new("");
        let chosen = choose_room(&chat, &mut input, &mut Vec::new(), Some("standup"))
            .await
            .unwrap();
        assert_eq!(chosen.id, "1");
    }

    #[tokio::test]
    async fn test_choose_room_no_match_is_configuration_error() {
        let chat = Rooms(vec![room("1", "Team Standup")]);
        let mut input = Cursor::new("mars\n");
        let err = choose_room(&chat, &mut input, &mut Vec::new(), None)
            .await
            .unwrap_err();
        assert_eq!(kind(&err), Some(ErrorKind::Configuration));
    }

    #[tokio::test]
    async fn test_choose_room_empty_filter_rejected() {
        let chat = Rooms(vec![room("1", "Team Standup")]);
        let mut input = Cursor::new("\n");
        let err = choose_room(&chat, &mut input, &mut Vec::new(), None)
            .await
            .unwrap_err();
        assert_eq!(kind(&err), Some(ErrorKind::Configuration));
    }
}
