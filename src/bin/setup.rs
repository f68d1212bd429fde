//! issbot setup wizard.
//!
//! Asks for the Webex token, the room to watch, the LocationIQ key and the
//! error cooldown, then writes `config.toml` to `$ISSBOT_ROOT` (default `.`).
//! Leaving the token or key blank writes a commented line so the value can
//! come from `.env` instead.

use anyhow::{Context, Result};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

// ── Config formatting ──────────────────────────────────────────────────────────

struct ConfigParams<'a> {
    token: &'a str,
    room: &'a str,
    geocoder_key: &'a str,
    cooldown_secs: u64,
}

/// "abc" and "Bearer abc" both become "Bearer abc"; blank stays blank.
fn normalize_token(raw: &str) -> String {
    let raw = raw.trim();
    let raw = raw.strip_prefix("Bearer ").unwrap_or(raw).trim();
    if raw.is_empty() {
        String::new()
    } else {
        format!("Bearer {raw}")
    }
}

fn toml_string(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Produces a valid config.toml string. Extracted so it can be unit-tested.
fn format_config(p: &ConfigParams<'_>) -> String {
    let token = normalize_token(p.token);
    let token_line = if token.is_empty() {
        "# token = \"Bearer <token>\"   # or WEBEX_TOKEN in .env".to_owned()
    } else {
        format!("token = \"{}\"", toml_string(&token))
    };

    let room_line = if p.room.trim().is_empty() {
        "# room = \"part of the room title\"".to_owned()
    } else {
        format!("room = \"{}\"", toml_string(p.room.trim()))
    };

    let key_line = if p.geocoder_key.trim().is_empty() {
        "# api_key = \"<key>\"   # or LOCATIONIQ_API_KEY in .env".to_owned()
    } else {
        format!("api_key = \"{}\"", toml_string(p.geocoder_key.trim()))
    };

    let cooldown_secs = p.cooldown_secs;

    format!(
        r#"[webex]
{token_line}
base_url = "https://webexapis.com/v1"
{room_line}
timeout_secs = 5

[position]
url = "http://api.open-notify.org/iss-now.json"
timeout_secs = 5

[geocoder]
{key_line}
base_url = "https://us1.locationiq.com/v1"
timeout_secs = 5

[poll]
interval_secs = 1
cooldown_secs = {cooldown_secs}
max_delay_secs = 300
"#
    )
}

// ── CLI wizard ─────────────────────────────────────────────────────────────────

fn run_cli(project_root: &Path) -> Result<()> {
    println!("=== issbot setup ===\n");

    let read_line = |prompt: &str| -> Result<String> {
        print!("{prompt}");
        io::stdout().flush()?;
        let mut buf = String::new();
        io::stdin().read_line(&mut buf)?;
        Ok(buf.trim().to_owned())
    };

    let token = read_line("Webex access token (blank to use WEBEX_TOKEN): ")?;
    let room = read_line("Part of the room name to watch (blank to choose at startup): ")?;
    let geocoder_key = read_line("LocationIQ API key (blank to use LOCATIONIQ_API_KEY): ")?;
    let cooldown = read_line("Seconds to wait after an error [5]: ")?;
    let cooldown_secs = if cooldown.is_empty() {
        5
    } else {
        cooldown
            .parse()
            .with_context(|| format!("Not a number of seconds: {cooldown}"))?
    };

    let config = format_config(&ConfigParams {
        token: &token,
        room: &room,
        geocoder_key: &geocoder_key,
        cooldown_secs,
    });

    let config_path = project_root.join("config.toml");
    std::fs::write(&config_path, &config)
        .with_context(|| format!("Could not write {}", config_path.display()))?;

    println!("\n✓  config.toml saved to {}", config_path.display());
    println!("   Run the bot with:  cargo run --bin issbot");
    Ok(())
}

// ── Entry point ────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    // Resolve project root: prefer ISSBOT_ROOT env, fall back to cwd.
    let project_root =
        PathBuf::from(std::env::var("ISSBOT_ROOT").unwrap_or_else(|_| ".".to_string()));
    run_cli(&project_root)
}

// ── Tests ──────────────────────────────────────────────────────────────────────
