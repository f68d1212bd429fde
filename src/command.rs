use regex::Regex;
use std::sync::OnceLock;
use std::time::Duration;

/// Upper bound on a requested delay, in seconds.
pub const MAX_DELAY_SECS: u64 = 300;

fn command_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    // A lone zero, or digits without a leading zero.
    PATTERN.get_or_init(|| Regex::new(r"^/(0|[1-9][0-9]*)$").expect("valid command regex"))
}

/// Extract the delay from a "/<seconds>" chat message.
///
/// Values too large for `u64` saturate; they are clamped before use anyway.
pub fn parse_command(text: &str) -> Option<u64> {
    let caps = command_pattern().captures(text.trim())?;
    let digits = caps.get(1)?.as_str();
    Some(digits.parse::<u64>().unwrap_or(u64::MAX))
}

/// Clamp a requested delay into `[0, max_secs]`.
pub fn clamp_delay(requested: i64, max_secs: u64) -> Duration {
    let max = i64::try_from(max_secs).unwrap_or(i64::MAX);
    Duration::from_secs(requested.clamp(0, max) as u64)
}
