use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::command::{clamp_delay, parse_command};
use crate::config::PollConfig;
use crate::error::FetchResult;
use crate::geocode::Geocoder;
use crate::platform::ChatBackend;
use crate::position::PositionSource;
use crate::report::format_report;

/// Cooperative stop flag, raised from outside the loop (e.g. on Ctrl-C).
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Text of the most recently acted-on message. Lives as long as the process.
#[derive(Debug, Default)]
pub struct PollState {
    last_seen_text: Option<String>,
}

impl PollState {
    /// Record `text` and report whether it differs from the previous one.
    /// Only consecutive repeats are suppressed.
    pub fn observe(&mut self, text: &str) -> bool {
        if self.last_seen_text.as_deref() == Some(text) {
            return false;
        }
        self.last_seen_text = Some(text.to_string());
        true
    }

    pub fn last_seen_text(&self) -> Option<&str> {
        self.last_seen_text.as_deref()
    }
}

/// What one poll tick did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// Room empty or newest message already seen
    NoChange,
    /// New message that is not a command
    Ignored,
    /// Command handled; carries the posted text
    Posted(String),
    /// Stop signal observed mid-command; remaining steps skipped
    Stopped,
}

#[derive(Debug, Clone)]
pub struct LoopSettings {
    pub poll_interval: Duration,
    pub cooldown: Duration,
    pub max_delay_secs: u64,
}

impl From<&PollConfig> for LoopSettings {
    fn from(config: &PollConfig) -> Self {
        Self {
            poll_interval: config.interval(),
            cooldown: config.cooldown(),
            max_delay_secs: config.max_delay_secs,
        }
    }
}

/// Polls one room for "/<seconds>" commands and answers each with the
/// station's position after the requested delay.
pub struct Bot<C, P, G> {
    chat: C,
    position: P,
    geocoder: G,
    room_id: String,
    settings: LoopSettings,
    state: PollState,
    stop: StopSignal,
}

impl<C, P, G> Bot<C, P, G>
where
    C: ChatBackend,
    P: PositionSource,
    G: Geocoder,
{
    pub fn new(
        chat: C,
        position: P,
        geocoder: G,
        room_id: String,
        settings: LoopSettings,
        stop: StopSignal,
    ) -> Self {
        Self {
            chat,
            position,
            geocoder,
            room_id,
            settings,
            state: PollState::default(),
            stop,
        }
    }

    #[allow(dead_code)]
    pub fn state(&self) -> &PollState {
        &self.state
    }

    /// Poll until stopped. Recoverable errors are logged and followed by a
    /// cooldown; only configuration errors end the loop with an error.
    pub async fn run(&mut self) -> FetchResult<()> {
        info!(
            "Polling room {} every {:?} (cooldown {:?}, max delay {}s)",
            self.room_id,
            self.settings.poll_interval,
            self.settings.cooldown,
            self.settings.max_delay_secs
        );

        loop {
            if self.stop.is_raised() {
                info!("Stop requested, leaving poll loop");
                return Ok(());
            }

            match self.tick().await {
                Ok(TickOutcome::Stopped) => {
                    info!("Stop requested during command, remaining steps skipped");
                    return Ok(());
                }
                Ok(_) => tokio::time::sleep(self.settings.poll_interval).await,
                Err(e) if !e.is_recoverable() => {
                    error!("Fatal error in poll loop: {}", e);
                    return Err(e);
                }
                Err(e) => {
                    warn!(
                        "{:?} error: {}. Resuming in {:?} (last message {:?} will not be retried)",
                        e.kind(),
                        e,
                        self.settings.cooldown,
                        self.state.last_seen_text()
                    );
                    tokio::time::sleep(self.settings.cooldown).await;
                }
            }
        }
    }

    /// One CHECK step, followed by DISPATCH and ACT when a new command arrived.
    pub async fn tick(&mut self) -> FetchResult<TickOutcome> {
        let Some(message) = self.chat.latest_message(&self.room_id).await? else {
            return Ok(TickOutcome::NoChange);
        };

        // Recorded before acting so a failed command is never replayed.
        if !self.state.observe(&message.text) {
            return Ok(TickOutcome::NoChange);
        }
        debug!("New message in {}: {:?}", message.room_id, message.text);

        match parse_command(&message.text) {
            Some(requested) => self.act(requested).await,
            None => Ok(TickOutcome::Ignored),
        }
    }

    async fn act(&self, requested: u64) -> FetchResult<TickOutcome> {
        let wait = clamp_delay(
            i64::try_from(requested).unwrap_or(i64::MAX),
            self.settings.max_delay_secs,
        );
        if wait.as_secs() < requested {
            info!(
                "Requested delay {}s clamped to {}s",
                requested,
                wait.as_secs()
            );
        }
        info!("Reporting ISS position in {}s", wait.as_secs());
        tokio::time::sleep(wait).await;
        if self.stop.is_raised() {
            return Ok(TickOutcome::Stopped);
        }

        let reading = self.position.current_position().await?;
        debug!(
            "ISS at {}, {} (t={})",
            reading.latitude, reading.longitude, reading.timestamp
        );
        if self.stop.is_raised() {
            return Ok(TickOutcome::Stopped);
        }

        let label = self
            .geocoder
            .reverse(reading.latitude, reading.longitude)
            .await?;
        if self.stop.is_raised() {
            return Ok(TickOutcome::Stopped);
        }

        let text = format_report(reading.timestamp, reading.latitude, reading.longitude, &label);
        self.chat.post_message(&self.room_id, &text).await?;
        info!("Posted: {}", text);

        Ok(TickOutcome::Posted(text))
    }
}
