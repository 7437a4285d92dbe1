//! Inbound commands to the feeder core.
//!
//! Remote commands arrive as broker messages.  [`FeederCommand::parse`]
//! turns a `(topic, payload)` pair into a command; the broker callback
//! drops it into the single-slot [`CommandInbox`], which the core drains
//! once per tick.

use log::debug;

use crate::error::CommandError;

// ── Topics ────────────────────────────────────────────────────

pub const TOPIC_DISPENSING_LEVEL: &str = "pet-feeder/dispensing-level";
pub const TOPIC_MANUAL_FEED: &str = "pet-feeder/manual-feed";
pub const TOPIC_FEEDING_TIME: &str = "pet-feeder/feeding-time";

/// Every topic the feeder subscribes to.
pub const INBOUND_TOPICS: [&str; 3] = [
    TOPIC_DISPENSING_LEVEL,
    TOPIC_MANUAL_FEED,
    TOPIC_FEEDING_TIME,
];

pub const TOPIC_DISTANCE: &str = "pet-feeder/distance";
pub const TOPIC_STATUS: &str = "pet-feeder/status";

/// Status payload published while the motor is turning.
pub const STATUS_MOVING: &str = "Moving...";

// ── Commands ──────────────────────────────────────────────────

/// Commands that remote clients can send into the feeder core.
///
/// Values are carried unvalidated; range checks belong to the component
/// that applies them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeederCommand {
    /// Set the portion level used by scheduled and proximity feeds.
    SetLevel(i32),
    /// Dispense this many units now.
    ManualFeed(i32),
    /// Append a feeding time to the schedule.
    AddSchedule { hour: u8, minute: u8 },
}

impl FeederCommand {
    /// Interpret a broker message.
    pub fn parse(topic: &str, payload: &[u8]) -> Result<Self, CommandError> {
        let text = core::str::from_utf8(payload).map_err(|_| CommandError::NotUtf8)?;
        match topic {
            TOPIC_DISPENSING_LEVEL => parse_int(text).map(Self::SetLevel),
            TOPIC_MANUAL_FEED => parse_int(text).map(Self::ManualFeed),
            TOPIC_FEEDING_TIME => {
                let (hour, minute) = parse_hh_mm(text)?;
                Ok(Self::AddSchedule { hour, minute })
            }
            _ => Err(CommandError::UnknownTopic),
        }
    }
}

fn parse_int(text: &str) -> Result<i32, CommandError> {
    text.trim()
        .parse::<i32>()
        .map_err(|_| CommandError::NotAnInteger)
}

/// Parse exactly `HH:MM`: two digits, a colon, two digits.  Range checks
/// are left to the schedule.
fn parse_hh_mm(text: &str) -> Result<(u8, u8), CommandError> {
    let b = text.as_bytes();
    if b.len() != 5 || b[2] != b':' {
        return Err(CommandError::MalformedTime);
    }
    let two_digits = |hi: u8, lo: u8| -> Result<u8, CommandError> {
        if hi.is_ascii_digit() && lo.is_ascii_digit() {
            Ok((hi - b'0') * 10 + (lo - b'0'))
        } else {
            Err(CommandError::MalformedTime)
        }
    };
    Ok((two_digits(b[0], b[1])?, two_digits(b[3], b[4])?))
}

// ── Inbox ─────────────────────────────────────────────────────

/// Holds at most one pending command.  A newer command overwrites an
/// unread older one.
#[derive(Debug, Default)]
pub struct CommandInbox {
    slot: Option<FeederCommand>,
}

impl CommandInbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, cmd: FeederCommand) {
        if let Some(old) = self.slot.replace(cmd) {
            debug!("Inbox: {:?} overwritten by {:?}", old, cmd);
        }
    }

    pub fn take(&mut self) -> Option<FeederCommand> {
        self.slot.take()
    }

    pub fn is_empty(&self) -> bool {
        self.slot.is_none()
    }
}
