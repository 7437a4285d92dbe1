//! Unified error types for the PetFeeder firmware.
//!
//! A single `Error` enum that the subsystem errors convert into.  The
//! feeder core logs rejections through it and keeps the latest one for
//! [`FeederCore::last_error`](crate::app::service::FeederCore::last_error).  All variants are `Copy` so they
//! can be logged and passed around without allocation.
//!
//! None of these are fatal: the control loop logs them and carries on with
//! its state unchanged.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Top-level firmware error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// An inbound broker message could not be turned into a command.
    Command(CommandError),
    /// A portion level was outside 1..=10.
    Level(LevelError),
    /// A feeding time could not be added to the schedule.
    Schedule(ScheduleError),
    /// A communication subsystem failed.
    Comms(CommsError),
    /// Peripheral initialisation failed.
    Init(&'static str),
    /// Configuration is invalid or could not be loaded.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Command(e) => write!(f, "command: {e}"),
            Self::Level(e) => write!(f, "level: {e}"),
            Self::Schedule(e) => write!(f, "schedule: {e}"),
            Self::Comms(e) => write!(f, "comms: {e}"),
            Self::Init(msg) => write!(f, "init: {msg}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

impl core::error::Error for Error {}

// ---------------------------------------------------------------------------
// Command errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandError {
    /// Message arrived on a topic the feeder does not handle.
    UnknownTopic,
    /// Payload bytes are not valid UTF-8.
    NotUtf8,
    /// Payload is not a decimal integer.
    NotAnInteger,
    /// Payload is not exactly `HH:MM`.
    MalformedTime,
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownTopic => write!(f, "unknown topic"),
            Self::NotUtf8 => write!(f, "payload is not UTF-8"),
            Self::NotAnInteger => write!(f, "payload is not a decimal integer"),
            Self::MalformedTime => write!(f, "payload is not HH:MM"),
        }
    }
}

impl From<CommandError> for Error {
    fn from(e: CommandError) -> Self {
        Self::Command(e)
    }
}

// ---------------------------------------------------------------------------
// Portion level errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelError {
    /// Requested level is outside 1..=10.  Carries the rejected value.
    OutOfRange(i32),
}

impl fmt::Display for LevelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfRange(n) => write!(f, "{n} is outside 1..=10"),
        }
    }
}

impl From<LevelError> for Error {
    fn from(e: LevelError) -> Self {
        Self::Level(e)
    }
}

// ---------------------------------------------------------------------------
// Schedule errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleError {
    /// All schedule slots are taken.
    Full,
    /// Hour is not in 0..=23.
    HourOutOfRange(u8),
    /// Minute is not in 0..=59.
    MinuteOutOfRange(u8),
}

impl fmt::Display for ScheduleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full => write!(f, "schedule is full"),
            Self::HourOutOfRange(h) => write!(f, "hour {h} out of range"),
            Self::MinuteOutOfRange(m) => write!(f, "minute {m} out of range"),
        }
    }
}

impl From<ScheduleError> for Error {
    fn from(e: ScheduleError) -> Self {
        Self::Schedule(e)
    }
}

// ---------------------------------------------------------------------------
// Communications errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommsError {
    WifiConnectFailed,
    BrokerUnavailable,
    SubscribeFailed,
    PublishFailed,
}

impl fmt::Display for CommsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WifiConnectFailed => write!(f, "WiFi connect failed"),
            Self::BrokerUnavailable => write!(f, "broker unavailable"),
            Self::SubscribeFailed => write!(f, "subscribe failed"),
            Self::PublishFailed => write!(f, "publish failed"),
        }
    }
}

impl From<CommsError> for Error {
    fn from(e: CommsError) -> Self {
        Self::Comms(e)
    }
}
