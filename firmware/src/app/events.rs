//! Outbound application events.
//!
//! [`FeederCore`](super::service::FeederCore) emits these through the
//! [`EventSink`](super::ports::EventSink) port.  Adapters on the other side
//! decide what to do with them.

use crate::error::{CommandError, LevelError, ScheduleError};
use crate::portion::PortionLevel;
use crate::scheduler::FeedingTime;

/// What caused a dispense.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// `pet-feeder/manual-feed` command.
    Manual,
    /// A schedule entry came due.
    Scheduled(FeedingTime),
    /// The pet approached the bowl.
    Proximity,
}

/// Structured events emitted by the application core.
#[derive(Debug, Clone)]
pub enum FeederEvent {
    /// The core has started (carries the initial portion level).
    Started(PortionLevel),

    /// A dispense finished.
    Dispensed { trigger: Trigger, units: u8 },

    LevelChanged { from: PortionLevel, to: PortionLevel },
    LevelRejected(LevelError),

    ScheduleAdded { time: FeedingTime, slot: usize },
    ScheduleRejected(ScheduleError),

    /// An inbound message could not be parsed.
    CommandRejected(CommandError),

    /// The broker session is (re)established and topics are subscribed.
    BrokerConnected,
}
