//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ FeederCore (domain)
//! ```
//!
//! Driven adapters (stepper, ranger, clock, broker, event sinks) implement
//! these traits.  [`FeederCore`](super::service::FeederCore) owns them via
//! generics, so the domain core never touches hardware directly.
//!
//! Every port is used from the single control-loop context only.  None of
//! them needs to be `Send` or `Sync`.

use core::fmt;

use crate::error::CommsError;

// ───────────────────────────────────────────────────────────────
// Actuator port (driven adapter: domain → stepper)
// ───────────────────────────────────────────────────────────────

/// Receives progress callbacks while a dispense is running.
///
/// This decouples the stepper driver from the broker: the driver reports
/// how far it got, and the core decides to publish a `Moving...` heartbeat.
pub trait DispenseObserver {
    /// Called at most once per configured heartbeat spacing.
    fn on_heartbeat(&mut self, steps_done: u32, steps_total: u32);
}

/// Write-side port: the domain calls this to move food.
pub trait ActuatorPort {
    /// Drive the gate forward through `steps` steps, followed by the
    /// reverse close if the hardware is configured for one.
    ///
    /// Blocks until the motor stops.  Not reentrant.
    fn dispense(&mut self, steps: u32, observer: &mut dyn DispenseObserver);
}

// ───────────────────────────────────────────────────────────────
// Ranger port (driven adapter: ultrasonic sensor → domain)
// ───────────────────────────────────────────────────────────────

pub trait RangerPort {
    /// One-shot distance measurement in centimetres.
    ///
    /// A missing echo reads as a very large distance so it counts as "far".
    fn measure(&mut self) -> u32;
}

// ───────────────────────────────────────────────────────────────
// Clock port (driven adapter: RTC / SNTP → domain)
// ───────────────────────────────────────────────────────────────

/// Civil local time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DateTime {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl fmt::Display for DateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        )
    }
}

pub trait ClockPort {
    /// Current local wall-clock time.
    fn now(&self) -> DateTime;
}

// ───────────────────────────────────────────────────────────────
// Broker port (driven adapter: domain ↔ pub/sub broker)
// ───────────────────────────────────────────────────────────────

/// Publish/subscribe client.
///
/// Inbound messages are delivered only from inside [`poll`](Self::poll),
/// in the caller's context, never preemptively.
pub trait BrokerPort {
    fn is_connected(&self) -> bool;

    /// Try once to (re)establish the session.
    fn connect(&mut self) -> Result<(), CommsError>;

    fn subscribe(&mut self, topic: &str) -> Result<(), CommsError>;

    /// Publish a short text payload.  Dropped silently while disconnected.
    fn publish(&mut self, topic: &str, payload: &str);

    /// Service the connection and hand every pending inbound message to
    /// `on_message` as `(topic, payload)`.
    fn poll(&mut self, on_message: &mut dyn FnMut(&str, &[u8]));
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`FeederEvent`](super::events::FeederEvent)s
/// through this port.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::FeederEvent);
}
