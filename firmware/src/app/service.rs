//! Feeder core: the hexagonal centre.
//!
//! [`FeederCore`] owns every component of the feeder: the driven ports
//! (stepper and ranger board, clock, broker, delay) and the pure-logic pieces
//! (portion policy, edge detector, schedule, command inbox).  It exposes
//! one operation that matters, [`tick`](FeederCore::tick), run at a fixed
//! cadence from a single execution context.
//!
//! ```text
//!  BrokerPort ──▶ ┌─────────────────────────────────┐ ──▶ EventSink
//!  ClockPort  ──▶ │            FeederCore           │
//!  RangerPort ──▶ │ Inbox · Schedule · EdgeDetector │ ──▶ ActuatorPort
//!                 └─────────────────────────────────┘
//! ```
//!
//! One tick:
//!
//! 1. re-establish the broker session if it dropped (blocking, fixed delay)
//! 2. poll the broker; the callback fills the command inbox
//! 3. read the clock
//! 4. collect due schedule entries
//! 5. measure distance, publish it, feed the edge detector
//! 6. take the pending command
//! 7. apply it, then dispense in the order manual → scheduled → proximity
//!
//! Dispensing blocks the loop.  No broker traffic is serviced and no
//! distance is sampled while the motor turns; the only outbound traffic is
//! the `Moving...` heartbeat.

use core::fmt::Write as _;

use embedded_hal::delay::DelayNs;
use log::{debug, info, warn};

use crate::config::FeederConfig;
use crate::error::{Error, LevelError, ScheduleError};
use crate::portion::{PortionLevel, PortionPolicy};
use crate::proximity::{EdgeDetector, ProximityEdge, ProximityState};
use crate::scheduler::{FeedingSchedule, FeedingTime, MAX_FEEDING_TIMES};

use super::commands::{
    CommandInbox, FeederCommand, INBOUND_TOPICS, STATUS_MOVING, TOPIC_DISTANCE, TOPIC_STATUS,
};
use super::events::{FeederEvent, Trigger};
use super::ports::{ActuatorPort, BrokerPort, ClockPort, DispenseObserver, EventSink, RangerPort};

/// Upper bound on dispenses in one tick: one manual, every schedule entry,
/// one proximity edge.
pub const MAX_DISPENSES_PER_TICK: usize = MAX_FEEDING_TIMES + 2;

// ───────────────────────────────────────────────────────────────
// Tick outcome
// ───────────────────────────────────────────────────────────────

/// One executed dispense.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dispense {
    pub trigger: Trigger,
    pub units: u8,
}

/// What a single tick observed and did.
#[derive(Debug, Clone)]
pub struct TickReport {
    pub distance_cm: u32,
    pub edge: Option<ProximityEdge>,
    /// Dispenses in execution order.
    pub dispensed: heapless::Vec<Dispense, MAX_DISPENSES_PER_TICK>,
}

impl TickReport {
    pub fn total_units(&self) -> u32 {
        self.dispensed.iter().map(|d| d.units as u32).sum()
    }
}

// ───────────────────────────────────────────────────────────────
// Ports bundle
// ───────────────────────────────────────────────────────────────

/// The driven adapters the core takes ownership of.
///
/// `hw` satisfies **both** [`ActuatorPort`] and [`RangerPort`]: the
/// stepper and the ranger sit on the same board adapter.
pub struct FeederPorts<H, C, B, D> {
    pub hw: H,
    pub clock: C,
    pub broker: B,
    /// Used for the reconnect back-off and the inter-tick sleep.
    pub delay: D,
}

// ───────────────────────────────────────────────────────────────
// FeederCore
// ───────────────────────────────────────────────────────────────

pub struct FeederCore<H, C, B, D> {
    ports: FeederPorts<H, C, B, D>,
    policy: PortionPolicy,
    level: PortionLevel,
    edge: EdgeDetector,
    schedule: FeedingSchedule,
    inbox: CommandInbox,
    /// True while the stepper is mid-dispense.
    busy: bool,
    tick_interval_ms: u32,
    reconnect_delay_ms: u32,
    tick_count: u64,
    dispensed_units_total: u64,
    /// Most recent rejected command or failed broker attempt.
    last_error: Option<Error>,
}

impl<H, C, B, D> FeederCore<H, C, B, D>
where
    H: ActuatorPort + RangerPort,
    C: ClockPort,
    B: BrokerPort,
    D: DelayNs,
{
    /// Construct the core.  The broker is not contacted until the first tick.
    pub fn new(config: &FeederConfig, ports: FeederPorts<H, C, B, D>) -> Self {
        Self {
            ports,
            policy: PortionPolicy::new(config.steps_per_unit),
            level: PortionLevel::clamped(config.default_level as i32),
            edge: EdgeDetector::new(config.proximity_threshold_cm),
            schedule: FeedingSchedule::new(),
            inbox: CommandInbox::new(),
            busy: false,
            tick_interval_ms: config.tick_interval_ms,
            reconnect_delay_ms: config.reconnect_delay_ms,
            tick_count: 0,
            dispensed_units_total: 0,
            last_error: None,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    pub fn start(&mut self, sink: &mut impl EventSink) {
        sink.emit(&FeederEvent::Started(self.level));
        info!(
            "FeederCore started (level={}, {} feeding time(s))",
            self.level,
            self.schedule.len()
        );
    }

    /// Tick forever at the configured cadence.
    pub fn run(&mut self, sink: &mut impl EventSink) -> ! {
        loop {
            self.tick(sink);
            self.ports.delay.delay_ms(self.tick_interval_ms);
        }
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Run one full control cycle.
    pub fn tick(&mut self, sink: &mut impl EventSink) -> TickReport {
        self.tick_count += 1;

        // 1. Broker session
        if !self.ports.broker.is_connected() {
            self.reconnect(sink);
        }

        // 2. Inbound messages → inbox
        let inbox = &mut self.inbox;
        let last_error = &mut self.last_error;
        self.ports.broker.poll(&mut |topic, payload| {
            match FeederCommand::parse(topic, payload) {
                Ok(cmd) => {
                    info!("Broker: message on {}: {:?}", topic, cmd);
                    inbox.put(cmd);
                }
                Err(e) => {
                    let err = Error::from(e);
                    warn!("Broker: ignoring message on {} ({})", topic, err);
                    *last_error = Some(err);
                    sink.emit(&FeederEvent::CommandRejected(e));
                }
            }
        });

        // 3. Wall clock
        let now = self.ports.clock.now();
        debug!("Current time: {}", now);

        // 4. Schedule
        let due = self.schedule.poll(&now);

        // 5. Proximity
        let distance_cm = self.ports.hw.measure();
        debug!("Distance: {} cm", distance_cm);
        let mut payload = heapless::String::<12>::new();
        let _ = write!(payload, "{}", distance_cm);
        self.ports.broker.publish(TOPIC_DISTANCE, &payload);
        let edge = self.edge.feed(distance_cm);

        let mut report = TickReport {
            distance_cm,
            edge,
            dispensed: heapless::Vec::new(),
        };

        // 6-7. Command, then dispenses in fixed order
        let manual = self
            .inbox
            .take()
            .and_then(|cmd| self.apply_command(cmd, sink));

        if let Some(units) = manual {
            self.dispense(Trigger::Manual, units, sink, &mut report);
        }
        for time in due {
            self.dispense(Trigger::Scheduled(time), self.level, sink, &mut report);
        }
        if edge.is_some() {
            self.dispense(Trigger::Proximity, self.level, sink, &mut report);
        }

        report
    }

    // ── Commands ──────────────────────────────────────────────

    /// Apply a remote command.  Returns the units to dispense for a manual
    /// feed; other commands only change state.
    fn apply_command(
        &mut self,
        cmd: FeederCommand,
        sink: &mut impl EventSink,
    ) -> Option<PortionLevel> {
        match cmd {
            FeederCommand::SetLevel(n) => {
                let _ = self.set_level(n, sink);
                None
            }
            FeederCommand::AddSchedule { hour, minute } => {
                let _ = self.add_schedule(hour, minute, sink);
                None
            }
            FeederCommand::ManualFeed(n) => {
                let units = PortionLevel::clamped(n);
                if units.units() as i32 != n {
                    warn!("Manual feed: {} clamped to {} unit(s)", n, units);
                }
                Some(units)
            }
        }
    }

    /// Change the portion level.  Out-of-range values leave it untouched.
    pub fn set_level(&mut self, n: i32, sink: &mut impl EventSink) -> Result<(), LevelError> {
        match PortionLevel::new(n) {
            Ok(level) => {
                let from = self.level;
                self.level = level;
                info!("Dispensing level set to: {}", level);
                sink.emit(&FeederEvent::LevelChanged { from, to: level });
                Ok(())
            }
            Err(e) => {
                let err = Error::from(e);
                warn!("Invalid level ({}); keeping {}", err, self.level);
                self.last_error = Some(err);
                sink.emit(&FeederEvent::LevelRejected(e));
                Err(e)
            }
        }
    }

    /// Append a feeding time.  Usable before the loop starts to seed the
    /// schedule at boot.
    pub fn add_schedule(
        &mut self,
        hour: u8,
        minute: u8,
        sink: &mut impl EventSink,
    ) -> Result<usize, ScheduleError> {
        match self.schedule.add(hour, minute) {
            Ok(slot) => {
                let time = FeedingTime { hour, minute };
                sink.emit(&FeederEvent::ScheduleAdded { time, slot });
                Ok(slot)
            }
            Err(e) => {
                self.last_error = Some(Error::from(e));
                sink.emit(&FeederEvent::ScheduleRejected(e));
                Err(e)
            }
        }
    }

    // ── Actuation ─────────────────────────────────────────────

    fn dispense(
        &mut self,
        trigger: Trigger,
        units: PortionLevel,
        sink: &mut impl EventSink,
        report: &mut TickReport,
    ) {
        if self.busy {
            warn!("Dispense: actuator busy, {:?} dropped", trigger);
            return;
        }

        let steps = self.policy.steps_for(units);
        info!("Dispense: {:?}, {} unit(s) ({} steps)", trigger, units, steps);

        self.busy = true;
        let mut heartbeat = StatusHeartbeat {
            broker: &mut self.ports.broker,
        };
        self.ports.hw.dispense(steps, &mut heartbeat);
        self.busy = false;

        self.dispensed_units_total += units.units() as u64;
        let done = Dispense {
            trigger,
            units: units.units(),
        };
        let _ = report.dispensed.push(done);
        sink.emit(&FeederEvent::Dispensed {
            trigger,
            units: units.units(),
        });
    }

    // ── Broker session ────────────────────────────────────────

    /// Block until the broker session is back and every inbound topic is
    /// subscribed again.  Retries forever with a fixed delay.
    fn reconnect(&mut self, sink: &mut impl EventSink) {
        let mut attempt: u32 = 0;
        loop {
            attempt = attempt.wrapping_add(1);
            info!("Broker: attempting connection (attempt {})", attempt);

            let result = self.ports.broker.connect().and_then(|()| {
                INBOUND_TOPICS
                    .iter()
                    .try_for_each(|topic| self.ports.broker.subscribe(topic))
            });

            match result {
                Ok(()) => {
                    info!("Broker: connected, {} topics subscribed", INBOUND_TOPICS.len());
                    sink.emit(&FeederEvent::BrokerConnected);
                    return;
                }
                Err(e) => {
                    let err = Error::from(e);
                    warn!(
                        "Broker: connect failed ({}), retrying in {} s",
                        err,
                        self.reconnect_delay_ms / 1_000
                    );
                    self.last_error = Some(err);
                    self.ports.delay.delay_ms(self.reconnect_delay_ms);
                }
            }
        }
    }

    // ── Queries ───────────────────────────────────────────────

    /// Current portion level.
    pub fn level(&self) -> PortionLevel {
        self.level
    }

    pub fn schedule(&self) -> &FeedingSchedule {
        &self.schedule
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn proximity(&self) -> ProximityState {
        self.edge.state()
    }

    /// Total control ticks executed since startup.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Units dispensed since startup, across every trigger.
    pub fn dispensed_units_total(&self) -> u64 {
        self.dispensed_units_total
    }

    /// Most recent failure the loop recovered from, if any.
    pub fn last_error(&self) -> Option<Error> {
        self.last_error
    }

    pub fn ports(&self) -> &FeederPorts<H, C, B, D> {
        &self.ports
    }

    pub fn ports_mut(&mut self) -> &mut FeederPorts<H, C, B, D> {
        &mut self.ports
    }
}

// ───────────────────────────────────────────────────────────────
// Heartbeat publisher
// ───────────────────────────────────────────────────────────────

/// Publishes `Moving...` on the status topic while the stepper turns.
struct StatusHeartbeat<'a, B: BrokerPort> {
    broker: &'a mut B,
}

impl<B: BrokerPort> DispenseObserver for StatusHeartbeat<'_, B> {
    fn on_heartbeat(&mut self, steps_done: u32, steps_total: u32) {
        debug!("Dispense: {}/{} steps", steps_done, steps_total);
        self.broker.publish(TOPIC_STATUS, STATUS_MOVING);
    }
}
