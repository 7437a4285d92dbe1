//! Mock adapters for integration tests.
//!
//! Record every port call so tests can assert on the full history without
//! touching real GPIO or a network.

use std::collections::VecDeque;

use embedded_hal::delay::DelayNs;
use petfeeder::app::events::FeederEvent;
use petfeeder::app::ports::{
    ActuatorPort, BrokerPort, ClockPort, DateTime, DispenseObserver, EventSink, RangerPort,
};
use petfeeder::app::service::{FeederCore, FeederPorts};
use petfeeder::config::FeederConfig;
use petfeeder::error::CommsError;

/// Distance the mock ranger reports once its script runs out.
pub const FAR_CM: u32 = 50;

// ── MockHardware ──────────────────────────────────────────────

pub struct MockHardware {
    /// Step count of every dispense, in call order.
    pub dispenses: Vec<u32>,
    /// Distances returned by successive `measure()` calls.
    pub distances: VecDeque<u32>,
    pub measure_calls: u32,
    /// Heartbeat spacing used when replaying a dispense.
    pub heartbeat_every: u32,
}

#[allow(dead_code)]
impl MockHardware {
    pub fn new() -> Self {
        Self {
            dispenses: Vec::new(),
            distances: VecDeque::new(),
            measure_calls: 0,
            heartbeat_every: 64,
        }
    }

    pub fn script_distances(&mut self, samples: &[u32]) {
        self.distances.extend(samples.iter().copied());
    }
}

impl Default for MockHardware {
    fn default() -> Self {
        Self::new()
    }
}

impl ActuatorPort for MockHardware {
    fn dispense(&mut self, steps: u32, observer: &mut dyn DispenseObserver) {
        self.dispenses.push(steps);
        let every = self.heartbeat_every.max(1);
        for done in (every..=steps).step_by(every as usize) {
            observer.on_heartbeat(done, steps);
        }
    }
}

impl RangerPort for MockHardware {
    fn measure(&mut self) -> u32 {
        self.measure_calls += 1;
        self.distances.pop_front().unwrap_or(FAR_CM)
    }
}

// ── MockClock ─────────────────────────────────────────────────

pub struct MockClock {
    pub now: DateTime,
}

#[allow(dead_code)]
impl MockClock {
    pub fn at(hour: u8, minute: u8) -> Self {
        Self {
            now: DateTime {
                year: 2024,
                month: 6,
                day: 1,
                hour,
                minute,
                second: 0,
            },
        }
    }

    pub fn set(&mut self, hour: u8, minute: u8) {
        self.now.hour = hour;
        self.now.minute = minute;
    }

    pub fn next_day(&mut self) {
        self.now.day += 1;
    }
}

impl ClockPort for MockClock {
    fn now(&self) -> DateTime {
        self.now
    }
}

// ── MockBroker ────────────────────────────────────────────────

#[derive(Default)]
pub struct MockBroker {
    pub connected: bool,
    /// Number of upcoming `connect()` calls that fail.
    pub failures_pending: u32,
    pub connect_attempts: u32,
    pub subscriptions: Vec<String>,
    pub published: Vec<(String, String)>,
    pub inbound: VecDeque<(String, Vec<u8>)>,
    pub polls: u32,
}

#[allow(dead_code)]
impl MockBroker {
    pub fn send(&mut self, topic: &str, payload: &str) {
        self.inbound
            .push_back((topic.to_string(), payload.as_bytes().to_vec()));
    }

    pub fn drop_session(&mut self) {
        self.connected = false;
        self.subscriptions.clear();
    }

    pub fn published_on(&self, topic: &str) -> Vec<&str> {
        self.published
            .iter()
            .filter(|(t, _)| t == topic)
            .map(|(_, p)| p.as_str())
            .collect()
    }
}

impl BrokerPort for MockBroker {
    fn is_connected(&self) -> bool {
        self.connected
    }

    fn connect(&mut self) -> Result<(), CommsError> {
        self.connect_attempts += 1;
        if self.failures_pending > 0 {
            self.failures_pending -= 1;
            return Err(CommsError::BrokerUnavailable);
        }
        self.connected = true;
        Ok(())
    }

    fn subscribe(&mut self, topic: &str) -> Result<(), CommsError> {
        if !self.connected {
            return Err(CommsError::SubscribeFailed);
        }
        self.subscriptions.push(topic.to_string());
        Ok(())
    }

    fn publish(&mut self, topic: &str, payload: &str) {
        if self.connected {
            self.published.push((topic.to_string(), payload.to_string()));
        }
    }

    fn poll(&mut self, on_message: &mut dyn FnMut(&str, &[u8])) {
        self.polls += 1;
        if !self.connected {
            return;
        }
        while let Some((topic, payload)) = self.inbound.pop_front() {
            on_message(&topic, &payload);
        }
    }
}

// ── MockDelay ─────────────────────────────────────────────────

/// Records requested sleeps instead of sleeping.
#[derive(Default)]
pub struct MockDelay {
    pub slept_ns: u64,
}

impl DelayNs for MockDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.slept_ns += ns as u64;
    }
}

// ── RecordingSink ─────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<FeederEvent>,
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &FeederEvent) {
        self.events.push(event.clone());
    }
}

// ── Harness ───────────────────────────────────────────────────

pub type TestFeeder = FeederCore<MockHardware, MockClock, MockBroker, MockDelay>;

/// Steps per unit used by every harness feeder.
pub const STEPS_PER_UNIT: u32 = 100;

/// A started feeder at 12:00.  The broker connects on the first tick.
#[allow(dead_code)]
pub fn feeder() -> (TestFeeder, RecordingSink) {
    feeder_with(FeederConfig {
        steps_per_unit: STEPS_PER_UNIT,
        ..FeederConfig::default()
    })
}

pub fn feeder_with(config: FeederConfig) -> (TestFeeder, RecordingSink) {
    let ports = FeederPorts {
        hw: MockHardware::new(),
        clock: MockClock::at(12, 0),
        broker: MockBroker::default(),
        delay: MockDelay::default(),
    };
    let mut sink = RecordingSink::default();
    let mut feeder = FeederCore::new(&config, ports);
    feeder.start(&mut sink);
    (feeder, sink)
}

/// Units per dispense as seen by the hardware.
#[allow(dead_code)]
pub fn dispensed_units(feeder: &TestFeeder) -> Vec<u32> {
    feeder
        .ports()
        .hw
        .dispenses
        .iter()
        .map(|steps| steps / STEPS_PER_UNIT)
        .collect()
}
