//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured feeder events to the
//! ESP-IDF logger (UART in production).

use log::{info, warn};

use crate::app::events::{FeederEvent, Trigger};
use crate::app::ports::EventSink;

/// Adapter that logs every [`FeederEvent`] to the serial console.
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &FeederEvent) {
        match event {
            FeederEvent::Started(level) => {
                info!("START | level={}", level);
            }
            FeederEvent::Dispensed { trigger, units } => match trigger {
                Trigger::Manual => info!("FEED | manual | units={}", units),
                Trigger::Scheduled(at) => {
                    info!("FEED | scheduled {} | units={}", at, units)
                }
                Trigger::Proximity => info!("FEED | proximity | units={}", units),
            },
            FeederEvent::LevelChanged { from, to } => {
                info!("LEVEL | {} -> {}", from, to);
            }
            FeederEvent::LevelRejected(e) => {
                warn!("LEVEL | rejected: {}", e);
            }
            FeederEvent::ScheduleAdded { time, slot } => {
                info!("SCHED | added {} in slot {}", time, slot);
            }
            FeederEvent::ScheduleRejected(e) => {
                warn!("SCHED | rejected: {}", e);
            }
            FeederEvent::CommandRejected(e) => {
                warn!("BROKER | command rejected: {}", e);
            }
            FeederEvent::BrokerConnected => {
                info!("BROKER | connected");
            }
        }
    }
}
