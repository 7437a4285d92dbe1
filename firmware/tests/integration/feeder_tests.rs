//! End-to-end tests for the FeederCore tick against mock adapters.
//!
//! Covers the documented scenarios (approach feeding, schedule firing,
//! manual feeds, schedule rejection, broker loss, pet lingering at the
//! bowl) plus trigger arbitration and command handling.

use crate::mock_hw::{FAR_CM, STEPS_PER_UNIT, dispensed_units, feeder, feeder_with};

use petfeeder::app::commands::{
    INBOUND_TOPICS, STATUS_MOVING, TOPIC_DISPENSING_LEVEL, TOPIC_DISTANCE, TOPIC_FEEDING_TIME,
    TOPIC_MANUAL_FEED, TOPIC_STATUS,
};
use petfeeder::app::events::{FeederEvent, Trigger};
use petfeeder::app::service::Dispense;
use petfeeder::config::FeederConfig;
use petfeeder::error::{CommandError, CommsError, Error, LevelError, ScheduleError};
use petfeeder::proximity::ProximityState;
use petfeeder::scheduler::FeedingTime;

// ── Scenarios ─────────────────────────────────────────────────

#[test]
fn approach_feeds_once_per_arrival() {
    let (mut f, mut sink) = feeder();
    f.ports_mut().broker.send(TOPIC_DISPENSING_LEVEL, "3");
    f.tick(&mut sink);
    assert_eq!(f.level().units(), 3);

    f.ports_mut().hw.script_distances(&[20, 20, 8, 7, 20, 6]);
    let mut edges = 0;
    for _ in 0..6 {
        let report = f.tick(&mut sink);
        edges += report.dispensed.len();
    }

    assert_eq!(edges, 2);
    assert_eq!(dispensed_units(&f), vec![3, 3]);
}

#[test]
fn schedule_fires_once_in_its_minute() {
    let (mut f, mut sink) = feeder();
    f.add_schedule(8, 0, &mut sink).unwrap();
    f.add_schedule(18, 0, &mut sink).unwrap();

    let mut fired = Vec::new();
    for (h, m) in [(7, 59), (8, 0), (8, 0), (8, 1)] {
        f.ports_mut().clock.set(h, m);
        fired.push(f.tick(&mut sink).dispensed.len());
    }

    assert_eq!(fired, vec![0, 1, 0, 0]);
    assert_eq!(dispensed_units(&f), vec![f.level().units() as u32]);
}

#[test]
fn manual_feed_ignores_and_keeps_level() {
    let (mut f, mut sink) = feeder();
    f.set_level(2, &mut sink).unwrap();

    f.ports_mut().broker.send(TOPIC_MANUAL_FEED, "5");
    let report = f.tick(&mut sink);

    assert_eq!(
        report.dispensed.as_slice(),
        &[Dispense {
            trigger: Trigger::Manual,
            units: 5
        }]
    );
    assert_eq!(dispensed_units(&f), vec![5]);
    assert_eq!(f.level().units(), 2);
}

#[test]
fn out_of_range_feeding_time_is_rejected() {
    let (mut f, mut sink) = feeder();
    f.ports_mut().broker.send(TOPIC_FEEDING_TIME, "25:00");
    f.tick(&mut sink);

    assert!(f.schedule().is_empty());
    assert!(
        sink.events
            .iter()
            .any(|e| matches!(e, FeederEvent::ScheduleRejected(ScheduleError::HourOutOfRange(25))))
    );
}

#[test]
fn broker_loss_resubscribes_without_feeding() {
    let (mut f, mut sink) = feeder();
    f.tick(&mut sink);
    assert_eq!(f.ports().broker.subscriptions, INBOUND_TOPICS);

    f.ports_mut().broker.drop_session();
    f.ports_mut().broker.failures_pending = 2;
    let attempts_before = f.ports().broker.connect_attempts;
    let slept_before = f.ports().delay.slept_ns;

    let report = f.tick(&mut sink);

    assert!(report.dispensed.is_empty());
    assert!(f.ports().hw.dispenses.is_empty());
    assert!(f.ports().broker.connected);
    assert_eq!(f.ports().broker.subscriptions, INBOUND_TOPICS);
    assert_eq!(f.ports().broker.connect_attempts - attempts_before, 3);
    assert_eq!(f.last_error(), Some(Error::Comms(CommsError::BrokerUnavailable)));
    // Two failed attempts, each followed by the fixed back-off.
    let backoff_ns = 5_000 * 1_000_000u64;
    assert_eq!(f.ports().delay.slept_ns - slept_before, 2 * backoff_ns);
}

#[test]
fn lingering_pet_is_fed_once() {
    let (mut f, mut sink) = feeder();
    f.ports_mut().hw.script_distances(&[6, 6, 6, 6]);

    let total: usize = (0..4).map(|_| f.tick(&mut sink).dispensed.len()).sum();

    assert_eq!(total, 1);
    assert_eq!(f.proximity(), ProximityState::Near);
}

// ── Arbitration ───────────────────────────────────────────────

#[test]
fn simultaneous_triggers_run_manual_then_schedule_then_edge() {
    let (mut f, mut sink) = feeder();
    f.set_level(2, &mut sink).unwrap();
    // Duplicate entries fire independently.
    f.add_schedule(12, 0, &mut sink).unwrap();
    f.add_schedule(12, 0, &mut sink).unwrap();
    f.ports_mut().broker.send(TOPIC_MANUAL_FEED, "4");
    f.ports_mut().hw.script_distances(&[5]);

    let report = f.tick(&mut sink);

    let noon = FeedingTime { hour: 12, minute: 0 };
    let order: Vec<(Trigger, u8)> = report
        .dispensed
        .iter()
        .map(|d| (d.trigger, d.units))
        .collect();
    assert_eq!(
        order,
        vec![
            (Trigger::Manual, 4),
            (Trigger::Scheduled(noon), 2),
            (Trigger::Scheduled(noon), 2),
            (Trigger::Proximity, 2),
        ]
    );
    assert_eq!(report.total_units(), 4 + 2 * 2 + 2);
    assert_eq!(f.dispensed_units_total(), 10);
    assert!(!f.is_busy());
}

// ── Commands ──────────────────────────────────────────────────

#[test]
fn invalid_level_keeps_current() {
    let (mut f, mut sink) = feeder();
    f.ports_mut().broker.send(TOPIC_DISPENSING_LEVEL, "11");
    f.tick(&mut sink);

    assert_eq!(f.level().units(), 1);
    assert!(
        sink.events
            .iter()
            .any(|e| matches!(e, FeederEvent::LevelRejected(LevelError::OutOfRange(11))))
    );
}

#[test]
fn manual_feed_is_clamped() {
    let (mut f, mut sink) = feeder();
    f.ports_mut().broker.send(TOPIC_MANUAL_FEED, "0");
    f.tick(&mut sink);
    f.ports_mut().broker.send(TOPIC_MANUAL_FEED, "15");
    f.tick(&mut sink);

    assert_eq!(dispensed_units(&f), vec![1, 10]);
}

#[test]
fn newest_command_wins_within_a_tick() {
    let (mut f, mut sink) = feeder();
    f.ports_mut().broker.send(TOPIC_DISPENSING_LEVEL, "7");
    f.ports_mut().broker.send(TOPIC_MANUAL_FEED, "2");
    f.tick(&mut sink);

    assert_eq!(f.level().units(), 1, "overwritten SetLevel never applied");
    assert_eq!(dispensed_units(&f), vec![2]);
}

#[test]
fn malformed_payload_is_reported_and_ignored() {
    let (mut f, mut sink) = feeder();
    f.ports_mut().broker.send(TOPIC_FEEDING_TIME, "8:00");
    f.ports_mut().broker.send(TOPIC_MANUAL_FEED, "two");
    f.tick(&mut sink);

    assert!(f.ports().hw.dispenses.is_empty());
    assert!(f.schedule().is_empty());
    let rejected: Vec<_> = sink
        .events
        .iter()
        .filter_map(|e| match e {
            FeederEvent::CommandRejected(c) => Some(*c),
            _ => None,
        })
        .collect();
    assert_eq!(
        rejected,
        vec![CommandError::MalformedTime, CommandError::NotAnInteger]
    );
}

#[test]
fn remote_schedule_entry_fires_later() {
    let (mut f, mut sink) = feeder();
    f.ports_mut().broker.send(TOPIC_FEEDING_TIME, "12:01");
    f.tick(&mut sink);
    assert_eq!(f.schedule().len(), 1);

    f.ports_mut().clock.set(12, 1);
    assert_eq!(f.tick(&mut sink).dispensed.len(), 1);

    // Same minute on the next day fires again.
    f.ports_mut().clock.next_day();
    assert_eq!(f.tick(&mut sink).dispensed.len(), 1);
}

// ── Telemetry ─────────────────────────────────────────────────

#[test]
fn distance_is_published_every_tick() {
    let (mut f, mut sink) = feeder();
    f.ports_mut().hw.script_distances(&[42, 999]);
    for _ in 0..3 {
        f.tick(&mut sink);
    }

    let far = FAR_CM.to_string();
    assert_eq!(
        f.ports().broker.published_on(TOPIC_DISTANCE),
        vec!["42", "999", far.as_str()]
    );
    assert_eq!(f.tick_count(), 3);
}

#[test]
fn dispense_publishes_moving_heartbeats() {
    let (mut f, mut sink) = feeder();
    f.ports_mut().broker.send(TOPIC_MANUAL_FEED, "5");
    f.tick(&mut sink);

    let steps = 5 * STEPS_PER_UNIT;
    let beats = f.ports().broker.published_on(TOPIC_STATUS);
    assert_eq!(beats.len() as u32, steps / 64);
    assert!(beats.iter().all(|p| *p == STATUS_MOVING));
}

#[test]
fn default_level_comes_from_config() {
    let (f, sink) = feeder_with(FeederConfig {
        default_level: 4,
        ..FeederConfig::default()
    });
    assert_eq!(f.level().units(), 4);
    assert!(matches!(sink.events.first(), Some(FeederEvent::Started(l)) if l.units() == 4));
}

// ── Error tracking ────────────────────────────────────────────

#[test]
fn last_error_tracks_latest_rejection() {
    let (mut f, mut sink) = feeder();
    f.tick(&mut sink);
    assert_eq!(f.last_error(), None);

    f.ports_mut().broker.send(TOPIC_MANUAL_FEED, "two");
    f.tick(&mut sink);
    assert_eq!(f.last_error(), Some(Error::Command(CommandError::NotAnInteger)));

    f.ports_mut().broker.send(TOPIC_DISPENSING_LEVEL, "0");
    f.tick(&mut sink);
    assert_eq!(f.last_error(), Some(Error::Level(LevelError::OutOfRange(0))));

    f.ports_mut().broker.send(TOPIC_FEEDING_TIME, "12:75");
    f.tick(&mut sink);
    assert_eq!(
        f.last_error(),
        Some(Error::Schedule(ScheduleError::MinuteOutOfRange(75)))
    );
    assert_eq!(
        f.last_error().map(|e| e.to_string()).as_deref(),
        Some("schedule: minute 75 out of range")
    );
}
