//! Fuzz target: `FeederCommand::parse`
//!
//! The first byte picks one of the inbound topics (or an unknown one); the
//! rest is the payload.  Parsing must never panic, and every accepted
//! feeding time must be made of two-digit fields.
//!
//! cargo fuzz run fuzz_command_parse

#![no_main]

use libfuzzer_sys::fuzz_target;
use petfeeder::app::commands::{FeederCommand, INBOUND_TOPICS};
use petfeeder::error::CommandError;

fuzz_target!(|data: &[u8]| {
    let Some((&selector, payload)) = data.split_first() else {
        return;
    };
    let topic = INBOUND_TOPICS
        .get(selector as usize % (INBOUND_TOPICS.len() + 1))
        .copied()
        .unwrap_or("pet-feeder/unknown");

    match FeederCommand::parse(topic, payload) {
        Ok(FeederCommand::AddSchedule { hour, minute }) => {
            assert_eq!(payload.len(), 5);
            assert!(hour <= 99 && minute <= 99);
        }
        Ok(_) => {}
        Err(CommandError::UnknownTopic) => assert!(!INBOUND_TOPICS.contains(&topic)),
        Err(_) => {}
    }
});
