//! Wall-clock adapter.
//!
//! Implements [`ClockPort`] on top of the system clock, shifted by a fixed
//! UTC offset.
//!
//! - **`target_os = "espidf"`**: starts SNTP against the configured server
//!   and blocks in [`WallClock::new`] until the first sync completes.
//! - **`not(target_os = "espidf")`**: reads the host clock as-is.

use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{Datelike, FixedOffset, Timelike, Utc};
#[cfg(target_os = "espidf")]
use esp_idf_svc::sntp::{EspSntp, SntpConf, SyncStatus};
use log::info;

use crate::app::ports::{ClockPort, DateTime};
use crate::config::FeederConfig;
use crate::error::Error;

/// Local time source for the schedule.
pub struct WallClock {
    offset: FixedOffset,
    /// Keeps the SNTP service running.
    #[cfg(target_os = "espidf")]
    _sntp: EspSntp<'static>,
}

fn offset_from(config: &FeederConfig) -> Result<FixedOffset, Error> {
    FixedOffset::east_opt(config.utc_offset_secs)
        .ok_or(Error::Config("utc_offset_secs must be under one day"))
}

impl WallClock {
    #[cfg(target_os = "espidf")]
    pub fn new(config: &FeederConfig) -> Result<Self, Error> {
        let offset = offset_from(config)?;

        let mut conf = SntpConf::default();
        conf.servers[0] = config.ntp_server.as_str();
        let sntp = EspSntp::new(&conf).map_err(|_| Error::Init("SNTP start failed"))?;

        info!("Clock: waiting for SNTP sync from {}", config.ntp_server);
        let mut waited_ms: u32 = 0;
        while sntp.get_sync_status() != SyncStatus::Completed {
            esp_idf_hal::delay::FreeRtos::delay_ms(100);
            waited_ms += 100;
            if waited_ms % 5_000 == 0 {
                info!("Clock: still waiting for SNTP ({} s)", waited_ms / 1_000);
            }
        }

        let clock = Self {
            offset,
            _sntp: sntp,
        };
        info!("Clock: synchronised, local time {}", clock.now());
        Ok(clock)
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn new(config: &FeederConfig) -> Result<Self, Error> {
        let clock = Self {
            offset: offset_from(config)?,
        };
        info!("Clock(sim): host time, local {}", clock.now());
        Ok(clock)
    }
}

impl ClockPort for WallClock {
    fn now(&self) -> DateTime {
        let unix = match SystemTime::now().duration_since(UNIX_EPOCH) {
            Ok(d) => d.as_secs() as i64,
            Err(_) => 0,
        };
        local_time(unix, self.offset)
    }
}

/// Local calendar time for `unix_secs` at a fixed UTC offset.  Instants
/// chrono cannot represent read as the epoch.
pub fn local_time(unix_secs: i64, offset: FixedOffset) -> DateTime {
    let utc = chrono::DateTime::<Utc>::from_timestamp(unix_secs, 0).unwrap_or_default();
    let local = utc.with_timezone(&offset);
    DateTime {
        year: local.year().clamp(0, i32::from(u16::MAX)) as u16,
        month: local.month() as u8,
        day: local.day() as u8,
        hour: local.hour() as u8,
        minute: local.minute() as u8,
        second: local.second() as u8,
    }
}
