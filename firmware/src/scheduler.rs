//! Wall-clock feeding schedule.
//!
//! Coexists with the proximity trigger.  The control loop polls the
//! schedule once per tick with the current wall-clock time and dispenses
//! one portion for every entry that comes due.
//!
//! ```text
//!   ┌──────────────┐  now   ┌──────────────────────────┐  due entries
//!   │  ClockPort   │ ─────▶ │ FeedingSchedule::poll()  │ ────────────▶ FeederCore
//!   └──────────────┘        │  [entry | last_fired] ×10│
//!                           └──────────────────────────┘
//! ```
//!
//! Each entry carries the (date, hour, minute) stamp of its last firing.
//! An entry is due when the clock shows its hour and minute and the stamp
//! does not already match today, so a minute visited by many ticks still
//! fires once.  A minute the device sleeps through is simply missed.

use core::fmt;

use log::{info, warn};

use crate::app::ports::DateTime;
use crate::error::ScheduleError;

// ═══════════════════════════════════════════════════════════════
//  Schedule types
// ═══════════════════════════════════════════════════════════════

/// Maximum number of feeding times.
pub const MAX_FEEDING_TIMES: usize = 10;

/// Time of day at which to feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedingTime {
    pub hour: u8,
    pub minute: u8,
}

impl FeedingTime {
    pub fn new(hour: u8, minute: u8) -> Result<Self, ScheduleError> {
        if hour > 23 {
            return Err(ScheduleError::HourOutOfRange(hour));
        }
        if minute > 59 {
            return Err(ScheduleError::MinuteOutOfRange(minute));
        }
        Ok(Self { hour, minute })
    }

    fn matches(&self, now: &DateTime) -> bool {
        self.hour == now.hour && self.minute == now.minute
    }
}

impl fmt::Display for FeedingTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

/// Date-stamped minute used to suppress re-firing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct MinuteStamp {
    year: u16,
    month: u8,
    day: u8,
    hour: u8,
    minute: u8,
}

impl From<&DateTime> for MinuteStamp {
    fn from(dt: &DateTime) -> Self {
        Self {
            year: dt.year,
            month: dt.month,
            day: dt.day,
            hour: dt.hour,
            minute: dt.minute,
        }
    }
}

/// Internal bookkeeping for a stored feeding time.
#[derive(Debug, Clone)]
struct ScheduleEntry {
    time: FeedingTime,
    last_fired: Option<MinuteStamp>,
}

// ═══════════════════════════════════════════════════════════════
//  Schedule engine
// ═══════════════════════════════════════════════════════════════

/// Append-only list of feeding times for the current session.
///
/// Duplicate times are independent entries: both fire.
#[derive(Debug, Clone, Default)]
pub struct FeedingSchedule {
    entries: heapless::Vec<ScheduleEntry, MAX_FEEDING_TIMES>,
}

impl FeedingSchedule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a feeding time.  Returns the slot index.
    ///
    /// Out-of-range times and a full schedule are rejected and leave the
    /// existing entries untouched.
    pub fn add(&mut self, hour: u8, minute: u8) -> Result<usize, ScheduleError> {
        let time = FeedingTime::new(hour, minute).inspect_err(|e| {
            warn!("Schedule: rejected {:02}:{:02} ({})", hour, minute, e);
        })?;

        let slot = self.entries.len();
        if self
            .entries
            .push(ScheduleEntry {
                time,
                last_fired: None,
            })
            .is_err()
        {
            warn!("Schedule: full ({} entries), {} not added", MAX_FEEDING_TIMES, time);
            return Err(ScheduleError::Full);
        }

        info!("Schedule: added {} at slot {}", time, slot);
        Ok(slot)
    }

    /// Return every entry due at `now`, marking each as fired for this
    /// (date, minute) before returning it.
    pub fn poll(&mut self, now: &DateTime) -> heapless::Vec<FeedingTime, MAX_FEEDING_TIMES> {
        let stamp = MinuteStamp::from(now);
        let mut due = heapless::Vec::new();

        for entry in self.entries.iter_mut() {
            if !entry.time.matches(now) || entry.last_fired == Some(stamp) {
                continue;
            }
            entry.last_fired = Some(stamp);
            // Capacities are equal, so this never overflows.
            let _ = due.push(entry.time);
        }

        if !due.is_empty() {
            info!("Schedule: {} feeding(s) due at {}", due.len(), now);
        }
        due
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Stored feeding times in insertion order.
    pub fn times(&self) -> impl Iterator<Item = FeedingTime> + '_ {
        self.entries.iter().map(|e| e.time)
    }
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════
