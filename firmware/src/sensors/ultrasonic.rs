//! HC-SR04 style ultrasonic ranger.
//!
//! A 10 µs trigger pulse starts a measurement; the sensor answers with an
//! echo pulse whose width is the round-trip time of flight.  The echo is
//! timed by polling the echo pin against a microsecond time source.
//!
//! A missing echo (no rise, or no fall, within `echo_timeout_us`) reads as
//! [`NO_ECHO_CM`], which is always "far".

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use log::{debug, warn};

use crate::app::ports::RangerPort;

/// Distance reported when no echo was seen.
pub const NO_ECHO_CM: u32 = 999;

/// Convert an echo pulse width to centimetres: half the round trip at
/// 29.1 µs per centimetre.
pub fn echo_to_cm(width_us: u32) -> u32 {
    (width_us / 2) * 10 / 291
}

pub struct UltrasonicRanger<T, E, D> {
    trig: T,
    echo: E,
    delay: D,
    /// Monotonic microsecond counter.
    micros: fn() -> u64,
    echo_timeout_us: u32,
    pin_fault_logged: bool,
}

impl<T: OutputPin, E: InputPin, D: DelayNs> UltrasonicRanger<T, E, D> {
    pub fn new(trig: T, echo: E, delay: D, micros: fn() -> u64, echo_timeout_us: u32) -> Self {
        Self {
            trig,
            echo,
            delay,
            micros,
            echo_timeout_us,
            pin_fault_logged: false,
        }
    }

    /// Fire one measurement and return the echo width, or `None` on timeout.
    pub fn ping(&mut self) -> Option<u32> {
        let fired = self.trig.set_low().is_ok() && {
            self.delay.delay_us(2);
            let high = self.trig.set_high().is_ok();
            self.delay.delay_us(10);
            high && self.trig.set_low().is_ok()
        };
        if !fired {
            if !self.pin_fault_logged {
                warn!("Ranger: trigger pin write failed");
                self.pin_fault_logged = true;
            }
            return None;
        }

        let start = self.wait_for(true, (self.micros)())?;
        let end = self.wait_for(false, start)?;
        Some(end.saturating_sub(start) as u32)
    }

    /// Spin until the echo pin reads `level`.  Returns the time it did, or
    /// `None` once `echo_timeout_us` has passed since `since`.
    fn wait_for(&mut self, level: bool, since: u64) -> Option<u64> {
        loop {
            let now = (self.micros)();
            if self.echo.is_high().ok()? == level {
                return Some(now);
            }
            if now.saturating_sub(since) >= self.echo_timeout_us as u64 {
                return None;
            }
        }
    }
}

impl<T: OutputPin, E: InputPin, D: DelayNs> RangerPort for UltrasonicRanger<T, E, D> {
    fn measure(&mut self) -> u32 {
        match self.ping() {
            Some(width) => echo_to_cm(width),
            None => {
                debug!("Ranger: no echo");
                NO_ECHO_CM
            }
        }
    }
}
