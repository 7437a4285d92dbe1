//! Unipolar stepper driver (28BYJ-48 through a ULN2003 array).
//!
//! Four GPIOs (IN1..IN4) energise the coils in the 8-phase half-step
//! sequence.  One *step* here is one full pass through that sequence, with
//! the configured delay after every phase.
//!
//! ## Dispense contract
//!
//! `dispense(steps)` turns the gate forward by `steps`, then optionally
//! turns it back by the same amount to close it.  Whether the hardware needs
//! the reverse close is a calibration choice (`reverse_close`).  Coils are
//! released afterwards so the motor does not sit energised between feeds.
//!
//! The driver is open-loop and blocking; GPIO write failures are logged and
//! otherwise ignored.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{OutputPin, PinState};
use log::warn;

use crate::app::ports::{ActuatorPort, DispenseObserver};

/// Coil pattern per phase, IN1..IN4.
pub const HALF_STEP_SEQUENCE: [[bool; 4]; 8] = [
    [true, false, false, false],
    [true, true, false, false],
    [false, true, false, false],
    [false, true, true, false],
    [false, false, true, false],
    [false, false, true, true],
    [false, false, false, true],
    [true, false, false, true],
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Reverse,
}

/// Calibration for one physical feeder.
#[derive(Debug, Clone, Copy)]
pub struct StepperTiming {
    pub step_delay_ms: u32,
    pub reverse_close: bool,
    /// Report progress once per this many steps.
    pub heartbeat_every_steps: u32,
}

pub struct StepperDriver<P, D> {
    coils: [P; 4],
    delay: D,
    timing: StepperTiming,
    write_failed: bool,
}

impl<P: OutputPin, D: DelayNs> StepperDriver<P, D> {
    pub fn new(coils: [P; 4], delay: D, timing: StepperTiming) -> Self {
        Self {
            coils,
            delay,
            timing,
            write_failed: false,
        }
    }

    /// Turn `steps` steps in `direction`, reporting progress every
    /// `heartbeat_every_steps`.  `offset`/`total` place this run inside a
    /// larger dispense for reporting.
    pub fn rotate(
        &mut self,
        steps: u32,
        direction: Direction,
        offset: u32,
        total: u32,
        observer: &mut dyn DispenseObserver,
    ) {
        let every = self.timing.heartbeat_every_steps.max(1);
        for i in 0..steps {
            match direction {
                Direction::Forward => {
                    for phase in HALF_STEP_SEQUENCE {
                        self.energise(phase);
                    }
                }
                Direction::Reverse => {
                    for phase in HALF_STEP_SEQUENCE.into_iter().rev() {
                        self.energise(phase);
                    }
                }
            }

            let done = offset.saturating_add(i).saturating_add(1);
            if done % every == 0 {
                observer.on_heartbeat(done, total);
            }
        }
    }

    /// Drive every coil low.
    pub fn release(&mut self) {
        self.write_coils([false; 4]);
    }

    fn energise(&mut self, phase: [bool; 4]) {
        self.write_coils(phase);
        self.delay.delay_ms(self.timing.step_delay_ms);
    }

    fn write_coils(&mut self, levels: [bool; 4]) {
        for (pin, high) in self.coils.iter_mut().zip(levels) {
            if pin.set_state(PinState::from(high)).is_err() {
                self.write_failed = true;
            }
        }
    }
}

impl<P: OutputPin, D: DelayNs> ActuatorPort for StepperDriver<P, D> {
    fn dispense(&mut self, steps: u32, observer: &mut dyn DispenseObserver) {
        let total = if self.timing.reverse_close {
            steps.saturating_mul(2)
        } else {
            steps
        };

        self.rotate(steps, Direction::Forward, 0, total, observer);
        if self.timing.reverse_close {
            self.rotate(steps, Direction::Reverse, steps, total, observer);
        }
        self.release();

        if core::mem::take(&mut self.write_failed) {
            warn!("Stepper: coil write failed during dispense of {} steps", steps);
        }
    }
}
