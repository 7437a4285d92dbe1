//! Hardware adapter: bridges the feeder board to domain port traits.
//!
//! Owns the stepper and the ultrasonic ranger, exposing them through
//! [`ActuatorPort`] and [`RangerPort`].  On host targets the underlying
//! GPIO calls are cfg-gated simulation stubs.

use crate::app::ports::{ActuatorPort, DispenseObserver, RangerPort};
use crate::config::FeederConfig;
use crate::drivers::hw_init::{self, GpioIn, GpioOut, STEPPER_GPIOS, SysDelay};
use crate::drivers::stepper::{StepperDriver, StepperTiming};
use crate::pins;
use crate::sensors::ultrasonic::UltrasonicRanger;

pub type BoardStepper = StepperDriver<GpioOut, SysDelay>;
pub type BoardRanger = UltrasonicRanger<GpioOut, GpioIn, SysDelay>;

/// Concrete adapter that combines the feeder hardware behind port traits.
pub struct HardwareAdapter {
    stepper: BoardStepper,
    ranger: BoardRanger,
}

impl HardwareAdapter {
    pub fn new(stepper: BoardStepper, ranger: BoardRanger) -> Self {
        Self { stepper, ranger }
    }

    /// Build the drivers on the board pins from `pins`.
    /// [`hw_init::init_peripherals`] must have run first.
    pub fn from_config(config: &FeederConfig) -> Self {
        let timing = StepperTiming {
            step_delay_ms: config.step_delay_ms,
            reverse_close: config.reverse_close,
            heartbeat_every_steps: config.heartbeat_every_steps,
        };
        let stepper = StepperDriver::new(STEPPER_GPIOS.map(GpioOut), SysDelay, timing);
        let ranger = UltrasonicRanger::new(
            GpioOut(pins::RANGER_TRIG_GPIO),
            GpioIn(pins::RANGER_ECHO_GPIO),
            SysDelay,
            hw_init::uptime_us,
            config.echo_timeout_us,
        );
        Self::new(stepper, ranger)
    }
}

// ── ActuatorPort implementation ───────────────────────────────

impl ActuatorPort for HardwareAdapter {
    fn dispense(&mut self, steps: u32, observer: &mut dyn DispenseObserver) {
        self.stepper.dispense(steps, observer);
    }
}

// ── RangerPort implementation ─────────────────────────────────

impl RangerPort for HardwareAdapter {
    fn measure(&mut self) -> u32 {
        self.ranger.measure()
    }
}
