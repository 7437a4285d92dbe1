//! One-shot GPIO initialization and raw pin access.
//!
//! Configures the stepper and ranger pins using raw ESP-IDF sys calls and
//! wraps them in [`GpioOut`] / [`GpioIn`] so the `embedded-hal` drivers can
//! own them.  Called once from `main()` before the control loop starts.
//!
//! On host builds every call is a simulation stub: writes are dropped and
//! reads return low.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

use core::convert::Infallible;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorType, InputPin, OutputPin};

use crate::pins;

// ── Error type ────────────────────────────────────────────────

/// Errors during one-shot peripheral initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwInitError {
    GpioConfigFailed { gpio: i32, rc: i32 },
}

impl core::fmt::Display for HwInitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::GpioConfigFailed { gpio, rc } => {
                write!(f, "GPIO{} config failed (rc={})", gpio, rc)
            }
        }
    }
}

pub const STEPPER_GPIOS: [i32; 4] = [
    pins::STEPPER_IN1_GPIO,
    pins::STEPPER_IN2_GPIO,
    pins::STEPPER_IN3_GPIO,
    pins::STEPPER_IN4_GPIO,
];

#[cfg(target_os = "espidf")]
pub fn init_peripherals() -> Result<(), HwInitError> {
    let outputs = STEPPER_GPIOS
        .iter()
        .copied()
        .chain(core::iter::once(pins::RANGER_TRIG_GPIO));
    for pin in outputs {
        // SAFETY: called once from main() before the control loop.
        unsafe { configure(pin, gpio_mode_t_GPIO_MODE_OUTPUT)? };
        gpio_write(pin, false);
    }
    // SAFETY: as above.
    unsafe { configure(pins::RANGER_ECHO_GPIO, gpio_mode_t_GPIO_MODE_INPUT)? };

    log::info!(
        "hw_init: stepper IN1-IN4={:?}, ranger trig={} echo={}",
        STEPPER_GPIOS,
        pins::RANGER_TRIG_GPIO,
        pins::RANGER_ECHO_GPIO
    );
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_peripherals() -> Result<(), HwInitError> {
    log::info!("hw_init(sim): peripheral init skipped");
    Ok(())
}

#[cfg(target_os = "espidf")]
unsafe fn configure(pin: i32, mode: gpio_mode_t) -> Result<(), HwInitError> {
    let cfg = gpio_config_t {
        pin_bit_mask: 1u64 << pin,
        mode,
        pull_up_en: gpio_pullup_t_GPIO_PULLUP_DISABLE,
        pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
        intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
    };
    let ret = unsafe { gpio_config(&cfg) };
    if ret != ESP_OK as i32 {
        return Err(HwInitError::GpioConfigFailed { gpio: pin, rc: ret });
    }
    Ok(())
}

// ── Raw access ────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
pub fn gpio_write(pin: i32, high: bool) {
    // SAFETY: register write to a pin configured by init_peripherals();
    // control-loop context only.
    unsafe {
        gpio_set_level(pin as gpio_num_t, u32::from(high));
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn gpio_write(_pin: i32, _high: bool) {}

#[cfg(target_os = "espidf")]
pub fn gpio_read(pin: i32) -> bool {
    // SAFETY: read-only register access on a configured input pin.
    (unsafe { gpio_get_level(pin as gpio_num_t) }) != 0
}

#[cfg(not(target_os = "espidf"))]
pub fn gpio_read(_pin: i32) -> bool {
    false
}

/// Microseconds since boot (monotonic).
#[cfg(target_os = "espidf")]
pub fn uptime_us() -> u64 {
    // SAFETY: esp_timer_get_time is a counter read with no side effects.
    (unsafe { esp_timer_get_time() }) as u64
}

/// Microseconds since first call (monotonic).
#[cfg(not(target_os = "espidf"))]
pub fn uptime_us() -> u64 {
    use std::time::Instant;
    static START: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();
    START.get_or_init(Instant::now).elapsed().as_micros() as u64
}

// ── embedded-hal wrappers ─────────────────────────────────────

/// Output pin configured by [`init_peripherals`].
#[derive(Debug, Clone, Copy)]
pub struct GpioOut(pub i32);

impl ErrorType for GpioOut {
    type Error = Infallible;
}

impl OutputPin for GpioOut {
    fn set_low(&mut self) -> Result<(), Infallible> {
        gpio_write(self.0, false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        gpio_write(self.0, true);
        Ok(())
    }
}

/// Input pin configured by [`init_peripherals`].
#[derive(Debug, Clone, Copy)]
pub struct GpioIn(pub i32);

impl ErrorType for GpioIn {
    type Error = Infallible;
}

impl InputPin for GpioIn {
    fn is_high(&mut self) -> Result<bool, Infallible> {
        Ok(gpio_read(self.0))
    }

    fn is_low(&mut self) -> Result<bool, Infallible> {
        Ok(!gpio_read(self.0))
    }
}

/// Blocking delay: FreeRTOS-aware on target, `thread::sleep` on host.
#[derive(Debug, Default, Clone, Copy)]
pub struct SysDelay;

#[cfg(target_os = "espidf")]
impl DelayNs for SysDelay {
    fn delay_ns(&mut self, ns: u32) {
        esp_idf_hal::delay::Delay::new_default().delay_us(ns.div_ceil(1_000));
    }

    fn delay_us(&mut self, us: u32) {
        esp_idf_hal::delay::Delay::new_default().delay_us(us);
    }

    fn delay_ms(&mut self, ms: u32) {
        esp_idf_hal::delay::Delay::new_default().delay_ms(ms);
    }
}

#[cfg(not(target_os = "espidf"))]
impl DelayNs for SysDelay {
    fn delay_ns(&mut self, ns: u32) {
        std::thread::sleep(std::time::Duration::from_nanos(ns as u64));
    }
}
