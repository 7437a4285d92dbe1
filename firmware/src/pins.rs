//! GPIO pin assignments for the PetFeeder board.
//!
//! Single source of truth: every driver references this module rather than
//! hard-coding pin numbers.

// ---------------------------------------------------------------------------
// Stepper motor (ULN2003 driver, 28BYJ-48 unipolar motor)
// ---------------------------------------------------------------------------

pub const STEPPER_IN1_GPIO: i32 = 15;
pub const STEPPER_IN2_GPIO: i32 = 13;
pub const STEPPER_IN3_GPIO: i32 = 12;
pub const STEPPER_IN4_GPIO: i32 = 14;

// ---------------------------------------------------------------------------
// Ultrasonic ranger (HC-SR04)
// ---------------------------------------------------------------------------

/// Digital output: 10 µs HIGH pulse starts a measurement.
pub const RANGER_TRIG_GPIO: i32 = 16;
/// Digital input: HIGH for the round-trip time of the ping.
pub const RANGER_ECHO_GPIO: i32 = 5;

// ---------------------------------------------------------------------------
// DS1302 RTC (reserved; wall-clock currently comes from SNTP)
// ---------------------------------------------------------------------------

pub const RTC_IO_GPIO: i32 = 4;
pub const RTC_SCLK_GPIO: i32 = 0;
pub const RTC_CE_GPIO: i32 = 2;
