//! Application core: pure domain logic, zero I/O.
//!
//! This module contains the feeding rules: command handling, trigger
//! arbitration and the control tick.  All interaction with hardware and the
//! network happens through **port traits** defined in [`ports`], keeping
//! this layer fully testable without real peripherals.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
