//! Application core: protocol-facing logic, zero I/O.
//!
//! The motor-link service (peripheral) and the central glue live here.
//! All interaction with the GATT stack and the PWM peripheral happens
//! through **port traits** defined in [`ports`], keeping this layer fully
//! testable without a radio.

pub mod central;
pub mod channels;
pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
