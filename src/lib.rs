//! CX endpoint firmware library.
//!
//! Exposes the endpoint protocol, the motor driver and the application
//! layer for integration testing. All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod app;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod pins;

pub mod adapters;
pub mod drivers;

pub use error::{Error, Result};
