//! Pin and PWM assignments for the motor controller board.
//!
//! Single source of truth: the motor driver and the default configuration
//! reference this module rather than hard-coding pin numbers.

// ---------------------------------------------------------------------------
// Motor H-bridge inputs
// ---------------------------------------------------------------------------

/// PWM output driving the bridge in the forward direction (channel 0).
pub const MOTOR_FORWARD_PIN: u32 = 24;
/// PWM output driving the bridge in the reverse direction (channel 1).
pub const MOTOR_REVERSE_PIN: u32 = 44;

// ---------------------------------------------------------------------------
// PWM configuration
// ---------------------------------------------------------------------------

/// Name the pulse-generation device is registered under.
pub const PWM_DEVICE_NAME: &str = "PWM_0";
/// Fixed pulse period in microseconds (50 Hz).
pub const PWM_PERIOD_US: u32 = 20_000;
