//! System configuration parameters
//!
//! All tunable parameters for the motor controller and its BLE endpoint.
//! Defaults come from [`crate::pins`].

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::pins;

/// Core system configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemConfig {
    /// Advertised device name (scanners filter on this)
    pub device_name: heapless::String<24>,
    /// Motor / PWM settings
    pub motor: MotorConfig,
    /// Notify the speed actually applied after every inbound speed write
    pub echo_applied_speed: bool,
    /// Force the motor to a stop when the central disconnects
    pub stop_on_disconnect: bool,
}

/// Dual-channel PWM motor settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MotorConfig {
    /// Name the pulse device is bound by
    pub pwm_device: heapless::String<16>,
    /// Pulse period in microseconds
    pub period_us: u32,
    /// Forward channel output pin
    pub forward_pin: u32,
    /// Reverse channel output pin
    pub reverse_pin: u32,
}

impl Default for MotorConfig {
    fn default() -> Self {
        let mut pwm_device = heapless::String::new();
        let _ = pwm_device.push_str(pins::PWM_DEVICE_NAME);
        Self {
            pwm_device,
            period_us: pins::PWM_PERIOD_US,
            forward_pin: pins::MOTOR_FORWARD_PIN,
            reverse_pin: pins::MOTOR_REVERSE_PIN,
        }
    }
}

impl Default for SystemConfig {
    fn default() -> Self {
        let mut device_name = heapless::String::new();
        let _ = device_name.push_str("CX-Peripheral");
        Self {
            device_name,
            motor: MotorConfig::default(),
            echo_applied_speed: true,
            stop_on_disconnect: true,
        }
    }
}

impl SystemConfig {
    /// Reject values the motor or the advertiser cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.device_name.is_empty() {
            return Err(Error::Config("device_name must not be empty"));
        }
        self.motor.validate()
    }
}

impl MotorConfig {
    pub fn validate(&self) -> Result<()> {
        if self.pwm_device.is_empty() {
            return Err(Error::Config("pwm_device must not be empty"));
        }
        if self.period_us == 0 {
            return Err(Error::Config("period_us must be > 0"));
        }
        if self.forward_pin == self.reverse_pin {
            return Err(Error::Config("forward_pin and reverse_pin must differ"));
        }
        Ok(())
    }
}
