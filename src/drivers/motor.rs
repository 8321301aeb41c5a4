//! DC motor driver over a dual-input H-bridge.
//!
//! A signed speed in `[-100, 100]` maps to two pulse widths on a fixed
//! period: positive speeds drive the forward input (channel 0), negative
//! speeds the reverse input (channel 1). At most one channel is ever
//! non-zero.
//!
//! The driver is a dumb actuator. It binds its pulse device once by name
//! and forces a stopped output before reporting ready.

use log::{error, info, warn};

use crate::app::ports::{PwmDevice, PwmRegistry};
use crate::config::MotorConfig;
use crate::drivers::pwm_dual::{DualDutyCycle, PwmChannel};
use crate::error::{Error, Result};

pub const SPEED_MIN: i8 = -100;
pub const SPEED_MAX: i8 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Reverse,
}

/// Pulse widths for one period. `pulse_* <= period_us`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DutyCycle {
    pub period_us: u32,
    pub pulse_forward_us: u32,
    pub pulse_reverse_us: u32,
}

impl DutyCycle {
    pub const fn stopped(period_us: u32) -> Self {
        Self {
            period_us,
            pulse_forward_us: 0,
            pulse_reverse_us: 0,
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.pulse_forward_us == 0 && self.pulse_reverse_us == 0
    }

    pub fn direction(&self) -> Option<Direction> {
        if self.pulse_forward_us > 0 {
            Some(Direction::Forward)
        } else if self.pulse_reverse_us > 0 {
            Some(Direction::Reverse)
        } else {
            None
        }
    }
}

/// Map `speed` onto a duty cycle of `period_us`.
///
/// Both directions scale symmetrically: `pulse = period * |speed| / 100`.
pub fn duty_cycle_for(speed: i8, period_us: u32) -> Result<DutyCycle> {
    if !(SPEED_MIN..=SPEED_MAX).contains(&speed) {
        return Err(Error::OutOfRange);
    }
    let pulse = (u64::from(period_us) * u64::from(speed.unsigned_abs()) / 100) as u32;
    Ok(match speed {
        0 => DutyCycle::stopped(period_us),
        s if s > 0 => DutyCycle {
            period_us,
            pulse_forward_us: pulse,
            pulse_reverse_us: 0,
        },
        _ => DutyCycle {
            period_us,
            pulse_forward_us: 0,
            pulse_reverse_us: pulse,
        },
    })
}

pub struct MotorController<D: PwmDevice> {
    config: MotorConfig,
    device: Option<D>,
    duty: DutyCycle,
    speed: i8,
}

impl<D: PwmDevice> MotorController<D> {
    pub fn new(config: &MotorConfig) -> Self {
        Self {
            config: config.clone(),
            device: None,
            duty: DutyCycle::stopped(config.period_us),
            speed: 0,
        }
    }

    /// Bind the pulse device named in the config and stop the motor.
    pub fn init<R>(&mut self, registry: &mut R) -> Result<()>
    where
        R: PwmRegistry<Device = D>,
    {
        let device = registry.bind(&self.config.pwm_device).ok_or_else(|| {
            error!("motor: PWM device '{}' not found", self.config.pwm_device);
            Error::DeviceNotFound
        })?;
        self.device = Some(device);
        info!(
            "motor: bound '{}' (fwd pin {}, rev pin {}, period {}us)",
            self.config.pwm_device, self.config.forward_pin, self.config.reverse_pin, self.config.period_us
        );
        self.set(0)
    }

    /// Apply `speed`. Out-of-range values leave the output untouched.
    ///
    /// If the device rejects part of the update both inputs are driven to 0
    /// and the error is returned; the controller then reports a stop.
    pub fn set(&mut self, speed: i8) -> Result<()> {
        let duty = duty_cycle_for(speed, self.config.period_us)?;
        let device = self.device.as_mut().ok_or(Error::DeviceNotFound)?;

        let dual = DualDutyCycle {
            period_us: duty.period_us,
            ch0: PwmChannel {
                pin: self.config.forward_pin,
                pulse_us: duty.pulse_forward_us,
            },
            ch1: PwmChannel {
                pin: self.config.reverse_pin,
                pulse_us: duty.pulse_reverse_us,
            },
        };
        if let Err(e) = dual.apply(device) {
            match dual.stop(device) {
                Ok(()) => {
                    warn!("motor: speed {} not applied ({}), outputs stopped", speed, e);
                    self.duty = DutyCycle::stopped(duty.period_us);
                    self.speed = 0;
                }
                Err(stop_err) => error!("motor: speed {} not applied ({}), stop failed ({})", speed, e, stop_err),
            }
            return Err(e);
        }

        self.duty = duty;
        self.speed = speed;
        Ok(())
    }

    pub fn stop(&mut self) -> Result<()> {
        self.set(0)
    }

    pub fn duty(&self) -> DutyCycle {
        self.duty
    }

    /// Last successfully applied speed.
    pub fn speed(&self) -> i8 {
        self.speed
    }

    pub fn is_running(&self) -> bool {
        !self.duty.is_stopped()
    }

    pub fn is_bound(&self) -> bool {
        self.device.is_some()
    }

    pub fn device(&self) -> Option<&D> {
        self.device.as_ref()
    }
}

// ── Tests ─────────────────────────────────────────────────────
