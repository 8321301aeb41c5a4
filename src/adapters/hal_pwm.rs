//! `embedded-hal` PWM adapter.
//!
//! Implements [`PwmDevice`] over two [`SetDutyCycle`] channels, one per
//! H-bridge input. On the ESP32 these are `esp_idf_hal` LEDC drivers
//! sharing one timer; the timer fixes the period, so only the pulse/period
//! ratio is forwarded to the channel.

use embedded_hal::pwm::{Error as _, SetDutyCycle};
use log::warn;

use crate::app::ports::{PwmDevice, PwmRegistry};
use crate::error::{Error, Result};

/// Error code reported when a HAL channel rejects an update (EIO).
const PWM_IO_ERROR: i32 = -5;

/// Reduce `pulse/period` to a `u16` fraction with the same ratio.
fn duty_fraction(pulse_us: u32, period_us: u32) -> Result<(u16, u16)> {
    if period_us == 0 || pulse_us > period_us {
        return Err(Error::InvalidArgument);
    }
    let shift = (u32::BITS - period_us.leading_zeros()).saturating_sub(16);
    Ok(((pulse_us >> shift) as u16, (period_us >> shift) as u16))
}

fn hal_error<E: embedded_hal::pwm::Error>(pin: u32, e: &E) -> Error {
    warn!("hal_pwm: pin {} rejected duty update ({:?})", pin, e.kind());
    Error::Pwm(PWM_IO_ERROR)
}

/// Two PWM channels addressed by the pins they drive.
pub struct HalPwm<A, B> {
    forward_pin: u32,
    forward: A,
    reverse_pin: u32,
    reverse: B,
}

impl<A: SetDutyCycle, B: SetDutyCycle> HalPwm<A, B> {
    pub fn new(forward_pin: u32, forward: A, reverse_pin: u32, reverse: B) -> Self {
        Self {
            forward_pin,
            forward,
            reverse_pin,
            reverse,
        }
    }

    pub fn channels(&self) -> (&A, &B) {
        (&self.forward, &self.reverse)
    }
}

impl<A: SetDutyCycle, B: SetDutyCycle> PwmDevice for HalPwm<A, B> {
    fn set_usec(&mut self, pin: u32, period_us: u32, pulse_us: u32) -> Result<()> {
        let (num, denom) = duty_fraction(pulse_us, period_us)?;
        if pin == self.forward_pin {
            self.forward
                .set_duty_cycle_fraction(num, denom)
                .map_err(|e| hal_error(pin, &e))
        } else if pin == self.reverse_pin {
            self.reverse
                .set_duty_cycle_fraction(num, denom)
                .map_err(|e| hal_error(pin, &e))
        } else {
            warn!("hal_pwm: pin {} is not wired to a channel", pin);
            Err(Error::InvalidArgument)
        }
    }
}

/// A registry holding a single device under one name.
///
/// The device is handed out on the first successful [`bind`](PwmRegistry::bind).
pub struct NamedPwm<D> {
    name: heapless::String<16>,
    device: Option<D>,
}

impl<D> NamedPwm<D> {
    pub fn new(name: heapless::String<16>, device: D) -> Self {
        Self {
            name,
            device: Some(device),
        }
    }
}

impl<D: PwmDevice> PwmRegistry for NamedPwm<D> {
    type Device = D;

    fn bind(&mut self, name: &str) -> Option<D> {
        if name == self.name.as_str() {
            self.device.take()
        } else {
            None
        }
    }
}
