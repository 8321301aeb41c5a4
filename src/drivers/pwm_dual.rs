//! Dual-channel pulse setting.
//!
//! A motor H-bridge is driven by two pulse outputs sharing one period.
//! Both channels are written in a single call, the narrower pulse first, so
//! a direction change lowers the old input before raising the new one. The
//! first failure aborts the update and is returned.

use log::warn;

use crate::app::ports::PwmDevice;
use crate::error::Result;

/// One output pin and its pulse width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PwmChannel {
    pub pin: u32,
    pub pulse_us: u32,
}

/// Pulse widths for both bridge inputs over a shared period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DualDutyCycle {
    pub period_us: u32,
    pub ch0: PwmChannel,
    pub ch1: PwmChannel,
}

impl DualDutyCycle {
    /// Write both channels to `device`, lowering before raising.
    pub fn apply<D: PwmDevice>(&self, device: &mut D) -> Result<()> {
        let order = if self.ch1.pulse_us < self.ch0.pulse_us {
            [self.ch1, self.ch0]
        } else {
            [self.ch0, self.ch1]
        };
        for ch in order {
            device
                .set_usec(ch.pin, self.period_us, ch.pulse_us)
                .inspect_err(|e| warn!("pwm_dual: pin {} update failed: {}", ch.pin, e))?;
        }
        Ok(())
    }

    /// Drive both channels to 0. Both writes are attempted; the first error is returned.
    pub fn stop<D: PwmDevice>(&self, device: &mut D) -> Result<()> {
        let first = device.set_usec(self.ch0.pin, self.period_us, 0);
        let second = device.set_usec(self.ch1.pin, self.period_us, 0);
        first.and(second)
    }
}
