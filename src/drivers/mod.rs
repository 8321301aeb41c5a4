//! Actuator drivers for the motor board.

pub mod motor;
pub mod pwm_dual;
