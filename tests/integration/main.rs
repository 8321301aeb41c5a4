//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises a specific subsystem
//! against mock adapters. All tests run on the host (x86_64) with no
//! radio or PWM hardware required.

mod endpoint_flow_tests;
mod mock_link;
mod motor_service_tests;
