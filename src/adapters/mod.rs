//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter    | Implements              | Connects to                 |
//! |------------|-------------------------|-----------------------------|
//! | `ble`      | NotifyTransport         | Bluedroid GATT server       |
//! | `hal_pwm`  | PwmDevice, PwmRegistry  | embedded-hal PWM channels   |
//! | `log_sink` | ClientHandler           | Serial log output           |
//! | `nvs`      | ConfigStore             | NVS flash (postcard blob)   |

pub mod ble;
pub mod hal_pwm;
pub mod log_sink;
pub mod nvs;
