//! Port traits: the hexagonal boundary between protocol logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ EndpointServer / EndpointClient / MotorController
//! ```
//!
//! Driven adapters (GATT stacks, PWM peripherals) implement the transport
//! and device ports. Application code implements the handler ports; the
//! endpoint roles call them from the transport's execution context.

use crate::config::SystemConfig;
use crate::endpoint::{AttHandle, AttStatus, ConnectionRef, Continuation, Payload};
use crate::error::{Result, TransportError};

// ───────────────────────────────────────────────────────────────
// Transport ports (driven adapter: endpoint → GATT stack)
// ───────────────────────────────────────────────────────────────

/// Peripheral-side GATT transport.
pub trait NotifyTransport {
    /// Notify `data` on the SEND characteristic to every subscribed peer.
    fn notify(&self, data: &[u8]) -> core::result::Result<(), TransportError>;
}

/// Parameters of a CCC subscription request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscribeParams {
    pub value_handle: AttHandle,
    pub ccc_handle: AttHandle,
    /// Value written to the CCC descriptor.
    pub ccc_value: u16,
    /// The stack must not restore this subscription on reconnect.
    pub volatile: bool,
}

/// Central-side GATT transport.
///
/// Both requests are asynchronous: an `Ok` only means the request was
/// queued. Notifications and write completions come back through
/// [`EndpointClient`](crate::endpoint::EndpointClient) entry points.
pub trait GattClientTransport {
    fn subscribe(
        &self,
        conn: ConnectionRef,
        params: &SubscribeParams,
    ) -> core::result::Result<(), TransportError>;

    /// Queue a write request. The transport copies `data` into its own PDU.
    fn write(
        &self,
        conn: ConnectionRef,
        handle: AttHandle,
        data: &[u8],
    ) -> core::result::Result<(), TransportError>;
}

// ───────────────────────────────────────────────────────────────
// Handler ports (domain → application)
// ───────────────────────────────────────────────────────────────

/// Receives writes made by the peer on the RECV characteristic.
pub trait ServerHandler: Send + Sync {
    fn received(&self, data: &[u8]);
}

impl<F> ServerHandler for F
where
    F: Fn(&[u8]) + Send + Sync,
{
    fn received(&self, data: &[u8]) {
        self(data);
    }
}

/// Receives notifications, write completions and unsubscribe events.
///
/// Every method has a no-op default so applications implement only the
/// events they care about.
pub trait ClientHandler: Send + Sync {
    /// A notification arrived on the peer's SEND characteristic.
    fn received(&self, _data: &[u8]) -> Continuation {
        Continuation::Continue
    }

    /// A write finished. `payload` is the buffer passed to `send`.
    fn sent(&self, _status: AttStatus, _payload: Payload) {}

    /// The subscription was torn down by the peer or the stack.
    fn unsubscribed(&self) {}
}

// ───────────────────────────────────────────────────────────────
// Pulse device ports (driven adapter: mapper → PWM peripheral)
// ───────────────────────────────────────────────────────────────

/// A pulse-generation peripheral addressed by output pin.
pub trait PwmDevice {
    /// Drive `pin` with the given period and pulse width, in microseconds.
    fn set_usec(&mut self, pin: u32, period_us: u32, pulse_us: u32) -> Result<()>;
}

/// Resolves pulse devices by name.
pub trait PwmRegistry {
    type Device: PwmDevice;

    /// Returns `None` when no device is registered under `name`.
    fn bind(&mut self, name: &str) -> Option<Self::Device>;
}

// ───────────────────────────────────────────────────────────────
// Config port (driven adapter: domain ↔ NVS / flash)
// ───────────────────────────────────────────────────────────────

/// Persistent configuration storage.
///
/// Invalid values are rejected on save, not clamped.
pub trait ConfigStore {
    /// Returns [`SystemConfig::default()`] when nothing is stored.
    fn load(&self) -> Result<SystemConfig>;

    fn save(&self, config: &SystemConfig) -> Result<()>;
}
