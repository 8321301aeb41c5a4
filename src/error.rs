//! Unified error types for the CX endpoint firmware.
//!
//! A single `Error` enum covers the endpoint protocol, the motor mapper and
//! the transport boundary, so the control loop handles every failure the
//! same way. All variants are `Copy` so they can be returned from transport
//! callbacks and logged without allocation.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the crate funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The client was already initialised.
    AlreadyInitialized,
    /// No connection is bound to the client.
    NotConnected,
    /// A subscription is already in progress or active.
    AlreadySubscribed,
    /// The peer has not enabled notifications.
    NotSubscribed,
    /// A write is still awaiting its completion.
    WriteAlreadyPending,
    /// A required characteristic is absent from the discovery result.
    MissingCharacteristic,
    /// A value attribute or CCC descriptor is absent from the discovery result.
    MissingDescriptor,
    /// The discovered service is not the CX endpoint service.
    UnsupportedService,
    /// Empty or malformed argument.
    InvalidArgument,
    /// The pulse-generation device could not be bound.
    DeviceNotFound,
    /// Speed outside `[-100, 100]`.
    OutOfRange,
    /// The pulse device rejected a channel update.
    Pwm(i32),
    /// The transport rejected a request or reported a link failure.
    TransportFailure(i32),
    /// Configuration is invalid.
    Config(&'static str),
    /// A stored configuration blob could not be decoded.
    ConfigCorrupted,
    /// The persistent store rejected a read or write.
    Storage(i32),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyInitialized => write!(f, "already initialized"),
            Self::NotConnected => write!(f, "not connected"),
            Self::AlreadySubscribed => write!(f, "already subscribed"),
            Self::NotSubscribed => write!(f, "peer has not enabled notifications"),
            Self::WriteAlreadyPending => write!(f, "write already pending"),
            Self::MissingCharacteristic => write!(f, "missing characteristic"),
            Self::MissingDescriptor => write!(f, "missing descriptor"),
            Self::UnsupportedService => write!(f, "unsupported service"),
            Self::InvalidArgument => write!(f, "invalid argument"),
            Self::DeviceNotFound => write!(f, "PWM device not found"),
            Self::OutOfRange => write!(f, "speed out of range"),
            Self::Pwm(rc) => write!(f, "PWM write failed (rc={})", rc),
            Self::TransportFailure(rc) => write!(f, "transport failure (rc={})", rc),
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::ConfigCorrupted => write!(f, "stored config corrupted"),
            Self::Storage(rc) => write!(f, "storage error (rc={})", rc),
        }
    }
}

impl core::error::Error for Error {}

// ---------------------------------------------------------------------------
// Transport errors
// ---------------------------------------------------------------------------

/// Error code reported by the transport collaborator (GATT stack).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportError(pub i32);

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GATT error {}", self.0)
    }
}

impl core::error::Error for TransportError {}

impl From<TransportError> for Error {
    fn from(e: TransportError) -> Self {
        Self::TransportFailure(e.0)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
