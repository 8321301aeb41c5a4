//! Transport events, as explicit values.
//!
//! The GATT adapters translate stack callbacks into these enums. Server
//! events are queued (see [`channels`](super::channels)) and drained by the
//! application loop; client events are dispatched synchronously through
//! [`EndpointClient::dispatch`](crate::endpoint::EndpointClient::dispatch)
//! because a notification's continuation must be returned to the stack.

use crate::endpoint::{AttStatus, ConnectionRef, Payload};

/// Peripheral-side events delivered to the application loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerEvent {
    /// A central connected.
    Connected(ConnectionRef),
    /// The link dropped. Carries the HCI reason code.
    Disconnected(ConnectionRef, u8),
    /// The peer wrote the RECV characteristic.
    Received(Payload),
}

/// Central-side events raised by the GATT client stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientEvent<'a> {
    /// A notification arrived on the peer's SEND characteristic.
    Notification(&'a [u8]),
    /// The stack tore the subscription down (e.g. handle invalidated).
    SubscriptionLost,
    /// The outstanding write finished with this ATT status.
    WriteComplete(AttStatus),
    Disconnected(ConnectionRef),
}
