//! CX endpoint protocol: peripheral ([`server`]) and central ([`client`]) roles.
//!
//! ```text
//!   transport ──write/CCC──▶ EndpointServer ──▶ ServerHandler
//!   app ──send/subscribe──▶ EndpointClient ──▶ transport
//!   transport ──notify/complete──▶ EndpointClient ──▶ ClientHandler
//! ```
//!
//! Both roles keep their state in atomics so the application context and
//! the transport callback context can drive them concurrently.

pub mod client;
pub mod discovery;
pub mod server;
pub mod uuid;

pub use client::EndpointClient;
pub use server::EndpointServer;

use crate::error::{Error, Result};

/// Largest payload carried by one notification or write (ATT MTU 247 - 3).
pub const MAX_PAYLOAD_LEN: usize = 244;

/// Owned message buffer handed to and back from the transport.
pub type Payload = heapless::Vec<u8, MAX_PAYLOAD_LEN>;

/// Copy `data` into a [`Payload`], rejecting empty or oversize input.
pub fn payload(data: &[u8]) -> Result<Payload> {
    if data.is_empty() {
        return Err(Error::InvalidArgument);
    }
    Payload::from_slice(data).map_err(|_| Error::InvalidArgument)
}

/// ATT status code delivered with a write completion. `0` is success.
pub type AttStatus = u8;

pub const ATT_SUCCESS: AttStatus = 0;

/// Opaque reference to an active link, owned by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionRef(pub u16);

/// Attribute handle on the peer's GATT table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttHandle(pub u16);

/// Peer handles resolved by discovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CharacteristicHandles {
    /// RECV characteristic value (client writes here).
    pub rx: AttHandle,
    /// SEND characteristic value (peer notifies from here).
    pub tx: AttHandle,
    /// CCC descriptor of SEND.
    pub tx_ccc: AttHandle,
}

/// Client-side notification subscription state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SubscriptionState {
    Unsubscribed = 0,
    Subscribing = 1,
    Subscribed = 2,
}

impl SubscriptionState {
    pub(crate) const fn from_u8(raw: u8) -> Self {
        match raw {
            1 => Self::Subscribing,
            2 => Self::Subscribed,
            _ => Self::Unsubscribed,
        }
    }
}

/// What the transport should do after a notification was delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Continuation {
    /// Keep notifications flowing.
    Continue,
    /// Unsubscribe.
    Stop,
}
