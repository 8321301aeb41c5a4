//! Inter-context event channel.
//!
//! Uses an `embassy-sync` bounded channel to bridge the GATT callback
//! context (Bluedroid task) with the application loop. Producers never
//! block: a full queue drops the event with a warning.
//!
//! ```text
//! ┌───────────────┐  ServerEvent  ┌──────────────┐
//! │ GATT callback │─────────────▶│   App loop    │
//! │ (stack task)  │               │ (main task)   │
//! └───────────────┘               └──────────────┘
//! ```

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Channel, TrySendError};
use log::warn;

use super::events::ServerEvent;
use super::ports::ServerHandler;
use crate::endpoint::{ConnectionRef, MAX_PAYLOAD_LEN, Payload};

/// Channel depth for server events.
pub const SERVER_EVENT_DEPTH: usize = 8;

pub type ServerEventChannel = Channel<CriticalSectionRawMutex, ServerEvent, SERVER_EVENT_DEPTH>;

/// Firmware-wide server event queue: GATT callbacks → app loop.
pub static SERVER_EVENTS: ServerEventChannel = Channel::new();

/// Pushes stack events into a [`ServerEventChannel`].
///
/// Registered as the endpoint server's receive handler so RECV writes land
/// in the queue as [`ServerEvent::Received`].
#[derive(Clone, Copy)]
pub struct ServerEventForwarder<'a> {
    channel: &'a ServerEventChannel,
}

impl<'a> ServerEventForwarder<'a> {
    pub const fn new(channel: &'a ServerEventChannel) -> Self {
        Self { channel }
    }

    pub fn connected(&self, conn: ConnectionRef) -> bool {
        self.push(ServerEvent::Connected(conn))
    }

    pub fn disconnected(&self, conn: ConnectionRef, reason: u8) -> bool {
        self.push(ServerEvent::Disconnected(conn, reason))
    }

    /// Queue `event`; returns `false` when it was dropped.
    pub fn push(&self, event: ServerEvent) -> bool {
        match self.channel.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(event)) => {
                warn!("server event queue full, dropping {:?}", event);
                false
            }
        }
    }
}

impl ServerHandler for ServerEventForwarder<'_> {
    fn received(&self, data: &[u8]) {
        let len = data.len().min(MAX_PAYLOAD_LEN);
        if len < data.len() {
            warn!("RECV write truncated ({} > {} bytes)", data.len(), MAX_PAYLOAD_LEN);
        }
        // `len` never exceeds capacity.
        let payload = Payload::from_slice(&data[..len]).unwrap_or_default();
        self.push(ServerEvent::Received(payload));
    }
}
