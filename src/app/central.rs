//! Central application glue.
//!
//! Drives an [`EndpointClient`] from the central's connection lifecycle:
//! once service discovery completes the handles are assigned and
//! notifications enabled; a button press is written as one byte.

use log::{error, info, warn};

use super::events::ClientEvent;
use super::ports::{ClientHandler, GattClientTransport};
use crate::endpoint::discovery::DiscoveredService;
use crate::endpoint::{payload, ConnectionRef, Continuation, EndpointClient};
use crate::error::Result;

pub struct CentralLink<T: GattClientTransport, H: ClientHandler> {
    client: EndpointClient<T, H>,
}

impl<T: GattClientTransport, H: ClientHandler> CentralLink<T, H> {
    /// Wrap a client and install its handler.
    pub fn new(transport: T, handler: H) -> Result<Self> {
        let client = EndpointClient::new(transport);
        client.init(handler)?;
        Ok(Self { client })
    }

    pub fn on_connected(&self, conn: ConnectionRef) {
        info!("connected ({:?}), discovering CX endpoint service", conn);
    }

    /// Assign handles from the discovery result and subscribe.
    pub fn on_discovery_complete(&self, discovered: &DiscoveredService) -> Result<()> {
        self.client.assign_handles(discovered).inspect_err(|e| {
            error!("could not init client object: {}", e);
        })?;
        self.client.subscribe().inspect_err(|e| {
            error!("could not subscribe: {}", e);
        })
    }

    pub fn on_service_not_found(&self) {
        warn!("CX endpoint service not found");
    }

    pub fn on_discovery_error(&self, code: i32) {
        error!("discovery failed (err {})", code);
    }

    /// Write the low byte of the button mask to the peer.
    pub fn send_button_state(&self, state: u32) -> Result<()> {
        let msg = payload(&[(state & 0xff) as u8])?;
        self.client.send(msg).inspect_err(|e| {
            warn!("button state not sent: {}", e);
        })
    }

    pub fn on_event(&self, event: ClientEvent<'_>) -> Continuation {
        self.client.dispatch(event)
    }

    pub fn on_disconnected(&self, conn: ConnectionRef, reason: u8) {
        info!("disconnected ({:?}, reason 0x{:02x})", conn, reason);
        self.client.on_disconnected(conn);
    }

    pub fn client(&self) -> &EndpointClient<T, H> {
        &self.client
    }
}
