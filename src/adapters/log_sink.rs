//! Log-based client handler adapter.
//!
//! Implements [`ClientHandler`] by writing every event to the logger
//! (UART / USB-CDC in production). Used by the central demo, where the
//! application only needs to see what the peer sends.

use log::{info, warn};

use crate::app::ports::ClientHandler;
use crate::endpoint::{AttStatus, Continuation, Payload, ATT_SUCCESS};

/// Logs notifications, write completions and unsubscribes.
pub struct LogClientHandler;

impl LogClientHandler {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LogClientHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientHandler for LogClientHandler {
    fn received(&self, data: &[u8]) -> Continuation {
        info!("RX | {} bytes | {:02x?}", data.len(), data);
        Continuation::Continue
    }

    fn sent(&self, status: AttStatus, payload: Payload) {
        if status == ATT_SUCCESS {
            info!("TX | {} bytes | {:02x?}", payload.len(), payload.as_slice());
        } else {
            warn!("TX | failed (ATT 0x{:02x}) | {:02x?}", status, payload.as_slice());
        }
    }

    fn unsubscribed(&self) {
        info!("SUB | unsubscribed");
    }
}
