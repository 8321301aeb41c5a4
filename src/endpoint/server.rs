//! Endpoint server: peripheral side of the CX endpoint protocol.
//!
//! Owns the notify-enabled flag (written by the peer through the SEND CCC)
//! and the registered receive handler. Inbound RECV writes are forwarded
//! synchronously from the transport context; outbound notifications are
//! broadcast through the [`NotifyTransport`] to every subscribed peer.

use core::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use log::{debug, warn};

use super::uuid::CCC_NOTIFY;
use crate::app::ports::{NotifyTransport, ServerHandler};
use crate::error::{Error, Result};

pub struct EndpointServer<T: NotifyTransport> {
    transport: T,
    notify_enabled: AtomicBool,
    handler: Mutex<Option<Arc<dyn ServerHandler>>>,
}

impl<T: NotifyTransport> EndpointServer<T> {
    pub const fn new(transport: T) -> Self {
        Self {
            transport,
            notify_enabled: AtomicBool::new(false),
            handler: Mutex::new(None),
        }
    }

    /// Register the receive handler, replacing any previous one.
    pub fn register(&self, handler: impl ServerHandler + 'static) {
        let mut slot = self.handler.lock().unwrap_or_else(PoisonError::into_inner);
        *slot = Some(Arc::new(handler));
    }

    /// The peer wrote the SEND CCC descriptor.
    pub fn on_subscription_change(&self, enabled: bool) {
        self.notify_enabled.store(enabled, Ordering::Release);
        debug!("endpoint: notifications {}", if enabled { "enabled" } else { "disabled" });
    }

    /// Raw CCC value as written by the peer.
    pub fn on_ccc_write(&self, value: u16) {
        self.on_subscription_change(value == CCC_NOTIFY);
    }

    /// The peer wrote the RECV characteristic. Always accepts the full length.
    pub fn on_write(&self, data: &[u8]) -> usize {
        debug!("endpoint: RECV write (len={})", data.len());
        // Clone out of the lock so the handler may call back into the server.
        let handler = self
            .handler
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(handler) = handler {
            handler.received(data);
        }
        data.len()
    }

    /// Notify `data` on SEND to every subscribed peer.
    pub fn send(&self, data: &[u8]) -> Result<()> {
        if !self.notify_enabled.load(Ordering::Acquire) {
            return Err(Error::NotSubscribed);
        }
        if data.is_empty() {
            return Err(Error::InvalidArgument);
        }
        self.transport.notify(data).map_err(|e| {
            warn!("endpoint: notify failed ({})", e);
            Error::from(e)
        })
    }

    pub fn is_notify_enabled(&self) -> bool {
        self.notify_enabled.load(Ordering::Acquire)
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────
