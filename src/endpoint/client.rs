//! Endpoint client: central side of the CX endpoint protocol.
//!
//! One instance per peer slot. Three independent pieces of state:
//!
//! ```text
//!   Uninitialized ──init──▶ Initialized                       (one-way)
//!   Unsubscribed ──subscribe──▶ Subscribing ──ok──▶ Subscribed
//!        ▲                           │ err               │ lost / disconnect
//!        └───────────────────────────┴───────────────────┘
//!   write: idle ──send──▶ pending ──complete / disconnect──▶ idle
//! ```
//!
//! Every transition is a compare-and-swap so an application-context caller
//! and a transport-context callback can never both win the same edge.

use core::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Mutex, OnceLock, PoisonError};

use log::{debug, error, warn};

use super::discovery::DiscoveredService;
use super::uuid::{CCC_NOTIFY, CCC_UUID, RECV_CHAR_UUID, SEND_CHAR_UUID, SERVICE_UUID};
use super::{
    AttStatus, CharacteristicHandles, ConnectionRef, Continuation, Payload, SubscriptionState,
};
use crate::app::events::ClientEvent;
use crate::app::ports::{ClientHandler, GattClientTransport, SubscribeParams};
use crate::error::{Error, Result};

/// Connection bound by discovery together with its resolved handles.
#[derive(Debug, Clone, Copy)]
struct Link {
    conn: ConnectionRef,
    handles: CharacteristicHandles,
}

pub struct EndpointClient<T: GattClientTransport, H: ClientHandler> {
    transport: T,
    handler: OnceLock<H>,
    subscription: AtomicU8,
    write_pending: AtomicBool,
    link: Mutex<Option<Link>>,
    /// Buffer of the write awaiting completion; handed back through `sent`.
    in_flight: Mutex<Option<Payload>>,
}

impl<T: GattClientTransport, H: ClientHandler> EndpointClient<T, H> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            handler: OnceLock::new(),
            subscription: AtomicU8::new(SubscriptionState::Unsubscribed as u8),
            write_pending: AtomicBool::new(false),
            link: Mutex::new(None),
            in_flight: Mutex::new(None),
        }
    }

    /// Install the application handler. Succeeds once per instance.
    pub fn init(&self, handler: H) -> Result<()> {
        self.handler
            .set(handler)
            .map_err(|_| Error::AlreadyInitialized)?;
        debug!("endpoint client initialized");
        Ok(())
    }

    /// Resolve the peer's handles from a discovery result and bind its link.
    ///
    /// On failure the previously bound link (if any) is left untouched.
    pub fn assign_handles(&self, discovered: &DiscoveredService) -> Result<CharacteristicHandles> {
        if discovered.uuid != SERVICE_UUID {
            return Err(Error::UnsupportedService);
        }
        debug!("getting handles from CX endpoint service");

        let send = discovered.characteristic(SEND_CHAR_UUID).ok_or_else(|| {
            error!("missing CX endpoint SEND characteristic");
            Error::MissingCharacteristic
        })?;
        let tx = send.attribute(SEND_CHAR_UUID).ok_or_else(|| {
            error!("missing CX endpoint SEND value attribute");
            Error::MissingDescriptor
        })?;
        let tx_ccc = send.attribute(CCC_UUID).ok_or_else(|| {
            error!("missing CX endpoint SEND CCC descriptor");
            Error::MissingDescriptor
        })?;

        let recv = discovered.characteristic(RECV_CHAR_UUID).ok_or_else(|| {
            error!("missing CX endpoint RECV characteristic");
            Error::MissingCharacteristic
        })?;
        let rx = recv.attribute(RECV_CHAR_UUID).ok_or_else(|| {
            error!("missing CX endpoint RECV value attribute");
            Error::MissingDescriptor
        })?;

        let handles = CharacteristicHandles { rx, tx, tx_ccc };
        *self.lock_link() = Some(Link {
            conn: discovered.conn,
            handles,
        });
        debug!(
            "CX endpoint handles: rx={:#06x} tx={:#06x} tx_ccc={:#06x}",
            rx.0, tx.0, tx_ccc.0
        );
        Ok(handles)
    }

    /// Enable notifications on the peer's SEND characteristic.
    pub fn subscribe(&self) -> Result<()> {
        self.subscription
            .compare_exchange(
                SubscriptionState::Unsubscribed as u8,
                SubscriptionState::Subscribing as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .map_err(|_| Error::AlreadySubscribed)?;

        let Some(link) = *self.lock_link() else {
            self.leave_subscribing(SubscriptionState::Unsubscribed);
            return Err(Error::NotConnected);
        };

        let params = SubscribeParams {
            value_handle: link.handles.tx,
            ccc_handle: link.handles.tx_ccc,
            ccc_value: CCC_NOTIFY,
            volatile: true,
        };

        match self.transport.subscribe(link.conn, &params) {
            Ok(()) => {
                self.leave_subscribing(SubscriptionState::Subscribed);
                debug!("[SUBSCRIBED]");
                Ok(())
            }
            Err(e) => {
                error!("subscribe failed (err {})", e.0);
                self.leave_subscribing(SubscriptionState::Unsubscribed);
                Err(e.into())
            }
        }
    }

    /// Write `payload` to the peer's RECV characteristic.
    ///
    /// The buffer is kept until the transport reports completion and then
    /// returned through [`ClientHandler::sent`].
    pub fn send(&self, payload: Payload) -> Result<()> {
        // The transport gets its own copy; the original is handed back on completion.
        let frame = payload.clone();

        // Claim the write slot under the link lock so a disconnect either
        // precedes the claim or resets it afterwards.
        let link = {
            let guard = self.lock_link();
            let link = (*guard).ok_or(Error::NotConnected)?;
            self.write_pending
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .map_err(|_| Error::WriteAlreadyPending)?;
            *self.lock_in_flight() = Some(payload);
            link
        };

        if let Err(e) = self.transport.write(link.conn, link.handles.rx, &frame) {
            self.lock_in_flight().take();
            self.write_pending.store(false, Ordering::Release);
            return Err(e.into());
        }
        Ok(())
    }

    // ── Transport-context entry points ────────────────────────

    /// Route one transport event. Only notifications and subscription
    /// loss produce a meaningful continuation.
    pub fn dispatch(&self, event: ClientEvent<'_>) -> Continuation {
        match event {
            ClientEvent::Notification(data) => self.on_notification(data),
            ClientEvent::SubscriptionLost => self.on_subscription_lost(),
            ClientEvent::WriteComplete(status) => {
                self.on_write_complete(status);
                Continuation::Continue
            }
            ClientEvent::Disconnected(conn) => {
                self.on_disconnected(conn);
                Continuation::Continue
            }
        }
    }

    pub fn on_notification(&self, data: &[u8]) -> Continuation {
        debug!("[NOTIFICATION] length {}", data.len());
        match self.handler.get() {
            Some(handler) => handler.received(data),
            None => Continuation::Continue,
        }
    }

    /// The subscription was torn down outside our control.
    pub fn on_subscription_lost(&self) -> Continuation {
        debug!("[UNSUBSCRIBED]");
        self.subscription
            .store(SubscriptionState::Unsubscribed as u8, Ordering::Release);
        if let Some(handler) = self.handler.get() {
            handler.unsubscribed();
        }
        Continuation::Stop
    }

    pub fn on_write_complete(&self, status: AttStatus) {
        let Some(payload) = self.lock_in_flight().take() else {
            warn!("write completion (status={}) with no write pending", status);
            return;
        };
        // Clear before the callback so `sent` may issue the next write.
        self.write_pending.store(false, Ordering::Release);
        if let Some(handler) = self.handler.get() {
            handler.sent(status, payload);
        }
    }

    /// The link went away. Drops the in-flight write without `sent` and the
    /// subscription without `unsubscribed`.
    pub fn on_disconnected(&self, conn: ConnectionRef) {
        {
            let mut link = self.lock_link();
            if link.is_some_and(|l| l.conn != conn) {
                debug!("disconnect of foreign link {:?} ignored", conn);
                return;
            }
            *link = None;
        }
        if self.lock_in_flight().take().is_some() {
            debug!("in-flight write dropped on disconnect");
        }
        self.write_pending.store(false, Ordering::Release);
        self.subscription
            .store(SubscriptionState::Unsubscribed as u8, Ordering::Release);
    }

    // ── Accessors ─────────────────────────────────────────────

    pub fn is_initialized(&self) -> bool {
        self.handler.get().is_some()
    }

    pub fn subscription_state(&self) -> SubscriptionState {
        SubscriptionState::from_u8(self.subscription.load(Ordering::Acquire))
    }

    pub fn is_write_pending(&self) -> bool {
        self.write_pending.load(Ordering::Acquire)
    }

    pub fn handles(&self) -> Option<CharacteristicHandles> {
        self.lock_link().map(|l| l.handles)
    }

    pub fn connection(&self) -> Option<ConnectionRef> {
        self.lock_link().map(|l| l.conn)
    }

    pub fn handler(&self) -> Option<&H> {
        self.handler.get()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    // ── Internal ──────────────────────────────────────────────

    fn leave_subscribing(&self, to: SubscriptionState) {
        // A disconnect may already have reset the state; keep its result.
        let _ = self.subscription.compare_exchange(
            SubscriptionState::Subscribing as u8,
            to as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }

    fn lock_link(&self) -> std::sync::MutexGuard<'_, Option<Link>> {
        self.link.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_in_flight(&self) -> std::sync::MutexGuard<'_, Option<Payload>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────
