//! Mock GATT transports and pulse devices for integration tests.
//!
//! Records every transport call so tests can assert on the full wire
//! history without a radio.

use std::sync::Mutex;

use cx_endpoint::app::ports::{
    ClientHandler, GattClientTransport, NotifyTransport, PwmDevice, PwmRegistry, SubscribeParams,
};
use cx_endpoint::endpoint::discovery::{DiscoveredCharacteristic, DiscoveredService};
use cx_endpoint::endpoint::uuid::{CCC_UUID, RECV_CHAR_UUID, SEND_CHAR_UUID, SERVICE_UUID};
use cx_endpoint::endpoint::{AttHandle, AttStatus, ConnectionRef, Continuation, Payload};
use cx_endpoint::error::{Result, TransportError};

pub const SEND_HANDLE: u16 = 0x0010;
pub const SEND_CCC_HANDLE: u16 = 0x0011;
pub const RECV_HANDLE: u16 = 0x0013;

/// Discovery result for a well-formed CX endpoint peer.
pub fn cx_service(conn: ConnectionRef) -> DiscoveredService {
    DiscoveredService::new(SERVICE_UUID, conn)
        .with_characteristic(
            DiscoveredCharacteristic::new(SEND_CHAR_UUID)
                .with_attribute(SEND_CHAR_UUID, SEND_HANDLE)
                .with_attribute(CCC_UUID, SEND_CCC_HANDLE),
        )
        .with_characteristic(
            DiscoveredCharacteristic::new(RECV_CHAR_UUID).with_attribute(RECV_CHAR_UUID, RECV_HANDLE),
        )
}

// ── Peripheral side ───────────────────────────────────────────

#[derive(Default)]
pub struct MockNotifier {
    pub notified: Mutex<Vec<Vec<u8>>>,
    pub fail_with: Mutex<Option<TransportError>>,
}

#[allow(dead_code)]
impl MockNotifier {
    pub fn take(&self) -> Vec<Vec<u8>> {
        std::mem::take(&mut *self.notified.lock().unwrap())
    }
}

impl NotifyTransport for MockNotifier {
    fn notify(&self, data: &[u8]) -> core::result::Result<(), TransportError> {
        if let Some(e) = self.fail_with.lock().unwrap().take() {
            return Err(e);
        }
        self.notified.lock().unwrap().push(data.to_vec());
        Ok(())
    }
}

// ── Central side ──────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteCall {
    pub conn: ConnectionRef,
    pub handle: AttHandle,
    pub data: Vec<u8>,
}

#[derive(Default)]
pub struct MockGattClient {
    pub writes: Mutex<Vec<WriteCall>>,
    pub subscriptions: Mutex<Vec<(ConnectionRef, SubscribeParams)>>,
    pub reject_next_write: Mutex<Option<TransportError>>,
    pub reject_next_subscribe: Mutex<Option<TransportError>>,
}

#[allow(dead_code)]
impl MockGattClient {
    pub fn take_writes(&self) -> Vec<WriteCall> {
        std::mem::take(&mut *self.writes.lock().unwrap())
    }
}

impl GattClientTransport for MockGattClient {
    fn subscribe(
        &self,
        conn: ConnectionRef,
        params: &SubscribeParams,
    ) -> core::result::Result<(), TransportError> {
        if let Some(e) = self.reject_next_subscribe.lock().unwrap().take() {
            return Err(e);
        }
        self.subscriptions.lock().unwrap().push((conn, *params));
        Ok(())
    }

    fn write(
        &self,
        conn: ConnectionRef,
        handle: AttHandle,
        data: &[u8],
    ) -> core::result::Result<(), TransportError> {
        if let Some(e) = self.reject_next_write.lock().unwrap().take() {
            return Err(e);
        }
        self.writes.lock().unwrap().push(WriteCall {
            conn,
            handle,
            data: data.to_vec(),
        });
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientCall {
    Received(Vec<u8>),
    Sent(AttStatus, Vec<u8>),
    Unsubscribed,
}

/// Records every handler invocation in order.
#[derive(Default)]
pub struct RecordingHandler {
    pub calls: Mutex<Vec<ClientCall>>,
}

#[allow(dead_code)]
impl RecordingHandler {
    pub fn calls(&self) -> Vec<ClientCall> {
        self.calls.lock().unwrap().clone()
    }
}

impl ClientHandler for RecordingHandler {
    fn received(&self, data: &[u8]) -> Continuation {
        self.calls.lock().unwrap().push(ClientCall::Received(data.to_vec()));
        Continuation::Continue
    }

    fn sent(&self, status: AttStatus, payload: Payload) {
        self.calls
            .lock()
            .unwrap()
            .push(ClientCall::Sent(status, payload.to_vec()));
    }

    fn unsubscribed(&self) {
        self.calls.lock().unwrap().push(ClientCall::Unsubscribed);
    }
}

// ── Pulse device ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PwmCall {
    pub pin: u32,
    pub period_us: u32,
    pub pulse_us: u32,
}

#[derive(Default)]
pub struct MockPwm {
    pub calls: Vec<PwmCall>,
}

#[allow(dead_code)]
impl MockPwm {
    /// Most recent pulse width written to `pin`.
    pub fn pulse(&self, pin: u32) -> Option<u32> {
        self.calls.iter().rev().find(|c| c.pin == pin).map(|c| c.pulse_us)
    }
}

impl PwmDevice for MockPwm {
    fn set_usec(&mut self, pin: u32, period_us: u32, pulse_us: u32) -> Result<()> {
        self.calls.push(PwmCall {
            pin,
            period_us,
            pulse_us,
        });
        Ok(())
    }
}

/// Registry exposing one [`MockPwm`] under `name`.
pub struct MockRegistry {
    pub name: &'static str,
}

impl PwmRegistry for MockRegistry {
    type Device = MockPwm;

    fn bind(&mut self, name: &str) -> Option<MockPwm> {
        (name == self.name).then(MockPwm::default)
    }
}
