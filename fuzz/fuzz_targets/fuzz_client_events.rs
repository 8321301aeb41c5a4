//! Fuzz target: `EndpointClient` operation sequences
//!
//! Interprets each input byte as a client call or a stack event and checks
//! that at most one write is ever outstanding and that every completion
//! hands back exactly the payload that was sent.
//!
//! cargo fuzz run fuzz_client_events

#![no_main]

use std::sync::Mutex;

use cx_endpoint::app::events::ClientEvent;
use cx_endpoint::app::ports::{ClientHandler, GattClientTransport, SubscribeParams};
use cx_endpoint::endpoint::discovery::{DiscoveredCharacteristic, DiscoveredService};
use cx_endpoint::endpoint::uuid::{CCC_UUID, RECV_CHAR_UUID, SEND_CHAR_UUID, SERVICE_UUID};
use cx_endpoint::endpoint::{payload, AttHandle, AttStatus, ConnectionRef, EndpointClient, Payload};
use cx_endpoint::error::TransportError;
use libfuzzer_sys::fuzz_target;

struct FlakyGatt {
    fail: Mutex<bool>,
}

impl FlakyGatt {
    fn outcome(&self) -> core::result::Result<(), TransportError> {
        if std::mem::take(&mut *self.fail.lock().unwrap()) {
            Err(TransportError(-1))
        } else {
            Ok(())
        }
    }
}

impl GattClientTransport for FlakyGatt {
    fn subscribe(&self, _: ConnectionRef, _: &SubscribeParams) -> core::result::Result<(), TransportError> {
        self.outcome()
    }

    fn write(&self, _: ConnectionRef, _: AttHandle, _: &[u8]) -> core::result::Result<(), TransportError> {
        self.outcome()
    }
}

#[derive(Default)]
struct LastSent(Mutex<Vec<Vec<u8>>>);

impl ClientHandler for LastSent {
    fn sent(&self, _status: AttStatus, payload: Payload) {
        self.0.lock().unwrap().push(payload.to_vec());
    }
}

fuzz_target!(|data: &[u8]| {
    let conn = ConnectionRef(1);
    let service = DiscoveredService::new(SERVICE_UUID, conn)
        .with_characteristic(
            DiscoveredCharacteristic::new(SEND_CHAR_UUID)
                .with_attribute(SEND_CHAR_UUID, 3)
                .with_attribute(CCC_UUID, 4),
        )
        .with_characteristic(DiscoveredCharacteristic::new(RECV_CHAR_UUID).with_attribute(RECV_CHAR_UUID, 6));

    let client = EndpointClient::new(FlakyGatt { fail: Mutex::new(false) });
    if client.init(LastSent::default()).is_err() {
        return;
    }
    let mut in_flight: Option<u8> = None;
    let mut completed = Vec::new();

    for &b in data {
        match b % 7 {
            0 => {
                let _ = client.assign_handles(&service);
            }
            1 => {
                let _ = client.subscribe();
            }
            2 => {
                if client.send(payload(&[b]).unwrap()).is_ok() {
                    assert!(in_flight.is_none(), "two writes outstanding");
                    in_flight = Some(b);
                }
            }
            3 => {
                client.dispatch(ClientEvent::WriteComplete(b));
                if let Some(sent) = in_flight.take() {
                    completed.push(vec![sent]);
                }
            }
            4 => {
                client.dispatch(ClientEvent::SubscriptionLost);
            }
            5 => {
                client.dispatch(ClientEvent::Disconnected(conn));
                in_flight = None;
            }
            _ => {
                *client.transport().fail.lock().unwrap() = true;
            }
        }
        assert_eq!(client.is_write_pending(), in_flight.is_some());
    }

    assert_eq!(*client.handler().unwrap().0.lock().unwrap(), completed);
});
