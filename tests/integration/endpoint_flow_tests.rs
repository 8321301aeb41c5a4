//! Integration tests: central client ⇄ peripheral server over mock links.

use std::sync::{Arc, Barrier};
use std::thread;

use cx_endpoint::app::central::CentralLink;
use cx_endpoint::app::channels::{ServerEventChannel, ServerEventForwarder};
use cx_endpoint::app::events::{ClientEvent, ServerEvent};
use cx_endpoint::app::service::MotorLinkService;
use cx_endpoint::config::SystemConfig;
use cx_endpoint::endpoint::discovery::{DiscoveredCharacteristic, DiscoveredService};
use cx_endpoint::endpoint::uuid::{CCC_NOTIFY, CCC_UUID, SEND_CHAR_UUID, SERVICE_UUID};
use cx_endpoint::endpoint::{
    payload, AttHandle, ConnectionRef, Continuation, EndpointClient, EndpointServer, SubscriptionState,
    ATT_SUCCESS, MAX_PAYLOAD_LEN,
};
use cx_endpoint::error::{Error, TransportError};

use crate::mock_link::{
    cx_service, ClientCall, MockGattClient, MockNotifier, MockPwm, MockRegistry, RecordingHandler,
    RECV_HANDLE, SEND_CCC_HANDLE, SEND_HANDLE,
};

const CONN: ConnectionRef = ConnectionRef(1);

fn connected_client() -> EndpointClient<MockGattClient, RecordingHandler> {
    let client = EndpointClient::new(MockGattClient::default());
    client.init(RecordingHandler::default()).unwrap();
    client.assign_handles(&cx_service(CONN)).unwrap();
    client
}

// ── Client write lifecycle ────────────────────────────────────

#[test]
fn send_complete_send_scenario() {
    let client = connected_client();

    client.send(payload(&[0x01]).unwrap()).unwrap();
    assert!(client.is_write_pending());

    client.dispatch(ClientEvent::WriteComplete(ATT_SUCCESS));
    assert_eq!(
        client.handler().unwrap().calls(),
        vec![ClientCall::Sent(ATT_SUCCESS, vec![0x01])]
    );
    assert!(!client.is_write_pending());

    assert_eq!(client.send(payload(&[0x02]).unwrap()), Ok(()));

    let writes = client.transport().take_writes();
    assert_eq!(writes.len(), 2);
    assert!(writes.iter().all(|w| w.conn == CONN && w.handle == AttHandle(RECV_HANDLE)));
    assert_eq!(writes[1].data, vec![0x02]);
}

#[test]
fn disconnect_then_reconnect_starts_clean() {
    let client = connected_client();
    client.subscribe().unwrap();
    client.send(payload(&[0x01]).unwrap()).unwrap();

    client.dispatch(ClientEvent::Disconnected(CONN));
    assert!(!client.is_write_pending());
    assert_eq!(client.subscription_state(), SubscriptionState::Unsubscribed);
    assert!(client.handles().is_none());
    assert_eq!(client.send(payload(&[0x02]).unwrap()), Err(Error::NotConnected));
    assert!(client.handler().unwrap().calls().is_empty());

    let next = ConnectionRef(2);
    client.assign_handles(&cx_service(next)).unwrap();
    assert_eq!(client.subscribe(), Ok(()));
    assert_eq!(client.send(payload(&[0x03]).unwrap()), Ok(()));

    let subs = client.transport().subscriptions.lock().unwrap().clone();
    assert_eq!(subs.len(), 2);
    assert_eq!(subs[1].0, next);
    assert_eq!(subs[1].1.value_handle, AttHandle(SEND_HANDLE));
    assert_eq!(subs[1].1.ccc_handle, AttHandle(SEND_CCC_HANDLE));
    assert_eq!(subs[1].1.ccc_value, CCC_NOTIFY);
    assert!(subs[1].1.volatile);
}

#[test]
fn subscribe_failure_can_be_retried() {
    let client = connected_client();
    *client.transport().reject_next_subscribe.lock().unwrap() = Some(TransportError(-12));
    assert_eq!(client.subscribe(), Err(Error::TransportFailure(-12)));
    assert_eq!(client.subscription_state(), SubscriptionState::Unsubscribed);
    assert_eq!(client.subscribe(), Ok(()));
    assert_eq!(client.subscription_state(), SubscriptionState::Subscribed);
}

#[test]
fn discovery_without_write_characteristic_is_rejected() {
    let client: EndpointClient<MockGattClient, RecordingHandler> = EndpointClient::new(MockGattClient::default());
    let notify_only = DiscoveredService::new(SERVICE_UUID, CONN).with_characteristic(
        DiscoveredCharacteristic::new(SEND_CHAR_UUID)
            .with_attribute(SEND_CHAR_UUID, SEND_HANDLE)
            .with_attribute(CCC_UUID, SEND_CCC_HANDLE),
    );
    assert_eq!(client.assign_handles(&notify_only), Err(Error::MissingCharacteristic));
    assert_eq!(client.send(payload(&[1]).unwrap()), Err(Error::NotConnected));
}

#[test]
fn subscription_loss_stops_notifications() {
    let client = connected_client();
    client.subscribe().unwrap();

    assert_eq!(client.dispatch(ClientEvent::Notification(&[0x2a])), Continuation::Continue);
    assert_eq!(client.dispatch(ClientEvent::SubscriptionLost), Continuation::Stop);
    assert_eq!(
        client.handler().unwrap().calls(),
        vec![ClientCall::Received(vec![0x2a]), ClientCall::Unsubscribed]
    );
}

// ── Concurrency ───────────────────────────────────────────────

#[test]
fn concurrent_sends_admit_exactly_one() {
    const THREADS: usize = 8;
    let client = Arc::new(connected_client());
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|i| {
            let client = Arc::clone(&client);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                client.send(payload(&[i as u8]).unwrap())
            })
        })
        .collect();
    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .filter(|r| r.is_err())
        .all(|r| *r == Err(Error::WriteAlreadyPending)));
    assert_eq!(client.transport().writes.lock().unwrap().len(), 1);
}

#[test]
fn concurrent_subscribes_admit_exactly_one() {
    const THREADS: usize = 8;
    let client = Arc::new(connected_client());
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let client = Arc::clone(&client);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                client.subscribe()
            })
        })
        .collect();
    let ok = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(Result::is_ok)
        .count();

    assert_eq!(ok, 1);
    assert_eq!(client.transport().subscriptions.lock().unwrap().len(), 1);
}

#[test]
fn send_racing_disconnect_never_leaves_write_pending() {
    for round in 0..200u16 {
        let client = Arc::new(connected_client());
        let barrier = Arc::new(Barrier::new(2));

        let sender = {
            let client = Arc::clone(&client);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                client.send(payload(&[round as u8]).unwrap())
            })
        };
        let dropper = {
            let client = Arc::clone(&client);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                client.dispatch(ClientEvent::Disconnected(CONN));
            })
        };
        let sent = sender.join().unwrap();
        dropper.join().unwrap();

        assert!(client.connection().is_none());
        assert!(
            !client.is_write_pending(),
            "round {}: write left pending after disconnect (send returned {:?})",
            round,
            sent
        );
        assert!(matches!(sent, Ok(()) | Err(Error::NotConnected)));
    }
}

// ── Peripheral inbound writes ─────────────────────────────────

#[test]
fn oversize_write_is_accepted_in_full_and_queued_truncated() {
    static EVENTS: ServerEventChannel = ServerEventChannel::new();
    let server = EndpointServer::new(MockNotifier::default());
    server.register(ServerEventForwarder::new(&EVENTS));

    let write = [0x5a; 255];
    assert_eq!(server.on_write(&write), write.len());

    match EVENTS.try_receive() {
        Ok(ServerEvent::Received(p)) => {
            assert_eq!(p.len(), MAX_PAYLOAD_LEN);
            assert!(p.iter().all(|&b| b == 0x5a));
        }
        other => panic!("expected Received, got {:?}", other),
    }
    assert!(EVENTS.try_receive().is_err());
}

// ── Central ⇄ peripheral round trip ───────────────────────────

#[test]
fn button_press_drives_motor_and_echo_reaches_central() {
    static EVENTS: ServerEventChannel = ServerEventChannel::new();

    // Peripheral.
    let server = EndpointServer::new(MockNotifier::default());
    server.register(ServerEventForwarder::new(&EVENTS));
    let mut service: MotorLinkService<MockPwm> = MotorLinkService::new(SystemConfig::default());
    service.start(&mut MockRegistry { name: "PWM_0" }).unwrap();

    // Central.
    let central = CentralLink::new(MockGattClient::default(), RecordingHandler::default()).unwrap();
    central.on_connected(CONN);
    central.on_discovery_complete(&cx_service(CONN)).unwrap();
    assert_eq!(central.client().subscription_state(), SubscriptionState::Subscribed);

    // The central's CCC write reaches the peripheral.
    let (_, params) = central.client().transport().subscriptions.lock().unwrap()[0];
    server.on_ccc_write(params.ccc_value);
    assert!(server.is_notify_enabled());

    // Button mask 0x132: only the low byte travels.
    central.send_button_state(0x132).unwrap();
    for w in central.client().transport().take_writes() {
        assert_eq!(w.handle, AttHandle(RECV_HANDLE));
        assert_eq!(server.on_write(&w.data), w.data.len());
    }
    central.on_event(ClientEvent::WriteComplete(ATT_SUCCESS));

    assert_eq!(service.drain(&EVENTS, &server), 1);
    assert_eq!(service.motor().speed(), 50);
    assert_eq!(service.motor().duty().pulse_forward_us, 10_000);

    // Echo travels back as a notification.
    for n in server.transport().take() {
        assert_eq!(central.on_event(ClientEvent::Notification(&n)), Continuation::Continue);
    }
    assert_eq!(
        central.client().handler().unwrap().calls(),
        vec![
            ClientCall::Sent(ATT_SUCCESS, vec![0x32]),
            ClientCall::Received(vec![0x32]),
        ]
    );
}

#[test]
fn server_queue_sees_peripheral_lifecycle() {
    let channel = ServerEventChannel::new();
    let fwd = ServerEventForwarder::new(&channel);
    fwd.connected(CONN);
    fwd.disconnected(CONN, 0x08);
    assert_eq!(channel.try_receive().ok(), Some(ServerEvent::Connected(CONN)));
    assert_eq!(channel.try_receive().ok(), Some(ServerEvent::Disconnected(CONN, 0x08)));
}
