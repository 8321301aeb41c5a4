//! Integration tests: MotorLinkService → MotorController → pulse device.

use cx_endpoint::app::events::ServerEvent;
use cx_endpoint::app::service::MotorLinkService;
use cx_endpoint::config::SystemConfig;
use cx_endpoint::endpoint::{payload, ConnectionRef, EndpointServer};
use cx_endpoint::error::{Error, TransportError};
use cx_endpoint::pins::{MOTOR_FORWARD_PIN, MOTOR_REVERSE_PIN, PWM_PERIOD_US};

use crate::mock_link::{MockNotifier, MockPwm, MockRegistry};

const PEER: ConnectionRef = ConnectionRef(5);

fn started(config: SystemConfig) -> MotorLinkService<MockPwm> {
    let mut service = MotorLinkService::new(config);
    service.start(&mut MockRegistry { name: "PWM_0" }).unwrap();
    service
}

fn subscribed_server() -> EndpointServer<MockNotifier> {
    let server = EndpointServer::new(MockNotifier::default());
    server.on_subscription_change(true);
    server
}

fn write(service: &mut MotorLinkService<MockPwm>, server: &EndpointServer<MockNotifier>, data: &[u8]) {
    service.handle_event(ServerEvent::Received(payload(data).unwrap()), server);
}

fn pwm(service: &MotorLinkService<MockPwm>) -> &MockPwm {
    service.motor().device().unwrap()
}

// ── Startup ───────────────────────────────────────────────────

#[test]
fn start_binds_device_and_stops_motor() {
    let service = started(SystemConfig::default());
    assert_eq!(pwm(&service).calls.len(), 2);
    assert_eq!(pwm(&service).pulse(MOTOR_FORWARD_PIN), Some(0));
    assert_eq!(pwm(&service).pulse(MOTOR_REVERSE_PIN), Some(0));
    assert!(pwm(&service).calls.iter().all(|c| c.period_us == PWM_PERIOD_US));
}

#[test]
fn start_fails_without_device() {
    let mut service: MotorLinkService<MockPwm> = MotorLinkService::new(SystemConfig::default());
    assert_eq!(
        service.start(&mut MockRegistry { name: "PWM_1" }),
        Err(Error::DeviceNotFound)
    );
    assert!(!service.motor().is_bound());
}

// ── Speed writes ──────────────────────────────────────────────

#[test]
fn forward_speed_is_applied_and_echoed() {
    let mut service = started(SystemConfig::default());
    let server = subscribed_server();

    write(&mut service, &server, &[75]);

    assert_eq!(pwm(&service).pulse(MOTOR_FORWARD_PIN), Some(15_000));
    assert_eq!(pwm(&service).pulse(MOTOR_REVERSE_PIN), Some(0));
    assert_eq!(service.last_reported(), Some(75));
    assert_eq!(server.transport().take(), vec![vec![75]]);
}

#[test]
fn reverse_speed_drives_reverse_pin() {
    let mut service = started(SystemConfig::default());
    let server = subscribed_server();

    write(&mut service, &server, &[(-20i8) as u8]);

    assert_eq!(pwm(&service).pulse(MOTOR_FORWARD_PIN), Some(0));
    assert_eq!(pwm(&service).pulse(MOTOR_REVERSE_PIN), Some(4_000));
    assert_eq!(server.transport().take(), vec![vec![0xec]]);
}

#[test]
fn out_of_range_reports_zero_and_keeps_output() {
    let mut service = started(SystemConfig::default());
    let server = subscribed_server();
    write(&mut service, &server, &[40]);
    let writes_before = pwm(&service).calls.len();

    write(&mut service, &server, &[120]);

    assert_eq!(pwm(&service).calls.len(), writes_before);
    assert_eq!(service.motor().speed(), 40);
    assert_eq!(service.last_reported(), Some(0));
    assert_eq!(server.transport().take(), vec![vec![40], vec![0]]);
}

#[test]
fn empty_write_reports_zero() {
    let mut service = started(SystemConfig::default());
    let server = subscribed_server();

    service.handle_event(ServerEvent::Received(Default::default()), &server);

    assert_eq!(service.last_reported(), Some(0));
    assert_eq!(server.transport().take(), vec![vec![0]]);
}

#[test]
fn trailing_bytes_are_ignored() {
    let mut service = started(SystemConfig::default());
    let server = subscribed_server();
    write(&mut service, &server, &[10, 0xff, 0xff]);
    assert_eq!(service.motor().speed(), 10);
}

#[test]
fn unsubscribed_peer_still_moves_motor() {
    let mut service = started(SystemConfig::default());
    let server = EndpointServer::new(MockNotifier::default());

    write(&mut service, &server, &[30]);

    assert_eq!(service.motor().speed(), 30);
    assert!(server.transport().take().is_empty());
}

#[test]
fn echo_failure_is_not_fatal() {
    let mut service = started(SystemConfig::default());
    let server = subscribed_server();
    *server.transport().fail_with.lock().unwrap() = Some(TransportError(-105));

    write(&mut service, &server, &[5]);
    write(&mut service, &server, &[6]);

    assert_eq!(service.motor().speed(), 6);
    assert_eq!(server.transport().take(), vec![vec![6]]);
}

#[test]
fn echo_can_be_disabled() {
    let config = SystemConfig {
        echo_applied_speed: false,
        ..SystemConfig::default()
    };
    let mut service = started(config);
    let server = subscribed_server();

    write(&mut service, &server, &[55]);

    assert_eq!(service.motor().speed(), 55);
    assert!(server.transport().take().is_empty());
}

// ── Connection lifecycle ──────────────────────────────────────

#[test]
fn disconnect_stops_motor() {
    let mut service = started(SystemConfig::default());
    let server = subscribed_server();

    service.handle_event(ServerEvent::Connected(PEER), &server);
    assert_eq!(service.peer(), Some(PEER));
    write(&mut service, &server, &[90]);
    assert!(service.motor().is_running());

    service.handle_event(ServerEvent::Disconnected(PEER, 0x13), &server);

    assert_eq!(service.peer(), None);
    assert!(!service.motor().is_running());
    assert_eq!(pwm(&service).pulse(MOTOR_FORWARD_PIN), Some(0));
}

#[test]
fn disconnect_can_keep_motor_running() {
    let config = SystemConfig {
        stop_on_disconnect: false,
        ..SystemConfig::default()
    };
    let mut service = started(config);
    let server = subscribed_server();
    write(&mut service, &server, &[(-60i8) as u8]);

    service.handle_event(ServerEvent::Disconnected(PEER, 0x08), &server);

    assert_eq!(service.motor().speed(), -60);
}
