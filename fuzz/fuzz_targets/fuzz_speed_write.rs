//! Fuzz target: peer write → `MotorLinkService::handle_event`
//!
//! Feeds arbitrary RECV writes through the server and the event queue into
//! the motor service. The server accepts every write in full, the queued
//! payload is truncated to the ATT maximum, and the pulse outputs never
//! leave the period or drive both directions at once.
//!
//! cargo fuzz run fuzz_speed_write

#![no_main]

use cx_endpoint::app::channels::{ServerEventChannel, ServerEventForwarder};
use cx_endpoint::app::events::ServerEvent;
use cx_endpoint::app::ports::{NotifyTransport, PwmDevice, PwmRegistry};
use cx_endpoint::app::service::MotorLinkService;
use cx_endpoint::config::SystemConfig;
use cx_endpoint::endpoint::{EndpointServer, MAX_PAYLOAD_LEN};
use cx_endpoint::error::{Result, TransportError};
use libfuzzer_sys::fuzz_target;

struct NullNotifier;

impl NotifyTransport for NullNotifier {
    fn notify(&self, data: &[u8]) -> core::result::Result<(), TransportError> {
        assert_eq!(data.len(), 1, "echo must be a single speed byte");
        Ok(())
    }
}

#[derive(Default)]
struct CheckedPwm;

impl PwmDevice for CheckedPwm {
    fn set_usec(&mut self, _pin: u32, period_us: u32, pulse_us: u32) -> Result<()> {
        assert!(pulse_us <= period_us, "pulse exceeds period");
        Ok(())
    }
}

struct OneDevice;

impl PwmRegistry for OneDevice {
    type Device = CheckedPwm;

    fn bind(&mut self, _name: &str) -> Option<CheckedPwm> {
        Some(CheckedPwm)
    }
}

static EVENTS: ServerEventChannel = ServerEventChannel::new();
static SERVER: EndpointServer<NullNotifier> = EndpointServer::new(NullNotifier);

fuzz_target!(|data: &[u8]| {
    SERVER.register(ServerEventForwarder::new(&EVENTS));
    SERVER.on_subscription_change(true);

    let mut service: MotorLinkService<CheckedPwm> = MotorLinkService::new(SystemConfig::default());
    if service.start(&mut OneDevice).is_err() {
        return;
    }

    // Split the input into writes; the first byte of each chunk is its length.
    let mut rest = data;
    while let Some((&len, tail)) = rest.split_first() {
        let n = (len as usize).min(tail.len());
        let (write, next) = tail.split_at(n);
        assert_eq!(SERVER.on_write(write), write.len());
        match EVENTS.try_receive() {
            Ok(ServerEvent::Received(payload)) => {
                assert_eq!(payload.len(), write.len().min(MAX_PAYLOAD_LEN));
                service.handle_event(ServerEvent::Received(payload), &SERVER);
            }
            other => panic!("expected one Received event, got {:?}", other),
        }
        rest = next;

        let duty = service.motor().duty();
        assert!(duty.pulse_forward_us == 0 || duty.pulse_reverse_us == 0);
        assert!((-100..=100).contains(&service.motor().speed()));
    }
});
