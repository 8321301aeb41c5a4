//! Motor-link service: the peripheral application.
//!
//! [`MotorLinkService`] owns the motor controller and reacts to server
//! events drained from the event queue. The endpoint server is passed in
//! at call sites, keeping the service testable with a recording transport.
//!
//! ```text
//!  ServerEvent ──▶ ┌────────────────────┐ ──▶ MotorController (PwmDevice)
//!                  │   MotorLinkService │
//!                  └────────────────────┘ ──▶ EndpointServer::send (echo)
//! ```

use log::{debug, info, warn};

use super::channels::ServerEventChannel;
use super::commands::SpeedCommand;
use super::events::ServerEvent;
use super::ports::{NotifyTransport, PwmDevice, PwmRegistry};
use crate::config::SystemConfig;
use crate::drivers::motor::MotorController;
use crate::endpoint::{ConnectionRef, EndpointServer, Payload};
use crate::error::Result;

// ───────────────────────────────────────────────────────────────
// MotorLinkService
// ───────────────────────────────────────────────────────────────

pub struct MotorLinkService<D: PwmDevice> {
    config: SystemConfig,
    motor: MotorController<D>,
    peer: Option<ConnectionRef>,
    /// Speed reported for the most recent RECV write.
    last_reported: Option<i8>,
}

impl<D: PwmDevice> MotorLinkService<D> {
    /// Construct the service. The motor is not bound until [`start`](Self::start).
    pub fn new(config: SystemConfig) -> Self {
        let motor = MotorController::new(&config.motor);
        Self {
            config,
            motor,
            peer: None,
            last_reported: None,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Bind the pulse device and force a stopped output.
    pub fn start<R>(&mut self, registry: &mut R) -> Result<()>
    where
        R: PwmRegistry<Device = D>,
    {
        self.motor.init(registry)?;
        info!("motor link ready ('{}')", self.config.device_name);
        Ok(())
    }

    // ── Event handling ────────────────────────────────────────

    /// Handle every queued event. Returns how many were processed.
    pub fn drain<T: NotifyTransport>(
        &mut self,
        channel: &ServerEventChannel,
        server: &EndpointServer<T>,
    ) -> usize {
        let mut handled = 0;
        while let Ok(event) = channel.try_receive() {
            self.handle_event(event, server);
            handled += 1;
        }
        handled
    }

    pub fn handle_event<T: NotifyTransport>(&mut self, event: ServerEvent, server: &EndpointServer<T>) {
        match event {
            ServerEvent::Connected(conn) => {
                info!("connected ({:?})", conn);
                self.peer = Some(conn);
            }
            ServerEvent::Disconnected(conn, reason) => {
                info!("disconnected ({:?}, reason 0x{:02x})", conn, reason);
                self.peer = None;
                if self.config.stop_on_disconnect {
                    if let Err(e) = self.motor.stop() {
                        warn!("failed to stop motor on disconnect: {}", e);
                    }
                }
            }
            ServerEvent::Received(payload) => self.on_received(&payload, server),
        }
    }

    fn on_received<T: NotifyTransport>(&mut self, payload: &Payload, server: &EndpointServer<T>) {
        debug!("received {} bytes: {:02x?}", payload.len(), payload.as_slice());

        let reported = match SpeedCommand::decode(payload)
            .and_then(|cmd| self.motor.set(cmd.speed).map(|()| cmd.speed))
        {
            Ok(speed) => {
                info!("motor speed set to {}", speed);
                speed
            }
            Err(e) => {
                warn!("speed command rejected: {}", e);
                0
            }
        };
        self.last_reported = Some(reported);

        if self.config.echo_applied_speed {
            match server.send(&SpeedCommand { speed: reported }.encode()) {
                Ok(()) => debug!("speed {} echoed", reported),
                Err(e) => warn!("speed echo not sent: {}", e),
            }
        }
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn motor(&self) -> &MotorController<D> {
        &self.motor
    }

    pub fn peer(&self) -> Option<ConnectionRef> {
        self.peer
    }

    pub fn last_reported(&self) -> Option<i8> {
        self.last_reported
    }

    pub fn config(&self) -> &SystemConfig {
        &self.config
    }
}
