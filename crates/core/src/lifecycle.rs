//! Device lifecycle state machine
//!
//! Tracks one logical reader slot from discovery through permission,
//! connection and detachment. The machine exclusively owns the open
//! connection; the card session borrows it only for the duration of a
//! single exchange, so a close can never race a transmit.
//!
//! Every failure here is recoverable: denials, open errors and
//! detachments all route back to a state that watches for the next
//! attachment. Only an explicit [`Event::Shutdown`] is terminal.

use tracing::{debug, info, warn};

use crate::event::{CardState, DeviceId, Event};
use crate::notify::{DisplayValue, Notifier};
use crate::permission::PermissionGate;
use crate::session::CardSession;
use crate::transport::{CardTransport, TransportFactory};

/// States of the device lifecycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleState {
    /// No device known; watching for attachments
    NoDevice,
    /// Permission requested for this device, decision pending
    AwaitingPermission(DeviceId),
    /// Connection open to this device
    Connected(DeviceId),
    /// Shut down; all further events are ignored
    Closed,
}

/// The device lifecycle state machine
///
/// Exactly one instance of this machine runs per process. It consumes
/// the single ordered event queue and drives the transport open/close
/// and the embedded [`CardSession`].
#[derive(Debug)]
pub struct DeviceLifecycle<F, G, N>
where
    F: TransportFactory,
    G: PermissionGate,
    N: Notifier,
{
    factory: F,
    gate: G,
    notifier: N,
    session: CardSession,
    state: LifecycleState,
    connection: Option<F::Transport>,
}

impl<F, G, N> DeviceLifecycle<F, G, N>
where
    F: TransportFactory,
    G: PermissionGate,
    N: Notifier,
{
    /// Create a lifecycle machine in the initial watching state
    pub const fn new(factory: F, gate: G, notifier: N) -> Self {
        Self {
            factory,
            gate,
            notifier,
            session: CardSession::new(),
            state: LifecycleState::NoDevice,
            connection: None,
        }
    }

    /// Current state
    pub const fn state(&self) -> &LifecycleState {
        &self.state
    }

    /// Whether the machine has been shut down
    pub const fn is_closed(&self) -> bool {
        matches!(self.state, LifecycleState::Closed)
    }

    /// Access the notifier
    pub const fn notifier(&self) -> &N {
        &self.notifier
    }

    /// Seed the machine with the devices enumerated at startup
    ///
    /// Picks the first enumerated device and requests permission for
    /// it; with nothing enumerated the machine stays in
    /// [`LifecycleState::NoDevice`], watching for attachments.
    pub fn discover(&mut self, devices: &[DeviceId]) {
        if self.state != LifecycleState::NoDevice {
            debug!(state = ?self.state, "discovery ignored outside the watching state");
            return;
        }
        match devices.first() {
            Some(device) => self.request_permission(device.clone()),
            None => {
                self.notifier
                    .log("No reader detected, please attach reader ...");
            }
        }
    }

    /// Feed one event into the machine
    pub fn handle(&mut self, event: Event) {
        if self.is_closed() {
            debug!(?event, "event after shutdown, ignoring");
            return;
        }
        match event {
            Event::Attached(device) => self.on_attached(device),
            Event::Detached(device) => self.on_detached(&device),
            Event::Permission { device, granted } => self.on_permission(&device, granted),
            Event::CardState { current, .. } => self.on_card_state(current),
            Event::Shutdown => self.on_shutdown(),
        }
    }

    fn on_attached(&mut self, device: DeviceId) {
        if self.state != LifecycleState::NoDevice {
            debug!(device = %device, state = ?self.state, "attachment while busy, ignoring");
            return;
        }
        self.notifier.log("Reader attached");
        self.request_permission(device);
    }

    fn request_permission(&mut self, device: DeviceId) {
        self.notifier
            .log("Requesting permission to connect to reader");
        self.gate.request(&device);
        self.state = LifecycleState::AwaitingPermission(device);
    }

    fn on_permission(&mut self, device: &DeviceId, granted: bool) {
        let LifecycleState::AwaitingPermission(pending) = &self.state else {
            debug!(device = %device, "permission decision without pending request, ignoring");
            return;
        };
        if pending != device {
            debug!(device = %device, pending = %pending, "permission decision for stale device, ignoring");
            return;
        }

        if !granted {
            self.notifier
                .log("Permission denied, cannot open connection");
            self.state = LifecycleState::NoDevice;
            return;
        }

        self.notifier
            .log("Permission granted, opening connection to reader ...");
        match self.factory.open(device) {
            Ok(transport) => {
                info!(device = %device, "reader connected");
                self.connection = Some(transport);
                self.notifier.log("Reader is connected");
                self.state = LifecycleState::Connected(device.clone());
            }
            Err(e) => {
                warn!(device = %device, error = %e, "failed to open reader");
                self.notifier.log("Failed opening connection to reader");
                self.state = LifecycleState::NoDevice;
            }
        }
    }

    fn on_detached(&mut self, device: &DeviceId) {
        match &self.state {
            LifecycleState::Connected(current) if current == device => {
                self.close_connection();
                self.session.reset();
                self.notifier.log("Reader detached");
                self.notifier.log("Connection to reader is disconnected");
                self.notifier.display(DisplayValue::NoCard);
                self.state = LifecycleState::NoDevice;
            }
            LifecycleState::AwaitingPermission(pending) if pending == device => {
                // Device vanished before the permission decision; a
                // late grant for it will be ignored as stale.
                debug!(device = %device, "pending device detached before permission resolved");
                self.state = LifecycleState::NoDevice;
            }
            _ => {
                debug!(device = %device, state = ?self.state, "detachment for unrelated device, ignoring");
            }
        }
    }

    fn on_card_state(&mut self, current: CardState) {
        let (LifecycleState::Connected(_), Some(transport)) = (&self.state, &mut self.connection)
        else {
            debug!(state = %current, "card state without open connection, discarding");
            return;
        };
        self.session
            .on_card_state(current, transport, &mut self.notifier);
    }

    fn on_shutdown(&mut self) {
        self.close_connection();
        self.session.reset();
        self.state = LifecycleState::Closed;
    }

    fn close_connection(&mut self) {
        if let Some(mut transport) = self.connection.take() {
            transport.close();
        }
    }
}
