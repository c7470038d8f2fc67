//! Authorization gate for discovered devices
//!
//! A connection may only be opened after the owning platform has
//! granted access to the device. Requesting access is fire-and-forget;
//! the decision comes back asynchronously as an
//! [`Event::Permission`](crate::Event::Permission) on the event queue,
//! so the lifecycle machine handles grant and deny exactly like any
//! other input.

use tracing::debug;

use crate::event::{DeviceId, Event, EventSender};

/// Mediates access to a discovered device
pub trait PermissionGate {
    /// Ask the platform for permission to open the device
    ///
    /// Must not block. The outcome arrives later as an
    /// [`Event::Permission`](crate::Event::Permission) for the same
    /// device.
    fn request(&self, device: &DeviceId);
}

/// Gate that grants every request immediately
///
/// Platforms without a per-device authorization prompt (PC/SC among
/// them) answer through this gate; the decision still travels through
/// the event queue so the lifecycle machine sees a single code path.
#[derive(Debug, Clone)]
pub struct AutoGrant {
    events: EventSender,
}

impl AutoGrant {
    /// Create a gate answering onto the given event queue
    pub const fn new(events: EventSender) -> Self {
        Self { events }
    }
}

impl PermissionGate for AutoGrant {
    fn request(&self, device: &DeviceId) {
        debug!(device = %device, "auto-granting device access");
        let _ = self.events.send(Event::Permission {
            device: device.clone(),
            granted: true,
        });
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::event_channel;

    #[test]
    fn test_auto_grant_answers_on_queue() {
        let (tx, rx) = event_channel();
        let gate = AutoGrant::new(tx);
        let device = DeviceId::new("reader-0");
        gate.request(&device);

        assert_eq!(
            rx.recv().unwrap(),
            Event::Permission {
                device,
                granted: true
            }
        );
    }
}
