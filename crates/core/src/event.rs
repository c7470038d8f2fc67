//! The single ordered event queue
//!
//! Every asynchronous input arrives as an [`Event`] on one channel:
//! device attachment and detachment, permission decisions, card state
//! changes, shutdown. The state machines only ever run on the thread
//! draining that channel, which is what serializes transmits against
//! close without any locking.

use crossbeam_channel::{Receiver, Sender, unbounded};
use derive_more::Display;

/// Identity of a physical device (reader name or serial path)
///
/// Equality on this value is what decides whether a detachment event
/// refers to the currently open connection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display)]
pub struct DeviceId(String);

impl DeviceId {
    /// Create a device identity from its OS-assigned name
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The underlying name
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl From<&str> for DeviceId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Card presence as reported by the reader
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum CardState {
    /// No card in the slot
    #[display("absent")]
    Absent,
    /// Card in the slot
    #[display("present")]
    Present,
    /// Presence could not be determined
    #[display("unknown")]
    Unknown,
}

/// Events consumed by the device lifecycle state machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A device was attached to the system
    Attached(DeviceId),
    /// A device was detached from the system
    Detached(DeviceId),
    /// The permission request for a device was resolved
    Permission {
        /// Device the decision is for
        device: DeviceId,
        /// Whether access was granted
        granted: bool,
    },
    /// The reader reported a card state change
    CardState {
        /// State before the change
        previous: CardState,
        /// State after the change
        current: CardState,
    },
    /// The owning application is shutting down
    Shutdown,
}

/// Sender half of the event queue
pub type EventSender = Sender<Event>;
/// Receiver half of the event queue
pub type EventReceiver = Receiver<Event>;

/// Create an unbounded event channel
pub fn event_channel() -> (EventSender, EventReceiver) {
    unbounded()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_identity_equality() {
        let a = DeviceId::new("usb:1-1.4");
        let b = DeviceId::from("usb:1-1.4");
        let c = DeviceId::new("usb:1-1.5");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_event_channel_preserves_order() {
        let (tx, rx) = event_channel();
        tx.send(Event::Attached(DeviceId::new("r0"))).unwrap();
        tx.send(Event::CardState {
            previous: CardState::Absent,
            current: CardState::Present,
        })
        .unwrap();
        tx.send(Event::Shutdown).unwrap();

        assert_eq!(rx.recv().unwrap(), Event::Attached(DeviceId::new("r0")));
        assert!(matches!(rx.recv().unwrap(), Event::CardState { .. }));
        assert_eq!(rx.recv().unwrap(), Event::Shutdown);
    }
}
