//! Event loop driving the lifecycle machine
//!
//! All state mutation happens on the thread calling [`run`]; event
//! producers (the card monitor, the permission gate, OS attachment
//! hooks) only ever send. The whole concurrency model is one queue
//! with one consumer.

use tracing::debug;

use crate::event::EventReceiver;
use crate::lifecycle::DeviceLifecycle;
use crate::notify::Notifier;
use crate::permission::PermissionGate;
use crate::transport::TransportFactory;

/// Drain the event queue into the lifecycle machine
///
/// Returns when a shutdown event has been handled or every sender has
/// been dropped. Events arriving after shutdown are ignored by the
/// machine itself.
pub fn run<F, G, N>(events: &EventReceiver, lifecycle: &mut DeviceLifecycle<F, G, N>)
where
    F: TransportFactory,
    G: PermissionGate,
    N: Notifier,
{
    for event in events.iter() {
        lifecycle.handle(event);
        if lifecycle.is_closed() {
            break;
        }
    }
    debug!("event loop finished");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{CardState, DeviceId, Event, event_channel};
    use crate::notify::DisplayValue;
    use crate::notify::recording::RecordingNotifier;
    use crate::permission::scripted::{ScriptedGate, SilentGate};
    use crate::transport::mock::MockTransport;
    use crate::transport::{TransportError, TransportFactory};

    #[derive(Debug)]
    struct OkFactory;

    impl TransportFactory for OkFactory {
        type Transport = MockTransport;

        fn open(&self, _device: &DeviceId) -> Result<MockTransport, TransportError> {
            Ok(MockTransport::with_response(&[
                0x04, 0xA1, 0xB2, 0xC3, 0x90, 0x00,
            ]))
        }
    }

    #[test]
    fn test_run_processes_a_full_scan_sequence() {
        let (tx, rx) = event_channel();
        let mut lifecycle =
            DeviceLifecycle::new(OkFactory, SilentGate, RecordingNotifier::default());

        // The whole scan scripted as one ordered queue, permission
        // decision included.
        let device = DeviceId::new("reader-0");
        tx.send(Event::Attached(device.clone())).unwrap();
        tx.send(Event::Permission {
            device,
            granted: true,
        })
        .unwrap();
        tx.send(Event::CardState {
            previous: CardState::Absent,
            current: CardState::Present,
        })
        .unwrap();
        tx.send(Event::CardState {
            previous: CardState::Present,
            current: CardState::Absent,
        })
        .unwrap();
        tx.send(Event::Shutdown).unwrap();

        run(&rx, &mut lifecycle);

        assert!(lifecycle.is_closed());
        let displays = &lifecycle.notifier().displays;
        assert_eq!(
            displays,
            &vec![
                DisplayValue::Identifier("04a1b2c3".to_string()),
                DisplayValue::Placeholder,
            ]
        );
    }

    #[test]
    fn test_run_returns_when_senders_drop() {
        let (tx, rx) = event_channel();
        let mut lifecycle =
            DeviceLifecycle::new(OkFactory, SilentGate, RecordingNotifier::default());
        drop(tx);

        // No sender left; the loop must return instead of hanging.
        run(&rx, &mut lifecycle);
        assert!(!lifecycle.is_closed());
    }

    #[test]
    fn test_run_stops_after_shutdown_event() {
        let (tx, rx) = event_channel();
        let gate = ScriptedGate {
            events: tx.clone(),
            granted: true,
        };
        let mut lifecycle = DeviceLifecycle::new(OkFactory, gate, RecordingNotifier::default());

        tx.send(Event::Shutdown).unwrap();
        // The sender stays alive; run must exit on the shutdown alone.
        run(&rx, &mut lifecycle);
        assert!(lifecycle.is_closed());
    }
}
