//! Watch a PC/SC reader and print the UID of every card presented
//!
//! Demonstrates the full pipeline: the monitor and permission gate
//! feed one event queue, the lifecycle machine owns the connection,
//! and UI updates cross to this thread as notification messages.

use std::thread;

use tapcard_core::notify::{Notification, notification_channel};
use tapcard_core::permission::AutoGrant;
use tapcard_core::{ChannelNotifier, DeviceLifecycle, event_channel, runner};
use tapcard_transport_pcsc::PcscDeviceManager;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let (events, queue) = event_channel();
    let (notifications, screen) = notification_channel();

    // The "presentation thread": drains notifications and prints them.
    thread::spawn(move || {
        for notification in screen.iter() {
            match notification {
                Notification::Log(line) => println!("{line}"),
                Notification::Display(value) => println!(">>> id: {}", value.as_text()),
            }
        }
    });

    let manager = PcscDeviceManager::new()?;
    let devices = manager.list_devices().unwrap_or_default();

    let monitor = manager.monitor()?;
    monitor.watch(events.clone());

    let gate = AutoGrant::new(events);
    let notifier = ChannelNotifier::new(notifications);
    let mut lifecycle = DeviceLifecycle::new(manager, gate, notifier);

    lifecycle.discover(&devices);

    // Runs until the process is interrupted.
    runner::run(&queue, &mut lifecycle);
    Ok(())
}
