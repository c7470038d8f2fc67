//! Notifier boundary towards the owning application
//!
//! The core never touches a UI. It emits append-only log lines and a
//! current display value through a [`Notifier`]; how those reach the
//! screen is the application's business. [`ChannelNotifier`] turns
//! every notification into a message send so the presentation layer
//! can drain them on its own thread.

use crossbeam_channel::{Receiver, Sender, unbounded};
use tracing::info;

/// Value to show in the identifier field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayValue {
    /// A successfully read identifier, lowercase hex (possibly empty)
    Identifier(String),
    /// No card was detected
    NoCard,
    /// Waiting for a card
    Placeholder,
}

impl DisplayValue {
    /// The user-facing text for this value
    pub fn as_text(&self) -> &str {
        match self {
            Self::Identifier(id) => id,
            Self::NoCard => "No card detected",
            Self::Placeholder => "...",
        }
    }
}

/// Receiver of log lines and display updates
pub trait Notifier {
    /// Append a human-readable log line
    fn log(&mut self, line: &str);

    /// Replace the identifier display value
    fn display(&mut self, value: DisplayValue);
}

/// A notification as sent across a thread boundary
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// A log line to append
    Log(String),
    /// A new display value
    Display(DisplayValue),
}

/// Sender half of a notification channel
pub type NotificationSender = Sender<Notification>;
/// Receiver half of a notification channel
pub type NotificationReceiver = Receiver<Notification>;

/// Create an unbounded notification channel
pub fn notification_channel() -> (NotificationSender, NotificationReceiver) {
    unbounded()
}

/// Notifier that forwards everything over a channel
///
/// Sends never block; if the receiving side is gone the notification
/// is dropped, which is the right behavior during teardown.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    sender: NotificationSender,
}

impl ChannelNotifier {
    /// Create a notifier feeding the given sender
    pub const fn new(sender: NotificationSender) -> Self {
        Self { sender }
    }
}

impl Notifier for ChannelNotifier {
    fn log(&mut self, line: &str) {
        let _ = self.sender.send(Notification::Log(line.to_string()));
    }

    fn display(&mut self, value: DisplayValue) {
        let _ = self.sender.send(Notification::Display(value));
    }
}

/// Notifier that routes everything into `tracing`, for headless use
#[derive(Debug, Clone, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn log(&mut self, line: &str) {
        info!("{line}");
    }

    fn display(&mut self, value: DisplayValue) {
        info!(value = %value.as_text(), "display updated");
    }
}

#[cfg(test)]
pub(crate) mod recording {
    use super::*;

    /// Notifier that records everything it receives, for assertions
    #[derive(Debug, Clone, Default)]
    pub(crate) struct RecordingNotifier {
        pub lines: Vec<String>,
        pub displays: Vec<DisplayValue>,
    }

    impl RecordingNotifier {
        pub fn last_display(&self) -> Option<&DisplayValue> {
            self.displays.last()
        }
    }

    impl Notifier for RecordingNotifier {
        fn log(&mut self, line: &str) {
            self.lines.push(line.to_string());
        }

        fn display(&mut self, value: DisplayValue) {
            self.displays.push(value.clone());
        }
    }
}
