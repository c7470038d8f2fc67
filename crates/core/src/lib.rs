//! Core traits and types for driving a single-slot smart-card reader
//!
//! This crate contains everything needed to take a card reader from
//! "plugged in" to "card UID on screen" without depending on any
//! particular OS facility:
//!
//! - APDU command and response types for the GET DATA (UID) exchange
//! - A [`CardTransport`] abstraction over the physical link
//! - The device lifecycle state machine (discovery, permission,
//!   connect, detach) and the card session state machine (card
//!   presented, UID read, result reported)
//! - A single ordered [`Event`] queue that serializes everything
//!
//! Backends (such as `tapcard-transport-pcsc`) provide the transport
//! and feed the event queue; the surrounding application provides a
//! [`Notifier`] to receive log lines and the final display value.
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![forbid(unsafe_code)]
#![warn(missing_docs, rustdoc::missing_crate_level_docs)]

// Re-export bytes for convenience
pub use bytes::{Bytes, BytesMut};

// Main modules
pub mod command;
pub mod event;
pub mod lifecycle;
pub mod notify;
pub mod permission;
pub mod response;
pub mod runner;
pub mod session;
pub mod transport;

// Core error types
mod error;
pub use error::{Error, Result};

// Re-exports for common types
pub use command::Command;
pub use event::{CardState, DeviceId, Event, EventReceiver, EventSender, event_channel};
pub use lifecycle::{DeviceLifecycle, LifecycleState};
pub use notify::{ChannelNotifier, DisplayValue, Notifier, TracingNotifier};
pub use permission::PermissionGate;
pub use response::Response;
pub use response::status::StatusWord;
pub use session::{CardSession, SessionResult, SessionState};
pub use transport::{CardTransport, PowerMode, Protocols, TransportFactory};

/// Prelude module containing commonly used traits and types
pub mod prelude {
    pub use crate::{
        Bytes, BytesMut, CardState, CardTransport, Command, DeviceId, DeviceLifecycle,
        DisplayValue, Error, Event, Notifier, PermissionGate, PowerMode, Protocols, Response,
        Result, StatusWord, TransportFactory,
        event::event_channel,
        response::status,
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    // Check the basic types are re-exported correctly
    #[test]
    fn test_reexports() {
        let cmd = Command::get_uid();
        assert_eq!(cmd.class(), 0xFF);
        assert_eq!(cmd.instruction(), 0xCA);

        let resp = Response::from_bytes(&[0x04, 0xA1, 0x90, 0x00]).unwrap();
        assert!(resp.is_success());
        assert_eq!(resp.status(), StatusWord::new(0x90, 0x00));
    }
}
