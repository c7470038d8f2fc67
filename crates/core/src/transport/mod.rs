//! Transport traits for talking to a card reader
//!
//! A transport wraps one open connection to a physical reader and
//! exposes the raw slot primitives: power control, protocol
//! selection and APDU transmission. Opening a connection goes
//! through a [`TransportFactory`], which is the seam where "device
//! already claimed", "device vanished" and "not authorized" surface.

pub mod error;

use std::fmt;
use std::ops::BitOr;

use bytes::Bytes;
pub use error::TransportError;
use tracing::{debug, trace};

use crate::event::DeviceId;

/// Card slot power modes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerMode {
    /// Power the slot up
    PowerOn,
    /// Power the slot down
    PowerOff,
    /// Power-cycle the slot without removing power (warm reset)
    WarmReset,
}

/// Protocol selection bitmask (T=0 / T=1)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Protocols(u8);

impl Protocols {
    /// Character-oriented protocol T=0
    pub const T0: Self = Self(0b01);
    /// Block-oriented protocol T=1
    pub const T1: Self = Self(0b10);

    /// Check whether this mask includes the given protocol
    pub const fn contains(&self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for Protocols {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Trait for an open connection to a card reader
///
/// All operations except [`close`](Self::close) fail with
/// [`TransportError::Connection`] once the connection has been
/// closed; `close` itself is idempotent and infallible.
pub trait CardTransport: Send + fmt::Debug {
    /// Set the power state of a card slot
    fn set_power(&mut self, slot: u8, mode: PowerMode) -> Result<(), TransportError>;

    /// Select the protocols the slot may use
    fn set_protocol(&mut self, slot: u8, protocols: Protocols) -> Result<(), TransportError>;

    /// Send raw APDU bytes to the card and return the response bytes
    ///
    /// Blocks until the reader answers or an I/O or timeout error
    /// occurs. The returned buffer is exactly as long as the
    /// response; callers never see unused capacity.
    fn transmit(&mut self, slot: u8, command: &[u8]) -> Result<Bytes, TransportError> {
        trace!(slot, command = %hex::encode(command), "transmitting command");
        let result = self.do_transmit(slot, command);
        match &result {
            Ok(response) => {
                trace!(response = %hex::encode(response), "received response");
            }
            Err(e) => {
                debug!(error = ?e, "transport error during transmission");
            }
        }
        result
    }

    /// Internal implementation of transmit
    ///
    /// This is the method that concrete implementations override.
    fn do_transmit(&mut self, slot: u8, command: &[u8]) -> Result<Bytes, TransportError>;

    /// Check if the connection is still open
    fn is_connected(&self) -> bool;

    /// Release the connection
    ///
    /// Safe to call repeatedly or on a connection that already lost
    /// its device; later calls are no-ops.
    fn close(&mut self);
}

/// Trait for opening connections to discovered devices
pub trait TransportFactory {
    /// The transport type produced by this factory
    type Transport: CardTransport;

    /// Open a connection to the given device
    fn open(&self, device: &DeviceId) -> Result<Self::Transport, TransportError>;
}

#[cfg(test)]
pub(crate) mod mock {
    use super::*;

    /// Mock transport with scripted responses
    #[derive(Debug, Clone, Default)]
    pub(crate) struct MockTransport {
        /// Responses to hand out, in order; the last one repeats
        pub responses: Vec<Bytes>,
        /// Commands that were transmitted
        pub commands: Vec<Bytes>,
        /// Power commands that were issued
        pub power_modes: Vec<(u8, PowerMode)>,
        /// Protocol selections that were issued
        pub protocols: Vec<(u8, Protocols)>,
        /// Whether the connection is open
        pub connected: bool,
        /// Number of times close() was called while open
        pub closes: usize,
        /// Force transmit to fail
        pub fail_transmit: bool,
    }

    impl MockTransport {
        pub fn with_response(response: &'static [u8]) -> Self {
            Self {
                responses: vec![Bytes::from_static(response)],
                connected: true,
                ..Self::default()
            }
        }

        pub fn failing() -> Self {
            Self {
                connected: true,
                fail_transmit: true,
                ..Self::default()
            }
        }
    }

    impl CardTransport for MockTransport {
        fn set_power(&mut self, slot: u8, mode: PowerMode) -> Result<(), TransportError> {
            if !self.connected {
                return Err(TransportError::Connection);
            }
            self.power_modes.push((slot, mode));
            Ok(())
        }

        fn set_protocol(&mut self, slot: u8, protocols: Protocols) -> Result<(), TransportError> {
            if !self.connected {
                return Err(TransportError::Connection);
            }
            self.protocols.push((slot, protocols));
            Ok(())
        }

        fn do_transmit(&mut self, _slot: u8, command: &[u8]) -> Result<Bytes, TransportError> {
            if !self.connected {
                return Err(TransportError::Connection);
            }
            self.commands.push(Bytes::copy_from_slice(command));
            if self.fail_transmit {
                return Err(TransportError::Transmission);
            }
            match self.responses.len() {
                0 => Err(TransportError::Transmission),
                1 => Ok(self.responses[0].clone()),
                _ => Ok(self.responses.remove(0)),
            }
        }

        fn is_connected(&self) -> bool {
            self.connected
        }

        fn close(&mut self) {
            if self.connected {
                self.connected = false;
                self.closes += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mock::MockTransport;
    use super::*;

    #[test]
    fn test_protocol_mask() {
        let both = Protocols::T0 | Protocols::T1;
        assert!(both.contains(Protocols::T0));
        assert!(both.contains(Protocols::T1));
        assert!(!Protocols::T0.contains(Protocols::T1));
    }

    #[test]
    fn test_mock_close_is_idempotent() {
        let mut transport = MockTransport::with_response(&[0x90, 0x00]);
        assert!(transport.is_connected());
        transport.close();
        transport.close();
        assert_eq!(transport.closes, 1);
        assert!(!transport.is_connected());
    }

    #[test]
    fn test_mock_fails_fast_after_close() {
        let mut transport = MockTransport::with_response(&[0x90, 0x00]);
        transport.close();
        assert_eq!(
            transport.transmit(0, &[0xFF, 0xCA, 0x00, 0x00, 0x00]),
            Err(TransportError::Connection)
        );
        assert_eq!(
            transport.set_power(0, PowerMode::WarmReset),
            Err(TransportError::Connection)
        );
    }
}
