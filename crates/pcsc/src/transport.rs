//! PC/SC transport implementation

use std::ffi::CString;
use std::fmt;

use bytes::Bytes;
use pcsc::{Card, Context, Disposition};
use tapcard_core::transport::{CardTransport, PowerMode, Protocols, TransportError};
use tracing::debug;

use crate::config::{PcscConfig, to_pcsc_protocols};
use crate::error::PcscError;

/// One open connection to a PC/SC reader
///
/// PC/SC addresses a single slot per reader name, so the slot index
/// carried by the core transport contract is accepted and ignored.
pub struct PcscTransport {
    /// PC/SC context
    context: Context,
    /// Card connection, if established
    card: Option<Card>,
    /// Reader name
    reader_name: String,
    /// Configuration
    config: PcscConfig,
    /// Set once close() ran; all further operations fail fast
    closed: bool,
}

impl fmt::Debug for PcscTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PcscTransport")
            .field("reader_name", &self.reader_name)
            .field("has_card", &self.card.is_some())
            .field("config", &self.config)
            .field("closed", &self.closed)
            .finish()
    }
}

impl PcscTransport {
    /// Create a new transport for the specified reader
    pub(crate) fn new(
        context: Context,
        reader_name: &str,
        config: PcscConfig,
    ) -> Result<Self, PcscError> {
        let mut transport = Self {
            context,
            card: None,
            reader_name: reader_name.to_string(),
            config,
            closed: false,
        };

        // A card may not be in the slot yet; that is not an open error.
        match transport.connect_card() {
            Ok(()) | Err(PcscError::NoCard(_)) => Ok(transport),
            Err(e) => Err(e),
        }
    }

    /// Get the reader name
    pub fn reader_name(&self) -> &str {
        &self.reader_name
    }

    /// Check if the transport currently holds a card connection
    pub const fn has_card(&self) -> bool {
        self.card.is_some()
    }

    fn guard_open(&self) -> Result<(), PcscError> {
        if self.closed {
            Err(PcscError::Closed)
        } else {
            Ok(())
        }
    }

    /// Try to connect to the card in the slot
    fn connect_card(&mut self) -> Result<(), PcscError> {
        self.guard_open()?;
        if self.card.is_some() {
            return Ok(());
        }

        let reader_cstr = CString::new(self.reader_name.clone())
            .map_err(|_| PcscError::ReaderNotFound(self.reader_name.clone()))?;

        match self.context.connect(
            &reader_cstr,
            self.config.share_mode.into(),
            to_pcsc_protocols(self.config.protocols),
        ) {
            Ok(card) => {
                self.card = Some(card);
                Ok(())
            }
            Err(pcsc::Error::NoSmartcard) => Err(PcscError::NoCard(self.reader_name.clone())),
            Err(pcsc::Error::UnknownReader) => {
                Err(PcscError::ReaderNotFound(self.reader_name.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Reconnect the card with the given disposition
    fn reconnect_card(&mut self, disposition: Disposition) -> Result<(), PcscError> {
        self.guard_open()?;
        let share_mode = self.config.share_mode.into();
        let protocols = to_pcsc_protocols(self.config.protocols);

        let Some(mut card) = self.card.take() else {
            return self.connect_card();
        };
        match card.reconnect(share_mode, protocols, disposition) {
            Ok(()) => {
                self.card = Some(card);
                Ok(())
            }
            // A failed reconnect leaves no usable handle.
            Err(e) => Err(e.into()),
        }
    }

    fn transmit_command(&mut self, command: &[u8]) -> Result<Bytes, PcscError> {
        self.connect_card()?;

        let card = self
            .card
            .as_mut()
            .ok_or_else(|| PcscError::NoCard(self.reader_name.clone()))?;

        let mut response_buffer = [0u8; 258];
        match card.transmit(command, &mut response_buffer) {
            Ok(response) => Ok(Bytes::copy_from_slice(response)),
            Err(e) => {
                // A reset or removed card invalidates our handle.
                if matches!(e, pcsc::Error::ResetCard | pcsc::Error::RemovedCard) {
                    self.card = None;
                }
                Err(e.into())
            }
        }
    }
}

impl CardTransport for PcscTransport {
    fn set_power(&mut self, slot: u8, mode: PowerMode) -> Result<(), TransportError> {
        debug!(slot, ?mode, reader = %self.reader_name, "setting slot power");
        let result = match mode {
            PowerMode::PowerOn => self.connect_card(),
            PowerMode::WarmReset => self.reconnect_card(Disposition::ResetCard),
            PowerMode::PowerOff => {
                self.guard_open()?;
                if let Some(card) = self.card.take() {
                    let _ = card.disconnect(Disposition::UnpowerCard);
                }
                Ok(())
            }
        };
        result.map_err(Into::into)
    }

    fn set_protocol(&mut self, slot: u8, protocols: Protocols) -> Result<(), TransportError> {
        debug!(slot, ?protocols, reader = %self.reader_name, "selecting protocols");
        self.guard_open().map_err(TransportError::from)?;
        self.config.protocols = protocols;
        // Narrow an existing connection to the requested set; the next
        // connect picks it up otherwise.
        if self.card.is_some() {
            self.reconnect_card(Disposition::LeaveCard)
                .map_err(TransportError::from)?;
        }
        Ok(())
    }

    fn do_transmit(&mut self, _slot: u8, command: &[u8]) -> Result<Bytes, TransportError> {
        self.transmit_command(command).map_err(TransportError::from)
    }

    fn is_connected(&self) -> bool {
        !self.closed && self.card.is_some()
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Some(card) = self.card.take() {
            let _ = card.disconnect(Disposition::LeaveCard);
        }
        debug!(reader = %self.reader_name, "transport closed");
    }
}

impl Drop for PcscTransport {
    fn drop(&mut self) {
        self.close();
    }
}
