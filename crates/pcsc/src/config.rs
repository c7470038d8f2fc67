//! Configuration options for the PC/SC transport

use pcsc::{Protocols as PcscProtocols, ShareMode as PcscShareMode};
use tapcard_core::transport::Protocols;

/// Sharing mode for card connections
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShareMode {
    /// Exclusive access to the card
    Exclusive,
    /// Shared access to the card (default)
    Shared,
    /// Direct connection to the reader
    Direct,
}

impl From<ShareMode> for PcscShareMode {
    fn from(mode: ShareMode) -> Self {
        match mode {
            ShareMode::Exclusive => Self::Exclusive,
            ShareMode::Shared => Self::Shared,
            ShareMode::Direct => Self::Direct,
        }
    }
}

/// Map a core protocol mask onto the PC/SC protocol set
pub(crate) fn to_pcsc_protocols(protocols: Protocols) -> PcscProtocols {
    let mut mapped = PcscProtocols::empty();
    if protocols.contains(Protocols::T0) {
        mapped |= PcscProtocols::T0;
    }
    if protocols.contains(Protocols::T1) {
        mapped |= PcscProtocols::T1;
    }
    mapped
}

/// Configuration options for the PC/SC transport
#[derive(Debug, Clone)]
pub struct PcscConfig {
    /// Sharing mode for card connections
    pub share_mode: ShareMode,

    /// Protocols offered when connecting to a card
    pub protocols: Protocols,
}

impl Default for PcscConfig {
    fn default() -> Self {
        Self {
            share_mode: ShareMode::Shared,
            protocols: Protocols::T0 | Protocols::T1,
        }
    }
}

impl PcscConfig {
    /// Create a new default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the sharing mode
    pub const fn with_share_mode(mut self, mode: ShareMode) -> Self {
        self.share_mode = mode;
        self
    }

    /// Set the offered protocols
    pub const fn with_protocols(mut self, protocols: Protocols) -> Self {
        self.protocols = protocols;
        self
    }
}
