//! Error types for the PC/SC backend

use tapcard_core::transport::TransportError;

/// PC/SC-specific errors
#[derive(Debug, thiserror::Error)]
pub enum PcscError {
    /// Error from the PC/SC stack
    #[error("PC/SC error: {0}")]
    Pcsc(#[from] pcsc::Error),

    /// No readers available
    #[error("no readers available")]
    NoReadersAvailable,

    /// Reader not found
    #[error("reader not found: {0}")]
    ReaderNotFound(String),

    /// No card present in reader
    #[error("no card present in reader: {0}")]
    NoCard(String),

    /// The connection was closed
    #[error("connection is closed")]
    Closed,

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl From<PcscError> for TransportError {
    fn from(e: PcscError) -> Self {
        match e {
            PcscError::Pcsc(pcsc::Error::Timeout) => Self::Timeout,
            PcscError::Pcsc(pcsc::Error::Cancelled) => Self::Cancelled,
            PcscError::Pcsc(pcsc::Error::RemovedCard | pcsc::Error::ResetCard) => {
                Self::Transmission
            }
            PcscError::Pcsc(pcsc::Error::NoSmartcard) => Self::Device,
            PcscError::NoReadersAvailable
            | PcscError::ReaderNotFound(_)
            | PcscError::NoCard(_)
            | PcscError::Closed => Self::Connection,
            other => Self::Other(other.to_string()),
        }
    }
}
