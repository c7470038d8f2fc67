//! Error types specific to card transports

/// Transport error type
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// Failed to open or use a connection to the device
    #[error("failed to connect to device")]
    Connection,

    /// Failed to transmit data
    #[error("failed to transmit data")]
    Transmission,

    /// Device error
    #[error("device error")]
    Device,

    /// Operation timed out
    #[error("operation timed out")]
    Timeout,

    /// Operation cancelled because the connection was closed
    #[error("operation cancelled")]
    Cancelled,

    /// Other error with message
    #[error("{0}")]
    Other(String),
}
