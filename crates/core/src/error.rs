//! Core error type
//!
//! Failures in this crate are recoverable by design: everything is
//! caught at the state-machine boundary and turned into log events,
//! and the machines return to a watchable state. This type exists so
//! the layers below the boundary can still use `?`.

use crate::response::error::ResponseError;
use crate::transport::TransportError;

/// Umbrella error for card operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Transport-level failure (open, power, protocol, transmit)
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Response-level failure (short or malformed response)
    #[error(transparent)]
    Response(#[from] ResponseError),
}

/// Result type alias using [`Error`]
pub type Result<T> = core::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_wraps_both_layers() {
        fn fails_in_transport() -> Result<()> {
            Err(TransportError::Transmission)?
        }
        fn fails_in_parsing() -> Result<()> {
            Err(ResponseError::Incomplete(1))?
        }

        assert!(matches!(
            fails_in_transport(),
            Err(Error::Transport(TransportError::Transmission))
        ));
        assert!(matches!(
            fails_in_parsing(),
            Err(Error::Response(ResponseError::Incomplete(1)))
        ));
    }
}
