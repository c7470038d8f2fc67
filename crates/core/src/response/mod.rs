//! APDU response definitions
//!
//! A response is any byte sequence ending in a two-byte status
//! trailer (SW1, SW2); whatever precedes the trailer is the payload.
//! A response of exactly two bytes is a valid response with an empty
//! payload. Anything shorter is rejected as incomplete.

pub mod error;
pub mod status;

use bytes::{BufMut, Bytes, BytesMut};
use tracing::trace;

use error::{ResponseError, StatusError};
use status::StatusWord;

/// A parsed APDU response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Response payload data, possibly empty
    payload: Bytes,
    /// Status word
    status: StatusWord,
}

impl Response {
    /// Create a new response with payload and status
    pub fn new(payload: impl Into<Bytes>, status: impl Into<StatusWord>) -> Self {
        Self {
            payload: payload.into(),
            status: status.into(),
        }
    }

    /// Parse a response from raw bytes (payload followed by SW1, SW2)
    ///
    /// The only gate is `data.len() >= 2`: a bare status trailer
    /// parses as a success with an empty payload.
    pub fn from_bytes(data: &[u8]) -> Result<Self, ResponseError> {
        if data.len() < 2 {
            return Err(ResponseError::Incomplete(data.len()));
        }

        let (payload, trailer) = data.split_at(data.len() - 2);
        let status = StatusWord::new(trailer[0], trailer[1]);

        trace!(
            status = %status,
            payload_len = payload.len(),
            "parsed APDU response"
        );

        Ok(Self {
            payload: Bytes::copy_from_slice(payload),
            status,
        })
    }

    /// Get the response payload data
    pub const fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// Get the status word
    pub const fn status(&self) -> StatusWord {
        self.status
    }

    /// Check if the response indicates success
    pub const fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// The payload hex-encoded as a lowercase identifier string
    ///
    /// An empty payload yields the empty string.
    pub fn identifier(&self) -> String {
        hex::encode(&self.payload)
    }

    /// Convert to a payload result, treating a non-success status as an error
    pub fn into_payload_result(self) -> Result<Bytes, StatusError> {
        if self.is_success() {
            Ok(self.payload)
        } else {
            Err(StatusError::new(self.status.sw1, self.status.sw2))
        }
    }
}

impl TryFrom<&[u8]> for Response {
    type Error = ResponseError;

    fn try_from(data: &[u8]) -> Result<Self, ResponseError> {
        Self::from_bytes(data)
    }
}

impl From<Response> for Bytes {
    fn from(response: Response) -> Self {
        let mut buf = BytesMut::with_capacity(response.payload.len() + 2);
        buf.put_slice(&response.payload);
        buf.put_u8(response.status.sw1);
        buf.put_u8(response.status.sw2);
        buf.freeze()
    }
}
