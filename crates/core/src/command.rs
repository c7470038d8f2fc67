//! APDU command definitions
//!
//! Only the small command surface needed to read a card identifier is
//! modeled: a four-byte header with an optional expected-length byte,
//! per ISO/IEC 7816-4 case 1 and case 2 short commands.

use std::fmt;

use bytes::{BufMut, Bytes, BytesMut};

/// An APDU command header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// Command class (CLA)
    cla: u8,
    /// Instruction code (INS)
    ins: u8,
    /// First parameter (P1)
    p1: u8,
    /// Second parameter (P2)
    p2: u8,
    /// Expected response length (Le), if any
    le: Option<u8>,
}

impl Command {
    /// Create a new header-only command
    pub const fn new(cla: u8, ins: u8, p1: u8, p2: u8) -> Self {
        Self {
            cla,
            ins,
            p1,
            p2,
            le: None,
        }
    }

    /// Create a new command with an expected response length
    pub const fn new_with_le(cla: u8, ins: u8, p1: u8, p2: u8, le: u8) -> Self {
        Self {
            cla,
            ins,
            p1,
            p2,
            le: Some(le),
        }
    }

    /// The GET DATA command retrieving the card UID (`FF CA 00 00 00`)
    ///
    /// Le of zero asks the reader for the full identifier.
    pub const fn get_uid() -> Self {
        Self::new_with_le(0xFF, 0xCA, 0x00, 0x00, 0x00)
    }

    /// Command class (CLA)
    pub const fn class(&self) -> u8 {
        self.cla
    }

    /// Instruction code (INS)
    pub const fn instruction(&self) -> u8 {
        self.ins
    }

    /// First parameter (P1)
    pub const fn p1(&self) -> u8 {
        self.p1
    }

    /// Second parameter (P2)
    pub const fn p2(&self) -> u8 {
        self.p2
    }

    /// Expected response length (Le), if any
    pub const fn expected_length(&self) -> Option<u8> {
        self.le
    }

    /// Serialized length of the command
    pub const fn command_length(&self) -> usize {
        // CLA, INS, P1, P2 plus optional Le
        if self.le.is_some() { 5 } else { 4 }
    }

    /// Convert to raw APDU bytes
    pub fn to_bytes(&self) -> Bytes {
        let mut buffer = BytesMut::with_capacity(self.command_length());

        buffer.put_u8(self.cla);
        buffer.put_u8(self.ins);
        buffer.put_u8(self.p1);
        buffer.put_u8(self.p2);

        if let Some(le) = self.le {
            buffer.put_u8(le);
        }

        buffer.freeze()
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode_upper(self.to_bytes()))
    }
}
