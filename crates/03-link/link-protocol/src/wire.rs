use crate::error::{LinkError, LinkResult};

/// Host byte that starts a dump.
pub const HELLO: u8 = b'!';
/// First byte of the device's negotiation reply.
pub const REPLY_TAG: u8 = b'=';
/// Length of the negotiation reply.
pub const REPLY_LEN: usize = 4;

/// `['=', bank_count, size_lo, size_hi]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NegotiationReply {
    pub bank_count: u8,
    pub bank_size: u16,
}

impl NegotiationReply {
    pub fn new(bank_count: u8, bank_size: u16) -> Self {
        Self {
            bank_count,
            bank_size,
        }
    }

    pub fn encode(&self) -> [u8; REPLY_LEN] {
        let [lo, hi] = self.bank_size.to_le_bytes();
        [REPLY_TAG, self.bank_count, lo, hi]
    }

    pub fn decode(bytes: [u8; REPLY_LEN]) -> LinkResult<Self> {
        let [tag, bank_count, lo, hi] = bytes;
        if tag != REPLY_TAG {
            return Err(LinkError::InvalidHeader(tag));
        }
        Ok(Self {
            bank_count,
            bank_size: u16::from_le_bytes([lo, hi]),
        })
    }

    /// Payload length announced by this reply.
    pub fn total_bytes(&self) -> usize {
        usize::from(self.bank_count) * usize::from(self.bank_size)
    }
}
