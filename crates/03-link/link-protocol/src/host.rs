//! Host side of the dump: send `'!'`, read the reply, read exactly the announced bytes.

use crate::channel::Channel;
use crate::error::LinkResult;
use crate::wire::{NegotiationReply, HELLO, REPLY_LEN};
use log::{debug, info};

/// Everything the device sent after the hello.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DumpImage {
    pub reply: NegotiationReply,
    /// Banks back to back, `reply.total_bytes()` long.
    pub payload: Vec<u8>,
}

impl DumpImage {
    /// Payload of bank `index`, if it was announced.
    pub fn bank(&self, index: usize) -> Option<&[u8]> {
        let size = usize::from(self.reply.bank_size);
        if index >= usize::from(self.reply.bank_count) {
            return None;
        }
        self.payload.get(index * size..(index + 1) * size)
    }
}

/// Sends the hello and decodes the device's reply.
pub fn request_header<C: Channel>(channel: &mut C) -> LinkResult<NegotiationReply> {
    channel.write_all(&[HELLO])?;
    let mut raw = [0u8; REPLY_LEN];
    channel.read_exact(&mut raw)?;
    let reply = NegotiationReply::decode(raw)?;
    info!(
        "dumping {} bank(s) of {} byte(s), {} byte(s) in total",
        reply.bank_count,
        reply.bank_size,
        reply.total_bytes()
    );
    Ok(reply)
}

/// Reads the raw payload announced by `reply`.
pub fn receive_payload<C: Channel>(
    channel: &mut C,
    reply: &NegotiationReply,
) -> LinkResult<Vec<u8>> {
    let mut payload = vec![0u8; reply.total_bytes()];
    channel.read_exact(&mut payload)?;
    debug!("received {} payload byte(s)", payload.len());
    Ok(payload)
}

/// Runs the whole host exchange.
pub fn request_dump<C: Channel>(channel: &mut C) -> LinkResult<DumpImage> {
    let reply = request_header(channel)?;
    let payload = receive_payload(channel, &reply)?;
    Ok(DumpImage { reply, payload })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bank_slices_payload() {
        let image = DumpImage {
            reply: NegotiationReply::new(2, 4),
            payload: vec![0, 0, 0, 0, 1, 1, 1, 1],
        };
        assert_eq!(image.bank(0), Some(&[0u8, 0, 0, 0][..]));
        assert_eq!(image.bank(1), Some(&[1u8, 1, 1, 1][..]));
        assert_eq!(image.bank(2), None);
    }
}
