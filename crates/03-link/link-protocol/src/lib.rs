#![deny(unsafe_op_in_unsafe_fn)]
//! Serial link contract and the save-dump handshake.
//!
//! * [`Channel`] / [`SerialDriver`] – the byte-stream device the dump travels over.
//! * [`HandshakeSession`] – device side: wait for `'!'`, reply, go raw, stream, restore.
//! * [`NegotiationReply`] – the 4-byte `'='` message shared by both ends.
//! * [`request_dump`] – host side: ask for a dump and collect every payload byte.

mod channel;
mod error;
mod handshake;
mod host;
mod wire;

pub use channel::{Channel, ChannelAttrs, SerialDriver};
pub use error::{LinkError, LinkResult};
pub use handshake::{HandshakeSession, HandshakeState, Rejection};
pub use host::{receive_payload, request_dump, request_header, DumpImage};
pub use wire::{NegotiationReply, HELLO, REPLY_LEN, REPLY_TAG};
