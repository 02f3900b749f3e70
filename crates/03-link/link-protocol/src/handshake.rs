//! Device side of the dump handshake.
//!
//! ```text
//! AwaitingHello --'!'--> Negotiated --enter_raw--> RawStreaming --restore--> Restoring
//! ```
//!
//! Any byte other than `'!'`, or a failed read, is reported and the session
//! keeps waiting. There is no retry limit: the host tool is started by hand.
//! Attributes captured when the session opened are put back on every exit
//! path, but only when this session was the one that switched raw mode on.

use crate::channel::{Channel, ChannelAttrs};
use crate::error::{LinkError, LinkResult};
use crate::wire::{NegotiationReply, HELLO};
use log::{debug, info, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HandshakeState {
    AwaitingHello,
    Negotiated,
    RawStreaming,
    Restoring,
    Closed,
}

/// Why a hello attempt was discarded.
#[derive(Debug)]
pub enum Rejection {
    /// The host sent something other than `'!'`.
    Byte(u8),
    /// The channel read failed.
    Read(LinkError),
}

pub struct HandshakeSession<C: Channel> {
    channel: C,
    state: HandshakeState,
    saved: Option<ChannelAttrs>,
    entered_raw: bool,
    raw_active: bool,
    rejected: u64,
}

impl<C: Channel> HandshakeSession<C> {
    pub fn new(channel: C) -> Self {
        Self {
            channel,
            state: HandshakeState::AwaitingHello,
            saved: None,
            entered_raw: false,
            raw_active: false,
            rejected: 0,
        }
    }

    /// Records the channel mode so it can be restored later.
    pub fn capture_attributes(&mut self) -> LinkResult<ChannelAttrs> {
        let attrs = self.channel.attributes()?;
        debug!("captured channel attributes {:#06x}", attrs.bits());
        self.saved = Some(attrs);
        self.raw_active = attrs.is_raw();
        Ok(attrs)
    }

    pub fn state(&self) -> HandshakeState {
        self.state
    }

    pub fn saved_attributes(&self) -> Option<ChannelAttrs> {
        self.saved
    }

    /// True while every byte written is payload.
    pub fn raw_active(&self) -> bool {
        self.raw_active
    }

    /// Number of hello attempts discarded so far.
    pub fn rejected(&self) -> u64 {
        self.rejected
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    pub fn channel_mut(&mut self) -> &mut C {
        &mut self.channel
    }

    /// Blocks until the host sends `'!'`, calling `on_reject` for every discarded attempt.
    pub fn await_hello<F>(&mut self, mut on_reject: F) -> LinkResult<()>
    where
        F: FnMut(&Rejection),
    {
        self.expect(HandshakeState::AwaitingHello)?;
        let mut failed_reads = 0u64;
        loop {
            let mut byte = [0u8; 1];
            let rejection = match self.channel.read_exact(&mut byte) {
                Ok(()) if byte[0] == HELLO => break,
                Ok(()) => Rejection::Byte(byte[0]),
                Err(err) => Rejection::Read(err),
            };
            self.rejected += 1;
            match &rejection {
                Rejection::Byte(b) => {
                    failed_reads = 0;
                    warn!("invalid hello byte {b:#04x}");
                }
                Rejection::Read(err) => {
                    failed_reads += 1;
                    if failed_reads == 1 {
                        warn!("hello read failed: {err}");
                    } else {
                        debug!("hello read failed again ({failed_reads} in a row): {err}");
                    }
                }
            }
            on_reject(&rejection);
        }
        info!("host hello received");
        self.state = HandshakeState::Negotiated;
        Ok(())
    }

    /// Sends the single, unacknowledged negotiation reply.
    pub fn send_reply(&mut self, reply: NegotiationReply) -> LinkResult<()> {
        self.expect(HandshakeState::Negotiated)?;
        self.channel.write_all(&reply.encode())?;
        debug!(
            "negotiated {} bank(s) of {} byte(s)",
            reply.bank_count, reply.bank_size
        );
        Ok(())
    }

    /// Switches the channel to raw mode unless it already is.
    pub fn enter_raw(&mut self) -> LinkResult<()> {
        self.expect(HandshakeState::Negotiated)?;
        let current = self.channel.attributes()?;
        if self.saved.is_none() {
            self.saved = Some(current);
        }
        if !current.is_raw() {
            self.channel.set_attributes(current.with_raw(true))?;
            self.entered_raw = true;
            debug!("channel switched to raw mode");
        }
        self.raw_active = true;
        self.state = HandshakeState::RawStreaming;
        Ok(())
    }

    /// Writes payload bytes; only legal in raw mode.
    pub fn stream(&mut self, bytes: &[u8]) -> LinkResult<()> {
        self.expect(HandshakeState::RawStreaming)?;
        self.channel.write_all(bytes)
    }

    /// Puts back the captured attributes if this session changed them. Idempotent.
    pub fn restore(&mut self) -> LinkResult<()> {
        if self.state == HandshakeState::RawStreaming {
            self.state = HandshakeState::Restoring;
        }
        if !self.entered_raw {
            return Ok(());
        }
        self.entered_raw = false;
        let saved = self.saved.unwrap_or_default();
        self.channel.set_attributes(saved)?;
        self.raw_active = saved.is_raw();
        debug!("channel attributes restored to {:#06x}", saved.bits());
        Ok(())
    }

    /// Restores attributes and closes the channel; the first failure wins.
    pub fn close(mut self) -> LinkResult<()> {
        let restored = self.restore();
        let closed = self.channel.close();
        self.state = HandshakeState::Closed;
        restored.and(closed)
    }

    fn expect(&self, expected: HandshakeState) -> LinkResult<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(LinkError::State {
                expected,
                actual: self.state,
            })
        }
    }
}
