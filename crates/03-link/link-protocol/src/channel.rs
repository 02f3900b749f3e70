use crate::error::{LinkError, LinkResult};

/// Device mode bits reported by a channel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ChannelAttrs {
    bits: u16,
}

impl ChannelAttrs {
    /// Output is transported verbatim (no newline translation).
    pub const RAW: u16 = 1 << 0;

    pub const fn from_bits(bits: u16) -> Self {
        Self { bits }
    }

    pub const fn bits(self) -> u16 {
        self.bits
    }

    pub const fn is_raw(self) -> bool {
        self.bits & Self::RAW != 0
    }

    /// Copy of `self` with only the raw bit changed.
    pub const fn with_raw(self, raw: bool) -> Self {
        let bits = if raw {
            self.bits | Self::RAW
        } else {
            self.bits & !Self::RAW
        };
        Self { bits }
    }
}

/// Duplex byte stream to the host.
pub trait Channel {
    /// Blocks until at least one byte is available.
    fn read(&mut self, buf: &mut [u8]) -> LinkResult<usize>;
    /// Returns the number of bytes the device accepted.
    fn write(&mut self, buf: &[u8]) -> LinkResult<usize>;
    fn attributes(&mut self) -> LinkResult<ChannelAttrs>;
    fn set_attributes(&mut self, attrs: ChannelAttrs) -> LinkResult<()>;
    fn close(&mut self) -> LinkResult<()>;

    fn read_exact(&mut self, mut buf: &mut [u8]) -> LinkResult<()> {
        while !buf.is_empty() {
            match self.read(buf)? {
                0 => return Err(LinkError::Closed),
                n => buf = &mut buf[n..],
            }
        }
        Ok(())
    }

    fn write_all(&mut self, buf: &[u8]) -> LinkResult<()> {
        let mut written = 0;
        while written < buf.len() {
            match self.write(&buf[written..])? {
                0 => {
                    return Err(LinkError::ShortWrite {
                        written,
                        expected: buf.len(),
                    })
                }
                n => written += n,
            }
        }
        Ok(())
    }
}

impl<C: Channel + ?Sized> Channel for &mut C {
    fn read(&mut self, buf: &mut [u8]) -> LinkResult<usize> {
        (**self).read(buf)
    }

    fn write(&mut self, buf: &[u8]) -> LinkResult<usize> {
        (**self).write(buf)
    }

    fn attributes(&mut self) -> LinkResult<ChannelAttrs> {
        (**self).attributes()
    }

    fn set_attributes(&mut self, attrs: ChannelAttrs) -> LinkResult<()> {
        (**self).set_attributes(attrs)
    }

    fn close(&mut self) -> LinkResult<()> {
        (**self).close()
    }
}

/// Opens channels by device name (`#SER0`, `/dev/ttyUSB0`, ...).
pub trait SerialDriver {
    type Channel: Channel;

    fn open(&mut self, name: &str) -> LinkResult<Self::Channel>;
}
