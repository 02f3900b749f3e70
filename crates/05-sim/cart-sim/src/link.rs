//! Loopback serial link between a simulated device and host.
//!
//! Bytes travel over unbounded crossbeam channels, so a device run can
//! complete before the host starts reading. The device port behaves like a
//! text-mode terminal until raw mode is set: every `\n` it writes goes out as
//! `\r\n`.

use crossbeam_channel::{unbounded, Receiver, Sender};
use link_protocol::{Channel, ChannelAttrs, LinkError, LinkResult, SerialDriver};
use log::debug;
use parking_lot::Mutex;
use std::io;
use std::sync::Arc;

#[derive(Debug, Default)]
struct PortState {
    attrs: ChannelAttrs,
    set_calls: Vec<ChannelAttrs>,
    closed: bool,
    written: usize,
    write_budget: Option<usize>,
    set_budget: Option<usize>,
    read_failures: usize,
}

/// Read-only view of the device port, usable after the port has been moved.
#[derive(Clone, Debug)]
pub struct LinkProbe(Arc<Mutex<PortState>>);

impl LinkProbe {
    pub fn attributes(&self) -> ChannelAttrs {
        self.0.lock().attrs
    }

    /// Every value passed to `set_attributes`, in order.
    pub fn set_calls(&self) -> Vec<ChannelAttrs> {
        self.0.lock().set_calls.clone()
    }

    pub fn closed(&self) -> bool {
        self.0.lock().closed
    }

    /// Bytes accepted from the device, before newline translation.
    pub fn written(&self) -> usize {
        self.0.lock().written
    }
}

/// Device end of the link.
#[derive(Debug)]
pub struct SimPort {
    rx: Receiver<u8>,
    tx: Option<Sender<u8>>,
    state: Arc<Mutex<PortState>>,
}

/// Host end of the link.
#[derive(Debug)]
pub struct HostPort {
    rx: Receiver<u8>,
    tx: Option<Sender<u8>>,
    attrs: ChannelAttrs,
}

pub struct SimLink;

impl SimLink {
    /// Creates a connected device/host pair. The device starts in text mode.
    pub fn pair() -> (SimPort, HostPort) {
        let (to_host, from_device) = unbounded();
        let (to_device, from_host) = unbounded();
        let device = SimPort {
            rx: from_host,
            tx: Some(to_host),
            state: Arc::new(Mutex::new(PortState::default())),
        };
        let host = HostPort {
            rx: from_device,
            tx: Some(to_device),
            attrs: ChannelAttrs::default().with_raw(true),
        };
        (device, host)
    }
}

impl SimPort {
    pub fn probe(&self) -> LinkProbe {
        LinkProbe(Arc::clone(&self.state))
    }

    pub fn with_attributes(self, attrs: ChannelAttrs) -> Self {
        self.state.lock().attrs = attrs;
        self
    }

    /// Accept `budget` more bytes, then fail every write.
    pub fn fail_writes_after(self, budget: usize) -> Self {
        self.state.lock().write_budget = Some(budget);
        self
    }

    /// Apply `budget` more attribute changes, then fail every one.
    pub fn fail_set_attributes_after(self, budget: usize) -> Self {
        self.state.lock().set_budget = Some(budget);
        self
    }

    /// Fail the next `count` reads before delivering any host byte.
    pub fn fail_reads(self, count: usize) -> Self {
        self.state.lock().read_failures = count;
        self
    }
}

fn recv_into(rx: &Receiver<u8>, buf: &mut [u8]) -> LinkResult<usize> {
    if buf.is_empty() {
        return Ok(0);
    }
    buf[0] = rx.recv().map_err(|_| LinkError::Closed)?;
    let mut filled = 1;
    while filled < buf.len() {
        match rx.try_recv() {
            Ok(byte) => {
                buf[filled] = byte;
                filled += 1;
            }
            Err(_) => break,
        }
    }
    Ok(filled)
}

fn send_all(tx: &Option<Sender<u8>>, bytes: impl IntoIterator<Item = u8>) -> LinkResult<()> {
    let tx = tx.as_ref().ok_or(LinkError::Closed)?;
    for byte in bytes {
        tx.send(byte).map_err(|_| LinkError::Closed)?;
    }
    Ok(())
}

impl Channel for SimPort {
    fn read(&mut self, buf: &mut [u8]) -> LinkResult<usize> {
        {
            let mut state = self.state.lock();
            if state.read_failures > 0 {
                state.read_failures -= 1;
                return Err(LinkError::Io(io::Error::other("simulated read failure")));
            }
        }
        recv_into(&self.rx, buf)
    }

    fn write(&mut self, buf: &[u8]) -> LinkResult<usize> {
        let (accepted, raw) = {
            let mut state = self.state.lock();
            if state.closed {
                return Err(LinkError::Closed);
            }
            let accepted = match state.write_budget.as_mut() {
                Some(0) => {
                    return Err(LinkError::Io(io::Error::new(
                        io::ErrorKind::BrokenPipe,
                        "simulated write failure",
                    )))
                }
                Some(budget) => {
                    let n = buf.len().min(*budget);
                    *budget -= n;
                    n
                }
                None => buf.len(),
            };
            state.written += accepted;
            (accepted, state.attrs.is_raw())
        };
        let chunk = &buf[..accepted];
        if raw {
            send_all(&self.tx, chunk.iter().copied())?;
        } else {
            send_all(
                &self.tx,
                chunk.iter().flat_map(|&b| {
                    if b == b'\n' {
                        vec![b'\r', b'\n']
                    } else {
                        vec![b]
                    }
                }),
            )?;
        }
        Ok(accepted)
    }

    fn attributes(&mut self) -> LinkResult<ChannelAttrs> {
        Ok(self.state.lock().attrs)
    }

    fn set_attributes(&mut self, attrs: ChannelAttrs) -> LinkResult<()> {
        let mut state = self.state.lock();
        match state.set_budget.as_mut() {
            Some(0) => {
                return Err(LinkError::Io(io::Error::other(
                    "simulated tcsetattr failure",
                )))
            }
            Some(budget) => *budget -= 1,
            None => {}
        }
        state.attrs = attrs;
        state.set_calls.push(attrs);
        Ok(())
    }

    fn close(&mut self) -> LinkResult<()> {
        self.tx = None;
        self.state.lock().closed = true;
        debug!("sim device port closed");
        Ok(())
    }
}

impl Channel for HostPort {
    fn read(&mut self, buf: &mut [u8]) -> LinkResult<usize> {
        recv_into(&self.rx, buf)
    }

    fn write(&mut self, buf: &[u8]) -> LinkResult<usize> {
        send_all(&self.tx, buf.iter().copied())?;
        Ok(buf.len())
    }

    fn attributes(&mut self) -> LinkResult<ChannelAttrs> {
        Ok(self.attrs)
    }

    fn set_attributes(&mut self, attrs: ChannelAttrs) -> LinkResult<()> {
        self.attrs = attrs;
        Ok(())
    }

    fn close(&mut self) -> LinkResult<()> {
        self.tx = None;
        Ok(())
    }
}

impl HostPort {
    /// Drains whatever the device has sent so far without blocking.
    pub fn drain(&mut self) -> Vec<u8> {
        self.rx.try_iter().collect()
    }
}

/// Hands out a single pre-built device port under one name.
#[derive(Debug)]
pub struct SimDriver {
    name: String,
    port: Option<SimPort>,
}

impl SimDriver {
    pub fn new(name: impl Into<String>, port: SimPort) -> Self {
        Self {
            name: name.into(),
            port: Some(port),
        }
    }
}

impl SerialDriver for SimDriver {
    type Channel = SimPort;

    fn open(&mut self, name: &str) -> LinkResult<SimPort> {
        if name != self.name {
            return Err(LinkError::open(
                name,
                io::Error::new(io::ErrorKind::NotFound, "no such device"),
            ));
        }
        self.port
            .take()
            .ok_or_else(|| LinkError::open(name, io::Error::other("device busy")))
    }
}
