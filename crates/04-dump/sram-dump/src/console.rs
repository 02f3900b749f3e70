use log::{trace, warn};
use std::io::Write;

/// Human-facing text output.
///
/// Print failures are logged and otherwise ignored; they never abort a dump.
#[derive(Debug)]
pub struct Console<O> {
    out: O,
    shares_channel: bool,
    suppressed: usize,
}

impl<O: Write> Console<O> {
    pub fn new(out: O, shares_channel: bool) -> Self {
        Self {
            out,
            shares_channel,
            suppressed: 0,
        }
    }

    /// Writes `bytes` unless that would land in a raw transfer.
    pub fn emit(&mut self, raw_active: bool, bytes: &[u8]) {
        if self.shares_channel && raw_active {
            self.suppressed += 1;
            trace!("console output held back while channel is raw");
            return;
        }
        if let Err(err) = self.out.write_all(bytes).and_then(|()| self.out.flush()) {
            warn!("console write failed: {err}");
        }
    }

    pub fn line(&mut self, raw_active: bool, text: &str) {
        let mut buf = Vec::with_capacity(text.len() + 1);
        buf.extend_from_slice(text.as_bytes());
        buf.push(b'\n');
        self.emit(raw_active, &buf);
    }

    /// Messages dropped because the channel was raw.
    pub fn suppressed(&self) -> usize {
        self.suppressed
    }

    pub fn get_ref(&self) -> &O {
        &self.out
    }

    pub fn into_inner(self) -> O {
        self.out
    }
}
