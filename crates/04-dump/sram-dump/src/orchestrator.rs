//! Dump sequencing.
//!
//! ```text
//! open -> header -> profile -> hello/reply -> RAM on -> raw -> banks -> restore -> RAM off -> close
//! ```
//!
//! The window is used by one step at a time; nothing read before a remap is
//! trusted after it. Cleanup runs on every path that got past `open`:
//! attributes are restored if the handshake switched them, the RAM gate is
//! closed if it was opened (and the window is still usable), and the channel
//! is closed last.

use crate::config::DumpConfig;
use crate::console::Console;
use crate::error::{DumpError, DumpResult, DumpStage};
use cart_profile::{
    disable_ram, enable_ram, CartridgeHeader, CartridgeProfile, ProfileError, TITLE_LEN,
};
use cart_window::{AddressWindow, BankSwitch, MapPrimitive, WINDOW_SIZE};
use link_protocol::{Channel, HandshakeSession, NegotiationReply, Rejection, SerialDriver};
use log::{error, info};
use std::io::Write;

/// Outcome of a completed dump.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DumpReport {
    /// Raw title bytes as found in the header.
    pub title: [u8; TITLE_LEN],
    pub profile: CartridgeProfile,
    pub banks_sent: u8,
    pub bytes_sent: usize,
}

pub struct DumpOrchestrator<M: MapPrimitive, O: Write> {
    window: AddressWindow<M>,
    console: Console<O>,
    config: DumpConfig,
    ram_enabled: bool,
}

impl<M: MapPrimitive, O: Write> DumpOrchestrator<M, O> {
    pub fn new(primitive: M, console: O, config: DumpConfig) -> Self {
        Self {
            window: AddressWindow::new(primitive, config.window),
            console: Console::new(console, config.console_shares_channel),
            config,
            ram_enabled: false,
        }
    }

    pub fn config(&self) -> &DumpConfig {
        &self.config
    }

    pub fn window(&self) -> &AddressWindow<M> {
        &self.window
    }

    pub fn console(&self) -> &Console<O> {
        &self.console
    }

    /// Returns the mapping primitive and console sink.
    pub fn into_parts(self) -> (M, O) {
        (self.window.into_inner(), self.console.into_inner())
    }

    /// Runs one complete dump over a channel opened from `driver`.
    pub fn run<D: SerialDriver>(&mut self, driver: &mut D) -> DumpResult<DumpReport> {
        let channel = match driver.open(&self.config.channel_name) {
            Ok(channel) => channel,
            Err(err) => {
                self.console
                    .line(false, "Error opening serial driver, exiting...");
                return Err(DumpError::link(DumpStage::Open, err));
            }
        };
        info!("opened {}", self.config.channel_name);

        let mut session = HandshakeSession::new(channel);
        let outcome = self.transfer(&mut session);
        let (cleanup, raw_active) = self.cleanup(session, outcome.as_ref().err());

        if let Err(err) = &outcome {
            self.report_failure(err, raw_active);
        }
        if let Err(err) = &cleanup {
            self.report_failure(err, raw_active);
        }
        let report = outcome?;
        cleanup?;
        info!(
            "dumped {} bank(s), {} byte(s)",
            report.banks_sent, report.bytes_sent
        );
        Ok(report)
    }

    fn transfer<C: Channel>(
        &mut self,
        session: &mut HandshakeSession<C>,
    ) -> DumpResult<DumpReport> {
        let header = CartridgeHeader::read(&mut self.window)
            .map_err(|err| DumpError::window(DumpStage::Header, err))?;
        let raw = session.raw_active();
        self.console.emit(raw, &header.title);
        self.console
            .line(raw, &format!("\nCartridge type: 0x{:x}", header.type_byte));

        let profile = match CartridgeProfile::from_header(&header) {
            Ok(profile) => profile,
            Err(ProfileError::Unsupported { type_byte }) => {
                self.console.line(raw, "Unsupported cart type, exiting...");
                return Err(DumpError::UnsupportedCartridge { type_byte });
            }
            Err(ProfileError::Window(err)) => {
                return Err(DumpError::window(DumpStage::Header, err))
            }
        };
        self.console.line(raw, &profile.ram_size_line());
        info!(
            "{} \"{}\": {} bank(s) of {} byte(s)",
            profile.kind,
            header.title_lossy(),
            profile.bank_count,
            profile.bank_size
        );

        session
            .capture_attributes()
            .map_err(|err| DumpError::link(DumpStage::Handshake, err))?;
        let raw = session.raw_active();
        let console = &mut self.console;
        let mut last_read_error = None;
        session
            .await_hello(|rejection| {
                let text = match rejection {
                    Rejection::Byte(byte) => {
                        last_read_error = None;
                        format!("Invalid message 0x{byte:02x}, waiting for '!'")
                    }
                    Rejection::Read(err) => {
                        // A failing line repeats the same error on every attempt.
                        let err = err.to_string();
                        if last_read_error.as_ref() == Some(&err) {
                            return;
                        }
                        last_read_error = Some(err);
                        "Invalid message (read error), waiting for '!'".to_string()
                    }
                };
                console.line(raw, &text);
            })
            .map_err(|err| DumpError::link(DumpStage::Handshake, err))?;
        session
            .send_reply(NegotiationReply::new(profile.bank_count, profile.bank_size))
            .map_err(|err| DumpError::link(DumpStage::Handshake, err))?;

        enable_ram(&mut self.window, &profile)
            .map_err(|err| DumpError::window(DumpStage::EnableRam, err))?;
        self.ram_enabled = true;

        session
            .enter_raw()
            .map_err(|err| DumpError::link(DumpStage::Handshake, err))?;

        let bank_size = usize::from(profile.bank_size).min(WINDOW_SIZE);
        let mut buf = vec![0u8; bank_size];
        let mut bytes_sent = 0;
        for bank in 0..profile.bank_count {
            let stage = DumpStage::Streaming { bank };
            self.window
                .select_bank(bank)
                .map_err(|err| DumpError::window(stage, err))?;
            self.window
                .read_into(0, &mut buf)
                .map_err(|err| DumpError::window(stage, err))?;
            session
                .stream(&buf)
                .map_err(|err| DumpError::link(stage, err))?;
            bytes_sent += buf.len();
        }

        Ok(DumpReport {
            title: header.title,
            profile,
            banks_sent: profile.bank_count,
            bytes_sent,
        })
    }

    /// Undoes whatever the transfer set up. Also reports whether the channel
    /// is still raw afterwards.
    fn cleanup<C: Channel>(
        &mut self,
        mut session: HandshakeSession<C>,
        failure: Option<&DumpError>,
    ) -> (DumpResult<()>, bool) {
        let restored = session
            .restore()
            .map_err(|err| DumpError::link(DumpStage::Restore, err));
        let raw_active = session.raw_active();

        // A failed map leaves the window unusable; the RAM gate stays as it is.
        let map_failed = failure.is_some_and(DumpError::is_map_failure);
        let disabled = if self.ram_enabled && !map_failed {
            self.ram_enabled = false;
            disable_ram(&mut self.window)
                .map_err(|err| DumpError::window(DumpStage::DisableRam, err))
        } else {
            Ok(())
        };

        let closed = session
            .close()
            .map_err(|err| DumpError::link(DumpStage::Close, err));
        (restored.and(disabled).and(closed), raw_active)
    }

    fn report_failure(&mut self, err: &DumpError, raw_active: bool) {
        error!("dump aborted: {err}");
        match err {
            DumpError::UnsupportedCartridge { .. } => {}
            _ if err.is_map_failure() => self.console.line(raw_active, "Error cartridge map"),
            _ => self.console.line(raw_active, &format!("Error: {err}")),
        }
    }
}
