//! `gbsave`: move Game Boy cartridge saves over a serial line.
//!
//! `gbsave device` serves a dump from a cartridge image the way the dumper
//! would on the target machine; `gbsave host` asks for a dump and writes it to
//! a file.

mod serial;
mod tty;

use anyhow::{bail, Context, Result};
use cart_sim::SimCartridge;
use cart_window::WindowConfig;
use clap::{Parser, Subcommand};
use link_protocol::{receive_payload, request_header, Channel, LinkError};
use log::info;
use serial::{SerialChannel, DEFAULT_BAUD_RATE};
use sram_dump::{DumpConfig, DumpOrchestrator};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tty::TtyDriver;

/// Text printed by the subcommands.
mod render {
    use link_protocol::NegotiationReply;
    use sram_dump::DumpReport;
    use std::path::Path;

    pub fn connecting(node: &str, baud_rate: u32) -> String {
        format!("Connecting to {node} with baudrate {baud_rate}")
    }

    /// Announcement printed once the device replied.
    pub fn transfer_banner(reply: &NegotiationReply) -> String {
        format!(
            "Dumping {} banks of {} bytes, {} bytes in total...",
            reply.bank_count,
            reply.bank_size,
            reply.total_bytes()
        )
    }

    pub fn dumped(path: &Path) -> String {
        format!("{} successfully dumped", path.display())
    }

    pub fn invalid_header(byte: u8) -> String {
        format!("Invalid message header from the 8-bit computer: {byte:#x}")
    }

    /// One-line summary of a finished device-side dump.
    pub fn device_summary(report: &DumpReport) -> String {
        let title = String::from_utf8_lossy(&report.title);
        let title = title.trim_end_matches(['\0', ' ']);
        format!(
            "Sent {} bank(s), {} bytes of {} save RAM from \"{title}\"",
            report.banks_sent, report.bytes_sent, report.profile.kind
        )
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Dump cartridge save RAM over a serial link", long_about = None)]
struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve one dump from a cartridge image over a serial device node.
    Device {
        /// ROM image providing the cartridge header.
        #[arg(value_name = "ROM")]
        rom: PathBuf,
        /// Save image loaded into cartridge RAM (defaults to erased RAM).
        #[arg(short, long, value_name = "SAV")]
        save: Option<PathBuf>,
        /// Serial device node the host is attached to.
        #[arg(short = 'd', long, value_name = "NODE")]
        device: String,
        /// Physical address of the cartridge (decimal or hex, e.g. 0x3F0000).
        #[arg(long, value_parser = parse_u32, default_value = "0x3F0000")]
        physical_base: u32,
        /// Virtual page used as the mapping window (decimal or hex).
        #[arg(long, value_parser = parse_u16, default_value = "0x8000")]
        virtual_base: u16,
        /// Console text goes out on the serial line as well.
        #[arg(long)]
        console_shares_channel: bool,
    },
    /// Request a dump and store it in a file.
    Host {
        /// UART device node, e.g. /dev/ttyUSB0.
        #[arg(short = 'd', value_name = "NODE")]
        ttynode: String,
        /// Output save file name.
        #[arg(short = 'o', value_name = "FILE")]
        outfile: PathBuf,
        /// Baudrate to use with the serial node.
        #[arg(short = 'b', default_value_t = DEFAULT_BAUD_RATE)]
        baudrate: u32,
        /// Seconds to wait for each chunk from the device.
        #[arg(short = 't', long, default_value_t = 10)]
        timeout: u64,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Device {
            rom,
            save,
            device,
            physical_base,
            virtual_base,
            console_shares_channel,
        } => {
            let config = DumpConfig {
                channel_name: device,
                window: WindowConfig {
                    virtual_base,
                    physical_base,
                },
                console_shares_channel,
            };
            run_device(&rom, save.as_deref(), config)
        }
        Command::Host {
            ttynode,
            outfile,
            baudrate,
            timeout,
        } => {
            if cli.verbose {
                println!("{}", render::connecting(&ttynode, baudrate));
            }
            let mut channel =
                SerialChannel::open(&ttynode, baudrate, Duration::from_secs(timeout))
                    .with_context(|| format!("failed to open {ttynode}"))?;
            let result = receive_into(&mut channel, &outfile);
            channel.close()?;
            result
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default)).init();
}

fn run_device(rom: &Path, save: Option<&Path>, config: DumpConfig) -> Result<()> {
    let rom = fs::read(rom).with_context(|| format!("failed to read ROM {rom:?}"))?;
    let save = match save {
        Some(path) => fs::read(path).with_context(|| format!("failed to read save {path:?}"))?,
        None => Vec::new(),
    };
    let cart = SimCartridge::new(rom, save).with_physical_base(config.window.physical_base);
    info!("serving {} from a {:?} cartridge", config.channel_name, cart.mbc());

    let mut dumper = DumpOrchestrator::new(cart, io::stdout(), config);
    let report = dumper.run(&mut TtyDriver).context("save dump failed")?;
    println!("{}", render::device_summary(&report));
    Ok(())
}

fn receive_into<C: Channel>(channel: &mut C, outfile: &Path) -> Result<()> {
    let reply = match request_header(channel) {
        Err(LinkError::InvalidHeader(byte)) => bail!(render::invalid_header(byte)),
        other => other.context("no reply from the device")?,
    };
    println!("{}", render::transfer_banner(&reply));

    let payload = receive_payload(channel, &reply).context("transfer interrupted")?;
    fs::write(outfile, &payload).with_context(|| format!("failed to write {outfile:?}"))?;
    println!("{}", render::dumped(outfile));
    Ok(())
}

fn parse_u16(input: &str) -> Result<u16, String> {
    if let Some(stripped) = input.strip_prefix("0x") {
        u16::from_str_radix(stripped, 16).map_err(|_| format!("invalid hex value '{input}'"))
    } else {
        input
            .parse::<u16>()
            .map_err(|_| format!("invalid number '{input}'"))
    }
}

fn parse_u32(input: &str) -> Result<u32, String> {
    if let Some(stripped) = input.strip_prefix("0x") {
        u32::from_str_radix(stripped, 16).map_err(|_| format!("invalid hex value '{input}'"))
    } else {
        input
            .parse::<u32>()
            .map_err(|_| format!("invalid number '{input}'"))
    }
}
