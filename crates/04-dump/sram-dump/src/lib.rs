#![deny(unsafe_op_in_unsafe_fn)]
//! Cartridge save RAM dumper.
//!
//! [`DumpOrchestrator`] owns the mapping window and the console, opens the
//! serial channel through a [`link_protocol::SerialDriver`], and walks the
//! cartridge through header decode, RAM enable, handshake, bank streaming and
//! cleanup.

mod config;
mod console;
mod error;
mod orchestrator;

pub use config::DumpConfig;
pub use console::Console;
pub use error::{DumpError, DumpResult, DumpStage};
pub use orchestrator::{DumpOrchestrator, DumpReport};
