#![deny(unsafe_op_in_unsafe_fn)]
//! Single-slot cartridge mapping window.
//!
//! The host CPU sees the cartridge through one 16 KiB virtual page. This
//! crate exposes the pieces built on top of that page:
//! * [`MapPrimitive`] – the platform hook that repoints the page and performs byte access.
//! * [`AddressWindow`] – alignment-checked owner of the page with a tracked current offset.
//! * [`BankSwitch`] – the map/latch/remap sequence that exposes a cartridge RAM bank.
//! * [`WindowError`] – error surface for alignment, mapping, and bounds failures.

mod bank;
mod error;
mod window;

pub use bank::{BankSwitch, BANK_CONTROL_OFFSET, BANK_INDEX_MASK, RAM_WINDOW_OFFSET};
pub use error::{MapFailure, WindowError, WindowResult};
pub use window::{AddressWindow, MapPrimitive, WindowConfig, WINDOW_ALIGNMENT, WINDOW_SIZE};
