#![deny(unsafe_op_in_unsafe_fn)]
//! Cartridge header decoding and RAM bank planning.
//!
//! The header lives in the fixed ROM bank and is read with the window at
//! physical offset 0. Two of its bytes decide how many RAM banks get dumped
//! and how large each one is.

mod error;
mod header;
mod profile;
mod ram;

pub use error::{ProfileError, ProfileResult};
pub use header::{CartridgeHeader, RAM_SIZE_OFFSET, TITLE_LEN, TITLE_OFFSET, TYPE_OFFSET};
pub use profile::{ram_size_kib, CartridgeKind, CartridgeProfile, MBC2_RAM_BYTES, SRAM_BANK_SIZE};
pub use ram::{
    disable_ram, enable_ram, BANKING_MODE_RAM, BANKING_MODE_REGISTER, RAM_DISABLE_VALUE,
    RAM_ENABLE_VALUE,
};
