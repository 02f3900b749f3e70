//! Cartridge RAM gate and MBC1 banking-mode register.
//!
//! Both registers sit in the ROM area, so they are reached with the same
//! map-then-write pattern as bank selection.

use crate::profile::CartridgeProfile;
use cart_window::{AddressWindow, MapPrimitive, WindowResult, BANK_CONTROL_OFFSET};
use log::debug;

/// Written to cartridge `0x0000` to open the RAM gate.
pub const RAM_ENABLE_VALUE: u8 = 0x0A;
/// Written to cartridge `0x0000` to close the RAM gate.
pub const RAM_DISABLE_VALUE: u8 = 0x00;
/// Offset of the banking-mode register inside the `0x4000` mapping (cartridge `0x6000`).
pub const BANKING_MODE_REGISTER: u16 = 0x2000;
/// Banking-mode value that routes the bank register to RAM.
pub const BANKING_MODE_RAM: u8 = 1;

/// Opens the RAM gate and, on MBC1, switches to RAM banking mode.
pub fn enable_ram<M: MapPrimitive>(
    window: &mut AddressWindow<M>,
    profile: &CartridgeProfile,
) -> WindowResult<()> {
    if window.current_offset() != Some(0) {
        window.map_physical(0)?;
    }
    window.write(0, RAM_ENABLE_VALUE)?;
    if profile.kind.needs_banking_mode() {
        window.map_physical(BANK_CONTROL_OFFSET)?;
        window.write(BANKING_MODE_REGISTER, BANKING_MODE_RAM)?;
    }
    debug!("cartridge RAM enabled ({})", profile.kind);
    Ok(())
}

/// Closes the RAM gate.
pub fn disable_ram<M: MapPrimitive>(window: &mut AddressWindow<M>) -> WindowResult<()> {
    window.map_physical(0)?;
    window.write(0, RAM_DISABLE_VALUE)?;
    debug!("cartridge RAM disabled");
    Ok(())
}
