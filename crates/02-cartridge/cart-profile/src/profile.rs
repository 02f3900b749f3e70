use crate::error::{ProfileError, ProfileResult};
use crate::header::CartridgeHeader;
use std::fmt;

/// Every RAM+battery cartridge is dumped in 8 KiB banks.
pub const SRAM_BANK_SIZE: u16 = 8 * 1024;
/// MBC2 carries 512 half-bytes of built-in RAM, dumped as one block.
pub const MBC2_RAM_BYTES: u16 = 512;

/// Battery-backed cartridge types the dumper knows how to bank.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CartridgeKind {
    /// `0x03` MBC1+RAM+BATTERY.
    Mbc1,
    /// `0x06` MBC2+BATTERY.
    Mbc2,
    /// `0x10` MBC3+TIMER+RAM+BATTERY.
    Mbc3Timer,
    /// `0x13` MBC3+RAM+BATTERY.
    Mbc3,
    /// `0x1B` MBC5+RAM+BATTERY.
    Mbc5,
    /// `0x1E` MBC5+RUMBLE+RAM+BATTERY.
    Mbc5Rumble,
}

impl CartridgeKind {
    pub fn from_type_byte(type_byte: u8) -> Option<Self> {
        match type_byte {
            0x03 => Some(CartridgeKind::Mbc1),
            0x06 => Some(CartridgeKind::Mbc2),
            0x10 => Some(CartridgeKind::Mbc3Timer),
            0x13 => Some(CartridgeKind::Mbc3),
            0x1B => Some(CartridgeKind::Mbc5),
            0x1E => Some(CartridgeKind::Mbc5Rumble),
            _ => None,
        }
    }

    pub fn type_byte(self) -> u8 {
        match self {
            CartridgeKind::Mbc1 => 0x03,
            CartridgeKind::Mbc2 => 0x06,
            CartridgeKind::Mbc3Timer => 0x10,
            CartridgeKind::Mbc3 => 0x13,
            CartridgeKind::Mbc5 => 0x1B,
            CartridgeKind::Mbc5Rumble => 0x1E,
        }
    }

    /// MBC1 only exposes RAM banks other than 0 in RAM banking mode.
    pub fn needs_banking_mode(self) -> bool {
        matches!(self, CartridgeKind::Mbc1)
    }

    /// True when the RAM size is read from the header rather than fixed.
    pub fn has_sized_ram(self) -> bool {
        !matches!(self, CartridgeKind::Mbc2)
    }
}

impl fmt::Display for CartridgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            CartridgeKind::Mbc1 => "MBC1+RAM+BATTERY",
            CartridgeKind::Mbc2 => "MBC2+BATTERY",
            CartridgeKind::Mbc3Timer => "MBC3+TIMER+RAM+BATTERY",
            CartridgeKind::Mbc3 => "MBC3+RAM+BATTERY",
            CartridgeKind::Mbc5 => "MBC5+RAM+BATTERY",
            CartridgeKind::Mbc5Rumble => "MBC5+RUMBLE+RAM+BATTERY",
        };
        f.write_str(label)
    }
}

/// Translates the header RAM size code to KiB. Unknown codes decode to 0.
pub fn ram_size_kib(code: u8) -> u16 {
    match code {
        2 => 8,
        3 => 32,
        4 => 128,
        5 => 64,
        _ => 0,
    }
}

/// Bank plan derived from the header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CartridgeProfile {
    pub type_byte: u8,
    /// Raw RAM size code; ignored for MBC2.
    pub ram_size_byte: u8,
    pub kind: CartridgeKind,
    pub bank_count: u8,
    pub bank_size: u16,
}

impl CartridgeProfile {
    /// Builds the bank plan for `type_byte`.
    ///
    /// An unlisted RAM size code yields zero banks rather than an error.
    pub fn resolve(type_byte: u8, ram_size_byte: u8) -> ProfileResult<Self> {
        let kind = CartridgeKind::from_type_byte(type_byte)
            .ok_or(ProfileError::Unsupported { type_byte })?;
        let (bank_count, bank_size) = if kind.has_sized_ram() {
            let total_kib = ram_size_kib(ram_size_byte);
            ((total_kib >> 3) as u8, SRAM_BANK_SIZE)
        } else {
            (1, MBC2_RAM_BYTES)
        };
        Ok(Self {
            type_byte,
            ram_size_byte,
            kind,
            bank_count,
            bank_size,
        })
    }

    pub fn from_header(header: &CartridgeHeader) -> ProfileResult<Self> {
        Self::resolve(header.type_byte, header.ram_size_byte)
    }

    /// Number of payload bytes that follow the negotiation reply.
    pub fn total_bytes(&self) -> u32 {
        u32::from(self.bank_count) * u32::from(self.bank_size)
    }

    /// Human-readable RAM size line shown before the handshake.
    pub fn ram_size_line(&self) -> String {
        if self.kind.has_sized_ram() {
            format!("Cartridge RAM size: {} KB", ram_size_kib(self.ram_size_byte))
        } else {
            format!("Cartridge RAM size: {} B", self.bank_size)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const SIZED_TYPES: [u8; 5] = [0x03, 0x10, 0x13, 0x1B, 0x1E];

    #[test]
    fn mbc3_with_32k_has_four_banks() {
        let profile = CartridgeProfile::resolve(0x13, 3).expect("supported");
        assert_eq!(profile.kind, CartridgeKind::Mbc3);
        assert_eq!(profile.bank_count, 4);
        assert_eq!(profile.bank_size, 8192);
        assert_eq!(profile.total_bytes(), 32 * 1024);
        assert_eq!(profile.ram_size_line(), "Cartridge RAM size: 32 KB");
    }

    #[test]
    fn ram_size_table() {
        assert_eq!(ram_size_kib(2), 8);
        assert_eq!(ram_size_kib(3), 32);
        assert_eq!(ram_size_kib(4), 128);
        assert_eq!(ram_size_kib(5), 64);
        assert_eq!(ram_size_kib(0), 0);
        assert_eq!(ram_size_kib(1), 0);
    }

    #[test]
    fn unknown_ram_code_plans_zero_banks() {
        let profile = CartridgeProfile::resolve(0x1B, 0x07).expect("degenerate but valid");
        assert_eq!(profile.bank_count, 0);
        assert_eq!(profile.bank_size, SRAM_BANK_SIZE);
        assert_eq!(profile.total_bytes(), 0);
        assert_eq!(profile.ram_size_line(), "Cartridge RAM size: 0 KB");
    }

    #[test]
    fn mbc2_line_reports_bytes() {
        let profile = CartridgeProfile::resolve(0x06, 0).expect("supported");
        assert_eq!(profile.ram_size_line(), "Cartridge RAM size: 512 B");
    }

    #[test]
    fn kind_round_trips_type_byte() {
        for byte in [0x03, 0x06, 0x10, 0x13, 0x1B, 0x1E] {
            let kind = CartridgeKind::from_type_byte(byte).expect("supported");
            assert_eq!(kind.type_byte(), byte);
        }
        assert!(CartridgeKind::Mbc1.needs_banking_mode());
        assert!(!CartridgeKind::Mbc5.needs_banking_mode());
    }

    proptest! {
        #[test]
        fn sized_types_follow_table(
            idx in 0usize..SIZED_TYPES.len(),
            ram_size_byte in any::<u8>(),
        ) {
            let profile = CartridgeProfile::resolve(SIZED_TYPES[idx], ram_size_byte).unwrap();
            prop_assert_eq!(profile.bank_size, 8192);
            prop_assert_eq!(u16::from(profile.bank_count), ram_size_kib(ram_size_byte) / 8);
            if !(2..=5).contains(&ram_size_byte) {
                prop_assert_eq!(profile.bank_count, 0);
            }
        }

        #[test]
        fn mbc2_ignores_ram_size_byte(ram_size_byte in any::<u8>()) {
            let profile = CartridgeProfile::resolve(0x06, ram_size_byte).unwrap();
            prop_assert_eq!(profile.bank_count, 1);
            prop_assert_eq!(profile.bank_size, 512);
        }

        #[test]
        fn other_types_are_rejected(type_byte in any::<u8>(), ram_size_byte in any::<u8>()) {
            prop_assume!(CartridgeKind::from_type_byte(type_byte).is_none());
            prop_assert_eq!(
                CartridgeProfile::resolve(type_byte, ram_size_byte),
                Err(ProfileError::Unsupported { type_byte })
            );
        }
    }
}
