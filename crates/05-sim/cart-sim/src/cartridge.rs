//! In-memory cartridge behind the mapping window.
//!
//! Cartridge-relative layout as seen through the physical window:
//! * `0x0000..0x8000` – ROM reads; writes drive the MBC registers.
//! * `0x8000..0xC000` – external RAM (selected bank in the first 8 KiB).

use cart_window::{MapFailure, MapPrimitive, WindowConfig, WINDOW_SIZE};
use log::trace;
use std::collections::HashSet;

/// ROM bytes addressable without ROM banking.
pub const ROM_SPAN: u32 = 0x8000;
/// Cartridge-relative bytes reachable through the window.
pub const CART_SPAN: u32 = 0xC000;

const RAM_WINDOW: u16 = 0x8000;
const RAM_BANK_SIZE: usize = 0x2000;
const MBC2_RAM: usize = 512;

/// Memory bank controller family, derived from header byte `0x147`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mbc {
    /// No controller (ROM only, or ROM+RAM).
    None,
    Mbc1,
    Mbc2,
    Mbc3,
    Mbc5,
}

impl Mbc {
    pub fn from_type_byte(type_byte: u8) -> Self {
        match type_byte {
            0x01..=0x03 => Mbc::Mbc1,
            0x05 | 0x06 => Mbc::Mbc2,
            0x0F..=0x13 => Mbc::Mbc3,
            0x19..=0x1E => Mbc::Mbc5,
            _ => Mbc::None,
        }
    }
}

/// Size of the external RAM a header describes.
pub fn ram_bytes_for(type_byte: u8, ram_size_byte: u8) -> usize {
    if Mbc::from_type_byte(type_byte) == Mbc::Mbc2 {
        return MBC2_RAM;
    }
    match ram_size_byte {
        1 => 2 * 1024,
        2 => 8 * 1024,
        3 => 32 * 1024,
        4 => 128 * 1024,
        5 => 64 * 1024,
        _ => 0,
    }
}

/// Bus traffic recorded by the simulator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BusEvent {
    /// Window repointed at a cartridge-relative offset.
    Map(u32),
    /// Byte written at a cartridge-relative address.
    Write { addr: u32, value: u8 },
}

#[derive(Debug)]
pub struct SimCartridge {
    rom: Vec<u8>,
    ram: Vec<u8>,
    mbc: Mbc,
    physical_base: u32,
    mapped: Option<u32>,
    rejected: HashSet<u32>,
    ram_enabled: bool,
    ram_bank: u8,
    banking_mode: u8,
    events: Vec<BusEvent>,
}

impl SimCartridge {
    /// Builds a cartridge from a ROM image and a save image.
    ///
    /// The save image is resized to what the header describes.
    pub fn new(rom: Vec<u8>, mut ram: Vec<u8>) -> Self {
        let type_byte = rom.get(0x147).copied().unwrap_or(0);
        let ram_size_byte = rom.get(0x149).copied().unwrap_or(0);
        ram.resize(ram_bytes_for(type_byte, ram_size_byte), 0xFF);
        let mbc = Mbc::from_type_byte(type_byte);
        if mbc == Mbc::Mbc2 {
            for byte in &mut ram {
                *byte &= 0x0F;
            }
        }
        Self {
            rom,
            ram,
            mbc,
            physical_base: WindowConfig::default().physical_base,
            mapped: None,
            rejected: HashSet::new(),
            ram_enabled: false,
            ram_bank: 0,
            banking_mode: 0,
            events: Vec::new(),
        }
    }

    /// Synthesises a 32 KiB ROM carrying the given header fields.
    ///
    /// RAM bank `n` is filled with `n` in the first byte and a counter after it.
    pub fn with_header(title: &str, type_byte: u8, ram_size_byte: u8) -> Self {
        let mut rom = vec![0u8; ROM_SPAN as usize];
        let title = title.as_bytes();
        let len = title.len().min(16);
        rom[0x134..0x134 + len].copy_from_slice(&title[..len]);
        rom[0x147] = type_byte;
        rom[0x149] = ram_size_byte;
        let ram = (0..ram_bytes_for(type_byte, ram_size_byte))
            .map(|idx| {
                let bank = idx / RAM_BANK_SIZE;
                let offset = idx % RAM_BANK_SIZE;
                if offset == 0 {
                    bank as u8
                } else {
                    (offset as u8).wrapping_add((bank as u8).wrapping_mul(31))
                }
            })
            .collect();
        Self::new(rom, ram)
    }

    pub fn with_physical_base(mut self, physical_base: u32) -> Self {
        self.physical_base = physical_base;
        self
    }

    /// Makes every map request for `offset` (cartridge-relative) fail.
    pub fn reject_offset(&mut self, offset: u32) {
        self.rejected.insert(offset);
    }

    pub fn mbc(&self) -> Mbc {
        self.mbc
    }

    pub fn ram(&self) -> &[u8] {
        &self.ram
    }

    pub fn ram_enabled(&self) -> bool {
        self.ram_enabled
    }

    pub fn banking_mode(&self) -> u8 {
        self.banking_mode
    }

    pub fn events(&self) -> &[BusEvent] {
        &self.events
    }

    pub fn clear_events(&mut self) {
        self.events.clear();
    }

    /// Number of 8 KiB banks backing the RAM (1 for anything smaller).
    pub fn ram_banks(&self) -> usize {
        self.ram.len().div_ceil(RAM_BANK_SIZE)
    }

    /// Bytes the RAM window exposes for `bank`, as the dumper should read them.
    pub fn bank_view(&self, bank: usize, len: usize) -> Vec<u8> {
        if self.mbc == Mbc::Mbc2 {
            return self.ram[..len.min(MBC2_RAM)]
                .iter()
                .map(|nibble| 0xF0 | nibble)
                .collect();
        }
        let start = bank * RAM_BANK_SIZE;
        self.ram[start..start + len].to_vec()
    }

    fn active_ram_bank(&self) -> usize {
        let bank = match self.mbc {
            Mbc::Mbc1 if self.banking_mode == 1 => self.ram_bank & 0x03,
            Mbc::Mbc1 | Mbc::Mbc2 | Mbc::None => 0,
            Mbc::Mbc3 => self.ram_bank & 0x03,
            Mbc::Mbc5 => self.ram_bank & 0x0F,
        };
        usize::from(bank) % self.ram_banks().max(1)
    }

    fn read_ram(&self, offset: usize) -> u8 {
        if !self.ram_enabled || offset >= RAM_BANK_SIZE {
            return 0xFF;
        }
        if self.mbc == Mbc::Mbc2 {
            return self
                .ram
                .get(offset % MBC2_RAM)
                .map_or(0xFF, |nibble| 0xF0 | nibble);
        }
        let index = self.active_ram_bank() * RAM_BANK_SIZE + offset;
        self.ram.get(index).copied().unwrap_or(0xFF)
    }

    fn write_ram(&mut self, offset: usize, value: u8) {
        if !self.ram_enabled || offset >= RAM_BANK_SIZE {
            return;
        }
        if self.mbc == Mbc::Mbc2 {
            if let Some(slot) = self.ram.get_mut(offset % MBC2_RAM) {
                *slot = value & 0x0F;
            }
            return;
        }
        let index = self.active_ram_bank() * RAM_BANK_SIZE + offset;
        if let Some(slot) = self.ram.get_mut(index) {
            *slot = value;
        }
    }

    fn write_register(&mut self, addr: u32, value: u8) {
        match addr {
            0x0000..=0x1FFF => self.ram_enabled = value & 0x0F == 0x0A,
            // ROM banking is not modelled; the dumper only reads the fixed bank.
            0x2000..=0x3FFF => {}
            0x4000..=0x5FFF => match self.mbc {
                Mbc::Mbc1 => self.ram_bank = value & 0x03,
                Mbc::Mbc3 => self.ram_bank = value & 0x0F,
                Mbc::Mbc5 => self.ram_bank = value & 0x0F,
                Mbc::Mbc2 | Mbc::None => {}
            },
            0x6000..=0x7FFF => {
                if self.mbc == Mbc::Mbc1 {
                    self.banking_mode = value & 0x01;
                }
            }
            _ => {}
        }
    }

    fn resolve(&self, offset: u16) -> Option<u32> {
        self.mapped.map(|base| base + u32::from(offset))
    }
}

impl MapPrimitive for SimCartridge {
    fn map(&mut self, _virtual_base: u16, physical: u32) -> Result<(), MapFailure> {
        self.mapped = None;
        let Some(offset) = physical.checked_sub(self.physical_base) else {
            return Err(MapFailure { physical });
        };
        if offset + WINDOW_SIZE as u32 > CART_SPAN || self.rejected.contains(&offset) {
            return Err(MapFailure { physical });
        }
        trace!("sim map {offset:#06x}");
        self.events.push(BusEvent::Map(offset));
        self.mapped = Some(offset);
        Ok(())
    }

    fn read(&mut self, offset: u16) -> u8 {
        match self.resolve(offset) {
            Some(addr) if addr < ROM_SPAN => self.rom.get(addr as usize).copied().unwrap_or(0xFF),
            Some(addr) => self.read_ram((addr - u32::from(RAM_WINDOW)) as usize),
            None => 0xFF,
        }
    }

    fn write(&mut self, offset: u16, value: u8) {
        let Some(addr) = self.resolve(offset) else {
            return;
        };
        self.events.push(BusEvent::Write { addr, value });
        if addr < ROM_SPAN {
            self.write_register(addr, value);
        } else {
            self.write_ram((addr - u32::from(RAM_WINDOW)) as usize, value);
        }
    }
}
