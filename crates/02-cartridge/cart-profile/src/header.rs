use cart_window::{AddressWindow, MapPrimitive, WindowResult};

/// Start of the game title in the fixed ROM bank.
pub const TITLE_OFFSET: u16 = 0x134;
/// Title bytes emitted on the console.
pub const TITLE_LEN: usize = 15;
/// Cartridge type byte (MBC + features).
pub const TYPE_OFFSET: u16 = 0x147;
/// RAM size code.
pub const RAM_SIZE_OFFSET: u16 = 0x149;

/// Raw header fields the dumper cares about.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CartridgeHeader {
    /// Title bytes exactly as stored in ROM.
    pub title: [u8; TITLE_LEN],
    pub type_byte: u8,
    pub ram_size_byte: u8,
}

impl CartridgeHeader {
    /// Maps physical offset 0 and captures the header fields.
    pub fn read<M: MapPrimitive>(window: &mut AddressWindow<M>) -> WindowResult<Self> {
        window.map_physical(0)?;
        let mut title = [0u8; TITLE_LEN];
        window.read_into(TITLE_OFFSET, &mut title)?;
        let type_byte = window.read(TYPE_OFFSET)?;
        let ram_size_byte = window.read(RAM_SIZE_OFFSET)?;
        Ok(Self {
            title,
            type_byte,
            ram_size_byte,
        })
    }

    /// Title with trailing padding removed, for logs.
    pub fn title_lossy(&self) -> String {
        let end = self
            .title
            .iter()
            .rposition(|&b| b != 0 && b != b' ')
            .map_or(0, |idx| idx + 1);
        String::from_utf8_lossy(&self.title[..end]).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_trims_nul_padding() {
        let mut title = [0u8; TITLE_LEN];
        title[..6].copy_from_slice(b"POKEMO");
        let header = CartridgeHeader {
            title,
            type_byte: 0x13,
            ram_size_byte: 3,
        };
        assert_eq!(header.title_lossy(), "POKEMO");
    }

    #[test]
    fn blank_title_is_empty() {
        let header = CartridgeHeader {
            title: [0; TITLE_LEN],
            type_byte: 0,
            ram_size_byte: 0,
        };
        assert_eq!(header.title_lossy(), "");
    }
}
