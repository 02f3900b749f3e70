use crate::error::WindowResult;
use crate::window::{AddressWindow, MapPrimitive};
use log::debug;

/// Cartridge region whose first byte latches the RAM bank number.
pub const BANK_CONTROL_OFFSET: u32 = 0x4000;
/// Cartridge region that exposes the selected RAM bank.
pub const RAM_WINDOW_OFFSET: u32 = 0x8000;
/// Bank numbers are truncated to the low nibble before latching.
pub const BANK_INDEX_MASK: u8 = 0x0F;

/// Exposes a cartridge RAM bank through the window.
pub trait BankSwitch {
    /// Latches `bank & 0xF` and leaves the window over the selected RAM bank.
    ///
    /// The control-region mapping used to latch the bank is never observable
    /// by the caller.
    fn select_bank(&mut self, bank: u8) -> WindowResult<()>;
}

impl<M: MapPrimitive> BankSwitch for AddressWindow<M> {
    fn select_bank(&mut self, bank: u8) -> WindowResult<()> {
        let latch = bank & BANK_INDEX_MASK;
        self.map_physical(BANK_CONTROL_OFFSET)?;
        self.write(0, latch)?;
        self.map_physical(RAM_WINDOW_OFFSET)?;
        debug!("selected cartridge RAM bank {latch}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::window::tests::{FlatBus, Op};
    use crate::{WindowConfig, WindowError};
    use proptest::prelude::*;

    fn window() -> AddressWindow<FlatBus> {
        AddressWindow::new(FlatBus::default(), WindowConfig::default())
    }

    #[test]
    fn select_bank_maps_latches_then_remaps() {
        let mut win = window();
        win.select_bank(3).expect("select");
        assert_eq!(
            win.primitive().ops,
            vec![Op::Map(0x3F_4000), Op::Write(0, 3), Op::Map(0x3F_8000)]
        );
        assert_eq!(win.current_offset(), Some(RAM_WINDOW_OFFSET));
    }

    #[test]
    fn select_bank_surfaces_control_map_failure() {
        let mut win = window();
        win.primitive_mut().reject = Some(0x3F_4000);
        let err = win.select_bank(1).unwrap_err();
        assert!(matches!(err, WindowError::Map(_)));
        assert_eq!(win.primitive().ops, vec![Op::Map(0x3F_4000)]);
        assert_eq!(win.current_offset(), None);
    }

    proptest! {
        /// Only the low nibble of the bank index ever reaches the latch.
        #[test]
        fn latch_uses_low_nibble(bank in any::<u8>()) {
            let mut win = window();
            win.select_bank(bank).expect("select");
            prop_assert_eq!(win.primitive().ops[1].clone(), Op::Write(0, bank & 0x0F));
        }
    }
}
