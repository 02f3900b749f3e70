#![cfg(test)]

use cart_profile::{enable_ram, CartridgeProfile};
use cart_sim::SimCartridge;
use cart_window::{AddressWindow, BankSwitch, WindowConfig, BANK_INDEX_MASK};
use proptest::prelude::*;

/// MBC5 with 128 KiB of RAM: sixteen banks, each tagged with its index.
fn sixteen_bank_window() -> AddressWindow<SimCartridge> {
    let mut window = AddressWindow::new(
        SimCartridge::with_header("BANKS", 0x1B, 4),
        WindowConfig::default(),
    );
    let profile = CartridgeProfile::resolve(0x1B, 4).expect("supported");
    assert_eq!(profile.bank_count, 16);
    enable_ram(&mut window, &profile).expect("enable");
    window
}

proptest! {
    #[test]
    fn select_bank_uses_the_low_nibble(bank in any::<u8>()) {
        let mut window = sixteen_bank_window();
        window.select_bank(bank).expect("select");
        prop_assert_eq!(window.read(0).expect("read"), bank & BANK_INDEX_MASK);
    }
}

#[test]
fn bank_seventeen_reads_like_bank_one() {
    let mut window = sixteen_bank_window();
    let mut one = vec![0u8; 64];
    let mut seventeen = vec![0u8; 64];
    window.select_bank(1).expect("select");
    window.read_into(0, &mut one).expect("read");
    window.select_bank(17).expect("select");
    window.read_into(0, &mut seventeen).expect("read");
    assert_eq!(one, seventeen);
    assert_eq!(one[0], 1);
}

#[test]
fn window_ends_on_the_ram_page_after_a_switch() {
    let mut window = sixteen_bank_window();
    window.select_bank(3).expect("select");
    assert_eq!(window.current_offset(), Some(0x8000));
}
