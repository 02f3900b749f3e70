//! Simulated cartridge bus and serial link.
//!
//! These stand in for the hardware collaborators so the dumper can run end to
//! end on a workstation and in tests.

mod cartridge;
mod link;

pub use cartridge::{ram_bytes_for, BusEvent, Mbc, SimCartridge, CART_SPAN, ROM_SPAN};
pub use link::{HostPort, LinkProbe, SimDriver, SimLink, SimPort};
