//! Cross-crate tests for the save dumper: device and host ends wired together
//! over the simulated cartridge and serial link.

#[cfg(test)]
mod e2e;

#[cfg(test)]
mod bank_select;
