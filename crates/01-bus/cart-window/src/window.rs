//! Alignment-checked ownership of the mapping page.
//!
//! Only one physical region is visible at a time. Any failed request drops the
//! tracked offset so that stale bytes under the page are never read as if they
//! belonged to the new region.

use crate::error::{MapFailure, WindowError, WindowResult};
use log::{debug, error};

/// Size of the virtual page in bytes.
pub const WINDOW_SIZE: usize = 0x4000;

/// Physical offsets handed to [`AddressWindow::map_physical`] must be multiples of this.
pub const WINDOW_ALIGNMENT: u32 = WINDOW_SIZE as u32;

/// Platform hook behind the window.
///
/// Implementations own the actual page: real hardware points it at the
/// cartridge bus, simulations back it with an in-memory cartridge model.
pub trait MapPrimitive {
    /// Repoints the virtual page starting at `virtual_base` to `physical`.
    fn map(&mut self, virtual_base: u16, physical: u32) -> Result<(), MapFailure>;
    /// Reads the byte at `offset` within the page.
    fn read(&mut self, offset: u16) -> u8;
    /// Writes `value` at `offset` within the page.
    fn write(&mut self, offset: u16, value: u8);
}

impl<M: MapPrimitive + ?Sized> MapPrimitive for &mut M {
    fn map(&mut self, virtual_base: u16, physical: u32) -> Result<(), MapFailure> {
        (**self).map(virtual_base, physical)
    }

    fn read(&mut self, offset: u16) -> u8 {
        (**self).read(offset)
    }

    fn write(&mut self, offset: u16, value: u8) {
        (**self).write(offset, value)
    }
}

/// Fixed addresses of the page.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WindowConfig {
    /// Virtual address of the page seen by the CPU.
    pub virtual_base: u16,
    /// Physical address of the cartridge's first byte.
    pub physical_base: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            virtual_base: 0x8000,
            physical_base: 0x3F_0000,
        }
    }
}

/// Owner of the single mapping page.
#[derive(Debug)]
pub struct AddressWindow<M> {
    primitive: M,
    config: WindowConfig,
    current: Option<u32>,
}

impl<M: MapPrimitive> AddressWindow<M> {
    /// Wraps `primitive`; nothing is mapped until [`Self::map_physical`] succeeds.
    pub fn new(primitive: M, config: WindowConfig) -> Self {
        Self {
            primitive,
            config,
            current: None,
        }
    }

    pub fn config(&self) -> WindowConfig {
        self.config
    }

    /// Offset (relative to the physical base) of the live mapping.
    pub fn current_offset(&self) -> Option<u32> {
        self.current
    }

    /// Points the page at `physical_base + offset`.
    ///
    /// `offset` must be a multiple of [`WINDOW_ALIGNMENT`]. A rejected request
    /// leaves the window unmapped.
    pub fn map_physical(&mut self, offset: u32) -> WindowResult<()> {
        if offset % WINDOW_ALIGNMENT != 0 {
            return Err(WindowError::Misaligned { offset });
        }
        let physical = self.config.physical_base.wrapping_add(offset);
        self.current = None;
        match self.primitive.map(self.config.virtual_base, physical) {
            Ok(()) => {
                debug!("window {:#06x} -> {physical:#08x}", self.config.virtual_base);
                self.current = Some(offset);
                Ok(())
            }
            Err(failure) => {
                error!("cartridge map failed: {failure}");
                Err(failure.into())
            }
        }
    }

    pub fn read(&mut self, offset: u16) -> WindowResult<u8> {
        self.check(offset, 1)?;
        Ok(self.primitive.read(offset))
    }

    pub fn write(&mut self, offset: u16, value: u8) -> WindowResult<()> {
        self.check(offset, 1)?;
        self.primitive.write(offset, value);
        Ok(())
    }

    /// Copies `buf.len()` bytes starting at `offset` out of the page.
    pub fn read_into(&mut self, offset: u16, buf: &mut [u8]) -> WindowResult<()> {
        self.check(offset, buf.len())?;
        for (idx, byte) in buf.iter_mut().enumerate() {
            *byte = self.primitive.read(offset + idx as u16);
        }
        Ok(())
    }

    pub fn primitive(&self) -> &M {
        &self.primitive
    }

    pub fn primitive_mut(&mut self) -> &mut M {
        &mut self.primitive
    }

    pub fn into_inner(self) -> M {
        self.primitive
    }

    fn check(&self, offset: u16, len: usize) -> WindowResult<()> {
        if self.current.is_none() {
            return Err(WindowError::Unmapped);
        }
        if usize::from(offset) + len > WINDOW_SIZE {
            return Err(WindowError::OutOfWindow { offset, len });
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::HashMap;

    #[derive(Clone, Debug, PartialEq, Eq)]
    pub(crate) enum Op {
        Map(u32),
        Write(u16, u8),
    }

    /// Flat physical memory with a log of map/write calls.
    #[derive(Default)]
    pub(crate) struct FlatBus {
        pub(crate) mem: HashMap<u32, u8>,
        pub(crate) base: Option<u32>,
        pub(crate) ops: Vec<Op>,
        pub(crate) reject: Option<u32>,
    }

    impl MapPrimitive for FlatBus {
        fn map(&mut self, _virtual_base: u16, physical: u32) -> Result<(), MapFailure> {
            self.ops.push(Op::Map(physical));
            if self.reject == Some(physical) {
                self.base = None;
                return Err(MapFailure { physical });
            }
            self.base = Some(physical);
            Ok(())
        }

        fn read(&mut self, offset: u16) -> u8 {
            let base = self.base.expect("read while unmapped");
            self.mem
                .get(&(base + u32::from(offset)))
                .copied()
                .unwrap_or(0xFF)
        }

        fn write(&mut self, offset: u16, value: u8) {
            let base = self.base.expect("write while unmapped");
            self.ops.push(Op::Write(offset, value));
            self.mem.insert(base + u32::from(offset), value);
        }
    }

    fn window() -> AddressWindow<FlatBus> {
        AddressWindow::new(FlatBus::default(), WindowConfig::default())
    }

    #[test]
    fn misaligned_offset_never_reaches_primitive() {
        let mut win = window();
        assert_eq!(
            win.map_physical(0x2000),
            Err(WindowError::Misaligned { offset: 0x2000 })
        );
        assert!(win.primitive().ops.is_empty());
        assert_eq!(win.current_offset(), None);
    }

    #[test]
    fn map_adds_physical_base() {
        let mut win = window();
        win.map_physical(0x4000).expect("map");
        assert_eq!(win.primitive().ops, vec![Op::Map(0x3F_4000)]);
        assert_eq!(win.current_offset(), Some(0x4000));
    }

    #[test]
    fn failed_map_invalidates_previous_mapping() {
        let mut win = window();
        win.map_physical(0).expect("map");
        win.primitive_mut().reject = Some(0x3F_8000);

        let err = win.map_physical(0x8000).unwrap_err();
        assert!(err.is_map_failure());
        assert_eq!(win.current_offset(), None);
        assert_eq!(win.read(0), Err(WindowError::Unmapped));
        assert_eq!(win.write(0, 1), Err(WindowError::Unmapped));
    }

    #[test]
    fn access_is_bounded_by_window_size() {
        let mut win = window();
        win.map_physical(0).expect("map");
        assert!(win.read(0x3FFF).is_ok());
        assert_eq!(
            win.read(0x4000),
            Err(WindowError::OutOfWindow {
                offset: 0x4000,
                len: 1
            })
        );
        let mut buf = [0u8; 16];
        assert_eq!(
            win.read_into(0x3FF8, &mut buf),
            Err(WindowError::OutOfWindow {
                offset: 0x3FF8,
                len: 16
            })
        );
    }

    #[test]
    fn read_into_reflects_latest_mapping() {
        let mut win = window();
        win.primitive_mut().mem.insert(0x3F_0134, b'Z');
        win.primitive_mut().mem.insert(0x3F_4134, b'Q');

        win.map_physical(0).expect("map");
        let mut buf = [0u8; 1];
        win.read_into(0x134, &mut buf).expect("read");
        assert_eq!(buf, [b'Z']);

        win.map_physical(0x4000).expect("remap");
        win.read_into(0x134, &mut buf).expect("read");
        assert_eq!(buf, [b'Q']);
    }
}
