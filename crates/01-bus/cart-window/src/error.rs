use thiserror::Error;

pub type WindowResult<T> = Result<T, WindowError>;

/// Raised by a [`crate::MapPrimitive`] that refused to repoint the page.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
#[error("mapping primitive rejected physical address {physical:#08x}")]
pub struct MapFailure {
    /// Absolute physical address that was requested.
    pub physical: u32,
}

#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum WindowError {
    #[error("physical offset {offset:#x} is not aligned to the 16 KiB window")]
    Misaligned { offset: u32 },

    #[error(transparent)]
    Map(#[from] MapFailure),

    #[error("window has no valid mapping")]
    Unmapped,

    #[error("access of {len} byte(s) at {offset:#06x} falls outside the window")]
    OutOfWindow { offset: u16, len: usize },
}

impl WindowError {
    /// True when the underlying primitive rejected a request.
    pub fn is_map_failure(&self) -> bool {
        matches!(self, WindowError::Map(_))
    }
}
