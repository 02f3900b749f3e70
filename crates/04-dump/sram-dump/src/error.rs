use cart_window::WindowError;
use link_protocol::LinkError;
use std::fmt;
use thiserror::Error;

pub type DumpResult<T> = Result<T, DumpError>;

/// Step of the dump sequence an error came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DumpStage {
    Open,
    Header,
    Handshake,
    EnableRam,
    Streaming { bank: u8 },
    Restore,
    DisableRam,
    Close,
}

impl fmt::Display for DumpStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DumpStage::Open => f.write_str("opening channel"),
            DumpStage::Header => f.write_str("reading cartridge header"),
            DumpStage::Handshake => f.write_str("handshake"),
            DumpStage::EnableRam => f.write_str("enabling cartridge RAM"),
            DumpStage::Streaming { bank } => write!(f, "streaming bank {bank}"),
            DumpStage::Restore => f.write_str("restoring channel attributes"),
            DumpStage::DisableRam => f.write_str("disabling cartridge RAM"),
            DumpStage::Close => f.write_str("closing channel"),
        }
    }
}

#[derive(Debug, Error)]
pub enum DumpError {
    #[error("unsupported cartridge type {type_byte:#04x}")]
    UnsupportedCartridge { type_byte: u8 },

    #[error("{stage}: {source}")]
    Window {
        stage: DumpStage,
        #[source]
        source: WindowError,
    },

    #[error("{stage}: {source}")]
    Link {
        stage: DumpStage,
        #[source]
        source: LinkError,
    },
}

impl DumpError {
    pub fn window(stage: DumpStage, source: WindowError) -> Self {
        DumpError::Window { stage, source }
    }

    pub fn link(stage: DumpStage, source: LinkError) -> Self {
        DumpError::Link { stage, source }
    }

    pub fn stage(&self) -> Option<DumpStage> {
        match self {
            DumpError::UnsupportedCartridge { .. } => None,
            DumpError::Window { stage, .. } | DumpError::Link { stage, .. } => Some(*stage),
        }
    }

    /// True when the mapping primitive rejected a request.
    pub fn is_map_failure(&self) -> bool {
        matches!(self, DumpError::Window { source, .. } if source.is_map_failure())
    }
}
