use std::io;
use thiserror::Error;

use crate::handshake::HandshakeState;

pub type LinkResult<T> = Result<T, LinkError>;

#[derive(Debug, Error)]
pub enum LinkError {
    #[error("failed to open channel {name}: {source}")]
    Open {
        name: String,
        #[source]
        source: io::Error,
    },

    #[error("channel I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("channel closed by peer")]
    Closed,

    #[error("channel accepted {written} of {expected} byte(s)")]
    ShortWrite { written: usize, expected: usize },

    #[error("invalid message header {0:#04x}")]
    InvalidHeader(u8),

    #[error("handshake is {actual:?}, expected {expected:?}")]
    State {
        expected: HandshakeState,
        actual: HandshakeState,
    },
}

impl LinkError {
    pub fn open(name: impl Into<String>, source: io::Error) -> Self {
        LinkError::Open {
            name: name.into(),
            source,
        }
    }
}
