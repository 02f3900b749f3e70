use cart_window::WindowError;
use thiserror::Error;

pub type ProfileResult<T> = Result<T, ProfileError>;

#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum ProfileError {
    #[error("unsupported cartridge type {type_byte:#04x}")]
    Unsupported { type_byte: u8 },

    #[error("window error: {0}")]
    Window(#[from] WindowError),
}
