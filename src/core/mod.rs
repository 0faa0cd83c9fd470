//! Core constants and error types, shared by every layer.

mod constants;
mod error;

pub use constants::*;
pub use error::{ChannelError, CryptoError};
