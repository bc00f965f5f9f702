use thiserror::Error;

use crate::serialization::Format;

/// Errors raised while configuring, encoding or publishing telemetry.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Zenoh session error: {0}")]
    Zenoh(#[from] zenoh::Error),

    #[error("Cannot encode {format:?} payload: {message}")]
    Encode { format: Format, message: String },

    #[error("Cannot decode {format:?} payload: {message}")]
    Decode { format: Format, message: String },
}

impl Error {
    pub(crate) fn encode(format: Format, err: impl std::fmt::Display) -> Self {
        Error::Encode {
            format,
            message: err.to_string(),
        }
    }

    pub(crate) fn decode(format: Format, err: impl std::fmt::Display) -> Self {
        Error::Decode {
            format,
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
