// src/io/error.rs
//
// Crate-wide IO error type. Command-surface callers only ever see these
// classified outcomes; raw driver codes stay below the channel boundary.

use thiserror::Error;

/// Errors surfaced by the channel, command surface and SDO client.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum IoError {
    /// Operation requires an open channel but the adapter is not connected
    #[error("not connected")]
    NotConnected,

    /// The driver reported a failure; carries the driver's own text
    #[error("driver error: {text}")]
    Driver { text: String },

    /// A frame could not be encoded or decoded
    #[error("codec error: {0}")]
    Codec(String),

    /// Invalid configuration or parameters
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The SDO server aborted the transfer
    #[error("SDO abort 0x{code:08X}")]
    SdoAbort { code: u32 },

    /// A bounded wait elapsed without a result
    #[error("timed out")]
    Timeout,
}

impl IoError {
    /// Driver failure with the driver-provided text.
    pub fn driver(text: impl Into<String>) -> Self {
        IoError::Driver { text: text.into() }
    }

    /// Invalid configuration or parameters.
    pub fn configuration(message: impl Into<String>) -> Self {
        IoError::Configuration(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_formats() {
        assert_eq!(IoError::NotConnected.to_string(), "not connected");
        assert_eq!(
            IoError::driver("bus heavy").to_string(),
            "driver error: bus heavy"
        );
        assert_eq!(
            IoError::SdoAbort { code: 0x0602_0000 }.to_string(),
            "SDO abort 0x06020000"
        );
    }
}
