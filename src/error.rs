use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// A modbus read or write failed. Aborts the current scan; the next
    /// poll tick retries.
    #[error("modbus: {0}")]
    Protocol(String),

    /// A publish rule did not match `0xNN <topic>`. Aborts the remaining
    /// publish batch.
    #[error("could not parse publish rule {line:?}")]
    ParseRule { line: String },

    /// A register description exceeded the wrap safety bound. Only the
    /// offending entry is skipped.
    #[error("description too long")]
    Format,

    /// Broker connection or publish failure.
    #[error("mqtt: {0}")]
    Mqtt(String),

    /// Missing or invalid configuration. Fatal at startup.
    #[error("config: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Process exit status, roughly errno-shaped.
    pub fn exit_code(&self) -> u8 {
        match self {
            Error::Protocol(_) | Error::Mqtt(_) => 71, // EPROTO
            Error::ParseRule { .. } | Error::Config(_) => 22, // EINVAL
            Error::Format => 7, // E2BIG
            Error::Io(_) => 5, // EIO
        }
    }
}
