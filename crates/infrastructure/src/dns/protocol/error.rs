use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Malformed DNS message: {0}")]
    Parse(String),

    #[error("Failed to encode DNS message: {0}")]
    Encode(String),

    #[error("Frame of {0} bytes exceeds the 65535 byte limit")]
    FrameTooLarge(usize),

    #[error("Read timed out")]
    ReadTimeout,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
