use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("{kind} buffer too short: {len} bytes")]
    TooShort { kind: &'static str, len: usize },

    #[error("buffer is not a {kind}: tag mismatch")]
    WrongTag { kind: &'static str },

    #[error("{kind} layout mismatch: {reason}")]
    Layout { kind: &'static str, reason: String },

    #[error("malformed program data: {0}")]
    ProgramData(String),
}
