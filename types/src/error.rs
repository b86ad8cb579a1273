//! Error type for parsing the fundamental types.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypesError {
    #[error("invalid ledger address: {0}")]
    InvalidAddress(String),

    #[error("invalid poll id: {0}")]
    InvalidPollId(String),
}
