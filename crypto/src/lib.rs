//! Cryptographic primitives for the votesync ledger mirror.
//!
//! - **SHA-256** for account/event tags and program-address hashing
//! - **Ed25519** point decompression to reject on-curve derived addresses
//! - Program-derived addresses for polls and candidates

pub mod address;
pub mod discriminator;
pub mod error;
pub mod hash;

pub use address::{
    create_program_address, find_program_address, AddressDeriver, MAX_SEEDS, MAX_SEED_LEN,
    POLL_SEED_PREFIX,
};
pub use discriminator::{
    account_discriminator, event_discriminator, is_account_of_kind, AccountKind,
    DISCRIMINATOR_LEN,
};
pub use error::DeriveError;
pub use hash::{sha256, sha256_multi};
