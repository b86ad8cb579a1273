//! LMDB storage backend for the votesync mirror.
//!
//! Implements the storage traits from `votesync-store` using the `heed` LMDB
//! bindings. Each logical store maps to one or more LMDB databases within a
//! single environment.

pub mod candidate;
pub mod environment;
pub mod error;
mod keys;
pub mod poll;
pub mod vote;

pub use candidate::LmdbCandidateStore;
pub use environment::LmdbEnvironment;
pub use error::LmdbError;
pub use poll::LmdbPollStore;
pub use vote::LmdbVoteStore;
