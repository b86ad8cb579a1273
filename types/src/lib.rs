//! Fundamental types for the votesync ledger mirror.
//!
//! This crate defines the types shared across every other crate in the workspace:
//! ledger addresses, poll identifiers, timestamps, decoded snapshots and the
//! persisted record shapes.

pub mod address;
pub mod error;
pub mod poll_id;
pub mod record;
pub mod snapshot;
pub mod time;

pub use address::Address;
pub use error::TypesError;
pub use poll_id::PollId;
pub use record::{CandidateLink, CandidateRecord, NewVote, PollRecord, VoteRecord};
pub use snapshot::{CandidateSnapshot, PollSnapshot, TxMeta, VoteEvent};
pub use time::{Clock, SystemClock, Timestamp};
