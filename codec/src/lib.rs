//! Decoding of raw ledger payloads into typed snapshots and events.
//!
//! Two inputs arrive from the ledger: account buffers (tagged, Borsh-encoded
//! structs) and transaction log lines (events emitted as base64
//! `Program data:` lines). This crate turns both into the types defined in
//! `votesync-types`, rejecting anything that does not match the program's
//! layout.

pub mod account;
pub mod error;
pub mod event;

pub use account::{decode_account, decode_candidate, decode_poll, DecodedAccount};
pub use error::DecodeError;
pub use event::{program_data, vote_events, ProgramData, ProgramEvent, RawVoteEvent, VOTE_EVENT_NAME};
