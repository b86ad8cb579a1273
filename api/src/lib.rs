//! Read API for the votesync mirror.
//!
//! Serves, as JSON with camelCase keys:
//! - Poll listings with voting status and total votes
//! - Poll detail with its candidates
//! - Per-poll leaderboard, vote history and vote statistics
//! - Votes cast by one voter
//! - Health and Prometheus metrics

pub mod dto;
pub mod error;
pub mod handlers;
pub mod server;
pub mod status;

pub use error::ApiError;
pub use server::{router, ApiServer, ApiState};
pub use status::PollStatus;
