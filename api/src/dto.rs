//! Response bodies. Every u64 is rendered as a decimal string.

use serde::Serialize;
use votesync_types::{CandidateRecord, PollRecord, VoteRecord};

use crate::PollStatus;

// ── Poll ─────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollSummary {
    pub poll_id: Option<String>,
    pub poll_account: String,
    pub name: String,
    pub description: String,
    pub start: String,
    pub end: String,
    pub status: PollStatus,
    pub total_votes: String,
}

impl PollSummary {
    /// `candidates` are the rows linked to `poll`.
    pub fn new(poll: &PollRecord, candidates: &[CandidateRecord], now: u64) -> Self {
        Self {
            poll_id: poll.poll_id.map(|id| id.to_string()),
            poll_account: poll.address.to_string(),
            name: poll.name.clone(),
            description: poll.description.clone(),
            start: poll.voting_start.to_string(),
            end: poll.voting_end.to_string(),
            status: PollStatus::at(poll.voting_start, poll.voting_end, now),
            total_votes: total_votes(candidates).to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollDetail {
    #[serde(flatten)]
    pub summary: PollSummary,
    pub candidates: Vec<CandidateEntry>,
}

/// Sum of candidate tallies, saturating.
pub fn total_votes(candidates: &[CandidateRecord]) -> u64 {
    candidates
        .iter()
        .fold(0u64, |sum, c| sum.saturating_add(c.votes))
}

// ── Candidate ────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateEntry {
    pub candidate_account: String,
    pub name: String,
    pub votes: String,
}

impl From<&CandidateRecord> for CandidateEntry {
    fn from(c: &CandidateRecord) -> Self {
        Self {
            candidate_account: c.address.to_string(),
            name: c.name.clone(),
            votes: c.votes.to_string(),
        }
    }
}

// ── Vote ─────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteEntry {
    pub id: String,
    pub poll_id: String,
    pub candidate_account: String,
    pub voter: String,
    pub tx: String,
    pub slot: String,
    pub block_time: String,
}

impl From<&VoteRecord> for VoteEntry {
    fn from(v: &VoteRecord) -> Self {
        Self {
            id: v.id.to_string(),
            poll_id: v.poll_id.to_string(),
            candidate_account: v.candidate.to_string(),
            voter: v.voter.clone(),
            tx: v.signature.clone(),
            slot: v.slot.to_string(),
            block_time: v.block_time.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct VoteStat {
    pub candidate: String,
    pub count: String,
}

// ── Health ───────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub polls: String,
    pub candidates: String,
    pub votes: String,
}
