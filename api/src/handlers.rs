//! Request handlers.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::Json;
use votesync_types::{Address, CandidateRecord, PollId, PollRecord};

use crate::dto::{
    CandidateEntry, HealthResponse, PollDetail, PollSummary, VoteEntry, VoteStat,
};
use crate::{ApiError, ApiState};

fn parse_poll_id(raw: &str) -> Result<PollId, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::InvalidRequest(format!("invalid poll id: {raw}")))
}

fn find_poll(state: &ApiState, raw: &str) -> Result<PollRecord, ApiError> {
    let poll_id = parse_poll_id(raw)?;
    state
        .stores
        .polls
        .poll_by_id(poll_id)?
        .ok_or_else(|| ApiError::PollNotFound(raw.to_string()))
}

fn linked_candidates(state: &ApiState, poll: &Address) -> Result<Vec<CandidateRecord>, ApiError> {
    Ok(state.stores.candidates.candidates_for_poll(poll)?)
}

fn by_votes_desc(candidates: &mut [CandidateRecord]) {
    candidates.sort_by(|a, b| b.votes.cmp(&a.votes).then_with(|| a.name.cmp(&b.name)));
}

// ── Polls ────────────────────────────────────────────────────────────────

pub async fn list_polls(
    State(state): State<Arc<ApiState>>,
) -> Result<Json<Vec<PollSummary>>, ApiError> {
    let now = state.clock.now().as_secs();
    let mut polls = state.stores.polls.iter_polls()?;
    polls.sort_by_key(|p| (p.poll_id, p.address));

    let mut out = Vec::with_capacity(polls.len());
    for poll in &polls {
        let candidates = linked_candidates(&state, &poll.address)?;
        out.push(PollSummary::new(poll, &candidates, now));
    }
    Ok(Json(out))
}

pub async fn get_poll(
    Path(poll_id): Path<String>,
    State(state): State<Arc<ApiState>>,
) -> Result<Json<PollDetail>, ApiError> {
    let poll = find_poll(&state, &poll_id)?;
    let candidates = linked_candidates(&state, &poll.address)?;
    Ok(Json(PollDetail {
        summary: PollSummary::new(&poll, &candidates, state.clock.now().as_secs()),
        candidates: candidates.iter().map(CandidateEntry::from).collect(),
    }))
}

pub async fn leaderboard(
    Path(poll_id): Path<String>,
    State(state): State<Arc<ApiState>>,
) -> Result<Json<Vec<CandidateEntry>>, ApiError> {
    let id = parse_poll_id(&poll_id)?;
    let Some(poll) = state.stores.polls.poll_by_id(id)? else {
        return Ok(Json(Vec::new()));
    };
    let mut candidates = linked_candidates(&state, &poll.address)?;
    by_votes_desc(&mut candidates);
    Ok(Json(candidates.iter().map(CandidateEntry::from).collect()))
}

// ── Votes ────────────────────────────────────────────────────────────────

pub async fn poll_votes(
    Path(poll_id): Path<String>,
    State(state): State<Arc<ApiState>>,
) -> Result<Json<Vec<VoteEntry>>, ApiError> {
    let votes = state.stores.votes.votes_for_poll(parse_poll_id(&poll_id)?)?;
    Ok(Json(votes.iter().map(VoteEntry::from).collect()))
}

pub async fn vote_stats(
    Path(poll_id): Path<String>,
    State(state): State<Arc<ApiState>>,
) -> Result<Json<Vec<VoteStat>>, ApiError> {
    let votes = state.stores.votes.votes_for_poll(parse_poll_id(&poll_id)?)?;
    let mut counts: HashMap<Address, u64> = HashMap::new();
    for vote in &votes {
        *counts.entry(vote.candidate).or_default() += 1;
    }
    let mut stats: Vec<(Address, u64)> = counts.into_iter().collect();
    stats.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    Ok(Json(
        stats
            .into_iter()
            .map(|(candidate, count)| VoteStat {
                candidate: candidate.to_string(),
                count: count.to_string(),
            })
            .collect(),
    ))
}

pub async fn voter_votes(
    Path((poll_id, voter)): Path<(String, String)>,
    State(state): State<Arc<ApiState>>,
) -> Result<Json<Vec<VoteEntry>>, ApiError> {
    let votes = state
        .stores
        .votes
        .votes_by_voter(parse_poll_id(&poll_id)?, &voter)?;
    Ok(Json(votes.iter().map(VoteEntry::from).collect()))
}

// ── Node ─────────────────────────────────────────────────────────────────

pub async fn health(State(state): State<Arc<ApiState>>) -> Result<Json<HealthResponse>, ApiError> {
    Ok(Json(HealthResponse {
        status: "ok",
        polls: state.stores.polls.poll_count()?.to_string(),
        candidates: state.stores.candidates.candidate_count()?.to_string(),
        votes: state.stores.votes.vote_count()?.to_string(),
    }))
}

pub async fn metrics(State(state): State<Arc<ApiState>>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.encode_text(),
    )
}
