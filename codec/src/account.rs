//! Account decoder.
//!
//! Layouts follow the tag with Borsh-encoded fields. Strings are a `u32`
//! little-endian length followed by UTF-8 bytes. Accounts are allocated with
//! spare space, so trailing bytes after the last field are ignored.

use borsh::BorshDeserialize;
use votesync_crypto::{AccountKind, DISCRIMINATOR_LEN};
use votesync_types::{CandidateSnapshot, PollSnapshot};

use crate::DecodeError;

#[derive(BorshDeserialize)]
#[cfg_attr(test, derive(borsh::BorshSerialize))]
pub(crate) struct PollAccountLayout {
    pub poll_id: u64,
    pub poll_name: String,
    pub poll_description: String,
    pub poll_voting_start: u64,
    pub poll_voting_end: u64,
    pub poll_option_index: u64,
}

#[derive(BorshDeserialize)]
#[cfg_attr(test, derive(borsh::BorshSerialize))]
pub(crate) struct CandidateAccountLayout {
    pub candidate_name: String,
    pub candidate_votes: u64,
}

/// A decoded account of either kind.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DecodedAccount {
    Poll(PollSnapshot),
    Candidate(CandidateSnapshot),
}

impl DecodedAccount {
    pub fn kind(&self) -> AccountKind {
        match self {
            DecodedAccount::Poll(_) => AccountKind::Poll,
            DecodedAccount::Candidate(_) => AccountKind::Candidate,
        }
    }
}

/// Strip and check the tag, then read a `T` from the remaining bytes.
fn decode_layout<T: BorshDeserialize>(kind: AccountKind, data: &[u8]) -> Result<T, DecodeError> {
    let name = kind.type_name();
    if data.len() < DISCRIMINATOR_LEN {
        return Err(DecodeError::TooShort {
            kind: name,
            len: data.len(),
        });
    }
    let (tag, mut body) = data.split_at(DISCRIMINATOR_LEN);
    if tag != kind.discriminator() {
        return Err(DecodeError::WrongTag { kind: name });
    }
    T::deserialize(&mut body).map_err(|e| DecodeError::Layout {
        kind: name,
        reason: e.to_string(),
    })
}

pub fn decode_poll(data: &[u8]) -> Result<PollSnapshot, DecodeError> {
    let raw: PollAccountLayout = decode_layout(AccountKind::Poll, data)?;
    Ok(PollSnapshot {
        poll_id: raw.poll_id,
        name: raw.poll_name,
        description: raw.poll_description,
        voting_start: raw.poll_voting_start,
        voting_end: raw.poll_voting_end,
        option_index: raw.poll_option_index,
    })
}

pub fn decode_candidate(data: &[u8]) -> Result<CandidateSnapshot, DecodeError> {
    let raw: CandidateAccountLayout = decode_layout(AccountKind::Candidate, data)?;
    Ok(CandidateSnapshot {
        name: raw.candidate_name,
        votes: raw.candidate_votes,
    })
}

/// Decode an already-classified buffer as `kind`.
pub fn decode_account(kind: AccountKind, data: &[u8]) -> Result<DecodedAccount, DecodeError> {
    match kind {
        AccountKind::Poll => decode_poll(data).map(DecodedAccount::Poll),
        AccountKind::Candidate => decode_candidate(data).map(DecodedAccount::Candidate),
    }
}
