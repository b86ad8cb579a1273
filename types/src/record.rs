//! Persisted record shapes for the three mirrored record kinds.

use serde::{Deserialize, Serialize};

use crate::{Address, CandidateSnapshot, PollId, PollSnapshot};

/// A mirrored `PollAccount`, keyed by its address.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollRecord {
    pub address: Address,
    /// `None` until the poll's numeric id is known.
    pub poll_id: Option<PollId>,
    pub name: String,
    pub description: String,
    pub voting_start: u64,
    pub voting_end: u64,
    pub option_index: u64,
}

impl PollRecord {
    pub fn from_snapshot(address: Address, snapshot: &PollSnapshot) -> Self {
        Self {
            address,
            poll_id: Some(PollId::new(snapshot.poll_id)),
            name: snapshot.name.clone(),
            description: snapshot.description.clone(),
            voting_start: snapshot.voting_start,
            voting_end: snapshot.voting_end,
            option_index: snapshot.option_index,
        }
    }

    /// Row created from a vote event before the poll account itself was seen.
    pub fn placeholder(address: Address, poll_id: PollId) -> Self {
        Self {
            address,
            poll_id: Some(poll_id),
            name: String::new(),
            description: String::new(),
            voting_start: 0,
            voting_end: 0,
            option_index: 0,
        }
    }

    /// Overwrite every decoded field in place. The address never changes.
    pub fn apply(&mut self, snapshot: &PollSnapshot) {
        self.poll_id = Some(PollId::new(snapshot.poll_id));
        self.name.clone_from(&snapshot.name);
        self.description.clone_from(&snapshot.description);
        self.voting_start = snapshot.voting_start;
        self.voting_end = snapshot.voting_end;
        self.option_index = snapshot.option_index;
    }
}

/// Which poll a candidate belongs to, if that has been established.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CandidateLink {
    Unlinked,
    Linked {
        poll_address: Address,
        poll_id: PollId,
    },
}

/// A mirrored `CandidateAccount`, keyed by its address.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateRecord {
    pub address: Address,
    pub name: String,
    pub votes: u64,
    pub link: CandidateLink,
}

impl CandidateRecord {
    pub fn unlinked(address: Address, snapshot: &CandidateSnapshot) -> Self {
        Self {
            address,
            name: snapshot.name.clone(),
            votes: snapshot.votes,
            link: CandidateLink::Unlinked,
        }
    }

    pub fn poll_id(&self) -> Option<PollId> {
        match self.link {
            CandidateLink::Linked { poll_id, .. } => Some(poll_id),
            CandidateLink::Unlinked => None,
        }
    }

    pub fn poll_address(&self) -> Option<Address> {
        match self.link {
            CandidateLink::Linked { poll_address, .. } => Some(poll_address),
            CandidateLink::Unlinked => None,
        }
    }

    pub fn is_linked(&self) -> bool {
        matches!(self.link, CandidateLink::Linked { .. })
    }

    /// Transition `Unlinked -> Linked`. Returns `false` and leaves the record
    /// untouched if it is already linked.
    pub fn link(&mut self, poll_address: Address, poll_id: PollId) -> bool {
        if self.is_linked() {
            return false;
        }
        self.link = CandidateLink::Linked {
            poll_address,
            poll_id,
        };
        true
    }
}

/// A vote about to be appended; the store assigns the id.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewVote {
    pub poll_id: PollId,
    pub candidate: Address,
    pub voter: String,
    pub signature: String,
    pub slot: u64,
    pub block_time: u64,
}

/// An appended, immutable vote.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteRecord {
    pub id: u64,
    pub poll_id: PollId,
    pub candidate: Address,
    pub voter: String,
    pub signature: String,
    pub slot: u64,
    pub block_time: u64,
}

impl VoteRecord {
    pub fn from_new(id: u64, vote: NewVote) -> Self {
        Self {
            id,
            poll_id: vote.poll_id,
            candidate: vote.candidate,
            voter: vote.voter,
            signature: vote.signature,
            slot: vote.slot,
            block_time: vote.block_time,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(b: u8) -> Address {
        Address::new([b; 32])
    }

    #[test]
    fn link_only_transitions_from_unlinked() {
        let mut c = CandidateRecord::unlinked(
            addr(1),
            &CandidateSnapshot {
                name: "Alice".into(),
                votes: 3,
            },
        );
        assert!(!c.is_linked());
        assert!(c.link(addr(2), PollId::new(7)));
        assert_eq!(c.poll_id(), Some(PollId::new(7)));

        assert!(!c.link(addr(3), PollId::new(8)));
        assert_eq!(c.poll_address(), Some(addr(2)));
        assert_eq!(c.poll_id(), Some(PollId::new(7)));
    }

    #[test]
    fn apply_overwrites_placeholder_fields() {
        let mut p = PollRecord::placeholder(addr(9), PollId::new(7));
        assert!(p.name.is_empty());
        p.apply(&PollSnapshot {
            poll_id: 7,
            name: "Lunch".into(),
            description: "Where to eat".into(),
            voting_start: 1000,
            voting_end: 2000,
            option_index: 2,
        });
        assert_eq!(p.address, addr(9));
        assert_eq!(p.name, "Lunch");
        assert_eq!(p.voting_end, 2000);
    }
}
