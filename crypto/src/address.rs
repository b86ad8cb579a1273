//! Program-derived addresses.
//!
//! Polls and candidates live at addresses the program derives from seed bytes,
//! so the mirror recomputes them to link a vote event to its candidate and to
//! test which poll an orphaned candidate belongs to.
//!
//! Seeds:
//! - candidate: `[poll_id.to_le_bytes(), name.as_bytes()]`
//! - poll: `[b"poll", poll_id.to_le_bytes()]`

use ed25519_dalek::VerifyingKey;
use votesync_types::{Address, PollId};

use crate::hash::sha256_multi;
use crate::DeriveError;

/// Maximum length of a single seed, in bytes.
pub const MAX_SEED_LEN: usize = 32;

/// Maximum number of seeds, including the bump seed.
pub const MAX_SEEDS: usize = 16;

/// Literal prefix seed of every poll account.
pub const POLL_SEED_PREFIX: &[u8] = b"poll";

const PDA_MARKER: &[u8] = b"ProgramDerivedAddress";

fn is_on_curve(bytes: &[u8; 32]) -> bool {
    VerifyingKey::from_bytes(bytes).is_ok()
}

/// Hash `seeds` with `program_id` into an address, rejecting results that are
/// valid ed25519 points (those could have a private key).
pub fn create_program_address(
    seeds: &[&[u8]],
    program_id: &Address,
) -> Result<Address, DeriveError> {
    if seeds.len() > MAX_SEEDS {
        return Err(DeriveError::TooManySeeds(seeds.len()));
    }
    if let Some(seed) = seeds.iter().find(|s| s.len() > MAX_SEED_LEN) {
        return Err(DeriveError::SeedTooLong {
            len: seed.len(),
            max: MAX_SEED_LEN,
        });
    }

    let mut parts: Vec<&[u8]> = Vec::with_capacity(seeds.len() + 2);
    parts.extend_from_slice(seeds);
    parts.push(program_id.as_bytes());
    parts.push(PDA_MARKER);
    let hash = sha256_multi(&parts);

    if is_on_curve(&hash) {
        return Err(DeriveError::OnCurve);
    }
    Ok(Address::new(hash))
}

/// Search bump seeds from 255 downwards and return the first off-curve
/// address together with its bump.
pub fn find_program_address(
    seeds: &[&[u8]],
    program_id: &Address,
) -> Result<(Address, u8), DeriveError> {
    if seeds.len() >= MAX_SEEDS {
        return Err(DeriveError::TooManySeeds(seeds.len() + 1));
    }
    for bump in (0..=u8::MAX).rev() {
        let bump_seed = [bump];
        let mut with_bump: Vec<&[u8]> = Vec::with_capacity(seeds.len() + 1);
        with_bump.extend_from_slice(seeds);
        with_bump.push(&bump_seed);
        match create_program_address(&with_bump, program_id) {
            Ok(address) => return Ok((address, bump)),
            Err(DeriveError::OnCurve) => continue,
            Err(e) => return Err(e),
        }
    }
    Err(DeriveError::NoViableBump)
}

/// Derives poll and candidate addresses for one program.
#[derive(Clone, Copy, Debug)]
pub struct AddressDeriver {
    program_id: Address,
}

impl AddressDeriver {
    pub fn new(program_id: Address) -> Self {
        Self { program_id }
    }

    pub fn program_id(&self) -> &Address {
        &self.program_id
    }

    /// Address of the candidate `name` in poll `poll_id` (a decimal string).
    pub fn candidate_address(&self, poll_id: &str, name: &str) -> Result<Address, DeriveError> {
        self.candidate_address_for(parse_poll_id(poll_id)?, name)
    }

    pub fn candidate_address_for(&self, poll_id: PollId, name: &str) -> Result<Address, DeriveError> {
        let id = poll_id.to_le_bytes();
        find_program_address(&[&id, name.as_bytes()], &self.program_id).map(|(a, _)| a)
    }

    /// Address of the poll account for `poll_id` (a decimal string).
    pub fn poll_address(&self, poll_id: &str) -> Result<Address, DeriveError> {
        self.poll_address_for(parse_poll_id(poll_id)?)
    }

    pub fn poll_address_for(&self, poll_id: PollId) -> Result<Address, DeriveError> {
        let id = poll_id.to_le_bytes();
        find_program_address(&[POLL_SEED_PREFIX, &id], &self.program_id).map(|(a, _)| a)
    }
}

fn parse_poll_id(poll_id: &str) -> Result<PollId, DeriveError> {
    poll_id
        .parse::<PollId>()
        .map_err(|_| DeriveError::InvalidSeed(poll_id.to_string()))
}
