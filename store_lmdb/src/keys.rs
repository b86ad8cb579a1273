//! Binary key layouts.
//!
//! All integers are big-endian so LMDB's lexicographic order matches numeric
//! order, and every address is exactly 32 bytes, so prefix scans over a
//! leading address or id are exact.

use votesync_types::{Address, PollId};

use crate::LmdbError;

/// `poll_address ++ candidate_address`
pub(crate) fn candidate_by_poll_key(poll: &Address, candidate: &Address) -> Vec<u8> {
    let mut key = Vec::with_capacity(Address::LEN * 2);
    key.extend_from_slice(poll.as_bytes());
    key.extend_from_slice(candidate.as_bytes());
    key
}

/// `poll_id ++ slot ++ vote_id`
pub(crate) fn vote_by_poll_key(poll_id: PollId, slot: u64, id: u64) -> Vec<u8> {
    let mut key = Vec::with_capacity(24);
    key.extend_from_slice(&poll_id.to_be_bytes());
    key.extend_from_slice(&slot.to_be_bytes());
    key.extend_from_slice(&id.to_be_bytes());
    key
}

pub(crate) fn be_u64(bytes: &[u8]) -> Result<u64, LmdbError> {
    let arr: [u8; 8] = bytes
        .try_into()
        .map_err(|_| LmdbError::Corruption(format!("expected 8 bytes, got {}", bytes.len())))?;
    Ok(u64::from_be_bytes(arr))
}

pub(crate) fn address_at(key: &[u8], offset: usize) -> Result<Address, LmdbError> {
    key.get(offset..offset + Address::LEN)
        .and_then(|b| Address::from_slice(b).ok())
        .ok_or_else(|| LmdbError::Corruption(format!("short address key ({} bytes)", key.len())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vote_keys_sort_by_slot_then_id() {
        let p = PollId::new(7);
        let mut keys = vec![
            vote_by_poll_key(p, 300, 1),
            vote_by_poll_key(p, 100, 9),
            vote_by_poll_key(p, 100, 2),
            vote_by_poll_key(p, 256, 3),
        ];
        keys.sort();
        let order: Vec<u64> = keys.iter().map(|k| be_u64(&k[16..]).unwrap()).collect();
        assert_eq!(order, vec![2, 9, 3, 1]);
    }

    #[test]
    fn address_at_reads_second_half() {
        let key = candidate_by_poll_key(&Address::new([1; 32]), &Address::new([2; 32]));
        assert_eq!(address_at(&key, 32).unwrap(), Address::new([2; 32]));
        assert!(address_at(&key[..40], 32).is_err());
    }
}
