use proptest::prelude::*;
use votesync_codec::{decode_candidate, decode_poll, vote_events, ProgramEvent};
use votesync_crypto::AccountKind;
use votesync_types::Address;

proptest! {
    #[test]
    fn account_decoding_never_panics(tail in proptest::collection::vec(any::<u8>(), 0..128)) {
        let mut poll = AccountKind::Poll.discriminator().to_vec();
        poll.extend_from_slice(&tail);
        let _ = decode_poll(&poll);

        let mut candidate = AccountKind::Candidate.discriminator().to_vec();
        candidate.extend_from_slice(&tail);
        let _ = decode_candidate(&candidate);
    }

    #[test]
    fn candidate_layout_decodes_any_name(name in "[a-zA-Z0-9 ]{0,32}", votes in any::<u64>()) {
        let mut data = AccountKind::Candidate.discriminator().to_vec();
        data.extend_from_slice(&(name.len() as u32).to_le_bytes());
        data.extend_from_slice(name.as_bytes());
        data.extend_from_slice(&votes.to_le_bytes());
        let snap = decode_candidate(&data).unwrap();
        prop_assert_eq!(snap.name, name);
        prop_assert_eq!(snap.votes, votes);
    }

    #[test]
    fn event_payload_decoding_never_panics(payload in proptest::collection::vec(any::<u8>(), 0..96)) {
        let _ = ProgramEvent::decode(&payload);
    }

    #[test]
    fn arbitrary_log_lines_yield_no_events(lines in proptest::collection::vec("Program [a-z ]{0,20}", 0..16)) {
        let program = Address::new([3u8; 32]);
        prop_assert_eq!(vote_events(&program, &lines).count(), 0);
    }
}
