//! Event decoder and validator.
//!
//! Events are emitted into the transaction log as `Program data: <base64>`
//! lines (or `Program log: <base64>` on older Anchor versions) whose payload is `sha256("event:" + name)[..8] ‖ borsh(body)`. Only
//! lines written while the configured program is the innermost invocation
//! are considered, so a CPI into another program cannot spoof our events.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use borsh::BorshDeserialize;
use tracing::debug;
use votesync_crypto::{event_discriminator, DISCRIMINATOR_LEN};
use votesync_types::{Address, VoteEvent};

use crate::DecodeError;

pub const VOTE_EVENT_NAME: &str = "VoteEvent";

const PROGRAM_PREFIX: &str = "Program ";
const DATA_PREFIX: &str = "Program data: ";
const LOG_PREFIX: &str = "Program log: ";
const RETURN_PREFIX: &str = "Program return: ";

/// Borsh body of a `VoteEvent`.
#[derive(Clone, Debug, PartialEq, Eq, BorshDeserialize)]
#[cfg_attr(test, derive(borsh::BorshSerialize))]
pub struct RawVoteEvent {
    pub poll_id: u64,
    pub candidate: String,
    pub voter: [u8; 32],
    pub slot: u64,
}

impl RawVoteEvent {
    /// Coerce every field to its string form and keep the event only if all
    /// four are non-empty.
    pub fn validate(self) -> Option<VoteEvent> {
        let event = VoteEvent::new(
            self.poll_id.to_string(),
            self.candidate,
            Address::new(self.voter).to_string(),
            self.slot.to_string(),
        );
        let complete = !event.poll_id.is_empty()
            && !event.candidate.is_empty()
            && !event.voter.is_empty()
            && !event.slot.is_empty();
        complete.then_some(event)
    }
}

/// A decoded `Program data:` payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProgramEvent {
    Vote(RawVoteEvent),
    /// An event this mirror does not track.
    Other { discriminator: [u8; DISCRIMINATOR_LEN] },
}

impl ProgramEvent {
    pub fn decode(payload: &[u8]) -> Result<Self, DecodeError> {
        if payload.len() < DISCRIMINATOR_LEN {
            return Err(DecodeError::TooShort {
                kind: "event",
                len: payload.len(),
            });
        }
        let (tag, mut body) = payload.split_at(DISCRIMINATOR_LEN);
        if tag == event_discriminator(VOTE_EVENT_NAME) {
            let raw = RawVoteEvent::deserialize(&mut body).map_err(|e| DecodeError::Layout {
                kind: VOTE_EVENT_NAME,
                reason: e.to_string(),
            })?;
            return Ok(ProgramEvent::Vote(raw));
        }
        let mut discriminator = [0u8; DISCRIMINATOR_LEN];
        discriminator.copy_from_slice(tag);
        Ok(ProgramEvent::Other { discriminator })
    }
}

/// Iterator over the decoded base64 payloads our program emitted.
pub struct ProgramData<'a> {
    program_id: String,
    lines: std::slice::Iter<'a, String>,
    stack: Vec<&'a str>,
}

impl<'a> Iterator for ProgramData<'a> {
    type Item = Result<Vec<u8>, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        for line in self.lines.by_ref() {
            if let Some(encoded) = line.strip_prefix(DATA_PREFIX) {
                if self.stack.last() != Some(&self.program_id.as_str()) {
                    continue;
                }
                return Some(
                    BASE64
                        .decode(encoded.trim())
                        .map_err(|e| DecodeError::ProgramData(e.to_string())),
                );
            }

            // Older Anchor versions emit events through `msg!`. Plain log
            // text is never an error.
            if let Some(message) = line.strip_prefix(LOG_PREFIX) {
                if self.stack.last() != Some(&self.program_id.as_str()) {
                    continue;
                }
                match BASE64.decode(message.trim()) {
                    Ok(bytes) if bytes.len() >= DISCRIMINATOR_LEN => return Some(Ok(bytes)),
                    _ => continue,
                }
            }

            if line.starts_with(RETURN_PREFIX) {
                continue;
            }

            match StackLine::parse(line) {
                Some(StackLine::Invoke(id)) => self.stack.push(id),
                Some(StackLine::Exit) => {
                    self.stack.pop();
                }
                None => {}
            }
        }
        None
    }
}

/// A runtime line that moves the invocation stack.
enum StackLine<'a> {
    Invoke(&'a str),
    Exit,
}

impl<'a> StackLine<'a> {
    /// Recognise `Program <id> invoke [n]`, `Program <id> success` and
    /// `Program <id> failed: ...`. The id must be a valid address.
    fn parse(line: &'a str) -> Option<Self> {
        let rest = line.strip_prefix(PROGRAM_PREFIX)?;
        let (id, tail) = rest.split_once(' ')?;
        id.parse::<Address>().ok()?;
        if let Some(depth) = tail.strip_prefix("invoke [") {
            let depth = depth.strip_suffix(']')?;
            depth.parse::<u32>().ok()?;
            return Some(StackLine::Invoke(id));
        }
        if tail == "success" || tail.starts_with("failed:") {
            return Some(StackLine::Exit);
        }
        None
    }
}

/// Lazily decode the `Program data:` payloads emitted by `program_id`.
pub fn program_data<'a>(program_id: &Address, logs: &'a [String]) -> ProgramData<'a> {
    ProgramData {
        program_id: program_id.to_string(),
        lines: logs.iter(),
        stack: Vec::new(),
    }
}

/// Lazily extract the validated vote events from one transaction's logs.
///
/// Malformed payloads and incomplete events are skipped.
pub fn vote_events<'a>(
    program_id: &Address,
    logs: &'a [String],
) -> impl Iterator<Item = VoteEvent> + 'a {
    program_data(program_id, logs).filter_map(|payload| {
        let decoded = payload.and_then(|bytes| ProgramEvent::decode(&bytes));
        match decoded {
            Ok(ProgramEvent::Vote(raw)) => {
                let event = raw.validate();
                if event.is_none() {
                    debug!("discarding incomplete vote event");
                }
                event
            }
            Ok(ProgramEvent::Other { .. }) => None,
            Err(e) => {
                debug!(error = %e, "skipping undecodable program data");
                None
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use borsh::BorshSerialize;

    const PROGRAM: &str = "4Dgb9aQU2aDmYz5FbR1ZxYqNZ1KqSKD9uF8P3oVfRpLs";
    const OTHER: &str = "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA";

    fn program() -> Address {
        PROGRAM.parse().unwrap()
    }

    fn vote_line(poll_id: u64, candidate: &str, slot: u64) -> String {
        let mut payload = event_discriminator(VOTE_EVENT_NAME).to_vec();
        RawVoteEvent {
            poll_id,
            candidate: candidate.into(),
            voter: [7u8; 32],
            slot,
        }
        .serialize(&mut payload)
        .unwrap();
        format!("{DATA_PREFIX}{}", BASE64.encode(payload))
    }

    fn invoke(id: &str) -> String {
        format!("Program {id} invoke [1]")
    }

    fn success(id: &str) -> String {
        format!("Program {id} success")
    }

    #[test]
    fn extracts_vote_event_from_our_frame() {
        let logs = vec![
            invoke(PROGRAM),
            "Program log: Instruction: Vote".to_string(),
            vote_line(7, "Alice", 100),
            format!("Program {PROGRAM} consumed 5000 of 200000 compute units"),
            success(PROGRAM),
        ];
        let events: Vec<_> = vote_events(&program(), &logs).collect();
        assert_eq!(events.len(), 1);
        let e = &events[0];
        assert_eq!(e.poll_id, "7");
        assert_eq!(e.candidate, "Alice");
        assert_eq!(e.voter, Address::new([7u8; 32]).to_string());
        assert_eq!(e.slot, "100");
    }

    #[test]
    fn ignores_data_from_other_programs() {
        let logs = vec![
            invoke(PROGRAM),
            format!("Program {OTHER} invoke [2]"),
            vote_line(1, "Spoofed", 1),
            "Program log: success".to_string(),
            vote_line(1, "AfterFakeSuccess", 1),
            format!("Program log: {OTHER} success"),
            "Program return: success".to_string(),
            vote_line(1, "AfterFakeReturn", 1),
            success(OTHER),
            vote_line(2, "Real", 2),
            success(PROGRAM),
            vote_line(3, "Outside", 3),
        ];
        let names: Vec<_> = vote_events(&program(), &logs).map(|e| e.candidate).collect();
        assert_eq!(names, vec!["Real"]);
    }

    #[test]
    fn logged_stack_verbs_do_not_push_frames() {
        let logs = vec![
            invoke(OTHER),
            format!("Program log: {PROGRAM} invoke [2]"),
            format!("Program data: {PROGRAM} invoke [2]"),
            "Program notanaddress invoke [2]".to_string(),
            format!("Program {PROGRAM} invoke [x]"),
            vote_line(1, "Spoofed", 1),
            success(OTHER),
        ];
        assert_eq!(vote_events(&program(), &logs).count(), 0);
    }

    #[test]
    fn legacy_log_lines_carry_events() {
        let legacy = vote_line(9, "Legacy", 9).replacen(DATA_PREFIX, LOG_PREFIX, 1);
        let logs = vec![
            invoke(PROGRAM),
            "Program log: Instruction: Vote".to_string(),
            "Program log: Vote".to_string(),
            legacy.clone(),
            success(PROGRAM),
            legacy,
        ];
        let names: Vec<_> = vote_events(&program(), &logs).map(|e| e.candidate).collect();
        assert_eq!(names, vec!["Legacy"]);
    }

    #[test]
    fn failed_frame_is_popped() {
        let logs = vec![
            invoke(PROGRAM),
            format!("Program {OTHER} invoke [2]"),
            format!("Program {OTHER} failed: custom program error: 0x1"),
            vote_line(4, "AfterFailure", 4),
            success(PROGRAM),
        ];
        assert_eq!(vote_events(&program(), &logs).count(), 1);
    }

    #[test]
    fn skips_incomplete_and_undecodable_payloads() {
        let mut unknown = event_discriminator("PollCreated").to_vec();
        unknown.extend_from_slice(&[1, 2, 3]);
        let logs = vec![
            invoke(PROGRAM),
            vote_line(5, "", 5),
            format!("{DATA_PREFIX}not-base64!!"),
            format!("{DATA_PREFIX}{}", BASE64.encode([1u8, 2])),
            format!("{DATA_PREFIX}{}", BASE64.encode(&unknown)),
            vote_line(5, "Bob", 6),
            success(PROGRAM),
        ];
        let events: Vec<_> = vote_events(&program(), &logs).collect();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].candidate, "Bob");
    }

    #[test]
    fn event_name_match_is_exact() {
        let mut payload = event_discriminator("voteEvent").to_vec();
        payload.extend_from_slice(&[0u8; 48]);
        assert!(matches!(
            ProgramEvent::decode(&payload),
            Ok(ProgramEvent::Other { .. })
        ));
    }

    #[test]
    fn decoding_is_lazy() {
        let logs = vec![
            invoke(PROGRAM),
            vote_line(1, "First", 1),
            format!("{DATA_PREFIX}%%%"),
            vote_line(2, "Second", 2),
            success(PROGRAM),
        ];
        let mut data = program_data(&program(), &logs);
        assert!(data.next().unwrap().is_ok());
        assert!(data.next().unwrap().is_err());
        assert!(data.next().unwrap().is_ok());
        assert!(data.next().is_none());
    }
}
