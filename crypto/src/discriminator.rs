//! Account and event type tags.
//!
//! The voting program prefixes every account with `sha256("account:" + kind)[..8]`
//! and every emitted event with `sha256("event:" + name)[..8]`.

use std::fmt;

use crate::hash::sha256_multi;

pub const DISCRIMINATOR_LEN: usize = 8;

/// Account kinds the mirror understands.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AccountKind {
    Poll,
    Candidate,
}

impl AccountKind {
    pub const ALL: [AccountKind; 2] = [AccountKind::Poll, AccountKind::Candidate];

    /// The on-chain type name the tag is derived from.
    pub fn type_name(&self) -> &'static str {
        match self {
            AccountKind::Poll => "PollAccount",
            AccountKind::Candidate => "CandidateAccount",
        }
    }

    pub fn discriminator(&self) -> [u8; DISCRIMINATOR_LEN] {
        account_discriminator(self.type_name())
    }

    /// Route a raw account buffer to the kind whose tag it carries.
    pub fn classify(data: &[u8]) -> Option<AccountKind> {
        Self::ALL
            .into_iter()
            .find(|kind| is_account_of_kind(data, kind.type_name()))
    }
}

impl fmt::Display for AccountKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

fn tag(namespace: &str, name: &str) -> [u8; DISCRIMINATOR_LEN] {
    let hash = sha256_multi(&[namespace.as_bytes(), b":", name.as_bytes()]);
    let mut out = [0u8; DISCRIMINATOR_LEN];
    out.copy_from_slice(&hash[..DISCRIMINATOR_LEN]);
    out
}

pub fn account_discriminator(kind_name: &str) -> [u8; DISCRIMINATOR_LEN] {
    tag("account", kind_name)
}

pub fn event_discriminator(event_name: &str) -> [u8; DISCRIMINATOR_LEN] {
    tag("event", event_name)
}

/// True iff the buffer's first 8 bytes are the tag of `kind_name`.
pub fn is_account_of_kind(data: &[u8], kind_name: &str) -> bool {
    data.len() >= DISCRIMINATOR_LEN
        && data[..DISCRIMINATOR_LEN] == account_discriminator(kind_name)
}
