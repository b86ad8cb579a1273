use serde::Serialize;

/// Where `now` falls relative to a poll's voting window.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PollStatus {
    Upcoming,
    Active,
    Ended,
}

impl PollStatus {
    /// Both window bounds are inclusive.
    pub fn at(start: u64, end: u64, now: u64) -> Self {
        if now < start {
            PollStatus::Upcoming
        } else if now <= end {
            PollStatus::Active
        } else {
            PollStatus::Ended
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_follows_the_window() {
        assert_eq!(PollStatus::at(1000, 2000, 500), PollStatus::Upcoming);
        assert_eq!(PollStatus::at(1000, 2000, 1500), PollStatus::Active);
        assert_eq!(PollStatus::at(1000, 2000, 2500), PollStatus::Ended);
    }

    #[test]
    fn window_bounds_are_active() {
        assert_eq!(PollStatus::at(1000, 2000, 1000), PollStatus::Active);
        assert_eq!(PollStatus::at(1000, 2000, 2000), PollStatus::Active);
        assert_eq!(PollStatus::at(1000, 2000, 2001), PollStatus::Ended);
    }

    #[test]
    fn placeholder_window_reads_as_ended() {
        assert_eq!(PollStatus::at(0, 0, 1), PollStatus::Ended);
    }

    #[test]
    fn serializes_upper_case() {
        assert_eq!(
            serde_json::to_string(&PollStatus::Upcoming).unwrap(),
            "\"UPCOMING\""
        );
    }
}
