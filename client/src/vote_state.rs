//! Client side copy of the running vote.

use shared::{VoteResult, VoteState};

#[derive(Debug, Default)]
pub struct VoteTracker {
    current: Option<VoteState>,
    /// Last finished vote, kept for the status command.
    last: Option<VoteState>,
}

impl VoteTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores an update from the server. A finished vote clears the running
    /// one.
    pub fn apply(&mut self, state: VoteState) {
        if state.result.is_terminal() {
            self.current = None;
            self.last = Some(state);
        } else {
            self.current = Some(state);
        }
    }

    pub fn current(&self) -> Option<&VoteState> {
        self.current.as_ref()
    }

    pub fn last(&self) -> Option<&VoteState> {
        self.last.as_ref()
    }

    pub fn is_active(&self) -> bool {
        self.current.is_some()
    }

    /// One line summary of the running vote, or of the last one.
    pub fn summary(&self) -> String {
        match (&self.current, &self.last) {
            (Some(state), _) => format_state(state),
            (None, Some(state)) => format!("No vote running. Last: {}", format_state(state)),
            (None, None) => "No vote running.".to_string(),
        }
    }
}

pub fn format_state(state: &VoteState) -> String {
    let head = match state.result {
        VoteResult::Undecided => format!("Vote: {}", state.description),
        VoteResult::Yes => format!("Vote passed: {}", state.description),
        VoteResult::No => format!("Vote failed: {}", state.description),
        VoteResult::Interrupted => format!("Vote interrupted: {}", state.description),
        VoteResult::Abandoned => format!("Vote abandoned: {}", state.description),
    };

    let mut line = format!(
        "{} | Yes {}/{} | No {}/{} | {} undecided",
        head, state.yes, state.yes_needed, state.no, state.no_needed, state.abstain
    );
    if state.result == VoteResult::Undecided {
        line.push_str(&format!(" | {}s left", state.seconds_left()));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::TICRATE;

    fn state(result: VoteResult, countdown: u32) -> VoteState {
        VoteState {
            result,
            description: "fraglimit 30".to_string(),
            countdown,
            yes: 1,
            yes_needed: 2,
            no: 0,
            no_needed: 2,
            abstain: 2,
        }
    }

    #[test]
    fn test_tracks_running_vote() {
        let mut tracker = VoteTracker::new();
        assert!(!tracker.is_active());
        assert_eq!(tracker.summary(), "No vote running.");

        tracker.apply(state(VoteResult::Undecided, 30 * TICRATE));
        assert!(tracker.is_active());
        assert_eq!(
            tracker.summary(),
            "Vote: fraglimit 30 | Yes 1/2 | No 0/2 | 2 undecided | 30s left"
        );
    }

    #[test]
    fn test_terminal_update_clears_vote() {
        let mut tracker = VoteTracker::new();
        tracker.apply(state(VoteResult::Undecided, 100));
        tracker.apply(state(VoteResult::No, 0));

        assert!(!tracker.is_active());
        assert_eq!(tracker.last().unwrap().result, VoteResult::No);
        assert!(tracker.summary().starts_with("No vote running. Last: Vote failed"));
    }

    #[test]
    fn test_partial_seconds_round_up() {
        let line = format_state(&state(VoteResult::Undecided, TICRATE + 1));
        assert!(line.ends_with("2s left"));
    }
}
