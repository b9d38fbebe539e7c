use std::fmt;

use tracing::debug;

/// Progress of one bulk invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BulkIdState {
    Idle,
    Ensuring,
    Populating,
    Applying,
    CleaningUp,
    Done,
    Failed,
}

impl BulkIdState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, BulkIdState::Done | BulkIdState::Failed)
    }

    /// Ensuring is skipped when the create is folded into populating, and
    /// the inline strategy goes straight from idle to applying to done.
    pub fn can_transition_to(&self, next: BulkIdState) -> bool {
        use BulkIdState::*;

        match (self, next) {
            (from, Failed) => !from.is_terminal(),
            (Idle, Ensuring | Populating | Applying) => true,
            (Ensuring, Populating) => true,
            (Populating, Applying) => true,
            (Applying, CleaningUp | Done) => true,
            (CleaningUp, Done) => true,
            _ => false,
        }
    }
}

impl fmt::Display for BulkIdState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BulkIdState::Idle => "idle",
            BulkIdState::Ensuring => "ensuring",
            BulkIdState::Populating => "populating",
            BulkIdState::Applying => "applying",
            BulkIdState::CleaningUp => "cleaning up",
            BulkIdState::Done => "done",
            BulkIdState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// State tracker of a single invocation.
#[derive(Debug)]
pub(crate) struct Invocation {
    label: String,
    state: BulkIdState,
}

impl Invocation {
    pub(crate) fn new(label: String) -> Self {
        Invocation { label, state: BulkIdState::Idle }
    }

    pub(crate) fn state(&self) -> BulkIdState {
        self.state
    }

    pub(crate) fn advance(&mut self, next: BulkIdState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "invalid bulk id transition {} -> {}",
            self.state,
            next
        );
        debug!("{}: {} -> {}", self.label, self.state, next);
        self.state = next;
    }

    pub(crate) fn fail(&mut self) {
        self.advance(BulkIdState::Failed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_staging_path_is_valid() {
        let path = [
            BulkIdState::Idle,
            BulkIdState::Ensuring,
            BulkIdState::Populating,
            BulkIdState::Applying,
            BulkIdState::CleaningUp,
            BulkIdState::Done,
        ];
        assert!(path.windows(2).all(|w| w[0].can_transition_to(w[1])));
    }

    #[test]
    fn test_failed_reachable_from_non_terminal_only() {
        assert!(BulkIdState::Idle.can_transition_to(BulkIdState::Failed));
        assert!(BulkIdState::Applying.can_transition_to(BulkIdState::Failed));
        assert!(BulkIdState::CleaningUp.can_transition_to(BulkIdState::Failed));
        assert!(!BulkIdState::Done.can_transition_to(BulkIdState::Failed));
        assert!(!BulkIdState::Failed.can_transition_to(BulkIdState::Failed));
    }

    #[test]
    fn test_no_skipping_populate_after_ensure() {
        assert!(!BulkIdState::Ensuring.can_transition_to(BulkIdState::Applying));
        assert!(!BulkIdState::Done.can_transition_to(BulkIdState::Idle));
        assert!(!BulkIdState::Populating.can_transition_to(BulkIdState::CleaningUp));
    }

    #[test]
    fn test_invocation_tracks_state() {
        let mut invocation = Invocation::new("test".to_string());
        invocation.advance(BulkIdState::Applying);
        invocation.advance(BulkIdState::Done);
        assert_eq!(invocation.state(), BulkIdState::Done);
    }
}
