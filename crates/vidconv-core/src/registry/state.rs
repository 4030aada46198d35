//! Atomic cell holding an artifact's lifecycle state.

use std::sync::atomic::{AtomicU8, Ordering};

use crate::domain::ArtifactState;

/// Lock-free holder for [`ArtifactState`].
///
/// `transition` is a single compare-exchange: of any number of concurrent
/// callers asking for the same `from -> to`, exactly one gets `true`.
#[derive(Debug)]
pub(crate) struct AtomicArtifactState {
    inner: AtomicU8,
}

impl AtomicArtifactState {
    pub(crate) fn new(state: ArtifactState) -> Self {
        Self {
            inner: AtomicU8::new(state.as_u8()),
        }
    }

    pub(crate) fn load(&self) -> ArtifactState {
        ArtifactState::from_u8(self.inner.load(Ordering::Acquire))
    }

    pub(crate) fn transition(&self, from: ArtifactState, to: ArtifactState) -> bool {
        self.inner
            .compare_exchange(from.as_u8(), to.as_u8(), Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn transition_requires_expected_state() {
        let state = AtomicArtifactState::new(ArtifactState::Active);

        assert!(!state.transition(ArtifactState::PendingDeletion, ArtifactState::Deleted));
        assert!(state.transition(ArtifactState::Active, ArtifactState::PendingDeletion));
        assert!(!state.transition(ArtifactState::Active, ArtifactState::PendingDeletion));
        assert_eq!(state.load(), ArtifactState::PendingDeletion);
    }

    #[test]
    fn exactly_one_thread_wins_the_transition() {
        let state = Arc::new(AtomicArtifactState::new(ArtifactState::Active));

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let state = Arc::clone(&state);
                std::thread::spawn(move || {
                    state.transition(ArtifactState::Active, ArtifactState::PendingDeletion)
                })
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
    }
}
