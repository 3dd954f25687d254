//! Optimistic local mutation with rollback.
//!
//! Local state is updated before the remote side confirms, so the user sees
//! the change immediately. The pre-mutation image is captured first; if the
//! remote call fails, the image is put back.

use thiserror::Error;

/// Error returned when a remote confirmation fails and the local change has
/// been rolled back.
#[derive(Debug, Error)]
pub enum OptimisticError<E>
where
    E: std::error::Error + 'static,
{
    #[error("remote confirmation failed; local change rolled back")]
    RolledBack(#[source] E),
}

/// A pending optimistic change: holds the state as it was before the
/// mutation until it is either committed or rolled back.
#[must_use = "an optimistic change must be committed or rolled back"]
#[derive(Debug)]
pub struct Optimistic<T> {
    before: T,
}

impl<T: Clone> Optimistic<T> {
    /// Capture `state`, then apply `mutation` to it.
    pub fn apply(state: &mut T, mutation: impl FnOnce(&mut T)) -> Self {
        let before = state.clone();
        mutation(state);
        Self { before }
    }

    /// Keep the mutation. Returns the discarded pre-mutation image.
    pub fn commit(self) -> T {
        self.before
    }

    /// Restore the pre-mutation image.
    pub fn rollback(self, state: &mut T) {
        *state = self.before;
    }
}
