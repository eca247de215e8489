//! # Transactional Collaborators
//!
//! The coordinator's entry points are all-or-nothing. Its own state is staged
//! on a copy and committed at the end; collaborators that hold balances or
//! auction books join the same unit through [`Transactional`].
//!
//! The coordinator brackets every entry point with exactly one
//! `checkpoint` followed by either `commit` or `rollback`.

/// A collaborator whose effects can be undone until committed.
pub trait Transactional {
    /// Open a new undo scope.
    fn checkpoint(&mut self);

    /// Close the innermost scope, keeping its effects.
    fn commit(&mut self);

    /// Close the innermost scope, discarding its effects.
    fn rollback(&mut self);
}

/// Snapshot-based undo scopes for in-memory collaborators.
#[derive(Debug, Clone)]
pub struct SnapshotStack<T: Clone> {
    saved: Vec<T>,
}

impl<T: Clone> SnapshotStack<T> {
    /// Create an empty stack.
    pub fn new() -> Self {
        Self { saved: Vec::new() }
    }

    /// Save a copy of `current`.
    pub fn push(&mut self, current: &T) {
        self.saved.push(current.clone());
    }

    /// Drop the innermost snapshot.
    pub fn discard(&mut self) {
        self.saved.pop();
    }

    /// Restore `current` from the innermost snapshot, if any.
    pub fn restore(&mut self, current: &mut T) {
        if let Some(snapshot) = self.saved.pop() {
            *current = snapshot;
        }
    }

    /// Number of open scopes.
    pub fn depth(&self) -> usize {
        self.saved.len()
    }
}

impl<T: Clone> Default for SnapshotStack<T> {
    fn default() -> Self {
        Self::new()
    }
}
