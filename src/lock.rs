//! Pluggable coordination between snapshot readers and block-boundary commits.
//!
//! The pool's own locking already serializes mutation; this layer exists so that a verifying
//! strategy can be swapped in to assert that no snapshot read overlaps a commit. The default
//! strategy is a no-op with near zero cost on the hot path.

use std::{
    fmt,
    sync::atomic::{AtomicBool, AtomicUsize, Ordering},
};

/// Coordination strategy between snapshot readers and the block-boundary synchronizer.
///
/// `begin_*` calls must be paired with the matching `end_*`; use [`ReadScope`] and
/// [`CommitScope`] to get that pairing from a drop guard.
pub trait CommitLock: Send + Sync + fmt::Debug {
    /// Marks the start of a snapshot read.
    fn begin_read(&self);
    /// Marks the end of a snapshot read.
    fn end_read(&self);
    /// Marks the start of a block-boundary commit.
    fn begin_commit(&self);
    /// Marks the end of a block-boundary commit.
    fn end_commit(&self);
}

/// Shared-side drop guard for a [`CommitLock`].
pub struct ReadScope<'a>(&'a dyn CommitLock);

impl<'a> ReadScope<'a> {
    /// Enters a read scope on the given lock.
    pub fn enter(lock: &'a dyn CommitLock) -> Self {
        lock.begin_read();
        Self(lock)
    }
}

impl Drop for ReadScope<'_> {
    fn drop(&mut self) {
        self.0.end_read();
    }
}

/// Exclusive-side drop guard for a [`CommitLock`].
pub struct CommitScope<'a>(&'a dyn CommitLock);

impl<'a> CommitScope<'a> {
    /// Enters a commit scope on the given lock.
    pub fn enter(lock: &'a dyn CommitLock) -> Self {
        lock.begin_commit();
        Self(lock)
    }
}

impl Drop for CommitScope<'_> {
    fn drop(&mut self) {
        self.0.end_commit();
    }
}

/// The default strategy: all transitions are no-ops.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCommitLock;

impl CommitLock for NoopCommitLock {
    fn begin_read(&self) {}
    fn end_read(&self) {}
    fn begin_commit(&self) {}
    fn end_commit(&self) {}
}

/// A verifying strategy that panics when a snapshot read overlaps a commit.
///
/// Intended for tests; counts commits so tests can assert the synchronizer ran.
#[derive(Debug, Default)]
pub struct TrackingCommitLock {
    readers: AtomicUsize,
    committing: AtomicBool,
    commits: AtomicUsize,
}

impl TrackingCommitLock {
    /// Number of commits observed so far.
    pub fn commits(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }
}

impl CommitLock for TrackingCommitLock {
    fn begin_read(&self) {
        assert!(!self.committing.load(Ordering::SeqCst), "snapshot read during commit");
        self.readers.fetch_add(1, Ordering::SeqCst);
    }

    fn end_read(&self) {
        self.readers.fetch_sub(1, Ordering::SeqCst);
    }

    fn begin_commit(&self) {
        assert_eq!(self.readers.load(Ordering::SeqCst), 0, "commit during snapshot read");
        assert!(!self.committing.swap(true, Ordering::SeqCst), "nested commit");
        self.commits.fetch_add(1, Ordering::SeqCst);
    }

    fn end_commit(&self) {
        self.committing.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracking_lock_counts_commits() {
        let lock = TrackingCommitLock::default();
        {
            let _read = ReadScope::enter(&lock);
        }
        {
            let _commit = CommitScope::enter(&lock);
        }
        assert_eq!(lock.commits(), 1);
    }

    #[test]
    #[should_panic(expected = "commit during snapshot read")]
    fn tracking_lock_rejects_overlap() {
        let lock = TrackingCommitLock::default();
        let _read = ReadScope::enter(&lock);
        let _commit = CommitScope::enter(&lock);
    }
}
