//! Scope counters

use std::sync::atomic::{AtomicU64, Ordering};

/// Snapshot of scope activity for one coordinator
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScopeMetrics {
    /// Scopes whose transaction began
    pub started: u64,
    /// Scopes that committed
    pub committed: u64,
    /// Scopes rolled back because the unit of work failed or commit failed
    pub rolled_back: u64,
    /// Scopes rolled back after exceeding their time budget
    pub timed_out: u64,
    /// Scopes dropped before finishing
    pub cancelled: u64,
    /// Scopes currently open
    pub active: u64,
}

#[derive(Debug, Default)]
pub(crate) struct Counters {
    started: AtomicU64,
    committed: AtomicU64,
    rolled_back: AtomicU64,
    timed_out: AtomicU64,
    cancelled: AtomicU64,
    active: AtomicU64,
}

/// How a scope ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Exit {
    Committed,
    RolledBack,
    TimedOut,
}

impl Counters {
    /// Count a scope as open until the returned guard finishes or drops
    pub(crate) fn open(&self) -> ActiveScope<'_> {
        self.started.fetch_add(1, Ordering::Relaxed);
        self.active.fetch_add(1, Ordering::AcqRel);
        ActiveScope {
            counters: self,
            finished: false,
        }
    }

    pub(crate) fn snapshot(&self) -> ScopeMetrics {
        ScopeMetrics {
            started: self.started.load(Ordering::Relaxed),
            committed: self.committed.load(Ordering::Relaxed),
            rolled_back: self.rolled_back.load(Ordering::Relaxed),
            timed_out: self.timed_out.load(Ordering::Relaxed),
            cancelled: self.cancelled.load(Ordering::Relaxed),
            active: self.active.load(Ordering::Acquire),
        }
    }
}

/// Releases the active count on every exit path
pub(crate) struct ActiveScope<'a> {
    counters: &'a Counters,
    finished: bool,
}

impl ActiveScope<'_> {
    pub(crate) fn finish(mut self, exit: Exit) {
        let counter = match exit {
            Exit::Committed => &self.counters.committed,
            Exit::RolledBack => &self.counters.rolled_back,
            Exit::TimedOut => &self.counters.timed_out,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        self.finished = true;
    }
}

impl Drop for ActiveScope<'_> {
    fn drop(&mut self) {
        self.counters.active.fetch_sub(1, Ordering::AcqRel);
        if !self.finished {
            self.counters.cancelled.fetch_add(1, Ordering::Relaxed);
            tracing::warn!("transaction scope dropped before completion");
        }
    }
}
