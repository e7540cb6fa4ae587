use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Issued when a fetch starts; presented again when its response is installed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct FetchTicket(u64);

impl FetchTicket {
    pub fn sequence(&self) -> u64 {
        self.0
    }
}

/// One installed dataset. Records are shared and never mutated after install.
#[derive(Debug)]
pub struct Snapshot<T> {
    pub sequence: u64,
    pub fetched_at: DateTime<Utc>,
    pub records: Arc<Vec<T>>,
}

impl<T> Clone for Snapshot<T> {
    fn clone(&self) -> Self {
        Self {
            sequence: self.sequence,
            fetched_at: self.fetched_at,
            records: Arc::clone(&self.records),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallOutcome {
    Installed,
    /// A response from a fetch that started before the installed snapshot's fetch
    Stale,
}

/// Single-writer holder of the current snapshot of one dataset.
///
/// Tickets are numbered in issue order. A response is only installed when its ticket is newer than
/// the snapshot already in place, so a slow old fetch can never overwrite a newer result.
#[derive(Debug)]
pub struct SnapshotSlot<T> {
    issued: u64,
    current: Option<Snapshot<T>>,
}

impl<T> Default for SnapshotSlot<T> {
    fn default() -> Self {
        Self {
            issued: 0,
            current: None,
        }
    }
}

impl<T> SnapshotSlot<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&mut self) -> FetchTicket {
        self.issued += 1;
        FetchTicket(self.issued)
    }

    pub fn is_stale(&self, ticket: FetchTicket) -> bool {
        self.current
            .as_ref()
            .is_some_and(|snapshot| ticket.0 <= snapshot.sequence)
    }

    pub fn install(&mut self, ticket: FetchTicket, records: Vec<T>) -> InstallOutcome {
        self.install_at(ticket, records, Utc::now())
    }

    pub fn install_at(
        &mut self,
        ticket: FetchTicket,
        records: Vec<T>,
        fetched_at: DateTime<Utc>,
    ) -> InstallOutcome {
        if self.is_stale(ticket) {
            return InstallOutcome::Stale;
        }
        self.current = Some(Snapshot {
            sequence: ticket.0,
            fetched_at,
            records: Arc::new(records),
        });
        InstallOutcome::Installed
    }

    pub fn current(&self) -> Option<&Snapshot<T>> {
        self.current.as_ref()
    }

    /// Records of the installed snapshot, or an empty set before the first install.
    pub fn records(&self) -> Arc<Vec<T>> {
        self.current
            .as_ref()
            .map(|s| Arc::clone(&s.records))
            .unwrap_or_default()
    }
}
