use cognate_types::{EntryId, LedgerEntry};

use crate::annotate::AnnotationUpdate;
use crate::error::LedgerError;
use crate::payload::EventPayload;

/// Write boundary: the only ways to change a ledger.
pub trait LedgerWriter: Send + Sync {
    /// Validate and record an event, extending the chain by one entry.
    fn append(&self, payload: EventPayload) -> Result<LedgerEntry, LedgerError>;

    /// Change the annotation of an existing entry.
    fn annotate(&self, sequence: u64, update: AnnotationUpdate)
        -> Result<LedgerEntry, LedgerError>;
}

/// Read boundary. Every method returns a snapshot; nothing returned here
/// changes when later entries are appended.
pub trait LedgerReader: Send + Sync {
    fn head(&self) -> Result<Option<LedgerEntry>, LedgerError>;

    /// The sequence that links to genesis. Entries are never deleted, so
    /// a ledger whose first stored entry is later than this is truncated.
    fn first_sequence(&self) -> u64;

    fn get(&self, sequence: u64) -> Result<Option<LedgerEntry>, LedgerError>;

    fn get_by_id(&self, id: &EntryId) -> Result<Option<LedgerEntry>, LedgerError>;

    /// Entries with `from <= sequence <= to`, ascending.
    fn read_range(&self, from: u64, to: u64) -> Result<Vec<LedgerEntry>, LedgerError>;

    /// First and last sequence, or `None` when empty.
    fn bounds(&self) -> Result<Option<(u64, u64)>, LedgerError>;

    fn len(&self) -> Result<u64, LedgerError>;

    fn is_empty(&self) -> Result<bool, LedgerError> {
        Ok(self.len()? == 0)
    }
}
