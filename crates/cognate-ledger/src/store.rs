//! The shared entry set and its indexes.
//!
//! A single `RwLock` guards both, so an append publishes the entry and its
//! index updates in one step. Readers hold the read lock only long enough to
//! clone the `Arc` handles they need, then work on that snapshot unlocked.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use cognate_types::{Annotation, ContentHash, EntryId, LedgerEntry, SealedEntry};

use crate::error::LedgerError;
use crate::index::IndexManager;
use crate::traits::LedgerReader;

/// Where the next entry attaches to the chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Tail {
    pub next_sequence: u64,
    pub previous_hash: ContentHash,
}

/// In-memory entry set plus indexes.
pub struct LedgerStore {
    first_sequence: u64,
    inner: RwLock<LedgerState>,
}

#[derive(Default)]
pub(crate) struct LedgerState {
    pub(crate) entries: Vec<LedgerEntry>,
    pub(crate) index: IndexManager,
    by_id: HashMap<EntryId, usize>,
}

impl LedgerState {
    /// Position of `sequence` in `entries`.
    pub(crate) fn position(&self, sequence: u64) -> Option<usize> {
        let first = self.entries.first()?.sequence;
        let guess = usize::try_from(sequence.checked_sub(first)?).ok()?;
        match self.entries.get(guess) {
            Some(entry) if entry.sequence == sequence => Some(guess),
            // Only entry sets loaded from an export can have gaps.
            _ => self
                .entries
                .binary_search_by_key(&sequence, |e| e.sequence)
                .ok(),
        }
    }

    pub(crate) fn get(&self, sequence: u64) -> Option<&LedgerEntry> {
        self.position(sequence).map(|pos| &self.entries[pos])
    }

    /// Entries with `from <= sequence <= to`.
    pub(crate) fn range(&self, from: u64, to: u64) -> &[LedgerEntry] {
        let start = self.entries.partition_point(|e| e.sequence < from);
        let end = self.entries.partition_point(|e| e.sequence <= to);
        if start >= end {
            &[]
        } else {
            &self.entries[start..end]
        }
    }
}

impl LedgerStore {
    pub fn new(first_sequence: u64) -> Self {
        Self {
            first_sequence,
            inner: RwLock::new(LedgerState::default()),
        }
    }

    /// Build a store from previously exported entries without checking the
    /// hash chain. Sequences must be strictly increasing from no earlier than
    /// `first_sequence`, and ids unique. A missing prefix is left for the
    /// verifier to report.
    pub fn from_entries(
        first_sequence: u64,
        entries: Vec<LedgerEntry>,
    ) -> Result<Self, LedgerError> {
        let mut state = LedgerState::default();
        for entry in entries {
            let floor = match state.entries.last() {
                Some(last) => last.sequence.checked_add(1),
                None => Some(first_sequence),
            };
            if floor.map_or(true, |floor| entry.sequence < floor) {
                return Err(LedgerError::OutOfOrder {
                    sequence: entry.sequence,
                });
            }
            if state.by_id.contains_key(&entry.id) {
                return Err(LedgerError::DuplicateId(entry.id.to_string()));
            }
            state.by_id.insert(entry.id, state.entries.len());
            state.index.on_append(entry.sealed(), entry.is_flagged());
            state.entries.push(entry);
        }

        Ok(Self {
            first_sequence,
            inner: RwLock::new(state),
        })
    }

    pub(crate) fn read(&self) -> Result<RwLockReadGuard<'_, LedgerState>, LedgerError> {
        self.inner
            .read()
            .map_err(|_| LedgerError::LockPoisoned("read"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, LedgerState>, LedgerError> {
        self.inner
            .write()
            .map_err(|_| LedgerError::LockPoisoned("write"))
    }

    /// The append critical section.
    ///
    /// Under the write lock: read the tail, let `seal` build the entry for
    /// that position, then publish it to the entry set and every index. `seal`
    /// must be cheap and infallible; hashing and signing happen before this
    /// is called.
    pub(crate) fn publish(
        &self,
        seal: impl FnOnce(Tail) -> SealedEntry,
    ) -> Result<LedgerEntry, LedgerError> {
        let mut state = self.write()?;

        let tail = match state.entries.last() {
            Some(last) => Tail {
                next_sequence: last
                    .sequence
                    .checked_add(1)
                    .ok_or(LedgerError::SequenceExhausted { last: last.sequence })?,
                previous_hash: last.content_hash(),
            },
            None => Tail {
                next_sequence: self.first_sequence,
                previous_hash: ContentHash::GENESIS,
            },
        };

        let sealed = seal(tail);
        if sealed.sequence != tail.next_sequence {
            return Err(LedgerError::OutOfOrder {
                sequence: sealed.sequence,
            });
        }
        if sealed.crypto.previous_hash != tail.previous_hash {
            return Err(LedgerError::ChainIntegrity {
                sequence: sealed.sequence,
                reason: "append attempted with mismatched previous hash".into(),
            });
        }
        if state.by_id.contains_key(&sealed.id) {
            return Err(LedgerError::DuplicateId(sealed.id.to_string()));
        }

        let entry = LedgerEntry::new(sealed);
        let position = state.entries.len();
        state.by_id.insert(entry.id, position);
        state.index.on_append(entry.sealed(), false);
        state.entries.push(entry.clone());
        Ok(entry)
    }

    /// Replace the annotation of one entry. The sealed half is untouched.
    pub(crate) fn annotate(
        &self,
        sequence: u64,
        update: impl FnOnce(&Annotation) -> Annotation,
    ) -> Result<LedgerEntry, LedgerError> {
        let mut state = self.write()?;
        let position = state
            .position(sequence)
            .ok_or(LedgerError::EntryNotFound(sequence))?;

        let current = &state.entries[position];
        let updated = current.with_annotation(update(current.annotation()));
        let flag_changed = updated.is_flagged() != current.is_flagged();

        state.entries[position] = updated.clone();
        if flag_changed {
            state.index.on_annotate(sequence, updated.is_flagged());
        }
        Ok(updated)
    }

    /// Test hook: swap the sealed half of a stored entry, bypassing every
    /// immutability guard, to simulate tampering with the backing store.
    #[cfg(test)]
    pub(crate) fn tamper(&self, sequence: u64, edit: impl FnOnce(&mut SealedEntry)) {
        let mut state = self.inner.write().unwrap();
        let position = state.position(sequence).unwrap();
        let entry = &state.entries[position];
        let mut sealed = SealedEntry::clone(entry.sealed());
        edit(&mut sealed);
        let replaced = LedgerEntry::from_parts(
            std::sync::Arc::new(sealed),
            std::sync::Arc::new(entry.annotation().clone()),
        );
        state.entries[position] = replaced;
    }

    /// Test hook: mutable access to the indexes.
    #[cfg(test)]
    pub(crate) fn with_index_mut(&self, f: impl FnOnce(&mut IndexManager)) {
        let mut state = self.inner.write().unwrap();
        f(&mut state.index);
    }
}

impl LedgerReader for LedgerStore {
    fn first_sequence(&self) -> u64 {
        self.first_sequence
    }

    fn head(&self) -> Result<Option<LedgerEntry>, LedgerError> {
        Ok(self.read()?.entries.last().cloned())
    }

    fn get(&self, sequence: u64) -> Result<Option<LedgerEntry>, LedgerError> {
        Ok(self.read()?.get(sequence).cloned())
    }

    fn get_by_id(&self, id: &EntryId) -> Result<Option<LedgerEntry>, LedgerError> {
        let state = self.read()?;
        Ok(state
            .by_id
            .get(id)
            .and_then(|pos| state.entries.get(*pos))
            .cloned())
    }

    fn read_range(&self, from: u64, to: u64) -> Result<Vec<LedgerEntry>, LedgerError> {
        if from > to {
            return Err(LedgerError::InvalidRange { from, to });
        }
        Ok(self.read()?.range(from, to).to_vec())
    }

    fn bounds(&self) -> Result<Option<(u64, u64)>, LedgerError> {
        let state = self.read()?;
        Ok(state
            .entries
            .first()
            .zip(state.entries.last())
            .map(|(first, last)| (first.sequence, last.sequence)))
    }

    fn len(&self) -> Result<u64, LedgerError> {
        Ok(self.read()?.entries.len() as u64)
    }
}
