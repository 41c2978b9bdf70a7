//! Read-only chain audits.
//!
//! The verifier takes a snapshot of the requested range when it starts and
//! never looks past it, so appends that land during a run are not seen and
//! never block it.

use cognate_crypto::{ChainError, HashChain};
use cognate_types::ContentHash;
use serde::{Deserialize, Serialize};

use crate::cancel::CancelToken;
use crate::error::LedgerError;
use crate::traits::LedgerReader;

/// Which entries to verify.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SequenceRange {
    /// From the first entry to the tail observed at start.
    #[default]
    All,
    /// `from <= sequence <= to`, clamped to the entries that exist.
    Between { from: u64, to: u64 },
}

impl SequenceRange {
    pub fn new(from: u64, to: u64) -> Self {
        Self::Between { from, to }
    }

    /// Clamp to `bounds`. `Ok(None)` when nothing in the ledger falls inside.
    pub(crate) fn resolve(self, bounds: Option<(u64, u64)>) -> Result<Option<(u64, u64)>, LedgerError> {
        if let Self::Between { from, to } = self {
            if from > to {
                return Err(LedgerError::InvalidRange { from, to });
            }
        }
        let Some((first, last)) = bounds else {
            return Ok(None);
        };
        Ok(match self {
            Self::All => Some((first, last)),
            Self::Between { from, to } => {
                let (from, to) = (from.max(first), to.min(last));
                (from <= to).then_some((from, to))
            }
        })
    }
}

/// Which check a broken link failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakKind {
    /// A sequence number is missing before this entry.
    SequenceGap,
    /// `previousHash` does not match the prior entry's content hash.
    PreviousHashMismatch,
    /// The six dimensions no longer hash to the stored content hash.
    ContentHashMismatch,
    UnknownAlgorithm,
    /// The payload could not be re-encoded for hashing.
    Unhashable,
}

/// The first entry at which the chain failed to verify.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrokenLink {
    pub sequence: u64,
    pub kind: BreakKind,
    pub detail: String,
}

impl From<ChainError> for BrokenLink {
    fn from(err: ChainError) -> Self {
        let kind = match &err {
            ChainError::SequenceGap { .. } => BreakKind::SequenceGap,
            ChainError::PreviousHashMismatch { .. } => BreakKind::PreviousHashMismatch,
            ChainError::ContentHashMismatch { .. } => BreakKind::ContentHashMismatch,
            ChainError::UnknownAlgorithm { .. } => BreakKind::UnknownAlgorithm,
            ChainError::Hasher { .. } => BreakKind::Unhashable,
        };
        Self {
            sequence: err.sequence(),
            kind,
            detail: err.to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum VerificationOutcome {
    Valid,
    BrokenAt(BrokenLink),
}

/// Result of one verification run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationReport {
    /// First sequence in the verified range, `None` when it was empty.
    pub first: Option<u64>,
    /// Last sequence in the verified range.
    pub last: Option<u64>,
    /// Entries that passed every check.
    pub checked: u64,
    pub outcome: VerificationOutcome,
}

impl VerificationReport {
    pub fn is_valid(&self) -> bool {
        matches!(self.outcome, VerificationOutcome::Valid)
    }

    pub fn broken_at(&self) -> Option<u64> {
        match &self.outcome {
            VerificationOutcome::Valid => None,
            VerificationOutcome::BrokenAt(link) => Some(link.sequence),
        }
    }

    pub fn broken_link(&self) -> Option<&BrokenLink> {
        match &self.outcome {
            VerificationOutcome::Valid => None,
            VerificationOutcome::BrokenAt(link) => Some(link),
        }
    }

    /// Turn a broken chain into [`LedgerError::ChainIntegrity`].
    pub fn into_result(self) -> Result<Self, LedgerError> {
        match &self.outcome {
            VerificationOutcome::Valid => Ok(self),
            VerificationOutcome::BrokenAt(link) => Err(LedgerError::ChainIntegrity {
                sequence: link.sequence,
                reason: link.detail.clone(),
            }),
        }
    }
}

/// Walks a range of entries checking the hash-chain invariants.
pub struct ChainVerifier<'a, R: LedgerReader + ?Sized> {
    reader: &'a R,
}

impl<'a, R: LedgerReader + ?Sized> ChainVerifier<'a, R> {
    pub fn new(reader: &'a R) -> Self {
        Self { reader }
    }

    /// Verify `range`, stopping at the first broken link.
    ///
    /// Only the entry at the reader's `first_sequence` may link to genesis.
    /// A range that starts later is anchored on the content hash of the entry
    /// just before it, so a deleted prefix shows up as a sequence gap.
    pub fn verify(
        &self,
        range: SequenceRange,
        cancel: &CancelToken,
    ) -> Result<VerificationReport, LedgerError> {
        cancel.check()?;
        let bounds = self.reader.bounds()?;
        let Some((from, to)) = range.resolve(bounds)? else {
            return Ok(VerificationReport {
                first: None,
                last: None,
                checked: 0,
                outcome: VerificationOutcome::Valid,
            });
        };

        let snapshot = self.reader.read_range(from, to)?;
        let (first, last) = match (snapshot.first(), snapshot.last()) {
            (Some(first), Some(last)) => (first.sequence, last.sequence),
            _ => {
                return Ok(VerificationReport {
                    first: None,
                    last: None,
                    checked: 0,
                    outcome: VerificationOutcome::Valid,
                })
            }
        };

        let report = |checked: u64, outcome| VerificationReport {
            first: Some(first),
            last: Some(last),
            checked,
            outcome,
        };

        let genesis_sequence = self.reader.first_sequence();
        let stored_start = bounds.map_or(first, |(start, _)| start);
        let previous = match first.checked_sub(1) {
            Some(before) if first > genesis_sequence => self.reader.get(before)?,
            _ => None,
        };
        let anchor = match previous {
            Some(previous) => previous.content_hash(),
            None if first == genesis_sequence => ContentHash::GENESIS,
            None => {
                let expected = if first == stored_start {
                    genesis_sequence
                } else {
                    first - 1
                };
                let gap = ChainError::SequenceGap {
                    sequence: first,
                    expected,
                };
                return Ok(report(0, VerificationOutcome::BrokenAt(gap.into())));
            }
        };

        let mut expected_previous = anchor;
        let mut expected_sequence = None;
        for (checked, entry) in snapshot.iter().enumerate() {
            cancel.checkpoint(checked)?;
            if let Err(err) = HashChain::check_link(expected_previous, expected_sequence, entry) {
                return Ok(report(checked as u64, VerificationOutcome::BrokenAt(err.into())));
            }
            expected_previous = entry.content_hash();
            expected_sequence = entry.sequence.checked_add(1);
        }

        Ok(report(snapshot.len() as u64, VerificationOutcome::Valid))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use cognate_types::{ActionCategory, LedgerEntry, SealedEntry};

    use super::*;
    use crate::recorder::EventRecorder;
    use crate::store::LedgerStore;
    use crate::test_support::payload;

    fn recorded(count: usize, first_sequence: u64) -> Arc<LedgerStore> {
        let store = Arc::new(LedgerStore::new(first_sequence));
        let recorder = EventRecorder::new(Arc::clone(&store));
        for i in 0..count {
            recorder.append(payload(&format!("cog-{i}"))).unwrap();
        }
        store
    }

    fn verify(store: &LedgerStore, range: SequenceRange) -> VerificationReport {
        ChainVerifier::new(store)
            .verify(range, &CancelToken::new())
            .unwrap()
    }

    #[test]
    fn empty_ledger_is_valid() {
        let store = LedgerStore::new(1);
        let report = verify(&store, SequenceRange::All);
        assert!(report.is_valid());
        assert_eq!(report.checked, 0);
        assert_eq!(report.first, None);
    }

    #[test]
    fn untouched_chain_is_valid() {
        let store = recorded(10, 1);
        let report = verify(&store, SequenceRange::All);
        assert!(report.is_valid());
        assert_eq!(report.checked, 10);
        assert_eq!((report.first, report.last), (Some(1), Some(10)));
    }

    #[test]
    fn sub_range_anchors_on_prior_entry() {
        let store = recorded(10, 1);
        let report = verify(&store, SequenceRange::new(4, 7));
        assert!(report.is_valid());
        assert_eq!(report.checked, 4);
    }

    #[test]
    fn range_outside_ledger_checks_nothing() {
        let store = recorded(3, 1);
        let report = verify(&store, SequenceRange::new(50, 60));
        assert!(report.is_valid());
        assert_eq!(report.checked, 0);
    }

    #[test]
    fn inverted_range_is_rejected() {
        let store = recorded(3, 1);
        let err = ChainVerifier::new(store.as_ref())
            .verify(SequenceRange::new(3, 1), &CancelToken::new())
            .unwrap_err();
        assert_eq!(err, LedgerError::InvalidRange { from: 3, to: 1 });
    }

    #[test]
    fn payload_edit_is_detected() {
        let store = recorded(5, 1);
        store.tamper(3, |sealed| {
            sealed.event.what.category = ActionCategory::Deletion;
        });
        let report = verify(&store, SequenceRange::All);
        assert_eq!(report.broken_at(), Some(3));
        assert_eq!(report.checked, 2);
        assert_eq!(
            report.broken_link().unwrap().kind,
            BreakKind::ContentHashMismatch
        );
    }

    #[test]
    fn corrupted_previous_hash_is_detected() {
        let store = recorded(4, 1);
        store.tamper(4, |sealed| {
            sealed.crypto.previous_hash = ContentHash::from([7u8; 32]);
        });
        let report = verify(&store, SequenceRange::All);
        assert_eq!(report.broken_at(), Some(4));
        assert_eq!(
            report.broken_link().unwrap().kind,
            BreakKind::PreviousHashMismatch
        );
    }

    #[test]
    fn rehashed_edit_breaks_the_next_link() {
        let store = recorded(4, 1);
        store.tamper(2, |sealed| {
            sealed.event.what.description = "rewritten".into();
            sealed.crypto.content_hash = HashChain::content_hash(&sealed.event).unwrap();
        });
        let report = verify(&store, SequenceRange::All);
        assert_eq!(report.broken_at(), Some(3));
    }

    #[test]
    fn unknown_algorithm_is_reported() {
        let store = recorded(2, 1);
        store.tamper(1, |sealed| sealed.crypto.algorithm = "base64".into());
        let report = verify(&store, SequenceRange::All);
        assert_eq!(report.broken_link().unwrap().kind, BreakKind::UnknownAlgorithm);
    }

    #[test]
    fn into_result_maps_to_chain_integrity() {
        let store = recorded(3, 1);
        store.tamper(2, |sealed| sealed.event.who.name = "Mallory".into());
        let err = verify(&store, SequenceRange::All).into_result().unwrap_err();
        assert!(matches!(err, LedgerError::ChainIntegrity { sequence: 2, .. }));
    }

    #[test]
    fn honours_cancellation() {
        let store = recorded(3, 1);
        let token = CancelToken::new();
        token.cancel();
        assert_eq!(
            ChainVerifier::new(store.as_ref())
                .verify(SequenceRange::All, &token)
                .unwrap_err(),
            LedgerError::Cancelled
        );
    }

    #[test]
    fn non_default_first_sequence_links_to_genesis() {
        let store = recorded(3, 1001);
        let report = verify(&store, SequenceRange::All);
        assert!(report.is_valid());
        assert_eq!(report.first, Some(1001));
    }

    #[test]
    fn deleted_prefix_is_a_gap_even_when_rerooted() {
        let store = recorded(5, 1);
        let mut tail = store.read_range(3, 5).unwrap();
        let mut rerooted = SealedEntry::clone(tail[0].sealed());
        rerooted.crypto.previous_hash = ContentHash::GENESIS;
        tail[0] = LedgerEntry::new(rerooted);

        let truncated = LedgerStore::from_entries(1, tail).unwrap();
        let report = verify(&truncated, SequenceRange::All);
        assert_eq!(report.broken_at(), Some(3));
        assert_eq!(report.broken_link().unwrap().kind, BreakKind::SequenceGap);
        assert_eq!(report.checked, 0);
    }

    #[test]
    fn range_after_a_hole_is_a_gap() {
        let store = recorded(5, 1);
        let mut entries = store.read_range(1, 5).unwrap();
        entries.remove(2);
        let holed = LedgerStore::from_entries(1, entries).unwrap();

        let report = verify(&holed, SequenceRange::new(4, 5));
        assert_eq!(report.broken_at(), Some(4));
        assert_eq!(report.broken_link().unwrap().kind, BreakKind::SequenceGap);
    }
}
