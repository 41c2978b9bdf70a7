//! Incrementally maintained lookups over the entry set.
//!
//! Every bucket holds the ascending sequence numbers of the entries carrying
//! one dimension value. Entries are appended in sequence order and never
//! removed, so maintenance is a push onto the end of each bucket.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use cognate_types::{ActionCategory, ActorType, LedgerEntry, SealedEntry, Severity};

/// A dimension value the index can answer directly.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum IndexKey {
    ActorType(ActorType),
    Category(ActionCategory),
    Severity(Severity),
    Space(String),
    Tag(String),
}

/// Derived lookups kept in step with the entry set by the recorder.
#[derive(Clone, Debug, Default)]
pub struct IndexManager {
    indexed: u64,
    last_sequence: Option<u64>,
    by_actor_type: BTreeMap<ActorType, Vec<u64>>,
    by_category: BTreeMap<ActionCategory, Vec<u64>>,
    by_severity: BTreeMap<Severity, Vec<u64>>,
    by_space: HashMap<String, Vec<u64>>,
    by_tag: HashMap<String, Vec<u64>>,
    flagged: BTreeSet<u64>,
    /// Per-key membership counts, kept apart from the buckets so a bucket
    /// that loses a member no longer matches its count.
    members: HashMap<IndexKey, u64>,
    /// Entries carrying a space id.
    spaced: u64,
    /// Sum of tag counts over all entries.
    tag_memberships: u64,
}

/// Why an index was judged out of step with the entry set.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum IndexInconsistency {
    #[error("index covers {indexed} entries but the ledger holds {actual}")]
    CountMismatch { indexed: u64, actual: u64 },

    #[error("index ends at sequence {indexed:?} but the ledger tail is {actual:?}")]
    TailMismatch {
        indexed: Option<u64>,
        actual: Option<u64>,
    },

    #[error("{dimension} buckets cover {covered} entries, expected {expected}")]
    BucketTotals {
        dimension: &'static str,
        covered: u64,
        expected: u64,
    },

    #[error("tail entry {sequence} is missing from the {dimension} index")]
    TailNotIndexed {
        sequence: u64,
        dimension: &'static str,
    },

    #[error("bucket {key:?} holds {indexed} sequences but {expected} entries carry it")]
    BucketLength {
        key: IndexKey,
        indexed: u64,
        expected: u64,
    },

    #[error("bucket {key:?} is not in ascending sequence order")]
    Unordered { key: IndexKey },
}

impl IndexManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index a newly published entry. Called inside the append critical
    /// section, after the entry is in the entry set.
    pub fn on_append(&mut self, entry: &SealedEntry, flagged: bool) {
        let seq = entry.sequence;
        let event = &entry.event;

        self.by_actor_type
            .entry(event.who.actor_type)
            .or_default()
            .push(seq);
        self.by_category
            .entry(event.what.category)
            .or_default()
            .push(seq);
        self.by_severity
            .entry(event.what.severity)
            .or_default()
            .push(seq);
        if let Some(space) = &event.location.space_id {
            self.by_space.entry(space.clone()).or_default().push(seq);
            self.spaced += 1;
        }
        for tag in &entry.tags {
            self.by_tag.entry(tag.clone()).or_default().push(seq);
        }
        self.tag_memberships += entry.tags.len() as u64;
        for key in keys_of(entry) {
            *self.members.entry(key).or_default() += 1;
        }
        if flagged {
            self.flagged.insert(seq);
        }

        self.indexed += 1;
        self.last_sequence = Some(seq);
    }

    /// Track a change to an entry's flag.
    pub fn on_annotate(&mut self, sequence: u64, flagged: bool) {
        if flagged {
            self.flagged.insert(sequence);
        } else {
            self.flagged.remove(&sequence);
        }
    }

    /// Ascending sequences carrying `key`.
    pub fn lookup(&self, key: &IndexKey) -> &[u64] {
        let bucket = match key {
            IndexKey::ActorType(a) => self.by_actor_type.get(a),
            IndexKey::Category(c) => self.by_category.get(c),
            IndexKey::Severity(s) => self.by_severity.get(s),
            IndexKey::Space(s) => self.by_space.get(s),
            IndexKey::Tag(t) => self.by_tag.get(t),
        };
        bucket.map_or(&[], Vec::as_slice)
    }

    /// Ascending sequences of flagged entries.
    pub fn flagged(&self) -> Vec<u64> {
        self.flagged.iter().copied().collect()
    }

    pub fn category_count(&self, category: ActionCategory) -> u64 {
        self.lookup(&IndexKey::Category(category)).len() as u64
    }

    pub fn actor_type_count(&self, actor_type: ActorType) -> u64 {
        self.lookup(&IndexKey::ActorType(actor_type)).len() as u64
    }

    pub fn severity_count(&self, severity: Severity) -> u64 {
        self.lookup(&IndexKey::Severity(severity)).len() as u64
    }

    pub fn flagged_count(&self) -> u64 {
        self.flagged.len() as u64
    }

    pub fn indexed(&self) -> u64 {
        self.indexed
    }

    pub fn category_counts(&self) -> BTreeMap<ActionCategory, u64> {
        self.by_category
            .iter()
            .map(|(k, v)| (*k, v.len() as u64))
            .collect()
    }

    pub fn actor_type_counts(&self) -> BTreeMap<ActorType, u64> {
        self.by_actor_type
            .iter()
            .map(|(k, v)| (*k, v.len() as u64))
            .collect()
    }

    pub fn severity_counts(&self) -> BTreeMap<Severity, u64> {
        self.by_severity
            .iter()
            .map(|(k, v)| (*k, v.len() as u64))
            .collect()
    }

    /// Spot-check the index against the entry set it claims to cover.
    ///
    /// Cheap checks only: totals per dimension, the tail entry's membership
    /// in each of its buckets, and for the buckets named in `keys` their
    /// length against the membership count and their ordering.
    pub fn check_consistency(
        &self,
        entries: &[LedgerEntry],
        keys: &[IndexKey],
    ) -> Result<(), IndexInconsistency> {
        let actual = entries.len() as u64;
        if self.indexed != actual {
            return Err(IndexInconsistency::CountMismatch {
                indexed: self.indexed,
                actual,
            });
        }

        let tail = entries.last();
        let tail_sequence = tail.map(|e| e.sequence);
        if self.last_sequence != tail_sequence {
            return Err(IndexInconsistency::TailMismatch {
                indexed: self.last_sequence,
                actual: tail_sequence,
            });
        }

        check_totals("actor type", self.by_actor_type.values(), actual)?;
        check_totals("category", self.by_category.values(), actual)?;
        check_totals("severity", self.by_severity.values(), actual)?;
        check_totals("space", self.by_space.values(), self.spaced)?;
        check_totals("tag", self.by_tag.values(), self.tag_memberships)?;

        if let Some(tail) = tail {
            for key in keys_of(tail.sealed()) {
                if self.lookup(&key).last() != Some(&tail.sequence) {
                    return Err(IndexInconsistency::TailNotIndexed {
                        sequence: tail.sequence,
                        dimension: key.dimension(),
                    });
                }
            }
        }

        for key in keys {
            let bucket = self.lookup(key);
            let expected = self.members.get(key).copied().unwrap_or(0);
            if bucket.len() as u64 != expected {
                return Err(IndexInconsistency::BucketLength {
                    key: key.clone(),
                    indexed: bucket.len() as u64,
                    expected,
                });
            }
            if !bucket.windows(2).all(|w| w[0] < w[1]) {
                return Err(IndexInconsistency::Unordered { key: key.clone() });
            }
        }

        Ok(())
    }

    /// Test hook: drop a sequence from a bucket to simulate corruption.
    #[cfg(test)]
    pub(crate) fn corrupt_remove(&mut self, key: &IndexKey, sequence: u64) {
        let bucket = match key {
            IndexKey::ActorType(a) => self.by_actor_type.get_mut(a),
            IndexKey::Category(c) => self.by_category.get_mut(c),
            IndexKey::Severity(s) => self.by_severity.get_mut(s),
            IndexKey::Space(s) => self.by_space.get_mut(s),
            IndexKey::Tag(t) => self.by_tag.get_mut(t),
        };
        if let Some(bucket) = bucket {
            bucket.retain(|s| *s != sequence);
        }
    }
}

impl IndexKey {
    fn dimension(&self) -> &'static str {
        match self {
            IndexKey::ActorType(_) => "actor type",
            IndexKey::Category(_) => "category",
            IndexKey::Severity(_) => "severity",
            IndexKey::Space(_) => "space",
            IndexKey::Tag(_) => "tag",
        }
    }
}

/// Every key an entry is indexed under.
fn keys_of(entry: &SealedEntry) -> Vec<IndexKey> {
    let event = &entry.event;
    let mut keys = vec![
        IndexKey::ActorType(event.who.actor_type),
        IndexKey::Category(event.what.category),
        IndexKey::Severity(event.what.severity),
    ];
    if let Some(space) = &event.location.space_id {
        keys.push(IndexKey::Space(space.clone()));
    }
    keys.extend(entry.tags.iter().cloned().map(IndexKey::Tag));
    keys
}

fn check_totals<'a>(
    dimension: &'static str,
    buckets: impl Iterator<Item = &'a Vec<u64>>,
    expected: u64,
) -> Result<(), IndexInconsistency> {
    let covered: u64 = buckets.map(|b| b.len() as u64).sum();
    if covered == expected {
        Ok(())
    } else {
        Err(IndexInconsistency::BucketTotals {
            dimension,
            covered,
            expected,
        })
    }
}

/// Union of ascending sequence lists, ascending and without duplicates.
pub(crate) fn union_sorted(lists: &[&[u64]]) -> Vec<u64> {
    let mut merged: Vec<u64> = lists.iter().flat_map(|l| l.iter().copied()).collect();
    merged.sort_unstable();
    merged.dedup();
    merged
}

/// Intersection of two ascending sequence lists.
pub(crate) fn intersect_sorted(a: &[u64], b: &[u64]) -> Vec<u64> {
    let mut out = Vec::with_capacity(a.len().min(b.len()));
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                out.push(a[i]);
                i += 1;
                j += 1;
            }
        }
    }
    out
}
