use cognate_crypto::{MerkleProof, MerkleTree};
use cognate_types::{ContentHash, LedgerEntry};
use serde::{Deserialize, Serialize};

/// A Merkle commitment to a range of entries.
///
/// The root can be published out of band; anyone holding it can later check
/// that an entry belongs to the range with an [`InclusionProof`]. Proofs can
/// only be produced from a checkpoint built locally, not one deserialized
/// from elsewhere.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Checkpoint {
    pub from: u64,
    pub to: u64,
    pub entry_count: u64,
    /// Merkle root over the content hashes, in sequence order.
    pub merkle_root: ContentHash,
    /// Content hash of the entry at `to`.
    pub tail_hash: ContentHash,
    #[serde(skip)]
    sequences: Vec<u64>,
    #[serde(skip)]
    tree: Option<MerkleTree>,
}

impl Checkpoint {
    /// Commit to `entries`, which must be in sequence order. `None` when
    /// there is nothing to commit to.
    pub fn from_entries(entries: &[LedgerEntry]) -> Option<Self> {
        let (first, last) = (entries.first()?, entries.last()?);
        let tree = MerkleTree::from_leaves(entries.iter().map(LedgerEntry::content_hash).collect());
        Some(Self {
            from: first.sequence,
            to: last.sequence,
            entry_count: entries.len() as u64,
            merkle_root: tree.root(),
            tail_hash: last.content_hash(),
            sequences: entries.iter().map(|e| e.sequence).collect(),
            tree: Some(tree),
        })
    }

    /// Prove that the entry at `sequence` is covered by this checkpoint.
    pub fn proof(&self, sequence: u64) -> Option<InclusionProof> {
        let index = self.sequences.binary_search(&sequence).ok()?;
        let proof = self.tree.as_ref()?.proof(index)?;
        Some(InclusionProof {
            sequence,
            content_hash: proof.leaf,
            proof,
        })
    }

    /// Whether `entries` produce the same commitment.
    pub fn matches(&self, entries: &[LedgerEntry]) -> bool {
        Self::from_entries(entries).is_some_and(|other| {
            other.from == self.from
                && other.to == self.to
                && other.entry_count == self.entry_count
                && other.merkle_root == self.merkle_root
                && other.tail_hash == self.tail_hash
        })
    }
}

/// Evidence that one entry is part of a checkpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InclusionProof {
    pub sequence: u64,
    pub content_hash: ContentHash,
    pub proof: MerkleProof,
}

impl InclusionProof {
    /// Check the proof against a published root.
    pub fn verify(&self, merkle_root: &ContentHash) -> bool {
        self.proof.leaf == self.content_hash && self.proof.root == *merkle_root && self.proof.verify()
    }
}

#[cfg(test)]
mod tests {
    use cognate_types::{ActionCategory, ActorType, Severity};

    use super::*;
    use crate::test_support::sealed_entry;

    fn entries(range: std::ops::RangeInclusive<u64>) -> Vec<LedgerEntry> {
        range
            .map(|i| sealed_entry(i, ActorType::System, ActionCategory::System, Severity::Info, &[]))
            .collect()
    }

    #[test]
    fn empty_range_has_no_checkpoint() {
        assert!(Checkpoint::from_entries(&[]).is_none());
    }

    #[test]
    fn proofs_verify_against_root() {
        let entries = entries(10..=14);
        let checkpoint = Checkpoint::from_entries(&entries).unwrap();
        assert_eq!((checkpoint.from, checkpoint.to, checkpoint.entry_count), (10, 14, 5));
        assert_eq!(checkpoint.tail_hash, entries[4].content_hash());

        for entry in &entries {
            let proof = checkpoint.proof(entry.sequence).unwrap();
            assert_eq!(proof.content_hash, entry.content_hash());
            assert!(proof.verify(&checkpoint.merkle_root));
        }
        assert!(checkpoint.proof(9).is_none());
        let proof = checkpoint.proof(12).unwrap();
        assert!(!proof.verify(&ContentHash::from([1u8; 32])));
    }

    #[test]
    fn deserialized_checkpoint_cannot_prove_but_can_match() {
        let entries = entries(1..=3);
        let checkpoint = Checkpoint::from_entries(&entries).unwrap();
        let json = serde_json::to_string(&checkpoint).unwrap();
        let restored: Checkpoint = serde_json::from_str(&json).unwrap();
        assert!(restored.proof(2).is_none());
        assert!(restored.matches(&entries));
        assert!(!restored.matches(&entries[..2]));
    }
}
