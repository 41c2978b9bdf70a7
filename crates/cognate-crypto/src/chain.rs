use cognate_types::{ContentHash, CryptoSeal, LedgerEntry, SealedEntry, SixW};

use crate::hasher::{ContentHasher, HasherError};

/// Trait for records that participate in a hash chain.
pub trait ChainLink {
    fn sequence(&self) -> u64;
    /// The record's stored content hash.
    fn content_hash(&self) -> ContentHash;
    /// The stored hash of the previous record (genesis for the first).
    fn previous_hash(&self) -> ContentHash;
    /// The stored algorithm identifier.
    fn algorithm(&self) -> &str;
    /// Recompute the content hash from the record's payload.
    fn recompute_hash(&self) -> Result<ContentHash, HasherError>;
}

/// The hash-chain rules shared by the recorder and the verifier.
///
/// - `content_hash` is BLAKE3 over the canonical JSON of the six dimensions
/// - `previous_hash` of an entry is the `content_hash` of the entry before
///   it, or [`ContentHash::GENESIS`] for the first entry
pub struct HashChain;

impl HashChain {
    /// Compute the content hash of a six-dimension payload.
    pub fn content_hash(event: &SixW) -> Result<ContentHash, HasherError> {
        ContentHasher::ENTRY.hash_json(event)
    }

    /// The `previous_hash` for an entry appended after `previous`.
    pub fn link_hash(previous: Option<&CryptoSeal>) -> ContentHash {
        previous.map_or(ContentHash::GENESIS, |seal| seal.content_hash)
    }

    /// Check one record against the hash it must link to.
    ///
    /// Checks, in order:
    /// 1. The sequence is the expected successor (when one is given)
    /// 2. The stored `previous_hash` equals `expected_previous`
    /// 3. The algorithm is one this hasher understands
    /// 4. The stored `content_hash` matches a recomputation of the payload
    pub fn check_link<L: ChainLink + ?Sized>(
        expected_previous: ContentHash,
        expected_sequence: Option<u64>,
        link: &L,
    ) -> Result<(), ChainError> {
        let sequence = link.sequence();
        if let Some(expected) = expected_sequence {
            if sequence != expected {
                return Err(ChainError::SequenceGap { sequence, expected });
            }
        }

        if link.previous_hash() != expected_previous {
            return Err(ChainError::PreviousHashMismatch { sequence });
        }

        if link.algorithm() != ContentHasher::ALGORITHM {
            return Err(ChainError::UnknownAlgorithm {
                sequence,
                algorithm: link.algorithm().to_string(),
            });
        }

        let computed = link
            .recompute_hash()
            .map_err(|e| ChainError::Hasher { sequence, reason: e.to_string() })?;
        if computed != link.content_hash() {
            return Err(ChainError::ContentHashMismatch { sequence });
        }

        Ok(())
    }

    /// Verify a contiguous run of records.
    ///
    /// `anchor` is the hash the first record must link to: genesis when the
    /// run starts at the beginning of the ledger, otherwise the content hash
    /// of the record just before the run.
    pub fn verify_chain<L: ChainLink>(links: &[L], anchor: ContentHash) -> Result<(), ChainError> {
        let mut expected_previous = anchor;
        let mut expected_sequence = None;

        for link in links {
            Self::check_link(expected_previous, expected_sequence, link)?;
            expected_previous = link.content_hash();
            expected_sequence = link.sequence().checked_add(1);
        }

        Ok(())
    }
}

impl ChainLink for SealedEntry {
    fn sequence(&self) -> u64 {
        self.sequence
    }

    fn content_hash(&self) -> ContentHash {
        self.crypto.content_hash
    }

    fn previous_hash(&self) -> ContentHash {
        self.crypto.previous_hash
    }

    fn algorithm(&self) -> &str {
        &self.crypto.algorithm
    }

    fn recompute_hash(&self) -> Result<ContentHash, HasherError> {
        HashChain::content_hash(&self.event)
    }
}

impl ChainLink for LedgerEntry {
    fn sequence(&self) -> u64 {
        self.sealed().sequence()
    }

    fn content_hash(&self) -> ContentHash {
        self.sealed().crypto.content_hash
    }

    fn previous_hash(&self) -> ContentHash {
        self.sealed().crypto.previous_hash
    }

    fn algorithm(&self) -> &str {
        &self.sealed().crypto.algorithm
    }

    fn recompute_hash(&self) -> Result<ContentHash, HasherError> {
        self.sealed().recompute_hash()
    }
}

/// Errors from chain verification. Each names the sequence of the first
/// record that failed.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum ChainError {
    #[error("sequence gap at {sequence}: expected {expected}")]
    SequenceGap { sequence: u64, expected: u64 },

    #[error("broken link at sequence {sequence}: previous hash does not match")]
    PreviousHashMismatch { sequence: u64 },

    #[error("content hash mismatch at sequence {sequence}: payload was altered")]
    ContentHashMismatch { sequence: u64 },

    #[error("unknown hash algorithm {algorithm:?} at sequence {sequence}")]
    UnknownAlgorithm { sequence: u64, algorithm: String },

    #[error("could not rehash sequence {sequence}: {reason}")]
    Hasher { sequence: u64, reason: String },
}

impl ChainError {
    /// Sequence of the record where the chain broke.
    pub fn sequence(&self) -> u64 {
        match self {
            Self::SequenceGap { sequence, .. }
            | Self::PreviousHashMismatch { sequence }
            | Self::ContentHashMismatch { sequence }
            | Self::UnknownAlgorithm { sequence, .. }
            | Self::Hasher { sequence, .. } => *sequence,
        }
    }
}
