use std::collections::BTreeSet;
use std::ops::Deref;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::action::Action;
use crate::actor::Actor;
use crate::hash::ContentHash;
use crate::id::EntryId;
use crate::location::Location;
use crate::method::Method;
use crate::reason::Reason;

/// The six-dimension payload of an entry: Who, What, When, Where, Why, How.
///
/// This is exactly the data covered by an entry's content hash. Tags,
/// cross-references, evidence and annotations sit outside it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SixW {
    pub who: Actor,
    pub what: Action,
    pub when: DateTime<Utc>,
    #[serde(rename = "where")]
    pub location: Location,
    pub why: Reason,
    pub how: Method,
}

/// Chain-of-custody fields for an entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CryptoSeal {
    pub content_hash: ContentHash,
    pub previous_hash: ContentHash,
    /// Identifier of the hash function that produced `content_hash`.
    pub algorithm: String,
    pub hashed_at: DateTime<Utc>,
    /// Hex signature from an external signer, if one was installed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merkle_root: Option<ContentHash>,
}

/// Reference to another entity touched by an event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelatedEntity {
    #[serde(rename = "type")]
    pub entity_type: String,
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationship: Option<String>,
}

/// Pointer to an evidence blob held in an external store.
///
/// The ledger never stores or fetches blob content; `hash` is kept for a
/// later integrity cross-check against the blob store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Evidence {
    #[serde(rename = "type")]
    pub evidence_type: String,
    pub name: String,
    pub mime_type: String,
    pub size: u64,
    pub url: String,
    pub hash: String,
    pub captured_at: DateTime<Utc>,
    pub captured_by: String,
}

/// Review state of an annotated entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    Pending,
    Reviewed,
    Approved,
    Disputed,
}

closed_enum!(ReviewStatus, "review status", {
    Pending => "pending",
    Reviewed => "reviewed",
    Approved => "approved",
    Disputed => "disputed",
});

/// The mutable annotation channel of an entry.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Annotation {
    #[serde(default)]
    pub is_flagged: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review_status: Option<ReviewStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// The immutable part of an entry, fixed when it is recorded.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SealedEntry {
    pub id: EntryId,
    pub sequence: u64,
    #[serde(flatten)]
    pub event: SixW,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub tags: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub related_entities: Vec<RelatedEntity>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub evidence: Vec<Evidence>,
    pub crypto: CryptoSeal,
}

/// A ledger entry: a shared, immutable [`SealedEntry`] plus its
/// [`Annotation`].
///
/// Both halves are reference counted. Cloning an entry never copies the
/// payload, and the sealed half can only be read through a shared reference.
/// Changing the annotation produces a new `LedgerEntry` that shares the same
/// sealed payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    #[serde(flatten)]
    sealed: Arc<SealedEntry>,
    #[serde(flatten)]
    annotation: Arc<Annotation>,
}

impl LedgerEntry {
    /// Wrap a freshly sealed entry with an empty annotation.
    pub fn new(sealed: SealedEntry) -> Self {
        Self {
            sealed: Arc::new(sealed),
            annotation: Arc::new(Annotation::default()),
        }
    }

    /// Rebuild an entry from stored halves.
    pub fn from_parts(sealed: Arc<SealedEntry>, annotation: Arc<Annotation>) -> Self {
        Self { sealed, annotation }
    }

    /// The immutable half.
    pub fn sealed(&self) -> &Arc<SealedEntry> {
        &self.sealed
    }

    pub fn annotation(&self) -> &Annotation {
        &self.annotation
    }

    /// A copy of this entry carrying `annotation` instead.
    pub fn with_annotation(&self, annotation: Annotation) -> Self {
        Self {
            sealed: Arc::clone(&self.sealed),
            annotation: Arc::new(annotation),
        }
    }

    pub fn is_flagged(&self) -> bool {
        self.annotation.is_flagged
    }

    pub fn content_hash(&self) -> ContentHash {
        self.sealed.crypto.content_hash
    }

    pub fn previous_hash(&self) -> ContentHash {
        self.sealed.crypto.previous_hash
    }
}

impl Deref for LedgerEntry {
    type Target = SealedEntry;

    fn deref(&self) -> &SealedEntry {
        &self.sealed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{ActionCategory, Severity};
    use crate::reason::Trigger;

    fn sealed(sequence: u64) -> SealedEntry {
        SealedEntry {
            id: EntryId::new(),
            sequence,
            event: SixW {
                who: Actor::cognate("cog-7", "Atlas"),
                what: Action::new(
                    "task.completed",
                    "Finished quarterly report",
                    ActionCategory::Action,
                    Severity::Info,
                ),
                when: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
                location: Location::space("finance"),
                why: Reason::new(Trigger::Schedule),
                how: Method::new("template"),
            },
            tags: ["reports".to_string()].into_iter().collect(),
            related_entities: vec![],
            evidence: vec![],
            crypto: CryptoSeal {
                content_hash: ContentHash::from_hash([7; 32]),
                previous_hash: ContentHash::GENESIS,
                algorithm: "blake3".into(),
                hashed_at: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
                signature: None,
                key_id: None,
                merkle_root: None,
            },
        }
    }

    #[test]
    fn with_annotation_shares_sealed_payload() {
        let entry = LedgerEntry::new(sealed(1));
        let flagged = entry.with_annotation(Annotation {
            is_flagged: true,
            review_status: Some(ReviewStatus::Pending),
            notes: None,
        });

        assert!(Arc::ptr_eq(entry.sealed(), flagged.sealed()));
        assert!(!entry.is_flagged());
        assert!(flagged.is_flagged());
        assert_eq!(entry.content_hash(), flagged.content_hash());
    }

    #[test]
    fn deref_exposes_sealed_fields() {
        let entry = LedgerEntry::new(sealed(42));
        assert_eq!(entry.sequence, 42);
        assert_eq!(entry.event.who.id, "cog-7");
        assert!(entry.previous_hash().is_genesis());
    }

    #[test]
    fn json_uses_flat_six_w_layout() {
        let entry = LedgerEntry::new(sealed(3)).with_annotation(Annotation {
            is_flagged: true,
            review_status: None,
            notes: Some("check this".into()),
        });
        let json = serde_json::to_value(&entry).unwrap();

        assert_eq!(json["sequence"], 3);
        assert_eq!(json["who"]["type"], "cognate");
        assert_eq!(json["where"]["spaceId"], "finance");
        assert_eq!(json["crypto"]["previousHash"], "00".repeat(32));
        assert_eq!(json["isFlagged"], true);
        assert_eq!(json["notes"], "check this");
    }

    #[test]
    fn json_roundtrip_is_lossless() {
        let entry = LedgerEntry::new(sealed(9)).with_annotation(Annotation {
            is_flagged: false,
            review_status: Some(ReviewStatus::Approved),
            notes: None,
        });
        let json = serde_json::to_string(&entry).unwrap();
        let parsed: LedgerEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, entry);
    }

    #[test]
    fn missing_annotation_fields_default() {
        let entry = LedgerEntry::new(sealed(5));
        let mut json = serde_json::to_value(&entry).unwrap();
        json.as_object_mut().unwrap().remove("isFlagged");
        let parsed: LedgerEntry = serde_json::from_value(json).unwrap();
        assert_eq!(parsed.annotation(), &Annotation::default());
    }
}
