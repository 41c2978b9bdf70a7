use std::sync::Arc;

use chrono::Utc;
use cognate_crypto::{ContentHasher, EntrySigner, HashChain};
use cognate_types::{CryptoSeal, EntryId, LedgerEntry, SealedEntry};
use tracing::debug;

use crate::error::LedgerError;
use crate::payload::EventPayload;
use crate::store::LedgerStore;

/// The single writer of new entries.
///
/// Validation, hashing and signing run before the store's write lock is
/// taken; the lock covers only sequence allocation, linking, and
/// publication.
pub struct EventRecorder {
    store: Arc<LedgerStore>,
    signer: Option<Arc<dyn EntrySigner>>,
}

impl EventRecorder {
    pub fn new(store: Arc<LedgerStore>) -> Self {
        Self {
            store,
            signer: None,
        }
    }

    /// Sign every recorded content hash with `signer`.
    pub fn with_signer(mut self, signer: Arc<dyn EntrySigner>) -> Self {
        self.signer = Some(signer);
        self
    }

    /// Record an event. On error nothing is appended.
    pub fn append(&self, payload: EventPayload) -> Result<LedgerEntry, LedgerError> {
        payload.validate()?;

        let observed_at = Utc::now();
        let (event, tags, related_entities, evidence) = payload.into_parts(observed_at);
        let content_hash = HashChain::content_hash(&event)?;

        let (signature, key_id) = match &self.signer {
            Some(signer) => (
                Some(signer.sign(&content_hash)?),
                Some(signer.key_id().to_string()),
            ),
            None => (None, None),
        };

        let id = EntryId::new();
        let entry = self.store.publish(move |tail| SealedEntry {
            id,
            sequence: tail.next_sequence,
            event,
            tags,
            related_entities,
            evidence,
            crypto: CryptoSeal {
                content_hash,
                previous_hash: tail.previous_hash,
                algorithm: ContentHasher::ALGORITHM.to_string(),
                hashed_at: observed_at,
                signature,
                key_id,
                merkle_root: None,
            },
        })?;

        debug!(
            sequence = entry.sequence,
            category = %entry.event.what.category,
            severity = %entry.event.what.severity,
            actor = %entry.event.who.id,
            hash = %entry.content_hash().short_hex(),
            "recorded ledger entry"
        );
        Ok(entry)
    }
}

#[cfg(test)]
mod tests {
    use cognate_crypto::{verify_signature, Ed25519EntrySigner};
    use cognate_types::ContentHash;

    use super::*;
    use crate::error::ValidationError;
    use crate::test_support::payload;
    use crate::traits::LedgerReader;

    #[test]
    fn appends_link_to_previous_entry() {
        let store = Arc::new(LedgerStore::new(1));
        let recorder = EventRecorder::new(Arc::clone(&store));

        let first = recorder.append(payload("cog-1")).unwrap();
        let second = recorder.append(payload("cog-2")).unwrap();

        assert_eq!(first.sequence, 1);
        assert_eq!(second.sequence, 2);
        assert_eq!(first.previous_hash(), ContentHash::GENESIS);
        assert_eq!(second.previous_hash(), first.content_hash());
        assert_eq!(
            HashChain::content_hash(&second.event).unwrap(),
            second.content_hash()
        );
        assert_eq!(store.len().unwrap(), 2);
    }

    #[test]
    fn first_sequence_comes_from_store() {
        let store = Arc::new(LedgerStore::new(1001));
        let recorder = EventRecorder::new(store);
        assert_eq!(recorder.append(payload("a")).unwrap().sequence, 1001);
        assert_eq!(recorder.append(payload("b")).unwrap().sequence, 1002);
    }

    #[test]
    fn invalid_payload_leaves_ledger_unchanged() {
        let store = Arc::new(LedgerStore::new(1));
        let recorder = EventRecorder::new(Arc::clone(&store));
        recorder.append(payload("ok")).unwrap();

        let err = recorder.append(payload("")).unwrap_err();
        assert_eq!(err, LedgerError::Validation(ValidationError::MissingActorId));
        assert_eq!(store.len().unwrap(), 1);

        let next = recorder.append(payload("ok-again")).unwrap();
        assert_eq!(next.sequence, 2);
    }

    #[test]
    fn supplied_time_is_kept() {
        let store = Arc::new(LedgerStore::new(1));
        let recorder = EventRecorder::new(store);
        let when = chrono::DateTime::from_timestamp(1_600_000_000, 0).unwrap();
        let entry = recorder.append(payload("cog").at(when)).unwrap();
        assert_eq!(entry.event.when, when);
    }

    #[test]
    fn signer_fills_signature_and_key_id() {
        let signer = Arc::new(Ed25519EntrySigner::generate("audit-key"));
        let public = signer.verifying_key();
        let recorder =
            EventRecorder::new(Arc::new(LedgerStore::new(1))).with_signer(signer);

        let entry = recorder.append(payload("cog")).unwrap();
        let signature = entry.crypto.signature.clone().unwrap();
        assert_eq!(entry.crypto.key_id.as_deref(), Some("audit-key"));
        assert!(verify_signature(&public, &entry.content_hash(), &signature).is_ok());
    }
}
