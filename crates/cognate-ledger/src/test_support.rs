//! Fixtures shared by the unit tests.

use chrono::{DateTime, Duration, Utc};
use cognate_crypto::{ContentHasher, HashChain};
use cognate_types::{
    Action, ActionCategory, Actor, ActorType, ContentHash, CryptoSeal, EntryId, LedgerEntry,
    Location, Method, Reason, SealedEntry, Severity, SixW, Trigger,
};

use crate::payload::EventPayload;

/// Fixed base time; fixture entry `n` happens `n` minutes after it.
pub(crate) fn base_time() -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000, 0).unwrap()
}

/// A valid payload from a cognate actor.
pub(crate) fn payload(actor_id: &str) -> EventPayload {
    EventPayload::new(
        Actor::cognate(actor_id, "Fixture Cognate"),
        Action::new("summarize", "Summarized a thread", ActionCategory::Action, Severity::Info),
        Reason::new(Trigger::UserRequest).with_confidence(0.9),
        Method::new("llm").with_model("fixture-model"),
    )
}

/// A correctly hashed entry, standing alone (its previous hash is genesis).
pub(crate) fn sealed_entry(
    sequence: u64,
    actor_type: ActorType,
    category: ActionCategory,
    severity: Severity,
    tags: &[&str],
) -> LedgerEntry {
    let event = SixW {
        who: Actor::new(actor_type, format!("actor-{sequence}"), "Fixture"),
        what: Action::new("fixture", format!("entry {sequence}"), category, severity),
        when: base_time() + Duration::minutes(sequence as i64),
        location: Location::default(),
        why: Reason::new(Trigger::Schedule),
        how: Method::new("fixture"),
    };
    let content_hash = HashChain::content_hash(&event).unwrap();
    LedgerEntry::new(SealedEntry {
        id: EntryId::new(),
        sequence,
        event,
        tags: tags.iter().map(|t| t.to_string()).collect(),
        related_entities: Vec::new(),
        evidence: Vec::new(),
        crypto: CryptoSeal {
            content_hash,
            previous_hash: ContentHash::GENESIS,
            algorithm: ContentHasher::ALGORITHM.to_string(),
            hashed_at: base_time(),
            signature: None,
            key_id: None,
            merkle_root: None,
        },
    })
}
