use std::collections::BTreeMap;

use cognate_types::{ActionCategory, ActorType, ContentHash, Severity};
use serde::{Deserialize, Serialize};

use crate::store::LedgerState;

/// Dashboard summary of a ledger, read from the indexes.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerStats {
    pub total_entries: u64,
    pub first_sequence: Option<u64>,
    pub last_sequence: Option<u64>,
    pub head_hash: Option<ContentHash>,
    pub flagged: u64,
    pub by_category: BTreeMap<ActionCategory, u64>,
    pub by_actor_type: BTreeMap<ActorType, u64>,
    pub by_severity: BTreeMap<Severity, u64>,
}

impl LedgerStats {
    pub(crate) fn collect(state: &LedgerState) -> Self {
        let first = state.entries.first();
        let last = state.entries.last();
        Self {
            total_entries: state.entries.len() as u64,
            first_sequence: first.map(|e| e.sequence),
            last_sequence: last.map(|e| e.sequence),
            head_hash: last.map(|e| e.content_hash()),
            flagged: state.index.flagged_count(),
            by_category: state.index.category_counts(),
            by_actor_type: state.index.actor_type_counts(),
            by_severity: state.index.severity_counts(),
        }
    }
}
