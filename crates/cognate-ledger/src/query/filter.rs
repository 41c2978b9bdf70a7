use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use cognate_types::{ActionCategory, ActionStatus, ActorType, LedgerEntry, Severity};
use serde::{Deserialize, Serialize};

use crate::error::QueryError;
use crate::index::IndexKey;

/// Filter predicates for a ledger query.
///
/// Predicates are AND-combined. A predicate holding several values matches
/// an entry carrying any one of them. Empty sets and unset options do not
/// filter.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LedgerFilter {
    pub actor_types: BTreeSet<ActorType>,
    pub categories: BTreeSet<ActionCategory>,
    pub severities: BTreeSet<Severity>,
    pub statuses: BTreeSet<ActionStatus>,
    pub space_ids: BTreeSet<String>,
    pub project_ids: BTreeSet<String>,
    /// Matches entries sharing at least one tag.
    pub tags: BTreeSet<String>,
    pub flagged_only: bool,
    /// Inclusive lower bound on `when`.
    pub date_from: Option<DateTime<Utc>>,
    /// Inclusive upper bound on `when`.
    pub date_to: Option<DateTime<Utc>>,
    /// Case-insensitive substring of the description, actor name, or a tag.
    pub search: Option<String>,
}

impl LedgerFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn actor_type(mut self, actor_type: ActorType) -> Self {
        self.actor_types.insert(actor_type);
        self
    }

    pub fn category(mut self, category: ActionCategory) -> Self {
        self.categories.insert(category);
        self
    }

    pub fn severity(mut self, severity: Severity) -> Self {
        self.severities.insert(severity);
        self
    }

    pub fn status(mut self, status: ActionStatus) -> Self {
        self.statuses.insert(status);
        self
    }

    pub fn space(mut self, space_id: impl Into<String>) -> Self {
        self.space_ids.insert(space_id.into());
        self
    }

    pub fn project(mut self, project_id: impl Into<String>) -> Self {
        self.project_ids.insert(project_id.into());
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    pub fn flagged_only(mut self) -> Self {
        self.flagged_only = true;
        self
    }

    pub fn between(mut self, from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        self.date_from = Some(from);
        self.date_to = Some(to);
        self
    }

    pub fn search(mut self, text: impl Into<String>) -> Self {
        self.search = Some(text.into());
        self
    }

    pub fn validate(&self) -> Result<(), QueryError> {
        if let (Some(from), Some(to)) = (self.date_from, self.date_to) {
            if from > to {
                return Err(QueryError::InvalidDateRange);
            }
        }
        Ok(())
    }

    /// Whether `entry` satisfies every predicate.
    pub fn matches(&self, entry: &LedgerEntry) -> bool {
        Matcher::new(self).matches(entry)
    }

    /// Index lookups this filter can be planned on, one group per predicate.
    /// Within a group the buckets are OR-ed; groups are AND-ed.
    pub(crate) fn index_groups(&self) -> Vec<Vec<IndexKey>> {
        let mut groups = Vec::new();
        if !self.actor_types.is_empty() {
            groups.push(self.actor_types.iter().map(|a| IndexKey::ActorType(*a)).collect());
        }
        if !self.categories.is_empty() {
            groups.push(self.categories.iter().map(|c| IndexKey::Category(*c)).collect());
        }
        if !self.severities.is_empty() {
            groups.push(self.severities.iter().map(|s| IndexKey::Severity(*s)).collect());
        }
        if !self.space_ids.is_empty() {
            groups.push(self.space_ids.iter().cloned().map(IndexKey::Space).collect());
        }
        if !self.tags.is_empty() {
            groups.push(self.tags.iter().cloned().map(IndexKey::Tag).collect());
        }
        groups
    }
}

/// A filter prepared for repeated matching.
pub(crate) struct Matcher<'a> {
    filter: &'a LedgerFilter,
    needle: Option<String>,
}

impl<'a> Matcher<'a> {
    pub(crate) fn new(filter: &'a LedgerFilter) -> Self {
        let needle = filter
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase);
        Self { filter, needle }
    }

    pub(crate) fn matches(&self, entry: &LedgerEntry) -> bool {
        let f = self.filter;
        let event = &entry.event;

        if !f.actor_types.is_empty() && !f.actor_types.contains(&event.who.actor_type) {
            return false;
        }
        if !f.categories.is_empty() && !f.categories.contains(&event.what.category) {
            return false;
        }
        if !f.severities.is_empty() && !f.severities.contains(&event.what.severity) {
            return false;
        }
        if !f.statuses.is_empty() && !f.statuses.contains(&event.what.status) {
            return false;
        }
        if !one_of(&f.space_ids, event.location.space_id.as_deref()) {
            return false;
        }
        if !one_of(&f.project_ids, event.location.project_id.as_deref()) {
            return false;
        }
        if !f.tags.is_empty() && f.tags.is_disjoint(&entry.tags) {
            return false;
        }
        if f.flagged_only && !entry.is_flagged() {
            return false;
        }
        if f.date_from.is_some_and(|from| event.when < from) {
            return false;
        }
        if f.date_to.is_some_and(|to| event.when > to) {
            return false;
        }
        if let Some(needle) = &self.needle {
            let hit = event.what.description.to_lowercase().contains(needle.as_str())
                || event.who.name.to_lowercase().contains(needle.as_str())
                || entry.tags.iter().any(|t| t.to_lowercase().contains(needle.as_str()));
            if !hit {
                return false;
            }
        }
        true
    }
}

fn one_of(allowed: &BTreeSet<String>, value: Option<&str>) -> bool {
    allowed.is_empty() || value.is_some_and(|v| allowed.contains(v))
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use cognate_types::{Annotation, Location, SealedEntry};

    use super::*;
    use crate::test_support::{base_time, sealed_entry};

    fn entry() -> LedgerEntry {
        let base = sealed_entry(
            7,
            ActorType::Cognate,
            ActionCategory::Decision,
            Severity::Warning,
            &["Billing", "q3"],
        );
        let mut sealed = SealedEntry::clone(base.sealed());
        sealed.event.location = Location::space("sp-1").with_project("pr-9");
        sealed.event.who.name = "Ledger Bot".into();
        sealed.event.what.description = "Approved the Refund".into();
        LedgerEntry::new(sealed)
    }

    #[test]
    fn empty_filter_matches_everything() {
        assert!(LedgerFilter::new().matches(&entry()));
    }

    #[test]
    fn values_within_a_predicate_are_or_ed() {
        let f = LedgerFilter::new()
            .actor_type(ActorType::User)
            .actor_type(ActorType::Cognate);
        assert!(f.matches(&entry()));
        assert!(!LedgerFilter::new().actor_type(ActorType::User).matches(&entry()));
    }

    #[test]
    fn predicates_are_and_ed() {
        let both = LedgerFilter::new()
            .category(ActionCategory::Decision)
            .severity(Severity::Warning);
        assert!(both.matches(&entry()));
        let clash = both.severity(Severity::Debug).space("other");
        assert!(!clash.matches(&entry()));
    }

    #[test]
    fn location_predicates() {
        assert!(LedgerFilter::new().space("sp-1").matches(&entry()));
        assert!(LedgerFilter::new().project("pr-9").matches(&entry()));
        assert!(!LedgerFilter::new().project("pr-1").matches(&entry()));
    }

    #[test]
    fn tags_match_on_any_overlap() {
        assert!(LedgerFilter::new().tag("q3").tag("q4").matches(&entry()));
        assert!(!LedgerFilter::new().tag("q4").matches(&entry()));
    }

    #[test]
    fn search_is_case_insensitive_across_fields() {
        for needle in ["refund", "LEDGER", "billing", "  Q3 "] {
            assert!(LedgerFilter::new().search(needle).matches(&entry()), "{needle}");
        }
        assert!(!LedgerFilter::new().search("payroll").matches(&entry()));
        assert!(LedgerFilter::new().search("   ").matches(&entry()));
    }

    #[test]
    fn date_range_is_inclusive() {
        let when = base_time() + Duration::minutes(7);
        assert!(LedgerFilter::new().between(when, when).matches(&entry()));
        let later = LedgerFilter::new().between(when + Duration::seconds(1), when + Duration::hours(1));
        assert!(!later.matches(&entry()));
    }

    #[test]
    fn inverted_date_range_is_invalid() {
        let when = base_time();
        let f = LedgerFilter::new().between(when, when - Duration::seconds(1));
        assert_eq!(f.validate(), Err(QueryError::InvalidDateRange));
    }

    #[test]
    fn flagged_only_reads_annotation() {
        let e = entry();
        let f = LedgerFilter::new().flagged_only();
        assert!(!f.matches(&e));
        let flagged = e.with_annotation(Annotation {
            is_flagged: true,
            ..Annotation::default()
        });
        assert!(f.matches(&flagged));
    }

    #[test]
    fn index_groups_cover_indexed_predicates() {
        let f = LedgerFilter::new()
            .actor_type(ActorType::User)
            .tag("a")
            .tag("b")
            .status(ActionStatus::Failed);
        let groups = f.index_groups();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[1], vec![IndexKey::Tag("a".into()), IndexKey::Tag("b".into())]);
    }

    #[test]
    fn filter_reads_from_camel_case_json() {
        let f: LedgerFilter =
            serde_json::from_str(r#"{"actorTypes":["cognate"],"flaggedOnly":true}"#).unwrap();
        assert!(f.actor_types.contains(&ActorType::Cognate));
        assert!(f.flagged_only);
    }
}
