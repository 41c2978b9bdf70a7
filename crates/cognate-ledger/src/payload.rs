use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use cognate_types::{Action, Actor, Evidence, Location, Method, Reason, RelatedEntity, SixW};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// An append request: the six dimensions plus optional cross-references.
///
/// `when` may be left unset; the recorder then stamps the time it observed
/// the request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventPayload {
    pub who: Actor,
    pub what: Action,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub when: Option<DateTime<Utc>>,
    #[serde(default, rename = "where")]
    pub location: Location,
    pub why: Reason,
    pub how: Method,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub related_entities: Vec<RelatedEntity>,
    #[serde(default)]
    pub evidence: Vec<Evidence>,
}

impl EventPayload {
    pub fn new(who: Actor, what: Action, why: Reason, how: Method) -> Self {
        Self {
            who,
            what,
            when: None,
            location: Location::default(),
            why,
            how,
            tags: BTreeSet::new(),
            related_entities: Vec::new(),
            evidence: Vec::new(),
        }
    }

    /// Parse a payload from JSON. Unknown enum values (a category outside
    /// the closed set, for example) surface as [`ValidationError::Malformed`].
    pub fn from_json(source: &str) -> Result<Self, ValidationError> {
        serde_json::from_str(source).map_err(|e| ValidationError::Malformed(e.to_string()))
    }

    pub fn at(mut self, when: DateTime<Utc>) -> Self {
        self.when = Some(when);
        self
    }

    pub fn in_location(mut self, location: Location) -> Self {
        self.location = location;
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    pub fn with_related(mut self, related: RelatedEntity) -> Self {
        self.related_entities.push(related);
        self
    }

    pub fn with_evidence(mut self, evidence: Evidence) -> Self {
        self.evidence.push(evidence);
        self
    }

    /// Check the preconditions of an append.
    ///
    /// Closed enumerations (category, severity, trigger, actor type) are
    /// already enforced by their types.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.who.id.trim().is_empty() {
            return Err(ValidationError::MissingActorId);
        }
        if self.what.action_type.trim().is_empty() {
            return Err(ValidationError::MissingActionType);
        }
        if let Some(confidence) = self.why.confidence {
            if !(0.0..=1.0).contains(&confidence) {
                return Err(ValidationError::ConfidenceOutOfRange(confidence));
            }
        }
        if self.tags.iter().any(|tag| tag.trim().is_empty()) {
            return Err(ValidationError::EmptyTag);
        }
        if let Some(resources) = &self.how.resources {
            if !resources.cost.is_finite() {
                return Err(ValidationError::NonFiniteResourceCost(resources.cost));
            }
            if resources.cost < 0.0 {
                return Err(ValidationError::NegativeResourceCost(resources.cost));
            }
        }
        for (index, evidence) in self.evidence.iter().enumerate() {
            if evidence.url.trim().is_empty() {
                return Err(ValidationError::InvalidEvidence {
                    index,
                    reason: "url must not be empty".into(),
                });
            }
            if evidence.hash.trim().is_empty() {
                return Err(ValidationError::InvalidEvidence {
                    index,
                    reason: "hash must not be empty".into(),
                });
            }
        }
        Ok(())
    }

    /// Split into the hashed six-dimension record and the unhashed extras,
    /// stamping `now` when no time was supplied.
    pub(crate) fn into_parts(
        self,
        now: DateTime<Utc>,
    ) -> (SixW, BTreeSet<String>, Vec<RelatedEntity>, Vec<Evidence>) {
        let event = SixW {
            who: self.who,
            what: self.what,
            when: self.when.unwrap_or(now),
            location: self.location,
            why: self.why,
            how: self.how,
        };
        let tags = self.tags.into_iter().map(|t| t.trim().to_string()).collect();
        (event, tags, self.related_entities, self.evidence)
    }
}
