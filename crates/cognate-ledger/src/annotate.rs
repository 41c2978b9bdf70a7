use cognate_types::{Annotation, ReviewStatus};
use serde::{Deserialize, Serialize};

/// A partial change to an entry's annotation. Unset fields are left as they
/// are; `Some(None)` clears an optional field. (In JSON a `null` reads as
/// unset.)
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_flagged: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review_status: Option<Option<ReviewStatus>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<Option<String>>,
}

impl AnnotationUpdate {
    pub fn flag() -> Self {
        Self {
            is_flagged: Some(true),
            ..Default::default()
        }
    }

    pub fn unflag() -> Self {
        Self {
            is_flagged: Some(false),
            ..Default::default()
        }
    }

    pub fn review(status: ReviewStatus) -> Self {
        Self {
            review_status: Some(Some(status)),
            ..Default::default()
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(Some(notes.into()));
        self
    }

    /// The annotation that results from applying this update to `current`.
    pub fn apply(&self, current: &Annotation) -> Annotation {
        Annotation {
            is_flagged: self.is_flagged.unwrap_or(current.is_flagged),
            review_status: self.review_status.unwrap_or(current.review_status),
            notes: self.notes.clone().unwrap_or_else(|| current.notes.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_fields_are_preserved() {
        let current = Annotation {
            is_flagged: true,
            review_status: Some(ReviewStatus::Pending),
            notes: Some("keep".into()),
        };
        let next = AnnotationUpdate::review(ReviewStatus::Approved).apply(&current);
        assert!(next.is_flagged);
        assert_eq!(next.review_status, Some(ReviewStatus::Approved));
        assert_eq!(next.notes.as_deref(), Some("keep"));
    }

    #[test]
    fn explicit_none_clears() {
        let current = Annotation {
            is_flagged: false,
            review_status: None,
            notes: Some("old".into()),
        };
        let update = AnnotationUpdate {
            notes: Some(None),
            ..Default::default()
        };
        assert!(update.apply(&current).notes.is_none());
    }

    #[test]
    fn flag_then_unflag() {
        let flagged = AnnotationUpdate::flag().with_notes("odd spike").apply(&Annotation::default());
        assert!(flagged.is_flagged);
        assert!(!AnnotationUpdate::unflag().apply(&flagged).is_flagged);
    }
}
