use serde::{Deserialize, Serialize};

/// Classification of what happened.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionCategory {
    Action,
    Decision,
    Approval,
    Escalation,
    Error,
    Access,
    Change,
    Creation,
    Deletion,
    Communication,
    Integration,
    System,
}

closed_enum!(ActionCategory, "action category", {
    Action => "action",
    Decision => "decision",
    Approval => "approval",
    Escalation => "escalation",
    Error => "error",
    Access => "access",
    Change => "change",
    Creation => "creation",
    Deletion => "deletion",
    Communication => "communication",
    Integration => "integration",
    System => "system",
});

/// Event severity, ordered `debug < info < notice < warning < error < critical`.
///
/// The derived `Ord` follows declaration order, which is the ranking used for
/// severity sorts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Debug,
    Info,
    Notice,
    Warning,
    Error,
    Critical,
}

closed_enum!(Severity, "severity", {
    Debug => "debug",
    Info => "info",
    Notice => "notice",
    Warning => "warning",
    Error => "error",
    Critical => "critical",
});

impl Severity {
    /// Ordinal rank, `0` for debug through `5` for critical.
    pub fn rank(&self) -> u8 {
        *self as u8
    }
}

/// Lifecycle status of the recorded action.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
    Cancelled,
}

closed_enum!(ActionStatus, "action status", {
    Pending => "pending",
    InProgress => "in_progress",
    Completed => "completed",
    Failed => "failed",
    Cancelled => "cancelled",
});

/// What: the event itself.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Action {
    #[serde(rename = "type")]
    pub action_type: String,
    pub description: String,
    pub category: ActionCategory,
    pub severity: Severity,
    pub status: ActionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    /// Duration in milliseconds.
    #[serde(default, rename = "duration", skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

impl Action {
    pub fn new(
        action_type: impl Into<String>,
        description: impl Into<String>,
        category: ActionCategory,
        severity: Severity,
    ) -> Self {
        Self {
            action_type: action_type.into(),
            description: description.into(),
            category,
            severity,
            status: ActionStatus::Completed,
            result: None,
            duration_ms: None,
        }
    }

    pub fn with_status(mut self, status: ActionStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_result(mut self, result: impl Into<String>) -> Self {
        self.result = Some(result.into());
        self
    }

    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_ordering() {
        assert!(Severity::Debug < Severity::Info);
        assert!(Severity::Info < Severity::Notice);
        assert!(Severity::Notice < Severity::Warning);
        assert!(Severity::Warning < Severity::Error);
        assert!(Severity::Error < Severity::Critical);
        assert_eq!(Severity::Critical.rank(), 5);
    }

    #[test]
    fn category_set_is_closed() {
        assert_eq!(ActionCategory::ALL.len(), 12);
        assert!("approval".parse::<ActionCategory>().is_ok());
        assert!("gossip".parse::<ActionCategory>().is_err());
    }

    #[test]
    fn status_uses_snake_case() {
        assert_eq!(ActionStatus::InProgress.as_str(), "in_progress");
        let json = serde_json::to_string(&ActionStatus::InProgress).unwrap();
        assert_eq!(json, "\"in_progress\"");
    }

    #[test]
    fn unknown_severity_is_rejected_at_deserialization() {
        let json = r#"{"type":"x","description":"d","category":"action","severity":"loud","status":"completed"}"#;
        assert!(serde_json::from_str::<Action>(json).is_err());
    }

    #[test]
    fn optional_fields_are_omitted() {
        let action = Action::new("deploy", "Deployed", ActionCategory::Change, Severity::Info);
        let json = serde_json::to_value(&action).unwrap();
        assert!(json.get("result").is_none());
        assert!(json.get("duration").is_none());

        let timed = action.with_duration_ms(1500);
        let json = serde_json::to_value(&timed).unwrap();
        assert_eq!(json["duration"], 1500);
    }
}
