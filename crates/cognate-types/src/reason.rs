use serde::{Deserialize, Serialize};

/// What set an event in motion.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    UserRequest,
    Automation,
    Schedule,
    Event,
    Condition,
    System,
    Error,
}

closed_enum!(Trigger, "trigger", {
    UserRequest => "user_request",
    Automation => "automation",
    Schedule => "schedule",
    Event => "event",
    Condition => "condition",
    System => "system",
    Error => "error",
});

/// Why: the cause and intent behind an event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reason {
    pub trigger: Trigger,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goal: Option<String>,
    /// Confidence in `[0, 1]`, typically reported by a Cognate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

impl Reason {
    pub fn new(trigger: Trigger) -> Self {
        Self {
            trigger,
            reasoning: None,
            trigger_ref: None,
            goal: None,
            confidence: None,
        }
    }

    pub fn with_reasoning(mut self, reasoning: impl Into<String>) -> Self {
        self.reasoning = Some(reasoning.into());
        self
    }

    pub fn with_goal(mut self, goal: impl Into<String>) -> Self {
        self.goal = Some(goal.into());
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }
}
