use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// The kind of party responsible for an event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorType {
    /// A human operator.
    User,
    /// An AI worker.
    Cognate,
    /// An internal system process.
    System,
    /// A configured automation.
    Automation,
    /// An external integration.
    Integration,
}

closed_enum!(ActorType, "actor type", {
    User => "user",
    Cognate => "cognate",
    System => "system",
    Automation => "automation",
    Integration => "integration",
});

/// Who: the party responsible for an event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    #[serde(rename = "type")]
    pub actor_type: ActorType,
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl Actor {
    pub fn new(actor_type: ActorType, id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            actor_type,
            id: id.into(),
            name: name.into(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn user(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(ActorType::User, id, name)
    }

    pub fn cognate(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(ActorType::Cognate, id, name)
    }

    pub fn system(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(ActorType::System, id, name)
    }

    /// Attach a metadata value.
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}
