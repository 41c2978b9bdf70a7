use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Resources consumed while carrying out an event.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceUsage {
    pub tokens: u64,
    pub api_calls: u64,
    /// Duration in milliseconds.
    #[serde(rename = "duration")]
    pub duration_ms: u64,
    pub cost: f64,
}

/// How: the approach taken.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Method {
    pub approach: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub parameters: BTreeMap<String, serde_json::Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub steps: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourceUsage>,
}

impl Method {
    pub fn new(approach: impl Into<String>) -> Self {
        Self {
            approach: approach.into(),
            tools: Vec::new(),
            model: None,
            parameters: BTreeMap::new(),
            steps: Vec::new(),
            resources: None,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_tool(mut self, tool: impl Into<String>) -> Self {
        self.tools.push(tool.into());
        self
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.parameters.insert(key.into(), value);
        self
    }

    pub fn with_resources(mut self, resources: ResourceUsage) -> Self {
        self.resources = Some(resources);
        self
    }
}
