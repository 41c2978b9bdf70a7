use serde::{Deserialize, Serialize};

/// Where: the context an event happened in.
///
/// Every reference is optional. Recorders should supply at least one, but an
/// empty location is accepted.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub space_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initiative_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub automation_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_system: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl Location {
    pub fn space(space_id: impl Into<String>) -> Self {
        Self {
            space_id: Some(space_id.into()),
            ..Default::default()
        }
    }

    pub fn with_project(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = Some(project_id.into());
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Returns `true` if no reference is set.
    pub fn is_empty(&self) -> bool {
        self.space_id.is_none()
            && self.project_id.is_none()
            && self.initiative_id.is_none()
            && self.automation_id.is_none()
            && self.external_system.is_none()
            && self.path.is_none()
    }
}
