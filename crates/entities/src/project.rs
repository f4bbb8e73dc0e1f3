//! Project entity definitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::attachment::allocate_child_id;
use crate::{Attachment, History};

/// A stage of a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stage {
    /// Identifier, unique among the project's stages.
    pub id: i64,
    /// Stage title, unique within the project.
    pub title: String,
}

/// Fields supplied when a project is created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectDraft {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl ProjectDraft {
    /// Creates a draft with only a name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
        }
    }
}

/// Snapshot of the patchable project fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectFields {
    pub name: String,
    pub description: Option<String>,
}

/// Partial update of a project.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Actions recorded in a project's history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", content = "payload", rename_all = "snake_case")]
pub enum ProjectEvent {
    Create(ProjectDraft),
    Update {
        before: ProjectFields,
        after: ProjectPatch,
    },
    StageAdd { title: String },
    StageRemove { id: i64, title: String },
    Attach { count: usize },
    Detach { name: String },
}

/// A project with ordered stages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    /// Store-assigned identifier, `0` until inserted.
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub stages: Vec<Stage>,
    pub attachments: Vec<Attachment>,
    pub history: History<ProjectEvent>,
    /// Optimistic concurrency version, bumped by every stored update.
    pub version: i64,
    pub created_at: DateTime<Utc>,
}

impl Project {
    /// Creates a project from a draft and seeds its history with `create`.
    pub fn create(draft: ProjectDraft) -> Self {
        Self {
            id: 0,
            name: draft.name.trim().to_string(),
            description: Some(draft.description.trim().to_string()),
            stages: Vec::new(),
            attachments: Vec::new(),
            history: History::starting_with(ProjectEvent::Create(draft)),
            version: 1,
            created_at: Utc::now(),
        }
    }

    pub fn fields(&self) -> ProjectFields {
        ProjectFields {
            name: self.name.clone(),
            description: self.description.clone(),
        }
    }

    /// Assigns every field present in the patch and records `update`.
    pub fn apply_patch(&mut self, patch: ProjectPatch) {
        let before = self.fields();

        if let Some(name) = &patch.name {
            self.name = name.clone();
        }
        if let Some(description) = &patch.description {
            self.description = Some(description.clone());
        }

        self.history.record(ProjectEvent::Update {
            before,
            after: patch,
        });
    }

    /// Adds a stage unless one with the same title exists.
    ///
    /// A duplicate title leaves the project untouched and returns false.
    pub fn add_stage(&mut self, title: impl Into<String>) -> bool {
        let title = title.into();
        if self.stages.iter().any(|s| s.title == title) {
            return false;
        }

        let id = allocate_child_id(|id| self.stages.iter().any(|s| s.id == id));
        self.stages.push(Stage {
            id,
            title: title.clone(),
        });
        self.history.record(ProjectEvent::StageAdd { title });
        true
    }

    /// Removes the stage with `id`, returning false if there is none.
    pub fn remove_stage(&mut self, id: i64) -> bool {
        let Some(index) = self.stages.iter().position(|s| s.id == id) else {
            return false;
        };

        let removed = self.stages.remove(index);
        self.history.record(ProjectEvent::StageRemove {
            id,
            title: removed.title,
        });
        true
    }

    /// Appends a batch of attachments under a single `attach` entry.
    pub fn add_attachments(&mut self, files: Vec<Attachment>) {
        let count = files.len();
        self.attachments.extend(files);
        self.history.record(ProjectEvent::Attach { count });
    }

    /// Removes attachments named `name`; false if none matched.
    pub fn remove_attachment(&mut self, name: &str) -> bool {
        let before = self.attachments.len();
        self.attachments.retain(|a| a.name != name);
        if self.attachments.len() == before {
            return false;
        }
        self.history.record(ProjectEvent::Detach {
            name: name.to_string(),
        });
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_creation() {
        let draft = ProjectDraft {
            name: " Bridge ".to_string(),
            description: "Repair works".to_string(),
        };
        let project = Project::create(draft.clone());

        assert_eq!(project.name, "Bridge");
        assert_eq!(project.description.as_deref(), Some("Repair works"));
        assert_eq!(
            project.history.entries()[0].event,
            ProjectEvent::Create(draft)
        );
    }

    #[test]
    fn test_patch_keeps_other_fields() {
        let mut project = Project::create(ProjectDraft {
            name: "Bridge".to_string(),
            description: "Repair".to_string(),
        });
        project.apply_patch(ProjectPatch {
            name: Some("Tunnel".to_string()),
            description: None,
        });

        assert_eq!(project.name, "Tunnel");
        assert_eq!(project.description.as_deref(), Some("Repair"));
        assert_eq!(project.history.len(), 2);
    }

    #[test]
    fn test_duplicate_stage_is_noop() {
        let mut project = Project::create(ProjectDraft::new("Bridge"));
        assert!(project.add_stage("Design"));
        let snapshot = project.clone();

        assert!(!project.add_stage("Design"));
        assert_eq!(project, snapshot);
        assert_eq!(project.stages.len(), 1);
        assert_eq!(project.history.len(), 2);
    }

    #[test]
    fn test_remove_stage() {
        let mut project = Project::create(ProjectDraft::new("Bridge"));
        project.add_stage("Design");
        project.add_stage("Build");
        let design_id = project.stages[0].id;

        assert!(project.remove_stage(design_id));
        assert_eq!(project.stages.len(), 1);
        assert_eq!(project.stages[0].title, "Build");
        assert_eq!(
            project.history.last().map(|e| &e.event),
            Some(&ProjectEvent::StageRemove {
                id: design_id,
                title: "Design".to_string()
            })
        );

        let snapshot = project.clone();
        assert!(!project.remove_stage(design_id));
        assert_eq!(project, snapshot);
    }

    #[test]
    fn test_stage_event_wire_names() {
        let mut project = Project::create(ProjectDraft::new("Bridge"));
        project.add_stage("Design");

        let value = serde_json::to_value(&project.history).unwrap();
        assert_eq!(value[1]["action"], "stage_add");
        assert_eq!(value[1]["payload"]["title"], "Design");
    }
}
