//! Defect entity definitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::attachment::allocate_child_id;
use crate::{Attachment, History};

/// Status assigned to every new defect.
pub const DEFECT_STATUS_NEW: &str = "Новая";

/// Status counted as closed by defect statistics.
pub const DEFECT_STATUS_CLOSED: &str = "Закрыта";

/// Priority used when the create request does not name one.
pub const DEFAULT_DEFECT_PRIORITY: &str = "Средний";

fn default_priority() -> String {
    DEFAULT_DEFECT_PRIORITY.to_string()
}

/// A comment left on a defect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    /// Identifier, unique among the defect's comments.
    pub id: i64,
    /// Comment body.
    pub text: String,
}

/// Fields supplied when a defect is created.
///
/// Recorded verbatim as the payload of the `create` history entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefectDraft {
    pub title: String,
    #[serde(default)]
    pub desc: String,
    #[serde(default = "default_priority")]
    pub priority: String,
    #[serde(default)]
    pub assignee: String,
    #[serde(default)]
    pub due: String,
}

impl DefectDraft {
    /// Creates a draft with only a title.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            desc: String::new(),
            priority: default_priority(),
            assignee: String::new(),
            due: String::new(),
        }
    }
}

/// Snapshot of the patchable defect fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefectFields {
    pub title: String,
    pub desc: Option<String>,
    pub priority: String,
    pub assignee: Option<String>,
    pub due: Option<String>,
    pub status: String,
}

/// Partial update of a defect. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DefectPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desc: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// Actions recorded in a defect's history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", content = "payload", rename_all = "snake_case")]
pub enum DefectEvent {
    /// The defect was created from this draft.
    Create(DefectDraft),
    /// Fields were patched.
    Update {
        before: DefectFields,
        after: DefectPatch,
    },
    /// Status changed through the dedicated status endpoint.
    Status { from: String, to: String },
    /// A comment was added.
    Comment { text: String },
    /// A batch of attachments was added.
    Attach { count: usize },
    /// Attachments with this name were removed.
    Detach { name: String },
}

/// A tracked defect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Defect {
    /// Store-assigned identifier, `0` until inserted.
    pub id: i64,
    pub title: String,
    pub desc: Option<String>,
    /// Free-form status; no transition graph is enforced.
    pub status: String,
    pub priority: String,
    pub assignee: Option<String>,
    pub due: Option<String>,
    pub attachments: Vec<Attachment>,
    pub comments: Vec<Comment>,
    pub history: History<DefectEvent>,
    /// Optimistic concurrency version, bumped by every stored update.
    pub version: i64,
    /// When this record was created.
    pub created_at: DateTime<Utc>,
}

impl Defect {
    /// Creates a defect from a draft and seeds its history with `create`.
    pub fn create(draft: DefectDraft) -> Self {
        let priority = if draft.priority.is_empty() {
            default_priority()
        } else {
            draft.priority.clone()
        };

        Self {
            id: 0,
            title: draft.title.trim().to_string(),
            desc: Some(draft.desc.trim().to_string()),
            status: DEFECT_STATUS_NEW.to_string(),
            priority,
            assignee: Some(draft.assignee.trim().to_string()),
            due: Some(draft.due.clone()),
            attachments: Vec::new(),
            comments: Vec::new(),
            history: History::starting_with(DefectEvent::Create(draft)),
            version: 1,
            created_at: Utc::now(),
        }
    }

    /// Returns a snapshot of the fields a patch may touch.
    pub fn fields(&self) -> DefectFields {
        DefectFields {
            title: self.title.clone(),
            desc: self.desc.clone(),
            priority: self.priority.clone(),
            assignee: self.assignee.clone(),
            due: self.due.clone(),
            status: self.status.clone(),
        }
    }

    /// Assigns every field present in the patch and records `update`.
    pub fn apply_patch(&mut self, patch: DefectPatch) {
        let before = self.fields();

        if let Some(title) = &patch.title {
            self.title = title.clone();
        }
        if let Some(desc) = &patch.desc {
            self.desc = Some(desc.clone());
        }
        if let Some(priority) = &patch.priority {
            self.priority = priority.clone();
        }
        if let Some(assignee) = &patch.assignee {
            self.assignee = Some(assignee.clone());
        }
        if let Some(due) = &patch.due {
            self.due = Some(due.clone());
        }
        if let Some(status) = &patch.status {
            self.status = status.clone();
        }

        self.history.record(DefectEvent::Update {
            before,
            after: patch,
        });
    }

    /// Moves the defect to any status and records `status`.
    pub fn set_status(&mut self, status: impl Into<String>) {
        let to = status.into();
        let from = std::mem::replace(&mut self.status, to.clone());
        self.history.record(DefectEvent::Status { from, to });
    }

    /// Appends a comment with a fresh id and records `comment`.
    pub fn add_comment(&mut self, text: impl Into<String>) -> &Comment {
        let text = text.into();
        let id = allocate_child_id(|id| self.comments.iter().any(|c| c.id == id));
        self.comments.push(Comment {
            id,
            text: text.clone(),
        });
        self.history.record(DefectEvent::Comment { text });
        &self.comments[self.comments.len() - 1]
    }

    /// Appends a batch of attachments under a single `attach` entry.
    pub fn add_attachments(&mut self, files: Vec<Attachment>) {
        let count = files.len();
        self.attachments.extend(files);
        self.history.record(DefectEvent::Attach { count });
    }

    /// Removes attachments named `name`.
    ///
    /// Returns false and leaves the defect untouched when none matched.
    pub fn remove_attachment(&mut self, name: &str) -> bool {
        let before = self.attachments.len();
        self.attachments.retain(|a| a.name != name);
        if self.attachments.len() == before {
            return false;
        }
        self.history.record(DefectEvent::Detach {
            name: name.to_string(),
        });
        true
    }

    /// Returns true if the status is exactly the closed status.
    pub fn is_closed(&self) -> bool {
        self.status == DEFECT_STATUS_CLOSED
    }
}

/// Aggregate counts over all defects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefectStats {
    pub total: u64,
    pub closed: u64,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_create_seeds_history() {
        let draft = DefectDraft {
            title: "  Crash on save ".to_string(),
            desc: "Steps".to_string(),
            priority: "Высокий".to_string(),
            assignee: " dev ".to_string(),
            due: "2025-12-31".to_string(),
        };
        let defect = Defect::create(draft.clone());

        assert_eq!(defect.title, "Crash on save");
        assert_eq!(defect.assignee.as_deref(), Some("dev"));
        assert_eq!(defect.status, DEFECT_STATUS_NEW);
        assert_eq!(defect.version, 1);
        assert_eq!(defect.history.len(), 1);
        assert_eq!(defect.history.entries()[0].event, DefectEvent::Create(draft));
    }

    #[test]
    fn test_create_defaults_priority() {
        let defect = Defect::create(DefectDraft::new("X"));
        assert_eq!(defect.priority, DEFAULT_DEFECT_PRIORITY);
        assert!(defect.attachments.is_empty());
        assert!(defect.comments.is_empty());
    }

    #[test]
    fn test_patch_touches_only_present_fields() {
        let mut defect = Defect::create(DefectDraft::new("X"));
        let untouched = defect.fields();

        defect.apply_patch(DefectPatch {
            assignee: Some("qa".to_string()),
            ..Default::default()
        });

        assert_eq!(defect.assignee.as_deref(), Some("qa"));
        assert_eq!(defect.title, untouched.title);
        assert_eq!(defect.desc, untouched.desc);
        assert_eq!(defect.priority, untouched.priority);
        assert_eq!(defect.due, untouched.due);
        assert_eq!(defect.status, untouched.status);

        let value = serde_json::to_value(&defect.history).unwrap();
        assert_eq!(value[1]["action"], "update");
        assert_eq!(value[1]["payload"]["after"], json!({"assignee": "qa"}));
        assert_eq!(value[1]["payload"]["before"]["assignee"], "");
    }

    #[test]
    fn test_status_transition_is_unrestricted() {
        let mut defect = Defect::create(DefectDraft::new("X"));
        defect.set_status(DEFECT_STATUS_CLOSED);
        defect.set_status("Новая");

        assert_eq!(defect.history.len(), 3);
        assert_eq!(
            defect.history.entries()[1].event,
            DefectEvent::Status {
                from: DEFECT_STATUS_NEW.to_string(),
                to: DEFECT_STATUS_CLOSED.to_string(),
            }
        );
        assert!(!defect.is_closed());
    }

    #[test]
    fn test_comment_ids_are_unique() {
        let mut defect = Defect::create(DefectDraft::new("X"));
        let first = defect.add_comment("one").id;
        let second = defect.add_comment("two").id;

        assert_ne!(first, second);
        assert_eq!(defect.comments.len(), 2);
        assert_eq!(
            defect.history.last().map(|e| &e.event),
            Some(&DefectEvent::Comment {
                text: "two".to_string()
            })
        );
    }

    #[test]
    fn test_attachment_round_trip() {
        let mut defect = Defect::create(DefectDraft::new("X"));
        let before_add = defect.attachments.clone();

        defect.add_attachments(vec![Attachment::new("a.txt", 1, "YQ==")]);
        assert!(defect.remove_attachment("a.txt"));

        assert_eq!(defect.attachments, before_add);
        let actions: Vec<_> = defect.history.iter().skip(1).map(|e| e.event.clone()).collect();
        assert_eq!(
            actions,
            vec![
                DefectEvent::Attach { count: 1 },
                DefectEvent::Detach {
                    name: "a.txt".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_batch_attach_records_one_entry() {
        let mut defect = Defect::create(DefectDraft::new("X"));
        defect.add_attachments(vec![
            Attachment::new("a.txt", 1, "YQ=="),
            Attachment::new("b.txt", 1, "Yg=="),
            Attachment::new("c.txt", 1, "Yw=="),
        ]);

        assert_eq!(defect.attachments.len(), 3);
        assert_eq!(defect.history.len(), 2);
        assert_eq!(
            defect.history.last().map(|e| &e.event),
            Some(&DefectEvent::Attach { count: 3 })
        );
    }

    #[test]
    fn test_remove_missing_attachment_is_noop() {
        let mut defect = Defect::create(DefectDraft::new("X"));
        let before = defect.clone();

        assert!(!defect.remove_attachment("nope"));
        assert_eq!(defect, before);
    }
}
