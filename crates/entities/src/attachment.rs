//! File attachments and child-id allocation shared by defects and projects.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// A file attached to a defect or project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// File name, also the removal key.
    pub name: String,
    /// Size in bytes.
    pub size: u64,
    /// MIME type, empty when unknown.
    #[serde(rename = "type", default)]
    pub content_type: String,
    /// Encoded file content.
    pub content: String,
}

impl Attachment {
    /// Creates a new attachment.
    pub fn new(name: impl Into<String>, size: u64, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            size,
            content_type: String::new(),
            content: content.into(),
        }
    }

    /// Sets the MIME type.
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }
}

/// Picks an id not used by any sibling child of the same parent.
pub(crate) fn allocate_child_id(mut taken: impl FnMut(i64) -> bool) -> i64 {
    let mut rng = rand::rng();
    loop {
        let id = rng.random_range(1..=i64::from(i32::MAX));
        if !taken(id) {
            return id;
        }
    }
}
