//! REST request types.

use entities::{Attachment, DefectDraft, DefectPatch, ProjectDraft, ProjectPatch};
use serde::{Deserialize, Serialize};

// ============================================================================
// Auth Service Requests
// ============================================================================

/// `POST /auth/register`. `username` is the email address.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// `POST /auth/login`, sent as an urlencoded form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileUpdateRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PasswordChangeRequest {
    pub old_password: String,
    pub new_password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleUpdateRequest {
    pub role: String,
}

// ============================================================================
// Defects Service Requests
// ============================================================================

pub type CreateDefectRequest = DefectDraft;

/// `PATCH /defects/{id}`.
///
/// `version`, when present, must equal the stored version or the request is
/// rejected with a conflict.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateDefectRequest {
    #[serde(flatten)]
    pub patch: DefectPatch,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentCreateRequest {
    pub text: String,
}

/// Batch of files for `POST /defects/{id}/attachments` and the project
/// equivalent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttachmentsAddRequest {
    pub files: Vec<Attachment>,
}

// ============================================================================
// Projects Service Requests
// ============================================================================

pub type CreateProjectRequest = ProjectDraft;

/// `PATCH /projects/{id}`; `version` behaves as in [`UpdateDefectRequest`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateProjectRequest {
    #[serde(flatten)]
    pub patch: ProjectPatch,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageAddRequest {
    pub title: String,
}

// ============================================================================
// Settings Service Requests
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageOptionCreateRequest {
    pub name: String,
}
