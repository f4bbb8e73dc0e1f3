//! Record store trait definitions.

use async_trait::async_trait;
use entities::{Defect, DefectStats, Project, StageOption, User};

use crate::StoreResult;

/// Ordering of list results by identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListOrder {
    /// Oldest first.
    #[default]
    Ascending,
    /// Newest first.
    Descending,
}

/// Trait for record storage operations.
///
/// `insert_*` ignores the incoming id and returns the record with the id the
/// store assigned. `update_*` replaces every mutable field of an existing
/// record; for versioned records the supplied version must match the stored
/// one and the returned record carries the bumped version.
#[async_trait]
pub trait RecordStore: Send + Sync {
    // =========================================================================
    // User operations
    // =========================================================================

    /// Inserts a user. Fails with `DuplicateKey` if the email is taken.
    async fn insert_user(&self, user: User) -> StoreResult<User>;

    /// Gets a user by ID.
    async fn get_user(&self, id: i64) -> StoreResult<Option<User>>;

    /// Gets a user by exact email.
    async fn get_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    /// Lists all users.
    async fn list_users(&self, order: ListOrder) -> StoreResult<Vec<User>>;

    /// Updates a user.
    async fn update_user(&self, user: User) -> StoreResult<User>;

    /// Deletes a user.
    async fn delete_user(&self, id: i64) -> StoreResult<()>;

    // =========================================================================
    // Defect operations
    // =========================================================================

    /// Inserts a defect together with its seeded history.
    async fn insert_defect(&self, defect: Defect) -> StoreResult<Defect>;

    /// Gets a defect by ID.
    async fn get_defect(&self, id: i64) -> StoreResult<Option<Defect>>;

    /// Lists all defects.
    async fn list_defects(&self, order: ListOrder) -> StoreResult<Vec<Defect>>;

    /// Writes a defect and its history in one transaction.
    async fn update_defect(&self, defect: Defect) -> StoreResult<Defect>;

    /// Deletes a defect and its history.
    async fn delete_defect(&self, id: i64) -> StoreResult<()>;

    /// Counts all defects and the closed ones.
    async fn defect_stats(&self) -> StoreResult<DefectStats>;

    // =========================================================================
    // Project operations
    // =========================================================================

    /// Inserts a project together with its seeded history.
    async fn insert_project(&self, project: Project) -> StoreResult<Project>;

    /// Gets a project by ID.
    async fn get_project(&self, id: i64) -> StoreResult<Option<Project>>;

    /// Lists all projects.
    async fn list_projects(&self, order: ListOrder) -> StoreResult<Vec<Project>>;

    /// Writes a project and its history in one transaction.
    async fn update_project(&self, project: Project) -> StoreResult<Project>;

    /// Deletes a project and its history.
    async fn delete_project(&self, id: i64) -> StoreResult<()>;

    // =========================================================================
    // Stage option operations
    // =========================================================================

    /// Inserts a stage option. Fails with `DuplicateKey` if the name is taken.
    async fn insert_stage_option(&self, name: &str) -> StoreResult<StageOption>;

    /// Gets a stage option by exact name.
    async fn get_stage_option_by_name(&self, name: &str) -> StoreResult<Option<StageOption>>;

    /// Lists all stage options.
    async fn list_stage_options(&self, order: ListOrder) -> StoreResult<Vec<StageOption>>;

    /// Number of stage options.
    async fn count_stage_options(&self) -> StoreResult<u64>;

    /// Deletes a stage option by name.
    async fn delete_stage_option(&self, name: &str) -> StoreResult<()>;

    /// Replaces every stage option with `names`, in order, atomically.
    async fn replace_stage_options(&self, names: &[&str]) -> StoreResult<Vec<StageOption>>;
}
