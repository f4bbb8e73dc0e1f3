//! In-memory record store implementation for testing.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use entities::{Defect, DefectStats, Project, StageOption, User};
use tokio::sync::RwLock;

use crate::{ListOrder, RecordStore, StoreError, StoreResult};

/// Rows of one entity type plus its id sequence.
#[derive(Debug)]
struct Table<T> {
    next_id: i64,
    rows: BTreeMap<i64, T>,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self {
            next_id: 1,
            rows: BTreeMap::new(),
        }
    }
}

impl<T: Clone> Table<T> {
    fn allocate_id(&mut self) -> i64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn list(&self, order: ListOrder) -> Vec<T> {
        match order {
            ListOrder::Ascending => self.rows.values().cloned().collect(),
            ListOrder::Descending => self.rows.values().rev().cloned().collect(),
        }
    }
}

/// In-memory record store for tests and throwaway deployments.
///
/// Each table sits behind its own lock; a write holds the lock for the whole
/// read-check-write sequence, which gives every operation the same
/// all-or-nothing behaviour as a database transaction.
#[derive(Debug, Default, Clone)]
pub struct MemoryRecordStore {
    users: Arc<RwLock<Table<User>>>,
    defects: Arc<RwLock<Table<Defect>>>,
    projects: Arc<RwLock<Table<Project>>>,
    stage_options: Arc<RwLock<Table<StageOption>>>,
}

impl MemoryRecordStore {
    /// Creates a new in-memory record store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    // =========================================================================
    // User operations
    // =========================================================================

    async fn insert_user(&self, mut user: User) -> StoreResult<User> {
        let mut users = self.users.write().await;
        if users.rows.values().any(|u| u.email == user.email) {
            return Err(StoreError::duplicate_key("User", user.email));
        }
        user.id = users.allocate_id();
        users.rows.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get_user(&self, id: i64) -> StoreResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users.rows.get(&id).cloned())
    }

    async fn get_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users.rows.values().find(|u| u.email == email).cloned())
    }

    async fn list_users(&self, order: ListOrder) -> StoreResult<Vec<User>> {
        let users = self.users.read().await;
        Ok(users.list(order))
    }

    async fn update_user(&self, user: User) -> StoreResult<User> {
        let mut users = self.users.write().await;
        if !users.rows.contains_key(&user.id) {
            return Err(StoreError::not_found("User", user.id));
        }
        if users
            .rows
            .values()
            .any(|u| u.id != user.id && u.email == user.email)
        {
            return Err(StoreError::duplicate_key("User", user.email));
        }
        users.rows.insert(user.id, user.clone());
        Ok(user)
    }

    async fn delete_user(&self, id: i64) -> StoreResult<()> {
        let mut users = self.users.write().await;
        if users.rows.remove(&id).is_none() {
            return Err(StoreError::not_found("User", id));
        }
        Ok(())
    }

    // =========================================================================
    // Defect operations
    // =========================================================================

    async fn insert_defect(&self, mut defect: Defect) -> StoreResult<Defect> {
        let mut defects = self.defects.write().await;
        defect.id = defects.allocate_id();
        defects.rows.insert(defect.id, defect.clone());
        Ok(defect)
    }

    async fn get_defect(&self, id: i64) -> StoreResult<Option<Defect>> {
        let defects = self.defects.read().await;
        Ok(defects.rows.get(&id).cloned())
    }

    async fn list_defects(&self, order: ListOrder) -> StoreResult<Vec<Defect>> {
        let defects = self.defects.read().await;
        Ok(defects.list(order))
    }

    async fn update_defect(&self, mut defect: Defect) -> StoreResult<Defect> {
        let mut defects = self.defects.write().await;
        let stored = defects
            .rows
            .get(&defect.id)
            .ok_or_else(|| StoreError::not_found("Defect", defect.id))?;
        if stored.version != defect.version {
            return Err(StoreError::version_conflict("Defect", defect.id));
        }
        defect.version += 1;
        defects.rows.insert(defect.id, defect.clone());
        Ok(defect)
    }

    async fn delete_defect(&self, id: i64) -> StoreResult<()> {
        let mut defects = self.defects.write().await;
        if defects.rows.remove(&id).is_none() {
            return Err(StoreError::not_found("Defect", id));
        }
        Ok(())
    }

    async fn defect_stats(&self) -> StoreResult<DefectStats> {
        let defects = self.defects.read().await;
        Ok(DefectStats {
            total: defects.rows.len() as u64,
            closed: defects.rows.values().filter(|d| d.is_closed()).count() as u64,
        })
    }

    // =========================================================================
    // Project operations
    // =========================================================================

    async fn insert_project(&self, mut project: Project) -> StoreResult<Project> {
        let mut projects = self.projects.write().await;
        project.id = projects.allocate_id();
        projects.rows.insert(project.id, project.clone());
        Ok(project)
    }

    async fn get_project(&self, id: i64) -> StoreResult<Option<Project>> {
        let projects = self.projects.read().await;
        Ok(projects.rows.get(&id).cloned())
    }

    async fn list_projects(&self, order: ListOrder) -> StoreResult<Vec<Project>> {
        let projects = self.projects.read().await;
        Ok(projects.list(order))
    }

    async fn update_project(&self, mut project: Project) -> StoreResult<Project> {
        let mut projects = self.projects.write().await;
        let stored = projects
            .rows
            .get(&project.id)
            .ok_or_else(|| StoreError::not_found("Project", project.id))?;
        if stored.version != project.version {
            return Err(StoreError::version_conflict("Project", project.id));
        }
        project.version += 1;
        projects.rows.insert(project.id, project.clone());
        Ok(project)
    }

    async fn delete_project(&self, id: i64) -> StoreResult<()> {
        let mut projects = self.projects.write().await;
        if projects.rows.remove(&id).is_none() {
            return Err(StoreError::not_found("Project", id));
        }
        Ok(())
    }

    // =========================================================================
    // Stage option operations
    // =========================================================================

    async fn insert_stage_option(&self, name: &str) -> StoreResult<StageOption> {
        let mut options = self.stage_options.write().await;
        if options.rows.values().any(|o| o.name == name) {
            return Err(StoreError::duplicate_key("StageOption", name));
        }
        let option = StageOption {
            id: options.allocate_id(),
            name: name.to_string(),
        };
        options.rows.insert(option.id, option.clone());
        Ok(option)
    }

    async fn get_stage_option_by_name(&self, name: &str) -> StoreResult<Option<StageOption>> {
        let options = self.stage_options.read().await;
        Ok(options.rows.values().find(|o| o.name == name).cloned())
    }

    async fn list_stage_options(&self, order: ListOrder) -> StoreResult<Vec<StageOption>> {
        let options = self.stage_options.read().await;
        Ok(options.list(order))
    }

    async fn count_stage_options(&self) -> StoreResult<u64> {
        let options = self.stage_options.read().await;
        Ok(options.rows.len() as u64)
    }

    async fn delete_stage_option(&self, name: &str) -> StoreResult<()> {
        let mut options = self.stage_options.write().await;
        let id = options
            .rows
            .values()
            .find(|o| o.name == name)
            .map(|o| o.id)
            .ok_or_else(|| StoreError::not_found("StageOption", name))?;
        options.rows.remove(&id);
        Ok(())
    }

    async fn replace_stage_options(&self, names: &[&str]) -> StoreResult<Vec<StageOption>> {
        let mut options = self.stage_options.write().await;
        let mut replacement = BTreeMap::new();
        for name in names {
            if replacement.values().any(|o: &StageOption| o.name == *name) {
                return Err(StoreError::duplicate_key("StageOption", *name));
            }
            let option = StageOption {
                id: options.allocate_id(),
                name: name.to_string(),
            };
            replacement.insert(option.id, option);
        }
        options.rows = replacement;
        Ok(options.list(ListOrder::Ascending))
    }
}

#[cfg(test)]
mod tests {
    use entities::{
        DEFECT_STATUS_CLOSED, DEFAULT_STAGE_OPTIONS, DefectDraft, ProjectDraft,
    };

    use super::*;

    #[tokio::test]
    async fn test_user_crud() {
        let store = MemoryRecordStore::new();

        // Create
        let created = store
            .insert_user(User::new("a@example.com", "hash"))
            .await
            .unwrap();
        assert_eq!(created.id, 1);

        // Duplicate email
        let err = store
            .insert_user(User::new("a@example.com", "hash"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateKey { .. }));

        // Emails are case-sensitive
        store
            .insert_user(User::new("A@example.com", "hash"))
            .await
            .unwrap();

        // Get
        let fetched = store.get_user_by_email("a@example.com").await.unwrap().unwrap();
        assert_eq!(fetched.id, created.id);

        // Update
        let updated = store
            .update_user(fetched.with_role("admin"))
            .await
            .unwrap();
        assert!(updated.is_admin());

        // List
        let users = store.list_users(ListOrder::Ascending).await.unwrap();
        assert_eq!(users.iter().map(|u| u.id).collect::<Vec<_>>(), vec![1, 2]);

        // Delete
        store.delete_user(created.id).await.unwrap();
        assert!(store.get_user(created.id).await.unwrap().is_none());
        assert!(store.delete_user(created.id).await.is_err());
    }

    #[tokio::test]
    async fn test_ids_are_not_reused() {
        let store = MemoryRecordStore::new();

        let first = store.insert_defect(Defect::create(DefectDraft::new("A"))).await.unwrap();
        store.delete_defect(first.id).await.unwrap();
        let second = store.insert_defect(Defect::create(DefectDraft::new("B"))).await.unwrap();

        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
    }

    #[tokio::test]
    async fn test_defect_version_conflict() {
        let store = MemoryRecordStore::new();
        let defect = store.insert_defect(Defect::create(DefectDraft::new("A"))).await.unwrap();

        let mut first = defect.clone();
        first.set_status("В работе");
        let mut second = defect.clone();
        second.add_comment("late");

        let saved = store.update_defect(first).await.unwrap();
        assert_eq!(saved.version, defect.version + 1);

        let err = store.update_defect(second).await.unwrap_err();
        assert!(matches!(err, StoreError::VersionConflict { .. }));

        let stored = store.get_defect(defect.id).await.unwrap().unwrap();
        assert!(stored.comments.is_empty());
        assert_eq!(stored.history.len(), 2);
    }

    #[tokio::test]
    async fn test_defect_stats_exact_match() {
        let store = MemoryRecordStore::new();
        for status in [DEFECT_STATUS_CLOSED, "закрыта", "Новая"] {
            let mut defect = Defect::create(DefectDraft::new("A"));
            defect.status = status.to_string();
            store.insert_defect(defect).await.unwrap();
        }

        let stats = store.defect_stats().await.unwrap();
        assert_eq!(stats, DefectStats { total: 3, closed: 1 });
    }

    #[tokio::test]
    async fn test_project_list_order() {
        let store = MemoryRecordStore::new();
        store.insert_project(Project::create(ProjectDraft::new("A"))).await.unwrap();
        store.insert_project(Project::create(ProjectDraft::new("B"))).await.unwrap();

        let projects = store.list_projects(ListOrder::Descending).await.unwrap();
        assert_eq!(projects[0].name, "B");
        assert_eq!(projects[1].name, "A");
    }

    #[tokio::test]
    async fn test_replace_stage_options() {
        let store = MemoryRecordStore::new();
        store.insert_stage_option("Custom").await.unwrap();
        assert!(store.insert_stage_option("Custom").await.is_err());

        let options = store.replace_stage_options(&DEFAULT_STAGE_OPTIONS).await.unwrap();
        let names: Vec<_> = options.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, DEFAULT_STAGE_OPTIONS);
        assert!(store.get_stage_option_by_name("Custom").await.unwrap().is_none());
        assert_eq!(store.count_stage_options().await.unwrap(), 3);
    }
}
