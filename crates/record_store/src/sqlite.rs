//! SQLite record store backed by sqlx.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use entities::{
    DEFECT_STATUS_CLOSED, Defect, DefectStats, History, Project, StageOption, User,
};
use sqlx::{FromRow, Pool, Sqlite, sqlite::SqlitePoolOptions};

use crate::{ListOrder, RecordStore, StoreError, StoreResult};

/// Schema applied on connect.
///
/// Collections and history live in JSON columns on the owning row, so one
/// UPDATE persists a mutation together with its history entry.
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    email TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL,
    role TEXT NOT NULL DEFAULT 'engineer',
    password_hash TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS defects (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    description TEXT,
    status TEXT NOT NULL,
    priority TEXT NOT NULL,
    assignee TEXT,
    due TEXT,
    attachments TEXT NOT NULL DEFAULT '[]',
    comments TEXT NOT NULL DEFAULT '[]',
    history TEXT NOT NULL DEFAULT '[]',
    version INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_defects_status ON defects (status);

CREATE TABLE IF NOT EXISTS projects (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    description TEXT,
    stages TEXT NOT NULL DEFAULT '[]',
    attachments TEXT NOT NULL DEFAULT '[]',
    history TEXT NOT NULL DEFAULT '[]',
    version INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS stage_options (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE
);
"#;

fn order_sql(order: ListOrder) -> &'static str {
    match order {
        ListOrder::Ascending => "ASC",
        ListOrder::Descending => "DESC",
    }
}

/// Maps a UNIQUE constraint failure to `DuplicateKey`.
fn unique_violation(err: sqlx::Error, entity_type: &'static str, key: &str) -> StoreError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            StoreError::duplicate_key(entity_type, key)
        }
        _ => StoreError::Database(err),
    }
}

/// Database row for User
#[derive(Debug, FromRow)]
struct UserRow {
    id: i64,
    email: String,
    name: String,
    role: String,
    password_hash: String,
    created_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            email: row.email,
            name: row.name,
            role: row.role,
            password_hash: row.password_hash,
            created_at: row.created_at,
        }
    }
}

/// Database row for Defect
#[derive(Debug, FromRow)]
struct DefectRow {
    id: i64,
    title: String,
    description: Option<String>,
    status: String,
    priority: String,
    assignee: Option<String>,
    due: Option<String>,
    attachments: String,
    comments: String,
    history: String,
    version: i64,
    created_at: DateTime<Utc>,
}

impl TryFrom<DefectRow> for Defect {
    type Error = StoreError;

    fn try_from(row: DefectRow) -> StoreResult<Self> {
        Ok(Defect {
            id: row.id,
            title: row.title,
            desc: row.description,
            status: row.status,
            priority: row.priority,
            assignee: row.assignee,
            due: row.due,
            attachments: serde_json::from_str(&row.attachments)?,
            comments: serde_json::from_str(&row.comments)?,
            history: serde_json::from_str::<History<_>>(&row.history)?,
            version: row.version,
            created_at: row.created_at,
        })
    }
}

/// Database row for Project
#[derive(Debug, FromRow)]
struct ProjectRow {
    id: i64,
    name: String,
    description: Option<String>,
    stages: String,
    attachments: String,
    history: String,
    version: i64,
    created_at: DateTime<Utc>,
}

impl TryFrom<ProjectRow> for Project {
    type Error = StoreError;

    fn try_from(row: ProjectRow) -> StoreResult<Self> {
        Ok(Project {
            id: row.id,
            name: row.name,
            description: row.description,
            stages: serde_json::from_str(&row.stages)?,
            attachments: serde_json::from_str(&row.attachments)?,
            history: serde_json::from_str::<History<_>>(&row.history)?,
            version: row.version,
            created_at: row.created_at,
        })
    }
}

/// Database row for StageOption
#[derive(Debug, FromRow)]
struct StageOptionRow {
    id: i64,
    name: String,
}

impl From<StageOptionRow> for StageOption {
    fn from(row: StageOptionRow) -> Self {
        StageOption {
            id: row.id,
            name: row.name,
        }
    }
}

/// SQLite record store.
#[derive(Debug, Clone)]
pub struct SqliteRecordStore {
    pool: Pool<Sqlite>,
}

impl SqliteRecordStore {
    /// Connects to `database_url` and applies the schema.
    ///
    /// In-memory databases are limited to a single connection, since every
    /// connection to `:memory:` opens a separate database.
    pub async fn connect(database_url: &str) -> StoreResult<Self> {
        let max_connections = if database_url.contains(":memory:") { 1 } else { 5 };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        let store = Self::from_pool(pool);
        store.init().await?;

        tracing::info!(database_url, "SQLite record store ready");

        Ok(store)
    }

    /// Wraps an existing pool without touching the schema.
    pub fn from_pool(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    /// Creates missing tables.
    pub async fn init(&self) -> StoreResult<()> {
        sqlx::query(SCHEMA_SQL).execute(&self.pool).await?;
        Ok(())
    }

    /// Returns a reference to the connection pool
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    /// Resolves a zero-row versioned UPDATE into the right error.
    async fn missing_or_conflict(
        &self,
        table: &'static str,
        entity_type: &'static str,
        id: i64,
    ) -> StoreError {
        let sql = format!("SELECT COUNT(*) FROM {table} WHERE id = ?");
        match sqlx::query_scalar::<_, i64>(&sql)
            .bind(id)
            .fetch_one(&self.pool)
            .await
        {
            Ok(0) => StoreError::not_found(entity_type, id),
            Ok(_) => StoreError::version_conflict(entity_type, id),
            Err(e) => StoreError::Database(e),
        }
    }
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    // =========================================================================
    // User operations
    // =========================================================================

    async fn insert_user(&self, mut user: User) -> StoreResult<User> {
        let result = sqlx::query(
            "INSERT INTO users (email, name, role, password_hash, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&user.email)
        .bind(&user.name)
        .bind(&user.role)
        .bind(&user.password_hash)
        .bind(user.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| unique_violation(e, "User", &user.email))?;

        user.id = result.last_insert_rowid();
        Ok(user)
    }

    async fn get_user(&self, id: i64) -> StoreResult<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(User::from))
    }

    async fn get_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as("SELECT * FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(User::from))
    }

    async fn list_users(&self, order: ListOrder) -> StoreResult<Vec<User>> {
        let sql = format!("SELECT * FROM users ORDER BY id {}", order_sql(order));
        let rows: Vec<UserRow> = sqlx::query_as(&sql).fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(User::from).collect())
    }

    async fn update_user(&self, user: User) -> StoreResult<User> {
        let result = sqlx::query(
            "UPDATE users SET email = ?, name = ?, role = ?, password_hash = ? WHERE id = ?",
        )
        .bind(&user.email)
        .bind(&user.name)
        .bind(&user.role)
        .bind(&user.password_hash)
        .bind(user.id)
        .execute(&self.pool)
        .await
        .map_err(|e| unique_violation(e, "User", &user.email))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("User", user.id));
        }
        Ok(user)
    }

    async fn delete_user(&self, id: i64) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("User", id));
        }
        Ok(())
    }

    // =========================================================================
    // Defect operations
    // =========================================================================

    async fn insert_defect(&self, mut defect: Defect) -> StoreResult<Defect> {
        let result = sqlx::query(
            r#"
            INSERT INTO defects
                (title, description, status, priority, assignee, due,
                 attachments, comments, history, version, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&defect.title)
        .bind(&defect.desc)
        .bind(&defect.status)
        .bind(&defect.priority)
        .bind(&defect.assignee)
        .bind(&defect.due)
        .bind(serde_json::to_string(&defect.attachments)?)
        .bind(serde_json::to_string(&defect.comments)?)
        .bind(serde_json::to_string(&defect.history)?)
        .bind(defect.version)
        .bind(defect.created_at)
        .execute(&self.pool)
        .await?;

        defect.id = result.last_insert_rowid();
        Ok(defect)
    }

    async fn get_defect(&self, id: i64) -> StoreResult<Option<Defect>> {
        let row: Option<DefectRow> = sqlx::query_as("SELECT * FROM defects WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Defect::try_from).transpose()
    }

    async fn list_defects(&self, order: ListOrder) -> StoreResult<Vec<Defect>> {
        let sql = format!("SELECT * FROM defects ORDER BY id {}", order_sql(order));
        let rows: Vec<DefectRow> = sqlx::query_as(&sql).fetch_all(&self.pool).await?;
        rows.into_iter().map(Defect::try_from).collect()
    }

    async fn update_defect(&self, mut defect: Defect) -> StoreResult<Defect> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE defects SET
                title = ?, description = ?, status = ?, priority = ?, assignee = ?, due = ?,
                attachments = ?, comments = ?, history = ?, version = version + 1
            WHERE id = ? AND version = ?
            "#,
        )
        .bind(&defect.title)
        .bind(&defect.desc)
        .bind(&defect.status)
        .bind(&defect.priority)
        .bind(&defect.assignee)
        .bind(&defect.due)
        .bind(serde_json::to_string(&defect.attachments)?)
        .bind(serde_json::to_string(&defect.comments)?)
        .bind(serde_json::to_string(&defect.history)?)
        .bind(defect.id)
        .bind(defect.version)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(self.missing_or_conflict("defects", "Defect", defect.id).await);
        }

        tx.commit().await?;
        defect.version += 1;
        Ok(defect)
    }

    async fn delete_defect(&self, id: i64) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM defects WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("Defect", id));
        }
        Ok(())
    }

    async fn defect_stats(&self) -> StoreResult<DefectStats> {
        let (total, closed): (i64, i64) = sqlx::query_as(
            "SELECT COUNT(*), COALESCE(SUM(CASE WHEN status = ? THEN 1 ELSE 0 END), 0) FROM defects",
        )
        .bind(DEFECT_STATUS_CLOSED)
        .fetch_one(&self.pool)
        .await?;

        Ok(DefectStats {
            total: total as u64,
            closed: closed as u64,
        })
    }

    // =========================================================================
    // Project operations
    // =========================================================================

    async fn insert_project(&self, mut project: Project) -> StoreResult<Project> {
        let result = sqlx::query(
            r#"
            INSERT INTO projects
                (name, description, stages, attachments, history, version, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&project.name)
        .bind(&project.description)
        .bind(serde_json::to_string(&project.stages)?)
        .bind(serde_json::to_string(&project.attachments)?)
        .bind(serde_json::to_string(&project.history)?)
        .bind(project.version)
        .bind(project.created_at)
        .execute(&self.pool)
        .await?;

        project.id = result.last_insert_rowid();
        Ok(project)
    }

    async fn get_project(&self, id: i64) -> StoreResult<Option<Project>> {
        let row: Option<ProjectRow> = sqlx::query_as("SELECT * FROM projects WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Project::try_from).transpose()
    }

    async fn list_projects(&self, order: ListOrder) -> StoreResult<Vec<Project>> {
        let sql = format!("SELECT * FROM projects ORDER BY id {}", order_sql(order));
        let rows: Vec<ProjectRow> = sqlx::query_as(&sql).fetch_all(&self.pool).await?;
        rows.into_iter().map(Project::try_from).collect()
    }

    async fn update_project(&self, mut project: Project) -> StoreResult<Project> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE projects SET
                name = ?, description = ?, stages = ?, attachments = ?, history = ?,
                version = version + 1
            WHERE id = ? AND version = ?
            "#,
        )
        .bind(&project.name)
        .bind(&project.description)
        .bind(serde_json::to_string(&project.stages)?)
        .bind(serde_json::to_string(&project.attachments)?)
        .bind(serde_json::to_string(&project.history)?)
        .bind(project.id)
        .bind(project.version)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(self.missing_or_conflict("projects", "Project", project.id).await);
        }

        tx.commit().await?;
        project.version += 1;
        Ok(project)
    }

    async fn delete_project(&self, id: i64) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM projects WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("Project", id));
        }
        Ok(())
    }

    // =========================================================================
    // Stage option operations
    // =========================================================================

    async fn insert_stage_option(&self, name: &str) -> StoreResult<StageOption> {
        let result = sqlx::query("INSERT INTO stage_options (name) VALUES (?)")
            .bind(name)
            .execute(&self.pool)
            .await
            .map_err(|e| unique_violation(e, "StageOption", name))?;

        Ok(StageOption {
            id: result.last_insert_rowid(),
            name: name.to_string(),
        })
    }

    async fn get_stage_option_by_name(&self, name: &str) -> StoreResult<Option<StageOption>> {
        let row: Option<StageOptionRow> =
            sqlx::query_as("SELECT id, name FROM stage_options WHERE name = ?")
                .bind(name)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(StageOption::from))
    }

    async fn list_stage_options(&self, order: ListOrder) -> StoreResult<Vec<StageOption>> {
        let sql = format!(
            "SELECT id, name FROM stage_options ORDER BY id {}",
            order_sql(order)
        );
        let rows: Vec<StageOptionRow> = sqlx::query_as(&sql).fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(StageOption::from).collect())
    }

    async fn count_stage_options(&self) -> StoreResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM stage_options")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }

    async fn delete_stage_option(&self, name: &str) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM stage_options WHERE name = ?")
            .bind(name)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("StageOption", name));
        }
        Ok(())
    }

    async fn replace_stage_options(&self, names: &[&str]) -> StoreResult<Vec<StageOption>> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM stage_options")
            .execute(&mut *tx)
            .await?;

        for name in names {
            sqlx::query("INSERT INTO stage_options (name) VALUES (?)")
                .bind(*name)
                .execute(&mut *tx)
                .await
                .map_err(|e| unique_violation(e, "StageOption", name))?;
        }

        let rows: Vec<StageOptionRow> =
            sqlx::query_as("SELECT id, name FROM stage_options ORDER BY id ASC")
                .fetch_all(&mut *tx)
                .await?;

        tx.commit().await?;

        Ok(rows.into_iter().map(StageOption::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use entities::{Attachment, DEFAULT_STAGE_OPTIONS, DefectDraft, DefectEvent, ProjectDraft};

    use super::*;

    async fn memory_store() -> SqliteRecordStore {
        SqliteRecordStore::connect("sqlite::memory:").await.unwrap()
    }

    #[tokio::test]
    async fn test_created_at_survives_storage() {
        let store = memory_store().await;
        let user = User::new("a@example.com", "hash");
        let created_at = user.created_at;

        let stored = store.insert_user(user).await.unwrap();
        let loaded = store.get_user(stored.id).await.unwrap().unwrap();

        assert_eq!(loaded.created_at, created_at);
    }

    #[tokio::test]
    async fn test_corrupt_timestamp_is_an_error() {
        let store = memory_store().await;
        let user = store
            .insert_user(User::new("a@example.com", "hash"))
            .await
            .unwrap();

        sqlx::query("UPDATE users SET created_at = 'yesterday' WHERE id = ?")
            .bind(user.id)
            .execute(store.pool())
            .await
            .unwrap();

        let err = store.get_user(user.id).await.unwrap_err();
        assert!(matches!(err, StoreError::Database(_)));
    }

    #[tokio::test]
    async fn test_user_email_unique() {
        let store = memory_store().await;

        let user = store
            .insert_user(User::new("a@example.com", "hash").with_role("admin"))
            .await
            .unwrap();
        assert_eq!(user.id, 1);

        let err = store
            .insert_user(User::new("a@example.com", "other"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateKey { .. }));

        let fetched = store.get_user_by_email("a@example.com").await.unwrap().unwrap();
        assert_eq!(fetched.password_hash, "hash");
        assert!(fetched.is_admin());
    }

    #[tokio::test]
    async fn test_defect_history_persists() {
        let store = memory_store().await;

        let defect = store
            .insert_defect(Defect::create(DefectDraft::new("X")))
            .await
            .unwrap();
        assert_eq!(defect.id, 1);

        let mut loaded = store.get_defect(defect.id).await.unwrap().unwrap();
        loaded.set_status(DEFECT_STATUS_CLOSED);
        loaded.add_attachments(vec![Attachment::new("a.txt", 1, "YQ==")]);
        let saved = store.update_defect(loaded).await.unwrap();
        assert_eq!(saved.version, 2);

        let reloaded = store.get_defect(defect.id).await.unwrap().unwrap();
        assert_eq!(reloaded.version, 2);
        assert_eq!(reloaded.attachments.len(), 1);
        assert_eq!(reloaded.history.len(), 3);
        assert_eq!(
            reloaded.history.entries()[1].event,
            DefectEvent::Status {
                from: "Новая".to_string(),
                to: DEFECT_STATUS_CLOSED.to_string(),
            }
        );

        let stats = store.defect_stats().await.unwrap();
        assert_eq!(stats, DefectStats { total: 1, closed: 1 });
    }

    #[tokio::test]
    async fn test_stale_update_is_rejected() {
        let store = memory_store().await;
        let defect = store
            .insert_defect(Defect::create(DefectDraft::new("X")))
            .await
            .unwrap();

        let mut first = defect.clone();
        first.set_status("В работе");
        store.update_defect(first).await.unwrap();

        let mut stale = defect.clone();
        stale.add_comment("lost");
        let err = store.update_defect(stale).await.unwrap_err();
        assert!(matches!(err, StoreError::VersionConflict { .. }));

        let mut missing = defect.clone();
        missing.id = 99;
        let err = store.update_defect(missing).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_project_crud() {
        let store = memory_store().await;

        let created = store
            .insert_project(Project::create(ProjectDraft::new("Bridge")))
            .await
            .unwrap();
        let mut project = store.get_project(created.id).await.unwrap().unwrap();
        project.add_stage("Design");
        store.update_project(project).await.unwrap();

        let projects = store.list_projects(ListOrder::Descending).await.unwrap();
        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0].stages[0].title, "Design");

        store.delete_project(created.id).await.unwrap();
        assert!(store.get_project(created.id).await.unwrap().is_none());
        assert!(matches!(
            store.delete_project(created.id).await,
            Err(StoreError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_stage_options_reset() {
        let store = memory_store().await;
        store.insert_stage_option("Custom").await.unwrap();
        assert!(matches!(
            store.insert_stage_option("Custom").await,
            Err(StoreError::DuplicateKey { .. })
        ));

        let options = store.replace_stage_options(&DEFAULT_STAGE_OPTIONS).await.unwrap();
        let names: Vec<_> = options.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, DEFAULT_STAGE_OPTIONS);
        assert_eq!(store.count_stage_options().await.unwrap(), 3);

        store.delete_stage_option("Анализ").await.unwrap();
        assert!(store.get_stage_option_by_name("Анализ").await.unwrap().is_none());
    }
}
