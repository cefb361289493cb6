//! Task lifecycle rules layered over the store.
//!
//! Validates input, applies defaults, manages the archive transitions, and
//! runs the auto-archive sweep. Handlers talk to this type, never to the
//! store directly.

use chrono::Duration;
use uuid::Uuid;

use crate::error::{TaskError, TaskResult};
use crate::store::TaskStore;
use crate::task::{now, Task, TaskDraft, TaskFilter, TaskPatch};

/// Days a done task may sit untouched before the sweep archives it.
pub const DEFAULT_RETENTION_DAYS: i64 = 7;

pub struct TaskService {
    store: TaskStore,
    retention: Duration,
}

impl TaskService {
    pub fn new(store: TaskStore, retention_days: i64) -> Self {
        Self {
            store,
            retention: Duration::days(retention_days.max(0)),
        }
    }

    /// Create a task. The title is required; everything else defaults.
    pub async fn create(&self, draft: TaskDraft, actor: &str) -> TaskResult<Task> {
        if draft.title.trim().is_empty() {
            return Err(TaskError::Validation("Title is required".to_string()));
        }
        let task = Task::new(draft, actor, now());
        self.store.insert(&task).await?;
        tracing::info!(id = %task.id, by = actor, "created task");
        Ok(task)
    }

    pub async fn get(&self, id: Uuid) -> TaskResult<Task> {
        self.store.get(id).await?.ok_or(TaskError::NotFound(id))
    }

    /// Apply a partial update. A patch with no recognized field is rejected;
    /// a `note` field appends to the activity log with `actor` as author.
    pub async fn update(&self, id: Uuid, patch: TaskPatch, actor: &str) -> TaskResult<Task> {
        if patch.is_empty() {
            return Err(TaskError::Validation("No updates provided".to_string()));
        }
        if let Some(title) = &patch.title {
            if title.trim().is_empty() {
                return Err(TaskError::Validation("Title cannot be empty".to_string()));
            }
        }
        self.store
            .update(id, &patch, actor, now())
            .await?
            .ok_or(TaskError::NotFound(id))
    }

    /// Soft delete: mark the task archived. The row is kept.
    pub async fn archive(&self, id: Uuid, actor: &str) -> TaskResult<Task> {
        let task = self
            .update(
                id,
                TaskPatch {
                    archived: Some(true),
                    ..Default::default()
                },
                actor,
            )
            .await?;
        tracing::info!(id = %id, by = actor, "archived task");
        Ok(task)
    }

    /// List tasks. Runs the auto-archive sweep first, so a listing always
    /// reflects the retention policy.
    pub async fn list(&self, filter: &TaskFilter) -> TaskResult<Vec<Task>> {
        self.sweep().await?;
        self.store.list(filter).await
    }

    /// Archive done tasks that sat past the retention window. Idempotent;
    /// safe to run from concurrent list calls.
    pub async fn sweep(&self) -> TaskResult<usize> {
        let now = now();
        let archived = self.store.sweep_stale_done(now - self.retention, now).await?;
        if archived > 0 {
            tracing::info!(count = archived, "auto-archived stale done tasks");
        }
        Ok(archived)
    }

    /// Distinct agent labels among non-archived tasks, sorted ascending.
    pub async fn agents(&self) -> TaskResult<Vec<String>> {
        self.store.agents().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{Priority, Status};
    use chrono::Utc;

    fn service() -> TaskService {
        TaskService::new(TaskStore::open_in_memory().unwrap(), DEFAULT_RETENTION_DAYS)
    }

    fn draft(title: &str) -> TaskDraft {
        TaskDraft {
            title: title.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn create_requires_title() {
        let svc = service();
        let err = svc.create(draft("   "), "alice@example.com").await.unwrap_err();
        assert!(matches!(err, TaskError::Validation(_)));

        let task = svc.create(draft("Fix bug"), "alice@example.com").await.unwrap();
        assert_eq!(task.status, Status::Todo);
        assert_eq!(task.priority, Priority::Medium);
        assert_eq!(task.agent, "main");
        assert_eq!(task.created_by, "alice@example.com");
        assert!(task.tags.is_empty());
    }

    #[tokio::test]
    async fn update_rejects_empty_patch_and_unknown_id() {
        let svc = service();
        let task = svc.create(draft("Fix bug"), "alice@example.com").await.unwrap();

        let err = svc
            .update(task.id, TaskPatch::default(), "alice@example.com")
            .await
            .unwrap_err();
        assert!(matches!(err, TaskError::Validation(_)));

        let err = svc
            .update(
                Uuid::new_v4(),
                TaskPatch {
                    status: Some(Status::Done),
                    ..Default::default()
                },
                "alice@example.com",
            )
            .await
            .unwrap_err();
        assert!(matches!(err, TaskError::NotFound(_)));
    }

    #[tokio::test]
    async fn update_refreshes_updated_at_and_keeps_other_fields() {
        let svc = service();
        let task = svc
            .create(
                TaskDraft {
                    description: Some("details".to_string()),
                    ..draft("Fix bug")
                },
                "alice@example.com",
            )
            .await
            .unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let updated = svc
            .update(
                task.id,
                TaskPatch {
                    priority: Some(Priority::Urgent),
                    ..Default::default()
                },
                "alice@example.com",
            )
            .await
            .unwrap();

        assert!(updated.updated_at > task.updated_at);
        assert_eq!(updated.priority, Priority::Urgent);
        assert_eq!(updated.description.as_deref(), Some("details"));
        assert_eq!(updated.title, "Fix bug");
        assert_eq!(updated.created_at, task.created_at);
    }

    #[tokio::test]
    async fn timestamps_round_trip_through_the_store() {
        let svc = service();
        let created = svc.create(draft("Fix bug"), "alice@example.com").await.unwrap();

        // The value a write returns is exactly what a later read yields.
        let fetched = svc.get(created.id).await.unwrap();
        assert_eq!(fetched.created_at, created.created_at);
        assert_eq!(fetched.updated_at, created.updated_at);

        let updated = svc
            .update(
                created.id,
                TaskPatch {
                    note: Some("looking".to_string()),
                    ..Default::default()
                },
                "alice@example.com",
            )
            .await
            .unwrap();
        let fetched = svc.get(created.id).await.unwrap();
        assert_eq!(fetched.created_at, created.created_at);
        assert_eq!(fetched.updated_at, updated.updated_at);
        assert_eq!(fetched.notes[0].timestamp, updated.notes[0].timestamp);
    }

    #[tokio::test]
    async fn archive_is_a_soft_delete() {
        let svc = service();
        let task = svc.create(draft("Fix bug"), "alice@example.com").await.unwrap();

        let archived = svc.archive(task.id, "alice@example.com").await.unwrap();
        assert!(archived.archived);
        assert!(archived.archived_at.is_some());

        // The record still exists and can be fetched and restored.
        let fetched = svc.get(task.id).await.unwrap();
        assert!(fetched.archived);

        let restored = svc
            .update(
                task.id,
                TaskPatch {
                    archived: Some(false),
                    ..Default::default()
                },
                "alice@example.com",
            )
            .await
            .unwrap();
        assert!(!restored.archived);
        assert!(restored.archived_at.is_none());

        let err = svc.archive(Uuid::new_v4(), "alice@example.com").await.unwrap_err();
        assert!(matches!(err, TaskError::NotFound(_)));
    }

    #[tokio::test]
    async fn list_hides_archived_unless_requested() {
        let svc = service();
        let keep = svc.create(draft("keep"), "alice@example.com").await.unwrap();
        let gone = svc.create(draft("gone"), "alice@example.com").await.unwrap();
        svc.archive(gone.id, "alice@example.com").await.unwrap();

        let visible = svc.list(&TaskFilter::default()).await.unwrap();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].id, keep.id);

        let archived = svc
            .list(&TaskFilter {
                archived: true,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(archived.len(), 1);
        assert_eq!(archived[0].id, gone.id);
    }

    #[tokio::test]
    async fn list_sweeps_stale_done_tasks() {
        let svc = service();
        let now = Utc::now();

        let mut stale = Task::new(draft("stale done"), "alice@example.com", now - Duration::days(8));
        stale.status = Status::Done;
        let mut fresh = Task::new(draft("fresh done"), "alice@example.com", now - Duration::days(1));
        fresh.status = Status::Done;
        svc.store.insert(&stale).await.unwrap();
        svc.store.insert(&fresh).await.unwrap();

        let visible = svc.list(&TaskFilter::default()).await.unwrap();
        let ids: Vec<Uuid> = visible.iter().map(|t| t.id).collect();
        assert!(!ids.contains(&stale.id));
        assert!(ids.contains(&fresh.id));

        let swept = svc.get(stale.id).await.unwrap();
        assert!(swept.archived);
        assert!(swept.archived_at.is_some());
    }

    #[tokio::test]
    async fn agents_come_from_non_archived_tasks() {
        let svc = service();
        svc.create(
            TaskDraft {
                agent: Some("bot".to_string()),
                ..draft("one")
            },
            "alice@example.com",
        )
        .await
        .unwrap();
        svc.create(draft("two"), "alice@example.com").await.unwrap();

        assert_eq!(svc.agents().await.unwrap(), vec!["bot", "main"]);
    }
}
