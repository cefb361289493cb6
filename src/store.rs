//! SQLite-backed task store.
//!
//! Owns the single connection and all SQL. The store is an explicitly
//! constructed handle opened at startup and held by the app state; there is
//! no module-level connection.
//!
//! Timestamps are stored as fixed-width RFC 3339 UTC text so lexicographic
//! order matches chronological order. `tags` and `notes` are JSON columns;
//! note appends go through SQLite's `json_insert` inside a single UPDATE so
//! concurrent appends serialize on the statement instead of racing in a
//! read-modify-write cycle.

use std::path::Path;
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::TaskResult;
use crate::task::{NoteEntry, Priority, Status, Task, TaskFilter, TaskPatch};

const SELECT_COLS: &str = "id, title, description, status, priority, category, tags, agent, \
     notes, created_by, created_at, updated_at, archived, archived_at";

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS tasks (
    id          TEXT PRIMARY KEY,
    title       TEXT NOT NULL,
    description TEXT,
    status      TEXT NOT NULL DEFAULT 'todo'
                CHECK (status IN ('todo', 'in-progress', 'blocked', 'done')),
    priority    TEXT NOT NULL DEFAULT 'medium'
                CHECK (priority IN ('low', 'medium', 'high', 'urgent')),
    category    TEXT,
    tags        TEXT NOT NULL DEFAULT '[]',
    agent       TEXT NOT NULL DEFAULT 'main',
    notes       TEXT NOT NULL DEFAULT '[]',
    created_by  TEXT NOT NULL,
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL,
    archived    INTEGER NOT NULL DEFAULT 0,
    archived_at TEXT
);
CREATE INDEX IF NOT EXISTS idx_tasks_status ON tasks(status);
CREATE INDEX IF NOT EXISTS idx_tasks_priority ON tasks(priority);
CREATE INDEX IF NOT EXISTS idx_tasks_created_by ON tasks(created_by);
CREATE INDEX IF NOT EXISTS idx_tasks_created_at ON tasks(created_at DESC);
CREATE INDEX IF NOT EXISTS idx_tasks_archived ON tasks(archived);
CREATE INDEX IF NOT EXISTS idx_tasks_agent ON tasks(agent);
";

/// List ordering: priority rank ascending, then newest first.
const ORDER_BY: &str = " ORDER BY CASE priority \
     WHEN 'urgent' THEN 1 WHEN 'high' THEN 2 WHEN 'medium' THEN 3 WHEN 'low' THEN 4 END, \
     created_at DESC LIMIT ?";

/// Store handle wrapping the SQLite connection.
pub struct TaskStore {
    conn: Mutex<Connection>,
}

impl TaskStore {
    /// Open (or create) the database at `path` and ensure the schema exists.
    pub fn open(path: &Path) -> TaskResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// In-memory store, used by tests.
    pub fn open_in_memory() -> TaskResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
        conn.execute_batch(SCHEMA)
    }

    pub async fn insert(&self, task: &Task) -> TaskResult<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO tasks (id, title, description, status, priority, category, tags, \
             agent, notes, created_by, created_at, updated_at, archived, archived_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            params![
                task.id.to_string(),
                task.title,
                task.description,
                task.status.as_str(),
                task.priority.as_str(),
                task.category,
                serde_json::to_string(&task.tags)?,
                task.agent,
                serde_json::to_string(&task.notes)?,
                task.created_by,
                ts(&task.created_at),
                ts(&task.updated_at),
                task.archived,
                task.archived_at.as_ref().map(ts),
            ],
        )?;
        Ok(())
    }

    pub async fn get(&self, id: Uuid) -> TaskResult<Option<Task>> {
        let conn = self.conn.lock().await;
        Ok(get_sync(&conn, id)?)
    }

    /// Apply a partial update as one UPDATE statement and return the fresh
    /// row, or `None` if the id is unknown. `updated_at` is always refreshed.
    pub async fn update(
        &self,
        id: Uuid,
        patch: &TaskPatch,
        actor: &str,
        now: DateTime<Utc>,
    ) -> TaskResult<Option<Task>> {
        let mut sets: Vec<&'static str> = Vec::new();
        let mut values: Vec<Value> = Vec::new();

        if let Some(title) = &patch.title {
            sets.push("title = ?");
            values.push(Value::Text(title.trim().to_string()));
        }
        if let Some(description) = &patch.description {
            sets.push("description = ?");
            values.push(Value::Text(description.clone()));
        }
        if let Some(status) = patch.status {
            sets.push("status = ?");
            values.push(Value::Text(status.as_str().to_string()));
        }
        if let Some(priority) = patch.priority {
            sets.push("priority = ?");
            values.push(Value::Text(priority.as_str().to_string()));
        }
        if let Some(category) = &patch.category {
            sets.push("category = ?");
            values.push(Value::Text(category.clone()));
        }
        if let Some(tags) = &patch.tags {
            sets.push("tags = ?");
            values.push(Value::Text(serde_json::to_string(tags)?));
        }
        if let Some(agent) = &patch.agent {
            sets.push("agent = ?");
            values.push(Value::Text(agent.clone()));
        }
        if let Some(archived) = patch.archived {
            sets.push("archived = ?");
            values.push(Value::Integer(i64::from(archived)));
            sets.push("archived_at = ?");
            values.push(if archived {
                Value::Text(ts(&now))
            } else {
                Value::Null
            });
        }
        if let Some(note) = &patch.note {
            // Appended inside the statement; prior entries are never touched.
            sets.push("notes = json_insert(notes, '$[#]', json(?))");
            values.push(Value::Text(serde_json::to_string(&NoteEntry {
                timestamp: now,
                note: note.clone(),
                by: actor.to_string(),
            })?));
        }

        sets.push("updated_at = ?");
        values.push(Value::Text(ts(&now)));
        values.push(Value::Text(id.to_string()));

        let sql = format!("UPDATE tasks SET {} WHERE id = ?", sets.join(", "));

        let conn = self.conn.lock().await;
        let changed = conn.execute(&sql, params_from_iter(values))?;
        if changed == 0 {
            return Ok(None);
        }
        Ok(get_sync(&conn, id)?)
    }

    /// List tasks matching all provided filters, ordered by priority rank
    /// ascending then created_at descending, truncated to the limit.
    pub async fn list(&self, filter: &TaskFilter) -> TaskResult<Vec<Task>> {
        let mut sql = format!("SELECT {SELECT_COLS} FROM tasks WHERE archived = ?");
        let mut values: Vec<Value> = vec![Value::Integer(i64::from(filter.archived))];

        if let Some(status) = filter.status {
            sql.push_str(" AND status = ?");
            values.push(Value::Text(status.as_str().to_string()));
        }
        if let Some(priority) = filter.priority {
            sql.push_str(" AND priority = ?");
            values.push(Value::Text(priority.as_str().to_string()));
        }
        if let Some(category) = &filter.category {
            sql.push_str(" AND category = ?");
            values.push(Value::Text(category.clone()));
        }
        if let Some(agent) = &filter.agent {
            sql.push_str(" AND agent = ?");
            values.push(Value::Text(agent.clone()));
        }
        sql.push_str(ORDER_BY);
        // A negative LIMIT means unlimited to SQLite, so saturate instead of
        // letting an oversized value wrap.
        values.push(Value::Integer(
            i64::try_from(filter.limit).unwrap_or(i64::MAX),
        ));

        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(values), |row| row_to_task(row))?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Distinct agent labels among non-archived tasks, sorted ascending.
    pub async fn agents(&self) -> TaskResult<Vec<String>> {
        let conn = self.conn.lock().await;
        let mut stmt =
            conn.prepare("SELECT DISTINCT agent FROM tasks WHERE archived = 0 ORDER BY agent")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Archive every done, non-archived task last touched before `cutoff`.
    ///
    /// A one-way, idempotent transition: the `archived = 0` guard makes
    /// concurrent sweeps no-ops on already-archived rows. Returns the number
    /// of tasks archived.
    pub async fn sweep_stale_done(
        &self,
        cutoff: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> TaskResult<usize> {
        let conn = self.conn.lock().await;
        let archived = conn.execute(
            "UPDATE tasks SET archived = 1, archived_at = ?1, updated_at = ?1 \
             WHERE status = 'done' AND archived = 0 AND updated_at < ?2",
            params![ts(&now), ts(&cutoff)],
        )?;
        Ok(archived)
    }
}

/// Fixed-width RFC 3339 so text comparison follows time.
fn ts(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn get_sync(conn: &Connection, id: Uuid) -> rusqlite::Result<Option<Task>> {
    conn.query_row(
        &format!("SELECT {SELECT_COLS} FROM tasks WHERE id = ?1"),
        params![id.to_string()],
        row_to_task,
    )
    .optional()
}

fn row_to_task(row: &Row<'_>) -> rusqlite::Result<Task> {
    let id: String = row.get(0)?;
    let status: String = row.get(3)?;
    let priority: String = row.get(4)?;
    let tags: String = row.get(6)?;
    let notes: String = row.get(8)?;
    let created_at: String = row.get(10)?;
    let updated_at: String = row.get(11)?;
    let archived_at: Option<String> = row.get(13)?;

    Ok(Task {
        id: Uuid::parse_str(&id).map_err(|e| decode_err(0, e))?,
        title: row.get(1)?,
        description: row.get(2)?,
        status: Status::from_str(&status).map_err(|e| decode_err(3, e))?,
        priority: Priority::from_str(&priority).map_err(|e| decode_err(4, e))?,
        category: row.get(5)?,
        tags: serde_json::from_str(&tags).map_err(|e| decode_err(6, e))?,
        agent: row.get(7)?,
        notes: serde_json::from_str(&notes).map_err(|e| decode_err(8, e))?,
        created_by: row.get(9)?,
        created_at: parse_ts(&created_at).map_err(|e| decode_err(10, e))?,
        updated_at: parse_ts(&updated_at).map_err(|e| decode_err(11, e))?,
        archived: row.get(12)?,
        archived_at: archived_at
            .as_deref()
            .map(parse_ts)
            .transpose()
            .map_err(|e| decode_err(13, e))?,
    })
}

fn parse_ts(s: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(s).map(|t| t.with_timezone(&Utc))
}

fn decode_err<E>(idx: usize, e: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
}
