//! Request/response types for the HTTP API.
//!
//! Enum-valued fields arrive as plain strings and are validated here, so an
//! unknown status or priority yields a 400 instead of a body-rejection.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TaskError;
use crate::task::{Priority, Status, TaskDraft, TaskFilter, TaskPatch};

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub dev_mode: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateTaskRequest {
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,
}

impl TryFrom<CreateTaskRequest> for TaskDraft {
    type Error = TaskError;

    fn try_from(req: CreateTaskRequest) -> Result<Self, Self::Error> {
        Ok(TaskDraft {
            title: req.title.unwrap_or_default(),
            description: req.description,
            status: parse_opt::<Status>(req.status)?,
            priority: parse_opt::<Priority>(req.priority)?,
            category: req.category,
            tags: req.tags.unwrap_or_default(),
            agent: req.agent,
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateTaskRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archived: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl TryFrom<UpdateTaskRequest> for TaskPatch {
    type Error = TaskError;

    fn try_from(req: UpdateTaskRequest) -> Result<Self, Self::Error> {
        Ok(TaskPatch {
            title: req.title,
            description: req.description,
            status: parse_opt::<Status>(req.status)?,
            priority: parse_opt::<Priority>(req.priority)?,
            category: req.category,
            tags: req.tags,
            agent: req.agent,
            archived: req.archived,
            note: req.note,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ListTasksQuery {
    pub status: Option<String>,
    pub priority: Option<String>,
    pub category: Option<String>,
    pub agent: Option<String>,
    pub archived: Option<bool>,
    pub limit: Option<usize>,
}

impl TryFrom<ListTasksQuery> for TaskFilter {
    type Error = TaskError;

    fn try_from(q: ListTasksQuery) -> Result<Self, Self::Error> {
        let defaults = TaskFilter::default();
        Ok(TaskFilter {
            status: parse_opt::<Status>(q.status)?,
            priority: parse_opt::<Priority>(q.priority)?,
            category: q.category,
            agent: q.agent,
            archived: q.archived.unwrap_or(defaults.archived),
            limit: q.limit.unwrap_or(defaults.limit),
        })
    }
}

fn parse_opt<T: FromStr<Err = TaskError>>(raw: Option<String>) -> Result<Option<T>, TaskError> {
    raw.as_deref().map(T::from_str).transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_enum_values_are_rejected() {
        let req = UpdateTaskRequest {
            status: Some("doing".to_string()),
            ..Default::default()
        };
        assert!(TaskPatch::try_from(req).is_err());

        let q = ListTasksQuery {
            priority: Some("critical".to_string()),
            ..Default::default()
        };
        assert!(TaskFilter::try_from(q).is_err());
    }

    #[test]
    fn query_defaults_hide_archived_and_limit_to_100() {
        let filter = TaskFilter::try_from(ListTasksQuery::default()).unwrap();
        assert!(!filter.archived);
        assert_eq!(filter.limit, 100);
    }
}
