//! HTTP client for the task API, used by the board binary.
//!
//! Failures surface directly; there is no retry logic. A 401 comes back as
//! [`ClientError::Unauthorized`] so the caller can drop its session and ask
//! the user to re-authenticate.

use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;
use uuid::Uuid;

use crate::api::types::{CreateTaskRequest, ErrorBody, UpdateTaskRequest};
use crate::task::{Status, Task, TaskFilter};

#[derive(Debug, Error)]
pub enum ClientError {
    /// The server rejected our credentials; re-authentication is needed.
    #[error("authentication required: {0}")]
    Unauthorized(String),

    /// Any other API-level failure, with the server's error message.
    #[error("{0}")]
    Api(String),

    #[error(transparent)]
    Transport(#[from] reqwest::Error),
}

#[derive(Debug, Clone)]
pub enum Credentials {
    /// `Authorization: Bearer <id token>`.
    Token(String),
    /// `X-API-Key` service-account access.
    ApiKey(String),
    None,
}

pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    credentials: Credentials,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, credentials: Credentials) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            http: reqwest::Client::new(),
            base_url,
            credentials,
        }
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let rb = self
            .http
            .request(method, format!("{}{}", self.base_url, path));
        match &self.credentials {
            Credentials::Token(token) => rb.bearer_auth(token),
            Credentials::ApiKey(key) => rb.header("x-api-key", key),
            Credentials::None => rb,
        }
    }

    pub async fn list_tasks(&self, filter: &TaskFilter) -> Result<Vec<Task>, ClientError> {
        let resp = self
            .request(Method::GET, "/api/tasks")
            .query(&query_pairs(filter))
            .send()
            .await?;
        take(resp).await
    }

    pub async fn get_task(&self, id: Uuid) -> Result<Task, ClientError> {
        let resp = self
            .request(Method::GET, &format!("/api/tasks/{id}"))
            .send()
            .await?;
        take(resp).await
    }

    pub async fn create_task(&self, req: &CreateTaskRequest) -> Result<Task, ClientError> {
        let resp = self
            .request(Method::POST, "/api/tasks")
            .json(req)
            .send()
            .await?;
        take(resp).await
    }

    pub async fn update_task(
        &self,
        id: Uuid,
        req: &UpdateTaskRequest,
    ) -> Result<Task, ClientError> {
        let resp = self
            .request(Method::PATCH, &format!("/api/tasks/{id}"))
            .json(req)
            .send()
            .await?;
        take(resp).await
    }

    /// The server half of a drag gesture: set the task's status.
    pub async fn move_task(&self, id: Uuid, status: Status) -> Result<Task, ClientError> {
        self.update_task(
            id,
            &UpdateTaskRequest {
                status: Some(status.as_str().to_string()),
                ..Default::default()
            },
        )
        .await
    }

    pub async fn add_note(&self, id: Uuid, note: &str) -> Result<Task, ClientError> {
        self.update_task(
            id,
            &UpdateTaskRequest {
                note: Some(note.to_string()),
                ..Default::default()
            },
        )
        .await
    }

    pub async fn archive_task(&self, id: Uuid) -> Result<Task, ClientError> {
        let resp = self
            .request(Method::DELETE, &format!("/api/tasks/{id}"))
            .send()
            .await?;
        take(resp).await
    }

    pub async fn agents(&self) -> Result<Vec<String>, ClientError> {
        let resp = self.request(Method::GET, "/api/tasks/agents").send().await?;
        take(resp).await
    }
}

async fn take<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, ClientError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp.json().await?);
    }
    let message = match resp.json::<ErrorBody>().await {
        Ok(body) => body.error,
        Err(_) => status.to_string(),
    };
    if status == StatusCode::UNAUTHORIZED {
        Err(ClientError::Unauthorized(message))
    } else {
        Err(ClientError::Api(message))
    }
}

fn query_pairs(filter: &TaskFilter) -> Vec<(&'static str, String)> {
    let mut pairs = Vec::new();
    if let Some(status) = filter.status {
        pairs.push(("status", status.as_str().to_string()));
    }
    if let Some(priority) = filter.priority {
        pairs.push(("priority", priority.as_str().to_string()));
    }
    if let Some(category) = &filter.category {
        pairs.push(("category", category.clone()));
    }
    if let Some(agent) = &filter.agent {
        pairs.push(("agent", agent.clone()));
    }
    if filter.archived {
        pairs.push(("archived", "true".to_string()));
    }
    pairs.push(("limit", filter.limit.to_string()));
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::Priority;

    #[test]
    fn query_pairs_include_only_set_filters() {
        let pairs = query_pairs(&TaskFilter::default());
        assert_eq!(pairs, vec![("limit", "100".to_string())]);

        let pairs = query_pairs(&TaskFilter {
            status: Some(Status::Done),
            priority: Some(Priority::High),
            agent: Some("bot".to_string()),
            archived: true,
            ..Default::default()
        });
        assert!(pairs.contains(&("status", "done".to_string())));
        assert!(pairs.contains(&("priority", "high".to_string())));
        assert!(pairs.contains(&("agent", "bot".to_string())));
        assert!(pairs.contains(&("archived", "true".to_string())));
    }

    #[test]
    fn base_url_trailing_slash_is_stripped() {
        let client = ApiClient::new("http://localhost:3001/", Credentials::None);
        assert_eq!(client.base_url, "http://localhost:3001");
    }
}
