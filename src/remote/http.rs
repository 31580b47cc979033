//! HTTP adapter for a Google-Tasks-style REST API.
//!
//! Thin translation layer between the [`RemoteAdapter`] trait and the
//! remote service's REST endpoints: bearer-token auth per account, paged
//! collection fetches, and HTTP status mapping into the typed error
//! taxonomy.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;

use super::{
    AccountId, RemoteAdapter, RemoteError, RemoteList, RemoteTask, RemoteTaskDraft,
    RemoteTaskPatch,
};
use crate::constants::DEFAULT_API_BASE_URL;

/// Remote adapter speaking the task service's REST protocol.
pub struct HttpAdapter {
    client: Client,
    base_url: String,
    tokens: HashMap<AccountId, String>,
}

#[derive(Deserialize)]
struct ListPage {
    #[serde(default)]
    items: Vec<RemoteList>,
    #[serde(rename = "nextPageToken")]
    next_page_token: Option<String>,
}

#[derive(Deserialize)]
struct TaskPage {
    #[serde(default)]
    items: Vec<RemoteTask>,
    #[serde(rename = "nextPageToken")]
    next_page_token: Option<String>,
}

#[derive(Deserialize)]
struct ApiError {
    error: Option<ApiErrorBody>,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    message: Option<String>,
}

impl HttpAdapter {
    /// Create an adapter against the default API base URL.
    pub fn new(timeout: Duration) -> Result<Self> {
        Self::with_base_url(DEFAULT_API_BASE_URL, timeout)
    }

    /// Create an adapter against a custom base URL (tests, proxies).
    pub fn with_base_url(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            tokens: HashMap::new(),
        })
    }

    /// Register the API token for an account.
    pub fn with_account(mut self, account: AccountId, token: impl Into<String>) -> Self {
        self.tokens.insert(account, token.into());
        self
    }

    fn token(&self, account: &AccountId) -> Result<&str, RemoteError> {
        self.tokens
            .get(account)
            .map(String::as_str)
            .ok_or_else(|| RemoteError::Other(format!("no credentials for account {account}")))
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Map an error response to the taxonomy; 404 means the task was not
    /// where the caller expected it, which is what fallback probing keys on.
    async fn check(response: Response, list_id: &str) -> Result<Response, RemoteError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ApiError>(&body)
            .ok()
            .and_then(|e| e.error.and_then(|b| b.message))
            .unwrap_or(body);

        Err(match status {
            StatusCode::NOT_FOUND => RemoteError::NotFoundInList {
                list_id: list_id.to_string(),
            },
            s if s.is_client_error() => RemoteError::Rejected(format!("{status}: {message}")),
            _ => RemoteError::Network(format!("{status}: {message}")),
        })
    }

    fn transport(e: reqwest::Error) -> RemoteError {
        RemoteError::Network(e.to_string())
    }

    async fn parse_task(response: Response) -> Result<RemoteTask, RemoteError> {
        response
            .json::<RemoteTask>()
            .await
            .map_err(|e| RemoteError::InvalidData(e.to_string()))
    }
}

#[async_trait]
impl RemoteAdapter for HttpAdapter {
    async fn get_lists(&self, account: &AccountId) -> Result<Vec<RemoteList>, RemoteError> {
        let token = self.token(account)?;
        let mut lists = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self
                .client
                .get(self.url("users/@me/lists"))
                .bearer_auth(token);
            if let Some(tok) = &page_token {
                request = request.query(&[("pageToken", tok.as_str())]);
            }

            let response = request.send().await.map_err(Self::transport)?;
            let page: ListPage = Self::check(response, "")
                .await?
                .json()
                .await
                .map_err(|e| RemoteError::InvalidData(e.to_string()))?;

            lists.extend(page.items);
            match page.next_page_token {
                Some(tok) => page_token = Some(tok),
                None => return Ok(lists),
            }
        }
    }

    async fn get_tasks(
        &self,
        account: &AccountId,
        list_id: &str,
    ) -> Result<Vec<RemoteTask>, RemoteError> {
        let token = self.token(account)?;
        let mut tasks = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self
                .client
                .get(self.url(&format!("lists/{list_id}/tasks")))
                .bearer_auth(token)
                .query(&[("showCompleted", "true"), ("showHidden", "true")]);
            if let Some(tok) = &page_token {
                request = request.query(&[("pageToken", tok.as_str())]);
            }

            let response = request.send().await.map_err(Self::transport)?;
            let page: TaskPage = Self::check(response, list_id)
                .await?
                .json()
                .await
                .map_err(|e| RemoteError::InvalidData(e.to_string()))?;

            tasks.extend(page.items);
            match page.next_page_token {
                Some(tok) => page_token = Some(tok),
                None => return Ok(tasks),
            }
        }
    }

    async fn create_task(
        &self,
        account: &AccountId,
        list_id: &str,
        draft: &RemoteTaskDraft,
    ) -> Result<Option<RemoteTask>, RemoteError> {
        let token = self.token(account)?;
        let response = self
            .client
            .post(self.url(&format!("lists/{list_id}/tasks")))
            .bearer_auth(token)
            .json(draft)
            .send()
            .await
            .map_err(Self::transport)?;

        let response = Self::check(response, list_id).await?;

        // The service answers a suppressed duplicate with an empty body.
        if response.status() == StatusCode::NO_CONTENT {
            return Ok(None);
        }
        let body = response
            .text()
            .await
            .map_err(|e| RemoteError::InvalidData(e.to_string()))?;
        if body.trim().is_empty() {
            return Ok(None);
        }
        serde_json::from_str::<RemoteTask>(&body)
            .map(Some)
            .map_err(|e| RemoteError::InvalidData(e.to_string()))
    }

    async fn update_task(
        &self,
        account: &AccountId,
        list_id: &str,
        task_id: &str,
        patch: &RemoteTaskPatch,
    ) -> Result<RemoteTask, RemoteError> {
        let token = self.token(account)?;
        let response = self
            .client
            .patch(self.url(&format!("lists/{list_id}/tasks/{task_id}")))
            .bearer_auth(token)
            .json(patch)
            .send()
            .await
            .map_err(Self::transport)?;

        Self::parse_task(Self::check(response, list_id).await?).await
    }

    async fn move_task(
        &self,
        account: &AccountId,
        task_id: &str,
        from_list_id: &str,
        to_list_id: &str,
        previous: Option<&str>,
    ) -> Result<RemoteTask, RemoteError> {
        let token = self.token(account)?;
        let mut request = self
            .client
            .post(self.url(&format!("lists/{from_list_id}/tasks/{task_id}/move")))
            .bearer_auth(token);
        if to_list_id != from_list_id {
            request = request.query(&[("destinationTasklist", to_list_id)]);
        }
        if let Some(prev) = previous {
            request = request.query(&[("previous", prev)]);
        }

        let response = request.send().await.map_err(Self::transport)?;
        Self::parse_task(Self::check(response, from_list_id).await?).await
    }

    async fn delete_task(
        &self,
        account: &AccountId,
        list_id: &str,
        task_id: &str,
    ) -> Result<(), RemoteError> {
        let token = self.token(account)?;
        let response = self
            .client
            .delete(self.url(&format!("lists/{list_id}/tasks/{task_id}")))
            .bearer_auth(token)
            .send()
            .await
            .map_err(Self::transport)?;

        Self::check(response, list_id).await?;
        Ok(())
    }
}
