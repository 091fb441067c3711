//! HTTP implementation of [`Backend`] using [`reqwest`].
//!
//! Every request carries `Authorization: Bearer <token>` when a token is
//! stored. There is no retry and no backoff: a failed request is returned
//! to the caller as an [`ApiError`].

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;

use duotrack_core::dashboard::{DashboardSnapshot, WorkSession};
use duotrack_core::dates::format_date;
use duotrack_core::task::NewTask;
use duotrack_core::user::{Credentials, Registration, User};

use crate::backend::Backend;
use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::token::TokenStore;

/// HTTP client for the DuoTrack REST API.
pub struct DuoTrackApi {
    client: reqwest::Client,
    api_url: String,
    tokens: Arc<TokenStore>,
}

/// `{ token, user }` returned by login and register.
#[derive(Debug, Deserialize)]
struct AuthResponse {
    #[serde(default)]
    token: Option<String>,
    user: User,
}

/// `{ success, user }` returned by `GET /user/me`.
#[derive(Debug, Deserialize)]
struct UserEnvelope {
    user: User,
}

/// `{ success, data }` wrapper used by the task and work-session endpoints.
#[derive(Debug, Deserialize)]
struct DataEnvelope<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
}

impl DuoTrackApi {
    /// Build a client with the configured base URL and fixed timeout.
    pub fn new(config: &ClientConfig, tokens: Arc<TokenStore>) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self::with_client(client, config.api_url.clone(), tokens))
    }

    /// Create an API client reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, api_url: String, tokens: Arc<TokenStore>) -> Self {
        Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            tokens,
        }
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    pub fn tokens(&self) -> &Arc<TokenStore> {
        &self.tokens
    }

    // ---- private helpers ----

    async fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self
            .client
            .request(method, format!("{}{}", self.api_url, path));
        match self.tokens.get().await {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder) -> Result<reqwest::Response, ApiError> {
        let response = builder.send().await?;
        Self::ensure_success(response).await
    }

    /// Turn a non-2xx response into [`ApiError::Api`], keeping the raw
    /// body and the backend's `message` field when the body has one.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body)
            .ok()
            .and_then(|b| b.message);
        tracing::debug!(status = status.as_u16(), body = %body, "DuoTrack API rejected request");
        Err(ApiError::Api {
            status: status.as_u16(),
            message,
            body,
        })
    }

    async fn parse<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ApiError> {
        let response = self.send(builder).await?;
        Ok(response.json::<T>().await?)
    }

    async fn execute(&self, builder: RequestBuilder) -> Result<(), ApiError> {
        self.send(builder).await?;
        Ok(())
    }

    async fn authenticate(&self, builder: RequestBuilder) -> Result<User, ApiError> {
        let auth: AuthResponse = self.parse(builder).await?;
        let token = auth.token.filter(|t| !t.is_empty()).ok_or(ApiError::MissingToken)?;
        self.tokens.set(token).await;
        tracing::info!(user_id = %auth.user.id, "Signed in");
        Ok(auth.user)
    }

    fn session_path(date: NaiveDate, action: &str) -> String {
        match action {
            "" => format!("/work-session/{}", format_date(date)),
            _ => format!("/work-session/{}/{action}", format_date(date)),
        }
    }
}

#[async_trait]
impl Backend for DuoTrackApi {
    async fn register(&self, registration: &Registration) -> Result<User, ApiError> {
        let builder = self.request(Method::POST, "/user/register").await.json(registration);
        self.authenticate(builder).await
    }

    async fn login(&self, credentials: &Credentials) -> Result<User, ApiError> {
        let builder = self.request(Method::POST, "/user/login").await.json(credentials);
        self.authenticate(builder).await
    }

    async fn logout(&self) -> Result<(), ApiError> {
        let result = self
            .execute(self.request(Method::POST, "/user/logout").await)
            .await;
        self.tokens.clear().await;
        result
    }

    async fn profile(&self) -> Result<User, ApiError> {
        let envelope: UserEnvelope = self.parse(self.request(Method::GET, "/user/me").await).await?;
        Ok(envelope.user)
    }

    async fn link_partner(&self, email: &str) -> Result<(), ApiError> {
        let builder = self
            .request(Method::POST, "/user/link-partner")
            .await
            .json(&json!({ "email": email }));
        self.execute(builder).await
    }

    async fn unlink_partner(&self) -> Result<(), ApiError> {
        self.execute(self.request(Method::POST, "/user/unlink-partner").await)
            .await
    }

    async fn send_nudge(&self, message: &str) -> Result<(), ApiError> {
        let builder = self
            .request(Method::POST, "/user/nudge")
            .await
            .json(&json!({ "message": message }));
        self.execute(builder).await
    }

    async fn mark_nudge_seen(&self) -> Result<(), ApiError> {
        self.execute(self.request(Method::POST, "/user/nudge/seen").await)
            .await
    }

    async fn dashboard(&self, date: NaiveDate) -> Result<DashboardSnapshot, ApiError> {
        let builder = self
            .request(Method::GET, "/tasks/dashboard")
            .await
            .query(&[("date", format_date(date))]);
        let envelope: DataEnvelope<DashboardSnapshot> = self.parse(builder).await?;
        Ok(envelope.data)
    }

    async fn create_task(&self, task: &NewTask) -> Result<(), ApiError> {
        self.execute(self.request(Method::POST, "/tasks").await.json(task))
            .await
    }

    async fn update_task_content(&self, task_id: &str, content: &str) -> Result<(), ApiError> {
        let builder = self
            .request(Method::PATCH, &format!("/tasks/{task_id}"))
            .await
            .json(&json!({ "content": content }));
        self.execute(builder).await
    }

    async fn set_task_status(&self, task_id: &str, is_completed: bool) -> Result<(), ApiError> {
        let builder = self
            .request(Method::PATCH, &format!("/tasks/{task_id}/status"))
            .await
            .json(&json!({ "isCompleted": is_completed }));
        self.execute(builder).await
    }

    async fn delete_task(&self, task_id: &str) -> Result<(), ApiError> {
        self.execute(self.request(Method::DELETE, &format!("/tasks/{task_id}")).await)
            .await
    }

    async fn add_comment(&self, task_id: &str, text: &str) -> Result<(), ApiError> {
        let builder = self
            .request(Method::POST, &format!("/tasks/{task_id}/comment"))
            .await
            .json(&json!({ "text": text }));
        self.execute(builder).await
    }

    async fn add_subtask(&self, task_id: &str, content: &str) -> Result<(), ApiError> {
        let builder = self
            .request(Method::POST, &format!("/tasks/{task_id}/subtasks"))
            .await
            .json(&json!({ "content": content }));
        self.execute(builder).await
    }

    async fn toggle_subtask(&self, task_id: &str, subtask_id: &str) -> Result<(), ApiError> {
        let path = format!("/tasks/{task_id}/subtasks/{subtask_id}");
        self.execute(self.request(Method::PATCH, &path).await).await
    }

    async fn work_session(&self, date: NaiveDate) -> Result<WorkSession, ApiError> {
        let builder = self.request(Method::GET, &Self::session_path(date, "")).await;
        let envelope: DataEnvelope<WorkSession> = self.parse(builder).await?;
        Ok(envelope.data)
    }

    async fn start_timer(&self, date: NaiveDate) -> Result<(), ApiError> {
        self.execute(self.request(Method::POST, &Self::session_path(date, "start")).await)
            .await
    }

    async fn pause_timer(&self, date: NaiveDate) -> Result<(), ApiError> {
        self.execute(self.request(Method::POST, &Self::session_path(date, "pause")).await)
            .await
    }

    async fn reset_timer(&self, date: NaiveDate) -> Result<(), ApiError> {
        self.execute(self.request(Method::POST, &Self::session_path(date, "reset")).await)
            .await
    }
}
