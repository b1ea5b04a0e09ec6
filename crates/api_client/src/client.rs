use crate::error::{classify_http_error, classify_network_error, ApiError, ApiResult};
use crate::types::*;
use crate::{AdminApi, AuthApi, ChallengeApi};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::warn;
use uuid::Uuid;

/// Default client-side timeout after which a call fails as a network error.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP client for the CTF platform API.
///
/// Attaches the bearer token held by the session store to every request and
/// funnels every non-success response through the error classifier.
pub struct ApiClient {
    base_url: String,
    http: reqwest::Client,
    token: Arc<RwLock<Option<String>>>,
    timeout: Duration,
}

impl ApiClient {
    /// Create a client against `base_url` (including the `/api` base path).
    pub fn new(base_url: String) -> Self {
        Self {
            base_url,
            http: reqwest::Client::new(),
            token: Arc::new(RwLock::new(None)),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Install the bearer token used for subsequent requests.
    pub async fn set_token(&self, token: String) {
        *self.token.write().await = Some(token);
    }

    /// Drop the bearer token (logout / forced logout).
    pub async fn clear_token(&self) {
        *self.token.write().await = None;
    }

    pub async fn token(&self) -> Option<String> {
        self.token.read().await.clone()
    }

    async fn authorize(&self, mut request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request = request.timeout(self.timeout);
        if let Some(token) = self.token.read().await.clone() {
            request = request.header("Authorization", format!("Bearer {}", token));
        }
        request
    }

    async fn read_body<T>(&self, path: &str, response: reqwest::Response) -> ApiResult<T>
    where
        T: for<'de> serde::Deserialize<'de>,
    {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        if status.is_success() {
            serde_json::from_str(&body).map_err(|e| ApiError::Deserialization(e.to_string()))
        } else {
            warn!(status = status.as_u16(), path, "api request failed");
            Err(classify_http_error(status.as_u16(), &body))
        }
    }

    async fn expect_success(&self, path: &str, response: reqwest::Response) -> ApiResult<()> {
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        warn!(status = status.as_u16(), path, "api request failed");
        Err(classify_http_error(status.as_u16(), &body))
    }

    async fn get<T>(&self, path: &str) -> ApiResult<T>
    where
        T: for<'de> serde::Deserialize<'de>,
    {
        let url = format!("{}{}", self.base_url, path);
        let request = self.authorize(self.http.get(&url)).await;
        let response = request
            .send()
            .await
            .map_err(|e| classify_network_error(&e))?;
        self.read_body(path, response).await
    }

    async fn post<B, T>(&self, path: &str, body: &B) -> ApiResult<T>
    where
        B: serde::Serialize,
        T: for<'de> serde::Deserialize<'de>,
    {
        let url = format!("{}{}", self.base_url, path);
        let request = self.authorize(self.http.post(&url).json(body)).await;
        let response = request
            .send()
            .await
            .map_err(|e| classify_network_error(&e))?;
        self.read_body(path, response).await
    }

    async fn post_empty<T>(&self, path: &str) -> ApiResult<T>
    where
        T: for<'de> serde::Deserialize<'de>,
    {
        let url = format!("{}{}", self.base_url, path);
        let request = self.authorize(self.http.post(&url)).await;
        let response = request
            .send()
            .await
            .map_err(|e| classify_network_error(&e))?;
        self.read_body(path, response).await
    }

    async fn post_unit(&self, path: &str) -> ApiResult<()> {
        let url = format!("{}{}", self.base_url, path);
        let request = self.authorize(self.http.post(&url)).await;
        let response = request
            .send()
            .await
            .map_err(|e| classify_network_error(&e))?;
        self.expect_success(path, response).await
    }

    async fn put<B, T>(&self, path: &str, body: &B) -> ApiResult<T>
    where
        B: serde::Serialize,
        T: for<'de> serde::Deserialize<'de>,
    {
        let url = format!("{}{}", self.base_url, path);
        let request = self.authorize(self.http.put(&url).json(body)).await;
        let response = request
            .send()
            .await
            .map_err(|e| classify_network_error(&e))?;
        self.read_body(path, response).await
    }

    async fn put_unit(&self, path: &str) -> ApiResult<()> {
        let url = format!("{}{}", self.base_url, path);
        let request = self.authorize(self.http.put(&url)).await;
        let response = request
            .send()
            .await
            .map_err(|e| classify_network_error(&e))?;
        self.expect_success(path, response).await
    }

    async fn delete(&self, path: &str) -> ApiResult<()> {
        let url = format!("{}{}", self.base_url, path);
        let request = self.authorize(self.http.delete(&url)).await;
        let response = request
            .send()
            .await
            .map_err(|e| classify_network_error(&e))?;
        self.expect_success(path, response).await
    }
}

#[async_trait]
impl AuthApi for ApiClient {
    async fn login(&self, username: &str, password: &str) -> ApiResult<AuthResponse> {
        self.post("/auth/login", &LoginRequest { username, password })
            .await
    }

    async fn register(&self, username: &str, password: &str) -> ApiResult<AuthResponse> {
        self.post("/auth/register", &RegisterRequest { username, password })
            .await
    }

    async fn logout(&self) -> ApiResult<()> {
        self.post_unit("/auth/logout").await
    }

    async fn me(&self) -> ApiResult<UserInfo> {
        self.get("/auth/me").await
    }

    async fn change_password(&self, current: &str, new: &str) -> ApiResult<()> {
        let url = format!("{}{}", self.base_url, "/auth/change-password");
        let body = ChangePasswordRequest {
            current_password: current,
            new_password: new,
        };
        let request = self.authorize(self.http.put(&url).json(&body)).await;
        let response = request
            .send()
            .await
            .map_err(|e| classify_network_error(&e))?;
        self.expect_success("/auth/change-password", response).await
    }
}

#[async_trait]
impl ChallengeApi for ApiClient {
    async fn platform_info(&self) -> ApiResult<PlatformInfo> {
        self.get("/challenge/info").await
    }

    async fn status(&self) -> ApiResult<ChallengeStatus> {
        self.get("/challenge/status").await
    }

    async fn can_start(&self) -> ApiResult<CanStartResponse> {
        self.get("/challenge/can-start").await
    }

    async fn start(&self) -> ApiResult<StartResponse> {
        self.post_empty("/challenge/start").await
    }

    async fn current(&self) -> ApiResult<CurrentChallenge> {
        self.get("/challenge/current").await
    }

    async fn submit(&self, flag: &str) -> ApiResult<SubmitResponse> {
        self.post("/challenge/submit", &SubmitRequest { flag }).await
    }

    async fn hint(&self) -> ApiResult<HintResponse> {
        self.get("/challenge/hint").await
    }

    async fn submissions(&self) -> ApiResult<Vec<SubmissionRecord>> {
        let response: SubmissionsResponse = self.get("/challenge/submissions").await?;
        Ok(response.submissions)
    }

    async fn leaderboard(&self) -> ApiResult<Vec<LeaderboardEntry>> {
        let response: LeaderboardResponse = self.get("/challenge/leaderboard").await?;
        Ok(response.entries)
    }

    async fn levels(&self) -> ApiResult<Vec<LevelSummary>> {
        let response: LevelsResponse = self.get("/challenge/levels").await?;
        Ok(response.levels)
    }
}

#[async_trait]
impl AdminApi for ApiClient {
    async fn config(&self) -> ApiResult<PlatformConfig> {
        self.get("/admin/config").await
    }

    async fn update_config(&self, config: &PlatformConfig) -> ApiResult<PlatformConfig> {
        self.put("/admin/config", config).await
    }

    async fn users(&self) -> ApiResult<Vec<AdminUser>> {
        let response: UsersResponse = self.get("/admin/users").await?;
        Ok(response.users)
    }

    async fn approve_user(&self, id: Uuid) -> ApiResult<()> {
        self.put_unit(&format!("/admin/users/{}/approve", id)).await
    }

    async fn disapprove_user(&self, id: Uuid) -> ApiResult<()> {
        self.put_unit(&format!("/admin/users/{}/disapprove", id))
            .await
    }

    async fn reset_user(&self, id: Uuid) -> ApiResult<()> {
        self.put_unit(&format!("/admin/users/{}/reset", id)).await
    }

    async fn delete_user(&self, id: Uuid) -> ApiResult<()> {
        self.delete(&format!("/admin/users/{}", id)).await
    }

    async fn challenges(&self) -> ApiResult<Vec<AdminChallenge>> {
        let response: AdminChallengesResponse = self.get("/admin/challenges").await?;
        Ok(response.challenges)
    }

    async fn create_challenge(&self, challenge: &NewChallenge) -> ApiResult<AdminChallenge> {
        self.post("/admin/challenges", challenge).await
    }

    async fn update_challenge(
        &self,
        id: Uuid,
        challenge: &NewChallenge,
    ) -> ApiResult<AdminChallenge> {
        self.put(&format!("/admin/challenges/{}", id), challenge)
            .await
    }

    async fn delete_challenge(&self, id: Uuid) -> ApiResult<()> {
        self.delete(&format!("/admin/challenges/{}", id)).await
    }

    async fn monitoring(&self) -> ApiResult<MonitoringSnapshot> {
        self.get("/admin/monitoring").await
    }

    async fn stats(&self) -> ApiResult<AdminStats> {
        self.get("/admin/stats").await
    }
}

/// API client builder
pub struct ApiClientBuilder {
    base_url: Option<String>,
    token: Option<String>,
    timeout: Option<Duration>,
    http: Option<reqwest::Client>,
}

impl ApiClientBuilder {
    pub fn new() -> Self {
        Self {
            base_url: None,
            token: None,
            timeout: None,
            http: None,
        }
    }

    pub fn base_url(mut self, url: String) -> Self {
        self.base_url = Some(url);
        self
    }

    pub fn token(mut self, token: String) -> Self {
        self.token = Some(token);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn http_client(mut self, http: reqwest::Client) -> Self {
        self.http = Some(http);
        self
    }

    pub fn build(self) -> ApiResult<ApiClient> {
        let base_url = self
            .base_url
            .ok_or_else(|| ApiError::Config("base URL is required".to_string()))?;

        let mut client = ApiClient::new(base_url);
        if let Some(timeout) = self.timeout {
            client.timeout = timeout;
        }
        if let Some(http) = self.http {
            client.http = http;
        }
        if let Some(token) = self.token {
            client.token = Arc::new(RwLock::new(Some(token)));
        }
        Ok(client)
    }
}

impl Default for ApiClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
