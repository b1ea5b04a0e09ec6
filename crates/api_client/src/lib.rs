//! Typed client for the CTF platform REST API.
//!
//! The three traits below are the seams the controllers consume; the HTTP
//! [`ApiClient`] is the production implementation and tests substitute
//! in-memory mocks.

pub mod client;
pub mod error;
pub mod types;

pub use client::{ApiClient, ApiClientBuilder, DEFAULT_TIMEOUT};
pub use error::{
    classify_http_error, classify_network_error, ApiError, ApiResult, EndReason, ForbiddenReason,
};
pub use types::*;

use async_trait::async_trait;
use uuid::Uuid;

/// Authentication endpoints.
#[async_trait]
pub trait AuthApi: Send + Sync {
    async fn login(&self, username: &str, password: &str) -> ApiResult<AuthResponse>;
    async fn register(&self, username: &str, password: &str) -> ApiResult<AuthResponse>;
    async fn logout(&self) -> ApiResult<()>;
    async fn me(&self) -> ApiResult<UserInfo>;
    async fn change_password(&self, current: &str, new: &str) -> ApiResult<()>;
}

/// Challenge runner endpoints.
#[async_trait]
pub trait ChallengeApi: Send + Sync {
    async fn platform_info(&self) -> ApiResult<PlatformInfo>;
    async fn status(&self) -> ApiResult<ChallengeStatus>;
    async fn can_start(&self) -> ApiResult<CanStartResponse>;
    async fn start(&self) -> ApiResult<StartResponse>;
    async fn current(&self) -> ApiResult<CurrentChallenge>;
    async fn submit(&self, flag: &str) -> ApiResult<SubmitResponse>;
    async fn hint(&self) -> ApiResult<HintResponse>;
    async fn submissions(&self) -> ApiResult<Vec<SubmissionRecord>>;
    async fn leaderboard(&self) -> ApiResult<Vec<LeaderboardEntry>>;
    async fn levels(&self) -> ApiResult<Vec<LevelSummary>>;
}

/// Admin console endpoints.
#[async_trait]
pub trait AdminApi: Send + Sync {
    async fn config(&self) -> ApiResult<PlatformConfig>;
    async fn update_config(&self, config: &PlatformConfig) -> ApiResult<PlatformConfig>;
    async fn users(&self) -> ApiResult<Vec<AdminUser>>;
    async fn approve_user(&self, id: Uuid) -> ApiResult<()>;
    async fn disapprove_user(&self, id: Uuid) -> ApiResult<()>;
    async fn reset_user(&self, id: Uuid) -> ApiResult<()>;
    async fn delete_user(&self, id: Uuid) -> ApiResult<()>;
    async fn challenges(&self) -> ApiResult<Vec<AdminChallenge>>;
    async fn create_challenge(&self, challenge: &NewChallenge) -> ApiResult<AdminChallenge>;
    async fn update_challenge(&self, id: Uuid, challenge: &NewChallenge)
        -> ApiResult<AdminChallenge>;
    async fn delete_challenge(&self, id: Uuid) -> ApiResult<()>;
    async fn monitoring(&self) -> ApiResult<MonitoringSnapshot>;
    async fn stats(&self) -> ApiResult<AdminStats>;
}
