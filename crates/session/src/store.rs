use crate::persist;
use ctf_console_api_client::{ApiClient, ApiError, ApiResult, AuthApi, AuthResponse, Role};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

/// The current authenticated identity.
#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: Uuid,
    pub username: String,
    pub role: Role,
    pub approved: bool,
    pub token: String,
}

impl Session {
    fn from_auth(response: AuthResponse) -> Self {
        Self {
            user_id: response.user.id,
            username: response.user.username,
            role: response.user.role,
            approved: response.user.approved,
            token: response.token,
        }
    }
}

/// What a route needs before it may render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteRequirement {
    Authenticated,
    Approved,
    Admin,
}

/// Routing-guard verdict consumed uniformly by the console instead of
/// scattered role conditionals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Granted,
    NeedsLogin,
    PendingApproval,
    AdminOnly,
}

/// Holds the session and owns its lifecycle.
///
/// The only writers are `login`/`register`/`restore`/`logout` and the forced
/// logout path taken on any 401; readers get cloned snapshots.
pub struct SessionStore {
    client: Arc<ApiClient>,
    current: RwLock<Option<Session>>,
    token_path: PathBuf,
}

impl SessionStore {
    pub fn new(client: Arc<ApiClient>, token_path: PathBuf) -> Self {
        Self {
            client,
            current: RwLock::new(None),
            token_path,
        }
    }

    pub fn client(&self) -> Arc<ApiClient> {
        self.client.clone()
    }

    pub async fn login(&self, username: &str, password: &str) -> ApiResult<Session> {
        let response = self.client.login(username, password).await?;
        Ok(self.install(Session::from_auth(response)).await)
    }

    pub async fn register(&self, username: &str, password: &str) -> ApiResult<Session> {
        let response = self.client.register(username, password).await?;
        Ok(self.install(Session::from_auth(response)).await)
    }

    /// Rebuild a session from the persisted token, if any.
    ///
    /// A stale token (401 from `/auth/me`) is discarded silently; any other
    /// failure is surfaced so the caller can report it.
    pub async fn restore(&self) -> ApiResult<Option<Session>> {
        let Some(token) = persist::load_token(&self.token_path) else {
            return Ok(None);
        };
        self.client.set_token(token.clone()).await;

        match self.client.me().await {
            Ok(user) => {
                let session = Session {
                    user_id: user.id,
                    username: user.username,
                    role: user.role,
                    approved: user.approved,
                    token,
                };
                info!(username = %session.username, "session restored from token file");
                *self.current.write().await = Some(session.clone());
                Ok(Some(session))
            }
            Err(e) if e.is_unauthorized() => {
                self.force_logout().await;
                Ok(None)
            }
            Err(e) => {
                self.client.clear_token().await;
                Err(e)
            }
        }
    }

    /// Log out server-side (best effort) and destroy the local session.
    pub async fn logout(&self) {
        if let Err(e) = self.client.logout().await {
            // Local teardown proceeds regardless.
            warn!(error = %e, "server logout failed");
        }
        self.force_logout().await;
    }

    /// Destroy the local session without calling the server. Used directly
    /// when any request comes back 401.
    pub async fn force_logout(&self) {
        *self.current.write().await = None;
        self.client.clear_token().await;
        if let Err(e) = persist::clear_token(&self.token_path) {
            warn!(error = %e, "failed to remove token file");
        }
    }

    pub async fn change_password(&self, current: &str, new: &str) -> ApiResult<()> {
        self.client.change_password(current, new).await
    }

    pub async fn current(&self) -> Option<Session> {
        self.current.read().await.clone()
    }

    pub async fn is_admin(&self) -> bool {
        matches!(
            self.current.read().await.as_ref(),
            Some(session) if session.role == Role::Admin
        )
    }

    pub async fn is_approved(&self) -> bool {
        matches!(
            self.current.read().await.as_ref(),
            Some(session) if session.approved
        )
    }

    /// Evaluate a routing guard against the current session.
    pub async fn check(&self, requirement: RouteRequirement) -> Access {
        let guard = self.current.read().await;
        let Some(session) = guard.as_ref() else {
            return Access::NeedsLogin;
        };
        match requirement {
            RouteRequirement::Authenticated => Access::Granted,
            RouteRequirement::Approved => {
                // Admins are implicitly approved.
                if session.approved || session.role == Role::Admin {
                    Access::Granted
                } else {
                    Access::PendingApproval
                }
            }
            RouteRequirement::Admin => {
                if session.role == Role::Admin {
                    Access::Granted
                } else {
                    Access::AdminOnly
                }
            }
        }
    }

    /// Route a failed call through the session lifecycle: a 401 destroys the
    /// session. Returns the error for the caller to surface.
    pub async fn observe_error(&self, error: ApiError) -> ApiError {
        if error.is_unauthorized() {
            self.force_logout().await;
        }
        error
    }

    async fn install(&self, session: Session) -> Session {
        self.client.set_token(session.token.clone()).await;
        if let Err(e) = persist::save_token(&self.token_path, &session.token) {
            warn!(error = %e, "failed to persist token");
        }
        *self.current.write().await = Some(session.clone());
        session
    }
}
