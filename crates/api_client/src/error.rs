use serde::Deserialize;
use thiserror::Error;

/// Why a challenge run is over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    Expired,
    Completed,
}

impl std::fmt::Display for EndReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EndReason::Expired => write!(f, "expired"),
            EndReason::Completed => write!(f, "completed"),
        }
    }
}

/// Application code carried by a 403 response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForbiddenReason {
    PendingApproval,
    AdminAccessRequired,
    Other(String),
}

impl std::fmt::Display for ForbiddenReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ForbiddenReason::PendingApproval => write!(f, "account pending approval"),
            ForbiddenReason::AdminAccessRequired => write!(f, "admin access required"),
            ForbiddenReason::Other(message) => write!(f, "{}", message),
        }
    }
}

/// CTF platform API client errors
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("authentication required: {0}")]
    Unauthorized(String),

    #[error("forbidden: {0}")]
    Forbidden(ForbiddenReason),

    /// The challenge run is over, either by expiry or completion.
    /// Domain-terminal: the consuming view freezes, no retry.
    #[error("challenge already ended ({0})")]
    Ended(EndReason),

    #[error("challenge not started")]
    NotStarted,

    #[error("validation error: {0}")]
    Validation(String),

    #[error("HTTP error: {status} - {message}")]
    Http { status: u16, message: String },

    #[error("deserialization error: {0}")]
    Deserialization(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl ApiError {
    /// Terminal authentication failure: the session must be destroyed.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized(_))
    }

    /// Transient failures the user may retry manually. Never retried
    /// automatically.
    pub fn is_transient(&self) -> bool {
        match self {
            ApiError::Network(_) | ApiError::Timeout(_) => true,
            ApiError::Http { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Domain-terminal end reason, if this error froze the challenge view.
    pub fn ended_reason(&self) -> Option<EndReason> {
        match self {
            ApiError::Ended(reason) => Some(*reason),
            _ => None,
        }
    }

    pub fn category(&self) -> &'static str {
        match self {
            ApiError::Network(_) => "network",
            ApiError::Timeout(_) => "timeout",
            ApiError::Unauthorized(_) => "auth",
            ApiError::Forbidden(_) => "auth",
            ApiError::Ended(_) => "domain",
            ApiError::NotStarted => "domain",
            ApiError::Validation(_) => "validation",
            ApiError::Http { .. } => "http",
            ApiError::Deserialization(_) => "deserialization",
            ApiError::Config(_) => "config",
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Error body returned by the platform API.
#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    pub code: Option<String>,
    pub message: Option<String>,
    pub reason: Option<String>,
}

fn parse_end_reason(reason: Option<&str>) -> EndReason {
    match reason {
        Some("completed") => EndReason::Completed,
        // Unknown or missing reasons degrade to expired, the safe end state.
        _ => EndReason::Expired,
    }
}

/// Classify a non-success HTTP response into the error taxonomy.
///
/// The HTTP status is authoritative where it and the application code
/// disagree: a 410 is always `Ended(Expired)` whatever the body says.
pub fn classify_http_error(status: u16, body: &str) -> ApiError {
    let parsed: Option<ErrorBody> = serde_json::from_str(body).ok();
    let code = parsed.as_ref().and_then(|b| b.code.as_deref());
    let message = parsed
        .as_ref()
        .and_then(|b| b.message.clone())
        .unwrap_or_else(|| body.to_string());
    let reason = parsed.as_ref().and_then(|b| b.reason.as_deref());

    match status {
        401 => ApiError::Unauthorized(if message.is_empty() {
            "invalid or expired token".to_string()
        } else {
            message
        }),
        403 => ApiError::Forbidden(match code {
            Some("PENDING_APPROVAL") => ForbiddenReason::PendingApproval,
            Some("ADMIN_ACCESS_REQUIRED") => ForbiddenReason::AdminAccessRequired,
            _ => ForbiddenReason::Other(message),
        }),
        410 => ApiError::Ended(EndReason::Expired),
        _ => match code {
            Some("CHALLENGE_NOT_STARTED") => ApiError::NotStarted,
            Some("CHALLENGE_ALREADY_ENDED") => ApiError::Ended(parse_end_reason(reason)),
            _ if (400..500).contains(&status) => ApiError::Validation(message),
            _ => ApiError::Http { status, message },
        },
    }
}

/// Classify a reqwest transport failure.
pub fn classify_network_error(error: &reqwest::Error) -> ApiError {
    if error.is_timeout() {
        ApiError::Timeout(error.to_string())
    } else if error.is_connect() {
        ApiError::Network("connection failed".to_string())
    } else {
        ApiError::Network(error.to_string())
    }
}
