// Error handling framework

use thiserror::Error;

/// Scheduler integration errors
#[derive(Error, Debug)]
pub enum SchedulerError {
    /// The operation cannot be attempted with the current configuration.
    /// Raised before any network call is made.
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Scheduler unreachable: {0}")]
    Unreachable(String),

    #[error("Request to {url} failed: {reason}")]
    Transport { url: String, reason: String },

    #[error("Scheduler returned HTTP {status}: {body}")]
    RemoteFailure { status: u16, body: String },

    #[error("Create failed: {payload}")]
    Rejection { payload: serde_json::Value },

    #[error("Invalid scheduler response: {0}")]
    InvalidResponse(String),
}

impl SchedulerError {
    /// Short label used for metrics and structured logs
    pub fn kind(&self) -> &'static str {
        match self {
            SchedulerError::Configuration(_) => "configuration",
            SchedulerError::Unreachable(_) => "unreachable",
            SchedulerError::Transport { .. } => "transport",
            SchedulerError::RemoteFailure { .. } => "remote_failure",
            SchedulerError::Rejection { .. } => "rejection",
            SchedulerError::InvalidResponse(_) => "invalid_response",
        }
    }
}

/// Validation errors
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid field value for {field}: {reason}")]
    InvalidFieldValue { field: String, reason: String },

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),
}

/// Script catalog errors
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Scripts base folder not found: {0}")]
    BaseDirMissing(String),

    #[error("Invalid script selection: {0}")]
    InvalidSelection(String),

    #[error("Script not found: {0}")]
    ScriptNotFound(String),

    #[error("Filesystem error: {0}")]
    FileSystem(String),
}

/// Authentication errors
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid session token: {0}")]
    InvalidToken(String),

    #[error("Session expired")]
    TokenExpired,

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),
}

/// Error raised by a single user action (create job / run now)
#[derive(Error, Debug)]
pub enum ActionError {
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// API response error type for HTTP responses
#[derive(Debug, serde::Serialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

impl From<SchedulerError> for ApiError {
    fn from(err: SchedulerError) -> Self {
        let code = match err {
            SchedulerError::Configuration(_) => "CONFIGURATION_ERROR",
            SchedulerError::Unreachable(_) | SchedulerError::Transport { .. } => {
                "SCHEDULER_UNAVAILABLE"
            }
            _ => "SCHEDULER_ERROR",
        };
        let details = match &err {
            SchedulerError::Rejection { payload } => Some(payload.clone()),
            _ => None,
        };
        let api_err = ApiError::new(code, err.to_string());
        match details {
            Some(d) => api_err.with_details(d),
            None => api_err,
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::new("VALIDATION_ERROR", err.to_string())
    }
}

impl From<CatalogError> for ApiError {
    fn from(err: CatalogError) -> Self {
        ApiError::new("CATALOG_ERROR", err.to_string())
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        let code = match err {
            AuthError::InvalidCredentials | AuthError::InvalidToken(_) | AuthError::TokenExpired => {
                "UNAUTHORIZED"
            }
            _ => "AUTH_ERROR",
        };
        ApiError::new(code, err.to_string())
    }
}

impl From<ActionError> for ApiError {
    fn from(err: ActionError) -> Self {
        match err {
            ActionError::Scheduler(e) => e.into(),
            ActionError::Validation(e) => e.into(),
            ActionError::Catalog(e) => e.into(),
        }
    }
}

impl From<reqwest::Error> for SchedulerError {
    fn from(err: reqwest::Error) -> Self {
        let url = err
            .url()
            .map(|u| u.to_string())
            .unwrap_or_else(|| "<unknown>".to_string());
        let reason = if err.is_timeout() {
            format!("timed out: {}", err)
        } else {
            err.to_string()
        };
        SchedulerError::Transport { url, reason }
    }
}

impl From<std::io::Error> for CatalogError {
    fn from(err: std::io::Error) -> Self {
        CatalogError::FileSystem(err.to_string())
    }
}
