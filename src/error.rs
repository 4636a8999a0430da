//! Crate-wide error type.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, GateError>;

#[derive(Debug, Error)]
pub enum GateError {
    #[error("required configuration `{variable}` is not set")]
    MissingConfiguration { variable: &'static str },

    #[error("configuration `{variable}` is invalid: {reason}")]
    InvalidConfiguration {
        variable: &'static str,
        reason: Box<str>,
    },

    #[error("authentication failed: {reason}")]
    AuthenticationFailed { reason: Box<str> },

    #[error("`{principal}` lacks `{capability}` for `{resource}`")]
    AccessDenied {
        principal: Box<str>,
        capability: Box<str>,
        resource: Box<str>,
    },

    #[error("invalid path `{path}`: {reason}")]
    PathViolation { path: Box<str>, reason: Box<str> },

    #[error("key `{key}` resolves outside the bucket root `{root}`")]
    OutsideRoot { key: Box<str>, root: Box<str> },

    #[error("refusing to modify the bucket root `{key}`")]
    RootProtected { key: Box<str> },

    #[error("folder `{key}` is not empty")]
    FolderNotEmpty { key: Box<str> },

    #[error("object `{key}` not found")]
    NotFound { key: Box<str> },

    #[error("CAS protocol error: {reason}")]
    Protocol { reason: Box<str> },

    #[error("transport error: {reason}")]
    Transport { reason: Box<str> },

    #[error("provider error: {reason}")]
    Provider { reason: Box<str> },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl GateError {
    /// HTTP status class a front end should answer with.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::AuthenticationFailed { .. } => 401,
            Self::AccessDenied { .. }
            | Self::OutsideRoot { .. }
            | Self::RootProtected { .. }
            | Self::FolderNotEmpty { .. } => 403,
            Self::PathViolation { .. } => 400,
            Self::NotFound { .. } => 404,
            Self::Protocol { .. } | Self::Transport { .. } | Self::Provider { .. } => 502,
            Self::MissingConfiguration { .. }
            | Self::InvalidConfiguration { .. }
            | Self::Io(_)
            | Self::Json(_) => 500,
        }
    }

    /// Text that is safe to show an end user. Detail stays in the log.
    #[must_use]
    pub fn public_message(&self) -> &'static str {
        match self.status_code() {
            400 => "Bad request.",
            401 => "Authentication required.",
            403 => "Forbidden.",
            404 => "Not found.",
            502 => "An upstream service failed.",
            _ => "Internal server error.",
        }
    }

    /// True for the Forbidden-class refusals raised by the storage layer, as
    /// opposed to a missing capability.
    #[must_use]
    pub fn is_storage_refusal(&self) -> bool {
        matches!(
            self,
            Self::OutsideRoot { .. } | Self::RootProtected { .. } | Self::FolderNotEmpty { .. }
        )
    }
}
