//! Scoped credential request and response types.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Which policies a principal qualifies for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopedCredentialRequest {
    pub principal: String,
    pub policy_arns: Vec<String>,
}

impl ScopedCredentialRequest {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.policy_arns.is_empty()
    }
}

/// Arguments of the provider's assume-role call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssumeRoleRequest {
    pub role_arn: String,
    pub session_name: String,
    pub duration_seconds: u32,
    pub policy_arns: Vec<String>,
}

/// Temporary access key triple.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemporaryCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: String,
}

impl fmt::Debug for TemporaryCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemporaryCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("session_token", &"<redacted>")
            .finish()
    }
}

/// Result of asking for scoped credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ScopedCredentials {
    Issued(TemporaryCredentials),
    /// The principal holds neither download nor upload; nothing was requested.
    NoPermissions,
}

impl ScopedCredentials {
    #[must_use]
    pub fn credentials(&self) -> Option<&TemporaryCredentials> {
        match self {
            ScopedCredentials::Issued(credentials) => Some(credentials),
            ScopedCredentials::NoPermissions => None,
        }
    }
}
