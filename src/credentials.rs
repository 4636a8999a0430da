//! Least-privilege temporary credentials.
//!
//! The policy list attached to an assume-role call mirrors the caller's
//! transfer capabilities: the download policy for `download_file` and the
//! upload policy for `upload_file`. A caller holding neither gets
//! [`ScopedCredentials::NoPermissions`] and the provider is never contacted.

use crate::config::GateConfig;
use crate::constants::{
    ROLE_SESSION_NAME_MAX, ROLE_SESSION_NAME_MIN, SCOPED_CREDENTIAL_DURATION_SECS,
};
use crate::guard::AuthorizationGuard;
use crate::types::{
    AssumeRoleRequest, Capability, ScopedCredentialRequest, ScopedCredentials, SessionIdentity,
    TemporaryCredentials,
};
use crate::{GateError, Result};

const SESSION_NAME_FILLER: char = '_';

/// Assume-role style token service. Implementations report failures as
/// `GateError::Provider` and do not retry.
pub trait CredentialProvider {
    fn assume_role(&self, request: &AssumeRoleRequest) -> Result<TemporaryCredentials>;
}

impl<T: CredentialProvider + ?Sized> CredentialProvider for &T {
    fn assume_role(&self, request: &AssumeRoleRequest) -> Result<TemporaryCredentials> {
        (**self).assume_role(request)
    }
}

#[derive(Debug, Clone)]
pub struct CredentialScoper {
    role_arn: String,
    download_policy_arn: String,
    upload_policy_arn: String,
    guard: AuthorizationGuard,
}

impl CredentialScoper {
    pub fn new(
        role_arn: impl Into<String>,
        download_policy_arn: impl Into<String>,
        upload_policy_arn: impl Into<String>,
    ) -> Self {
        Self {
            role_arn: role_arn.into(),
            download_policy_arn: download_policy_arn.into(),
            upload_policy_arn: upload_policy_arn.into(),
            guard: AuthorizationGuard::new(),
        }
    }

    /// Fails with the name of the first missing variable.
    pub fn from_config(config: &GateConfig) -> Result<Self> {
        Ok(Self::new(
            config.role_arn()?,
            config.download_policy_arn()?,
            config.upload_policy_arn()?,
        ))
    }

    /// Policies the identity qualifies for, download before upload.
    #[must_use]
    pub fn policy_request(&self, identity: &SessionIdentity) -> ScopedCredentialRequest {
        let mut policy_arns = Vec::with_capacity(2);
        if self
            .guard
            .has_capability(Some(identity), Capability::DownloadFile.as_str())
        {
            policy_arns.push(self.download_policy_arn.clone());
        }
        if self
            .guard
            .has_capability(Some(identity), Capability::UploadFile.as_str())
        {
            policy_arns.push(self.upload_policy_arn.clone());
        }
        ScopedCredentialRequest {
            principal: identity.principal().to_string(),
            policy_arns,
        }
    }

    pub fn scoped_credentials<P>(
        &self,
        identity: &SessionIdentity,
        provider: &P,
    ) -> Result<ScopedCredentials>
    where
        P: CredentialProvider + ?Sized,
    {
        let scoped = self.policy_request(identity);
        if scoped.is_empty() {
            tracing::info!(
                target = "casgate::credentials",
                principal = identity.principal(),
                "no transfer capabilities; not requesting credentials"
            );
            return Ok(ScopedCredentials::NoPermissions);
        }

        let request = AssumeRoleRequest {
            role_arn: self.role_arn.clone(),
            session_name: role_session_name(&scoped.principal),
            duration_seconds: SCOPED_CREDENTIAL_DURATION_SECS,
            policy_arns: scoped.policy_arns,
        };
        let credentials = provider.assume_role(&request).map_err(|err| {
            tracing::error!(
                target = "casgate::credentials",
                principal = identity.principal(),
                role_arn = %request.role_arn,
                error = %err,
                "assume role failed"
            );
            match err {
                GateError::Provider { .. } => err,
                other => GateError::Provider {
                    reason: other.to_string().into(),
                },
            }
        })?;
        tracing::debug!(
            target = "casgate::credentials",
            principal = identity.principal(),
            session_name = %request.session_name,
            policies = request.policy_arns.len(),
            access_key_id = %credentials.access_key_id,
            "issued scoped credentials"
        );
        Ok(ScopedCredentials::Issued(credentials))
    }
}

/// Principal reduced to the role-session-name alphabet `[A-Za-z0-9+=,.@_-]`,
/// padded or truncated to 2..=64 characters.
#[must_use]
pub fn role_session_name(principal: &str) -> String {
    let mut name: String = principal
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || "+=,.@_-".contains(c) {
                c
            } else {
                SESSION_NAME_FILLER
            }
        })
        .take(ROLE_SESSION_NAME_MAX)
        .collect();
    while name.len() < ROLE_SESSION_NAME_MIN {
        name.push(SESSION_NAME_FILLER);
    }
    name
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::types::PermissionSet;

    struct RecordingProvider {
        calls: RefCell<Vec<AssumeRoleRequest>>,
        fail: bool,
    }

    impl RecordingProvider {
        fn new(fail: bool) -> Self {
            Self {
                calls: RefCell::new(Vec::new()),
                fail,
            }
        }
    }

    impl CredentialProvider for RecordingProvider {
        fn assume_role(&self, request: &AssumeRoleRequest) -> Result<TemporaryCredentials> {
            self.calls.borrow_mut().push(request.clone());
            if self.fail {
                return Err(GateError::Transport {
                    reason: "connection reset".into(),
                });
            }
            Ok(TemporaryCredentials {
                access_key_id: "ASIA".to_string(),
                secret_access_key: "secret".to_string(),
                session_token: "token".to_string(),
            })
        }
    }

    fn scoper() -> CredentialScoper {
        CredentialScoper::new("arn:role", "arn:download", "arn:upload")
    }

    fn identity(download: bool, upload: bool) -> SessionIdentity {
        SessionIdentity::new("alice").with_permissions(PermissionSet {
            list_files: true,
            download_file: download,
            upload_file: upload,
            ..PermissionSet::denied()
        })
    }

    #[test]
    fn policies_follow_capabilities() {
        let scoper = scoper();
        assert!(scoper.policy_request(&identity(false, false)).is_empty());
        assert_eq!(
            scoper.policy_request(&identity(true, false)).policy_arns,
            vec!["arn:download"]
        );
        assert_eq!(
            scoper.policy_request(&identity(false, true)).policy_arns,
            vec!["arn:upload"]
        );
        assert_eq!(
            scoper.policy_request(&identity(true, true)).policy_arns,
            vec!["arn:download", "arn:upload"]
        );
        let broken = identity(true, true).without_permissions();
        assert!(scoper.policy_request(&broken).is_empty());
    }

    #[test]
    fn provider_failures_become_provider_errors() {
        let provider = RecordingProvider::new(true);
        let err = scoper()
            .scoped_credentials(&identity(true, false), &provider)
            .expect_err("provider failure");
        assert!(matches!(err, GateError::Provider { .. }));
        assert_eq!(err.status_code(), 502);
        assert_eq!(provider.calls.borrow().len(), 1);
    }

    #[test]
    fn request_uses_minimum_duration() {
        let provider = RecordingProvider::new(false);
        let issued = scoper()
            .scoped_credentials(&identity(false, true), &provider)
            .expect("credentials");
        assert!(issued.credentials().is_some());
        let calls = provider.calls.borrow();
        assert_eq!(calls[0].duration_seconds, 900);
        assert_eq!(calls[0].role_arn, "arn:role");
    }

    #[test]
    fn session_names_are_sanitized() {
        assert_eq!(role_session_name("alice"), "alice");
        assert_eq!(role_session_name("a.b@example.org"), "a.b@example.org");
        assert_eq!(role_session_name("ann marie/ü"), "ann_marie__");
        assert_eq!(role_session_name("x"), "x_");
        assert_eq!(role_session_name(&"z".repeat(100)).len(), 64);
    }

    #[test]
    fn from_config_names_the_missing_variable() {
        let config = GateConfig {
            role_arn: Some("arn:role".to_string()),
            download_policy_arn: Some("arn:download".to_string()),
            ..GateConfig::default()
        };
        assert!(matches!(
            CredentialScoper::from_config(&config),
            Err(GateError::MissingConfiguration {
                variable: "S3_UPLOAD_POLICY_ARN"
            })
        ));
    }
}
