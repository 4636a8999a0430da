//! Credential scoping against a recording provider.

use std::cell::RefCell;

use casgate_core::{
    AssumeRoleRequest, CredentialProvider, CredentialScoper, GateConfig, GateError,
    PermissionSet, Result, ScopedCredentials, SessionIdentity, TemporaryCredentials,
};

#[derive(Default)]
struct RecordingProvider {
    calls: RefCell<Vec<AssumeRoleRequest>>,
    failure: Option<&'static str>,
}

impl CredentialProvider for RecordingProvider {
    fn assume_role(&self, request: &AssumeRoleRequest) -> Result<TemporaryCredentials> {
        self.calls.borrow_mut().push(request.clone());
        if let Some(reason) = self.failure {
            return Err(GateError::Provider {
                reason: reason.into(),
            });
        }
        Ok(TemporaryCredentials {
            access_key_id: "ASIATESTKEY".to_string(),
            secret_access_key: "wJalrXUtnFEMI".to_string(),
            session_token: "FwoGZXIvYXdzE".to_string(),
        })
    }
}

fn config() -> GateConfig {
    GateConfig::from_lookup(|name| {
        let value = match name {
            "S3_DOWNLOAD_ROLE_ARN" => "arn:aws:iam::123456789012:role/browser",
            "S3_DOWNLOAD_POLICY_ARN" => "arn:aws:iam::123456789012:policy/download",
            "S3_UPLOAD_POLICY_ARN" => "arn:aws:iam::123456789012:policy/upload",
            _ => return None,
        };
        Some(value.to_string())
    })
    .expect("config")
}

fn identity(permissions: PermissionSet) -> SessionIdentity {
    SessionIdentity::new("alice").with_permissions(permissions)
}

#[test]
fn zero_capabilities_never_call_the_provider() {
    let scoper = CredentialScoper::from_config(&config()).expect("scoper");
    let provider = RecordingProvider::default();

    let result = scoper
        .scoped_credentials(&identity(PermissionSet::denied()), &provider)
        .expect("no-permissions is not an error");
    assert_eq!(result, ScopedCredentials::NoPermissions);
    assert!(result.credentials().is_none());
    assert!(provider.calls.borrow().is_empty());

    // Listing alone is not a transfer capability.
    let lister = identity(PermissionSet {
        list_files: true,
        remove_file: true,
        ..PermissionSet::denied()
    });
    assert_eq!(
        scoper
            .scoped_credentials(&lister, &provider)
            .expect("scoped"),
        ScopedCredentials::NoPermissions
    );
    assert!(provider.calls.borrow().is_empty());
}

#[test]
fn download_only_attaches_exactly_the_download_policy() {
    let scoper = CredentialScoper::from_config(&config()).expect("scoper");
    let provider = RecordingProvider::default();
    let downloader = identity(PermissionSet {
        list_files: true,
        download_file: true,
        ..PermissionSet::denied()
    });

    let result = scoper
        .scoped_credentials(&downloader, &provider)
        .expect("credentials");
    let credentials = result.credentials().expect("issued");
    assert_eq!(credentials.access_key_id, "ASIATESTKEY");

    let calls = provider.calls.borrow();
    assert_eq!(calls.len(), 1);
    assert_eq!(
        calls[0],
        AssumeRoleRequest {
            role_arn: "arn:aws:iam::123456789012:role/browser".to_string(),
            session_name: "alice".to_string(),
            duration_seconds: 900,
            policy_arns: vec!["arn:aws:iam::123456789012:policy/download".to_string()],
        }
    );
}

#[test]
fn provider_failure_propagates() {
    let scoper = CredentialScoper::from_config(&config()).expect("scoper");
    let provider = RecordingProvider {
        failure: Some("AccessDenied: not authorized to perform sts:AssumeRole"),
        ..RecordingProvider::default()
    };
    let uploader = identity(PermissionSet {
        upload_file: true,
        ..PermissionSet::denied()
    });

    let err = scoper
        .scoped_credentials(&uploader, &provider)
        .expect_err("provider failure");
    assert!(matches!(err, GateError::Provider { .. }));
    assert_eq!(err.public_message(), "An upstream service failed.");
    assert_eq!(provider.calls.borrow().len(), 1);
}

#[test]
fn issued_credentials_never_print_secrets() {
    let scoper = CredentialScoper::from_config(&config()).expect("scoper");
    let provider = RecordingProvider::default();
    let both = identity(PermissionSet {
        download_file: true,
        upload_file: true,
        ..PermissionSet::denied()
    });
    let result = scoper
        .scoped_credentials(&both, &provider)
        .expect("credentials");
    let rendered = format!("{result:?}");
    assert!(!rendered.contains("wJalrXUtnFEMI"));
    assert!(!rendered.contains("FwoGZXIvYXdzE"));
    assert_eq!(provider.calls.borrow()[0].policy_arns.len(), 2);
}
