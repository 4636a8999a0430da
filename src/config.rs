//! Environment-driven configuration.
//!
//! Values are captured once; required ones are checked when a component first
//! needs them, so a missing variable fails the operation that depends on it
//! with the variable's name rather than a later, vaguer symptom.

use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use crate::constants::{
    DEFAULT_CAS_HTTP_TIMEOUT_SECS, DEFAULT_ENTITLEMENT_PREFIX, ENV_BUCKET, ENV_BUCKET_ROOT,
    ENV_CAS_HTTP_TIMEOUT_SECS, ENV_CAS_LOGIN_URL, ENV_CAS_LOGOUT_URL, ENV_CAS_SERVICE_URL,
    ENV_CAS_SERVICE_VALIDATE_URL, ENV_DEV_IDENTITY, ENV_DOWNLOAD_POLICY_ARN,
    ENV_ENTITLEMENT_PREFIX, ENV_ROLE_ARN, ENV_UPLOAD_POLICY_ARN,
};
use crate::{GateError, Result};

#[derive(Debug, Clone)]
pub struct GateConfig {
    pub cas_login_url: Option<String>,
    pub cas_service_validate_url: Option<String>,
    pub cas_service_url: Option<String>,
    pub cas_logout_url: Option<String>,
    pub cas_http_timeout: Duration,
    /// Lower-cased; entitlement values are lower-cased before comparison.
    pub entitlement_prefix: String,
    pub bucket: Option<String>,
    /// Trailing `/` already stripped.
    pub bucket_root: String,
    pub role_arn: Option<String>,
    pub download_policy_arn: Option<String>,
    pub upload_policy_arn: Option<String>,
    pub dev_identity_path: Option<PathBuf>,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            cas_login_url: None,
            cas_service_validate_url: None,
            cas_service_url: None,
            cas_logout_url: None,
            cas_http_timeout: Duration::from_secs(DEFAULT_CAS_HTTP_TIMEOUT_SECS),
            entitlement_prefix: DEFAULT_ENTITLEMENT_PREFIX.to_string(),
            bucket: None,
            bucket_root: String::new(),
            role_arn: None,
            download_policy_arn: None,
            upload_policy_arn: None,
            dev_identity_path: None,
        }
    }
}

impl GateConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable source. Empty
    /// strings count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let cas_http_timeout = match get(ENV_CAS_HTTP_TIMEOUT_SECS) {
            Some(raw) => {
                let secs = raw.trim().parse::<u64>().map_err(|err| {
                    GateError::InvalidConfiguration {
                        variable: ENV_CAS_HTTP_TIMEOUT_SECS,
                        reason: format!("expected whole seconds: {err}").into(),
                    }
                })?;
                Duration::from_secs(secs)
            }
            None => Duration::from_secs(DEFAULT_CAS_HTTP_TIMEOUT_SECS),
        };

        let entitlement_prefix = get(ENV_ENTITLEMENT_PREFIX)
            .unwrap_or_else(|| DEFAULT_ENTITLEMENT_PREFIX.to_string())
            .to_lowercase();

        Ok(Self {
            cas_login_url: get(ENV_CAS_LOGIN_URL),
            cas_service_validate_url: get(ENV_CAS_SERVICE_VALIDATE_URL),
            cas_service_url: get(ENV_CAS_SERVICE_URL),
            cas_logout_url: get(ENV_CAS_LOGOUT_URL),
            cas_http_timeout,
            entitlement_prefix,
            bucket: get(ENV_BUCKET),
            bucket_root: normalize_bucket_root(get(ENV_BUCKET_ROOT).as_deref().unwrap_or("")),
            role_arn: get(ENV_ROLE_ARN),
            download_policy_arn: get(ENV_DOWNLOAD_POLICY_ARN),
            upload_policy_arn: get(ENV_UPLOAD_POLICY_ARN),
            dev_identity_path: get(ENV_DEV_IDENTITY).map(PathBuf::from),
        })
    }

    pub fn login_url(&self) -> Result<Url> {
        require_url(ENV_CAS_LOGIN_URL, self.cas_login_url.as_deref())
    }

    pub fn service_validate_url(&self) -> Result<Url> {
        require_url(
            ENV_CAS_SERVICE_VALIDATE_URL,
            self.cas_service_validate_url.as_deref(),
        )
    }

    pub fn service_url(&self) -> Result<&str> {
        require(ENV_CAS_SERVICE_URL, self.cas_service_url.as_deref())
    }

    pub fn bucket(&self) -> Result<&str> {
        require(ENV_BUCKET, self.bucket.as_deref())
    }

    pub fn role_arn(&self) -> Result<&str> {
        require(ENV_ROLE_ARN, self.role_arn.as_deref())
    }

    pub fn download_policy_arn(&self) -> Result<&str> {
        require(ENV_DOWNLOAD_POLICY_ARN, self.download_policy_arn.as_deref())
    }

    pub fn upload_policy_arn(&self) -> Result<&str> {
        require(ENV_UPLOAD_POLICY_ARN, self.upload_policy_arn.as_deref())
    }
}

fn require<'a>(variable: &'static str, value: Option<&'a str>) -> Result<&'a str> {
    value.ok_or(GateError::MissingConfiguration { variable })
}

fn require_url(variable: &'static str, value: Option<&str>) -> Result<Url> {
    let raw = require(variable, value)?;
    Url::parse(raw).map_err(|err| GateError::InvalidConfiguration {
        variable,
        reason: format!("not a URL: {err}").into(),
    })
}

pub(crate) fn normalize_bucket_root(raw: &str) -> String {
    raw.trim().trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(pairs: &[(&str, &str)]) -> Result<GateConfig> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        GateConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = config_from(&[]).expect("config");
        assert_eq!(config.entitlement_prefix, DEFAULT_ENTITLEMENT_PREFIX);
        assert_eq!(config.bucket_root, "");
        assert_eq!(
            config.cas_http_timeout,
            Duration::from_secs(DEFAULT_CAS_HTTP_TIMEOUT_SECS)
        );
    }

    #[test]
    fn missing_required_value_names_the_variable() {
        let config = config_from(&[(ENV_CAS_LOGIN_URL, "   ")]).expect("config");
        match config.login_url() {
            Err(GateError::MissingConfiguration { variable }) => {
                assert_eq!(variable, ENV_CAS_LOGIN_URL);
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(matches!(
            config.role_arn(),
            Err(GateError::MissingConfiguration {
                variable: ENV_ROLE_ARN
            })
        ));
    }

    #[test]
    fn malformed_values_are_rejected() {
        let config = config_from(&[(ENV_CAS_LOGIN_URL, "not a url")]).expect("config");
        assert!(matches!(
            config.login_url(),
            Err(GateError::InvalidConfiguration { .. })
        ));

        let err = config_from(&[(ENV_CAS_HTTP_TIMEOUT_SECS, "soon")]).expect_err("bad timeout");
        assert!(matches!(err, GateError::InvalidConfiguration { .. }));
    }

    #[test]
    fn bucket_root_and_prefix_are_normalized() {
        let config = config_from(&[
            (ENV_BUCKET_ROOT, "shared/data/"),
            (ENV_ENTITLEMENT_PREFIX, "HTTPS://Example.ORG/perms"),
        ])
        .expect("config");
        assert_eq!(config.bucket_root, "shared/data");
        assert_eq!(config.entitlement_prefix, "https://example.org/perms");
    }
}
