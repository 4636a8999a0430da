//! Environment variable names and protocol constants.

pub const ENV_CAS_LOGIN_URL: &str = "CAS_LOGIN_URL";
pub const ENV_CAS_SERVICE_VALIDATE_URL: &str = "CAS_SERVICE_VALIDATE_URL";
pub const ENV_CAS_SERVICE_URL: &str = "CAS_SERVICE_URL";
pub const ENV_CAS_LOGOUT_URL: &str = "CAS_LOGOUT_URL";
pub const ENV_CAS_HTTP_TIMEOUT_SECS: &str = "CAS_HTTP_TIMEOUT_SECS";
pub const ENV_ENTITLEMENT_PREFIX: &str = "S3BROWSER_ENTITLEMENT_PREFIX";
pub const ENV_BUCKET: &str = "S3_BUCKET";
pub const ENV_BUCKET_ROOT: &str = "BUCKET_ROOT";
pub const ENV_ROLE_ARN: &str = "S3_DOWNLOAD_ROLE_ARN";
pub const ENV_DOWNLOAD_POLICY_ARN: &str = "S3_DOWNLOAD_POLICY_ARN";
pub const ENV_UPLOAD_POLICY_ARN: &str = "S3_UPLOAD_POLICY_ARN";
pub const ENV_DEV_IDENTITY: &str = "APP_DEV_IDENTITY";

pub const DEFAULT_ENTITLEMENT_PREFIX: &str =
    "https://s3browser.example.net/example_bucket/permissions";
pub const DEFAULT_CAS_HTTP_TIMEOUT_SECS: u64 = 10;

/// Attribute carrying entitlement URIs (compared case-insensitively).
pub const ENTITLEMENT_ATTRIBUTE: &str = "edupersonentitlement";

/// Session key holding the serialized identity.
pub const SESSION_IDENTITY_KEY: &str = "identity";

/// Mandatory first segment of every browse path.
pub const BROWSE_ROOT_SEGMENT: &str = "top";
/// Where a freshly authenticated user lands.
pub const BROWSE_LANDING_PATH: &str = "/browse/top";
/// Logout target when no CAS logout endpoint is configured.
pub const INDEX_PATH: &str = "/";

/// Shortest lifetime the credential provider accepts.
pub const SCOPED_CREDENTIAL_DURATION_SECS: u32 = 900;
pub const ROLE_SESSION_NAME_MIN: usize = 2;
pub const ROLE_SESSION_NAME_MAX: usize = 64;
