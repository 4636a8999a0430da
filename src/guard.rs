//! Request-level authorization.
//!
//! Every protected resource first passes [`AuthorizationGuard::authorize`],
//! which needs an identity holding `list_files`. Individual operations then
//! ask for their own capability. Every denial is logged on the `casgate::audit`
//! target with the client origin and the resource path.

use std::net::{IpAddr, SocketAddr};

use serde::{Deserialize, Serialize};

use crate::types::{Capability, SessionIdentity};
use crate::{GateError, Result};

const UNKNOWN_CLIENT: &str = "unknown";

/// The parts of an inbound request the guard needs for decisions and audit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestContext {
    pub path: String,
    /// Raw `X-Forwarded-For` header value.
    pub forwarded_for: Option<String>,
    /// Address of the direct peer.
    pub remote_addr: Option<String>,
}

impl RequestContext {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_forwarded_for(mut self, value: impl Into<String>) -> Self {
        self.forwarded_for = Some(value.into());
        self
    }

    #[must_use]
    pub fn with_remote_addr(mut self, value: impl Into<String>) -> Self {
        self.remote_addr = Some(value.into());
        self
    }

    /// Originating client: the first `X-Forwarded-For` hop when present,
    /// otherwise the peer address.
    #[must_use]
    pub fn client_ip(&self) -> &str {
        let forwarded = self
            .forwarded_for
            .as_deref()
            .and_then(|header| header.split(',').next())
            .map(str::trim)
            .filter(|hop| !hop.is_empty());
        forwarded
            .or(self.remote_addr.as_deref())
            .unwrap_or(UNKNOWN_CLIENT)
    }

    /// True only when the direct peer is loopback and every forwarded hop,
    /// if any, is loopback too. `X-Forwarded-For` alone never qualifies:
    /// any client can send it.
    #[must_use]
    pub fn is_loopback_peer(&self) -> bool {
        let peer = self.remote_addr.as_deref().is_some_and(is_loopback_addr);
        let hops_local = self.forwarded_for.as_deref().is_none_or(|header| {
            header
                .split(',')
                .map(str::trim)
                .filter(|hop| !hop.is_empty())
                .all(is_loopback_addr)
        });
        peer && hops_local
    }
}

/// Accepts a bare address or `address:port`.
fn is_loopback_addr(raw: &str) -> bool {
    raw.parse::<IpAddr>()
        .or_else(|_| raw.parse::<SocketAddr>().map(|addr| addr.ip()))
        .is_ok_and(|ip| ip.is_loopback())
}

/// Outcome of the baseline check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    Allow,
    /// No identity in the session.
    RedirectToLogin,
    /// Identity present but without `list_files`.
    Forbidden,
}

impl AccessDecision {
    #[must_use]
    pub fn is_allowed(self) -> bool {
        self == AccessDecision::Allow
    }

    #[must_use]
    pub fn status_code(self) -> u16 {
        match self {
            AccessDecision::Allow => 200,
            AccessDecision::RedirectToLogin => 302,
            AccessDecision::Forbidden => 403,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AuthorizationGuard;

impl AuthorizationGuard {
    pub const BASELINE: Capability = Capability::ListFiles;

    #[must_use]
    pub fn new() -> Self {
        Self
    }

    pub fn authorize(
        &self,
        identity: Option<&SessionIdentity>,
        request: &RequestContext,
    ) -> AccessDecision {
        let Some(identity) = identity.filter(|identity| identity.is_well_formed()) else {
            tracing::info!(
                target = "casgate::audit",
                client_ip = request.client_ip(),
                resource = %request.path,
                "client is not authenticated; redirecting to login"
            );
            return AccessDecision::RedirectToLogin;
        };
        if !identity.grants(Self::BASELINE) {
            log_denial(identity.principal(), Self::BASELINE.as_str(), request);
            return AccessDecision::Forbidden;
        }
        AccessDecision::Allow
    }

    /// Default-deny capability check. Never fails: an unknown capability name,
    /// a missing identity or a missing permission map all answer `false`.
    #[must_use]
    pub fn has_capability(&self, identity: Option<&SessionIdentity>, capability: &str) -> bool {
        let Ok(capability) = capability.parse::<Capability>() else {
            tracing::error!(
                target = "casgate::audit",
                capability,
                "capability check outside vocabulary"
            );
            return false;
        };
        identity.is_some_and(|identity| identity.grants(capability))
    }

    /// Per-operation check; a denial is audited and returned as
    /// `GateError::AccessDenied`.
    pub fn require(
        &self,
        identity: &SessionIdentity,
        capability: Capability,
        request: &RequestContext,
    ) -> Result<()> {
        if identity.grants(capability) {
            return Ok(());
        }
        log_denial(identity.principal(), capability.as_str(), request);
        Err(GateError::AccessDenied {
            principal: identity.principal().into(),
            capability: capability.as_str().into(),
            resource: request.path.as_str().into(),
        })
    }
}

fn log_denial(principal: &str, capability: &str, request: &RequestContext) {
    tracing::warn!(
        target = "casgate::audit",
        principal,
        capability,
        client_ip = request.client_ip(),
        resource = %request.path,
        "user is not authorized for resource"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PermissionSet;

    fn identity_with(permissions: PermissionSet) -> SessionIdentity {
        SessionIdentity::new("alice").with_permissions(permissions)
    }

    fn listing() -> PermissionSet {
        PermissionSet {
            list_files: true,
            ..PermissionSet::denied()
        }
    }

    #[test]
    fn authorize_decisions() {
        let guard = AuthorizationGuard::new();
        let request = RequestContext::new("/browse/top");

        assert_eq!(
            guard.authorize(None, &request),
            AccessDecision::RedirectToLogin
        );
        let denied = identity_with(PermissionSet::denied());
        assert_eq!(
            guard.authorize(Some(&denied), &request),
            AccessDecision::Forbidden
        );
        let allowed = identity_with(listing());
        assert!(guard.authorize(Some(&allowed), &request).is_allowed());
    }

    #[test]
    fn identity_without_principal_counts_as_absent() {
        let guard = AuthorizationGuard::new();
        let anonymous = SessionIdentity::new("   ").with_permissions(listing());
        assert_eq!(
            guard.authorize(Some(&anonymous), &RequestContext::new("/")),
            AccessDecision::RedirectToLogin
        );
    }

    #[test]
    fn has_capability_defaults_to_deny() {
        let guard = AuthorizationGuard::new();
        let identity = identity_with(listing());

        assert!(guard.has_capability(Some(&identity), "list_files"));
        assert!(!guard.has_capability(Some(&identity), "upload_file"));
        assert!(!guard.has_capability(Some(&identity), "root_access"));
        assert!(!guard.has_capability(None, "list_files"));

        let malformed = identity.clone().without_permissions();
        assert!(!guard.has_capability(Some(&malformed), "list_files"));
    }

    #[test]
    fn require_reports_structured_denial() {
        let guard = AuthorizationGuard::new();
        let identity = identity_with(listing());
        let request = RequestContext::new("/browse/top/reports").with_remote_addr("10.0.0.5");

        guard
            .require(&identity, Capability::ListFiles, &request)
            .expect("list allowed");
        match guard.require(&identity, Capability::RemoveFile, &request) {
            Err(GateError::AccessDenied {
                principal,
                capability,
                resource,
            }) => {
                assert_eq!(&*principal, "alice");
                assert_eq!(&*capability, "remove_file");
                assert_eq!(&*resource, "/browse/top/reports");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn client_ip_prefers_forwarded_for() {
        let request = RequestContext::new("/")
            .with_forwarded_for("203.0.113.7, 10.0.0.1")
            .with_remote_addr("10.0.0.1");
        assert_eq!(request.client_ip(), "203.0.113.7");
        assert!(!request.is_loopback_peer());

        let direct = RequestContext::new("/").with_remote_addr("127.0.0.1");
        assert_eq!(direct.client_ip(), "127.0.0.1");
        assert!(direct.is_loopback_peer());

        assert_eq!(RequestContext::new("/").client_ip(), UNKNOWN_CLIENT);
        let blank = RequestContext::new("/")
            .with_forwarded_for("  ")
            .with_remote_addr("::1");
        assert!(blank.is_loopback_peer());
    }

    #[test]
    fn forwarded_for_cannot_claim_loopback() {
        let spoofed = RequestContext::new("/")
            .with_forwarded_for("127.0.0.1")
            .with_remote_addr("198.51.100.4");
        assert_eq!(spoofed.client_ip(), "127.0.0.1");
        assert!(!spoofed.is_loopback_peer());

        let proxied = RequestContext::new("/")
            .with_forwarded_for("203.0.113.9, 127.0.0.1")
            .with_remote_addr("127.0.0.1");
        assert!(!proxied.is_loopback_peer());

        assert!(!RequestContext::new("/").is_loopback_peer());
        assert!(
            RequestContext::new("/")
                .with_remote_addr("127.0.0.1:54012")
                .is_loopback_peer()
        );
    }
}
