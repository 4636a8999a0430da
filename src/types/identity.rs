//! The authenticated principal as kept in the session.

use serde::{Deserialize, Serialize};

use super::permission::{Capability, PermissionSet};

/// Identity record stored under the session key `identity`.
///
/// Built once per successful ticket validation and not changed afterwards.
/// `permissions` is optional only because a session cell written by another
/// process may carry `null` there; such an identity is granted nothing.
/// Decoding lower-cases the principal and rejects a blank one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "StoredIdentity")]
pub struct SessionIdentity {
    #[serde(rename = "sub")]
    principal: String,
    #[serde(default)]
    given_name: Option<String>,
    #[serde(default)]
    family_name: Option<String>,
    #[serde(default)]
    permissions: Option<PermissionSet>,
}

/// Wire shape of [`SessionIdentity`] before normalization.
#[derive(Deserialize)]
struct StoredIdentity {
    sub: String,
    #[serde(default)]
    given_name: Option<String>,
    #[serde(default)]
    family_name: Option<String>,
    #[serde(default)]
    permissions: Option<PermissionSet>,
}

impl TryFrom<StoredIdentity> for SessionIdentity {
    type Error = &'static str;

    fn try_from(stored: StoredIdentity) -> Result<Self, Self::Error> {
        let principal = stored.sub.trim().to_lowercase();
        if principal.is_empty() {
            return Err("identity has an empty `sub`");
        }
        Ok(Self {
            principal,
            given_name: stored.given_name,
            family_name: stored.family_name,
            permissions: stored.permissions,
        })
    }
}

impl SessionIdentity {
    /// A fresh identity with every capability denied. The principal is
    /// lower-cased.
    pub fn new(principal: impl AsRef<str>) -> Self {
        Self {
            principal: principal.as_ref().trim().to_lowercase(),
            given_name: None,
            family_name: None,
            permissions: Some(PermissionSet::denied()),
        }
    }

    #[must_use]
    pub fn with_permissions(mut self, permissions: PermissionSet) -> Self {
        self.permissions = Some(permissions);
        self
    }

    /// Identity whose permission structure is missing altogether.
    #[must_use]
    pub fn without_permissions(mut self) -> Self {
        self.permissions = None;
        self
    }

    #[must_use]
    pub fn principal(&self) -> &str {
        &self.principal
    }

    #[must_use]
    pub fn given_name(&self) -> Option<&str> {
        self.given_name.as_deref()
    }

    #[must_use]
    pub fn family_name(&self) -> Option<&str> {
        self.family_name.as_deref()
    }

    #[must_use]
    pub fn permissions(&self) -> Option<&PermissionSet> {
        self.permissions.as_ref()
    }

    /// A usable identity names a principal.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        !self.principal.is_empty()
    }

    /// Default-deny lookup.
    #[must_use]
    pub fn grants(&self, capability: Capability) -> bool {
        self.permissions
            .as_ref()
            .is_some_and(|permissions| permissions.get(capability))
    }

    pub(crate) fn set_given_name(&mut self, value: String) {
        self.given_name = Some(value);
    }

    pub(crate) fn set_family_name(&mut self, value: String) {
        self.family_name = Some(value);
    }

    /// Permission map for the mapper, created on demand if it was absent.
    pub(crate) fn permissions_mut(&mut self) -> &mut PermissionSet {
        self.permissions.get_or_insert_with(PermissionSet::denied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn principal_is_lowercased() {
        let identity = SessionIdentity::new(" Alice@Example.ORG ");
        assert_eq!(identity.principal(), "alice@example.org");
        assert!(identity.is_well_formed());
        assert!(!identity.grants(Capability::ListFiles));
    }

    #[test]
    fn decodes_session_record_with_null_permissions() {
        let identity: SessionIdentity = serde_json::from_str(
            r#"{"sub": "bob", "given_name": null, "family_name": "Builder", "permissions": null}"#,
        )
        .expect("decode identity");
        assert_eq!(identity.family_name(), Some("Builder"));
        assert!(identity.permissions().is_none());
        assert!(!identity.grants(Capability::ListFiles));
    }

    #[test]
    fn decoding_normalizes_the_principal() {
        let identity: SessionIdentity = serde_json::from_str(
            r#"{"sub": " Alice@Example.ORG ", "permissions": {"list_files": true}}"#,
        )
        .expect("decode identity");
        assert_eq!(identity.principal(), "alice@example.org");
        assert!(identity.grants(Capability::ListFiles));
        assert_eq!(identity, SessionIdentity::new("alice@example.org").with_permissions(
            PermissionSet {
                list_files: true,
                ..PermissionSet::denied()
            }
        ));
    }

    #[test]
    fn decoding_rejects_a_blank_principal() {
        for raw in [r#"{"sub": ""}"#, r#"{"sub": "   "}"#, r#"{"permissions": null}"#] {
            assert!(serde_json::from_str::<SessionIdentity>(raw).is_err(), "{raw}");
        }
    }

    #[test]
    fn encodes_principal_as_sub() {
        let identity = SessionIdentity::new("carol");
        let value = serde_json::to_value(&identity).expect("encode identity");
        assert_eq!(value["sub"], "carol");
        assert_eq!(value["permissions"]["list_files"], false);
    }
}
