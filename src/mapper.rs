//! Maps identity-provider attributes onto a [`SessionIdentity`].
//!
//! Entitlements look like `<prefix>?list_files=allow&remove_file=deny`. Each
//! recognised capability parameter with exactly one value of `allow` or
//! `deny` overwrites that capability. Attributes are processed in document
//! order, so a later entitlement overrides an earlier one for the same
//! capability, and a later `givenName`/`sn` overrides an earlier one.

use std::collections::BTreeMap;

use url::Url;

use crate::config::GateConfig;
use crate::constants::ENTITLEMENT_ATTRIBUTE;
use crate::types::{CasAttributes, Capability, PermissionSet, SessionIdentity};

const GIVEN_NAME_ATTRIBUTE: &str = "givenname";
const FAMILY_NAME_ATTRIBUTES: [&str; 2] = ["surname", "sn"];

/// Action encoded in an entitlement parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionAction {
    Allow,
    Deny,
    Invalid,
}

impl PermissionAction {
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value {
            "allow" => PermissionAction::Allow,
            "deny" => PermissionAction::Deny,
            _ => PermissionAction::Invalid,
        }
    }

    #[must_use]
    pub fn as_grant(self) -> Option<bool> {
        match self {
            PermissionAction::Allow => Some(true),
            PermissionAction::Deny => Some(false),
            PermissionAction::Invalid => None,
        }
    }
}

/// An entitlement parameter that named a capability but could not be applied.
/// Each one is also logged at `warn`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedGrant {
    pub capability: Capability,
    /// Offending value(s), comma-joined when the parameter repeated.
    pub action: String,
    pub entitlement: String,
}

/// What a permission pass did, in processing order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MappingReport {
    pub applied: Vec<(Capability, bool)>,
    pub rejected: Vec<RejectedGrant>,
}

#[derive(Debug, Clone)]
pub struct AttributeMapper {
    entitlement_prefix: String,
}

impl AttributeMapper {
    pub fn new(entitlement_prefix: impl AsRef<str>) -> Self {
        Self {
            entitlement_prefix: entitlement_prefix.as_ref().to_lowercase(),
        }
    }

    pub fn from_config(config: &GateConfig) -> Self {
        Self::new(&config.entitlement_prefix)
    }

    /// Runs the permission pass and the profile pass against `identity`.
    pub fn apply(
        &self,
        attributes: &CasAttributes,
        identity: &mut SessionIdentity,
    ) -> MappingReport {
        let report = self.map_permissions(attributes, identity.permissions_mut());
        map_profile(attributes, identity);
        report
    }

    pub fn map_permissions(
        &self,
        attributes: &CasAttributes,
        permissions: &mut PermissionSet,
    ) -> MappingReport {
        let mut report = MappingReport::default();
        for attribute in attributes
            .iter()
            .filter(|attribute| attribute.is_named(ENTITLEMENT_ATTRIBUTE))
        {
            let entitlement = attribute.value.to_lowercase();
            if !entitlement.starts_with(&self.entitlement_prefix) {
                continue;
            }
            let parsed = match Url::parse(&entitlement) {
                Ok(parsed) => parsed,
                Err(err) => {
                    tracing::warn!(
                        target = "casgate::mapper",
                        %entitlement,
                        error = %err,
                        "entitlement is not a valid URI"
                    );
                    continue;
                }
            };
            for (param, values) in query_values(&parsed) {
                let Ok(capability) = param.parse::<Capability>() else {
                    continue;
                };
                let [value] = values.as_slice() else {
                    tracing::warn!(
                        target = "casgate::mapper",
                        capability = %capability,
                        count = values.len(),
                        %entitlement,
                        "entitlement repeats a capability; ignoring it"
                    );
                    report.rejected.push(RejectedGrant {
                        capability,
                        action: values.join(","),
                        entitlement: entitlement.clone(),
                    });
                    continue;
                };
                match PermissionAction::parse(value).as_grant() {
                    Some(granted) => {
                        permissions.set(capability, granted);
                        report.applied.push((capability, granted));
                    }
                    None => {
                        tracing::warn!(
                            target = "casgate::mapper",
                            capability = %capability,
                            action = %value,
                            %entitlement,
                            "could not map permission action"
                        );
                        report.rejected.push(RejectedGrant {
                            capability,
                            action: value.clone(),
                            entitlement: entitlement.clone(),
                        });
                    }
                }
            }
        }
        report
    }
}

/// `givenName` sets the given name; `surname` or `sn` the family name.
pub fn map_profile(attributes: &CasAttributes, identity: &mut SessionIdentity) {
    for attribute in attributes {
        if attribute.is_named(GIVEN_NAME_ATTRIBUTE) {
            identity.set_given_name(attribute.value.clone());
        }
        if FAMILY_NAME_ATTRIBUTES
            .iter()
            .any(|name| attribute.is_named(name))
        {
            identity.set_family_name(attribute.value.clone());
        }
    }
}

/// Query parameters grouped by name. Blank values are dropped, matching the
/// usual form-decoding convention.
fn query_values(url: &Url) -> BTreeMap<String, Vec<String>> {
    let mut grouped: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (name, value) in url.query_pairs() {
        if value.is_empty() {
            continue;
        }
        grouped
            .entry(name.into_owned())
            .or_default()
            .push(value.into_owned());
    }
    grouped
}
