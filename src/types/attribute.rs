//! Attributes released by the identity provider.

use serde::{Deserialize, Serialize};

/// A single `(name, value)` pair from `<cas:attributes>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CasAttribute {
    pub name: String,
    pub value: String,
}

impl CasAttribute {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Case-insensitive name comparison.
    #[must_use]
    pub fn is_named(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}

/// Attributes in document order with exact duplicates collapsed.
///
/// Order is significant: when several attributes target the same field the
/// one appearing last wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CasAttributes {
    entries: Vec<CasAttribute>,
}

impl CasAttributes {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends unless an identical pair is already present. Returns whether
    /// the pair was added.
    pub fn push(&mut self, attribute: CasAttribute) -> bool {
        if self.entries.contains(&attribute) {
            return false;
        }
        self.entries.push(attribute);
        true
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CasAttribute> {
        self.entries.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<CasAttribute> for CasAttributes {
    fn from_iter<I: IntoIterator<Item = CasAttribute>>(iter: I) -> Self {
        let mut attributes = Self::new();
        for attribute in iter {
            attributes.push(attribute);
        }
        attributes
    }
}

impl<'a> IntoIterator for &'a CasAttributes {
    type Item = &'a CasAttribute;
    type IntoIter = std::slice::Iter<'a, CasAttribute>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicates_collapse_keeping_first_position() {
        let attributes: CasAttributes = [
            CasAttribute::new("givenName", "Ada"),
            CasAttribute::new("sn", "Lovelace"),
            CasAttribute::new("givenName", "Ada"),
            CasAttribute::new("givenName", "Augusta"),
        ]
        .into_iter()
        .collect();

        let values: Vec<&str> = attributes.iter().map(|a| a.value.as_str()).collect();
        assert_eq!(values, vec!["Ada", "Lovelace", "Augusta"]);
    }

    #[test]
    fn name_match_ignores_case() {
        let attribute = CasAttribute::new("eduPersonEntitlement", "x");
        assert!(attribute.is_named("edupersonentitlement"));
        assert!(!attribute.is_named("entitlement"));
    }
}
