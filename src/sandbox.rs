//! Browse path to bucket key mapping.
//!
//! Browse paths are attacker-controlled. They must start with the literal
//! segment `top`, which is replaced by the configured bucket root. Every key
//! produced here is the root itself or lies under `root/`; mutating callers
//! re-check that with [`PathSandbox::ensure_mutable`] before touching the
//! store.

use serde::{Deserialize, Serialize};

use crate::config::{GateConfig, normalize_bucket_root};
use crate::constants::BROWSE_ROOT_SEGMENT;
use crate::{GateError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSandbox {
    root: String,
}

impl PathSandbox {
    /// `root` may be empty (whole bucket); a trailing `/` is dropped.
    pub fn new(root: impl AsRef<str>) -> Self {
        Self {
            root: normalize_bucket_root(root.as_ref()),
        }
    }

    pub fn from_config(config: &GateConfig) -> Self {
        Self::new(&config.bucket_root)
    }

    #[must_use]
    pub fn root(&self) -> &str {
        &self.root
    }

    /// Key of the root folder itself (`root/`, or empty for the whole bucket).
    #[must_use]
    pub fn root_folder_key(&self) -> String {
        if self.root.is_empty() {
            String::new()
        } else {
            format!("{}/", self.root)
        }
    }

    /// Maps `top/<rest>` to `<root>/<rest>`.
    ///
    /// With `force_trailing_slash` the path is treated as a folder and the key
    /// ends in `/`.
    pub fn to_backend_key(&self, path: &str, force_trailing_slash: bool) -> Result<String> {
        let mut path = path.to_string();
        if force_trailing_slash && !path.ends_with('/') {
            path.push('/');
        }
        let (top, rest) = path.split_once('/').unwrap_or((path.as_str(), ""));
        if top != BROWSE_ROOT_SEGMENT {
            tracing::warn!(target = "casgate::sandbox", %path, "path did not start with `top`");
            return Err(violation(&path, "path must start with `top`"));
        }
        if rest.split('/').any(|segment| segment == ".." || segment == ".") {
            tracing::warn!(target = "casgate::sandbox", %path, "path contains a relative segment");
            return Err(violation(&path, "relative segments are not allowed"));
        }

        let key = if self.root.is_empty() {
            rest.to_string()
        } else {
            format!("{}/{rest}", self.root)
        };
        if !self.is_within_root(&key) {
            return Err(self.outside_root(&key));
        }
        tracing::debug!(
            target = "casgate::sandbox",
            subpath = rest,
            bucket_root = %self.root,
            %key,
            "mapped browse path"
        );
        Ok(key)
    }

    /// True iff `key` is the root or a `/`-delimited descendant of it. With an
    /// empty root every key qualifies.
    #[must_use]
    pub fn is_within_root(&self, key: &str) -> bool {
        if self.root.is_empty() {
            return true;
        }
        key == self.root
            || key
                .strip_prefix(self.root.as_str())
                .is_some_and(|tail| tail.starts_with('/'))
    }

    /// The root in file (`root`) or folder (`root/`) form.
    #[must_use]
    pub fn is_root_key(&self, key: &str) -> bool {
        key == self.root || key == self.root_folder_key()
    }

    /// Independent check run by every mutating operation: the key must lie
    /// strictly below the root.
    pub fn ensure_mutable(&self, key: &str) -> Result<()> {
        if !self.is_within_root(key) {
            tracing::error!(
                target = "casgate::sandbox",
                key,
                bucket_root = %self.root,
                "refusing to operate outside the bucket root"
            );
            return Err(self.outside_root(key));
        }
        if self.is_root_key(key) {
            tracing::warn!(target = "casgate::sandbox", key, "refusing to modify the bucket root");
            return Err(GateError::RootProtected { key: key.into() });
        }
        Ok(())
    }

    fn outside_root(&self, key: &str) -> GateError {
        GateError::OutsideRoot {
            key: key.into(),
            root: self.root.as_str().into(),
        }
    }
}

/// Keys ending in `/` are folders.
#[must_use]
pub fn is_folder_key(key: &str) -> bool {
    key.ends_with('/')
}

/// One navigable segment of a browse path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Breadcrumb {
    pub label: String,
    /// `/`-joined path through this segment.
    pub path: String,
}

/// `top/a/b` -> `[(top, top), (a, top/a), (b, top/a/b)]`.
#[must_use]
pub fn breadcrumbs(subpath: &str) -> Vec<Breadcrumb> {
    let parts: Vec<&str> = subpath.split('/').collect();
    (0..parts.len())
        .map(|n| Breadcrumb {
            label: parts[n].to_string(),
            path: parts[..=n].join("/"),
        })
        .collect()
}

fn violation(path: &str, reason: &str) -> GateError {
    GateError::PathViolation {
        path: path.into(),
        reason: reason.into(),
    }
}
